//! The ecspresso configuration document.

use std::path::Path;

use super::document::Document;
use super::template;
use crate::error::{Result, SortieError};

const DOCUMENT: &str = "ecspresso config";

/// Fallback template file names, kept for configs written before the
/// `service_definition`/`task_definition` pointers existed.
const DEFAULT_SERVICE_DEF_FILE: &str = "ecs-service-def.jsonnet";
const DEFAULT_TASK_DEF_FILE: &str = "ecs-task-def.jsonnet";

#[derive(Debug, Clone)]
pub struct EcspressoConfig {
    doc: Document,
}

impl EcspressoConfig {
    /// Scan `candidates` in the profile directory and load the last one
    /// that exists. The scan order is observable behavior: when several
    /// candidate configs coexist, the last name in the list wins.
    pub fn load(dir: &Path, candidates: &[String]) -> Result<Self> {
        let mut found = None;

        for name in candidates {
            let path = dir.join(name);
            if path.exists() {
                found = Some(path);
            }
        }

        let path = found.ok_or_else(|| SortieError::NotFound {
            kind: "ecspresso config file",
            path: dir.join(candidates.join(",")).display().to_string(),
        })?;

        let doc = template::load(&path).map_err(|e| SortieError::load(DOCUMENT, &path, e))?;

        Ok(Self { doc })
    }

    pub fn patch(&mut self, overrides: &str) -> Result<()> {
        self.doc
            .merge(overrides)
            .map_err(|e| SortieError::patch(DOCUMENT, e))
    }

    /// Shallow string lookup; non-string values are treated as absent.
    pub fn get(&self, key: &str) -> Option<String> {
        self.doc.get_str(key).map(str::to_string)
    }

    pub fn service_definition_file(&self) -> String {
        self.get("service_definition")
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| DEFAULT_SERVICE_DEF_FILE.to_string())
    }

    pub fn task_definition_file(&self) -> String {
        self.get("task_definition")
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| DEFAULT_TASK_DEF_FILE.to_string())
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }
}
