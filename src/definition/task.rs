//! Task definition loading and patching.

use std::path::Path;

use serde_json::json;

use super::container::ContainerDefinition;
use super::document::Document;
use super::template;
use crate::error::{Result, SortieError};

const DOCUMENT: &str = "ECS task definition";

/// Namespace prefix for task families launched by this tool. Prefixed
/// families keep ephemeral task-definition revisions traceable to their
/// owner and separate from the source template's lineage.
pub const FAMILY_PREFIX: &str = "sortie-";

#[derive(Debug, Clone)]
pub struct TaskDefinition {
    doc: Document,
}

impl TaskDefinition {
    /// Load the task template and namespace its `family` exactly once,
    /// before any override layer. A template whose family already carries
    /// the prefix is left untouched, so repeated loads are idempotent.
    pub fn load(path: &Path) -> Result<Self> {
        let mut doc = template::load(path).map_err(|e| SortieError::load(DOCUMENT, path, e))?;

        let family = doc
            .get_str("family")
            .ok_or(SortieError::MissingField {
                document: DOCUMENT,
                field: "family".to_string(),
            })?
            .to_string();

        if !family.starts_with(FAMILY_PREFIX) {
            let family = prefixed_family(&family, &invoking_user());
            doc.merge(&json!({ "family": family }).to_string())
                .map_err(|e| SortieError::patch("'family' in ECS task definition", e))?;
        }

        Ok(Self { doc })
    }

    /// Apply the per-run task patches: free-form overrides first, then the
    /// resolved container definition (replacing `containerDefinitions`
    /// wholesale), then non-zero cpu/memory as decimal strings.
    pub fn patch(
        &mut self,
        overrides: &str,
        container: Option<&ContainerDefinition>,
        cpu: u64,
        memory: u64,
    ) -> Result<()> {
        self.doc
            .merge(overrides)
            .map_err(|e| SortieError::patch(DOCUMENT, e))?;

        if let Some(container) = container {
            self.doc
                .merge(&json!({ "containerDefinitions": [container.document().as_value()] }).to_string())
                .map_err(|e| SortieError::patch("containerDefinitions", e))?;
        }

        if cpu != 0 {
            self.doc
                .merge(&json!({ "cpu": cpu.to_string() }).to_string())
                .map_err(|e| SortieError::patch("'cpu' in ECS task definition", e))?;
        }

        if memory != 0 {
            self.doc
                .merge(&json!({ "memory": memory.to_string() }).to_string())
                .map_err(|e| SortieError::patch("'memory' in ECS task definition", e))?;
        }

        Ok(())
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }
}

fn prefixed_family(family: &str, user: &str) -> String {
    let sanitized: String = user.chars().filter(|c| c.is_alphanumeric() || *c == '_').collect();
    format!("{FAMILY_PREFIX}{sanitized}-{family}")
}

fn invoking_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
