//! Service definition loading and patching.

use std::path::Path;

use super::document::Document;
use super::template;
use crate::error::{Result, SortieError};

const DOCUMENT: &str = "ECS service definition";

#[derive(Debug, Clone)]
pub struct ServiceDefinition {
    doc: Document,
}

impl ServiceDefinition {
    pub fn load(path: &Path) -> Result<Self> {
        let doc = template::load(path).map_err(|e| SortieError::load(DOCUMENT, path, e))?;

        Ok(Self { doc })
    }

    /// Service definitions are mutated only by override layers.
    pub fn patch(&mut self, overrides: &str) -> Result<()> {
        self.doc
            .merge(overrides)
            .map_err(|e| SortieError::patch(DOCUMENT, e))
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn load_and_patch() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ecs-service-def.json");
        fs::write(&path, r#"{"launchType": "FARGATE", "desiredCount": 1}"#).unwrap();

        let mut service = ServiceDefinition::load(&path).unwrap();
        service.patch(r#"{"desiredCount": 0}"#).unwrap();

        assert_eq!(
            service.document().get("desiredCount").unwrap(),
            &serde_json::json!(0)
        );
    }

    #[test]
    fn missing_template_is_wrapped_with_document_name() {
        let dir = TempDir::new().unwrap();

        let err = ServiceDefinition::load(&dir.path().join("absent.json")).unwrap_err();

        assert!(err.to_string().contains("ECS service definition"));
    }
}
