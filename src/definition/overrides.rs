//! Profile-scoped overrides file.
//!
//! A profile directory may carry one jsonnet document whose top-level
//! keys (`ecspresso_config`, `service_definition`, `task_definition`,
//! `container_definition`) each hold a merge patch for the matching
//! scope. A missing file yields an empty layer, not an error.

use std::path::Path;

use serde_json::Value;

use super::template;
use crate::error::{Result, SortieError};

#[derive(Debug, Default)]
pub struct Overrides {
    content: Option<Value>,
}

impl Overrides {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let json = template::evaluate_jsonnet(path)
            .map_err(|e| SortieError::load("overrides file", path, e))?;
        let content = serde_json::from_str(&json)
            .map_err(|e| SortieError::load("overrides file", path, e))?;

        Ok(Self {
            content: Some(content),
        })
    }

    /// The merge-patch text for one scope, serialized back to JSON, or
    /// `None` when the file or the key is absent.
    pub fn layer(&self, key: &str) -> Option<String> {
        self.content
            .as_ref()
            .and_then(|v| v.get(key))
            .map(Value::to_string)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_file_is_empty_layer() {
        let dir = TempDir::new().unwrap();

        let overrides = Overrides::load(&dir.path().join(".sortie.jsonnet")).unwrap();

        assert_eq!(overrides.layer("task_definition"), None);
    }

    #[test]
    fn exposes_per_scope_layers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".sortie.jsonnet");
        fs::write(
            &path,
            r#"{ ecspresso_config: { cluster: "backup" }, task_definition: { cpu: "512" } }"#,
        )
        .unwrap();

        let overrides = Overrides::load(&path).unwrap();

        assert_eq!(
            overrides.layer("ecspresso_config").unwrap(),
            r#"{"cluster":"backup"}"#
        );
        assert_eq!(
            overrides.layer("task_definition").unwrap(),
            r#"{"cpu":"512"}"#
        );
        assert_eq!(overrides.layer("service_definition"), None);
    }
}
