//! Single-container definition, loaded from its own file or derived from
//! a task-definition template.

use std::path::Path;

use serde_json::json;

use super::document::Document;
use super::template;
use crate::error::{Result, SortieError};

const DOCUMENT: &str = "ECS container definition";

#[derive(Debug, Clone)]
pub struct ContainerDefinition {
    doc: Document,
}

impl ContainerDefinition {
    /// Load the container definition from `path`, or, when that file does
    /// not exist, derive it from `containerDefinitions[0]` of the task
    /// template at `task_def_path`. The derived copy drops `dependsOn`:
    /// dependency ordering from the source task does not apply to a
    /// synthetic single-container run.
    pub fn load(path: &Path, task_def_path: &Path) -> Result<Self> {
        let doc = if path.exists() {
            template::load(path).map_err(|e| SortieError::load(DOCUMENT, path, e))?
        } else {
            Self::derive_from_task_def(task_def_path)?
        };

        Ok(Self { doc })
    }

    fn derive_from_task_def(task_def_path: &Path) -> Result<Document> {
        let task_doc = template::load(task_def_path).map_err(|e| {
            SortieError::load(
                "ECS task definition (instead of ECS container definition)",
                task_def_path,
                e,
            )
        })?;

        let container = task_doc
            .get("containerDefinitions")
            .and_then(|defs| defs.get(0))
            .cloned()
            .ok_or(SortieError::MissingField {
                document: "ECS task definition",
                field: "containerDefinitions.0".to_string(),
            })?;

        let mut doc = Document::from_value(container);
        doc.remove("dependsOn");

        Ok(doc)
    }

    /// Apply the per-run container patches, in fixed order:
    /// null out `logConfiguration`, then `command`, then `image`, then the
    /// free-form overrides (which therefore have final say).
    pub fn patch(&mut self, overrides: &str, command: &str, image: &str) -> Result<()> {
        self.doc
            .merge(r#"{"logConfiguration": null}"#)
            .map_err(|e| SortieError::patch(DOCUMENT, e))?;

        if !command.is_empty() {
            // An unparsable command skips only this patch.
            if let Ok(args) = shell_words::split(command) {
                self.doc
                    .merge(&json!({ "command": args }).to_string())
                    .map_err(|e| SortieError::patch("'command' in ECS container definition", e))?;
            }
        }

        if !image.is_empty() {
            let image = if image.starts_with(':') {
                self.retag(image)
            } else {
                image.to_string()
            };

            self.doc
                .merge(&json!({ "image": image }).to_string())
                .map_err(|e| SortieError::patch("'image' in ECS container definition", e))?;
        }

        self.doc
            .merge(overrides)
            .map_err(|e| SortieError::patch(DOCUMENT, e))?;

        Ok(())
    }

    /// Tag-only override: keep the current repository, swap everything
    /// after the last `:` for the new tag.
    fn retag(&self, tag: &str) -> String {
        let current = self.doc.get_str("image").unwrap_or_default();

        match current.rfind(':') {
            Some(idx) => format!("{}{}", &current[..idx], tag),
            None => current.to_string(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }
}
