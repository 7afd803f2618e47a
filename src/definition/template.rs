//! Template loading, polymorphic over file extension.
//!
//! `.jsonnet` templates are evaluated by the embedded jrsonnet
//! interpreter (imports resolve through the filesystem, no external
//! process). `.yml`/`.yaml` templates are converted YAML -> JSON. Anything
//! else is treated as plain JSON.

use std::fs;
use std::path::Path;

use jrsonnet_evaluator::manifest::JsonFormat;
use jrsonnet_evaluator::trace::PathResolver;
use jrsonnet_evaluator::{FileImportResolver, State};
use jrsonnet_stdlib::ContextInitializer;

use super::document::Document;
use crate::error::{Result, SortieError};

/// Load a template file into a normalized JSON document.
///
/// A missing template is a hard error carrying the attempted path, since
/// templates are a precondition for the whole run.
pub fn load(path: &Path) -> Result<Document> {
    if !path.exists() {
        return Err(SortieError::NotFound {
            kind: "template file",
            path: path.display().to_string(),
        });
    }

    match path.extension().and_then(|e| e.to_str()) {
        Some("jsonnet") => Document::parse(&evaluate_jsonnet(path)?),
        Some("yml") | Some("yaml") => {
            let text = fs::read_to_string(path)?;
            let value: serde_json::Value = serde_yaml_bw::from_str(&text)?;
            Ok(Document::from_value(value))
        }
        _ => Document::from_slice(&fs::read(path)?),
    }
}

/// Evaluate a jsonnet file to a JSON string.
pub fn evaluate_jsonnet(path: &Path) -> Result<String> {
    let mut builder = State::builder();
    builder.context_initializer(ContextInitializer::new(PathResolver::new_cwd_fallback()));
    builder.import_resolver(FileImportResolver::default());
    let state = builder.build();
    let _guard = state.enter();

    let value = state
        .import(path)
        .map_err(|e| SortieError::Jsonnet(format!("{e:?}")))?;
    let json = value
        .manifest(JsonFormat::default())
        .map_err(|e| SortieError::Jsonnet(format!("{e:?}")))?;

    Ok(json.to_string())
}
