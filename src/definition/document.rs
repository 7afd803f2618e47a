//! Opaque JSON document with a narrow accessor surface.
//!
//! Every definition handled by the composer is a pass-through payload for
//! ecspresso and the ECS control plane, which own the schema. The engine
//! therefore never models them as typed structs: a `Document` only knows
//! how to merge-patch itself (RFC 7396) and answer a few shallow lookups.

use serde_json::Value;

use crate::error::{Result, SortieError};

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    value: Value,
}

impl Document {
    pub fn from_value(value: Value) -> Self {
        Self { value }
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            value: serde_json::from_slice(bytes)?,
        })
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(Self {
            value: serde_json::from_str(text)?,
        })
    }

    /// Apply a JSON merge patch (RFC 7396): null deletes a key, objects
    /// merge recursively, arrays and scalars replace wholesale.
    ///
    /// Empty patch text is a no-op. This is the universal guard applied
    /// before every optional override layer, so `merge(doc, "") == doc`
    /// holds for all documents.
    pub fn merge(&mut self, patch_text: &str) -> Result<()> {
        let patch_text = patch_text.trim();

        if patch_text.is_empty() {
            return Ok(());
        }

        let patch = parse_patch(patch_text)?;
        json_patch::merge(&mut self.value, &patch);

        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.value.get(key)
    }

    /// Shallow string lookup. Non-string values answer `None`, matching
    /// the behavior consumers rely on for file-name pointers.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.value.get(key).and_then(Value::as_str)
    }

    pub fn remove(&mut self, key: &str) {
        if let Some(map) = self.value.as_object_mut() {
            map.remove(key);
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.value.to_string().into_bytes()
    }

    pub fn pretty_json(&self) -> String {
        serde_json::to_string_pretty(&self.value).unwrap_or_else(|_| self.value.to_string())
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_bw::to_string(&self.value)?)
    }
}

/// Patch text may be JSON or YAML; JSON is tried first so its parse
/// errors are the ones reported for malformed input.
fn parse_patch(text: &str) -> Result<Value> {
    match serde_json::from_str(text) {
        Ok(v) => Ok(v),
        Err(json_err) => serde_yaml_bw::from_str(text).map_err(|yaml_err| {
            SortieError::InvalidDocument(format!(
                "invalid merge patch: {json_err} (as YAML: {yaml_err})"
            ))
        }),
    }
}
