//! Profile listing: each subdirectory of the config root is a profile.

use std::fs;
use std::path::Path;

use crate::error::{Result, SortieError};

pub fn list(conf_dir: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(conf_dir)
        .map_err(|e| SortieError::Other(format!("failed to list profiles: {e}")))?;

    let mut names = Vec::new();

    for entry in entries {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    names.sort();

    Ok(names)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn lists_only_directories_sorted() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("staging")).unwrap();
        fs::create_dir(dir.path().join("production")).unwrap();
        fs::write(dir.path().join("ecspresso.yml"), "cluster: a\n").unwrap();

        let names = list(dir.path()).unwrap();

        assert_eq!(names, vec!["production", "staging"]);
    }

    #[test]
    fn missing_root_is_an_error() {
        let dir = TempDir::new().unwrap();

        let err = list(&dir.path().join("absent")).unwrap_err();

        assert!(err.to_string().contains("failed to list profiles"));
    }
}
