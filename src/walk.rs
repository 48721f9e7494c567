//! Recursive discovery of input files.

use crate::error::{EtlError, Result};
use glob::{glob, Pattern};
use std::io;
use std::path::{Path, PathBuf};

pub const DATA_EXTENSION: &str = "json";

/// All `*.json` files under `root` at any depth, as absolute paths in
/// lexicographic order. An existing root with no matches yields an empty list.
pub fn find_json_files(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.is_dir() {
        let source = match std::fs::metadata(root) {
            Ok(_) => io::Error::new(io::ErrorKind::Other, "not a directory"),
            Err(e) => e,
        };
        return Err(EtlError::fs(root, source));
    }
    let root = std::fs::canonicalize(root).map_err(|e| EtlError::fs(root, e))?;

    let pattern = format!(
        "{}/**/*.{}",
        Pattern::escape(&root.to_string_lossy()),
        DATA_EXTENSION
    );
    let entries = glob(&pattern).map_err(|e| {
        EtlError::fs(&root, io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            EtlError::fs(&path, io::Error::from(e))
        })?;
        if path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_finds_nested_json_only() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("A").join("B");
        fs::create_dir_all(&nested).unwrap();
        fs::write(dir.path().join("top.json"), "{}").unwrap();
        fs::write(nested.join("deep.json"), "{}").unwrap();
        fs::write(nested.join("notes.txt"), "x").unwrap();
        fs::write(nested.join("data.json.bak"), "x").unwrap();

        let files = find_json_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|p| p.is_absolute()));
        assert!(files.iter().any(|p| p.ends_with("A/B/deep.json")));
        assert!(files.iter().any(|p| p.ends_with("top.json")));
    }

    #[test]
    fn test_order_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["c.json", "a.json", "b.json"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        let first = find_json_files(dir.path()).unwrap();
        let second = find_json_files(dir.path()).unwrap();
        assert_eq!(first, second);
        let names: Vec<_> = first
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.json", "b.json", "c.json"]);
    }

    #[test]
    fn test_empty_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(find_json_files(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_missing_root_is_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = find_json_files(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, EtlError::FileSystem { .. }));
    }

    #[test]
    fn test_file_root_is_filesystem_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("one.json");
        fs::write(&file, "{}").unwrap();
        assert!(matches!(
            find_json_files(&file).unwrap_err(),
            EtlError::FileSystem { .. }
        ));
    }
}
