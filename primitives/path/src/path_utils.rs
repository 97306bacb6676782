// SPDX-License-Identifier: CC0-1.0

//! Path utility functions for finding the workspace root and walking IDL
//! directory trees.

use std::path::{Path, PathBuf};

/// Find the workspace root by looking for the root `Cargo.toml`.
///
/// Walks up the directory tree from the current directory until it finds a
/// `Cargo.toml` containing `[workspace]`.
pub fn find_project_root() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = std::env::current_dir()?;
    loop {
        let cargo_toml = current.join("Cargo.toml");
        if cargo_toml.exists() {
            let contents = std::fs::read_to_string(&cargo_toml)?;
            if contents.contains("[workspace]") {
                return Ok(current);
            }
        }
        if !current.pop() {
            return Err("Could not find workspace root (no workspace Cargo.toml found)".into());
        }
    }
}

/// Recursively collects every `.yaml` file under `root`, in directory-walk
/// order.
///
/// Mirrors the schema loader's directory phase: subdirectories are descended first, and only files
/// whose name ends in `.yaml` are considered — everything else is skipped
/// silently.
pub fn walk_yaml_files(root: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    walk_yaml_files_into(root, &mut out)?;
    Ok(out)
}

fn walk_yaml_files_into(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    let mut entries: Vec<_> = std::fs::read_dir(dir)?.collect::<Result<_, _>>()?;
    entries.sort_by_key(|e| e.file_name());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            walk_yaml_files_into(&path, out)?;
            continue;
        }

        if path.extension().and_then(|e| e.to_str()) == Some("yaml") {
            out.push(path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walk_finds_only_yaml_files_recursively() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a.yaml"), "meta: {}").expect("write a.yaml");
        std::fs::write(dir.path().join("readme.txt"), "not idl").expect("write readme.txt");
        let sub = dir.path().join("nested");
        std::fs::create_dir(&sub).expect("mkdir nested");
        std::fs::write(sub.join("b.yaml"), "meta: {}").expect("write b.yaml");

        let found = walk_yaml_files(dir.path()).expect("walk");
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|p| p.extension().and_then(|e| e.to_str()) == Some("yaml")));
    }

    #[test]
    fn walk_of_empty_directory_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(walk_yaml_files(dir.path()).expect("walk").is_empty());
    }
}
