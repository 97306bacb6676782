use std::path::Path;
use std::sync::Arc;

use classes::ClassHandlerRegistry;
use ir::{File, Value};
use registry::Registry;

use crate::error::ReaderError;
use crate::interface_reader;
use crate::keys;
use crate::type_reader;

fn as_str(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s),
        _ => None,
    }
}

/// Reads one IDL file's bytes into a registered [`File`], without
/// reading any of its types yet. Idempotent:
/// an already-loaded path is returned as-is.
pub fn load_file(registry: &Registry, path: &Path) -> Result<Arc<File>, ReaderError> {
    if let Some(file) = registry.file(path) {
        return Ok(file);
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|source| ReaderError::Io { path: path.to_path_buf(), source })?;
    let body: Value = serde_yaml::from_str(&contents)
        .map_err(|source| ReaderError::Yaml { path: path.to_path_buf(), source })?;

    let Value::Dictionary(fields) = &body else {
        return Err(ReaderError::InvalidMeta(format!("'{}' must be a mapping at its root", path.display())));
    };
    let Some(Value::Dictionary(meta)) = fields.get("meta") else {
        return Err(ReaderError::InvalidMeta(format!("'{}' is missing a 'meta' section", path.display())));
    };

    let version = match meta.get("version") {
        Some(Value::Uint64(v)) if *v >= 1 => *v as u32,
        Some(Value::Int64(v)) if *v >= 1 => *v as u32,
        _ => {
            return Err(ReaderError::InvalidMeta(format!(
                "'{}' meta.version must be a positive integer",
                path.display()
            )))
        }
    };
    let namespace = meta.get("namespace").and_then(as_str).map(str::to_string);
    let description = meta.get("description").and_then(as_str).unwrap_or_default().to_string();
    let uses = match meta.get("use") {
        Some(Value::Array(items)) => items.iter().filter_map(as_str).map(str::to_string).collect(),
        Some(_) => return Err(ReaderError::InvalidMeta("'meta.use' must be an array of strings".to_string())),
        None => Vec::new(),
    };

    let file = Arc::new(File::new(path.to_path_buf(), namespace, version, description, uses, body));
    registry.insert_file(file.clone());
    logging::trace("reader", &format!("loaded {}", path.display()));
    Ok(file)
}

/// Loads every `.yaml` file under `root`, then reads all of their
/// top-level types and interfaces:
/// subdirectories are descended first, the load phase runs to
/// completion for every file, and only then does a second pass read
/// bodies — so one file's types can reference another's regardless of
/// walk order.
pub fn load_directory(
    registry: &Registry,
    handlers: &ClassHandlerRegistry,
    root: &Path,
) -> Result<Vec<Arc<File>>, ReaderError> {
    let paths = path::walk_yaml_files(root).map_err(|source| ReaderError::Io { path: root.to_path_buf(), source })?;
    let mut loaded = Vec::with_capacity(paths.len());
    for p in &paths {
        loaded.push(load_file(registry, p)?);
    }
    for file in &loaded {
        load_types(registry, handlers, file)?;
    }
    Ok(loaded)
}

/// Reads every top-level entry of an already-loaded file's body: `meta`
/// is skipped, `interface <Name>` entries go through the interface
/// reader, everything else through the type reader.
pub fn load_types(registry: &Registry, handlers: &ClassHandlerRegistry, file: &Arc<File>) -> Result<(), ReaderError> {
    let Value::Dictionary(fields) = &file.body else {
        return Err(ReaderError::InvalidMeta(format!("'{}' must be a mapping at its root", file.path.display())));
    };

    for (key, body) in fields {
        if key == "meta" {
            continue;
        }
        if let Some(name) = keys::parse_tagged_key("interface", key) {
            interface_reader::read_interface(registry, handlers, file, &name, body)?;
            continue;
        }
        let type_key = keys::parse_type_key(key)
            .ok_or_else(|| ReaderError::InvalidSyntax(format!("unrecognized top-level key '{key}'")))?;
        type_reader::read_type(registry, handlers, file, &type_key, body)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_file_is_idempotent_on_the_same_path() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("demo.yaml");
        std::fs::write(&file_path, "meta:\n  version: 1\n  namespace: demo\n").unwrap();

        let registry = Registry::new();
        let first = load_file(&registry, &file_path).unwrap();
        let second = load_file(&registry, &file_path).unwrap();
        assert_eq!(first.path, second.path);
        assert_eq!(registry.all_files().len(), 1);
    }

    #[test]
    fn load_file_rejects_a_file_with_no_meta_section() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("demo.yaml");
        std::fs::write(&file_path, "struct Point: {members: {}}\n").unwrap();

        let registry = Registry::new();
        assert!(load_file(&registry, &file_path).is_err());
    }

    #[test]
    fn load_directory_reads_every_file_and_its_types() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("demo.yaml"),
            "meta:\n  version: 1\n  namespace: demo\nstruct Point:\n  members:\n    x: {type: int64}\n    y: {type: int64}\n",
        )
        .unwrap();

        let registry = Registry::new();
        let handlers = ClassHandlerRegistry::with_builtins();
        let files = load_directory(&registry, &handlers, dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(registry.get_type("demo.Point").is_some());
    }
}
