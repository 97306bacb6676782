use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use crate::{Interface, Type, Value};

/// One loaded IDL source.
///
/// Created once per distinct path; reloading the same path is idempotent
/// (the loader checks the registry's `files` map before re-reading).
pub struct File {
    /// Filesystem path this file was loaded from.
    pub path: PathBuf,
    /// Optional namespace prefix qualifying every type and interface this
    /// file declares.
    pub namespace: Option<String>,
    /// `meta.version`, required to be at least 1.
    pub version: u32,
    /// `meta.description`, if present.
    pub description: String,
    /// `meta.use`: namespace prefixes searched, in order, during
    /// unqualified lookups originating from this file.
    pub uses: Vec<String>,
    /// The parsed root mapping, before any type has been read from it.
    pub body: Value,
    types: RwLock<BTreeMap<String, Arc<Type>>>,
    interfaces: RwLock<BTreeMap<String, Arc<Interface>>>,
}

impl std::fmt::Debug for File {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("File")
            .field("path", &self.path)
            .field("namespace", &self.namespace)
            .field("version", &self.version)
            .finish()
    }
}

impl File {
    /// Builds a `File` record from a `meta` header and the pre-parsed
    /// body it was read from.
    pub fn new(
        path: PathBuf,
        namespace: Option<String>,
        version: u32,
        description: String,
        uses: Vec<String>,
        body: Value,
    ) -> Self {
        Self {
            path,
            namespace,
            version,
            description,
            uses,
            body,
            types: RwLock::new(BTreeMap::new()),
            interfaces: RwLock::new(BTreeMap::new()),
        }
    }

    /// Qualifies a local name under this file's namespace, if it has one.
    pub fn qualify(&self, local_name: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}.{local_name}"),
            None => local_name.to_string(),
        }
    }

    /// Fully-qualified names to `Type`s declared directly in this file.
    pub fn types(&self) -> BTreeMap<String, Arc<Type>> {
        self.types.read().expect("file types lock poisoned").clone()
    }

    /// Records a type as declared in this file. Called once per type read
    /// from this file's body.
    pub fn insert_type(&self, name: impl Into<String>, ty: Arc<Type>) {
        self.types.write().expect("file types lock poisoned").insert(name.into(), ty);
    }

    /// Fully-qualified names to `Interface`s declared directly in this
    /// file.
    pub fn interfaces(&self) -> BTreeMap<String, Arc<Interface>> {
        self.interfaces.read().expect("file interfaces lock poisoned").clone()
    }

    /// Records an interface as declared in this file.
    pub fn insert_interface(&self, name: impl Into<String>, interface: Arc<Interface>) {
        self.interfaces
            .write()
            .expect("file interfaces lock poisoned")
            .insert(name.into(), interface);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_file(namespace: Option<&str>) -> File {
        File::new(
            PathBuf::from("demo.yaml"),
            namespace.map(str::to_string),
            1,
            String::new(),
            Vec::new(),
            Value::Dictionary(BTreeMap::new()),
        )
    }

    #[test]
    fn qualify_prefixes_with_namespace_when_set() {
        let f = empty_file(Some("demo"));
        assert_eq!(f.qualify("Point"), "demo.Point");
    }

    #[test]
    fn qualify_is_identity_without_namespace() {
        let f = empty_file(None);
        assert_eq!(f.qualify("Point"), "Point");
    }

    #[test]
    fn types_index_starts_empty_and_accumulates() {
        let f = empty_file(Some("demo"));
        assert!(f.types().is_empty());
        f.insert_type("demo.Point", Arc::new(Type::builtin("demo.Point")));
        assert_eq!(f.types().len(), 1);
    }
}
