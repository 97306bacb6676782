#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! The typing core's process-wide registry: keyed stores of `File`, `Type`,
//! `Interface`, and a cache of non-generic `TypeInstance`s, guarded by a
//! single-writer/multi-reader discipline.
//!
//! Each store is its own `RwLock` rather than one lock over a combined
//! struct, because the four stores are filled and read independently —
//! resolving a type name that chain-loads a missing dependency only
//! ever needs to write `types`, and holding one lock for all four would
//! serialize readers of `interfaces` behind a type-reader write they
//! have nothing to do with.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use ir::{File, Interface, Type, TypeInstance, Value};

/// The fourteen pre-registered primitive types, created
/// before any file is loaded.
pub const BUILTIN_TYPES: &[&str] = &[
    "nulltype", "bool", "uint64", "int64", "double", "date", "string", "binary", "fd",
    "dictionary", "array", "shmem", "error", "any",
];

/// Errors a registry lookup can report.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No type is registered under this fully-qualified name, even after a
    /// chain-load attempt.
    #[error("unknown type: {0}")]
    UnknownType(String),
    /// No interface is registered under this fully-qualified name.
    #[error("unknown interface: {0}")]
    UnknownInterface(String),
}

/// Process-wide registry of loaded files, declared types and interfaces,
/// and the non-generic type-instance cache.
#[derive(Default)]
pub struct Registry {
    files: RwLock<BTreeMap<PathBuf, Arc<File>>>,
    types: RwLock<BTreeMap<String, Arc<Type>>>,
    declared_bodies: RwLock<BTreeMap<String, Value>>,
    interfaces: RwLock<BTreeMap<String, Arc<Interface>>>,
    instance_cache: RwLock<BTreeMap<String, Arc<TypeInstance>>>,
}

impl Registry {
    /// A fresh registry seeded with the fourteen builtin types and nothing
    /// else. Mirrors `rpct_init()`: builtins exist before any file is
    /// loaded.
    pub fn new() -> Self {
        let registry = Self::default();
        for name in BUILTIN_TYPES {
            registry.insert_type(Arc::new(Type::builtin(*name)));
        }
        registry
    }

    fn files(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<PathBuf, Arc<File>>> {
        self.files.read().expect("registry files lock poisoned")
    }

    /// A previously loaded file by its path, if any.
    pub fn file(&self, path: &Path) -> Option<Arc<File>> {
        self.files().get(path).cloned()
    }

    /// Every loaded file, in path order.
    pub fn all_files(&self) -> Vec<Arc<File>> {
        self.files().values().cloned().collect()
    }

    /// Registers a newly loaded file. Idempotent at the loader's
    /// discretion — this call always overwrites; the loader checks
    /// `file()` first to decide whether to call it at all.
    pub fn insert_file(&self, file: Arc<File>) {
        self.files.write().expect("registry files lock poisoned").insert(file.path.clone(), file);
    }

    /// A registered type by its fully-qualified name.
    pub fn get_type(&self, name: &str) -> Option<Arc<Type>> {
        self.types.read().expect("registry types lock poisoned").get(name).cloned()
    }

    /// `get_type`, failing with [`RegistryError::UnknownType`] instead of
    /// `None`. Used after fuzzy lookup and chain-load have both been
    /// exhausted.
    pub fn require_type(&self, name: &str) -> Result<Arc<Type>, RegistryError> {
        self.get_type(name).ok_or_else(|| RegistryError::UnknownType(name.to_string()))
    }

    /// Every registered type, keyed by fully-qualified name.
    pub fn all_types(&self) -> BTreeMap<String, Arc<Type>> {
        self.types.read().expect("registry types lock poisoned").clone()
    }

    /// Registers a type skeleton or a fully-read type under its
    /// fully-qualified name. The reader calls this once, immediately after
    /// allocating the skeleton, so a
    /// re-entrant lookup from within the same read can observe it.
    pub fn insert_type(&self, ty: Arc<Type>) {
        self.types.write().expect("registry types lock poisoned").insert(ty.name.clone(), ty);
    }

    /// True if a type with this fully-qualified name is already
    /// registered.
    pub fn has_type(&self, name: &str) -> bool {
        self.types.read().expect("registry types lock poisoned").contains_key(name)
    }

    /// The raw `<decl, body>` a type was first declared with, if the
    /// reader has recorded one. Builtins and types registered without a
    /// call to [`Registry::record_declared_body`] have none.
    pub fn declared_body(&self, name: &str) -> Option<Value> {
        self.declared_bodies.read().expect("registry bodies lock poisoned").get(name).cloned()
    }

    /// Records the body a fully-qualified name was first declared with,
    /// so a later re-declaration under the same name can be compared
    /// against it. The reader calls this once, right after registering
    /// the type's skeleton.
    pub fn record_declared_body(&self, name: &str, body: Value) {
        self.declared_bodies.write().expect("registry bodies lock poisoned").insert(name.to_string(), body);
    }

    /// A registered interface by its fully-qualified name.
    pub fn get_interface(&self, name: &str) -> Option<Arc<Interface>> {
        self.interfaces.read().expect("registry interfaces lock poisoned").get(name).cloned()
    }

    /// `get_interface`, failing with [`RegistryError::UnknownInterface`]
    /// instead of `None`.
    pub fn require_interface(&self, name: &str) -> Result<Arc<Interface>, RegistryError> {
        self.get_interface(name).ok_or_else(|| RegistryError::UnknownInterface(name.to_string()))
    }

    /// Every registered interface, keyed by fully-qualified name.
    pub fn all_interfaces(&self) -> BTreeMap<String, Arc<Interface>> {
        self.interfaces.read().expect("registry interfaces lock poisoned").clone()
    }

    /// Registers an interface under its fully-qualified name.
    pub fn insert_interface(&self, interface: Arc<Interface>) {
        self.interfaces
            .write()
            .expect("registry interfaces lock poisoned")
            .insert(interface.name.clone(), interface);
    }

    /// A cached non-generic `TypeInstance` by its canonical form.
    pub fn cached_instance(&self, canonical_form: &str) -> Option<Arc<TypeInstance>> {
        self.instance_cache
            .read()
            .expect("registry instance cache lock poisoned")
            .get(canonical_form)
            .cloned()
    }

    /// Inserts a non-generic, fully concrete `TypeInstance` into the
    /// cache, keyed by its canonical form. Only the instantiator calls
    /// this, and only once per distinct canonical form.
    pub fn cache_instance(&self, instance: Arc<TypeInstance>) {
        self.instance_cache
            .write()
            .expect("registry instance cache lock poisoned")
            .insert(instance.canonical_form().to_string(), instance);
    }
}
