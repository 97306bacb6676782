#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! The schema loader, type reader, and generic type instantiator: turns
//! IDL files on disk into registered [`ir::Type`]s and
//! [`ir::Interface`]s, and turns type expression strings into
//! [`ir::TypeInstance`]s.
//!
//! These three concerns share one crate rather than three because
//! they're mutually recursive: reading a type's members calls back
//! into instantiation to resolve each member's declared type, chain
//! loading a missing name calls back into the type reader to read it on
//! demand, and instantiating a generic argument recurses into itself.
//! Splitting them across crate boundaries would have turned that
//! recursion into a dependency cycle between crates; keeping it as
//! module-level recursion inside one crate keeps the graph acyclic
//! without changing any of the actual control flow.

mod error;
mod expr;
mod interface_reader;
mod keys;
mod loader;
mod lookup;
mod type_reader;

pub mod instantiate;

pub use error::ReaderError;
pub use expr::parse as parse_type_expression;
pub use keys::{parse_tagged_key, parse_type_key, TypeKey};
pub use lookup::find_type;

use std::path::Path;
use std::sync::Arc;

use classes::ClassHandlerRegistry;
use ir::{File, Type, TypeInstance};
use registry::Registry;

/// Owns a [`Registry`] and the built-in class handlers, and exposes the
/// schema loader's process-wide operations: `load_types`, `load_types` over a directory, and
/// `instantiate`.
pub struct Reader {
    /// The registry this reader fills and resolves against.
    pub registry: Registry,
    handlers: ClassHandlerRegistry,
}

impl Reader {
    /// A fresh reader over a fresh registry, seeded with the builtins
    /// and the five built-in class handlers.
    pub fn new() -> Self {
        Self { registry: Registry::new(), handlers: ClassHandlerRegistry::with_builtins() }
    }

    /// Loads one IDL file's raw body, without reading any of its types
    /// yet. Idempotent on an already-loaded path.
    pub fn load_file(&self, path: &Path) -> Result<Arc<File>, ReaderError> {
        loader::load_file(&self.registry, path)
    }

    /// Loads every `.yaml` file under `root`, then reads all of their
    /// top-level types and interfaces.
    pub fn load_directory(&self, root: &Path) -> Result<Vec<Arc<File>>, ReaderError> {
        loader::load_directory(&self.registry, &self.handlers, root)
    }

    /// Reads every top-level type and interface declared in an
    /// already-loaded file's body.
    pub fn load_types(&self, file: &Arc<File>) -> Result<(), ReaderError> {
        loader::load_types(&self.registry, &self.handlers, file)
    }

    /// Resolves a type expression string to a [`TypeInstance`] in the
    /// lexical context of `parent_instance`/`prototype`/`origin`
    /// .
    pub fn instantiate(
        &self,
        decl: &str,
        parent_instance: Option<&Arc<TypeInstance>>,
        prototype: Option<&Arc<Type>>,
        origin: Option<&Arc<File>>,
    ) -> Result<Arc<TypeInstance>, ReaderError> {
        instantiate::instantiate(&self.registry, &self.handlers, decl, parent_instance, prototype, origin)
    }
}

impl Default for Reader {
    fn default() -> Self {
        Self::new()
    }
}
