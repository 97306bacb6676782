use std::path::PathBuf;

use classes::ClassError;
use ir::IrError;
use registry::RegistryError;

/// Errors from loading, reading, or instantiating schema.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    /// A declaration key or type expression could not be parsed.
    #[error("invalid syntax: {0}")]
    InvalidSyntax(String),
    /// A name did not resolve after fuzzy lookup and chain-load.
    #[error("unknown type: {0}")]
    UnknownType(String),
    /// A generic type expression supplied the wrong number of arguments.
    #[error("'{name}' expects {expected} generic argument(s), found {actual}")]
    ArityMismatch {
        /// The generic type's name.
        name: String,
        /// Declared parameter count.
        expected: usize,
        /// Supplied argument count.
        actual: usize,
    },
    /// A file's `meta` section was missing or malformed.
    #[error("invalid meta section: {0}")]
    InvalidMeta(String),
    /// A fully-qualified name was declared a second time with a
    /// different body.
    #[error("'{name}' was already declared, at {origin}")]
    DuplicateDefinition {
        /// The conflicting fully-qualified name.
        name: String,
        /// Where it was first declared.
        origin: String,
    },
    /// A class handler rejected a member, a value, or a wire form.
    #[error(transparent)]
    Class(#[from] ClassError),
    /// A registry lookup failed outright.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// A value carried data that couldn't be decoded (date, binary).
    #[error(transparent)]
    Ir(#[from] IrError),
    /// Reading a schema file from disk failed.
    #[error("failed to read '{path}': {source}")]
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
    /// A schema file's contents did not parse as YAML.
    #[error("failed to parse '{path}' as YAML: {source}")]
    Yaml {
        /// The file that failed to parse.
        path: PathBuf,
        /// The underlying YAML error.
        source: serde_yaml::Error,
    },
}
