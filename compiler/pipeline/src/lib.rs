#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Ties the reader, validator, and codec into the typing core's
//! process-wide surface and the two RPC call hooks.
//!
//! [`Engine`] owns the one [`reader::Reader`] (and, in turn, the one
//! [`Registry`]) a process needs, plus a second [`ClassHandlerRegistry`]
//! for the call hooks' own dispatch into `rpct-validate`. Everything
//! else in this workspace is handed an explicit reference to one or both
//! rather than reaching for global state, mirroring the original's
//! single `context` pointer allocated by `rpct_init()` and freed by
//! `rpct_free()`.

use std::path::Path;
use std::sync::Arc;

use classes::ClassHandlerRegistry;
use ir::{ErrorContext, File, InterfaceMember, RpcObject, Value};
use registry::Registry;

/// Errors surfaced at the engine boundary, aggregating every sub-crate's
/// own error type into one `#[from]`-based enum.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Propagated from loading or instantiating a type.
    #[error(transparent)]
    Reader(#[from] reader::ReaderError),
    /// Propagated from serializing or deserializing a value.
    #[error(transparent)]
    Codec(#[from] codec::CodecError),
    /// `set_realm` is always rejected: there is no realm registry to
    /// check a name against.
    #[error("no such realm")]
    RealmNotFound,
    /// `load_types_stream` has no implementation, matching the
    /// original's own `rpct_load_types_stream`, which unconditionally
    /// returns `ENOTSUP`.
    #[error("loading types from a stream is not supported")]
    StreamUnsupported,
    /// `pre_call_hook` rejected the call's arguments.
    #[error("validation failed: {0} error(s)")]
    InvalidArguments(usize),
    /// `post_call_hook` rejected the call's return value.
    #[error("return value validation failed: {0} error(s)")]
    InvalidReturn(usize),
}

/// Identifies the interface member an in-flight call is dispatching to,
/// the way `rpc_inbound_call` carries `ric_interface`/`ric_name`.
#[derive(Debug, Clone)]
pub struct Call {
    /// Fully-qualified interface name.
    pub interface: String,
    /// Method, property, or event name within that interface.
    pub name: String,
}

/// Iterates a loaded file's body per `next()` call, the streaming
/// reframing of the original's `download` interface member.
pub struct DownloadIdl {
    files: std::vec::IntoIter<Arc<File>>,
}

impl Iterator for DownloadIdl {
    type Item = Value;

    fn next(&mut self) -> Option<Self::Item> {
        self.files.next().map(|f| f.body.clone())
    }
}

/// Owns the reader (and, through it, the registry) plus the class
/// handlers for one process.
pub struct Engine {
    reader: reader::Reader,
    handlers: ClassHandlerRegistry,
}

impl Engine {
    /// Allocates a fresh engine, seeded with the builtin types and the
    /// five built-in class handlers. Unlike the
    /// original's `rpct_init()`, this does not also load a hardcoded
    /// system directory — `rpct-config`'s `search_paths` makes that
    /// configurable instead of baked in.
    pub fn init() -> Self {
        Self { reader: reader::Reader::new(), handlers: ClassHandlerRegistry::with_builtins() }
    }

    /// The registry this engine loads types and interfaces into.
    pub fn registry(&self) -> &Registry {
        &self.reader.registry
    }

    /// Loads one IDL file or every `.yaml` file under a directory,
    /// reading all of their top-level types and interfaces.
    pub fn load_types(&self, path: &Path) -> Result<Vec<Arc<File>>, EngineError> {
        if path.is_dir() {
            return Ok(self.reader.load_directory(path)?);
        }
        let file = self.reader.load_file(path)?;
        self.reader.load_types(&file)?;
        Ok(vec![file])
    }

    /// Always fails: the original's own `rpct_load_types_stream` returns
    /// `ENOTSUP` unconditionally (`examples/original_source`).
    pub fn load_types_stream(&self) -> Result<(), EngineError> {
        Err(EngineError::StreamUnsupported)
    }

    /// Always fails: there is no realm registry to validate a name
    /// against.
    pub fn set_realm(&self, _name: &str) -> Result<(), EngineError> {
        Err(EngineError::RealmNotFound)
    }

    /// Streams every loaded file's body back to the caller, one per
    /// `next()` call.
    pub fn download_idl(&self) -> DownloadIdl {
        DownloadIdl { files: self.reader.registry.all_files().into_iter() }
    }

    /// Converts an in-memory typed value into wire form.
    pub fn serialize(&self, value: &RpcObject) -> Value {
        codec::serialize(&self.handlers, value)
    }

    /// Converts a wire-form value into an in-memory typed value.
    pub fn deserialize(&self, value: Value) -> Result<RpcObject, EngineError> {
        Ok(codec::deserialize(&self.reader.registry, &self.handlers, value)?)
    }

    /// Resolves `type_name` to a concrete [`ir::TypeInstance`], the way a
    /// caller must before attaching it to a bare literal via
    /// [`RpcObject::typed`] ahead of a [`Engine::validate`] call — a
    /// literal parsed straight off the wire or a CLI flag carries no
    /// `TypeInstance` of its own, and `validate_instance`'s untyped
    /// branch only accepts the declared type's own wire-kind name
    /// (`dictionary`, `array`, or a builtin's own name), never an
    /// arbitrary struct/union/enum name.
    pub fn resolve_type(&self, type_name: &str) -> Result<Arc<ir::TypeInstance>, EngineError> {
        Ok(self.reader.instantiate(type_name, None, None, None)?)
    }

    /// Resolves `type_name` and validates `value` against it, without going through a call hook. Returns the accumulated
    /// path-qualified errors; an empty list means `value` is valid.
    pub fn validate(&self, type_name: &str, value: &RpcObject) -> Result<ErrorContext, EngineError> {
        let instance = self.reader.instantiate(type_name, None, None, None)?;
        let mut ctx = ErrorContext::new();
        validate::validate_instance(&self.handlers, &instance, value, &mut ctx);
        Ok(ctx)
    }

    /// Validates `args` positionally against `call`'s declared argument
    /// list. A call to an interface or
    /// member this engine has no declaration for is untyped and passes
    /// through unchecked.
    pub fn pre_call_hook(&self, call: &Call, args: &[RpcObject]) -> Result<(), EngineError> {
        let Some(interface) = self.reader.registry.get_interface(&call.interface) else {
            return Ok(());
        };
        let Some(member) = interface.members.get(&call.name) else { return Ok(()) };
        let InterfaceMember::Method { args: declared, .. } = member else { return Ok(()) };

        if args.len() > declared.len() {
            return Err(EngineError::InvalidArguments(1));
        }

        let mut ctx = ErrorContext::new();
        for (decl_arg, value) in declared.iter().zip(args) {
            ctx.scoped(&decl_arg.name, |ctx| {
                validate::validate_instance(&self.handlers, &decl_arg.ty, value, ctx)
            });
        }
        if !ctx.errors.is_empty() {
            return Err(EngineError::InvalidArguments(ctx.errors.len()));
        }
        Ok(())
    }

    /// Validates `result` against `call`'s declared return type, if any
    /// .
    pub fn post_call_hook(&self, call: &Call, result: &RpcObject) -> Result<(), EngineError> {
        let Some(interface) = self.reader.registry.get_interface(&call.interface) else {
            return Ok(());
        };
        let Some(member) = interface.members.get(&call.name) else { return Ok(()) };
        let InterfaceMember::Method { result: Some(decl_result), .. } = member else { return Ok(()) };

        let mut ctx = ErrorContext::new();
        validate::validate_instance(&self.handlers, decl_result, result, &mut ctx);
        if !ctx.errors.is_empty() {
            return Err(EngineError::InvalidReturn(ctx.errors.len()));
        }
        Ok(())
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::init()
    }
}
