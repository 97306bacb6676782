#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Data model for the typing core: the `Type`/`Member`/`TypeInstance`/
//! `Interface` family that the registry, reader, instantiator, and
//! validator crates share, plus the tagged dynamic `Value`/`RpcObject`
//! those crates validate and (de)serialize.
//!
//! This crate holds data and small invariant-preserving accessors only —
//! no lookup, no instantiation, no validation. `Value` and the type model
//! live together here rather than in separate crates because a loaded
//! [`File`]'s body is itself a `Value` tree and an [`RpcObject`] carries an
//! optional [`TypeInstance`]; splitting them apart would make the two
//! crates depend on each other.

mod diagnostics;
mod error;
mod file;
mod interface;
mod ty;
mod value;

pub use diagnostics::{ErrorContext, ValidationError};
pub use error::IrError;
pub use file::File;
pub use interface::{Argument, Interface, InterfaceMember, PropertyAccess};
pub use ty::{canonical_form_for, Class, Member, Type, TypeInstance};
pub use value::{RpcError, Shmem, Value};

use std::sync::Arc;

/// A dynamic value together with the type it was read or validated against.
///
/// Mirrors the original library's `rpc_object_t`, which plays both roles: a
/// typed value crossing an RPC boundary, and a plain node inside a freshly
/// loaded IDL file's body before any type has been attached to it.
#[derive(Debug, Clone)]
pub struct RpcObject {
    /// The underlying dynamic value.
    pub value: Value,
    /// The type this value was deserialized or validated as, if any.
    pub typei: Option<Arc<TypeInstance>>,
}

impl RpcObject {
    /// Wraps a value with no associated type.
    pub fn untyped(value: Value) -> Self {
        Self { value, typei: None }
    }

    /// Wraps a value together with the type instance it was read as.
    pub fn typed(value: Value, typei: Arc<TypeInstance>) -> Self {
        Self { value, typei: Some(typei) }
    }

    /// True if this object carries no schema information.
    pub fn is_untyped(&self) -> bool {
        self.typei.is_none()
    }

    /// The wire-type name to use when no `TypeInstance` is attached: the
    /// bare value's own kind.
    pub fn wire_type_name(&self) -> &str {
        match &self.typei {
            Some(typei) => typei.canonical_form(),
            None => self.value.wire_type_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untyped_object_reports_its_value_kind() {
        let obj = RpcObject::untyped(Value::Int64(7));
        assert!(obj.is_untyped());
        assert_eq!(obj.wire_type_name(), "int64");
    }
}
