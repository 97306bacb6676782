#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! The typing core's per-class extension mechanism.
//!
//! A [`ClassHandler`] supplies the three genuinely class-specific
//! behaviors the reader, validator, and codec dispatch into: parsing one
//! member from a type's declared body, validating a value once its
//! declared type is known to be structurally compatible, and — for the
//! handful of classes whose wire form isn't generic recursion —
//! serializing and deserializing. The struct/union/typedef default wire
//! form needs no per-class code (it's "recurse into children, (re)attach
//! the instance"), so `serialize`/`deserialize` carry default bodies and
//! only [`handlers::BuiltinHandler`] overrides them, for the scalar
//! kinds that need `%type`/`%value` wrapping and type-specific decoding.
//!
//! This crate also defines [`Validator`], the composable named-constraint
//! mechanism `run_validators` dispatches into, keyed by `(wire type name,
//! constraint name)`.
//!
//! Both traits take their recursive or type-resolving collaborator as an
//! injected closure rather than a crate dependency: `parse_member` needs
//! the instantiator, `validate`/`serialize`/`deserialize` need to recurse
//! back into the orchestrating function that dispatched to them in the
//! first place. Threading those as closures keeps this
//! crate a leaf dependency of the reader, validator, and codec crates
//! instead of a dependency cycle between them.

mod handlers;
mod validator;

pub use handlers::{BuiltinHandler, EnumHandler, StructHandler, TypedefHandler, UnionHandler};
pub use validator::{run_validators, Validator, ValidatorRegistry};

use std::collections::HashMap;
use std::sync::Arc;

use ir::{Class, ErrorContext, Member, Type, TypeInstance, Value};

/// Errors a class handler can report.
#[derive(Debug, thiserror::Error)]
pub enum ClassError {
    /// A member's body was missing a required field, e.g. `type` on a
    /// struct/union field.
    #[error("member '{0}' is missing required field '{1}'")]
    MissingField(String, &'static str),
    /// This class does not support the requested operation, e.g. a
    /// builtin or enum declaring `members`.
    #[error("{0}")]
    Unsupported(String),
    /// The injected type-resolving closure failed.
    #[error("cannot resolve type: {0}")]
    Resolve(String),
    /// A scalar carrier's `%value` did not decode, e.g. a malformed RFC
    /// 3339 date or base64 blob.
    #[error("cannot decode {0} value: {1}")]
    Decode(&'static str, String),
}

/// A closure-injected instantiator: turns a type-expression string into a
/// `TypeInstance`, resolved in whatever lexical context the caller (the
/// reader) has in scope.
pub type Resolve<'a> = dyn FnMut(&str) -> Result<Arc<TypeInstance>, ClassError> + 'a;

/// A closure-injected recursive validator: validates one nested value
/// against its declared type, threading the same flat `ErrorContext`.
/// Ultimately just the orchestrating `validate_instance` function,
/// passed back down so a struct/union handler can validate its own
/// members without this crate depending on the validator crate.
pub type Recurse<'a> = dyn FnMut(&Arc<TypeInstance>, &ir::RpcObject, &mut ErrorContext) -> bool + 'a;

/// A closure-injected recursive serializer, passed back down from the
/// orchestrating `serialize` function.
pub type RecurseSerialize<'a> = dyn FnMut(&ir::RpcObject) -> Value + 'a;

/// A closure-injected recursive deserializer, passed back down from the
/// orchestrating `deserialize` function. Fallible: a scalar carrier's
/// `%value` may fail to parse (e.g. a malformed RFC 3339 date or base64
/// blob).
pub type RecurseDeserialize<'a> = dyn FnMut(Value) -> Result<ir::RpcObject, ClassError> + 'a;

/// Per-class strategy for member parsing, validation, and (de)serialization.
pub trait ClassHandler: Send + Sync {
    /// The class this handler implements.
    fn class(&self) -> Class;

    /// Parses one entry from a type's `members` mapping into a [`Member`].
    fn parse_member(
        &self,
        name: &str,
        body: &Value,
        owning_type: &Arc<Type>,
        resolve: &mut Resolve<'_>,
    ) -> Result<Member, ClassError>;

    /// Validates `value` against `instance`, which is already known to be
    /// structurally compatible. Any failure must
    /// append at least one error to `ctx` and return `false`; never fails
    /// fast.
    fn validate(
        &self,
        instance: &Arc<TypeInstance>,
        value: &ir::RpcObject,
        ctx: &mut ErrorContext,
        recurse: &mut Recurse<'_>,
    ) -> bool;

    /// Converts an in-memory typed value into wire form.
    /// The default handles every class whose wire form is "recurse into
    /// dictionary children, tag with `%type`": struct, union, typedef
    /// (post-unwind, so effectively unreachable), and enum's single
    /// string variant. Only [`BuiltinHandler`] needs to override this,
    /// for scalar wrapping and the `dictionary`/`array` untagged forms.
    fn serialize(
        &self,
        instance: &Arc<TypeInstance>,
        value: &ir::RpcObject,
        recurse: &mut RecurseSerialize<'_>,
    ) -> Value {
        handlers::default_serialize(instance, value, recurse)
    }

    /// The inverse of `serialize`. `remainder` is the value's fields with
    /// the `%type` tag already detached by the caller.
    fn deserialize(
        &self,
        instance: Arc<TypeInstance>,
        remainder: Value,
        recurse: &mut RecurseDeserialize<'_>,
    ) -> Result<ir::RpcObject, ClassError> {
        handlers::default_deserialize(instance, remainder, recurse)
    }
}

/// Dispatch table from [`Class`] to its [`ClassHandler`].
pub struct ClassHandlerRegistry {
    handlers: HashMap<Class, Box<dyn ClassHandler>>,
}

impl ClassHandlerRegistry {
    /// The five built-in handlers (struct, union, enum, typedef,
    /// builtin), one per `Class` variant.
    pub fn with_builtins() -> Self {
        let mut handlers: HashMap<Class, Box<dyn ClassHandler>> = HashMap::new();
        handlers.insert(Class::Struct, Box::new(StructHandler));
        handlers.insert(Class::Union, Box::new(UnionHandler));
        handlers.insert(Class::Enum, Box::new(EnumHandler));
        handlers.insert(Class::Typedef, Box::new(TypedefHandler));
        handlers.insert(Class::Builtin, Box::new(BuiltinHandler));
        Self { handlers }
    }

    /// The handler registered for `class`.
    pub fn get(&self, class: Class) -> &dyn ClassHandler {
        self.handlers
            .get(&class)
            .map(|h| h.as_ref())
            .unwrap_or_else(|| panic!("no class handler registered for {class:?}"))
    }
}

impl Default for ClassHandlerRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
