#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Structural compatibility and value validation.
//!
//! `validate_instance` is handed an already-built `TypeInstance` tree by
//! its caller (the engine, via the reader); it never resolves a name
//! itself, so this crate needs neither `rpct-registry` nor `rpct-reader`.
//! Recursion into nested values happens through a closure passed down to
//! the dispatched [`classes::ClassHandler`], which calls back into
//! [`validate_instance`] for each of its own children — the same
//! callback-shaped iteration seam struct/union member walks need.

use std::sync::Arc;

use classes::ClassHandlerRegistry;
use ir::{ErrorContext, RpcObject, TypeInstance};

/// Structural subtype check between a declared instance and an actual
/// one, both already unwound past any typedef.
///
/// `any` is the top type. Otherwise the declared instance must not
/// demand more specialization arguments than the actual one supplies,
/// and either the two share a type name outright or the actual type's
/// name appears somewhere among its own ancestor chain under the
/// declared type's name — i.e. the actual value's type inherits
/// (directly or transitively) from the declared type.
///
/// Per DESIGN.md's Open Question decision, specialization *arguments*
/// are never recursively compared (the original's own commented-out
/// code for this is dead, matching its shipped behavior): a declared
/// `List<int64>` and an actual `List<any>` are "compatible" only
/// because their head names match, not because `int64` and `any` are
/// separately checked.
pub fn is_compatible(decl: &Arc<TypeInstance>, actual: &Arc<TypeInstance>) -> bool {
    let (Some(decl_ty), Some(actual_ty)) = (decl.ty(), actual.ty()) else {
        return false;
    };

    if decl_ty.name == "any" {
        return true;
    }

    let decl_specs = decl.specializations().map(|s| s.len()).unwrap_or(0);
    let actual_specs = actual.specializations().map(|s| s.len()).unwrap_or(0);
    if decl_specs < actual_specs {
        return false;
    }

    if decl_ty.name == actual_ty.name {
        return true;
    }

    let mut ancestor = actual_ty.parent();
    while let Some(current) = ancestor {
        if current.name == decl_ty.name {
            return true;
        }
        ancestor = current.parent();
    }
    false
}

/// Validates `value` against `decl`, dispatching to the declared type's
/// class handler once structural compatibility is established. Never fails fast: every failure appends at least
/// one [`ir::ValidationError`] to `ctx`, and the overall `bool` result
/// is the conjunction of every check performed, not a short-circuit on
/// the first one.
pub fn validate_instance(
    handlers: &ClassHandlerRegistry,
    decl: &Arc<TypeInstance>,
    value: &RpcObject,
    ctx: &mut ErrorContext,
) -> bool {
    let decl = decl.unwind();

    match &value.typei {
        None => {
            let canonical = decl.canonical_form();
            let wire_name = value.value.wire_type_name();
            let is_any = canonical == "any";
            let is_null_match = canonical == "nullptr" && value.value.is_null();
            let matches_wire = canonical == wire_name;
            if !(is_any || is_null_match || matches_wire) {
                ctx.add(format!("Incompatible type {wire_name}, should be {canonical}"));
                return false;
            }
        }
        Some(actual) => {
            let actual = actual.unwind();
            if !is_compatible(&decl, &actual) {
                ctx.add(format!(
                    "Incompatible type {}, should be {}",
                    actual.canonical_form(),
                    decl.canonical_form()
                ));
                return false;
            }
        }
    }

    let Some(ty) = decl.ty() else {
        ctx.add("cannot validate an unresolved generic variable");
        return false;
    };
    let handler = handlers.get(ty.class());
    let mut recurse = |child_decl: &Arc<TypeInstance>, child_value: &RpcObject, child_ctx: &mut ErrorContext| {
        validate_instance(handlers, child_decl, child_value, child_ctx)
    };
    handler.validate(&decl, value, ctx, &mut recurse)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use ir::{Class, Member, Type, Value};

    use super::*;

    fn concrete(ty: Arc<Type>) -> Arc<TypeInstance> {
        let canonical_form = ty.name.clone();
        Arc::new(TypeInstance::Concrete {
            ty,
            specializations: BTreeMap::new(),
            constraints: BTreeMap::new(),
            canonical_form,
        })
    }

    #[test]
    fn any_validates_every_value() {
        // Testable property 6: `any` is top.
        let handlers = ClassHandlerRegistry::with_builtins();
        let any_ti = concrete(Arc::new(Type::builtin("any")));
        for value in [Value::Int64(1), Value::String("x".into()), Value::Bool(true), Value::Null] {
            let mut ctx = ErrorContext::new();
            assert!(validate_instance(&handlers, &any_ti, &RpcObject::untyped(value), &mut ctx));
        }
    }

    #[test]
    fn untyped_value_validates_against_its_own_wire_type() {
        let handlers = ClassHandlerRegistry::with_builtins();
        let int64_ti = concrete(Arc::new(Type::builtin("int64")));
        let mut ctx = ErrorContext::new();
        assert!(validate_instance(&handlers, &int64_ti, &RpcObject::untyped(Value::Int64(5)), &mut ctx));

        let mut ctx = ErrorContext::new();
        assert!(!validate_instance(
            &handlers,
            &int64_ti,
            &RpcObject::untyped(Value::String("oops".into())),
            &mut ctx
        ));
        assert_eq!(ctx.errors.len(), 1);
        assert!(ctx.errors[0].message.starts_with("Incompatible type string"));
    }

    #[test]
    fn inherited_type_is_compatible_with_its_ancestor_declaration() {
        // Testable scenario S6.
        let base = Arc::new(Type::skeleton("demo.B", Class::Struct, None, "", "", None, Vec::new()));
        base.insert_member(Member::field("x", "", concrete(Arc::new(Type::builtin("int64"))), BTreeMap::new()));
        let derived = Arc::new(Type::skeleton(
            "demo.D",
            Class::Struct,
            None,
            "",
            "",
            Some(base.clone()),
            Vec::new(),
        ));
        derived.insert_member(Member::field("x", "", concrete(Arc::new(Type::builtin("int64"))), BTreeMap::new()));
        derived.insert_member(Member::field("y", "", concrete(Arc::new(Type::builtin("int64"))), BTreeMap::new()));

        let base_ti = concrete(base);
        let derived_ti = concrete(derived);
        assert!(is_compatible(&base_ti, &derived_ti));
        assert!(!is_compatible(&derived_ti, &base_ti));
    }

    #[test]
    fn struct_with_two_missing_fields_reports_two_path_qualified_errors() {
        // Testable property 8.
        let handlers = ClassHandlerRegistry::with_builtins();
        let point = Arc::new(Type::skeleton("demo.Point", Class::Struct, None, "", "", None, Vec::new()));
        point.insert_member(Member::field("x", "", concrete(Arc::new(Type::builtin("int64"))), BTreeMap::new()));
        point.insert_member(Member::field("y", "", concrete(Arc::new(Type::builtin("int64"))), BTreeMap::new()));
        let point_ti = concrete(point);

        let mut ctx = ErrorContext::new();
        let typed_value = RpcObject::typed(Value::Dictionary(BTreeMap::new()), point_ti.clone());
        let ok = validate_instance(&handlers, &point_ti, &typed_value, &mut ctx);
        assert!(!ok);
        assert_eq!(ctx.errors.len(), 2);
        assert_eq!(ctx.errors[0].path, "x");
        assert_eq!(ctx.errors[1].path, "y");
    }
}
