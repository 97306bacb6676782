use std::collections::BTreeMap;
use std::sync::Arc;

use classes::ClassHandlerRegistry;
use ir::{File, Type, TypeInstance};
use registry::Registry;

use crate::error::ReaderError;
use crate::expr;
use crate::lookup::find_type;

/// Resolves a type expression to a [`TypeInstance`] in the lexical
/// context of `parent_instance`/`prototype`/`origin`.
///
/// `parent_instance` is consulted only one level deep rather than by
/// walking a multi-level ancestor chain: a proxy's enclosing
/// instantiation is reached through ordinary call-stack recursion in
/// this implementation, so the single level this function checks is
/// the only one a caller is ever in a position to supply. `prototype`
/// is the generic type currently being read, used only while its own
/// member types are first parsed (step 4: an unresolved head matching
/// one of `prototype`'s own generic variables becomes a `Proxy`).
///
/// Each argument is instantiated recursively with the
/// *same* `parent_instance`/`prototype` context passed to this call,
/// not with the partially-built instance under construction — that
/// under-construction instance has no specializations yet to resolve
/// anything against.
pub fn instantiate(
    registry: &Registry,
    handlers: &ClassHandlerRegistry,
    decl: &str,
    parent_instance: Option<&Arc<TypeInstance>>,
    prototype: Option<&Arc<Type>>,
    origin: Option<&Arc<File>>,
) -> Result<Arc<TypeInstance>, ReaderError> {
    let (head, args) = expr::parse(decl)?;
    let origin_file = origin.map(|f| f.as_ref());

    let ty = match find_type(registry, handlers, &head, origin_file) {
        Ok(ty) => {
            if !ty.is_generic() {
                if let Some(cached) = registry.cached_instance(&ty.name) {
                    return Ok(cached);
                }
            }
            ty
        }
        Err(_) => {
            if let Some(parent) = parent_instance {
                if let Some(bound) = parent.specializations().and_then(|s| s.get(&head)) {
                    return Ok(bound.clone());
                }
            }
            if let Some(proto) = prototype {
                if proto.generic_vars().iter().any(|v| v == &head) {
                    return Ok(Arc::new(TypeInstance::Proxy { variable: head }));
                }
            }
            return Err(ReaderError::UnknownType(head));
        }
    };

    if !ty.is_generic() {
        let constraints = ty.constraints();
        let canonical_form = ty.name.clone();
        let instance = Arc::new(TypeInstance::Concrete {
            ty,
            specializations: BTreeMap::new(),
            constraints,
            canonical_form,
        });
        registry.cache_instance(instance.clone());
        return Ok(instance);
    }

    let vars = ty.generic_vars();
    if vars.len() != args.len() {
        return Err(ReaderError::ArityMismatch { name: ty.name.clone(), expected: vars.len(), actual: args.len() });
    }

    let mut specializations = BTreeMap::new();
    for (var, arg_decl) in vars.iter().zip(args.iter()) {
        let child = instantiate(registry, handlers, arg_decl, parent_instance, prototype, origin)?;
        specializations.insert(var.clone(), child);
    }

    let constraints = ty.constraints();
    let canonical_form = ir::canonical_form_for(&ty, &specializations);
    let cacheable = !specializations.values().any(|child| contains_proxy(child));
    let instance =
        Arc::new(TypeInstance::Concrete { ty, specializations, constraints, canonical_form });
    if cacheable {
        registry.cache_instance(instance.clone());
    }
    Ok(instance)
}

fn contains_proxy(instance: &TypeInstance) -> bool {
    match instance {
        TypeInstance::Proxy { .. } => true,
        TypeInstance::Concrete { specializations, .. } => {
            specializations.values().any(|child| contains_proxy(child))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ir::Class;

    #[test]
    fn instantiating_a_builtin_twice_returns_the_same_cached_instance() {
        let registry = Registry::new();
        let handlers = ClassHandlerRegistry::with_builtins();
        let a = instantiate(&registry, &handlers, "string", None, None, None).unwrap();
        let b = instantiate(&registry, &handlers, "string", None, None, None).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn generic_arity_mismatch_is_reported() {
        let registry = Registry::new();
        let handlers = ClassHandlerRegistry::with_builtins();
        let pair_ty = Arc::new(Type::skeleton(
            "demo.Pair",
            Class::Struct,
            None,
            "",
            "",
            None,
            vec!["A".to_string(), "B".to_string()],
        ));
        registry.insert_type(pair_ty);
        let err = instantiate(&registry, &handlers, "demo.Pair<string>", None, None, None).unwrap_err();
        assert!(matches!(err, ReaderError::ArityMismatch { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn fully_specialized_generic_canonical_form_is_deterministic() {
        let registry = Registry::new();
        let handlers = ClassHandlerRegistry::with_builtins();
        let pair_ty = Arc::new(Type::skeleton(
            "demo.Pair",
            Class::Struct,
            None,
            "",
            "",
            None,
            vec!["A".to_string(), "B".to_string()],
        ));
        registry.insert_type(pair_ty);
        let instance =
            instantiate(&registry, &handlers, "demo.Pair<string,int64>", None, None, None).unwrap();
        assert_eq!(instance.canonical_form(), "demo.Pair<string,int64>");
        let cached = registry.cached_instance("demo.Pair<string,int64>");
        assert!(cached.is_some());
    }

    #[test]
    fn a_bare_generic_variable_inside_a_prototype_becomes_a_proxy() {
        let registry = Registry::new();
        let handlers = ClassHandlerRegistry::with_builtins();
        let foo_ty = Arc::new(Type::skeleton(
            "demo.Foo",
            Class::Struct,
            None,
            "",
            "",
            None,
            vec!["T".to_string()],
        ));
        let instance = instantiate(&registry, &handlers, "T", None, Some(&foo_ty), None).unwrap();
        assert!(instance.is_proxy());
        assert_eq!(instance.canonical_form(), "T");
    }
}
