use std::sync::Arc;

use classes::ClassHandlerRegistry;
use ir::{File, Type, Value};
use registry::Registry;

use crate::error::ReaderError;
use crate::keys;
use crate::type_reader;

/// Resolves a fully- or partially-qualified name to a [`Type`], in the
/// lexical context of `origin`: exact match, then
/// `origin`'s namespace, then each of `origin`'s `use` prefixes in
/// order, then a chain-load attempt.
pub fn find_type(
    registry: &Registry,
    handlers: &ClassHandlerRegistry,
    name: &str,
    origin: Option<&File>,
) -> Result<Arc<Type>, ReaderError> {
    if let Some(ty) = registry.get_type(name) {
        return Ok(ty);
    }

    if let Some(file) = origin {
        if let Some(namespace) = &file.namespace {
            if let Some(ty) = registry.get_type(&format!("{namespace}.{name}")) {
                return Ok(ty);
            }
        }
        for prefix in &file.uses {
            if let Some(ty) = registry.get_type(&format!("{prefix}.{name}")) {
                return Ok(ty);
            }
        }
    }

    if chain_load(registry, handlers, name)? {
        if let Some(ty) = registry.get_type(name) {
            return Ok(ty);
        }
    }

    Err(ReaderError::UnknownType(name.to_string()))
}

/// Scans every loaded file's body for a top-level type declaration whose
/// fully-qualified name is exactly `name`, and reads it on the spot
/// . Returns whether a matching declaration was
/// found — the caller retries the exact-match lookup afterward.
fn chain_load(registry: &Registry, handlers: &ClassHandlerRegistry, name: &str) -> Result<bool, ReaderError> {
    for file in registry.all_files() {
        let Value::Dictionary(fields) = &file.body else { continue };
        for (key, body) in fields {
            if key == "meta" || keys::parse_tagged_key("interface", key).is_some() {
                continue;
            }
            let Some(type_key) = keys::parse_type_key(key) else { continue };
            if file.qualify(&type_key.name) != name {
                continue;
            }
            if !registry.has_type(name) {
                type_reader::read_type(registry, handlers, &file, &type_key, body)?;
            }
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ir::Class;

    #[test]
    fn exact_match_short_circuits_namespace_and_uses() {
        let registry = Registry::new();
        assert!(find_type(&registry, &ClassHandlerRegistry::with_builtins(), "string", None).is_ok());
    }

    #[test]
    fn unqualified_lookup_resolves_through_the_originating_namespace() {
        let registry = Registry::new();
        let ty = Arc::new(Type::skeleton("demo.Point", Class::Struct, None, "", "", None, Vec::new()));
        registry.insert_type(ty);
        let file = Arc::new(File::new(
            "demo.yaml".into(),
            Some("demo".to_string()),
            1,
            String::new(),
            Vec::new(),
            Value::Dictionary(Default::default()),
        ));
        let found = find_type(&registry, &ClassHandlerRegistry::with_builtins(), "Point", Some(&file));
        assert_eq!(found.unwrap().name, "demo.Point");
    }

    #[test]
    fn unresolvable_name_reports_unknown_type() {
        let registry = Registry::new();
        let err = find_type(&registry, &ClassHandlerRegistry::with_builtins(), "demo.Missing", None).unwrap_err();
        assert!(matches!(err, ReaderError::UnknownType(name) if name == "demo.Missing"));
    }
}
