use std::collections::BTreeMap;
use std::sync::Arc;

use classes::ClassHandlerRegistry;
use ir::{Class, File, Type, Value};
use registry::Registry;

use crate::error::ReaderError;
use crate::instantiate;
use crate::keys::TypeKey;
use crate::lookup::find_type;

fn class_for(word: &str) -> Result<Class, ReaderError> {
    match word {
        "struct" => Ok(Class::Struct),
        "union" => Ok(Class::Union),
        "enum" => Ok(Class::Enum),
        // `type` is a bare alias for a forced typedef : its
        // body must carry a `type:` declaration, enforced below.
        "typedef" | "type" => Ok(Class::Typedef),
        other => Err(ReaderError::InvalidSyntax(format!("unrecognized class word '{other}'"))),
    }
}

fn as_str(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s),
        _ => None,
    }
}

fn parse_constraints(value: &Value) -> Result<BTreeMap<String, Value>, ReaderError> {
    match value {
        Value::Dictionary(map) => Ok(map.clone()),
        _ => Err(ReaderError::InvalidSyntax("'constraints' must be a mapping".to_string())),
    }
}

/// Reads one `<decl, body>` pair into a registered [`Type`]. Idempotent
/// for a name already registered with the same body — which is also how
/// a cyclic reference reached through chain-loading observes the
/// still-filling skeleton rather than re-entering this function, since
/// the skeleton is registered before its members are parsed. A second
/// declaration of the same fully-qualified name with a *different* body
/// is rejected as a conflicting redeclaration.
pub fn read_type(
    registry: &Registry,
    handlers: &ClassHandlerRegistry,
    file: &Arc<File>,
    key: &TypeKey,
    body: &Value,
) -> Result<Arc<Type>, ReaderError> {
    let fqname = file.qualify(&key.name);
    if let Some(existing) = registry.get_type(&fqname) {
        if let Some(declared) = registry.declared_body(&fqname) {
            if &declared != body {
                return Err(ReaderError::DuplicateDefinition { name: fqname, origin: existing.origin() });
            }
        }
        return Ok(existing);
    }

    let class = class_for(&key.class_word)?;
    let Value::Dictionary(fields) = body else {
        return Err(ReaderError::InvalidSyntax(format!("'{fqname}' body must be a mapping")));
    };

    let description = fields.get("description").and_then(as_str).unwrap_or_default().to_string();

    let parent = match fields.get("inherits") {
        Some(Value::String(parent_name)) => {
            Some(find_type(registry, handlers, parent_name, Some(file.as_ref()))?)
        }
        Some(_) => return Err(ReaderError::InvalidSyntax(format!("'{fqname}.inherits' must be a string"))),
        None => None,
    };

    let ty = Arc::new(Type::skeleton(
        fqname.clone(),
        class,
        Some(file.path.clone()),
        file.path.display().to_string(),
        description,
        parent.clone(),
        key.generic_vars.clone(),
    ));

    // Register the skeleton before parsing members so a cyclic
    // reference reached while parsing them resolves to this same,
    // still-filling `Type`.
    registry.insert_type(ty.clone());
    registry.record_declared_body(&fqname, body.clone());
    file.insert_type(fqname.clone(), ty.clone());

    if let Some(parent_ty) = &parent {
        for member in parent_ty.members().into_values() {
            ty.insert_member(member);
        }
    }

    if let Some(constraints) = fields.get("constraints") {
        ty.set_constraints(parse_constraints(constraints)?);
    }

    if let Some(Value::Dictionary(members)) = fields.get("members") {
        let handler = handlers.get(class);
        for (name, member_body) in members {
            let mut resolve = |decl: &str| {
                instantiate::instantiate(registry, handlers, decl, None, Some(&ty), Some(file))
                    .map_err(|e| classes::ClassError::Resolve(e.to_string()))
            };
            let member = handler.parse_member(name, member_body, &ty, &mut resolve)?;
            ty.insert_member(member);
        }
    }

    match fields.get("type") {
        Some(Value::String(type_decl)) => {
            ty.force_typedef();
            let definition =
                instantiate::instantiate(registry, handlers, type_decl, None, Some(&ty), Some(file))?;
            ty.set_definition(definition);
        }
        Some(_) => return Err(ReaderError::InvalidSyntax(format!("'{fqname}.type' must be a string"))),
        None if class == Class::Typedef => {
            return Err(ReaderError::InvalidSyntax(format!(
                "typedef '{fqname}' is missing its 'type' declaration"
            )));
        }
        None => {}
    }

    Ok(ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::parse_type_key;

    fn demo_file(body: Value) -> Arc<File> {
        Arc::new(File::new("demo.yaml".into(), Some("demo".to_string()), 1, String::new(), Vec::new(), body))
    }

    #[test]
    fn struct_members_read_into_the_type() {
        let registry = Registry::new();
        let handlers = ClassHandlerRegistry::with_builtins();
        let key = parse_type_key("struct Point").unwrap();
        let body: Value = serde_yaml::from_str(
            "members:\n  x: {type: int64}\n  y: {type: int64}\n",
        )
        .unwrap();
        let file = demo_file(Value::Dictionary(BTreeMap::new()));
        let ty = read_type(&registry, &handlers, &file, &key, &body).unwrap();
        assert_eq!(ty.name, "demo.Point");
        assert_eq!(ty.members().len(), 2);
    }

    #[test]
    fn struct_inherits_copies_in_parent_members() {
        let registry = Registry::new();
        let handlers = ClassHandlerRegistry::with_builtins();
        let file = demo_file(Value::Dictionary(BTreeMap::new()));

        let base_key = parse_type_key("struct B").unwrap();
        let base_body: Value = serde_yaml::from_str("members:\n  x: {type: int64}\n").unwrap();
        read_type(&registry, &handlers, &file, &base_key, &base_body).unwrap();

        let derived_key = parse_type_key("struct D").unwrap();
        let derived_body: Value =
            serde_yaml::from_str("inherits: demo.B\nmembers:\n  y: {type: int64}\n").unwrap();
        let derived = read_type(&registry, &handlers, &file, &derived_key, &derived_body).unwrap();

        assert_eq!(derived.members().len(), 2);
        assert!(derived.member("x").is_some());
        assert!(derived.member("y").is_some());
    }

    #[test]
    fn read_type_is_idempotent_when_re_read_with_the_same_body() {
        let registry = Registry::new();
        let handlers = ClassHandlerRegistry::with_builtins();
        let file = demo_file(Value::Dictionary(BTreeMap::new()));
        let key = parse_type_key("struct Point").unwrap();
        let body: Value = serde_yaml::from_str("members:\n  x: {type: int64}\n").unwrap();

        let first = read_type(&registry, &handlers, &file, &key, &body).unwrap();
        let second = read_type(&registry, &handlers, &file, &key, &body).unwrap();
        assert_eq!(first.name, second.name);
    }

    #[test]
    fn read_type_rejects_a_conflicting_redeclaration() {
        let registry = Registry::new();
        let handlers = ClassHandlerRegistry::with_builtins();
        let file = demo_file(Value::Dictionary(BTreeMap::new()));
        let key = parse_type_key("struct Point").unwrap();
        let first_body: Value = serde_yaml::from_str("members:\n  x: {type: int64}\n").unwrap();
        read_type(&registry, &handlers, &file, &key, &first_body).unwrap();

        let second_body: Value =
            serde_yaml::from_str("members:\n  x: {type: int64}\n  y: {type: int64}\n").unwrap();
        match read_type(&registry, &handlers, &file, &key, &second_body) {
            Err(ReaderError::DuplicateDefinition { name, .. }) => assert_eq!(name, "demo.Point"),
            other => panic!("expected DuplicateDefinition, got {other:?}"),
        }
    }

    #[test]
    fn typedef_body_requires_a_type_declaration() {
        let registry = Registry::new();
        let handlers = ClassHandlerRegistry::with_builtins();
        let file = demo_file(Value::Dictionary(BTreeMap::new()));
        let key = parse_type_key("typedef Alias").unwrap();
        let body: Value = serde_yaml::from_str("description: oops\n").unwrap();
        assert!(read_type(&registry, &handlers, &file, &key, &body).is_err());
    }

    #[test]
    fn typedef_with_a_type_string_resolves_its_definition() {
        let registry = Registry::new();
        let handlers = ClassHandlerRegistry::with_builtins();
        let file = demo_file(Value::Dictionary(BTreeMap::new()));
        let key = parse_type_key("typedef Alias").unwrap();
        let body: Value = serde_yaml::from_str("type: string\n").unwrap();
        let ty = read_type(&registry, &handlers, &file, &key, &body).unwrap();
        assert_eq!(ty.class(), Class::Typedef);
        let definition = ty.definition().unwrap();
        assert_eq!(definition.ty().map(|t| t.name.as_str()), Some("string"));
    }
}
