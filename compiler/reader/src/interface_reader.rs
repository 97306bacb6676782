use std::sync::Arc;

use classes::ClassHandlerRegistry;
use ir::{Argument, File, Interface, InterfaceMember, PropertyAccess, Value};
use registry::Registry;

use crate::error::ReaderError;
use crate::instantiate;
use crate::keys;

fn as_str(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s),
        _ => None,
    }
}

fn is_true(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::Bool(true)))
}

/// Reads one `interface <Name>` entry into a registered [`Interface`].
pub fn read_interface(
    registry: &Registry,
    handlers: &ClassHandlerRegistry,
    file: &Arc<File>,
    name: &str,
    body: &Value,
) -> Result<Arc<Interface>, ReaderError> {
    let fqname = file.qualify(name);
    if let Some(existing) = registry.get_interface(&fqname) {
        return Ok(existing);
    }

    let Value::Dictionary(fields) = body else {
        return Err(ReaderError::InvalidSyntax(format!("interface '{fqname}' body must be a mapping")));
    };
    let description = fields.get("description").and_then(as_str).unwrap_or_default().to_string();
    let mut interface = Interface::new(fqname.clone(), description);

    for (key, member_body) in fields {
        if key == "description" {
            continue;
        }
        if let Some(method_name) = keys::parse_tagged_key("method", key) {
            let member = read_method(registry, handlers, file, member_body)?;
            interface.insert_member(method_name, member);
        } else if let Some(property_name) = keys::parse_tagged_key("property", key) {
            let member = read_property(registry, handlers, file, member_body)?;
            interface.insert_member(property_name, member);
        } else if let Some(event_name) = keys::parse_tagged_key("event", key) {
            let member = read_event(registry, handlers, file, member_body)?;
            interface.insert_member(event_name, member);
        } else {
            return Err(ReaderError::InvalidSyntax(format!(
                "'{fqname}' has an unrecognized member key '{key}'"
            )));
        }
    }

    let interface = Arc::new(interface);
    registry.insert_interface(interface.clone());
    file.insert_interface(fqname, interface.clone());
    Ok(interface)
}

fn read_method(
    registry: &Registry,
    handlers: &ClassHandlerRegistry,
    file: &Arc<File>,
    body: &Value,
) -> Result<InterfaceMember, ReaderError> {
    let Value::Dictionary(fields) = body else {
        return Err(ReaderError::InvalidSyntax("method body must be a mapping".to_string()));
    };
    let description = fields.get("description").and_then(as_str).unwrap_or_default().to_string();

    let mut args = Vec::new();
    if let Some(Value::Array(items)) = fields.get("args") {
        for item in items {
            let Value::Dictionary(arg_fields) = item else {
                return Err(ReaderError::InvalidSyntax("method argument must be a mapping".to_string()));
            };
            let name = arg_fields
                .get("name")
                .and_then(as_str)
                .ok_or_else(|| ReaderError::InvalidSyntax("method argument is missing 'name'".to_string()))?
                .to_string();
            let type_decl = arg_fields.get("type").and_then(as_str).ok_or_else(|| {
                ReaderError::InvalidSyntax(format!("method argument '{name}' is missing 'type'"))
            })?;
            let arg_description =
                arg_fields.get("description").and_then(as_str).unwrap_or_default().to_string();
            let ty = instantiate::instantiate(registry, handlers, type_decl, None, None, Some(file))?;
            args.push(Argument { name, description: arg_description, ty });
        }
    }

    let result = match fields.get("return") {
        Some(Value::Dictionary(return_fields)) => {
            let type_decl = return_fields
                .get("type")
                .and_then(as_str)
                .ok_or_else(|| ReaderError::InvalidSyntax("method 'return' is missing 'type'".to_string()))?;
            Some(instantiate::instantiate(registry, handlers, type_decl, None, None, Some(file))?)
        }
        Some(_) => return Err(ReaderError::InvalidSyntax("method 'return' must be a mapping".to_string())),
        None => None,
    };

    Ok(InterfaceMember::Method { description, args, result })
}

fn read_property(
    registry: &Registry,
    handlers: &ClassHandlerRegistry,
    file: &Arc<File>,
    body: &Value,
) -> Result<InterfaceMember, ReaderError> {
    let Value::Dictionary(fields) = body else {
        return Err(ReaderError::InvalidSyntax("property body must be a mapping".to_string()));
    };
    let description = fields.get("description").and_then(as_str).unwrap_or_default().to_string();
    let type_decl = fields
        .get("type")
        .and_then(as_str)
        .ok_or_else(|| ReaderError::InvalidSyntax("property is missing 'type'".to_string()))?;
    let result = instantiate::instantiate(registry, handlers, type_decl, None, None, Some(file))?;

    let access = match (
        is_true(fields.get("read-only")),
        is_true(fields.get("write-only")),
        is_true(fields.get("read-write")),
    ) {
        (true, false, false) => PropertyAccess::ReadOnly,
        (false, true, false) => PropertyAccess::WriteOnly,
        (false, false, true) => PropertyAccess::ReadWrite,
        _ => {
            return Err(ReaderError::InvalidSyntax(
                "property must set exactly one of 'read-only', 'write-only', 'read-write'".to_string(),
            ))
        }
    };
    let notify = is_true(fields.get("notify"));

    Ok(InterfaceMember::Property { description, result, access, notify })
}

fn read_event(
    registry: &Registry,
    handlers: &ClassHandlerRegistry,
    file: &Arc<File>,
    body: &Value,
) -> Result<InterfaceMember, ReaderError> {
    let Value::Dictionary(fields) = body else {
        return Err(ReaderError::InvalidSyntax("event body must be a mapping".to_string()));
    };
    let description = fields.get("description").and_then(as_str).unwrap_or_default().to_string();
    let result = match fields.get("type") {
        Some(Value::String(type_decl)) => {
            Some(instantiate::instantiate(registry, handlers, type_decl, None, None, Some(file))?)
        }
        Some(_) => return Err(ReaderError::InvalidSyntax("event 'type' must be a string".to_string())),
        None => None,
    };
    Ok(InterfaceMember::Event { description, result })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn demo_file() -> Arc<File> {
        Arc::new(File::new(
            "demo.yaml".into(),
            Some("demo".to_string()),
            1,
            String::new(),
            Vec::new(),
            Value::Dictionary(BTreeMap::new()),
        ))
    }

    #[test]
    fn method_arguments_and_return_type_are_instantiated() {
        let registry = Registry::new();
        let handlers = ClassHandlerRegistry::with_builtins();
        let file = demo_file();
        let body: Value = serde_yaml::from_str(
            "method Add:\n  args:\n    - {name: a, type: int64}\n    - {name: b, type: int64}\n  return:\n    type: int64\n",
        )
        .unwrap();
        let interface = read_interface(&registry, &handlers, &file, "Calculator", &body).unwrap();
        match interface.members.get("Add") {
            Some(InterfaceMember::Method { args, result, .. }) => {
                assert_eq!(args.len(), 2);
                assert!(result.is_some());
            }
            other => panic!("expected a method, got {other:?}"),
        }
    }

    #[test]
    fn property_requires_exactly_one_access_flag() {
        let registry = Registry::new();
        let handlers = ClassHandlerRegistry::with_builtins();
        let file = demo_file();
        let body: Value =
            serde_yaml::from_str("property Name:\n  type: string\n  read-only: true\n").unwrap();
        let interface = read_interface(&registry, &handlers, &file, "Widget", &body).unwrap();
        match interface.members.get("Name") {
            Some(InterfaceMember::Property { access, .. }) => assert_eq!(*access, PropertyAccess::ReadOnly),
            other => panic!("expected a property, got {other:?}"),
        }
    }
}
