#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::unwrap_used)]

//! Tagged-wire round-tripping between `RpcObject` and `Value`.
//!
//! `serialize` walks an in-memory value outward to the wire; untyped
//! containers recurse untagged, while any value already carrying a
//! `TypeInstance` is handed to its class handler, which tags structs and
//! scalars with `%type` (and, for scalars, `%value`). `deserialize` is the
//! inverse: a `%type`-tagged dictionary detaches the tag, instantiates
//! the named type by looking it up in the registry, and attaches the
//! result as the value's `typei`; an untagged dictionary or array is
//! recursively deserialized and retyped as a bare `dictionary`/`array`;
//! a scalar is retyped by its own wire-kind name.
//!
//! This crate depends on `rpct-reader` only for [`reader::instantiate`]:
//! a `%type` string is already fully qualified, so no lexical context
//! (namespace, `use` prefixes, enclosing generic instance) is needed to
//! resolve it — every call passes `None` for `parent_instance`,
//! `prototype`, and `origin`.

use std::collections::BTreeMap;
use std::sync::Arc;

use classes::{ClassError, ClassHandlerRegistry};
use ir::{RpcObject, Type, TypeInstance, Value};
use registry::Registry;

const TYPE_FIELD: &str = "%type";
const VALUE_FIELD: &str = "%value";
const REALM_FIELD: &str = "%realm";

/// Errors arising from serializing or deserializing a tagged wire value.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A class handler rejected a value during (de)serialization.
    #[error(transparent)]
    Class(#[from] ClassError),
    /// A `%type` name did not resolve to a registered type.
    #[error(transparent)]
    Reader(#[from] reader::ReaderError),
}

/// Converts an in-memory value into wire form.
pub fn serialize(handlers: &ClassHandlerRegistry, value: &RpcObject) -> Value {
    match &value.typei {
        Some(typei) => {
            let class = typei.ty().map(|ty| ty.class());
            let handler = class.map(|c| handlers.get(c));
            match handler {
                Some(handler) => {
                    let mut recurse = |child: &RpcObject| serialize(handlers, child);
                    handler.serialize(typei, value, &mut recurse)
                }
                // A proxy instance carries no class to dispatch to; this
                // cannot arise from a fully-specialized value reaching
                // the wire, but is handled gracefully rather than
                // panicking.
                None => value.value.clone(),
            }
        }
        None => match &value.value {
            Value::Dictionary(fields) => {
                let serialized: BTreeMap<String, Value> = fields
                    .iter()
                    .map(|(k, v)| (k.clone(), serialize(handlers, &RpcObject::untyped(v.clone()))))
                    .collect();
                Value::Dictionary(serialized)
            }
            Value::Array(items) => {
                let serialized: Vec<Value> =
                    items.iter().map(|v| serialize(handlers, &RpcObject::untyped(v.clone()))).collect();
                Value::Array(serialized)
            }
            scalar => {
                let mut fields = BTreeMap::new();
                fields.insert(TYPE_FIELD.to_string(), Value::String(scalar.wire_type_name().to_string()));
                fields.insert(VALUE_FIELD.to_string(), scalar.clone());
                Value::Dictionary(fields)
            }
        },
    }
}

/// Converts a wire-form value back into an in-memory typed value
/// .
pub fn deserialize(
    registry: &Registry,
    handlers: &ClassHandlerRegistry,
    value: Value,
) -> Result<RpcObject, CodecError> {
    match value {
        Value::Dictionary(mut fields) => {
            fields.remove(REALM_FIELD);
            match fields.remove(TYPE_FIELD) {
                Some(Value::String(type_name)) => {
                    let instance = reader::instantiate::instantiate(
                        registry, handlers, &type_name, None, None, None,
                    )?;
                    let remainder = extract_remainder(fields);
                    let ty = instance.ty().cloned();
                    let handler = ty.as_ref().map(|t| handlers.get(t.class()));
                    match handler {
                        Some(handler) => {
                            let mut recurse = |v: Value| {
                                deserialize(registry, handlers, v)
                                    .map_err(|e| ClassError::Resolve(e.to_string()))
                            };
                            Ok(handler.deserialize(instance, remainder, &mut recurse)?)
                        }
                        None => Ok(RpcObject::typed(remainder, instance)),
                    }
                }
                Some(_) => Err(ClassError::Unsupported(format!("'{TYPE_FIELD}' must be a string")).into()),
                None => {
                    let deserialized: Result<BTreeMap<String, Value>, CodecError> = fields
                        .into_iter()
                        .map(|(k, v)| deserialize(registry, handlers, v).map(|obj| (k, obj.value)))
                        .collect();
                    let dict = Value::Dictionary(deserialized?);
                    Ok(RpcObject::typed(dict, dictionary_instance(registry)))
                }
            }
        }
        Value::Array(items) => {
            let deserialized: Result<Vec<Value>, CodecError> = items
                .into_iter()
                .map(|v| deserialize(registry, handlers, v).map(|obj| obj.value))
                .collect();
            Ok(RpcObject::typed(Value::Array(deserialized?), array_instance(registry)))
        }
        scalar => {
            let wire_name = if scalar.is_null() { "nulltype" } else { scalar.wire_type_name() };
            let instance = reader::instantiate::instantiate(registry, handlers, wire_name, None, None, None)?;
            Ok(RpcObject::typed(scalar, instance))
        }
    }
}

/// A `%type`-tagged dictionary whose sole remaining field is `%value`
/// (the scalar carriers and the enum class) re-wraps to that bare
/// value; everything else is treated as a struct/union body as-is
/// .
fn extract_remainder(mut fields: BTreeMap<String, Value>) -> Value {
    if fields.len() == 1 {
        if let Some(value) = fields.remove(VALUE_FIELD) {
            return value;
        }
    }
    Value::Dictionary(fields)
}

fn builtin_instance(registry: &Registry, name: &str) -> Arc<TypeInstance> {
    let ty: Arc<Type> = registry.get_type(name).unwrap_or_else(|| Arc::new(Type::builtin(name)));
    Arc::new(TypeInstance::Concrete {
        ty,
        specializations: BTreeMap::new(),
        constraints: BTreeMap::new(),
        canonical_form: name.to_string(),
    })
}

fn dictionary_instance(registry: &Registry) -> Arc<TypeInstance> {
    builtin_instance(registry, "dictionary")
}

fn array_instance(registry: &Registry) -> Arc<TypeInstance> {
    builtin_instance(registry, "array")
}

#[cfg(test)]
mod tests {
    use registry::Registry;

    use super::*;

    #[test]
    fn untyped_scalar_serializes_into_type_value_wrapper() {
        let handlers = ClassHandlerRegistry::with_builtins();
        let wire = serialize(&handlers, &RpcObject::untyped(Value::Int64(7)));
        match wire {
            Value::Dictionary(fields) => {
                assert_eq!(fields.get(TYPE_FIELD), Some(&Value::String("int64".to_string())));
                assert_eq!(fields.get(VALUE_FIELD), Some(&Value::Int64(7)));
            }
            other => panic!("expected a tagged dictionary, got {other:?}"),
        }
    }

    #[test]
    fn untyped_dictionary_and_array_serialize_untagged() {
        let handlers = ClassHandlerRegistry::with_builtins();
        let mut dict = BTreeMap::new();
        dict.insert("a".to_string(), Value::Int64(1));
        let wire = serialize(&handlers, &RpcObject::untyped(Value::Dictionary(dict)));
        match wire {
            Value::Dictionary(fields) => assert!(!fields.contains_key(TYPE_FIELD)),
            other => panic!("expected an untagged dictionary, got {other:?}"),
        }
    }

    #[test]
    fn deserialize_scalar_attaches_a_matching_builtin_typei() {
        let registry = Registry::new();
        let handlers = ClassHandlerRegistry::with_builtins();
        let obj = deserialize(&registry, &handlers, Value::Int64(7)).unwrap();
        assert_eq!(obj.typei.as_ref().map(|t| t.canonical_form()), Some("int64"));
    }

    #[test]
    fn deserialize_null_attaches_nulltype() {
        let registry = Registry::new();
        let handlers = ClassHandlerRegistry::with_builtins();
        let obj = deserialize(&registry, &handlers, Value::Null).unwrap();
        assert_eq!(obj.typei.as_ref().map(|t| t.canonical_form()), Some("nulltype"));
    }

    #[test]
    fn struct_roundtrips_through_serialize_then_deserialize() {
        // Testable scenario S1.
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("demo.yaml"),
            "meta:\n  version: 1\n  namespace: demo\nstruct Point:\n  members:\n    x: {type: int64}\n    y: {type: int64}\n",
        )
        .unwrap();
        let rd = reader::Reader::new();
        rd.load_directory(dir.path()).unwrap();
        let handlers = ClassHandlerRegistry::with_builtins();

        let mut raw = BTreeMap::new();
        raw.insert(TYPE_FIELD.to_string(), Value::String("demo.Point".to_string()));
        raw.insert("x".to_string(), Value::Int64(1));
        raw.insert("y".to_string(), Value::Int64(2));

        let deserialized = deserialize(&rd.registry, &handlers, Value::Dictionary(raw)).unwrap();
        assert_eq!(deserialized.typei.as_ref().map(|t| t.canonical_form()), Some("demo.Point"));

        let reserialized = serialize(&handlers, &deserialized);
        match reserialized {
            Value::Dictionary(fields) => {
                assert_eq!(fields.get(TYPE_FIELD), Some(&Value::String("demo.Point".to_string())));
                assert_eq!(fields.get("x"), Some(&Value::Int64(1)));
                assert_eq!(fields.get("y"), Some(&Value::Int64(2)));
            }
            other => panic!("expected a tagged struct dictionary, got {other:?}"),
        }
    }

    #[test]
    fn enum_variant_roundtrips_as_a_tagged_string() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("demo.yaml"),
            "meta:\n  version: 1\n  namespace: demo\nenum Color:\n  members:\n    RED: {}\n    BLUE: {}\n",
        )
        .unwrap();
        let rd = reader::Reader::new();
        rd.load_directory(dir.path()).unwrap();
        let handlers = ClassHandlerRegistry::with_builtins();

        let mut raw = BTreeMap::new();
        raw.insert(TYPE_FIELD.to_string(), Value::String("demo.Color".to_string()));
        raw.insert(VALUE_FIELD.to_string(), Value::String("RED".to_string()));

        let deserialized = deserialize(&rd.registry, &handlers, Value::Dictionary(raw)).unwrap();
        assert_eq!(deserialized.value, Value::String("RED".to_string()));
        assert_eq!(deserialized.typei.as_ref().map(|t| t.canonical_form()), Some("demo.Color"));

        let reserialized = serialize(&handlers, &deserialized);
        match reserialized {
            Value::Dictionary(fields) => {
                assert_eq!(fields.get(TYPE_FIELD), Some(&Value::String("demo.Color".to_string())));
                assert_eq!(fields.get(VALUE_FIELD), Some(&Value::String("RED".to_string())));
            }
            other => panic!("expected a tagged enum dictionary, got {other:?}"),
        }
    }
}
