use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::IrError;

/// An RPC-level error value: a numeric code, a message, and optional extra
/// structured detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    /// Numeric error code, protocol-defined.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail attached to the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<Box<Value>>,
}

/// A shared-memory segment descriptor.
///
/// Transport for the backing memory is out of scope here; this carries
/// just enough to round-trip through the wire form and report its
/// wire-type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shmem {
    /// Size of the segment in bytes.
    pub size: u64,
}

/// The tagged dynamic value the typing core validates and (de)serializes.
///
/// Mirrors the original library's `union rpc_value`: a closed set of
/// scalar and container kinds, deliberately thin — no arithmetic, no
/// transport. Variant names line up with the registry's builtin type
/// names (`Value::Uint64` validates against the builtin named `"uint64"`,
/// and so on), except `Null`, whose builtin and wire-type name is
/// `"nulltype"`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The absence of a value.
    Null,
    /// A boolean.
    Bool(bool),
    /// An unsigned 64-bit integer.
    Uint64(u64),
    /// A signed 64-bit integer.
    Int64(i64),
    /// A 64-bit float.
    Double(f64),
    /// A timestamp.
    Date(DateTime<Utc>),
    /// A UTF-8 string.
    String(String),
    /// Opaque bytes.
    Binary(Vec<u8>),
    /// A file descriptor number.
    Fd(i32),
    /// An ordered sequence of values.
    Array(Vec<Value>),
    /// A string-keyed mapping of values, in declared/insertion order as
    /// far as a `BTreeMap` preserves it (lexicographic by key).
    Dictionary(BTreeMap<String, Value>),
    /// An RPC-level error.
    Error(Box<RpcError>),
    /// A shared-memory segment descriptor.
    Shmem(Shmem),
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl Value {
    /// The wire-type name used in `%type` and compared against a
    /// declaration's canonical form during untyped validation.
    pub fn wire_type_name(&self) -> &'static str {
        match self {
            Value::Null => "nulltype",
            Value::Bool(_) => "bool",
            Value::Uint64(_) => "uint64",
            Value::Int64(_) => "int64",
            Value::Double(_) => "double",
            Value::Date(_) => "date",
            Value::String(_) => "string",
            Value::Binary(_) => "binary",
            Value::Fd(_) => "fd",
            Value::Array(_) => "array",
            Value::Dictionary(_) => "dictionary",
            Value::Error(_) => "error",
            Value::Shmem(_) => "shmem",
        }
    }

    /// True for `Value::Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Builds a binary value from raw bytes.
    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Binary(bytes.into())
    }

    /// Decodes a base64-encoded binary value, as carried by `%value` on
    /// the wire.
    pub fn binary_from_base64(encoded: &str) -> Result<Self, IrError> {
        let bytes = BASE64.decode(encoded)?;
        Ok(Value::Binary(bytes))
    }

    /// Encodes bytes as base64, for wire serialization of a binary value.
    pub fn binary_to_base64(bytes: &[u8]) -> String {
        BASE64.encode(bytes)
    }

    /// Parses an RFC 3339 timestamp, as carried by `%value` on the wire.
    pub fn date_from_rfc3339(s: &str) -> Result<Self, IrError> {
        let parsed = DateTime::parse_from_rfc3339(s)?;
        Ok(Value::Date(parsed.with_timezone(&Utc)))
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Uint64(n) => serializer.serialize_u64(*n),
            Value::Int64(n) => serializer.serialize_i64(*n),
            Value::Double(d) => serializer.serialize_f64(*d),
            Value::Date(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            Value::String(s) => serializer.serialize_str(s),
            Value::Binary(bytes) => serializer.serialize_str(&Value::binary_to_base64(bytes)),
            Value::Fd(fd) => serializer.serialize_i32(*fd),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Dictionary(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Value::Error(err) => err.serialize(serializer),
            Value::Shmem(shmem) => shmem.serialize(serializer),
        }
    }
}

/// `Value`'s `Deserialize` only ever produces the kinds a raw YAML/JSON
/// document can express unambiguously on its own: `Null`, `Bool`,
/// `Int64`/`Uint64`, `Double`, `String`, `Array`, `Dictionary`. `Date`,
/// `Binary`, `Fd`, `Error`, and `Shmem` require an explicit `%type` tag to
/// disambiguate from a bare string or number, and are constructed directly
/// by the codec once that tag is known (see `Value::binary_from_base64`,
/// `Value::date_from_rfc3339`).
impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str("a YAML/JSON scalar, sequence, or mapping")
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Null)
    }

    fn visit_none<E>(self) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Null)
    }

    fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Bool(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Int64(v))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Uint64(v))
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Double(v))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::String(v))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::new();
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut fields = BTreeMap::new();
        while let Some((k, v)) = map.next_entry::<String, Value>()? {
            fields.insert(k, v);
        }
        Ok(Value::Dictionary(fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_type_names_match_builtin_names() {
        assert_eq!(Value::Null.wire_type_name(), "nulltype");
        assert_eq!(Value::Bool(true).wire_type_name(), "bool");
        assert_eq!(Value::Uint64(1).wire_type_name(), "uint64");
        assert_eq!(Value::Int64(-1).wire_type_name(), "int64");
        assert_eq!(Value::Double(1.5).wire_type_name(), "double");
        assert_eq!(Value::String("x".into()).wire_type_name(), "string");
        assert_eq!(Value::Array(vec![]).wire_type_name(), "array");
        assert_eq!(Value::Dictionary(BTreeMap::new()).wire_type_name(), "dictionary");
    }

    #[test]
    fn binary_round_trips_through_base64() {
        let bytes = vec![0u8, 1, 2, 255];
        let encoded = Value::binary_to_base64(&bytes);
        let decoded = Value::binary_from_base64(&encoded).expect("valid base64");
        assert_eq!(decoded, Value::Binary(bytes));
    }

    #[test]
    fn malformed_base64_is_rejected() {
        assert!(Value::binary_from_base64("not valid base64!!").is_err());
    }

    #[test]
    fn deserialize_any_never_produces_date_binary_fd_error_or_shmem() {
        let json = serde_json::json!({
            "a": 1,
            "b": "hello",
            "c": [true, null],
        });
        let text = json.to_string();
        let value: Value = serde_json::from_str(&text).expect("parses as untyped Value");
        match value {
            Value::Dictionary(fields) => {
                assert_eq!(fields.get("a"), Some(&Value::Uint64(1)));
                assert_eq!(fields.get("b"), Some(&Value::String("hello".into())));
                assert_eq!(
                    fields.get("c"),
                    Some(&Value::Array(vec![Value::Bool(true), Value::Null]))
                );
            }
            other => panic!("expected dictionary, got {other:?}"),
        }
    }
}
