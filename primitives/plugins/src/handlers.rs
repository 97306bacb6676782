//! The five built-in [`ClassHandler`]s: one per [`Class`] variant.
//!
//! Struct, union, and typedef share the same default wire form —
//! recurse into dictionary fields, tag with `%type` — so only enum and
//! builtin need their own `serialize`/`deserialize`; only struct, union,
//! and enum need their own `validate` (typedef is unwound before dispatch
//! reaches it in this implementation, and builtin's validate is pure
//! constraint-checking).

use std::collections::BTreeMap;
use std::sync::Arc;

use ir::{Class, ErrorContext, Member, RpcObject, Type, TypeInstance, Value};

use crate::validator::{run_validators, ValidatorRegistry};
use crate::{ClassError, ClassHandler, Recurse, RecurseDeserialize, RecurseSerialize, Resolve};

fn as_dict(value: &Value) -> Option<&BTreeMap<String, Value>> {
    match value {
        Value::Dictionary(d) => Some(d),
        _ => None,
    }
}

fn as_str(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s),
        _ => None,
    }
}

fn parse_constraints(body: &BTreeMap<String, Value>) -> BTreeMap<String, Value> {
    body.get("constraints").and_then(as_dict).cloned().unwrap_or_default()
}

/// Re-specializes `ti`'s constraints, as the reader does for a member
/// whose body overrides the declared type's own constraint table.
/// A proxy carries no constraints to override; returned unchanged.
fn with_constraints(ti: &Arc<TypeInstance>, constraints: BTreeMap<String, Value>) -> Arc<TypeInstance> {
    match ti.as_ref() {
        TypeInstance::Concrete { ty, specializations, canonical_form, .. } => {
            Arc::new(TypeInstance::Concrete {
                ty: ty.clone(),
                specializations: specializations.clone(),
                constraints,
                canonical_form: canonical_form.clone(),
            })
        }
        TypeInstance::Proxy { .. } => ti.clone(),
    }
}

/// Shared `parse_member` body for struct and union fields: `{type:
/// <decl>, description?: <str>, constraints?: {...}}`.
fn parse_field_member(
    name: &str,
    body: &Value,
    resolve: &mut Resolve<'_>,
) -> Result<Member, ClassError> {
    let dict = as_dict(body)
        .ok_or_else(|| ClassError::Unsupported(format!("member '{name}' body must be a mapping")))?;
    let type_decl = dict
        .get("type")
        .and_then(as_str)
        .ok_or_else(|| ClassError::MissingField(name.to_string(), "type"))?;
    let description = dict.get("description").and_then(as_str).unwrap_or_default();
    let constraints = parse_constraints(dict);

    let resolved = resolve(type_decl)?;
    let ty = with_constraints(&resolved, constraints.clone());
    Ok(Member::field(name, description, ty, constraints))
}

/// The product-type class: all members present, each individually valid.
pub struct StructHandler;

impl ClassHandler for StructHandler {
    fn class(&self) -> Class {
        Class::Struct
    }

    fn parse_member(
        &self,
        name: &str,
        body: &Value,
        _owning_type: &Arc<Type>,
        resolve: &mut Resolve<'_>,
    ) -> Result<Member, ClassError> {
        parse_field_member(name, body, resolve)
    }

    fn validate(
        &self,
        instance: &Arc<TypeInstance>,
        value: &RpcObject,
        ctx: &mut ErrorContext,
        recurse: &mut Recurse<'_>,
    ) -> bool {
        let ty = instance.ty().expect("struct instance must be concrete");
        let dict = match as_dict(&value.value) {
            Some(d) => d,
            None => {
                ctx.add(format!(
                    "incompatible type {}: expected a struct, got {}",
                    ty.name,
                    value.value.wire_type_name()
                ));
                return false;
            }
        };

        let no_bindings = BTreeMap::new();
        let bindings = instance.specializations().unwrap_or(&no_bindings);

        let mut ok = true;
        for (name, member) in ty.members() {
            let Some(member_ty) = member.ty.as_ref() else { continue };
            let specialized = member_ty.specialize(bindings);
            match dict.get(&name) {
                Some(field_value) => {
                    let field_obj = RpcObject::untyped(field_value.clone());
                    if !ctx.scoped(&name, |ctx| recurse(&specialized, &field_obj, ctx)) {
                        ok = false;
                    }
                }
                None => {
                    ctx.scoped(&name, |ctx| ctx.add("missing required field"));
                    ok = false;
                }
            }
        }

        let constraints = instance.constraints().cloned().unwrap_or_default();
        if !run_validators(
            &constraints,
            instance.canonical_form(),
            &value.value,
            ctx,
            &ValidatorRegistry::with_builtins(),
        ) {
            ok = false;
        }
        ok
    }
}

/// The sum-type class: exactly one member present.
pub struct UnionHandler;

impl ClassHandler for UnionHandler {
    fn class(&self) -> Class {
        Class::Union
    }

    fn parse_member(
        &self,
        name: &str,
        body: &Value,
        _owning_type: &Arc<Type>,
        resolve: &mut Resolve<'_>,
    ) -> Result<Member, ClassError> {
        parse_field_member(name, body, resolve)
    }

    fn validate(
        &self,
        instance: &Arc<TypeInstance>,
        value: &RpcObject,
        ctx: &mut ErrorContext,
        recurse: &mut Recurse<'_>,
    ) -> bool {
        let ty = instance.ty().expect("union instance must be concrete");
        let dict = match as_dict(&value.value) {
            Some(d) => d,
            None => {
                ctx.add(format!(
                    "incompatible type {}: expected a union, got {}",
                    ty.name,
                    value.value.wire_type_name()
                ));
                return false;
            }
        };

        let members = ty.members();
        let present: Vec<&String> =
            dict.keys().filter(|key| members.contains_key(key.as_str())).collect();

        let no_bindings = BTreeMap::new();
        let bindings = instance.specializations().unwrap_or(&no_bindings);

        let mut ok = match present.as_slice() {
            [branch] => {
                let member = &members[branch.as_str()];
                let member_ty = member.ty.as_ref().expect("union branch must have a type");
                let specialized = member_ty.specialize(bindings);
                let field_obj = RpcObject::untyped(dict[branch.as_str()].clone());
                ctx.scoped(branch, |ctx| recurse(&specialized, &field_obj, ctx))
            }
            [] => {
                ctx.add(format!("no branch of union {} is present", ty.name));
                false
            }
            branches => {
                ctx.add(format!(
                    "multiple branches of union {} are present: {}",
                    ty.name,
                    branches.iter().map(|s| s.as_str()).collect::<Vec<_>>().join(", ")
                ));
                false
            }
        };

        let constraints = instance.constraints().cloned().unwrap_or_default();
        if !run_validators(
            &constraints,
            instance.canonical_form(),
            &value.value,
            ctx,
            &ValidatorRegistry::with_builtins(),
        ) {
            ok = false;
        }
        ok
    }
}

/// The closed-set-of-names class. Variants carry no type of their own;
/// a value is a bare string matching one of the declared variant names.
pub struct EnumHandler;

impl ClassHandler for EnumHandler {
    fn class(&self) -> Class {
        Class::Enum
    }

    fn parse_member(
        &self,
        name: &str,
        body: &Value,
        _owning_type: &Arc<Type>,
        _resolve: &mut Resolve<'_>,
    ) -> Result<Member, ClassError> {
        let description =
            as_dict(body).and_then(|d| d.get("description")).and_then(as_str).unwrap_or_default();
        Ok(Member::variant(name, description))
    }

    fn validate(
        &self,
        instance: &Arc<TypeInstance>,
        value: &RpcObject,
        ctx: &mut ErrorContext,
        _recurse: &mut Recurse<'_>,
    ) -> bool {
        let ty = instance.ty().expect("enum instance must be concrete");
        match as_str(&value.value) {
            Some(variant) if ty.members().contains_key(variant) => true,
            Some(variant) => {
                ctx.add(format!("'{variant}' is not a variant of {}", ty.name));
                false
            }
            None => {
                ctx.add(format!(
                    "incompatible type {}: expected a variant name, got {}",
                    ty.name,
                    value.value.wire_type_name()
                ));
                false
            }
        }
    }

    fn serialize(
        &self,
        instance: &Arc<TypeInstance>,
        value: &RpcObject,
        _recurse: &mut RecurseSerialize<'_>,
    ) -> Value {
        let mut fields = BTreeMap::new();
        fields.insert("%type".to_string(), Value::String(instance.canonical_form().to_string()));
        fields.insert("%value".to_string(), value.value.clone());
        Value::Dictionary(fields)
    }

    fn deserialize(
        &self,
        instance: Arc<TypeInstance>,
        remainder: Value,
        _recurse: &mut RecurseDeserialize<'_>,
    ) -> Result<RpcObject, ClassError> {
        Ok(RpcObject::typed(remainder, instance))
    }
}

/// The alias class. A typedef's `TypeInstance`s are unwound to their
/// definition before compatibility checks and class dispatch, so this handler is reached only if a
/// caller dispatches directly on an un-unwound typedef instance; it
/// defers to the definition either way.
pub struct TypedefHandler;

impl ClassHandler for TypedefHandler {
    fn class(&self) -> Class {
        Class::Typedef
    }

    fn parse_member(
        &self,
        name: &str,
        _body: &Value,
        _owning_type: &Arc<Type>,
        _resolve: &mut Resolve<'_>,
    ) -> Result<Member, ClassError> {
        Err(ClassError::Unsupported(format!("typedef types do not declare members ('{name}')")))
    }

    fn validate(
        &self,
        instance: &Arc<TypeInstance>,
        value: &RpcObject,
        ctx: &mut ErrorContext,
        recurse: &mut Recurse<'_>,
    ) -> bool {
        let ty = instance.ty().expect("typedef instance must be concrete");
        match ty.definition() {
            Some(definition) => recurse(&definition, value, ctx),
            None => {
                ctx.add(format!("typedef {} has no definition", ty.name));
                false
            }
        }
    }
}

/// The fourteen pre-registered primitive types. Containers (`dictionary`,
/// `array`) and `any` never carry a `%type` tag of their own on the wire
/// , so only the true scalars need `serialize`/`deserialize`
/// overrides; `dictionary`/`array`/`any` fall back to the trait defaults
/// (inherited as-is, since they're never dispatched to a builtin
/// top-level value bearing a `%type`).
pub struct BuiltinHandler;

impl ClassHandler for BuiltinHandler {
    fn class(&self) -> Class {
        Class::Builtin
    }

    fn parse_member(
        &self,
        name: &str,
        _body: &Value,
        _owning_type: &Arc<Type>,
        _resolve: &mut Resolve<'_>,
    ) -> Result<Member, ClassError> {
        Err(ClassError::Unsupported(format!("builtin types do not declare members ('{name}')")))
    }

    fn validate(
        &self,
        instance: &Arc<TypeInstance>,
        value: &RpcObject,
        ctx: &mut ErrorContext,
        _recurse: &mut Recurse<'_>,
    ) -> bool {
        let constraints = instance.constraints().cloned().unwrap_or_default();
        run_validators(
            &constraints,
            instance.canonical_form(),
            &value.value,
            ctx,
            &ValidatorRegistry::with_builtins(),
        )
    }

    fn serialize(
        &self,
        instance: &Arc<TypeInstance>,
        value: &RpcObject,
        _recurse: &mut RecurseSerialize<'_>,
    ) -> Value {
        match instance.canonical_form() {
            "dictionary" | "array" | "any" => value.value.clone(),
            name => {
                let mut fields = BTreeMap::new();
                fields.insert("%type".to_string(), Value::String(name.to_string()));
                fields.insert("%value".to_string(), value.value.clone());
                Value::Dictionary(fields)
            }
        }
    }

    fn deserialize(
        &self,
        instance: Arc<TypeInstance>,
        remainder: Value,
        _recurse: &mut RecurseDeserialize<'_>,
    ) -> Result<RpcObject, ClassError> {
        let value = match (instance.canonical_form(), remainder) {
            ("date", Value::String(s)) => {
                Value::date_from_rfc3339(&s).map_err(|e| ClassError::Decode("date", e.to_string()))?
            }
            ("binary", Value::String(s)) => Value::binary_from_base64(&s)
                .map_err(|e| ClassError::Decode("binary", e.to_string()))?,
            (_, other) => other,
        };
        Ok(RpcObject::typed(value, instance))
    }
}

/// The generic wire form used by struct, union, and (defensively) typedef:
/// recurse into dictionary fields, tag the whole object with `%type`.
pub(crate) fn default_serialize(
    instance: &Arc<TypeInstance>,
    value: &RpcObject,
    recurse: &mut RecurseSerialize<'_>,
) -> Value {
    let dict = match as_dict(&value.value) {
        Some(d) => d,
        None => return value.value.clone(),
    };
    let mut fields = BTreeMap::new();
    fields.insert("%type".to_string(), Value::String(instance.canonical_form().to_string()));
    for (name, field_value) in dict {
        let child = RpcObject::untyped(field_value.clone());
        fields.insert(name.clone(), recurse(&child));
    }
    Value::Dictionary(fields)
}

/// The inverse of [`default_serialize`]. `remainder` is the struct body
/// with `%type` already detached by the caller.
pub(crate) fn default_deserialize(
    instance: Arc<TypeInstance>,
    remainder: Value,
    recurse: &mut RecurseDeserialize<'_>,
) -> Result<RpcObject, ClassError> {
    let dict = match remainder {
        Value::Dictionary(d) => d,
        other => {
            let mut fields = BTreeMap::new();
            fields.insert("%value".to_string(), other);
            fields
        }
    };
    let mut fields = BTreeMap::new();
    for (name, raw) in dict {
        let child = recurse(raw)?;
        fields.insert(name, child.value);
    }
    Ok(RpcObject::typed(Value::Dictionary(fields), instance))
}
