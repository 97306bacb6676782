//! Composable named validators.
//!
//! The IDL's own constraint names and semantics aren't specified, so this
//! module ships a small, representative set — numeric bounds and length
//! bounds — rather than the open-ended arithmetic constraint solver the
//! spec explicitly excludes as a non-goal. Recorded as an Open Question
//! decision in DESIGN.md.

use std::collections::{BTreeMap, HashMap};

use ir::{ErrorContext, Value};

/// One named, composable constraint check.
///
/// `config` is the value attached to the constraint in the IDL, e.g. `10`
/// for `constraints: {max-length: 10}`.
pub trait Validator: Send + Sync {
    /// The constraint name this validator answers to, e.g. `"max-length"`.
    fn name(&self) -> &str;

    /// Checks `value` against `config`, appending an error to `ctx` and
    /// returning `false` on failure.
    fn validate(&self, value: &Value, config: &Value, ctx: &mut ErrorContext) -> bool;
}

/// Dispatch table from `(wire type name, constraint name)` to the
/// [`Validator`] that handles it.
pub struct ValidatorRegistry {
    validators: HashMap<(&'static str, &'static str), Box<dyn Validator>>,
}

impl ValidatorRegistry {
    /// `min`/`max` for the numeric builtins, `min-length`/`max-length` for
    /// string, binary, and array, and `nonempty` for string and array.
    pub fn with_builtins() -> Self {
        let mut validators: HashMap<(&'static str, &'static str), Box<dyn Validator>> =
            HashMap::new();
        for wire_type in ["uint64", "int64", "double"] {
            validators.insert((wire_type, "min"), Box::new(Min));
            validators.insert((wire_type, "max"), Box::new(Max));
        }
        for wire_type in ["string", "binary", "array"] {
            validators.insert((wire_type, "min-length"), Box::new(MinLength));
            validators.insert((wire_type, "max-length"), Box::new(MaxLength));
            validators.insert((wire_type, "nonempty"), Box::new(Nonempty));
        }
        Self { validators }
    }

    /// The validator registered for `(wire_type, constraint_name)`, if any.
    pub fn get(&self, wire_type: &str, constraint_name: &str) -> Option<&dyn Validator> {
        self.validators.iter().find_map(|((w, n), v)| {
            (*w == wire_type && *n == constraint_name).then(|| v.as_ref())
        })
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Runs every constraint in `constraints` against `value`, looking each up
/// by `(wire_type, constraint name)`. A constraint name with no validator
/// registered for this wire type is skipped, not an error: the constraint
/// may simply not apply to this kind of value. Never short-circuits —
/// every constraint runs so every failure is recorded.
pub fn run_validators(
    constraints: &BTreeMap<String, Value>,
    wire_type: &str,
    value: &Value,
    ctx: &mut ErrorContext,
    registry: &ValidatorRegistry,
) -> bool {
    let mut ok = true;
    for (name, config) in constraints {
        if let Some(validator) = registry.get(wire_type, name) {
            if !validator.validate(value, config, ctx) {
                ok = false;
            }
        }
    }
    ok
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Uint64(n) => Some(*n as f64),
        Value::Int64(n) => Some(*n as f64),
        Value::Double(d) => Some(*d),
        _ => None,
    }
}

fn length_of(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Binary(b) => Some(b.len()),
        Value::Array(a) => Some(a.len()),
        _ => None,
    }
}

struct Min;

impl Validator for Min {
    fn name(&self) -> &str {
        "min"
    }

    fn validate(&self, value: &Value, config: &Value, ctx: &mut ErrorContext) -> bool {
        match (as_f64(value), as_f64(config)) {
            (Some(v), Some(min)) if v < min => {
                ctx.add(format!("value {v} is below the minimum of {min}"));
                false
            }
            _ => true,
        }
    }
}

struct Max;

impl Validator for Max {
    fn name(&self) -> &str {
        "max"
    }

    fn validate(&self, value: &Value, config: &Value, ctx: &mut ErrorContext) -> bool {
        match (as_f64(value), as_f64(config)) {
            (Some(v), Some(max)) if v > max => {
                ctx.add(format!("value {v} exceeds the maximum of {max}"));
                false
            }
            _ => true,
        }
    }
}

struct MinLength;

impl Validator for MinLength {
    fn name(&self) -> &str {
        "min-length"
    }

    fn validate(&self, value: &Value, config: &Value, ctx: &mut ErrorContext) -> bool {
        match (length_of(value), as_f64(config)) {
            (Some(len), Some(min)) if (len as f64) < min => {
                ctx.add(format!("length {len} is below the minimum of {min}"));
                false
            }
            _ => true,
        }
    }
}

struct MaxLength;

impl Validator for MaxLength {
    fn name(&self) -> &str {
        "max-length"
    }

    fn validate(&self, value: &Value, config: &Value, ctx: &mut ErrorContext) -> bool {
        match (length_of(value), as_f64(config)) {
            (Some(len), Some(max)) if (len as f64) > max => {
                ctx.add(format!("length {len} exceeds the maximum of {max}"));
                false
            }
            _ => true,
        }
    }
}

struct Nonempty;

impl Validator for Nonempty {
    fn name(&self) -> &str {
        "nonempty"
    }

    fn validate(&self, value: &Value, config: &Value, ctx: &mut ErrorContext) -> bool {
        let required = !matches!(config, Value::Bool(false));
        if required && length_of(value) == Some(0) {
            ctx.add("value must not be empty");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_and_max_bracket_a_numeric_value() {
        let registry = ValidatorRegistry::with_builtins();
        let mut constraints = BTreeMap::new();
        constraints.insert("min".to_string(), Value::Int64(0));
        constraints.insert("max".to_string(), Value::Int64(10));

        let mut ctx = ErrorContext::new();
        assert!(run_validators(&constraints, "int64", &Value::Int64(5), &mut ctx, &registry));
        assert!(ctx.errors.is_empty());

        let mut ctx = ErrorContext::new();
        assert!(!run_validators(&constraints, "int64", &Value::Int64(20), &mut ctx, &registry));
        assert_eq!(ctx.errors.len(), 1);
    }

    #[test]
    fn unregistered_combination_is_skipped_not_an_error() {
        let registry = ValidatorRegistry::with_builtins();
        let mut constraints = BTreeMap::new();
        constraints.insert("format".to_string(), Value::String("email".into()));

        let mut ctx = ErrorContext::new();
        assert!(run_validators(&constraints, "string", &Value::String("x".into()), &mut ctx, &registry));
        assert!(ctx.errors.is_empty());
    }

    #[test]
    fn max_length_rejects_an_overlong_string() {
        let registry = ValidatorRegistry::with_builtins();
        let mut constraints = BTreeMap::new();
        constraints.insert("max-length".to_string(), Value::Uint64(3));

        let mut ctx = ErrorContext::new();
        assert!(!run_validators(
            &constraints,
            "string",
            &Value::String("abcdef".into()),
            &mut ctx,
            &registry
        ));
    }
}
