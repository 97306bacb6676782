/// A parsed type declaration key: `<class-word> <Name>[<var[, var]…>]`
/// . Whether `class_word` is one of the five recognized
/// words is [`crate::type_reader`]'s concern, not this grammar's — this
/// module only splits the key into its three parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeKey {
    /// The leading word: `struct`, `union`, `enum`, `typedef`, or `type`.
    pub class_word: String,
    /// The declared local name.
    pub name: String,
    /// Declared generic variable names, in declaration order.
    pub generic_vars: Vec<String>,
}

/// Parses a top-level IDL key as a type declaration, if it looks like
/// one: a word, whitespace, a name, and an optional `<var, var>` list.
pub fn parse_type_key(key: &str) -> Option<TypeKey> {
    let (class_word, rest) = key.split_once(' ')?;
    let class_word = class_word.trim();
    let rest = rest.trim();
    if class_word.is_empty() || rest.is_empty() {
        return None;
    }

    let (name, generic_vars) = match rest.find('<') {
        None => (rest.to_string(), Vec::new()),
        Some(open) => {
            if !rest.ends_with('>') {
                return None;
            }
            let name = rest[..open].trim().to_string();
            let inner = &rest[open + 1..rest.len() - 1];
            let vars: Vec<String> =
                inner.split(',').map(str::trim).filter(|v| !v.is_empty()).map(str::to_string).collect();
            (name, vars)
        }
    };
    if name.is_empty() {
        return None;
    }
    Some(TypeKey { class_word: class_word.to_string(), name, generic_vars })
}

/// Parses a `<prefix> <Name>` key (`interface X`, `method X`, `property
/// X`, `event X`), returning `Name` if the prefix matches.
pub fn parse_tagged_key(prefix: &str, key: &str) -> Option<String> {
    let rest = key.strip_prefix(prefix)?.strip_prefix(' ')?;
    let name = rest.trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_struct_key_has_no_generic_vars() {
        let key = parse_type_key("struct Point").unwrap();
        assert_eq!(key.class_word, "struct");
        assert_eq!(key.name, "Point");
        assert!(key.generic_vars.is_empty());
    }

    #[test]
    fn generic_struct_key_extracts_declared_vars_in_order() {
        let key = parse_type_key("struct Pair<A, B>").unwrap();
        assert_eq!(key.name, "Pair");
        assert_eq!(key.generic_vars, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn key_without_a_name_is_rejected() {
        assert!(parse_type_key("struct").is_none());
    }

    #[test]
    fn tagged_key_extracts_its_name() {
        assert_eq!(parse_tagged_key("interface", "interface Calculator").as_deref(), Some("Calculator"));
        assert_eq!(parse_tagged_key("method", "property Foo"), None);
    }
}
