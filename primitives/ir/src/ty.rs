use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};

use crate::Value;

/// The shape a declared type takes, plus `Builtin` for the fourteen
/// pre-registered primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Class {
    /// A product type with named, possibly-inherited fields.
    Struct,
    /// A sum type: exactly one named field is present at a time.
    Union,
    /// A closed set of named, type-less variants.
    Enum,
    /// An alias for another type expression.
    Typedef,
    /// One of the fourteen pre-registered primitive types.
    Builtin,
}

/// A struct/union field or enum variant.
///
/// Enum members carry no `ty`: the variant is named, not typed.
#[derive(Debug, Clone)]
pub struct Member {
    /// Field or variant name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// The member's type, possibly referencing the enclosing type's
    /// generic variables. `None` for enum variants.
    pub ty: Option<Arc<TypeInstance>>,
    /// Validator configuration keyed by constraint name.
    pub constraints: BTreeMap<String, Value>,
}

impl Member {
    /// A struct/union field.
    pub fn field(
        name: impl Into<String>,
        description: impl Into<String>,
        ty: Arc<TypeInstance>,
        constraints: BTreeMap<String, Value>,
    ) -> Self {
        Self { name: name.into(), description: description.into(), ty: Some(ty), constraints }
    }

    /// An enum variant, which carries no type of its own.
    pub fn variant(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            ty: None,
            constraints: BTreeMap::new(),
        }
    }
}

struct TypeInner {
    class: Class,
    parent: Option<Arc<Type>>,
    description: String,
    origin: String,
    generic: bool,
    generic_vars: Vec<String>,
    members: BTreeMap<String, Member>,
    constraints: BTreeMap<String, Value>,
    definition: Option<Arc<TypeInstance>>,
}

/// A named, possibly-generic type declaration.
///
/// Equality and hashing use only `name`. The registry's cyclic-reference
/// strategy registers a `Type` as an empty skeleton before its members are
/// known (so a type reachable from its own typedef can resolve during its
/// own read); comparing by anything but name would be both wrong while the
/// skeleton is still filling in and unnecessary once it's done.
pub struct Type {
    /// Fully-qualified name: `namespace.localname` if the owning file
    /// declares a namespace, otherwise just the local name.
    pub name: String,
    /// The file this type was declared in. `None` for builtins, which are
    /// created before any file is loaded.
    pub file: Option<PathBuf>,
    inner: RwLock<TypeInner>,
}

impl std::fmt::Debug for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Type").field("name", &self.name).field("file", &self.file).finish()
    }
}

impl Type {
    /// Registers an empty skeleton. Everything knowable at the
    /// declaration site (class, generic variables, parent, description,
    /// origin) is set immediately; members and, for a typedef, the
    /// definition are filled in afterwards via [`Type::insert_member`] and
    /// [`Type::set_definition`].
    #[allow(clippy::too_many_arguments)]
    pub fn skeleton(
        name: impl Into<String>,
        class: Class,
        file: Option<PathBuf>,
        origin: impl Into<String>,
        description: impl Into<String>,
        parent: Option<Arc<Type>>,
        generic_vars: Vec<String>,
    ) -> Self {
        let generic = !generic_vars.is_empty();
        Self {
            name: name.into(),
            file,
            inner: RwLock::new(TypeInner {
                class,
                parent,
                description: description.into(),
                origin: origin.into(),
                generic,
                generic_vars,
                members: BTreeMap::new(),
                constraints: BTreeMap::new(),
                definition: None,
            }),
        }
    }

    /// A builtin: no owning file, no parent, no generic variables, no
    /// members. Seeded into the registry at initialization, before any
    /// file is loaded.
    pub fn builtin(name: impl Into<String>) -> Self {
        Self::skeleton(name, Class::Builtin, None, "<builtin>", "", None, Vec::new())
    }

    fn read(&self) -> RwLockReadGuard<'_, TypeInner> {
        self.inner.read().expect("type lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, TypeInner> {
        self.inner.write().expect("type lock poisoned")
    }

    /// The type's class. A body carrying a top-level `type:` key forces
    /// this to `Typedef` regardless of the class-word it was declared
    /// with (see [`Type::force_typedef`]).
    pub fn class(&self) -> Class {
        self.read().class
    }

    /// Forces the class to `Typedef`.
    pub fn force_typedef(&self) {
        self.write().class = Class::Typedef;
    }

    /// The type this one inherits from. Struct/union only.
    pub fn parent(&self) -> Option<Arc<Type>> {
        self.read().parent.clone()
    }

    /// Human-readable description from the IDL.
    pub fn description(&self) -> String {
        self.read().description.clone()
    }

    /// `path:line` of the declaration site.
    pub fn origin(&self) -> String {
        self.read().origin.clone()
    }

    /// Whether this type declares generic variables.
    pub fn is_generic(&self) -> bool {
        self.read().generic
    }

    /// Declared generic variable names, in declaration order.
    pub fn generic_vars(&self) -> Vec<String> {
        self.read().generic_vars.clone()
    }

    /// A snapshot of the member table, including inherited entries copied
    /// in at read time.
    pub fn members(&self) -> BTreeMap<String, Member> {
        self.read().members.clone()
    }

    /// A single member by name, if present.
    pub fn member(&self, name: &str) -> Option<Member> {
        self.read().members.get(name).cloned()
    }

    /// Inserts or overwrites a member. Used by the reader while parsing a
    /// type's own body and while copying a parent's members in by
    /// reference at read time.
    pub fn insert_member(&self, member: Member) {
        self.write().members.insert(member.name.clone(), member);
    }

    /// Validator configuration keyed by constraint name.
    pub fn constraints(&self) -> BTreeMap<String, Value> {
        self.read().constraints.clone()
    }

    /// Replaces the constraint table wholesale, as read once from the
    /// body's top-level `constraints` mapping.
    pub fn set_constraints(&self, constraints: BTreeMap<String, Value>) {
        self.write().constraints = constraints;
    }

    /// The typedef's target. `None` for any non-typedef class, and
    /// briefly `None` for a typedef whose body has not finished reading.
    pub fn definition(&self) -> Option<Arc<TypeInstance>> {
        self.read().definition.clone()
    }

    /// Sets the typedef target. Meaningful only once `class() ==
    /// Class::Typedef`.
    pub fn set_definition(&self, definition: Arc<TypeInstance>) {
        self.write().definition = Some(definition);
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Type {}

impl std::hash::Hash for Type {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

/// A specialized or partially-specialized application of a [`Type`].
#[derive(Debug)]
pub enum TypeInstance {
    /// Resolved to a concrete `Type`, with zero or more of its generic
    /// variables bound to child instances.
    Concrete {
        /// The type this instance applies.
        ty: Arc<Type>,
        /// Generic variable name to bound child instance. Declaration
        /// order lives on `ty.generic_vars()`, not in this map's own
        /// iteration order — canonical-form computation must walk that
        /// list and index in, not iterate this map directly.
        specializations: BTreeMap<String, Arc<TypeInstance>>,
        /// Constraints, defaulted from the type's own constraints at
        /// instantiation time.
        constraints: BTreeMap<String, Value>,
        /// Cached deterministic rendering; also the cache key under
        /// which a non-generic concrete instance lives in the registry.
        canonical_form: String,
    },
    /// Stands for an unresolved generic variable. `canonical_form` is the
    /// variable name itself.
    Proxy {
        /// The generic variable name this instance stands for.
        variable: String,
    },
}

impl TypeInstance {
    /// The deterministic string rendering used as a cache key and as the
    /// `%type` wire value for generic specializations.
    pub fn canonical_form(&self) -> &str {
        match self {
            TypeInstance::Concrete { canonical_form, .. } => canonical_form,
            TypeInstance::Proxy { variable } => variable,
        }
    }

    /// True for a `Proxy` instance.
    pub fn is_proxy(&self) -> bool {
        matches!(self, TypeInstance::Proxy { .. })
    }

    /// The underlying `Type`, for a concrete instance.
    pub fn ty(&self) -> Option<&Arc<Type>> {
        match self {
            TypeInstance::Concrete { ty, .. } => Some(ty),
            TypeInstance::Proxy { .. } => None,
        }
    }

    /// The bound specializations, for a concrete instance.
    pub fn specializations(&self) -> Option<&BTreeMap<String, Arc<TypeInstance>>> {
        match self {
            TypeInstance::Concrete { specializations, .. } => Some(specializations),
            TypeInstance::Proxy { .. } => None,
        }
    }

    /// The merged constraints, for a concrete instance.
    pub fn constraints(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            TypeInstance::Concrete { constraints, .. } => Some(constraints),
            TypeInstance::Proxy { .. } => None,
        }
    }

    /// True iff every one of the type's declared generic variables is
    /// bound. Vacuously true for a non-generic concrete instance.
    pub fn fully_specialized(&self) -> bool {
        match self {
            TypeInstance::Concrete { ty, specializations, .. } => {
                specializations.len() == ty.generic_vars().len()
            }
            TypeInstance::Proxy { .. } => false,
        }
    }

    /// Recursively substitutes every `Proxy` node by its bound instance in
    /// `bindings`, producing the concrete member type for one field of a
    /// generic type once the enclosing type has been instantiated with
    /// concrete arguments. A member's type is
    /// read and stored once, with `Proxy` placeholders for the enclosing
    /// type's generic variables; this is how those placeholders get
    /// resolved per instantiation without re-reading the member. A
    /// variable absent from `bindings` is left as a proxy.
    pub fn specialize(self: &Arc<Self>, bindings: &BTreeMap<String, Arc<TypeInstance>>) -> Arc<TypeInstance> {
        match self.as_ref() {
            TypeInstance::Proxy { variable } => {
                bindings.get(variable).cloned().unwrap_or_else(|| self.clone())
            }
            TypeInstance::Concrete { ty, specializations, constraints, .. } => {
                if specializations.is_empty() {
                    return self.clone();
                }
                let mut new_specializations = BTreeMap::new();
                let mut changed = false;
                for (var, child) in specializations {
                    let new_child = child.specialize(bindings);
                    if !Arc::ptr_eq(&new_child, child) {
                        changed = true;
                    }
                    new_specializations.insert(var.clone(), new_child);
                }
                if !changed {
                    return self.clone();
                }
                let canonical_form = canonical_form_for(ty, &new_specializations);
                Arc::new(TypeInstance::Concrete {
                    ty: ty.clone(),
                    specializations: new_specializations,
                    constraints: constraints.clone(),
                    canonical_form,
                })
            }
        }
    }

    /// Replaces a typedef-class instance by its definition, repeatedly,
    /// until a non-typedef (or proxy) instance is reached.
    ///
    /// Pure and lookup-free: a typedef's definition is already resolved
    /// and attached to its `Type` at read time, so
    /// unwinding never needs the registry. `unwind(unwind(ti)) ==
    /// unwind(ti)` always holds because the loop only stops once it finds
    /// a non-typedef.
    pub fn unwind(self: &Arc<Self>) -> Arc<Self> {
        let mut current = self.clone();
        loop {
            match current.ty() {
                Some(ty) if ty.class() == Class::Typedef => match ty.definition() {
                    Some(def) => current = def,
                    None => return current,
                },
                _ => return current,
            }
        }
    }
}

/// Computes the canonical-form string for `ty` given bound
/// `specializations`: the bare type name if non-generic, otherwise
/// `name<canon(var1),canon(var2),...>` with variables rendered in
/// declared order rather than the specializations
/// map's own (lexicographic) order. A variable with no bound
/// specialization yet renders as its own name, i.e. as a proxy would.
pub fn canonical_form_for(ty: &Arc<Type>, specializations: &BTreeMap<String, Arc<TypeInstance>>) -> String {
    let vars = ty.generic_vars();
    if vars.is_empty() {
        return ty.name.clone();
    }
    let rendered: Vec<&str> = vars
        .iter()
        .map(|var| specializations.get(var).map(|ti| ti.canonical_form()).unwrap_or(var.as_str()))
        .collect();
    format!("{}<{}>", ty.name, rendered.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skeleton_starts_with_empty_members() {
        let t = Type::skeleton(
            "demo.Point",
            Class::Struct,
            None,
            "demo.yaml:3",
            "a point",
            None,
            Vec::new(),
        );
        assert!(t.members().is_empty());
        assert_eq!(t.class(), Class::Struct);
        assert!(!t.is_generic());
    }

    #[test]
    fn members_fill_in_after_skeleton_registration() {
        let t = Type::skeleton("demo.Point", Class::Struct, None, "", "", None, Vec::new());
        let int64 = Arc::new(Type::builtin("int64"));
        let x_type = Arc::new(TypeInstance::Concrete {
            ty: int64,
            specializations: BTreeMap::new(),
            constraints: BTreeMap::new(),
            canonical_form: "int64".to_string(),
        });
        t.insert_member(Member::field("x", "", x_type, BTreeMap::new()));
        assert_eq!(t.members().len(), 1);
        assert!(t.member("x").is_some());
    }

    #[test]
    fn equality_and_hash_use_only_name() {
        let a = Type::skeleton("demo.Point", Class::Struct, None, "", "", None, Vec::new());
        let b = Type::skeleton("demo.Point", Class::Union, None, "different origin", "x", None, Vec::new());
        assert_eq!(a, b);
    }

    #[test]
    fn non_generic_concrete_instance_is_fully_specialized() {
        let string_ty = Arc::new(Type::builtin("string"));
        let ti = TypeInstance::Concrete {
            ty: string_ty,
            specializations: BTreeMap::new(),
            constraints: BTreeMap::new(),
            canonical_form: "string".to_string(),
        };
        assert!(ti.fully_specialized());
        assert_eq!(ti.canonical_form(), "string");
    }

    #[test]
    fn proxy_reports_its_variable_as_canonical_form() {
        let proxy = TypeInstance::Proxy { variable: "T".to_string() };
        assert!(proxy.is_proxy());
        assert_eq!(proxy.canonical_form(), "T");
        assert!(proxy.ty().is_none());
    }

    #[test]
    fn specialize_substitutes_a_proxy_with_its_bound_instance() {
        let string_ty = Arc::new(Type::builtin("string"));
        let string_ti = Arc::new(TypeInstance::Concrete {
            ty: string_ty,
            specializations: BTreeMap::new(),
            constraints: BTreeMap::new(),
            canonical_form: "string".to_string(),
        });

        let proxy_t: Arc<TypeInstance> = Arc::new(TypeInstance::Proxy { variable: "T".to_string() });
        let mut bindings = BTreeMap::new();
        bindings.insert("T".to_string(), string_ti.clone());
        let specialized = proxy_t.specialize(&bindings);
        assert_eq!(specialized.canonical_form(), "string");
        assert!(Arc::ptr_eq(&specialized, &string_ti));
    }

    #[test]
    fn specialize_rewrites_canonical_form_of_a_generic_member_type() {
        // Bar<T>, with T left as a proxy until the enclosing type is instantiated.
        let bar_ty = Arc::new(Type::skeleton(
            "demo.Bar",
            Class::Struct,
            None,
            "",
            "",
            None,
            vec!["T".to_string()],
        ));
        let proxy_t: Arc<TypeInstance> = Arc::new(TypeInstance::Proxy { variable: "T".to_string() });
        let mut bar_specializations = BTreeMap::new();
        bar_specializations.insert("T".to_string(), proxy_t);
        let bar_of_t = Arc::new(TypeInstance::Concrete {
            ty: bar_ty.clone(),
            specializations: bar_specializations,
            constraints: BTreeMap::new(),
            canonical_form: canonical_form_for(
                &bar_ty,
                &{
                    let mut m = BTreeMap::new();
                    m.insert(
                        "T".to_string(),
                        Arc::new(TypeInstance::Proxy { variable: "T".to_string() }) as Arc<TypeInstance>,
                    );
                    m
                },
            ),
        });
        assert_eq!(bar_of_t.canonical_form(), "demo.Bar<T>");

        let string_ty = Arc::new(Type::builtin("string"));
        let string_ti = Arc::new(TypeInstance::Concrete {
            ty: string_ty,
            specializations: BTreeMap::new(),
            constraints: BTreeMap::new(),
            canonical_form: "string".to_string(),
        });
        let mut bindings = BTreeMap::new();
        bindings.insert("T".to_string(), string_ti);

        let specialized = bar_of_t.specialize(&bindings);
        assert_eq!(specialized.canonical_form(), "demo.Bar<string>");
    }

    #[test]
    fn unwind_follows_typedef_chain_to_a_non_typedef() {
        let string_ty = Arc::new(Type::builtin("string"));
        let string_ti = Arc::new(TypeInstance::Concrete {
            ty: string_ty,
            specializations: BTreeMap::new(),
            constraints: BTreeMap::new(),
            canonical_form: "string".to_string(),
        });

        let alias_ty =
            Arc::new(Type::skeleton("demo.Alias", Class::Typedef, None, "", "", None, Vec::new()));
        alias_ty.set_definition(string_ti.clone());
        let alias_ti = Arc::new(TypeInstance::Concrete {
            ty: alias_ty,
            specializations: BTreeMap::new(),
            constraints: BTreeMap::new(),
            canonical_form: "demo.Alias".to_string(),
        });

        let unwound = alias_ti.unwind();
        assert_eq!(unwound.ty().map(|t| t.name.as_str()), Some("string"));
        assert!(Arc::ptr_eq(&unwound.unwind(), &unwound));
    }
}
