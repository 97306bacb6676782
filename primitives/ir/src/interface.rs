use std::collections::BTreeMap;
use std::sync::Arc;

use crate::TypeInstance;

/// A named, ordered argument to a method.
#[derive(Debug, Clone)]
pub struct Argument {
    /// Argument name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Declared type.
    pub ty: Arc<TypeInstance>,
}

/// The read/write access a property declares. Exactly one of these, plus
/// an independent `notify` flag, describes a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyAccess {
    /// Readable only.
    ReadOnly,
    /// Writable only.
    WriteOnly,
    /// Both readable and writable.
    ReadWrite,
}

/// One named method, property, or event on an [`Interface`].
#[derive(Debug, Clone)]
pub enum InterfaceMember {
    /// A callable operation with positional arguments and an optional
    /// result type.
    Method {
        /// Human-readable description.
        description: String,
        /// Declared arguments, in call order.
        args: Vec<Argument>,
        /// Declared return type, if any.
        result: Option<Arc<TypeInstance>>,
    },
    /// A named, typed attribute.
    Property {
        /// Human-readable description.
        description: String,
        /// Declared type.
        result: Arc<TypeInstance>,
        /// Read/write access.
        access: PropertyAccess,
        /// Whether changes to this property are announced.
        notify: bool,
    },
    /// A named notification, optionally carrying a payload type.
    Event {
        /// Human-readable description.
        description: String,
        /// Declared payload type, if any.
        result: Option<Arc<TypeInstance>>,
    },
}

/// A collection of named methods, properties, and events.
#[derive(Debug, Clone, Default)]
pub struct Interface {
    /// Fully-qualified interface name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Members keyed by name.
    pub members: BTreeMap<String, InterfaceMember>,
}

impl Interface {
    /// A new interface with no members yet.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self { name: name.into(), description: description.into(), members: BTreeMap::new() }
    }

    /// Inserts or overwrites a member.
    pub fn insert_member(&mut self, name: impl Into<String>, member: InterfaceMember) {
        self.members.insert(name.into(), member);
    }
}
