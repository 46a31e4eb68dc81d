//! Built-in type-name registry
//!
//! Maps the names usable in type position (`int`, `Revision`,
//! `ChangeKind`, ...) to types, and holds the protocol descriptors that
//! record and enumeration types are checked against. A registry is built
//! once and only read afterwards.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::schema;
use crate::types::Type;

lazy_static::lazy_static! {
    static ref STANDARD: Arc<TypeRegistry> = Arc::new(schema::standard_registry());
}

/// A record attribute: its position in the protocol message and its type
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub index: usize,
    pub ty: Type,
}

/// Protocol record descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct ProtoTuple {
    pub name: String,
    attributes: BTreeMap<String, Attribute>,
}

impl ProtoTuple {
    pub fn new(name: &str) -> Self {
        ProtoTuple {
            name: name.to_string(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add an attribute at the given message index
    pub fn field(mut self, index: usize, name: &str, ty: Type) -> Self {
        self.attributes
            .insert(name.to_string(), Attribute { index, ty });
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    /// Attributes ordered by message index
    pub fn attributes(&self) -> Vec<(&str, &Attribute)> {
        let mut attrs: Vec<_> = self
            .attributes
            .iter()
            .map(|(name, attr)| (name.as_str(), attr))
            .collect();
        attrs.sort_by_key(|(_, attr)| attr.index);
        attrs
    }
}

/// Protocol enumeration descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct ProtoEnum {
    pub name: String,
    pub values: Vec<String>,
}

impl ProtoEnum {
    pub fn new(name: &str, values: &[&str]) -> Self {
        ProtoEnum {
            name: name.to_string(),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    pub fn has_value(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }
}

#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    names: HashMap<String, Type>,
    records: HashMap<String, ProtoTuple>,
    enums: HashMap<String, ProtoEnum>,
}

impl TypeRegistry {
    /// A registry holding only the scalar base types
    pub fn new() -> Self {
        let mut registry = TypeRegistry::default();
        for (name, ty) in [
            ("bool", Type::Bool),
            ("int", Type::Int),
            ("float", Type::Float),
            ("string", Type::String),
            ("bytes", Type::Bytes),
            ("time", Type::Time),
        ] {
            registry.names.insert(name.to_string(), ty);
        }
        registry
    }

    /// The shared standard registry (base types plus the mining schema)
    pub fn standard() -> Arc<TypeRegistry> {
        Arc::clone(&STANDARD)
    }

    pub fn add_record(&mut self, record: ProtoTuple) {
        self.names
            .insert(record.name.clone(), Type::Record(record.name.clone()));
        self.records.insert(record.name.clone(), record);
    }

    pub fn add_enum(&mut self, enumeration: ProtoEnum) {
        self.names.insert(
            enumeration.name.clone(),
            Type::Enum(enumeration.name.clone()),
        );
        self.enums.insert(enumeration.name.clone(), enumeration);
    }

    /// Is `name` a known type name?
    pub fn has_type(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn lookup(&self, name: &str) -> Option<&Type> {
        self.names.get(name)
    }

    pub fn record(&self, name: &str) -> Option<&ProtoTuple> {
        self.records.get(name)
    }

    pub fn enumeration(&self, name: &str) -> Option<&ProtoEnum> {
        self.enums.get(name)
    }

    /// All type names, sorted
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.names.keys().map(|n| n.as_str()).collect();
        names.sort();
        names
    }

    /// Parse the type syntax used in configuration files:
    /// base and schema names, `any`, `array of T`, `stack of T`,
    /// `map[K] of V`.
    pub fn parse_type(&self, text: &str) -> Option<Type> {
        let text = text.trim();
        if text == "any" {
            return Some(Type::Any);
        }
        if let Some(rest) = text.strip_prefix("array of ") {
            return self.parse_type(rest).map(Type::array);
        }
        if let Some(rest) = text.strip_prefix("stack of ") {
            return self.parse_type(rest).map(Type::stack);
        }
        if let Some(rest) = text.strip_prefix("map[") {
            let close = rest.find(']')?;
            let key = self.parse_type(&rest[..close])?;
            let value = self.parse_type(rest[close + 1..].trim_start().strip_prefix("of ")?)?;
            return Some(Type::map(key, value));
        }
        self.lookup(text).cloned()
    }
}
