//! Type system for Boa
//!
//! Defines the type representation attached to checked nodes and the
//! compatibility rules between types: `assigns`, `compares` and
//! `arithmetics`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Static types
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    /// Boolean type
    Bool,

    /// 64-bit integer type
    Int,

    /// Floating point type
    Float,

    /// String type
    String,

    /// Byte sequence type
    Bytes,

    /// Timestamp type
    Time,

    /// Ordered array `array of T`
    Array(Box<Type>),

    /// Map `map[K] of V`
    Map { key: Box<Type>, value: Box<Type> },

    /// Tuple of positional or named members; named members are `Type::Name`
    Tuple(Vec<Type>),

    /// Stack `stack of T`
    Stack(Box<Type>),

    /// Protocol record, described by the schema in the type registry
    Record(String),

    /// Protocol enumeration, described by the schema in the type registry
    Enum(String),

    /// Repeated protocol field
    ProtoList(Box<Type>),

    /// Function type; parameters are usually `Type::Name`
    Function {
        params: Vec<Type>,
        return_type: Box<Type>,
    },

    /// A declared identifier paired with its type
    Name { name: String, ty: Box<Type> },

    /// Output table
    Table(Box<TableType>),

    /// Visitor type
    Visitor,

    /// Type variable, only found in built-in signatures
    Var(String),

    /// Return type of a body that returns nothing explicit
    Any,
}

/// An output table: where emitted values go and how they are aggregated
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableType {
    pub value: Type,
    pub indices: Vec<Type>,
    pub weight: Option<Type>,
    pub aggregator: AggregatorBinding,
}

/// The aggregator contract a table was declared against
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggregatorBinding {
    pub name: String,
    /// Number of formal parameters the aggregator declares
    pub arity: usize,
    pub weight_type: Option<Type>,
}

impl Type {
    pub fn array(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    pub fn stack(element: Type) -> Type {
        Type::Stack(Box::new(element))
    }

    pub fn proto_list(element: Type) -> Type {
        Type::ProtoList(Box::new(element))
    }

    pub fn map(key: Type, value: Type) -> Type {
        Type::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn function(params: Vec<Type>, return_type: Type) -> Type {
        Type::Function {
            params,
            return_type: Box::new(return_type),
        }
    }

    pub fn named(name: impl Into<String>, ty: Type) -> Type {
        Type::Name {
            name: name.into(),
            ty: Box::new(ty),
        }
    }

    pub fn var(name: &str) -> Type {
        Type::Var(name.to_string())
    }

    /// Strip any `Name` wrappers
    pub fn unnamed(&self) -> &Type {
        match self {
            Type::Name { ty, .. } => ty.unnamed(),
            other => other,
        }
    }

    /// The type a use of this value yields: names are stripped and
    /// functions stand for their return type.
    pub fn value_type(&self) -> &Type {
        match self {
            Type::Name { ty, .. } => ty.value_type(),
            Type::Function { return_type, .. } => return_type.value_type(),
            other => other,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(
            self.unnamed(),
            Type::Bool
                | Type::Int
                | Type::Float
                | Type::String
                | Type::Bytes
                | Type::Time
                | Type::Enum(_)
        )
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.unnamed(), Type::Int | Type::Float)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self.unnamed(), Type::Bool)
    }

    pub fn is_int(&self) -> bool {
        matches!(self.unnamed(), Type::Int)
    }

    pub fn is_function(&self) -> bool {
        matches!(self.unnamed(), Type::Function { .. })
    }

    /// The type of the empty composite `{}`, `map[any] of any`
    pub fn is_empty_composite(&self) -> bool {
        match self.unnamed() {
            Type::Map { key, value } => **key == Type::Any && **value == Type::Any,
            _ => false,
        }
    }

    /// Can a value of type `that` be stored into a slot of this type?
    ///
    /// Only an `any` slot accepts a value of type `any`.
    pub fn assigns(&self, that: &Type) -> bool {
        match self {
            Type::Any | Type::Var(_) => return true,
            Type::Name { ty, .. } => return ty.assigns(that),
            Type::Function {
                params,
                return_type,
            } => {
                return match that.unnamed() {
                    Type::Function {
                        params: other_params,
                        return_type: other_return,
                    } => {
                        params.len() == other_params.len()
                            && params
                                .iter()
                                .zip(other_params)
                                .all(|(a, b)| a.assigns(b) && b.assigns(a))
                            && return_type.assigns(other_return)
                    }
                    _ => false,
                };
            }
            _ => {}
        }

        if matches!(self, Type::Map { .. } | Type::Array(_)) && that.is_empty_composite() {
            return true;
        }

        match (self, that.value_type()) {
            (Type::Bool, Type::Bool)
            | (Type::Int, Type::Int)
            | (Type::Float, Type::Float)
            | (Type::String, Type::String)
            | (Type::Bytes, Type::Bytes)
            | (Type::Time, Type::Time) => true,
            // Widening only: float slots accept ints, never the reverse
            (Type::Float, Type::Int) => true,
            (Type::Array(a), Type::Array(b))
            | (Type::Array(a), Type::ProtoList(b))
            | (Type::ProtoList(a), Type::ProtoList(b))
            | (Type::ProtoList(a), Type::Array(b))
            | (Type::Stack(a), Type::Stack(b)) => a.assigns(b),
            (
                Type::Map { key: k1, value: v1 },
                Type::Map { key: k2, value: v2 },
            ) => k1.assigns(k2) && v1.assigns(v2),
            (Type::Tuple(a), Type::Tuple(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.assigns(y))
            }
            (Type::Record(a), Type::Record(b)) | (Type::Enum(a), Type::Enum(b)) => a == b,
            (Type::Table(a), Type::Table(b)) => a == b,
            (Type::Visitor, Type::Visitor) => true,
            _ => false,
        }
    }

    /// Can the two types be compared with relational or equality operators?
    pub fn compares(&self, that: &Type) -> bool {
        let (a, b) = (self.value_type(), that.value_type());
        if *a == Type::Any || *b == Type::Any {
            return false;
        }
        if a.is_numeric() && b.is_numeric() {
            return true;
        }
        a.assigns(b) || b.assigns(a)
    }

    /// Result type of combining this type with `that` in an arithmetic
    /// operator, or `None` if the combination is undefined.
    pub fn arithmetics(&self, that: &Type) -> Option<Type> {
        match (self.value_type(), that.value_type()) {
            (Type::Int, Type::Int) => Some(Type::Int),
            (Type::Int, Type::Float) | (Type::Float, Type::Int) | (Type::Float, Type::Float) => {
                Some(Type::Float)
            }
            (Type::String, Type::String) => Some(Type::String),
            (Type::Time, Type::Int) | (Type::Int, Type::Time) => Some(Type::Time),
            _ => None,
        }
    }

    /// Look up a named tuple member
    pub fn member(&self, name: &str) -> Option<&Type> {
        match self.unnamed() {
            Type::Tuple(members) => members.iter().find_map(|m| match m {
                Type::Name { name: n, ty } if n == name => Some(ty.as_ref()),
                _ => None,
            }),
            _ => None,
        }
    }

    /// Match a parameter type against an argument type, binding any type
    /// variables along the way.
    pub fn bind(&self, arg: &Type, bindings: &mut HashMap<String, Type>) -> bool {
        match self {
            Type::Var(var) => match bindings.get(var) {
                Some(bound) => bound.assigns(arg),
                None => {
                    bindings.insert(var.clone(), arg.unnamed().clone());
                    true
                }
            },
            Type::Name { ty, .. } => ty.bind(arg, bindings),
            Type::Array(element) | Type::ProtoList(element) => match arg.value_type() {
                Type::Array(other) | Type::ProtoList(other) => element.bind(other, bindings),
                _ => arg.is_empty_composite(),
            },
            Type::Stack(element) => match arg.value_type() {
                Type::Stack(other) => element.bind(other, bindings),
                _ => false,
            },
            Type::Map { key, value } => match arg.value_type() {
                Type::Map {
                    key: other_key,
                    value: other_value,
                } => key.bind(other_key, bindings) && value.bind(other_value, bindings),
                _ => false,
            },
            _ => self.assigns(arg),
        }
    }

    /// Replace bound type variables; unbound ones become `any`
    pub fn substitute(&self, bindings: &HashMap<String, Type>) -> Type {
        match self {
            Type::Var(var) => bindings.get(var).cloned().unwrap_or(Type::Any),
            Type::Array(element) => Type::array(element.substitute(bindings)),
            Type::ProtoList(element) => Type::proto_list(element.substitute(bindings)),
            Type::Stack(element) => Type::stack(element.substitute(bindings)),
            Type::Map { key, value } => Type::map(key.substitute(bindings), value.substitute(bindings)),
            Type::Tuple(members) => {
                Type::Tuple(members.iter().map(|m| m.substitute(bindings)).collect())
            }
            Type::Name { name, ty } => Type::named(name.clone(), ty.substitute(bindings)),
            Type::Function {
                params,
                return_type,
            } => Type::function(
                params.iter().map(|p| p.substitute(bindings)).collect(),
                return_type.substitute(bindings),
            ),
            other => other.clone(),
        }
    }

    /// Get a human-readable name for the type
    pub fn name(&self) -> String {
        match self {
            Type::Bool => "bool".to_string(),
            Type::Int => "int".to_string(),
            Type::Float => "float".to_string(),
            Type::String => "string".to_string(),
            Type::Bytes => "bytes".to_string(),
            Type::Time => "time".to_string(),
            Type::Array(inner) | Type::ProtoList(inner) => format!("array of {}", inner.name()),
            Type::Map { key, value } => format!("map[{}] of {}", key.name(), value.name()),
            Type::Tuple(members) => {
                let names: Vec<_> = members.iter().map(|t| t.name()).collect();
                format!("{{{}}}", names.join(", "))
            }
            Type::Stack(inner) => format!("stack of {}", inner.name()),
            Type::Record(name) | Type::Enum(name) => name.clone(),
            Type::Function {
                params,
                return_type,
            } => {
                let param_names: Vec<_> = params.iter().map(|t| t.name()).collect();
                format!("function({}): {}", param_names.join(", "), return_type.name())
            }
            Type::Name { name, ty } => format!("{}: {}", name, ty.name()),
            Type::Table(table) => table.name(),
            Type::Visitor => "visitor".to_string(),
            Type::Var(name) => name.clone(),
            Type::Any => "any".to_string(),
        }
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl TableType {
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    /// Does the table take emitted values of type `value`?
    pub fn accepts(&self, value: &Type) -> bool {
        self.value.assigns(value)
    }

    pub fn accepts_weight(&self, weight: &Type) -> bool {
        self.weight.as_ref().map_or(false, |w| w.assigns(weight))
    }

    pub fn name(&self) -> String {
        let mut out = format!("output {}", self.aggregator.name);
        for index in &self.indices {
            out.push_str(&format!("[{}]", index.name()));
        }
        out.push_str(&format!(" of {}", self.value.name()));
        if let Some(weight) = &self.weight {
            out.push_str(&format!(" weight {}", weight.name()));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<Type> {
        vec![
            Type::Bool,
            Type::Int,
            Type::Float,
            Type::String,
            Type::Bytes,
            Type::Time,
            Type::array(Type::Int),
            Type::map(Type::String, Type::Float),
            Type::stack(Type::String),
            Type::Tuple(vec![Type::named("a", Type::Int), Type::String]),
            Type::Record("Revision".to_string()),
            Type::Enum("ChangeKind".to_string()),
            Type::function(vec![Type::named("x", Type::Int)], Type::Bool),
            Type::Visitor,
        ]
    }

    #[test]
    fn test_assigns_is_reflexive() {
        for t in samples() {
            assert!(t.assigns(&t), "{} should assign itself", t);
        }
    }

    #[test]
    fn test_numeric_promotion() {
        let numeric = [Type::Int, Type::Float];
        for a in &numeric {
            for b in &numeric {
                let expected = if *a == Type::Float || *b == Type::Float {
                    Type::Float
                } else {
                    Type::Int
                };
                assert_eq!(a.arithmetics(b), Some(expected));
            }
            assert_eq!(a.arithmetics(&Type::String), None);
            assert_eq!(Type::String.arithmetics(a), None);
            assert_eq!(a.arithmetics(&Type::Bool), None);
            assert_eq!(Type::Bool.arithmetics(a), None);
        }
    }

    #[test]
    fn test_arithmetics_unwraps_functions_and_names() {
        let f = Type::function(vec![], Type::Int);
        assert_eq!(f.arithmetics(&Type::Float), Some(Type::Float));
        let n = Type::named("x", Type::Int);
        assert_eq!(n.arithmetics(&Type::Int), Some(Type::Int));
    }

    #[test]
    fn test_array_rejects_scalar() {
        assert!(!Type::array(Type::Int).assigns(&Type::Int));
        assert!(Type::array(Type::Float).assigns(&Type::array(Type::Int)));
    }

    #[test]
    fn test_float_widening_is_one_way() {
        assert!(Type::Float.assigns(&Type::Int));
        assert!(!Type::Int.assigns(&Type::Float));
    }

    #[test]
    fn test_map_requires_key_compatibility() {
        let m = Type::map(Type::String, Type::Int);
        assert!(m.assigns(&Type::map(Type::String, Type::Int)));
        assert!(!m.assigns(&Type::map(Type::Int, Type::Int)));
        // the empty map literal is typed `map[any] of any`
        assert!(m.assigns(&Type::map(Type::Any, Type::Any)));
    }

    #[test]
    fn test_any_is_only_a_slot_wildcard() {
        assert!(Type::Any.assigns(&Type::Int));
        assert!(!Type::Int.assigns(&Type::Any));
        assert!(!Type::String.assigns(&Type::Any));
        assert!(!Type::array(Type::Int).assigns(&Type::Any));
        assert!(!Type::function(vec![], Type::Int).assigns(&Type::Any));
        assert_eq!(Type::Int.arithmetics(&Type::Any), None);
        assert_eq!(Type::Any.arithmetics(&Type::String), None);
        assert!(!Type::Int.compares(&Type::Any));
    }

    #[test]
    fn test_empty_composite_fits_maps_and_arrays() {
        let empty = Type::map(Type::Any, Type::Any);
        assert!(empty.is_empty_composite());
        assert!(Type::array(Type::String).assigns(&empty));
        assert!(Type::map(Type::Int, Type::Bool).assigns(&empty));
        assert!(!Type::stack(Type::Int).assigns(&empty));
        assert!(!Type::map(Type::String, Type::Int).assigns(&Type::map(Type::String, Type::Any)));
    }

    #[test]
    fn test_compares() {
        assert!(Type::Int.compares(&Type::Float));
        assert!(Type::String.compares(&Type::String));
        assert!(!Type::String.compares(&Type::Int));
        assert!(Type::Record("Revision".into()).compares(&Type::Record("Revision".into())));
        assert!(!Type::Record("Revision".into()).compares(&Type::Record("Project".into())));
    }

    #[test]
    fn test_records_compare_by_name() {
        let a = Type::Record("Project".to_string());
        assert!(a.assigns(&Type::Record("Project".to_string())));
        assert!(!a.assigns(&Type::Enum("Project".to_string())));
    }

    #[test]
    fn test_tuple_member_lookup() {
        let t = Type::Tuple(vec![Type::named("a", Type::Int), Type::named("b", Type::String)]);
        assert_eq!(t.member("b"), Some(&Type::String));
        assert_eq!(t.member("c"), None);
    }

    #[test]
    fn test_bind_and_substitute() {
        let param = Type::array(Type::var("T"));
        let mut bindings = HashMap::new();
        assert!(param.bind(&Type::array(Type::String), &mut bindings));
        assert_eq!(Type::var("T").substitute(&bindings), Type::String);

        // a second use of T must agree with the first binding
        assert!(!Type::var("T").bind(&Type::Int, &mut bindings));
        assert!(Type::var("T").bind(&Type::String, &mut bindings));
    }

    #[test]
    fn test_display() {
        assert_eq!(Type::map(Type::String, Type::array(Type::Int)).to_string(), "map[string] of array of int");
        assert_eq!(
            Type::function(vec![Type::named("x", Type::Int)], Type::Bool).to_string(),
            "function(x: int): bool"
        );
    }
}
