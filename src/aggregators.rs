//! Aggregator registry
//!
//! An aggregator is the reduction an output table applies to the values
//! emitted into it. The checker only needs each aggregator's contract:
//! which value types it accepts, its formal parameters, and whether it
//! takes a weight.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::error::SetupError;
use crate::types::{AggregatorBinding, Type};

/// Declared contract of one aggregator implementation
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatorSpec {
    pub name: String,
    /// `None` accepts values of any type
    pub value_type: Option<Type>,
    pub formal_parameters: Vec<Type>,
    /// How many trailing formal parameters may be left out
    pub optional_parameters: usize,
    pub weight_type: Option<Type>,
}

impl AggregatorSpec {
    pub fn new(name: &str, value_type: Option<Type>) -> Self {
        AggregatorSpec {
            name: name.to_string(),
            value_type,
            formal_parameters: Vec::new(),
            optional_parameters: 0,
            weight_type: None,
        }
    }

    pub fn params(mut self, params: Vec<Type>) -> Self {
        self.formal_parameters = params;
        self
    }

    pub fn optional(mut self, count: usize) -> Self {
        self.optional_parameters = count;
        self
    }

    pub fn weight(mut self, weight_type: Type) -> Self {
        self.weight_type = Some(weight_type);
        self
    }

    pub fn arity(&self) -> usize {
        self.formal_parameters.len()
    }

    pub fn required_parameters(&self) -> usize {
        self.arity().saturating_sub(self.optional_parameters)
    }

    pub fn accepts(&self, value: &Type) -> bool {
        self.value_type.as_ref().map_or(true, |t| t.assigns(value))
    }

    fn accepts_exactly(&self, value: &Type) -> bool {
        self.value_type.as_ref() == Some(value.unnamed())
    }

    /// The contract a table declared against this aggregator carries
    pub fn binding(&self) -> AggregatorBinding {
        AggregatorBinding {
            name: self.name.clone(),
            arity: self.arity(),
            weight_type: self.weight_type.clone(),
        }
    }

    fn value_type_name(&self) -> String {
        self.value_type
            .as_ref()
            .map_or_else(|| "any".to_string(), |t| t.name())
    }
}

/// Why an aggregator lookup found nothing usable
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupFailure {
    #[error("no aggregator named '{0}'")]
    Unknown(String),

    #[error("aggregator '{name}' does not accept values of type '{value}'")]
    NoMatch { name: String, value: String },

    #[error("ambiguous aggregator '{name}' for values of type '{value}': {count} candidates")]
    Ambiguous {
        name: String,
        value: String,
        count: usize,
    },
}

#[derive(Debug, Clone, Default)]
pub struct AggregatorRegistry {
    specs: BTreeMap<String, Vec<AggregatorSpec>>,
}

impl AggregatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, spec: AggregatorSpec) -> Result<(), SetupError> {
        let entry = self.specs.entry(spec.name.clone()).or_default();
        if entry.iter().any(|s| s.value_type == spec.value_type) {
            return Err(SetupError::DuplicateAggregator {
                name: spec.name.clone(),
                value_type: spec.value_type_name(),
            });
        }
        entry.push(spec);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.specs.contains_key(name)
    }

    /// Every aggregator named `name` accepting `value`, in
    /// registration order
    pub fn lookup(&self, name: &str, value: &Type) -> Vec<&AggregatorSpec> {
        self.specs
            .get(name)
            .map(|specs| specs.iter().filter(|s| s.accepts(value)).collect())
            .unwrap_or_default()
    }

    /// Pick the one aggregator a table of `value` binds to.
    /// One declared for exactly that type beats the others.
    pub fn resolve(&self, name: &str, value: &Type) -> Result<&AggregatorSpec, LookupFailure> {
        if !self.contains(name) {
            return Err(LookupFailure::Unknown(name.to_string()));
        }

        let candidates = self.lookup(name, value);
        match candidates.len() {
            0 => Err(LookupFailure::NoMatch {
                name: name.to_string(),
                value: value.name(),
            }),
            1 => Ok(candidates[0]),
            count => {
                let exact: Vec<_> = candidates
                    .iter()
                    .copied()
                    .filter(|s| s.accepts_exactly(value))
                    .collect();
                if exact.len() == 1 {
                    Ok(exact[0])
                } else {
                    Err(LookupFailure::Ambiguous {
                        name: name.to_string(),
                        value: value.name(),
                        count,
                    })
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AggregatorSpec> {
        self.specs.values().flatten()
    }

    /// The aggregators every environment starts with
    pub fn standard() -> Self {
        let mut registry = AggregatorRegistry::new();
        for spec in standard_specs() {
            registry
                .register(spec)
                .expect("standard aggregators are distinct");
        }
        registry
    }
}

fn numeric(name: &str) -> Vec<AggregatorSpec> {
    vec![
        AggregatorSpec::new(name, Some(Type::Int)),
        AggregatorSpec::new(name, Some(Type::Float)),
    ]
}

fn standard_specs() -> Vec<AggregatorSpec> {
    let mut specs = Vec::new();

    for name in ["sum", "mean", "median", "stdev", "variance", "skewness", "kurtosis"] {
        specs.extend(numeric(name));
    }
    for name in ["quantile", "confidence"] {
        specs.extend(numeric(name).into_iter().map(|s| s.params(vec![Type::Int])));
    }
    specs.extend(
        numeric("histogram")
            .into_iter()
            .map(|s| s.params(vec![Type::Int, Type::Int, Type::Int])),
    );

    for name in ["top", "bottom", "maximum", "minimum"] {
        specs.push(
            AggregatorSpec::new(name, None)
                .params(vec![Type::Int])
                .weight(Type::Float),
        );
    }
    for name in ["collection", "set"] {
        specs.push(AggregatorSpec::new(name, None).params(vec![Type::Int]).optional(1));
    }
    specs.push(AggregatorSpec::new("unique", None).params(vec![Type::Int]));
    specs.push(AggregatorSpec::new("log", None));

    specs.push(AggregatorSpec::new("NaiveBayes", None).params(vec![Type::String, Type::String]));
    specs.push(AggregatorSpec::new("DecisionTree", None).params(vec![Type::String]));

    specs
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_exact_value_type_wins() {
        let registry = AggregatorRegistry::standard();
        // both sum[int] and sum[float] accept an int
        assert_eq!(registry.lookup("sum", &Type::Int).len(), 2);
        let spec = registry.resolve("sum", &Type::Int).unwrap();
        assert_eq!(spec.value_type, Some(Type::Int));
    }

    #[test]
    fn test_unknown_and_mismatched() {
        let registry = AggregatorRegistry::standard();
        assert_eq!(
            registry.resolve("frobnicate", &Type::Int),
            Err(LookupFailure::Unknown("frobnicate".to_string()))
        );
        assert!(matches!(
            registry.resolve("sum", &Type::String),
            Err(LookupFailure::NoMatch { .. })
        ));
    }

    #[test]
    fn test_ambiguous_without_exact_match() {
        let mut registry = AggregatorRegistry::new();
        registry
            .register(AggregatorSpec::new("pick", Some(Type::Float)))
            .unwrap();
        registry.register(AggregatorSpec::new("pick", None)).unwrap();
        assert!(matches!(
            registry.resolve("pick", &Type::Int),
            Err(LookupFailure::Ambiguous { count: 2, .. })
        ));
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = AggregatorRegistry::standard();
        let err = registry
            .register(AggregatorSpec::new("sum", Some(Type::Int)))
            .unwrap_err();
        assert!(err.to_string().contains("already registered"));
    }

    #[test]
    fn test_optional_parameters() {
        let registry = AggregatorRegistry::standard();
        let set = registry.resolve("set", &Type::String).unwrap();
        assert_eq!(set.arity(), 1);
        assert_eq!(set.required_parameters(), 0);
        let top = registry.resolve("top", &Type::String).unwrap();
        assert_eq!(top.required_parameters(), 1);
        assert_eq!(top.weight_type, Some(Type::Float));
    }

    #[test]
    fn test_classifier_parameters() {
        let registry = AggregatorRegistry::standard();
        let bayes = registry.resolve("NaiveBayes", &Type::String).unwrap();
        assert_eq!(bayes.formal_parameters, vec![Type::String, Type::String]);
        let tree = registry.resolve("DecisionTree", &Type::String).unwrap();
        assert_eq!(tree.formal_parameters, vec![Type::String]);
    }
}
