//! Checker configuration
//!
//! A TOML file that extends the standard environment with extra implicit
//! casts, aggregators and function signatures:
//!
//! ```toml
//! [[cast]]
//! from = "float"
//! to = "int"
//!
//! [[aggregator]]
//! name = "wordcount"
//! value_type = "string"
//! formal_parameters = ["int"]
//! weight_type = "none"
//!
//! [[function]]
//! name = "score"
//! params = ["Revision", "int"]
//! returns = "float"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::aggregators::AggregatorSpec;
use crate::env::Environment;
use crate::error::SetupError;
use crate::registry::TypeRegistry;
use crate::types::Type;

/// Weight type meaning "this aggregator takes no weight"
pub const NO_WEIGHT: &str = "none";

fn no_weight() -> String {
    NO_WEIGHT.to_string()
}

fn any_type() -> String {
    "any".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckerConfig {
    #[serde(default, rename = "cast")]
    pub casts: Vec<CastConfig>,

    #[serde(default, rename = "aggregator")]
    pub aggregators: Vec<AggregatorConfig>,

    #[serde(default, rename = "function")]
    pub functions: Vec<FunctionConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastConfig {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    pub name: String,
    /// `any` accepts every value type
    #[serde(default = "any_type")]
    pub value_type: String,
    #[serde(default)]
    pub formal_parameters: Vec<String>,
    #[serde(default)]
    pub optional_parameters: usize,
    #[serde(default = "no_weight")]
    pub weight_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionConfig {
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
    #[serde(default = "any_type")]
    pub returns: String,
}

fn parse(registry: &TypeRegistry, text: &str) -> Result<Type, SetupError> {
    registry
        .parse_type(text)
        .ok_or_else(|| SetupError::UnknownType(text.to_string()))
}

impl CheckerConfig {
    pub fn from_toml(text: &str) -> Result<Self, SetupError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, SetupError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    /// Register everything in this configuration with `env`
    pub fn apply(&self, env: &mut Environment) -> Result<(), SetupError> {
        let mut casts = Vec::with_capacity(self.casts.len());
        let mut specs = Vec::with_capacity(self.aggregators.len());
        let mut functions = Vec::with_capacity(self.functions.len());

        // resolve every type name before touching the environment
        {
            let registry = env.registry();

            for cast in &self.casts {
                casts.push((parse(registry, &cast.from)?, parse(registry, &cast.to)?));
            }

            for agg in &self.aggregators {
                let value_type = match parse(registry, &agg.value_type)? {
                    Type::Any => None,
                    ty => Some(ty),
                };
                let params = agg
                    .formal_parameters
                    .iter()
                    .map(|p| parse(registry, p))
                    .collect::<Result<Vec<_>, _>>()?;
                let mut spec = AggregatorSpec::new(&agg.name, value_type)
                    .params(params)
                    .optional(agg.optional_parameters);
                if agg.weight_type != NO_WEIGHT {
                    spec = spec.weight(parse(registry, &agg.weight_type)?);
                }
                specs.push(spec);
            }

            for function in &self.functions {
                let params = function
                    .params
                    .iter()
                    .map(|p| parse(registry, p))
                    .collect::<Result<Vec<_>, _>>()?;
                let returns = parse(registry, &function.returns)?;
                functions.push((function.name.clone(), Type::function(params, returns)));
            }
        }

        for (from, to) in casts {
            env.add_cast(from, to);
        }
        for spec in specs {
            env.aggregators_mut().register(spec)?;
        }
        for (name, signature) in functions {
            env.add_function(&name, signature);
        }
        Ok(())
    }
}
