//! Auxiliary resolution passes
//!
//! Overload resolution for calls, and the classifier that tells a
//! function declaration apart from an expression that merely has a
//! function type.

use std::collections::HashMap;

use log::debug;

use crate::ast::{ExpressionKind, Expression, NodeId};
use crate::env::{Environment, ScopeId};
use crate::error::{CheckError, Result};
use crate::types::Type;

/// The signature a call resolved to
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub signature: Type,
    /// Return type with the signature's type variables substituted
    pub return_type: Type,
}

fn describe(name: &str, args: &[Type]) -> String {
    let args: Vec<_> = args.iter().map(|a| a.name()).collect();
    format!("{}({})", name, args.join(", "))
}

/// Pick the signature of `name` that accepts `args`.
///
/// A signature matches when it has one parameter per argument and each
/// parameter accepts its argument, binding type variables as it goes.
/// When several match, the one whose parameters equal the argument types
/// wins; otherwise the call is ambiguous.
pub fn find_function(
    env: &Environment,
    scope: ScopeId,
    node: NodeId,
    name: &str,
    args: &[Type],
) -> Result<Resolution> {
    let mut matches = Vec::new();

    for signature in env.functions(scope, name) {
        let (params, return_type) = match &signature {
            Type::Function {
                params,
                return_type,
            } => (params, return_type),
            _ => continue,
        };
        if params.len() != args.len() {
            continue;
        }

        let mut bindings = HashMap::new();
        if params
            .iter()
            .zip(args)
            .all(|(param, arg)| param.bind(arg, &mut bindings))
        {
            let return_type = return_type.substitute(&bindings);
            matches.push(Resolution {
                signature: signature.clone(),
                return_type,
            });
        }
    }

    let chosen = match matches.len() {
        0 => {
            return Err(CheckError::Overload {
                node,
                message: format!("no such function {}", describe(name, args)),
            })
        }
        1 => matches.remove(0),
        count => {
            let mut exact: Vec<_> = matches
                .into_iter()
                .filter(|r| is_exact(&r.signature, args))
                .collect();
            if exact.len() != 1 {
                return Err(CheckError::Overload {
                    node,
                    message: format!(
                        "ambiguous call to {}: {} signatures match",
                        describe(name, args),
                        count
                    ),
                });
            }
            exact.remove(0)
        }
    };

    debug!("resolved {} to {}", describe(name, args), chosen.signature);
    Ok(chosen)
}

fn is_exact(signature: &Type, args: &[Type]) -> bool {
    match signature {
        Type::Function { params, .. } => params
            .iter()
            .zip(args)
            .all(|(p, a)| p.unnamed() == a.unnamed()),
        _ => false,
    }
}

/// Does `expr` denote a function literal, possibly behind wrappers that
/// pass a single operand through unchanged?
pub fn is_function_declaration(expr: &Expression) -> bool {
    match &expr.kind {
        ExpressionKind::Function { .. } => true,
        ExpressionKind::Paren(inner) => is_function_declaration(inner),
        ExpressionKind::Disjunction { lhs, rhs } | ExpressionKind::Conjunction { lhs, rhs }
            if rhs.is_empty() =>
        {
            is_function_declaration(lhs)
        }
        ExpressionKind::Comparison { lhs, rhs: None } => is_function_declaration(lhs),
        ExpressionKind::Arithmetic { lhs, rest } if rest.is_empty() => {
            is_function_declaration(lhs)
        }
        ExpressionKind::Factor { operand, postfix } if postfix.is_empty() => {
            is_function_declaration(operand)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregators::AggregatorRegistry;
    use crate::builder::TreeBuilder;
    use crate::registry::TypeRegistry;
    use pretty_assertions::assert_eq;

    fn env_with_f() -> Environment {
        let mut env = Environment::new(TypeRegistry::standard(), AggregatorRegistry::new());
        env.add_function("f", Type::function(vec![Type::Int], Type::Bool));
        env.add_function("f", Type::function(vec![Type::String], Type::Int));
        env
    }

    #[test]
    fn test_overloads_resolve_by_argument_type() {
        let env = env_with_f();
        let root = env.root();
        let r = find_function(&env, root, NodeId(0), "f", &[Type::Int]).unwrap();
        assert_eq!(r.return_type, Type::Bool);
        let r = find_function(&env, root, NodeId(0), "f", &[Type::String]).unwrap();
        assert_eq!(r.return_type, Type::Int);
    }

    #[test]
    fn test_unmatched_call_is_rejected() {
        let env = env_with_f();
        let err = find_function(&env, env.root(), NodeId(7), "f", &[Type::Bool]).unwrap_err();
        assert_eq!(err.kind(), "Overload");
        assert_eq!(err.node(), NodeId(7));
        assert_eq!(err.to_string(), "no such function f(bool)");
    }

    #[test]
    fn test_exact_signature_breaks_ties() {
        let mut env = Environment::new(TypeRegistry::standard(), AggregatorRegistry::new());
        env.add_function("max", Type::function(vec![Type::Int, Type::Int], Type::Int));
        env.add_function("max", Type::function(vec![Type::Float, Type::Float], Type::Float));
        let r = find_function(&env, env.root(), NodeId(0), "max", &[Type::Int, Type::Int]).unwrap();
        assert_eq!(r.return_type, Type::Int);
        let r = find_function(&env, env.root(), NodeId(0), "max", &[Type::Int, Type::Float]).unwrap();
        assert_eq!(r.return_type, Type::Float);
    }

    #[test]
    fn test_ambiguous_call() {
        let mut env = Environment::new(TypeRegistry::standard(), AggregatorRegistry::new());
        env.add_function("g", Type::function(vec![Type::Float], Type::Int));
        env.add_function("g", Type::function(vec![Type::Any], Type::Int));
        let err = find_function(&env, env.root(), NodeId(0), "g", &[Type::Int]).unwrap_err();
        assert!(err.to_string().starts_with("ambiguous call to g(int)"));
    }

    #[test]
    fn test_type_variables_are_erased() {
        let env = Environment::standard();
        let root = env.root();
        let r = find_function(&env, root, NodeId(0), "pop", &[Type::stack(Type::String)]).unwrap();
        assert_eq!(r.return_type, Type::String);
        let r = find_function(
            &env,
            root,
            NodeId(0),
            "keys",
            &[Type::map(Type::String, Type::Int)],
        )
        .unwrap();
        assert_eq!(r.return_type, Type::array(Type::String));
    }

    #[test]
    fn test_is_function_declaration() {
        let b = TreeBuilder::new();
        let literal = b.function(vec![], None, vec![]);
        assert!(is_function_declaration(&literal));
        assert!(is_function_declaration(&b.paren(literal)));
        assert!(!is_function_declaration(&b.call("f", vec![b.int(1)])));
        assert!(!is_function_declaration(&b.var("f")));
    }
}
