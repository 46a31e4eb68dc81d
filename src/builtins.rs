//! Built-in constants, functions and casts
//!
//! Installed into every standard environment before checking starts.

use crate::env::Environment;
use crate::types::Type;

fn record(name: &str) -> Type {
    Type::Record(name.to_string())
}

fn t() -> Type {
    Type::var("T")
}

fn k() -> Type {
    Type::var("K")
}

fn v() -> Type {
    Type::var("V")
}

fn constants() -> Vec<(&'static str, Type)> {
    vec![
        ("true", Type::Bool),
        ("false", Type::Bool),
        ("input", record("Project")),
        ("PI", Type::Float),
        ("Inf", Type::Float),
        ("NaN", Type::Float),
    ]
}

fn signatures() -> Vec<(&'static str, Vec<Type>, Type)> {
    vec![
        // mining intrinsics
        ("isfixingrevision", vec![record("Revision")], Type::Bool),
        ("isfixingrevision", vec![Type::String], Type::Bool),
        ("hasfiletype", vec![record("Project"), Type::String], Type::Bool),
        ("hasfiletype", vec![record("CodeRepository"), Type::String], Type::Bool),
        ("hasfiletype", vec![record("Revision"), Type::String], Type::Bool),
        ("iskind", vec![Type::String, Type::Enum("FileKind".to_string())], Type::Bool),
        ("getast", vec![record("ChangedFile")], record("ASTRoot")),
        ("visit", vec![t(), Type::Visitor], Type::Any),
        // classifiers trained by the NaiveBayes and DecisionTree tables
        ("load", vec![Type::String], record("Model")),
        ("classify", vec![record("Model"), Type::array(Type::Float)], Type::Float),
        ("getsnapshot", vec![record("CodeRepository")], Type::array(record("ChangedFile"))),
        (
            "getsnapshot",
            vec![record("CodeRepository"), Type::Time],
            Type::array(record("ChangedFile")),
        ),
        // containers
        ("len", vec![Type::array(t())], Type::Int),
        ("len", vec![Type::stack(t())], Type::Int),
        ("len", vec![Type::map(k(), v())], Type::Int),
        ("len", vec![Type::String], Type::Int),
        ("len", vec![Type::Bytes], Type::Int),
        ("def", vec![t()], Type::Bool),
        ("push", vec![Type::stack(t()), t()], Type::Any),
        ("pop", vec![Type::stack(t())], t()),
        ("peek", vec![Type::stack(t())], t()),
        ("clear", vec![Type::stack(t())], Type::Any),
        ("clear", vec![Type::map(k(), v())], Type::Any),
        ("keys", vec![Type::map(k(), v())], Type::array(k())),
        ("values", vec![Type::map(k(), v())], Type::array(v())),
        ("haskey", vec![Type::map(k(), v()), k()], Type::Bool),
        ("remove", vec![Type::map(k(), v()), k()], Type::Any),
        ("sort", vec![Type::array(t())], Type::array(t())),
        // conversions
        ("string", vec![Type::Int], Type::String),
        ("string", vec![Type::Float], Type::String),
        ("string", vec![Type::Bool], Type::String),
        ("string", vec![Type::Time], Type::String),
        ("string", vec![Type::Bytes], Type::String),
        ("int", vec![Type::String], Type::Int),
        ("int", vec![Type::Float], Type::Int),
        ("int", vec![Type::Bool], Type::Int),
        ("int", vec![Type::Time], Type::Int),
        ("float", vec![Type::String], Type::Float),
        ("float", vec![Type::Int], Type::Float),
        ("time", vec![Type::String], Type::Time),
        // math
        ("abs", vec![Type::Int], Type::Int),
        ("abs", vec![Type::Float], Type::Float),
        ("max", vec![Type::Int, Type::Int], Type::Int),
        ("max", vec![Type::Float, Type::Float], Type::Float),
        ("min", vec![Type::Int, Type::Int], Type::Int),
        ("min", vec![Type::Float, Type::Float], Type::Float),
        ("pow", vec![Type::Float, Type::Float], Type::Float),
        ("sqrt", vec![Type::Float], Type::Float),
        ("log", vec![Type::Float], Type::Float),
        ("round", vec![Type::Float], Type::Int),
        ("floor", vec![Type::Float], Type::Int),
        ("ceil", vec![Type::Float], Type::Int),
        // time
        ("now", vec![], Type::Time),
        ("yearof", vec![Type::Time], Type::Int),
        ("monthof", vec![Type::Time], Type::Int),
        ("dayofmonth", vec![Type::Time], Type::Int),
        ("dayofweek", vec![Type::Time], Type::Int),
        ("addday", vec![Type::Time, Type::Int], Type::Time),
        ("formattime", vec![Type::String, Type::Time], Type::String),
        // strings
        ("lowercase", vec![Type::String], Type::String),
        ("uppercase", vec![Type::String], Type::String),
        ("trim", vec![Type::String], Type::String),
        ("strfind", vec![Type::String, Type::String], Type::Int),
        ("strrfind", vec![Type::String, Type::String], Type::Int),
        ("substring", vec![Type::String, Type::Int], Type::String),
        ("substring", vec![Type::String, Type::Int, Type::Int], Type::String),
        ("match", vec![Type::String, Type::String], Type::Bool),
        (
            "strreplace",
            vec![Type::String, Type::String, Type::String, Type::Bool],
            Type::String,
        ),
        ("splitall", vec![Type::String, Type::String], Type::array(Type::String)),
    ]
}

/// Install constants, function signatures and casts into `env`
pub fn install(env: &mut Environment) {
    for (name, ty) in constants() {
        env.define_global(name, ty).expect("built-in constants are distinct");
    }
    for (name, params, return_type) in signatures() {
        env.add_function(name, Type::function(params, return_type));
    }
    env.add_cast(Type::Int, Type::Time);
    env.add_cast(Type::Time, Type::Int);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_environment_contents() {
        let env = Environment::standard();
        assert!(env.has_global("input"));
        assert!(env.has_function("hasfiletype"));
        assert!(!env.has_function("hasfile"));
        assert_eq!(
            env.functions(env.root(), "load"),
            vec![Type::function(vec![Type::String], record("Model"))]
        );
        assert_eq!(env.functions(env.root(), "len").len(), 5);
        assert!(env.has_cast(&Type::Time, &Type::Int));
        assert!(!env.has_cast(&Type::Float, &Type::Int));
    }
}
