//! Boa semantic analyzer
//!
//! The type-checking pass for Boa, a query language for mining software
//! repositories. Takes a parsed program tree, assigns a type to every node
//! and rejects the program at its first semantic error.

pub mod aggregators;
pub mod ast;
pub mod builder;
pub mod builtins;
pub mod checker;
pub mod config;
pub mod env;
pub mod error;
pub mod registry;
pub mod resolve;
pub mod schema;
pub mod types;

pub use checker::{check_program, Annotations};
pub use env::Environment;
pub use error::{CheckError, Result, SetupError};
pub use types::Type;
