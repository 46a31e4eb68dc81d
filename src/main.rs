//! Boa semantic analyzer CLI
//!
//! Type checks program trees handed over as JSON by the Boa parser.

use boa_sema::{ast::Program, check_program, config::CheckerConfig, Environment};
use clap::{Parser, Subcommand};
use colored::*;
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "boa-sema")]
#[command(author = "Boa Language Team")]
#[command(version = "0.3.8")]
#[command(about = "Boa semantic analyzer - type checks Boa program trees", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log resolution decisions (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Type check a program tree
    ///
    /// Examples:
    ///   boa-sema check program.json
    ///   boa-sema check program.json --config casts.toml --json
    Check {
        /// The program tree, as JSON
        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Extra casts, aggregators and functions
        #[arg(long, env = "BOA_SEMA_CONFIG", value_name = "FILE")]
        config: Option<PathBuf>,

        /// Print the annotations as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the built-in type names, or the attributes of one record
    Schema {
        #[arg(value_name = "NAME")]
        name: Option<String>,
    },
    /// List the registered aggregators
    Aggregators,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let result = match cli.command {
        Commands::Check { file, config, json } => check_file(&file, config.as_ref(), json),
        Commands::Schema { name } => show_schema(name.as_deref()),
        Commands::Aggregators => show_aggregators(),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn environment(config: Option<&PathBuf>) -> anyhow::Result<Environment> {
    let mut env = Environment::standard();
    if let Some(path) = config {
        CheckerConfig::load(path)?.apply(&mut env)?;
    }
    Ok(env)
}

fn check_file(path: &PathBuf, config: Option<&PathBuf>, json: bool) -> anyhow::Result<()> {
    let source = fs::read_to_string(path)?;
    let program: Program = serde_json::from_str(&source)?;

    let mut env = environment(config)?;
    match check_program(&program, &mut env) {
        Ok(annotations) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&annotations)?);
            } else {
                println!("{} No type errors found in {}", "✓".green(), path.display());
            }
            Ok(())
        }
        Err(e) => {
            eprintln!(
                "{} {} at node {}",
                e.kind().yellow(),
                "error".red(),
                e.node()
            );
            Err(e.into())
        }
    }
}

fn show_schema(name: Option<&str>) -> anyhow::Result<()> {
    let env = Environment::standard();
    let registry = env.registry();

    let Some(name) = name else {
        for type_name in registry.type_names() {
            println!("{}", type_name);
        }
        return Ok(());
    };

    if let Some(record) = registry.record(name) {
        println!("{} {}", "record".cyan(), name.bold());
        for (attr, info) in record.attributes() {
            println!("  {:>3}  {}: {}", info.index, attr, info.ty);
        }
    } else if let Some(enumeration) = registry.enumeration(name) {
        println!("{} {}", "enum".cyan(), name.bold());
        for value in &enumeration.values {
            println!("  {}", value);
        }
    } else if let Some(ty) = registry.lookup(name) {
        println!("{} {}", "type".cyan(), ty);
    } else {
        anyhow::bail!("unknown type name '{}'", name);
    }
    Ok(())
}

fn show_aggregators() -> anyhow::Result<()> {
    let env = Environment::standard();
    for spec in env.aggregators().iter() {
        let value = spec
            .value_type
            .as_ref()
            .map_or_else(|| "any".to_string(), |t| t.name());
        let params: Vec<_> = spec.formal_parameters.iter().map(|p| p.name()).collect();
        let mut line = format!("{}[{}]({})", spec.name.bold(), value, params.join(", "));
        if spec.optional_parameters > 0 {
            line.push_str(&format!(" optional {}", spec.optional_parameters));
        }
        if let Some(weight) = &spec.weight_type {
            line.push_str(&format!(" weight {}", weight));
        }
        println!("{}", line);
    }
    Ok(())
}
