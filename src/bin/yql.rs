//! yql: compile YQL documents to SQL
//!
//! # Usage
//!
//! ```bash
//! # Show the parsed query
//! yql parse queries/active_customers.yql
//!
//! # Generate SQL for a dialect
//! yql generate queries/active_customers.yql --dialect oracle
//!
//! # Enforce a table policy and write the result
//! yql generate report.yql --security security.yaml --output report.sql
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use tracing_subscriber::EnvFilter;
use yql::error::SecurityError;
use yql::{Config, Dialect, SecurityConfig, YqlError, compile};

#[derive(Parser)]
#[command(name = "yql")]
#[command(version)]
#[command(about = "YAML Query Language compiler", long_about = None)]
#[command(after_help = "EXAMPLES:
    yql parse query.yql --json
    yql generate query.yql --dialect sqlserver
    yql generate query.yql -d oracle -o query.sql --security security.yaml")]
struct Cli {
    /// Config file (defaults to <config dir>/yql/config.toml)
    #[arg(short, long, global = true, env = "YQL_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a YQL file and print its AST
    Parse {
        /// The YQL file
        file: PathBuf,

        /// Print the AST as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate SQL from a YQL file
    Generate {
        /// The YQL file
        file: PathBuf,

        /// Target dialect: postgresql, mysql, sqlserver, oracle
        #[arg(short, long)]
        dialect: Option<String>,

        /// Write SQL to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// YAML security policy (denied_tables / allowed_tables)
        #[arg(short, long)]
        security: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        report(&e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "yql=debug" } else { "yql=warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;
    let parser = yql::Parser::with_options(config.imports.clone());

    match &cli.command {
        Commands::Parse { file, json } => {
            let query = parser.parse_file(file).map_err(YqlError::from)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&query)?);
            } else {
                println!("{} {}", "Operation:".cyan().bold(), query.operation());
                println!("{}", "AST:".cyan().bold());
                println!("{:#?}", query.statement);
            }
        }
        Commands::Generate {
            file,
            dialect,
            output,
            security,
        } => {
            let dialect = match dialect {
                Some(name) => name.parse::<Dialect>().map_err(YqlError::Config)?,
                None => config.dialect,
            };
            let policy = match security {
                Some(path) => Some(SecurityConfig::from_file(path)?),
                None => config.security_config()?,
            };

            let query = parser.parse_file(file).map_err(YqlError::from)?;
            let sql = compile(&query, dialect, policy.as_ref())?;
            write_output(&sql, output.as_deref())?;
        }
    }

    Ok(())
}

fn write_output(sql: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, format!("{}\n", sql)).map_err(YqlError::Io)?;
            println!("{} Wrote SQL to {}", "✓".green(), path.display().to_string().cyan());
        }
        None => println!("{}", sql),
    }
    Ok(())
}

/// `Error [category]: message`, then structured details when there are any.
fn report(error: &anyhow::Error) {
    let Some(e) = error.downcast_ref::<YqlError>() else {
        eprintln!("{} {}", "Error:".red().bold(), error);
        return;
    };

    eprintln!(
        "{} {}",
        format!("Error [{}]:", e.category()).red().bold(),
        e
    );

    let details = match e {
        YqlError::Parse(parse) if !parse.details.is_empty() => serde_json::to_value(&parse.details).ok(),
        YqlError::Security(security) => Some(security_details(security)),
        _ => None,
    };
    if let Some(details) = details {
        let rendered = serde_json::to_string_pretty(&details).unwrap_or_default();
        eprintln!("{}", rendered.dimmed());
    }
}

fn security_details(error: &SecurityError) -> serde_json::Value {
    match error {
        SecurityError::DeniedTables { tables, all_tables } => serde_json::json!({
            "denied_tables": tables,
            "all_tables": all_tables,
        }),
        SecurityError::UnauthorizedTables {
            tables,
            allowed_tables,
            all_tables,
        } => serde_json::json!({
            "unauthorized_tables": tables,
            "allowed_tables": allowed_tables,
            "all_tables": all_tables,
        }),
    }
}
