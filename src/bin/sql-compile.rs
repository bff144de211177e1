//! # SQL Compiler
//!
//! Command-line tool that compiles a statement-parts JSON document (from a
//! file or stdin) and prints the SQL and its parameters.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::Read;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;
use volunteer_search::config::CompilerConfig;
use volunteer_search::logging::{init_with_level, log_error, log_query_compiled};
use volunteer_search::query_builder::StatementParts;

#[derive(Parser)]
#[command(name = "sql-compile")]
#[command(about = "Compile a statement-parts document into parameterized SQL")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Statement-parts JSON file (reads stdin when omitted)
    file: Option<PathBuf>,

    /// Configuration file (default: config/volunteer_search.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// First placeholder index
    #[arg(long)]
    offset: Option<usize>,

    /// Fail on joins whose dependencies never appear
    #[arg(long)]
    strict_joins: bool,

    /// Accept or reject raw SQL join strings
    #[arg(long)]
    allow_raw_joins: Option<bool>,

    /// Print placeholders and parameters for Postgres
    #[arg(long)]
    postgres: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Verbose output level (use multiple times for more verbosity)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    init_with_level(Some(level));

    if let Err(err) = run(&cli) {
        log_error("sql-compile", "compile", &format!("{err:#}"), None);
        return Err(err);
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = CompilerConfig::load_from(cli.config.as_deref())
        .context("failed to load compiler configuration")?;
    if let Some(offset) = cli.offset {
        config.param_offset = offset;
    }
    if cli.strict_joins {
        config.strict_joins = true;
    }
    if let Some(allow) = cli.allow_raw_joins {
        config.allow_raw_joins = allow;
    }

    let input = match &cli.file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("failed to read stdin")?;
            buffer
        }
    };

    let document: serde_json::Value =
        serde_json::from_str(&input).context("input is not valid JSON")?;

    let started = Instant::now();
    let query = StatementParts::from_value(&document)?.compile(&config)?;
    let elapsed = u64::try_from(started.elapsed().as_micros()).ok();
    log_query_compiled("sql-compile", &query.sql, query.parameters.len(), elapsed);

    if cli.postgres {
        let statement = query.to_postgres()?;
        match cli.format {
            OutputFormat::Text => {
                println!("{}", statement.sql);
                for (position, value) in statement.values.iter().enumerate() {
                    println!("  ${} = {value:?}", position + 1);
                }
            }
            OutputFormat::Json => {
                let values: Vec<String> =
                    statement.values.iter().map(|v| format!("{v:?}")).collect();
                let output = serde_json::json!({"sql": statement.sql, "values": values});
                println!("{}", serde_json::to_string_pretty(&output)?);
            }
        }
        return Ok(());
    }

    match cli.format {
        OutputFormat::Text => {
            println!("{}", query.sql);
            for parameter in &query.parameters {
                println!(
                    "  %{} = {} ({})",
                    parameter.index, parameter.value, parameter.type_hint
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&query)?),
    }

    info!(next_index = query.next_index, "compilation finished");
    Ok(())
}
