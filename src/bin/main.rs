//! sqlcube CLI - Compile analytical queries to SQL
//!
//! Usage:
//!   sqlcube compile <query.json> --schema <schema.json> [--dialect <dialect>] [--config <file>]
//!   sqlcube plan <query.json>
//!
//! Examples:
//!   sqlcube compile tests/fixtures/spending_query.json --schema tests/fixtures/schema.json --dialect bigquery
//!   sqlcube plan tests/fixtures/spending_query.json

use async_trait::async_trait;
use clap::{Parser, Subcommand, ValueEnum};
use sqlcube::config::Settings;
use sqlcube::engine::{Backend, SqlQueryEngine};
use sqlcube::executor::QueryExecutor;
use sqlcube::model::{Datastore, QueryDto};
use sqlcube::plan::ExecutionPlan;
use sqlcube::sql::{DatabaseQuery, Dialect};
use sqlcube::table::ColumnarTable;
use sqlcube::{QueryError, QueryResult};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sqlcube")]
#[command(about = "sqlcube - Compile analytical queries to multi-dialect SQL")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the SQL of every scope a query needs, root scope first
    Compile {
        /// Path to the query JSON file
        file: PathBuf,

        /// Path to the datastore schema JSON file
        #[arg(short, long)]
        schema: PathBuf,

        /// SQL dialect to generate (overrides the config file)
        #[arg(short, long)]
        dialect: Option<DialectArg>,

        /// Path to a sqlcube.toml file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the measure dependency graph of a query
    Plan {
        /// Path to the query JSON file
        file: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum DialectArg {
    Generic,
    Duckdb,
    Postgres,
    Snowflake,
    Databricks,
    Bigquery,
    Clickhouse,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Generic => Dialect::Generic,
            DialectArg::Duckdb => Dialect::DuckDb,
            DialectArg::Postgres => Dialect::Postgres,
            DialectArg::Snowflake => Dialect::Snowflake,
            DialectArg::Databricks => Dialect::Databricks,
            DialectArg::Bigquery => Dialect::BigQuery,
            DialectArg::Clickhouse => Dialect::ClickHouse,
        }
    }
}

/// Backend that knows a schema but cannot run statements.
struct OfflineBackend {
    datastore: Datastore,
}

#[async_trait]
impl Backend for OfflineBackend {
    fn datastore(&self) -> &Datastore {
        &self.datastore
    }

    async fn execute(&self, _sql: &str, _query: &DatabaseQuery) -> QueryResult<ColumnarTable> {
        Err(QueryError::backend("the CLI only compiles statements"))
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            file,
            schema,
            dialect,
            config,
        } => cmd_compile(file, schema, dialect, config),
        Commands::Plan { file } => cmd_plan(file),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<T, ExitCode> {
    let source = fs::read_to_string(path).map_err(|e| {
        eprintln!("Error reading file '{}': {}", path.display(), e);
        ExitCode::FAILURE
    })?;
    serde_json::from_str(&source).map_err(|e| {
        eprintln!("Invalid {} in '{}': {}", what, path.display(), e);
        ExitCode::FAILURE
    })
}

fn cmd_compile(file: PathBuf, schema: PathBuf, dialect: Option<DialectArg>, config: Option<PathBuf>) -> ExitCode {
    let settings = match config {
        Some(path) => Settings::from_file(path),
        None => Settings::load(),
    };
    let settings = match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let dialect = match dialect {
        Some(arg) => arg.into(),
        None => match settings.sql.dialect() {
            Ok(d) => d,
            Err(e) => {
                eprintln!("Configuration error: {}", e);
                return ExitCode::FAILURE;
            }
        },
    };

    let query: QueryDto = match read_json(&file, "query") {
        Ok(q) => q,
        Err(code) => return code,
    };
    let datastore: Datastore = match read_json(&schema, "schema") {
        Ok(d) => d,
        Err(code) => return code,
    };

    let engine = SqlQueryEngine::new(OfflineBackend { datastore }, dialect);
    let executor = QueryExecutor::from_settings(Arc::new(engine), &settings);
    match executor.sql(&query) {
        Ok(statements) => {
            for (i, sql) in statements.iter().enumerate() {
                println!("-- scope #{}", i);
                println!("{};", sql);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Compilation error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_plan(file: PathBuf) -> ExitCode {
    let query: QueryDto = match read_json(&file, "query") {
        Ok(q) => q,
        Err(code) => return code,
    };

    match ExecutionPlan::build(&query) {
        Ok(plan) => {
            print!("{}", plan.print());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Planning error: {}", e);
            ExitCode::FAILURE
        }
    }
}
