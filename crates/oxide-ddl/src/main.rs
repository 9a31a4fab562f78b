//! oxide-ddl CLI
//!
//! Renders DDL for a JSON schema file under the dialect named by a
//! connection URL, and optionally applies it to a SQLite database.

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use oxide_ddl::commands::{
    create_sql, dialect_table, diff_script, diff_sql, drop_sql, ensure_introspectable, script,
};
use oxide_ddl::SchemaFile;
use oxide_dialect::{DatabaseSnapshot, DdlOptions, Dialect, DialectRegistry};
use oxide_dialect_sqlite::SqliteIntrospector;

/// Multi-dialect DDL generation and schema diffing.
#[derive(Parser)]
#[command(name = "oxide-ddl")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Connection URL; its scheme selects the dialect.
    #[arg(short, long, env = "DATABASE_URL", default_value = "sqlite:db.sqlite3")]
    database: String,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Where a script goes.
#[derive(Args)]
struct Delivery {
    /// Write the script to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Execute the statements against the database (SQLite only).
    #[arg(long)]
    apply: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print CREATE statements for a schema file.
    Create {
        /// Schema file (JSON).
        schema: PathBuf,

        /// Omit IF NOT EXISTS.
        #[arg(long)]
        no_if_not_exists: bool,

        /// Omit sequences.
        #[arg(long)]
        no_sequences: bool,

        /// Omit indices.
        #[arg(long)]
        no_indices: bool,

        /// Omit comments.
        #[arg(long)]
        no_comments: bool,

        #[command(flatten)]
        output: Delivery,
    },

    /// Print DROP statements for a schema file.
    Drop {
        /// Schema file (JSON).
        schema: PathBuf,

        #[command(flatten)]
        output: Delivery,
    },

    /// Print the migration from the live database to a schema file.
    Diff {
        /// Schema file (JSON).
        schema: PathBuf,

        /// Metadata snapshot (JSON) describing the live database.
        #[arg(long, conflicts_with = "introspect")]
        snapshot: Option<PathBuf>,

        /// Read the live schema from the database (SQLite only).
        #[arg(long)]
        introspect: bool,

        #[command(flatten)]
        output: Delivery,
    },

    /// List the registered vendor tokens.
    Dialects,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let registry = DialectRegistry::global();

    match cli.command {
        Commands::Dialects => {
            for (token, dialect) in dialect_table(registry) {
                println!("{token:<12} {dialect}");
            }
        }

        Commands::Create {
            schema,
            no_if_not_exists,
            no_sequences,
            no_indices,
            no_comments,
            output,
        } => {
            let dialect = registry.resolve(&cli.database)?;
            let opts = DdlOptions {
                if_not_exists: !no_if_not_exists,
                sequences: !no_sequences,
                indices: !no_indices,
                comments: !no_comments,
            };
            let statements = create_sql(&SchemaFile::load(&schema)?, dialect.as_ref(), &opts)?;
            emit(&cli.database, dialect.as_ref(), &statements, &script(&statements), &output)
                .await?;
        }

        Commands::Drop { schema, output } => {
            let dialect = registry.resolve(&cli.database)?;
            let statements = drop_sql(&SchemaFile::load(&schema)?, dialect.as_ref())?;
            emit(&cli.database, dialect.as_ref(), &statements, &script(&statements), &output)
                .await?;
        }

        Commands::Diff {
            schema,
            snapshot,
            introspect,
            output,
        } => {
            let dialect = registry.resolve(&cli.database)?;
            let live = if introspect {
                ensure_introspectable(dialect.as_ref())?;
                let pool = SqlitePoolOptions::new()
                    .max_connections(1)
                    .connect(&cli.database)
                    .await
                    .with_context(|| format!("cannot open {}", cli.database))?;
                SqliteIntrospector::new(pool)?.snapshot().await?
            } else if let Some(path) = snapshot {
                load_snapshot(&path)?
            } else {
                info!("No snapshot given; diffing against an empty database.");
                DatabaseSnapshot::new()
            };
            let diff = diff_sql(&SchemaFile::load(&schema)?, &live, dialect.as_ref())?;
            if diff.is_empty() {
                info!("Database already matches the schema.");
            }
            emit(
                &cli.database,
                dialect.as_ref(),
                &diff.statements,
                &diff_script(&diff),
                &output,
            )
            .await?;
        }
    }

    Ok(())
}

fn load_snapshot(path: &Path) -> anyhow::Result<DatabaseSnapshot> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read snapshot {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("invalid snapshot {}", path.display()))
}

/// Writes or prints `text`, then applies `statements` when asked.
async fn emit(
    database: &str,
    dialect: &dyn Dialect,
    statements: &[String],
    text: &str,
    output: &Delivery,
) -> anyhow::Result<()> {
    match &output.output {
        Some(path) => {
            fs::write(path, text)?;
            info!("Wrote {} statements to {}", statements.len(), path.display());
        }
        None => print!("{text}"),
    }
    if output.apply && !statements.is_empty() {
        ensure_introspectable(dialect)?;
        let options = SqliteConnectOptions::from_str(database)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        SqliteIntrospector::new(pool)?.apply(statements).await?;
        info!("Applied {} statements.", statements.len());
    }
    Ok(())
}
