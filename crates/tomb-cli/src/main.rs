use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tomb_core::TombConfig;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "tomb", version, about = "Soft-delete filtering for SQL SELECT statements")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rewrite SQL so that soft-deleted rows are filtered out.
    ///
    /// Reads the statement from the argument, from --file, or from stdin
    /// (one statement per line for files and stdin).
    Rewrite {
        /// Statement to rewrite
        sql: Option<String>,

        /// Read statements from a file instead
        #[arg(long, conflicts_with = "sql")]
        file: Option<PathBuf>,

        /// Path to tomb.yaml
        #[arg(long, short = 'c', env = "TOMB_CONFIG")]
        config: Option<PathBuf>,

        /// Additional soft-delete table (repeatable)
        #[arg(long = "table", value_name = "NAME")]
        tables: Vec<String>,

        /// Print a JSON report per statement instead of the SQL
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Load and validate a configuration file.
    Check {
        /// Path to tomb.yaml
        #[arg(long, short = 'c', default_value = "tomb.yaml", env = "TOMB_CONFIG")]
        config: PathBuf,
    },

    /// List the registered soft-delete tables.
    Tables {
        /// Path to tomb.yaml
        #[arg(long, short = 'c', default_value = "tomb.yaml", env = "TOMB_CONFIG")]
        config: PathBuf,
    },
}

impl Command {
    fn config_path(&self) -> Option<&Path> {
        match self {
            Command::Rewrite { config, .. } => config.as_deref(),
            Command::Check { config } | Command::Tables { config } => Some(config),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The configured level is only a default; RUST_LOG wins.
    let level = cli
        .cmd
        .config_path()
        .and_then(|path| TombConfig::from_file(path).ok())
        .map(|config| config.logging.level)
        .unwrap_or_else(|| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.cmd {
        Command::Rewrite {
            sql,
            file,
            config,
            tables,
            json,
        } => commands::rewrite::run(sql, file, config, tables, json)?,
        Command::Check { config } => commands::check::run(config)?,
        Command::Tables { config } => commands::tables::run(config)?,
    }

    Ok(())
}
