use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "rowkeep")]
#[command(author, version, about = "Inspect and maintain rowkeep SQLite tables")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file (overrides store.path from the config)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Enable verbose logging, including every composed statement
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Count the rows of a table
    Count {
        table: String,

        /// Column to count (defaults to the identity column)
        #[arg(long)]
        column: Option<String>,
    },

    /// Print rows as JSON lines
    Select {
        table: String,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Print the SELECT statement that `select` would run
    Sql {
        table: String,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Delete rows matching a predicate
    Delete {
        table: String,

        /// Predicate placed after WHERE (trusted text, not escaped)
        #[arg(long = "where", required = true)]
        predicate: String,
    },

    /// Delete rows by identity; identities <= 0 are ignored
    DeleteIds {
        table: String,

        #[arg(required = true, allow_negative_numbers = true)]
        ids: Vec<i64>,
    },

    /// Delete every row, keeping the table
    Truncate { table: String },

    /// Insert or replace a row given as a JSON object; prints its identity
    Put { table: String, json: String },

    /// Validate configuration file
    Validate,

    /// Display version information
    Version,
}

#[derive(clap::Args, Debug, Default)]
pub struct QueryArgs {
    /// Comma-separated columns (defaults to all)
    #[arg(long, default_value = "*")]
    pub columns: String,

    /// Predicate placed after WHERE (trusted text, not escaped)
    #[arg(long = "where")]
    pub predicate: Option<String>,

    /// Ordering placed after ORDER BY
    #[arg(long)]
    pub order_by: Option<String>,

    #[arg(long)]
    pub limit: Option<u64>,

    /// Ignored unless --limit is also given
    #[arg(long)]
    pub offset: Option<u64>,
}

impl QueryArgs {
    pub fn to_query(&self) -> rowkeep_db::SelectQuery {
        rowkeep_db::SelectQuery {
            columns: self.columns.clone(),
            predicate: self.predicate.clone(),
            order_by: self.order_by.clone(),
            limit: self.limit,
            offset: self.offset,
        }
    }
}
