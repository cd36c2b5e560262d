mod cli;

use rowkeep::{commands, config};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG if set, otherwise pick defaults from the verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "rowkeep=debug,rowkeep_db=debug,rowkeep_common=debug".to_string()
        } else {
            "rowkeep=info,rowkeep_db=warn,rowkeep_common=warn".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = config::load_config_or_default(cli.config.as_deref())?;
    config::apply_overrides(&mut config, cli.db.clone(), cli.verbose);
    let store = &config.store;
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Count { table, column } => {
            let manager = commands::open_table(store, &table)?;
            commands::count(&manager, column.as_deref(), &mut out)
        }
        Commands::Select { table, query } => {
            let manager = commands::open_table(store, &table)?;
            commands::select(&manager, &query.to_query(), &mut out)
        }
        Commands::Sql { table, query } => {
            let manager = commands::open_table(store, &table)?;
            commands::select_sql(&manager, &query.to_query(), &mut out)
        }
        Commands::Delete { table, predicate } => {
            let manager = commands::open_table(store, &table)?;
            commands::delete_where(&manager, &predicate)
        }
        Commands::DeleteIds { table, ids } => {
            let manager = commands::open_table(store, &table)?;
            commands::delete_ids(&manager, &ids)
        }
        Commands::Truncate { table } => {
            let manager = commands::open_table(store, &table)?;
            commands::truncate(&manager)
        }
        Commands::Put { table, json } => {
            let manager = commands::open_table(store, &table)?;
            commands::put(&manager, &json, &mut out)
        }
        Commands::Validate => validate_config(&config),
        Commands::Version => {
            println!("rowkeep {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn validate_config(config: &rowkeep_common::config::Config) -> Result<()> {
    let warnings = config.validate();
    if warnings.is_empty() {
        println!("Configuration is valid");
    } else {
        for warning in warnings {
            println!("warning: {warning}");
        }
    }
    Ok(())
}
