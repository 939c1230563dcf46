//! Movie Loader
//!
//! Provisions the movie catalog keyspace, bulk-loads CSV files into its tables
//! and runs ad-hoc CQL against the cluster.

use clap::{Parser, Subcommand};
use core_config::tracing::{init_tracing, install_color_eyre};
use database::cassandra::ConnectionManager;
use domain_movies::codec::decode_key;
use domain_movies::{
    CassandraCatalogRepository, CatalogRepository, SchemaManager, Table, WriteMode, run_query,
};
use eyre::{Result, WrapErr};
use std::fs::File;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use tracing::info;

mod config;
mod loader;

use config::Config;
use loader::{LoadOptions, load_csv};

#[derive(Parser)]
#[command(name = "movie-loader")]
#[command(about = "Provision and load the movie catalog in Cassandra/ScyllaDB")]
struct Cli {
    /// Keyspace to operate on (overrides CASSANDRA_KEYSPACE)
    #[arg(short, long, global = true)]
    keyspace: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the keyspace and all catalog tables
    CreateSchema {
        /// Replication factor for SimpleStrategy (overrides LOADER_REPLICATION_FACTOR)
        #[arg(short, long)]
        replication_factor: Option<u32>,
    },

    /// Load a CSV file into one table
    Load {
        /// Target table (watch_history, customer_rating, customer_queue, movies_genre)
        #[arg(short, long)]
        table: Table,

        /// CSV file whose columns follow the table's column order
        #[arg(short, long)]
        file: PathBuf,

        /// Rows per batch (overrides LOADER_BATCH_SIZE)
        #[arg(short, long)]
        batch_size: Option<NonZeroUsize>,

        /// Submit batches without waiting for each acknowledgement
        #[arg(long = "async")]
        asynchronous: bool,

        /// Skip the first line of the file
        #[arg(long)]
        has_headers: bool,
    },

    /// Run one CQL statement at consistency ONE with tracing
    Query { cql: String },

    /// Fetch one row by its full primary key
    Get {
        #[arg(short, long)]
        table: Table,

        /// Partition then clustering key values
        #[arg(required = true)]
        key: Vec<String>,
    },

    /// Drop the keyspace and everything in it
    DropSchema,

    /// Drop one table
    DropTable {
        #[arg(short, long)]
        table: Table,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    install_color_eyre();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(&config.environment);

    let keyspace = cli.keyspace.unwrap_or_else(|| config.keyspace.clone());

    info!("Connecting to Cassandra...");
    let mut manager = ConnectionManager::new(config.cassandra.clone());
    let session = manager
        .connect()
        .await
        .wrap_err("Cassandra connection failed")?;

    let result = run(cli.command, &config, &keyspace, session).await;
    manager.close();
    result
}

async fn run(
    command: Commands,
    config: &Config,
    keyspace: &str,
    session: database::CassandraSession,
) -> Result<()> {
    match command {
        Commands::CreateSchema { replication_factor } => {
            let replication_factor = replication_factor.unwrap_or(config.replication_factor);
            SchemaManager::new(session)
                .create_schema(keyspace, replication_factor)
                .await?;
            info!(keyspace, "Schema created");
        }

        Commands::Load {
            table,
            file,
            batch_size,
            asynchronous,
            has_headers,
        } => {
            let reader = File::open(&file)
                .wrap_err_with(|| format!("Cannot open {}", file.display()))?;
            let repo = CassandraCatalogRepository::new(session, keyspace)?;
            let options = LoadOptions {
                batch_size: batch_size.map_or(config.batch_size, NonZeroUsize::get),
                mode: if asynchronous {
                    WriteMode::Async
                } else {
                    WriteMode::Sync
                },
                has_headers,
            };

            let report = load_csv(&repo, table, reader, options).await?;
            println!(
                "Loaded {} rows into {}.{} in {} batches",
                report.rows, keyspace, table, report.batches
            );
        }

        Commands::Query { cql } => {
            let output = run_query(&session, &cql).await?;
            print!("{}", output);
            if let Some(tracing_id) = output.tracing_id {
                println!("tracing id: {}", tracing_id);
            }
        }

        Commands::Get { table, key } => {
            let key = decode_key(table.schema(), &key)
                .wrap_err_with(|| format!("Invalid primary key for {}", table))?;
            let repo = CassandraCatalogRepository::new(session, keyspace)?;

            match repo.find(table, &key).await? {
                Some(row) => {
                    let fields: Vec<String> = row.iter().map(|v| v.to_string()).collect();
                    println!("{}", table.schema().column_names().collect::<Vec<_>>().join("\t"));
                    println!("{}", fields.join("\t"));
                }
                None => println!("No row in {}.{} for that key", keyspace, table),
            }
        }

        Commands::DropSchema => {
            SchemaManager::new(session).drop_schema(keyspace).await?;
            info!(keyspace, "Schema dropped");
        }

        Commands::DropTable { table } => {
            SchemaManager::new(session).drop_table(keyspace, table).await?;
            info!(keyspace, %table, "Table dropped");
        }
    }

    Ok(())
}
