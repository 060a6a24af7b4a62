// SPDX-License-Identifier: Apache-2.0

//! polyseed - seeds PostgreSQL and MongoDB with sample data and queries both
//! through a Trino federation engine.
//!
//! # Usage
//!
//! ```bash
//! # Create and fill the tables and collections (first run)
//! polyseed seed
//!
//! # Drop everything and seed again, with a reproducible order population
//! polyseed seed --reset --rng-seed 42
//!
//! # Run the three federated queries
//! polyseed query
//!
//! # Check the seeded stores, or just their reachability
//! polyseed verify
//! polyseed ping
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

use polyseed_lib::config::{self, CatalogArgs, LogArgs, MongoArgs, PostgresArgs, TrinoArgs};
use polyseed_lib::engine::drivers::mongodb::MongoDriver;
use polyseed_lib::engine::drivers::postgres::PostgresDriver;
use polyseed_lib::engine::drivers::trino::TrinoDriver;
use polyseed_lib::engine::{DataEngine, EngineError, EngineResult};
use polyseed_lib::federation::{render, run_queries, standard_queries, JoinStyle, OutputFormat};
use polyseed_lib::observability::init_tracing;
use polyseed_lib::seed::{run_seed, SeedOptions, SeedTarget};
use polyseed_lib::verify::{self, VerificationReport};

#[derive(Parser)]
#[command(name = "polyseed")]
#[command(author, version, about = "Seed and query a federated PostgreSQL + MongoDB demo")]
struct Cli {
    #[command(flatten)]
    log: LogArgs,

    /// Seconds to wait when connecting to a store
    #[arg(long, env = "POLYSEED_CONNECT_TIMEOUT", default_value_t = 10, global = true)]
    connect_timeout: u32,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the sample tables and collections and fill them
    Seed {
        #[command(flatten)]
        pg: PostgresArgs,

        #[command(flatten)]
        mongo: MongoArgs,

        /// Drop existing tables and collections before seeding
        #[arg(long)]
        reset: bool,

        /// Seed only one of the stores
        #[arg(long, value_enum, default_value_t = SeedTarget::All)]
        only: SeedTarget,

        /// Seed for the random order population
        #[arg(long, env = "POLYSEED_RNG_SEED")]
        rng_seed: Option<u64>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Run the fixed federated queries through Trino
    Query {
        #[command(flatten)]
        trino: TrinoArgs,

        #[command(flatten)]
        catalogs: CatalogArgs,

        /// How the cross-store query writes its join
        #[arg(long, value_enum, default_value_t = JoinStyle::Explicit)]
        join: JoinStyle,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Check row and document counts and order integrity after seeding
    Verify {
        #[command(flatten)]
        pg: PostgresArgs,

        #[command(flatten)]
        mongo: MongoArgs,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Check that PostgreSQL, MongoDB and Trino are reachable
    Ping {
        #[command(flatten)]
        pg: PostgresArgs,

        #[command(flatten)]
        mongo: MongoArgs,

        #[command(flatten)]
        trino: TrinoArgs,
    },
}

#[tokio::main]
async fn main() {
    let dotenv = config::load_dotenv();
    let cli = Cli::parse();
    let guard = init_tracing(&cli.log.options());

    match dotenv {
        Ok(Some(path)) => tracing::debug!("Loaded environment from {}", path.display()),
        Ok(None) => {}
        Err(e) => tracing::warn!("Ignoring unreadable .env file: {e}"),
    }

    let result = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        drop(guard);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> EngineResult<()> {
    let timeout = cli.connect_timeout;

    match cli.command {
        Commands::Seed {
            pg,
            mongo,
            reset,
            only,
            rng_seed,
            format,
        } => {
            let postgres = if only.includes_relational() {
                Some(PostgresDriver::connect(&pg.connection_config(timeout)).await?)
            } else {
                None
            };
            let documents = if only.includes_documents() {
                match MongoDriver::connect(&mongo.connection_config(timeout)).await {
                    Ok(driver) => Some(driver),
                    Err(e) => {
                        close_all(&[postgres.as_ref().map(|d| d as &dyn DataEngine)]).await;
                        return Err(e);
                    }
                }
            } else {
                None
            };

            let options = SeedOptions {
                reset,
                target: only,
                rng_seed,
            };
            let result = run_seed(postgres.as_ref(), documents.as_ref(), &options).await;

            close_all(&[
                postgres.as_ref().map(|d| d as &dyn DataEngine),
                documents.as_ref().map(|d| d as &dyn DataEngine),
            ])
            .await;

            let report = result?;
            tracing::info!(?report, "Seed finished");
            match format {
                OutputFormat::Text => print!("{report}"),
                OutputFormat::Json => println!("{}", to_json(&report)?),
            }
        }
        Commands::Query {
            trino,
            catalogs,
            join,
            format,
        } => {
            let driver = TrinoDriver::new(
                &trino.connection_config(timeout),
                Some(trino.catalog.clone()),
                Some(trino.schema.clone()),
            )?;
            let layout = catalogs.layout();
            let queries = standard_queries(&layout, join);

            let outcomes = run_queries(&driver, &queries, &layout.known_catalogs()).await;
            close_all(&[Some(&driver as &dyn DataEngine)]).await;

            let rendered = render(&outcomes?, format)?;
            println!("{}", rendered.trim_end());
        }
        Commands::Verify { pg, mongo, format } => {
            let postgres = PostgresDriver::connect(&pg.connection_config(timeout)).await?;
            let documents = MongoDriver::connect(&mongo.connection_config(timeout)).await;
            let documents = match documents {
                Ok(driver) => driver,
                Err(e) => {
                    close_all(&[Some(&postgres as &dyn DataEngine)]).await;
                    return Err(e);
                }
            };

            let figures = async {
                let relational = verify::read_relational(&postgres).await?;
                let document = verify::read_documents(&documents).await?;
                Ok::<_, EngineError>((relational, document))
            }
            .await;
            close_all(&[
                Some(&postgres as &dyn DataEngine),
                Some(&documents as &dyn DataEngine),
            ])
            .await;

            let (relational, document) = figures?;
            let mut report = VerificationReport::default();
            report.checks.extend(verify::relational_checks(&relational));
            report.checks.extend(verify::document_checks(&document));

            match format {
                OutputFormat::Text => print!("{report}"),
                OutputFormat::Json => println!("{}", to_json(&report)?),
            }
            report.into_result()?;
        }
        Commands::Ping { pg, mongo, trino } => {
            let mut failures = 0;

            let outcome = match PostgresDriver::connect(&pg.connection_config(timeout)).await {
                Ok(driver) => {
                    let ping = driver.ping().await;
                    close_all(&[Some(&driver as &dyn DataEngine)]).await;
                    ping
                }
                Err(e) => Err(e),
            };
            let endpoint = pg.connection_config(timeout).endpoint();
            failures += report_ping("PostgreSQL", &endpoint, outcome);

            let outcome = match MongoDriver::connect(&mongo.connection_config(timeout)).await {
                Ok(driver) => {
                    let ping = driver.ping().await;
                    close_all(&[Some(&driver as &dyn DataEngine)]).await;
                    ping
                }
                Err(e) => Err(e),
            };
            let endpoint = mongo.connection_config(timeout).endpoint();
            failures += report_ping("MongoDB", &endpoint, outcome);

            let trino_config = trino.connection_config(timeout);
            let outcome = match TrinoDriver::new(&trino_config, None, None) {
                Ok(driver) => driver.ping().await,
                Err(e) => Err(e),
            };
            failures += report_ping("Trino", &trino_config.endpoint(), outcome);

            if failures > 0 {
                return Err(EngineError::connection_failed(format!(
                    "{failures} of 3 targets unreachable"
                )));
            }
        }
    }
    Ok(())
}

fn report_ping(name: &str, endpoint: &str, outcome: EngineResult<()>) -> usize {
    match outcome {
        Ok(()) => {
            println!("{name:<12} {endpoint:<24} ok");
            0
        }
        Err(e) => {
            println!("{name:<12} {endpoint:<24} FAILED: {e}");
            1
        }
    }
}

/// Closes each connection, logging failures instead of returning them.
async fn close_all(engines: &[Option<&dyn DataEngine>]) {
    for engine in engines.iter().flatten() {
        if let Err(e) = engine.close().await {
            tracing::warn!(
                driver = engine.driver_id(),
                "Failed to close {} connection: {e}",
                engine.driver_name()
            );
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> EngineResult<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| EngineError::internal(format!("Failed to render JSON output: {e}")))
}
