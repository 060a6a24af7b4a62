// SPDX-License-Identifier: Apache-2.0

//! Command-line and environment configuration.
//!
//! Every endpoint setting can come from a flag or a `POLYSEED_*` variable;
//! a `.env` file in the working directory is read before parsing so its
//! values act as environment defaults.

use std::convert::Infallible;
use std::path::PathBuf;

use clap::Args;

use crate::engine::types::ConnectionConfig;
use crate::federation::CatalogLayout;
use crate::observability::{LogOptions, Sensitive};

/// Loads `.env` from the working directory. A missing file is not an error.
pub fn load_dotenv() -> Result<Option<PathBuf>, dotenvy::Error> {
    match dotenvy::dotenv() {
        Ok(path) => Ok(Some(path)),
        Err(e) if e.not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

fn sensitive(value: &str) -> Result<Sensitive<String>, Infallible> {
    Ok(Sensitive::new(value.to_string()))
}

#[derive(Debug, Clone, Args)]
pub struct PostgresArgs {
    #[arg(
        id = "pg_host",
        long = "pg-host",
        env = "POLYSEED_PG_HOST",
        default_value = "localhost",
        value_name = "HOST"
    )]
    pub host: String,

    #[arg(
        id = "pg_port",
        long = "pg-port",
        env = "POLYSEED_PG_PORT",
        default_value_t = 5432,
        value_name = "PORT"
    )]
    pub port: u16,

    #[arg(
        id = "pg_db",
        long = "pg-db",
        env = "POLYSEED_PG_DB",
        default_value = "testdb",
        value_name = "NAME"
    )]
    pub database: String,

    #[arg(
        id = "pg_user",
        long = "pg-user",
        env = "POLYSEED_PG_USER",
        default_value = "user",
        value_name = "USER"
    )]
    pub user: String,

    #[arg(
        id = "pg_password",
        long = "pg-password",
        env = "POLYSEED_PG_PASSWORD",
        default_value = "password",
        value_parser = sensitive,
        hide_env_values = true,
        hide_default_value = true
    )]
    pub password: Sensitive<String>,

    /// Require TLS for the PostgreSQL connection
    #[arg(id = "pg_ssl", long = "pg-ssl", env = "POLYSEED_PG_SSL")]
    pub ssl: bool,
}

impl PostgresArgs {
    pub fn connection_config(&self, connect_timeout_secs: u32) -> ConnectionConfig {
        ConnectionConfig {
            driver: "postgres".to_string(),
            host: self.host.clone(),
            port: self.port,
            username: self.user.clone(),
            password: self.password.clone(),
            database: Some(self.database.clone()),
            ssl: self.ssl,
            pool_max_connections: Some(1),
            connect_timeout_secs: Some(connect_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct MongoArgs {
    #[arg(
        id = "mongo_host",
        long = "mongo-host",
        env = "POLYSEED_MONGO_HOST",
        default_value = "localhost",
        value_name = "HOST"
    )]
    pub host: String,

    #[arg(
        id = "mongo_port",
        long = "mongo-port",
        env = "POLYSEED_MONGO_PORT",
        default_value_t = 27017,
        value_name = "PORT"
    )]
    pub port: u16,

    #[arg(
        id = "mongo_db",
        long = "mongo-db",
        env = "POLYSEED_MONGO_DB",
        default_value = "testdb",
        value_name = "NAME"
    )]
    pub database: String,

    /// Leave empty to connect without credentials
    #[arg(
        id = "mongo_user",
        long = "mongo-user",
        env = "POLYSEED_MONGO_USER",
        default_value = "root",
        value_name = "USER"
    )]
    pub user: String,

    #[arg(
        id = "mongo_password",
        long = "mongo-password",
        env = "POLYSEED_MONGO_PASSWORD",
        default_value = "password",
        value_parser = sensitive,
        hide_env_values = true,
        hide_default_value = true
    )]
    pub password: Sensitive<String>,

    #[arg(id = "mongo_tls", long = "mongo-tls", env = "POLYSEED_MONGO_TLS")]
    pub tls: bool,
}

impl MongoArgs {
    pub fn connection_config(&self, connect_timeout_secs: u32) -> ConnectionConfig {
        ConnectionConfig {
            driver: "mongodb".to_string(),
            host: self.host.clone(),
            port: self.port,
            username: self.user.clone(),
            password: self.password.clone(),
            database: Some(self.database.clone()),
            ssl: self.tls,
            pool_max_connections: None,
            connect_timeout_secs: Some(connect_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct TrinoArgs {
    #[arg(
        id = "trino_host",
        long = "trino-host",
        env = "POLYSEED_TRINO_HOST",
        default_value = "localhost",
        value_name = "HOST"
    )]
    pub host: String,

    #[arg(
        id = "trino_port",
        long = "trino-port",
        env = "POLYSEED_TRINO_PORT",
        default_value_t = 8080,
        value_name = "PORT"
    )]
    pub port: u16,

    #[arg(
        id = "trino_user",
        long = "trino-user",
        env = "POLYSEED_TRINO_USER",
        default_value = "trino",
        value_name = "USER"
    )]
    pub user: String,

    /// Sent as HTTP basic auth when non-empty
    #[arg(
        id = "trino_password",
        long = "trino-password",
        env = "POLYSEED_TRINO_PASSWORD",
        default_value = "",
        value_parser = sensitive,
        hide_env_values = true,
        hide_default_value = true
    )]
    pub password: Sensitive<String>,

    /// Session default catalog
    #[arg(
        id = "trino_catalog",
        long = "trino-catalog",
        env = "POLYSEED_TRINO_CATALOG",
        default_value = "postgresql"
    )]
    pub catalog: String,

    /// Session default schema
    #[arg(
        id = "trino_schema",
        long = "trino-schema",
        env = "POLYSEED_TRINO_SCHEMA",
        default_value = "public"
    )]
    pub schema: String,

    #[arg(id = "trino_ssl", long = "trino-ssl", env = "POLYSEED_TRINO_SSL")]
    pub ssl: bool,
}

impl TrinoArgs {
    pub fn connection_config(&self, connect_timeout_secs: u32) -> ConnectionConfig {
        ConnectionConfig {
            driver: "trino".to_string(),
            host: self.host.clone(),
            port: self.port,
            username: self.user.clone(),
            password: self.password.clone(),
            database: None,
            ssl: self.ssl,
            pool_max_connections: None,
            connect_timeout_secs: Some(connect_timeout_secs),
        }
    }
}

/// Catalog and schema names the federation engine uses for each store.
#[derive(Debug, Clone, Args)]
pub struct CatalogArgs {
    #[arg(long, env = "POLYSEED_RELATIONAL_CATALOG", default_value = "postgresql")]
    pub relational_catalog: String,

    #[arg(long, env = "POLYSEED_RELATIONAL_SCHEMA", default_value = "public")]
    pub relational_schema: String,

    #[arg(long, env = "POLYSEED_DOCUMENT_CATALOG", default_value = "mongodb")]
    pub document_catalog: String,

    #[arg(long, env = "POLYSEED_DOCUMENT_SCHEMA", default_value = "testdb")]
    pub document_schema: String,
}

impl CatalogArgs {
    pub fn layout(&self) -> CatalogLayout {
        CatalogLayout {
            relational_catalog: self.relational_catalog.clone(),
            relational_schema: self.relational_schema.clone(),
            document_catalog: self.document_catalog.clone(),
            document_schema: self.document_schema.clone(),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct LogArgs {
    /// Also write JSON logs to daily files in this directory
    #[arg(long, env = "POLYSEED_LOG_DIR", value_name = "DIR", global = true)]
    pub log_dir: Option<PathBuf>,

    /// Log filter directive, e.g. `polyseed=debug` (defaults to RUST_LOG)
    #[arg(long, env = "POLYSEED_LOG", value_name = "FILTER", global = true)]
    pub log_filter: Option<String>,
}

impl LogArgs {
    pub fn options(&self) -> LogOptions {
        LogOptions {
            log_dir: self.log_dir.clone(),
            filter: self.log_filter.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::*;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        pg: PostgresArgs,
        #[command(flatten)]
        mongo: MongoArgs,
        #[command(flatten)]
        trino: TrinoArgs,
        #[command(flatten)]
        catalogs: CatalogArgs,
    }

    #[test]
    fn flags_override_defaults() {
        let cli = TestCli::try_parse_from([
            "polyseed",
            "--pg-host",
            "db.internal",
            "--pg-port",
            "6543",
            "--mongo-user",
            "",
            "--trino-catalog",
            "mongodb",
            "--document-schema",
            "demo",
        ])
        .unwrap();

        let pg = cli.pg.connection_config(5);
        assert_eq!(pg.endpoint(), "db.internal:6543");
        assert_eq!(pg.pool_max_connections, Some(1));
        assert_eq!(pg.connect_timeout_secs, Some(5));

        assert_eq!(cli.mongo.connection_config(5).username, "");
        assert_eq!(cli.trino.catalog, "mongodb");
        assert_eq!(cli.catalogs.layout().document("users"), "mongodb.demo.users");
    }

    #[test]
    fn passwords_do_not_leak_through_debug() {
        let cli = TestCli::try_parse_from(["polyseed", "--pg-password", "hunter2"]).unwrap();
        assert_eq!(cli.pg.password.expose(), "hunter2");
        assert!(!format!("{:?}", cli).contains("hunter2"));
        assert!(!format!("{:?}", cli.pg.connection_config(10)).contains("hunter2"));
    }

    #[test]
    fn store_flags_do_not_collide() {
        TestCli::command().debug_assert();

        let cli = TestCli::try_parse_from([
            "polyseed",
            "--mongo-host",
            "mongo.internal",
            "--trino-ssl",
        ])
        .unwrap();
        assert_eq!(cli.pg.host, "localhost");
        assert_eq!(cli.mongo.host, "mongo.internal");
        assert_eq!(cli.trino.host, "localhost");
        assert!(cli.trino.ssl);
        assert!(!cli.pg.ssl);
        assert_eq!((cli.pg.port, cli.mongo.port, cli.trino.port), (5432, 27017, 8080));
    }

    #[test]
    fn rejects_invalid_port() {
        let err = TestCli::try_parse_from(["polyseed", "--trino-port", "99999"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
