use std::net::SocketAddr;

use thiserror::Error;

/// Failures while bringing the server or a management command up.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("database.url is not set (use --database-url or BLOGICUM__DATABASE__URL)")]
    MissingDatabaseUrl,
    #[error("could not connect to Postgres: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("applying migrations failed: {0}")]
    Migrate(#[source] sqlx::migrate::MigrateError),
    #[error("could not listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("http server stopped: {0}")]
    Serve(#[source] std::io::Error),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
}

impl InfraError {
    pub fn telemetry(message: impl Into<String>) -> Self {
        Self::Telemetry(message.into())
    }
}
