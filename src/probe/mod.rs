//! PostgreSQL health probe.
//!
//! One probe run opens a single connection, fires a fixed battery of
//! diagnostic queries and assembles a [`MetricSnapshot`]:
//! - server version and connection usage from `pg_settings` / `pg_stat_activity`
//! - held and awaited locks from `pg_locks`
//! - logging destination settings from `pg_settings`
//! - replica count and replay lag from `pg_stat_replication`
//!
//! Connection-level failures abort the run. Individual query failures do
//! not: each metric probe is isolated, so one failing query only leaves its
//! own field absent in the snapshot.

mod collect;
mod queries;
mod traits;

pub use collect::collect_metrics;
pub use traits::MetricSource;

use native_tls::TlsConnector;
use postgres::Client;
use postgres_native_tls::MakeTlsConnector;
use tracing::debug;

use crate::config::ProbeConfig;
use crate::model::MetricSnapshot;

/// Error type for probe runs.
#[derive(Debug)]
pub enum ProbeError {
    /// A required configuration key is missing or empty.
    ConfigIncomplete(&'static str),
    /// The TLS backend could not be initialized; no connection was attempted.
    DriverUnavailable(String),
    /// Connecting to the server failed.
    ConnectionFailed(String),
    /// A metric query failed.
    QueryFailed(String),
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeError::ConfigIncomplete(key) => {
                write!(f, "PostgreSQL: config not complete (missing: {})", key)
            }
            ProbeError::DriverUnavailable(msg) => {
                write!(f, "PostgreSQL: driver unavailable: {}", msg)
            }
            ProbeError::ConnectionFailed(msg) => {
                write!(f, "PostgreSQL: connection error: {}", msg)
            }
            ProbeError::QueryFailed(msg) => write!(f, "PostgreSQL query error: {}", msg),
        }
    }
}

impl std::error::Error for ProbeError {}

/// An established connection plus the server version detected on connect.
pub struct ProbeClient {
    pub(crate) client: Client,
    pub(crate) server_version_num: Option<i32>,
}

/// One-shot PostgreSQL prober.
///
/// Holds validated connection parameters; [`run`](Self::run) performs a full
/// connect, probe, disconnect cycle. No state survives between runs.
pub struct PostgresProbe {
    config: ProbeConfig,
}

impl PostgresProbe {
    /// Creates a probe from validated configuration.
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    /// Performs one probe pass.
    ///
    /// TLS initialization and connection failures abort the pass with `Err`.
    /// Once connected, every metric query runs regardless of other queries
    /// failing, and a snapshot is always produced. The connection closes
    /// when the pass ends, on success and failure alike.
    pub fn run(&self) -> Result<MetricSnapshot, ProbeError> {
        let mut source = self.connect()?;
        Ok(collect_metrics(&mut source))
    }

    /// Opens the connection and detects the server version.
    fn connect(&self) -> Result<ProbeClient, ProbeError> {
        let connector = TlsConnector::builder()
            .build()
            .map_err(|e| ProbeError::DriverUnavailable(e.to_string()))?;
        let tls = MakeTlsConnector::new(connector);

        let mut client = Client::connect(&self.config.connection_string(), tls)
            .map_err(|e| ProbeError::ConnectionFailed(format_postgres_error(&e)))?;

        // Determine server version once per connect. Tolerate failure here;
        // version-dependent queries then assume a current server.
        let server_version_num = client
            .query_one("SHOW server_version_num", &[])
            .ok()
            .and_then(|row| row.try_get::<_, String>(0).ok())
            .and_then(|v| v.parse::<i32>().ok());

        debug!(
            host = %self.config.host,
            port = %self.config.effective_port(),
            server_version_num,
            "connected"
        );

        Ok(ProbeClient {
            client,
            server_version_num,
        })
    }
}

/// Formats a PostgreSQL error message for display.
pub(crate) fn format_postgres_error(e: &postgres::Error) -> String {
    if let Some(db_error) = e.as_db_error() {
        format!("{}: {}", db_error.severity(), db_error.message())
    } else {
        let msg = e.to_string();
        if msg.contains("Connection refused") {
            "connection refused".to_string()
        } else {
            msg
        }
    }
}
