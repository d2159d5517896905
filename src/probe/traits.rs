//! Abstraction over the metric queries to enable testing without a server.
//!
//! The `MetricSource` trait exposes each query round-trip as one method
//! returning the raw, unnormalized value. The real implementation is
//! [`ProbeClient`]; tests drive snapshot assembly with an in-memory fake.

use super::queries;
use super::{ProbeClient, ProbeError, format_postgres_error};
use crate::model::{LockInfo, LogSettingEntry};

/// One metric query round-trip per method.
///
/// Normalization (version token extraction, log-setting sorting, lag
/// truncation) happens in the assembly layer, not here.
pub trait MetricSource {
    /// Full version banner, e.g. "PostgreSQL 16.2 on x86_64-pc-linux-gnu, ...".
    fn version_string(&mut self) -> Result<String, ProbeError>;

    /// Configured max_connections setting.
    fn max_connections(&mut self) -> Result<i64, ProbeError>;

    /// Number of backends currently attached to any database.
    fn current_connections(&mut self) -> Result<i64, ProbeError>;

    /// All locks currently held or awaited, in server order.
    fn lock_rows(&mut self) -> Result<Vec<LockInfo>, ProbeError>;

    /// Logging destination settings, unsorted and unnormalized.
    fn log_settings(&mut self) -> Result<Vec<LogSettingEntry>, ProbeError>;

    /// Number of connected streaming replicas.
    fn connected_slaves(&mut self) -> Result<i64, ProbeError>;

    /// Replication lag in fractional seconds; `None` on a primary.
    fn slave_lag_seconds(&mut self) -> Result<Option<f64>, ProbeError>;
}

impl MetricSource for ProbeClient {
    fn version_string(&mut self) -> Result<String, ProbeError> {
        let row = self
            .client
            .query_one(queries::VERSION_QUERY, &[])
            .map_err(query_failed)?;
        row.try_get(0).map_err(query_failed)
    }

    fn max_connections(&mut self) -> Result<i64, ProbeError> {
        let row = self
            .client
            .query_one(queries::MAX_CONNECTIONS_QUERY, &[])
            .map_err(query_failed)?;
        // setting::integer arrives as INT4
        let value: i32 = row.try_get(0).map_err(query_failed)?;
        Ok(i64::from(value))
    }

    fn current_connections(&mut self) -> Result<i64, ProbeError> {
        let row = self
            .client
            .query_one(queries::CURRENT_CONNECTIONS_QUERY, &[])
            .map_err(query_failed)?;
        row.try_get(0).map_err(query_failed)
    }

    fn lock_rows(&mut self) -> Result<Vec<LockInfo>, ProbeError> {
        let rows = self
            .client
            .query(queries::LOCKS_QUERY, &[])
            .map_err(query_failed)?;
        Ok(rows
            .iter()
            .map(|row| LockInfo {
                granted: row.get(0),
                mode: row.get(1),
                datname: row.get(2),
            })
            .collect())
    }

    fn log_settings(&mut self) -> Result<Vec<LogSettingEntry>, ProbeError> {
        let rows = self
            .client
            .query(queries::LOG_SETTINGS_QUERY, &[])
            .map_err(query_failed)?;
        Ok(rows
            .iter()
            .map(|row| LogSettingEntry {
                name: row.get(0),
                setting: row.get(1),
            })
            .collect())
    }

    fn connected_slaves(&mut self) -> Result<i64, ProbeError> {
        let row = self
            .client
            .query_one(queries::CONNECTED_SLAVES_QUERY, &[])
            .map_err(query_failed)?;
        row.try_get(0).map_err(query_failed)
    }

    fn slave_lag_seconds(&mut self) -> Result<Option<f64>, ProbeError> {
        let query = queries::build_slave_lag_query(self.server_version_num);
        let row = self.client.query_one(query, &[]).map_err(query_failed)?;
        row.try_get(0).map_err(query_failed)
    }
}

/// Maps a driver error into [`ProbeError::QueryFailed`].
fn query_failed(e: postgres::Error) -> ProbeError {
    ProbeError::QueryFailed(format_postgres_error(&e))
}
