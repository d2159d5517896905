//! Metric snapshot model.
//!
//! These structures hold the result of one probe pass against a PostgreSQL
//! server. A snapshot always carries all eight metric slots; a metric that
//! could not be collected stays `None` and serializes as `null`, so consumers
//! can tell "absent" from "zero".

use serde::{Deserialize, Serialize};

/// A single lock held or awaited on the server.
///
/// Source: `SELECT granted, mode, datname FROM pg_locks JOIN pg_database ...`
///
/// Rows keep the order the server returned them in.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct LockInfo {
    /// Whether the lock is held (true) or still being waited for (false).
    /// Source: `pg_locks.granted`
    pub granted: bool,

    /// Lock mode name (AccessShareLock, RowExclusiveLock, etc.).
    /// Source: `pg_locks.mode`
    pub mode: String,

    /// Name of the database the locked relation belongs to.
    /// Source: `pg_database.datname` via join on `pg_locks.database`
    pub datname: String,
}

/// One logging-related server setting.
///
/// Source: `pg_settings` rows for log_destination, log_directory,
/// log_filename, redirect_stderr and syslog_facility.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
pub struct LogSettingEntry {
    /// Setting name.
    /// Source: `pg_settings.name`
    pub name: String,

    /// Setting value. An empty value is reported as `"?"`.
    /// Source: `pg_settings.setting`
    pub setting: String,
}

/// Result of one probe pass.
///
/// Every field is optional: a fatal failure never produces a snapshot at all,
/// while an individual query failure leaves only its own field absent. The
/// serialized form always contains all eight keys (camelCase), with `null`
/// for absent metrics.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct MetricSnapshot {
    /// Server version, e.g. "9.3.5" or "16.2".
    /// Source: second whitespace-separated token of `SELECT version()`
    pub version: Option<String>,

    /// Configured connection limit.
    /// Source: `pg_settings` row `max_connections`
    pub max_connections: Option<i64>,

    /// Number of current backend connections.
    /// Source: count over `pg_database` left-joined to `pg_stat_activity`
    pub current_connections: Option<i64>,

    /// Connection pool usage, `100 * current / max`.
    /// Derived; present only when both inputs are known and max is non-zero.
    pub connections_percent: Option<f64>,

    /// All locks currently held or awaited, in query order.
    /// Source: `pg_locks` joined to `pg_database`
    pub locks: Option<Vec<LockInfo>>,

    /// Logging destination settings, sorted alphabetically by name.
    /// Source: `pg_settings`
    pub log_file: Option<Vec<LogSettingEntry>>,

    /// Number of connected streaming replicas.
    /// Source: `SELECT count(pid) FROM pg_stat_replication`
    pub connected_slaves: Option<i64>,

    /// Replication lag in whole seconds (standby only).
    /// 0 when receive and replay positions match, otherwise seconds since
    /// the last replayed transaction, truncated. Absent on a primary.
    pub slave_lag: Option<i64>,
}
