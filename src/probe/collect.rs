//! Snapshot assembly.
//!
//! Runs the metric probes in a fixed order against a [`MetricSource`]. Each
//! probe failure is logged and isolated: the remaining probes still run and
//! a snapshot is always returned.

use tracing::error;

use super::traits::MetricSource;
use crate::model::{LogSettingEntry, MetricSnapshot};

/// Collects one full snapshot from `source`.
///
/// Starts from an all-absent snapshot and fills in whatever the server
/// answers. A failing query leaves only its own field `None`.
pub fn collect_metrics<S: MetricSource>(source: &mut S) -> MetricSnapshot {
    let mut snapshot = MetricSnapshot::default();

    match source.version_string() {
        Ok(raw) => match extract_version(&raw) {
            Some(version) => snapshot.version = Some(version.to_string()),
            None => error!(raw = %raw, "unexpected server version format"),
        },
        Err(e) => error!(error = %e, "failed to fetch server version"),
    }

    match source.max_connections() {
        Ok(value) => snapshot.max_connections = Some(value),
        Err(e) => error!(error = %e, "failed to fetch max connections"),
    }

    match source.current_connections() {
        Ok(value) => snapshot.current_connections = Some(value),
        Err(e) => error!(error = %e, "failed to fetch current connections"),
    }

    snapshot.connections_percent =
        connections_percent(snapshot.max_connections, snapshot.current_connections);

    match source.lock_rows() {
        Ok(rows) => snapshot.locks = Some(rows),
        Err(e) => error!(error = %e, "failed to fetch lock list"),
    }

    match source.log_settings() {
        Ok(entries) => snapshot.log_file = Some(normalize_log_settings(entries)),
        Err(e) => error!(error = %e, "failed to fetch log settings"),
    }

    match source.connected_slaves() {
        Ok(value) => snapshot.connected_slaves = Some(value),
        Err(e) => error!(error = %e, "failed to fetch connected slaves"),
    }

    match source.slave_lag_seconds() {
        // NULL means there is no replay position, i.e. this is a primary.
        Ok(lag) => snapshot.slave_lag = lag.map(|seconds| seconds as i64),
        Err(e) => error!(error = %e, "failed to fetch slave lag"),
    }

    snapshot
}

/// Extracts the version number from the server banner.
///
/// "PostgreSQL 9.3.5 on x86_64-unknown-linux-gnu, ..." yields "9.3.5".
fn extract_version(raw: &str) -> Option<&str> {
    raw.split_whitespace().nth(1)
}

/// Percentage of the connection limit in use.
///
/// Absent when either side is unknown or the limit is zero.
fn connections_percent(max: Option<i64>, current: Option<i64>) -> Option<f64> {
    match (max, current) {
        (Some(max), Some(current)) if max != 0 => Some(current as f64 / max as f64 * 100.0),
        _ => None,
    }
}

/// Replaces empty values with "?" and sorts by setting name.
fn normalize_log_settings(mut entries: Vec<LogSettingEntry>) -> Vec<LogSettingEntry> {
    for entry in &mut entries {
        if entry.setting.is_empty() {
            entry.setting = "?".to_string();
        }
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}
