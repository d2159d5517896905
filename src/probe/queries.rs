//! SQL texts for the metric probes.
//!
//! Values needing a pinned Rust-side type carry explicit casts. The
//! replication lag query is version-aware: the xlog functions were renamed
//! in PostgreSQL 10.

pub(super) const VERSION_QUERY: &str = "SELECT version()";

pub(super) const MAX_CONNECTIONS_QUERY: &str =
    "SELECT setting::integer FROM pg_settings WHERE name = 'max_connections'";

/// Counts backends attached to any database. The left join keeps this from
/// failing on databases without sessions; unmatched rows have a NULL datid
/// and do not count.
pub(super) const CURRENT_CONNECTIONS_QUERY: &str =
    "SELECT count(s.datid) FROM pg_database d LEFT JOIN pg_stat_activity s ON s.datid = d.oid";

pub(super) const LOCKS_QUERY: &str =
    "SELECT l.granted, l.mode, d.datname FROM pg_locks l JOIN pg_database d ON d.oid = l.database";

/// Logging destination settings. Sorting and empty-value substitution happen
/// client-side.
pub(super) const LOG_SETTINGS_QUERY: &str = "SELECT name, setting FROM pg_settings \
     WHERE name IN ('log_destination', 'log_directory', 'log_filename', \
                    'redirect_stderr', 'syslog_facility')";

pub(super) const CONNECTED_SLAVES_QUERY: &str = "SELECT count(pid) FROM pg_stat_replication";

/// Builds the version-aware replication lag query.
///
/// Yields 0 when receive and replay positions match, otherwise fractional
/// seconds since the last replayed transaction. On a primary both branches
/// evaluate to NULL. When the server version is unknown, assumes a current
/// server.
pub(super) fn build_slave_lag_query(server_version_num: Option<i32>) -> &'static str {
    if matches!(server_version_num, Some(v) if v < 100_000) {
        "SELECT CASE WHEN pg_last_xlog_receive_location() = pg_last_xlog_replay_location() \
         THEN 0.0 ELSE EXTRACT(EPOCH FROM now() - pg_last_xact_replay_timestamp()) \
         END::double precision AS replay_lag"
    } else {
        "SELECT CASE WHEN pg_last_wal_receive_lsn() = pg_last_wal_replay_lsn() \
         THEN 0.0 ELSE EXTRACT(EPOCH FROM now() - pg_last_xact_replay_timestamp()) \
         END::double precision AS replay_lag"
    }
}
