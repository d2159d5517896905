//! pgprobe - One-shot PostgreSQL health probe.
//!
//! Connects to a PostgreSQL server, runs a fixed battery of diagnostic
//! queries and prints the resulting snapshot to stdout as JSON (default) or
//! plain text. Connection parameters come from a TOML config file with a
//! `[postgres]` section, or from the standard libpq environment variables
//! when no file is given. Scheduling is left to cron or the caller.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;
use tracing::{Level, debug, error, info};
use tracing_subscriber::EnvFilter;

use pgprobe::config::ProbeConfig;
use pgprobe::model::MetricSnapshot;
use pgprobe::probe::PostgresProbe;

/// One-shot PostgreSQL health probe.
#[derive(Parser)]
#[command(name = "pgprobe", about = "One-shot PostgreSQL health probe", version)]
struct Args {
    /// Path to a TOML config file with a [postgres] section.
    /// Without it, connection parameters come from PGDATABASE, PGUSER,
    /// PGPASSWORD, PGHOST and PGPORT.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the snapshot as plain text instead of JSON.
    #[arg(long)]
    text: bool,

    /// Increase logging verbosity (-v for debug, -vv for trace). Default is info level.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode - only show errors.
    #[arg(short, long)]
    quiet: bool,
}

/// Initializes the tracing subscriber with the appropriate log level.
/// Logs go to stderr so stdout stays clean for the snapshot output.
fn init_logging(verbose: u8, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else {
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    let filter =
        EnvFilter::from_default_env().add_directive(format!("pgprobe={}", level).parse().unwrap());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Top-level structure of the TOML config file. Sections other than
/// `[postgres]` are tolerated and ignored.
#[derive(Deserialize)]
struct ConfigFile {
    postgres: Option<HashMap<String, toml::Value>>,
}

/// Loads the `[postgres]` section from a TOML config file.
///
/// `Ok(None)` means the file parsed but contains no [postgres] table. String
/// and integer values are accepted and coerced to strings; anything else is
/// rejected.
fn load_section(path: &Path) -> Result<Option<HashMap<String, String>>, String> {
    let content = std::fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    let file: ConfigFile =
        toml::from_str(&content).map_err(|e| format!("{}: {}", path.display(), e))?;

    let Some(section) = file.postgres else {
        return Ok(None);
    };

    let mut resolved = HashMap::new();
    for (key, value) in section {
        let value = match value {
            toml::Value::String(s) => s,
            toml::Value::Integer(n) => n.to_string(),
            other => {
                return Err(format!(
                    "{}: [postgres].{} has unsupported type {}",
                    path.display(),
                    key,
                    other.type_str()
                ));
            }
        };
        resolved.insert(key, value);
    }
    Ok(Some(resolved))
}

/// Maps libpq environment variables onto config section keys.
///
/// Only variables that are actually set end up in the section, so validation
/// reports the first missing one under its config key name. Returns `None`
/// when none of them are set.
fn section_from_vars(
    vars: impl Iterator<Item = (String, String)>,
) -> Option<HashMap<String, String>> {
    const VAR_KEYS: [(&str, &str); 5] = [
        ("PGDATABASE", "postgres_database"),
        ("PGUSER", "postgres_user"),
        ("PGPASSWORD", "postgres_pass"),
        ("PGHOST", "postgres_host"),
        ("PGPORT", "postgres_port"),
    ];

    let env: HashMap<String, String> = vars.collect();
    let mut section = HashMap::new();
    for (var, key) in VAR_KEYS {
        if let Some(value) = env.get(var) {
            section.insert(key.to_string(), value.clone());
        }
    }

    if section.is_empty() { None } else { Some(section) }
}

/// Formats an optional metric value, showing "-" for absent.
fn fmt_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

/// Renders the snapshot as aligned key/value text.
fn render_text(snapshot: &MetricSnapshot) -> String {
    let locks = match &snapshot.locks {
        Some(rows) => {
            let waiting = rows.iter().filter(|l| !l.granted).count();
            format!("{} ({} waiting)", rows.len(), waiting)
        }
        None => "-".to_string(),
    };

    let log_file = match &snapshot.log_file {
        Some(entries) => entries
            .iter()
            .map(|e| format!("{}={}", e.name, e.setting))
            .collect::<Vec<_>>()
            .join(", "),
        None => "-".to_string(),
    };

    let percent = match snapshot.connections_percent {
        Some(p) => format!("{:.1}", p),
        None => "-".to_string(),
    };

    let rows = [
        ("version", fmt_opt(snapshot.version.as_deref())),
        ("maxConnections", fmt_opt(snapshot.max_connections)),
        ("currentConnections", fmt_opt(snapshot.current_connections)),
        ("connectionsPercent", percent),
        ("locks", locks),
        ("logFile", log_file),
        ("connectedSlaves", fmt_opt(snapshot.connected_slaves)),
        ("slaveLag", fmt_opt(snapshot.slave_lag)),
    ];

    let mut out = String::new();
    for (name, value) in rows {
        out.push_str(&format!("{:<20} {}\n", format!("{}:", name), value));
    }
    out
}

/// Describes the snapshot contents for the summary log line.
fn describe_snapshot(snapshot: &MetricSnapshot) -> String {
    let slots = [
        ("version", snapshot.version.is_some()),
        ("maxConnections", snapshot.max_connections.is_some()),
        ("currentConnections", snapshot.current_connections.is_some()),
        ("connectionsPercent", snapshot.connections_percent.is_some()),
        ("locks", snapshot.locks.is_some()),
        ("logFile", snapshot.log_file.is_some()),
        ("connectedSlaves", snapshot.connected_slaves.is_some()),
        ("slaveLag", snapshot.slave_lag.is_some()),
    ];

    let collected = slots.iter().filter(|(_, present)| *present).count();
    let missing: Vec<&str> = slots
        .iter()
        .filter(|(_, present)| !present)
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        format!("collected {} of {} metrics", collected, slots.len())
    } else {
        format!(
            "collected {} of {} metrics (missing: {})",
            collected,
            slots.len(),
            missing.join(", ")
        )
    }
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    debug!("pgprobe {} starting", env!("CARGO_PKG_VERSION"));

    let section = match &args.config {
        Some(path) => load_section(path).unwrap_or_else(|e| {
            eprintln!("Error reading config: {}", e);
            std::process::exit(1);
        }),
        None => section_from_vars(std::env::vars()),
    };

    let config = ProbeConfig::from_section(section.as_ref()).unwrap_or_else(|e| {
        error!("{}", e);
        std::process::exit(1);
    });

    debug!(
        host = %config.host,
        port = %config.effective_port(),
        database = %config.database,
        "starting probe"
    );

    let probe = PostgresProbe::new(config);
    let snapshot = match probe.run() {
        Ok(snapshot) => snapshot,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    info!("{}", describe_snapshot(&snapshot));

    if args.text {
        print!("{}", render_text(&snapshot));
    } else {
        println!("{}", serde_json::to_string_pretty(&snapshot).unwrap());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgprobe::model::{LockInfo, LogSettingEntry};
    use std::io::Write as _;

    fn sample_snapshot() -> MetricSnapshot {
        MetricSnapshot {
            version: Some("9.3.5".to_string()),
            max_connections: Some(100),
            current_connections: Some(25),
            connections_percent: Some(25.0),
            locks: Some(vec![LockInfo {
                granted: false,
                mode: "AccessExclusiveLock".to_string(),
                datname: "app".to_string(),
            }]),
            log_file: Some(vec![LogSettingEntry {
                name: "log_destination".to_string(),
                setting: "stderr".to_string(),
            }]),
            connected_slaves: Some(2),
            slave_lag: None,
        }
    }

    #[test]
    fn load_section_reads_postgres_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[postgres]").unwrap();
        writeln!(file, "postgres_database = \"app\"").unwrap();
        writeln!(file, "postgres_user = \"monitor\"").unwrap();
        writeln!(file, "postgres_host = \"db.local\"").unwrap();
        writeln!(file, "postgres_port = 5433").unwrap();

        let section = load_section(file.path()).unwrap().unwrap();
        assert_eq!(section["postgres_database"], "app");
        assert_eq!(section["postgres_user"], "monitor");
        assert_eq!(section["postgres_host"], "db.local");
        assert_eq!(section["postgres_port"], "5433");
        assert_eq!(section.len(), 4);
    }

    #[test]
    fn load_section_returns_none_without_postgres_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[other]").unwrap();
        writeln!(file, "key = \"value\"").unwrap();

        assert_eq!(load_section(file.path()).unwrap(), None);
    }

    #[test]
    fn load_section_rejects_invalid_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[postgres").unwrap();

        assert!(load_section(file.path()).is_err());
    }

    #[test]
    fn load_section_rejects_non_scalar_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[postgres]").unwrap();
        writeln!(file, "postgres_host = [\"a\", \"b\"]").unwrap();

        let err = load_section(file.path()).unwrap_err();
        assert!(err.contains("postgres_host"));
    }

    #[test]
    fn section_from_vars_maps_libpq_names() {
        let vars = [
            ("PGDATABASE".to_string(), "app".to_string()),
            ("PGUSER".to_string(), "monitor".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
        ];

        let section = section_from_vars(vars.into_iter()).unwrap();
        assert_eq!(section["postgres_database"], "app");
        assert_eq!(section["postgres_user"], "monitor");
        assert_eq!(section.len(), 2);
    }

    #[test]
    fn section_from_vars_without_pg_vars_means_no_section() {
        let vars = [("PATH".to_string(), "/usr/bin".to_string())];
        assert_eq!(section_from_vars(vars.into_iter()), None);
    }

    #[test]
    fn describe_snapshot_counts_and_names_missing() {
        assert_eq!(
            describe_snapshot(&sample_snapshot()),
            "collected 7 of 8 metrics (missing: slaveLag)"
        );
        assert_eq!(
            describe_snapshot(&MetricSnapshot {
                slave_lag: Some(0),
                ..sample_snapshot()
            }),
            "collected 8 of 8 metrics"
        );
    }

    #[test]
    fn render_text_shows_values_and_dashes() {
        let text = render_text(&sample_snapshot());

        assert!(text.contains("version:"));
        assert!(text.contains("9.3.5"));
        assert!(text.contains("1 (1 waiting)"));
        assert!(text.contains("log_destination=stderr"));

        let lag_line = text.lines().find(|l| l.starts_with("slaveLag:")).unwrap();
        assert!(lag_line.ends_with('-'));
    }
}
