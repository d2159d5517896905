//! Connection configuration.
//!
//! The probe receives an already-resolved configuration section (plain
//! key/value pairs) from its caller and validates it here. Three keys are
//! required: `postgres_database`, `postgres_user` and `postgres_host`.
//! `postgres_pass` and `postgres_port` are optional; the port falls back to
//! 5432 at connection time. An empty value counts as absent.

use std::collections::HashMap;

use tracing::debug;

use crate::probe::ProbeError;

/// Port used when `postgres_port` is absent or empty.
const DEFAULT_PORT: &str = "5432";

/// Validated connection parameters for one probe run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    pub database: String,
    pub user: String,
    pub password: Option<String>,
    pub host: String,
    pub port: Option<String>,
}

impl ProbeConfig {
    /// Validates a resolved config section.
    ///
    /// `None` means the section was absent entirely. That is logged at debug
    /// level and then validated like an empty section, so the reported error
    /// still names the first missing key. Required keys are checked in a
    /// fixed order: database, user, host.
    pub fn from_section(section: Option<&HashMap<String, String>>) -> Result<Self, ProbeError> {
        let empty = HashMap::new();
        let section = match section {
            Some(s) => s,
            None => {
                debug!("postgres config section not found");
                &empty
            }
        };

        let database = require(section, "postgres_database")?;
        let user = require(section, "postgres_user")?;
        let host = require(section, "postgres_host")?;
        let password = optional(section, "postgres_pass");
        let port = optional(section, "postgres_port");

        Ok(Self {
            database,
            user,
            password,
            host,
            port,
        })
    }

    /// Returns the port to connect to, falling back to 5432.
    pub fn effective_port(&self) -> &str {
        self.port.as_deref().unwrap_or(DEFAULT_PORT)
    }

    /// Builds a libpq-style connection string.
    ///
    /// The password token is omitted entirely when no password is configured,
    /// matching libpq's handling of passwordless authentication.
    pub fn connection_string(&self) -> String {
        match &self.password {
            Some(password) => format!(
                "host={} port={} user={} password={} dbname={}",
                self.host,
                self.effective_port(),
                self.user,
                password,
                self.database
            ),
            None => format!(
                "host={} port={} user={} dbname={}",
                self.host,
                self.effective_port(),
                self.user,
                self.database
            ),
        }
    }
}

/// Fetches a required key, treating an empty value as absent.
fn require(section: &HashMap<String, String>, key: &'static str) -> Result<String, ProbeError> {
    match section.get(key) {
        Some(value) if !value.is_empty() => Ok(value.clone()),
        _ => Err(ProbeError::ConfigIncomplete(key)),
    }
}

/// Fetches an optional key, treating an empty value as absent.
fn optional(section: &HashMap<String, String>, key: &str) -> Option<String> {
    section.get(key).filter(|v| !v.is_empty()).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_section() -> HashMap<String, String> {
        section(&[
            ("postgres_database", "app"),
            ("postgres_user", "monitor"),
            ("postgres_pass", "secret"),
            ("postgres_host", "db.local"),
            ("postgres_port", "5433"),
        ])
    }

    #[test]
    fn absent_section_reports_database_first() {
        let err = ProbeConfig::from_section(None).unwrap_err();
        assert!(matches!(err, ProbeError::ConfigIncomplete("postgres_database")));
        assert_eq!(
            err.to_string(),
            "PostgreSQL: config not complete (missing: postgres_database)"
        );
    }

    #[test]
    fn missing_keys_reported_in_declaration_order() {
        let s = section(&[("postgres_database", "app")]);
        let err = ProbeConfig::from_section(Some(&s)).unwrap_err();
        assert!(matches!(err, ProbeError::ConfigIncomplete("postgres_user")));

        let s = section(&[("postgres_database", "app"), ("postgres_user", "monitor")]);
        let err = ProbeConfig::from_section(Some(&s)).unwrap_err();
        assert!(matches!(err, ProbeError::ConfigIncomplete("postgres_host")));
    }

    #[test]
    fn empty_value_counts_as_missing() {
        let mut s = full_section();
        s.insert("postgres_user".to_string(), String::new());
        let err = ProbeConfig::from_section(Some(&s)).unwrap_err();
        assert!(matches!(err, ProbeError::ConfigIncomplete("postgres_user")));
    }

    #[test]
    fn full_section_parses() {
        let config = ProbeConfig::from_section(Some(&full_section())).unwrap();
        assert_eq!(config.database, "app");
        assert_eq!(config.user, "monitor");
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.host, "db.local");
        assert_eq!(config.port.as_deref(), Some("5433"));
    }

    #[test]
    fn optional_keys_default_to_none() {
        let s = section(&[
            ("postgres_database", "app"),
            ("postgres_user", "monitor"),
            ("postgres_host", "db.local"),
        ]);
        let config = ProbeConfig::from_section(Some(&s)).unwrap();
        assert_eq!(config.password, None);
        assert_eq!(config.port, None);
    }

    #[test]
    fn port_falls_back_to_5432_when_absent_or_empty() {
        let mut s = full_section();
        s.remove("postgres_port");
        let config = ProbeConfig::from_section(Some(&s)).unwrap();
        assert_eq!(config.effective_port(), "5432");

        s.insert("postgres_port".to_string(), String::new());
        let config = ProbeConfig::from_section(Some(&s)).unwrap();
        assert_eq!(config.effective_port(), "5432");
    }

    #[test]
    fn connection_string_includes_password_when_set() {
        let config = ProbeConfig::from_section(Some(&full_section())).unwrap();
        assert_eq!(
            config.connection_string(),
            "host=db.local port=5433 user=monitor password=secret dbname=app"
        );
    }

    #[test]
    fn connection_string_omits_password_when_unset() {
        let mut s = full_section();
        s.insert("postgres_pass".to_string(), String::new());
        s.remove("postgres_port");
        let config = ProbeConfig::from_section(Some(&s)).unwrap();
        assert_eq!(
            config.connection_string(),
            "host=db.local port=5432 user=monitor dbname=app"
        );
    }
}
