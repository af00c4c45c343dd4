//! Process-wide configuration
//!
//! Read once at startup from `INTAKE_*` environment variables and immutable
//! afterwards. Missing required values fail startup rather than individual
//! requests.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Endpoint value selecting the in-process transition policy
pub const LOCAL_ENDPOINT: &str = "local";

const DEFAULT_ENV: &str = "dev";
const DEFAULT_QUALIFIER: &str = "DEFAULT";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_ATTEMPTS: u32 = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration: {0}")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Where transition requests go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionEndpoint {
    /// Run the linear policy in process
    Local,
    /// POST to a remote transition service
    Http(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Identity of the state table/namespace
    pub state_namespace: String,
    pub transition_endpoint: TransitionEndpoint,
    /// Deployment environment tag stamped on every stored record
    pub environment: String,
    /// Deployed revision of the transition service to call
    pub qualifier: String,
    pub db_path: PathBuf,
    pub port: u16,
    pub invoke_timeout: Duration,
    pub invoke_max_attempts: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let state_namespace =
            get("INTAKE_STATE_NAMESPACE").ok_or(ConfigError::Missing("INTAKE_STATE_NAMESPACE"))?;

        let endpoint = get("INTAKE_TRANSITION_ENDPOINT")
            .ok_or(ConfigError::Missing("INTAKE_TRANSITION_ENDPOINT"))?;
        let transition_endpoint = if endpoint.eq_ignore_ascii_case(LOCAL_ENDPOINT) {
            TransitionEndpoint::Local
        } else if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            TransitionEndpoint::Http(endpoint)
        } else {
            return Err(ConfigError::Invalid {
                name: "INTAKE_TRANSITION_ENDPOINT",
                value: endpoint,
            });
        };

        let db_path = get("INTAKE_DB_PATH").map_or_else(
            || {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(format!("{home}/.intake-gateway/state.db"))
            },
            PathBuf::from,
        );

        let timeout_secs = parse_or(
            "INTAKE_INVOKE_TIMEOUT_SECS",
            get("INTAKE_INVOKE_TIMEOUT_SECS"),
            DEFAULT_TIMEOUT_SECS,
        )?;
        // A zero timeout would fail every call
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "INTAKE_INVOKE_TIMEOUT_SECS",
                value: timeout_secs.to_string(),
            });
        }

        Ok(Self {
            state_namespace,
            transition_endpoint,
            environment: get("INTAKE_ENV").unwrap_or_else(|| DEFAULT_ENV.to_string()),
            qualifier: get("INTAKE_TRANSITION_QUALIFIER")
                .unwrap_or_else(|| DEFAULT_QUALIFIER.to_string()),
            db_path,
            port: parse_or("INTAKE_PORT", get("INTAKE_PORT"), DEFAULT_PORT)?,
            invoke_timeout: Duration::from_secs(timeout_secs),
            invoke_max_attempts: parse_or(
                "INTAKE_INVOKE_MAX_ATTEMPTS",
                get("INTAKE_INVOKE_MAX_ATTEMPTS"),
                DEFAULT_MAX_ATTEMPTS,
            )?
            .max(1),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(v) => v
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: v }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("INTAKE_STATE_NAMESPACE", "intake-sessions"),
            ("INTAKE_TRANSITION_ENDPOINT", "local"),
            ("INTAKE_DB_PATH", "/tmp/intake.db"),
        ]))
        .unwrap();

        assert_eq!(config.state_namespace, "intake-sessions");
        assert_eq!(config.transition_endpoint, TransitionEndpoint::Local);
        assert_eq!(config.environment, "dev");
        assert_eq!(config.qualifier, "DEFAULT");
        assert_eq!(config.db_path, PathBuf::from("/tmp/intake.db"));
        assert_eq!(config.port, 8080);
        assert_eq!(config.invoke_timeout, Duration::from_secs(30));
        assert_eq!(config.invoke_max_attempts, 2);
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_lookup(lookup(&[
            ("INTAKE_STATE_NAMESPACE", "intake-sessions"),
            ("INTAKE_TRANSITION_ENDPOINT", "https://stage.internal/transition"),
            ("INTAKE_ENV", "prod"),
            ("INTAKE_TRANSITION_QUALIFIER", "v7"),
            ("INTAKE_PORT", "9000"),
            ("INTAKE_INVOKE_TIMEOUT_SECS", "5"),
            ("INTAKE_INVOKE_MAX_ATTEMPTS", "0"),
        ]))
        .unwrap();

        assert_eq!(
            config.transition_endpoint,
            TransitionEndpoint::Http("https://stage.internal/transition".to_string())
        );
        assert_eq!(config.environment, "prod");
        assert_eq!(config.qualifier, "v7");
        assert_eq!(config.port, 9000);
        assert_eq!(config.invoke_timeout, Duration::from_secs(5));
        assert_eq!(config.invoke_max_attempts, 1);
    }

    #[test]
    fn test_missing_required_values() {
        let err = Config::from_lookup(lookup(&[("INTAKE_TRANSITION_ENDPOINT", "local")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("INTAKE_STATE_NAMESPACE"));

        let err = Config::from_lookup(lookup(&[
            ("INTAKE_STATE_NAMESPACE", "t"),
            ("INTAKE_TRANSITION_ENDPOINT", "   "),
        ]))
        .unwrap_err();
        assert_eq!(err, ConfigError::Missing("INTAKE_TRANSITION_ENDPOINT"));
    }

    #[test]
    fn test_invalid_values() {
        let err = Config::from_lookup(lookup(&[
            ("INTAKE_STATE_NAMESPACE", "t"),
            ("INTAKE_TRANSITION_ENDPOINT", "ftp://nope"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "INTAKE_TRANSITION_ENDPOINT", .. }));

        let err = Config::from_lookup(lookup(&[
            ("INTAKE_STATE_NAMESPACE", "t"),
            ("INTAKE_TRANSITION_ENDPOINT", "local"),
            ("INTAKE_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "INTAKE_PORT", .. }));
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let err = Config::from_lookup(lookup(&[
            ("INTAKE_STATE_NAMESPACE", "t"),
            ("INTAKE_TRANSITION_ENDPOINT", "local"),
            ("INTAKE_INVOKE_TIMEOUT_SECS", "0"),
        ]))
        .unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                name: "INTAKE_INVOKE_TIMEOUT_SECS",
                value: "0".to_string(),
            }
        );
    }
}
