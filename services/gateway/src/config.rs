use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub api_keys: Vec<String>,
    pub upload_dir: PathBuf,
    pub agent_url: String,
    pub collaborator_timeout: Duration,
    pub context_limit: usize,
    pub max_history: usize,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let api_keys = std::env::var("API_KEYS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(String::from)
            .collect();

        let upload_dir = std::env::var("UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("uploads"));

        let agent_url = std::env::var("AGENT_URL")
            .map_err(|_| ConfigError::MissingVar("AGENT_URL".to_string()))?;

        let collaborator_timeout = parse_var("COLLABORATOR_TIMEOUT_SECS", 30u64)
            .map(Duration::from_secs)?;
        let context_limit = parse_var("CHAT_CONTEXT_LIMIT", 10usize)?;
        let max_history = parse_var("MAX_CHAT_HISTORY", 100usize)?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            api_keys,
            upload_dir,
            agent_url,
            collaborator_timeout,
            context_limit,
            max_history,
            log_level,
        })
    }
}

/// Reads an optional numeric variable, falling back to `default`.
fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.parse::<T>().map_err(|_| {
            ConfigError::InvalidValue(name.to_string(), format!("'{}' is not a number", raw))
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tracing::Level;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("BIND_ADDRESS");
            env::remove_var("API_KEYS");
            env::remove_var("UPLOAD_DIR");
            env::remove_var("AGENT_URL");
            env::remove_var("COLLABORATOR_TIMEOUT_SECS");
            env::remove_var("CHAT_CONTEXT_LIMIT");
            env::remove_var("MAX_CHAT_HISTORY");
            env::remove_var("RUST_LOG");
        }
    }

    fn set_minimal_env() {
        unsafe {
            env::set_var("AGENT_URL", "http://localhost:8000/agent/process");
        }
    }

    #[test]
    fn test_config_error_display() {
        let missing_var = ConfigError::MissingVar("TEST_VAR".to_string());
        assert_eq!(
            format!("{}", missing_var),
            "Missing environment variable: TEST_VAR"
        );

        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env_minimal() {
        clear_env_vars();
        set_minimal_env();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert!(config.api_keys.is_empty());
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.agent_url, "http://localhost:8000/agent/process");
        assert_eq!(config.collaborator_timeout, Duration::from_secs(30));
        assert_eq!(config.context_limit, 10);
        assert_eq!(config.max_history, 100);
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:8080");
            env::set_var("API_KEYS", "111111, 222222,333333");
            env::set_var("UPLOAD_DIR", "/var/lib/gateway/audio");
            env::set_var("AGENT_URL", "http://agent.internal/process");
            env::set_var("COLLABORATOR_TIMEOUT_SECS", "5");
            env::set_var("CHAT_CONTEXT_LIMIT", "4");
            env::set_var("MAX_CHAT_HISTORY", "50");
            env::set_var("RUST_LOG", "debug");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(
            config.api_keys,
            vec!["111111".to_string(), "222222".to_string(), "333333".to_string()]
        );
        assert_eq!(config.upload_dir, PathBuf::from("/var/lib/gateway/audio"));
        assert_eq!(config.agent_url, "http://agent.internal/process");
        assert_eq!(config.collaborator_timeout, Duration::from_secs(5));
        assert_eq!(config.context_limit, 4);
        assert_eq!(config.max_history, 50);
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    #[serial]
    fn test_config_missing_agent_url() {
        clear_env_vars();

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(var) => assert_eq!(var, "AGENT_URL"),
            _ => panic!("Expected MissingVar for AGENT_URL"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "BIND_ADDRESS"),
            _ => panic!("Expected InvalidValue for BIND_ADDRESS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_timeout() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("COLLABORATOR_TIMEOUT_SECS", "soon");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "COLLABORATOR_TIMEOUT_SECS"),
            _ => panic!("Expected InvalidValue for COLLABORATOR_TIMEOUT_SECS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        set_minimal_env();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
            _ => panic!("Expected InvalidValue for RUST_LOG"),
        }
    }
}
