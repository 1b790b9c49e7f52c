//! Configuration loading from disk and environment.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "GATEWAY_CONFIG_PATH";

/// Older name for [`CONFIG_PATH_ENV`], still honored by existing deployments.
pub const LEGACY_CONFIG_PATH_ENV: &str = "SME_CONFIG_PATH";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: GatewayConfig = toml::from_str(&content).map_err(ConfigError::Parse)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Pick the config file: an explicit path wins, then [`CONFIG_PATH_ENV`],
/// then [`LEGACY_CONFIG_PATH_ENV`].
pub fn resolve_config_path<F>(explicit: Option<PathBuf>, lookup: F) -> Option<PathBuf>
where
    F: Fn(&str) -> Option<String>,
{
    explicit.or_else(|| {
        [CONFIG_PATH_ENV, LEGACY_CONFIG_PATH_ENV]
            .into_iter()
            .find_map(|name| lookup(name).filter(|v| !v.is_empty()))
            .map(PathBuf::from)
    })
}

/// Resolve the effective configuration for the running process.
///
/// Reads `path` when given and present, otherwise starts from defaults, then
/// applies the `HOST`, `PORT` and `ASSISTANT_API_KEY` overrides and validates
/// the result.
pub fn load_effective(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    load_effective_with(path, |key| std::env::var(key).ok())
}

/// Like [`load_effective`], with an explicit environment lookup.
pub fn load_effective_with<F>(path: Option<&Path>, lookup: F) -> Result<GatewayConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(p) if p.exists() => {
            let content = fs::read_to_string(p).map_err(ConfigError::Io)?;
            toml::from_str(&content).map_err(ConfigError::Parse)?
        }
        Some(p) => {
            tracing::warn!(path = %p.display(), "Config file not found, using defaults");
            GatewayConfig::default()
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, lookup);

    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Apply deployment environment overrides using the given lookup.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let host = lookup("HOST").filter(|v| !v.is_empty());
    let port = lookup("PORT").filter(|v| !v.is_empty());

    if host.is_some() || port.is_some() {
        let (current_host, current_port) = split_host_port(&config.listener.bind_address);
        let host = host.unwrap_or(current_host);
        let port = port.unwrap_or(current_port);
        config.listener.bind_address = format!("{}:{}", host, port);
    }

    if let Some(key) = lookup("ASSISTANT_API_KEY") {
        config.auth.api_key = key;
    }
}

fn split_host_port(addr: &str) -> (String, String) {
    match addr.rsplit_once(':') {
        Some((host, port)) => (host.to_string(), port.to_string()),
        None => (addr.to_string(), "8080".to_string()),
    }
}
