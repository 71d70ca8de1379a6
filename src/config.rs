//! Controller defaults loaded from `config/config.toml` or environment variables.
//!
//! ```toml
//! [sluice]
//! default_max_results = 25
//! count_projection = "count(distinct e.id)"
//! placeholder_prefix = "#{"
//! placeholder_suffix = "}"
//! ```
//!
//! Every key can be overridden with `SLUICE__SLUICE__<KEY>` environment variables.

use crate::resolve::PlaceholderSyntax;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

const CONFIG_FILE: &str = "config/config.toml";

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ControllerConfig {
    /// Page size applied to new controllers
    #[serde(default)]
    pub default_max_results: Option<u64>,
    /// Upper bound for requested page sizes
    #[serde(default)]
    pub max_page_size: Option<u64>,
    /// Projection used by COUNT queries instead of `count(*)`
    #[serde(default)]
    pub count_projection: Option<String>,
    #[serde(default = "default_placeholder_prefix")]
    pub placeholder_prefix: String,
    #[serde(default = "default_placeholder_suffix")]
    pub placeholder_suffix: String,
}

fn default_placeholder_prefix() -> String {
    "#{".to_string()
}

fn default_placeholder_suffix() -> String {
    "}".to_string()
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            default_max_results: None,
            max_page_size: None,
            count_projection: None,
            placeholder_prefix: default_placeholder_prefix(),
            placeholder_suffix: default_placeholder_suffix(),
        }
    }
}

impl ControllerConfig {
    /// Load the `[sluice]` section from `config/config.toml`, falling back to env vars.
    ///
    /// A missing section yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix("SLUICE").separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                // An existing but unreadable file is reported, then env alone is tried
                if std::path::Path::new(CONFIG_FILE).exists() {
                    log::warn!("failed to load config file, falling back to env: {err}");
                }
                Config::builder()
                    .add_source(Environment::with_prefix("SLUICE").separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {err}, then env-only error: {env_err}"
                        ))
                    })?
            }
        };

        Self::from_config(&settings)
    }

    /// Read the `[sluice]` section of an already built configuration.
    pub fn from_config(settings: &Config) -> Result<Self, ConfigError> {
        match settings.get::<ControllerConfig>("sluice") {
            Ok(config) => config.validated(),
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            Err(e) => Err(ConfigError::Message(format!(
                "Controller configuration could not be loaded from file or environment: {e}"
            ))),
        }
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.placeholder_prefix.is_empty() || self.placeholder_suffix.is_empty() {
            return Err(ConfigError::Message(
                "placeholder_prefix and placeholder_suffix must not be empty".to_string(),
            ));
        }
        if let (Some(default), Some(max)) = (self.default_max_results, self.max_page_size) {
            if default > max {
                return Err(ConfigError::Message(format!(
                    "default_max_results ({default}) exceeds max_page_size ({max})"
                )));
            }
        }
        Ok(self)
    }

    pub fn placeholder_syntax(&self) -> PlaceholderSyntax {
        PlaceholderSyntax::new(self.placeholder_prefix.clone(), self.placeholder_suffix.clone())
    }

    /// Apply `max_page_size` to a requested page size.
    pub fn clamp_page_size(&self, requested: u64) -> u64 {
        self.max_page_size.map_or(requested, |max| requested.min(max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn settings(toml: &str) -> Config {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
    }

    #[test]
    fn test_defaults_when_section_missing() {
        let config = ControllerConfig::from_config(&settings("[other]\nkey = 1")).unwrap();
        assert_eq!(config, ControllerConfig::default());
        assert_eq!(config.placeholder_syntax(), PlaceholderSyntax::default());
    }

    #[test]
    fn test_section_values() {
        let config = ControllerConfig::from_config(&settings(
            "[sluice]\ndefault_max_results = 25\nmax_page_size = 100\ncount_projection = \"count(distinct e.id)\"\nplaceholder_prefix = \"${\"",
        ))
        .unwrap();
        assert_eq!(config.default_max_results, Some(25));
        assert_eq!(config.count_projection.as_deref(), Some("count(distinct e.id)"));
        assert_eq!(config.placeholder_syntax(), PlaceholderSyntax::new("${", "}"));
        assert_eq!(config.clamp_page_size(500), 100);
        assert_eq!(config.clamp_page_size(10), 10);
    }

    #[test]
    fn test_invalid_section_is_rejected() {
        let result = ControllerConfig::from_config(&settings(
            "[sluice]\ndefault_max_results = 200\nmax_page_size = 100",
        ));
        assert!(result.is_err());

        let result = ControllerConfig::from_config(&settings("[sluice]\nplaceholder_suffix = \"\""));
        assert!(result.is_err());
    }
}
