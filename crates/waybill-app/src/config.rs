//! Configuration management for waybill
//!
//! Config stored at: ~/.config/waybill/config.json

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use waybill_domain::service::AmountMode;
use waybill_infra::api::ApiSettings;
use waybill_types::{ConfigError, OutputFormat, Result};

use crate::polling::PollSchedule;

/// Environment variable overriding `api_base_url`
pub const API_BASE_URL_ENV: &str = "WAYBILL_API_BASE_URL";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the waybill REST API
    #[serde(default)]
    pub api_base_url: Option<String>,

    /// Fee per drop beyond the free ones, used when the API has none
    #[serde(default)]
    pub additional_rate: f64,

    /// Amount mode for new waybills
    #[serde(default)]
    pub amount_mode: AmountMode,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_subdetail_timeout_secs")]
    pub subdetail_timeout_secs: u64,

    /// Approval polling: fast interval for the first cycles, then slow
    #[serde(default = "default_poll_fast_secs")]
    pub poll_fast_secs: u64,

    #[serde(default = "default_poll_slow_secs")]
    pub poll_slow_secs: u64,

    #[serde(default = "default_poll_fast_cycles")]
    pub poll_fast_cycles: u32,

    /// Waybill store directory override
    #[serde(default)]
    pub store_dir: Option<PathBuf>,

    /// Default output format (json, table)
    #[serde(default = "default_output_format")]
    pub output_format: OutputFormat,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_subdetail_timeout_secs() -> u64 {
    10
}

fn default_poll_fast_secs() -> u64 {
    2
}

fn default_poll_slow_secs() -> u64 {
    10
}

fn default_poll_fast_cycles() -> u32 {
    20
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Table
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            additional_rate: 0.0,
            amount_mode: AmountMode::default(),
            request_timeout_secs: default_request_timeout_secs(),
            subdetail_timeout_secs: default_subdetail_timeout_secs(),
            poll_fast_secs: default_poll_fast_secs(),
            poll_slow_secs: default_poll_slow_secs(),
            poll_fast_cycles: default_poll_fast_cycles(),
            store_dir: None,
            output_format: default_output_format(),
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NotFound)?
            .join("waybill");
        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Get the waybill store directory
    pub fn store_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.store_dir {
            return Ok(dir.clone());
        }

        let store_dir = dirs::data_dir()
            .ok_or(ConfigError::NotFound)?
            .join("waybill");
        Ok(store_dir)
    }

    /// Load config from file, or create default.
    /// `WAYBILL_API_BASE_URL` wins over the file.
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(format!("{}: {}", path.display(), e)))?
        } else {
            Config::default()
        };

        config.apply_api_base_url_override(std::env::var(API_BASE_URL_ENV).ok());
        Ok(config)
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    pub fn apply_api_base_url_override(&mut self, value: Option<String>) {
        if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
            self.api_base_url = Some(url.trim().to_string());
        }
    }

    /// HTTP settings; fails when no base URL is configured
    pub fn api_settings(&self) -> Result<ApiSettings> {
        let base_url = self.api_base_url.clone().ok_or_else(|| ConfigError::InvalidValue {
            key: "api_base_url".to_string(),
            value: format!("(unset, configure it or set {})", API_BASE_URL_ENV),
        })?;
        Ok(ApiSettings::new(base_url)
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_subdetail_timeout(Duration::from_secs(self.subdetail_timeout_secs)))
    }

    pub fn poll_schedule(&self) -> PollSchedule {
        PollSchedule {
            fast_interval: Duration::from_secs(self.poll_fast_secs),
            slow_interval: Duration::from_secs(self.poll_slow_secs),
            fast_cycles: self.poll_fast_cycles,
        }
    }

    /// Reject values that would break allocation or polling
    pub fn validate(&self) -> Result<()> {
        if self.additional_rate < 0.0 || !self.additional_rate.is_finite() {
            return Err(ConfigError::InvalidValue {
                key: "additional_rate".to_string(),
                value: self.additional_rate.to_string(),
            }
            .into());
        }
        if self.poll_fast_secs == 0 || self.poll_slow_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "poll interval".to_string(),
                value: "0".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Waybill Configuration")?;
        writeln!(f, "=====================")?;
        writeln!(f)?;
        writeln!(
            f,
            "API base URL:       {}",
            self.api_base_url.as_deref().unwrap_or("(not set)")
        )?;
        writeln!(f, "Additional rate:    {:.2}", self.additional_rate)?;
        writeln!(f, "Amount mode:        {}", self.amount_mode)?;
        writeln!(f, "Request timeout:    {}s", self.request_timeout_secs)?;
        writeln!(f, "Subdetail timeout:  {}s", self.subdetail_timeout_secs)?;
        writeln!(
            f,
            "Approval polling:   every {}s for {} cycles, then every {}s",
            self.poll_fast_secs, self.poll_fast_cycles, self.poll_slow_secs
        )?;
        writeln!(
            f,
            "Store dir:          {}",
            self.store_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "(error)".to_string())
        )?;
        writeln!(f, "Output format:      {}", self.output_format)?;

        if let Ok(path) = Self::config_path() {
            writeln!(f)?;
            writeln!(f, "Config file:        {}", path.display())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: Config = serde_json::from_str(r#"{"additional_rate": 750}"#).unwrap();
        assert_eq!(config.additional_rate, 750.0);
        assert_eq!(config.poll_fast_secs, 2);
        assert_eq!(config.poll_slow_secs, 10);
        assert_eq!(config.poll_fast_cycles, 20);
        assert_eq!(config.subdetail_timeout_secs, 10);
        assert_eq!(config.output_format, OutputFormat::Table);
        assert_eq!(config.amount_mode, AmountMode::Percentage);
    }

    #[test]
    fn test_env_override() {
        let mut config = Config {
            api_base_url: Some("http://file.example".to_string()),
            ..Config::default()
        };
        config.apply_api_base_url_override(None);
        assert_eq!(config.api_base_url.as_deref(), Some("http://file.example"));

        config.apply_api_base_url_override(Some("  ".to_string()));
        assert_eq!(config.api_base_url.as_deref(), Some("http://file.example"));

        config.apply_api_base_url_override(Some("http://env.example/api".to_string()));
        assert_eq!(config.api_base_url.as_deref(), Some("http://env.example/api"));
    }

    #[test]
    fn test_api_settings_require_base_url() {
        let config = Config::default();
        assert!(config.api_settings().is_err());

        let config = Config {
            api_base_url: Some("http://localhost:8080".to_string()),
            subdetail_timeout_secs: 5,
            ..Config::default()
        };
        let settings = config.api_settings().unwrap();
        assert_eq!(settings.subdetail_timeout, Duration::from_secs(5));
        assert_eq!(settings.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_validate() {
        assert!(Config::default().validate().is_ok());
        let config = Config {
            additional_rate: -1.0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_store_dir_override() {
        let config = Config {
            store_dir: Some(PathBuf::from("/tmp/waybills")),
            ..Config::default()
        };
        assert_eq!(config.store_dir().unwrap(), PathBuf::from("/tmp/waybills"));
    }
}
