use std::path::Path;

use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::indicator::imbalance::ImbalanceConfig;
use crate::indicator::volume_spikes::VolumeSpikesConfig;

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

/// Host configuration: logging plus one section per calculator.
///
/// Every section is optional; omitted sections and fields fall back to the
/// calculator defaults.
#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub imbalance: ImbalanceConfig,
    #[serde(default)]
    pub volume_spikes: VolumeSpikesConfig,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Accepted values: `"text"` | `"json"`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

/// Load and validate an `AppConfig` from a TOML file at `path`.
pub fn load(path: &Path) -> Result<AppConfig, Report<ConfigError>> {
    let content = std::fs::read_to_string(path)
        .change_context(ConfigError::ReadFile)
        .attach_with(|| format!("path: {}", path.display()))?;

    parse(&content)
}

/// Parse and validate an `AppConfig` from TOML text.
pub fn parse(content: &str) -> Result<AppConfig, Report<ConfigError>> {
    let config: AppConfig = toml::from_str(content).change_context(ConfigError::Parse {
        reason: "invalid TOML syntax or schema mismatch".into(),
    })?;

    validate(&config)?;

    Ok(config)
}

const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

fn validate(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    validate_general(&config.general)?;
    config
        .imbalance
        .validate()
        .change_context(ConfigError::Validation {
            field: "imbalance".into(),
        })?;
    config
        .volume_spikes
        .validate()
        .change_context(ConfigError::Validation {
            field: "volume_spikes".into(),
        })?;
    Ok(())
}

fn validate_general(general: &GeneralConfig) -> Result<(), Report<ConfigError>> {
    if !VALID_LOG_FORMATS.contains(&general.log_format.as_str()) {
        return Err(Report::new(ConfigError::Validation {
            field: format!(
                "general.log_format \"{}\" is not one of {:?}",
                general.log_format, VALID_LOG_FORMATS
            ),
        }));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_full_config_parses() {
        let toml = r##"
[general]
log_level = "debug"
log_format = "json"

[imbalance]
min_gap = 0.5
gap_up_color = "#00FF00"
gap_up_opacity = 60
gap_down_color = "#FF0000"
gap_down_opacity = 25.5
show_graphics = false
z_index = -10

[volume_spikes]
period = 20
std_dev = 2.0
spike_color = "#123456"
"##;
        let config = parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert!((config.imbalance.min_gap - 0.5).abs() < 1e-12);
        assert!((config.imbalance.gap_up_opacity - 60.0).abs() < 1e-12);
        assert!(!config.imbalance.show_graphics);
        assert_eq!(config.imbalance.z_index, -10);
        assert_eq!(config.volume_spikes.period, 20);
        assert_eq!(config.volume_spikes.spike_color.as_str(), "#123456");
    }

    #[test]
    fn defaults_applied_when_fields_omitted() {
        let config = parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "text");
        assert!((config.imbalance.min_gap - 2.25).abs() < 1e-12);
        assert_eq!(config.imbalance.z_index, -30);
        assert_eq!(config.volume_spikes.period, 50);
        assert!((config.volume_spikes.std_dev - 1.5).abs() < 1e-12);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = parse("[imbalance]\nmin_gap = 1.0\n").unwrap();
        assert!((config.imbalance.min_gap - 1.0).abs() < 1e-12);
        assert_eq!(config.imbalance.gap_up_color.as_str(), "#B8E986");
        assert!(config.imbalance.show_graphics);
    }

    #[test]
    fn zero_period_rejected() {
        assert!(parse("[volume_spikes]\nperiod = 0\n").is_err());
    }

    #[test]
    fn negative_period_rejected() {
        assert!(parse("[volume_spikes]\nperiod = -5\n").is_err());
    }

    #[test]
    fn malformed_color_rejected() {
        assert!(parse("[imbalance]\ngap_up_color = \"green\"\n").is_err());
    }

    #[test]
    fn opacity_out_of_bounds_rejected() {
        assert!(parse("[imbalance]\ngap_up_opacity = 150\n").is_err());
    }

    #[test]
    fn z_index_above_max_rejected() {
        assert!(parse("[imbalance]\nz_index = 25\n").is_err());
    }

    #[test]
    fn unknown_log_format_rejected() {
        assert!(parse("[general]\nlog_format = \"xml\"\n").is_err());
    }

    #[test]
    fn missing_file_reports_read_error() {
        let err = load(Path::new("/nonexistent/bar-studies.toml")).unwrap_err();
        assert!(matches!(err.current_context(), ConfigError::ReadFile));
    }
}
