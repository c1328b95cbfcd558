// Editor tunables. Everything has a default so a missing or partial
// config file is fine; a file that exists but is malformed is an error.
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("could not parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub max_regions: usize,
    pub min_region_seconds: f64,
    pub history_limit: usize,
    pub max_zoom: f64,
    pub zoom_step: f64,
    pub pan_fraction: f64,
    pub export_gap_seconds: f64,
    pub export_pause_ms: u64,
    pub entitlement_refresh_secs: u64,
    pub free_export_limit: u32,
    pub reverb_seed: u64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_regions: 10, // one per number key
            min_region_seconds: 0.01,
            history_limit: 50,
            max_zoom: 20.0,
            zoom_step: 1.0,
            pan_fraction: 0.1,
            export_gap_seconds: 0.5,
            export_pause_ms: 100,
            entitlement_refresh_secs: 300,
            free_export_limit: 3,
            reverb_seed: 0x5A4D_504C_5852,
        }
    }
}

impl EditorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_regions == 0 {
            return Err(invalid("max_regions", "must be at least 1"));
        }
        if !(self.min_region_seconds > 0.0) {
            return Err(invalid("min_region_seconds", "must be positive"));
        }
        if self.history_limit == 0 {
            return Err(invalid("history_limit", "must be at least 1"));
        }
        if !(self.max_zoom >= 1.0) {
            return Err(invalid("max_zoom", "must be >= 1"));
        }
        if !(self.zoom_step > 0.0) {
            return Err(invalid("zoom_step", "must be positive"));
        }
        if !(self.pan_fraction > 0.0 && self.pan_fraction <= 1.0) {
            return Err(invalid("pan_fraction", "must be in (0, 1]"));
        }
        if !(self.export_gap_seconds >= 0.0) {
            return Err(invalid("export_gap_seconds", "must not be negative"));
        }
        Ok(())
    }

    pub fn export_pause(&self) -> Duration {
        Duration::from_millis(self.export_pause_ms)
    }

    pub fn entitlement_refresh(&self) -> Duration {
        Duration::from_secs(self.entitlement_refresh_secs)
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samplx.json");
        std::fs::write(&path, r#"{ "max_regions": 4, "export_pause_ms": 0 }"#).unwrap();

        let config = EditorConfig::load(&path).unwrap();
        assert_eq!(config.max_regions, 4);
        assert_eq!(config.export_pause(), Duration::ZERO);
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.export_gap_seconds, 0.5);
    }

    #[test]
    fn rejects_zoom_below_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samplx.json");
        std::fs::write(&path, r#"{ "max_zoom": 0.5 }"#).unwrap();

        let err = EditorConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "max_zoom", .. }));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = EditorConfig::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
