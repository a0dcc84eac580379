use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Global configuration loaded from `~/.config/fdm/config.toml`.
///
/// Holds the default transport timeouts applied when an operator is
/// constructed without explicit values; a resume request can override
/// them per operator at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FdmConfig {
    /// Default per-request timeout in seconds for the next transport attempt.
    pub default_request_timeout_secs: u64,
    /// Default whole-resource timeout in seconds (covers the full transfer).
    pub default_resource_timeout_secs: u64,
    /// Optional cap on queued callback dispatches per executor (None = unbounded). Reserved.
    #[serde(default)]
    pub max_pending_callbacks: Option<usize>,
}

impl Default for FdmConfig {
    fn default() -> Self {
        Self {
            default_request_timeout_secs: 60,
            default_resource_timeout_secs: 3600,
            max_pending_callbacks: None,
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("fdm")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<FdmConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = FdmConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: FdmConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = FdmConfig::default();
        assert_eq!(cfg.default_request_timeout_secs, 60);
        assert_eq!(cfg.default_resource_timeout_secs, 3600);
        assert!(cfg.max_pending_callbacks.is_none());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = FdmConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: FdmConfig = toml::from_str(&toml).unwrap();
        assert_eq!(
            parsed.default_request_timeout_secs,
            cfg.default_request_timeout_secs
        );
        assert_eq!(
            parsed.default_resource_timeout_secs,
            cfg.default_resource_timeout_secs
        );
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            default_request_timeout_secs = 30
            default_resource_timeout_secs = 60
            max_pending_callbacks = 128
        "#;
        let cfg: FdmConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.default_request_timeout_secs, 30);
        assert_eq!(cfg.default_resource_timeout_secs, 60);
        assert_eq!(cfg.max_pending_callbacks, Some(128));
    }
}
