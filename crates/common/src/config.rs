//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::clock::frame_period;
use crate::error::{FramemixError, FramemixResult};

/// Global framemix configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FramemixConfig {
    /// Default output stream settings.
    pub output: OutputDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default parameters of the composited output stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputDefaults {
    /// Output width in pixels.
    pub width: u32,

    /// Output height in pixels.
    pub height: u32,

    /// Render loop rate (frames per second).
    pub fps: u32,

    /// Delay before the surface is blanked once the last visual source
    /// has been removed.
    pub idle_clear_delay_ms: u64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "framemix_render_engine=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for OutputDefaults {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 40,
            idle_clear_delay_ms: 100,
        }
    }
}

impl OutputDefaults {
    /// Interval between two render ticks.
    pub fn frame_period(&self) -> Duration {
        frame_period(self.fps)
    }

    /// Delay before an emptied surface is cleared.
    pub fn idle_clear_delay(&self) -> Duration {
        Duration::from_millis(self.idle_clear_delay_ms)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl FramemixConfig {
    /// `$XDG_CONFIG_HOME/framemix/config.json`, or `~/.config/...` when
    /// the variable is unset.
    pub fn default_path() -> PathBuf {
        resolve_config_path(
            std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
            std::env::var_os("HOME").map(PathBuf::from),
        )
    }

    /// Read a config file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> FramemixResult<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&content).map_err(|e| {
            FramemixError::config(format!("invalid config at {}: {e}", path.display()))
        })
    }

    /// Load from [`FramemixConfig::default_path`]. Unreadable or invalid
    /// files are logged and replaced by the defaults.
    pub fn load() -> Self {
        let path = Self::default_path();
        Self::load_from(&path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "Using default configuration");
            Self::default()
        })
    }

    /// Write pretty JSON to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> FramemixResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        tracing::debug!(path = %path.display(), "Configuration saved");
        Ok(())
    }

    /// Write to [`FramemixConfig::default_path`].
    pub fn save(&self) -> FramemixResult<()> {
        self.save_to(&Self::default_path())
    }
}

fn resolve_config_path(xdg_config_home: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    let base = xdg_config_home
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| home.unwrap_or_else(std::env::temp_dir).join(".config"));
    base.join("framemix").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_full_hd_at_forty_fps() {
        let config = FramemixConfig::default();
        assert_eq!(config.output.width, 1920);
        assert_eq!(config.output.height, 1080);
        assert_eq!(config.output.fps, 40);
        assert_eq!(config.output.frame_period(), Duration::from_millis(25));
        assert_eq!(config.output.idle_clear_delay(), Duration::from_millis(100));
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let config: FramemixConfig =
            serde_json::from_str(r#"{ "output": { "fps": 30 } }"#).unwrap();
        assert_eq!(config.output.fps, 30);
        assert_eq!(config.output.width, 1920);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("framemix").join("config.json");

        let mut config = FramemixConfig::default();
        config.output.width = 1280;
        config.output.height = 720;
        config.logging.json = true;
        config.save_to(&path).unwrap();

        let loaded = FramemixConfig::load_from(&path).unwrap();
        assert_eq!(loaded.output.width, 1280);
        assert_eq!(loaded.output.height, 720);
        assert!(loaded.logging.json);
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = FramemixConfig::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.output.fps, 40);
    }

    #[test]
    fn invalid_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            FramemixConfig::load_from(&path),
            Err(FramemixError::Config { .. })
        ));
    }

    #[test]
    fn config_path_prefers_xdg() {
        let path = resolve_config_path(Some("/xdg".into()), Some("/home/me".into()));
        assert_eq!(path, PathBuf::from("/xdg/framemix/config.json"));

        let path = resolve_config_path(None, Some("/home/me".into()));
        assert_eq!(path, PathBuf::from("/home/me/.config/framemix/config.json"));

        let path = resolve_config_path(Some(PathBuf::new()), Some("/home/me".into()));
        assert_eq!(path, PathBuf::from("/home/me/.config/framemix/config.json"));
    }
}
