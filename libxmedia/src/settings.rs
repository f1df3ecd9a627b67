use crate::errors::XmError;
use crate::naming::NamingStyle;
use crate::BatchRule;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const SETTINGS_FILE_NAME: &str = "settings.toml";

/// User preferences kept between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub naming_style: NamingStyle,
    pub download_dir: PathBuf,
    pub throttle_window_ms: u64,
    pub batch_pacing_ms: u64,
    pub tweet_pacing_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            naming_style: NamingStyle::default(),
            download_dir: PathBuf::from("downloads"),
            throttle_window_ms: 500,
            batch_pacing_ms: 1000,
            tweet_pacing_ms: 500,
        }
    }
}

impl Settings {
    /// `settings.toml` in the platform config directory.
    pub fn default_path() -> Result<PathBuf, XmError> {
        let dirs = ProjectDirs::from("com", "xmedia", "xmedia")
            .ok_or_else(|| XmError::Config("no home directory found".to_string()))?;
        Ok(dirs.config_dir().join(SETTINGS_FILE_NAME))
    }

    /// Reads settings from `path`. A missing file gives the defaults.
    pub fn load(path: &Path) -> Result<Self, XmError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(XmError::FileOperationError {
                    file_name: path.to_string_lossy().to_string(),
                    message: format!("{} | {}", e, e.kind()),
                })
            }
        };
        toml::from_str(&content).map_err(|e| XmError::Config(format!("{}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<(), XmError> {
        let content = toml::to_string(self).map_err(|e| XmError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| XmError::FileOperationError {
                file_name: parent.to_string_lossy().to_string(),
                message: format!("{} | {}", e, e.kind()),
            })?;
        }
        std::fs::write(path, content).map_err(|e| XmError::FileOperationError {
            file_name: path.to_string_lossy().to_string(),
            message: format!("{} | {}", e, e.kind()),
        })
    }

    pub fn batch_rule(&self) -> BatchRule {
        BatchRule {
            throttle_window: Duration::from_millis(self.throttle_window_ms),
            pacing_delay: Duration::from_millis(self.batch_pacing_ms),
        }
    }

    pub fn tweet_pacing(&self) -> Duration {
        Duration::from_millis(self.tweet_pacing_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load(&dir.path().join("settings.toml")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.naming_style, NamingStyle::DateOnly);
    }

    #[test]
    fn saved_style_survives_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.toml");
        let settings = Settings {
            naming_style: NamingStyle::DateTimeSeconds,
            ..Settings::default()
        };

        settings.save(&path).unwrap();

        assert_eq!(Settings::load(&path).unwrap(), settings);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(r#"naming_style = "date_time_seconds""#));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "batch_pacing_ms = 250\n").unwrap();

        let settings = Settings::load(&path).unwrap();

        assert_eq!(settings.batch_rule().pacing_delay, Duration::from_millis(250));
        assert_eq!(settings.throttle_window_ms, 500);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "naming_style = \"weekly\"\n").unwrap();

        assert!(matches!(Settings::load(&path), Err(XmError::Config(_))));
    }
}
