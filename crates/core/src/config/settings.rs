use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::infrastructure::onnx_blazeface_detector::DEFAULT_CONFIDENCE;
use crate::emotion::domain::backend::{Backend, ParseBackendError};
use crate::shared::constants::{APP_DIR_NAME, DEFAULT_HISTORY_ROWS, DEFAULT_LOG_PATH};

/// Default DeepFace service endpoint (`deepface` API server default port).
pub const DEFAULT_DEEPFACE_URL: &str = "http://127.0.0.1:5005";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid value for {key}: {source}")]
    InvalidBackend {
        key: String,
        #[source]
        source: ParseBackendError,
    },
}

/// Persistent user settings, overridden by environment variables and then
/// by command-line flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// `None` means probe for the best available backend.
    pub backend: Option<Backend>,
    pub deepface_url: Option<String>,
    pub disable_deepface: bool,
    pub model_dir: Option<PathBuf>,
    pub face_confidence: f64,
    pub request_timeout_secs: u64,
    pub history_rows: usize,
    pub log_path: PathBuf,
    pub camera_device: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: None,
            deepface_url: Some(DEFAULT_DEEPFACE_URL.to_string()),
            disable_deepface: false,
            model_dir: None,
            face_confidence: DEFAULT_CONFIDENCE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            history_rows: DEFAULT_HISTORY_ROWS,
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            camera_device: None,
        }
    }
}

/// Parses `auto` (probe) or a backend id.
pub fn parse_backend_preference(value: &str) -> Result<Option<Backend>, ParseBackendError> {
    if value.trim().eq_ignore_ascii_case("auto") {
        Ok(None)
    } else {
        value.parse().map(Some)
    }
}

/// Environment flags count as set for `1`, `true`, `yes` or `on`.
fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR_NAME).join("settings.json"))
    }

    /// Settings from the user config file, defaults if missing or unreadable.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(json) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str(&json) {
            Ok(settings) => settings,
            Err(e) => {
                log::warn!("Ignoring unreadable settings file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self) -> Result<PathBuf, SettingsError> {
        let path = Self::config_path().ok_or(SettingsError::NoConfigDir)?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        let write_err = |source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, self.to_json()?).map_err(write_err)
    }

    /// Pretty-printed JSON, as stored in the settings file.
    pub fn to_json(&self) -> Result<String, SettingsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// Recognised: `DISABLE_DEEPFACE`, `MOODMIRROR_BACKEND` (`auto` or a
    /// backend id), `DEEPFACE_URL` (empty disables the service),
    /// `MOODMIRROR_MODEL_DIR`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("DISABLE_DEEPFACE") {
            self.disable_deepface = is_truthy(&value);
        }
        if let Some(value) = lookup("MOODMIRROR_BACKEND") {
            self.backend =
                parse_backend_preference(&value).map_err(|source| SettingsError::InvalidBackend {
                    key: "MOODMIRROR_BACKEND".to_string(),
                    source,
                })?;
        }
        if let Some(value) = lookup("DEEPFACE_URL") {
            let value = value.trim();
            self.deepface_url = (!value.is_empty()).then(|| value.to_string());
        }
        if let Some(value) = lookup("MOODMIRROR_MODEL_DIR") {
            if !value.trim().is_empty() {
                self.model_dir = Some(PathBuf::from(value.trim()));
            }
        }
        Ok(())
    }

    pub fn apply_process_env(&mut self) -> Result<(), SettingsError> {
        self.apply_env(|key| std::env::var(key).ok())
    }
}
