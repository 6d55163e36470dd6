use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pdfnotes";

/// Accepted range for every pixel limit
pub const PIXEL_RANGE: std::ops::RangeInclusive<u32> = 1..=10_000;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse settings file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("{field} = {value} is outside 1..=10000")]
    OutOfRange { field: &'static str, value: u32 },
}

/// Where the host docks the viewer pane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaneSide {
    Left,
    #[default]
    Right,
    Top,
    Bottom,
}

impl PaneSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaneSide::Left => "left",
            PaneSide::Right => "right",
            PaneSide::Top => "top",
            PaneSide::Bottom => "bottom",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Max width of an extracted image in pixels
    #[serde(default = "default_image_limit")]
    pub image_max_width_px: u32,

    /// Max height of an extracted image in pixels
    #[serde(default = "default_image_limit")]
    pub image_max_height_px: u32,

    #[serde(default)]
    pub pane_side: PaneSide,

    /// Key combination toggling Line/Image mode; empty disables it
    #[serde(default = "default_switch_mode_shortcut")]
    pub switch_mode_shortcut: String,

    #[serde(default)]
    pub collapse_whitespace: bool,

    /// Display width cap for inserted images without a pinned scale
    #[serde(default = "default_insert_max_width")]
    pub insert_max_width_px: u32,
}

fn default_image_limit() -> u32 {
    1024
}

fn default_switch_mode_shortcut() -> String {
    "Control_R".to_string()
}

fn default_insert_max_width() -> u32 {
    700
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            image_max_width_px: default_image_limit(),
            image_max_height_px: default_image_limit(),
            pane_side: PaneSide::default(),
            switch_mode_shortcut: default_switch_mode_shortcut(),
            collapse_whitespace: false,
            insert_max_width_px: default_insert_max_width(),
        }
    }
}

impl Settings {
    /// Check that every pixel limit is within [`PIXEL_RANGE`].
    pub fn validate(&self) -> Result<(), SettingsError> {
        let fields = [
            ("image_max_width_px", self.image_max_width_px),
            ("image_max_height_px", self.image_max_height_px),
            ("insert_max_width_px", self.insert_max_width_px),
        ];
        for (field, value) in fields {
            if !PIXEL_RANGE.contains(&value) {
                return Err(SettingsError::OutOfRange { field, value });
            }
        }
        Ok(())
    }

    /// Whether the mode switch shortcut is configured at all.
    pub fn mode_switch_enabled(&self) -> bool {
        !self.switch_mode_shortcut.trim().is_empty()
    }
}

pub fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

/// Read and validate settings from `path`.
pub fn load_from_path(path: &Path) -> Result<Settings, SettingsError> {
    let content = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let settings: Settings =
        serde_yaml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    settings.validate()?;
    debug!("Loaded settings from {path:?}");
    Ok(settings)
}

/// Settings from `path` (or the default location), falling back to defaults.
///
/// A missing file at the default location is created with the defaults.
pub fn load_or_default(path: Option<&Path>) -> Settings {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let Some(path) = preferred_config_path() else {
                warn!("Could not determine config directory, using default settings");
                return Settings::default();
            };
            if !path.exists() {
                info!("Settings file not found, creating with defaults at {path:?}");
                save_to_path(&Settings::default(), &path);
                return Settings::default();
            }
            path
        }
    };

    match load_from_path(&path) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{e}; using default settings");
            Settings::default()
        }
    }
}

pub fn save_to_path(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let content = match serde_yaml::to_string(settings) {
        Ok(content) => content,
        Err(e) => {
            error!("Failed to serialize settings: {e}");
            return;
        }
    };

    match fs::write(path, content) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}
