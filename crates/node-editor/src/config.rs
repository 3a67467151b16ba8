//! Editor configuration storage
//!
//! Handles default widget ranges and the layout metrics used to size
//! schema-built nodes. Every field has a default so partial files load.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;

use crate::types::Size;

/// File name of the persisted configuration inside the config directory
pub const CONFIG_FILE: &str = "editor.json";

/// Defaults applied by inline controls when a schema leaves a value open
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetDefaults {
    pub int_min: f64,
    pub int_max: f64,
    pub int_step: f64,
    pub float_min: f64,
    pub float_max: f64,
    pub float_step: f64,
    /// Largest value a seed control accepts
    pub seed_max: f64,
    /// Minimum node size requested by a multiline text control
    pub text_area_min: Size,
    /// Smallest width a choice control asks for
    pub choice_min_width: f32,
    pub choice_min_height: f32,
    /// Horizontal space per character of the longest choice label
    pub choice_char_width: f32,
    /// Room for the control's arrows and label next to the value
    pub choice_padding: f32,
}

impl Default for WidgetDefaults {
    fn default() -> Self {
        Self {
            int_min: 0.0,
            int_max: 2048.0,
            int_step: 1.0,
            float_min: 0.0,
            float_max: 2048.0,
            float_step: 0.01,
            seed_max: u64::MAX as f64,
            text_area_min: Size::new(400.0, 200.0),
            choice_min_width: 120.0,
            choice_min_height: 1.0,
            choice_char_width: 8.4,
            choice_padding: 60.0,
        }
    }
}

/// Metrics used to compute a node's natural size from its sockets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutMetrics {
    pub slot_height: f32,
    pub widget_height: f32,
    pub widget_spacing: f32,
    pub font_size: f32,
    /// Average glyph width as a fraction of the font size
    pub char_width_ratio: f32,
    pub title_padding: f32,
    /// Gap between the input and output label columns
    pub slot_padding: f32,
    pub bottom_padding: f32,
    pub min_node_width: f32,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            slot_height: 20.0,
            widget_height: 20.0,
            widget_spacing: 4.0,
            font_size: 14.0,
            char_width_ratio: 0.6,
            title_padding: 40.0,
            slot_padding: 10.0,
            bottom_padding: 6.0,
            min_node_width: 140.0,
        }
    }
}

impl LayoutMetrics {
    /// Approximate rendered width of a label
    pub fn text_width(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.font_size * self.char_width_ratio
    }
}

/// Full editor configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default)]
    pub widgets: WidgetDefaults,
    #[serde(default)]
    pub layout: LayoutMetrics,
}

impl EditorConfig {
    /// Load configuration from disk, falling back to defaults when absent
    pub async fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if !fs::try_exists(&config_path).await.map_err(ConfigError::Io)? {
            log::debug!("No editor config at {:?}, using defaults", config_path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .await
            .map_err(ConfigError::Io)?;

        serde_json::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save configuration to disk
    pub async fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        fs::create_dir_all(config_dir).await.map_err(ConfigError::Io)?;

        let config_path = config_dir.join(CONFIG_FILE);
        let contents = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        fs::write(&config_path, contents).await.map_err(ConfigError::Io)?;

        log::info!("Editor configuration saved to {:?}", config_path);
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(serde_json::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(serde_json::Error),
}
