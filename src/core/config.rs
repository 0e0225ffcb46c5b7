/// Stage configuration — viewport geometry, margin fill and calendar slots.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::schema::calendar::SlotTable;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba {
        r: 0,
        g: 0,
        b: 0,
        a: 255,
    };
}

/// Engine-wide settings. Every field has a default, so a config file only
/// needs to list what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Actual viewport size in pixels.
    pub viewport: (f64, f64),
    /// Authoring resolution that pan limits are expressed in.
    pub virtual_extent: (f64, f64),
    /// Fill for the margin a zoomed-out background reveals.
    pub fallback_color: Rgba,
    pub slots: SlotTable,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            viewport: (1280.0, 720.0),
            virtual_extent: (1920.0, 1080.0),
            fallback_color: Rgba::BLACK,
            slots: SlotTable::default(),
        }
    }
}

impl StageConfig {
    pub fn parse_ron(input: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(input)?)
    }

    pub fn load_from_ron(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Viewport pixels per virtual pixel, per axis. A non-positive virtual
    /// extent scales 1:1.
    pub fn viewport_scale(&self) -> (f64, f64) {
        let axis = |view: f64, virt: f64| if virt > 0.0 { view / virt } else { 1.0 };
        (
            axis(self.viewport.0, self.virtual_extent.0),
            axis(self.viewport.1, self.virtual_extent.1),
        )
    }
}
