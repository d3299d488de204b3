//! Engine tunables
//!
//! Defaults come from [`crate::consts`]. A JSON file can override any subset
//! of fields; missing fields keep their defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::{Error, Result};

/// Ray caster and input tunables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    // === Ray marching ===
    /// Distance advanced per step
    pub step_size: f32,
    /// Reflection depth ceiling
    pub max_depth: u32,
    /// Step ceiling per ray segment
    pub max_steps: u32,
    /// Offset of a reflected ray origin along its new direction
    pub reflect_offset: f32,

    // === Obstacles ===
    /// Crystal capture radius
    pub crystal_capture_radius: f32,
    /// Distance a ray skips past a lit crystal
    pub crystal_clearance: f32,

    // === Input ===
    /// Mirror pick radius for mouse input
    pub pick_radius: f32,
    /// Mirror pick radius for touch input
    pub touch_pick_radius: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            step_size: STEP_SIZE,
            max_depth: MAX_DEPTH,
            max_steps: MAX_STEPS,
            reflect_offset: REFLECT_OFFSET,

            crystal_capture_radius: CRYSTAL_CAPTURE_RADIUS,
            crystal_clearance: CRYSTAL_CLEARANCE,

            pick_radius: PICK_RADIUS,
            touch_pick_radius: TOUCH_PICK_RADIUS,
        }
    }
}

impl EngineConfig {
    /// Parse a config from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::json("config", e))
    }

    /// Read and parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json(&json)
    }

    /// Load a config file if given, falling back to defaults on any failure
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            log::info!("Using default engine config");
            return Self::default();
        };

        match Self::load(path) {
            Ok(config) => {
                log::info!("Loaded engine config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("{e}; using default engine config");
                Self::default()
            }
        }
    }

    /// Hit lookahead window (two steps)
    #[inline]
    pub fn lookahead(&self) -> f32 {
        self.step_size * 2.0
    }

    /// Pick radius for the given input precision
    pub fn pick_radius_for(&self, touch: bool) -> f32 {
        if touch {
            self.touch_pick_radius
        } else {
            self.pick_radius
        }
    }
}
