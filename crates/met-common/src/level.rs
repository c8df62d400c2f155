//! Vertical level descriptors.

use serde::{Deserialize, Serialize};

/// Vertical level of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelDescriptor {
    /// Single-level surface or screen field.
    Surface,
    /// Model level number (0 is the spliced screen level of a profile).
    ModelLevel(u32),
}

impl LevelDescriptor {
    pub fn model_level_number(&self) -> Option<u32> {
        match self {
            LevelDescriptor::Surface => None,
            LevelDescriptor::ModelLevel(n) => Some(*n),
        }
    }
}

impl std::fmt::Display for LevelDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LevelDescriptor::Surface => write!(f, "surface"),
            LevelDescriptor::ModelLevel(n) => write!(f, "model_level_{}", n),
        }
    }
}

/// A value on one level, with its height above ground in feet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelValue {
    pub level: LevelDescriptor,
    pub height_agl_ft: f64,
    pub value: f64,
}

impl LevelValue {
    pub fn new(level: LevelDescriptor, height_agl_ft: f64, value: f64) -> Self {
        Self {
            level,
            height_agl_ft,
            value,
        }
    }
}
