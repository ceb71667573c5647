//! Tunables for the transform engine.

use serde::{Deserialize, Serialize};

use crate::element::MIN_ELEMENT_SIZE;
use crate::spring::SpringConfig;

/// Default edge length of the square resize handle, in pixels.
pub const DEFAULT_HANDLE_SIZE: f32 = 24.0;

/// Configuration shared by every transform engine on a board.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Floor applied to width and height while resizing.
    pub min_size: f32,
    /// Distance a drag must travel before pan or resize activates.
    pub activation_slop: f32,
    /// Edge length of the resize handle hit area.
    pub handle_size: f32,
    /// Spring used when settling released gestures.
    pub spring: SpringConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_size: MIN_ELEMENT_SIZE,
            activation_slop: 0.0,
            handle_size: DEFAULT_HANDLE_SIZE,
            spring: SpringConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Set the drag activation distance.
    #[must_use]
    pub fn with_activation_slop(mut self, slop: f32) -> Self {
        self.activation_slop = slop.max(0.0);
        self
    }

    /// Set the settle spring.
    #[must_use]
    pub fn with_spring(mut self, spring: SpringConfig) -> Self {
        self.spring = spring;
        self
    }

    /// Set the resize handle size.
    #[must_use]
    pub fn with_handle_size(mut self, handle_size: f32) -> Self {
        self.handle_size = handle_size;
        self
    }

    /// The effective size floor; never below [`MIN_ELEMENT_SIZE`].
    #[must_use]
    pub fn size_floor(&self) -> f32 {
        self.min_size.max(MIN_ELEMENT_SIZE)
    }
}
