//! Touch input for board interaction.

use serde::{Deserialize, Serialize};

use crate::ElementId;

/// Phase of a touch event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchPhase {
    /// A finger went down.
    Start,
    /// One or more fingers moved.
    Move,
    /// A finger lifted.
    End,
    /// The system took the touches away (e.g., an incoming call).
    Cancel,
}

/// A single touch point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    /// Touch identifier (stable for the lifetime of one finger contact).
    pub id: u32,
    /// X position in canvas coordinates.
    pub x: f32,
    /// Y position in canvas coordinates.
    pub y: f32,
}

impl TouchPoint {
    /// Create a touch point.
    #[must_use]
    pub const fn new(id: u32, x: f32, y: f32) -> Self {
        Self { id, x, y }
    }
}

/// Which part of an element a touch landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementPart {
    /// The element's content box.
    Body,
    /// The resize handle shown on the selected element.
    ResizeHandle,
}

/// Hit-test result attached to a touch by the host view, if it did one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchTarget {
    /// The element touched.
    pub element: ElementId,
    /// The part of the element touched.
    pub part: ElementPart,
}

/// A touch event.
///
/// `touches` lists every finger still in contact *after* the event, so an
/// `End` whose `touches` is empty means the last finger lifted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchEvent {
    /// Phase of this touch event.
    pub phase: TouchPhase,
    /// All current touch points.
    pub touches: Vec<TouchPoint>,
    /// Timestamp in milliseconds since the session started.
    pub timestamp_ms: u64,
    /// Element the host view resolved the touch to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TouchTarget>,
}

impl TouchEvent {
    /// Create a new touch event.
    #[must_use]
    pub fn new(phase: TouchPhase, touches: Vec<TouchPoint>, timestamp_ms: u64) -> Self {
        Self {
            phase,
            touches,
            timestamp_ms,
            target: None,
        }
    }

    /// Attach a resolved target.
    #[must_use]
    pub fn with_target(mut self, element: ElementId, part: ElementPart) -> Self {
        self.target = Some(TouchTarget { element, part });
        self
    }

    /// Get the primary (first) touch point.
    #[must_use]
    pub fn primary_touch(&self) -> Option<&TouchPoint> {
        self.touches.first()
    }

    /// Look up a touch point by id.
    #[must_use]
    pub fn touch(&self, id: u32) -> Option<&TouchPoint> {
        self.touches.iter().find(|t| t.id == id)
    }

    /// Average position of all active touches.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // finger counts are tiny
    pub fn centroid(&self) -> Option<(f32, f32)> {
        if self.touches.is_empty() {
            return None;
        }
        let n = self.touches.len() as f32;
        let (sx, sy) = self
            .touches
            .iter()
            .fold((0.0, 0.0), |(ax, ay), t| (ax + t.x, ay + t.y));
        Some((sx / n, sy / n))
    }

    /// Check if this is a multi-touch event.
    #[must_use]
    pub fn is_multi_touch(&self) -> bool {
        self.touches.len() > 1
    }

    /// True once every finger has lifted or the sequence was cancelled.
    #[must_use]
    pub fn ends_sequence(&self) -> bool {
        match self.phase {
            TouchPhase::Cancel => true,
            TouchPhase::End => self.touches.is_empty(),
            TouchPhase::Start | TouchPhase::Move => false,
        }
    }
}
