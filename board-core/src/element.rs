//! Board elements - the persisted building blocks of a vision board.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum width and height of any element, in canvas pixels.
pub const MIN_ELEMENT_SIZE: f32 = 50.0;

/// Unique identifier for an element, assigned by the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(Uuid);

impl ElementId {
    /// Create a new random element ID.
    ///
    /// Only repositories should mint IDs; the editor never invents them.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ElementId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Identifier of the board (cocreation) that owns a set of elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardId(String);

impl BoardId {
    /// Wrap a board identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if the identifier is empty or whitespace only.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BoardId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// The content an element displays, discriminated by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ElementKind {
    /// A photo or picture, rendered to cover its box.
    Image {
        /// Remote or local image reference.
        uri: String,
    },

    /// A text label.
    Text {
        /// Text content.
        content: String,
        /// Font size in pixels.
        font_size: f32,
        /// Text color as hex.
        color: String,
    },

    /// A single emoji glyph.
    Emoji {
        /// The glyph.
        #[serde(rename = "char")]
        glyph: String,
        /// Font size in pixels.
        font_size: f32,
    },

    /// A sticker image, rendered contained within its box.
    Sticker {
        /// Sticker image reference.
        uri: String,
    },
}

impl ElementKind {
    /// The `type` discriminator used on the wire.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Image { .. } => "image",
            Self::Text { .. } => "text",
            Self::Emoji { .. } => "emoji",
            Self::Sticker { .. } => "sticker",
        }
    }

    /// Default box size for freshly added content.
    #[must_use]
    pub const fn default_size(&self) -> (f32, f32) {
        match self {
            Self::Image { .. } => (200.0, 200.0),
            Self::Text { .. } => (200.0, 80.0),
            Self::Emoji { .. } => (80.0, 80.0),
            Self::Sticker { .. } => (120.0, 120.0),
        }
    }
}

/// Position, size and rotation of an element in canvas space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    /// Left edge (pixels).
    pub x: f32,
    /// Top edge (pixels).
    pub y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Rotation in radians, about the box center.
    pub rotation: f32,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 100.0,
            height: 100.0,
            rotation: 0.0,
        }
    }
}

impl Geometry {
    /// Center of the box.
    #[must_use]
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Map a canvas point into the box's unrotated frame, relative to its
    /// top-left corner.
    #[must_use]
    pub fn to_local(&self, px: f32, py: f32) -> (f32, f32) {
        let (cx, cy) = self.center();
        let (sin, cos) = (-self.rotation).sin_cos();
        let (dx, dy) = (px - cx, py - cy);
        let lx = dx * cos - dy * sin;
        let ly = dx * sin + dy * cos;
        (lx + self.width / 2.0, ly + self.height / 2.0)
    }

    /// Check if a canvas point falls within the rotated box.
    #[must_use]
    pub fn contains_point(&self, px: f32, py: f32) -> bool {
        let (lx, ly) = self.to_local(px, py);
        lx >= 0.0 && lx <= self.width && ly >= 0.0 && ly <= self.height
    }

    /// Check if a canvas point falls within the square resize handle at the
    /// bottom-right corner of the rotated box.
    #[must_use]
    pub fn handle_contains_point(&self, px: f32, py: f32, handle_size: f32) -> bool {
        let (lx, ly) = self.to_local(px, py);
        let half = handle_size / 2.0;
        (lx - self.width).abs() <= half && (ly - self.height).abs() <= half
    }
}

/// A persisted board element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardElement {
    /// Stable identifier, assigned on creation.
    pub id: ElementId,
    /// Owning board.
    pub board_id: BoardId,
    /// Left edge (pixels).
    pub position_x: f32,
    /// Top edge (pixels).
    pub position_y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Rotation in radians.
    pub rotation: f32,
    /// Paint order; higher paints on top.
    pub z_index: i32,
    /// Creation timestamp, assigned on creation.
    pub created_at: DateTime<Utc>,
    /// Element content.
    #[serde(flatten)]
    pub kind: ElementKind,
}

impl BoardElement {
    /// The element's geometry.
    #[must_use]
    pub fn geometry(&self) -> Geometry {
        Geometry {
            x: self.position_x,
            y: self.position_y,
            width: self.width,
            height: self.height,
            rotation: self.rotation,
        }
    }

    /// Apply a partial update in place. `id`, `board_id` and `created_at`
    /// are never touched.
    pub fn apply_patch(&mut self, patch: &ElementPatch) {
        if let Some(x) = patch.position_x {
            self.position_x = x;
        }
        if let Some(y) = patch.position_y {
            self.position_y = y;
        }
        if let Some(width) = patch.width {
            self.width = width;
        }
        if let Some(height) = patch.height {
            self.height = height;
        }
        if let Some(rotation) = patch.rotation {
            self.rotation = rotation;
        }
        if let Some(z_index) = patch.z_index {
            self.z_index = z_index;
        }
    }
}

/// Content the user wants to add, before the board and z-order are known.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDraft {
    /// Left edge (pixels).
    pub position_x: f32,
    /// Top edge (pixels).
    pub position_y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Rotation in radians.
    pub rotation: f32,
    /// Explicit paint order. `None` stacks the element above everything else.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
    /// Element content.
    #[serde(flatten)]
    pub kind: ElementKind,
}

impl ElementDraft {
    /// Create a draft at the origin with the content's default size.
    #[must_use]
    pub fn new(kind: ElementKind) -> Self {
        let (width, height) = kind.default_size();
        Self {
            position_x: 0.0,
            position_y: 0.0,
            width,
            height,
            rotation: 0.0,
            z_index: None,
            kind,
        }
    }

    /// Set the position.
    #[must_use]
    pub fn at(mut self, x: f32, y: f32) -> Self {
        self.position_x = x;
        self.position_y = y;
        self
    }

    /// Set the size.
    #[must_use]
    pub fn with_size(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the rotation.
    #[must_use]
    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    /// Pin the paint order.
    #[must_use]
    pub fn with_z_index(mut self, z_index: i32) -> Self {
        self.z_index = Some(z_index);
        self
    }

    /// Merge with the owning board and resolved paint order.
    #[must_use]
    pub fn into_new(self, board_id: BoardId, z_index: i32) -> NewElement {
        NewElement {
            board_id,
            position_x: self.position_x,
            position_y: self.position_y,
            width: self.width,
            height: self.height,
            rotation: self.rotation,
            z_index: self.z_index.unwrap_or(z_index),
            kind: self.kind,
        }
    }
}

/// The create payload: a board element without `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewElement {
    /// Owning board.
    pub board_id: BoardId,
    /// Left edge (pixels).
    pub position_x: f32,
    /// Top edge (pixels).
    pub position_y: f32,
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
    /// Rotation in radians.
    pub rotation: f32,
    /// Paint order.
    pub z_index: i32,
    /// Element content.
    #[serde(flatten)]
    pub kind: ElementKind,
}

impl NewElement {
    /// Attach server-assigned identity, producing the canonical record.
    #[must_use]
    pub fn into_element(self, id: ElementId, created_at: DateTime<Utc>) -> BoardElement {
        BoardElement {
            id,
            board_id: self.board_id,
            position_x: self.position_x,
            position_y: self.position_y,
            width: self.width,
            height: self.height,
            rotation: self.rotation,
            z_index: self.z_index,
            created_at,
            kind: self.kind,
        }
    }
}

/// A partial update carrying only the fields that changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementPatch {
    /// New left edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_x: Option<f32>,
    /// New top edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_y: Option<f32>,
    /// New width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    /// New height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    /// New rotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f32>,
    /// New paint order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i32>,
}

impl ElementPatch {
    /// True if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.position_x.is_none()
            && self.position_y.is_none()
            && self.width.is_none()
            && self.height.is_none()
            && self.rotation.is_none()
            && self.z_index.is_none()
    }

    /// Patch that moves an element.
    #[must_use]
    pub fn position(x: f32, y: f32) -> Self {
        Self {
            position_x: Some(x),
            position_y: Some(y),
            ..Self::default()
        }
    }

    /// Patch that resizes an element.
    #[must_use]
    pub fn size(width: f32, height: f32) -> Self {
        Self {
            width: Some(width),
            height: Some(height),
            ..Self::default()
        }
    }

    /// Patch that rotates an element.
    #[must_use]
    pub fn rotation(rotation: f32) -> Self {
        Self {
            rotation: Some(rotation),
            ..Self::default()
        }
    }

    /// Patch that restacks an element.
    #[must_use]
    pub fn z_index(z_index: i32) -> Self {
        Self {
            z_index: Some(z_index),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_element() -> BoardElement {
        ElementDraft::new(ElementKind::Text {
            content: "Abundance".to_string(),
            font_size: 24.0,
            color: "#222222".to_string(),
        })
        .at(10.0, 20.0)
        .into_new(BoardId::new("board-1"), 3)
        .into_element(ElementId::new(), Utc::now())
    }

    #[test]
    fn test_element_wire_format_is_flat_and_tagged() {
        let element = text_element();
        let json = serde_json::to_value(&element).expect("serialize");

        assert_eq!(json["type"], "text");
        assert_eq!(json["content"], "Abundance");
        assert_eq!(json["board_id"], "board-1");
        assert_eq!(json["z_index"], 3);

        let back: BoardElement = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back, element);
    }

    #[test]
    fn test_emoji_glyph_uses_char_on_the_wire() {
        let kind = ElementKind::Emoji {
            glyph: "✨".to_string(),
            font_size: 48.0,
        };
        let json = serde_json::to_value(&kind).expect("serialize");
        assert_eq!(json["type"], "emoji");
        assert_eq!(json["char"], "✨");
    }

    #[test]
    fn test_row_with_null_columns_of_other_variants_decodes() {
        let json = serde_json::json!({
            "id": "6f1c1f3e-8a55-4d8e-9d55-3a4f3f1b2c11",
            "board_id": "b",
            "type": "image",
            "uri": "https://cdn.example/photo.jpg",
            "content": null,
            "font_size": null,
            "char": null,
            "position_x": 1.0,
            "position_y": 2.0,
            "width": 120.0,
            "height": 90.0,
            "rotation": 0.0,
            "z_index": 0,
            "created_at": "2024-05-01T10:00:00Z"
        });
        let element: BoardElement = serde_json::from_value(json).expect("deserialize");
        assert!(matches!(element.kind, ElementKind::Image { .. }));
    }

    #[test]
    fn test_patch_skips_unset_fields() {
        let json = serde_json::to_value(ElementPatch::rotation(1.5)).expect("serialize");
        assert_eq!(json, serde_json::json!({ "rotation": 1.5 }));
        assert!(ElementPatch::default().is_empty());
    }

    #[test]
    fn test_apply_patch_leaves_other_fields() {
        let mut element = text_element();
        let before = element.clone();
        element.apply_patch(&ElementPatch::rotation(0.75));

        assert!((element.rotation - 0.75).abs() < f32::EPSILON);
        assert_eq!(element.id, before.id);
        assert_eq!(element.position_x, before.position_x);
        assert_eq!(element.width, before.width);
        assert_eq!(element.created_at, before.created_at);
    }

    #[test]
    fn test_contains_point_respects_rotation() {
        let geometry = Geometry {
            x: 0.0,
            y: 0.0,
            width: 200.0,
            height: 20.0,
            rotation: std::f32::consts::FRAC_PI_2,
        };
        // Rotated a quarter turn the bar stands upright around (100, 10).
        assert!(geometry.contains_point(100.0, 80.0));
        assert!(!geometry.contains_point(180.0, 10.0));
    }

    #[test]
    fn test_handle_sits_at_bottom_right() {
        let geometry = Geometry {
            x: 10.0,
            y: 10.0,
            width: 100.0,
            height: 100.0,
            rotation: 0.0,
        };
        assert!(geometry.handle_contains_point(108.0, 112.0, 24.0));
        assert!(!geometry.handle_contains_point(60.0, 60.0, 24.0));
    }

    #[test]
    fn test_element_id_parses() {
        let id = ElementId::new();
        let parsed: ElementId = id.to_string().parse().expect("parse");
        assert_eq!(parsed, id);
    }
}
