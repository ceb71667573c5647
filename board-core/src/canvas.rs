//! Board canvas: composes elements by paint order and routes touches.
//!
//! The canvas never owns canonical element records. It is handed a read-only
//! slice on every [`BoardCanvas::sync`] and [`BoardCanvas::render`], and keeps
//! one [`TransformEngine`] per element for transient geometry.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::element::{BoardElement, ElementId, ElementKind};
use crate::event::{ElementPart, TouchEvent, TouchPhase, TouchTarget};
use crate::selection::{SelectionController, TouchDisposition};
use crate::transform::{EmissionOutcome, RenderedGeometry, TransformDelta, TransformEngine};

/// Elements in paint order: ascending `z_index`, ties kept in list order.
#[must_use]
pub fn paint_order(elements: &[BoardElement]) -> Vec<&BoardElement> {
    let mut ordered: Vec<&BoardElement> = elements.iter().collect();
    // Stable sort preserves fetch order among equal z-indices.
    ordered.sort_by_key(|e| e.z_index);
    ordered
}

/// How image content is fitted to the element box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentFit {
    /// Fill the box, cropping overflow.
    Cover,
    /// Fit inside the box, letterboxing.
    Contain,
}

/// Per-type drawing instructions. Text and emoji are centered in the box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RenderContent {
    /// Photo.
    Image {
        /// Image reference.
        uri: String,
        /// Always [`ContentFit::Cover`].
        fit: ContentFit,
    },
    /// Text label.
    Text {
        /// Text.
        content: String,
        /// Font size.
        font_size: f32,
        /// Text color.
        color: String,
    },
    /// Emoji glyph.
    Emoji {
        /// Glyph.
        glyph: String,
        /// Font size.
        font_size: f32,
    },
    /// Sticker.
    Sticker {
        /// Image reference.
        uri: String,
        /// Always [`ContentFit::Contain`].
        fit: ContentFit,
    },
}

impl From<&ElementKind> for RenderContent {
    fn from(kind: &ElementKind) -> Self {
        match kind {
            ElementKind::Image { uri } => Self::Image {
                uri: uri.clone(),
                fit: ContentFit::Cover,
            },
            ElementKind::Text {
                content,
                font_size,
                color,
            } => Self::Text {
                content: content.clone(),
                font_size: *font_size,
                color: color.clone(),
            },
            ElementKind::Emoji { glyph, font_size } => Self::Emoji {
                glyph: glyph.clone(),
                font_size: *font_size,
            },
            ElementKind::Sticker { uri } => Self::Sticker {
                uri: uri.clone(),
                fit: ContentFit::Contain,
            },
        }
    }
}

/// One element, ready to draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderItem {
    /// Element drawn.
    pub id: ElementId,
    /// Paint order.
    pub z_index: i32,
    /// Geometry for this frame.
    pub geometry: RenderedGeometry,
    /// What to draw.
    pub content: RenderContent,
    /// Whether the element is selected.
    pub selected: bool,
    /// Whether to draw the resize handle.
    pub show_resize_handle: bool,
}

/// A completed interaction the store must persist.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Emission {
    /// The element transformed.
    pub element: ElementId,
    /// Changed fields only.
    pub delta: TransformDelta,
}

/// Result of routing one touch event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasResponse {
    /// Whether the scroll view may see the touch.
    pub disposition: TouchDisposition,
    /// A transform to persist, if the touch completed one.
    pub emission: Option<Emission>,
}

impl CanvasResponse {
    const fn pass_through() -> Self {
        Self {
            disposition: TouchDisposition::PassThrough,
            emission: None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct TouchSequence {
    element: ElementId,
    part: ElementPart,
    transforming: bool,
}

/// The board canvas.
#[derive(Debug)]
pub struct BoardCanvas {
    config: EngineConfig,
    engines: HashMap<ElementId, TransformEngine>,
    order: Vec<ElementId>,
    selection: SelectionController,
    sequence: Option<TouchSequence>,
}

impl Default for BoardCanvas {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl BoardCanvas {
    /// Create an empty canvas.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            engines: HashMap::new(),
            order: Vec::new(),
            selection: SelectionController::new(),
            sequence: None,
        }
    }

    /// Mount, unmount and reconcile engines against the canonical list.
    pub fn sync(&mut self, elements: &[BoardElement]) {
        self.engines
            .retain(|id, _| elements.iter().any(|e| e.id == *id));
        for element in elements {
            match self.engines.get_mut(&element.id) {
                Some(engine) => engine.reconcile(element),
                None => {
                    let mut engine = TransformEngine::new(element, self.config);
                    engine.set_selected(self.selection.is_selected(element.id));
                    tracing::trace!(element = %element.id, "Mounted transform engine");
                    self.engines.insert(element.id, engine);
                }
            }
        }
        self.order = paint_order(elements).into_iter().map(|e| e.id).collect();

        let engines = &self.engines;
        if let Some(dropped) = self.selection.retain(|id| engines.contains_key(&id)) {
            tracing::debug!(element = %dropped, "Selected element removed");
        }
        if let Some(seq) = self.sequence {
            if !self.engines.contains_key(&seq.element) {
                self.sequence = None;
            }
        }
    }

    /// Select an element. Returns false if it is not on the canvas.
    pub fn select(&mut self, id: ElementId) -> bool {
        if !self.engines.contains_key(&id) {
            return false;
        }
        if let Some(previous) = self.selection.select(id) {
            if let Some(engine) = self.engines.get_mut(&previous) {
                engine.set_selected(false);
            }
        }
        if let Some(engine) = self.engines.get_mut(&id) {
            engine.set_selected(true);
        }
        true
    }

    /// Clear the selection.
    pub fn clear_selection(&mut self) {
        if let Some(previous) = self.selection.clear() {
            if let Some(engine) = self.engines.get_mut(&previous) {
                engine.set_selected(false);
            }
        }
    }

    /// The selected element.
    #[must_use]
    pub fn selected(&self) -> Option<ElementId> {
        self.selection.selected()
    }

    /// The engine for an element.
    #[must_use]
    pub fn engine(&self, id: ElementId) -> Option<&TransformEngine> {
        self.engines.get(&id)
    }

    /// Element ids in paint order, bottom first.
    #[must_use]
    pub fn paint_order(&self) -> &[ElementId] {
        &self.order
    }

    /// True while a touch sequence is in progress.
    #[must_use]
    pub fn is_interacting(&self) -> bool {
        self.sequence.is_some()
    }

    /// Find the topmost element part under a canvas point.
    ///
    /// The selected element's resize handle wins over everything, since it
    /// is drawn as an overlay.
    #[must_use]
    pub fn hit_test(&self, x: f32, y: f32) -> Option<TouchTarget> {
        if let Some(selected) = self.selection.selected() {
            if let Some(engine) = self.engines.get(&selected) {
                if engine
                    .geometry()
                    .handle_contains_point(x, y, self.config.handle_size)
                {
                    return Some(TouchTarget {
                        element: selected,
                        part: ElementPart::ResizeHandle,
                    });
                }
            }
        }
        self.order.iter().rev().find_map(|id| {
            let engine = self.engines.get(id)?;
            engine.geometry().contains_point(x, y).then_some(TouchTarget {
                element: *id,
                part: ElementPart::Body,
            })
        })
    }

    /// Route a touch event.
    ///
    /// The first touch of a sequence on an unselected element only selects
    /// it. A sequence that starts on the selected element drives its
    /// gestures. A touch on empty canvas clears the selection and passes
    /// through to the scroll view.
    pub fn handle_touch(&mut self, event: &TouchEvent) -> CanvasResponse {
        if self.sequence.is_none() {
            if event.phase != TouchPhase::Start {
                return CanvasResponse::pass_through();
            }
            let target = event
                .target
                .filter(|t| self.engines.contains_key(&t.element))
                .or_else(|| {
                    event
                        .primary_touch()
                        .and_then(|p| self.hit_test(p.x, p.y))
                });
            let Some(target) = target else {
                self.clear_selection();
                return CanvasResponse::pass_through();
            };
            let was_selected = self.selection.is_selected(target.element);
            if !was_selected {
                tracing::debug!(element = %target.element, "Selected by touch");
                self.select(target.element);
            }
            self.sequence = Some(TouchSequence {
                element: target.element,
                part: if was_selected {
                    target.part
                } else {
                    ElementPart::Body
                },
                transforming: was_selected,
            });
        }

        let Some(seq) = self.sequence else {
            return CanvasResponse::pass_through();
        };
        let mut emission = None;
        if seq.transforming {
            if let Some(engine) = self.engines.get_mut(&seq.element) {
                emission = engine
                    .handle_touch(event, seq.part)
                    .map(|delta| Emission {
                        element: seq.element,
                        delta,
                    });
            }
        }
        if event.ends_sequence() {
            self.sequence = None;
        }
        CanvasResponse {
            disposition: TouchDisposition::Consumed {
                element: seq.element,
                newly_selected: !seq.transforming,
            },
            emission,
        }
    }

    /// Advance every engine's settle animation. Returns true while any moves.
    pub fn tick(&mut self, dt: Duration) -> bool {
        let mut animating = false;
        for engine in self.engines.values_mut() {
            animating |= engine.tick(dt);
        }
        animating
    }

    /// Report how an emission was resolved.
    pub fn complete(&mut self, id: ElementId, outcome: EmissionOutcome<'_>) {
        if let Some(engine) = self.engines.get_mut(&id) {
            engine.complete(outcome);
        }
    }

    /// Build draw instructions in paint order.
    #[must_use]
    pub fn render(&self, elements: &[BoardElement]) -> Vec<RenderItem> {
        paint_order(elements)
            .into_iter()
            .map(|element| {
                let selected = self.selection.is_selected(element.id);
                RenderItem {
                    id: element.id,
                    z_index: element.z_index,
                    geometry: self.engines.get(&element.id).map_or_else(
                        || RenderedGeometry::resting(element.geometry()),
                        TransformEngine::rendered,
                    ),
                    content: RenderContent::from(&element.kind),
                    selected,
                    show_resize_handle: selected,
                }
            })
            .collect()
    }
}
