//! Single-select state for one board.

use serde::{Deserialize, Serialize};

use crate::ElementId;

/// What the canvas should do with a touch after selection has seen it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "disposition", rename_all = "snake_case")]
pub enum TouchDisposition {
    /// The touch belongs to an element; the scroll view must not see it.
    Consumed {
        /// The element that took the touch.
        element: ElementId,
        /// True if this touch only selected the element.
        newly_selected: bool,
    },
    /// The touch hit no element and may scroll the canvas.
    PassThrough,
}

impl TouchDisposition {
    /// True if propagation to the canvas scroll view must stop.
    #[must_use]
    pub const fn stops_propagation(&self) -> bool {
        matches!(self, Self::Consumed { .. })
    }
}

/// Tracks the single selected element, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionController {
    selected: Option<ElementId>,
}

impl SelectionController {
    /// Nothing selected.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `id`, returning the element that lost selection, if any.
    pub fn select(&mut self, id: ElementId) -> Option<ElementId> {
        let previous = self.selected.replace(id);
        previous.filter(|&p| p != id)
    }

    /// Clear the selection, returning what was selected.
    pub fn clear(&mut self) -> Option<ElementId> {
        self.selected.take()
    }

    /// The selected element.
    #[must_use]
    pub fn selected(&self) -> Option<ElementId> {
        self.selected
    }

    /// True if `id` is the selected element.
    #[must_use]
    pub fn is_selected(&self, id: ElementId) -> bool {
        self.selected == Some(id)
    }

    /// Drop the selection if the selected element no longer exists.
    pub fn retain(&mut self, exists: impl Fn(ElementId) -> bool) -> Option<ElementId> {
        match self.selected {
            Some(id) if !exists(id) => self.selected.take(),
            _ => None,
        }
    }
}
