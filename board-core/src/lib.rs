//! # Vision Board Core
//!
//! Editor logic for vision boards: freely positioned, resized and rotated
//! elements manipulated by multi-touch, settled with springs, and persisted
//! as discrete records.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 board-core                  │
//! ├─────────────────────────────────────────────┤
//! │  Board Canvas    │  Selection Controller    │
//! │  - Paint order   │  - Single select         │
//! │  - Hit testing   │  - Touch disposition     │
//! │  - Render items  │                          │
//! ├─────────────────────────────────────────────┤
//! │  Transform Engine (one per element)         │
//! │  - Gesture set: pan/resize/rotate/pinch     │
//! │  - Spring settle, published geometry        │
//! │  - Canonical → transient reconciliation     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! Persistence lives in `board-store`; this crate is synchronous.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod canvas;
pub mod config;
pub mod element;
pub mod error;
pub mod event;
pub mod gesture;
pub mod selection;
pub mod spring;
pub mod transform;
pub mod validation;

pub use canvas::{
    paint_order, BoardCanvas, CanvasResponse, ContentFit, Emission, RenderContent, RenderItem,
};
pub use config::EngineConfig;
pub use element::{
    BoardElement, BoardId, ElementDraft, ElementId, ElementKind, ElementPatch, Geometry,
    NewElement, MIN_ELEMENT_SIZE,
};
pub use error::{BoardError, BoardResult};
pub use event::{ElementPart, TouchEvent, TouchPhase, TouchPoint, TouchTarget};
pub use gesture::{GestureKind, GestureSet, GestureValue, RecognizerState, Transition};
pub use selection::{SelectionController, TouchDisposition};
pub use spring::{Spring, SpringConfig};
pub use transform::{
    EmissionOutcome, GeometryHandle, PublishedGeometry, RenderedGeometry, TransformDelta,
    TransformEngine,
};
pub use validation::ValidationError;

/// Board core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
