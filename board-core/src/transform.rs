//! Per-element transform engine.
//!
//! Bridges continuous gesture input and the discrete, persisted geometry of
//! one element. The engine holds three views of the element:
//!
//! - `persisted`: the geometry last confirmed by the store.
//! - `live`: the logical transient geometry the user is manipulating.
//! - springs: what is actually drawn, which trails `live` after a release.
//!
//! Canonical values flow into `live` only through [`TransformEngine::reconcile`],
//! and only for fields whose gesture is not active. Changes flow out only as
//! a [`TransformDelta`] returned once the whole interaction has ended.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::element::{BoardElement, ElementId, ElementPatch, Geometry};
use crate::event::{ElementPart, TouchEvent};
use crate::gesture::{GestureKind, GestureSet, GestureValue, RecognizerState, Transition};
use crate::spring::{Spring, SpringConfig};

/// Geometry as drawn this frame, including the ephemeral pinch scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RenderedGeometry {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
    /// Rotation in radians.
    pub rotation: f32,
    /// Visual scale multiplier (1 at rest).
    pub scale: f32,
}

impl RenderedGeometry {
    /// Drawn form of a resting geometry.
    #[must_use]
    pub fn resting(geometry: Geometry) -> Self {
        Self {
            x: geometry.x,
            y: geometry.y,
            width: geometry.width,
            height: geometry.height,
            rotation: geometry.rotation,
            scale: 1.0,
        }
    }
}

/// A geometry snapshot stamped with its publication number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PublishedGeometry {
    /// Increments on every publish.
    pub generation: u64,
    /// The geometry.
    pub geometry: RenderedGeometry,
}

/// Shared slot through which an engine publishes drawn geometry.
///
/// The engine is the only writer. Readers (a render thread, a test) always
/// see a complete frame; within a frame the last publish wins.
#[derive(Debug, Clone)]
pub struct GeometryHandle {
    inner: Arc<RwLock<PublishedGeometry>>,
}

impl GeometryHandle {
    fn new(geometry: RenderedGeometry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(PublishedGeometry {
                generation: 0,
                geometry,
            })),
        }
    }

    /// Read the latest published geometry.
    #[must_use]
    pub fn load(&self) -> PublishedGeometry {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn store(&self, geometry: RenderedGeometry) {
        let mut slot = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if slot.geometry != geometry {
            slot.generation += 1;
            slot.geometry = geometry;
        }
    }
}

/// Geometry fields changed by a completed interaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformDelta {
    /// New left edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    /// New top edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    /// New width.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    /// New height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    /// New rotation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f32>,
}

impl TransformDelta {
    /// True if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_none()
            && self.y.is_none()
            && self.width.is_none()
            && self.height.is_none()
            && self.rotation.is_none()
    }

    /// True if this delta carries a field driven by `kind`.
    fn covers(&self, kind: GestureKind) -> bool {
        match kind {
            GestureKind::Pan => self.x.is_some() || self.y.is_some(),
            GestureKind::Resize => self.width.is_some() || self.height.is_some(),
            GestureKind::Rotate => self.rotation.is_some(),
            GestureKind::Pinch => false,
        }
    }
}

impl From<TransformDelta> for ElementPatch {
    fn from(delta: TransformDelta) -> Self {
        Self {
            position_x: delta.x,
            position_y: delta.y,
            width: delta.width,
            height: delta.height,
            rotation: delta.rotation,
            z_index: None,
        }
    }
}

/// How the store resolved the engine's last emission.
#[derive(Debug, Clone, Copy)]
pub enum EmissionOutcome<'a> {
    /// The update was persisted; this is the returned record.
    Persisted(&'a BoardElement),
    /// The update failed; transient geometry reverts to the persisted values.
    Failed,
}

#[derive(Debug, Clone, Copy)]
struct DisplaySprings {
    x: Spring,
    y: Spring,
    width: Spring,
    height: Spring,
    rotation: Spring,
    scale: Spring,
}

impl DisplaySprings {
    fn at(geometry: Geometry) -> Self {
        Self {
            x: Spring::at(geometry.x),
            y: Spring::at(geometry.y),
            width: Spring::at(geometry.width),
            height: Spring::at(geometry.height),
            rotation: Spring::at(geometry.rotation),
            scale: Spring::at(1.0),
        }
    }

    fn step(&mut self, dt: f32, config: &SpringConfig) -> bool {
        let mut moving = false;
        for spring in [
            &mut self.x,
            &mut self.y,
            &mut self.width,
            &mut self.height,
            &mut self.rotation,
            &mut self.scale,
        ] {
            moving |= spring.step(dt, config);
        }
        moving
    }

    fn rest(&self, kind: GestureKind) -> bool {
        match kind {
            GestureKind::Pan => self.x.is_at_rest() && self.y.is_at_rest(),
            GestureKind::Resize => self.width.is_at_rest() && self.height.is_at_rest(),
            GestureKind::Rotate => self.rotation.is_at_rest(),
            GestureKind::Pinch => self.scale.is_at_rest(),
        }
    }

    fn rendered(&self) -> RenderedGeometry {
        RenderedGeometry {
            x: self.x.value(),
            y: self.y.value(),
            width: self.width.value(),
            height: self.height.value(),
            rotation: self.rotation.value(),
            scale: self.scale.value(),
        }
    }
}

/// Animate a spring toward `target`, keeping whatever momentum it has.
fn settle_to(spring: &mut Spring, target: f32, config: &SpringConfig) {
    spring.release(spring.velocity(), target, config);
}

/// Gestures that drive persisted geometry. Pinch is purely visual.
const GEOMETRY_GESTURES: [GestureKind; 3] =
    [GestureKind::Pan, GestureKind::Resize, GestureKind::Rotate];

/// True if `a` and `b` agree on every field driven by `kind`.
fn same_fields(kind: GestureKind, a: Geometry, b: Geometry) -> bool {
    match kind {
        GestureKind::Pan => a.x == b.x && a.y == b.y,
        GestureKind::Resize => a.width == b.width && a.height == b.height,
        GestureKind::Rotate => a.rotation == b.rotation,
        GestureKind::Pinch => true,
    }
}

/// Transform state machine for a single element.
#[derive(Debug)]
pub struct TransformEngine {
    id: ElementId,
    config: EngineConfig,
    persisted: Geometry,
    live: Geometry,
    scale: f32,
    pan_origin: Option<(f32, f32)>,
    resize_origin: Option<Geometry>,
    rotate_base: Option<f32>,
    gestures: GestureSet,
    springs: DisplaySprings,
    pending: TransformDelta,
    emitted: TransformDelta,
    awaiting: bool,
    selected: bool,
    published: GeometryHandle,
}

impl TransformEngine {
    /// Mount an engine for a canonical element.
    #[must_use]
    pub fn new(element: &BoardElement, config: EngineConfig) -> Self {
        let geometry = element.geometry();
        Self {
            id: element.id,
            gestures: GestureSet::standard(&config),
            config,
            persisted: geometry,
            live: geometry,
            scale: 1.0,
            pan_origin: None,
            resize_origin: None,
            rotate_base: None,
            springs: DisplaySprings::at(geometry),
            pending: TransformDelta::default(),
            emitted: TransformDelta::default(),
            awaiting: false,
            selected: false,
            published: GeometryHandle::new(RenderedGeometry::resting(geometry)),
        }
    }

    /// The element this engine drives.
    #[must_use]
    pub fn id(&self) -> ElementId {
        self.id
    }

    /// Logical transient geometry.
    #[must_use]
    pub fn geometry(&self) -> Geometry {
        self.live
    }

    /// Geometry last confirmed by the store.
    #[must_use]
    pub fn persisted(&self) -> Geometry {
        self.persisted
    }

    /// Current pinch multiplier.
    #[must_use]
    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// What is drawn this frame.
    #[must_use]
    pub fn rendered(&self) -> RenderedGeometry {
        self.springs.rendered()
    }

    /// Shared handle to the published drawn geometry.
    #[must_use]
    pub fn handle(&self) -> GeometryHandle {
        self.published.clone()
    }

    /// Whether gestures are enabled.
    #[must_use]
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// True between an emission and its outcome.
    #[must_use]
    pub fn is_awaiting_persistence(&self) -> bool {
        self.awaiting
    }

    /// State of one recognizer.
    #[must_use]
    pub fn gesture_state(&self, kind: GestureKind) -> RecognizerState {
        self.gestures.state(kind)
    }

    /// True while any gesture is active.
    #[must_use]
    pub fn is_gesture_active(&self) -> bool {
        self.gestures.any_active()
    }

    /// Enable or disable gestures. Deselecting mid-gesture cancels it and
    /// drops anything not yet emitted.
    pub fn set_selected(&mut self, selected: bool) {
        if self.selected == selected {
            return;
        }
        self.selected = selected;
        if !selected {
            self.cancel();
        }
    }

    /// Abort any in-progress gesture and return to the persisted geometry.
    pub fn cancel(&mut self) {
        for transition in self.gestures.cancel_all() {
            self.apply(transition);
        }
        if !self.pending.is_empty() {
            tracing::debug!(element = %self.id, "Dropping unemitted transform");
            self.pending = TransformDelta::default();
            self.revert_to_persisted();
        }
        self.after_input();
    }

    /// Feed one event of a touch sequence that began on `part`.
    ///
    /// Returns the coalesced delta once the last active gesture of the
    /// interaction ends with a change. While that delta is awaiting its
    /// outcome, input is ignored.
    pub fn handle_touch(&mut self, event: &TouchEvent, part: ElementPart) -> Option<TransformDelta> {
        if !self.selected {
            return None;
        }
        if self.awaiting {
            tracing::trace!(element = %self.id, "Ignoring touch while awaiting persistence");
            return None;
        }
        for transition in self.gestures.handle(event, part) {
            self.apply(transition);
        }
        self.after_input();
        self.take_emission()
    }

    /// Advance settle animations by one frame. Returns true while animating.
    pub fn tick(&mut self, dt: Duration) -> bool {
        let moving = self.springs.step(dt.as_secs_f32(), &self.config.spring);
        self.after_input();
        moving
    }

    /// One-way sync from canonical to transient state.
    ///
    /// Each field group is brought in line with the canonical record unless
    /// its gesture is active or a change to it has not yet been resolved.
    /// Held groups pick the canonical values up when their gesture ends or
    /// their outcome arrives.
    pub fn reconcile(&mut self, canonical: &BoardElement) {
        if canonical.id != self.id {
            tracing::warn!(
                element = %self.id,
                other = %canonical.id,
                "Refusing to reconcile from a different element"
            );
            return;
        }
        let next = canonical.geometry();
        self.persisted = next;
        for kind in GEOMETRY_GESTURES {
            if !self.is_held(kind) && !same_fields(kind, self.live, next) {
                self.assign(kind, next, false);
            }
        }
        self.after_input();
    }

    /// Resolve the last emission.
    pub fn complete(&mut self, outcome: EmissionOutcome<'_>) {
        if !self.awaiting {
            tracing::debug!(element = %self.id, "Outcome reported with nothing outstanding");
        }
        self.awaiting = false;
        self.emitted = TransformDelta::default();
        match outcome {
            EmissionOutcome::Persisted(record) => self.reconcile(record),
            EmissionOutcome::Failed => {
                tracing::debug!(element = %self.id, "Reverting transform after failed update");
                self.revert_to_persisted();
                self.after_input();
            }
        }
    }

    fn apply(&mut self, transition: Transition) {
        match transition {
            Transition::Began(kind) => {
                tracing::debug!(element = %self.id, gesture = %kind, "Gesture began");
                match kind {
                    GestureKind::Pan => self.pan_origin = Some((self.live.x, self.live.y)),
                    GestureKind::Resize => self.resize_origin = Some(self.live),
                    GestureKind::Rotate => self.rotate_base = Some(self.persisted.rotation),
                    GestureKind::Pinch => {}
                }
            }
            Transition::Changed(value) => self.update(value),
            Transition::Ended(value) => {
                tracing::debug!(element = %self.id, gesture = %value.kind(), "Gesture ended");
                self.update(value);
                self.end(value);
            }
            Transition::Cancelled(kind) => {
                tracing::debug!(element = %self.id, gesture = %kind, "Gesture cancelled");
                self.revert(kind);
            }
        }
    }

    fn update(&mut self, value: GestureValue) {
        match value {
            GestureValue::Pan { dx, dy, .. } => {
                if let Some((ox, oy)) = self.pan_origin {
                    self.live.x = ox + dx;
                    self.live.y = oy + dy;
                    self.springs.x.snap(self.live.x);
                    self.springs.y.snap(self.live.y);
                }
            }
            GestureValue::Resize { dx, dy, .. } => {
                if let Some(origin) = self.resize_origin {
                    let floor = self.config.size_floor();
                    self.live.width = (origin.width + dx).max(floor);
                    self.live.height = (origin.height + dy).max(floor);
                    self.springs.width.snap(self.live.width);
                    self.springs.height.snap(self.live.height);
                }
            }
            GestureValue::Rotate { angle, .. } => {
                if let Some(base) = self.rotate_base {
                    self.live.rotation = base + angle;
                    self.springs.rotation.snap(self.live.rotation);
                }
            }
            GestureValue::Pinch { scale, .. } => {
                self.scale = scale;
                self.springs.scale.snap(scale);
            }
        }
    }

    fn end(&mut self, value: GestureValue) {
        let spring = self.config.spring;
        match value {
            GestureValue::Pan { vx, vy, .. } => {
                self.springs.x.release(vx, self.live.x, &spring);
                self.springs.y.release(vy, self.live.y, &spring);
                if let Some((ox, oy)) = self.pan_origin.take() {
                    if self.live.x != ox || self.live.y != oy {
                        self.pending.x = Some(self.live.x);
                        self.pending.y = Some(self.live.y);
                    }
                }
                self.restore_unheld(GestureKind::Pan);
            }
            GestureValue::Resize { vx, vy, .. } => {
                self.springs.width.release(vx, self.live.width, &spring);
                self.springs.height.release(vy, self.live.height, &spring);
                if let Some(origin) = self.resize_origin.take() {
                    if self.live.width != origin.width || self.live.height != origin.height {
                        self.pending.width = Some(self.live.width);
                        self.pending.height = Some(self.live.height);
                    }
                }
                self.restore_unheld(GestureKind::Resize);
            }
            GestureValue::Rotate { velocity, .. } => {
                self.springs.rotation.release(velocity, self.live.rotation, &spring);
                if let Some(base) = self.rotate_base.take() {
                    if self.live.rotation != base {
                        self.pending.rotation = Some(self.live.rotation);
                    }
                }
                self.restore_unheld(GestureKind::Rotate);
            }
            GestureValue::Pinch { velocity, .. } => {
                self.scale = 1.0;
                self.springs.scale.release(velocity, 1.0, &spring);
            }
        }
    }

    /// Undo a cancelled gesture. Its fields return to the origin, or to the
    /// persisted values when no earlier change to them is pending.
    fn revert(&mut self, kind: GestureKind) {
        let spring = self.config.spring;
        match kind {
            GestureKind::Pan => {
                if let Some((ox, oy)) = self.pan_origin.take() {
                    self.live.x = ox;
                    self.live.y = oy;
                    settle_to(&mut self.springs.x, ox, &spring);
                    settle_to(&mut self.springs.y, oy, &spring);
                }
            }
            GestureKind::Resize => {
                if let Some(origin) = self.resize_origin.take() {
                    self.live.width = origin.width;
                    self.live.height = origin.height;
                    settle_to(&mut self.springs.width, origin.width, &spring);
                    settle_to(&mut self.springs.height, origin.height, &spring);
                }
            }
            GestureKind::Rotate => {
                if let Some(base) = self.rotate_base.take() {
                    self.live.rotation = base;
                    settle_to(&mut self.springs.rotation, base, &spring);
                }
            }
            GestureKind::Pinch => {
                self.scale = 1.0;
                settle_to(&mut self.springs.scale, 1.0, &spring);
            }
        }
        self.restore_unheld(kind);
    }

    fn revert_to_persisted(&mut self) {
        for kind in GEOMETRY_GESTURES {
            self.restore_unheld(kind);
        }
    }

    /// A group is held while its gesture is active or a change to it is
    /// pending or awaiting its outcome.
    fn is_held(&self, kind: GestureKind) -> bool {
        self.gestures.is_active(kind) || self.pending.covers(kind) || self.emitted.covers(kind)
    }

    /// Animate an unheld group back to the persisted geometry.
    fn restore_unheld(&mut self, kind: GestureKind) {
        if !self.is_held(kind) {
            self.assign(kind, self.persisted, true);
        }
    }

    /// Copy the fields driven by `kind` from `target` into the live geometry.
    /// With `settle` the drawn value animates there; otherwise a resting
    /// spring jumps.
    fn assign(&mut self, kind: GestureKind, target: Geometry, settle: bool) {
        let spring = self.config.spring;
        let drive = |s: &mut Spring, value: f32| {
            if settle {
                settle_to(s, value, &spring);
            } else {
                s.retarget(value, &spring);
            }
        };
        match kind {
            GestureKind::Pan => {
                self.live.x = target.x;
                self.live.y = target.y;
                drive(&mut self.springs.x, target.x);
                drive(&mut self.springs.y, target.y);
            }
            GestureKind::Resize => {
                self.live.width = target.width;
                self.live.height = target.height;
                drive(&mut self.springs.width, target.width);
                drive(&mut self.springs.height, target.height);
            }
            GestureKind::Rotate => {
                self.live.rotation = target.rotation;
                drive(&mut self.springs.rotation, target.rotation);
            }
            GestureKind::Pinch => {}
        }
    }

    fn take_emission(&mut self) -> Option<TransformDelta> {
        if self.gestures.any_active() || self.pending.is_empty() {
            return None;
        }
        let delta = std::mem::take(&mut self.pending);
        self.emitted = delta;
        self.awaiting = true;
        tracing::debug!(element = %self.id, ?delta, "Emitting transform");
        Some(delta)
    }

    /// Publish the drawn geometry and release recognizers whose settle
    /// animation has come to rest.
    fn after_input(&mut self) {
        for kind in GestureKind::ALL {
            if self.gestures.state(kind) == RecognizerState::Settling && self.springs.rest(kind) {
                self.gestures.finish_settling(kind);
            }
        }
        self.published.store(self.springs.rendered());
    }
}
