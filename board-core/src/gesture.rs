//! Gesture recognition from raw touch input.
//!
//! Each recognizer is an explicit state machine:
//!
//! ```text
//!            begin                 end / cancel
//!   Idle ───────────▶ Active ───────────────────▶ Settling
//!    ▲                  │ update                     │
//!    │                  ▼                            │
//!    │               Active                          │
//!    └──────────────────────── settle finished ──────┘
//! ```
//!
//! Recognizers never exclude one another: a [`GestureSet`] feeds every event
//! of a touch sequence to all of them and collects their transitions. A
//! recognizer in `Settling` ignores input until its owner reports that the
//! settle animation finished.

use std::f32::consts::{PI, TAU};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::event::{ElementPart, TouchEvent, TouchPhase};

/// The four gestures an element responds to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureKind {
    /// Drag the element body.
    Pan,
    /// Drag the resize handle.
    Resize,
    /// Two-finger twist.
    Rotate,
    /// Two-finger pinch.
    Pinch,
}

impl GestureKind {
    /// Every gesture kind.
    pub const ALL: [Self; 4] = [Self::Pan, Self::Resize, Self::Rotate, Self::Pinch];
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pan => "pan",
            Self::Resize => "resize",
            Self::Rotate => "rotate",
            Self::Pinch => "pinch",
        };
        f.write_str(name)
    }
}

/// Lifecycle state of a recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognizerState {
    /// Not recognizing; may be tracking touches below the activation slop.
    Idle,
    /// Recognized and producing updates.
    Active,
    /// Ended; waiting for the settle animation to finish.
    Settling,
}

/// Cumulative gesture measurements since the gesture began.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "gesture", rename_all = "lowercase")]
pub enum GestureValue {
    /// Body drag.
    Pan {
        /// Horizontal translation.
        dx: f32,
        /// Vertical translation.
        dy: f32,
        /// Horizontal velocity (px/s).
        vx: f32,
        /// Vertical velocity (px/s).
        vy: f32,
    },
    /// Handle drag.
    Resize {
        /// Horizontal translation.
        dx: f32,
        /// Vertical translation.
        dy: f32,
        /// Horizontal velocity (px/s).
        vx: f32,
        /// Vertical velocity (px/s).
        vy: f32,
    },
    /// Twist.
    Rotate {
        /// Rotation in radians, unwrapped (may exceed a full turn).
        angle: f32,
        /// Angular velocity (rad/s).
        velocity: f32,
    },
    /// Pinch.
    Pinch {
        /// Current finger distance over starting distance.
        scale: f32,
        /// Scale velocity (1/s).
        velocity: f32,
    },
}

impl GestureValue {
    /// The gesture this value belongs to.
    #[must_use]
    pub const fn kind(&self) -> GestureKind {
        match self {
            Self::Pan { .. } => GestureKind::Pan,
            Self::Resize { .. } => GestureKind::Resize,
            Self::Rotate { .. } => GestureKind::Rotate,
            Self::Pinch { .. } => GestureKind::Pinch,
        }
    }
}

/// A state change reported by a recognizer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    /// Idle → Active.
    Began(GestureKind),
    /// Active → Active with new measurements.
    Changed(GestureValue),
    /// Active → Settling with final measurements.
    Ended(GestureValue),
    /// Active → Settling without a result; the owner should revert.
    Cancelled(GestureKind),
}

/// A gesture recognizer fed from a shared touch stream.
pub trait Recognizer: fmt::Debug + Send {
    /// Which gesture this recognizes.
    fn kind(&self) -> GestureKind;

    /// Current lifecycle state.
    fn state(&self) -> RecognizerState;

    /// Process one event of a touch sequence that began on `part`.
    fn handle(&mut self, event: &TouchEvent, part: ElementPart, out: &mut Vec<Transition>);

    /// Abort any active gesture.
    fn cancel(&mut self, out: &mut Vec<Transition>);

    /// Settling → Idle.
    fn finish_settling(&mut self);
}

fn sorted_ids(event: &TouchEvent) -> Vec<u32> {
    let mut ids: Vec<u32> = event.touches.iter().map(|t| t.id).collect();
    ids.sort_unstable();
    ids
}

#[allow(clippy::cast_precision_loss)] // frame deltas are small
fn per_second(delta: f32, dt_ms: u64) -> f32 {
    delta * 1000.0 / dt_ms as f32
}

#[derive(Debug, Clone)]
struct DragTrack {
    ids: Vec<u32>,
    anchor: (f32, f32),
    carried: (f32, f32),
    translation: (f32, f32),
    velocity: (f32, f32),
    last_ms: u64,
}

impl DragTrack {
    fn start(event: &TouchEvent) -> Option<Self> {
        let anchor = event.centroid()?;
        Some(Self {
            ids: sorted_ids(event),
            anchor,
            carried: (0.0, 0.0),
            translation: (0.0, 0.0),
            velocity: (0.0, 0.0),
            last_ms: event.timestamp_ms,
        })
    }

    fn sample(&mut self, event: &TouchEvent) {
        let Some((cx, cy)) = event.centroid() else {
            return;
        };
        let ids = sorted_ids(event);
        if ids != self.ids {
            // Finger set changed: bank the translation so the centroid jump
            // does not move the element.
            self.carried = self.translation;
            self.anchor = (cx, cy);
            self.ids = ids;
            self.last_ms = event.timestamp_ms;
            return;
        }
        let next = (
            self.carried.0 + cx - self.anchor.0,
            self.carried.1 + cy - self.anchor.1,
        );
        let dt_ms = event.timestamp_ms.saturating_sub(self.last_ms);
        if dt_ms > 0 {
            self.velocity = (
                per_second(next.0 - self.translation.0, dt_ms),
                per_second(next.1 - self.translation.1, dt_ms),
            );
            self.last_ms = event.timestamp_ms;
        }
        self.translation = next;
    }
}

/// Single-or-multi finger drag, used for both pan (body) and resize (handle).
#[derive(Debug)]
pub struct DragRecognizer {
    kind: GestureKind,
    part: ElementPart,
    slop: f32,
    state: RecognizerState,
    track: Option<DragTrack>,
}

impl DragRecognizer {
    /// Drag on the element body.
    #[must_use]
    pub fn pan(slop: f32) -> Self {
        Self::new(GestureKind::Pan, ElementPart::Body, slop)
    }

    /// Drag on the resize handle.
    #[must_use]
    pub fn resize(slop: f32) -> Self {
        Self::new(GestureKind::Resize, ElementPart::ResizeHandle, slop)
    }

    fn new(kind: GestureKind, part: ElementPart, slop: f32) -> Self {
        Self {
            kind,
            part,
            slop: slop.max(0.0),
            state: RecognizerState::Idle,
            track: None,
        }
    }

    fn value(&self) -> Option<GestureValue> {
        let track = self.track.as_ref()?;
        let (dx, dy) = track.translation;
        let (vx, vy) = track.velocity;
        Some(match self.kind {
            GestureKind::Resize => GestureValue::Resize { dx, dy, vx, vy },
            _ => GestureValue::Pan { dx, dy, vx, vy },
        })
    }

    fn activate(&mut self, out: &mut Vec<Transition>) {
        self.state = RecognizerState::Active;
        out.push(Transition::Began(self.kind));
    }

    fn finish(&mut self, out: &mut Vec<Transition>) {
        if self.state == RecognizerState::Active {
            if let Some(value) = self.value() {
                out.push(Transition::Ended(value));
            }
            self.state = RecognizerState::Settling;
        }
        self.track = None;
    }
}

impl Recognizer for DragRecognizer {
    fn kind(&self) -> GestureKind {
        self.kind
    }

    fn state(&self) -> RecognizerState {
        self.state
    }

    fn handle(&mut self, event: &TouchEvent, part: ElementPart, out: &mut Vec<Transition>) {
        if self.state == RecognizerState::Settling {
            return;
        }
        match event.phase {
            TouchPhase::Start | TouchPhase::Move => {
                if let Some(track) = self.track.as_mut() {
                    track.sample(event);
                    let (dx, dy) = track.translation;
                    if self.state == RecognizerState::Idle && dx.hypot(dy) >= self.slop {
                        self.activate(out);
                    }
                    if self.state == RecognizerState::Active {
                        if let Some(value) = self.value() {
                            out.push(Transition::Changed(value));
                        }
                    }
                } else if event.phase == TouchPhase::Start && part == self.part {
                    self.track = DragTrack::start(event);
                    if self.track.is_some() && self.slop == 0.0 {
                        self.activate(out);
                    }
                }
            }
            TouchPhase::End => {
                if event.touches.is_empty() {
                    self.finish(out);
                } else if let Some(track) = self.track.as_mut() {
                    track.sample(event);
                }
            }
            TouchPhase::Cancel => self.cancel(out),
        }
    }

    fn cancel(&mut self, out: &mut Vec<Transition>) {
        if self.state == RecognizerState::Active {
            out.push(Transition::Cancelled(self.kind));
            self.state = RecognizerState::Settling;
        }
        self.track = None;
    }

    fn finish_settling(&mut self) {
        if self.state == RecognizerState::Settling {
            self.state = RecognizerState::Idle;
        }
    }
}

#[derive(Debug, Clone)]
struct PairTrack {
    a: u32,
    b: u32,
    start_distance: f32,
    last_angle: f32,
    angle: f32,
    scale: f32,
    angle_velocity: f32,
    scale_velocity: f32,
    last_ms: u64,
}

/// Below this finger distance the pinch ratio is meaningless.
const MIN_PAIR_DISTANCE: f32 = 1.0;

impl PairTrack {
    fn start(event: &TouchEvent) -> Option<Self> {
        let (pa, pb) = (event.touches.first()?, event.touches.get(1)?);
        let (dx, dy) = (pb.x - pa.x, pb.y - pa.y);
        Some(Self {
            a: pa.id,
            b: pb.id,
            start_distance: dx.hypot(dy).max(MIN_PAIR_DISTANCE),
            last_angle: dy.atan2(dx),
            angle: 0.0,
            scale: 1.0,
            angle_velocity: 0.0,
            scale_velocity: 0.0,
            last_ms: event.timestamp_ms,
        })
    }

    /// Returns false once either finger of the pair has lifted.
    fn sample(&mut self, event: &TouchEvent) -> bool {
        let (Some(pa), Some(pb)) = (event.touch(self.a), event.touch(self.b)) else {
            return false;
        };
        let (dx, dy) = (pb.x - pa.x, pb.y - pa.y);
        let current = dy.atan2(dx);
        let mut delta = current - self.last_angle;
        while delta > PI {
            delta -= TAU;
        }
        while delta <= -PI {
            delta += TAU;
        }
        let angle = self.angle + delta;
        let scale = dx.hypot(dy).max(MIN_PAIR_DISTANCE) / self.start_distance;

        let dt_ms = event.timestamp_ms.saturating_sub(self.last_ms);
        if dt_ms > 0 {
            self.angle_velocity = per_second(angle - self.angle, dt_ms);
            self.scale_velocity = per_second(scale - self.scale, dt_ms);
            self.last_ms = event.timestamp_ms;
        }
        self.last_angle = current;
        self.angle = angle;
        self.scale = scale;
        true
    }
}

/// Two-finger recognizer, used for both rotate and pinch.
#[derive(Debug)]
pub struct TwoFingerRecognizer {
    kind: GestureKind,
    state: RecognizerState,
    track: Option<PairTrack>,
}

impl TwoFingerRecognizer {
    /// Twist recognizer.
    #[must_use]
    pub fn rotate() -> Self {
        Self::new(GestureKind::Rotate)
    }

    /// Pinch recognizer.
    #[must_use]
    pub fn pinch() -> Self {
        Self::new(GestureKind::Pinch)
    }

    fn new(kind: GestureKind) -> Self {
        Self {
            kind,
            state: RecognizerState::Idle,
            track: None,
        }
    }

    fn value(&self) -> Option<GestureValue> {
        let track = self.track.as_ref()?;
        Some(match self.kind {
            GestureKind::Pinch => GestureValue::Pinch {
                scale: track.scale,
                velocity: track.scale_velocity,
            },
            _ => GestureValue::Rotate {
                angle: track.angle,
                velocity: track.angle_velocity,
            },
        })
    }

    fn finish(&mut self, out: &mut Vec<Transition>) {
        if self.state == RecognizerState::Active {
            if let Some(value) = self.value() {
                out.push(Transition::Ended(value));
            }
            self.state = RecognizerState::Settling;
        }
        self.track = None;
    }
}

impl Recognizer for TwoFingerRecognizer {
    fn kind(&self) -> GestureKind {
        self.kind
    }

    fn state(&self) -> RecognizerState {
        self.state
    }

    fn handle(&mut self, event: &TouchEvent, part: ElementPart, out: &mut Vec<Transition>) {
        if self.state == RecognizerState::Settling || part != ElementPart::Body {
            return;
        }
        match event.phase {
            TouchPhase::Start | TouchPhase::Move | TouchPhase::End => {
                if let Some(track) = self.track.as_mut() {
                    if track.sample(event) {
                        if let Some(value) = self.value() {
                            out.push(Transition::Changed(value));
                        }
                    } else {
                        self.finish(out);
                    }
                } else if event.phase != TouchPhase::End && event.is_multi_touch() {
                    self.track = PairTrack::start(event);
                    if self.track.is_some() {
                        self.state = RecognizerState::Active;
                        out.push(Transition::Began(self.kind));
                    }
                }
            }
            TouchPhase::Cancel => self.cancel(out),
        }
    }

    fn cancel(&mut self, out: &mut Vec<Transition>) {
        if self.state == RecognizerState::Active {
            out.push(Transition::Cancelled(self.kind));
            self.state = RecognizerState::Settling;
        }
        self.track = None;
    }

    fn finish_settling(&mut self) {
        if self.state == RecognizerState::Settling {
            self.state = RecognizerState::Idle;
        }
    }
}

/// Simultaneous recognizers sharing one input stream.
#[derive(Debug)]
pub struct GestureSet {
    recognizers: Vec<Box<dyn Recognizer>>,
}

impl GestureSet {
    /// Build a set from explicit recognizers.
    #[must_use]
    pub fn new(recognizers: Vec<Box<dyn Recognizer>>) -> Self {
        Self { recognizers }
    }

    /// Pan, resize, rotate and pinch.
    #[must_use]
    pub fn standard(config: &EngineConfig) -> Self {
        Self::new(vec![
            Box::new(DragRecognizer::pan(config.activation_slop)),
            Box::new(DragRecognizer::resize(config.activation_slop)),
            Box::new(TwoFingerRecognizer::rotate()),
            Box::new(TwoFingerRecognizer::pinch()),
        ])
    }

    /// Feed one event to every recognizer.
    pub fn handle(&mut self, event: &TouchEvent, part: ElementPart) -> Vec<Transition> {
        let mut out = Vec::new();
        for recognizer in &mut self.recognizers {
            recognizer.handle(event, part, &mut out);
        }
        out
    }

    /// Abort every active recognizer.
    pub fn cancel_all(&mut self) -> Vec<Transition> {
        let mut out = Vec::new();
        for recognizer in &mut self.recognizers {
            recognizer.cancel(&mut out);
        }
        out
    }

    /// State of the recognizer for `kind` (`Idle` if the set has none).
    #[must_use]
    pub fn state(&self, kind: GestureKind) -> RecognizerState {
        self.recognizers
            .iter()
            .find(|r| r.kind() == kind)
            .map_or(RecognizerState::Idle, |r| r.state())
    }

    /// True if the recognizer for `kind` is active.
    #[must_use]
    pub fn is_active(&self, kind: GestureKind) -> bool {
        self.state(kind) == RecognizerState::Active
    }

    /// True if any recognizer is active.
    #[must_use]
    pub fn any_active(&self) -> bool {
        self.recognizers
            .iter()
            .any(|r| r.state() == RecognizerState::Active)
    }

    /// Mark the settle animation for `kind` as finished.
    pub fn finish_settling(&mut self, kind: GestureKind) {
        for recognizer in self.recognizers.iter_mut().filter(|r| r.kind() == kind) {
            recognizer.finish_settling();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TouchPoint;

    fn ev(phase: TouchPhase, touches: &[(u32, f32, f32)], t: u64) -> TouchEvent {
        TouchEvent::new(
            phase,
            touches
                .iter()
                .map(|&(id, x, y)| TouchPoint::new(id, x, y))
                .collect(),
            t,
        )
    }

    fn ended(out: &[Transition], kind: GestureKind) -> Option<GestureValue> {
        out.iter().find_map(|t| match t {
            Transition::Ended(v) if v.kind() == kind => Some(*v),
            _ => None,
        })
    }

    #[test]
    fn test_pan_reports_cumulative_translation() {
        let mut pan = DragRecognizer::pan(0.0);
        let mut out = Vec::new();
        pan.handle(&ev(TouchPhase::Start, &[(0, 10.0, 10.0)], 0), ElementPart::Body, &mut out);
        assert_eq!(out, vec![Transition::Began(GestureKind::Pan)]);

        pan.handle(&ev(TouchPhase::Move, &[(0, 30.0, 15.0)], 16), ElementPart::Body, &mut out);
        pan.handle(&ev(TouchPhase::Move, &[(0, 50.0, 20.0)], 32), ElementPart::Body, &mut out);
        pan.handle(&ev(TouchPhase::End, &[], 40), ElementPart::Body, &mut out);

        match ended(&out, GestureKind::Pan) {
            Some(GestureValue::Pan { dx, dy, vx, .. }) => {
                assert!((dx - 40.0).abs() < 1e-4);
                assert!((dy - 10.0).abs() < 1e-4);
                assert!(vx > 0.0);
            }
            other => panic!("expected pan end, got {other:?}"),
        }
        assert_eq!(pan.state(), RecognizerState::Settling);
    }

    #[test]
    fn test_pan_survives_second_finger_without_jump() {
        let mut pan = DragRecognizer::pan(0.0);
        let mut out = Vec::new();
        pan.handle(&ev(TouchPhase::Start, &[(0, 0.0, 0.0)], 0), ElementPart::Body, &mut out);
        pan.handle(&ev(TouchPhase::Move, &[(0, 10.0, 0.0)], 16), ElementPart::Body, &mut out);
        // Second finger lands far away; centroid jumps but translation must not.
        pan.handle(
            &ev(TouchPhase::Start, &[(0, 10.0, 0.0), (1, 110.0, 0.0)], 20),
            ElementPart::Body,
            &mut out,
        );
        pan.handle(
            &ev(TouchPhase::Move, &[(0, 20.0, 0.0), (1, 120.0, 0.0)], 36),
            ElementPart::Body,
            &mut out,
        );
        pan.handle(&ev(TouchPhase::End, &[], 50), ElementPart::Body, &mut out);

        match ended(&out, GestureKind::Pan) {
            Some(GestureValue::Pan { dx, .. }) => assert!((dx - 20.0).abs() < 1e-4),
            other => panic!("expected pan end, got {other:?}"),
        }
    }

    #[test]
    fn test_slop_delays_activation() {
        let mut pan = DragRecognizer::pan(10.0);
        let mut out = Vec::new();
        pan.handle(&ev(TouchPhase::Start, &[(0, 0.0, 0.0)], 0), ElementPart::Body, &mut out);
        pan.handle(&ev(TouchPhase::Move, &[(0, 3.0, 4.0)], 16), ElementPart::Body, &mut out);
        assert!(out.is_empty());
        assert_eq!(pan.state(), RecognizerState::Idle);

        pan.handle(&ev(TouchPhase::Move, &[(0, 6.0, 8.0)], 32), ElementPart::Body, &mut out);
        assert_eq!(out.first(), Some(&Transition::Began(GestureKind::Pan)));
        assert_eq!(pan.state(), RecognizerState::Active);
    }

    #[test]
    fn test_resize_only_starts_on_handle() {
        let mut resize = DragRecognizer::resize(0.0);
        let mut out = Vec::new();
        resize.handle(&ev(TouchPhase::Start, &[(0, 0.0, 0.0)], 0), ElementPart::Body, &mut out);
        assert!(out.is_empty());

        resize.handle(
            &ev(TouchPhase::Start, &[(0, 0.0, 0.0)], 0),
            ElementPart::ResizeHandle,
            &mut out,
        );
        assert_eq!(out, vec![Transition::Began(GestureKind::Resize)]);
    }

    #[test]
    fn test_pinch_scale_from_finger_distance() {
        let mut pinch = TwoFingerRecognizer::pinch();
        let mut out = Vec::new();
        pinch.handle(&ev(TouchPhase::Start, &[(0, 0.0, 0.0)], 0), ElementPart::Body, &mut out);
        assert!(out.is_empty());

        pinch.handle(
            &ev(TouchPhase::Start, &[(0, 0.0, 0.0), (1, 100.0, 0.0)], 10),
            ElementPart::Body,
            &mut out,
        );
        pinch.handle(
            &ev(TouchPhase::Move, &[(0, -50.0, 0.0), (1, 150.0, 0.0)], 26),
            ElementPart::Body,
            &mut out,
        );
        pinch.handle(&ev(TouchPhase::End, &[(0, -50.0, 0.0)], 30), ElementPart::Body, &mut out);

        match ended(&out, GestureKind::Pinch) {
            Some(GestureValue::Pinch { scale, .. }) => assert!((scale - 2.0).abs() < 1e-4),
            other => panic!("expected pinch end, got {other:?}"),
        }
    }

    #[test]
    fn test_rotate_unwraps_past_half_turn() {
        let mut rotate = TwoFingerRecognizer::rotate();
        let mut out = Vec::new();
        let steps = [0.0_f32, 1.0, 2.0, 3.0, 4.0];
        for (i, angle) in steps.iter().enumerate() {
            let phase = if i == 0 { TouchPhase::Start } else { TouchPhase::Move };
            let (s, c) = angle.sin_cos();
            rotate.handle(
                &ev(phase, &[(0, 0.0, 0.0), (1, 100.0 * c, 100.0 * s)], i as u64 * 16),
                ElementPart::Body,
                &mut out,
            );
        }
        rotate.handle(&ev(TouchPhase::End, &[], 100), ElementPart::Body, &mut out);

        match ended(&out, GestureKind::Rotate) {
            Some(GestureValue::Rotate { angle, .. }) => assert!((angle - 4.0).abs() < 1e-3),
            other => panic!("expected rotate end, got {other:?}"),
        }
    }

    #[test]
    fn test_settling_recognizer_ignores_new_touches() {
        let mut pan = DragRecognizer::pan(0.0);
        let mut out = Vec::new();
        pan.handle(&ev(TouchPhase::Start, &[(0, 0.0, 0.0)], 0), ElementPart::Body, &mut out);
        pan.handle(&ev(TouchPhase::End, &[], 10), ElementPart::Body, &mut out);
        out.clear();

        pan.handle(&ev(TouchPhase::Start, &[(0, 0.0, 0.0)], 20), ElementPart::Body, &mut out);
        assert!(out.is_empty());

        pan.finish_settling();
        pan.handle(&ev(TouchPhase::Start, &[(0, 0.0, 0.0)], 30), ElementPart::Body, &mut out);
        assert_eq!(out, vec![Transition::Began(GestureKind::Pan)]);
    }

    #[test]
    fn test_set_runs_recognizers_simultaneously() {
        let mut set = GestureSet::standard(&EngineConfig::default());
        set.handle(&ev(TouchPhase::Start, &[(0, 0.0, 0.0)], 0), ElementPart::Body);
        let out = set.handle(
            &ev(TouchPhase::Start, &[(0, 0.0, 0.0), (1, 100.0, 0.0)], 10),
            ElementPart::Body,
        );
        assert!(out.contains(&Transition::Began(GestureKind::Rotate)));
        assert!(out.contains(&Transition::Began(GestureKind::Pinch)));
        assert!(set.is_active(GestureKind::Pan));
        assert!(!set.is_active(GestureKind::Resize));

        let out = set.cancel_all();
        assert_eq!(out.len(), 3);
        assert!(!set.any_active());
    }
}
