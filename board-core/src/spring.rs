//! Spring-damped settling for released gestures.
//!
//! A spring only animates what is *drawn*. The logical value it settles
//! toward is fixed the moment the gesture ends.

use serde::{Deserialize, Serialize};

/// Largest integration step. Long frames are split into sub-steps of at
/// most this length so a stalled frame cannot blow the oscillator up.
const MAX_STEP_SECS: f32 = 1.0 / 240.0;

/// Longest frame simulated. Time beyond this (a suspended app, a debugger
/// pause) is dropped rather than integrated.
const MAX_FRAME_SECS: f32 = 0.25;

/// Physical parameters of a damped spring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpringConfig {
    /// Spring stiffness (k).
    pub stiffness: f32,
    /// Damping coefficient (c).
    pub damping: f32,
    /// Mass (m).
    pub mass: f32,
    /// Distance from target under which the spring may come to rest.
    pub rest_displacement: f32,
    /// Speed under which the spring may come to rest.
    pub rest_speed: f32,
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            stiffness: 100.0,
            damping: 10.0,
            mass: 1.0,
            rest_displacement: 0.01,
            rest_speed: 2.0,
        }
    }
}

/// A one-dimensional damped spring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spring {
    value: f32,
    velocity: f32,
    target: f32,
    at_rest: bool,
}

impl Spring {
    /// A spring resting at `value`.
    #[must_use]
    pub const fn at(value: f32) -> Self {
        Self {
            value,
            velocity: 0.0,
            target: value,
            at_rest: true,
        }
    }

    /// Current drawn value.
    #[must_use]
    pub const fn value(&self) -> f32 {
        self.value
    }

    /// Current velocity (units per second).
    #[must_use]
    pub const fn velocity(&self) -> f32 {
        self.velocity
    }

    /// Value the spring is settling toward.
    #[must_use]
    pub const fn target(&self) -> f32 {
        self.target
    }

    /// True when the spring is not moving.
    #[must_use]
    pub const fn is_at_rest(&self) -> bool {
        self.at_rest
    }

    /// Pin the spring to `value` immediately (used while a finger drives it).
    pub fn snap(&mut self, value: f32) {
        *self = Self::at(value);
    }

    /// Let go: keep the current drawn value, take on the release velocity, and
    /// start settling toward `target`.
    pub fn release(&mut self, velocity: f32, target: f32, config: &SpringConfig) {
        self.velocity = velocity;
        self.target = target;
        self.at_rest = false;
        self.check_rest(config);
    }

    /// Move the target. A resting spring jumps straight there; a moving one
    /// keeps its momentum and settles toward the new target.
    pub fn retarget(&mut self, target: f32, config: &SpringConfig) {
        if self.at_rest {
            self.snap(target);
        } else {
            self.target = target;
            self.check_rest(config);
        }
    }

    /// Advance the simulation by `dt_secs`. Returns true while still moving.
    pub fn step(&mut self, dt_secs: f32, config: &SpringConfig) -> bool {
        if self.at_rest || dt_secs <= 0.0 {
            return !self.at_rest;
        }
        let mass = config.mass.max(f32::EPSILON);
        let dt = dt_secs.min(MAX_FRAME_SECS);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // bounded by MAX_FRAME_SECS
        let steps = (dt / MAX_STEP_SECS).ceil().max(1.0) as u32;
        #[allow(clippy::cast_precision_loss)]
        let h = dt / steps as f32;
        for _ in 0..steps {
            let displacement = self.value - self.target;
            let accel = (-config.stiffness * displacement - config.damping * self.velocity) / mass;
            // Semi-implicit Euler keeps the oscillator stable at frame rates.
            self.velocity += accel * h;
            self.value += self.velocity * h;
        }
        self.check_rest(config);
        !self.at_rest
    }

    fn check_rest(&mut self, config: &SpringConfig) {
        if (self.value - self.target).abs() < config.rest_displacement
            && self.velocity.abs() < config.rest_speed
        {
            *self = Self::at(self.target);
        }
    }
}
