// src/host/param.rs

//! Smoothed, range-limited unit parameters.
//!
//! Mirrors the two ways a host parameter can move: an immediate `set_value`
//! (used when an offline graph is configured before rendering) and
//! `set_target_at_time`, a first-order exponential approach used for live
//! edits so magnitude changes never step.

#[derive(Debug, Clone)]
pub struct AudioParam {
    current: f32,
    target: f32,
    /// Per-sample approach coefficient: `current += coeff * (target - current)`.
    coeff: f32,
    min: f32,
    max: f32,
    sample_rate: f32,
}

impl AudioParam {
    pub fn new(value: f32, min: f32, max: f32, sample_rate: f32) -> Self {
        let value = value.clamp(min, max);
        Self {
            current: value,
            target: value,
            coeff: 1.0,
            min,
            max,
            sample_rate,
        }
    }

    /// The value the parameter currently outputs.
    pub fn value(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn range(&self) -> (f32, f32) {
        (self.min, self.max)
    }

    /// Jumps to `value` with no transition.
    pub fn set_value(&mut self, value: f32) {
        let value = self.limit(value);
        self.current = value;
        self.target = value;
        self.coeff = 1.0;
    }

    /// Starts an exponential approach towards `target`; after `time_constant`
    /// seconds roughly 63% of the distance has been covered.
    pub fn set_target_at_time(&mut self, target: f32, time_constant: f32) {
        self.target = self.limit(target);
        self.coeff = if time_constant <= 0.0 {
            1.0
        } else {
            1.0 - (-1.0 / (time_constant * self.sample_rate)).exp()
        };
    }

    pub fn is_settling(&self) -> bool {
        self.current != self.target
    }

    /// Advances one sample and returns the new value (a-rate evaluation).
    #[inline]
    pub fn tick(&mut self) -> f32 {
        if self.current != self.target {
            let next = self.current + self.coeff * (self.target - self.current);
            self.settle_to(next);
        }
        self.current
    }

    /// Advances `frames` samples at once and returns the value reached
    /// (k-rate evaluation, once per render quantum).
    pub fn advance(&mut self, frames: usize) -> f32 {
        if self.current != self.target {
            let remaining = (1.0 - self.coeff).powi(frames as i32);
            let next = self.target + (self.current - self.target) * remaining;
            self.settle_to(next);
        }
        self.current
    }

    /// Moves to `next`, landing on the target once close enough or once an
    /// update is too small to change an `f32` any more.
    fn settle_to(&mut self, next: f32) {
        let close = (self.target - next).abs() <= 1e-6 * self.target.abs().max(1.0);
        if close || next == self.current {
            self.current = self.target;
        } else {
            self.current = next;
        }
    }

    fn limit(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.current;
        }
        value.clamp(self.min, self.max)
    }
}
