//! Automation tracks
//!
//! A track is a time-sorted list of points for one parameter. Points that
//! share a timestamp are all kept, in insertion order.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AutomationPoint {
    pub time_ms: u64,
    pub value: f32,
}

impl AutomationPoint {
    pub fn new(time_ms: u64, value: f32) -> Self {
        Self { time_ms, value }
    }
}

/// How values between two points are computed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Interpolation {
    #[default]
    Linear,
    /// Smoothstep easing between points
    Smooth,
    /// Hold the earlier value until the midpoint, then jump
    Step,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AutomationTrack {
    points: Vec<AutomationPoint>,
    interpolation: Interpolation,
}

impl AutomationTrack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[AutomationPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.interpolation = interpolation;
    }

    /// Insert after every point with the same or an earlier timestamp
    pub fn insert(&mut self, point: AutomationPoint) {
        let idx = self.points.partition_point(|p| p.time_ms <= point.time_ms);
        self.points.insert(idx, point);
    }

    /// Remove every point at exactly `time_ms`. Returns how many were removed.
    pub fn remove_at(&mut self, time_ms: u64) -> usize {
        let before = self.points.len();
        self.points.retain(|p| p.time_ms != time_ms);
        before - self.points.len()
    }

    /// Change the value of the first point at `time_ms`
    pub fn update_value(&mut self, time_ms: u64, value: f32) -> bool {
        match self.points.iter_mut().find(|p| p.time_ms == time_ms) {
            Some(point) => {
                point.value = value;
                true
            }
            None => false,
        }
    }

    /// Move the first point at `from_ms` to `to_ms`, keeping order
    pub fn move_point(&mut self, from_ms: u64, to_ms: u64) -> bool {
        let Some(idx) = self.points.iter().position(|p| p.time_ms == from_ms) else {
            return false;
        };
        let mut point = self.points.remove(idx);
        point.time_ms = to_ms;
        self.insert(point);
        true
    }

    pub fn scale_values(&mut self, factor: f32) {
        for point in self.points.iter_mut() {
            point.value *= factor;
        }
    }

    /// Shift every point by `delta_ms`, clamping at zero
    pub fn shift_times(&mut self, delta_ms: i64) {
        for point in self.points.iter_mut() {
            point.time_ms = (point.time_ms as i64).saturating_add(delta_ms).max(0) as u64;
        }
    }

    /// Value at `position_ms`
    ///
    /// Returns `None` if the track has no points. Before the first point the
    /// first value is held; at or after the last point the last value is
    /// held. In between, the last point at or before the position and the
    /// first point after it are interpolated.
    ///
    /// Positions are unsigned, so a time before zero cannot be asked for; the
    /// left clamp applies to any position ahead of the first point.
    pub fn value_at(&self, position_ms: u64) -> Option<f32> {
        let first = self.points.first()?;
        let after_idx = self.points.partition_point(|p| p.time_ms <= position_ms);
        if after_idx == 0 {
            return Some(first.value);
        }
        let before = &self.points[after_idx - 1];
        let Some(after) = self.points.get(after_idx) else {
            return Some(before.value);
        };

        // after.time_ms > position_ms >= before.time_ms
        let span = (after.time_ms - before.time_ms) as f32;
        let frac = (position_ms - before.time_ms) as f32 / span;
        Some(interpolate(before.value, after.value, frac, self.interpolation))
    }
}

fn interpolate(a: f32, b: f32, frac: f32, interpolation: Interpolation) -> f32 {
    match interpolation {
        Interpolation::Linear => lerp(a, b, frac),
        Interpolation::Smooth => lerp(a, b, frac * frac * (3.0 - 2.0 * frac)),
        Interpolation::Step => {
            if frac < 0.5 {
                a
            } else {
                b
            }
        }
    }
}

fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}
