//! First-order exponential smoothing of control signals

use std::ops::{Add, Mul, Sub};

use glam::{Vec2, Vec3};

use super::signals::SignalSet;
use crate::config::TrackingTuning;

/// Values that can be eased toward a target
pub trait Smoothable:
    Copy + Add<Output = Self> + Sub<Output = Self> + Mul<f32, Output = Self>
{
}

impl Smoothable for f32 {}
impl Smoothable for Vec2 {}
impl Smoothable for Vec3 {}

/// `current + (target - current) * alpha`
///
/// Stable and non-overshooting for `0 < alpha < 1`.
#[inline]
pub fn exp_smooth<T: Smoothable>(current: T, target: T, alpha: f32) -> T {
    current + (target - current) * alpha
}

/// Smoothing factors for the two signal families
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothingProfile {
    pub position_alpha: f32,
    pub rotation_alpha: f32,
}

impl Default for SmoothingProfile {
    fn default() -> Self {
        Self {
            position_alpha: 0.15,
            rotation_alpha: 0.1,
        }
    }
}

impl From<&TrackingTuning> for SmoothingProfile {
    fn from(tuning: &TrackingTuning) -> Self {
        Self {
            position_alpha: tuning.position_alpha,
            rotation_alpha: tuning.rotation_alpha,
        }
    }
}

/// Advance every signal one step. Runs every tick, whether or not targets moved.
pub fn smooth_signals(signals: &mut SignalSet, profile: &SmoothingProfile) {
    let p = profile.position_alpha;
    signals.mouth.advance(p);
    signals.head.advance(p);
    signals.top_of_head.advance(p);
    signals.left_pointer.advance(p);
    signals.right_pointer.advance(p);

    let r = profile.rotation_alpha;
    signals.left_rotation.advance(r);
    signals.right_rotation.advance(r);
}
