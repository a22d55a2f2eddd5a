use std::collections::BTreeMap;

use glam::{Quat, Vec3};

use crate::animation::clip::DEFAULT_FRAME_RATE;
use crate::animation::curve::InterpolationCurve;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Projection {
    #[default]
    Perspective,
    Orthographic,
}

/// Orbit camera parameters produced by a [`CameraMotion`].
///
/// The eye sits `distance` away from `target` along the direction given by
/// `rotation`. `fov` is the vertical field of view in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CameraState {
    pub distance: f32,
    pub target: Vec3,
    pub rotation: Quat,
    pub fov: f32,
    pub projection: Projection,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            distance: 0.0,
            target: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            fov: 45f32.to_radians(),
            projection: Projection::Perspective,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CameraKeyframe {
    pub state: CameraState,
    pub curve_distance: InterpolationCurve,
    pub curve_target_x: InterpolationCurve,
    pub curve_target_y: InterpolationCurve,
    pub curve_target_z: InterpolationCurve,
    pub curve_rotation: InterpolationCurve,
    pub curve_fov: InterpolationCurve,
}

impl CameraKeyframe {
    #[must_use]
    pub fn new(state: CameraState) -> Self {
        Self {
            state,
            curve_distance: InterpolationCurve::LINEAR,
            curve_target_x: InterpolationCurve::LINEAR,
            curve_target_y: InterpolationCurve::LINEAR,
            curve_target_z: InterpolationCurve::LINEAR,
            curve_rotation: InterpolationCurve::LINEAR,
            curve_fov: InterpolationCurve::LINEAR,
        }
    }
}

/// Keyframed camera track. Sampling follows [`FixedMotionClip`] except that
/// keys before the first one yield the default camera and the projection
/// mode is taken from the left key instead of being interpolated.
///
/// [`FixedMotionClip`]: crate::animation::FixedMotionClip
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CameraMotion {
    pub looping: bool,
    pub frame_rate: f32,
    frame_count: u32,
    keys: BTreeMap<u32, CameraKeyframe>,
}

impl Default for CameraMotion {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraMotion {
    #[must_use]
    pub fn new() -> Self {
        Self {
            looping: false,
            frame_rate: DEFAULT_FRAME_RATE,
            frame_count: 0,
            keys: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_loop(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    #[must_use]
    pub fn with_frame_rate(mut self, frame_rate: f32) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn insert_keyframe(&mut self, frame: u32, key: CameraKeyframe) {
        self.keys.insert(frame, key);
        self.frame_count = self.frame_count.max(frame);
    }

    #[inline]
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    #[inline]
    pub fn duration(&self) -> f32 {
        self.frame_count as f32 / self.frame_rate
    }

    /// Camera state at `time` seconds. An empty track yields the default
    /// camera.
    pub fn sample(&self, time: f32) -> CameraState {
        let frame_time = if self.frame_count == 0 {
            0.0
        } else if self.looping {
            (self.frame_rate * time).rem_euclid(self.frame_count as f32)
        } else {
            (self.frame_rate * time).clamp(0.0, self.frame_count as f32)
        };
        let frame = frame_time as u32;

        let Some((&right_frame, right)) = self.keys.range(frame + 1..).next() else {
            return self.keys.values().next_back().map_or_else(CameraState::default, |k| k.state);
        };
        let Some((&left_frame, left)) = self.keys.range(..=frame).next_back() else {
            return CameraState::default();
        };

        let t = (frame_time - left_frame as f32) / (right_frame - left_frame) as f32;
        let (l, r) = (&left.state, &right.state);

        let td = left.curve_distance.evaluate(t);
        let tt = Vec3::new(
            left.curve_target_x.evaluate(t),
            left.curve_target_y.evaluate(t),
            left.curve_target_z.evaluate(t),
        );
        let tr = left.curve_rotation.evaluate(t);
        let tf = left.curve_fov.evaluate(t);

        CameraState {
            distance: l.distance + (r.distance - l.distance) * td,
            target: l.target + (r.target - l.target) * tt,
            rotation: l.rotation.slerp(r.rotation, tr),
            fov: l.fov + (r.fov - l.fov) * tf,
            projection: l.projection,
        }
    }
}
