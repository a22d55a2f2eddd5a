use std::collections::BTreeMap;
use std::ops::Bound;

use glam::{Quat, Vec3};

use crate::animation::curve::InterpolationCurve;
use crate::math::Transform;
use crate::pose::ModelPose;

/// Frames per second used by keyframe files.
pub const DEFAULT_FRAME_RATE: f32 = 30.0;

/// One bone key. Every translation axis has its own easing curve; rotation
/// shares a single curve.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoneKeyframe {
    pub translation: Vec3,
    pub rotation: Quat,
    pub curve_x: InterpolationCurve,
    pub curve_y: InterpolationCurve,
    pub curve_z: InterpolationCurve,
    pub curve_rotation: InterpolationCurve,
}

impl BoneKeyframe {
    /// A key with linear curves on every channel.
    #[must_use]
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
            curve_x: InterpolationCurve::LINEAR,
            curve_y: InterpolationCurve::LINEAR,
            curve_z: InterpolationCurve::LINEAR,
            curve_rotation: InterpolationCurve::LINEAR,
        }
    }

    #[must_use]
    pub fn with_curves(
        mut self,
        x: InterpolationCurve,
        y: InterpolationCurve,
        z: InterpolationCurve,
        rotation: InterpolationCurve,
    ) -> Self {
        self.curve_x = x;
        self.curve_y = y;
        self.curve_z = z;
        self.curve_rotation = rotation;
        self
    }

    #[inline]
    fn translation_weights(&self, t: f32) -> Vec3 {
        Vec3::new(
            self.curve_x.evaluate(t),
            self.curve_y.evaluate(t),
            self.curve_z.evaluate(t),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MorphKeyframe {
    pub ratio: f32,
    pub curve: InterpolationCurve,
}

impl MorphKeyframe {
    #[must_use]
    pub fn new(ratio: f32) -> Self {
        Self {
            ratio,
            curve: InterpolationCurve::LINEAR,
        }
    }
}

/// Where a fractional frame falls relative to a track's keys.
enum Bracket<'a, K> {
    BeforeFirst { frame: u32, key: &'a K },
    AfterLast(&'a K),
    Between { left: (u32, &'a K), right: (u32, &'a K) },
}

/// Finds the keys around `frame_time`. `None` for an empty track.
fn bracket<K>(track: &BTreeMap<u32, K>, frame_time: f32) -> Option<Bracket<'_, K>> {
    let frame = frame_time as u32;

    let right = track.range((Bound::Excluded(frame), Bound::Unbounded)).next();
    let left = track.range(..=frame).next_back();

    match (left, right) {
        (None, None) => None,
        (None, Some((&f, key))) => Some(Bracket::BeforeFirst { frame: f, key }),
        (Some((_, key)), None) => Some(Bracket::AfterLast(key)),
        (Some((&lf, lk)), Some((&rf, rk))) => Some(Bracket::Between {
            left: (lf, lk),
            right: (rf, rk),
        }),
    }
}

/// A keyframed clip over the bones and morphs of one model.
///
/// Keys are stored per bone / morph in a frame-ordered map. Bones and morphs
/// without keys sample to identity / zero.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixedMotionClip {
    pub name: String,
    pub looping: bool,
    pub frame_rate: f32,

    frame_count: u32,
    bone_tracks: Vec<BTreeMap<u32, BoneKeyframe>>,
    morph_tracks: Vec<BTreeMap<u32, MorphKeyframe>>,
}

impl FixedMotionClip {
    /// Creates an empty clip sized for a model with `bone_count` bones and
    /// `morph_count` morphs.
    #[must_use]
    pub fn new(name: impl Into<String>, bone_count: usize, morph_count: usize) -> Self {
        Self {
            name: name.into(),
            looping: false,
            frame_rate: DEFAULT_FRAME_RATE,
            frame_count: 0,
            bone_tracks: vec![BTreeMap::new(); bone_count],
            morph_tracks: vec![BTreeMap::new(); morph_count],
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

    /// Inserts (or replaces) the key of `bone` at `frame`.
    ///
    /// # Panics
    /// If `bone` is outside the clip's bone range.
    pub fn insert_bone_keyframe(&mut self, bone: usize, frame: u32, key: BoneKeyframe) {
        self.bone_tracks[bone].insert(frame, key);
        self.frame_count = self.frame_count.max(frame);
    }

    /// # Panics
    /// If `morph` is outside the clip's morph range.
    pub fn insert_morph_keyframe(&mut self, morph: usize, frame: u32, key: MorphKeyframe) {
        self.morph_tracks[morph].insert(frame, key);
        self.frame_count = self.frame_count.max(frame);
    }

    /// Index of the last keyed frame; the clip spans `[0, frame_count]`.
    #[inline]
    pub fn frame_count(&self) -> u32 {
        self.frame_count
    }

    #[inline]
    pub fn bone_track(&self, bone: usize) -> &BTreeMap<u32, BoneKeyframe> {
        &self.bone_tracks[bone]
    }

    #[inline]
    pub fn morph_track(&self, morph: usize) -> &BTreeMap<u32, MorphKeyframe> {
        &self.morph_tracks[morph]
    }

    pub fn is_empty(&self) -> bool {
        self.bone_tracks.iter().all(BTreeMap::is_empty) && self.morph_tracks.iter().all(BTreeMap::is_empty)
    }

    /// Length in seconds.
    #[inline]
    pub fn duration(&self) -> f32 {
        self.frame_count as f32 / self.frame_rate
    }

    /// Converts seconds into a fractional frame inside `[0, frame_count]`,
    /// wrapping when looping and clamping otherwise.
    pub fn frame_time(&self, time: f32) -> f32 {
        if self.frame_count == 0 {
            return 0.0;
        }
        let frames = self.frame_count as f32;
        let frame_time = self.frame_rate * time;
        if self.looping {
            frame_time.rem_euclid(frames)
        } else {
            frame_time.clamp(0.0, frames)
        }
    }

    /// Writes the clip's local pose at `time` (seconds) into `pose`.
    ///
    /// Bones and morphs beyond the clip's size are left untouched.
    pub fn sample(&self, time: f32, pose: &mut ModelPose) {
        let frame_time = self.frame_time(time);

        let bones = self.bone_tracks.len().min(pose.bone_count());
        for (bone, track) in self.bone_tracks[..bones].iter().enumerate() {
            let transform = match bracket(track, frame_time) {
                None => Transform::IDENTITY,
                Some(Bracket::BeforeFirst { frame, key }) => {
                    let t = frame_time / frame as f32;
                    Transform::new(
                        key.translation_weights(t) * key.translation,
                        Quat::IDENTITY.slerp(key.rotation, key.curve_rotation.evaluate(t)),
                    )
                }
                Some(Bracket::AfterLast(key)) => Transform::new(key.translation, key.rotation),
                Some(Bracket::Between { left, right }) => {
                    let t = (frame_time - left.0 as f32) / (right.0 - left.0) as f32;
                    let (l, r) = (left.1, right.1);
                    let w = l.translation_weights(t);
                    Transform::new(
                        l.translation + (r.translation - l.translation) * w,
                        l.rotation.slerp(r.rotation, l.curve_rotation.evaluate(t)),
                    )
                }
            };
            pose.set_local_bone_transform(bone, transform);
        }

        let morphs = self.morph_tracks.len().min(pose.morph_count());
        for (morph, track) in self.morph_tracks[..morphs].iter().enumerate() {
            let ratio = match bracket(track, frame_time) {
                None => 0.0,
                Some(Bracket::BeforeFirst { frame, key }) => {
                    key.curve.evaluate(frame_time / frame as f32) * key.ratio
                }
                Some(Bracket::AfterLast(key)) => key.ratio,
                Some(Bracket::Between { left, right }) => {
                    let t = (frame_time - left.0 as f32) / (right.0 - left.0) as f32;
                    let t = left.1.curve.evaluate(t);
                    left.1.ratio + (right.1.ratio - left.1.ratio) * t
                }
            };
            pose.set_morph_ratio(morph, ratio);
        }
    }
}
