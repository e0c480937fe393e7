use glam::{Quat, Vec3};

use crate::animation::values::interpolate_clamped;
use crate::scene::BoneId;
use crate::scene::transform::BoneTransform;

/// One keyframe of a bone track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyFrame {
    pub time: f32,
    pub rotation: Quat,
    pub offset: Vec3,
}

impl KeyFrame {
    #[inline]
    #[must_use]
    pub fn transform(&self) -> BoneTransform {
        BoneTransform::new(self.rotation, self.offset)
    }
}

/// The pair of keyframes surrounding a query time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyFramePair {
    pub before: KeyFrame,
    pub after: KeyFrame,
    /// Normalized position between `before` and `after`.
    pub t: f32,
}

impl KeyFramePair {
    /// Interpolated transform: SLERP for the rotation, lerp for the offset.
    #[must_use]
    pub fn interpolate(&self) -> BoneTransform {
        BoneTransform::new(
            interpolate_clamped(self.before.rotation, self.after.rotation, self.t),
            interpolate_clamped(self.before.offset, self.after.offset, self.t),
        )
    }
}

/// Time-sorted keyframes driving a single bone.
///
/// Stored as parallel arrays; `times` is always ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeTrack {
    pub bone: BoneId,
    times: Vec<f32>,
    rotations: Vec<Quat>,
    offsets: Vec<Vec3>,
}

impl KeyframeTrack {
    #[must_use]
    pub fn new(bone: BoneId) -> Self {
        Self {
            bone,
            times: Vec::new(),
            rotations: Vec::new(),
            offsets: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn times(&self) -> &[f32] {
        &self.times
    }

    /// Time of the last keyframe, or 0 for an empty track.
    #[inline]
    #[must_use]
    pub fn end_time(&self) -> f32 {
        self.times.last().copied().unwrap_or(0.0)
    }

    #[inline]
    #[must_use]
    pub fn keyframe(&self, index: usize) -> KeyFrame {
        KeyFrame {
            time: self.times[index],
            rotation: self.rotations[index],
            offset: self.offsets[index],
        }
    }

    /// Inserts a keyframe keeping the track sorted. Frames with equal times
    /// keep their insertion order. Returns the index of the new frame.
    pub fn insert(&mut self, time: f32, rotation: Quat, offset: Vec3) -> usize {
        let index = self.times.partition_point(|&t| t <= time);
        self.times.insert(index, time);
        self.rotations.insert(index, rotation);
        self.offsets.insert(index, offset);
        index
    }

    pub fn set(&mut self, index: usize, rotation: Quat, offset: Vec3) {
        self.rotations[index] = rotation;
        self.offsets[index] = offset;
    }

    pub fn set_rotation(&mut self, index: usize, rotation: Quat) {
        self.rotations[index] = rotation;
    }

    pub fn set_offset(&mut self, index: usize, offset: Vec3) {
        self.offsets[index] = offset;
    }

    /// Index of a keyframe whose time is exactly `time`.
    #[must_use]
    pub fn find_exact(&self, time: f32) -> Option<usize> {
        let index = self.times.partition_point(|&t| t < time);
        (self.times.get(index) == Some(&time)).then_some(index)
    }

    /// Applies `f` to every keyframe's (rotation, offset).
    pub fn map_frames(&mut self, mut f: impl FnMut(Quat, Vec3) -> (Quat, Vec3)) {
        for (rotation, offset) in self.rotations.iter_mut().zip(self.offsets.iter_mut()) {
            (*rotation, *offset) = f(*rotation, *offset);
        }
    }

    /// Finds the keyframes bracketing `time`.
    ///
    /// `before` is the last keyframe at or before `time`; when `time`
    /// precedes every keyframe it falls back to the last keyframe. `after`
    /// is the next keyframe, wrapping to the first when `cyclic` (the wrap
    /// interval spans `duration`) and clamping to `before` otherwise.
    ///
    /// Returns `None` for an empty track.
    #[must_use]
    pub fn bracket(&self, time: f32, duration: f32, cyclic: bool) -> Option<KeyFramePair> {
        let len = self.times.len();
        if len == 0 {
            return None;
        }

        let next = self.times.partition_point(|&t| t <= time);
        let before = if next == 0 { len - 1 } else { next - 1 };
        let after = if before + 1 < len {
            before + 1
        } else if cyclic {
            0
        } else {
            before
        };

        let t_before = self.times[before];
        let t = if after == before {
            0.0
        } else if after > before {
            let span = self.times[after] - t_before;
            if span > 0.0 { (time - t_before) / span } else { 0.0 }
        } else {
            // Wrap interval: last keyframe -> end of clip -> first keyframe
            let span = self.times[after] + duration - t_before;
            let elapsed = if time >= t_before {
                time - t_before
            } else {
                time + duration - t_before
            };
            if span > 0.0 { elapsed / span } else { 0.0 }
        };

        Some(KeyFramePair {
            before: self.keyframe(before),
            after: self.keyframe(after),
            t,
        })
    }

    /// Samples the track at `time`.
    #[must_use]
    pub fn sample(&self, time: f32, duration: f32, cyclic: bool) -> Option<BoneTransform> {
        self.bracket(time, duration, cyclic).map(|pair| pair.interpolate())
    }
}
