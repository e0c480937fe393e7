use glam::{Quat, Vec3};

use crate::animation::tracks::{KeyFrame, KeyFramePair, KeyframeTrack};
use crate::scene::hierarchy::BoneHierarchy;
use crate::scene::pose::SkeletalPose;
use crate::scene::BoneId;

/// Identifier of a channel (bone track) within a clip.
pub type ChannelId = usize;

/// A keyframed skeletal animation: one [`KeyframeTrack`] per animated bone.
///
/// Keyframes are deltas against the skeleton's rest pose ("bind space").
/// Data authored as plain bone-space transforms can be flagged with
/// [`AnimationClip::set_frames_in_bind_space`] and converted with
/// [`AnimationClip::convert_frame_space`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    duration: f32,
    channels: Vec<KeyframeTrack>,
    frames_in_bind_space: bool,
}

impl AnimationClip {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            duration: 0.0,
            channels: Vec::new(),
            frames_in_bind_space: true,
        }
    }

    /// Largest keyframe time over all channels.
    #[inline]
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.duration
    }

    // ========================================================================
    // Channels
    // ========================================================================

    /// Adds a channel for `bone`, or returns the existing one.
    pub fn add_channel(&mut self, bone: BoneId) -> ChannelId {
        if let Some(existing) = self.find_channel(bone) {
            return existing;
        }
        self.channels.push(KeyframeTrack::new(bone));
        self.channels.len() - 1
    }

    #[must_use]
    pub fn find_channel(&self, bone: BoneId) -> Option<ChannelId> {
        self.channels.iter().position(|c| c.bone == bone)
    }

    #[inline]
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    #[must_use]
    pub fn channel(&self, channel: ChannelId) -> &KeyframeTrack {
        &self.channels[channel]
    }

    #[inline]
    #[must_use]
    pub fn channel_bone(&self, channel: ChannelId) -> BoneId {
        self.channels[channel].bone
    }

    pub fn set_channel_bone(&mut self, channel: ChannelId, bone: BoneId) {
        self.channels[channel].bone = bone;
    }

    /// Removes a channel. Later channel ids shift down by one.
    pub fn remove_channel(&mut self, channel: ChannelId) {
        self.channels.remove(channel);
        self.recompute_duration();
    }

    // ========================================================================
    // Keyframes
    // ========================================================================

    /// Inserts a keyframe in time order and extends the duration if needed.
    pub fn add_keyframe(&mut self, channel: ChannelId, time: f32, rotation: Quat, offset: Vec3) {
        self.channels[channel].insert(time, rotation, offset);
        if time > self.duration {
            self.duration = time;
        }
    }

    #[inline]
    #[must_use]
    pub fn keyframe_count(&self, channel: ChannelId) -> usize {
        self.channels[channel].len()
    }

    #[inline]
    #[must_use]
    pub fn keyframe(&self, channel: ChannelId, keyframe: usize) -> KeyFrame {
        self.channels[channel].keyframe(keyframe)
    }

    pub fn set_keyframe(&mut self, channel: ChannelId, keyframe: usize, rotation: Quat, offset: Vec3) {
        self.channels[channel].set(keyframe, rotation, offset);
    }

    /// The keyframes surrounding `time` on a channel (non-cyclic lookup).
    #[must_use]
    pub fn two_keyframes(&self, channel: ChannelId, time: f32) -> Option<KeyFramePair> {
        self.channels[channel].bracket(time, self.duration, false)
    }

    /// Sets the rotation of the keyframe at exactly `time`, or inserts a new
    /// keyframe whose offset is interpolated from its neighbours.
    pub fn add_or_set_keyframe_rotation(&mut self, channel: ChannelId, time: f32, rotation: Quat) {
        let track = &mut self.channels[channel];
        if let Some(index) = track.find_exact(time) {
            track.set_rotation(index, rotation);
            return;
        }
        let offset = track
            .sample(time, self.duration, false)
            .map_or(Vec3::ZERO, |s| s.offset);
        self.add_keyframe(channel, time, rotation, offset);
    }

    /// Sets the offset of the keyframe at exactly `time`, or inserts a new
    /// keyframe whose rotation is interpolated from its neighbours.
    pub fn add_or_set_keyframe_offset(&mut self, channel: ChannelId, time: f32, offset: Vec3) {
        let track = &mut self.channels[channel];
        if let Some(index) = track.find_exact(time) {
            track.set_offset(index, offset);
            return;
        }
        let rotation = track
            .sample(time, self.duration, false)
            .map_or(Quat::IDENTITY, |s| s.rotation);
        self.add_keyframe(channel, time, rotation, offset);
    }

    // ========================================================================
    // Frame space
    // ========================================================================

    #[inline]
    #[must_use]
    pub fn frames_in_bind_space(&self) -> bool {
        self.frames_in_bind_space
    }

    pub fn set_frames_in_bind_space(&mut self, bind_space: bool) {
        self.frames_in_bind_space = bind_space;
    }

    /// Rewrites bone-space keyframes as deltas against the hierarchy's rest
    /// pose: `rotation' = rest.rotation⁻¹ * rotation`,
    /// `offset' = offset - rest.offset`.
    ///
    /// Channels whose bone does not exist in `hierarchy` are left untouched.
    pub fn convert_frame_space(&mut self, hierarchy: &BoneHierarchy) {
        if self.frames_in_bind_space {
            return;
        }

        for track in &mut self.channels {
            if !hierarchy.has_bone(track.bone) {
                log::warn!(
                    "Clip '{}': channel bone {} not in hierarchy, left in bone space",
                    self.name,
                    track.bone
                );
                continue;
            }
            let rest = hierarchy.transform_bone_space(track.bone);
            let inv_rotation = rest.rotation.conjugate();
            track.map_frames(|rotation, offset| (inv_rotation * rotation, offset - rest.offset));
        }

        self.frames_in_bind_space = true;
    }

    // ========================================================================
    // Evaluation
    // ========================================================================

    /// Samples every channel at `time` and blends the result into `pose`
    /// with `base_weight`.
    pub fn blend_state(&self, pose: &mut SkeletalPose, base_weight: f32, time: f32, cyclic: bool) {
        for track in &self.channels {
            if track.bone >= pose.bone_count() {
                log::trace!("Clip '{}': bone {} outside pose, skipped", self.name, track.bone);
                continue;
            }
            if let Some(sample) = track.sample(time, self.duration, cyclic) {
                pose.blend_bone(track.bone, sample, base_weight);
            }
        }
    }

    fn recompute_duration(&mut self) {
        self.duration = self
            .channels
            .iter()
            .map(KeyframeTrack::end_time)
            .fold(0.0_f32, f32::max);
    }
}
