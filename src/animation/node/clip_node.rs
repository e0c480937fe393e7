use std::sync::Arc;

use smallvec::SmallVec;

use crate::animation::clip::AnimationClip;
use crate::animation::node::AnimationEvent;
use crate::animation::playback::ClipPlaybackCursor;
use crate::scene::pose::SkeletalPose;

/// Leaf node playing one keyframe clip.
///
/// The clip data is shared with the packet factory; only the playback cursor
/// belongs to the node.
#[derive(Debug, Clone)]
pub struct ClipNode {
    clip: Arc<AnimationClip>,
    cursor: ClipPlaybackCursor,
    default_speed: f32,
    automatic_reset: bool,
    automatic_stop: bool,
    /// `Finished` was already raised for the current play-through.
    end_reported: bool,
}

impl ClipNode {
    #[must_use]
    pub fn new(clip: Arc<AnimationClip>, cyclic: bool, speed: f32) -> Self {
        if !clip.frames_in_bind_space() {
            log::warn!(
                "Clip '{}' keyframes are in bone space; convert them to bind space before playback",
                clip.name
            );
        }
        Self {
            clip,
            cursor: ClipPlaybackCursor::new(speed, cyclic),
            default_speed: speed,
            automatic_reset: false,
            automatic_stop: true,
            end_reported: false,
        }
    }

    #[must_use]
    pub fn with_automatic_reset(mut self, automatic_reset: bool) -> Self {
        self.automatic_reset = automatic_reset;
        self
    }

    #[must_use]
    pub fn with_automatic_stop(mut self, automatic_stop: bool) -> Self {
        self.automatic_stop = automatic_stop;
        self
    }

    #[inline]
    #[must_use]
    pub fn clip(&self) -> &Arc<AnimationClip> {
        &self.clip
    }

    #[inline]
    #[must_use]
    pub fn is_cyclic(&self) -> bool {
        self.cursor.cyclic
    }

    #[inline]
    #[must_use]
    pub fn automatic_reset(&self) -> bool {
        self.automatic_reset
    }

    #[inline]
    #[must_use]
    pub fn automatic_stop(&self) -> bool {
        self.automatic_stop
    }

    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.cursor.playing
    }

    #[inline]
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.clip.duration()
    }

    #[inline]
    #[must_use]
    pub fn playback_position(&self) -> f32 {
        self.cursor.position
    }

    #[inline]
    #[must_use]
    pub fn playback_speed(&self) -> f32 {
        self.cursor.speed
    }

    pub fn set_playback_speed(&mut self, speed: f32) {
        self.cursor.speed = speed;
    }

    /// Starts playback. Does nothing if the clip is already playing.
    pub(crate) fn play(&mut self) -> Option<AnimationEvent> {
        if self.cursor.playing {
            return None;
        }
        if self.automatic_reset {
            self.rewind();
        }
        self.cursor.playing = true;
        self.end_reported = false;
        Some(AnimationEvent::PlayStateChanged(true))
    }

    pub(crate) fn stop(&mut self) -> Option<AnimationEvent> {
        if !self.cursor.playing {
            return None;
        }
        self.cursor.playing = false;
        Some(AnimationEvent::PlayStateChanged(false))
    }

    /// Back to the start with the configured speed. Play state is kept.
    pub(crate) fn reset(&mut self) {
        self.cursor.speed = self.default_speed;
        self.rewind();
    }

    pub(crate) fn set_playback_position(&mut self, time: f32) {
        let duration = self.duration();
        self.cursor.position = if duration <= 0.0 {
            0.0
        } else if self.cursor.cyclic {
            let wrapped = time.rem_euclid(duration);
            if wrapped >= duration { 0.0 } else { wrapped }
        } else {
            time.clamp(0.0, duration)
        };
        self.end_reported = false;
    }

    pub(crate) fn tick(&mut self, dt: f32) -> SmallVec<[AnimationEvent; 2]> {
        let mut events = SmallVec::new();
        if !self.cursor.playing {
            return events;
        }

        let duration = self.duration();
        let step = self.cursor.advance(dt, duration);

        if step.cycles > 0 {
            events.push(AnimationEvent::Cycled);
        }

        if step.finished && !self.end_reported {
            if duration <= 0.0 {
                log::warn!("Clip '{}' has no keyframes, finishing immediately", self.clip.name);
            }
            self.end_reported = true;
            events.push(AnimationEvent::Finished);
            if self.automatic_stop {
                self.cursor.playing = false;
                events.push(AnimationEvent::PlayStateChanged(false));
            }
        }

        events
    }

    pub(crate) fn blend_state(&self, pose: &mut SkeletalPose, weight: f32) {
        self.clip
            .blend_state(pose, weight, self.cursor.position, self.cursor.cyclic);
    }

    fn rewind(&mut self) {
        // Reversed clips start from the end
        self.cursor.position = if self.cursor.speed < 0.0 && !self.cursor.cyclic {
            self.duration()
        } else {
            0.0
        };
        self.end_reported = false;
    }
}
