/// Outcome of advancing a [`ClipPlaybackCursor`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStep {
    /// Number of times a cyclic cursor wrapped around.
    pub cycles: u32,
    /// A non-cyclic cursor reached the end (or the start, when reversed).
    pub finished: bool,
}

/// Per-instance playback state of a clip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipPlaybackCursor {
    pub position: f32,
    pub speed: f32,
    pub playing: bool,
    pub cyclic: bool,
}

impl Default for ClipPlaybackCursor {
    fn default() -> Self {
        Self {
            position: 0.0,
            speed: 1.0,
            playing: false,
            cyclic: false,
        }
    }
}

impl ClipPlaybackCursor {
    #[must_use]
    pub fn new(speed: f32, cyclic: bool) -> Self {
        Self {
            speed,
            cyclic,
            ..Default::default()
        }
    }

    /// Core logic: advance time.
    ///
    /// Cyclic playback stays within `[0, duration)`. Non-cyclic playback
    /// clamps at the end (or the start for negative speeds) and reports
    /// `finished`; stopping is left to the caller.
    pub fn advance(&mut self, dt: f32, duration: f32) -> PlaybackStep {
        let mut step = PlaybackStep::default();
        if !self.playing {
            return step;
        }

        if duration <= 0.0 {
            // Nothing to play through; a one-shot clip finishes immediately
            if !self.cyclic {
                self.position = 0.0;
                step.finished = true;
            }
            return step;
        }

        // 1. Accumulate time
        self.position += dt * self.speed;

        // 2. Handle wrap / clamp
        if self.cyclic {
            // `as` saturates on huge steps
            step.cycles = (self.position / duration).floor().abs() as u32;
            self.position = self.position.rem_euclid(duration);
            // -ε + duration can round up to duration
            if self.position >= duration {
                self.position = 0.0;
            }
        } else if self.position >= duration {
            self.position = duration;
            step.finished = true;
        } else if self.position < 0.0 {
            self.position = 0.0;
            step.finished = true;
        }

        step
    }
}
