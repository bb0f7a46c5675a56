// pico-retro/src/core/frameskip.rs

//! Frameskip policy driven by the host's audio buffer status.

/// Maximum number of consecutive frames that can be skipped.
pub const FRAMESKIP_MAX: u16 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameskipMode {
    #[default]
    Disabled,
    /// Skip when the host predicts an audio underrun.
    Auto,
    /// Skip when buffer occupancy drops below the threshold.
    Manual,
}

/// Last audio buffer report from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioBufferStatus {
    pub active: bool,
    /// Occupancy in percent.
    pub occupancy: u32,
    pub underrun_likely: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Frameskip {
    pub mode: FrameskipMode,
    pub threshold: u32,
    counter: u16,
    status: AudioBufferStatus,
    audio_latency: u32,
    latency_dirty: bool,
}

impl Frameskip {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counter(&self) -> u16 {
        self.counter
    }

    pub fn audio_latency(&self) -> u32 {
        self.audio_latency
    }

    pub fn set_buffer_status(&mut self, status: AudioBufferStatus) {
        self.status = status;
    }

    /// Called once the host accepted (or refused) buffer status reports.
    ///
    /// When frameskip is on, latency is raised to six frame times rounded up to
    /// a multiple of 32ms so skips are less likely to underrun.
    pub fn configure(&mut self, status_supported: bool, pal: bool) {
        if self.mode != FrameskipMode::Disabled && status_supported {
            let frame_time_ms = 1000.0f32 / if pal { 50.0 } else { 60.0 };
            let latency = (6.0 * frame_time_ms + 0.5) as u32;
            self.audio_latency = (latency + 0x1F) & !0x1F;
        } else {
            self.status = AudioBufferStatus::default();
            self.audio_latency = 0;
        }
        self.latency_dirty = true;
    }

    /// Pending latency update for the host, reported once.
    pub fn take_latency_update(&mut self) -> Option<u32> {
        if self.latency_dirty {
            self.latency_dirty = false;
            Some(self.audio_latency)
        } else {
            None
        }
    }

    /// Decide whether the coming frame is rendered.
    pub fn should_skip(&mut self) -> bool {
        if self.mode == FrameskipMode::Disabled || !self.status.active {
            return false;
        }

        let skip = match self.mode {
            FrameskipMode::Auto => self.status.underrun_likely,
            FrameskipMode::Manual => self.status.occupancy < self.threshold,
            FrameskipMode::Disabled => false,
        };

        if !skip || self.counter >= FRAMESKIP_MAX {
            self.counter = 0;
            false
        } else {
            self.counter += 1;
            true
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
