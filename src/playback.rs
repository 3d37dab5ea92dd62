use std::time::Duration;

pub const MIN_SPEED: u32 = 1;
pub const MAX_SPEED: u32 = 10;

/// Play/pause flag and speed setting. The scheduler owns the timer; this only hands out the
/// delay it should wait between ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct Playback {
    playing: bool,
    speed: u32,
}

impl Playback {
    pub fn new(speed: u32) -> Self {
        Self {
            playing: false,
            speed: speed.clamp(MIN_SPEED, MAX_SPEED),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    /// Clamped to `1..=10`.
    pub fn set_speed(&mut self, speed: u32) {
        self.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
    }

    /// `1100 - 100 * speed` milliseconds: 1s at speed 1, 100ms at speed 10.
    pub fn frame_delay(&self) -> Duration {
        Duration::from_millis(u64::from(1100 - 100 * self.speed))
    }
}

impl Default for Playback {
    fn default() -> Self {
        Self::new(6)
    }
}
