use serde::{Deserialize, Serialize};

/// Lowest tempo the engine will convert with. Anything below is treated as
/// this value so beat/second conversion never divides by zero.
pub const MIN_BPM: f64 = 1.0;

/// Tempo used to convert between beats and seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tempo {
    pub bpm: f64,
}

impl Tempo {
    pub fn new(bpm: f64) -> Self {
        Self::with_floor(bpm, MIN_BPM)
    }

    /// Build a tempo, clamping `bpm` to at least `min_bpm` (and `MIN_BPM` if
    /// that is not a usable floor either).
    pub fn with_floor(bpm: f64, min_bpm: f64) -> Self {
        let floor = if min_bpm.is_finite() && min_bpm > 0.0 {
            min_bpm
        } else {
            MIN_BPM
        };
        let bpm = if bpm.is_finite() { bpm.max(floor) } else { floor };
        Self { bpm }
    }

    pub fn seconds_per_beat(&self) -> f64 {
        60.0 / self.bpm
    }

    pub fn beats_to_seconds(&self, beats: f64) -> f64 {
        beats * self.seconds_per_beat()
    }

    pub fn seconds_to_beats(&self, seconds: f64) -> f64 {
        seconds / self.seconds_per_beat()
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self { bpm: 120.0 }
    }
}
