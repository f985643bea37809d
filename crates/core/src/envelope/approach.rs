use serde::{Deserialize, Serialize};

/// Pre-trigger window: objects may start animating `lookahead` seconds
/// before their note sounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ApproachEnvelopeConfig {
    pub lookahead: f64,
}

impl ApproachEnvelopeConfig {
    pub fn new(lookahead: f64) -> Self {
        Self { lookahead }
    }

    /// Lookahead with negative/NaN values treated as no window at all.
    pub fn effective_lookahead(&self) -> f64 {
        if self.lookahead.is_finite() {
            self.lookahead.max(0.0)
        } else {
            0.0
        }
    }

    /// Time at which the window opens for a note starting at `note_start`.
    pub fn window_start(&self, note_start: f64) -> f64 {
        note_start - self.effective_lookahead()
    }
}

/// Seconds remaining until `note_start` while `time` is inside
/// `[note_start - lookahead, note_start)`, otherwise `None`.
pub fn calculate_approach(
    time: f64,
    note_start: f64,
    config: &ApproachEnvelopeConfig,
) -> Option<f64> {
    let lookahead = config.effective_lookahead();
    if lookahead <= 0.0 || !time.is_finite() {
        return None;
    }
    if time >= note_start - lookahead && time < note_start {
        Some(note_start - time)
    } else {
        None
    }
}
