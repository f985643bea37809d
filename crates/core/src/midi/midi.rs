use serde::{Deserialize, Serialize};

use crate::rhythm::rhythm::Tempo;

/// A single note event inside a block. Timing is expressed in beats relative
/// to the owning block's start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MidiNote {
    pub id: String,
    pub start_beat: f64,
    pub duration: f64,
    pub velocity: u8, // 0-127
    pub pitch: u8,    // 0-127
}

impl MidiNote {
    pub fn new(
        id: impl Into<String>,
        start_beat: f64,
        duration: f64,
        pitch: u8,
        velocity: u8,
    ) -> Self {
        Self {
            id: id.into(),
            start_beat,
            duration,
            velocity: velocity.min(127),
            pitch: pitch.min(127),
        }
    }

    /// Velocity scaled to 0.0..=1.0
    pub fn velocity_unit(&self) -> f64 {
        self.velocity.min(127) as f64 / 127.0
    }
}

/// A group of notes sharing a time offset (a clip on the timeline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MidiBlock {
    pub id: String,
    pub start_beat: f64,
    pub end_beat: f64,
    #[serde(default)]
    pub notes: Vec<MidiNote>,
}

impl MidiBlock {
    pub fn new(
        id: impl Into<String>,
        start_beat: f64,
        end_beat: f64,
        notes: Vec<MidiNote>,
    ) -> Self {
        Self {
            id: id.into(),
            start_beat,
            end_beat,
            notes,
        }
    }

    /// Absolute timing of one of this block's notes.
    pub fn note_timing(&self, note: &MidiNote, tempo: Tempo) -> NoteTiming {
        let start_beat = self.start_beat + note.start_beat;
        let end_beat = start_beat + note.duration.max(0.0);
        NoteTiming {
            start_beat,
            end_beat,
            start_time: tempo.beats_to_seconds(start_beat),
            end_time: tempo.beats_to_seconds(end_beat),
        }
    }
}

/// Absolute start/end of a note, in beats and seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteTiming {
    pub start_beat: f64,
    pub end_beat: f64,
    pub start_time: f64,
    pub end_time: f64,
}

impl NoteTiming {
    pub fn duration(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }
}
