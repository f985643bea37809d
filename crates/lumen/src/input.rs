use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use lumen_core::{MidiBlock, MidiNote};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};

/// Note data read from disk, plus the tempo the file asked for (if any).
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedInput {
    pub blocks: Vec<MidiBlock>,
    pub bpm: Option<f64>,
}

impl LoadedInput {
    /// Beat at which the last block ends.
    pub fn end_beat(&self) -> f64 {
        self.blocks.iter().map(|b| b.end_beat).fold(0.0, f64::max)
    }
}

/// Load a JSON array of blocks, or a Standard MIDI File when the extension
/// is `.mid`/`.midi`.
pub fn load(path: &Path) -> Result<LoadedInput> {
    let is_smf = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("mid") || e.eq_ignore_ascii_case("midi"))
        .unwrap_or(false);

    if is_smf {
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("midi")
            .to_string();
        smf_to_input(&id, &bytes)
            .with_context(|| format!("Failed to convert {}", path.display()))
    } else {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let blocks: Vec<MidiBlock> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse blocks in {}", path.display()))?;
        Ok(LoadedInput { blocks, bpm: None })
    }
}

/// Flatten every track of a metrical SMF into one block starting at beat 0.
pub fn smf_to_input(id: &str, bytes: &[u8]) -> Result<LoadedInput> {
    let smf = Smf::parse(bytes).context("Invalid MIDI file")?;
    let ticks_per_beat = match smf.header.timing {
        Timing::Metrical(tpq) => tpq.as_int() as f64,
        Timing::Timecode(..) => bail!("SMPTE timecode MIDI files are not supported"),
    };
    if ticks_per_beat <= 0.0 {
        bail!("MIDI file has zero ticks per beat");
    }

    let mut notes = Vec::new();
    let mut bpm = None;
    let beat = |tick: u64| tick as f64 / ticks_per_beat;

    for (track_index, track) in smf.tracks.iter().enumerate() {
        // (channel, key) -> (start tick, velocity)
        let mut held: HashMap<(u8, u8), (u64, u8)> = HashMap::new();
        let mut tick: u64 = 0;

        for event in track {
            tick += event.delta.as_int() as u64;
            match event.kind {
                TrackEventKind::Midi { channel, message } => {
                    let channel = channel.as_int();
                    match message {
                        MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => {
                            let key = key.as_int();
                            // Retriggering a held key closes the previous note first.
                            let previous = held.insert((channel, key), (tick, vel.as_int()));
                            if let Some((start, velocity)) = previous {
                                let id = note_id(track_index, notes.len());
                                notes.push(note(id, beat(start), beat(tick), key, velocity));
                            }
                        }
                        MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                            let key = key.as_int();
                            if let Some((start, velocity)) = held.remove(&(channel, key)) {
                                let id = note_id(track_index, notes.len());
                                notes.push(note(id, beat(start), beat(tick), key, velocity));
                            }
                        }
                        _ => {}
                    }
                }
                TrackEventKind::Meta(MetaMessage::Tempo(tempo)) if bpm.is_none() => {
                    let micros = tempo.as_int();
                    if micros > 0 {
                        bpm = Some(60_000_000.0 / micros as f64);
                    }
                }
                _ => {}
            }
        }

        let mut dangling: Vec<_> = held.into_iter().collect();
        dangling.sort_by_key(|&((channel, key), (start, _))| (start, channel, key));
        for ((_, key), (start, velocity)) in dangling {
            log::warn!(
                "Note {} in track {} never released, ending it at the end of the track",
                key,
                track_index
            );
            let id = note_id(track_index, notes.len());
            notes.push(note(id, beat(start), beat(tick), key, velocity));
        }
    }

    notes.sort_by(|a, b| a.start_beat.total_cmp(&b.start_beat).then(a.pitch.cmp(&b.pitch)));
    let end_beat = notes
        .iter()
        .map(|n| n.start_beat + n.duration)
        .fold(0.0, f64::max);

    log::info!("Loaded {} note(s) from MIDI file '{}'", notes.len(), id);
    Ok(LoadedInput {
        blocks: vec![MidiBlock::new(id, 0.0, end_beat, notes)],
        bpm,
    })
}

fn note_id(track: usize, index: usize) -> String {
    format!("t{}-n{}", track, index)
}

fn note(id: String, start_beat: f64, end_beat: f64, key: u8, velocity: u8) -> MidiNote {
    MidiNote::new(id, start_beat, (end_beat - start_beat).max(0.0), key, velocity)
}

#[cfg(test)]
mod tests {
    use midly::num::{u15, u24, u28, u4, u7};
    use midly::{Format, Header, Track, TrackEvent};
    use tempfile::TempDir;

    use super::*;

    fn event(delta: u32, kind: TrackEventKind<'static>) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(delta),
            kind,
        }
    }

    fn note_on(key: u8, vel: u8) -> TrackEventKind<'static> {
        TrackEventKind::Midi {
            channel: u4::new(0),
            message: MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(vel),
            },
        }
    }

    fn note_off(key: u8) -> TrackEventKind<'static> {
        TrackEventKind::Midi {
            channel: u4::new(0),
            message: MidiMessage::NoteOff {
                key: u7::new(key),
                vel: u7::new(0),
            },
        }
    }

    fn smf_bytes() -> Vec<u8> {
        let mut smf = Smf::new(Header::new(Format::SingleTrack, Timing::Metrical(u15::new(480))));
        let track: Track<'static> = vec![
            // 100 bpm
            event(0, TrackEventKind::Meta(MetaMessage::Tempo(u24::new(600_000)))),
            event(0, note_on(60, 100)),
            event(480, note_off(60)),
            event(240, note_on(64, 90)),
            // Zero-velocity note-on is a release
            event(240, note_on(64, 0)),
            event(0, note_on(67, 70)),
            event(960, TrackEventKind::Meta(MetaMessage::EndOfTrack)),
        ];
        smf.tracks.push(track);
        let mut bytes = Vec::new();
        smf.write(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn test_smf_becomes_one_block() {
        let input = smf_to_input("song", &smf_bytes()).unwrap();
        assert_eq!(input.bpm, Some(100.0));
        assert_eq!(input.blocks.len(), 1);

        let block = &input.blocks[0];
        assert_eq!(block.id, "song");
        let summary: Vec<_> = block
            .notes
            .iter()
            .map(|n| (n.pitch, n.velocity, n.start_beat, n.duration))
            .collect();
        assert_eq!(
            summary,
            vec![(60, 100, 0.0, 1.0), (64, 90, 1.5, 0.5), (67, 70, 2.0, 2.0)]
        );
        assert_eq!(block.end_beat, 4.0);
        assert_eq!(input.end_beat(), 4.0);
    }

    #[test]
    fn test_loads_json_and_midi_files() {
        let dir = TempDir::new().unwrap();

        let json_path = dir.path().join("notes.json");
        fs::write(
            &json_path,
            r#"[{
                "id": "b1",
                "startBeat": 0,
                "endBeat": 8,
                "notes": [{"id": "n1", "startBeat": 1, "duration": 2, "velocity": 90, "pitch": 62}]
            }]"#,
        )
        .unwrap();
        let from_json = load(&json_path).unwrap();
        assert_eq!(from_json.bpm, None);
        assert_eq!(from_json.blocks[0].notes[0], MidiNote::new("n1", 1.0, 2.0, 62, 90));

        let midi_path = dir.path().join("take.MID");
        fs::write(&midi_path, smf_bytes()).unwrap();
        let from_midi = load(&midi_path).unwrap();
        assert_eq!(from_midi.blocks[0].id, "take");
        assert_eq!(from_midi.blocks[0].notes.len(), 3);
    }

    #[test]
    fn test_bad_input_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{").unwrap();
        assert!(load(&path).is_err());
        assert!(smf_to_input("x", b"not midi").is_err());
        assert!(load(&dir.path().join("missing.mid")).is_err());
    }
}
