use std::io::Write;

use anyhow::{Context, Result};
use lumen_core::{ContentModule, MidiBlock, Tempo, VisualObject};
use serde::Serialize;

/// One line of output.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame<'a> {
    pub frame: usize,
    pub time_beats: f64,
    pub objects: &'a [VisualObject],
}

/// Beat range and frame rate of an offline render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderRange {
    pub from_beat: f64,
    pub to_beat: f64,
    pub fps: u32,
}

impl RenderRange {
    /// Frame times in beats: `from_beat` stepped by one frame's worth of
    /// seconds until `to_beat` (exclusive).
    pub fn frame_times(&self, tempo: Tempo) -> impl Iterator<Item = f64> {
        let step = tempo.seconds_to_beats(1.0 / self.fps.max(1) as f64);
        let from = self.from_beat;
        let to = self.to_beat;
        (0u64..)
            .map(move |frame| from + frame as f64 * step)
            .take_while(move |&time| time < to)
    }
}

/// Evaluate `module` at every frame in `range` and write one JSON line per
/// frame. Returns the number of frames written.
pub fn render_frames<W: Write>(
    module: &mut ContentModule,
    blocks: &[MidiBlock],
    tempo: Tempo,
    range: RenderRange,
    out: &mut W,
) -> Result<usize> {
    let mut written = 0;
    for (frame, time_beats) in range.frame_times(tempo).enumerate() {
        let objects = module.evaluate(time_beats, blocks, tempo.bpm);
        let line = Frame {
            frame,
            time_beats,
            objects: &objects,
        };
        serde_json::to_writer(&mut *out, &line).context("Failed to serialize frame")?;
        writeln!(out).context("Failed to write frame")?;
        written += 1;
    }
    out.flush().context("Failed to flush output")?;

    log::debug!("Rendered {} frame(s) of '{}'", written, module.name());
    Ok(written)
}
