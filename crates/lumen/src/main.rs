use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use lumen_core::{ConfigManager, EngineSettings, ModuleSettings, Tempo};
use lumen_presets::PresetLibrary;
use serde_json::Value;

mod input;
mod render;

use render::{render_frames, RenderRange};

/// Render MIDI note data through a content module and dump the visual
/// objects of every frame as JSON lines.
#[derive(Parser, Debug)]
#[command(name = "lumen")]
#[command(about = "MIDI to visual object frame renderer")]
struct Args {
    /// Note data: a JSON array of blocks, or a Standard MIDI File (.mid)
    #[arg(short, long, required_unless_present = "list_presets")]
    input: Option<PathBuf>,

    /// Preset to render with
    #[arg(short, long, default_value = "pulse")]
    preset: String,

    /// Tempo in beats per minute (default: the MIDI file's tempo, then the configured default)
    #[arg(long)]
    bpm: Option<f64>,

    /// First beat to render
    #[arg(long, default_value = "0")]
    from: f64,

    /// Beat to stop at, exclusive (default: end of the last block)
    #[arg(long)]
    to: Option<f64>,

    /// Frames per second (default: the configured target)
    #[arg(long)]
    fps: Option<u32>,

    /// Engine settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override a preset setting, KEY=VALUE (VALUE is parsed as JSON, falling back to a string)
    #[arg(long = "set", value_parser = parse_setting)]
    settings: Vec<(String, Value)>,

    /// List the available presets and exit
    #[arg(long)]
    list_presets: bool,
}

fn parse_setting(s: &str) -> Result<(String, Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("Missing key in '{}'", s));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn engine_settings(config: Option<PathBuf>) -> Result<EngineSettings> {
    match config {
        Some(path) => {
            let mut manager = ConfigManager::new(Some(path));
            let path = manager.config_path().display().to_string();
            manager
                .load()
                .with_context(|| format!("Failed to load settings from {}", path))
        }
        None => Ok(EngineSettings::default()),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    let library = PresetLibrary::new();

    if args.list_presets {
        for id in library.ids() {
            if let Some(profile) = library.get(id) {
                println!("{:<12} {}", profile.id, profile.description);
            }
        }
        return Ok(());
    }

    let input_path = args.input.ok_or_else(|| anyhow!("--input is required"))?;
    let profile = library.get(&args.preset).ok_or_else(|| {
        anyhow!(
            "Unknown preset '{}'. Available: {}",
            args.preset,
            library.ids().join(", ")
        )
    })?;

    let settings = engine_settings(args.config)?;
    let loaded = input::load(&input_path)?;

    let bpm = args.bpm.or(loaded.bpm).unwrap_or(settings.default_bpm);
    let tempo = Tempo::with_floor(bpm, settings.min_bpm);
    let range = RenderRange {
        from_beat: args.from,
        to_beat: args.to.unwrap_or_else(|| loaded.end_beat()),
        fps: args.fps.unwrap_or(settings.target_fps),
    };
    if !range.from_beat.is_finite() || !range.to_beat.is_finite() {
        bail!("--from and --to must be finite");
    }
    if range.fps == 0 {
        bail!("--fps must be at least 1");
    }

    let mut overrides = ModuleSettings::new();
    for (key, value) in args.settings {
        overrides.set(key, value);
    }
    let mut module = profile
        .build_with(&overrides)
        .with_context(|| format!("Failed to build preset '{}'", profile.id))?;
    module.set_engine_settings(settings);

    log::info!(
        "Rendering '{}' from beat {} to {} at {} bpm, {} fps",
        profile.id,
        range.from_beat,
        range.to_beat,
        tempo.bpm,
        range.fps
    );

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let frames = render_frames(&mut module, &loaded.blocks, tempo, range, &mut out)?;
    log::info!("Wrote {} frame(s)", frames);

    Ok(())
}
