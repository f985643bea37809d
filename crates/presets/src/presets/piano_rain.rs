use lumen_core::{
    define_object, AdsrConfig, ApproachEnvelopeConfig, DefinitionError, Emissive, EnvelopePhase,
    ModuleSettings, ObjectDefinition, Scale,
};

use super::{key_x, pitch_color};

pub fn default_settings() -> ModuleSettings {
    ModuleSettings::new()
        .with("spread", 0.3)
        .with("fall_time", 1.0)
        .with("fall_height", 4.0)
        .with("bar_length", 0.5)
        .with("glow_color", "#fff4d6")
        .with("release", 0.25)
}

pub fn definitions() -> Result<Vec<ObjectDefinition>, DefinitionError> {
    let bar = define_object("bar")
        .with_position(|ctx, settings| {
            let x = key_x(ctx.note.pitch, settings.number("spread", 0.3));
            // Height above the key shrinks linearly to zero as the note arrives.
            let y = match ctx.time_until_note_start {
                Some(remaining) => {
                    let fall_time = settings.number("fall_time", 1.0).max(f64::EPSILON);
                    settings.number("fall_height", 4.0) * remaining / fall_time
                }
                None => 0.0,
            };
            Some([x, y, 0.0])
        })
        .with_scale(|ctx, settings| {
            let width = settings.number("spread", 0.3) * 0.9;
            let length = 0.1 + ctx.note_duration * settings.number("bar_length", 0.5);
            Some(Scale::Vector([width, length, width]))
        })
        .with_color(|ctx, _| Some(pitch_color(ctx.note.pitch)))
        .with_opacity(|ctx, settings| match ctx.time_until_note_start {
            Some(remaining) => {
                let fall_time = settings.number("fall_time", 1.0).max(f64::EPSILON);
                Some(0.6 * (1.0 - remaining / fall_time))
            }
            None => Some(ctx.adsr_amplitude),
        })
        .with_emissive(|ctx, settings| match ctx.adsr_phase {
            EnvelopePhase::Attack | EnvelopePhase::Decay | EnvelopePhase::Sustain => {
                Some(Emissive::new(
                    settings.text("glow_color", "#fff4d6"),
                    ctx.adsr_amplitude * (0.5 + ctx.note.velocity_unit()),
                ))
            }
            EnvelopePhase::Idle | EnvelopePhase::Release => None,
        })
        .apply_adsr_with(|_, settings| {
            AdsrConfig::new(0.0, 0.05, 1.0, settings.number("release", 0.25))
        })
        .apply_approach_envelope_with(|_, settings| {
            ApproachEnvelopeConfig::new(settings.number("fall_time", 1.0))
        })
        .build()?;

    Ok(vec![bar])
}
