use lumen_core::{
    define_object, AdsrConfig, DefinitionError, Emissive, ModuleSettings, ObjectDefinition, Scale,
};

use super::{key_x, pitch_color};

pub fn default_settings() -> ModuleSettings {
    ModuleSettings::new()
        .with("spread", 0.25)
        .with("base_scale", 0.5)
        .with("velocity_scale", 1.5)
        .with("attack", 0.02)
        .with("decay", 0.15)
        .with("sustain", 0.7)
        .with("release", 0.4)
        .with("glow", true)
}

pub fn definitions() -> Result<Vec<ObjectDefinition>, DefinitionError> {
    let sphere = define_object("sphere")
        .with_position(|ctx, settings| {
            Some([key_x(ctx.note.pitch, settings.number("spread", 0.25)), 0.0, 0.0])
        })
        .with_scale(|ctx, settings| {
            let base = settings.number("base_scale", 0.5);
            let boost = settings.number("velocity_scale", 1.5) * ctx.note.velocity_unit();
            Some(Scale::Uniform(base + boost))
        })
        .with_color(|ctx, _| Some(pitch_color(ctx.note.pitch)))
        .with_opacity(|ctx, _| Some(ctx.adsr_amplitude))
        .with_emissive(|ctx, settings| {
            if !settings.flag("glow", true) {
                return None;
            }
            let color = ctx.calculated.color.clone()?;
            Some(Emissive::new(color, ctx.adsr_amplitude * ctx.note.velocity_unit()))
        })
        .apply_adsr_with(|_, settings| {
            AdsrConfig::new(
                settings.number("attack", 0.02),
                settings.number("decay", 0.15),
                settings.number("sustain", 0.7),
                settings.number("release", 0.4),
            )
        })
        .build()?;

    Ok(vec![sphere])
}
