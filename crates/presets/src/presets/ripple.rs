use lumen_core::{
    define_object, AdsrConfig, DefinitionError, InstanceData, ModuleSettings, ObjectDefinition,
    PhysicsEnvelopeConfig, Scale,
};

use super::{key_x, pitch_color};

pub fn default_settings() -> ModuleSettings {
    ModuleSettings::new()
        .with("spread", 0.4)
        .with("rings", 3)
        .with("ring_gap", 0.6)
        .with("expand_rate", 1.5)
        .with("punch", 4.0)
        .with("tension", 180.0)
        .with("friction", 6.0)
        .with("release", 0.8)
}

pub fn definitions() -> Result<Vec<ObjectDefinition>, DefinitionError> {
    let ripple = define_object("ring")
        .with_position(|ctx, settings| {
            Some([key_x(ctx.note.pitch, settings.number("spread", 0.4)), 0.0, 0.0])
        })
        .with_scale(|ctx, settings| {
            let kick = settings.number("punch", 4.0) * ctx.physics_value;
            Some(Scale::Uniform((1.0 + kick).max(0.0)))
        })
        .with_color(|ctx, _| Some(pitch_color(ctx.note.pitch)))
        .with_opacity(|ctx, _| Some(ctx.adsr_amplitude))
        .apply_adsr_with(|_, settings| {
            AdsrConfig::new(0.0, 0.1, 0.8, settings.number("release", 0.8))
        })
        .apply_physics_envelope_with(|note, settings| {
            PhysicsEnvelopeConfig::new(
                settings.number("tension", 180.0),
                settings.number("friction", 6.0),
                note.velocity_unit(),
            )
        })
        .for_each_instance(|_, settings| {
            (0..settings.count("rings", 3))
                .map(|ring| InstanceData::new().with("ring", ring))
                .collect()
        })
        .set_type("ripple")
        .with_position(|ctx, _| Some(ctx.parent_position()))
        .with_scale(|ctx, settings| {
            let ring = ctx.instance_data.number("ring")?;
            let base = ctx.parent.and_then(|p| p.calculated.scale)?.as_vec3()[0];
            let travel = settings.number("expand_rate", 1.5) * ctx.time_since_note_start.max(0.0);
            Some(Scale::Uniform(base + (ring + 1.0) * settings.number("ring_gap", 0.6) + travel))
        })
        .with_color(|ctx, _| ctx.parent.and_then(|p| p.calculated.color.clone()))
        .with_opacity(|ctx, _| {
            let ring = ctx.instance_data.number("ring")?;
            let falloff = 1.0 - ring / (ctx.instance_count as f64 + 1.0);
            Some(ctx.adsr_amplitude * falloff)
        })
        .build()?;

    Ok(vec![ripple])
}
