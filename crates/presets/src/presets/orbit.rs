use std::collections::HashMap;
use std::f64::consts::TAU;

use lumen_core::{
    define_object, AdsrConfig, DefinitionError, InstanceData, ModuleSettings, ObjectDefinition,
    Scale,
};

use super::pitch_color;

pub fn default_settings() -> ModuleSettings {
    ModuleSettings::new()
        .with("slots", 8)
        .with("radius", 3.0)
        .with("satellites", 4)
        .with("satellite_radius", 0.75)
        .with("spin", 1.0)
        .with("release", 0.6)
}

/// Seconds a note can go unseen before its slot is forgotten.
const FORGET_AFTER: f64 = 30.0;

/// Hands out circle slots in order of first appearance, wrapping at `slots`.
/// A note keeps its slot while it keeps being evaluated; ids not seen for
/// `FORGET_AFTER` seconds of playback are dropped.
#[derive(Clone, Debug, Default)]
struct SlotMemory {
    handed_out: usize,
    // note id -> (slot, last time seen)
    assigned: HashMap<String, (usize, f64)>,
}

impl SlotMemory {
    fn slot_for(&mut self, note_id: &str, slots: usize, now: f64) -> usize {
        self.assigned.retain(|_, (_, seen)| (now - *seen).abs() <= FORGET_AFTER);

        match self.assigned.get_mut(note_id) {
            Some((slot, seen)) => {
                *seen = now;
                *slot
            }
            None => {
                let slot = self.handed_out % slots.max(1);
                self.handed_out += 1;
                self.assigned.insert(note_id.to_string(), (slot, now));
                slot
            }
        }
    }
}

pub fn definitions() -> Result<Vec<ObjectDefinition>, DefinitionError> {
    let mut memory = SlotMemory::default();

    let planet = define_object("planet")
        .with_position(move |ctx, settings| {
            let slots = settings.count("slots", 8).max(1);
            let slot = memory.slot_for(&ctx.note.id, slots, ctx.time);
            let angle = TAU * slot as f64 / slots as f64;
            let radius = settings.number("radius", 3.0);
            Some([radius * angle.cos(), radius * angle.sin(), 0.0])
        })
        .with_scale(|ctx, _| Some(Scale::Uniform(0.4 + 0.6 * ctx.note.velocity_unit())))
        .with_color(|ctx, _| Some(pitch_color(ctx.note.pitch)))
        .with_opacity(|ctx, _| Some(ctx.adsr_amplitude))
        .apply_adsr_with(|_, settings| {
            AdsrConfig::new(0.05, 0.2, 0.6, settings.number("release", 0.6))
        })
        .for_each_instance(|_, settings| {
            let count = settings.count("satellites", 4);
            (0..count)
                .map(|i| InstanceData::new().with("phase", TAU * i as f64 / count as f64))
                .collect()
        })
        .set_type("satellite")
        .with_position(|ctx, settings| {
            let phase = ctx.instance_data.number("phase")?;
            let angle = phase + settings.number("spin", 1.0) * TAU * ctx.time_since_note_start;
            let radius = settings.number("satellite_radius", 0.75);
            let [x, y, z] = ctx.parent_position();
            Some([x + radius * angle.cos(), y + radius * angle.sin(), z])
        })
        .with_scale(|_, _| Some(Scale::Uniform(0.15)))
        .with_rotation(|ctx, _| Some([0.0, 0.0, ctx.time_since_note_start * TAU]))
        .with_color(|ctx, _| ctx.parent.and_then(|p| p.calculated.color.clone()))
        .with_opacity(|ctx, _| Some(ctx.adsr_amplitude * 0.8))
        .build()?;

    Ok(vec![planet])
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use lumen_core::{ContentModule, MidiBlock, MidiNote, VisualObject};

    use super::*;

    fn module() -> ContentModule {
        let mut module = ContentModule::new("orbit").with_settings(default_settings());
        for definition in definitions().unwrap() {
            module.add_definition(definition);
        }
        module
    }

    const SECOND_SLOT: f64 = 3.0 * std::f64::consts::FRAC_1_SQRT_2;

    fn planets(objects: &[VisualObject]) -> Vec<(String, [f64; 3])> {
        objects
            .iter()
            .filter(|o| o.object_type == "planet")
            .map(|o| (o.source_note_id.clone().unwrap_or_default(), o.properties.position))
            .collect()
    }

    #[test]
    fn test_slot_memory_wraps() {
        let mut memory = SlotMemory::default();
        assert_eq!(memory.slot_for("a", 2, 0.0), 0);
        assert_eq!(memory.slot_for("b", 2, 0.0), 1);
        assert_eq!(memory.slot_for("c", 2, 0.0), 0);
        assert_eq!(memory.slot_for("b", 2, 0.0), 1);
    }

    #[test]
    fn test_slot_memory_forgets_stale_notes() {
        let mut memory = SlotMemory::default();
        assert_eq!(memory.slot_for("a", 8, 0.0), 0);
        assert_eq!(memory.slot_for("b", 8, 20.0), 1);
        assert_eq!(memory.slot_for("b", 8, 40.0), 1);
        assert_eq!(memory.assigned.len(), 1);
        assert!(!memory.assigned.contains_key("a"));

        // A forgotten note comes back with a fresh slot
        assert_eq!(memory.slot_for("a", 8, 41.0), 2);
        assert_eq!(memory.assigned.len(), 2);
    }

    #[test]
    fn test_notes_keep_their_slot() {
        let early = vec![MidiBlock::new(
            "b",
            0.0,
            16.0,
            vec![MidiNote::new("a", 0.0, 8.0, 60, 100)],
        )];
        let both = vec![MidiBlock::new(
            "b",
            0.0,
            16.0,
            vec![
                MidiNote::new("a", 0.0, 8.0, 60, 100),
                MidiNote::new("b", 1.0, 8.0, 62, 100),
            ],
        )];
        let mut module = module();

        let first = planets(&module.evaluate(0.5, &early, 120.0));
        assert_eq!(first.len(), 1);
        assert_relative_eq!(first[0].1[0], 3.0, epsilon = 1e-9);

        let later = planets(&module.evaluate(2.0, &both, 120.0));
        assert_eq!(later.len(), 2);
        assert_eq!(later[0], first[0]);
        // Second slot of eight: an eighth of a turn
        assert_relative_eq!(later[1].1[0], SECOND_SLOT, epsilon = 1e-9);
        assert_relative_eq!(later[1].1[1], SECOND_SLOT, epsilon = 1e-9);
    }

    #[test]
    fn test_satellites_circle_their_planet() {
        let blocks = vec![MidiBlock::new(
            "b",
            0.0,
            16.0,
            vec![MidiNote::new("a", 0.0, 8.0, 60, 100)],
        )];
        let objects = module().evaluate(1.0, &blocks, 120.0);

        assert_eq!(objects.len(), 5);
        let center = objects[0].properties.position;
        for satellite in &objects[1..] {
            assert_eq!(satellite.object_type, "satellite");
            let [x, y, _] = satellite.properties.position;
            let distance = ((x - center[0]).powi(2) + (y - center[1]).powi(2)).sqrt();
            assert_relative_eq!(distance, 0.75, epsilon = 1e-9);
            assert_eq!(satellite.properties.color, objects[0].properties.color);
        }
    }

    #[test]
    fn test_clones_remember_slots_independently() {
        let single = |id: &str| {
            let note = MidiNote::new(id, 0.0, 8.0, 60, 100);
            vec![MidiBlock::new("b", 0.0, 16.0, vec![note])]
        };
        let mut original = module();
        original.evaluate(1.0, &single("a"), 120.0);

        // The copy inherits slot 0 for "a", so "z" lands on slot 1
        let mut copy = original.clone();
        let from_copy = planets(&copy.evaluate(1.0, &single("z"), 120.0));
        assert_relative_eq!(from_copy[0].1[1], SECOND_SLOT, epsilon = 1e-9);

        // The original never saw "z", so slot 1 is still free for "w"
        let from_original = planets(&original.evaluate(1.0, &single("w"), 120.0));
        assert_relative_eq!(from_original[0].1[1], SECOND_SLOT, epsilon = 1e-9);

        let fresh = planets(&module().evaluate(1.0, &single("z"), 120.0));
        assert_relative_eq!(fresh[0].1[0], 3.0, epsilon = 1e-9);
    }
}
