use super::context::{CalculatedProperties, InstanceData, MappingContext};
use super::visual::{is_finite_vec3, VisualObject, VisualProperties, DEFAULT_COLOR, DEFAULT_OPACITY};
use crate::config::EngineSettings;
use crate::definition::{DefinitionLevel, ObjectDefinition};
use crate::envelope::{calculate_adsr, calculate_approach, AdsrConfig, AdsrState, EnvelopePhase};
use crate::midi::{MidiBlock, MidiNote, NoteTiming};
use crate::module::ModuleSettings;
use crate::rhythm::Tempo;

/// Guard for dividing by a note's duration.
const MIN_NOTE_DURATION: f64 = 1e-6;

/// A note that passed its definition's gate this frame.
struct GatedNote<'a> {
    block: &'a MidiBlock,
    note: &'a MidiNote,
    timing: NoteTiming,
}

/// Per-note values shared by every level and instance of one note.
struct NoteFrame<'a> {
    block: &'a MidiBlock,
    note: &'a MidiNote,
    timing: NoteTiming,
    time: f64,
    time_beats: f64,
    bpm: f64,
    time_until_note_start: Option<f64>,
    adsr: Vec<Option<AdsrConfig>>,
    physics: &'a [Option<f64>],
}

/// Turns object definitions and the current set of notes into the flat list
/// of visual objects for one frame.
///
/// The engine keeps no state between calls. Mappers and generators are
/// `FnMut`, so definitions are borrowed mutably; any state they keep is their
/// own.
#[derive(Debug, Clone, Default)]
pub struct MappingEngine {
    settings: EngineSettings,
}

impl MappingEngine {
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: EngineSettings) {
        self.settings = settings;
    }

    /// Evaluate every definition against every note at `time_beats`.
    /// Never fails: broken branches are logged and skipped.
    pub fn evaluate(
        &self,
        definitions: &mut [ObjectDefinition],
        module_settings: &ModuleSettings,
        time_beats: f64,
        blocks: &[MidiBlock],
        bpm: f64,
    ) -> Vec<VisualObject> {
        let mut output = Vec::new();
        let tempo = Tempo::with_floor(bpm, self.settings.min_bpm);
        let time = tempo.beats_to_seconds(time_beats);
        if !time.is_finite() {
            log::warn!("Ignoring evaluation at non-finite time {}", time_beats);
            return output;
        }

        for definition in definitions.iter_mut() {
            self.evaluate_definition(
                definition,
                module_settings,
                time,
                time_beats,
                tempo,
                blocks,
                &mut output,
            );
        }

        output
    }

    #[allow(clippy::too_many_arguments)]
    fn evaluate_definition(
        &self,
        definition: &mut ObjectDefinition,
        module_settings: &ModuleSettings,
        time: f64,
        time_beats: f64,
        tempo: Tempo,
        blocks: &[MidiBlock],
        output: &mut Vec<VisualObject>,
    ) {
        // The gate runs exactly once per note per frame.
        let mut gated = Vec::new();
        for block in blocks {
            for note in &block.notes {
                if !definition.passes_gate(note, module_settings) {
                    continue;
                }
                let timing = block.note_timing(note, tempo);
                if !timing.start_time.is_finite() || !timing.end_time.is_finite() {
                    log::warn!(
                        "Skipping note {} in block {}: non-finite timing",
                        note.id,
                        block.id
                    );
                    continue;
                }
                gated.push(GatedNote {
                    block,
                    note,
                    timing,
                });
            }
        }
        if gated.is_empty() {
            return;
        }

        // Sorted by onset so the physics sum only walks notes that have
        // already started.
        gated.sort_by(|a, b| a.timing.start_time.total_cmp(&b.timing.start_time));
        let started = gated.partition_point(|g| g.timing.start_time <= time);
        let physics = physics_per_level(
            &mut definition.levels,
            &gated[..started],
            time,
            module_settings,
        );

        let ObjectDefinition {
            object_type,
            approach: approach_source,
            levels,
            ..
        } = definition;

        for gated_note in &gated {
            let note = gated_note.note;
            let timing = gated_note.timing;

            let adsr: Vec<Option<AdsrConfig>> = levels
                .iter_mut()
                .map(|level| {
                    level
                        .adsr
                        .as_mut()
                        .map(|source| source.resolve(note, module_settings).sanitized())
                })
                .collect();
            let max_release = adsr.iter().flatten().map(|c| c.release).fold(0.0, f64::max);
            let approach = approach_source
                .as_mut()
                .map(|source| source.resolve(note, module_settings));

            let window_start = approach
                .map(|config| config.window_start(timing.start_time))
                .unwrap_or(timing.start_time);
            let window_end = timing.end_time + max_release;
            if time < window_start || time > window_end {
                log::trace!(
                    "Culled note {} for '{}': {:.3}s outside [{:.3}, {:.3}]",
                    note.id,
                    object_type,
                    time,
                    window_start,
                    window_end
                );
                continue;
            }

            let frame = NoteFrame {
                block: gated_note.block,
                note,
                timing,
                time,
                time_beats,
                bpm: tempo.bpm,
                time_until_note_start: approach
                    .and_then(|config| calculate_approach(time, timing.start_time, &config)),
                adsr,
                physics: &physics,
            };
            self.evaluate_level(levels, 0, object_type, &frame, None, module_settings, output);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn evaluate_level(
        &self,
        levels: &mut [DefinitionLevel],
        index: usize,
        default_type: &str,
        frame: &NoteFrame<'_>,
        parent: Option<&MappingContext<'_>>,
        module_settings: &ModuleSettings,
        output: &mut Vec<VisualObject>,
    ) {
        let level_number = index + 1;
        let Some(level) = levels.get_mut(index) else {
            return;
        };
        if level.level != level_number {
            log::warn!(
                "Definition '{}': expected level {} but found level {}, skipping branch",
                default_type,
                level_number,
                level.level
            );
            return;
        }

        let instances = if index == 0 {
            vec![InstanceData::new()]
        } else {
            let Some(parent) = parent else {
                log::warn!(
                    "Definition '{}': level {} has no parent context, skipping branch",
                    default_type,
                    level_number
                );
                return;
            };
            let Some(generator) = level.generator.as_mut() else {
                log::warn!(
                    "Definition '{}': level {} has no generator, skipping branch",
                    default_type,
                    level_number
                );
                return;
            };
            generator.call(parent, module_settings)
        };

        let instance_count = instances.len();
        for (instance_index, instance_data) in instances.into_iter().enumerate() {
            let Some(ctx) = self.resolve_instance(
                &mut levels[index],
                index,
                default_type,
                frame,
                parent,
                instance_index,
                instance_count,
                instance_data,
                module_settings,
            ) else {
                continue;
            };

            if let Some(object) = self.emit(&ctx) {
                output.push(object);
            }

            if index + 1 < levels.len() {
                self.evaluate_level(
                    levels,
                    index + 1,
                    default_type,
                    frame,
                    Some(&ctx),
                    module_settings,
                    output,
                );
            }
        }
    }

    /// Build the context for one instance and run its mappers. Returns
    /// `None` when the instance's envelope has settled, which also prunes
    /// its children.
    #[allow(clippy::too_many_arguments)]
    fn resolve_instance<'c>(
        &self,
        level: &mut DefinitionLevel,
        index: usize,
        default_type: &str,
        frame: &'c NoteFrame<'c>,
        parent: Option<&'c MappingContext<'c>>,
        instance_index: usize,
        instance_count: usize,
        instance_data: InstanceData,
        module_settings: &ModuleSettings,
    ) -> Option<MappingContext<'c>> {
        let timing = frame.timing;
        let approaching = frame.time_until_note_start.is_some();
        let time_since_note_start = frame.time - timing.start_time;
        let note_progress_percent = if approaching {
            0.0
        } else {
            (time_since_note_start / timing.duration().max(MIN_NOTE_DURATION)).clamp(0.0, 1.0)
        };

        // Levels without their own envelope follow their parent's.
        let adsr = match frame.adsr.get(index).copied().flatten() {
            Some(config) => calculate_adsr(frame.time, timing.start_time, timing.end_time, &config),
            None => parent
                .map(|p| AdsrState {
                    amplitude: p.adsr_amplitude,
                    phase: p.adsr_phase,
                })
                .unwrap_or(AdsrState::IDLE),
        };
        let own_physics = frame.physics.get(index).copied().flatten();
        let physics_value = own_physics.unwrap_or_else(|| parent.map_or(0.0, |p| p.physics_value));

        let adsr_settled = adsr.amplitude <= 0.0 && adsr.phase == EnvelopePhase::Idle;
        if !approaching && level.adsr.is_some() && adsr_settled {
            let physics_settled =
                own_physics.map_or(true, |v| v.abs() < self.settings.physics_epsilon);
            if physics_settled {
                log::trace!(
                    "Pruned settled instance {} of level {} for note {}",
                    instance_index,
                    index + 1,
                    frame.note.id
                );
                return None;
            }
        }

        let object_type = level
            .object_type
            .clone()
            .or_else(|| parent.map(|p| p.calculated.object_type.clone()))
            .unwrap_or_else(|| default_type.to_string());

        let mut ctx = MappingContext {
            note: frame.note,
            block: frame.block,
            level: index + 1,
            instance_index,
            instance_count,
            time: frame.time,
            time_beats: frame.time_beats,
            bpm: frame.bpm,
            note_start_time: timing.start_time,
            note_end_time: timing.end_time,
            note_duration: timing.duration(),
            time_since_note_start,
            note_progress_percent,
            time_until_note_start: frame.time_until_note_start,
            adsr_amplitude: adsr.amplitude,
            adsr_phase: adsr.phase,
            physics_value,
            instance_data,
            parent,
            calculated: CalculatedProperties {
                object_type,
                ..CalculatedProperties::default()
            },
        };

        if let Some(mapper) = level.position.as_mut() {
            ctx.calculated.position = mapper.call(&ctx, module_settings).filter(is_finite_vec3);
        }
        if let Some(mapper) = level.scale.as_mut() {
            ctx.calculated.scale = mapper.call(&ctx, module_settings).filter(|s| s.is_finite());
        }
        if let Some(mapper) = level.rotation.as_mut() {
            ctx.calculated.rotation = mapper.call(&ctx, module_settings).filter(is_finite_vec3);
        }
        if let Some(mapper) = level.color.as_mut() {
            ctx.calculated.color = mapper.call(&ctx, module_settings).filter(|c| !c.is_empty());
        }
        if let Some(mapper) = level.opacity.as_mut() {
            ctx.calculated.opacity = mapper
                .call(&ctx, module_settings)
                .filter(|o| o.is_finite())
                .map(|o| o.clamp(0.0, 1.0));
        }
        if let Some(mapper) = level.emissive.as_mut() {
            ctx.calculated.emissive = mapper
                .call(&ctx, module_settings)
                .filter(|e| e.intensity.is_finite());
        }

        Some(ctx)
    }

    fn emit(&self, ctx: &MappingContext<'_>) -> Option<VisualObject> {
        let calculated = &ctx.calculated;
        if !calculated.has_geometry() {
            return None;
        }
        let opacity = calculated.opacity.unwrap_or(DEFAULT_OPACITY);
        if opacity <= self.settings.opacity_epsilon {
            return None;
        }

        let defaults = VisualProperties::default();
        Some(VisualObject {
            object_type: calculated.object_type.clone(),
            properties: VisualProperties {
                position: calculated.position.unwrap_or(defaults.position),
                scale: calculated.scale.unwrap_or(defaults.scale),
                rotation: calculated.rotation.unwrap_or(defaults.rotation),
                color: calculated.color.clone().unwrap_or_else(|| DEFAULT_COLOR.to_string()),
                opacity,
                emissive: calculated.emissive.as_ref().map(|e| e.color.clone()),
                emissive_intensity: calculated.emissive.as_ref().map(|e| e.intensity),
            },
            source_note_id: (!ctx.note.id.is_empty()).then(|| ctx.note.id.clone()),
        })
    }
}

/// Physics envelope value for each level this frame: the sum of one decaying
/// oscillator per already-started gated note.
fn physics_per_level(
    levels: &mut [DefinitionLevel],
    started: &[GatedNote<'_>],
    time: f64,
    module_settings: &ModuleSettings,
) -> Vec<Option<f64>> {
    levels
        .iter_mut()
        .map(|level| {
            level.physics.as_mut().map(|source| {
                started
                    .iter()
                    .map(|g| {
                        source
                            .resolve(g.note, module_settings)
                            .displacement(time - g.timing.start_time)
                    })
                    .sum::<f64>()
            })
        })
        .collect()
}
