use super::callback::ConfigSource;
use super::definition::{validate_levels, DefinitionError, DefinitionLevel, ObjectDefinition};
use crate::engine::context::{InstanceData, MappingContext};
use crate::engine::visual::{Emissive, Scale, Vec3};
use crate::envelope::{AdsrConfig, ApproachEnvelopeConfig, PhysicsEnvelopeConfig};
use crate::midi::MidiNote;
use crate::module::ModuleSettings;

/// Start describing a new kind of object.
pub fn define_object(object_type: impl Into<String>) -> ObjectDefinitionBuilder {
    ObjectDefinitionBuilder::new(object_type)
}

/// Fluent builder for [`ObjectDefinition`].
///
/// Levels live in an append-only list and `current` indexes the level that
/// attribute setters modify. Level 1 exists from the start; every
/// [`for_each_instance`](Self::for_each_instance) call appends the next level
/// and makes it current. `when` and the approach envelope apply to the whole
/// definition.
///
/// ```
/// use lumen_core::{define_object, InstanceData};
///
/// let definition = define_object("sphere")
///     .when(|note, _| note.velocity > 0)
///     .with_position(|ctx, _| Some([ctx.note.pitch as f64 - 60.0, 0.0, 0.0]))
///     .with_opacity(|ctx, _| Some(ctx.adsr_amplitude))
///     .apply_adsr(lumen_core::AdsrConfig::new(0.05, 0.1, 0.6, 0.3))
///     .for_each_instance(|_, _| (0..3).map(|i| InstanceData::new().with("ring", i)).collect())
///     .with_scale(|ctx, _| ctx.instance_data.number("ring").map(|r| (r + 1.0).into()))
///     .build()
///     .unwrap();
///
/// assert_eq!(definition.level_count(), 2);
/// ```
#[derive(Debug)]
pub struct ObjectDefinitionBuilder {
    definition: ObjectDefinition,
    current: usize,
}

impl ObjectDefinitionBuilder {
    pub fn new(object_type: impl Into<String>) -> Self {
        Self {
            definition: ObjectDefinition::from_parts(
                object_type,
                None,
                None,
                vec![DefinitionLevel::new(1)],
            ),
            current: 0,
        }
    }

    fn current_level(&mut self) -> &mut DefinitionLevel {
        &mut self.definition.levels[self.current]
    }

    /// Number of the level the next setter will modify.
    pub fn current_level_number(&self) -> usize {
        self.current + 1
    }

    /// Only notes for which `predicate` returns true produce objects.
    pub fn when<F>(mut self, predicate: F) -> Self
    where
        F: FnMut(&MidiNote, &ModuleSettings) -> bool + Clone + Send + 'static,
    {
        self.definition.gate = Some(Box::new(predicate));
        self
    }

    /// Append a level whose instances are produced by `generator`, called
    /// once per parent instance with the parent's resolved context.
    pub fn for_each_instance<F>(mut self, generator: F) -> Self
    where
        F: FnMut(&MappingContext<'_>, &ModuleSettings) -> Vec<InstanceData>
            + Clone
            + Send
            + 'static,
    {
        let mut level = DefinitionLevel::new(self.definition.levels.len() + 1);
        level.generator = Some(Box::new(generator));
        self.definition.levels.push(level);
        self.current = self.definition.levels.len() - 1;
        self
    }

    /// Override the object type emitted by the current level (and inherited
    /// by its descendants).
    pub fn set_type(mut self, object_type: impl Into<String>) -> Self {
        self.current_level().object_type = Some(object_type.into());
        self
    }

    pub fn with_position<F>(mut self, mapper: F) -> Self
    where
        F: FnMut(&MappingContext<'_>, &ModuleSettings) -> Option<Vec3> + Clone + Send + 'static,
    {
        self.current_level().position = Some(Box::new(mapper));
        self
    }

    pub fn with_scale<F>(mut self, mapper: F) -> Self
    where
        F: FnMut(&MappingContext<'_>, &ModuleSettings) -> Option<Scale> + Clone + Send + 'static,
    {
        self.current_level().scale = Some(Box::new(mapper));
        self
    }

    pub fn with_rotation<F>(mut self, mapper: F) -> Self
    where
        F: FnMut(&MappingContext<'_>, &ModuleSettings) -> Option<Vec3> + Clone + Send + 'static,
    {
        self.current_level().rotation = Some(Box::new(mapper));
        self
    }

    pub fn with_color<F>(mut self, mapper: F) -> Self
    where
        F: FnMut(&MappingContext<'_>, &ModuleSettings) -> Option<String> + Clone + Send + 'static,
    {
        self.current_level().color = Some(Box::new(mapper));
        self
    }

    pub fn with_opacity<F>(mut self, mapper: F) -> Self
    where
        F: FnMut(&MappingContext<'_>, &ModuleSettings) -> Option<f64> + Clone + Send + 'static,
    {
        self.current_level().opacity = Some(Box::new(mapper));
        self
    }

    pub fn with_emissive<F>(mut self, mapper: F) -> Self
    where
        F: FnMut(&MappingContext<'_>, &ModuleSettings) -> Option<Emissive> + Clone + Send + 'static,
    {
        self.current_level().emissive = Some(Box::new(mapper));
        self
    }

    pub fn apply_adsr(mut self, config: AdsrConfig) -> Self {
        self.current_level().adsr = Some(ConfigSource::Fixed(config));
        self
    }

    /// ADSR whose parameters depend on the note (e.g. velocity-scaled
    /// release).
    pub fn apply_adsr_with<F>(mut self, config: F) -> Self
    where
        F: FnMut(&MidiNote, &ModuleSettings) -> AdsrConfig + Clone + Send + 'static,
    {
        self.current_level().adsr = Some(ConfigSource::PerNote(Box::new(config)));
        self
    }

    pub fn apply_physics_envelope(mut self, config: PhysicsEnvelopeConfig) -> Self {
        self.current_level().physics = Some(ConfigSource::Fixed(config));
        self
    }

    pub fn apply_physics_envelope_with<F>(mut self, config: F) -> Self
    where
        F: FnMut(&MidiNote, &ModuleSettings) -> PhysicsEnvelopeConfig + Clone + Send + 'static,
    {
        self.current_level().physics = Some(ConfigSource::PerNote(Box::new(config)));
        self
    }

    pub fn apply_approach_envelope(mut self, config: ApproachEnvelopeConfig) -> Self {
        self.definition.approach = Some(ConfigSource::Fixed(config));
        self
    }

    pub fn apply_approach_envelope_with<F>(mut self, config: F) -> Self
    where
        F: FnMut(&MidiNote, &ModuleSettings) -> ApproachEnvelopeConfig + Clone + Send + 'static,
    {
        self.definition.approach = Some(ConfigSource::PerNote(Box::new(config)));
        self
    }

    /// Finalize, checking that levels are numbered 1..=n without gaps and
    /// that every level after the first has a generator.
    pub fn build(self) -> Result<ObjectDefinition, DefinitionError> {
        validate_levels(&self.definition.object_type, &self.definition.levels)?;
        log::debug!(
            "Built definition '{}' with {} level(s)",
            self.definition.object_type,
            self.definition.levels.len()
        );
        Ok(self.definition)
    }
}
