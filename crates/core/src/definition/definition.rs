use thiserror::Error;

use super::callback::{ConfigSource, Gate, Generator, Mapper};
use crate::engine::visual::{Emissive, Scale, Vec3};
use crate::envelope::{AdsrConfig, ApproachEnvelopeConfig, PhysicsEnvelopeConfig};
use crate::midi::MidiNote;
use crate::module::ModuleSettings;

/// Configuration problems found while finalizing a definition.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DefinitionError {
    #[error("definition '{object_type}' has no levels")]
    NoLevels { object_type: String },

    #[error("definition '{object_type}': expected level {expected}, found level {found}")]
    NonContiguousLevels {
        object_type: String,
        expected: usize,
        found: usize,
    },

    #[error("definition '{object_type}': level 1 cannot have a generator")]
    RootGenerator { object_type: String },

    #[error("definition '{object_type}': level {level} has no generator")]
    MissingGenerator { object_type: String, level: usize },
}

/// One tier of a definition's instancing hierarchy.
#[derive(Clone, Default)]
pub struct DefinitionLevel {
    pub level: usize,
    pub generator: Option<Generator>,
    pub object_type: Option<String>,
    pub position: Option<Mapper<Vec3>>,
    pub scale: Option<Mapper<Scale>>,
    pub rotation: Option<Mapper<Vec3>>,
    pub color: Option<Mapper<String>>,
    pub opacity: Option<Mapper<f64>>,
    pub emissive: Option<Mapper<Emissive>>,
    pub adsr: Option<ConfigSource<AdsrConfig>>,
    pub physics: Option<ConfigSource<PhysicsEnvelopeConfig>>,
}

impl DefinitionLevel {
    pub fn new(level: usize) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }
}

impl std::fmt::Debug for DefinitionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefinitionLevel")
            .field("level", &self.level)
            .field("generator", &self.generator.is_some())
            .field("object_type", &self.object_type)
            .field("position", &self.position.is_some())
            .field("scale", &self.scale.is_some())
            .field("rotation", &self.rotation.is_some())
            .field("color", &self.color.is_some())
            .field("opacity", &self.opacity.is_some())
            .field("emissive", &self.emissive.is_some())
            .field("adsr", &self.adsr)
            .field("physics", &self.physics)
            .finish()
    }
}

/// One authored rule mapping gated notes to a hierarchy of visual objects.
#[derive(Clone)]
pub struct ObjectDefinition {
    pub(crate) object_type: String,
    pub(crate) gate: Option<Gate>,
    pub(crate) approach: Option<ConfigSource<ApproachEnvelopeConfig>>,
    pub(crate) levels: Vec<DefinitionLevel>,
}

impl ObjectDefinition {
    /// Assemble a definition without validating its levels. The engine
    /// skips any branch it cannot evaluate.
    pub fn from_parts(
        object_type: impl Into<String>,
        gate: Option<Gate>,
        approach: Option<ConfigSource<ApproachEnvelopeConfig>>,
        levels: Vec<DefinitionLevel>,
    ) -> Self {
        Self {
            object_type: object_type.into(),
            gate,
            approach,
            levels,
        }
    }

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    pub fn levels(&self) -> &[DefinitionLevel] {
        &self.levels
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    pub fn has_approach(&self) -> bool {
        self.approach.is_some()
    }

    /// Check the level list: contiguous from 1, generator on every level but
    /// the first.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        validate_levels(&self.object_type, &self.levels)
    }

    pub(crate) fn passes_gate(&mut self, note: &MidiNote, settings: &ModuleSettings) -> bool {
        match self.gate.as_mut() {
            Some(gate) => gate.call(note, settings),
            None => true,
        }
    }
}

impl std::fmt::Debug for ObjectDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectDefinition")
            .field("object_type", &self.object_type)
            .field("gate", &self.gate.is_some())
            .field("approach", &self.approach)
            .field("levels", &self.levels)
            .finish()
    }
}

pub(crate) fn validate_levels(
    object_type: &str,
    levels: &[DefinitionLevel],
) -> Result<(), DefinitionError> {
    if levels.is_empty() {
        return Err(DefinitionError::NoLevels {
            object_type: object_type.to_string(),
        });
    }

    for (index, level) in levels.iter().enumerate() {
        let expected = index + 1;
        if level.level != expected {
            return Err(DefinitionError::NonContiguousLevels {
                object_type: object_type.to_string(),
                expected,
                found: level.level,
            });
        }
        if expected == 1 && level.generator.is_some() {
            return Err(DefinitionError::RootGenerator {
                object_type: object_type.to_string(),
            });
        }
        if expected > 1 && level.generator.is_none() {
            return Err(DefinitionError::MissingGenerator {
                object_type: object_type.to_string(),
                level: expected,
            });
        }
    }

    Ok(())
}
