pub use config::{
    ConfigError, ConfigFile, ConfigManager, ConfigOption, ConfigSchema, EngineSettings,
};
pub use definition::{
    define_object, ConfigSource, ContextFn, DefinitionError, DefinitionLevel, Gate, Generator,
    Mapper, NoteFn, ObjectDefinition, ObjectDefinitionBuilder,
};
pub use engine::{
    CalculatedProperties, Emissive, InstanceData, MappingContext, MappingEngine, Scale, Vec3,
    VisualObject, VisualProperties,
};
pub use envelope::{
    accumulate_impulses, calculate_adsr, calculate_approach, calculate_damped_oscillator,
    AdsrConfig, AdsrState, ApproachEnvelopeConfig, EnvelopePhase, PhysicsEnvelopeConfig,
};
pub use midi::{MidiBlock, MidiNote, NoteTiming};
pub use module::{ContentModule, ModuleSettings};
pub use rhythm::{Tempo, MIN_BPM};

mod config;
pub mod definition;
pub mod engine;
pub mod envelope;
mod midi;
pub mod module;
mod rhythm;
