use super::settings::ModuleSettings;
use crate::config::EngineSettings;
use crate::definition::ObjectDefinition;
use crate::engine::{MappingEngine, VisualObject};
use crate::midi::MidiBlock;

/// A named bundle of settings and object definitions, evaluated once per
/// frame.
///
/// Cloning a module clones every definition and therefore every mapper's
/// captured state, so a clone can be played back independently.
#[derive(Debug, Clone)]
pub struct ContentModule {
    name: String,
    settings: ModuleSettings,
    definitions: Vec<ObjectDefinition>,
    engine: MappingEngine,
}

impl ContentModule {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        log::debug!("Created content module '{}'", name);
        Self {
            name,
            settings: ModuleSettings::new(),
            definitions: Vec::new(),
            engine: MappingEngine::default(),
        }
    }

    pub fn with_settings(mut self, settings: ModuleSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_definition(mut self, definition: ObjectDefinition) -> Self {
        self.add_definition(definition);
        self
    }

    pub fn add_definition(&mut self, definition: ObjectDefinition) {
        log::debug!(
            "Module '{}': added definition '{}' ({} level(s))",
            self.name,
            definition.object_type(),
            definition.level_count()
        );
        self.definitions.push(definition);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &ModuleSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut ModuleSettings {
        &mut self.settings
    }

    pub fn definitions(&self) -> &[ObjectDefinition] {
        &self.definitions
    }

    pub fn engine_settings(&self) -> &EngineSettings {
        self.engine.settings()
    }

    pub fn set_engine_settings(&mut self, settings: EngineSettings) {
        self.engine.set_settings(settings);
    }

    /// Visual objects for the frame at `time_beats`.
    pub fn evaluate(
        &mut self,
        time_beats: f64,
        blocks: &[MidiBlock],
        bpm: f64,
    ) -> Vec<VisualObject> {
        self.engine
            .evaluate(&mut self.definitions, &self.settings, time_beats, blocks, bpm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::define_object;
    use crate::engine::Scale;
    use crate::midi::MidiNote;

    fn blocks() -> Vec<MidiBlock> {
        vec![MidiBlock::new("b", 0.0, 8.0, vec![MidiNote::new("n1", 0.0, 2.0, 60, 100)])]
    }

    #[test]
    fn test_module_passes_settings_to_mappers() {
        let definition = define_object("cube")
            .with_position(|_, settings| Some([settings.number("x", 0.0), 0.0, 0.0]))
            .build()
            .unwrap();
        let mut module = ContentModule::new("test")
            .with_settings(ModuleSettings::new().with("x", 4.5))
            .with_definition(definition);

        let objects = module.evaluate(1.0, &blocks(), 120.0);
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].properties.position, [4.5, 0.0, 0.0]);

        module.settings_mut().set("x", -1.0);
        let objects = module.evaluate(1.0, &blocks(), 120.0);
        assert_eq!(objects[0].properties.position, [-1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_engine_settings_control_emission() {
        let definition = define_object("cube")
            .with_scale(|_, _| Some(Scale::Uniform(1.0)))
            .with_opacity(|_, _| Some(0.05))
            .build()
            .unwrap();
        let mut module = ContentModule::new("faint").with_definition(definition);
        assert_eq!(module.evaluate(1.0, &blocks(), 120.0).len(), 1);

        module.set_engine_settings(EngineSettings {
            opacity_epsilon: 0.1,
            ..EngineSettings::default()
        });
        assert_eq!(module.engine_settings().opacity_epsilon, 0.1);
        assert!(module.evaluate(1.0, &blocks(), 120.0).is_empty());
    }

    #[test]
    fn test_empty_module_emits_nothing() {
        let mut module = ContentModule::new("empty");
        assert_eq!(module.name(), "empty");
        assert!(module.definitions().is_empty());
        assert!(module.evaluate(0.5, &blocks(), 120.0).is_empty());
    }
}
