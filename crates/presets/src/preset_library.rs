use std::collections::HashMap;

use lumen_core::{ContentModule, DefinitionError, ModuleSettings, ObjectDefinition};
use serde::Serialize;

use crate::presets;

type DefinitionsFn = fn() -> Result<Vec<ObjectDefinition>, DefinitionError>;

/// A named content module recipe. Each call to [`build`](Self::build)
/// produces a fresh module with its own mapper state.
#[derive(Clone, Debug, Serialize)]
pub struct PresetProfile {
    pub id: String,
    pub name: String,
    pub description: String,
    pub default_settings: ModuleSettings,
    #[serde(skip)]
    definitions: DefinitionsFn,
}

impl PresetProfile {
    pub fn build(&self) -> Result<ContentModule, DefinitionError> {
        self.build_with(&ModuleSettings::new())
    }

    /// Build with `overrides` layered over the preset's default settings.
    pub fn build_with(&self, overrides: &ModuleSettings) -> Result<ContentModule, DefinitionError> {
        let mut settings = self.default_settings.clone();
        settings.merge(overrides);

        let mut module = ContentModule::new(self.id.clone()).with_settings(settings);
        for definition in (self.definitions)()? {
            module.add_definition(definition);
        }
        Ok(module)
    }
}

impl std::fmt::Display for PresetProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

#[derive(Default)]
pub struct PresetLibrary {
    pub profiles: HashMap<String, PresetProfile>,
}

impl PresetLibrary {
    pub fn new() -> Self {
        let mut library = PresetLibrary::default();

        library.insert(PresetProfile {
            id: "pulse".to_string(),
            name: "Pulse".to_string(),
            description: "One sphere per note, placed by pitch and sized by velocity.".to_string(),
            default_settings: presets::pulse::default_settings(),
            definitions: presets::pulse::definitions,
        });

        library.insert(PresetProfile {
            id: "ripple".to_string(),
            name: "Ripple".to_string(),
            description: "A spring-kicked ring per note with concentric ripples.".to_string(),
            default_settings: presets::ripple::default_settings(),
            definitions: presets::ripple::definitions,
        });

        library.insert(PresetProfile {
            id: "piano-rain".to_string(),
            name: "Piano Rain".to_string(),
            description: "Bars fall onto their key and glow while the note is held.".to_string(),
            default_settings: presets::piano_rain::default_settings(),
            definitions: presets::piano_rain::definitions,
        });

        library.insert(PresetProfile {
            id: "orbit".to_string(),
            name: "Orbit".to_string(),
            description: "Notes claim slots on a circle and spin satellites.".to_string(),
            default_settings: presets::orbit::default_settings(),
            definitions: presets::orbit::definitions,
        });

        library
    }

    fn insert(&mut self, profile: PresetProfile) {
        self.profiles.insert(profile.id.clone(), profile);
    }

    pub fn get(&self, id: &str) -> Option<&PresetProfile> {
        self.profiles.get(id)
    }

    /// Preset ids in alphabetical order.
    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

#[cfg(test)]
mod tests {
    use lumen_core::{MidiBlock, MidiNote};

    use super::*;

    fn blocks() -> Vec<MidiBlock> {
        vec![MidiBlock::new(
            "block",
            0.0,
            16.0,
            vec![
                MidiNote::new("n1", 0.0, 2.0, 60, 100),
                MidiNote::new("n2", 0.5, 2.0, 67, 80),
            ],
        )]
    }

    #[test]
    fn test_library_lists_presets() {
        let library = PresetLibrary::new();
        assert_eq!(library.ids(), vec!["orbit", "piano-rain", "pulse", "ripple"]);
        assert!(library.get("missing").is_none());
        assert_eq!(library.get("pulse").unwrap().to_string(), "Pulse (pulse)");
    }

    #[test]
    fn test_every_preset_builds_and_renders() {
        let library = PresetLibrary::new();
        for id in library.ids() {
            let mut module = library.get(id).unwrap().build().unwrap();
            assert_eq!(module.name(), id);
            let objects = module.evaluate(1.0, &blocks(), 120.0);
            assert!(!objects.is_empty(), "preset {} rendered nothing", id);
            assert!(objects
                .iter()
                .all(|o| o.properties.opacity > 0.0 && o.properties.opacity <= 1.0));
        }
    }

    #[test]
    fn test_overrides_win_over_defaults() {
        let library = PresetLibrary::new();
        let profile = library.get("ripple").unwrap();
        let module = profile
            .build_with(&ModuleSettings::new().with("rings", 5))
            .unwrap();
        assert_eq!(module.settings().count("rings", 0), 5);
        assert_eq!(
            module.settings().number("spread", 0.0),
            profile.default_settings.number("spread", -1.0)
        );
    }

    #[test]
    fn test_profile_serializes_without_builder() {
        let library = PresetLibrary::new();
        let value = serde_json::to_value(library.get("orbit").unwrap()).unwrap();
        assert_eq!(value["id"], "orbit");
        assert!(value.get("definitions").is_none());
        assert!(value["default_settings"].is_object());
    }
}
