pub use preset_library::{PresetLibrary, PresetProfile};

mod preset_library;
pub mod presets;
