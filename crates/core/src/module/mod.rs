pub mod content_module;
pub mod settings;

pub use content_module::ContentModule;
pub use settings::ModuleSettings;
