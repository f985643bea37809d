//! Boxed, cloneable callables supplied by content modules.
//!
//! Mappers may keep private state between frames (an `FnMut` closure that
//! owns a cache, for example). Cloning a definition clones every callable
//! together with whatever it captured, so two copies of a content module
//! never share mutable state.

use crate::engine::context::MappingContext;
use crate::midi::MidiNote;
use crate::module::ModuleSettings;

/// A function of the current mapping context and the module's settings.
pub trait ContextFn<T>: Send {
    fn call(&mut self, ctx: &MappingContext<'_>, settings: &ModuleSettings) -> T;
    fn clone_box(&self) -> Box<dyn ContextFn<T>>;
}

impl<T, F> ContextFn<T> for F
where
    F: FnMut(&MappingContext<'_>, &ModuleSettings) -> T + Clone + Send + 'static,
    T: 'static,
{
    fn call(&mut self, ctx: &MappingContext<'_>, settings: &ModuleSettings) -> T {
        (*self)(ctx, settings)
    }

    fn clone_box(&self) -> Box<dyn ContextFn<T>> {
        Box::new(self.clone())
    }
}

impl<T: 'static> Clone for Box<dyn ContextFn<T>> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// A function of a note and the module's settings. Used where no mapping
/// context exists yet: gating and per-note envelope configuration.
pub trait NoteFn<T>: Send {
    fn call(&mut self, note: &MidiNote, settings: &ModuleSettings) -> T;
    fn clone_box(&self) -> Box<dyn NoteFn<T>>;
}

impl<T, F> NoteFn<T> for F
where
    F: FnMut(&MidiNote, &ModuleSettings) -> T + Clone + Send + 'static,
    T: 'static,
{
    fn call(&mut self, note: &MidiNote, settings: &ModuleSettings) -> T {
        (*self)(note, settings)
    }

    fn clone_box(&self) -> Box<dyn NoteFn<T>> {
        Box::new(self.clone())
    }
}

impl<T: 'static> Clone for Box<dyn NoteFn<T>> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Envelope configuration that is either fixed or derived from each note.
pub enum ConfigSource<C> {
    Fixed(C),
    PerNote(Box<dyn NoteFn<C>>),
}

impl<C: Copy + 'static> ConfigSource<C> {
    pub fn resolve(&mut self, note: &MidiNote, settings: &ModuleSettings) -> C {
        match self {
            ConfigSource::Fixed(config) => *config,
            ConfigSource::PerNote(f) => f.call(note, settings),
        }
    }
}

impl<C: Clone + 'static> Clone for ConfigSource<C> {
    fn clone(&self) -> Self {
        match self {
            ConfigSource::Fixed(config) => ConfigSource::Fixed(config.clone()),
            ConfigSource::PerNote(f) => ConfigSource::PerNote(f.clone()),
        }
    }
}

impl<C: std::fmt::Debug> std::fmt::Debug for ConfigSource<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Fixed(config) => f.debug_tuple("Fixed").field(config).finish(),
            ConfigSource::PerNote(_) => f.write_str("PerNote(..)"),
        }
    }
}

pub type Mapper<T> = Box<dyn ContextFn<Option<T>>>;
pub type Generator = Box<dyn ContextFn<Vec<crate::engine::context::InstanceData>>>;
pub type Gate = Box<dyn NoteFn<bool>>;
