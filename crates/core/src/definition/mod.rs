pub mod builder;
pub mod callback;
pub mod definition;

pub use builder::{define_object, ObjectDefinitionBuilder};
pub use callback::{ConfigSource, ContextFn, Gate, Generator, Mapper, NoteFn};
pub use definition::{DefinitionError, DefinitionLevel, ObjectDefinition};
