pub mod context;
pub mod engine;
pub mod visual;

pub use context::{CalculatedProperties, InstanceData, MappingContext};
pub use engine::MappingEngine;
pub use visual::{Emissive, Scale, Vec3, VisualObject, VisualProperties};
