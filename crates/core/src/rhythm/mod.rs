pub mod rhythm;

pub use rhythm::{Tempo, MIN_BPM};
