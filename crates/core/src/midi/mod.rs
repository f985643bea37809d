pub mod midi;

pub use midi::{MidiBlock, MidiNote, NoteTiming};
