pub mod adsr;
pub mod approach;
pub mod physics;

pub use adsr::{calculate_adsr, AdsrConfig, AdsrState, EnvelopePhase};
pub use approach::{calculate_approach, ApproachEnvelopeConfig};
pub use physics::{accumulate_impulses, calculate_damped_oscillator, PhysicsEnvelopeConfig};
