use serde::{Deserialize, Serialize};

/// Smallest tension the oscillator will run with.
pub const MIN_TENSION: f64 = 1e-6;

/// Below this the damped frequency (or its overdamped counterpart) is treated
/// as zero and the critically damped solution is used instead.
const DEGENERATE_FREQUENCY: f64 = 1e-9;

/// Spring parameters for the "physics" envelope: a unit mass on a damped
/// spring, kicked with `initial_velocity` when a note starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicsEnvelopeConfig {
    pub tension: f64,
    pub friction: f64,
    pub initial_velocity: f64,
}

impl PhysicsEnvelopeConfig {
    pub fn new(tension: f64, friction: f64, initial_velocity: f64) -> Self {
        Self {
            tension,
            friction,
            initial_velocity,
        }
    }

    /// Damping ratio of the clamped parameters.
    pub fn damping_ratio(&self) -> f64 {
        let (tension, friction) = clamp_parameters(self.tension, self.friction);
        friction / (2.0 * tension.sqrt())
    }

    pub fn displacement(&self, elapsed: f64) -> f64 {
        calculate_damped_oscillator(elapsed, self.tension, self.friction, self.initial_velocity)
    }
}

impl Default for PhysicsEnvelopeConfig {
    fn default() -> Self {
        Self {
            tension: 120.0,
            friction: 8.0,
            initial_velocity: 1.0,
        }
    }
}

fn clamp_parameters(tension: f64, friction: f64) -> (f64, f64) {
    let tension = if tension.is_finite() {
        tension.max(MIN_TENSION)
    } else {
        MIN_TENSION
    };
    let friction = if friction.is_finite() {
        friction.max(0.0)
    } else {
        0.0
    };
    (tension, friction)
}

/// Closed-form displacement of `x'' + friction*x' + tension*x = 0` with
/// `x(0) = 0`, `x'(0) = initial_velocity`, sampled `elapsed` seconds after
/// the impulse.
pub fn calculate_damped_oscillator(
    elapsed: f64,
    tension: f64,
    friction: f64,
    initial_velocity: f64,
) -> f64 {
    if !elapsed.is_finite()
        || elapsed <= 0.0
        || initial_velocity == 0.0
        || !initial_velocity.is_finite()
    {
        return 0.0;
    }

    let (tension, friction) = clamp_parameters(tension, friction);
    let omega = tension.sqrt();
    let zeta = friction / (2.0 * omega);
    let decay = (-zeta * omega * elapsed).exp();

    if zeta < 1.0 {
        let omega_d = omega * (1.0 - zeta * zeta).sqrt();
        if omega_d > DEGENERATE_FREQUENCY {
            return initial_velocity / omega_d * decay * (omega_d * elapsed).sin();
        }
    } else if zeta > 1.0 {
        let alpha = omega * (zeta * zeta - 1.0).sqrt();
        if alpha > DEGENERATE_FREQUENCY {
            // e^(-ζωt)·sinh(αt) written as a difference of exponentials so
            // heavily overdamped springs don't overflow sinh.
            let growing = (-(zeta * omega - alpha) * elapsed).exp();
            let shrinking = (-(zeta * omega + alpha) * elapsed).exp();
            return initial_velocity / alpha * 0.5 * (growing - shrinking);
        }
    }

    critically_damped(elapsed, omega, initial_velocity)
}

fn critically_damped(elapsed: f64, omega: f64, initial_velocity: f64) -> f64 {
    initial_velocity * elapsed * (-omega * elapsed).exp()
}

/// Sum of independent oscillator responses, one per trigger time. Triggers in
/// the future contribute nothing.
pub fn accumulate_impulses<I>(time: f64, onsets: I, config: &PhysicsEnvelopeConfig) -> f64
where
    I: IntoIterator<Item = f64>,
{
    onsets
        .into_iter()
        .map(|onset| config.displacement(time - onset))
        .sum()
}
