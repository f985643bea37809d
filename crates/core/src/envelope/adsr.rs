use serde::{Deserialize, Serialize};

/// Phase of an ADSR envelope at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopePhase {
    #[default]
    Idle,
    Attack,
    Decay,
    Sustain,
    Release,
}

impl EnvelopePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvelopePhase::Idle => "idle",
            EnvelopePhase::Attack => "attack",
            EnvelopePhase::Decay => "decay",
            EnvelopePhase::Sustain => "sustain",
            EnvelopePhase::Release => "release",
        }
    }
}

/// Attack/decay/release are durations in seconds, sustain is a level in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AdsrConfig {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

impl AdsrConfig {
    pub fn new(attack: f64, decay: f64, sustain: f64, release: f64) -> Self {
        Self {
            attack,
            decay,
            sustain,
            release,
        }
    }

    /// Copy with negative/NaN durations zeroed and sustain pulled into 0..=1.
    pub fn sanitized(&self) -> Self {
        fn duration(value: f64) -> f64 {
            if value.is_finite() {
                value.max(0.0)
            } else {
                0.0
            }
        }
        let sustain = if self.sustain.is_finite() {
            self.sustain.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            attack: duration(self.attack),
            decay: duration(self.decay),
            sustain,
            release: duration(self.release),
        }
    }
}

impl Default for AdsrConfig {
    fn default() -> Self {
        Self {
            attack: 0.01,
            decay: 0.1,
            sustain: 0.8,
            release: 0.3,
        }
    }
}

/// Amplitude and phase produced by [`calculate_adsr`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AdsrState {
    pub amplitude: f64,
    pub phase: EnvelopePhase,
}

impl AdsrState {
    pub const IDLE: AdsrState = AdsrState {
        amplitude: 0.0,
        phase: EnvelopePhase::Idle,
    };

    fn new(amplitude: f64, phase: EnvelopePhase) -> Self {
        Self {
            amplitude: amplitude.clamp(0.0, 1.0),
            phase,
        }
    }
}

/// Evaluate a linear ADSR envelope for a note held from `note_start` to
/// `note_end` (seconds). Zero-length phases are skipped instantly.
pub fn calculate_adsr(time: f64, note_start: f64, note_end: f64, config: &AdsrConfig) -> AdsrState {
    let config = config.sanitized();
    let note_end = note_end.max(note_start);

    if !time.is_finite() || time < note_start {
        return AdsrState::IDLE;
    }

    let attack_end = note_start + config.attack;
    if time < attack_end {
        let progress = (time - note_start) / config.attack;
        return AdsrState::new(progress, EnvelopePhase::Attack);
    }

    let decay_end = attack_end + config.decay;
    if time < decay_end {
        let progress = (time - attack_end) / config.decay;
        let amplitude = 1.0 - (1.0 - config.sustain) * progress;
        return AdsrState::new(amplitude, EnvelopePhase::Decay);
    }

    if time <= note_end {
        return AdsrState::new(config.sustain, EnvelopePhase::Sustain);
    }

    let released_for = time - note_end;
    if released_for < config.release {
        let amplitude = config.sustain * (1.0 - released_for / config.release);
        return AdsrState::new(amplitude, EnvelopePhase::Release);
    }

    AdsrState::IDLE
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    const CONFIG: AdsrConfig = AdsrConfig {
        attack: 0.1,
        decay: 0.2,
        sustain: 0.5,
        release: 0.4,
    };

    #[test]
    fn test_before_start_is_idle() {
        let state = calculate_adsr(-0.001, 0.0, 2.0, &CONFIG);
        assert_eq!(state, AdsrState::IDLE);
    }

    #[test]
    fn test_attack_ramp() {
        let state = calculate_adsr(0.05, 0.0, 2.0, &CONFIG);
        assert_eq!(state.phase, EnvelopePhase::Attack);
        assert_relative_eq!(state.amplitude, 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_peak_at_end_of_attack() {
        let state = calculate_adsr(0.1, 0.0, 2.0, &CONFIG);
        assert_eq!(state.phase, EnvelopePhase::Decay);
        assert_relative_eq!(state.amplitude, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_decay_ramp() {
        let state = calculate_adsr(0.2, 0.0, 2.0, &CONFIG);
        assert_eq!(state.phase, EnvelopePhase::Decay);
        assert_relative_eq!(state.amplitude, 0.75, epsilon = 1e-9);
    }

    #[test]
    fn test_sustain_while_held() {
        let state = calculate_adsr(1.0, 0.0, 2.0, &CONFIG);
        assert_eq!(state.phase, EnvelopePhase::Sustain);
        assert_relative_eq!(state.amplitude, 0.5);

        let at_end = calculate_adsr(2.0, 0.0, 2.0, &CONFIG);
        assert_eq!(at_end.phase, EnvelopePhase::Sustain);
    }

    #[test]
    fn test_release_ramp_and_finish() {
        let state = calculate_adsr(2.2, 0.0, 2.0, &CONFIG);
        assert_eq!(state.phase, EnvelopePhase::Release);
        assert_relative_eq!(state.amplitude, 0.25, epsilon = 1e-9);

        let done = calculate_adsr(2.5, 0.0, 2.0, &CONFIG);
        assert_eq!(done, AdsrState::IDLE);
    }

    #[test]
    fn test_zero_length_phases_are_instant() {
        let config = AdsrConfig::new(0.0, 0.0, 0.7, 0.0);

        let start = calculate_adsr(1.0, 1.0, 2.0, &config);
        assert_eq!(start.phase, EnvelopePhase::Sustain);
        assert_relative_eq!(start.amplitude, 0.7);

        let after = calculate_adsr(2.0001, 1.0, 2.0, &config);
        assert_eq!(after, AdsrState::IDLE);
    }

    #[test]
    fn test_zero_attack_with_decay_starts_at_peak() {
        let config = AdsrConfig::new(0.0, 0.5, 0.2, 0.1);
        let state = calculate_adsr(0.0, 0.0, 1.0, &config);
        assert_eq!(state.phase, EnvelopePhase::Decay);
        assert_relative_eq!(state.amplitude, 1.0);
    }

    #[test]
    fn test_zero_decay_lands_on_sustain_after_attack() {
        let config = AdsrConfig::new(0.1, 0.0, 0.4, 0.2);

        let rising = calculate_adsr(0.1 - 1e-9, 0.0, 1.0, &config);
        assert_eq!(rising.phase, EnvelopePhase::Attack);
        assert_relative_eq!(rising.amplitude, 1.0, epsilon = 1e-6);

        let peak = calculate_adsr(0.1, 0.0, 1.0, &config);
        assert_eq!(peak.phase, EnvelopePhase::Sustain);
        assert_relative_eq!(peak.amplitude, 0.4);
    }

    #[test]
    fn test_degenerate_config_is_clamped() {
        let config = AdsrConfig::new(-1.0, f64::NAN, 4.0, -2.0);
        let state = calculate_adsr(0.5, 0.0, 1.0, &config);
        assert_eq!(state.phase, EnvelopePhase::Sustain);
        assert_relative_eq!(state.amplitude, 1.0);
    }

    #[test]
    fn test_amplitude_stays_in_unit_range() {
        let mut t = -1.0;
        while t < 5.0 {
            let state = calculate_adsr(t, 0.0, 2.0, &CONFIG);
            assert!((0.0..=1.0).contains(&state.amplitude), "t={t}");
            t += 0.013;
        }
    }
}
