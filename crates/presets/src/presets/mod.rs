//! Built-in content modules. Every preset reads its tunables from the
//! module settings at evaluation time, falling back to the values in its
//! `default_settings`.

pub mod orbit;
pub mod piano_rain;
pub mod pulse;
pub mod ripple;

/// One color per pitch class, C through B.
const PITCH_CLASS_COLORS: [&str; 12] = [
    "#ff3b30", "#ff6f3c", "#ff9500", "#ffcc00", "#d4e157", "#4cd964", "#26c6da", "#5ac8fa",
    "#007aff", "#5856d6", "#af52de", "#ff2d55",
];

pub(crate) fn pitch_color(pitch: u8) -> String {
    PITCH_CLASS_COLORS[(pitch % 12) as usize].to_string()
}

/// Horizontal position of a key, middle C at the origin.
pub(crate) fn key_x(pitch: u8, spread: f64) -> f64 {
    (pitch as f64 - 60.0) * spread
}
