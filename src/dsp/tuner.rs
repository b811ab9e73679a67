//! Note names and MIDI numbers to frequencies, and back.

use crate::error::{Result, SonanceError};

/// Concert pitch of A4 (MIDI 69).
pub const CONCERT_A: f64 = 440.0;

/// Octave-4 frequencies from C to B, rounded to hundredths of a hertz.
const OCTAVE_4: [f64; 12] = [
    261.63, 277.18, 293.66, 311.13, 329.63, 349.23, 369.99, 392.00, 415.30, 440.00, 466.16, 493.88,
];

/// Equal-tempered frequency of a MIDI note number.
pub fn midi_to_frequency(note: i32) -> f64 {
    CONCERT_A * 2.0_f64.powf((note as f64 - 69.0) / 12.0)
}

/// Frequency of a named note such as `"a"`, `"C#"` or `"bb"` in `octave`.
///
/// Names are case-insensitive and may carry surrounding whitespace. Values
/// come from the octave-4 table scaled by powers of two, so `("a", 4)` is
/// exactly 440 and `("g", 2)` exactly 98.
pub fn note_to_frequency(name: &str, octave: i32) -> Result<f64> {
    let (semitone, octave) = parse_note(name, octave)?;
    Ok(OCTAVE_4[semitone] * 2.0_f64.powi(octave - 4))
}

fn parse_note(name: &str, octave: i32) -> Result<(usize, i32)> {
    let lowered = name.trim().to_ascii_lowercase();
    let mut chars = lowered.chars();
    let unknown = || SonanceError::invalid(format!("unknown note name '{}'", name.trim()));

    let base: i32 = match chars.next() {
        Some('c') => 0,
        Some('d') => 2,
        Some('e') => 4,
        Some('f') => 5,
        Some('g') => 7,
        Some('a') => 9,
        Some('b') => 11,
        _ => return Err(unknown()),
    };
    let shift = match chars.as_str() {
        "" => 0,
        "#" => 1,
        "b" => -1,
        _ => return Err(unknown()),
    };

    let index = base + shift;
    Ok((index.rem_euclid(12) as usize, octave + index.div_euclid(12)))
}

/// Nearest MIDI note to `frequency` and the offset from it in cents.
/// Notes are clamped to 0..=127; non-positive frequencies give `(0, 0.0)`.
pub fn frequency_to_midi(frequency: f64) -> (u8, f64) {
    if frequency <= 0.0 {
        return (0, 0.0);
    }
    let midi_float = 69.0 + 12.0 * (frequency / CONCERT_A).log2();
    let note = midi_float.round() as i32;
    let cents = (midi_float - note as f64) * 100.0;
    (note.clamp(0, 127) as u8, cents)
}
