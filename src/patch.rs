//! Tone patches: a JSON description of one synthesized tone.
//!
//! ```json
//! {
//!   "format": { "channels": 1, "sample_rate": 44100, "bits_per_sample": 16 },
//!   "waveform": "sine",
//!   "frequency": 440.0,
//!   "duration": 2.0,
//!   "amplitude": 0.8,
//!   "envelope": { "attack": 0.01, "decay": 0.1, "sustain": 0.7, "release": 0.3 }
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::breakpoint::Breakpoint;
use crate::dsp::envelope::Adsr;
use crate::dsp::oscillator::{PhaseWrap, Waveform};
use crate::dsp::wavetable::{MAX_TABLE_LENGTH, TableShape};
use crate::error::{Result, SonanceError};
use crate::sample::Format;

// ── Patch (top-level) ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TonePatch {
    /// Output format. Every channel carries the same signal.
    pub format: Format,
    /// Shape for the direct oscillator. Ignored when `table` is set.
    #[serde(default)]
    pub waveform: Waveform,
    /// Frequency in Hz, used unless `frequency_breakpoints` is given.
    pub frequency: f64,
    /// Length in seconds.
    pub duration: f64,
    #[serde(default = "default_amplitude")]
    pub amplitude: f64,
    /// Starting phase as a fraction of a cycle.
    #[serde(default)]
    pub phase: f64,
    #[serde(default)]
    pub phase_wrap: PhaseWrap,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub envelope: Option<Adsr>,
    /// Read from a wavetable instead of computing the waveform directly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<TableConfig>,
    /// Frequency curve over time (seconds → Hz).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub frequency_breakpoints: Vec<Breakpoint>,
    /// Exponential amplitude decay across the whole tone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decay: Option<DecayConfig>,
}

fn default_amplitude() -> f64 {
    1.0
}

// ── Wavetable ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableConfig {
    #[serde(default)]
    pub shape: TableShape,
    #[serde(default = "default_table_length")]
    pub length: usize,
    /// Partial count for the additive shapes (ignored for sine).
    #[serde(default = "default_harmonics")]
    pub harmonics: usize,
    /// Interpolate between entries rather than truncating the index.
    #[serde(default = "default_interpolate")]
    pub interpolate: bool,
}

fn default_table_length() -> usize {
    1024
}

fn default_harmonics() -> usize {
    8
}

fn default_interpolate() -> bool {
    true
}

// ── Decay ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayConfig {
    #[serde(default = "default_decay_start")]
    pub start: f64,
    #[serde(default = "default_decay_end")]
    pub end: f64,
}

fn default_decay_start() -> f64 {
    1.0
}

fn default_decay_end() -> f64 {
    1.0e-4
}

impl TonePatch {
    /// A plain tone with every optional stage off.
    pub fn new(format: Format, waveform: Waveform, frequency: f64, duration: f64) -> Self {
        TonePatch {
            format,
            waveform,
            frequency,
            duration,
            amplitude: default_amplitude(),
            phase: 0.0,
            phase_wrap: PhaseWrap::default(),
            envelope: None,
            table: None,
            frequency_breakpoints: Vec::new(),
            decay: None,
        }
    }

    /// Parse and validate a patch.
    pub fn from_json(json: &str) -> Result<Self> {
        let patch: TonePatch = serde_json::from_str(json)?;
        patch.validate()?;
        Ok(patch)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Number of frames the patch renders to.
    pub fn frame_count(&self) -> usize {
        (self.duration * self.format.sample_rate() as f64) as usize
    }

    /// Check values serde cannot: finite numbers and a non-empty duration.
    pub fn validate(&self) -> Result<()> {
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(SonanceError::invalid(format!(
                "duration must be positive, got {}",
                self.duration
            )));
        }
        if self.frame_count() == 0 {
            return Err(SonanceError::invalid(format!(
                "duration {}s is shorter than one frame",
                self.duration
            )));
        }
        // The rendered data chunk must fit the 32-bit RIFF size field.
        let header = 36 + if self.format.is_pcm() {
            0
        } else {
            2 + self.format.extra_params.len() as u64
        };
        let data_bytes = (self.frame_count() as u64)
            .saturating_mul(self.format.channels() as u64)
            .saturating_mul(self.format.bit_depth().bytes() as u64);
        if data_bytes > u32::MAX as u64 - header {
            return Err(SonanceError::invalid(format!(
                "{}s at {} Hz x{} is too long for a WAVE file",
                self.duration,
                self.format.sample_rate(),
                self.format.channels()
            )));
        }
        if let Some(table) = &self.table {
            if table.length > MAX_TABLE_LENGTH {
                return Err(SonanceError::invalid(format!(
                    "table length {} exceeds {MAX_TABLE_LENGTH}",
                    table.length
                )));
            }
        }
        for (name, value) in [
            ("frequency", self.frequency),
            ("amplitude", self.amplitude),
            ("phase", self.phase),
        ] {
            if !value.is_finite() {
                return Err(SonanceError::invalid(format!("{name} must be finite")));
            }
        }
        if self.frequency_breakpoints.len() == 1 {
            return Err(SonanceError::InsufficientData {
                needed: 2,
                found: 1,
            });
        }
        Ok(())
    }
}
