//! Phase-accumulating oscillators computed directly from the phase.

use std::f64::consts::{PI, TAU};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SonanceError};

/// Supported waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    #[default]
    Sine,
    /// +1 up to and including π, -1 after.
    Square,
    /// Rises from -1 to +1 over one period.
    #[serde(alias = "saw", alias = "sawtooth")]
    UpSaw,
    /// Falls from +1 to -1 over one period.
    DownSaw,
    Triangle,
}

impl Waveform {
    /// Value of the waveform at `phase` radians, `phase` in [0, 2π].
    pub fn value(self, phase: f64) -> f64 {
        match self {
            Waveform::Sine => phase.sin(),
            Waveform::Square => {
                if phase <= PI {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::UpSaw => 2.0 * (phase / TAU) - 1.0,
            Waveform::DownSaw => 1.0 - 2.0 * (phase / TAU),
            Waveform::Triangle => {
                let v = (2.0 * (phase / TAU) - 1.0).abs();
                2.0 * (v - 0.5)
            }
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Waveform::Sine => "sine",
            Waveform::Square => "square",
            Waveform::UpSaw => "up_saw",
            Waveform::DownSaw => "down_saw",
            Waveform::Triangle => "triangle",
        }
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Waveform {
    type Err = SonanceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sine" | "sin" => Ok(Waveform::Sine),
            "square" | "sqr" => Ok(Waveform::Square),
            "up_saw" | "saw" | "sawtooth" => Ok(Waveform::UpSaw),
            "down_saw" => Ok(Waveform::DownSaw),
            "triangle" | "tri" => Ok(Waveform::Triangle),
            other => Err(SonanceError::invalid(format!("unknown waveform '{other}'"))),
        }
    }
}

/// How an accumulated phase is brought back into its period.
///
/// Both wrap a phase that reaches the period back into it. They differ
/// for negative phase (negative frequency): `Snap` sets the phase to the
/// period itself, `Modulo` adds whole periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseWrap {
    #[default]
    Snap,
    Modulo,
}

impl PhaseWrap {
    /// A non-finite phase restarts at 0. `Snap` subtracts the period once;
    /// a phase still past the period after that (increment larger than a
    /// whole cycle) is reduced modulo the period.
    pub fn wrap(self, phase: f64, period: f64) -> f64 {
        if !phase.is_finite() {
            return 0.0;
        }
        match self {
            PhaseWrap::Snap => {
                let phase = if phase >= period { phase - period } else { phase };
                if phase >= period {
                    phase.rem_euclid(period)
                } else if phase < 0.0 {
                    period
                } else {
                    phase
                }
            }
            PhaseWrap::Modulo => phase.rem_euclid(period),
        }
    }
}

/// Direct-calculation oscillator. Frequency is supplied on every tick and
/// may change between ticks without a phase discontinuity.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: Waveform,
    pub wrap: PhaseWrap,
    phase: f64,
    frequency: f64,
    increment: f64,
    two_pi_over_sr: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform, sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(SonanceError::invalid("sample rate must be greater than 0"));
        }
        Ok(Oscillator {
            waveform,
            wrap: PhaseWrap::default(),
            phase: 0.0,
            frequency: 0.0,
            increment: 0.0,
            two_pi_over_sr: TAU / sample_rate as f64,
        })
    }

    pub fn with_wrap(mut self, wrap: PhaseWrap) -> Self {
        self.wrap = wrap;
        self
    }

    /// Start at `phase` radians instead of 0.
    pub fn with_phase(mut self, phase: f64) -> Self {
        self.phase = PhaseWrap::Modulo.wrap(phase, TAU);
        self
    }

    /// Generate the next sample at `frequency` Hz.
    pub fn tick(&mut self, frequency: f64) -> f64 {
        if frequency != self.frequency {
            self.frequency = frequency;
            self.increment = self.two_pi_over_sr * frequency;
        }
        let value = self.waveform.value(self.phase);
        self.phase = self.wrap.wrap(self.phase + self.increment, TAU);
        value
    }

    /// `n` consecutive ticks at a constant frequency.
    pub fn batch_tick(&mut self, frequency: f64, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.tick(frequency)).collect()
    }

    /// Current phase in radians.
    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Frequency of the most recent tick.
    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Phase advance per tick, in radians.
    pub fn increment(&self) -> f64 {
        self.increment
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}
