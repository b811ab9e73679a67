//! Wavetables with a guard point, and the oscillator that reads them.
//!
//! A table of length `L` stores `L + 1` samples; the last one repeats the
//! first so that interpolation between index `L - 1` and `L` needs neither a
//! bounds check nor a modulo.

use std::f64::consts::TAU;
use std::sync::Arc;

use log::debug;
use serde::{Deserialize, Serialize};

use super::oscillator::PhaseWrap;
use crate::error::{Result, SonanceError};

/// Largest table [`GuardTable::generate`] will build.
pub const MAX_TABLE_LENGTH: usize = 1 << 16;

/// Generated table shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableShape {
    #[default]
    Sine,
    Triangle,
    Square,
    Sawtooth,
}

/// Precomputed single-cycle waveform plus guard point.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardTable {
    data: Vec<f64>,
}

impl GuardTable {
    /// Wrap one cycle of samples, appending the guard point.
    pub fn from_samples(cycle: impl Into<Vec<f64>>) -> Result<Self> {
        let mut data = cycle.into();
        let Some(&first) = data.first() else {
            return Err(SonanceError::invalid("wavetable must not be empty"));
        };
        data.push(first);
        Ok(GuardTable { data })
    }

    /// `sin(2πi/L)` for each index.
    pub fn sine(length: usize) -> Result<Self> {
        if length == 0 {
            return Err(SonanceError::invalid("table length must be greater than 0"));
        }
        let step = TAU / length as f64;
        Self::from_samples((0..length).map(|i| (step * i as f64).sin()).collect::<Vec<_>>())
    }

    /// Odd harmonics at `1/h²` in cosine phase.
    pub fn triangle(length: usize, harmonics: usize) -> Result<Self> {
        Self::additive(length, harmonics, |h| {
            if h % 2 == 1 {
                Some((1.0 / (h * h) as f64, true))
            } else {
                None
            }
        })
    }

    /// Odd harmonics at `1/h`.
    pub fn square(length: usize, harmonics: usize) -> Result<Self> {
        Self::additive(length, harmonics, |h| {
            if h % 2 == 1 {
                Some((1.0 / h as f64, false))
            } else {
                None
            }
        })
    }

    /// Every harmonic at `1/h`.
    pub fn sawtooth(length: usize, harmonics: usize) -> Result<Self> {
        Self::additive(length, harmonics, |h| Some((1.0 / h as f64, false)))
    }

    pub fn generate(shape: TableShape, length: usize, harmonics: usize) -> Result<Self> {
        if length > MAX_TABLE_LENGTH {
            return Err(SonanceError::invalid(format!(
                "table length {length} exceeds {MAX_TABLE_LENGTH}"
            )));
        }
        match shape {
            TableShape::Sine => Self::sine(length),
            TableShape::Triangle => Self::triangle(length, harmonics),
            TableShape::Square => Self::square(length, harmonics),
            TableShape::Sawtooth => Self::sawtooth(length, harmonics),
        }
    }

    /// Sum `harmonics` partials, normalized to a peak of 1.0. `partial(h)`
    /// gives the amplitude of harmonic `h` and whether it uses cosine phase,
    /// or `None` to skip it. Only included partials count toward
    /// `harmonics`.
    fn additive(
        length: usize,
        harmonics: usize,
        partial: impl Fn(usize) -> Option<(f64, bool)>,
    ) -> Result<Self> {
        if length == 0 {
            return Err(SonanceError::invalid("table length must be greater than 0"));
        }
        if harmonics == 0 {
            return Err(SonanceError::invalid("harmonic count must be greater than 0"));
        }
        if harmonics >= length / 2 {
            return Err(SonanceError::invalid(format!(
                "{harmonics} harmonics alias in a table of length {length}"
            )));
        }

        let mut cycle = vec![0.0; length];
        let step = TAU / length as f64;
        let mut h = 1;
        let mut included = 0;
        while included < harmonics {
            if let Some((amp, cosine)) = partial(h) {
                for (i, v) in cycle.iter_mut().enumerate() {
                    let angle = step * (h * i) as f64;
                    *v += amp * if cosine { angle.cos() } else { angle.sin() };
                }
                included += 1;
            }
            h += 1;
        }

        let peak = cycle.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        if peak > 0.0 {
            for v in &mut cycle {
                *v /= peak;
            }
        }
        debug!("built {length}-point table from {harmonics} harmonics (peak {peak:.4})");
        Self::from_samples(cycle)
    }

    /// Table length excluding the guard point.
    pub fn len(&self) -> usize {
        self.data.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All samples including the guard point.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// Oscillator that reads a [`GuardTable`] with a fractional index.
#[derive(Debug, Clone)]
pub struct LookupOscillator {
    table: Arc<GuardTable>,
    pub wrap: PhaseWrap,
    index: f64,
    frequency: f64,
    increment: f64,
    size_over_sr: f64,
}

impl LookupOscillator {
    /// `phase` is the starting position as a fraction of a cycle.
    pub fn new(table: Arc<GuardTable>, sample_rate: u32, phase: f64) -> Result<Self> {
        if sample_rate == 0 {
            return Err(SonanceError::invalid("sample rate must be greater than 0"));
        }
        let len = table.len() as f64;
        Ok(LookupOscillator {
            size_over_sr: len / sample_rate as f64,
            index: PhaseWrap::Modulo.wrap(len * phase, len),
            table,
            wrap: PhaseWrap::default(),
            frequency: 0.0,
            increment: 0.0,
        })
    }

    pub fn with_wrap(mut self, wrap: PhaseWrap) -> Self {
        self.wrap = wrap;
        self
    }

    fn advance(&mut self, frequency: f64) {
        if frequency != self.frequency {
            self.frequency = frequency;
            self.increment = self.size_over_sr * frequency;
        }
        let len = self.table.len() as f64;
        self.index = self.wrap.wrap(self.index + self.increment, len);
    }

    /// Table value at the integer part of the current index.
    pub fn truncate_tick(&mut self, frequency: f64) -> f64 {
        // A snapped index equals the length, which reads the guard point.
        let value = self.table.data[self.index as usize];
        self.advance(frequency);
        value
    }

    /// Linear interpolation between the two table entries around the
    /// current index.
    pub fn interpolate_tick(&mut self, frequency: f64) -> f64 {
        let len = self.table.len();
        let mut base = self.index as usize;
        let frac = self.index - base as f64;
        if base >= len {
            base -= len;
        }
        let data = &self.table.data;
        let value = data[base] + frac * (data[base + 1] - data[base]);
        self.advance(frequency);
        value
    }

    pub fn batch_truncate_tick(&mut self, frequency: f64, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.truncate_tick(frequency)).collect()
    }

    pub fn batch_interpolate_tick(&mut self, frequency: f64, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.interpolate_tick(frequency)).collect()
    }

    /// Current fractional table index.
    pub fn index(&self) -> f64 {
        self.index
    }

    pub fn table(&self) -> &GuardTable {
        &self.table
    }
}
