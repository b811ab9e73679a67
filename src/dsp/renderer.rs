//! Tone renderer: turns a [`TonePatch`] into samples or WAVE bytes.

use std::f64::consts::TAU;
use std::sync::Arc;

use log::debug;

use super::envelope::{AdsrEnvelope, ExpDecay};
use super::oscillator::Oscillator;
use super::wavetable::{GuardTable, LookupOscillator};
use crate::breakpoint::BreakpointStream;
use crate::error::Result;
use crate::patch::TonePatch;
use crate::sample::AudioBuffer;
use crate::wave;

/// The signal source a patch selects.
enum Source {
    Direct(Oscillator),
    Table {
        osc: LookupOscillator,
        interpolate: bool,
    },
}

impl Source {
    fn from_patch(patch: &TonePatch) -> Result<Self> {
        let sample_rate = patch.format.sample_rate();
        match &patch.table {
            Some(config) => {
                let table = GuardTable::generate(config.shape, config.length, config.harmonics)?;
                let osc = LookupOscillator::new(Arc::new(table), sample_rate, patch.phase)?
                    .with_wrap(patch.phase_wrap);
                Ok(Source::Table {
                    osc,
                    interpolate: config.interpolate,
                })
            }
            None => Ok(Source::Direct(
                Oscillator::new(patch.waveform, sample_rate)?
                    .with_wrap(patch.phase_wrap)
                    .with_phase(patch.phase * TAU),
            )),
        }
    }

    fn tick(&mut self, frequency: f64) -> f64 {
        match self {
            Source::Direct(osc) => osc.tick(frequency),
            Source::Table {
                osc,
                interpolate: true,
            } => osc.interpolate_tick(frequency),
            Source::Table { osc, .. } => osc.truncate_tick(frequency),
        }
    }
}

/// Render a patch to a buffer in the patch's format. Every channel carries
/// the same signal.
pub fn render(patch: &TonePatch) -> Result<AudioBuffer> {
    patch.validate()?;
    let sample_rate = patch.format.sample_rate();
    let frames = patch.frame_count();

    let mut source = Source::from_patch(patch)?;
    let mut pitch = if patch.frequency_breakpoints.is_empty() {
        None
    } else {
        Some(BreakpointStream::new(
            patch.frequency_breakpoints.clone(),
            sample_rate,
        )?)
    };
    let mut envelope = patch
        .envelope
        .map(|shape| AdsrEnvelope::new(shape, 1.0, patch.duration, sample_rate as f64))
        .transpose()?;
    let mut decay = patch
        .decay
        .map(|d| ExpDecay::new(d.start, d.end, frames))
        .transpose()?;

    let mono: Vec<f64> = (0..frames)
        .map(|_| {
            let frequency = pitch.as_mut().map_or(patch.frequency, |p| p.tick());
            let mut sample = source.tick(frequency) * patch.amplitude;
            if let Some(env) = envelope.as_mut() {
                sample *= env.next_sample();
            }
            if let Some(d) = decay.as_mut() {
                sample *= d.next_sample();
            }
            sample
        })
        .collect();

    debug!(
        "rendered {frames} frames at {sample_rate} Hz x{} ({})",
        patch.format.channels(),
        if patch.table.is_some() { "table" } else { patch.waveform.name() }
    );
    Ok(AudioBuffer::from_mono(patch.format.clone(), &mono))
}

/// Render a patch straight to WAVE file bytes.
pub fn render_wav(patch: &TonePatch) -> Result<Vec<u8>> {
    wave::encode(&render(patch)?)
}
