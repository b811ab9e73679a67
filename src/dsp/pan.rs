//! Mono-to-stereo panning.
//!
//! Pan positions run from -1 (hard left) through 0 (centre) to +1 (hard
//! right).

use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_4};

use log::debug;

use crate::breakpoint::{Breakpoint, value_at};
use crate::error::{Result, SonanceError};
use crate::sample::AudioBuffer;

/// Per-channel gains for one pan position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanGains {
    pub left: f64,
    pub right: f64,
}

impl PanGains {
    /// Linear crossfade. Centre gives 0.5 to each side, so the perceived
    /// level dips in the middle.
    pub fn linear(position: f64) -> Self {
        let half = position * 0.5;
        PanGains {
            left: 0.5 - half,
            right: 0.5 + half,
        }
    }

    /// Constant-power pan: each side covers a quarter cycle, and the summed
    /// power `left² + right²` stays 1 across the range.
    pub fn constant_power(position: f64) -> Self {
        let angle = position * FRAC_PI_4;
        let (sin, cos) = angle.sin_cos();
        PanGains {
            left: FRAC_1_SQRT_2 * (cos - sin),
            right: FRAC_1_SQRT_2 * (cos + sin),
        }
    }
}

/// Pan law used by [`pan`] and [`pan_with_breakpoints`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanLaw {
    Linear,
    #[default]
    ConstantPower,
}

impl PanLaw {
    pub fn gains(self, position: f64) -> PanGains {
        match self {
            PanLaw::Linear => PanGains::linear(position),
            PanLaw::ConstantPower => PanGains::constant_power(position),
        }
    }
}

fn require_mono(buffer: &AudioBuffer) -> Result<()> {
    if buffer.format.channels() != 1 {
        return Err(SonanceError::invalid(format!(
            "panning needs a mono buffer, got {} channels",
            buffer.format.channels()
        )));
    }
    Ok(())
}

fn to_stereo(buffer: &AudioBuffer, mut gains: impl FnMut(usize) -> PanGains) -> Result<AudioBuffer> {
    let mut format = buffer.format.clone();
    format.set_channels(2)?;
    let mut samples = Vec::with_capacity(buffer.samples.len() * 2);
    for (i, &s) in buffer.samples.iter().enumerate() {
        let g = gains(i);
        samples.push(s * g.left);
        samples.push(s * g.right);
    }
    Ok(AudioBuffer::new(format, samples))
}

/// Pan a mono buffer to a fixed position, producing a stereo copy.
pub fn pan(buffer: &AudioBuffer, position: f64, law: PanLaw) -> Result<AudioBuffer> {
    require_mono(buffer)?;
    let gains = law.gains(position);
    debug!("pan {position} -> {gains:?}");
    to_stereo(buffer, |_| gains)
}

/// Pan a mono buffer along a breakpoint curve of positions over time.
///
/// Every breakpoint value must lie in [-1, 1].
pub fn pan_with_breakpoints(
    buffer: &AudioBuffer,
    positions: &[Breakpoint],
    law: PanLaw,
) -> Result<AudioBuffer> {
    require_mono(buffer)?;
    if let Some(bad) = positions.iter().find(|b| !(-1.0..=1.0).contains(&b.value)) {
        return Err(SonanceError::invalid(format!(
            "pan position {} at {}s is outside [-1, 1]",
            bad.value, bad.time
        )));
    }

    let step = 1.0 / buffer.format.sample_rate() as f64;
    let mut hint = 0;
    to_stereo(buffer, |i| {
        let (next, position) = value_at(positions, i as f64 * step, hint);
        hint = next;
        law.gains(position)
    })
}
