//! One-pole recursive low-pass and high-pass filters, and a balance
//! (gain-matching) filter built on the low-pass.
//!
//! All three take the previous call's state as an argument and return the
//! new state next to a fresh output buffer, so block-wise processing
//! composes: filtering `a` then `b` with the threaded state equals
//! filtering `a ++ b` in one call. Inputs are never modified.

use std::f64::consts::TAU;

use crate::error::{Result, SonanceError};

/// Filter response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    Lowpass,
    Highpass,
}

/// Single-pole IIR section.
///
/// With `b = 2 - cos(2π·f/sr)` the coefficient is `sqrt(b² - 1) - b` for
/// low-pass and `b - sqrt(b² - 1)` for high-pass, and each output is
/// `in·(1 ± coef) - delay·coef` with the output fed back as the next delay.
#[derive(Debug, Clone)]
pub struct OnePole {
    pub filter_type: FilterType,
    coef: f64,
    delay: f64,
}

impl OnePole {
    pub fn new(filter_type: FilterType, frequency: f64, sample_rate: f64) -> Result<Self> {
        Ok(OnePole {
            filter_type,
            coef: coefficient(filter_type, frequency, sample_rate)?,
            delay: 0.0,
        })
    }

    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    /// Process a single sample through the filter.
    pub fn process(&mut self, input: f64) -> f64 {
        let gain = match self.filter_type {
            FilterType::Lowpass => 1.0 + self.coef,
            FilterType::Highpass => 1.0 - self.coef,
        };
        let output = input * gain - self.delay * self.coef;
        self.delay = output;
        output
    }

    pub fn delay(&self) -> f64 {
        self.delay
    }

    pub fn coef(&self) -> f64 {
        self.coef
    }
}

fn coefficient(filter_type: FilterType, frequency: f64, sample_rate: f64) -> Result<f64> {
    if sample_rate.is_nan() || sample_rate <= 0.0 {
        return Err(SonanceError::invalid(format!(
            "sample rate must be greater than 0, got {sample_rate}"
        )));
    }
    if !frequency.is_finite() || frequency < 0.0 {
        return Err(SonanceError::invalid(format!(
            "cutoff must be a non-negative frequency, got {frequency}"
        )));
    }
    let b = 2.0 - (TAU * frequency / sample_rate).cos();
    let root = (b * b - 1.0).sqrt();
    Ok(match filter_type {
        FilterType::Lowpass => root - b,
        FilterType::Highpass => b - root,
    })
}

fn run(
    filter_type: FilterType,
    input: &[f64],
    frequency: f64,
    delay: f64,
    sample_rate: f64,
) -> Result<(Vec<f64>, f64)> {
    let mut filter = OnePole::new(filter_type, frequency, sample_rate)?.with_delay(delay);
    let output = input.iter().map(|&x| filter.process(x)).collect();
    Ok((output, filter.delay()))
}

/// Low-pass `input`, starting from `delay`. Returns the filtered copy and
/// the delay to pass to the next block.
pub fn lowpass(
    input: &[f64],
    frequency: f64,
    delay: f64,
    sample_rate: f64,
) -> Result<(Vec<f64>, f64)> {
    run(FilterType::Lowpass, input, frequency, delay, sample_rate)
}

/// High-pass counterpart of [`lowpass`].
pub fn highpass(
    input: &[f64],
    frequency: f64,
    delay: f64,
    sample_rate: f64,
) -> Result<(Vec<f64>, f64)> {
    run(FilterType::Highpass, input, frequency, delay, sample_rate)
}

/// Smoothed power of the signal and the comparator between balance calls.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BalanceState {
    pub signal: f64,
    pub comparator: f64,
}

/// Rescale `signal` so its smoothed level follows that of `comparator`.
///
/// Both squared inputs run through the same low-pass; each output sample is
/// the input times `sqrt(comparator) / sqrt(signal)` of the smoothed powers.
/// While the signal's smoothed power is 0, the input is multiplied by
/// `sqrt(comparator)` instead.
pub fn balance(
    signal: &[f64],
    comparator: &[f64],
    frequency: f64,
    sample_rate: f64,
    state: BalanceState,
) -> Result<(Vec<f64>, BalanceState)> {
    if signal.len() != comparator.len() {
        return Err(SonanceError::invalid(format!(
            "balance needs equal lengths, got {} and {}",
            signal.len(),
            comparator.len()
        )));
    }
    let mut q = OnePole::new(FilterType::Lowpass, frequency, sample_rate)?
        .with_delay(state.signal);
    let mut r = OnePole::new(FilterType::Lowpass, frequency, sample_rate)?
        .with_delay(state.comparator);

    let output = signal
        .iter()
        .zip(comparator)
        .map(|(&s, &c)| {
            let sig_power = q.process(s * s);
            let cmp_power = r.process(c * c);
            if sig_power > 0.0 {
                s * (cmp_power.sqrt() / sig_power.sqrt())
            } else {
                s * cmp_power.sqrt()
            }
        })
        .collect();

    Ok((
        output,
        BalanceState {
            signal: q.delay(),
            comparator: r.delay(),
        },
    ))
}
