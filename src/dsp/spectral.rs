//! Discrete Fourier transforms over real sample buffers.

use std::f64::consts::TAU;

use num_complex::Complex64;

use crate::error::{Result, SonanceError};

/// Naive O(N²) DFT, each bin divided by N.
///
/// Kept as a reference to check [`fft`] against; use [`fft`] for real work.
pub fn dft(input: &[f64]) -> Vec<Complex64> {
    let n = input.len();
    (0..n)
        .map(|k| {
            let sum: Complex64 = input
                .iter()
                .enumerate()
                .map(|(t, &x)| x * Complex64::from_polar(1.0, -TAU * (k * t % n) as f64 / n as f64))
                .sum();
            sum / n as f64
        })
        .collect()
}

/// Radix-2 Cooley-Tukey FFT. The output is not normalized.
///
/// The length must be a non-zero power of two.
pub fn fft(input: &[f64]) -> Result<Vec<Complex64>> {
    if !input.len().is_power_of_two() {
        return Err(SonanceError::invalid(format!(
            "FFT length must be a power of two, got {}",
            input.len()
        )));
    }
    let mut out = vec![Complex64::new(0.0, 0.0); input.len()];
    fft_unchecked(input, 1, &mut out);
    Ok(out)
}

/// Transform every `stride`-th sample of `input` into `out`, whose length
/// sets the transform size.
fn fft_unchecked(input: &[f64], stride: usize, out: &mut [Complex64]) {
    let n = out.len();
    if n == 1 {
        out[0] = Complex64::new(input[0], 0.0);
        return;
    }

    let half = n / 2;
    let (evens, odds) = out.split_at_mut(half);
    fft_unchecked(input, stride * 2, evens);
    fft_unchecked(&input[stride..], stride * 2, odds);

    for k in 0..half {
        let twiddle = Complex64::from_polar(1.0, -TAU * k as f64 / n as f64) * odds[k];
        let even = evens[k];
        evens[k] = even + twiddle;
        odds[k] = even - twiddle;
    }
}

/// Magnitude of each bin.
pub fn magnitudes(spectrum: &[Complex64]) -> Vec<f64> {
    spectrum.iter().map(|c| c.norm()).collect()
}
