//! Signal generation and processing over `f64` samples.
//!
//! Generators ([`oscillator`], [`wavetable`], [`envelope`]) produce one
//! sample per call; processors ([`filter`], [`pan`], [`spectral`]) work on
//! whole buffers. [`renderer`] ties the generators together for a
//! [`TonePatch`](crate::patch::TonePatch).

pub mod envelope;
pub mod filter;
pub mod oscillator;
pub mod pan;
pub mod renderer;
pub mod spectral;
pub mod tuner;
pub mod wavetable;
