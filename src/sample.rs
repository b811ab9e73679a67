//! Sample representation shared by the codec, the generators and the
//! transforms.
//!
//! Samples are `f64` values normalized to [-1.0, 1.0]. The normalization
//! factor depends only on the bit depth the samples came from (or are going
//! to): the signed integer maximum for that width.

use serde::{Deserialize, Serialize};

use crate::error::{FormatError, Result, SonanceError};

/// `audio_format` tag for uncompressed PCM.
pub const PCM_FORMAT: u16 = 1;

/// Supported sample widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum BitDepth {
    Eight,
    Sixteen,
    TwentyFour,
    ThirtyTwo,
    SixtyFour,
}

impl BitDepth {
    pub fn bits(self) -> u16 {
        match self {
            BitDepth::Eight => 8,
            BitDepth::Sixteen => 16,
            BitDepth::TwentyFour => 24,
            BitDepth::ThirtyTwo => 32,
            BitDepth::SixtyFour => 64,
        }
    }

    pub fn bytes(self) -> usize {
        self.bits() as usize / 8
    }

    /// Largest positive integer representable at this width.
    pub fn max_value(self) -> f64 {
        match self {
            BitDepth::Eight => i8::MAX as f64,
            BitDepth::Sixteen => i16::MAX as f64,
            BitDepth::TwentyFour => 8_388_607.0,
            BitDepth::ThirtyTwo => i32::MAX as f64,
            BitDepth::SixtyFour => i64::MAX as f64,
        }
    }
}

impl TryFrom<u16> for BitDepth {
    type Error = FormatError;

    fn try_from(bits: u16) -> std::result::Result<Self, Self::Error> {
        match bits {
            8 => Ok(BitDepth::Eight),
            16 => Ok(BitDepth::Sixteen),
            24 => Ok(BitDepth::TwentyFour),
            32 => Ok(BitDepth::ThirtyTwo),
            64 => Ok(BitDepth::SixtyFour),
            other => Err(FormatError::UnsupportedBitDepth(other)),
        }
    }
}

impl From<BitDepth> for u16 {
    fn from(depth: BitDepth) -> u16 {
        depth.bits()
    }
}

/// Scale a raw integer sample into [-1, 1].
pub fn scale(raw: i64, depth: BitDepth) -> f64 {
    raw as f64 / depth.max_value()
}

/// Inverse of [`scale`]: multiply by the same magnitude and truncate toward
/// zero. Out-of-range input saturates at the integer bounds of `i64`.
pub fn rescale(sample: f64, depth: BitDepth) -> i64 {
    (sample * depth.max_value()) as i64
}

/// Format descriptor of an audio buffer.
///
/// `byte_rate` and `block_align` are stored rather than derived so that a
/// decoded file re-encodes with exactly the header fields it declared. They
/// are recomputed whenever the layout changes through [`Format::set_channels`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FormatSpec")]
pub struct Format {
    pub audio_format: u16,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: BitDepth,
    byte_rate: u32,
    block_align: u16,
    /// Opaque trailing `fmt ` bytes of non-PCM files, kept for round trip.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_params: Vec<u8>,
}

/// Deserialized shape of a [`Format`]; derived fields are always recomputed.
#[derive(Deserialize)]
struct FormatSpec {
    #[serde(default = "default_audio_format")]
    audio_format: u16,
    channels: u16,
    sample_rate: u32,
    bits_per_sample: BitDepth,
    #[serde(default)]
    extra_params: Vec<u8>,
}

fn default_audio_format() -> u16 {
    PCM_FORMAT
}

impl TryFrom<FormatSpec> for Format {
    type Error = SonanceError;

    fn try_from(spec: FormatSpec) -> Result<Self> {
        let mut format = Format::new(spec.channels, spec.sample_rate, spec.bits_per_sample)?;
        format.audio_format = spec.audio_format;
        format.extra_params = spec.extra_params;
        Ok(format)
    }
}

impl Format {
    /// A PCM format with derived byte rate and block alignment.
    pub fn new(channels: u16, sample_rate: u32, bits_per_sample: BitDepth) -> Result<Self> {
        if channels == 0 {
            return Err(SonanceError::invalid("channel count must be at least 1"));
        }
        if sample_rate == 0 {
            return Err(SonanceError::invalid("sample rate must be greater than 0"));
        }
        let mut format = Format {
            audio_format: PCM_FORMAT,
            channels,
            sample_rate,
            bits_per_sample,
            byte_rate: 0,
            block_align: 0,
            extra_params: Vec::new(),
        };
        format.recompute_derived();
        Ok(format)
    }

    /// Rebuild a format from the raw fields of a `fmt ` chunk.
    pub(crate) fn from_header(
        audio_format: u16,
        channels: u16,
        sample_rate: u32,
        byte_rate: u32,
        block_align: u16,
        bits_per_sample: BitDepth,
        extra_params: Vec<u8>,
    ) -> Self {
        Format {
            audio_format,
            channels,
            sample_rate,
            bits_per_sample,
            byte_rate,
            block_align,
            extra_params,
        }
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn bit_depth(&self) -> BitDepth {
        self.bits_per_sample
    }

    pub fn byte_rate(&self) -> u32 {
        self.byte_rate
    }

    pub fn block_align(&self) -> u16 {
        self.block_align
    }

    pub fn is_pcm(&self) -> bool {
        self.extra_params.is_empty() && self.audio_format == PCM_FORMAT
    }

    /// Change the channel count, recomputing byte rate and block alignment.
    pub fn set_channels(&mut self, channels: u16) -> Result<()> {
        if channels == 0 {
            return Err(SonanceError::invalid("channel count must be at least 1"));
        }
        self.channels = channels;
        self.recompute_derived();
        Ok(())
    }

    fn recompute_derived(&mut self) {
        let bits = self.bits_per_sample.bits() as u64;
        let block_align = self.channels as u64 * bits / 8;
        self.byte_rate = (self.sample_rate as u64 * block_align).min(u32::MAX as u64) as u32;
        self.block_align = block_align.min(u16::MAX as u64) as u16;
    }
}

/// Interleaved samples paired with their format.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub format: Format,
    pub samples: Vec<f64>,
}

impl AudioBuffer {
    pub fn new(format: Format, samples: Vec<f64>) -> Self {
        AudioBuffer { format, samples }
    }

    /// Duplicate a mono signal across every channel of `format`.
    pub fn from_mono(format: Format, mono: &[f64]) -> Self {
        let channels = format.channels() as usize;
        let mut samples = Vec::with_capacity(mono.len() * channels);
        for &s in mono {
            samples.extend(std::iter::repeat_n(s, channels));
        }
        AudioBuffer { format, samples }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of complete frames (one sample per channel).
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.format.channels() as usize
    }

    /// Length in seconds.
    pub fn duration(&self) -> f64 {
        self.frame_count() as f64 / self.format.sample_rate() as f64
    }

    /// Iterate over frames as slices of `channels` samples.
    pub fn frames(&self) -> impl Iterator<Item = &[f64]> {
        self.samples.chunks_exact(self.format.channels() as usize)
    }

    /// De-interleave a single channel.
    pub fn channel(&self, index: usize) -> Option<Vec<f64>> {
        if index >= self.format.channels() as usize {
            return None;
        }
        Some(self.frames().map(|frame| frame[index]).collect())
    }

    /// A copy with every sample multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> AudioBuffer {
        self.map(|s| s * factor)
    }

    /// A copy with `f` applied to every sample.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> AudioBuffer {
        AudioBuffer {
            format: self.format.clone(),
            samples: self.samples.iter().map(|&s| f(s)).collect(),
        }
    }
}
