//! RIFF/WAVE container codec.
//!
//! ```text
//! offset  size  field
//! 0       4     "RIFF"
//! 4       4     chunk size (file length - 8)
//! 8       4     "WAVE"
//! 12      4     "fmt "
//! 16      4     fmt chunk size (16 for PCM)
//! 20      2     audio format
//! 22      2     channels
//! 24      4     sample rate
//! 28      4     byte rate
//! 32      2     block align
//! 34      2     bits per sample
//! 36      2     extra param size   (non-PCM only)
//! 38      *     extra params       (non-PCM only)
//! 36(+)   4     "data"
//! 40(+)   4     data size
//! 44(+)   *     little-endian samples, interleaved per frame
//! ```
//!
//! Decoding and encoding are whole-buffer operations over byte slices.

pub mod reader;
pub mod utils;
pub mod writer;

use serde::Serialize;

use crate::sample::AudioBuffer;

pub use reader::{decode, decode_wave, read_wave};
pub use utils::batch_samples;
pub use writer::{encode, write_wave};

pub const RIFF_ID: &[u8; 4] = b"RIFF";
pub const WAVE_ID: &[u8; 4] = b"WAVE";
pub const FMT_ID: &[u8; 4] = b"fmt ";
pub const DATA_ID: &[u8; 4] = b"data";
pub const JUNK_ID: &[u8; 4] = b"JUNK";

/// Size of the `fmt ` chunk body for plain PCM.
pub const PCM_FMT_SIZE: u32 = 16;

/// A decoded file: the samples plus the sizes its header declared.
#[derive(Debug, Clone, PartialEq)]
pub struct Wave {
    /// Declared RIFF chunk size (file length minus 8).
    pub riff_size: u32,
    /// Declared `data` chunk size in bytes.
    pub data_size: u32,
    pub buffer: AudioBuffer,
}

/// Header summary of a decoded file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaveInfo {
    pub audio_format: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
    pub data_size: u32,
    pub frame_count: usize,
    pub duration_secs: f64,
}

impl Wave {
    pub fn info(&self) -> WaveInfo {
        let format = &self.buffer.format;
        WaveInfo {
            audio_format: format.audio_format,
            channels: format.channels(),
            sample_rate: format.sample_rate(),
            byte_rate: format.byte_rate(),
            block_align: format.block_align(),
            bits_per_sample: format.bit_depth().bits(),
            data_size: self.data_size,
            frame_count: self.buffer.frame_count(),
            duration_secs: self.buffer.duration(),
        }
    }
}
