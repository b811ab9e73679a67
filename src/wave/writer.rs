//! WAVE encoder.

use std::io::Write;

use log::{debug, warn};

use super::{DATA_ID, FMT_ID, PCM_FMT_SIZE, RIFF_ID, WAVE_ID};
use crate::error::{Result, SonanceError};
use crate::sample::{AudioBuffer, BitDepth};

/// Serialize a buffer as a complete WAVE file.
///
/// PCM formats get the canonical 44-byte header. Formats that carry extra
/// params (or a non-PCM `audio_format`) get an 18-byte `fmt ` body plus the
/// extra bytes.
pub fn encode(buffer: &AudioBuffer) -> Result<Vec<u8>> {
    let format = &buffer.format;
    let depth = format.bit_depth();

    if buffer.samples.len() % format.channels() as usize != 0 {
        warn!(
            "{} samples do not divide into {} channels; last frame is partial",
            buffer.samples.len(),
            format.channels()
        );
    }

    let data_len = buffer.samples.len() * depth.bytes();
    let fmt_size = if format.is_pcm() {
        PCM_FMT_SIZE as usize
    } else {
        PCM_FMT_SIZE as usize + 2 + format.extra_params.len()
    };
    let riff_size = 4 + (8 + fmt_size) + (8 + data_len);
    let riff_size = u32::try_from(riff_size)
        .map_err(|_| SonanceError::invalid(format!("{data_len} bytes of samples exceed the RIFF size limit")))?;

    let mut buf = Vec::with_capacity(riff_size as usize + 8);

    // RIFF header
    buf.extend_from_slice(RIFF_ID);
    buf.extend_from_slice(&riff_size.to_le_bytes());
    buf.extend_from_slice(WAVE_ID);

    // fmt chunk
    buf.extend_from_slice(FMT_ID);
    buf.extend_from_slice(&(fmt_size as u32).to_le_bytes());
    buf.extend_from_slice(&format.audio_format.to_le_bytes());
    buf.extend_from_slice(&format.channels().to_le_bytes());
    buf.extend_from_slice(&format.sample_rate().to_le_bytes());
    buf.extend_from_slice(&format.byte_rate().to_le_bytes());
    buf.extend_from_slice(&format.block_align().to_le_bytes());
    buf.extend_from_slice(&depth.bits().to_le_bytes());
    if !format.is_pcm() {
        buf.extend_from_slice(&(format.extra_params.len() as u16).to_le_bytes());
        buf.extend_from_slice(&format.extra_params);
    }

    // data chunk
    buf.extend_from_slice(DATA_ID);
    buf.extend_from_slice(&(data_len as u32).to_le_bytes());
    for &sample in &buffer.samples {
        encode_sample(sample, depth, &mut buf);
    }

    debug!(
        "encoded {} samples into {} bytes",
        buffer.samples.len(),
        buf.len()
    );
    Ok(buf)
}

/// Encode `buffer` and write it to `sink`.
pub fn write_wave<W: Write>(buffer: &AudioBuffer, mut sink: W) -> Result<()> {
    let bytes = encode(buffer)?;
    sink.write_all(&bytes)?;
    sink.flush()?;
    Ok(())
}

/// Append one sample at `depth`, truncating toward zero. Values outside
/// [-1, 1] saturate at the integer range of the width.
fn encode_sample(sample: f64, depth: BitDepth, out: &mut Vec<u8>) {
    let v = sample * depth.max_value();
    match depth {
        BitDepth::Eight => out.push(v as i8 as u8),
        BitDepth::Sixteen => out.extend_from_slice(&(v as i16).to_le_bytes()),
        BitDepth::TwentyFour => {
            let v = (v as i32).clamp(-8_388_608, 8_388_607);
            out.extend_from_slice(&v.to_le_bytes()[..3]);
        }
        BitDepth::ThirtyTwo => out.extend_from_slice(&(v as i32).to_le_bytes()),
        BitDepth::SixtyFour => out.extend_from_slice(&(v as i64).to_le_bytes()),
    }
}
