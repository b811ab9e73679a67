//! WAVE decoder.

use std::borrow::Cow;
use std::io::Read;

use log::{debug, warn};

use super::{DATA_ID, FMT_ID, JUNK_ID, PCM_FMT_SIZE, RIFF_ID, WAVE_ID, Wave};
use crate::error::{FormatError, Result};
use crate::sample::{AudioBuffer, BitDepth, Format, scale};

const RIFF_HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

/// Decode a complete WAVE file into an audio buffer.
pub fn decode(bytes: &[u8]) -> Result<AudioBuffer> {
    Ok(decode_wave(bytes)?.buffer)
}

/// Read a byte source to the end and decode it.
pub fn read_wave<R: Read>(mut reader: R) -> Result<Wave> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    decode_wave(&bytes)
}

/// Decode a complete WAVE file, keeping the declared chunk sizes.
pub fn decode_wave(bytes: &[u8]) -> Result<Wave> {
    let riff_size = read_riff_header(bytes)?;
    if riff_size as usize + CHUNK_HEADER_LEN != bytes.len() {
        debug!(
            "RIFF size {} does not match file length {}",
            riff_size,
            bytes.len()
        );
    }

    let bytes = strip_junk(bytes)?;
    let (format, fmt_size) = read_fmt(&bytes)?;

    let data_offset = RIFF_HEADER_LEN + CHUNK_HEADER_LEN + padded(fmt_size);
    let (data_start, data_size) = find_data(&bytes, data_offset)?;
    let raw = &bytes[data_start..data_start + data_size as usize];

    let samples = decode_samples(raw, format.bit_depth());
    debug!(
        "decoded {} samples ({} ch, {} Hz, {} bit)",
        samples.len(),
        format.channels(),
        format.sample_rate(),
        format.bit_depth().bits()
    );

    Ok(Wave {
        riff_size,
        data_size,
        buffer: AudioBuffer::new(format, samples),
    })
}

fn read_riff_header(bytes: &[u8]) -> Result<u32> {
    require(bytes, 0, RIFF_HEADER_LEN, "RIFF")?;
    expect_tag(bytes, 0, RIFF_ID, "RIFF")?;
    let size = read_u32(bytes, 4);
    expect_tag(bytes, 8, WAVE_ID, "WAVE")?;
    Ok(size)
}

/// Splice out any `JUNK` chunks sitting between the RIFF header and `fmt `.
fn strip_junk(bytes: &[u8]) -> Result<Cow<'_, [u8]>> {
    let mut bytes = Cow::Borrowed(bytes);
    while bytes.len() >= RIFF_HEADER_LEN + CHUNK_HEADER_LEN
        && bytes[RIFF_HEADER_LEN..RIFF_HEADER_LEN + 4].eq_ignore_ascii_case(JUNK_ID)
    {
        let size = read_u32(&bytes, RIFF_HEADER_LEN + 4) as usize;
        require(&bytes, RIFF_HEADER_LEN + CHUNK_HEADER_LEN, size, "JUNK")?;
        let end = (RIFF_HEADER_LEN + CHUNK_HEADER_LEN + padded(size as u32)).min(bytes.len());
        debug!("skipping {size} byte JUNK chunk");

        let mut spliced = Vec::with_capacity(bytes.len() - (end - RIFF_HEADER_LEN));
        spliced.extend_from_slice(&bytes[..RIFF_HEADER_LEN]);
        spliced.extend_from_slice(&bytes[end..]);
        bytes = Cow::Owned(spliced);
    }
    Ok(bytes)
}

/// Parse the `fmt ` chunk at offset 12. Returns the format and the declared
/// chunk size.
fn read_fmt(bytes: &[u8]) -> Result<(Format, u32)> {
    let id_at = RIFF_HEADER_LEN;
    require(bytes, id_at, CHUNK_HEADER_LEN, "fmt ")?;
    if &bytes[id_at..id_at + 4] != FMT_ID {
        return Err(FormatError::MissingChunk("fmt ").into());
    }

    let fmt_size = read_u32(bytes, id_at + 4);
    if fmt_size < PCM_FMT_SIZE {
        return Err(FormatError::InvalidFormat(format!(
            "fmt chunk size {fmt_size} is smaller than {PCM_FMT_SIZE}"
        ))
        .into());
    }
    let body = id_at + CHUNK_HEADER_LEN;
    require(bytes, body, fmt_size as usize, "fmt ")?;

    let audio_format = read_u16(bytes, body);
    let channels = read_u16(bytes, body + 2);
    let sample_rate = read_u32(bytes, body + 4);
    let byte_rate = read_u32(bytes, body + 8);
    let block_align = read_u16(bytes, body + 12);
    let bits = read_u16(bytes, body + 14);

    if channels == 0 {
        return Err(FormatError::InvalidFormat("channel count is 0".into()).into());
    }
    if sample_rate == 0 {
        return Err(FormatError::InvalidFormat("sample rate is 0".into()).into());
    }
    let depth = BitDepth::try_from(bits)?;

    let mut extra_params = Vec::new();
    if fmt_size != PCM_FMT_SIZE && fmt_size >= PCM_FMT_SIZE + 2 {
        let extra_size = read_u16(bytes, body + 16) as usize;
        let extra_at = body + 18;
        require(bytes, extra_at, extra_size, "fmt ")?;
        extra_params = bytes[extra_at..extra_at + extra_size].to_vec();
        debug!("fmt chunk carries {extra_size} bytes of extra params");
    }

    let format = Format::from_header(
        audio_format,
        channels,
        sample_rate,
        byte_rate,
        block_align,
        depth,
        extra_params,
    );
    Ok((format, fmt_size))
}

/// Locate the `data` chunk starting at `offset`, skipping any chunks (LIST,
/// fact, ...) that sit between `fmt ` and `data`. Returns the payload start
/// and its declared size.
fn find_data(bytes: &[u8], mut offset: usize) -> Result<(usize, u32)> {
    while offset + CHUNK_HEADER_LEN <= bytes.len() {
        let id = &bytes[offset..offset + 4];
        let size = read_u32(bytes, offset + 4);
        let body = offset + CHUNK_HEADER_LEN;
        if id == DATA_ID {
            require(bytes, body, size as usize, "data")?;
            return Ok((body, size));
        }
        debug!(
            "skipping unknown '{}' chunk ({size} bytes)",
            String::from_utf8_lossy(id)
        );
        offset = body.saturating_add(padded(size));
    }
    Err(FormatError::MissingChunk("data").into())
}

fn decode_samples(raw: &[u8], depth: BitDepth) -> Vec<f64> {
    let width = depth.bytes();
    let remainder = raw.len() % width;
    if remainder != 0 {
        warn!("ignoring {remainder} trailing bytes that do not form a whole sample");
    }
    raw.chunks_exact(width)
        .map(|chunk| scale(decode_sample(chunk, depth), depth))
        .collect()
}

/// Interpret one little-endian signed sample of `depth.bytes()` bytes.
fn decode_sample(b: &[u8], depth: BitDepth) -> i64 {
    match depth {
        BitDepth::Eight => b[0] as i8 as i64,
        BitDepth::Sixteen => i16::from_le_bytes([b[0], b[1]]) as i64,
        // Zero-pad the low byte, then shift back down to keep the sign.
        BitDepth::TwentyFour => (i32::from_le_bytes([0, b[0], b[1], b[2]]) >> 8) as i64,
        BitDepth::ThirtyTwo => i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64,
        BitDepth::SixtyFour => {
            i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]])
        }
    }
}

fn padded(size: u32) -> usize {
    size as usize + (size as usize & 1)
}

fn require(bytes: &[u8], at: usize, len: usize, chunk: &'static str) -> Result<()> {
    let available = bytes.len().saturating_sub(at);
    if available < len {
        return Err(FormatError::Truncated {
            chunk,
            needed: len,
            available,
        }
        .into());
    }
    Ok(())
}

fn expect_tag(bytes: &[u8], at: usize, tag: &[u8; 4], name: &'static str) -> Result<()> {
    let found = [bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]];
    if &found != tag {
        return Err(FormatError::BadMagic {
            expected: name,
            found,
        }
        .into());
    }
    Ok(())
}

fn read_u16(b: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([b[at], b[at + 1]])
}

fn read_u32(b: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([b[at], b[at + 1], b[at + 2], b[at + 3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SonanceError;

    /// Hand-assembled PCM file.
    fn wav_bytes(channels: u16, sample_rate: u32, bits: u16, data: &[u8]) -> Vec<u8> {
        let block_align = channels * bits / 8;
        let mut b = Vec::new();
        b.extend_from_slice(b"RIFF");
        b.extend_from_slice(&(36 + data.len() as u32).to_le_bytes());
        b.extend_from_slice(b"WAVE");
        b.extend_from_slice(b"fmt ");
        b.extend_from_slice(&16u32.to_le_bytes());
        b.extend_from_slice(&1u16.to_le_bytes());
        b.extend_from_slice(&channels.to_le_bytes());
        b.extend_from_slice(&sample_rate.to_le_bytes());
        b.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
        b.extend_from_slice(&block_align.to_le_bytes());
        b.extend_from_slice(&bits.to_le_bytes());
        b.extend_from_slice(b"data");
        b.extend_from_slice(&(data.len() as u32).to_le_bytes());
        b.extend_from_slice(data);
        b
    }

    fn with_junk(wav: &[u8], tag: &[u8; 4], junk_len: usize) -> Vec<u8> {
        let mut b = wav[..12].to_vec();
        b.extend_from_slice(tag);
        b.extend_from_slice(&(junk_len as u32).to_le_bytes());
        b.extend(std::iter::repeat_n(0u8, junk_len));
        b.extend_from_slice(&wav[12..]);
        b
    }

    #[test]
    fn decodes_16_bit_stereo() {
        let mut data = Vec::new();
        for v in [32_767i16, -32_767, 0, 16_384] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let wave = decode_wave(&wav_bytes(2, 44_100, 16, &data)).unwrap();
        let buf = &wave.buffer;
        assert_eq!(buf.format.channels(), 2);
        assert_eq!(buf.format.sample_rate(), 44_100);
        assert_eq!(buf.format.bit_depth(), BitDepth::Sixteen);
        assert_eq!(wave.data_size, 8);
        assert_eq!(buf.samples[0], 1.0);
        assert_eq!(buf.samples[1], -1.0);
        assert_eq!(buf.samples[2], 0.0);
        assert!((buf.samples[3] - 16_384.0 / 32_767.0).abs() < 1e-12);
    }

    #[test]
    fn decodes_8_bit_as_signed() {
        let data = [127u8, 0x81, 0];
        let buf = decode(&wav_bytes(1, 8_000, 8, &data)).unwrap();
        assert_eq!(buf.samples, vec![1.0, -1.0, 0.0]);
    }

    #[test]
    fn decodes_24_bit_with_sign_extension() {
        let mut data = Vec::new();
        for v in [8_388_607i32, -8_388_607, -1, 1] {
            data.extend_from_slice(&v.to_le_bytes()[..3]);
        }
        let buf = decode(&wav_bytes(1, 48_000, 24, &data)).unwrap();
        assert_eq!(buf.samples[0], 1.0);
        assert_eq!(buf.samples[1], -1.0);
        assert!((buf.samples[2] + 1.0 / 8_388_607.0).abs() < 1e-15);
        assert!((buf.samples[3] - 1.0 / 8_388_607.0).abs() < 1e-15);
    }

    #[test]
    fn decodes_64_bit() {
        let mut data = Vec::new();
        for v in [i64::MAX, -i64::MAX, 0, 1 << 62] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let wave = decode_wave(&wav_bytes(1, 48_000, 64, &data)).unwrap();
        let format = &wave.buffer.format;
        assert_eq!(format.bit_depth(), BitDepth::SixtyFour);
        assert_eq!(format.block_align(), 8);
        assert_eq!(format.byte_rate(), 384_000);
        assert_eq!(wave.data_size, 32);
        // i64::MAX rounds to 2^63 as f64, so the extremes scale exactly.
        assert_eq!(wave.buffer.samples, vec![1.0, -1.0, 0.0, 0.5]);
    }

    #[test]
    fn decodes_32_bit() {
        let mut data = Vec::new();
        for v in [i32::MAX, -i32::MAX] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        let buf = decode(&wav_bytes(1, 8_000, 32, &data)).unwrap();
        assert_eq!(buf.samples, vec![1.0, -1.0]);
    }

    #[test]
    fn rejects_bad_riff_tag() {
        let mut bytes = wav_bytes(1, 8_000, 16, &[0, 0]);
        bytes[0..4].copy_from_slice(b"RIFX");
        match decode(&bytes) {
            Err(SonanceError::Format(FormatError::BadMagic { expected, found })) => {
                assert_eq!(expected, "RIFF");
                assert_eq!(&found, b"RIFX");
            }
            other => panic!("expected BadMagic, got {other:?}"),
        }
    }

    #[test]
    fn rejects_bad_wave_tag() {
        let mut bytes = wav_bytes(1, 8_000, 16, &[0, 0]);
        bytes[8..12].copy_from_slice(b"AVI ");
        assert!(matches!(
            decode(&bytes),
            Err(SonanceError::Format(FormatError::BadMagic { expected: "WAVE", .. }))
        ));
    }

    #[test]
    fn rejects_short_input() {
        assert!(matches!(
            decode(b"RIFF"),
            Err(SonanceError::Format(FormatError::Truncated { chunk: "RIFF", .. }))
        ));
    }

    #[test]
    fn rejects_truncated_data() {
        let mut bytes = wav_bytes(1, 8_000, 16, &[1, 0, 2, 0, 3, 0]);
        bytes.truncate(bytes.len() - 2);
        match decode(&bytes) {
            Err(SonanceError::Format(FormatError::Truncated {
                chunk,
                needed,
                available,
            })) => {
                assert_eq!(chunk, "data");
                assert_eq!(needed, 6);
                assert_eq!(available, 4);
            }
            other => panic!("expected Truncated, got {other:?}"),
        }
    }

    #[test]
    fn rejects_missing_data_chunk() {
        let bytes = wav_bytes(1, 8_000, 16, &[]);
        let without_data = &bytes[..36];
        assert!(matches!(
            decode(without_data),
            Err(SonanceError::Format(FormatError::MissingChunk("data")))
        ));
    }

    #[test]
    fn rejects_unsupported_bit_depth() {
        let bytes = wav_bytes(1, 8_000, 12, &[0, 0, 0]);
        assert!(matches!(
            decode(&bytes),
            Err(SonanceError::Format(FormatError::UnsupportedBitDepth(12)))
        ));
    }

    #[test]
    fn skips_junk_chunk_case_insensitively() {
        let plain = wav_bytes(2, 48_000, 16, &[0, 0, 255, 127]);
        for tag in [b"JUNK", b"junk", b"Junk"] {
            let bytes = with_junk(&plain, tag, 28);
            let buf = decode(&bytes).unwrap();
            assert_eq!(buf.format.sample_rate(), 48_000);
            assert_eq!(buf.format.channels(), 2);
            assert_eq!(buf.samples, vec![0.0, 1.0]);
        }
    }

    #[test]
    fn skips_odd_sized_junk_with_padding() {
        let plain = wav_bytes(1, 8_000, 16, &[255, 127]);
        let mut bytes = plain[..12].to_vec();
        bytes.extend_from_slice(b"JUNK");
        bytes.extend_from_slice(&3u32.to_le_bytes());
        bytes.extend_from_slice(&[9, 9, 9, 0]);
        bytes.extend_from_slice(&plain[12..]);
        assert_eq!(decode(&bytes).unwrap().samples, vec![1.0]);
    }

    #[test]
    fn skips_chunks_between_fmt_and_data() {
        let plain = wav_bytes(1, 8_000, 16, &[255, 127]);
        let mut bytes = plain[..36].to_vec();
        bytes.extend_from_slice(b"LIST");
        bytes.extend_from_slice(&4u32.to_le_bytes());
        bytes.extend_from_slice(b"INFO");
        bytes.extend_from_slice(&plain[36..]);
        assert_eq!(decode(&bytes).unwrap().samples, vec![1.0]);
    }

    #[test]
    fn preserves_extra_params() {
        let plain = wav_bytes(1, 8_000, 16, &[0, 0]);
        let mut bytes = plain[..16].to_vec();
        bytes.extend_from_slice(&20u32.to_le_bytes());
        bytes.extend_from_slice(&plain[20..36]);
        bytes.extend_from_slice(&2u16.to_le_bytes());
        bytes.extend_from_slice(&[0xAB, 0xCD]);
        bytes.extend_from_slice(&plain[36..]);

        let buf = decode(&bytes).unwrap();
        assert_eq!(buf.format.extra_params, vec![0xAB, 0xCD]);
        assert_eq!(buf.samples, vec![0.0]);
    }

    #[test]
    fn ignores_trailing_partial_sample() {
        let buf = decode(&wav_bytes(1, 8_000, 16, &[255, 127, 7])).unwrap();
        assert_eq!(buf.samples, vec![1.0]);
    }

    #[test]
    fn reads_from_io_source() {
        let bytes = wav_bytes(1, 8_000, 16, &[255, 127]);
        let wave = read_wave(std::io::Cursor::new(bytes)).unwrap();
        assert_eq!(wave.buffer.samples, vec![1.0]);
    }

    #[test]
    fn decodes_hound_output() {
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = std::io::Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for v in [1000i16, -1000, 32_767, -32_767] {
                writer.write_sample(v).unwrap();
            }
            writer.finalize().unwrap();
        }

        let buf = decode(&cursor.into_inner()).unwrap();
        assert_eq!(buf.format.channels(), 2);
        assert_eq!(buf.format.sample_rate(), 22_050);
        assert_eq!(buf.samples.len(), 4);
        assert!((buf.samples[0] - 1000.0 / 32_767.0).abs() < 1e-12);
        assert_eq!(buf.samples[2], 1.0);
        assert_eq!(buf.samples[3], -1.0);
    }
}
