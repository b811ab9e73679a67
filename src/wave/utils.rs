use crate::sample::AudioBuffer;

/// Split a buffer's samples into consecutive batches of `seconds` each.
///
/// The batch length is `sample_rate * channels * seconds` samples; the last
/// batch holds whatever remains. A duration of zero (or less) yields the
/// whole buffer as a single batch.
pub fn batch_samples(buffer: &AudioBuffer, seconds: f64) -> Vec<&[f64]> {
    if seconds <= 0.0 {
        return vec![buffer.samples.as_slice()];
    }
    let per_second = buffer.format.sample_rate() as f64 * buffer.format.channels() as f64;
    let size = ((per_second * seconds) as usize).max(1);
    buffer.samples.chunks(size).collect()
}
