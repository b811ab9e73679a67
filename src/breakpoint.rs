//! Breakpoints: piecewise-linear control curves.
//!
//! A breakpoint file holds one `time:value` pair per line:
//!
//! ```text
//! 0.0:100
//! 10.0:50
//! 20.0:100
//! ```
//!
//! Times are not required to be ordered. Out-of-order points are kept as
//! written and interpolated segment by segment.

use std::io::Read;
use std::ops::Deref;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{BreakpointFault, FormatError, Result, SonanceError};
use crate::sample::AudioBuffer;
use crate::wave::batch_samples;

/// A `(time, value)` anchor. Time is in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub time: f64,
    pub value: f64,
}

impl Breakpoint {
    pub fn new(time: f64, value: f64) -> Self {
        Breakpoint { time, value }
    }
}

/// An ordered sequence of breakpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Breakpoints(pub Vec<Breakpoint>);

impl Deref for Breakpoints {
    type Target = [Breakpoint];

    fn deref(&self) -> &[Breakpoint] {
        &self.0
    }
}

impl From<Vec<Breakpoint>> for Breakpoints {
    fn from(points: Vec<Breakpoint>) -> Self {
        Breakpoints(points)
    }
}

impl From<Breakpoints> for Vec<Breakpoint> {
    fn from(points: Breakpoints) -> Self {
        points.0
    }
}

impl FromStr for Breakpoints {
    type Err = SonanceError;

    fn from_str(text: &str) -> Result<Self> {
        parse_breakpoints(text)
    }
}

impl Breakpoints {
    pub fn into_inner(self) -> Vec<Breakpoint> {
        self.0
    }

    /// True if any breakpoint satisfies `predicate`.
    pub fn any(&self, predicate: impl Fn(&Breakpoint) -> bool) -> bool {
        self.0.iter().any(predicate)
    }

    /// Smallest and largest value, or `None` when empty.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        let first = self.0.first()?.value;
        Some(
            self.0
                .iter()
                .fold((first, first), |(lo, hi), b| (lo.min(b.value), hi.max(b.value))),
        )
    }

    /// Interpolated value at `time`. See [`value_at`].
    pub fn value_at(&self, time: f64, hint: usize) -> (usize, f64) {
        value_at(&self.0, time, hint)
    }

    /// Serialize as breakpoint text with 8 decimal places per field.
    pub fn to_text(&self) -> String {
        self.0
            .iter()
            .map(|b| format!("{:.8}:{:.8}\n", b.time, b.value))
            .collect()
    }
}

/// Parse breakpoint text. Blank lines are skipped; surrounding whitespace on
/// a line or field is ignored.
pub fn parse_breakpoints(text: &str) -> Result<Breakpoints> {
    let mut points = Vec::new();
    // Spans are counted in chars for diagnostics.
    let mut offset = 0;

    for (idx, raw) in text.split('\n').enumerate() {
        let line_start = offset;
        offset += raw.chars().count() + 1;

        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let lead = raw.chars().take_while(|c| c.is_whitespace()).count();
        let span = line_start + lead..line_start + lead + line.chars().count();
        let fail = |reason| {
            SonanceError::from(FormatError::MalformedBreakpoint {
                line: idx + 1,
                span: span.clone(),
                reason,
            })
        };

        let fields: Vec<&str> = line.split(':').collect();
        let [time, value] = fields.as_slice() else {
            return Err(fail(BreakpointFault::FieldCount(fields.len())));
        };
        let time = parse_field(time, "time").map_err(&fail)?;
        let value = parse_field(value, "value").map_err(&fail)?;
        points.push(Breakpoint { time, value });
    }

    debug!("parsed {} breakpoints", points.len());
    Ok(Breakpoints(points))
}

/// Read a byte source to the end and parse it as breakpoint text.
pub fn read_breakpoints<R: Read>(mut reader: R) -> Result<Breakpoints> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    parse_breakpoints(&text)
}

fn parse_field(text: &str, field: &'static str) -> std::result::Result<f64, BreakpointFault> {
    let text = text.trim();
    text.parse::<f64>().map_err(|_| BreakpointFault::NotANumber {
        field,
        text: text.to_string(),
    })
}

/// Linear interpolation over `points` at an arbitrary `time`.
///
/// Scans forward from `hint` for the first point later than `time` and
/// interpolates the segment that ends there. Returns that point's index
/// together with the value; passing the index back as the next `hint` keeps
/// increasing-time queries amortized O(1).
///
/// Past the last point the last value is held. Before the first point the
/// first value is held. An empty slice yields `(0, 0.0)`.
pub fn value_at(points: &[Breakpoint], time: f64, hint: usize) -> (usize, f64) {
    let n = points.len();
    if n == 0 {
        return (0, 0.0);
    }

    let mut right = hint.min(n);
    while right < n && points[right].time <= time {
        right += 1;
    }

    if right == n {
        return (right, points[n - 1].value);
    }
    if right == 0 {
        return (0, points[0].value);
    }

    let left = points[right - 1];
    let next = points[right];
    let width = next.time - left.time;
    if width == 0.0 {
        return (right, next.value);
    }
    let frac = (time - left.time) / width;
    (right, left.value + (next.value - left.value) * frac)
}

/// Stream of interpolated values, one per tick at a fixed sample rate.
///
/// Once the last breakpoint has been passed, every tick returns the final
/// value.
#[derive(Debug, Clone)]
pub struct BreakpointStream {
    points: Vec<Breakpoint>,
    /// Index of the breakpoint ending the current segment.
    end: usize,
    position: f64,
    increment: f64,
    width: f64,
    height: f64,
    has_more: bool,
}

impl BreakpointStream {
    pub fn new(points: impl Into<Vec<Breakpoint>>, sample_rate: u32) -> Result<Self> {
        let points = points.into();
        if points.len() < 2 {
            return Err(SonanceError::InsufficientData {
                needed: 2,
                found: points.len(),
            });
        }
        if sample_rate == 0 {
            return Err(SonanceError::invalid("sample rate must be greater than 0"));
        }

        let mut stream = BreakpointStream {
            points,
            end: 1,
            position: 0.0,
            increment: 1.0 / sample_rate as f64,
            width: 0.0,
            height: 0.0,
            has_more: true,
        };
        stream.load_segment();
        Ok(stream)
    }

    fn left(&self) -> Breakpoint {
        self.points[self.end - 1]
    }

    fn right(&self) -> Breakpoint {
        self.points[self.end]
    }

    fn load_segment(&mut self) {
        let (left, right) = (self.left(), self.right());
        self.width = right.time - left.time;
        self.height = right.value - left.value;
    }

    /// Next value of the curve.
    pub fn tick(&mut self) -> f64 {
        if !self.has_more {
            return self.right().value;
        }

        let out = if self.width == 0.0 {
            self.right().value
        } else {
            let left = self.left();
            left.value + self.height * (self.position - left.time) / self.width
        };

        self.position += self.increment;
        while self.position > self.right().time {
            if self.end + 1 < self.points.len() {
                self.end += 1;
                self.load_segment();
            } else {
                self.has_more = false;
                break;
            }
        }
        out
    }

    /// `n` consecutive ticks.
    pub fn batch_tick(&mut self, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.tick()).collect()
    }

    /// Time in seconds of the next tick.
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn increment(&self) -> f64 {
        self.increment
    }

    /// False once the stream has run past its last breakpoint.
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn points(&self) -> &[Breakpoint] {
        &self.points
    }
}

/// Envelope of a buffer: one breakpoint per `window_seconds`, holding the
/// largest sample value in that window.
pub fn extract_peaks(buffer: &AudioBuffer, window_seconds: f64) -> Breakpoints {
    let mut elapsed = 0.0;
    let mut points = Vec::new();
    for batch in batch_samples(buffer, window_seconds) {
        let peak = if batch.is_empty() {
            0.0
        } else {
            batch.iter().copied().fold(-1.0, f64::max)
        };
        points.push(Breakpoint::new(elapsed, peak));
        elapsed += window_seconds;
    }
    Breakpoints(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::{BitDepth, Format};

    fn bp(points: &[(f64, f64)]) -> Vec<Breakpoint> {
        points.iter().map(|&(t, v)| Breakpoint::new(t, v)).collect()
    }

    #[test]
    fn stream_first_tick_advances_position() {
        let mut s = BreakpointStream::new(bp(&[(0.0, 100.0), (10.0, 50.0), (20.0, 100.0)]), 10)
            .unwrap();
        assert_eq!(s.tick(), 100.0);
        assert!((s.position() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn stream_interpolates_midpoint() {
        let mut s = BreakpointStream::new(bp(&[(0.0, 100.0), (10.0, 50.0), (20.0, 100.0)]), 10)
            .unwrap();
        let values = s.batch_tick(51);
        assert!((values[50] - 75.0).abs() < 1e-9, "tick 51 gave {}", values[50]);
    }

    #[test]
    fn stream_holds_last_value_forever() {
        let mut s = BreakpointStream::new(bp(&[(0.0, 100.0), (10.0, 50.0), (20.0, 100.0)]), 10)
            .unwrap();
        for _ in 0..202 {
            s.tick();
        }
        assert!(!s.has_more());
        for _ in 0..1_000_000 {
            assert_eq!(s.tick(), 100.0);
        }
    }

    #[test]
    fn stream_zero_width_segment_jumps() {
        let mut s = BreakpointStream::new(bp(&[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)]), 4).unwrap();
        assert_eq!(s.tick(), 1.0);
        assert_eq!(s.tick(), 1.0);
    }

    #[test]
    fn stream_skips_segments_shorter_than_a_tick() {
        let points = bp(&[(0.0, 0.0), (0.1, 5.0), (0.2, 10.0), (2.0, 10.0)]);
        let mut s = BreakpointStream::new(points, 1).unwrap();
        s.tick();
        assert_eq!(s.tick(), 10.0);
    }

    #[test]
    fn stream_needs_two_points() {
        match BreakpointStream::new(bp(&[(0.0, 1.0)]), 10) {
            Err(SonanceError::InsufficientData { needed, found }) => {
                assert_eq!((needed, found), (2, 1));
            }
            other => panic!("expected InsufficientData, got {other:?}"),
        }
        assert!(BreakpointStream::new(Vec::<Breakpoint>::new(), 10).is_err());
        assert!(BreakpointStream::new(bp(&[(0.0, 0.0), (1.0, 1.0)]), 0).is_err());
    }

    #[test]
    fn value_at_interpolates() {
        let points = bp(&[(1.0, 0.0), (2.0, 10.0), (3.0, 100.0)]);
        let (idx, v) = value_at(&points, 1.5, 0);
        assert_eq!(v, 5.0);
        assert_eq!(idx, 1);

        let (_, v) = value_at(&points, 2.5, idx);
        assert_eq!(v, 55.0);
    }

    #[test]
    fn value_at_clamps() {
        assert_eq!(value_at(&bp(&[(0.0, 1.0)]), 42.0, 0).1, 1.0);
        let points = bp(&[(1.0, 0.0), (2.0, 10.0)]);
        assert_eq!(value_at(&points, 9.0, 0).1, 10.0);
        assert_eq!(value_at(&points, 0.5, 0).1, 0.0);
        assert_eq!(value_at(&[], 1.0, 0), (0, 0.0));
        assert_eq!(value_at(&points, 1.5, 99).1, 10.0);
    }

    #[test]
    fn parse_keeps_input_order() {
        let points = parse_breakpoints("3.0:1.31415\n-1:1.32134\n0:0\n").unwrap();
        assert_eq!(
            points.into_inner(),
            bp(&[(3.0, 1.31415), (-1.0, 1.32134), (0.0, 0.0)])
        );
    }

    #[test]
    fn parse_skips_blank_lines_and_whitespace() {
        let points: Breakpoints = "\n  0 : 1\r\n\n2:3\n   \n".parse().unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1], Breakpoint::new(2.0, 3.0));
    }

    #[test]
    fn parse_rejects_wrong_field_count() {
        let err = parse_breakpoints("0:1\n0.5-2\n").unwrap_err();
        match &err {
            SonanceError::Format(FormatError::MalformedBreakpoint { line, span, reason }) => {
                assert_eq!(*line, 2);
                assert_eq!(*span, 4..9);
                assert_eq!(*reason, BreakpointFault::FieldCount(1));
            }
            other => panic!("expected MalformedBreakpoint, got {other:?}"),
        }
        assert!(parse_breakpoints("1:2:3").is_err());
    }

    #[test]
    fn parse_rejects_non_numeric_field() {
        let text = "0:1\n  abc:2\n";
        let err = parse_breakpoints(text).unwrap_err();
        assert!(matches!(
            &err,
            SonanceError::Format(FormatError::MalformedBreakpoint {
                line: 2,
                reason: BreakpointFault::NotANumber { field: "time", .. },
                ..
            })
        ));
        let report = err.report(text);
        assert!(report.contains("abc"), "report was: {report}");
    }

    #[test]
    fn read_from_io_source() {
        let points = read_breakpoints("0:0\n1:1\n".as_bytes()).unwrap();
        assert_eq!(points.len(), 2);
    }

    #[test]
    fn min_max_and_any() {
        let points = Breakpoints::from(bp(&[(0.0, 0.5), (1.0, -2.0), (2.0, 3.0)]));
        assert_eq!(points.min_max(), Some((-2.0, 3.0)));
        assert!(points.any(|b| b.value > 1.0));
        assert!(!points.any(|b| b.time > 5.0));
        assert_eq!(Breakpoints::default().min_max(), None);
    }

    #[test]
    fn text_round_trip() {
        let points = Breakpoints::from(bp(&[(0.0, 0.25), (0.015, -1.0)]));
        let text = points.to_text();
        assert_eq!(text, "0.00000000:0.25000000\n0.01500000:-1.00000000\n");
        assert_eq!(parse_breakpoints(&text).unwrap(), points);
    }

    #[test]
    fn peaks_per_window() {
        let format = Format::new(1, 4, BitDepth::Sixteen).unwrap();
        let buf = AudioBuffer::new(format, vec![0.1, 0.9, -0.5, 0.2, -0.3, -0.2]);
        let peaks = extract_peaks(&buf, 0.5);
        assert_eq!(
            peaks.into_inner(),
            bp(&[(0.0, 0.9), (0.5, 0.2), (1.0, -0.2)])
        );
    }
}
