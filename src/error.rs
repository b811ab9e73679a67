use std::fmt;
use std::ops::Range;

use ariadne::{Config, Label, Report, ReportKind, Source};

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, SonanceError>;

#[derive(Debug)]
pub enum SonanceError {
    /// Malformed or truncated binary/text input.
    Format(FormatError),
    /// Fewer items than an operation needs (e.g. breakpoints for a stream).
    InsufficientData { needed: usize, found: usize },
    /// Contradictory or out-of-range synthesis parameters.
    InvalidArgument(String),
    /// Failure of the underlying byte source or sink.
    Io(std::io::Error),
    /// A JSON patch could not be deserialized.
    Config(serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormatError {
    BadMagic {
        expected: &'static str,
        found: [u8; 4],
    },
    Truncated {
        chunk: &'static str,
        needed: usize,
        available: usize,
    },
    MissingChunk(&'static str),
    UnsupportedBitDepth(u16),
    InvalidFormat(String),
    MalformedBreakpoint {
        line: usize,
        span: Range<usize>,
        reason: BreakpointFault,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum BreakpointFault {
    /// The line did not contain exactly one `:` separator.
    FieldCount(usize),
    /// A field was not a base-10 float.
    NotANumber { field: &'static str, text: String },
}

impl SonanceError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        SonanceError::InvalidArgument(msg.into())
    }

    /// Render the error against the text it was produced from.
    ///
    /// Breakpoint text errors become an ariadne diagnostic pointing at the
    /// offending line; every other error renders through `Display`.
    pub fn report(&self, source: &str) -> String {
        let SonanceError::Format(FormatError::MalformedBreakpoint { line, span, reason }) = self
        else {
            return self.to_string();
        };

        let mut out = Vec::new();
        let written = Report::build(ReportKind::Error, span.clone())
            .with_config(Config::default().with_color(false))
            .with_message(format!("malformed breakpoint on line {line}"))
            .with_label(Label::new(span.clone()).with_message(reason.to_string()))
            .with_note("expected `time:value`, e.g. `0.5:1.0`")
            .finish()
            .write(Source::from(source), &mut out);

        match written {
            Ok(()) => String::from_utf8_lossy(&out).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

impl fmt::Display for SonanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SonanceError::Format(e) => write!(f, "Format error: {e}"),
            SonanceError::InsufficientData { needed, found } => {
                write!(f, "Insufficient data: need at least {needed}, found {found}")
            }
            SonanceError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            SonanceError::Io(e) => write!(f, "I/O error: {e}"),
            SonanceError::Config(e) => write!(f, "Config error: {e}"),
        }
    }
}

impl std::error::Error for SonanceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SonanceError::Format(e) => Some(e),
            SonanceError::Io(e) => Some(e),
            SonanceError::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::BadMagic { expected, found } => write!(
                f,
                "Expected '{expected}' tag, found '{}'",
                String::from_utf8_lossy(found)
            ),
            FormatError::Truncated {
                chunk,
                needed,
                available,
            } => write!(
                f,
                "Truncated '{chunk}' chunk: needs {needed} bytes, only {available} available"
            ),
            FormatError::MissingChunk(id) => write!(f, "No '{id}' chunk found"),
            FormatError::UnsupportedBitDepth(bits) => {
                write!(f, "Unsupported bit depth: {bits} (expected 8, 16, 24, 32 or 64)")
            }
            FormatError::InvalidFormat(msg) => write!(f, "Invalid format: {msg}"),
            FormatError::MalformedBreakpoint { line, reason, .. } => {
                write!(f, "Malformed breakpoint on line {line}: {reason}")
            }
        }
    }
}

impl std::error::Error for FormatError {}

impl fmt::Display for BreakpointFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BreakpointFault::FieldCount(n) => {
                write!(f, "expected 2 colon-separated fields, found {n}")
            }
            BreakpointFault::NotANumber { field, text } => {
                write!(f, "{field} '{text}' is not a number")
            }
        }
    }
}

impl From<FormatError> for SonanceError {
    fn from(e: FormatError) -> Self {
        SonanceError::Format(e)
    }
}

impl From<std::io::Error> for SonanceError {
    fn from(e: std::io::Error) -> Self {
        SonanceError::Io(e)
    }
}

impl From<serde_json::Error> for SonanceError {
    fn from(e: serde_json::Error) -> Self {
        SonanceError::Config(e)
    }
}
