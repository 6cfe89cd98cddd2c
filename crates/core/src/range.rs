//! HTTP `Range` header handling for artifact streaming.
//!
//! Only a single `bytes=START-END`, `bytes=START-` or `bytes=-SUFFIX` range
//! is honoured. Anything malformed or unsatisfiable resolves to the full
//! artifact so an audio player always gets a playable response.

/// An inclusive byte range within an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// The whole artifact. `size` must be non-zero.
    pub fn full(size: u64) -> Self {
        Self {
            start: 0,
            end: size.saturating_sub(1),
        }
    }

    /// Number of bytes covered; never zero.
    pub fn length(&self) -> u64 {
        self.end - self.start + 1
    }
}

/// A parsed but not yet resolved range.
#[derive(Debug, PartialEq, Eq)]
enum RangeSpec {
    /// `START-` or `START-END`.
    From { start: u64, end: Option<u64> },
    /// `-N`: the last N bytes.
    Suffix(u64),
}

/// Parse a `Range: bytes=...` header value.
fn parse_range_header(range: &str) -> Option<RangeSpec> {
    let range = range.trim().strip_prefix("bytes=")?;
    let (start, end) = range.split_once('-')?;
    let end = match end.trim() {
        "" => None,
        e => Some(e.parse::<u64>().ok()?),
    };
    match start.trim() {
        "" => end.map(RangeSpec::Suffix),
        s => Some(RangeSpec::From {
            start: s.parse::<u64>().ok()?,
            end,
        }),
    }
}

/// Resolve a raw `Range` header against an artifact of `size` bytes.
///
/// Returns `Some(range)` when a partial (206) response should be sent, with
/// `end` clamped to `size - 1`. A suffix longer than the artifact covers all
/// of it. Returns `None` when the full artifact should be sent instead: no
/// header, a malformed header, `start >= size`, `start > end`, or a zero
/// suffix.
pub fn resolve(header: Option<&str>, size: u64) -> Option<ByteRange> {
    let spec = parse_range_header(header?)?;
    if size == 0 {
        return None;
    }
    let (start, end) = match spec {
        RangeSpec::Suffix(0) => return None,
        RangeSpec::Suffix(n) => (size.saturating_sub(n), size - 1),
        RangeSpec::From { start, end } => {
            (start, end.map_or(size - 1, |e| e.min(size - 1)))
        }
    };
    if start >= size || start > end {
        return None;
    }
    Some(ByteRange { start, end })
}
