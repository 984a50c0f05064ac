//! HTTP Range resolution for raw asset playback
//!
//! Turns a `Range: bytes=<start>-[<end>]` header into a concrete inclusive
//! byte window against the asset's current length. Every window is capped to
//! a single chunk so one request never buffers more than `chunk_size` bytes.

use crate::error::RangeError;

/// Resolved inclusive byte window, `start <= end < total`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeWindow {
    pub start: u64,
    pub end: u64,
    pub total: u64,
}

impl RangeWindow {
    /// Number of bytes covered by the window
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total)
    }
}

/// Resolve a raw `Range` header value against `total` bytes.
///
/// An absent end is derived as `start + chunk_size - 1`; an explicit end is
/// honoured but still limited to one chunk. The end is clamped to `total - 1`.
pub fn resolve(header: Option<&str>, total: u64, chunk_size: u64) -> Result<RangeWindow, RangeError> {
    let value = header.ok_or(RangeError::Missing)?;
    let (start, end) = parse(value)?;

    if start >= total {
        return Err(RangeError::NotSatisfiable { start, total });
    }

    let chunk_end = start.saturating_add(chunk_size.max(1) - 1);
    let end = end.map_or(chunk_end, |e| e.min(chunk_end)).min(total - 1);

    Ok(RangeWindow { start, end, total })
}

/// Split `bytes=<start>-[<end>]` into its numeric parts.
fn parse(value: &str) -> Result<(u64, Option<u64>), RangeError> {
    let spec = value
        .trim()
        .strip_prefix("bytes=")
        .ok_or_else(|| RangeError::Malformed(format!("unsupported unit in {:?}", value)))?;

    let (start_str, end_str) = spec
        .split_once('-')
        .ok_or_else(|| RangeError::Malformed(format!("missing '-' in {:?}", value)))?;

    let start_str = start_str.trim();
    let end_str = end_str.trim();

    let start: u64 = start_str
        .parse()
        .map_err(|_| RangeError::Malformed(format!("invalid start {:?}", start_str)))?;

    let end = if end_str.is_empty() {
        None
    } else {
        let end: u64 = end_str
            .parse()
            .map_err(|_| RangeError::Malformed(format!("invalid end {:?}", end_str)))?;
        if end < start {
            return Err(RangeError::Malformed(format!(
                "end {} before start {}",
                end, start
            )));
        }
        Some(end)
    };

    Ok((start, end))
}
