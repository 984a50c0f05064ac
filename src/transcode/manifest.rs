//! HLS media playlist inspection
//!
//! Only what is needed to check a segment set: the ordered list of segment
//! URIs and whether the playlist was closed with `#EXT-X-ENDLIST`.

/// Parsed view of a media playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    pub segments: Vec<String>,
    pub ended: bool,
}

impl Manifest {
    /// Parse playlist text. Returns `None` if the `#EXTM3U` header is missing.
    pub fn parse(text: &str) -> Option<Self> {
        let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty());
        if lines.next()? != "#EXTM3U" {
            return None;
        }

        let mut segments = Vec::new();
        let mut ended = false;
        for line in lines {
            if line == "#EXT-X-ENDLIST" {
                ended = true;
            } else if !line.starts_with('#') {
                segments.push(line.to_string());
            }
        }

        Some(Self { segments, ended })
    }
}

/// A segment URI that stays inside its own directory
pub fn is_local_segment(uri: &str) -> bool {
    !uri.is_empty()
        && uri != "."
        && uri != ".."
        && !uri.contains(['/', '\\'])
        && !uri.contains("://")
}
