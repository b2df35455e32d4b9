// CDD error kinds.
//
// Modeled on `emulator::save_state::SaveStateError`: manual Display + Error
// + From impls, no thiserror, matching the teacher's ambient style.

use std::fmt;
use std::io;

/// Errors recoverable locally while building or using a TOC.
#[derive(Debug)]
pub enum TocError {
    /// No backing file at all could be opened for the requested path.
    Io(io::Error),

    /// A WAV/Vorbis stream failed its header/format check; the track is
    /// dropped and parsing continues.
    UnsupportedMedia(String),

    /// A CUE-referenced file could not be opened; parsing aborts here and
    /// the TOC is truncated to the last complete track.
    MissingTrackFile(String),

    /// Track numbers in a CUE sheet were not consecutive from 1.
    NonConsecutiveTrack { expected: u32, found: u32 },
}

impl fmt::Display for TocError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TocError::Io(e) => write!(f, "I/O error: {e}"),
            TocError::UnsupportedMedia(msg) => write!(f, "unsupported media: {msg}"),
            TocError::MissingTrackFile(path) => write!(f, "missing track file: {path}"),
            TocError::NonConsecutiveTrack { expected, found } => {
                write!(f, "non-consecutive track number: expected {expected}, found {found}")
            }
        }
    }
}

impl std::error::Error for TocError {}

impl From<io::Error> for TocError {
    fn from(e: io::Error) -> Self {
        TocError::Io(e)
    }
}

/// Errors from a backing stream read during active playback (CD-DA sample
/// pull, subcode tick). These never abort playback: the caller substitutes
/// silence for the remainder of the frame and continues on the next tick.
#[derive(Debug)]
pub enum MediaError {
    /// The backing stream returned fewer bytes than the sector/sample size
    /// demanded, usually end-of-file on a truncated or corrupt dump.
    ShortRead { expected: usize, got: usize },
    Io(io::Error),
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::ShortRead { expected, got } => {
                write!(f, "short read from backing stream: expected {expected} bytes, got {got}")
            }
            MediaError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for MediaError {}

impl From<io::Error> for MediaError {
    fn from(e: io::Error) -> Self {
        MediaError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_error_display_short_read() {
        let err = MediaError::ShortRead { expected: 4, got: 0 };
        assert_eq!(err.to_string(), "short read from backing stream: expected 4 bytes, got 0");
    }
}
