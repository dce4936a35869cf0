//! Error handling for podplay.
//!
//! Every failure in the acquisition and playback pipeline is terminal. Errors
//! are therefore categorized by what went wrong from the user's point of view,
//! and each category maps to a distinct process exit code so that calling
//! scripts can tell a network failure apart from a bad selection.
//!
//! # Error Categories
//!
//! * Feed retrieval and parsing
//! * Episode selection (empty feed, index out of range)
//! * Transfer (connection, timeout, HTTP status, stream reset)
//! * Decoding (unreadable or unsupported audio)
//! * Playback (no output device, device failure)
//! * Local input/output
//!
//! # Example
//!
//! ```rust
//! use podplay::error::{Error, ErrorKind, Result};
//!
//! fn pick(items: &[&str], index: usize) -> Result<String> {
//!     items
//!         .get(index)
//!         .map(ToString::to_string)
//!         .ok_or_else(|| Error::selection(format!("no episode at index {index}")))
//! }
//! ```

use std::fmt;
use thiserror::Error;

/// Main error type combining error kind and details.
#[derive(Debug)]
pub struct Error {
    /// Classification of the error
    pub kind: ErrorKind,

    /// Details of the underlying error
    pub error: Box<dyn std::error::Error + Send + Sync>,
}

impl Error {
    /// Attempts to downcast the underlying error to a concrete type.
    ///
    /// # Returns
    /// * `Some(&E)` - If the underlying error is of type `E`
    /// * `None` - If the underlying error is not of type `E`
    #[must_use]
    pub fn downcast<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.error.downcast_ref::<E>()
    }

    /// Returns the process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.kind.exit_code()
    }
}

/// Standard result type for podplay operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories.
///
/// The discriminant of each variant is the exit code the process terminates
/// with when an error of that kind reaches the top level.
#[expect(clippy::module_name_repetitions)]
#[derive(Clone, Copy, Debug, Eq, Error, Hash, Ord, PartialEq, PartialOrd)]
#[repr(i32)]
pub enum ErrorKind {
    /// Unexpected failure; most likely a bug.
    #[error("internal error")]
    Internal = 1,

    /// The feed is empty or the chosen episode does not exist.
    #[error("invalid selection")]
    Selection = 2,

    /// The episode could not be transferred.
    #[error("transfer failed")]
    Transfer = 3,

    /// The downloaded file is not playable audio.
    #[error("cannot decode audio")]
    Decode = 4,

    /// The feed could not be fetched or parsed.
    #[error("feed unavailable")]
    Feed = 5,

    /// No usable audio output.
    #[error("playback failed")]
    Playback = 6,

    /// Local file system or terminal failure.
    #[error("input/output error")]
    Io = 7,
}

impl ErrorKind {
    /// Returns the process exit code for this kind of error.
    #[must_use]
    pub fn exit_code(self) -> i32 {
        self as i32
    }
}

impl Error {
    /// Creates a new error with specified kind and details.
    ///
    /// # Examples
    ///
    /// ```rust
    /// let err = Error::new(ErrorKind::Feed, "feed has no channel");
    /// assert_eq!(err.kind, ErrorKind::Feed);
    /// ```
    pub fn new<E>(kind: ErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self {
            kind,
            error: error.into(),
        }
    }

    /// Creates an error for failures that should not happen.
    pub fn internal<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Internal, error)
    }

    /// Creates an error for an empty feed or an invalid episode choice.
    pub fn selection<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Selection, error)
    }

    /// Creates an error for a failed or interrupted transfer.
    pub fn transfer<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Transfer, error)
    }

    /// Creates an error for an unreadable or unsupported audio file.
    pub fn decode<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Decode, error)
    }

    /// Creates an error for a feed that could not be fetched or parsed.
    pub fn feed<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Feed, error)
    }

    /// Creates an error for audio output failures.
    pub fn playback<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Playback, error)
    }

    /// Creates an error for local file system or terminal failures.
    pub fn io<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Io, error)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.error.as_ref())
    }
}

/// Formats the error for display, showing both kind and details.
///
/// Format: "{kind}: {details}"
impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(fmt, "{}: ", self.kind)?;
        self.error.fmt(fmt)
    }
}

/// Converts IO errors.
///
/// Network-flavored IO errors surface from the transfer stream and are
/// classified as transfer failures. Everything else is local.
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        use std::io::ErrorKind::*;
        match err.kind() {
            ConnectionRefused | ConnectionReset | ConnectionAborted | NotConnected
            | AddrNotAvailable | BrokenPipe | TimedOut => Self::transfer(err),
            _ => Self::io(err),
        }
    }
}

/// Converts HTTP client errors to `Transfer`.
///
/// Callers that fetch something other than the episode, such as the feed,
/// reclassify explicitly.
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            return Self::internal(err);
        }

        Self::transfer(err)
    }
}

/// Converts RSS parsing errors to `Feed`.
impl From<rss::Error> for Error {
    fn from(e: rss::Error) -> Self {
        Self::feed(e)
    }
}

/// Converts URL parsing errors to `Selection`.
///
/// The only URLs parsed at runtime are enclosure URLs of the chosen episode.
impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Self::selection(e.to_string())
    }
}

/// Converts integer parsing errors to `Selection`.
impl From<std::num::ParseIntError> for Error {
    fn from(e: std::num::ParseIntError) -> Self {
        Self::selection(e)
    }
}

/// Converts background task failures to `Internal`.
impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::internal(e.to_string())
    }
}

/// Converts audio stream errors to `Playback`.
impl From<rodio::StreamError> for Error {
    fn from(e: rodio::StreamError) -> Self {
        Self::playback(e)
    }
}

/// Converts sink creation errors.
///
/// Maps playback errors:
/// * `DecoderError` -> `Decode`
/// * `NoDevice` -> `Playback`
impl From<rodio::PlayError> for Error {
    fn from(e: rodio::PlayError) -> Self {
        use rodio::PlayError::*;
        match e {
            DecoderError(e) => Self::decode(e),
            NoDevice => Self::playback(e),
        }
    }
}

/// Converts audio device enumeration errors to `Playback`.
impl From<cpal::DevicesError> for Error {
    fn from(e: cpal::DevicesError) -> Self {
        Self::playback(e)
    }
}

/// Converts Symphonia errors to `Decode`.
///
/// Underlying IO failures while reading a local file are still decode
/// failures from the pipeline's point of view: the file is not playable.
impl From<symphonia::core::errors::Error> for Error {
    fn from(e: symphonia::core::errors::Error) -> Self {
        use symphonia::core::errors::Error::*;
        match e {
            IoError(e) => Self::decode(e),
            DecodeError(e) => Self::decode(e),
            LimitError(e) => Self::decode(e),
            ResetRequired => Self::decode("decoder reset required"),
            SeekError(e) => Self::decode(format!("seek error: {e:?}")),
            Unsupported(e) => Self::decode(format!("unsupported: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let kinds = [
            ErrorKind::Internal,
            ErrorKind::Selection,
            ErrorKind::Transfer,
            ErrorKind::Decode,
            ErrorKind::Feed,
            ErrorKind::Playback,
            ErrorKind::Io,
        ];
        let mut codes: Vec<i32> = kinds.iter().map(|kind| kind.exit_code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), kinds.len());
        assert!(codes.iter().all(|code| *code != 0));
    }

    #[test]
    fn transfer_and_selection_exit_differently() {
        assert_ne!(
            Error::transfer("reset").exit_code(),
            Error::selection("feed is empty").exit_code()
        );
    }

    #[test]
    fn display_includes_kind_and_details() {
        let err = Error::selection("feed is empty");
        assert_eq!(err.to_string(), "invalid selection: feed is empty");
    }

    #[test]
    fn io_errors_are_classified() {
        let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert_eq!(Error::from(reset).kind, ErrorKind::Transfer);

        let denied = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(Error::from(denied).kind, ErrorKind::Io);
    }

    #[test]
    fn downcast_recovers_source() {
        let err = Error::from(std::io::Error::new(std::io::ErrorKind::Other, "oh no"));
        assert!(err.downcast::<std::io::Error>().is_some());
    }
}
