//! Loading a downloaded episode for playback.
//!
//! [`load`] is a thin wrapper around [`Decoder`]: probing a file can take a
//! while when its duration has to be determined by scanning, so it runs on
//! the blocking thread pool.

use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{decoder::Decoder, error::Result};

/// A decoded episode, ready to be handed to an audio output.
pub struct AudioBuffer {
    path: PathBuf,
    decoder: Decoder,
}

impl AudioBuffer {
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.decoder.duration()
    }

    #[must_use]
    pub fn duration_seconds(&self) -> f64 {
        self.duration().as_secs_f64()
    }

    /// Consumes the buffer into its sample source.
    #[must_use]
    pub fn into_source(self) -> Decoder {
        self.decoder
    }
}

impl fmt::Debug for AudioBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioBuffer")
            .field("path", &self.path)
            .field("duration", &self.duration())
            .finish_non_exhaustive()
    }
}

/// Decodes the audio file at `path`.
///
/// # Errors
///
/// Returns a [`Decode`](crate::error::ErrorKind::Decode) error if the file is
/// unreadable or not a supported audio container or codec.
pub async fn load(path: impl Into<PathBuf>) -> Result<AudioBuffer> {
    let path = path.into();
    debug!("loading {}", path.display());

    let decoder = {
        let path = path.clone();
        tokio::task::spawn_blocking(move || Decoder::open(path)).await??
    };

    info!(
        "loaded {} ({:.0}s)",
        path.display(),
        decoder.duration().as_secs_f64()
    );

    Ok(AudioBuffer { path, decoder })
}
