//! Provides the `AudioFile` abstraction over a downloaded episode.
//!
//! The file is only opened after its download completed, so it is always
//! seekable and its length is known. Reads go through a 32 KiB buffer.
//!
//! # Examples
//!
//! ```no_run
//! use podplay::audio_file::AudioFile;
//! use std::io::Read;
//!
//! let mut audio = AudioFile::open("Episode.mp3")?;
//! let mut buf = vec![0; 1024];
//! let n = audio.read(&mut buf)?;
//! ```

use std::{
    fs::File,
    io::{BufReader, Read, Seek},
    path::Path,
};

use symphonia::core::io::MediaSource;

/// Default buffer size for audio file reads (32 KiB).
///
/// This size is chosen to match Symphonia's read pattern, which reads
/// sequentially in increasing chunks up to 32 KiB.
pub const BUFFER_LEN: usize = 32 * 1024;

/// A local audio file readable by Symphonia.
pub struct AudioFile {
    inner: BufReader<File>,

    /// The total size of the audio file in bytes
    byte_len: u64,
}

impl AudioFile {
    /// Opens the file at `path` for reading.
    ///
    /// # Errors
    ///
    /// Standard I/O errors when the file cannot be opened or inspected.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = File::open(path)?;
        let byte_len = file.metadata()?.len();

        Ok(Self {
            inner: BufReader::with_capacity(BUFFER_LEN, file),
            byte_len,
        })
    }
}

impl Read for AudioFile {
    #[inline]
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for AudioFile {
    #[inline]
    fn seek(&mut self, pos: std::io::SeekFrom) -> std::io::Result<u64> {
        self.inner.seek(pos)
    }
}

/// Implements the `MediaSource` trait required by Symphonia.
///
/// A completed download is always seekable and of known length.
impl MediaSource for AudioFile {
    #[inline]
    fn is_seekable(&self) -> bool {
        true
    }

    #[inline]
    fn byte_len(&self) -> Option<u64> {
        Some(self.byte_len)
    }
}
