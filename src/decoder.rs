//! Audio decoder implementation using Symphonia.
//!
//! This module provides a decoder that:
//! * Supports multiple formats (AAC/ADTS, FLAC, MP3, MP4, WAV)
//! * Determines the total duration, scanning the file when the container
//!   does not declare it
//! * Processes audio in floating point
//! * Plugs into `rodio` as a [`rodio::Source`]
//!
//! # Audio Parameters
//!
//! The decoder detects and provides:
//! * Sample rate (defaults to 44.1 kHz if unspecified)
//! * Channel count (defaults to stereo if unspecified)
//! * Total duration

use std::{path::Path, time::Duration};

use symphonia::core::{
    audio::SampleBuffer,
    codecs::{DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as SymphoniaError,
    formats::{FormatOptions, FormatReader},
    io::{MediaSourceStream, MediaSourceStreamOptions},
    meta::MetadataOptions,
    probe::Hint,
    units::TimeBase,
};

use crate::{
    audio_file::{AudioFile, BUFFER_LEN},
    error::{Error, Result},
};

/// Sample rate assumed when a stream does not declare one.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Channel count assumed when a stream does not declare one.
pub const DEFAULT_CHANNELS: u16 = 2;

/// Maximum number of consecutive corrupted packets to skip before giving up.
const MAX_RETRIES: usize = 3;

/// Audio decoder for a local file.
///
/// # Example
/// ```no_run
/// use podplay::decoder::Decoder;
///
/// let decoder = Decoder::open("Episode.mp3")?;
/// println!("{:?}", decoder.duration());
///
/// for sample in decoder {
///     // Process f32 sample...
/// }
/// ```
pub struct Decoder {
    /// Format reader (demuxer) for extracting encoded audio packets
    demuxer: Box<dyn FormatReader>,

    /// Codec decoder for converting encoded packets to PCM samples
    decoder: Box<dyn symphonia::core::codecs::Decoder>,

    /// Track that packets are decoded from
    track_id: u32,

    /// Reusable sample buffer to minimize allocations
    buffer: Option<SampleBuffer<f32>>,

    /// Current position in the sample buffer
    position: usize,

    channels: u16,
    sample_rate: u32,
    duration: Duration,
}

impl Decoder {
    /// Opens and probes the audio file at `path`.
    ///
    /// The file extension is used as a format hint, but the content decides.
    ///
    /// # Errors
    ///
    /// Returns a [`Decode`](crate::error::ErrorKind::Decode) error if:
    /// * The file cannot be read
    /// * Format detection fails
    /// * No decodable audio track is found
    /// * Codec initialization fails
    /// * The duration is zero
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let demuxer = Self::demux(path)?;

        let track = demuxer
            .tracks()
            .iter()
            .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::decode(format!("no audio track in {}", path.display())))?;
        let track_id = track.id;

        let decoder =
            symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

        // Update the codec parameters with the actual decoder parameters.
        // This may yield information not available before decoder initialization.
        let codec_params = decoder.codec_params();
        let sample_rate = codec_params.sample_rate.unwrap_or(DEFAULT_SAMPLE_RATE);
        let channels = codec_params.channels.map_or(DEFAULT_CHANNELS, |channels| {
            u16::try_from(channels.count()).unwrap_or(u16::MAX)
        });
        let time_base = codec_params
            .time_base
            .unwrap_or_else(|| TimeBase::new(1, sample_rate));

        let duration = match codec_params.n_frames {
            Some(frames) => time_base.calc_time(frames).into(),
            None => {
                debug!("{} does not declare its duration, scanning", path.display());
                Self::scan_duration(path, track_id, time_base)?
            }
        };

        if duration.is_zero() {
            return Err(Error::decode(format!(
                "{} contains no audio",
                path.display()
            )));
        }

        debug!(
            "decoding {}: {channels} channels at {sample_rate} Hz, {:.1}s",
            path.display(),
            duration.as_secs_f64()
        );

        Ok(Self {
            demuxer,
            decoder,
            track_id,

            buffer: None,
            position: 0,

            channels,
            sample_rate,
            duration,
        })
    }

    fn demux(path: &Path) -> Result<Box<dyn FormatReader>> {
        let file = AudioFile::open(path).map_err(|e| {
            Error::decode(format!("cannot open {}: {e}", path.display()))
        })?;

        // Twice the buffer length to allow for Symphonia's read-ahead behavior,
        // and 64 kB minimum that Symphonia asserts for its ring buffer.
        let buffer_len = usize::max(64 * 1024, BUFFER_LEN * 2);
        let stream =
            MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions { buffer_len });

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|extension| extension.to_str()) {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe().format(
            &hint,
            stream,
            &FormatOptions {
                enable_gapless: true,
                ..Default::default()
            },
            &MetadataOptions::default(),
        )?;

        Ok(probed.format)
    }

    /// Determines the duration by walking all packets of the track.
    ///
    /// Only packet headers are read; nothing is decoded.
    fn scan_duration(path: &Path, track_id: u32, time_base: TimeBase) -> Result<Duration> {
        let mut demuxer = Self::demux(path)?;

        let mut end = 0;
        loop {
            match demuxer.next_packet() {
                Ok(packet) => {
                    if packet.track_id() == track_id {
                        end = end.max(packet.ts().saturating_add(packet.dur()));
                    }
                }
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {}
                Err(e) => return Err(e.into()),
            }
        }

        Ok(time_base.calc_time(end).into())
    }

    /// The total duration of the audio.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl rodio::Source for Decoder {
    /// Returns the number of samples left in the current decoded frame.
    ///
    /// Returns `None` if no frame is currently buffered.
    #[inline]
    fn current_frame_len(&self) -> Option<usize> {
        self.buffer
            .as_ref()
            .map(|buffer| buffer.len().saturating_sub(self.position))
    }

    #[inline]
    fn channels(&self) -> u16 {
        self.channels
    }

    #[inline]
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    #[inline]
    fn total_duration(&self) -> Option<Duration> {
        Some(self.duration)
    }
}

impl Iterator for Decoder {
    /// A single audio sample as 32-bit floating point.
    ///
    /// Values are normalized to the range [-1.0, 1.0] regardless of the
    /// source audio's bits per sample or format.
    type Item = f32;

    /// Provides the next audio sample.
    ///
    /// Returns `None` when:
    /// * Stream ends
    /// * Unrecoverable error occurs
    /// * Too many corrupt packets encountered
    fn next(&mut self) -> Option<Self::Item> {
        // Fill the buffer if it's empty or we've reached its end.
        if self
            .buffer
            .as_ref()
            .is_none_or(|buffer| self.position >= buffer.len())
        {
            let mut skipped = 0;
            loop {
                if skipped > MAX_RETRIES {
                    error!("skipped too many packets, giving up");
                    return None;
                }

                let packet = match self.demuxer.next_packet() {
                    Ok(packet) => packet,
                    Err(SymphoniaError::IoError(e)) => {
                        if e.kind() != std::io::ErrorKind::UnexpectedEof {
                            error!("{e}");
                        }
                        // Otherwise not an error, just the end of the stream.
                        return None;
                    }
                    Err(SymphoniaError::ResetRequired) => {
                        self.decoder.reset();
                        continue;
                    }
                    Err(e) => {
                        error!("{e}");
                        return None;
                    }
                };

                if packet.track_id() != self.track_id {
                    continue;
                }

                match self.decoder.decode(&packet) {
                    Ok(decoded) => {
                        // Frames times channels; the buffer is only
                        // reallocated when a packet is larger than any before.
                        let required = decoded.capacity() * decoded.spec().channels.count();
                        if self
                            .buffer
                            .as_ref()
                            .is_some_and(|buffer| buffer.capacity() < required)
                        {
                            self.buffer = None;
                        }
                        let buffer = self.buffer.get_or_insert_with(|| {
                            SampleBuffer::new(decoded.capacity() as u64, *decoded.spec())
                        });
                        buffer.copy_interleaved_ref(decoded);
                        self.position = 0;

                        if buffer.len() > 0 {
                            break;
                        }
                    }
                    Err(SymphoniaError::DecodeError(e)) => {
                        warn!("skipping malformed packet: {e}");
                        skipped += 1;
                    }
                    Err(e) => {
                        error!("{e}");
                        return None;
                    }
                }
            }
        }

        let sample = *self
            .buffer
            .as_ref()
            .and_then(|buf| buf.samples().get(self.position))?;
        self.position = self.position.checked_add(1)?;

        Some(sample)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::io::Write;

    use rodio::Source;

    use super::*;
    use crate::error::ErrorKind;

    /// Writes a mono 16-bit PCM WAV file of `samples` samples.
    pub(crate) fn write_wav(path: &Path, sample_rate: u32, samples: u32) {
        let data_len = samples * 2;
        let mut wav = Vec::with_capacity(44 + data_len as usize);
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(36 + data_len).to_le_bytes());
        wav.extend_from_slice(b"WAVEfmt ");
        wav.extend_from_slice(&16u32.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
        wav.extend_from_slice(&1u16.to_le_bytes()); // mono
        wav.extend_from_slice(&sample_rate.to_le_bytes());
        wav.extend_from_slice(&(sample_rate * 2).to_le_bytes());
        wav.extend_from_slice(&2u16.to_le_bytes());
        wav.extend_from_slice(&16u16.to_le_bytes());
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&data_len.to_le_bytes());
        for i in 0..samples {
            let sample = if i % 2 == 0 { 8_192i16 } else { -8_192i16 };
            wav.extend_from_slice(&sample.to_le_bytes());
        }

        let mut file = std::fs::File::create(path).unwrap();
        file.write_all(&wav).unwrap();
    }

    #[test]
    fn decodes_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        write_wav(&path, 8_000, 16_000);

        let decoder = Decoder::open(&path).unwrap();
        assert_eq!(decoder.duration(), Duration::from_secs(2));
        assert_eq!(decoder.sample_rate(), 8_000);
        assert_eq!(decoder.channels(), 1);
        assert_eq!(decoder.total_duration(), Some(Duration::from_secs(2)));

        let samples: Vec<f32> = decoder.collect();
        assert_eq!(samples.len(), 16_000);
        assert!(samples.iter().all(|sample| sample.abs() <= 1.0));
    }

    #[test]
    fn rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.mp3");
        std::fs::write(&path, b"this is not audio at all").unwrap();

        let err = Decoder::open(&path).err().unwrap();
        assert_eq!(err.kind, ErrorKind::Decode);
    }

    #[test]
    fn rejects_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = Decoder::open(dir.path().join("missing.mp3")).err().unwrap();
        assert_eq!(err.kind, ErrorKind::Decode);
    }
}
