//! Audio output devices.
//!
//! The playback controller talks to an [`Output`]; [`AudioOutput`] is the
//! implementation backed by a `rodio` sink on a `cpal` device.

use cpal::traits::{DeviceTrait, HostTrait};
use rodio::{OutputStream, OutputStreamHandle, Sink};

use crate::{
    decoder::Decoder,
    error::{Error, Result},
};

/// Where decoded audio goes.
pub trait Output {
    /// Queues `source` for playback. Output starts paused.
    fn append(&mut self, source: Decoder);

    fn play(&mut self);

    fn pause(&mut self);

    /// Whether everything queued has been played.
    fn is_empty(&self) -> bool;

    fn set_volume(&mut self, volume: f32);
}

/// Returns the names of all output devices of the default host.
pub fn list_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let names = host
        .output_devices()?
        .filter_map(|device| device.name().ok())
        .collect();
    Ok(names)
}

/// A `rodio` sink on an output device.
pub struct AudioOutput {
    sink: Sink,

    // Dropping the stream stops all output.
    _stream: OutputStream,
    _handle: OutputStreamHandle,
}

impl AudioOutput {
    /// Opens the first output device whose name contains `device`, ignoring
    /// case, or the default device.
    ///
    /// # Errors
    ///
    /// Returns a [`Playback`](crate::error::ErrorKind::Playback) error if no
    /// such device exists or it cannot be opened.
    pub fn open(device: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();

        let device = match device {
            Some(needle) => {
                let needle = needle.to_lowercase();
                host.output_devices()?
                    .find(|device| {
                        device
                            .name()
                            .is_ok_and(|name| name.to_lowercase().contains(&needle))
                    })
                    .ok_or_else(|| Error::playback(format!("no output device matches {needle}")))?
            }
            None => host
                .default_output_device()
                .ok_or_else(|| Error::playback("no default output device"))?,
        };

        let name = device.name().unwrap_or_else(|_| String::from("UNKNOWN"));
        info!("audio output: {name}");

        let (stream, handle) = OutputStream::try_from_device(&device)?;
        let sink = Sink::try_new(&handle)?;
        sink.pause();

        Ok(Self {
            sink,
            _stream: stream,
            _handle: handle,
        })
    }
}

impl Output for AudioOutput {
    fn append(&mut self, source: Decoder) {
        self.sink.append(source);
    }

    fn play(&mut self) {
        self.sink.play();
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn is_empty(&self) -> bool {
        self.sink.empty()
    }

    fn set_volume(&mut self, volume: f32) {
        self.sink.set_volume(volume);
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.sink.stop();
    }
}
