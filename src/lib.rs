//! Fetch a podcast feed, download an episode with live progress, and play it
//! back in the terminal with keyboard transport controls.
//!
//! The pipeline runs strictly downstream:
//!
//! 1. [`transfer`] exposes a single HTTP GET as a stream of chunks with
//!    progress information.
//! 2. [`download`] drains that stream into a file and drives a progress
//!    indicator.
//! 3. [`source`] decodes the finished file into a playable [`source::AudioBuffer`].
//! 4. [`player`] runs the play/pause state machine against an audio output.
//! 5. [`pipeline`] sequences the above and is what the binary calls.
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[macro_use]
extern crate log;

pub mod audio_file;
pub mod config;
pub mod decoder;
pub mod download;
pub mod episode;
pub mod error;
pub mod events;
pub mod feed;
pub mod http;
pub mod keyboard;
pub mod output;
pub mod pipeline;
pub mod player;
pub mod progress;
pub mod signal;
pub mod source;
pub mod transfer;
pub mod util;
