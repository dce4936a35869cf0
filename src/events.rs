//! Events emitted by playback state transitions.
//!
//! # Example
//!
//! ```rust
//! use podplay::events::Event;
//!
//! fn handle_event(event: Event) {
//!     match event {
//!         Event::Play => println!("Playback started"),
//!         Event::Pause => println!("Playback paused"),
//!         Event::Resume => println!("Playback resumed"),
//!         Event::Finish => println!("Playback finished"),
//!     }
//! }
//! ```

use std::fmt;

/// A change of playback state.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// Playback has started from the beginning.
    Play,

    /// Playback has paused.
    ///
    /// The position is frozen until playback resumes.
    Pause,

    /// Playback has resumed from where it was paused.
    Resume,

    /// The end of the audio was reached.
    ///
    /// Playback does not restart.
    Finish,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Play => write!(f, "play"),
            Event::Pause => write!(f, "pause"),
            Event::Resume => write!(f, "resume"),
            Event::Finish => write!(f, "finish"),
        }
    }
}
