//! Interactive playback of a decoded episode.
//!
//! The [`Player`] owns a small state machine:
//!
//! ```text
//!            start                 space
//! Stopped ----------> Playing <-----------> Paused
//!    ^                   |
//!    +-------------------+
//!         end of audio
//! ```
//!
//! The position is tracked by a clock that runs in real time while playing
//! and is frozen otherwise. A progress line is refreshed on a fixed cadence,
//! independently of the clock; it may lag by up to one interval.
//!
//! Quitting is not a state transition: [`Player::run`] returns
//! [`Outcome::Quit`] and the caller ends the process.

use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::{
    config::{Config, PlaybackOptions},
    error::{Error, Result},
    events::Event,
    keyboard::Command,
    output::Output,
    progress::{Indicator, Percentage, Progress},
    source::AudioBuffer,
    util,
};

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum State {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// How a playback session ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The end of the audio was reached.
    Finished,

    /// The user asked to quit.
    Quit,
}

/// Elapsed playback time.
#[derive(Copy, Clone, Debug, Default)]
struct Clock {
    /// Time accumulated up to the last pause.
    elapsed: Duration,

    /// When the clock was last started, if it is running.
    since: Option<Instant>,
}

impl Clock {
    fn resume(&mut self) {
        if self.since.is_none() {
            self.since = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        if let Some(since) = self.since.take() {
            self.elapsed += since.elapsed();
        }
    }

    fn elapsed(&self) -> Duration {
        self.elapsed + self.since.map_or(Duration::ZERO, |since| since.elapsed())
    }
}

pub struct Player<O: Output> {
    output: O,
    state: State,
    clock: Clock,
    duration: Duration,
    refresh_interval: Duration,
}

impl<O: Output> Player<O> {
    /// Creates a stopped player on `output`.
    pub fn new(mut output: O, config: &Config) -> Self {
        let PlaybackOptions {
            volume,
            rate,
            detune,
        } = config.playback;

        if !config.playback.is_neutral() {
            warn!("ignoring playback rate {rate} and detune {detune}: only native rate is supported");
        }
        output.set_volume(volume);

        Self {
            output,
            state: State::Stopped,
            clock: Clock::default(),
            duration: Duration::ZERO,
            refresh_interval: config.refresh_interval,
        }
    }

    #[must_use]
    pub fn state(&self) -> State {
        self.state
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// The playback position, never beyond the duration.
    #[must_use]
    pub fn position(&self) -> Duration {
        self.clock.elapsed().min(self.duration)
    }

    /// Starts playing `buffer` from the beginning.
    ///
    /// # Errors
    ///
    /// Fails unless the player is stopped.
    pub fn start(&mut self, buffer: AudioBuffer) -> Result<Event> {
        if self.state != State::Stopped {
            return Err(self.invalid_transition("start"));
        }

        self.duration = buffer.duration();
        self.clock = Clock::default();
        self.output.append(buffer.into_source());

        self.output.play();
        self.clock.resume();
        Ok(self.transition(State::Playing, Event::Play))
    }

    /// Pauses when playing, resumes when paused.
    ///
    /// # Errors
    ///
    /// Fails when the player is stopped.
    pub fn toggle(&mut self) -> Result<Event> {
        match self.state {
            State::Playing => {
                self.output.pause();
                self.clock.pause();
                Ok(self.transition(State::Paused, Event::Pause))
            }
            State::Paused => {
                self.output.play();
                self.clock.resume();
                Ok(self.transition(State::Playing, Event::Resume))
            }
            State::Stopped => Err(self.invalid_transition("toggle")),
        }
    }

    /// Stops at the end of the audio.
    ///
    /// # Errors
    ///
    /// Fails unless the player is playing.
    pub fn finish(&mut self) -> Result<Event> {
        if self.state != State::Playing {
            return Err(self.invalid_transition("finish"));
        }

        self.clock.pause();
        Ok(self.transition(State::Stopped, Event::Finish))
    }

    fn transition(&mut self, state: State, event: Event) -> Event {
        debug!(
            "playback {event} at {}",
            util::format_duration(self.position())
        );
        self.state = state;
        event
    }

    fn invalid_transition(&self, action: &str) -> Error {
        Error::internal(format!("cannot {action} playback that is {:?}", self.state))
    }

    /// Time until the end of the audio at the current position.
    fn remaining(&self) -> Duration {
        self.duration.saturating_sub(self.clock.elapsed())
    }

    fn refresh<I>(&self, indicator: &mut I)
    where
        I: Indicator + ?Sized,
    {
        let position = self.position();

        // Millisecond resolution is plenty for a progress bar.
        let millis = |duration: Duration| u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
        let percentage = Percentage::of(millis(position), Some(millis(self.duration)))
            .unwrap_or(Percentage::COMPLETE);

        let mut message = format!(
            "{} / {}",
            util::format_duration(position),
            util::format_duration(self.duration)
        );
        if self.state == State::Paused {
            message.push_str(" (paused)");
        }

        indicator.update(Progress::Determinate(percentage), &message);
    }

    /// Runs the session until the audio ends or the user quits.
    ///
    /// `commands` are applied as they arrive. When the stream of commands
    /// ends, playback continues without them.
    pub async fn run<S, I>(&mut self, mut commands: S, indicator: &mut I) -> Outcome
    where
        S: Stream<Item = Command> + Unpin,
        I: Indicator + ?Sized,
    {
        let mut refresh = time::interval(self.refresh_interval);
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut listening = true;

        loop {
            if self.state == State::Stopped {
                self.refresh(indicator);
                indicator.finish();
                return Outcome::Finished;
            }

            let remaining = self.remaining();
            let playing = self.state == State::Playing;

            tokio::select! {
                biased;

                command = commands.next(), if listening => match command {
                    Some(Command::Quit) => {
                        indicator.abandon();
                        return Outcome::Quit;
                    }
                    Some(Command::TogglePause) => {
                        if let Err(e) = self.toggle() {
                            warn!("{e}");
                        }
                        self.refresh(indicator);
                    }
                    None => {
                        debug!("keyboard input closed");
                        listening = false;
                    }
                },

                () = time::sleep(remaining), if playing => {
                    if let Err(e) = self.finish() {
                        warn!("{e}");
                    }
                }

                _ = refresh.tick() => {
                    // The output may run dry slightly before the clock does.
                    if playing && self.output.is_empty() {
                        if let Err(e) = self.finish() {
                            warn!("{e}");
                        }
                    } else {
                        self.refresh(indicator);
                    }
                }
            }
        }
    }
}
