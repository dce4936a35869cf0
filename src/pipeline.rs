//! The end-to-end flow from a chosen episode to the end of playback.
//!
//! Each stage runs to completion before the next one starts:
//!
//! 1. select the episode from the feed
//! 2. download it to the output directory
//! 3. decode the downloaded file
//! 4. open the audio output and play interactively
//!
//! The first failure ends the run. Nothing is retried and a partially
//! downloaded file is left where it is.

use std::path::PathBuf;

use futures_util::Stream;
use url::Url;

use crate::{
    config::Config,
    download,
    episode::EpisodeRef,
    error::Result,
    feed::Feed,
    http,
    keyboard::{self, Command, Crossterm, RawMode, Terminal},
    output::{AudioOutput, Output},
    player::{Outcome, Player},
    progress::ProgressBar,
    source::{self, AudioBuffer},
    util,
};

pub struct Pipeline {
    config: Config,
    client: http::Client,
}

impl Pipeline {
    /// Creates a pipeline with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        let client = http::Client::new(config)?;
        Ok(Self::with_client(config, client))
    }

    #[must_use]
    pub fn with_client(config: &Config, client: http::Client) -> Self {
        Self {
            config: config.clone(),
            client,
        }
    }

    /// Fetches and parses the feed at `url`.
    ///
    /// # Errors
    ///
    /// Returns a [`Feed`](crate::error::ErrorKind::Feed) error if the feed
    /// cannot be retrieved or is not valid RSS.
    pub async fn fetch_feed(&self, url: &Url) -> Result<Feed> {
        Feed::fetch(&self.client, url).await
    }

    /// Where `episode` is stored once downloaded.
    #[must_use]
    pub fn destination(&self, episode: &EpisodeRef) -> PathBuf {
        self.config.output_dir.join(episode.file_name())
    }

    fn progress_bar(&self, label: &str) -> ProgressBar {
        if self.config.verbosity.shows_progress() {
            ProgressBar::new(label)
        } else {
            ProgressBar::hidden(label)
        }
    }

    /// Downloads and decodes `episode`.
    ///
    /// # Errors
    ///
    /// Returns a [`Transfer`](crate::error::ErrorKind::Transfer) error if the
    /// download fails, or a [`Decode`](crate::error::ErrorKind::Decode) error
    /// if the downloaded file is not playable.
    pub async fn acquire(&self, episode: &EpisodeRef) -> Result<AudioBuffer> {
        let destination = self.destination(episode);
        let mut bar = self.progress_bar("download");
        let task = download::download(&self.client, episode, destination, &mut bar).await?;

        source::load(task.destination()).await
    }

    /// Selects episode `index` of `feed`, then downloads and decodes it.
    ///
    /// Nothing is downloaded when the selection fails.
    ///
    /// # Errors
    ///
    /// Returns a [`Selection`](crate::error::ErrorKind::Selection) error if
    /// the feed is empty or has no playable episode at `index`, and otherwise
    /// the errors of [`acquire`](Self::acquire).
    pub async fn acquire_selected(&self, feed: &Feed, index: usize) -> Result<AudioBuffer> {
        let episode = feed.select(index)?;
        info!("selected {episode}");
        self.acquire(&episode).await
    }

    /// Plays `buffer` interactively until it ends or the user quits.
    ///
    /// The terminal is in raw mode while playing and is restored however
    /// this returns.
    ///
    /// # Errors
    ///
    /// Returns a [`Playback`](crate::error::ErrorKind::Playback) error if no
    /// audio output can be opened, or an [`Io`](crate::error::ErrorKind::Io)
    /// error if the terminal does not support raw mode.
    pub async fn play(&self, buffer: AudioBuffer) -> Result<Outcome> {
        let output = AudioOutput::open(self.config.device.as_deref())?;
        let player = Player::new(output, &self.config);

        self.session(player, buffer, Crossterm, keyboard::commands())
            .await
    }

    async fn session<O, T, S>(
        &self,
        mut player: Player<O>,
        buffer: AudioBuffer,
        terminal: T,
        commands: S,
    ) -> Result<Outcome>
    where
        O: Output,
        T: Terminal,
        S: Stream<Item = Command> + Unpin,
    {
        let mut raw_mode = RawMode::enable(terminal)?;
        if self.config.verbosity.shows_progress() {
            eprint!("{}\r\n", keyboard::HINT);
        }

        player.start(buffer)?;
        let mut bar = self.progress_bar("playing");
        let outcome = player.run(commands, &mut bar).await;

        // Log lines need cooked mode to start at the first column.
        raw_mode.disable()?;
        if outcome == Outcome::Quit {
            info!(
                "quit at {} of {}",
                util::format_duration(player.position()),
                util::format_duration(player.duration())
            );
        }

        Ok(outcome)
    }

    /// Selects, downloads, decodes and plays episode `index` of `feed`.
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage that fails.
    pub async fn run(&self, feed: &Feed, index: usize) -> Result<Outcome> {
        let buffer = self.acquire_selected(feed, index).await?;
        self.play(buffer).await
    }
}
