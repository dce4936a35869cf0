use std::{path::PathBuf, time::Duration};

/// How chatty the application is.
///
/// Besides setting the log level in the binary, this decides whether
/// progress indicators are drawn at all.
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Warnings and errors only; no progress bars.
    Quiet,
    #[default]
    Normal,
    Verbose,
    Trace,
}

impl Verbosity {
    /// Maps the `-q` flag and the number of `-v` flags to a verbosity.
    #[must_use]
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    #[must_use]
    pub fn shows_progress(self) -> bool {
        self != Self::Quiet
    }
}

/// Parameters applied to the audio output when playback starts.
///
/// Only the volume is honoured. Rate and detune are accepted so that they can
/// be configured, but playback always runs at the native rate.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PlaybackOptions {
    pub volume: f32,
    pub rate: f32,
    pub detune: f32,
}

impl PlaybackOptions {
    pub const NEUTRAL_RATE: f32 = 1.0;
    pub const NEUTRAL_DETUNE: f32 = 0.0;

    #[must_use]
    pub fn is_neutral(&self) -> bool {
        (self.rate - Self::NEUTRAL_RATE).abs() < f32::EPSILON
            && (self.detune - Self::NEUTRAL_DETUNE).abs() < f32::EPSILON
    }
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            volume: 1.0,
            rate: Self::NEUTRAL_RATE,
            detune: Self::NEUTRAL_DETUNE,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub app_name: String,
    pub app_version: String,

    pub user_agent: String,

    pub verbosity: Verbosity,

    /// Directory that downloaded episodes are written to.
    pub output_dir: PathBuf,

    /// Substring of the output device name; `None` for the default device.
    pub device: Option<String>,

    pub playback: PlaybackOptions,

    /// Cadence of the playback progress display.
    pub refresh_interval: Duration,

    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Config {
    pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(1);
    pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

    #[must_use]
    pub fn new(verbosity: Verbosity) -> Self {
        let app_name = env!("CARGO_PKG_NAME").to_owned();
        let app_version = env!("CARGO_PKG_VERSION").to_owned();

        let os_name = match std::env::consts::OS {
            "macos" => "osx",
            other => other,
        };
        let user_agent = format!("{app_name}/{app_version} (Rust; {os_name})");
        trace!("user agent: {user_agent}");

        Self {
            app_name,
            app_version,

            user_agent,

            verbosity,

            output_dir: PathBuf::from("."),
            device: None,

            playback: PlaybackOptions::default(),

            refresh_interval: Self::DEFAULT_REFRESH_INTERVAL,

            connect_timeout: Self::DEFAULT_CONNECT_TIMEOUT,
            read_timeout: Self::DEFAULT_READ_TIMEOUT,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(Verbosity::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_from_flags() {
        assert_eq!(Verbosity::from_flags(true, 0), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, 0), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(false, 1), Verbosity::Verbose);
        assert_eq!(Verbosity::from_flags(false, 3), Verbosity::Trace);
        assert!(!Verbosity::Quiet.shows_progress());
    }

    #[test]
    fn defaults_are_neutral() {
        let config = Config::default();
        assert!(config.playback.is_neutral());
        assert_eq!(config.refresh_interval, Duration::from_secs(1));
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert!(config.user_agent.starts_with("podplay/"));
    }

    #[test]
    fn identifies_the_package() {
        let config = Config::default();
        assert_eq!(config.app_name, "podplay");
        assert_eq!(config.app_version, env!("CARGO_PKG_VERSION"));
        assert!(config
            .user_agent
            .starts_with(&format!("{}/{} ", config.app_name, config.app_version)));
    }
}
