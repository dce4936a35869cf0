//! Progress reporting for downloads and playback.
//!
//! Components report progress through the [`Indicator`] trait and never draw
//! anything themselves. [`ProgressBar`] is the terminal implementation:
//!
//! ```text
//! download [################--------------]  53% 12.1 MiB
//! ```
//!
//! When the total is unknown the bar is replaced by a spinner and the number
//! of bytes received so far.

use std::{
    fmt,
    io::{self, Write},
    time::{Duration, Instant},
};

use crossterm::{
    cursor, queue,
    style::Print,
    terminal::{Clear, ClearType},
};

/// A ratio in `[0.0, 1.0]`.
#[derive(Copy, Clone, Debug, Default, PartialEq, PartialOrd)]
pub struct Percentage(f64);

impl Percentage {
    pub const ZERO: Self = Self(0.0);
    pub const COMPLETE: Self = Self(1.0);

    /// Creates a percentage from a ratio, clamping it to `[0.0, 1.0]`.
    ///
    /// `NaN` is treated as zero.
    #[must_use]
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio.is_nan() {
            Self::ZERO
        } else {
            Self(ratio.clamp(0.0, 1.0))
        }
    }

    /// The share of `total` that `part` represents.
    ///
    /// Returns `None` when the total is unknown or zero.
    #[must_use]
    pub fn of(part: u64, total: Option<u64>) -> Option<Self> {
        match total {
            Some(total) if total > 0 => {
                // `f64` not for precision, but to be able to fit as big as
                // possible file sizes.
                #[expect(clippy::cast_precision_loss)]
                let ratio = part as f64 / total as f64;
                Some(Self::from_ratio(ratio))
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn as_ratio(&self) -> f64 {
        self.0
    }

    #[must_use]
    pub fn as_percent(&self) -> f64 {
        self.0 * 100.0
    }

    /// Percent rounded down, so that 100 means complete.
    #[must_use]
    pub fn whole(&self) -> u8 {
        // Ratios such as 29/100 land a hair below their exact percent.
        const SLACK: f64 = 1e-9;

        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let whole = (self.as_percent() + SLACK).floor().min(100.0) as u8;
        whole
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:3}%", self.whole())
    }
}

/// What an indicator should show.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Progress {
    /// A known share of the total.
    Determinate(Percentage),

    /// Activity without a known total, with the amount processed so far.
    Indeterminate(u64),
}

/// Something that visualizes progress.
///
/// After [`finish`](Self::finish) or [`abandon`](Self::abandon) no further
/// calls are expected.
pub trait Indicator {
    /// Shows `progress`, followed by a free-form `message`.
    fn update(&mut self, progress: Progress, message: &str);

    /// Completes the indicator at its last shown state.
    fn finish(&mut self);

    /// Stops the indicator without completing it.
    fn abandon(&mut self);
}

/// A single-line progress bar on standard error.
pub struct ProgressBar {
    label: String,
    hidden: bool,
    width: usize,
    progress: Progress,
    message: String,
    spinner: usize,
    last_draw: Option<Instant>,
    done: bool,
}

impl ProgressBar {
    /// Number of cells of the bar itself.
    const DEFAULT_WIDTH: usize = 30;

    /// Minimum time between two redraws that are not forced.
    const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

    const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            hidden: false,
            width: Self::DEFAULT_WIDTH,
            progress: Progress::Determinate(Percentage::ZERO),
            message: String::new(),
            spinner: 0,
            last_draw: None,
            done: false,
        }
    }

    /// A progress bar that keeps state but never draws.
    #[must_use]
    pub fn hidden(label: impl Into<String>) -> Self {
        Self {
            hidden: true,
            ..Self::new(label)
        }
    }

    #[must_use]
    pub fn progress(&self) -> Progress {
        self.progress
    }

    /// Renders the current state as a single line without terminal control
    /// sequences.
    #[must_use]
    pub fn render(&self) -> String {
        let mut line = self.label.clone();
        if !line.is_empty() {
            line.push(' ');
        }

        match self.progress {
            Progress::Determinate(percentage) => {
                #[expect(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let filled = (percentage.as_ratio() * self.width as f64).round() as usize;
                let filled = filled.min(self.width);
                line.push('[');
                line.extend(std::iter::repeat('#').take(filled));
                line.extend(std::iter::repeat('-').take(self.width - filled));
                line.push_str("] ");
                line.push_str(&percentage.to_string());
            }
            Progress::Indeterminate(_) => {
                line.push('[');
                line.push(Self::SPINNER[self.spinner % Self::SPINNER.len()]);
                line.push(']');
            }
        }

        if !self.message.is_empty() {
            line.push(' ');
            line.push_str(&self.message);
        }

        line
    }

    fn draw(&mut self, force: bool) {
        if self.hidden {
            return;
        }

        let now = Instant::now();
        if !force
            && self
                .last_draw
                .is_some_and(|last| now.duration_since(last) < Self::REDRAW_INTERVAL)
        {
            return;
        }
        self.last_draw = Some(now);

        let line = self.render();
        let mut stderr = io::stderr().lock();
        let result = queue!(
            stderr,
            cursor::MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(line)
        )
        .and_then(|()| stderr.flush());

        if let Err(e) = result {
            trace!("failed to draw progress bar: {e}");
        }
    }

    fn close(&mut self) {
        if self.done {
            return;
        }
        self.done = true;
        self.draw(true);
        self.end_line();
    }

    fn end_line(&mut self) {
        if self.hidden || self.last_draw.is_none() {
            return;
        }

        // Raw mode does not translate `\n` into a carriage return.
        let mut stderr = io::stderr().lock();
        if let Err(e) = write!(stderr, "\r\n").and_then(|()| stderr.flush()) {
            trace!("failed to end progress bar: {e}");
        }
    }
}

impl Indicator for ProgressBar {
    fn update(&mut self, progress: Progress, message: &str) {
        if self.done {
            return;
        }

        if let Progress::Indeterminate(_) = progress {
            self.spinner = self.spinner.wrapping_add(1);
        }
        self.progress = progress;
        message.clone_into(&mut self.message);
        self.draw(false);
    }

    fn finish(&mut self) {
        self.close();
    }

    fn abandon(&mut self) {
        // Leave the last drawn state on screen so the user sees how far it got.
        self.close();
    }
}

/// Estimates the time left at the average rate so far.
///
/// Returns `None` until something was done, or when the total is unknown.
#[must_use]
pub fn eta(elapsed: Duration, done: u64, total: Option<u64>) -> Option<Duration> {
    let total = total.filter(|total| *total > 0)?;
    if done == 0 {
        return None;
    }

    #[expect(clippy::cast_precision_loss)]
    let left = total.saturating_sub(done) as f64 / done as f64;
    Some(elapsed.mul_f64(left))
}

/// Formats a byte count with binary units.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];

    #[expect(clippy::cast_precision_loss)]
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
