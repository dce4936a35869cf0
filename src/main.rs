use std::{path::PathBuf, process};

use clap::{Parser, ValueHint};
use log::{debug, error, info, LevelFilter};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use url::Url;

use podplay::{
    config::{Config, Verbosity},
    error::{Error, Result},
    feed::Feed,
    output,
    pipeline::Pipeline,
    player::Outcome,
    signal,
};

/// Profile to display when not built in release mode.
#[cfg(debug_assertions)]
const BUILD_PROFILE: &str = "debug";
/// Profile to display when not built release mode.
#[cfg(not(debug_assertions))]
const BUILD_PROFILE: &str = "release";

/// Group name for mutually exclusive logging options.
const ARGS_GROUP_LOGGING: &str = "logging";

/// Command line arguments as parsed by `clap`.
#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URL of the podcast RSS feed
    #[arg(value_name = "FEED_URL", value_hint = ValueHint::Url, required_unless_present = "list_devices")]
    feed_url: Option<Url>,

    /// Episode to play, counting from 0
    ///
    /// Skips the interactive prompt.
    #[arg(short, long, value_name = "INDEX")]
    episode: Option<usize>,

    /// Directory to download episodes to
    #[arg(short, long, value_name = "DIR", value_hint = ValueHint::DirPath, default_value = ".")]
    output_dir: PathBuf,

    /// Output device
    ///
    /// The first device whose name contains this text, ignoring case.
    ///
    /// [default: system default device]
    #[arg(short, long, value_name = "NAME")]
    device: Option<String>,

    /// List output devices and exit
    #[arg(long, default_value_t = false)]
    list_devices: bool,

    /// Playback volume
    #[arg(long, default_value_t = 1.0, value_parser = parse_volume)]
    volume: f32,

    /// Suppresses all output except warnings and errors.
    #[arg(short, long, default_value_t = false, group = ARGS_GROUP_LOGGING)]
    quiet: bool,

    /// Enable verbose logging
    ///
    /// Specify twice for trace logging.
    #[arg(short, long, action = clap::ArgAction::Count, group = ARGS_GROUP_LOGGING)]
    verbose: u8,
}

/// Parses a volume between silent and double.
fn parse_volume(s: &str) -> std::result::Result<f32, String> {
    let volume: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if (0.0..=2.0).contains(&volume) {
        Ok(volume)
    } else {
        Err(format!("{volume} is not between 0.0 and 2.0"))
    }
}

/// Initializes the logger facade.
///
/// The logging level is determined as follows, in order of precedence from
/// highest to lowest:
/// 1. Command line arguments
/// 2. `RUST_LOG` environment variable
/// 3. Hard coded default
///
/// # Panics
///
/// Panics when a logger facade is already initialized.
fn init_logger(args: &Args) {
    let mut logger = env_logger::Builder::from_env(
        // Note: if you change the default logging level here, then you should
        // probably also change the verbosity levels below.
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    if args.quiet || args.verbose > 0 {
        let level = match args.verbose {
            0 => {
                // Quiet and verbose are mutually exclusive, and `verbose` is 0
                // by default. So this arm means: quiet mode.
                LevelFilter::Warn
            }
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Filter log messages of external crates.
        logger.filter_module("podplay", level);
    }

    logger.init();
}

/// Prints the feed and its episodes on standard output.
fn print_feed(feed: &Feed) {
    println!("{}", feed.title);
    if !feed.description.is_empty() {
        println!("{}", feed.description);
    }
    println!();

    for (index, item) in feed.items.iter().enumerate() {
        let title = item.title.as_deref().unwrap_or("(untitled)");
        println!("[{index}] {title}");
    }
}

/// Asks for an episode index on standard input.
async fn prompt_episode() -> Result<usize> {
    let mut stdout = io::stdout();
    stdout.write_all(b"Select episode: ").await?;
    stdout.flush().await?;

    let mut lines = BufReader::new(io::stdin()).lines();
    let line = lines
        .next_line()
        .await?
        .ok_or_else(|| Error::selection("no episode selected"))?;

    let index = line.trim().parse::<usize>().map_err(|e| {
        Error::selection(format!("{:?} is not an episode number: {e}", line.trim()))
    })?;
    Ok(index)
}

/// Main application flow.
///
/// # Errors
///
/// Returns the first error of fetching the feed, selecting an episode or
/// running the pipeline.
async fn run(args: Args) -> Result<Outcome> {
    let mut config = Config::new(Verbosity::from_flags(args.quiet, args.verbose));
    info!(
        "starting {}/{}; {BUILD_PROFILE}",
        config.app_name, config.app_version
    );

    config.output_dir = args.output_dir;
    config.device = args.device;
    config.playback.volume = args.volume;

    let feed_url = args
        .feed_url
        .ok_or_else(|| Error::selection("no feed URL given"))?;

    let pipeline = Pipeline::new(&config)?;
    let feed = pipeline.fetch_feed(&feed_url).await?;
    print_feed(&feed);

    if feed.is_empty() {
        return Err(Error::selection("feed is empty"));
    }

    let index = match args.episode {
        Some(index) => index,
        None => prompt_episode().await?,
    };
    pipeline.run(&feed, index).await
}

fn list_devices() -> Result<()> {
    for name in output::list_devices()? {
        println!("{name}");
    }
    Ok(())
}

/// Main entry point of the application.
///
/// This function initializes the logger facade, parses the command line
/// arguments, and runs until playback ends, the user quits, or an error or
/// signal stops it.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    // `clap` handles our command line arguments and help text.
    let args = Args::parse();
    init_logger(&args);

    // Dump command line arguments before we do anything more.
    // This aids in debugging of whatever comes next.
    debug!("Command {:#?}", args);

    if args.list_devices {
        if let Err(e) = list_devices() {
            error!("{e}");
            process::exit(e.exit_code());
        }
        return;
    }

    let mut signals = match signal::Handler::new() {
        Ok(signals) => signals,
        Err(e) => {
            error!("{e}");
            process::exit(e.exit_code());
        }
    };

    // Dropping the run future on a signal also drops any terminal guard it
    // holds, so the terminal is restored before exiting.
    let result = tokio::select! {
        // Prioritize shutdown signals.
        biased;

        signal = signals.recv() => {
            info!("received {signal}, shutting down");
            process::exit(signal::EXIT_CODE);
        }

        result = run(args) => result,
    };

    match result {
        Ok(Outcome::Finished) => info!("playback finished"),
        Ok(Outcome::Quit) => debug!("quit by user"),
        Err(e) => {
            error!("{e}");
            process::exit(e.exit_code());
        }
    }
}
