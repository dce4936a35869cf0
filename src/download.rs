//! Downloading an episode to disk.
//!
//! A [`DownloadTask`] drains a [`Transfer`] into a file, strictly in arrival
//! order, and drives an [`Indicator`] along the way. The task ends in exactly
//! one terminal status: [`Status::Completed`] or [`Status::Failed`]. Once
//! there, it never changes again.
//!
//! A failed download leaves its partial file on disk. The next download to
//! the same destination truncates it.

use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use futures_util::StreamExt;
use tokio::{fs::File, io::AsyncWriteExt, time::Instant};

use crate::{
    episode::EpisodeRef,
    error::{Error, Result},
    http,
    progress::{self, Indicator, Percentage, Progress},
    transfer::Transfer,
    util,
};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Status {
    #[default]
    Pending,
    InProgress,
    Completed,
    Failed(String),
}

impl Status {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed(_))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in progress"),
            Self::Completed => write!(f, "completed"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug)]
pub struct DownloadTask {
    destination: PathBuf,
    bytes_written: u64,
    total: Option<u64>,
    status: Status,

    /// Last whole percentage handed to the indicator.
    reported: Option<u8>,

    started: Option<Instant>,
}

impl DownloadTask {
    #[must_use]
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            bytes_written: 0,
            total: None,
            status: Status::Pending,
            reported: None,
            started: None,
        }
    }

    #[must_use]
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    #[must_use]
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    #[must_use]
    pub fn status(&self) -> &Status {
        &self.status
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }

    fn set_status(&mut self, status: Status) {
        if self.status.is_terminal() {
            warn!(
                "ignoring status change to {status} of download to {} that is {}",
                self.destination.display(),
                self.status
            );
            return;
        }

        trace!(
            "download to {} is now {status}",
            self.destination.display()
        );
        self.status = status;
    }

    /// Drains `transfer` into the destination file.
    ///
    /// On success the indicator is finished at 100% and the file is flushed
    /// and closed. On failure the indicator is abandoned before the error is
    /// returned, so that an error message never lands in the middle of a
    /// progress line.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the transfer, or an
    /// [`Io`](crate::error::ErrorKind::Io) error if the file could not be
    /// written. The task is [`Status::Failed`] afterwards.
    pub async fn run<I>(&mut self, transfer: Transfer, indicator: &mut I) -> Result<()>
    where
        I: Indicator + ?Sized,
    {
        if self.status != Status::Pending {
            return Err(Error::internal(format!(
                "cannot run download to {} that is {}",
                self.destination.display(),
                self.status
            )));
        }

        self.total = transfer.total();
        self.started = Some(Instant::now());
        self.set_status(Status::InProgress);

        match self.drain(transfer, indicator).await {
            Ok(()) => {
                self.complete(indicator);
                self.set_status(Status::Completed);
                Ok(())
            }
            Err(e) => {
                indicator.abandon();
                warn!(
                    "leaving partial download of {} bytes at {}",
                    self.bytes_written,
                    self.destination.display()
                );
                self.set_status(Status::Failed(e.to_string()));
                Err(e)
            }
        }
    }

    async fn drain<I>(&mut self, mut transfer: Transfer, indicator: &mut I) -> Result<()>
    where
        I: Indicator + ?Sized,
    {
        let mut file = File::create(&self.destination).await.map_err(|e| {
            Error::io(format!(
                "cannot create {}: {e}",
                self.destination.display()
            ))
        })?;

        while let Some(chunk) = transfer.next().await {
            let chunk = chunk?;

            file.write_all(&chunk.data).await.map_err(|e| {
                Error::io(format!("cannot write {}: {e}", self.destination.display()))
            })?;
            self.bytes_written = self.bytes_written.saturating_add(chunk.data.len() as u64);

            // The transfer may learn the total later than the task did.
            if chunk.total.is_some() {
                self.total = chunk.total;
            }
            self.report(indicator);
        }

        file.flush().await.map_err(|e| {
            Error::io(format!("cannot flush {}: {e}", self.destination.display()))
        })?;

        Ok(())
    }

    /// Bytes written so far, and the time left when it can be estimated.
    fn message(&self) -> String {
        let written = progress::format_bytes(self.bytes_written);
        let elapsed = self.started.map_or(Duration::ZERO, |started| started.elapsed());
        match progress::eta(elapsed, self.bytes_written, self.total) {
            Some(eta) => format!("{written} ETA {}", util::format_duration(eta)),
            None => written,
        }
    }

    /// Reports progress if there is something new to show.
    ///
    /// With a known total the whole percentage only ever grows, and each
    /// value is reported once. Without a total the indicator spins and shows
    /// the bytes written.
    fn report<I>(&mut self, indicator: &mut I)
    where
        I: Indicator + ?Sized,
    {
        let message = self.message();
        match Percentage::of(self.bytes_written, self.total) {
            Some(percentage) => {
                let whole = percentage.whole();
                if self.reported.is_some_and(|reported| whole <= reported) {
                    return;
                }
                self.reported = Some(whole);
                indicator.update(Progress::Determinate(percentage), &message);
            }
            None => indicator.update(Progress::Indeterminate(self.bytes_written), &message),
        }
    }

    fn complete<I>(&mut self, indicator: &mut I)
    where
        I: Indicator + ?Sized,
    {
        if self.reported != Some(100) {
            self.reported = Some(100);
            indicator.update(
                Progress::Determinate(Percentage::COMPLETE),
                &progress::format_bytes(self.bytes_written),
            );
        }
        indicator.finish();

        info!(
            "downloaded {} to {}",
            progress::format_bytes(self.bytes_written),
            self.destination.display()
        );
    }
}

/// Downloads `episode` to `destination`.
///
/// # Errors
///
/// Fails if the transfer cannot be started or is interrupted, or if the file
/// cannot be written. The download is never retried.
pub async fn download<I>(
    client: &http::Client,
    episode: &EpisodeRef,
    destination: impl Into<PathBuf>,
    indicator: &mut I,
) -> Result<DownloadTask>
where
    I: Indicator + ?Sized,
{
    let mut task = DownloadTask::new(destination);
    info!(
        "downloading {episode} to {}",
        task.destination().display()
    );

    let transfer = match Transfer::open(
        client,
        episode.source_url().clone(),
        episode.expected_size(),
    )
    .await
    {
        Ok(transfer) => transfer,
        Err(e) => {
            indicator.abandon();
            return Err(e);
        }
    };

    task.run(transfer, indicator).await?;
    Ok(task)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use futures_util::stream;

    use super::*;
    use crate::error::ErrorKind;

    /// Records everything an indicator is told.
    #[derive(Debug, Default)]
    struct Recorder {
        updates: Vec<Progress>,
        messages: Vec<String>,
        finished: bool,
        abandoned: bool,
    }

    impl Indicator for Recorder {
        fn update(&mut self, progress: Progress, message: &str) {
            assert!(!self.finished && !self.abandoned);
            self.updates.push(progress);
            self.messages.push(message.to_owned());
        }

        fn finish(&mut self) {
            self.finished = true;
        }

        fn abandon(&mut self) {
            self.abandoned = true;
        }
    }

    fn transfer_of(chunks: Vec<Vec<u8>>, total: Option<u64>) -> Transfer {
        let chunks: Vec<Result<Bytes>> = chunks.into_iter().map(|chunk| Ok(chunk.into())).collect();
        Transfer::from_stream(stream::iter(chunks), total)
    }

    #[tokio::test]
    async fn writes_chunks_in_arrival_order() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("episode.mp3");

        let chunks = vec![
            b"first ".to_vec(),
            Vec::new(),
            b"second ".to_vec(),
            b"third".to_vec(),
        ];
        let mut task = DownloadTask::new(&destination);
        let mut recorder = Recorder::default();
        task.run(transfer_of(chunks, Some(18)), &mut recorder)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&destination).unwrap(), b"first second third");
        assert_eq!(task.bytes_written(), 18);
        assert!(task.is_completed());
        assert!(recorder.finished);
        assert!(!recorder.abandoned);
    }

    #[tokio::test]
    async fn bytes_written_matches_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("episode");

        let chunks = vec![vec![1; 100], vec![2; 250], vec![3; 650]];
        let mut task = DownloadTask::new(&destination);
        task.run(transfer_of(chunks, Some(1000)), &mut Recorder::default())
            .await
            .unwrap();

        let len = std::fs::metadata(&destination).unwrap().len();
        assert_eq!(task.bytes_written(), len);
        assert_eq!(len, 1000);
    }

    #[tokio::test]
    async fn reports_complete_exactly_once() {
        let dir = tempfile::tempdir().unwrap();
        let chunks = vec![vec![0; 400], vec![0; 400], vec![0; 200]];
        let mut task = DownloadTask::new(dir.path().join("episode"));
        let mut recorder = Recorder::default();
        task.run(transfer_of(chunks, Some(1000)), &mut recorder)
            .await
            .unwrap();

        let complete = recorder
            .updates
            .iter()
            .filter(|update| **update == Progress::Determinate(Percentage::COMPLETE))
            .count();
        assert_eq!(complete, 1);
        assert_eq!(
            recorder.updates.last(),
            Some(&Progress::Determinate(Percentage::COMPLETE))
        );
    }

    #[tokio::test]
    async fn forces_complete_when_total_was_wrong() {
        let dir = tempfile::tempdir().unwrap();
        let mut task = DownloadTask::new(dir.path().join("episode"));
        let mut recorder = Recorder::default();
        task.run(transfer_of(vec![vec![0; 10]], Some(1000)), &mut recorder)
            .await
            .unwrap();

        assert_eq!(
            recorder.updates,
            vec![
                Progress::Determinate(Percentage::from_ratio(0.01)),
                Progress::Determinate(Percentage::COMPLETE),
            ]
        );
    }

    #[tokio::test]
    async fn percentage_never_regresses_or_overflows() {
        let dir = tempfile::tempdir().unwrap();
        // More bytes than declared: clamped at 100%, never beyond.
        let chunks = vec![vec![0; 60], vec![0; 60], vec![0; 60]];
        let mut task = DownloadTask::new(dir.path().join("episode"));
        let mut recorder = Recorder::default();
        task.run(transfer_of(chunks, Some(100)), &mut recorder)
            .await
            .unwrap();

        let wholes: Vec<u8> = recorder
            .updates
            .iter()
            .map(|update| match update {
                Progress::Determinate(percentage) => percentage.whole(),
                Progress::Indeterminate(_) => panic!("total was known"),
            })
            .collect();
        assert_eq!(wholes, vec![60, 100]);
    }

    #[tokio::test]
    async fn unknown_total_is_indeterminate() {
        let dir = tempfile::tempdir().unwrap();
        let mut task = DownloadTask::new(dir.path().join("episode"));
        let mut recorder = Recorder::default();
        task.run(transfer_of(vec![vec![0; 3], vec![0; 4]], None), &mut recorder)
            .await
            .unwrap();

        assert_eq!(
            recorder.updates,
            vec![
                Progress::Indeterminate(3),
                Progress::Indeterminate(7),
                Progress::Determinate(Percentage::COMPLETE),
            ]
        );
        assert!(task.is_completed());
        assert_eq!(task.total(), None);
    }

    #[tokio::test]
    async fn failure_mid_stream_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let destination = dir.path().join("episode.mp3");

        let chunks = vec![
            Ok(Bytes::from(vec![9u8; 400])),
            Err(Error::transfer("connection reset")),
        ];
        let transfer = Transfer::from_stream(stream::iter(chunks), Some(1000));
        let mut task = DownloadTask::new(&destination);
        let mut recorder = Recorder::default();
        let err = task.run(transfer, &mut recorder).await.unwrap_err();

        assert_eq!(err.kind, ErrorKind::Transfer);
        assert!(matches!(task.status(), Status::Failed(_)));
        assert!(recorder.abandoned);
        assert!(!recorder.finished);
        assert_eq!(task.bytes_written(), 400);
        assert_eq!(std::fs::metadata(&destination).unwrap().len(), 400);
    }

    #[tokio::test]
    async fn failure_just_short_of_the_end_never_shows_complete() {
        let dir = tempfile::tempdir().unwrap();
        let chunks = vec![
            Ok(Bytes::from(vec![0u8; 500])),
            Ok(Bytes::from(vec![0u8; 495])),
            Err(Error::transfer("connection reset")),
        ];
        let transfer = Transfer::from_stream(stream::iter(chunks), Some(1000));
        let mut task = DownloadTask::new(dir.path().join("episode"));
        let mut recorder = Recorder::default();
        task.run(transfer, &mut recorder).await.unwrap_err();

        assert_eq!(
            recorder.updates,
            vec![
                Progress::Determinate(Percentage::from_ratio(0.5)),
                Progress::Determinate(Percentage::from_ratio(0.995)),
            ]
        );
        let Progress::Determinate(last) = recorder.updates[1] else {
            panic!("total was known");
        };
        assert_eq!(last.whole(), 99);
        assert!(recorder.abandoned);
    }

    #[tokio::test]
    async fn known_total_shows_time_left() {
        let dir = tempfile::tempdir().unwrap();
        let chunks = vec![vec![0; 400], vec![0; 600]];
        let mut task = DownloadTask::new(dir.path().join("episode"));
        let mut recorder = Recorder::default();
        task.run(transfer_of(chunks, Some(1000)), &mut recorder)
            .await
            .unwrap();

        assert!(recorder.messages[0].starts_with("400 B ETA "));
        assert_eq!(recorder.messages[1], "1000 B ETA 0:00");
    }

    #[tokio::test]
    async fn unknown_total_shows_no_time_left() {
        let dir = tempfile::tempdir().unwrap();
        let mut task = DownloadTask::new(dir.path().join("episode"));
        let mut recorder = Recorder::default();
        task.run(transfer_of(vec![vec![0; 3]], None), &mut recorder)
            .await
            .unwrap();

        assert_eq!(recorder.messages[0], "3 B");
    }

    #[tokio::test]
    async fn terminal_status_is_final() {
        let dir = tempfile::tempdir().unwrap();
        let mut task = DownloadTask::new(dir.path().join("episode"));
        task.run(transfer_of(vec![b"done".to_vec()], None), &mut Recorder::default())
            .await
            .unwrap();

        let err = task
            .run(transfer_of(vec![b"again".to_vec()], None), &mut Recorder::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Internal);
        assert!(task.is_completed());

        task.set_status(Status::Failed("late".to_owned()));
        assert!(task.is_completed());
    }

    #[tokio::test]
    async fn download_fetches_episode() {
        use url::Url;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/media/pilot.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 1000]))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = http::Client::new(&crate::config::Config::default()).unwrap();
        let url = Url::parse(&format!("{}/media/pilot.mp3", mock_server.uri())).unwrap();
        let episode = EpisodeRef::new("Pilot", url, Some(1000));
        let destination = dir.path().join(episode.file_name());

        let mut recorder = Recorder::default();
        let task = download(&client, &episode, &destination, &mut recorder)
            .await
            .unwrap();

        assert!(task.is_completed());
        assert_eq!(task.destination(), dir.path().join("Pilot.mp3"));
        assert_eq!(std::fs::metadata(&destination).unwrap().len(), 1000);
    }

    #[tokio::test]
    async fn download_does_not_create_file_on_http_error() {
        use url::Url;
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = http::Client::new(&crate::config::Config::default()).unwrap();
        let url = Url::parse(&format!("{}/gone.mp3", mock_server.uri())).unwrap();
        let episode = EpisodeRef::new("Gone", url, None);
        let destination = dir.path().join(episode.file_name());

        let mut recorder = Recorder::default();
        let err = download(&client, &episode, &destination, &mut recorder)
            .await
            .unwrap_err();

        assert_eq!(err.kind, ErrorKind::Transfer);
        assert!(recorder.abandoned);
        assert!(!destination.exists());
    }
}
