use std::fmt;

use url::Url;

use crate::util;

/// A single episode chosen for download.
///
/// Produced by [`Feed::select`](crate::feed::Feed::select) and consumed once
/// by the [`Pipeline`](crate::pipeline::Pipeline).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EpisodeRef {
    title: String,
    source_url: Url,
    expected_size: Option<u64>,
}

impl EpisodeRef {
    /// Name used when an episode has no title.
    pub const FALLBACK_TITLE: &'static str = "Episode";

    #[must_use]
    pub fn new(title: impl Into<String>, source_url: Url, expected_size: Option<u64>) -> Self {
        Self {
            title: title.into(),
            source_url,
            expected_size,
        }
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn source_url(&self) -> &Url {
        &self.source_url
    }

    /// The size declared by the feed, if any.
    #[must_use]
    pub fn expected_size(&self) -> Option<u64> {
        self.expected_size
    }

    /// The extension of the last path segment of the source URL.
    ///
    /// Everything after the last `.` of the segment; empty if there is none.
    #[must_use]
    pub fn extension(&self) -> &str {
        self.source_url
            .path_segments()
            .and_then(Iterator::last)
            .and_then(|segment| segment.rsplit_once('.'))
            .map_or("", |(_, extension)| extension)
    }

    /// The file name the episode is stored under.
    ///
    /// The title (or [`FALLBACK_TITLE`](Self::FALLBACK_TITLE) when blank)
    /// followed by the extension of the source URL, if any.
    #[must_use]
    pub fn file_name(&self) -> String {
        let title = self.title.trim();
        let stem = if title.is_empty() {
            Self::FALLBACK_TITLE
        } else {
            title
        };

        let stem = util::sanitize_file_name(stem);
        match self.extension() {
            "" => stem,
            extension => format!("{stem}.{extension}"),
        }
    }
}

impl fmt::Display for EpisodeRef {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "\"{}\" ({})", self.title, self.source_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode(title: &str, url: &str) -> EpisodeRef {
        EpisodeRef::new(title, Url::parse(url).unwrap(), None)
    }

    #[test]
    fn file_name_uses_title_and_extension() {
        let episode = episode("Pilot", "https://cdn.example.com/shows/pilot-ep.mp3");
        assert_eq!(episode.file_name(), "Pilot.mp3");
    }

    #[test]
    fn file_name_falls_back_when_title_is_blank() {
        assert_eq!(
            episode("", "https://cdn.example.com/a.m4a").file_name(),
            "Episode.m4a"
        );
        assert_eq!(
            episode("   ", "https://cdn.example.com/a.m4a").file_name(),
            "Episode.m4a"
        );
    }

    #[test]
    fn extension_is_empty_without_dot() {
        let episode = episode("Pilot", "https://cdn.example.com/media/12345");
        assert_eq!(episode.extension(), "");
        assert_eq!(episode.file_name(), "Pilot");
    }

    #[test]
    fn extension_ignores_query_and_takes_last_dot() {
        let episode = episode("Pilot", "https://cdn.example.com/a.b/show.final.ogg?token=x.y");
        assert_eq!(episode.extension(), "ogg");
    }

    #[test]
    fn file_name_cannot_escape_directory() {
        let episode = episode("../../etc/passwd", "https://cdn.example.com/a.mp3");
        assert_eq!(episode.file_name(), ".._.._etc_passwd.mp3");
    }
}
