//! Podcast feed retrieval and episode selection.
//!
//! Feeds are fetched over HTTP and parsed as RSS 2.0. Only what the pipeline
//! needs is kept: the channel title and description, and for every item its
//! title and enclosure.

use url::Url;

use crate::{
    episode::EpisodeRef,
    error::{Error, Result},
    http,
};

/// The media attached to a feed item.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Enclosure {
    pub url: String,

    /// Declared length in bytes; `None` when absent, unparsable or zero.
    pub length: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Item {
    pub title: Option<String>,
    pub enclosure: Option<Enclosure>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Feed {
    pub title: String,
    pub description: String,
    pub items: Vec<Item>,
}

impl Feed {
    /// Fetches and parses the feed at `url`.
    ///
    /// # Errors
    ///
    /// Returns a [`Feed`](crate::error::ErrorKind::Feed) error if the request
    /// fails, the server does not respond with a success status, or the body
    /// is not an RSS feed.
    pub async fn fetch(client: &http::Client, url: &Url) -> Result<Self> {
        debug!("fetching feed {url}");

        let response = client
            .execute(client.get(url.clone()))
            .await
            .map_err(|e| Error::feed(e.error))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::feed(format!(
                "{url} returned HTTP {}",
                status.as_u16()
            )));
        }

        let content = response.bytes().await.map_err(Error::feed)?;
        Self::parse(&content)
    }

    /// Parses an RSS document.
    pub fn parse(content: &[u8]) -> Result<Self> {
        let channel = rss::Channel::read_from(content)?;

        let items: Vec<Item> = channel
            .items()
            .iter()
            .map(|item| Item {
                title: item.title().map(ToString::to_string),
                enclosure: item.enclosure().map(|enclosure| Enclosure {
                    url: enclosure.url().to_string(),
                    length: enclosure
                        .length()
                        .trim()
                        .parse::<u64>()
                        .ok()
                        .filter(|length| *length > 0),
                }),
            })
            .collect();
        debug!("feed \"{}\" has {} items", channel.title(), items.len());

        Ok(Self {
            title: channel.title().to_string(),
            description: channel.description().to_string(),
            items,
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Picks the episode at the zero-based `index`.
    ///
    /// # Errors
    ///
    /// Returns a [`Selection`](crate::error::ErrorKind::Selection) error when
    /// the feed is empty, the index is out of range, or the item has no
    /// usable enclosure.
    pub fn select(&self, index: usize) -> Result<EpisodeRef> {
        if self.is_empty() {
            return Err(Error::selection("feed is empty"));
        }

        let item = self.items.get(index).ok_or_else(|| {
            Error::selection(format!(
                "episode {index} does not exist; choose between 0 and {}",
                self.len() - 1
            ))
        })?;

        let enclosure = item
            .enclosure
            .as_ref()
            .ok_or_else(|| Error::selection(format!("episode {index} has no media enclosure")))?;
        let url = Url::parse(&enclosure.url)?;

        Ok(EpisodeRef::new(
            item.title.clone().unwrap_or_default(),
            url,
            enclosure.length,
        ))
    }
}
