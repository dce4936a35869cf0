//! A single HTTP download exposed as a stream of chunks.
//!
//! [`Transfer`] is pull-based: the next chunk is only read from the
//! connection when the consumer polls for it, so at most one chunk is held in
//! memory regardless of the size of the file.
//!
//! Every chunk carries the running byte count and the total, if known. The
//! stream ends after the connection closes cleanly, or after yielding a single
//! error. Nothing is retried.
//!
//! # Example
//!
//! ```no_run
//! use futures_util::StreamExt;
//! use podplay::transfer::Transfer;
//!
//! let mut transfer = Transfer::open(&client, url, None).await?;
//! while let Some(chunk) = transfer.next().await {
//!     let chunk = chunk?;
//!     println!("{} of {:?} bytes", chunk.received, chunk.total);
//! }
//! ```

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use bytes::Bytes;
use futures_util::{ready, stream::BoxStream, Stream, StreamExt};
use url::Url;

use crate::{
    error::{Error, Result},
    http,
};

/// A chunk of the response body, in arrival order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub data: Bytes,

    /// Bytes received so far, including this chunk.
    pub received: u64,

    /// Total size of the body, if known.
    pub total: Option<u64>,
}

/// Response body of a single GET request.
pub struct Transfer {
    inner: BoxStream<'static, Result<Bytes>>,
    received: u64,
    total: Option<u64>,
    done: bool,
}

impl Transfer {
    /// Sends a GET request for `url` and returns its body as a stream.
    ///
    /// The total is taken from the `Content-Length` of the response, falling
    /// back to `declared_len` (usually the enclosure length from the feed).
    ///
    /// # Errors
    ///
    /// Returns a [`Transfer`](crate::error::ErrorKind::Transfer) error if the
    /// connection fails or the server does not respond with a success status.
    pub async fn open(client: &http::Client, url: Url, declared_len: Option<u64>) -> Result<Self> {
        let response = client.execute(client.get(url.clone())).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::transfer(format!(
                "{url} returned HTTP {}",
                status.as_u16()
            )));
        }

        let total = response.content_length().or(declared_len);
        match total {
            Some(total) => debug!("transferring {total} bytes from {url}"),
            None => debug!("transferring unknown number of bytes from {url}"),
        }

        let body = response.bytes_stream().map(|chunk| chunk.map_err(Error::from));
        Ok(Self::from_stream(body, total))
    }

    /// Wraps any stream of byte chunks.
    pub fn from_stream<S>(stream: S, total: Option<u64>) -> Self
    where
        S: Stream<Item = Result<Bytes>> + Send + 'static,
    {
        Self {
            inner: stream.boxed(),
            received: 0,
            total,
            done: false,
        }
    }

    #[must_use]
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    #[must_use]
    pub fn received(&self) -> u64 {
        self.received
    }
}

impl Stream for Transfer {
    type Item = Result<Chunk>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }

        match ready!(self.inner.poll_next_unpin(cx)) {
            Some(Ok(data)) => {
                self.received = self.received.saturating_add(data.len() as u64);
                trace!("received {} of {:?} bytes", self.received, self.total);
                Poll::Ready(Some(Ok(Chunk {
                    data,
                    received: self.received,
                    total: self.total,
                })))
            }
            Some(Err(e)) => {
                self.done = true;
                Poll::Ready(Some(Err(e)))
            }
            None => {
                self.done = true;
                Poll::Ready(None)
            }
        }
    }
}
