//! HTTP client shared by feed retrieval and episode transfer.
//!
//! This module provides a wrapper around `reqwest::Client` that adds:
//! * A consistent `User-Agent`
//! * Connect and read timeouts
//! * TCP keep-alive
//!
//! No request is retried: a failed request is terminal for the run.

use std::time::Duration;

use reqwest::{self, Method, Url};

use crate::{config::Config, error::Result};

/// HTTP client with the application's timeouts and headers.
#[derive(Clone, Debug)]
pub struct Client {
    inner: reqwest::Client,
}

impl Client {
    /// Duration to keep idle connections alive.
    const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns error if the TLS backend cannot be initialized.
    pub fn new(config: &Config) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .tcp_keepalive(Self::KEEPALIVE_TIMEOUT)
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { inner })
    }

    /// Builds a GET request.
    pub fn get(&self, url: Url) -> reqwest::Request {
        reqwest::Request::new(Method::GET, url)
    }

    /// Executes a request.
    ///
    /// The response is returned as soon as the headers arrive; the body is
    /// read by the caller.
    pub async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        let url = request.url().clone();
        trace!("{} {url}", request.method());
        let response = self.inner.execute(request).await?;
        debug!("{url} responded with {}", response.status());
        Ok(response)
    }
}
