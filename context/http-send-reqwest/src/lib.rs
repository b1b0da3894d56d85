//! Reqwest-based HTTP sending for credchain.
//!
//! Provides [`ReqwestHttpSend`], an implementation of the `HttpSend` trait
//! from `credchain_core` backed by a shared [`reqwest::Client`]. The client
//! carries the agent's connection pool, TLS configuration and proxy
//! settings; pass a pre-configured client to [`ReqwestHttpSend::new`] to
//! share them with credential resolution.

use async_trait::async_trait;
use bytes::Bytes;
use credchain_core::{Error, HttpSend, Result};
use http_body_util::BodyExt;
use reqwest::{Client, Request};

/// Reqwest-based implementation of the `HttpSend` trait.
#[derive(Debug, Default)]
pub struct ReqwestHttpSend {
    client: Client,
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend from a configured [`reqwest::Client`].
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let req = Request::try_from(req)
            .map_err(|e| Error::unexpected("failed to convert HTTP request").with_source(e))?;

        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(|e| {
                Error::unexpected("failed to send HTTP request")
                    .with_source(e)
                    .set_retryable(true)
            })?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(|e| Error::unexpected("failed to read HTTP response body").with_source(e))?;
        Ok(http::Response::from_parts(parts, bs))
    }
}
