//! Protocol client for the EC2 instance metadata service (IMDSv2).
//!
//! All metadata access is session-oriented: a token is acquired with a
//! `PUT`, carried on every `GET`, and renewed before its TTL lapses. The
//! token lives behind a mutex so one client instance can be shared by
//! every caller of the IMDS credential provider.

use crate::constants::{
    AWS_EC2_METADATA_SERVICE_ENDPOINT, IMDS_TOKEN_TTL_SECS, REFRESH_WINDOW_SECS,
    X_AWS_EC2_METADATA_TOKEN, X_AWS_EC2_METADATA_TOKEN_TTL_SECONDS,
};
use bytes::Bytes;
use credchain_core::time::{now, DateTime};
use credchain_core::{Context, Error, Result};
use http::header::CONTENT_LENGTH;
use http::{Method, StatusCode};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const IMDS_DEFAULT_ENDPOINT: &str = "http://169.254.169.254";
const IMDS_TOKEN_PATH: &str = "/latest/api/token";
const IMDS_ROLE_PATH: &str = "/latest/meta-data/iam/security-credentials/";

/// Deadline for a single metadata round-trip. The service is link-local;
/// anything slower than this means we are not on EC2 or the network is
/// broken.
const IMDS_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for the IMDSv2 token/role/credential exchange.
#[derive(Debug, Clone, Default)]
pub(crate) struct ImdsClient {
    /// Session token and the instant at which it must be re-requested.
    token: Arc<Mutex<(String, DateTime)>>,
}

impl ImdsClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn endpoint(&self, ctx: &Context) -> String {
        ctx.env_var(AWS_EC2_METADATA_SERVICE_ENDPOINT)
            .unwrap_or_else(|| IMDS_DEFAULT_ENDPOINT.to_string())
    }

    async fn send_with_deadline(
        &self,
        ctx: &Context,
        req: http::Request<Bytes>,
        operation: &'static str,
    ) -> Result<http::Response<String>> {
        match tokio::time::timeout(IMDS_TIMEOUT, ctx.http_send_as_string(req)).await {
            Ok(resp) => resp.map_err(|e| {
                Error::imds_unavailable("failed to reach instance metadata service")
                    .with_source(e)
                    .with_context(format!("operation: {operation}"))
                    .set_retryable(true)
            }),
            Err(_) => Err(Error::timeout("instance metadata request timed out")
                .with_context(format!("operation: {operation}"))),
        }
    }

    /// Return a session token, requesting a new one when the cached token
    /// is inside the refresh window.
    async fn load_token(&self, ctx: &Context) -> Result<String> {
        {
            let (token, deadline) = self.token.lock().expect("lock poisoned").clone();
            if !token.is_empty() && deadline > now() {
                return Ok(token);
            }
        }

        log::debug!("requesting a new IMDSv2 session token");

        let url = format!("{}{}", self.endpoint(ctx), IMDS_TOKEN_PATH);
        let req = http::Request::builder()
            .uri(url)
            .method(Method::PUT)
            .header(CONTENT_LENGTH, "0")
            .header(
                X_AWS_EC2_METADATA_TOKEN_TTL_SECONDS,
                IMDS_TOKEN_TTL_SECS.to_string(),
            )
            .body(Bytes::new())
            .map_err(|e| Error::unexpected("failed to build token request").with_source(e))?;

        let resp = self.send_with_deadline(ctx, req, "acquire_token").await?;
        if resp.status() != StatusCode::OK {
            return Err(Error::imds_unavailable(format!(
                "token request failed: {}",
                resp.body()
            ))
            .with_context(format!("http_status: {}", resp.status()))
            .set_retryable(true));
        }

        let token = resp.into_body();
        let deadline = now()
            + chrono::TimeDelta::try_seconds(IMDS_TOKEN_TTL_SECS - REFRESH_WINDOW_SECS)
                .expect("in bounds");

        *self.token.lock().expect("lock poisoned") = (token.clone(), deadline);

        Ok(token)
    }

    fn invalidate_token(&self) {
        *self.token.lock().expect("lock poisoned") = (String::new(), DateTime::default());
    }

    async fn metadata_request(
        &self,
        ctx: &Context,
        path: &str,
        token: &str,
        operation: &'static str,
    ) -> Result<http::Response<String>> {
        let url = format!("{}{}", self.endpoint(ctx), path);
        let req = http::Request::builder()
            .uri(url)
            .method(Method::GET)
            .header(X_AWS_EC2_METADATA_TOKEN, token)
            .body(Bytes::new())
            .map_err(|e| Error::unexpected("failed to build metadata request").with_source(e))?;

        self.send_with_deadline(ctx, req, operation).await
    }

    /// `GET` a metadata path with the session token attached.
    ///
    /// A 401/403 means the server no longer accepts our token; it is
    /// dropped, re-acquired, and the request retried exactly once.
    async fn get_metadata(
        &self,
        ctx: &Context,
        path: &str,
        operation: &'static str,
    ) -> Result<http::Response<String>> {
        let token = self.load_token(ctx).await?;
        let resp = self.metadata_request(ctx, path, &token, operation).await?;

        if resp.status() == StatusCode::UNAUTHORIZED || resp.status() == StatusCode::FORBIDDEN {
            log::debug!("IMDS rejected the session token, retrying with a fresh one");
            self.invalidate_token();
            let token = self.load_token(ctx).await?;
            return self.metadata_request(ctx, path, &token, operation).await;
        }

        Ok(resp)
    }

    /// Discover the IAM role attached to this instance.
    ///
    /// Returns `Ok(None)` when the instance has no role (404), so the
    /// chain can move on without treating it as an error.
    pub(crate) async fn fetch_role_name(&self, ctx: &Context) -> Result<Option<String>> {
        let resp = self
            .get_metadata(ctx, IMDS_ROLE_PATH, "fetch_role_name")
            .await?;

        match resp.status() {
            StatusCode::OK => Ok(Some(resp.into_body().trim().to_string())),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(Error::imds_unavailable(format!(
                "role discovery failed: {}",
                resp.body()
            ))
            .with_context(format!("http_status: {status}"))
            .set_retryable(true)),
        }
    }

    /// Fetch the credential envelope for the given role.
    pub(crate) async fn fetch_role_credentials(&self, ctx: &Context, role: &str) -> Result<String> {
        let path = format!("{IMDS_ROLE_PATH}{role}");
        let resp = self
            .get_metadata(ctx, &path, "fetch_role_credentials")
            .await?;

        if resp.status() != StatusCode::OK {
            return Err(Error::imds_unavailable(format!(
                "credential fetch failed: {}",
                resp.body()
            ))
            .with_context(format!("http_status: {}", resp.status()))
            .with_context(format!("role: {role}"))
            .set_retryable(true));
        }

        Ok(resp.into_body())
    }
}
