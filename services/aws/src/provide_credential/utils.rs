use bytes::Bytes;
use credchain_core::{Context, Error, Result};
use serde::Deserialize;
use std::time::Duration;

/// Deadline for a single STS round-trip.
pub(crate) const STS_TIMEOUT: Duration = Duration::from_secs(30);

/// Get the STS endpoint for a region.
///
/// Regional endpoints look like `sts.{region}.amazonaws.com`; with no
/// region the global endpoint is used. China partitions carry the
/// `.com.cn` suffix.
pub(crate) fn sts_endpoint(region: Option<&str>) -> String {
    match region {
        Some(region) if region.starts_with("cn-") => format!("sts.{region}.amazonaws.com.cn"),
        Some(region) => format!("sts.{region}.amazonaws.com"),
        None => "sts.amazonaws.com".to_string(),
    }
}

/// Send a request to STS under the STS deadline.
pub(crate) async fn send_sts_request(
    ctx: &Context,
    req: http::Request<Bytes>,
    operation: &'static str,
) -> Result<http::Response<String>> {
    match tokio::time::timeout(STS_TIMEOUT, ctx.http_send_as_string(req)).await {
        Ok(resp) => resp.map_err(|e| {
            Error::unexpected("failed to send request to STS")
                .with_source(e)
                .with_context(format!("operation: {operation}"))
                .set_retryable(true)
        }),
        Err(_) => Err(Error::timeout("STS request timed out")
            .with_context(format!("operation: {operation}"))),
    }
}

/// The envelope STS wraps error responses in.
#[derive(Debug, Deserialize)]
pub(crate) struct StsErrorResponse {
    #[serde(rename = "Error")]
    pub error: StsError,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StsError {
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Message", default)]
    pub message: String,
}

/// Turn a non-200 STS response into an error, carrying the service error
/// code verbatim when the body parses.
pub(crate) fn parse_sts_error(
    operation: &'static str,
    status: http::StatusCode,
    body: &str,
) -> Error {
    match quick_xml::de::from_str::<StsErrorResponse>(body) {
        Ok(resp) => Error::sts_rejected(resp.error.code, resp.error.message)
            .with_context(format!("operation: {operation}"))
            .with_context(format!("http_status: {status}")),
        Err(_) => Error::unexpected(format!("STS request failed with {status}: {body}"))
            .with_context(format!("operation: {operation}"))
            .set_retryable(status.is_server_error()),
    }
}
