use crate::Result;
use bytes::Bytes;
use std::fmt::Debug;

/// HttpSend is used to send HTTP requests during credential resolution.
///
/// For example, fetching an IMDS token or exchanging a web identity token
/// with STS. This trait is the seam between the core and the host agent's
/// connection pool; please don't use it as a general HTTP client.
#[async_trait::async_trait]
pub trait HttpSend: Debug + Send + Sync + 'static {
    /// Send an HTTP request and return the response.
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>>;
}
