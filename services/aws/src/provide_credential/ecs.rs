use crate::constants::{
    AWS_CONTAINER_AUTHORIZATION_TOKEN, AWS_CONTAINER_CREDENTIALS_FULL_URI,
    AWS_CONTAINER_CREDENTIALS_RELATIVE_URI,
};
use crate::envelope::parse_credential_envelope;
use crate::Credential;
use async_trait::async_trait;
use credchain_core::{Context, Error, ProvideCredential, Result};
use http::{HeaderValue, Method, Request, StatusCode};
use log::debug;
use std::time::Duration;

/// The link-local address where the ECS agent vends task credentials.
const ECS_CREDENTIALS_ENDPOINT: &str = "http://169.254.170.2";

/// Deadline for a single endpoint round-trip; the endpoint is local to the
/// host, like IMDS.
const ENDPOINT_TIMEOUT: Duration = Duration::from_secs(5);

/// ECSCredentialProvider fetches credentials from a local HTTP endpoint.
///
/// In ECS the agent vends task-role credentials via a link-local address;
/// some deployments run their own local service speaking the same JSON
/// envelope. The endpoint is taken from:
///
/// 1. `with_endpoint()`, a complete URL
/// 2. `with_relative_uri()`, appended to the link-local host
/// 3. `AWS_CONTAINER_CREDENTIALS_FULL_URI`
/// 4. `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI`
///
/// With none of these set the provider declines silently, so it can sit in
/// the default chain on hosts that are not containers. An `Authorization`
/// header is attached when configured or when
/// `AWS_CONTAINER_AUTHORIZATION_TOKEN` is set.
#[derive(Debug, Clone, Default)]
pub struct ECSCredentialProvider {
    endpoint: Option<String>,
    relative_uri: Option<String>,
    auth_token: Option<String>,
}

impl ECSCredentialProvider {
    /// Create a new ECS credential provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a complete endpoint URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Set the path appended to the link-local credentials host.
    pub fn with_relative_uri(mut self, uri: impl Into<String>) -> Self {
        self.relative_uri = Some(uri.into());
        self
    }

    /// Set the authorization token sent with the request.
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    fn get_endpoint(&self, ctx: &Context) -> Option<String> {
        if let Some(endpoint) = &self.endpoint {
            return Some(endpoint.clone());
        }
        if let Some(relative_uri) = &self.relative_uri {
            return Some(format!("{ECS_CREDENTIALS_ENDPOINT}{relative_uri}"));
        }
        if let Some(full_uri) = ctx.env_var(AWS_CONTAINER_CREDENTIALS_FULL_URI) {
            return Some(full_uri);
        }
        if let Some(relative_uri) = ctx.env_var(AWS_CONTAINER_CREDENTIALS_RELATIVE_URI) {
            return Some(format!("{ECS_CREDENTIALS_ENDPOINT}{relative_uri}"));
        }

        None
    }

    fn load_auth_token(&self, ctx: &Context) -> Option<String> {
        self.auth_token
            .clone()
            .or_else(|| ctx.env_var(AWS_CONTAINER_AUTHORIZATION_TOKEN))
    }
}

#[async_trait]
impl ProvideCredential for ECSCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let Some(endpoint) = self.get_endpoint(ctx) else {
            debug!("no container credentials endpoint configured");
            return Ok(None);
        };

        debug!("fetching credentials from {endpoint}");

        let mut req = Request::builder()
            .method(Method::GET)
            .uri(&endpoint)
            .body(bytes::Bytes::new())
            .map_err(|e| {
                Error::unexpected("failed to build credentials request")
                    .with_source(e)
                    .with_context(format!("endpoint: {endpoint}"))
            })?;

        if let Some(token) = self.load_auth_token(ctx) {
            req.headers_mut().insert(
                http::header::AUTHORIZATION,
                HeaderValue::from_str(&token).map_err(|e| {
                    Error::configuration("invalid container authorization token").with_source(e)
                })?,
            );
        }

        let resp = match tokio::time::timeout(ENDPOINT_TIMEOUT, ctx.http_send_as_string(req)).await
        {
            Ok(resp) => resp.map_err(|e| {
                Error::http_endpoint_unavailable("failed to reach credentials endpoint")
                    .with_source(e)
                    .with_context(format!("endpoint: {endpoint}"))
                    .set_retryable(true)
            })?,
            Err(_) => {
                return Err(Error::timeout("credentials endpoint request timed out")
                    .with_context(format!("endpoint: {endpoint}")))
            }
        };

        if resp.status() != StatusCode::OK {
            return Err(Error::http_endpoint_unavailable(format!(
                "credentials endpoint returned {}: {}",
                resp.status(),
                resp.body()
            ))
            .with_context(format!("endpoint: {endpoint}"))
            .set_retryable(true));
        }

        let cred = parse_credential_envelope(&resp.into_body())?;
        Ok(Some(cred))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credchain_core::StaticEnv;
    use credchain_file_read_tokio::TokioFileRead;
    use credchain_http_send_reqwest::ReqwestHttpSend;
    use std::collections::HashMap;

    fn ctx_with_envs(envs: HashMap<String, String>) -> Context {
        Context::new(TokioFileRead, ReqwestHttpSend::default())
            .with_env(StaticEnv { home_dir: None, envs })
    }

    #[tokio::test]
    async fn test_no_endpoint_declines() {
        let provider = ECSCredentialProvider::new();
        let cred = provider
            .provide_credential(&ctx_with_envs(HashMap::new()))
            .await
            .unwrap();
        assert!(cred.is_none());
    }

    #[test]
    fn test_endpoint_from_relative_uri_env() {
        let ctx = ctx_with_envs(HashMap::from([(
            AWS_CONTAINER_CREDENTIALS_RELATIVE_URI.to_string(),
            "/v2/credentials/task-role".to_string(),
        )]));

        let endpoint = ECSCredentialProvider::new().get_endpoint(&ctx).unwrap();
        assert_eq!(endpoint, "http://169.254.170.2/v2/credentials/task-role");
    }

    #[test]
    fn test_endpoint_from_full_uri_env() {
        let ctx = ctx_with_envs(HashMap::from([(
            AWS_CONTAINER_CREDENTIALS_FULL_URI.to_string(),
            "http://localhost:8080/credentials".to_string(),
        )]));

        let endpoint = ECSCredentialProvider::new().get_endpoint(&ctx).unwrap();
        assert_eq!(endpoint, "http://localhost:8080/credentials");
    }

    #[test]
    fn test_configured_endpoint_overrides_env() {
        let ctx = ctx_with_envs(HashMap::from([(
            AWS_CONTAINER_CREDENTIALS_FULL_URI.to_string(),
            "http://env-endpoint/creds".to_string(),
        )]));

        let endpoint = ECSCredentialProvider::new()
            .with_endpoint("http://configured-endpoint/creds")
            .get_endpoint(&ctx)
            .unwrap();
        assert_eq!(endpoint, "http://configured-endpoint/creds");

        let endpoint = ECSCredentialProvider::new()
            .with_relative_uri("/relative")
            .get_endpoint(&ctx)
            .unwrap();
        assert_eq!(endpoint, "http://169.254.170.2/relative");
    }

    #[test]
    fn test_auth_token_priority() {
        let ctx = ctx_with_envs(HashMap::from([(
            AWS_CONTAINER_AUTHORIZATION_TOKEN.to_string(),
            "env-token".to_string(),
        )]));

        let token = ECSCredentialProvider::new()
            .with_auth_token("configured-token")
            .load_auth_token(&ctx);
        assert_eq!(token, Some("configured-token".to_string()));

        let token = ECSCredentialProvider::new().load_auth_token(&ctx);
        assert_eq!(token, Some("env-token".to_string()));
    }
}
