use crate::constants::AWS_EC2_METADATA_DISABLED;
use crate::envelope::CredentialEnvelope;
use crate::imds::ImdsClient;
use crate::Credential;
use async_trait::async_trait;
use credchain_core::{Context, Error, ProvideCredential, Result};
use log::debug;

/// IMDSv2CredentialProvider loads credentials for the IAM role attached to
/// the current EC2 instance.
///
/// The provider drives the IMDSv2 session protocol: acquire a token,
/// discover the attached role, fetch the role's credentials. An instance
/// without an attached role is a silent decline so the chain can move on.
/// The provider can be disabled via the builder or by setting
/// `AWS_EC2_METADATA_DISABLED=true`.
///
/// Wrap this provider in `CachedCredentialProvider` (the default chain
/// does) so the three-request exchange only runs when the cached record
/// goes stale.
#[derive(Debug, Clone, Default)]
pub struct IMDSv2CredentialProvider {
    disabled: Option<bool>,
    client: ImdsClient,
}

impl IMDSv2CredentialProvider {
    /// Create a new `IMDSv2CredentialProvider` instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable the provider.
    pub fn disabled(mut self) -> Self {
        self.disabled = Some(true);
        self
    }
}

#[async_trait]
impl ProvideCredential for IMDSv2CredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let disabled = self.disabled.unwrap_or_else(|| {
            ctx.env_var(AWS_EC2_METADATA_DISABLED)
                .map(|v| v == "true")
                .unwrap_or(false)
        });
        if disabled {
            return Ok(None);
        }

        let Some(role) = self.client.fetch_role_name(ctx).await? else {
            debug!("no IAM role attached to this instance");
            return Ok(None);
        };

        debug!("requesting credentials for instance role {role}");

        let body = self.client.fetch_role_credentials(ctx, &role).await?;

        let envelope = CredentialEnvelope::from_json(&body).map_err(|e| {
            Error::imds_unavailable("credential response rejected")
                .with_source(e)
                .with_context(format!("role: {role}"))
        })?;

        if !envelope.code.is_empty() && envelope.code != "Success" {
            if envelope.code == "AssumeRoleUnauthorizedAccess" {
                return Err(Error::configuration(format!(
                    "instance not authorized to assume role: [{}] {}",
                    envelope.code, envelope.message
                ))
                .with_context("hint: does the role have a trust relationship with EC2?"));
            }
            return Err(Error::imds_unavailable(format!(
                "error retrieving credentials: [{}] {}",
                envelope.code, envelope.message
            )));
        }

        let cred = envelope.into_credential().map_err(|e| {
            Error::imds_unavailable("credential response rejected")
                .with_source(e)
                .with_context(format!("role: {role}"))
        })?;

        Ok(Some(cred))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credchain_core::{ErrorKind, FileRead, HttpSend, StaticEnv};
    use bytes::Bytes;
    use http::{Method, StatusCode};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Answers the token PUT, then serves scripted (status, body) pairs
    /// for every metadata GET in order.
    #[derive(Debug)]
    struct ScriptedImds {
        responses: Arc<Mutex<Vec<(StatusCode, &'static str)>>>,
    }

    #[async_trait::async_trait]
    impl HttpSend for ScriptedImds {
        async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
            if req.method() == Method::PUT {
                return Ok(http::Response::builder()
                    .status(StatusCode::OK)
                    .body(Bytes::from_static(b"imds-token"))
                    .unwrap());
            }

            let (status, body) = self.responses.lock().unwrap().remove(0);
            Ok(http::Response::builder()
                .status(status)
                .body(Bytes::from(body))
                .unwrap())
        }
    }

    #[derive(Debug, Clone, Copy)]
    struct NoopFileRead;

    #[async_trait::async_trait]
    impl FileRead for NoopFileRead {
        async fn file_read(&self, path: &str) -> Result<Vec<u8>> {
            Err(Error::unexpected(format!("no such file: {path}")))
        }
    }

    fn scripted_context(responses: Vec<(StatusCode, &'static str)>) -> Context {
        let _ = env_logger::builder().is_test(true).try_init();
        Context::new(
            NoopFileRead,
            ScriptedImds {
                responses: Arc::new(Mutex::new(responses)),
            },
        )
        .with_env(StaticEnv::default())
    }

    #[tokio::test]
    async fn test_no_role_is_a_silent_decline() {
        let ctx = scripted_context(vec![(StatusCode::NOT_FOUND, "no role")]);

        let cred = IMDSv2CredentialProvider::new()
            .provide_credential(&ctx)
            .await
            .unwrap();
        assert!(cred.is_none());
    }

    #[tokio::test]
    async fn test_malformed_body_surfaces_as_imds_unavailable() {
        let ctx = scripted_context(vec![
            (StatusCode::OK, "log-shipper-role"),
            (StatusCode::OK, r#"{"AccessKeyId":"x"#),
        ]);

        let err = IMDSv2CredentialProvider::new()
            .provide_credential(&ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ImdsUnavailable);
    }

    #[tokio::test]
    async fn test_unauthorized_role_is_a_configuration_error() {
        let ctx = scripted_context(vec![
            (StatusCode::OK, "log-shipper-role"),
            (
                StatusCode::OK,
                r#"{"Code":"AssumeRoleUnauthorizedAccess","Message":"not authorized"}"#,
            ),
        ]);

        let err = IMDSv2CredentialProvider::new()
            .provide_credential(&ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[tokio::test]
    async fn test_disabled_via_env() {
        let ctx = scripted_context(vec![]).with_env(StaticEnv {
            home_dir: None,
            envs: HashMap::from([(AWS_EC2_METADATA_DISABLED.to_string(), "true".to_string())]),
        });

        let cred = IMDSv2CredentialProvider::new()
            .provide_credential(&ctx)
            .await
            .unwrap();
        assert!(cred.is_none());
    }

    #[tokio::test]
    async fn test_token_less_credentials_are_rejected() {
        let ctx = scripted_context(vec![
            (StatusCode::OK, "log-shipper-role"),
            (
                StatusCode::OK,
                r#"{"Code":"Success","AccessKeyId":"ASIAX","SecretAccessKey":"s3cr3t",
                   "Expiration":"2030-01-01T00:00:00Z"}"#,
            ),
        ]);

        let err = IMDSv2CredentialProvider::new()
            .provide_credential(&ctx)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ImdsUnavailable);
    }
}
