use crate::constants::{
    AWS_REGION, AWS_ROLE_ARN, AWS_ROLE_SESSION_NAME, AWS_WEB_IDENTITY_TOKEN_FILE,
    QUERY_ENCODE_SET,
};
use crate::provide_credential::utils::{parse_sts_error, send_sts_request, sts_endpoint};
use crate::Credential;
use async_trait::async_trait;
use bytes::Bytes;
use credchain_core::time::parse_rfc3339;
use credchain_core::utils::Redact;
use credchain_core::{Context, Error, ProvideCredential, Result};
use percent_encoding::utf8_percent_encode;
use quick_xml::de;
use serde::Deserialize;
use std::fmt::{Debug, Formatter};

/// AssumeRoleWithWebIdentityCredentialProvider exchanges an OIDC token for
/// role credentials.
///
/// The call is unsigned: the web identity token read from disk
/// authenticates the request. The provider is active when a role ARN and a
/// token file are configured, either via builder methods or the
/// `AWS_ROLE_ARN` / `AWS_WEB_IDENTITY_TOKEN_FILE` environment variables;
/// with neither it declines silently.
#[derive(Debug, Default)]
pub struct AssumeRoleWithWebIdentityCredentialProvider {
    role_arn: Option<String>,
    web_identity_token_file: Option<String>,
    role_session_name: Option<String>,
    region: Option<String>,
}

impl AssumeRoleWithWebIdentityCredentialProvider {
    /// Create a new `AssumeRoleWithWebIdentityCredentialProvider`
    /// configured from the environment at resolution time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the role ARN to assume.
    pub fn with_role_arn(mut self, role_arn: impl Into<String>) -> Self {
        self.role_arn = Some(role_arn.into());
        self
    }

    /// Set the path of the web identity token file.
    pub fn with_web_identity_token_file(mut self, path: impl Into<String>) -> Self {
        self.web_identity_token_file = Some(path.into());
        self
    }

    /// Set the role session name.
    pub fn with_role_session_name(mut self, name: impl Into<String>) -> Self {
        self.role_session_name = Some(name.into());
        self
    }

    /// Set the region used to pick the STS endpoint.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }
}

#[async_trait]
impl ProvideCredential for AssumeRoleWithWebIdentityCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let role_arn = self.role_arn.clone().or_else(|| ctx.env_var(AWS_ROLE_ARN));
        let token_file = self
            .web_identity_token_file
            .clone()
            .or_else(|| ctx.env_var(AWS_WEB_IDENTITY_TOKEN_FILE));

        let (Some(role_arn), Some(token_file)) = (role_arn, token_file) else {
            return Ok(None);
        };

        let token = ctx.file_read_as_string(&token_file).await.map_err(|e| {
            Error::configuration("failed to read web identity token file")
                .with_source(e)
                .with_context(format!("path: {token_file}"))
        })?;

        let session_name = self
            .role_session_name
            .clone()
            .or_else(|| ctx.env_var(AWS_ROLE_SESSION_NAME))
            .unwrap_or_else(|| "credchain".to_string());
        let region = self.region.clone().or_else(|| ctx.env_var(AWS_REGION));
        let endpoint = sts_endpoint(region.as_deref());

        let url = format!(
            "https://{endpoint}/?Action=AssumeRoleWithWebIdentity&Version=2011-06-15\
             &RoleArn={}&RoleSessionName={}&WebIdentityToken={}",
            utf8_percent_encode(&role_arn, &QUERY_ENCODE_SET),
            utf8_percent_encode(&session_name, &QUERY_ENCODE_SET),
            utf8_percent_encode(token.trim(), &QUERY_ENCODE_SET),
        );

        let req = http::Request::builder()
            .method(http::Method::GET)
            .uri(url)
            .header(
                http::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(Bytes::new())
            .map_err(|e| Error::unexpected("failed to build STS request").with_source(e))?;

        let resp = send_sts_request(ctx, req, "assume_role_with_web_identity").await?;
        if resp.status() != http::StatusCode::OK {
            let status = resp.status();
            return Err(parse_sts_error(
                "assume_role_with_web_identity",
                status,
                &resp.into_body(),
            ));
        }

        let resp: AssumeRoleWithWebIdentityResponse = de::from_str(&resp.into_body())
            .map_err(|e| Error::unexpected("failed to parse STS response").with_source(e))?;
        let resp_cred = resp.result.credentials;

        if resp_cred.session_token.is_empty() {
            return Err(Error::missing_field("SessionToken"));
        }

        let cred = Credential {
            access_key_id: resp_cred.access_key_id,
            secret_access_key: resp_cred.secret_access_key,
            session_token: Some(resp_cred.session_token),
            expires_in: Some(parse_rfc3339(&resp_cred.expiration)?),
        };

        Ok(Some(cred))
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleWithWebIdentityResponse {
    #[serde(rename = "AssumeRoleWithWebIdentityResult")]
    result: AssumeRoleWithWebIdentityResult,
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleWithWebIdentityResult {
    credentials: AssumeRoleWithWebIdentityCredentials,
}

#[derive(Default, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct AssumeRoleWithWebIdentityCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    expiration: String,
}

impl Debug for AssumeRoleWithWebIdentityCredentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssumeRoleWithWebIdentityCredentials")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .field("expiration", &self.expiration)
            .finish()
    }
}
