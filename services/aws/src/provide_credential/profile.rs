use crate::constants::*;
use crate::Credential;
use async_trait::async_trait;
use credchain_core::{Context, Error, ProvideCredential, Result};
use ini::Ini;
use log::debug;

/// ProfileCredentialProvider loads AWS credentials from configuration
/// files.
///
/// This provider loads credentials from:
/// - `~/.aws/credentials` (or the path in `AWS_SHARED_CREDENTIALS_FILE`)
/// - `~/.aws/config` (or the path in `AWS_CONFIG_FILE`)
///
/// The profile to use is determined by:
/// 1. the `AWS_PROFILE` environment variable
/// 2. the profile set via `with_profile()`
/// 3. `default`
///
/// Profile credentials are static: they never expire. An absent file or
/// absent profile is a silent decline; an unparsable file is a
/// configuration error.
#[derive(Debug)]
pub struct ProfileCredentialProvider {
    profile: String,
    config_file: Option<String>,
    credentials_file: Option<String>,
}

impl Default for ProfileCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileCredentialProvider {
    /// Create a new ProfileCredentialProvider with default settings.
    pub fn new() -> Self {
        Self {
            profile: "default".to_string(),
            config_file: None,
            credentials_file: None,
        }
    }

    /// Set the profile name to use.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = profile.into();
        self
    }

    /// Set the path to the config file.
    pub fn with_config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Set the path to the credentials file.
    pub fn with_credentials_file(mut self, path: impl Into<String>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    async fn load_ini(&self, ctx: &Context, path: &str, what: &str) -> Result<Option<Ini>> {
        let expanded_path = match ctx.expand_home_dir(path) {
            Some(expanded) => expanded,
            None => {
                debug!("failed to expand homedir for {what} path: {path}");
                return Ok(None);
            }
        };

        let content = match ctx.file_read(&expanded_path).await {
            Ok(content) => content,
            Err(err) => {
                debug!("failed to read {what} file {expanded_path}: {err:?}");
                return Ok(None);
            }
        };

        Ini::load_from_str(&String::from_utf8_lossy(&content))
            .map(Some)
            .map_err(|e| {
                Error::configuration(format!("failed to parse {what} file"))
                    .with_source(anyhow::Error::new(e))
                    .with_context(format!("path: {expanded_path}"))
            })
    }

    fn extract(props: &ini::Properties) -> Option<Credential> {
        let access_key_id = props.get("aws_access_key_id");
        let secret_access_key = props.get("aws_secret_access_key");

        match (access_key_id, secret_access_key) {
            (Some(ak), Some(sk)) if !ak.is_empty() && !sk.is_empty() => Some(Credential {
                access_key_id: ak.to_string(),
                secret_access_key: sk.to_string(),
                session_token: props
                    .get("aws_session_token")
                    .filter(|v| !v.is_empty())
                    .map(|s| s.to_string()),
                expires_in: None,
            }),
            _ => None,
        }
    }

    async fn load_from_credentials_file(
        &self,
        ctx: &Context,
        profile: &str,
    ) -> Result<Option<Credential>> {
        let path = self
            .credentials_file
            .clone()
            .or_else(|| ctx.env_var(AWS_SHARED_CREDENTIALS_FILE))
            .unwrap_or_else(|| "~/.aws/credentials".to_string());

        let Some(conf) = self.load_ini(ctx, &path, "credentials").await? else {
            return Ok(None);
        };

        match conf.section(Some(profile)) {
            Some(props) => Ok(Self::extract(props)),
            None => {
                debug!("profile {profile} not found in credentials file");
                Ok(None)
            }
        }
    }

    async fn load_from_config_file(
        &self,
        ctx: &Context,
        profile: &str,
    ) -> Result<Option<Credential>> {
        let path = self
            .config_file
            .clone()
            .or_else(|| ctx.env_var(AWS_CONFIG_FILE))
            .unwrap_or_else(|| "~/.aws/config".to_string());

        let Some(conf) = self.load_ini(ctx, &path, "config").await? else {
            return Ok(None);
        };

        // The config file prefixes non-default sections with `profile `.
        let section = match profile {
            "default" => "default".to_string(),
            x => format!("profile {x}"),
        };

        match conf.section(Some(&section)) {
            Some(props) => Ok(Self::extract(props)),
            None => {
                debug!("section {section} not found in config file");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl ProvideCredential for ProfileCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let profile = ctx
            .env_var(AWS_PROFILE)
            .unwrap_or_else(|| self.profile.clone());

        // The shared credentials file wins over the config file.
        if let Some(cred) = self.load_from_credentials_file(ctx, &profile).await? {
            return Ok(Some(cred));
        }

        self.load_from_config_file(ctx, &profile).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use credchain_core::{ErrorKind, StaticEnv};
    use credchain_file_read_tokio::TokioFileRead;
    use credchain_http_send_reqwest::ReqwestHttpSend;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    fn context_with_envs(envs: HashMap<String, String>) -> Context {
        let _ = env_logger::builder().is_test(true).try_init();
        Context::new(TokioFileRead, ReqwestHttpSend::default())
            .with_env(StaticEnv { home_dir: None, envs })
    }

    #[tokio::test]
    async fn test_profile_from_credentials_file() -> anyhow::Result<()> {
        let tmp_dir = tempdir()?;
        let file_path = tmp_dir.path().join("credentials");
        let mut tmp_file = File::create(&file_path)?;
        writeln!(tmp_file, "[default]")?;
        writeln!(tmp_file, "aws_access_key_id = DEFAULTACCESSKEYID")?;
        writeln!(tmp_file, "aws_secret_access_key = DEFAULTSECRETACCESSKEY")?;
        writeln!(tmp_file, "aws_session_token = DEFAULTSESSIONTOKEN")?;
        writeln!(tmp_file)?;
        writeln!(tmp_file, "[shipper]")?;
        writeln!(tmp_file, "aws_access_key_id = SHIPPERACCESSKEYID")?;
        writeln!(tmp_file, "aws_secret_access_key = SHIPPERSECRETACCESSKEY")?;

        let ctx = context_with_envs(HashMap::new());

        let provider =
            ProfileCredentialProvider::new().with_credentials_file(file_path.to_str().unwrap());
        let cred = provider
            .provide_credential(&ctx)
            .await?
            .expect("credential must exist");
        assert_eq!(cred.access_key_id, "DEFAULTACCESSKEYID");
        assert_eq!(cred.secret_access_key, "DEFAULTSECRETACCESSKEY");
        assert_eq!(cred.session_token, Some("DEFAULTSESSIONTOKEN".to_string()));
        assert!(cred.expires_in.is_none());

        let provider = ProfileCredentialProvider::new()
            .with_profile("shipper")
            .with_credentials_file(file_path.to_str().unwrap());
        let cred = provider
            .provide_credential(&ctx)
            .await?
            .expect("credential must exist");
        assert_eq!(cred.access_key_id, "SHIPPERACCESSKEYID");
        assert!(cred.session_token.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_profile_from_config_file() -> anyhow::Result<()> {
        let tmp_dir = tempdir()?;
        let file_path = tmp_dir.path().join("config");
        let mut tmp_file = File::create(&file_path)?;
        writeln!(tmp_file, "[default]")?;
        writeln!(tmp_file, "aws_access_key_id = DEFAULTACCESSKEYID")?;
        writeln!(tmp_file, "aws_secret_access_key = DEFAULTSECRETACCESSKEY")?;
        writeln!(tmp_file)?;
        writeln!(tmp_file, "[profile shipper]")?;
        writeln!(tmp_file, "aws_access_key_id = SHIPPERACCESSKEYID")?;
        writeln!(tmp_file, "aws_secret_access_key = SHIPPERSECRETACCESSKEY")?;

        let ctx = context_with_envs(HashMap::new());

        let provider =
            ProfileCredentialProvider::new().with_config_file(file_path.to_str().unwrap());
        let cred = provider
            .provide_credential(&ctx)
            .await?
            .expect("credential must exist");
        assert_eq!(cred.access_key_id, "DEFAULTACCESSKEYID");

        let provider = ProfileCredentialProvider::new()
            .with_profile("shipper")
            .with_config_file(file_path.to_str().unwrap());
        let cred = provider
            .provide_credential(&ctx)
            .await?
            .expect("credential must exist");
        assert_eq!(cred.access_key_id, "SHIPPERACCESSKEYID");

        Ok(())
    }

    #[tokio::test]
    async fn test_aws_profile_env_overrides_configured_profile() -> anyhow::Result<()> {
        let tmp_dir = tempdir()?;
        let file_path = tmp_dir.path().join("credentials");
        let mut tmp_file = File::create(&file_path)?;
        writeln!(tmp_file, "[default]")?;
        writeln!(tmp_file, "aws_access_key_id = DEFAULTACCESSKEYID")?;
        writeln!(tmp_file, "aws_secret_access_key = DEFAULTSECRETACCESSKEY")?;
        writeln!(tmp_file)?;
        writeln!(tmp_file, "[shipper]")?;
        writeln!(tmp_file, "aws_access_key_id = SHIPPERACCESSKEYID")?;
        writeln!(tmp_file, "aws_secret_access_key = SHIPPERSECRETACCESSKEY")?;

        let ctx = context_with_envs(HashMap::from([(
            AWS_PROFILE.to_string(),
            "shipper".to_string(),
        )]));

        let provider = ProfileCredentialProvider::new()
            .with_profile("default")
            .with_credentials_file(file_path.to_str().unwrap());
        let cred = provider
            .provide_credential(&ctx)
            .await?
            .expect("credential must exist");
        assert_eq!(cred.access_key_id, "SHIPPERACCESSKEYID");

        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_or_profile_declines() -> anyhow::Result<()> {
        let ctx = context_with_envs(HashMap::new());

        let provider = ProfileCredentialProvider::new()
            .with_credentials_file("/non/existent/path")
            .with_config_file("/non/existent/path");
        let cred = provider.provide_credential(&ctx).await?;
        assert!(cred.is_none());

        let tmp_dir = tempdir()?;
        let file_path = tmp_dir.path().join("credentials");
        let mut tmp_file = File::create(&file_path)?;
        writeln!(tmp_file, "[other]")?;
        writeln!(tmp_file, "aws_access_key_id = OTHERACCESSKEYID")?;
        writeln!(tmp_file, "aws_secret_access_key = OTHERSECRETACCESSKEY")?;

        let provider = ProfileCredentialProvider::new()
            .with_credentials_file(file_path.to_str().unwrap())
            .with_config_file("/non/existent/path");
        let cred = provider.provide_credential(&ctx).await?;
        assert!(cred.is_none());

        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_file_is_a_configuration_error() -> anyhow::Result<()> {
        let tmp_dir = tempdir()?;
        let file_path = tmp_dir.path().join("credentials");
        let mut tmp_file = File::create(&file_path)?;
        writeln!(tmp_file, "[unclosed section")?;

        let ctx = context_with_envs(HashMap::new());

        let provider =
            ProfileCredentialProvider::new().with_credentials_file(file_path.to_str().unwrap());
        let err = provider.provide_credential(&ctx).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);

        Ok(())
    }
}
