use crate::provide_credential::{
    AssumeRoleWithWebIdentityCredentialProvider, ECSCredentialProvider, EnvCredentialProvider,
    IMDSv2CredentialProvider, ProfileCredentialProvider,
};
use crate::Credential;
use async_trait::async_trait;
use credchain_core::{
    CachedCredentialProvider, Context, ProvideCredential, ProvideCredentialChain, Result,
};

/// DefaultCredentialProvider resolves credentials through the standard
/// chain.
///
/// Resolution order:
///
/// 1. Environment variables
/// 2. Shared credentials file (`~/.aws/credentials`, `~/.aws/config`)
/// 3. Web identity token (OIDC → STS)
/// 4. EC2 IMDSv2
/// 5. Container credentials endpoint (ECS)
///
/// Sources that do not apply to the current environment decline silently;
/// failing sources are traced and skipped. The network-backed sources are
/// wrapped in [`CachedCredentialProvider`], so each keeps its own record
/// until it goes stale and refreshes it single-flight.
#[derive(Debug)]
pub struct DefaultCredentialProvider {
    chain: ProvideCredentialChain<Credential>,
}

impl Default for DefaultCredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DefaultCredentialProvider {
    /// Create a builder to configure the default credential chain.
    pub fn builder() -> DefaultCredentialProviderBuilder {
        DefaultCredentialProviderBuilder::default()
    }

    /// Create a new `DefaultCredentialProvider` using the default chain.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create with a custom credential chain.
    pub fn with_chain(chain: ProvideCredentialChain<Credential>) -> Self {
        Self { chain }
    }

    /// Add a credential provider ahead of the default chain.
    ///
    /// This is how agent-configured credentials (for example a static key
    /// pair from the output plugin configuration) take precedence over all
    /// discovered sources.
    pub fn push_front(
        mut self,
        provider: impl ProvideCredential<Credential = Credential> + 'static,
    ) -> Self {
        self.chain = self.chain.push_front(provider);
        self
    }
}

/// Builder for [`DefaultCredentialProvider`].
#[derive(Default)]
pub struct DefaultCredentialProviderBuilder {
    env: Option<EnvCredentialProvider>,
    env_disabled: bool,
    profile: Option<ProfileCredentialProvider>,
    profile_disabled: bool,
    web_identity: Option<AssumeRoleWithWebIdentityCredentialProvider>,
    web_identity_disabled: bool,
    imds: Option<IMDSv2CredentialProvider>,
    imds_disabled: bool,
    ecs: Option<ECSCredentialProvider>,
    ecs_disabled: bool,
}

impl DefaultCredentialProviderBuilder {
    /// Create a new builder with every source enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adjust the environment provider.
    pub fn configure_env<F>(mut self, f: F) -> Self
    where
        F: FnOnce(EnvCredentialProvider) -> EnvCredentialProvider,
    {
        self.env = Some(f(self.env.take().unwrap_or_default()));
        self
    }

    /// Remove the environment provider from the chain.
    pub fn disable_env(mut self) -> Self {
        self.env_disabled = true;
        self
    }

    /// Adjust the profile provider.
    pub fn configure_profile<F>(mut self, f: F) -> Self
    where
        F: FnOnce(ProfileCredentialProvider) -> ProfileCredentialProvider,
    {
        self.profile = Some(f(self.profile.take().unwrap_or_default()));
        self
    }

    /// Remove the profile provider from the chain.
    pub fn disable_profile(mut self) -> Self {
        self.profile_disabled = true;
        self
    }

    /// Adjust the web identity provider.
    pub fn configure_web_identity<F>(mut self, f: F) -> Self
    where
        F: FnOnce(
            AssumeRoleWithWebIdentityCredentialProvider,
        ) -> AssumeRoleWithWebIdentityCredentialProvider,
    {
        self.web_identity = Some(f(self.web_identity.take().unwrap_or_default()));
        self
    }

    /// Remove the web identity provider from the chain.
    pub fn disable_web_identity(mut self) -> Self {
        self.web_identity_disabled = true;
        self
    }

    /// Adjust the IMDS provider.
    pub fn configure_imds<F>(mut self, f: F) -> Self
    where
        F: FnOnce(IMDSv2CredentialProvider) -> IMDSv2CredentialProvider,
    {
        self.imds = Some(f(self.imds.take().unwrap_or_default()));
        self
    }

    /// Remove the IMDS provider from the chain.
    pub fn disable_imds(mut self) -> Self {
        self.imds_disabled = true;
        self
    }

    /// Adjust the container endpoint provider.
    pub fn configure_ecs<F>(mut self, f: F) -> Self
    where
        F: FnOnce(ECSCredentialProvider) -> ECSCredentialProvider,
    {
        self.ecs = Some(f(self.ecs.take().unwrap_or_default()));
        self
    }

    /// Remove the container endpoint provider from the chain.
    pub fn disable_ecs(mut self) -> Self {
        self.ecs_disabled = true;
        self
    }

    /// Assemble the chain in the fixed evaluation order.
    pub fn build(self) -> DefaultCredentialProvider {
        let mut chain = ProvideCredentialChain::new();

        if !self.env_disabled {
            chain = chain.push(self.env.unwrap_or_default());
        }

        if !self.profile_disabled {
            chain = chain.push(self.profile.unwrap_or_default());
        }

        if !self.web_identity_disabled {
            chain = chain.push(CachedCredentialProvider::new(
                self.web_identity.unwrap_or_default(),
            ));
        }

        if !self.imds_disabled {
            chain = chain.push(CachedCredentialProvider::new(
                self.imds.unwrap_or_default(),
            ));
        }

        if !self.ecs_disabled {
            chain = chain.push(CachedCredentialProvider::new(self.ecs.unwrap_or_default()));
        }

        DefaultCredentialProvider::with_chain(chain)
    }
}

#[async_trait]
impl ProvideCredential for DefaultCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        self.chain.provide_credential(ctx).await
    }

    async fn refresh_credential(&self, ctx: &Context) -> Result<bool> {
        self.chain.refresh_credential(ctx).await
    }
}
