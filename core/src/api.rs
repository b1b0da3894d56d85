use crate::{Context, Result};
use std::fmt::Debug;
use std::time::Duration;

/// SigningCredential is implemented by credential types that know whether
/// they are still usable for signing.
pub trait SigningCredential: Clone + Debug + Send + Sync + Unpin + 'static {
    /// Check if the credential is structurally complete and not about to
    /// expire.
    fn is_valid(&self) -> bool;
}

/// ProvideCredential is the interface of a single credential source.
///
/// A source that is not applicable in the current environment (for example,
/// the container endpoint when the agent is not running in a container)
/// returns `Ok(None)`; the chain treats that as a silent decline.
#[async_trait::async_trait]
pub trait ProvideCredential: Debug + Send + Sync + Unpin + 'static {
    /// Credential returned by this provider.
    type Credential: Send + Sync + Unpin + 'static;

    /// Load a credential from this source, serving a cached record when one
    /// is fresh.
    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>>;

    /// Re-acquire material from the source, bypassing any cache.
    ///
    /// Returns `Ok(true)` when the source produced a credential. A
    /// successful refresh does not imply the credential is usable; callers
    /// follow up with [`provide_credential`](Self::provide_credential).
    async fn refresh_credential(&self, ctx: &Context) -> Result<bool> {
        Ok(self.provide_credential(ctx).await?.is_some())
    }
}

/// SignRequest is the seam through which the assume-role provider signs its
/// STS call. Signing itself lives in the host agent; the core only carries
/// the request and the base credential across this trait.
#[async_trait::async_trait]
pub trait SignRequest: Debug + Send + Sync + Unpin + 'static {
    /// Credential used by this signer.
    type Credential: Send + Sync + Unpin + 'static;

    /// Sign the request in place.
    ///
    /// `expires_in` is the validity requested for presigned output; signers
    /// that do not support expiration should return an error when it is
    /// set.
    async fn sign_request(
        &self,
        ctx: &Context,
        req: &mut http::request::Parts,
        credential: Option<&Self::Credential>,
        expires_in: Option<Duration>,
    ) -> Result<()>;
}

/// A chain of credential providers that will be tried in order.
///
/// The chain returns the credential of the first provider that yields one.
/// Providers that decline (`Ok(None)`) are skipped silently; providers that
/// fail are traced at debug level and the chain continues, so a transient
/// failure in one source never masks a working source later in the chain.
pub struct ProvideCredentialChain<C> {
    providers: Vec<Box<dyn ProvideCredential<Credential = C>>>,
}

impl<C> ProvideCredentialChain<C>
where
    C: Send + Sync + Unpin + 'static,
{
    /// Create a new empty credential provider chain.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Add a credential provider to the end of the chain.
    pub fn push(mut self, provider: impl ProvideCredential<Credential = C> + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Add a credential provider to the front of the chain.
    pub fn push_front(
        mut self,
        provider: impl ProvideCredential<Credential = C> + 'static,
    ) -> Self {
        self.providers.insert(0, Box::new(provider));
        self
    }

    /// Create a credential provider chain from a vector of providers.
    pub fn from_vec(providers: Vec<Box<dyn ProvideCredential<Credential = C>>>) -> Self {
        Self { providers }
    }

    /// Get the number of providers in the chain.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Check if the chain is empty.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl<C> Default for ProvideCredentialChain<C>
where
    C: Send + Sync + Unpin + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Debug for ProvideCredentialChain<C>
where
    C: Send + Sync + Unpin + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvideCredentialChain")
            .field("providers_count", &self.providers.len())
            .finish()
    }
}

#[async_trait::async_trait]
impl<C> ProvideCredential for ProvideCredentialChain<C>
where
    C: Send + Sync + Unpin + 'static,
{
    type Credential = C;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        for provider in &self.providers {
            log::debug!("trying credential provider: {provider:?}");

            match provider.provide_credential(ctx).await {
                Ok(Some(cred)) => {
                    log::debug!("loaded credential from provider: {provider:?}");
                    return Ok(Some(cred));
                }
                Ok(None) => {
                    continue;
                }
                Err(e) => {
                    log::debug!("provider {provider:?} failed, trying next: {e:?}");
                    continue;
                }
            }
        }

        Ok(None)
    }

    async fn refresh_credential(&self, ctx: &Context) -> Result<bool> {
        for provider in &self.providers {
            match provider.refresh_credential(ctx).await {
                Ok(true) => {
                    log::debug!("provider {provider:?} refreshed");
                    return Ok(true);
                }
                Ok(false) => continue,
                Err(e) => {
                    log::debug!("refresh failed on provider {provider:?}: {e:?}");
                    continue;
                }
            }
        }

        Ok(false)
    }
}
