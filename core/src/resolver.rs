use crate::{Context, Error, ProvideCredential, Result, SigningCredential};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// CredentialResolver is the uniform interface handed to downstream signing
/// clients.
///
/// It owns the context and a provider (typically the default chain) and is
/// agnostic to which source supplied the material. Cloning is cheap; all
/// clones share the same provider and its caches.
#[derive(Clone)]
pub struct CredentialResolver<C: SigningCredential> {
    ctx: Context,
    provider: Arc<dyn ProvideCredential<Credential = C>>,
}

impl<C: SigningCredential> CredentialResolver<C> {
    /// Create a new resolver over the given provider.
    pub fn new(ctx: Context, provider: impl ProvideCredential<Credential = C>) -> Self {
        Self {
            ctx,
            provider: Arc::new(provider),
        }
    }

    /// Resolve a credential.
    ///
    /// Fails with [`ErrorKind::NoCredentialsAvailable`] when every source
    /// declines; that error is retryable, so callers should treat their
    /// overall operation as retryable rather than fatal.
    ///
    /// [`ErrorKind::NoCredentialsAvailable`]: crate::ErrorKind::NoCredentialsAvailable
    pub async fn get_credentials(&self) -> Result<C> {
        self.provider
            .provide_credential(&self.ctx)
            .await?
            .ok_or_else(|| {
                Error::no_credentials_available("no credential source produced a credential")
            })
    }

    /// Force the provider to re-acquire material from its source.
    ///
    /// A successful refresh does not imply the credential is usable;
    /// callers follow up with [`get_credentials`](Self::get_credentials).
    pub async fn refresh(&self) -> Result<()> {
        if self.provider.refresh_credential(&self.ctx).await? {
            Ok(())
        } else {
            Err(Error::no_credentials_available(
                "no credential source reported a successful refresh",
            ))
        }
    }

    /// The context this resolver operates in.
    pub fn context(&self) -> &Context {
        &self.ctx
    }
}

impl<C: SigningCredential> Debug for CredentialResolver<C> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("provider", &self.provider)
            .finish()
    }
}
