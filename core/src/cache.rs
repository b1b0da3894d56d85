use crate::{Context, ProvideCredential, Result, SigningCredential};
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex};

/// Caches the credential produced by an inner provider until it goes stale.
///
/// The cache is consulted without I/O; a stale or empty cache funnels all
/// callers through a single refresh lock, so at most one fetch against the
/// inner provider is in flight at any instant. Callers that arrive while a
/// refresh is running wait on the lock and find the cache fresh on re-check
/// instead of issuing their own fetch.
///
/// Every network-backed provider in the default chain is wrapped in this
/// type; static sources (environment, profile) are cheap enough to re-read.
pub struct CachedCredentialProvider<P: ProvideCredential> {
    inner: P,
    cache: Arc<Mutex<Option<P::Credential>>>,
    refresh_lock: Arc<tokio::sync::Mutex<()>>,
}

impl<P: ProvideCredential> CachedCredentialProvider<P> {
    /// Wrap the given provider with an expiration-driven cache.
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cache: Arc::new(Mutex::new(None)),
            refresh_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Access the wrapped provider.
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P: ProvideCredential> Debug for CachedCredentialProvider<P> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedCredentialProvider")
            .field("inner", &self.inner)
            .finish()
    }
}

impl<P> CachedCredentialProvider<P>
where
    P: ProvideCredential,
    P::Credential: SigningCredential,
{
    fn cached(&self) -> Option<P::Credential> {
        let cached = self.cache.lock().expect("lock poisoned").clone();
        cached.filter(|c| c.is_valid())
    }

    fn install(&self, cred: &P::Credential) {
        *self.cache.lock().expect("lock poisoned") = Some(cred.clone());
    }
}

#[async_trait::async_trait]
impl<P> ProvideCredential for CachedCredentialProvider<P>
where
    P: ProvideCredential,
    P::Credential: SigningCredential,
{
    type Credential = P::Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        if let Some(cred) = self.cached() {
            return Ok(Some(cred));
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited on the lock.
        if let Some(cred) = self.cached() {
            return Ok(Some(cred));
        }

        let fetched = self.inner.provide_credential(ctx).await?;
        if let Some(cred) = &fetched {
            self.install(cred);
        }

        Ok(fetched)
    }

    async fn refresh_credential(&self, ctx: &Context) -> Result<bool> {
        let _guard = self.refresh_lock.lock().await;

        let fetched = self.inner.provide_credential(ctx).await?;
        if let Some(cred) = &fetched {
            self.install(cred);
        }

        Ok(fetched.is_some())
    }
}
