//! AWS credential resolution for the credchain stack.
//!
//! This crate discovers the short-lived credentials a log-forwarding agent
//! needs to sign outbound requests. Credentials can come from environment
//! variables, the shared credentials file, a web identity token, the EC2
//! instance metadata service, the container credentials endpoint, or an STS
//! `AssumeRole` exchange; downstream signing clients never care which.
//!
//! ## Quick start
//!
//! ```no_run
//! use credchain_aws::DefaultCredentialProvider;
//! use credchain_core::{Context, CredentialResolver};
//! use credchain_file_read_tokio::TokioFileRead;
//! use credchain_http_send_reqwest::ReqwestHttpSend;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let ctx = Context::new(TokioFileRead, ReqwestHttpSend::default());
//!
//!     let resolver = CredentialResolver::new(ctx, DefaultCredentialProvider::new());
//!
//!     // Validate at agent init, then resolve on every signing round.
//!     let credential = resolver.get_credentials().await?;
//!     println!("resolved key id: {:?}", credential);
//!     Ok(())
//! }
//! ```
//!
//! ## Credential sources
//!
//! The default chain evaluates, in order:
//!
//! 1. **Environment variables**: `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`
//! 2. **Shared credentials file**: `~/.aws/credentials` and `~/.aws/config`
//! 3. **Web identity**: `AWS_WEB_IDENTITY_TOKEN_FILE` exchanged with STS
//! 4. **EC2 IMDSv2**: the instance's attached IAM role
//! 5. **Container endpoint**: the ECS agent's credentials URI
//!
//! A source that does not apply declines silently and the chain moves on.
//! Network-backed sources cache their records and refresh them
//! single-flight shortly before expiration.
//!
//! ## Custom chains
//!
//! ```no_run
//! use credchain_aws::{EnvCredentialProvider, ProfileCredentialProvider};
//! use credchain_core::ProvideCredentialChain;
//!
//! let chain = ProvideCredentialChain::new()
//!     .push(EnvCredentialProvider::new())
//!     .push(ProfileCredentialProvider::new().with_profile("production"));
//! ```

mod constants;

mod credential;
pub use credential::Credential;

mod envelope;
pub use envelope::{parse_credential_envelope, CredentialEnvelope};

mod imds;

mod provide_credential;
pub use provide_credential::*;
