//! Core components for credential resolution.
//!
//! This crate provides the foundational types and traits for the credchain
//! stack: the abstractions a log-forwarding agent uses to discover, cache
//! and refresh short-lived signing credentials without caring which source
//! supplied them.
//!
//! ## Overview
//!
//! The crate is built around a few key concepts:
//!
//! - **Context**: a container holding the injected implementations for file
//!   reading, HTTP sending and environment access
//! - **ProvideCredential**: the interface of a single credential source;
//!   sources compose into a [`ProvideCredentialChain`]
//! - **CachedCredentialProvider**: expiration-driven caching with
//!   single-flight refresh around any source
//! - **CredentialResolver**: the uniform entry point handed to downstream
//!   signing clients
//!
//! Concrete credential sources live in service crates; this crate only
//! defines the seams between them and the host agent.
//!
//! ## Example
//!
//! ```no_run
//! use credchain_core::{
//!     Context, CredentialResolver, ProvideCredential, Result, SigningCredential,
//! };
//! use async_trait::async_trait;
//!
//! #[derive(Clone, Debug)]
//! struct MyCredential {
//!     key: String,
//!     secret: String,
//! }
//!
//! impl SigningCredential for MyCredential {
//!     fn is_valid(&self) -> bool {
//!         !self.key.is_empty() && !self.secret.is_empty()
//!     }
//! }
//!
//! #[derive(Debug)]
//! struct MySource;
//!
//! #[async_trait]
//! impl ProvideCredential for MySource {
//!     type Credential = MyCredential;
//!
//!     async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
//!         Ok(Some(MyCredential {
//!             key: "my-access-key".to_string(),
//!             secret: "my-secret-key".to_string(),
//!         }))
//!     }
//! }
//!
//! # async fn example(ctx: Context) -> Result<()> {
//! let resolver = CredentialResolver::new(ctx, MySource);
//! let credential = resolver.get_credentials().await?;
//! # Ok(())
//! # }
//! ```

// Make sure all our public APIs have docs.
#![warn(missing_docs)]

/// Error types for credential resolution operations.
pub mod error;
pub mod time;
pub mod utils;

pub use error::{Error, ErrorKind, Result};

mod context;
pub use context::{Context, Env, OsEnv, StaticEnv};

mod fs;
pub use fs::FileRead;

mod http;
pub use self::http::HttpSend;

mod api;
pub use api::{ProvideCredential, ProvideCredentialChain, SignRequest, SigningCredential};

mod cache;
pub use cache::CachedCredentialProvider;

mod resolver;
pub use resolver::CredentialResolver;
