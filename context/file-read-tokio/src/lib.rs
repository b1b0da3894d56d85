//! Tokio-based file reading for credchain.
//!
//! This crate provides [`TokioFileRead`], an async file reader implementing
//! the `FileRead` trait from `credchain_core` on top of `tokio::fs`. It is
//! what the agent injects when its pipelines already run on Tokio, so that
//! reading web identity tokens or shared credential files never blocks the
//! event loop.

use async_trait::async_trait;
use credchain_core::{Error, FileRead, Result};

/// Tokio-based implementation of the `FileRead` trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileRead;

#[async_trait]
impl FileRead for TokioFileRead {
    async fn file_read(&self, path: &str) -> Result<Vec<u8>> {
        tokio::fs::read(path).await.map_err(|e| {
            Error::unexpected("failed to read file")
                .with_source(e)
                .with_context(format!("path: {path}"))
        })
    }
}
