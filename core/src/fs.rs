use crate::Result;
use std::fmt::Debug;

/// FileRead is used to read a file's content entirely into `Vec<u8>`.
///
/// Providers use this to load web identity tokens, shared credential files
/// and similar on-disk material through an injected implementation.
#[async_trait::async_trait]
pub trait FileRead: Debug + Send + Sync + 'static {
    /// Read the file content entirely into `Vec<u8>`.
    async fn file_read(&self, path: &str) -> Result<Vec<u8>>;
}
