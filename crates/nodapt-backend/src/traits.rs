use async_trait::async_trait;
use std::path::Path;

use crate::error::TransportError;

/// Network access used by the index client and the installer.
///
/// Implementations must treat non-2xx responses as
/// [`TransportError::Status`] and must not retry on their own.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `url` and return its body as text.
    async fn get_text(&self, url: &str) -> Result<String, TransportError>;

    /// Stream `url` into a newly created file at `dest`, returning the number
    /// of bytes written.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, TransportError>;
}

#[async_trait]
impl<T> Transport for std::sync::Arc<T>
where
    T: Transport + ?Sized,
{
    async fn get_text(&self, url: &str) -> Result<String, TransportError> {
        (**self).get_text(url).await
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64, TransportError> {
        (**self).download(url, dest).await
    }
}
