use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use log::debug;
use tokio::io::AsyncWriteExt;

use nodapt_backend::{Transport, TransportError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport with the default client settings.
    ///
    /// Only the connection phase is bounded; downloads may take as long as
    /// the mirror needs.
    ///
    /// # Errors
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(format!("nodapt/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|error| TransportError::request_from(url, error))?;

        if !response.status().is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_text(&self, url: &str) -> Result<String, TransportError> {
        debug!("GET {url}");
        self.send(url)
            .await?
            .text()
            .await
            .map_err(|error| TransportError::body_from(url, error))
    }

    async fn download(&self, url: &str, dest: &Path) -> Result<u64, TransportError> {
        debug!("Downloading {url} to {}", dest.display());
        let response = self.send(url).await?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|error| TransportError::write(dest, error))?;

        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|error| TransportError::body_from(url, error))?;
            file.write_all(&chunk)
                .await
                .map_err(|error| TransportError::write(dest, error))?;
            downloaded += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|error| TransportError::write(dest, error))?;

        debug!("Download complete: {downloaded} bytes");
        Ok(downloaded)
    }
}
