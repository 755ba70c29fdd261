use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request to {url} failed ({stage}): {details}")]
    Network {
        url: String,
        stage: NetworkStage,
        details: String,
    },

    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStage {
    #[error("request")]
    Request,
    #[error("response body")]
    ResponseBody,
}

impl TransportError {
    pub fn request(url: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            stage: NetworkStage::Request,
            details: details.into(),
        }
    }

    pub fn request_from<E>(url: impl Into<String>, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::request(url, error.to_string())
    }

    pub fn body(url: impl Into<String>, details: impl Into<String>) -> Self {
        Self::Network {
            url: url.into(),
            stage: NetworkStage::ResponseBody,
            details: details.into(),
        }
    }

    pub fn body_from<E>(url: impl Into<String>, error: E) -> Self
    where
        E: std::fmt::Display,
    {
        Self::body(url, error.to_string())
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Whether the server answered 404, i.e. the resource does not exist on
    /// the mirror.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}
