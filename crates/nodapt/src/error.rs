use thiserror::Error;

use nodapt_backend::ConstraintError;
use nodapt_platform::{AppPathsError, PlatformError};

/// Everything that can make nodapt itself fail. A launched command exiting
/// non-zero is not an error; its code is forwarded as-is.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] nodapt_core::Error),
    #[error(transparent)]
    Constraint(#[from] ConstraintError),
    #[error(transparent)]
    Paths(#[from] AppPathsError),
    #[error(transparent)]
    Platform(#[from] PlatformError),
    #[error("failed to initialise the HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("failed to start the async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("failed to determine the working directory: {0}")]
    WorkingDir(#[source] std::io::Error),
    #[error("failed to write output: {0}")]
    Output(#[source] std::io::Error),
}

impl AppError {
    pub const EXIT_CODE: i32 = 1;

    /// Render the error with its `source` chain, one cause per line.
    #[must_use]
    pub fn detailed(&self) -> String {
        let mut rendered = format!("{self}");
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            rendered.push_str(&format!("\n  caused by: {cause}"));
            source = cause.source();
        }
        rendered
    }
}

macro_rules! impl_from_core {
    ($($error:ty),* $(,)?) => {
        $(
            impl From<$error> for AppError {
                fn from(error: $error) -> Self {
                    Self::Core(error.into())
                }
            }
        )*
    };
}

impl_from_core!(
    nodapt_core::StoreError,
    nodapt_core::IndexError,
    nodapt_core::AcquireError,
    nodapt_core::ResolveError,
    nodapt_core::LaunchError,
    nodapt_core::manifest::ManifestError,
);

#[cfg(test)]
mod tests {
    use nodapt_backend::NodeVersion;

    use super::*;

    #[test]
    fn store_errors_are_wrapped_as_core() {
        let error: AppError = nodapt_core::StoreError::NotInstalled {
            version: NodeVersion::new(14, 21, 3),
        }
        .into();

        assert!(matches!(
            error,
            AppError::Core(nodapt_core::Error::Store(_))
        ));
        assert_eq!(error.to_string(), "v14.21.3 is not installed");
    }

    #[test]
    fn detailed_includes_causes() {
        let error = AppError::WorkingDir(std::io::Error::other("gone"));
        let rendered = error.detailed();

        assert!(rendered.starts_with("failed to determine the working directory: gone"));
        assert!(rendered.contains("caused by: gone"));
    }
}
