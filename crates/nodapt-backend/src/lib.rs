mod constraint;
mod error;
mod traits;
mod types;

pub use constraint::{ConstraintError, VersionConstraint};
pub use error::{NetworkStage, TransportError};
pub use traits::Transport;
pub use types::{InstalledVersion, NodeVersion, RemoteVersion, VersionParseError, strip_tag};
