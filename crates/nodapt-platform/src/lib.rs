mod environment;
mod locale;
mod paths;

pub use environment::{Arch, Os, Platform, PlatformError};
pub use locale::{DEFAULT_MIRROR, SIMPLIFIED_CHINESE_MIRROR, default_mirror, is_simplified_chinese};
pub use paths::{AppPaths, AppPathsError};
