pub use crate::config::{ConfigError, SettingsLoader, load_settings};
pub use crate::safe_nanoid;
pub use crate::security::{AllowedHosts, PasswordPolicy};
#[cfg(feature = "server")]
pub use crate::server::{ApiState, ApiStateError};
pub use quill_domain::config::Settings;
