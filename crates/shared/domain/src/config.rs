use crate::constants::{ADMIN_APP, BLOG_APP, IMAGE_FOLDER};
use serde::Deserialize;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Process-wide settings, built once at startup and shared read-only afterwards.
#[derive(Default, Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(flatten, default)]
    inner: Arc<SettingsInner>,
}

impl Deref for Settings {
    type Target = SettingsInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for Settings {
    fn deref_mut(&mut self) -> &mut SettingsInner {
        Arc::make_mut(&mut self.inner)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SettingsInner {
    /// Signing secret. Mandatory outside debug mode.
    pub secret_key: Secret,
    pub debug: bool,
    /// Public hostname assigned by the hosting platform, if any.
    pub external_hostname: Option<String>,
    /// Accepted `Host` header values. Derived from `external_hostname` when empty.
    pub allowed_hosts: Vec<String>,
    /// Applications to initialize, in order.
    pub installed_apps: Vec<String>,
    /// HTTP middleware, outermost first.
    pub middleware: Vec<String>,
    pub templates: TemplatesConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub password_validators: Vec<PasswordValidatorConfig>,
    pub locale: LocaleConfig,
    pub media: MediaConfig,
    pub logging: LoggingConfig,
}

/// A string that never shows up in `Debug` output.
#[derive(Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() { f.write_str("Secret(<empty>)") } else { f.write_str("Secret(***)") }
    }
}

/// HTTP listener.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
    pub ssl: Option<SslConfig>,
}

/// TLS certificate/key paths.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SslConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// `SurrealDB` connection. An empty `url` means "not configured".
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub credentials: Option<DatabaseCredentials>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseCredentials {
    pub username: String,
    pub password: Secret,
}

/// Template search paths for the page-rendering layer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    pub dirs: Vec<PathBuf>,
    /// Also search each installed application's own `templates/` directory.
    pub app_dirs: bool,
}

/// One entry of the password validation chain.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum PasswordValidatorConfig {
    UserAttributeSimilarity,
    MinimumLength {
        #[serde(default = "default_min_password_length")]
        min_length: usize,
    },
    CommonPassword,
    Numeric,
}

const fn default_min_password_length() -> usize {
    8
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocaleConfig {
    pub language_code: String,
    pub time_zone: String,
    pub use_i18n: bool,
    pub use_tz: bool,
}

/// External media storage.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub cloudinary: Option<CloudinaryCredentials>,
    /// Folder uploads land in.
    pub folder: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CloudinaryCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: Secret,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Rolling log file directory; console only when absent.
    pub directory: Option<PathBuf>,
    pub json: bool,
    /// Extra `EnvFilter` directives.
    pub directives: Option<String>,
}

// --- Default ---

impl Default for SettingsInner {
    fn default() -> Self {
        Self {
            secret_key: Secret::default(),
            debug: false,
            external_hostname: None,
            allowed_hosts: Vec::new(),
            installed_apps: vec![BLOG_APP.to_owned(), ADMIN_APP.to_owned()],
            middleware: vec!["security".to_owned(), "allowed_hosts".to_owned(), "trace".to_owned()],
            templates: TemplatesConfig::default(),
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            password_validators: vec![
                PasswordValidatorConfig::UserAttributeSimilarity,
                PasswordValidatorConfig::MinimumLength { min_length: default_min_password_length() },
                PasswordValidatorConfig::CommonPassword,
                PasswordValidatorConfig::Numeric,
            ],
            locale: LocaleConfig::default(),
            media: MediaConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 8000, ssl: None }
    }
}

impl Default for SslConfig {
    fn default() -> Self {
        Self { cert: PathBuf::from("cert.pem"), key: PathBuf::from("key.pem") }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            namespace: "quill".to_owned(),
            database: "blog".to_owned(),
            credentials: None,
        }
    }
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self { dirs: vec![PathBuf::from("templates")], app_dirs: true }
    }
}

impl Default for LocaleConfig {
    fn default() -> Self {
        Self {
            language_code: "en-us".to_owned(),
            time_zone: "UTC".to_owned(),
            use_i18n: true,
            use_tz: true,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self { cloudinary: None, folder: IMAGE_FOLDER.to_owned() }
    }
}
