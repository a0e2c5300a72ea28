//! Settings loading.
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults;
//! 2. an optional settings file (`quill.toml` unless another path is given);
//! 3. `QUILL__SECTION__KEY` environment variables (e.g. `QUILL__DATABASE__NAMESPACE`);
//! 4. the deployment variables listed in [`env`] (`SECRET_KEY`, `DEBUG`, `DATABASE_URL`, ...).
//!
//! The loaded tree is then [`resolve`]d: derived defaults are filled in and missing secrets
//! abort startup outside debug mode.

pub mod env;

use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use quill_domain::config::{Secret, Settings};
use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const DEFAULT_SETTINGS_FILE: &str = "quill";
const ENV_PREFIX: &str = "QUILL";
const LOCAL_HOST: &str = "localhost";
/// Fallback secret for debug mode only.
pub const DEV_SECRET_KEY: &str = "quill-insecure-development-key";
/// Fallback database for debug mode only.
pub const DEV_DATABASE_URL: &str = "mem://";

#[quill_derive::quill_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },

    /// A setting that must be present in production is absent.
    #[error("Missing required setting{}: {message}", format_context(.context))]
    Missing { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A value is present but unusable.
    #[error("Invalid setting{}: {message}", format_context(.context))]
    Invalid { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

/// Builder for [`Settings`]. Reads the process environment unless [`SettingsLoader::env`]
/// supplies an explicit one.
#[must_use = "loaders do nothing unless you call .load()"]
#[derive(Debug, Default)]
pub struct SettingsLoader {
    file: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
}

impl SettingsLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings file path; the extension may be omitted (`quill` finds `quill.toml`).
    pub fn file(mut self, path: impl AsRef<Path>) -> Self {
        self.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Uses `vars` instead of the process environment.
    pub fn env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Loads and resolves the settings.
    ///
    /// # Errors
    /// * [`ConfigError::Config`] if the file is malformed or a value has the wrong type.
    /// * [`ConfigError::Invalid`] for unparsable deployment variables.
    /// * [`ConfigError::Missing`] when a production deployment lacks a mandatory setting.
    pub fn load(self) -> Result<Settings, ConfigError> {
        let vars = self.env.unwrap_or_else(|| std::env::vars().collect());
        let path = self.file.unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));

        info!(file = %path.display(), "Loading settings");

        let builder = Config::builder()
            .add_source(File::from(path.as_path()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("allowed_hosts")
                    .with_list_parse_key("installed_apps")
                    .with_list_parse_key("middleware")
                    .source(Some(vars.clone())),
            );

        let settings = apply_deployment_env(builder, &vars)?
            .build()
            .context("Building settings")?
            .try_deserialize::<Settings>()
            .context("Deserializing settings")?;

        resolve(settings)
    }
}

/// Loads settings from `path` (or `quill.toml`) and the process environment.
///
/// # Errors
/// See [`SettingsLoader::load`].
pub fn load_settings(path: Option<impl AsRef<Path>>) -> Result<Settings, ConfigError> {
    let loader = SettingsLoader::new();
    match path {
        Some(path) => loader.file(path).load(),
        None => loader.load(),
    }
}

fn apply_deployment_env(
    builder: ConfigBuilder<DefaultState>,
    vars: &HashMap<String, String>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let deployment = env::DeploymentEnv::from_vars(vars)?;

    let mut builder = builder
        .set_override_option("secret_key", deployment.secret_key)?
        .set_override_option("debug", deployment.debug)?
        .set_override_option("external_hostname", deployment.external_hostname)?
        .set_override_option("database.url", deployment.database_url)?
        .set_override_option("server.port", deployment.port.map(i64::from))?;

    if let Some(cloudinary) = deployment.cloudinary {
        builder = builder
            .set_override("media.cloudinary.cloud_name", cloudinary.cloud_name)?
            .set_override("media.cloudinary.api_key", cloudinary.api_key)?
            .set_override("media.cloudinary.api_secret", cloudinary.api_secret)?;
    }

    Ok(builder)
}

/// Applies the startup rules to freshly loaded settings.
///
/// * `allowed_hosts` empty: the external hostname when known, `localhost` otherwise.
/// * Missing secret key or database URL: fatal unless `debug`, where development
///   fallbacks are used with a warning.
///
/// # Errors
/// Returns [`ConfigError::Missing`] naming the deployment variable to set.
pub fn resolve(mut settings: Settings) -> Result<Settings, ConfigError> {
    if settings.allowed_hosts.is_empty() {
        let host = settings
            .external_hostname
            .clone()
            .filter(|h| !h.trim().is_empty())
            .unwrap_or_else(|| LOCAL_HOST.to_owned());
        settings.allowed_hosts = vec![host];
    }

    if settings.secret_key.is_empty() {
        if !settings.debug {
            return Err(ConfigError::Missing {
                message: "SECRET_KEY must be set when DEBUG is off".into(),
                context: None,
            });
        }
        warn!("SECRET_KEY is not set; using an insecure development key");
        settings.secret_key = Secret::new(DEV_SECRET_KEY);
    }

    if settings.database.url.trim().is_empty() {
        if !settings.debug {
            return Err(ConfigError::Missing {
                message: "DATABASE_URL must be set when DEBUG is off".into(),
                context: None,
            });
        }
        warn!(url = DEV_DATABASE_URL, "DATABASE_URL is not set; using an in-memory database");
        settings.database.url = DEV_DATABASE_URL.to_owned();
    }

    if settings.media.cloudinary.is_none() {
        warn!("Cloudinary credentials are not set; image uploads are unavailable in production");
    }

    Ok(settings)
}
