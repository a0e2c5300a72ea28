//! Facade crate for the Quill blog.
//! Re-exports domain/kernel primitives and composes the installed applications.
//! Keep this crate thin: it should compose other crates, not implement business logic.
//!
//! ## Usage
//! - Add `quill` with the `server` feature to get the HTTP routers.
//! - Open the database with [`migrations`], pick the [`media_backend`], then call [`init`] to
//!   obtain one slice per entry of `installed_apps`.

use anyhow::{Context, bail, ensure};
use quill_database::{Database, Migration};
use quill_domain::config::Settings;
use quill_domain::constants::{ADMIN_APP, BLOG_APP};
use quill_domain::registry::InitializedSlice;
use quill_media::{Cloudinary, Media};
use tracing::{info, warn};

pub use quill_database as database;
pub use quill_domain as domain;
pub use quill_kernel as kernel;
pub use quill_media as media;

#[cfg(feature = "server")]
pub mod server {
    pub mod router {
        pub use quill_admin::router as admin_router;
        pub use quill_kernel::server::system_router;
    }
}

/// Application registry.
pub mod features {
    use quill_domain::constants::{ADMIN_APP, BLOG_APP};

    pub use quill_admin as admin;
    pub use quill_blog as blog;

    /// Names accepted in `installed_apps`.
    pub const AVAILABLE: &[&str] = &[BLOG_APP, ADMIN_APP];

    #[must_use]
    pub fn is_available(name: &str) -> bool {
        AVAILABLE.contains(&name)
    }
}

fn installed(settings: &Settings, app: &str) -> bool {
    settings.installed_apps.iter().any(|name| name.trim() == app)
}

/// Schema migrations required by the installed apps.
#[must_use]
pub fn migrations(settings: &Settings) -> Vec<Migration> {
    if installed(settings, BLOG_APP) { features::blog::MIGRATIONS.to_vec() } else { Vec::new() }
}

/// Cloudinary when credentials are configured; otherwise an in-memory store in debug mode and
/// no storage at all in production.
///
/// # Errors
/// Returns an error if the Cloudinary HTTP client cannot be created.
pub fn media_backend(settings: &Settings) -> anyhow::Result<Media> {
    let folder = settings.media.folder.clone();

    if let Some(credentials) = &settings.media.cloudinary {
        let client = Cloudinary::new(
            &credentials.cloud_name,
            &credentials.api_key,
            credentials.api_secret.expose(),
        )
        .context("Failed to create Cloudinary client")?
        .folder(folder);
        info!(cloud = client.cloud_name(), "Media storage: Cloudinary");
        return Ok(Media::cloudinary(client));
    }

    if settings.debug {
        warn!("Cloudinary is not configured; uploaded images are kept in memory");
        Ok(Media::memory(folder))
    } else {
        warn!("Cloudinary is not configured; image uploads are disabled");
        Ok(Media::disabled())
    }
}

/// Initialize every installed app, in dependency order.
///
/// # Errors
/// Returns an error for an unknown app name, an app whose dependency is not installed, or a
/// failing app initialization.
pub async fn init(settings: &Settings, database: &Database) -> anyhow::Result<Vec<InitializedSlice>> {
    if let Some(unknown) = settings.installed_apps.iter().find(|app| !features::is_available(app.trim())) {
        bail!("Unknown installed app '{unknown}'; expected one of {}", features::AVAILABLE.join(", "));
    }

    let mut slices = Vec::new();

    // Blog
    if installed(settings, BLOG_APP) {
        slices.push(features::blog::init(database.clone()).await.context("Blog bootstrap failed")?);
    }

    // Admin
    if installed(settings, ADMIN_APP) {
        ensure!(installed(settings, BLOG_APP), "The '{ADMIN_APP}' app requires '{BLOG_APP}'");
        let repository = features::blog::BlogRepository::new(database.clone());
        slices.push(
            features::admin::init(features::admin::AdminSite::blog(), repository)
                .context("Admin bootstrap failed")?,
        );
    }

    Ok(slices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_domain::config::{CloudinaryCredentials, Secret};

    async fn database(settings: &Settings) -> Database {
        Database::builder()
            .url("mem://")
            .session("quill", "facade_tests")
            .migrations(migrations(settings))
            .init()
            .await
            .expect("in-memory database")
    }

    #[tokio::test]
    async fn default_apps_yield_blog_and_admin_slices() {
        let settings = Settings::default();
        let slices = init(&settings, &database(&settings).await).await.expect("slices");

        let names: Vec<_> = slices.iter().map(InitializedSlice::name).collect();
        assert_eq!(names, ["Blog", "Admin"]);
    }

    #[tokio::test]
    async fn unknown_app_is_rejected() {
        let mut settings = Settings::default();
        settings.installed_apps.push("polls".to_owned());

        let err = init(&settings, &database(&settings).await).await.unwrap_err();
        assert!(err.to_string().contains("polls"));
    }

    #[tokio::test]
    async fn admin_requires_blog() {
        let mut settings = Settings::default();
        settings.installed_apps = vec![ADMIN_APP.to_owned()];
        assert!(migrations(&settings).is_empty());

        let err = init(&settings, &database(&settings).await).await.unwrap_err();
        assert!(err.to_string().contains(BLOG_APP));
    }

    #[test]
    fn media_backend_follows_configuration() {
        let mut settings = Settings::default();
        assert_eq!(media_backend(&settings).expect("media").kind(), "disabled");

        settings.debug = true;
        assert_eq!(media_backend(&settings).expect("media").kind(), "memory");

        settings.media.cloudinary = Some(CloudinaryCredentials {
            cloud_name: "demo".to_owned(),
            api_key: "key".to_owned(),
            api_secret: Secret::new("secret"),
        });
        assert_eq!(media_backend(&settings).expect("media").kind(), "cloudinary");
    }
}
