//! Administrative JSON API over the blog records.
//!
//! An [`AdminSite`] registers the managed models together with their list columns, list
//! filters and prepopulated fields. With the `server` feature, [`router`] exposes create,
//! read, update and delete routes for each registered model plus post image upload.

mod error;
#[cfg(feature = "server")]
mod http;
mod records;
mod site;

pub use error::{AdminError, AdminErrorExt};
#[cfg(feature = "server")]
pub use error::{ErrorBody, ValidationErrorBody};
#[cfg(feature = "server")]
pub use http::{ModelInfo, SiteResponse, router};
pub use records::{ListResponse, Listing, to_record};
pub use site::{AdminSite, DISPLAY_COLUMN, Model, ModelAdmin};

use quill_blog::BlogRepository;
use quill_kernel::domain::registry::InitializedSlice;

/// Admin feature state
#[quill_derive::quill_slice]
pub struct Admin {
    pub site: AdminSite,
    pub blog: BlogRepository,
}

/// Initialize the admin feature.
///
/// # Errors
/// [`AdminError::Internal`] if `site` has no registered models.
pub fn init(site: AdminSite, blog: BlogRepository) -> Result<InitializedSlice, AdminError> {
    if site.is_empty() {
        return Err(AdminError::Internal {
            message: "admin site has no registered models".into(),
            context: Some("Initializing admin slice".into()),
        });
    }

    tracing::info!(models = site.models().count(), "Admin server slice initialized");

    Ok(InitializedSlice::new(Admin::new(AdminInner { site, blog })))
}
