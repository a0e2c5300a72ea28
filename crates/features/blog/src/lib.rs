//! Blog feature slice: tags, authors, posts and comments.
//!
//! The schema ships as [`MIGRATIONS`]; hand them to the database builder before calling
//! [`init`]. All reads and writes go through [`BlogRepository`].

mod error;
mod models;
mod repository;
mod slug;
mod validation;

pub use error::{BlogError, BlogErrorExt, FieldError, FieldErrorKind, FieldErrors};
pub use models::{
    Author, Comment, ImageRef, NewAuthor, NewComment, NewPost, NewTag, Post, PostFilter, Tag,
};
pub use repository::BlogRepository;
pub use slug::{MAX_SLUG_LEN, is_valid_slug, slugify};
pub use validation::{Validate, clean, is_valid_email};

use quill_database::{Database, DatabaseErrorExt, Migration};
use quill_domain::constants::BLOG_APP;
use quill_kernel::domain::registry::InitializedSlice;

/// Schema of the blog tables, oldest first.
pub const MIGRATIONS: &[Migration] = &[
    Migration::new(BLOG_APP, "0001", include_str!("../migrations/0001_initial.surql")),
    Migration::new(BLOG_APP, "0002", include_str!("../migrations/0002_reference_guards.surql")),
];

/// Blog feature state
#[quill_derive::quill_slice]
pub struct Blog {
    pub repository: BlogRepository,
}

/// Initialize the blog feature over an already migrated database.
///
/// # Errors
/// [`BlogError::Internal`] if the blog migrations have not been applied.
pub async fn init(database: Database) -> Result<InitializedSlice, BlogError> {
    let applied = database
        .query("SELECT VALUE version FROM migration WHERE slice = $slice")
        .bind(("slice", BLOG_APP))
        .await
        .context("Inspecting blog schema")?
        .take::<Vec<String>>(0)?;

    if let Some(migration) = MIGRATIONS.iter().find(|m| !applied.iter().any(|v| v == m.version)) {
        return Err(BlogError::Internal {
            message: format!("migration {}:{} has not been applied", migration.slice, migration.version)
                .into(),
            context: Some("Initializing blog slice".into()),
        });
    }

    tracing::info!(migrations = applied.len(), "Blog server slice initialized");

    let slice = Blog::new(BlogInner { repository: BlogRepository::new(database) });

    Ok(InitializedSlice::new(slice))
}
