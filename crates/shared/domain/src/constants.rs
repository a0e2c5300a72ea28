//! Well-known names shared between crates.

/// Installed application names (`installed_apps`).
pub const BLOG_APP: &str = "blog";
pub const ADMIN_APP: &str = "admin";

/// Persisted tables.
pub const TAG: &str = "tag";
pub const AUTHOR: &str = "author";
pub const POST: &str = "post";
pub const COMMENT: &str = "comment";
pub const POST_TAG: &str = "post_tag";

/// Folder that post images are uploaded into.
pub const IMAGE_FOLDER: &str = "images";

/// `OpenAPI` tags.
pub const SYSTEM_TAG: &str = "System";
pub const ADMIN_TAG: &str = "Admin";
