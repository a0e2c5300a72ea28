//! # Domain
//!
//! Plain data shared by every Quill crate: the [`config::Settings`] tree, well-known names in
//! [`constants`] and the feature [`registry`]. No I/O and no logic beyond defaults.

pub mod config;
pub mod constants;
pub mod registry;
