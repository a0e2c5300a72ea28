//! Request and credential checks driven by [`Settings`](quill_domain::config::Settings).

mod hosts;
mod password;

pub use hosts::AllowedHosts;
pub use password::{PasswordPolicy, PasswordViolation};
