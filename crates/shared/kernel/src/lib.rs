//! Kernel utilities shared by the feature slices.
//!
//! * [`config`]: layered settings loading (file, prefixed env, deployment variables) and the
//!   startup resolution rules.
//! * [`security`]: `Host` header matching and the password validation chain.
//! * `server` (feature `server`): the Axum state shared by all slices, system routes and the
//!   configurable middleware chain.
//!
//! ## Keys
//! Records are keyed with URL-safe, unambiguous `NanoID`s:
//! ```rust
//! # use quill_kernel::safe_nanoid;
//! let key = safe_nanoid!();
//! assert_eq!(key.len(), 12);
//! ```
pub mod config;
pub mod prelude;
pub mod security;
#[cfg(feature = "server")]
pub mod server;

/// Alphabet without visually ambiguous characters (I, O, l, 0, 1).
pub const SAFE_ALPHABET: &[char; 55] = &[
    '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L',
    'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e', 'f',
    'g', 'h', 'j', 'k', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

pub use nanoid::nanoid;
pub use quill_domain as domain;

/// Generates an unambiguous `NanoID` (12 characters unless a size is given).
#[macro_export]
macro_rules! safe_nanoid {
    () => {
        $crate::nanoid!(12, $crate::SAFE_ALPHABET)
    };
    ($size:expr) => {
        $crate::nanoid!($size, $crate::SAFE_ALPHABET)
    };
}
