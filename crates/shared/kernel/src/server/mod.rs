//! Axum plumbing shared by every installed app.

mod health;
pub mod middleware;
mod router;
mod state;

pub use middleware::{Middleware, apply_middleware, middleware_chain};
pub use router::system_router;
pub use state::{ApiState, ApiStateBuilder, ApiStateError, ApiStateErrorExt, ApiStateInner};
