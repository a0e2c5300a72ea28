use std::borrow::Cow;

/// Errors raised while connecting to or migrating the database.
#[quill_derive::quill_error]
pub enum DatabaseError {
    /// Builder parameters are missing or malformed.
    #[error("Validation error{}: {message}", format_context(.context))]
    Validation { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Occurs when connectivity or health checks fail.
    #[error("Database connection failed{}: {message}", format_context(.context))]
    Connection { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// Root credentials were rejected.
    #[error("Authentication failed{}: {message}", format_context(.context))]
    Auth { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// A wrapper for underlying `SurrealDB` engine errors.
    #[error("SurrealDB error{}: {source}", format_context(.context))]
    Surreal {
        #[source]
        source: surrealdb::Error,
        context: Option<Cow<'static, str>>,
    },

    /// Migration failures or invariant violations.
    #[error("Migration error{}: {message}", format_context(.context))]
    Migration { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal database error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl DatabaseError {
    /// `true` when a unique index rejected the write.
    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Surreal { source, .. } => is_unique_violation(source),
            _ => false,
        }
    }

    /// `true` when the write lost a race with a concurrent transaction and may be retried.
    #[must_use]
    pub fn is_transaction_conflict(&self) -> bool {
        match self {
            Self::Surreal { source, .. } => is_transaction_conflict(source),
            _ => false,
        }
    }
}

/// `SurrealDB` reports unique index conflicts as "Database index `...` already contains ...".
#[must_use]
pub fn is_unique_violation(err: &surrealdb::Error) -> bool {
    err.to_string().contains("already contains")
}

/// Optimistic commits that collide are reported as a "read or write conflict" which "can be
/// retried".
#[must_use]
pub fn is_transaction_conflict(err: &surrealdb::Error) -> bool {
    let message = err.to_string();
    message.contains("can be retried") || message.contains("conflict")
}
