use std::borrow::Cow;

#[quill_derive::quill_error]
pub enum MediaError {
    /// No storage backend is configured for this deployment.
    #[error("Media storage not configured{}", format_context(.context))]
    NotConfigured { context: Option<Cow<'static, str>> },

    /// The upload itself is unusable (empty body, missing file name).
    #[error("Invalid media{}: {message}", format_context(.context))]
    InvalidInput { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The provider answered with an error.
    #[error("Media provider rejected the request{}: {message}", format_context(.context))]
    Rejected { status: u16, message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The provider could not be reached or answered garbage.
    #[error("Media provider request failed{}: {source}", format_context(.context))]
    Transport {
        #[source]
        source: reqwest::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Internal media error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl MediaError {
    /// `true` for failures on the provider's side rather than the caller's.
    #[must_use]
    pub const fn is_upstream(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::Transport { .. })
    }
}
