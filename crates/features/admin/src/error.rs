use quill_blog::BlogError;
use quill_media::MediaError;
use std::borrow::Cow;

#[quill_derive::quill_error]
pub enum AdminError {
    /// The model is not registered with the admin site.
    #[error("Unknown model '{model}'{}", format_context(.context))]
    UnknownModel { model: String, context: Option<Cow<'static, str>> },

    /// The request is malformed: not a JSON object, unknown filter, unusable body.
    #[error("Bad request{}: {message}", format_context(.context))]
    BadRequest { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Blog error{}: {source}", format_context(.context))]
    Blog {
        #[source]
        source: BlogError,
        context: Option<Cow<'static, str>>,
    },

    #[error("Media error{}: {source}", format_context(.context))]
    Media {
        #[source]
        source: MediaError,
        context: Option<Cow<'static, str>>,
    },

    #[error("Internal admin error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl AdminError {
    pub(crate) fn unknown_model(model: impl Into<String>) -> Self {
        Self::UnknownModel { model: model.into(), context: None }
    }

    pub(crate) fn bad_request(message: impl Into<Cow<'static, str>>) -> Self {
        Self::BadRequest { message: message.into(), context: None }
    }
}

impl From<serde_json::Error> for AdminError {
    fn from(error: serde_json::Error) -> Self {
        Self::bad_request(error.to_string())
    }
}

#[cfg(feature = "server")]
mod response {
    use super::AdminError;
    use axum::Json;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use quill_blog::BlogError;
    use quill_derive::api_model;
    use quill_media::MediaError;
    use std::collections::BTreeMap;
    use tracing::{error, warn};

    /// Body of every non-validation error.
    #[api_model]
    pub struct ErrorBody {
        pub error: String,
    }

    /// Body of a `422`: messages grouped by field.
    #[api_model]
    pub struct ValidationErrorBody {
        pub errors: BTreeMap<String, Vec<String>>,
    }

    impl AdminError {
        #[must_use]
        pub const fn status(&self) -> StatusCode {
            match self {
                Self::UnknownModel { .. }
                | Self::Blog { source: BlogError::NotFound { .. }, .. } => StatusCode::NOT_FOUND,
                Self::BadRequest { .. } | Self::Media { source: MediaError::InvalidInput { .. }, .. } => {
                    StatusCode::BAD_REQUEST
                }
                Self::Blog { source: BlogError::Validation { .. }, .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                Self::Media { source: MediaError::NotConfigured { .. }, .. } => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                Self::Media { source: MediaError::Rejected { .. } | MediaError::Transport { .. }, .. } => {
                    StatusCode::BAD_GATEWAY
                }
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl IntoResponse for AdminError {
        fn into_response(self) -> Response {
            let status = self.status();

            if let Self::Blog { source: BlogError::Validation { errors, .. }, .. } = &self {
                let errors = errors
                    .messages()
                    .into_iter()
                    .map(|(field, messages)| (field.to_owned(), messages))
                    .collect();
                return (status, Json(ValidationErrorBody { errors })).into_response();
            }

            let message = if status.is_server_error() {
                error!(error = %self, %status, "Admin request failed");
                match status {
                    StatusCode::INTERNAL_SERVER_ERROR => "Internal server error".to_owned(),
                    _ => self.to_string(),
                }
            } else {
                warn!(error = %self, %status, "Admin request rejected");
                self.to_string()
            };

            (status, Json(ErrorBody { error: message })).into_response()
        }
    }
}

#[cfg(feature = "server")]
pub use response::{ErrorBody, ValidationErrorBody};
