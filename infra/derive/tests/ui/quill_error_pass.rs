use quill_derive::quill_error;
use std::borrow::Cow;

#[quill_error]
pub enum UploadError {
    #[error("I/O error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Rejected{}: {message}", format_context(.context))]
    Rejected { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn read_upload() -> Result<Vec<u8>, UploadError> {
    std::fs::read("/nonexistent/upload.bin").context("Reading upload")
}

fn main() {
    let err = read_upload().unwrap_err();
    assert!(err.to_string().contains("(Reading upload)"));

    let err: UploadError = "boom".into();
    assert!(matches!(err, UploadError::Internal { .. }));

    let err = Err::<(), _>(UploadError::Rejected { message: "too large".into(), context: None })
        .context("Validating upload")
        .unwrap_err();
    assert_eq!(err.to_string(), "Rejected (Validating upload): too large");
}
