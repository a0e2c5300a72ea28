use quill_database::DatabaseError;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// Why a single field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldErrorKind {
    Required,
    TooLong { max: usize },
    TooShort { min: usize },
    InvalidEmail,
    InvalidSlug,
    NotUnique,
    UnknownReference,
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => f.write_str("This field is required."),
            Self::TooLong { max } => write!(f, "Ensure this value has at most {max} characters."),
            Self::TooShort { min } => write!(f, "Ensure this value has at least {min} characters."),
            Self::InvalidEmail => f.write_str("Enter a valid email address."),
            Self::InvalidSlug => f.write_str(
                "Enter a valid slug consisting of letters, numbers, underscores or hyphens.",
            ),
            Self::NotUnique => f.write_str("A record with this value already exists."),
            Self::UnknownReference => f.write_str("The referenced record does not exist."),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub kind: FieldErrorKind,
}

impl FieldError {
    #[must_use]
    pub const fn new(field: &'static str, kind: FieldErrorKind) -> Self {
        Self { field, kind }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.kind)
    }
}

/// One or more field errors, in the order they were found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, field: &'static str, kind: FieldErrorKind) {
        self.0.push(FieldError::new(field, kind));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Kinds reported for `field`.
    pub fn for_field(&self, field: &str) -> impl Iterator<Item = FieldErrorKind> + '_ {
        let field = field.to_owned();
        self.0.iter().filter(move |e| e.field == field).map(|e| e.kind)
    }

    #[must_use]
    pub fn contains(&self, field: &str, kind: FieldErrorKind) -> bool {
        self.for_field(field).any(|k| k == kind)
    }

    /// `field -> [message, ...]`, the shape the admin API returns.
    #[must_use]
    pub fn messages(&self) -> BTreeMap<&'static str, Vec<String>> {
        let mut map: BTreeMap<&'static str, Vec<String>> = BTreeMap::new();
        for error in &self.0 {
            map.entry(error.field).or_default().push(error.kind.to_string());
        }
        map
    }

    /// `Ok(())` when empty, the collected errors otherwise.
    ///
    /// # Errors
    /// Returns [`BlogError::Validation`] with every collected error.
    pub fn into_result(self) -> Result<(), BlogError> {
        if self.is_empty() { Ok(()) } else { Err(BlogError::Validation { errors: self, context: None }) }
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{error}")?;
        }
        Ok(())
    }
}

impl From<FieldError> for FieldErrors {
    fn from(error: FieldError) -> Self {
        Self(vec![error])
    }
}

impl<'a> IntoIterator for &'a FieldErrors {
    type Item = &'a FieldError;
    type IntoIter = std::slice::Iter<'a, FieldError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[quill_derive::quill_error]
pub enum BlogError {
    /// Field-level constraint violations.
    #[error("Validation failed{}: {errors}", format_context(.context))]
    Validation { errors: FieldErrors, context: Option<Cow<'static, str>> },

    #[error("{entity} '{key}' not found{}", format_context(.context))]
    NotFound { entity: &'static str, key: String, context: Option<Cow<'static, str>> },

    #[error("Blog storage error{}: {source}", format_context(.context))]
    Database {
        #[source]
        source: DatabaseError,
        context: Option<Cow<'static, str>>,
    },

    /// A stored row could not be turned back into a model.
    #[error("Internal blog error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

impl BlogError {
    pub(crate) fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound { entity, key: key.into(), context: None }
    }

    pub(crate) fn field(field: &'static str, kind: FieldErrorKind) -> Self {
        Self::Validation { errors: FieldError::new(field, kind).into(), context: None }
    }

    /// `true` when a write lost a commit race and may be retried.
    pub(crate) fn is_transaction_conflict(&self) -> bool {
        matches!(self, Self::Database { source, .. } if source.is_transaction_conflict())
    }

    /// The field errors of a [`BlogError::Validation`].
    #[must_use]
    pub const fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            Self::Validation { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

impl From<surrealdb::Error> for BlogError {
    fn from(source: surrealdb::Error) -> Self {
        Self::Database { source: source.into(), context: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_group_by_field() {
        let mut errors = FieldErrors::new();
        errors.push("slug", FieldErrorKind::InvalidSlug);
        errors.push("slug", FieldErrorKind::TooLong { max: 50 });
        errors.push("content", FieldErrorKind::TooShort { min: 10 });

        let messages = errors.messages();
        assert_eq!(messages["slug"].len(), 2);
        assert_eq!(messages["content"], ["Ensure this value has at least 10 characters."]);
        assert!(errors.contains("slug", FieldErrorKind::InvalidSlug));
        assert!(!errors.contains("title", FieldErrorKind::Required));
    }

    #[test]
    fn validation_error_lists_fields() {
        let err = BlogError::field("caption", FieldErrorKind::Required);
        assert_eq!(err.to_string(), "Validation failed: caption: This field is required.");
        assert!(err.field_errors().is_some());
    }

    #[test]
    fn empty_errors_are_ok() {
        assert!(FieldErrors::new().into_result().is_ok());
    }
}
