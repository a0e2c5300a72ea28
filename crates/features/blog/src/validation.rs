//! Field-level constraints, checked before anything reaches the database.

use crate::error::{BlogError, FieldErrorKind, FieldErrors};
use crate::models::{NewAuthor, NewComment, NewPost, NewTag};
use crate::slug::{MAX_SLUG_LEN, is_valid_slug};

pub(crate) const TAG_CAPTION_MAX: usize = 10;
pub(crate) const NAME_MAX: usize = 50;
pub(crate) const EMAIL_MAX: usize = 254;
pub(crate) const TITLE_MAX: usize = 50;
pub(crate) const EXCERPT_MAX: usize = 100;
pub(crate) const CONTENT_MIN: usize = 10;
pub(crate) const COMMENT_TEXT_MAX: usize = 300;

/// Inputs that can check their own fields.
pub trait Validate {
    /// Trims surrounding whitespace, as a submitted form would be cleaned.
    fn normalize(&mut self);

    /// Collects every violated constraint; references and uniqueness are checked by the
    /// repository.
    fn validate(&self) -> FieldErrors;
}

/// Normalizes `input` and returns it if every field passes.
///
/// # Errors
/// [`BlogError::Validation`] with all failing fields.
pub fn clean<T: Validate>(mut input: T) -> Result<T, BlogError> {
    input.normalize();
    input.validate().into_result()?;
    Ok(input)
}

fn trim(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_owned();
    }
}

impl Validate for NewTag {
    fn normalize(&mut self) {
        trim(&mut self.caption);
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        text(&mut errors, "caption", &self.caption, TAG_CAPTION_MAX);
        errors
    }
}

impl Validate for NewAuthor {
    fn normalize(&mut self) {
        trim(&mut self.first_name);
        trim(&mut self.last_name);
        trim(&mut self.email_address);
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        text(&mut errors, "first_name", &self.first_name, NAME_MAX);
        text(&mut errors, "last_name", &self.last_name, NAME_MAX);
        email(&mut errors, "email_address", &self.email_address);
        errors
    }
}

impl Validate for NewPost {
    /// Also drops a blank author and de-duplicates tags.
    fn normalize(&mut self) {
        trim(&mut self.title);
        trim(&mut self.excerpt);
        trim(&mut self.slug);
        trim(&mut self.content);
        if let Some(author) = &mut self.author {
            trim(author);
        }
        if self.author.as_deref().is_some_and(str::is_empty) {
            self.author = None;
        }
        self.tags.iter_mut().for_each(trim);
        self.tags.sort_unstable();
        self.tags.dedup();
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        text(&mut errors, "title", &self.title, TITLE_MAX);
        text(&mut errors, "excerpt", &self.excerpt, EXCERPT_MAX);
        if text(&mut errors, "slug", &self.slug, MAX_SLUG_LEN) && !is_valid_slug(&self.slug) {
            errors.push("slug", FieldErrorKind::InvalidSlug);
        }
        if required(&mut errors, "content", &self.content) && len(&self.content) < CONTENT_MIN {
            errors.push("content", FieldErrorKind::TooShort { min: CONTENT_MIN });
        }
        if self.author.as_deref().is_some_and(|a| a.trim().is_empty()) {
            errors.push("author", FieldErrorKind::UnknownReference);
        }
        if self.tags.iter().any(|t| t.trim().is_empty()) {
            errors.push("tags", FieldErrorKind::UnknownReference);
        }
        errors
    }
}

impl Validate for NewComment {
    fn normalize(&mut self) {
        trim(&mut self.user_name);
        trim(&mut self.user_email);
        trim(&mut self.comment_text);
        trim(&mut self.post);
    }

    fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        text(&mut errors, "user_name", &self.user_name, NAME_MAX);
        email(&mut errors, "user_email", &self.user_email);
        text(&mut errors, "comment_text", &self.comment_text, COMMENT_TEXT_MAX);
        required(&mut errors, "post", &self.post);
        errors
    }
}

fn len(value: &str) -> usize {
    value.chars().count()
}

/// Pushes `Required` for a blank value; returns whether the value is present.
fn required(errors: &mut FieldErrors, field: &'static str, value: &str) -> bool {
    if value.trim().is_empty() {
        errors.push(field, FieldErrorKind::Required);
        return false;
    }
    true
}

/// Required, at most `max` characters. Returns whether the value passed.
fn text(errors: &mut FieldErrors, field: &'static str, value: &str, max: usize) -> bool {
    if !required(errors, field, value) {
        return false;
    }
    if len(value) > max {
        errors.push(field, FieldErrorKind::TooLong { max });
        return false;
    }
    true
}

fn email(errors: &mut FieldErrors, field: &'static str, value: &str) {
    if text(errors, field, value, EMAIL_MAX) && !is_valid_email(value) {
        errors.push(field, FieldErrorKind::InvalidEmail);
    }
}

/// Domains accepted without a dot.
const DOMAIN_ALLOWLIST: &[&str] = &["localhost"];

/// A pragmatic address check: `local@domain.tld` or `local@localhost`, no whitespace,
/// non-empty labels.
#[must_use]
pub fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains('@') || value.chars().any(char::is_whitespace) {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }

    if DOMAIN_ALLOWLIST.iter().any(|allowed| domain.eq_ignore_ascii_case(allowed)) {
        return true;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|label| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_alphanumeric() || c == '-')
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn post(slug: &str, content: &str) -> NewPost {
        NewPost {
            title: "Hello".to_owned(),
            excerpt: "First".to_owned(),
            slug: slug.to_owned(),
            content: content.to_owned(),
            author: None,
            tags: Vec::new(),
        }
    }

    #[test]
    fn short_content_is_rejected() {
        let errors = post("hello", "too short").validate();
        assert!(errors.contains("content", FieldErrorKind::TooShort { min: CONTENT_MIN }));
    }

    #[test]
    fn slug_must_be_url_safe() {
        assert!(post("hello world", "Hello world!").validate().contains("slug", FieldErrorKind::InvalidSlug));
        assert!(post("héllo", "Hello world!").validate().contains("slug", FieldErrorKind::InvalidSlug));
        assert!(post("hello-world", "Hello world!").validate().is_empty());
        assert!(post("Hello-World", "Hello world!").validate().is_empty());
    }

    #[test]
    fn blank_fields_are_required() {
        let errors = NewAuthor {
            first_name: " ".to_owned(),
            last_name: String::new(),
            email_address: String::new(),
        }
        .validate();
        assert!(errors.contains("first_name", FieldErrorKind::Required));
        assert!(errors.contains("last_name", FieldErrorKind::Required));
        assert!(errors.contains("email_address", FieldErrorKind::Required));
    }

    #[test]
    fn tag_caption_is_limited_to_ten_chars() {
        let ok = NewTag { caption: "ten chars!".to_owned() };
        let too_long = NewTag { caption: "eleven chars".to_owned() };
        assert!(ok.validate().is_empty());
        assert!(too_long.validate().contains("caption", FieldErrorKind::TooLong { max: TAG_CAPTION_MAX }));
    }

    #[test]
    fn comment_text_is_limited_to_three_hundred_chars() {
        let comment = NewComment {
            user_name: "Bob".to_owned(),
            user_email: "bob@example.com".to_owned(),
            comment_text: "x".repeat(301),
            post: "p".to_owned(),
        };
        assert!(comment.validate().contains("comment_text", FieldErrorKind::TooLong { max: 300 }));
    }

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("ada@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.co.uk"));
        assert!(!is_valid_email("ada"));
        assert!(is_valid_email("ada@localhost"));
        assert!(is_valid_email("ada@LocalHost"));
        assert!(!is_valid_email("ada@intranet"));
        assert!(!is_valid_email("@localhost"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("ada@@example.com"));
        assert!(!is_valid_email("ada @example.com"));
        assert!(!is_valid_email("ada@-example.com"));
    }

    #[test]
    fn clean_trims_and_dedups() {
        let mut input = post(" hello ", "  Hello world!  ");
        input.author = Some("  ".to_owned());
        input.tags = vec!["b".to_owned(), " a".to_owned(), "b ".to_owned()];

        let cleaned = clean(input).expect("valid");
        assert_eq!(cleaned.slug, "hello");
        assert_eq!(cleaned.content, "Hello world!");
        assert_eq!(cleaned.author, None);
        assert_eq!(cleaned.tags, ["a", "b"]);
    }

    #[test]
    fn padding_does_not_count_towards_minimum_length() {
        let err = clean(post("hello", "   short    ")).unwrap_err();
        let errors = err.field_errors().expect("validation");
        assert!(errors.contains("content", FieldErrorKind::TooShort { min: CONTENT_MIN }));
    }

    proptest! {
        #[test]
        fn titles_within_limit_pass(title in "[a-zA-Z0-9 ]{1,50}") {
            prop_assume!(!title.trim().is_empty());
            let mut input = post("slug", "long enough content");
            input.title = title;
            prop_assert!(input.validate().is_empty());
        }

        #[test]
        fn titles_over_limit_fail(title in "[a-z]{51,80}") {
            let mut input = post("slug", "long enough content");
            input.title = title;
            prop_assert!(input.validate().contains("title", FieldErrorKind::TooLong { max: TITLE_MAX }));
        }
    }
}
