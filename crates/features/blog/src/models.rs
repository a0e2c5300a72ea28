//! Blog records and the inputs used to create or replace them.
//!
//! Records are identified by a generated `key`. References between records (`Post::author`,
//! `Post::tags`, `Comment::post`) hold the referenced record's key.

use chrono::NaiveDate;
use quill_derive::api_model;
use std::fmt;

/// A label attached to posts.
#[api_model]
#[derive(Clone, PartialEq, Eq)]
pub struct Tag {
    pub key: String,
    pub caption: String,
}

#[api_model]
#[derive(Clone, PartialEq, Eq)]
pub struct NewTag {
    pub caption: String,
}

#[api_model]
#[derive(Clone, PartialEq, Eq)]
pub struct Author {
    pub key: String,
    pub first_name: String,
    pub last_name: String,
    pub email_address: String,
}

#[api_model]
#[derive(Clone, PartialEq, Eq)]
pub struct NewAuthor {
    pub first_name: String,
    pub last_name: String,
    pub email_address: String,
}

/// An image held by the media storage provider.
#[api_model]
#[derive(Clone, PartialEq, Eq)]
pub struct ImageRef {
    /// Provider-side identifier.
    pub name: String,
    /// Delivery URL issued by the provider.
    pub url: String,
}

#[api_model]
#[derive(Clone, PartialEq, Eq)]
pub struct Post {
    pub key: String,
    pub title: String,
    pub excerpt: String,
    pub image: Option<ImageRef>,
    /// Refreshed on every create and update.
    pub date: NaiveDate,
    /// Key of the author, if any.
    pub author: Option<String>,
    /// Keys of the attached tags, sorted.
    pub tags: Vec<String>,
    pub slug: String,
    pub content: String,
}

/// Editable post fields. The image is managed separately and `date` is never supplied.
#[api_model]
#[derive(Clone, PartialEq, Eq)]
pub struct NewPost {
    pub title: String,
    pub excerpt: String,
    pub slug: String,
    pub content: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[api_model]
#[derive(Clone, PartialEq, Eq)]
pub struct Comment {
    pub key: String,
    pub user_name: String,
    pub user_email: String,
    pub comment_text: String,
    /// Key of the commented post.
    pub post: String,
}

#[api_model]
#[derive(Clone, PartialEq, Eq)]
pub struct NewComment {
    pub user_name: String,
    pub user_email: String,
    pub comment_text: String,
    pub post: String,
}

/// Exact-match filters for [`crate::BlogRepository::list_posts`]; `None` matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub title: Option<String>,
    pub author: Option<String>,
    pub tag: Option<String>,
}

impl PostFilter {
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    #[must_use]
    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

impl Post {
    /// Canonical path of the post page.
    #[must_use]
    pub fn absolute_url(&self) -> String {
        format!("/posts/{}", self.slug)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.caption)
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first_name, self.last_name)
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

impl fmt::Display for Comment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.user_name, self.user_email)
    }
}

impl From<&Tag> for NewTag {
    fn from(tag: &Tag) -> Self {
        Self { caption: tag.caption.clone() }
    }
}

impl From<&Author> for NewAuthor {
    fn from(author: &Author) -> Self {
        Self {
            first_name: author.first_name.clone(),
            last_name: author.last_name.clone(),
            email_address: author.email_address.clone(),
        }
    }
}

impl From<&Post> for NewPost {
    fn from(post: &Post) -> Self {
        Self {
            title: post.title.clone(),
            excerpt: post.excerpt.clone(),
            slug: post.slug.clone(),
            content: post.content.clone(),
            author: post.author.clone(),
            tags: post.tags.clone(),
        }
    }
}

impl From<&Comment> for NewComment {
    fn from(comment: &Comment) -> Self {
        Self {
            user_name: comment.user_name.clone(),
            user_email: comment.user_email.clone(),
            comment_text: comment.comment_text.clone(),
            post: comment.post.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> Post {
        Post {
            key: "p1".to_owned(),
            title: "Hello".to_owned(),
            excerpt: "First post".to_owned(),
            image: None,
            date: NaiveDate::from_ymd_opt(2024, 5, 1).expect("date"),
            author: None,
            tags: Vec::new(),
            slug: "hello".to_owned(),
            content: "Hello world!".to_owned(),
        }
    }

    #[test]
    fn display_strings() {
        let author = Author {
            key: "a".to_owned(),
            first_name: "Ada".to_owned(),
            last_name: "Lovelace".to_owned(),
            email_address: "ada@example.com".to_owned(),
        };
        let comment = Comment {
            key: "c".to_owned(),
            user_name: "Bob".to_owned(),
            user_email: "bob@example.com".to_owned(),
            comment_text: "Nice post".to_owned(),
            post: "p1".to_owned(),
        };
        let tag = Tag { key: "t".to_owned(), caption: "rust".to_owned() };

        assert_eq!(author.to_string(), "Ada Lovelace");
        assert_eq!(comment.to_string(), "Bob, bob@example.com");
        assert_eq!(tag.to_string(), "rust");
        assert_eq!(post().to_string(), "Hello");
    }

    #[test]
    fn absolute_url_uses_slug() {
        assert_eq!(post().absolute_url(), "/posts/hello");
    }

    #[test]
    fn new_post_defaults_optional_fields() {
        let input: NewPost = serde_json::from_str(
            r#"{"title":"Hello","excerpt":"x","slug":"hello","content":"Hello world!"}"#,
        )
        .expect("json");
        assert!(input.author.is_none());
        assert!(input.tags.is_empty());
    }

    #[test]
    fn unknown_input_fields_are_rejected() {
        let result = serde_json::from_str::<NewTag>(r#"{"caption":"x","date":"2024-01-01"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn dates_serialize_as_iso() {
        let json = serde_json::to_value(post()).expect("json");
        assert_eq!(json["date"], "2024-05-01");
    }
}
