//! `SurrealDB` access for the blog records.
//!
//! Every public operation validates its input, checks the records it references and then
//! issues a single query. Mutations touching more than one table run in one transaction.
//!
//! Writes that point at another record re-check it inside their transaction by bumping its
//! `revision`, and `THROW` when it is gone. A delete racing with such a write touches the same
//! row, so one of the two fails to commit and is retried against the committed state.

use crate::error::{BlogError, FieldErrorKind, FieldErrors};
use crate::models::{
    Author, Comment, ImageRef, NewAuthor, NewComment, NewPost, NewTag, Post, PostFilter, Tag,
};
use crate::validation::clean;
use chrono::{NaiveDate, Utc};
use quill_database::{Database, DatabaseErrorExt, is_unique_violation};
use quill_domain::constants::{AUTHOR, COMMENT, POST, TAG};
use quill_kernel::safe_nanoid;
use std::future::Future;
use surrealdb::types::SurrealValue;
use tracing::{debug, info, instrument};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Attempts a write gets before a commit conflict is reported.
const WRITE_ATTEMPTS: u32 = 3;

// Messages `THROW`n by the in-transaction reference guards.
const MISSING_POST: &str = "missing post";
const MISSING_AUTHOR: &str = "missing author";
const MISSING_TAGS: &str = "missing tags";
const MISSING_TAG: &str = "missing tag";
const MISSING_COMMENT: &str = "missing comment";

const TAG_FIELDS: &str = "key, caption";
const AUTHOR_FIELDS: &str = "key, first_name, last_name, email_address";
const POST_FIELDS: &str = "key, title, excerpt, image_name, image_url, date, author, slug, content, \
     (SELECT VALUE tag FROM post_tag WHERE post = $parent.key) AS tags";
const COMMENT_FIELDS: &str = "key, user_name, user_email, comment_text, post";

#[derive(Debug, SurrealValue)]
struct TagRow {
    key: String,
    caption: String,
}

#[derive(Debug, SurrealValue)]
struct AuthorRow {
    key: String,
    first_name: String,
    last_name: String,
    email_address: String,
}

#[derive(Debug, SurrealValue)]
struct PostRow {
    key: String,
    title: String,
    excerpt: String,
    image_name: Option<String>,
    image_url: Option<String>,
    date: String,
    author: Option<String>,
    tags: Vec<String>,
    slug: String,
    content: String,
}

#[derive(Debug, SurrealValue)]
struct CommentRow {
    key: String,
    user_name: String,
    user_email: String,
    comment_text: String,
    post: String,
}

impl From<TagRow> for Tag {
    fn from(row: TagRow) -> Self {
        Self { key: row.key, caption: row.caption }
    }
}

impl From<AuthorRow> for Author {
    fn from(row: AuthorRow) -> Self {
        Self {
            key: row.key,
            first_name: row.first_name,
            last_name: row.last_name,
            email_address: row.email_address,
        }
    }
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Self {
            key: row.key,
            user_name: row.user_name,
            user_email: row.user_email,
            comment_text: row.comment_text,
            post: row.post,
        }
    }
}

impl TryFrom<PostRow> for Post {
    type Error = BlogError;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        let date = NaiveDate::parse_from_str(&row.date, DATE_FORMAT).map_err(|e| {
            BlogError::Internal {
                message: format!("post '{}' has a malformed date '{}': {e}", row.key, row.date).into(),
                context: None,
            }
        })?;
        let image = match (row.image_name, row.image_url) {
            (Some(name), Some(url)) => Some(ImageRef { name, url }),
            _ => None,
        };
        let mut tags = row.tags;
        tags.sort_unstable();

        Ok(Self {
            key: row.key,
            title: row.title,
            excerpt: row.excerpt,
            image,
            date,
            author: row.author,
            tags,
            slug: row.slug,
            content: row.content,
        })
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Maps a unique index rejection onto `field`, anything else onto [`BlogError::Database`].
fn unique_or(field: &'static str) -> impl FnOnce(surrealdb::Error) -> BlogError {
    move |err| {
        if is_unique_violation(&err) {
            BlogError::field(field, FieldErrorKind::NotUnique)
        } else {
            err.into()
        }
    }
}

/// `true` when a guard aborted the transaction with `THROW marker`.
fn thrown(err: &surrealdb::Error, marker: &str) -> bool {
    err.to_string().contains(marker)
}

/// Failure of a comment write: the post it points at vanished.
fn missing_post_or(err: surrealdb::Error) -> BlogError {
    if thrown(&err, MISSING_POST) {
        BlogError::field("post", FieldErrorKind::UnknownReference)
    } else {
        err.into()
    }
}

/// Failure of a post write: a vanished author or tag, or a taken slug.
fn post_write_error(err: surrealdb::Error) -> BlogError {
    if thrown(&err, MISSING_AUTHOR) {
        BlogError::field("author", FieldErrorKind::UnknownReference)
    } else if thrown(&err, MISSING_TAGS) {
        BlogError::field("tags", FieldErrorKind::UnknownReference)
    } else {
        unique_or("slug")(err)
    }
}

/// Runs `write` again while it keeps losing commit races, up to [`WRITE_ATTEMPTS`] times.
async fn retrying<T, F, Fut>(write: F) -> Result<T, BlogError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, BlogError>>,
{
    let mut attempt = 1;
    loop {
        match write().await {
            Err(err) if attempt < WRITE_ATTEMPTS && err.is_transaction_conflict() => {
                debug!(attempt, "Transaction conflict, retrying");
                attempt += 1;
            }
            outcome => return outcome,
        }
    }
}

/// Repository over the blog tables; cheap to clone.
#[derive(Debug, Clone)]
pub struct BlogRepository {
    db: Database,
}

impl BlogRepository {
    #[must_use]
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    #[must_use]
    pub const fn database(&self) -> &Database {
        &self.db
    }

    async fn exists(&self, table: &'static str, key: &str) -> Result<bool, BlogError> {
        let sql = format!("SELECT VALUE key FROM {table} WHERE key = $key LIMIT 1");
        let keys = self
            .db
            .query(&sql)
            .bind(("key", key.to_owned()))
            .await
            .context(format!("Looking up {table}"))?
            .take::<Vec<String>>(0)?;
        Ok(!keys.is_empty())
    }

    async fn ensure_exists(&self, table: &'static str, key: &str) -> Result<(), BlogError> {
        if self.exists(table, key).await? { Ok(()) } else { Err(BlogError::not_found(table, key)) }
    }

    // --- tags -------------------------------------------------------------------------------

    /// # Errors
    /// [`BlogError::Validation`] if the caption is blank or longer than 10 characters.
    #[instrument(skip_all)]
    pub async fn create_tag(&self, input: NewTag) -> Result<Tag, BlogError> {
        let input = clean(input)?;
        let key = safe_nanoid!();

        self.db
            .query("CREATE tag SET key = $key, caption = $caption RETURN NONE")
            .bind(("key", key.clone()))
            .bind(("caption", input.caption.clone()))
            .await
            .context("Creating tag")?
            .check()
            .map_err(surrealdb::Error::from)?;

        info!(%key, caption = %input.caption, "Tag created");
        Ok(Tag { key, caption: input.caption })
    }

    /// # Errors
    /// [`BlogError::NotFound`] for an unknown key.
    pub async fn get_tag(&self, key: &str) -> Result<Tag, BlogError> {
        let rows = self
            .db
            .query(format!("SELECT {TAG_FIELDS} FROM tag WHERE key = $key LIMIT 1"))
            .bind(("key", key.to_owned()))
            .await
            .context("Loading tag")?
            .take::<Vec<TagRow>>(0)?;
        rows.into_iter().next().map(Tag::from).ok_or_else(|| BlogError::not_found(TAG, key))
    }

    /// All tags ordered by caption.
    ///
    /// # Errors
    /// [`BlogError::Database`] if the query fails.
    pub async fn list_tags(&self) -> Result<Vec<Tag>, BlogError> {
        let rows = self
            .db
            .query(format!("SELECT {TAG_FIELDS} FROM tag ORDER BY caption, key"))
            .await
            .context("Listing tags")?
            .take::<Vec<TagRow>>(0)?;
        Ok(rows.into_iter().map(Tag::from).collect())
    }

    /// # Errors
    /// [`BlogError::NotFound`] or [`BlogError::Validation`].
    #[instrument(skip(self, input))]
    pub async fn update_tag(&self, key: &str, input: NewTag) -> Result<Tag, BlogError> {
        self.ensure_exists(TAG, key).await?;
        let input = clean(input)?;

        self.db
            .query("UPDATE tag SET caption = $caption WHERE key = $key RETURN NONE")
            .bind(("key", key.to_owned()))
            .bind(("caption", input.caption.clone()))
            .await
            .context("Updating tag")?
            .check()
            .map_err(surrealdb::Error::from)?;

        debug!("Tag updated");
        Ok(Tag { key: key.to_owned(), caption: input.caption })
    }

    /// Removes the tag and its post associations; the posts themselves are kept.
    ///
    /// # Errors
    /// [`BlogError::NotFound`] for an unknown key.
    #[instrument(skip(self))]
    pub async fn delete_tag(&self, key: &str) -> Result<(), BlogError> {
        self.ensure_exists(TAG, key).await?;

        retrying(move || async move {
            self.db
                .query(
                    "BEGIN TRANSACTION;
                    DELETE post_tag WHERE tag = $key;
                    DELETE tag WHERE key = $key;
                    COMMIT TRANSACTION;",
                )
                .bind(("key", key.to_owned()))
                .await
                .context("Deleting tag")?
                .check()
                .map_err(surrealdb::Error::from)?;
            Ok::<(), BlogError>(())
        })
        .await?;

        info!("Tag deleted");
        Ok(())
    }

    // --- authors ----------------------------------------------------------------------------

    /// # Errors
    /// [`BlogError::Validation`] for blank, overlong or malformed fields.
    #[instrument(skip_all)]
    pub async fn create_author(&self, input: NewAuthor) -> Result<Author, BlogError> {
        let input = clean(input)?;
        let key = safe_nanoid!();

        self.db
            .query(
                "CREATE author SET key = $key, first_name = $first_name, last_name = $last_name, \
                 email_address = $email_address RETURN NONE",
            )
            .bind(("key", key.clone()))
            .bind(("first_name", input.first_name.clone()))
            .bind(("last_name", input.last_name.clone()))
            .bind(("email_address", input.email_address.clone()))
            .await
            .context("Creating author")?
            .check()
            .map_err(surrealdb::Error::from)?;

        info!(%key, "Author created");
        Ok(Author {
            key,
            first_name: input.first_name,
            last_name: input.last_name,
            email_address: input.email_address,
        })
    }

    /// # Errors
    /// [`BlogError::NotFound`] for an unknown key.
    pub async fn get_author(&self, key: &str) -> Result<Author, BlogError> {
        let rows = self
            .db
            .query(format!("SELECT {AUTHOR_FIELDS} FROM author WHERE key = $key LIMIT 1"))
            .bind(("key", key.to_owned()))
            .await
            .context("Loading author")?
            .take::<Vec<AuthorRow>>(0)?;
        rows.into_iter().next().map(Author::from).ok_or_else(|| BlogError::not_found(AUTHOR, key))
    }

    /// # Errors
    /// [`BlogError::Database`] if the query fails.
    pub async fn list_authors(&self) -> Result<Vec<Author>, BlogError> {
        let rows = self
            .db
            .query(format!("SELECT {AUTHOR_FIELDS} FROM author ORDER BY last_name, first_name, key"))
            .await
            .context("Listing authors")?
            .take::<Vec<AuthorRow>>(0)?;
        Ok(rows.into_iter().map(Author::from).collect())
    }

    /// # Errors
    /// [`BlogError::NotFound`] or [`BlogError::Validation`].
    #[instrument(skip(self, input))]
    pub async fn update_author(&self, key: &str, input: NewAuthor) -> Result<Author, BlogError> {
        self.ensure_exists(AUTHOR, key).await?;
        let input = clean(input)?;

        self.db
            .query(
                "UPDATE author SET first_name = $first_name, last_name = $last_name, \
                 email_address = $email_address WHERE key = $key RETURN NONE",
            )
            .bind(("key", key.to_owned()))
            .bind(("first_name", input.first_name.clone()))
            .bind(("last_name", input.last_name.clone()))
            .bind(("email_address", input.email_address.clone()))
            .await
            .context("Updating author")?
            .check()
            .map_err(surrealdb::Error::from)?;

        debug!("Author updated");
        Ok(Author {
            key: key.to_owned(),
            first_name: input.first_name,
            last_name: input.last_name,
            email_address: input.email_address,
        })
    }

    /// Clears `author` on every post written by this author, then removes the author.
    ///
    /// # Errors
    /// [`BlogError::NotFound`] for an unknown key.
    #[instrument(skip(self))]
    pub async fn delete_author(&self, key: &str) -> Result<(), BlogError> {
        self.ensure_exists(AUTHOR, key).await?;

        retrying(move || async move {
            self.db
                .query(
                    "BEGIN TRANSACTION;
                    UPDATE post SET author = NONE WHERE author = $key RETURN NONE;
                    DELETE author WHERE key = $key;
                    COMMIT TRANSACTION;",
                )
                .bind(("key", key.to_owned()))
                .await
                .context("Deleting author")?
                .check()
                .map_err(surrealdb::Error::from)?;
            Ok::<(), BlogError>(())
        })
        .await?;

        info!("Author deleted");
        Ok(())
    }

    // --- posts ------------------------------------------------------------------------------

    /// Checks what a post input refers to: the author, every tag and the slug.
    async fn check_post_references(
        &self,
        key: &str,
        input: &NewPost,
    ) -> Result<(), BlogError> {
        let mut errors = FieldErrors::new();

        if let Some(author) = &input.author
            && !self.exists(AUTHOR, author).await?
        {
            errors.push("author", FieldErrorKind::UnknownReference);
        }

        if !input.tags.is_empty() {
            let found = self
                .db
                .query("SELECT VALUE key FROM tag WHERE key IN $tags")
                .bind(("tags", input.tags.clone()))
                .await
                .context("Resolving post tags")?
                .take::<Vec<String>>(0)?;
            if input.tags.iter().any(|tag| !found.contains(tag)) {
                errors.push("tags", FieldErrorKind::UnknownReference);
            }
        }

        let taken = self
            .db
            .query("SELECT VALUE key FROM post WHERE slug = $slug AND key != $key LIMIT 1")
            .bind(("slug", input.slug.clone()))
            .bind(("key", key.to_owned()))
            .await
            .context("Checking slug")?
            .take::<Vec<String>>(0)?;
        if !taken.is_empty() {
            errors.push("slug", FieldErrorKind::NotUnique);
        }

        errors.into_result()
    }

    /// Creates a post dated today.
    ///
    /// # Errors
    /// * [`BlogError::Validation`] for field violations, a taken slug (`NotUnique`) or a
    ///   missing author/tag (`UnknownReference`).
    #[instrument(skip_all, fields(slug = %input.slug))]
    pub async fn create_post(&self, input: NewPost) -> Result<Post, BlogError> {
        let input = clean(input)?;
        let key = safe_nanoid!();
        self.check_post_references(&key, &input).await?;
        let date = today();

        let (new_key, post) = (key.as_str(), &input);
        retrying(move || async move {
            self.db
                .query(
                    "BEGIN TRANSACTION;
                    IF $author AND (UPDATE author SET revision += 1 WHERE key = $author \
                        RETURN VALUE key).is_empty() { THROW 'missing author'; };
                    IF array::len((UPDATE tag SET revision += 1 WHERE key IN $tags RETURN VALUE key)) \
                        != array::len($tags) { THROW 'missing tags'; };
                    CREATE post SET key = $key, title = $title, excerpt = $excerpt, date = $date, \
                        author = $author, slug = $slug, content = $content RETURN NONE;
                    FOR $tag IN $tags { CREATE post_tag SET post = $key, tag = $tag RETURN NONE; };
                    COMMIT TRANSACTION;",
                )
                .bind(("key", new_key.to_owned()))
                .bind(("title", post.title.clone()))
                .bind(("excerpt", post.excerpt.clone()))
                .bind(("date", date.format(DATE_FORMAT).to_string()))
                .bind(("author", post.author.clone()))
                .bind(("slug", post.slug.clone()))
                .bind(("content", post.content.clone()))
                .bind(("tags", post.tags.clone()))
                .await
                .context("Creating post")?
                .check()
                .map_err(surrealdb::Error::from)
                .map_err(post_write_error)?;
            Ok::<(), BlogError>(())
        })
        .await?;

        info!(%key, "Post created");
        Ok(Post {
            key,
            title: input.title,
            excerpt: input.excerpt,
            image: None,
            date,
            author: input.author,
            tags: input.tags,
            slug: input.slug,
            content: input.content,
        })
    }

    /// # Errors
    /// [`BlogError::NotFound`] for an unknown key.
    pub async fn get_post(&self, key: &str) -> Result<Post, BlogError> {
        let rows = self
            .db
            .query(format!("SELECT {POST_FIELDS} FROM post WHERE key = $key LIMIT 1"))
            .bind(("key", key.to_owned()))
            .await
            .context("Loading post")?
            .take::<Vec<PostRow>>(0)?;
        rows.into_iter().next().ok_or_else(|| BlogError::not_found(POST, key))?.try_into()
    }

    /// # Errors
    /// [`BlogError::NotFound`] when no post carries `slug`.
    pub async fn get_post_by_slug(&self, slug: &str) -> Result<Post, BlogError> {
        let rows = self
            .db
            .query(format!("SELECT {POST_FIELDS} FROM post WHERE slug = $slug LIMIT 1"))
            .bind(("slug", slug.to_owned()))
            .await
            .context("Loading post by slug")?
            .take::<Vec<PostRow>>(0)?;
        rows.into_iter().next().ok_or_else(|| BlogError::not_found(POST, slug))?.try_into()
    }

    /// Posts matching every set field of `filter`, newest first.
    ///
    /// # Errors
    /// [`BlogError::Database`] if the query fails.
    pub async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>, BlogError> {
        let mut conditions = Vec::new();
        if filter.title.is_some() {
            conditions.push("title = $title");
        }
        if filter.author.is_some() {
            conditions.push("author = $author");
        }
        if filter.tag.is_some() {
            conditions.push("key IN (SELECT VALUE post FROM post_tag WHERE tag = $tag)");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };
        let sql = format!("SELECT {POST_FIELDS} FROM post{where_clause} ORDER BY date DESC, title, key");

        let mut query = self.db.query(&sql);
        if let Some(title) = &filter.title {
            query = query.bind(("title", title.clone()));
        }
        if let Some(author) = &filter.author {
            query = query.bind(("author", author.clone()));
        }
        if let Some(tag) = &filter.tag {
            query = query.bind(("tag", tag.clone()));
        }

        let rows = query.await.context("Listing posts")?.take::<Vec<PostRow>>(0)?;
        rows.into_iter().map(Post::try_from).collect()
    }

    /// Replaces the editable fields and the tag set, and refreshes `date`. The image is kept.
    ///
    /// # Errors
    /// [`BlogError::NotFound`], or [`BlogError::Validation`] as for
    /// [`create_post`](Self::create_post).
    #[instrument(skip(self, input))]
    pub async fn update_post(&self, key: &str, input: NewPost) -> Result<Post, BlogError> {
        self.ensure_exists(POST, key).await?;
        let input = clean(input)?;
        self.check_post_references(key, &input).await?;
        let stamp = today().format(DATE_FORMAT).to_string();

        let (date, post) = (stamp.as_str(), &input);
        retrying(move || async move {
            self.db
                .query(
                    "BEGIN TRANSACTION;
                    IF (UPDATE post SET title = $title, excerpt = $excerpt, date = $date, \
                        author = $author, slug = $slug, content = $content, revision += 1 \
                        WHERE key = $key RETURN VALUE key).is_empty() { THROW 'missing post'; };
                    IF $author AND (UPDATE author SET revision += 1 WHERE key = $author \
                        RETURN VALUE key).is_empty() { THROW 'missing author'; };
                    IF array::len((UPDATE tag SET revision += 1 WHERE key IN $tags RETURN VALUE key)) \
                        != array::len($tags) { THROW 'missing tags'; };
                    DELETE post_tag WHERE post = $key;
                    FOR $tag IN $tags { CREATE post_tag SET post = $key, tag = $tag RETURN NONE; };
                    COMMIT TRANSACTION;",
                )
                .bind(("key", key.to_owned()))
                .bind(("title", post.title.clone()))
                .bind(("excerpt", post.excerpt.clone()))
                .bind(("date", date.to_owned()))
                .bind(("author", post.author.clone()))
                .bind(("slug", post.slug.clone()))
                .bind(("content", post.content.clone()))
                .bind(("tags", post.tags.clone()))
                .await
                .context("Updating post")?
                .check()
                .map_err(surrealdb::Error::from)
                .map_err(|err| {
                    if thrown(&err, MISSING_POST) {
                        BlogError::not_found(POST, key)
                    } else {
                        post_write_error(err)
                    }
                })?;
            Ok::<(), BlogError>(())
        })
        .await?;

        debug!("Post updated");
        self.get_post(key).await
    }

    /// Removes the post together with its comments and tag associations.
    ///
    /// # Errors
    /// [`BlogError::NotFound`] for an unknown key.
    #[instrument(skip(self))]
    pub async fn delete_post(&self, key: &str) -> Result<(), BlogError> {
        self.ensure_exists(POST, key).await?;

        retrying(move || async move {
            self.db
                .query(
                    "BEGIN TRANSACTION;
                    DELETE comment WHERE post = $key;
                    DELETE post_tag WHERE post = $key;
                    DELETE post WHERE key = $key;
                    COMMIT TRANSACTION;",
                )
                .bind(("key", key.to_owned()))
                .await
                .context("Deleting post")?
                .check()
                .map_err(surrealdb::Error::from)?;
            Ok::<(), BlogError>(())
        })
        .await?;

        info!("Post deleted");
        Ok(())
    }

    /// Associates `tag` with `post`; associating an already attached tag is a no-op.
    ///
    /// # Errors
    /// [`BlogError::NotFound`] if either record is missing.
    #[instrument(skip(self))]
    pub async fn add_tag(&self, post: &str, tag: &str) -> Result<(), BlogError> {
        self.ensure_exists(POST, post).await?;
        self.ensure_exists(TAG, tag).await?;

        retrying(move || async move {
            let result = self
                .db
                .query(
                    "BEGIN TRANSACTION;
                    IF (UPDATE post SET revision += 1 WHERE key = $post RETURN VALUE key).is_empty() {
                        THROW 'missing post';
                    };
                    IF (UPDATE tag SET revision += 1 WHERE key = $tag RETURN VALUE key).is_empty() {
                        THROW 'missing tag';
                    };
                    IF (SELECT VALUE post FROM post_tag WHERE post = $post AND tag = $tag).is_empty() {
                        CREATE post_tag SET post = $post, tag = $tag RETURN NONE;
                    };
                    COMMIT TRANSACTION;",
                )
                .bind(("post", post.to_owned()))
                .bind(("tag", tag.to_owned()))
                .await
                .context("Tagging post")?
                .check()
                .map_err(surrealdb::Error::from);

            match result {
                Ok(_) => Ok::<(), BlogError>(()),
                // a concurrent add of the same pair
                Err(err) if is_unique_violation(&err) => Ok(()),
                Err(err) if thrown(&err, MISSING_POST) => Err(BlogError::not_found(POST, post)),
                Err(err) if thrown(&err, MISSING_TAG) => Err(BlogError::not_found(TAG, tag)),
                Err(err) => Err(err.into()),
            }
        })
        .await
    }

    /// Detaches `tag` from `post`; detaching a tag that is not attached is a no-op.
    ///
    /// # Errors
    /// [`BlogError::NotFound`] if the post is missing.
    #[instrument(skip(self))]
    pub async fn remove_tag(&self, post: &str, tag: &str) -> Result<(), BlogError> {
        self.ensure_exists(POST, post).await?;

        self.db
            .query("DELETE post_tag WHERE post = $post AND tag = $tag")
            .bind(("post", post.to_owned()))
            .bind(("tag", tag.to_owned()))
            .await
            .context("Untagging post")?
            .check()
            .map_err(surrealdb::Error::from)?;
        Ok(())
    }

    /// Tags attached to `post`, ordered by caption.
    ///
    /// # Errors
    /// [`BlogError::NotFound`] if the post is missing.
    pub async fn post_tags(&self, post: &str) -> Result<Vec<Tag>, BlogError> {
        self.ensure_exists(POST, post).await?;

        let rows = self
            .db
            .query(format!(
                "SELECT {TAG_FIELDS} FROM tag \
                 WHERE key IN (SELECT VALUE tag FROM post_tag WHERE post = $post) \
                 ORDER BY caption, key"
            ))
            .bind(("post", post.to_owned()))
            .await
            .context("Loading post tags")?
            .take::<Vec<TagRow>>(0)?;
        Ok(rows.into_iter().map(Tag::from).collect())
    }

    /// Attaches (or with `None` clears) the post image. Other fields, `date` included, are
    /// left untouched.
    ///
    /// # Errors
    /// [`BlogError::NotFound`] if the post is missing.
    #[instrument(skip(self, image))]
    pub async fn set_post_image(
        &self,
        post: &str,
        image: Option<ImageRef>,
    ) -> Result<Post, BlogError> {
        self.ensure_exists(POST, post).await?;
        let (name, url) = image.map(|i| (i.name, i.url)).unzip();

        self.db
            .query("UPDATE post SET image_name = $name, image_url = $url WHERE key = $key RETURN NONE")
            .bind(("key", post.to_owned()))
            .bind(("name", name))
            .bind(("url", url))
            .await
            .context("Setting post image")?
            .check()
            .map_err(surrealdb::Error::from)?;

        self.get_post(post).await
    }

    // --- comments ---------------------------------------------------------------------------

    /// # Errors
    /// [`BlogError::Validation`] for field violations or an unknown post (`UnknownReference`).
    #[instrument(skip_all, fields(post = %input.post))]
    pub async fn create_comment(&self, input: NewComment) -> Result<Comment, BlogError> {
        let input = clean(input)?;
        if !self.exists(POST, &input.post).await? {
            return Err(BlogError::field("post", FieldErrorKind::UnknownReference));
        }
        let key = safe_nanoid!();

        let (new_key, comment) = (key.as_str(), &input);
        retrying(move || async move {
            self.db
                .query(
                    "BEGIN TRANSACTION;
                    IF (UPDATE post SET revision += 1 WHERE key = $post RETURN VALUE key).is_empty() {
                        THROW 'missing post';
                    };
                    CREATE comment SET key = $key, user_name = $user_name, user_email = $user_email, \
                        comment_text = $comment_text, post = $post RETURN NONE;
                    COMMIT TRANSACTION;",
                )
                .bind(("key", new_key.to_owned()))
                .bind(("user_name", comment.user_name.clone()))
                .bind(("user_email", comment.user_email.clone()))
                .bind(("comment_text", comment.comment_text.clone()))
                .bind(("post", comment.post.clone()))
                .await
                .context("Creating comment")?
                .check()
                .map_err(surrealdb::Error::from)
                .map_err(missing_post_or)?;
            Ok::<(), BlogError>(())
        })
        .await?;

        info!(%key, "Comment created");
        Ok(Comment {
            key,
            user_name: input.user_name,
            user_email: input.user_email,
            comment_text: input.comment_text,
            post: input.post,
        })
    }

    /// # Errors
    /// [`BlogError::NotFound`] for an unknown key.
    pub async fn get_comment(&self, key: &str) -> Result<Comment, BlogError> {
        let rows = self
            .db
            .query(format!("SELECT {COMMENT_FIELDS} FROM comment WHERE key = $key LIMIT 1"))
            .bind(("key", key.to_owned()))
            .await
            .context("Loading comment")?
            .take::<Vec<CommentRow>>(0)?;
        rows.into_iter().next().map(Comment::from).ok_or_else(|| BlogError::not_found(COMMENT, key))
    }

    /// # Errors
    /// [`BlogError::Database`] if the query fails.
    pub async fn list_comments(&self) -> Result<Vec<Comment>, BlogError> {
        let rows = self
            .db
            .query(format!("SELECT {COMMENT_FIELDS} FROM comment ORDER BY post, user_name, key"))
            .await
            .context("Listing comments")?
            .take::<Vec<CommentRow>>(0)?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    /// # Errors
    /// [`BlogError::NotFound`] if the post is missing.
    pub async fn comments_for_post(&self, post: &str) -> Result<Vec<Comment>, BlogError> {
        self.ensure_exists(POST, post).await?;

        let rows = self
            .db
            .query(format!(
                "SELECT {COMMENT_FIELDS} FROM comment WHERE post = $post ORDER BY user_name, key"
            ))
            .bind(("post", post.to_owned()))
            .await
            .context("Loading post comments")?
            .take::<Vec<CommentRow>>(0)?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    /// # Errors
    /// [`BlogError::NotFound`], or [`BlogError::Validation`] as for
    /// [`create_comment`](Self::create_comment).
    #[instrument(skip(self, input))]
    pub async fn update_comment(&self, key: &str, input: NewComment) -> Result<Comment, BlogError> {
        self.ensure_exists(COMMENT, key).await?;
        let input = clean(input)?;
        if !self.exists(POST, &input.post).await? {
            return Err(BlogError::field("post", FieldErrorKind::UnknownReference));
        }

        let comment = &input;
        retrying(move || async move {
            self.db
                .query(
                    "BEGIN TRANSACTION;
                    IF (UPDATE post SET revision += 1 WHERE key = $post RETURN VALUE key).is_empty() {
                        THROW 'missing post';
                    };
                    IF (UPDATE comment SET user_name = $user_name, user_email = $user_email, \
                        comment_text = $comment_text, post = $post WHERE key = $key \
                        RETURN VALUE key).is_empty() { THROW 'missing comment'; };
                    COMMIT TRANSACTION;",
                )
                .bind(("key", key.to_owned()))
                .bind(("user_name", comment.user_name.clone()))
                .bind(("user_email", comment.user_email.clone()))
                .bind(("comment_text", comment.comment_text.clone()))
                .bind(("post", comment.post.clone()))
                .await
                .context("Updating comment")?
                .check()
                .map_err(surrealdb::Error::from)
                .map_err(|err| {
                    if thrown(&err, MISSING_COMMENT) {
                        BlogError::not_found(COMMENT, key)
                    } else {
                        missing_post_or(err)
                    }
                })?;
            Ok::<(), BlogError>(())
        })
        .await?;

        debug!("Comment updated");
        Ok(Comment {
            key: key.to_owned(),
            user_name: input.user_name,
            user_email: input.user_email,
            comment_text: input.comment_text,
            post: input.post,
        })
    }

    /// # Errors
    /// [`BlogError::NotFound`] for an unknown key.
    #[instrument(skip(self))]
    pub async fn delete_comment(&self, key: &str) -> Result<(), BlogError> {
        self.ensure_exists(COMMENT, key).await?;

        self.db
            .query("DELETE comment WHERE key = $key")
            .bind(("key", key.to_owned()))
            .await
            .context("Deleting comment")?
            .check()
            .map_err(surrealdb::Error::from)?;

        info!("Comment deleted");
        Ok(())
    }
}
