//! Model registrations: which records the admin exposes and how each one is listed and edited.

use quill_blog::slugify;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;
use strum_macros::{AsRefStr, Display, EnumString, VariantNames};

/// Pseudo-column holding a record's display string.
pub const DISPLAY_COLUMN: &str = "display";

/// Record types the admin knows how to manage.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    AsRefStr,
    Display,
    EnumString,
    VariantNames,
)]
#[strum(serialize_all = "snake_case")]
pub enum Model {
    Tag,
    Author,
    Post,
    Comment,
}

/// Per-model list and form options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelAdmin {
    list_display: Vec<&'static str>,
    list_filter: Vec<&'static str>,
    prepopulated_fields: BTreeMap<&'static str, Vec<&'static str>>,
}

impl Default for ModelAdmin {
    fn default() -> Self {
        Self {
            list_display: vec![DISPLAY_COLUMN],
            list_filter: Vec::new(),
            prepopulated_fields: BTreeMap::new(),
        }
    }
}

impl ModelAdmin {
    /// Columns of the list view, in order.
    #[must_use]
    pub fn list_display(mut self, columns: impl IntoIterator<Item = &'static str>) -> Self {
        self.list_display = columns.into_iter().collect();
        self
    }

    /// Fields accepted as exact-match list filters.
    #[must_use]
    pub fn list_filter(mut self, fields: impl IntoIterator<Item = &'static str>) -> Self {
        self.list_filter = fields.into_iter().collect();
        self
    }

    /// Derives `field` from `sources` (slugified) whenever a submission leaves it empty.
    #[must_use]
    pub fn prepopulate(
        mut self,
        field: &'static str,
        sources: impl IntoIterator<Item = &'static str>,
    ) -> Self {
        self.prepopulated_fields.insert(field, sources.into_iter().collect());
        self
    }

    #[must_use]
    pub fn columns(&self) -> &[&'static str] {
        &self.list_display
    }

    #[must_use]
    pub fn filters(&self) -> &[&'static str] {
        &self.list_filter
    }

    #[must_use]
    pub const fn prepopulated_fields(&self) -> &BTreeMap<&'static str, Vec<&'static str>> {
        &self.prepopulated_fields
    }

    #[must_use]
    pub fn is_filterable(&self, field: &str) -> bool {
        self.list_filter.contains(&field)
    }

    /// Fills prepopulated fields that are missing, null or blank in a submitted record.
    pub fn apply_prepopulated(&self, record: &mut Map<String, Value>) {
        for (field, sources) in &self.prepopulated_fields {
            let blank = match record.get(*field) {
                None | Some(Value::Null) => true,
                Some(Value::String(value)) => value.trim().is_empty(),
                Some(_) => false,
            };
            if !blank {
                continue;
            }

            let text = sources
                .iter()
                .filter_map(|source| record.get(*source).and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(" ");
            record.insert((*field).to_owned(), Value::String(slugify(&text)));
        }
    }
}

/// Registry of the managed models.
#[derive(Debug, Clone, Default)]
pub struct AdminSite {
    models: BTreeMap<Model, ModelAdmin>,
}

impl AdminSite {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The blog registrations: posts list their title and author, are filterable by title and
    /// get their slug from the title; comments list the commenter and the post; tags and
    /// authors use the defaults.
    #[must_use]
    pub fn blog() -> Self {
        Self::new()
            .register(Model::Tag, ModelAdmin::default())
            .register(Model::Author, ModelAdmin::default())
            .register(
                Model::Post,
                ModelAdmin::default()
                    .list_display(["title", "author"])
                    .list_filter(["title"])
                    .prepopulate("slug", ["title"]),
            )
            .register(Model::Comment, ModelAdmin::default().list_display(["user_name", "post"]))
    }

    /// Adds or replaces the options for `model`.
    #[must_use]
    pub fn register(mut self, model: Model, admin: ModelAdmin) -> Self {
        self.models.insert(model, admin);
        self
    }

    #[must_use]
    pub fn get(&self, model: Model) -> Option<&ModelAdmin> {
        self.models.get(&model)
    }

    /// Looks a model up by its URL name (`post`, `comment`, ...).
    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<(Model, &ModelAdmin)> {
        let model = Model::from_str(name).ok()?;
        self.get(model).map(|admin| (model, admin))
    }

    pub fn models(&self) -> impl Iterator<Item = (Model, &ModelAdmin)> {
        self.models.iter().map(|(model, admin)| (*model, admin))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
