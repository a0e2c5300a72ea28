//! List view: records flattened to JSON, filtered and projected onto the configured columns.

use crate::error::AdminError;
use crate::site::{DISPLAY_COLUMN, Model, ModelAdmin};
use fxhash::FxHashMap;
use quill_derive::api_model;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

/// One page of the list view.
#[api_model]
#[derive(Clone, PartialEq)]
pub struct ListResponse {
    pub model: String,
    /// `key` followed by the configured columns.
    pub columns: Vec<String>,
    /// Available values per filterable field.
    pub filters: BTreeMap<String, Vec<String>>,
    pub count: usize,
    pub rows: Vec<Value>,
}

/// Serializes a record and adds its display string under [`DISPLAY_COLUMN`].
///
/// # Errors
/// [`AdminError::Internal`] if the record does not serialize to a JSON object.
pub fn to_record<T: Serialize + Display>(record: &T) -> Result<Map<String, Value>, AdminError> {
    let Value::Object(mut map) = serde_json::to_value(record)
        .map_err(|e| AdminError::from(format!("record serialization failed: {e}")))?
    else {
        return Err("record did not serialize to an object".into());
    };
    map.insert(DISPLAY_COLUMN.to_owned(), Value::String(record.to_string()));
    Ok(map)
}

/// Records of one model plus display strings for the records their fields point at.
#[derive(Debug, Default)]
pub struct Listing {
    records: Vec<Map<String, Value>>,
    relations: FxHashMap<&'static str, FxHashMap<String, String>>,
}

impl Listing {
    /// # Errors
    /// See [`to_record`].
    pub fn from_records<'a, T>(records: impl IntoIterator<Item = &'a T>) -> Result<Self, AdminError>
    where
        T: Serialize + Display + 'a,
    {
        let records = records.into_iter().map(to_record).collect::<Result<_, _>>()?;
        Ok(Self { records, relations: FxHashMap::default() })
    }

    /// Renders `field` (holding another record's key) through that record's display string.
    #[must_use]
    pub fn relation<K, V>(mut self, field: &'static str, targets: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.relations
            .insert(field, targets.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Applies exact-match `filters` and projects the matching records.
    ///
    /// # Errors
    /// [`AdminError::BadRequest`] for a filter on a field outside `list_filter`.
    pub fn render(
        self,
        model: Model,
        admin: &ModelAdmin,
        filters: &BTreeMap<String, String>,
    ) -> Result<ListResponse, AdminError> {
        if let Some(field) = filters.keys().find(|field| !admin.is_filterable(field)) {
            return Err(AdminError::bad_request(format!("'{field}' is not a filter of {model}")));
        }

        let choices = admin
            .filters()
            .iter()
            .map(|field| {
                let values: BTreeSet<String> =
                    self.records.iter().filter_map(|r| r.get(*field).and_then(as_text)).collect();
                ((*field).to_owned(), values.into_iter().collect())
            })
            .collect();

        let rows: Vec<Value> = self
            .records
            .iter()
            .filter(|record| {
                filters.iter().all(|(field, wanted)| {
                    record.get(field).and_then(as_text).is_some_and(|value| &value == wanted)
                })
            })
            .map(|record| self.project(record, admin.columns()))
            .collect();

        let columns = std::iter::once("key")
            .chain(admin.columns().iter().copied())
            .map(ToOwned::to_owned)
            .collect();

        Ok(ListResponse {
            model: model.to_string(),
            columns,
            filters: choices,
            count: rows.len(),
            rows,
        })
    }

    fn project(&self, record: &Map<String, Value>, columns: &[&'static str]) -> Value {
        let mut row = Map::new();
        row.insert("key".to_owned(), record.get("key").cloned().unwrap_or(Value::Null));

        for column in columns {
            let related = self
                .relations
                .get(column)
                .zip(record.get(*column).and_then(Value::as_str))
                .and_then(|(targets, key)| targets.get(key));
            let value = related.map_or_else(
                || record.get(*column).cloned().unwrap_or(Value::Null),
                |display| Value::String(display.clone()),
            );
            row.insert((*column).to_owned(), value);
        }
        Value::Object(row)
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::AdminSite;
    use quill_blog::{Author, Post, Tag};
    use serde_json::json;

    fn post(key: &str, title: &str, author: Option<&str>) -> Post {
        Post {
            key: key.to_owned(),
            title: title.to_owned(),
            excerpt: "excerpt".to_owned(),
            image: None,
            date: "2024-05-01".parse().expect("date"),
            author: author.map(ToOwned::to_owned),
            tags: Vec::new(),
            slug: key.to_owned(),
            content: "Hello world!".to_owned(),
        }
    }

    fn ada() -> Author {
        Author {
            key: "ada".to_owned(),
            first_name: "Ada".to_owned(),
            last_name: "Lovelace".to_owned(),
            email_address: "ada@example.com".to_owned(),
        }
    }

    #[test]
    fn posts_show_title_and_author_name() {
        let site = AdminSite::blog();
        let admin = site.get(Model::Post).expect("post");
        let posts = [post("p1", "Hello", Some("ada")), post("p2", "Second", None)];
        let authors = [ada()];

        let page = Listing::from_records(&posts)
            .expect("records")
            .relation("author", authors.iter().map(|a| (a.key.clone(), a.to_string())))
            .render(Model::Post, admin, &BTreeMap::new())
            .expect("page");

        assert_eq!(page.columns, ["key", "title", "author"]);
        assert_eq!(page.count, 2);
        assert_eq!(page.rows[0], json!({ "key": "p1", "title": "Hello", "author": "Ada Lovelace" }));
        assert_eq!(page.rows[1], json!({ "key": "p2", "title": "Second", "author": null }));
        assert_eq!(page.filters["title"], ["Hello", "Second"]);
    }

    #[test]
    fn filters_match_exactly() {
        let site = AdminSite::blog();
        let admin = site.get(Model::Post).expect("post");
        let posts = [post("p1", "Hello", None), post("p2", "Hello again", None)];
        let filters = BTreeMap::from([("title".to_owned(), "Hello".to_owned())]);

        let page = Listing::from_records(&posts)
            .expect("records")
            .render(Model::Post, admin, &filters)
            .expect("page");

        assert_eq!(page.count, 1);
        assert_eq!(page.rows[0]["key"], "p1");
    }

    #[test]
    fn unknown_filters_are_rejected() {
        let site = AdminSite::blog();
        let admin = site.get(Model::Post).expect("post");
        let filters = BTreeMap::from([("slug".to_owned(), "hello".to_owned())]);

        let err = Listing::default().render(Model::Post, admin, &filters).unwrap_err();
        assert!(matches!(err, AdminError::BadRequest { .. }));
    }

    #[test]
    fn default_columns_use_display_string() {
        let site = AdminSite::blog();
        let admin = site.get(Model::Tag).expect("tag");
        let tags = [Tag { key: "t1".to_owned(), caption: "rust".to_owned() }];

        let page = Listing::from_records(&tags)
            .expect("records")
            .render(Model::Tag, admin, &BTreeMap::new())
            .expect("page");

        assert_eq!(page.rows, [json!({ "key": "t1", "display": "rust" })]);
        assert!(page.filters.is_empty());
    }
}
