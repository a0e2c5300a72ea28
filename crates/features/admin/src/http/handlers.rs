use crate::Admin;
use crate::error::{AdminError, AdminErrorExt, ErrorBody, ValidationErrorBody};
use crate::records::{ListResponse, Listing, to_record};
use crate::site::{Model, ModelAdmin};
use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use quill_blog::{BlogRepository, ImageRef, PostFilter};
use quill_derive::{api_handler, api_model};
use quill_domain::constants::ADMIN_TAG;
use quill_kernel::server::ApiState;
use quill_media::Media;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Options of one registered model.
#[api_model]
pub struct ModelInfo {
    pub name: String,
    pub list_display: Vec<String>,
    pub list_filter: Vec<String>,
    /// Field -> fields it is derived from when left empty.
    pub prepopulated_fields: BTreeMap<String, Vec<String>>,
}

#[api_model]
pub struct SiteResponse {
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ImageQuery {
    filename: String,
}

fn admin(state: &ApiState) -> Result<Admin, AdminError> {
    state.try_get_slice::<Admin>().cloned().map_err(|e| AdminError::Internal {
        message: e.to_string().into(),
        context: Some("Resolving admin slice".into()),
    })
}

fn resolve<'a>(admin: &'a Admin, name: &str) -> Result<(Model, &'a ModelAdmin), AdminError> {
    admin.site.resolve(name).ok_or_else(|| AdminError::unknown_model(name))
}

fn into_object(body: Value) -> Result<Map<String, Value>, AdminError> {
    match body {
        Value::Object(map) => Ok(map),
        other => Err(AdminError::bad_request(format!("expected a JSON object, got {other}"))),
    }
}

fn parse<T: DeserializeOwned>(body: Map<String, Value>) -> Result<T, AdminError> {
    Ok(serde_json::from_value(Value::Object(body))?)
}

fn record<T: serde::Serialize + std::fmt::Display>(value: &T) -> Result<Value, AdminError> {
    to_record(value).map(Value::Object)
}

async fn listing(blog: &BlogRepository, model: Model) -> Result<Listing, AdminError> {
    Ok(match model {
        Model::Tag => Listing::from_records(&blog.list_tags().await?)?,
        Model::Author => Listing::from_records(&blog.list_authors().await?)?,
        Model::Post => {
            let authors = blog.list_authors().await?;
            Listing::from_records(&blog.list_posts(&PostFilter::default()).await?)?
                .relation("author", authors.iter().map(|a| (a.key.clone(), a.to_string())))
        }
        Model::Comment => {
            let posts = blog.list_posts(&PostFilter::default()).await?;
            Listing::from_records(&blog.list_comments().await?)?
                .relation("post", posts.iter().map(|p| (p.key.clone(), p.to_string())))
        }
    })
}

async fn destroy_quietly(media: &Media, name: &str) {
    if let Err(error) = media.destroy(name).await {
        warn!(%error, image = name, "Failed to remove image from media storage");
    }
}

#[api_handler(
    get,
    path = "/admin",
    responses(
        (status = OK, description = "Registered models and their admin options", body = SiteResponse),
    ),
    tag = ADMIN_TAG,
)]
pub(super) async fn site_index(
    State(state): State<ApiState>,
) -> Result<Json<SiteResponse>, AdminError> {
    let admin = admin(&state)?;
    let models = admin
        .site
        .models()
        .map(|(model, options)| ModelInfo {
            name: model.to_string(),
            list_display: options.columns().iter().map(|c| (*c).to_owned()).collect(),
            list_filter: options.filters().iter().map(|f| (*f).to_owned()).collect(),
            prepopulated_fields: options
                .prepopulated_fields()
                .iter()
                .map(|(field, sources)| {
                    ((*field).to_owned(), sources.iter().map(|s| (*s).to_owned()).collect())
                })
                .collect(),
        })
        .collect();

    Ok(Json(SiteResponse { models }))
}

#[api_handler(
    get,
    path = "/admin/{model}",
    params(
        ("model" = String, Path, description = "tag, author, post or comment"),
    ),
    responses(
        (status = OK, description = "Records projected onto the list columns; query parameters filter by exact match", body = ListResponse),
        (status = BAD_REQUEST, description = "Filter on a field that is not filterable", body = ErrorBody),
        (status = NOT_FOUND, description = "Unknown model", body = ErrorBody),
    ),
    tag = ADMIN_TAG,
)]
pub(super) async fn list_records(
    State(state): State<ApiState>,
    Path(model): Path<String>,
    Query(filters): Query<BTreeMap<String, String>>,
) -> Result<Json<ListResponse>, AdminError> {
    let admin = admin(&state)?;
    let (model, options) = resolve(&admin, &model)?;

    let page = listing(&admin.blog, model).await?.render(model, options, &filters)?;
    Ok(Json(page))
}

#[api_handler(
    post,
    path = "/admin/{model}",
    params(
        ("model" = String, Path, description = "tag, author, post or comment"),
    ),
    responses(
        (status = CREATED, description = "The created record"),
        (status = BAD_REQUEST, description = "Malformed body", body = ErrorBody),
        (status = NOT_FOUND, description = "Unknown model", body = ErrorBody),
        (status = UNPROCESSABLE_ENTITY, description = "Field errors", body = ValidationErrorBody),
    ),
    tag = ADMIN_TAG,
)]
pub(super) async fn create_record(
    State(state): State<ApiState>,
    Path(model): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AdminError> {
    let admin = admin(&state)?;
    let (model, options) = resolve(&admin, &model)?;
    let mut body = into_object(body)?;
    options.apply_prepopulated(&mut body);

    let blog = &admin.blog;
    let created = match model {
        Model::Tag => record(&blog.create_tag(parse(body)?).await?)?,
        Model::Author => record(&blog.create_author(parse(body)?).await?)?,
        Model::Post => record(&blog.create_post(parse(body)?).await?)?,
        Model::Comment => record(&blog.create_comment(parse(body)?).await?)?,
    };

    info!(%model, "Record created through admin");
    Ok((StatusCode::CREATED, Json(created)))
}

#[api_handler(
    get,
    path = "/admin/{model}/{key}",
    params(
        ("model" = String, Path, description = "tag, author, post or comment"),
        ("key" = String, Path, description = "Record key"),
    ),
    responses(
        (status = OK, description = "The record"),
        (status = NOT_FOUND, description = "Unknown model or record", body = ErrorBody),
    ),
    tag = ADMIN_TAG,
)]
pub(super) async fn get_record(
    State(state): State<ApiState>,
    Path((model, key)): Path<(String, String)>,
) -> Result<Json<Value>, AdminError> {
    let admin = admin(&state)?;
    let (model, _) = resolve(&admin, &model)?;

    let blog = &admin.blog;
    let found = match model {
        Model::Tag => record(&blog.get_tag(&key).await?)?,
        Model::Author => record(&blog.get_author(&key).await?)?,
        Model::Post => record(&blog.get_post(&key).await?)?,
        Model::Comment => record(&blog.get_comment(&key).await?)?,
    };
    Ok(Json(found))
}

#[api_handler(
    put,
    path = "/admin/{model}/{key}",
    params(
        ("model" = String, Path, description = "tag, author, post or comment"),
        ("key" = String, Path, description = "Record key"),
    ),
    responses(
        (status = OK, description = "The updated record"),
        (status = BAD_REQUEST, description = "Malformed body", body = ErrorBody),
        (status = NOT_FOUND, description = "Unknown model or record", body = ErrorBody),
        (status = UNPROCESSABLE_ENTITY, description = "Field errors", body = ValidationErrorBody),
    ),
    tag = ADMIN_TAG,
)]
pub(super) async fn update_record(
    State(state): State<ApiState>,
    Path((model, key)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AdminError> {
    let admin = admin(&state)?;
    let (model, options) = resolve(&admin, &model)?;
    let mut body = into_object(body)?;
    options.apply_prepopulated(&mut body);

    let blog = &admin.blog;
    let updated = match model {
        Model::Tag => record(&blog.update_tag(&key, parse(body)?).await?)?,
        Model::Author => record(&blog.update_author(&key, parse(body)?).await?)?,
        Model::Post => record(&blog.update_post(&key, parse(body)?).await?)?,
        Model::Comment => record(&blog.update_comment(&key, parse(body)?).await?)?,
    };
    Ok(Json(updated))
}

#[api_handler(
    delete,
    path = "/admin/{model}/{key}",
    params(
        ("model" = String, Path, description = "tag, author, post or comment"),
        ("key" = String, Path, description = "Record key"),
    ),
    responses(
        (status = NO_CONTENT, description = "Deleted; authors are detached from their posts, posts take their comments along"),
        (status = NOT_FOUND, description = "Unknown model or record", body = ErrorBody),
    ),
    tag = ADMIN_TAG,
)]
pub(super) async fn delete_record(
    State(state): State<ApiState>,
    Path((model, key)): Path<(String, String)>,
) -> Result<StatusCode, AdminError> {
    let admin = admin(&state)?;
    let (model, _) = resolve(&admin, &model)?;

    let blog = &admin.blog;
    match model {
        Model::Tag => blog.delete_tag(&key).await?,
        Model::Author => blog.delete_author(&key).await?,
        Model::Comment => blog.delete_comment(&key).await?,
        Model::Post => {
            let post = blog.get_post(&key).await?;
            blog.delete_post(&key).await?;
            if let Some(image) = post.image {
                destroy_quietly(&state.media, &image.name).await;
            }
        }
    }

    info!(%model, %key, "Record deleted through admin");
    Ok(StatusCode::NO_CONTENT)
}

fn ensure_post(model: Model) -> Result<(), AdminError> {
    if model == Model::Post {
        Ok(())
    } else {
        Err(AdminError::bad_request(format!("{model} records have no image")))
    }
}

#[api_handler(
    post,
    path = "/admin/{model}/{key}/image",
    params(
        ("model" = String, Path, description = "Always post"),
        ("key" = String, Path, description = "Post key"),
        ("filename" = String, Query, description = "Original file name of the upload"),
    ),
    responses(
        (status = OK, description = "The post with its new image"),
        (status = BAD_REQUEST, description = "Empty upload or not a post", body = ErrorBody),
        (status = NOT_FOUND, description = "Unknown post", body = ErrorBody),
        (status = BAD_GATEWAY, description = "Media provider failure", body = ErrorBody),
        (status = SERVICE_UNAVAILABLE, description = "Media storage not configured", body = ErrorBody),
    ),
    tag = ADMIN_TAG,
)]
pub(super) async fn upload_image(
    State(state): State<ApiState>,
    Path((model, key)): Path<(String, String)>,
    Query(query): Query<ImageQuery>,
    body: Bytes,
) -> Result<Json<Value>, AdminError> {
    let admin = admin(&state)?;
    let (model, _) = resolve(&admin, &model)?;
    ensure_post(model)?;

    let blog = &admin.blog;
    let post = blog.get_post(&key).await?;
    let stored = state.media.upload(&query.filename, body.to_vec()).await.context("Uploading post image")?;

    let image = ImageRef { name: stored.name.clone(), url: stored.url };
    let updated = match blog.set_post_image(&key, Some(image)).await {
        Ok(updated) => updated,
        Err(error) => {
            destroy_quietly(&state.media, &stored.name).await;
            return Err(error.into());
        }
    };
    if let Some(previous) = post.image.filter(|previous| previous.name != stored.name) {
        destroy_quietly(&state.media, &previous.name).await;
    }

    info!(%key, image = %stored.name, "Post image uploaded");
    Ok(Json(record(&updated)?))
}

#[api_handler(
    delete,
    path = "/admin/{model}/{key}/image",
    params(
        ("model" = String, Path, description = "Always post"),
        ("key" = String, Path, description = "Post key"),
    ),
    responses(
        (status = OK, description = "The post without image"),
        (status = NOT_FOUND, description = "Unknown post", body = ErrorBody),
        (status = BAD_GATEWAY, description = "Media provider failure", body = ErrorBody),
        (status = SERVICE_UNAVAILABLE, description = "Media storage not configured", body = ErrorBody),
    ),
    tag = ADMIN_TAG,
)]
pub(super) async fn delete_image(
    State(state): State<ApiState>,
    Path((model, key)): Path<(String, String)>,
) -> Result<Json<Value>, AdminError> {
    let admin = admin(&state)?;
    let (model, _) = resolve(&admin, &model)?;
    ensure_post(model)?;

    let blog = &admin.blog;
    let post = blog.get_post(&key).await?;
    let Some(image) = post.image.clone() else {
        return Ok(Json(record(&post)?));
    };

    state.media.destroy(&image.name).await.context("Removing post image")?;
    let updated = blog.set_post_image(&key, None).await?;

    info!(%key, image = %image.name, "Post image removed");
    Ok(Json(record(&updated)?))
}
