use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use quill_admin::AdminSite;
use quill_blog::{BlogRepository, MIGRATIONS};
use quill_database::Database;
use quill_kernel::prelude::*;
use quill_media::Media;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn app(media: Media) -> (Router, ApiState) {
    let database = Database::builder()
        .url("mem://")
        .session("quill", "admin_tests")
        .migrations(MIGRATIONS.iter().copied())
        .init()
        .await
        .expect("in-memory database");

    let blog = quill_blog::init(database.clone()).await.expect("blog slice");
    let admin = quill_admin::init(AdminSite::blog(), BlogRepository::new(database.clone()))
        .expect("admin slice");

    let state = ApiState::builder()
        .settings(Settings::default())
        .db(database)
        .media(media)
        .register_slices([blog, admin])
        .build()
        .expect("state");

    let (router, _api) = quill_admin::router().split_for_parts();
    (router.with_state(state.clone()), state)
}

async fn call(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let json = if body.is_empty() { Value::Null } else { serde_json::from_slice(&body).expect("json") };
    (status, json)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    };
    call(app, request.expect("request")).await
}

async fn upload(app: &Router, post: &str, filename: &str, bytes: &'static [u8]) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/admin/post/{post}/image?filename={filename}"))
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .body(Body::from(bytes))
        .expect("request");
    call(app, request).await
}

async fn create(app: &Router, model: &str, body: Value) -> Value {
    let (status, record) = send(app, Method::POST, &format!("/admin/{model}"), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "{record}");
    record
}

async fn ada(app: &Router) -> String {
    let author = create(
        app,
        "author",
        json!({ "first_name": "Ada", "last_name": "Lovelace", "email_address": "ada@example.com" }),
    )
    .await;
    author["key"].as_str().expect("key").to_owned()
}

async fn post(app: &Router, title: &str, author: Option<&str>) -> Value {
    create(
        app,
        "post",
        json!({
            "title": title,
            "excerpt": "A short excerpt",
            "content": "Hello world!",
            "author": author,
        }),
    )
    .await
}

#[tokio::test]
async fn site_index_describes_registered_models() {
    let (app, _) = app(Media::disabled()).await;

    let (status, site) = send(&app, Method::GET, "/admin", None).await;
    assert_eq!(status, StatusCode::OK);

    let names: Vec<_> = site["models"].as_array().expect("models").iter().map(|m| m["name"].clone()).collect();
    assert_eq!(names, ["tag", "author", "post", "comment"]);
    assert_eq!(site["models"][2]["list_display"], json!(["title", "author"]));
    assert_eq!(site["models"][2]["prepopulated_fields"], json!({ "slug": ["title"] }));
}

#[tokio::test]
async fn post_slug_is_prepopulated_and_list_shows_author_name() {
    let (app, _) = app(Media::disabled()).await;
    let author = ada(&app).await;

    let created = post(&app, "Hello World", Some(&author)).await;
    assert_eq!(created["slug"], "hello-world");
    assert_eq!(created["display"], "Hello World");

    let (status, page) = send(&app, Method::GET, "/admin/post", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["columns"], json!(["key", "title", "author"]));
    assert_eq!(page["count"], 1);
    assert_eq!(
        page["rows"][0],
        json!({ "key": created["key"], "title": "Hello World", "author": "Ada Lovelace" })
    );
}

#[tokio::test]
async fn list_filters_by_title() {
    let (app, _) = app(Media::disabled()).await;
    post(&app, "First", None).await;
    post(&app, "Second", None).await;

    let (status, page) = send(&app, Method::GET, "/admin/post?title=Second", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["count"], 1);
    assert_eq!(page["rows"][0]["title"], "Second");
    assert_eq!(page["filters"]["title"], json!(["First", "Second"]));

    let (status, body) = send(&app, Method::GET, "/admin/post?slug=first", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some_and(|e| e.contains("slug")));
}

#[tokio::test]
async fn comment_list_shows_post_title() {
    let (app, _) = app(Media::disabled()).await;
    let hello = post(&app, "Hello", None).await;
    create(
        &app,
        "comment",
        json!({
            "user_name": "Bob",
            "user_email": "bob@example.com",
            "comment_text": "Nice post",
            "post": hello["key"],
        }),
    )
    .await;

    let (_, page) = send(&app, Method::GET, "/admin/comment", None).await;
    assert_eq!(page["columns"], json!(["key", "user_name", "post"]));
    assert_eq!(page["rows"][0]["user_name"], "Bob");
    assert_eq!(page["rows"][0]["post"], "Hello");
}

#[tokio::test]
async fn field_errors_answer_unprocessable_entity() {
    let (app, _) = app(Media::disabled()).await;

    let (status, body) =
        send(&app, Method::POST, "/admin/tag", Some(json!({ "caption": "far too long caption" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["caption"].as_array().is_some_and(|m| !m.is_empty()));

    let (status, body) = send(
        &app,
        Method::POST,
        "/admin/comment",
        Some(json!({
            "user_name": "Bob",
            "user_email": "not an email",
            "comment_text": "x".repeat(301),
            "post": "missing",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["user_email"].is_array());
    assert!(body["errors"]["comment_text"].is_array());

    let (status, body) = send(
        &app,
        Method::POST,
        "/admin/comment",
        Some(json!({
            "user_name": "Bob",
            "user_email": "bob@example.com",
            "comment_text": "Nice post",
            "post": "missing",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["errors"]["post"].is_array());
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let (app, _) = app(Media::disabled()).await;

    let (status, _) = send(&app, Method::POST, "/admin/tag", Some(json!([1, 2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::POST, "/admin/tag", Some(json!({ "label": "rust" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_models_and_keys_are_not_found() {
    let (app, _) = app(Media::disabled()).await;

    let (status, body) = send(&app, Method::GET, "/admin/user", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());

    let (status, _) = send(&app, Method::GET, "/admin/post/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, "/admin/tag/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_replaces_record() {
    let (app, _) = app(Media::disabled()).await;
    let tag = create(&app, "tag", json!({ "caption": "rust" })).await;
    let key = tag["key"].as_str().expect("key");

    let uri = format!("/admin/tag/{key}");
    let (status, updated) = send(&app, Method::PUT, &uri, Some(json!({ "caption": "tokio" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["caption"], "tokio");

    let (_, fetched) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(fetched["caption"], "tokio");
}

#[tokio::test]
async fn author_delete_detaches_posts() {
    let (app, _) = app(Media::disabled()).await;
    let author = ada(&app).await;
    let hello = post(&app, "Hello", Some(&author)).await;

    let (status, _) = send(&app, Method::DELETE, &format!("/admin/author/{author}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let uri = format!("/admin/post/{}", hello["key"].as_str().expect("key"));
    let (status, fetched) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["author"], Value::Null);
}

#[tokio::test]
async fn image_upload_replaces_and_removes_stored_file() {
    let media = Media::memory("images");
    let (app, _) = app(media.clone()).await;
    let store = media.memory_store().expect("memory backend");
    let hello = post(&app, "Hello", None).await;
    let key = hello["key"].as_str().expect("key");

    let (status, first) = upload(&app, key, "cover.png", b"first").await;
    assert_eq!(status, StatusCode::OK, "{first}");
    assert!(first["image"]["url"].as_str().is_some_and(|u| u.starts_with("memory://")));
    assert_eq!(store.len(), 1);

    let (status, second) = upload(&app, key, "cover.png", b"second").await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(second["image"]["name"], first["image"]["name"]);
    assert_eq!(store.len(), 1);
    assert_eq!(store.get(second["image"]["name"].as_str().expect("name")), Some(b"second".to_vec()));

    let (status, cleared) = send(&app, Method::DELETE, &format!("/admin/post/{key}/image"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["image"], Value::Null);
    assert!(store.is_empty());
}

#[tokio::test]
async fn image_upload_rejects_empty_files_and_other_models() {
    let (app, _) = app(Media::memory("images")).await;
    let hello = post(&app, "Hello", None).await;
    let key = hello["key"].as_str().expect("key");

    let (status, _) = upload(&app, key, "cover.png", b"").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let tag = create(&app, "tag", json!({ "caption": "rust" })).await;
    let uri = format!("/admin/tag/{}/image?filename=a.png", tag["key"].as_str().expect("key"));
    let request = Request::builder().method(Method::POST).uri(uri).body(Body::from("x")).expect("request");
    let (status, _) = call(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn image_upload_needs_configured_storage() {
    let (app, _) = app(Media::disabled()).await;
    let hello = post(&app, "Hello", None).await;

    let (status, body) = upload(&app, hello["key"].as_str().expect("key"), "cover.png", b"bytes").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn post_delete_takes_comments_and_image_along() {
    let media = Media::memory("images");
    let (app, _) = app(media.clone()).await;
    let hello = post(&app, "Hello", None).await;
    let key = hello["key"].as_str().expect("key");
    create(
        &app,
        "comment",
        json!({
            "user_name": "Bob",
            "user_email": "bob@example.com",
            "comment_text": "Nice post",
            "post": key,
        }),
    )
    .await;
    upload(&app, key, "cover.png", b"bytes").await;

    let (status, _) = send(&app, Method::DELETE, &format!("/admin/post/{key}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, comments) = send(&app, Method::GET, "/admin/comment", None).await;
    assert_eq!(comments["count"], 0);
    assert!(media.memory_store().expect("memory backend").is_empty());
}
