//! Drives the Cloudinary backend against a local stand-in for the upload API.

use axum::extract::{Multipart, Path};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Form, Json, Router};
use quill_media::{Cloudinary, Media, MediaError, sign};
use serde_json::json;
use std::collections::BTreeMap;

const API_KEY: &str = "123456";
const API_SECRET: &str = "shhh";

fn rejected(message: &str) -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({ "error": { "message": message } }))).into_response()
}

fn verify(fields: &BTreeMap<String, String>) -> bool {
    let params: BTreeMap<&str, String> =
        fields.iter().map(|(name, value)| (name.as_str(), value.clone())).collect();
    fields.get("api_key").map(String::as_str) == Some(API_KEY)
        && fields.get("signature_algorithm").map(String::as_str) == Some("sha256")
        && fields.get("signature") == Some(&sign(&params, API_SECRET))
}

async fn upload(Path(cloud): Path<String>, mut multipart: Multipart) -> Response {
    let mut fields = BTreeMap::new();
    let mut file = None;
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_owned();
        if name == "file" {
            let file_name = field.file_name().unwrap_or_default().to_owned();
            let bytes = field.bytes().await.unwrap_or_default();
            file = Some((file_name, bytes));
        } else {
            fields.insert(name, field.text().await.unwrap_or_default());
        }
    }

    if !verify(&fields) {
        return rejected("Invalid Signature");
    }
    let Some((file_name, bytes)) = file.filter(|(_, bytes)| !bytes.is_empty()) else {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": { "message": "Missing file" } })))
            .into_response();
    };

    let stem = file_name.split('.').next().unwrap_or_default();
    let folder = fields.get("folder").cloned().unwrap_or_default();
    let public_id = format!("{folder}/{stem}");
    Json(json!({
        "public_id": public_id,
        "bytes": bytes.len(),
        "secure_url": format!("https://res.cloudinary.com/{cloud}/image/upload/{public_id}.png"),
    }))
    .into_response()
}

async fn destroy(Form(fields): Form<BTreeMap<String, String>>) -> Response {
    if !verify(&fields) {
        return rejected("Invalid Signature");
    }
    let result = if fields.get("public_id").is_some_and(|id| id.starts_with("images/")) {
        "ok"
    } else {
        "not found"
    };
    Json(json!({ "result": result })).into_response()
}

async fn spawn_api() -> String {
    let app = Router::new()
        .route("/{cloud}/image/upload", post(upload))
        .route("/{cloud}/image/destroy", post(destroy));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}")
}

fn client(base_url: &str, secret: &str) -> Media {
    let cloudinary = Cloudinary::new("demo", API_KEY, secret)
        .expect("client")
        .folder("images")
        .base_url(base_url);
    Media::cloudinary(cloudinary)
}

#[tokio::test]
async fn signed_upload_returns_secure_url() {
    let base_url = spawn_api().await;
    let media = client(&base_url, API_SECRET);

    let image = media.upload("cover.png", b"\x89PNG".to_vec()).await.expect("upload");
    assert_eq!(image.name, "images/cover");
    assert_eq!(image.url, "https://res.cloudinary.com/demo/image/upload/images/cover.png");

    media.destroy(&image.name).await.expect("destroy");
    media.destroy("elsewhere/gone").await.expect("already deleted is fine");
}

#[tokio::test]
async fn wrong_secret_is_rejected_upstream() {
    let base_url = spawn_api().await;
    let media = client(&base_url, "wrong");

    let err = media.upload("cover.png", b"\x89PNG".to_vec()).await.unwrap_err();
    assert!(err.is_upstream());
    match err {
        MediaError::Rejected { status, message, .. } => {
            assert_eq!(status, 401);
            assert_eq!(message, "Invalid Signature");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn unreachable_provider_is_a_transport_error() {
    let media = client("http://127.0.0.1:9", API_SECRET);
    let err = media.upload("cover.png", vec![1, 2, 3]).await.unwrap_err();
    assert!(matches!(err, MediaError::Transport { .. }));
}
