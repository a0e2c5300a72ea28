use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use quill_database::Database;
use quill_kernel::domain::registry::InitializedSlice;
use quill_kernel::prelude::*;
use quill_kernel::server::{ApiStateError, system_router};
use quill_media::Media;
use serde_json::Value;
use tower::ServiceExt;

#[quill_derive::quill_slice]
pub struct Notes {
    pub greeting: &'static str,
}

#[quill_derive::quill_slice]
pub struct Unused {}

async fn state() -> ApiState {
    let database = Database::builder()
        .url("mem://")
        .session("quill", "kernel_tests")
        .init()
        .await
        .expect("in-memory database");

    ApiState::builder()
        .settings(Settings::default())
        .db(database)
        .media(Media::memory("images"))
        .register_slice(InitializedSlice::new(Notes::new(NotesInner { greeting: "hi" })))
        .build()
        .expect("state")
}

#[tokio::test]
async fn builder_requires_settings_and_database() {
    let err = ApiState::builder().build().unwrap_err();
    assert!(matches!(err, ApiStateError::Validation { .. }));
}

#[tokio::test]
async fn slices_are_looked_up_by_type() {
    let state = state().await;

    assert_eq!(state.try_get_slice::<Notes>().expect("notes slice").greeting, "hi");
    assert!(matches!(state.try_get_slice::<Unused>(), Err(ApiStateError::MissingSlice { .. })));
    assert_eq!(state.slice_names().collect::<Vec<_>>(), ["Notes"]);
}

#[tokio::test]
async fn health_reports_dependencies() {
    let state = state().await;
    let (router, _api) = system_router().split_for_parts();
    let app = router.with_state(state);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["cache-control"], "no-store, no-cache, must-revalidate");

    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let json: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(json["status"], "up");
    assert_eq!(json["database"], "up");
    assert_eq!(json["media"], "memory");
}
