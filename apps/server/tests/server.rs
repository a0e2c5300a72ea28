use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use quill::domain::config::Settings;
use quill_server::Server;
use serde_json::Value;
use tower::ServiceExt;

async fn server(installed_apps: &[&str]) -> Server {
    let mut settings = Settings::default();
    settings.debug = true;
    settings.database.url = "mem://".to_owned();
    settings.allowed_hosts = vec!["localhost".to_owned()];
    settings.installed_apps = installed_apps.iter().map(|app| (*app).to_owned()).collect();

    Server::builder().settings(settings).build().await.expect("server")
}

fn get(uri: &str, host: &str) -> Request<Body> {
    Request::builder().uri(uri).header(header::HOST, host).body(Body::empty()).expect("request")
}

#[tokio::test]
async fn serves_health_and_admin_behind_middleware() {
    let server = server(&["blog", "admin"]).await;
    assert_eq!(server.state().media.kind(), "memory");
    let app = server.router().expect("router");

    let response = app.clone().oneshot(get("/health", "localhost:8000")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");
    assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");

    let response = app.clone().oneshot(get("/admin/post", "localhost")).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let page: Value = serde_json::from_slice(&body).expect("json");
    assert_eq!(page["count"], 0);

    let response = app.oneshot(get("/health", "evil.example.com")).await.expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_routes_follow_installed_apps() {
    let server = server(&["blog"]).await;
    let app = server.router().expect("router");

    let response = app.oneshot(get("/admin", "localhost")).await.expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_apps_fail_the_build() {
    let mut settings = Settings::default();
    settings.database.url = "mem://".to_owned();
    settings.installed_apps.push("polls".to_owned());

    let err = Server::builder().settings(settings).build().await.unwrap_err();
    assert!(format!("{err:#}").contains("polls"));
}
