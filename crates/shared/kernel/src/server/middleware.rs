//! The configurable HTTP middleware chain.
//!
//! `settings.middleware` lists layers outermost first. Names are checked when the router is
//! built, so a typo stops the server at startup instead of silently dropping a layer.

use crate::config::ConfigError;
use crate::security::AllowedHosts;
use axum::Router;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::{Next, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use quill_domain::config::Settings;
use std::str::FromStr;
use std::sync::Arc;
use strum_macros::{AsRefStr, Display, EnumString, VariantNames};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display, EnumString, VariantNames)]
#[strum(serialize_all = "snake_case")]
pub enum Middleware {
    /// `X-Content-Type-Options: nosniff`, `X-Frame-Options: DENY`,
    /// `Referrer-Policy: same-origin`.
    Security,
    /// Rejects requests whose `Host` is not in `allowed_hosts` with `400`.
    AllowedHosts,
    /// Request/response spans via `tower-http`.
    Trace,
}

/// Parses `settings.middleware`, keeping the configured order.
///
/// # Errors
/// Returns [`ConfigError::Invalid`] naming the first unknown entry.
pub fn middleware_chain(settings: &Settings) -> Result<Vec<Middleware>, ConfigError> {
    settings
        .middleware
        .iter()
        .map(|name| {
            Middleware::from_str(name.trim()).map_err(|_| ConfigError::Invalid {
                message: format!(
                    "unknown middleware '{name}'; expected one of {}",
                    <Middleware as strum::VariantNames>::VARIANTS.join(", ")
                )
                .into(),
                context: Some("Building middleware chain".into()),
            })
        })
        .collect()
}

/// Wraps `router` so that `chain[0]` is the outermost layer.
#[must_use]
pub fn apply_middleware(mut router: Router, chain: &[Middleware], settings: &Settings) -> Router {
    // Router::layer wraps everything added before it, so the first entry goes on last.
    for middleware in chain.iter().rev() {
        debug!(%middleware, "Applying middleware");
        router = match middleware {
            Middleware::Security => router
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::REFERRER_POLICY,
                    HeaderValue::from_static("same-origin"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_FRAME_OPTIONS,
                    HeaderValue::from_static("DENY"),
                ))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                )),
            Middleware::AllowedHosts => {
                let hosts = Arc::new(AllowedHosts::new(&settings.allowed_hosts));
                router.layer(from_fn_with_state(hosts, check_host))
            }
            Middleware::Trace => router.layer(TraceLayer::new_for_http()),
        };
    }
    router
}

async fn check_host(State(hosts): State<Arc<AllowedHosts>>, request: Request, next: Next) -> Response {
    let host = request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(ToOwned::to_owned)
        .or_else(|| request.uri().authority().map(|authority| authority.as_str().to_owned()));

    match host {
        Some(host) if hosts.is_allowed(&host) => next.run(request).await,
        host => {
            warn!(host = host.as_deref().unwrap_or("<none>"), allowed = %hosts, "Rejected request host");
            (StatusCode::BAD_REQUEST, "Bad Request: invalid Host header").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use tower::ServiceExt;

    fn settings(hosts: &[&str], middleware: &[&str]) -> Settings {
        let mut settings = Settings::default();
        settings.allowed_hosts = hosts.iter().map(|h| (*h).to_owned()).collect();
        settings.middleware = middleware.iter().map(|m| (*m).to_owned()).collect();
        settings
    }

    fn app(settings: &Settings) -> Router {
        let chain = middleware_chain(settings).expect("chain");
        apply_middleware(Router::new().route("/", get(|| async { "ok" })), &chain, settings)
    }

    fn request(host: &str) -> Request {
        axum::http::Request::builder()
            .uri("/")
            .header(header::HOST, host)
            .body(Body::empty())
            .expect("request")
    }

    #[test]
    fn default_chain_parses_in_order() {
        let chain = middleware_chain(&Settings::default()).expect("chain");
        assert_eq!(chain, [Middleware::Security, Middleware::AllowedHosts, Middleware::Trace]);
    }

    #[test]
    fn unknown_middleware_is_rejected() {
        let err = middleware_chain(&settings(&[], &["security", "csrf"])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("csrf"));
    }

    #[tokio::test]
    async fn security_headers_are_added() {
        let app = app(&settings(&["localhost"], &["security"]));
        let response = app.oneshot(request("localhost")).await.expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[header::REFERRER_POLICY], "same-origin");
    }

    #[tokio::test]
    async fn foreign_hosts_are_rejected() {
        let settings = settings(&["quill.onrender.com"], &["allowed_hosts"]);

        let ok = app(&settings).oneshot(request("quill.onrender.com:443")).await.expect("response");
        assert_eq!(ok.status(), StatusCode::OK);

        let rejected = app(&settings).oneshot(request("evil.example")).await.expect("response");
        assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn security_headers_wrap_host_rejections() {
        let app = app(&settings(&["localhost"], &["security", "allowed_hosts"]));
        let response = app.oneshot(request("evil.example")).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[header::X_FRAME_OPTIONS], "DENY");
    }
}
