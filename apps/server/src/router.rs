use anyhow::{Context, Result};
use axum::Router;
use quill::features::admin::Admin;
use quill::kernel::prelude::ApiState;
use quill::kernel::server::{apply_middleware, middleware_chain};
use quill::server::router::{admin_router, system_router};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable};

#[derive(OpenApi)]
#[openapi(info(title = "Quill", description = "Administrative API of the Quill blog"))]
struct ApiDoc;

#[allow(unreachable_pub)]
pub fn init(state: ApiState) -> Result<Router> {
    let settings = state.settings.clone();
    let chain = middleware_chain(&settings).context("Invalid middleware configuration")?;

    let mut routes = OpenApiRouter::with_openapi(ApiDoc::openapi()).merge(system_router());
    if state.get_slice::<Admin>().is_some() {
        routes = routes.merge(admin_router());
    }

    // Separate the OpenAPI routes and the API documentation object
    let (openapi_routes, api_doc) = routes.with_state(state).split_for_parts();

    let scalar_routes = Scalar::with_url("/api", api_doc);

    let app = Router::new().merge(openapi_routes).merge(scalar_routes);
    Ok(apply_middleware(app, &chain, &settings))
}
