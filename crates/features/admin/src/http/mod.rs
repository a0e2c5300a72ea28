mod handlers;

pub use handlers::{ModelInfo, SiteResponse};

use quill_kernel::server::ApiState;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

/// Admin routes, all under `/admin`.
pub fn router() -> OpenApiRouter<ApiState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::site_index))
        .routes(routes!(handlers::list_records, handlers::create_record))
        .routes(routes!(handlers::get_record, handlers::update_record, handlers::delete_record))
        .routes(routes!(handlers::upload_image, handlers::delete_image))
}
