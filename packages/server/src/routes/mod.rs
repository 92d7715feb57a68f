use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn api_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let upload = OpenApiRouter::new()
        .routes(routes!(handlers::picture::upload_picture))
        .layer(handlers::picture::upload_body_limit(
            config.storage.max_blob_size,
        ));

    let picture = OpenApiRouter::new().routes(routes!(
        handlers::picture::get_picture,
        handlers::picture::fetch_picture
    ));

    upload.merge(picture)
}
