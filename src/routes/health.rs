use axum::response::IntoResponse;
use utoipa_axum::router::OpenApiRouter;

use crate::app::{app_error::StdResponse, app_state::AppState};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(utoipa_axum::routes!(ping))
}

/// Liveness check. Does not touch the database.
#[utoipa::path(
    get,
    path = "/ping",
    tags = ["Health"],
    responses(
        (status = 200, description = "Service is up", body = StdResponse<String, String>)
    )
)]
async fn ping() -> impl IntoResponse {
    StdResponse {
        data: Some("pong"),
        message: Some("OK"),
    }
}
