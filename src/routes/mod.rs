pub mod customers;
pub mod health;
pub mod me;
pub mod notifications;
pub mod orders;
pub mod products;
pub mod restaurant;

use axum::Router;
use utoipa_axum::router::OpenApiRouter;

use crate::app::{app_state::AppState, swagger};

/// Every route of the service, with its OpenAPI description.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    health::routes_with_openapi()
        .merge(me::routes_with_openapi())
        .merge(products::routes_with_openapi())
        .merge(customers::orders::routes_with_openapi())
        .merge(orders::routes_with_openapi())
        .merge(restaurant::routes_with_openapi())
        .merge(notifications::routes_with_openapi())
}

/// The API router with Swagger UI mounted next to it. State is supplied by the caller.
pub fn app() -> Router<AppState> {
    let (router, mut openapi) = routes_with_openapi().split_for_parts();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("Restaurant OrderService API")
        .version("1.0.0")
        .build();

    router.merge(swagger::create_swagger_ui(openapi))
}
