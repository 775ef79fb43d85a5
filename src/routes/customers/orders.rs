use anyhow::Context;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
    },
    lifecycle::{
        self, PlacedOrder,
        validation::{OrderLineInput, validate_order_lines},
    },
};

/// Customer-facing order routes. The customer frontend carries no staff identity.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/customers/orders",
        OpenApiRouter::new().routes(utoipa_axum::routes!(place_order)),
    )
}

#[derive(Deserialize, ToSchema)]
struct PlaceOrderReq {
    #[serde(default)]
    products: Vec<OrderLineInput>,
}

/// Place a new order. All lines are checked before anything is written.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Customer Orders"],
    request_body = PlaceOrderReq,
    responses(
        (status = 201, description = "Placed order successfully", body = StdResponse<PlacedOrder, String>),
        (status = 400, description = "Invalid order lines"),
        (status = 404, description = "Product not found"),
        (status = 409, description = "Same product listed twice")
    )
)]
async fn place_order(
    State(state): State<AppState>,
    body: Result<Json<PlaceOrderReq>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body?;
    let lines = validate_order_lines(&body.products)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let placed = lifecycle::place_order(conn, lines, state.clock.now()).await?;

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(placed),
            message: Some("Placed order successfully"),
        },
    ))
}
