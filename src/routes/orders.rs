use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::Value;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, StaffId},
    },
    board::{
        self,
        view::{OrderBoard, OrderView},
    },
    identity,
    lifecycle::{
        self, RecordedStep,
        validation::{
            parse_decision, parse_preparation_status, parse_projected_minutes,
            validate_delay_minutes,
        },
    },
    models::{DeliveryEntity, OrderAnswerEntity, OrderEntity},
};

/// Staff-facing order routes: the kitchen board and every lifecycle transition.
pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/orders",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_orders))
            .routes(utoipa_axum::routes!(get_order))
            .routes(utoipa_axum::routes!(cancel_order))
            .routes(utoipa_axum::routes!(answer_order))
            .routes(utoipa_axum::routes!(record_preparation_step))
            .routes(utoipa_axum::routes!(confirm_pickup))
            .route_layer(axum::middleware::from_fn(middleware::staff_authorization)),
    )
}

/// Fetch the order board of the caller's restaurant.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Orders"],
    security(("staffId" = [])),
    responses(
        (status = 200, description = "Get orders successfully", body = StdResponse<OrderBoard, String>),
        (status = 404, description = "Caller is not linked to a restaurant")
    )
)]
async fn get_orders(
    State(state): State<AppState>,
    Extension(staff_id): Extension<StaffId>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let staff = identity::resolve(conn, staff_id).await?;
    let board = board::load_board(conn, staff.restaurant_id()).await?;

    Ok(StdResponse {
        data: Some(board),
        message: Some("Get orders successfully"),
    })
}

/// Fetch a single order of the caller's restaurant.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Orders"],
    security(("staffId" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to fetch")
    ),
    responses(
        (status = 200, description = "Get order successfully", body = StdResponse<OrderView, String>),
        (status = 403, description = "Order belongs to another restaurant"),
        (status = 404, description = "Order not found")
    )
)]
async fn get_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(staff_id): Extension<StaffId>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let staff = identity::resolve(conn, staff_id).await?;
    let order = board::load_order(conn, staff.restaurant_id(), id).await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Get order successfully"),
    })
}

/// Cancel an order. Cancelling twice is not an error.
#[utoipa::path(
    post,
    path = "/{id}/cancel",
    tags = ["Orders"],
    security(("staffId" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to cancel")
    ),
    responses(
        (status = 200, description = "Cancelled order successfully", body = StdResponse<OrderEntity, String>),
        (status = 403, description = "Order belongs to another restaurant"),
        (status = 404, description = "Order not found")
    )
)]
async fn cancel_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(staff_id): Extension<StaffId>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let staff = identity::resolve(conn, staff_id).await?;
    let order = lifecycle::cancel_order(conn, staff.restaurant_id(), id, state.clock.now()).await?;

    Ok(StdResponse {
        data: Some(order),
        message: Some("Cancelled order successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct AnswerOrderReq {
    /// `ACCEPT` or `REJECT`.
    decision: Option<String>,
    /// Kept only for acceptances; negative or non-numeric values are ignored.
    #[schema(value_type = Option<i32>)]
    projected_preparation_time_minutes: Option<Value>,
}

/// Accept or reject an order.
#[utoipa::path(
    post,
    path = "/{id}/answers",
    tags = ["Orders"],
    security(("staffId" = [])),
    params(
        ("id" = i32, Path, description = "Order ID to answer")
    ),
    request_body = AnswerOrderReq,
    responses(
        (status = 201, description = "Answered order successfully", body = StdResponse<OrderAnswerEntity, String>),
        (status = 400, description = "Invalid decision"),
        (status = 403, description = "Order belongs to another restaurant"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order has been cancelled")
    )
)]
async fn answer_order(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(staff_id): Extension<StaffId>,
    body: Result<Json<AnswerOrderReq>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body?;
    let decision = parse_decision(body.decision.as_deref())?;
    let projected_minutes = parse_projected_minutes(body.projected_preparation_time_minutes.as_ref());

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let staff = identity::resolve(conn, staff_id).await?;
    let answer = lifecycle::answer_order(
        conn,
        staff.restaurant_id(),
        id,
        decision,
        projected_minutes,
        state.clock.now(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(answer),
            message: Some("Answered order successfully"),
        },
    ))
}

#[derive(Deserialize, ToSchema)]
struct RecordPreparationStepReq {
    /// `DELAYED`, `DONE` or `CANCELLED`.
    status: Option<String>,
    /// Defaults to 0.
    delay_minutes: Option<i32>,
}

/// Record a kitchen preparation step for an accepted order.
#[utoipa::path(
    post,
    path = "/{id}/preparation-steps",
    tags = ["Orders"],
    security(("staffId" = [])),
    params(
        ("id" = i32, Path, description = "Order ID being prepared")
    ),
    request_body = RecordPreparationStepReq,
    responses(
        (status = 201, description = "Recorded preparation step successfully", body = StdResponse<RecordedStep, String>),
        (status = 400, description = "Invalid status or delay"),
        (status = 403, description = "Order belongs to another restaurant"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order has no accepted answer or has been cancelled")
    )
)]
async fn record_preparation_step(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(staff_id): Extension<StaffId>,
    body: Result<Json<RecordPreparationStepReq>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body?;
    let status = parse_preparation_status(body.status.as_deref())?;
    let delay_minutes = validate_delay_minutes(body.delay_minutes)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let staff = identity::resolve(conn, staff_id).await?;
    let recorded = lifecycle::record_preparation_step(
        conn,
        staff.restaurant_id(),
        id,
        status,
        delay_minutes,
        state.clock.now(),
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        StdResponse {
            data: Some(recorded),
            message: Some("Recorded preparation step successfully"),
        },
    ))
}

/// Confirm that the courier picked the order up.
#[utoipa::path(
    post,
    path = "/{id}/pickup",
    tags = ["Orders"],
    security(("staffId" = [])),
    params(
        ("id" = i32, Path, description = "Order ID picked up")
    ),
    responses(
        (status = 200, description = "Confirmed pickup successfully", body = StdResponse<DeliveryEntity, String>),
        (status = 403, description = "Order belongs to another restaurant"),
        (status = 404, description = "Order not found"),
        (status = 409, description = "Order is not ready for pickup")
    )
)]
async fn confirm_pickup(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(staff_id): Extension<StaffId>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let staff = identity::resolve(conn, staff_id).await?;
    let delivery =
        lifecycle::confirm_pickup(conn, staff.restaurant_id(), id, state.clock.now()).await?;

    Ok(StdResponse {
        data: Some(delivery),
        message: Some("Confirmed pickup successfully"),
    })
}
