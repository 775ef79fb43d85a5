use anyhow::Context;
use axum::{
    Extension,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, StaffId},
    },
    identity,
    models::NotificationEntity,
    schema::notifications,
};

const NOTIFICATIONS_LIMIT: i64 = 50;

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/notifications",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_notifications))
            .routes(utoipa_axum::routes!(mark_notification_read))
            .route_layer(axum::middleware::from_fn(middleware::staff_authorization)),
    )
}

/// Fetch the 50 most recent notifications of the caller's restaurant.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Notifications"],
    security(("staffId" = [])),
    responses(
        (status = 200, description = "Get notifications successfully", body = StdResponse<Vec<NotificationEntity>, String>)
    )
)]
async fn get_notifications(
    State(state): State<AppState>,
    Extension(staff_id): Extension<StaffId>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let staff = identity::resolve(conn, staff_id).await?;

    let notifications: Vec<NotificationEntity> = notifications::table
        .filter(notifications::restaurant_id.eq(staff.restaurant_id()))
        .order_by((notifications::created_at.desc(), notifications::id.desc()))
        .limit(NOTIFICATIONS_LIMIT)
        .select(NotificationEntity::as_select())
        .load(conn)
        .await
        .context("Failed to get notifications")?;

    Ok(StdResponse {
        data: Some(notifications),
        message: Some("Get notifications successfully"),
    })
}

#[utoipa::path(
    post,
    path = "/{id}/read",
    tags = ["Notifications"],
    security(("staffId" = [])),
    params(
        ("id" = i32, Path, description = "Notification ID to mark as read")
    ),
    responses(
        (status = 200, description = "Marked notification as read", body = StdResponse<NotificationEntity, String>),
        (status = 404, description = "Notification not found")
    )
)]
async fn mark_notification_read(
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

    let notification: NotificationEntity = diesel::update(
        notifications::table
            .find(id)
            .filter(notifications::restaurant_id.eq(staff.restaurant_id())),
    )
    .set(notifications::read.eq(true))
    .returning(NotificationEntity::as_returning())
    .get_result(conn)
    .await
    .optional()
    .context("Failed to update notification")?
    .ok_or_else(|| AppError::NotFoundResource(format!("Notification not found: {}", id)))?;

    Ok(StdResponse {
        data: Some(notification),
        message: Some("Marked notification as read"),
    })
}
