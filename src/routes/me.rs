use anyhow::Context;
use axum::{Extension, extract::State, response::IntoResponse};
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, StaffId},
    },
    identity,
};

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/me",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_me))
            .route_layer(axum::middleware::from_fn(middleware::staff_authorization)),
    )
}

#[derive(Serialize, ToSchema, Debug)]
struct MeRes {
    id: i32,
    username: String,
    email: String,
    is_admin: bool,
    restaurant_id: Option<i32>,
    restaurant_name: Option<String>,
}

/// The calling staff account. Works for accounts not yet linked to a restaurant.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Me"],
    security(("staffId" = [])),
    responses(
        (status = 200, description = "Get current staff successfully", body = StdResponse<MeRes, String>),
        (status = 401, description = "Unknown staff account")
    )
)]
async fn get_me(
    State(state): State<AppState>,
    Extension(staff_id): Extension<StaffId>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let staff = identity::find_staff(conn, staff_id).await?;
    let restaurant = identity::find_restaurant_of(conn, staff_id).await?;

    let (restaurant_id, restaurant_name) = match restaurant {
        Some(restaurant) => (Some(restaurant.id), Some(restaurant.name)),
        None => (None, None),
    };

    Ok(StdResponse {
        data: Some(MeRes {
            id: staff.id,
            username: staff.username,
            email: staff.email,
            is_admin: staff.is_admin,
            restaurant_id,
            restaurant_name,
        }),
        message: Some("Get current staff successfully"),
    })
}
