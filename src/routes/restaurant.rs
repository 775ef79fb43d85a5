use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    app::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, StaffId},
    },
    identity,
    models::{
        RestaurantEntity, StaffAccountEntity, StaffRestaurantEntity, UpdateRestaurantEntity,
    },
    schema::{restaurants, staff_accounts, staff_restaurants},
};

const MAX_NAME_LEN: usize = 200;
const MAX_ADDRESS_LEN: usize = 255;

pub fn routes_with_openapi() -> OpenApiRouter<AppState> {
    utoipa_axum::router::OpenApiRouter::new().nest(
        "/restaurant",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_restaurant, update_restaurant))
            .route_layer(axum::middleware::from_fn(middleware::staff_authorization)),
    )
}

#[derive(Serialize, ToSchema, Debug)]
struct EmployeeRes {
    staff_id: i32,
    username: String,
    email: String,
    is_admin: bool,
    joined_at: DateTime<Utc>,
}

#[derive(Serialize, ToSchema, Debug)]
struct GetRestaurantRes {
    restaurant: RestaurantEntity,
    is_admin: bool,
    employees: Vec<EmployeeRes>,
}

/// Fetch the caller's restaurant with its staff.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Restaurant"],
    security(("staffId" = [])),
    responses(
        (status = 200, description = "Get restaurant successfully", body = StdResponse<GetRestaurantRes, String>),
        (status = 404, description = "Caller is not linked to a restaurant")
    )
)]
async fn get_restaurant(
    State(state): State<AppState>,
    Extension(staff_id): Extension<StaffId>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let staff = identity::resolve(conn, staff_id).await?;

    let employees: Vec<(StaffRestaurantEntity, StaffAccountEntity)> = staff_restaurants::table
        .inner_join(staff_accounts::table)
        .filter(staff_restaurants::restaurant_id.eq(staff.restaurant_id()))
        .order_by((staff_restaurants::created_at.asc(), staff_restaurants::id.asc()))
        .select((
            StaffRestaurantEntity::as_select(),
            StaffAccountEntity::as_select(),
        ))
        .load(conn)
        .await
        .context("Failed to get restaurant employees")?;

    let employees = employees
        .into_iter()
        .map(|(link, account)| EmployeeRes {
            staff_id: account.id,
            username: account.username,
            email: account.email,
            is_admin: account.is_admin,
            joined_at: link.created_at,
        })
        .collect();

    let is_admin = staff.is_admin();
    Ok(StdResponse {
        data: Some(GetRestaurantRes {
            restaurant: staff.restaurant,
            is_admin,
            employees,
        }),
        message: Some("Get restaurant successfully"),
    })
}

#[derive(Deserialize, ToSchema, Default)]
struct UpdateRestaurantReq {
    name: Option<String>,
    address: Option<String>,
}

impl UpdateRestaurantReq {
    fn into_changeset(self) -> Result<UpdateRestaurantEntity, AppError> {
        let name = match self.name {
            Some(name) if name.trim().is_empty() => {
                return Err(AppError::BadRequest("Restaurant name cannot be empty".into()));
            }
            Some(name) if name.trim().chars().count() > MAX_NAME_LEN => {
                return Err(AppError::BadRequest(format!(
                    "Restaurant name must be at most {} characters",
                    MAX_NAME_LEN
                )));
            }
            name => name.map(|name| name.trim().to_string()),
        };

        if let Some(address) = &self.address {
            if address.chars().count() > MAX_ADDRESS_LEN {
                return Err(AppError::BadRequest(format!(
                    "Address must be at most {} characters",
                    MAX_ADDRESS_LEN
                )));
            }
        }

        Ok(UpdateRestaurantEntity {
            name,
            address: self.address,
        })
    }
}

/// Rename or move the caller's restaurant. Administrators only.
#[utoipa::path(
    patch,
    path = "/",
    tags = ["Restaurant"],
    security(("staffId" = [])),
    request_body = UpdateRestaurantReq,
    responses(
        (status = 200, description = "Updated restaurant successfully", body = StdResponse<RestaurantEntity, String>),
        (status = 400, description = "Invalid name or address"),
        (status = 403, description = "Caller is not an administrator")
    )
)]
async fn update_restaurant(
    State(state): State<AppState>,
    Extension(staff_id): Extension<StaffId>,
    body: Result<Json<UpdateRestaurantReq>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let staff = identity::resolve(conn, staff_id).await?;
    if !staff.is_admin() {
        return Err(AppError::ForbiddenResource(
            "Only administrators can update the restaurant".into(),
        ));
    }

    let Json(body) = body?;
    let changes = body.into_changeset()?;
    if changes.is_empty() {
        return Ok(StdResponse {
            data: Some(staff.restaurant),
            message: Some("Nothing to update"),
        });
    }

    let restaurant: RestaurantEntity = diesel::update(restaurants::table.find(staff.restaurant_id()))
        .set(&changes)
        .returning(RestaurantEntity::as_returning())
        .get_result(conn)
        .await?;

    tracing::info!("Restaurant {} updated by staff {}", restaurant.id, staff.staff.id);

    Ok(StdResponse {
        data: Some(restaurant),
        message: Some("Updated restaurant successfully"),
    })
}
