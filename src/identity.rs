use anyhow::Context;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper, dsl::exists};
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::{
    app::{app_error::AppError, middleware::StaffId},
    models::{RestaurantEntity, StaffAccountEntity},
    schema::{order_products, products, restaurants, staff_accounts, staff_restaurants},
};

/// The authenticated staff account together with the restaurant it operates.
#[derive(Debug, Clone)]
pub struct StaffContext {
    pub staff: StaffAccountEntity,
    pub restaurant: RestaurantEntity,
}

impl StaffContext {
    pub fn restaurant_id(&self) -> i32 {
        self.restaurant.id
    }

    pub fn is_admin(&self) -> bool {
        self.staff.is_admin
    }
}

/// Loads the caller's account. An id the gateway vouched for but we do not know is treated as unauthenticated.
pub async fn find_staff(
    conn: &mut AsyncPgConnection,
    staff_id: StaffId,
) -> Result<StaffAccountEntity, AppError> {
    staff_accounts::table
        .find(staff_id.0)
        .select(StaffAccountEntity::as_select())
        .get_result(conn)
        .await
        .optional()
        .context("Failed to get staff account")?
        .ok_or(AppError::Unauthorized)
}

pub async fn find_restaurant_of(
    conn: &mut AsyncPgConnection,
    staff_id: StaffId,
) -> Result<Option<RestaurantEntity>, AppError> {
    let restaurant = staff_restaurants::table
        .inner_join(restaurants::table)
        .filter(staff_restaurants::staff_id.eq(staff_id.0))
        .select(RestaurantEntity::as_select())
        .first(conn)
        .await
        .optional()
        .context("Failed to get staff restaurant")?;

    Ok(restaurant)
}

/// Resolves the caller into a [`StaffContext`]; fails with NotFound when the account is not linked to a restaurant.
pub async fn resolve(
    conn: &mut AsyncPgConnection,
    staff_id: StaffId,
) -> Result<StaffContext, AppError> {
    let staff = find_staff(conn, staff_id).await?;
    let restaurant = find_restaurant_of(conn, staff_id).await?.ok_or_else(|| {
        AppError::NotFoundResource("User is not linked to any restaurant".into())
    })?;

    Ok(StaffContext { staff, restaurant })
}

/// An order belongs to a restaurant when at least one of its lines is one of the restaurant's products.
pub async fn order_belongs_to(
    conn: &mut AsyncPgConnection,
    order_id: i32,
    restaurant_id: i32,
) -> Result<bool, AppError> {
    let owned = diesel::select(exists(
        order_products::table
            .inner_join(products::table)
            .filter(order_products::order_id.eq(order_id))
            .filter(products::restaurant_id.eq(restaurant_id)),
    ))
    .get_result::<bool>(conn)
    .await
    .context("Failed to check order ownership")?;

    Ok(owned)
}

pub async fn ensure_order_belongs_to(
    conn: &mut AsyncPgConnection,
    order_id: i32,
    restaurant_id: i32,
) -> Result<(), AppError> {
    if order_belongs_to(conn, order_id, restaurant_id).await? {
        Ok(())
    } else {
        Err(AppError::ForbiddenResource(
            "Order does not belong to your restaurant".into(),
        ))
    }
}
