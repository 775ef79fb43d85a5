use chrono::{DateTime, Utc};
use diesel::{
    Selectable,
    prelude::{AsChangeset, Associations, Identifiable, Insertable, Queryable},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::lifecycle::status::{AnswerStatus, PreparationStatus};

// Restaurants & staff

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::restaurants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RestaurantEntity {
    pub id: i32,
    pub name: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::restaurants)]
pub struct CreateRestaurantEntity {
    pub name: String,
    pub address: String,
    pub created_at: DateTime<Utc>,
}

/// Partial restaurant update; `None` fields are left untouched.
#[derive(AsChangeset, Debug, Default)]
#[diesel(table_name = crate::schema::restaurants)]
pub struct UpdateRestaurantEntity {
    pub name: Option<String>,
    pub address: Option<String>,
}

impl UpdateRestaurantEntity {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.address.is_none()
    }
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::staff_accounts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StaffAccountEntity {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::staff_accounts)]
pub struct CreateStaffAccountEntity {
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Debug, Clone)]
#[diesel(belongs_to(RestaurantEntity, foreign_key = restaurant_id))]
#[diesel(belongs_to(StaffAccountEntity, foreign_key = staff_id))]
#[diesel(table_name = crate::schema::staff_restaurants)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct StaffRestaurantEntity {
    pub id: i32,
    pub staff_id: i32,
    pub restaurant_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::staff_restaurants)]
pub struct CreateStaffRestaurantEntity {
    pub staff_id: i32,
    pub restaurant_id: i32,
    pub created_at: DateTime<Utc>,
}

// Products

#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Debug, Clone, ToSchema)]
#[diesel(belongs_to(RestaurantEntity, foreign_key = restaurant_id))]
#[diesel(table_name = crate::schema::products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductEntity {
    pub id: i32,
    pub restaurant_id: i32,
    pub name: String,
    pub description: String,
    pub price: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::products)]
pub struct CreateProductEntity {
    pub restaurant_id: i32,
    pub name: String,
    pub description: String,
    pub price: i32,
    pub created_at: DateTime<Utc>,
}

// Orders

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug)]
#[diesel(table_name = crate::schema::end_users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EndUserEntity {
    pub id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::end_users)]
pub struct CreateEndUserEntity {
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Serialize, Debug, Clone, ToSchema)]
#[diesel(table_name = crate::schema::orders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderEntity {
    pub id: i32,
    pub end_user_id: i32,
    pub is_cancelled: bool,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::orders)]
pub struct CreateOrderEntity {
    pub end_user_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Debug, Clone, ToSchema)]
#[diesel(belongs_to(OrderEntity, foreign_key = order_id))]
#[diesel(table_name = crate::schema::order_products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderProductEntity {
    pub id: i32,
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub unit_price: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::order_products)]
pub struct CreateOrderProductEntity {
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub unit_price: i32,
    pub created_at: DateTime<Utc>,
}

// Lifecycle

#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Debug, Clone, ToSchema)]
#[diesel(belongs_to(OrderEntity, foreign_key = order_id))]
#[diesel(table_name = crate::schema::order_answers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderAnswerEntity {
    pub id: i32,
    pub order_id: i32,
    pub status: AnswerStatus,
    pub projected_preparation_time_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::order_answers)]
pub struct CreateOrderAnswerEntity {
    pub order_id: i32,
    pub status: AnswerStatus,
    pub projected_preparation_time_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Debug, Clone, ToSchema)]
#[diesel(belongs_to(OrderAnswerEntity, foreign_key = order_answer_id))]
#[diesel(table_name = crate::schema::preparations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PreparationEntity {
    pub id: i32,
    pub order_answer_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::preparations)]
pub struct CreatePreparationEntity {
    pub order_answer_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Debug, Clone, ToSchema)]
#[diesel(belongs_to(PreparationEntity, foreign_key = preparation_id))]
#[diesel(table_name = crate::schema::preparation_steps)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PreparationStepEntity {
    pub id: i32,
    pub preparation_id: i32,
    pub status: PreparationStatus,
    pub delay_minutes: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::preparation_steps)]
pub struct CreatePreparationStepEntity {
    pub preparation_id: i32,
    pub status: PreparationStatus,
    pub delay_minutes: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Debug, Clone, ToSchema)]
#[diesel(belongs_to(OrderEntity, foreign_key = order_id))]
#[diesel(table_name = crate::schema::deliveries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DeliveryEntity {
    pub id: i32,
    pub order_id: i32,
    pub estimated_pickup_time: DateTime<Utc>,
    pub estimated_delivery_time: DateTime<Utc>,
    pub has_been_picked_up: bool,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::deliveries)]
pub struct CreateDeliveryEntity {
    pub order_id: i32,
    pub estimated_pickup_time: DateTime<Utc>,
    pub estimated_delivery_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// Notifications

#[derive(Queryable, Selectable, Identifiable, Associations, Serialize, Debug, Clone, ToSchema)]
#[diesel(belongs_to(RestaurantEntity, foreign_key = restaurant_id))]
#[diesel(table_name = crate::schema::notifications)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NotificationEntity {
    pub id: i32,
    pub restaurant_id: i32,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = crate::schema::notifications)]
pub struct CreateNotificationEntity {
    pub restaurant_id: i32,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
