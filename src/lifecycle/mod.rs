//! Order lifecycle transitions.
//!
//! Every operation runs in one transaction and starts by locking the order row,
//! so concurrent requests against the same order are applied one after another.
//! Rows that must exist at most once (preparation per answer, delivery per order)
//! are inserted with `ON CONFLICT DO NOTHING` and read back.

pub mod status;
pub mod validation;

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Duration, Utc};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper, dsl::sum};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use serde::Serialize;
use tracing::info;
use utoipa::ToSchema;

use crate::{
    app::{aliases::DieselError, app_error::AppError},
    identity,
    models::{
        CreateDeliveryEntity, CreateEndUserEntity, CreateNotificationEntity,
        CreateOrderAnswerEntity, CreateOrderEntity, CreateOrderProductEntity,
        CreatePreparationEntity, CreatePreparationStepEntity, DeliveryEntity, EndUserEntity,
        OrderAnswerEntity, OrderEntity, OrderProductEntity, PreparationEntity,
        PreparationStepEntity, ProductEntity,
    },
    schema::{
        deliveries, end_users, notifications, order_answers, order_products, orders,
        preparation_steps, preparations, products,
    },
};
use status::{AnswerStatus, PreparationStatus};
use validation::{ValidatedLine, effective_projection};

const PICKUP_LEAD_MINUTES: i64 = 5;
const DELIVERY_LEAD_MINUTES: i64 = 15;

/// Estimated pickup and delivery times for a delivery created at `now`.
pub fn delivery_estimates(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        now + Duration::minutes(PICKUP_LEAD_MINUTES),
        now + Duration::minutes(DELIVERY_LEAD_MINUTES),
    )
}

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct PlacedLine {
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: i32,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct PlacedOrder {
    pub order: OrderEntity,
    pub end_user_id: i32,
    pub items: Vec<PlacedLine>,
}

#[derive(Serialize, ToSchema, Debug)]
pub struct RecordedStep {
    pub preparation_id: i32,
    pub step: PreparationStepEntity,
    pub delivery: Option<DeliveryEntity>,
    pub order_cancelled: bool,
    pub total_delay_minutes: i64,
}

/// Creates an end user, the order and all of its lines. Nothing is written when any product is missing.
pub async fn place_order(
    conn: &mut AsyncPgConnection,
    lines: Vec<ValidatedLine>,
    now: DateTime<Utc>,
) -> Result<PlacedOrder, AppError> {
    conn.transaction(move |conn| {
        Box::pin(async move {
            let product_ids: Vec<i32> = lines.iter().map(|line| line.product_id).collect();
            let catalog: HashMap<i32, ProductEntity> = products::table
                .filter(products::id.eq_any(&product_ids))
                .select(ProductEntity::as_select())
                .load(conn)
                .await?
                .into_iter()
                .map(|product| (product.id, product))
                .collect();

            if let Some(missing) = lines
                .iter()
                .find(|line| !catalog.contains_key(&line.product_id))
            {
                return Err(AppError::NotFoundResource(format!(
                    "Product not found: {}",
                    missing.product_id
                )));
            }

            let end_user: EndUserEntity = diesel::insert_into(end_users::table)
                .values(CreateEndUserEntity { created_at: now })
                .returning(EndUserEntity::as_returning())
                .get_result(conn)
                .await?;

            let order: OrderEntity = diesel::insert_into(orders::table)
                .values(CreateOrderEntity {
                    end_user_id: end_user.id,
                    created_at: now,
                })
                .returning(OrderEntity::as_returning())
                .get_result(conn)
                .await?;

            let new_lines: Vec<CreateOrderProductEntity> = lines
                .iter()
                .map(|line| CreateOrderProductEntity {
                    order_id: order.id,
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_price: line
                        .unit_price
                        .unwrap_or_else(|| catalog[&line.product_id].price),
                    created_at: now,
                })
                .collect();

            let inserted: Vec<OrderProductEntity> = diesel::insert_into(order_products::table)
                .values(new_lines)
                .returning(OrderProductEntity::as_returning())
                .get_results(conn)
                .await?;

            let restaurant_ids: BTreeSet<i32> = catalog
                .values()
                .map(|product| product.restaurant_id)
                .collect();
            let new_notifications: Vec<CreateNotificationEntity> = restaurant_ids
                .into_iter()
                .map(|restaurant_id| CreateNotificationEntity {
                    restaurant_id,
                    message: format!("New order #{}", order.id),
                    created_at: now,
                })
                .collect();
            diesel::insert_into(notifications::table)
                .values(new_notifications)
                .execute(conn)
                .await?;

            let items = inserted
                .into_iter()
                .map(|line| PlacedLine {
                    product_name: catalog[&line.product_id].name.clone(),
                    product_id: line.product_id,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
                .collect();

            info!("Order #{} has been placed", order.id);

            Ok::<PlacedOrder, AppError>(PlacedOrder {
                end_user_id: end_user.id,
                order,
                items,
            })
        })
    })
    .await
}

/// Marks the order cancelled. Calling it on an already cancelled order succeeds without changes.
pub async fn cancel_order(
    conn: &mut AsyncPgConnection,
    restaurant_id: i32,
    order_id: i32,
    now: DateTime<Utc>,
) -> Result<OrderEntity, AppError> {
    conn.transaction(move |conn| {
        Box::pin(async move {
            let order = lock_order(conn, order_id).await?;
            identity::ensure_order_belongs_to(conn, order.id, restaurant_id).await?;

            let (order, changed) = mark_cancelled(conn, order, now).await?;
            if changed {
                notify(
                    conn,
                    restaurant_id,
                    format!("Order #{} was cancelled", order.id),
                    now,
                )
                .await?;
            }

            Ok::<OrderEntity, AppError>(order)
        })
    })
    .await
}

/// Records a decision on the order. Answers accumulate; the latest acceptance is authoritative.
pub async fn answer_order(
    conn: &mut AsyncPgConnection,
    restaurant_id: i32,
    order_id: i32,
    decision: AnswerStatus,
    projected_minutes: Option<i32>,
    now: DateTime<Utc>,
) -> Result<OrderAnswerEntity, AppError> {
    conn.transaction(move |conn| {
        Box::pin(async move {
            let order = lock_order(conn, order_id).await?;
            identity::ensure_order_belongs_to(conn, order.id, restaurant_id).await?;
            ensure_not_cancelled(&order)?;

            let answer: OrderAnswerEntity = diesel::insert_into(order_answers::table)
                .values(CreateOrderAnswerEntity {
                    order_id: order.id,
                    status: decision,
                    projected_preparation_time_minutes: effective_projection(
                        decision,
                        projected_minutes,
                    ),
                    created_at: now,
                })
                .returning(OrderAnswerEntity::as_returning())
                .get_result(conn)
                .await?;

            info!("Order #{} has been {}", order.id, decision);

            Ok::<OrderAnswerEntity, AppError>(answer)
        })
    })
    .await
}

/// Appends a kitchen step under the authoritative answer and applies its side effect.
pub async fn record_preparation_step(
    conn: &mut AsyncPgConnection,
    restaurant_id: i32,
    order_id: i32,
    status: PreparationStatus,
    delay_minutes: i32,
    now: DateTime<Utc>,
) -> Result<RecordedStep, AppError> {
    if delay_minutes < 0 {
        return Err(AppError::BadRequest("delay_minutes must be >= 0".into()));
    }

    conn.transaction(move |conn| {
        Box::pin(async move {
            let order = lock_order(conn, order_id).await?;
            identity::ensure_order_belongs_to(conn, order.id, restaurant_id).await?;
            ensure_not_cancelled(&order)?;

            let answer = latest_accepted_answer(conn, order.id)
                .await?
                .ok_or_else(|| {
                    AppError::Conflict("Order is not in progress (no accepted answer)".into())
                })?;

            let preparation = ensure_preparation(conn, answer.id, now).await?;

            let step: PreparationStepEntity = diesel::insert_into(preparation_steps::table)
                .values(CreatePreparationStepEntity {
                    preparation_id: preparation.id,
                    status,
                    delay_minutes,
                    created_at: now,
                })
                .returning(PreparationStepEntity::as_returning())
                .get_result(conn)
                .await?;

            let (delivery, order_cancelled) = match status {
                PreparationStatus::Delayed => (find_delivery(conn, order.id).await?, false),
                PreparationStatus::Done => (Some(ensure_delivery(conn, order.id, now).await?), false),
                PreparationStatus::Cancelled => {
                    let (order, changed) = mark_cancelled(conn, order, now).await?;
                    if changed {
                        notify(
                            conn,
                            restaurant_id,
                            format!("Order #{} was cancelled during preparation", order.id),
                            now,
                        )
                        .await?;
                    }
                    (find_delivery(conn, order.id).await?, order.is_cancelled)
                }
            };

            let total_delay_minutes = total_delay_minutes(conn, answer.id).await?;

            info!(
                "Order #{} preparation step {} recorded (total delay {} min)",
                order_id, status, total_delay_minutes
            );

            Ok::<RecordedStep, AppError>(RecordedStep {
                preparation_id: preparation.id,
                step,
                delivery,
                order_cancelled,
                total_delay_minutes,
            })
        })
    })
    .await
}

/// Marks the order's delivery as picked up. Repeated calls keep the first pickup time.
pub async fn confirm_pickup(
    conn: &mut AsyncPgConnection,
    restaurant_id: i32,
    order_id: i32,
    now: DateTime<Utc>,
) -> Result<DeliveryEntity, AppError> {
    conn.transaction(move |conn| {
        Box::pin(async move {
            let order = lock_order(conn, order_id).await?;
            identity::ensure_order_belongs_to(conn, order.id, restaurant_id).await?;
            ensure_not_cancelled(&order)?;

            let delivery = find_delivery(conn, order.id)
                .await?
                .ok_or_else(|| AppError::Conflict("Order is not ready for pickup".into()))?;

            if delivery.has_been_picked_up {
                return Ok(delivery);
            }

            let delivery: DeliveryEntity = diesel::update(deliveries::table.find(delivery.id))
                .set((
                    deliveries::has_been_picked_up.eq(true),
                    deliveries::picked_up_at.eq(now),
                ))
                .returning(DeliveryEntity::as_returning())
                .get_result(conn)
                .await?;

            info!("Order #{} has been picked up", order.id);

            Ok::<DeliveryEntity, AppError>(delivery)
        })
    })
    .await
}

async fn lock_order(conn: &mut AsyncPgConnection, order_id: i32) -> Result<OrderEntity, AppError> {
    orders::table
        .find(order_id)
        .select(OrderEntity::as_select())
        .for_update()
        .get_result(conn)
        .await
        .map_err(|err| match err {
            DieselError::NotFound => {
                AppError::NotFoundResource(format!("Order not found: {}", order_id))
            }
            err => err.into(),
        })
}

fn ensure_not_cancelled(order: &OrderEntity) -> Result<(), AppError> {
    if order.is_cancelled {
        return Err(AppError::Conflict(format!(
            "Order #{} has been cancelled",
            order.id
        )));
    }
    Ok(())
}

/// Returns the order and whether this call was the one that cancelled it.
async fn mark_cancelled(
    conn: &mut AsyncPgConnection,
    order: OrderEntity,
    now: DateTime<Utc>,
) -> Result<(OrderEntity, bool), AppError> {
    if order.is_cancelled {
        return Ok((order, false));
    }

    let order: OrderEntity = diesel::update(orders::table.find(order.id))
        .set((
            orders::is_cancelled.eq(true),
            orders::cancelled_at.eq(now),
        ))
        .returning(OrderEntity::as_returning())
        .get_result(conn)
        .await?;

    info!("Order #{} has been cancelled", order.id);

    Ok((order, true))
}

async fn latest_accepted_answer(
    conn: &mut AsyncPgConnection,
    order_id: i32,
) -> Result<Option<OrderAnswerEntity>, AppError> {
    let answer = order_answers::table
        .filter(order_answers::order_id.eq(order_id))
        .filter(order_answers::status.eq(AnswerStatus::Accepted))
        .order_by((order_answers::created_at.desc(), order_answers::id.desc()))
        .select(OrderAnswerEntity::as_select())
        .first(conn)
        .await
        .optional()?;

    Ok(answer)
}

async fn ensure_preparation(
    conn: &mut AsyncPgConnection,
    order_answer_id: i32,
    now: DateTime<Utc>,
) -> Result<PreparationEntity, AppError> {
    diesel::insert_into(preparations::table)
        .values(CreatePreparationEntity {
            order_answer_id,
            created_at: now,
        })
        .on_conflict(preparations::order_answer_id)
        .do_nothing()
        .execute(conn)
        .await?;

    let preparation = preparations::table
        .filter(preparations::order_answer_id.eq(order_answer_id))
        .select(PreparationEntity::as_select())
        .get_result(conn)
        .await?;

    Ok(preparation)
}

async fn find_delivery(
    conn: &mut AsyncPgConnection,
    order_id: i32,
) -> Result<Option<DeliveryEntity>, AppError> {
    let delivery = deliveries::table
        .filter(deliveries::order_id.eq(order_id))
        .select(DeliveryEntity::as_select())
        .get_result(conn)
        .await
        .optional()?;

    Ok(delivery)
}

/// Creates the delivery on the first DONE step. Existing estimates are left untouched.
async fn ensure_delivery(
    conn: &mut AsyncPgConnection,
    order_id: i32,
    now: DateTime<Utc>,
) -> Result<DeliveryEntity, AppError> {
    let (estimated_pickup_time, estimated_delivery_time) = delivery_estimates(now);

    let created = diesel::insert_into(deliveries::table)
        .values(CreateDeliveryEntity {
            order_id,
            estimated_pickup_time,
            estimated_delivery_time,
            created_at: now,
        })
        .on_conflict(deliveries::order_id)
        .do_nothing()
        .execute(conn)
        .await?;

    if created > 0 {
        info!("Delivery for Order #{} has been scheduled", order_id);
    }

    find_delivery(conn, order_id)
        .await?
        .ok_or_else(|| AppError::Other(anyhow::anyhow!("Delivery for order #{} vanished", order_id)))
}

/// Sum of delay minutes over every step of every preparation under the answer.
async fn total_delay_minutes(
    conn: &mut AsyncPgConnection,
    order_answer_id: i32,
) -> Result<i64, AppError> {
    let total: Option<i64> = preparation_steps::table
        .inner_join(preparations::table)
        .filter(preparations::order_answer_id.eq(order_answer_id))
        .select(sum(preparation_steps::delay_minutes))
        .get_result(conn)
        .await?;

    Ok(total.unwrap_or(0))
}

async fn notify(
    conn: &mut AsyncPgConnection,
    restaurant_id: i32,
    message: String,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    diesel::insert_into(notifications::table)
        .values(CreateNotificationEntity {
            restaurant_id,
            message,
            created_at: now,
        })
        .execute(conn)
        .await?;
    Ok(())
}
