pub mod view;

use std::collections::HashMap;

use anyhow::Context;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use crate::{
    app::app_error::AppError,
    identity,
    models::{
        DeliveryEntity, OrderAnswerEntity, OrderEntity, OrderProductEntity, PreparationEntity,
        PreparationStepEntity,
    },
    schema::{
        deliveries, order_answers, order_products, orders, preparation_steps, preparations,
        products,
    },
};
use view::{OrderBoard, OrderLineView, OrderSnapshot, OrderView, PreparationSnapshot};

/// Builds the order board for a restaurant from its non-cancelled orders.
pub async fn load_board(
    conn: &mut AsyncPgConnection,
    restaurant_id: i32,
) -> Result<OrderBoard, AppError> {
    let restaurant_order_ids = order_products::table
        .inner_join(products::table)
        .filter(products::restaurant_id.eq(restaurant_id))
        .select(order_products::order_id);

    let orders: Vec<OrderEntity> = orders::table
        .filter(orders::is_cancelled.eq(false))
        .filter(orders::id.eq_any(restaurant_order_ids))
        .order_by((orders::created_at.desc(), orders::id.desc()))
        .select(OrderEntity::as_select())
        .load(conn)
        .await
        .context("Failed to get restaurant orders")?;

    let snapshots = hydrate(conn, orders).await?;
    Ok(OrderBoard::from_snapshots(snapshots))
}

/// A single order of the restaurant, cancelled ones included.
pub async fn load_order(
    conn: &mut AsyncPgConnection,
    restaurant_id: i32,
    order_id: i32,
) -> Result<OrderView, AppError> {
    let order: OrderEntity = orders::table
        .find(order_id)
        .select(OrderEntity::as_select())
        .get_result(conn)
        .await?;
    identity::ensure_order_belongs_to(conn, order.id, restaurant_id).await?;

    let snapshot = hydrate(conn, vec![order])
        .await?
        .pop()
        .ok_or(AppError::NotFound)?;
    Ok(snapshot.view(true))
}

/// Loads lines, answers, preparations, steps and deliveries for the given orders, one query per table.
async fn hydrate(
    conn: &mut AsyncPgConnection,
    orders: Vec<OrderEntity>,
) -> Result<Vec<OrderSnapshot>, AppError> {
    let order_ids: Vec<i32> = orders.iter().map(|order| order.id).collect();

    let lines: Vec<(OrderProductEntity, String)> = order_products::table
        .inner_join(products::table)
        .filter(order_products::order_id.eq_any(&order_ids))
        .order_by(order_products::id.asc())
        .select((OrderProductEntity::as_select(), products::name))
        .load(conn)
        .await
        .context("Failed to get order lines")?;

    let answers: Vec<OrderAnswerEntity> = order_answers::table
        .filter(order_answers::order_id.eq_any(&order_ids))
        .order_by((order_answers::created_at.asc(), order_answers::id.asc()))
        .select(OrderAnswerEntity::as_select())
        .load(conn)
        .await
        .context("Failed to get order answers")?;

    let answer_ids: Vec<i32> = answers.iter().map(|answer| answer.id).collect();
    let preparations: Vec<PreparationEntity> = preparations::table
        .filter(preparations::order_answer_id.eq_any(&answer_ids))
        .select(PreparationEntity::as_select())
        .load(conn)
        .await
        .context("Failed to get preparations")?;

    let preparation_ids: Vec<i32> = preparations.iter().map(|prep| prep.id).collect();
    let steps: Vec<PreparationStepEntity> = preparation_steps::table
        .filter(preparation_steps::preparation_id.eq_any(&preparation_ids))
        .order_by((preparation_steps::created_at.asc(), preparation_steps::id.asc()))
        .select(PreparationStepEntity::as_select())
        .load(conn)
        .await
        .context("Failed to get preparation steps")?;

    let deliveries: Vec<DeliveryEntity> = deliveries::table
        .filter(deliveries::order_id.eq_any(&order_ids))
        .select(DeliveryEntity::as_select())
        .load(conn)
        .await
        .context("Failed to get deliveries")?;

    let mut lines_by_order: HashMap<i32, Vec<OrderLineView>> = HashMap::new();
    for (line, product_name) in lines {
        lines_by_order
            .entry(line.order_id)
            .or_default()
            .push(OrderLineView {
                product_id: line.product_id,
                product_name,
                quantity: line.quantity,
                unit_price: line.unit_price,
            });
    }

    let order_of_answer: HashMap<i32, i32> = answers
        .iter()
        .map(|answer| (answer.id, answer.order_id))
        .collect();

    let mut steps_by_preparation: HashMap<i32, Vec<PreparationStepEntity>> = HashMap::new();
    for step in steps {
        steps_by_preparation
            .entry(step.preparation_id)
            .or_default()
            .push(step);
    }

    let mut preparations_by_order: HashMap<i32, Vec<PreparationSnapshot>> = HashMap::new();
    for preparation in preparations {
        let Some(order_id) = order_of_answer.get(&preparation.order_answer_id).copied() else {
            continue;
        };
        let steps = steps_by_preparation
            .remove(&preparation.id)
            .unwrap_or_default();
        preparations_by_order
            .entry(order_id)
            .or_default()
            .push(PreparationSnapshot { preparation, steps });
    }

    let mut answers_by_order: HashMap<i32, Vec<OrderAnswerEntity>> = HashMap::new();
    for answer in answers {
        answers_by_order
            .entry(answer.order_id)
            .or_default()
            .push(answer);
    }

    let mut delivery_by_order: HashMap<i32, DeliveryEntity> = deliveries
        .into_iter()
        .map(|delivery| (delivery.order_id, delivery))
        .collect();

    let snapshots = orders
        .into_iter()
        .map(|order| OrderSnapshot {
            lines: lines_by_order.remove(&order.id).unwrap_or_default(),
            answers: answers_by_order.remove(&order.id).unwrap_or_default(),
            preparations: preparations_by_order.remove(&order.id).unwrap_or_default(),
            delivery: delivery_by_order.remove(&order.id),
            order,
        })
        .collect();

    Ok(snapshots)
}
