//! Lifecycle tests against a real PostgreSQL database.
//!
//! They run only when `TEST_DATABASE_URL` points at a database the tests may
//! write to; otherwise each test returns early.

use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Duration, TimeZone, Utc};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use restaurant_orderservice::{
    MIGRATIONS,
    app::{app_error::AppError, db},
    board,
    lifecycle::{
        self,
        status::{AnswerStatus, OrderState, PreparationStatus},
        validation::ValidatedLine,
    },
    models::{
        CreateProductEntity, CreateRestaurantEntity, CreateStaffAccountEntity,
        CreateStaffRestaurantEntity, NotificationEntity, ProductEntity, RestaurantEntity,
        StaffAccountEntity,
    },
    schema::{
        deliveries, notifications, order_products, orders, preparation_steps, preparations,
        products, restaurants, staff_accounts, staff_restaurants,
    },
};
use tokio::sync::OnceCell;

static MIGRATED: OnceCell<()> = OnceCell::const_new();
static SEED: AtomicU32 = AtomicU32::new(0);

struct Kitchen {
    restaurant: RestaurantEntity,
    products: Vec<ProductEntity>,
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 10, 1, 12, 0, 0).unwrap()
}

async fn connect() -> Option<AsyncPgConnection> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return None;
    };

    MIGRATED
        .get_or_init(|| async {
            db::run_migrations_blocking(MIGRATIONS, &url)
                .await
                .expect("migrations should apply");
        })
        .await;

    Some(
        AsyncPgConnection::establish(&url)
            .await
            .expect("test database should accept connections"),
    )
}

/// A restaurant with one admin and products priced as given.
async fn seed_kitchen(conn: &mut AsyncPgConnection, prices: &[i32]) -> Kitchen {
    let seed = SEED.fetch_add(1, Ordering::SeqCst);
    let tag = format!("{}-{}-{}", std::process::id(), seed, Utc::now().timestamp_micros());

    let restaurant: RestaurantEntity = diesel::insert_into(restaurants::table)
        .values(CreateRestaurantEntity {
            name: format!("Kitchen {tag}"),
            address: "1 Test Street".to_string(),
            created_at: now(),
        })
        .returning(RestaurantEntity::as_returning())
        .get_result(conn)
        .await
        .unwrap();

    let staff: StaffAccountEntity = diesel::insert_into(staff_accounts::table)
        .values(CreateStaffAccountEntity {
            username: format!("chef-{tag}"),
            email: format!("chef-{tag}@example.com"),
            is_admin: true,
            created_at: now(),
        })
        .returning(StaffAccountEntity::as_returning())
        .get_result(conn)
        .await
        .unwrap();

    diesel::insert_into(staff_restaurants::table)
        .values(CreateStaffRestaurantEntity {
            staff_id: staff.id,
            restaurant_id: restaurant.id,
            created_at: now(),
        })
        .execute(conn)
        .await
        .unwrap();

    let new_products: Vec<CreateProductEntity> = prices
        .iter()
        .enumerate()
        .map(|(i, price)| CreateProductEntity {
            restaurant_id: restaurant.id,
            name: format!("Dish {i}"),
            description: String::new(),
            price: *price,
            created_at: now(),
        })
        .collect();
    let products: Vec<ProductEntity> = diesel::insert_into(products::table)
        .values(new_products)
        .returning(ProductEntity::as_returning())
        .get_results(conn)
        .await
        .unwrap();

    Kitchen {
        restaurant,
        products,
    }
}

fn line(product_id: i32, quantity: i32) -> ValidatedLine {
    ValidatedLine {
        product_id,
        quantity,
        unit_price: None,
    }
}

async fn place(conn: &mut AsyncPgConnection, kitchen: &Kitchen) -> i32 {
    lifecycle::place_order(conn, vec![line(kitchen.products[0].id, 1)], now())
        .await
        .unwrap()
        .order
        .id
}

async fn accept(conn: &mut AsyncPgConnection, kitchen: &Kitchen, order_id: i32) {
    lifecycle::answer_order(
        conn,
        kitchen.restaurant.id,
        order_id,
        AnswerStatus::Accepted,
        Some(20),
        now(),
    )
    .await
    .unwrap();
}

async fn step(
    conn: &mut AsyncPgConnection,
    kitchen: &Kitchen,
    order_id: i32,
    status: PreparationStatus,
    delay_minutes: i32,
) -> Result<lifecycle::RecordedStep, AppError> {
    lifecycle::record_preparation_step(
        conn,
        kitchen.restaurant.id,
        order_id,
        status,
        delay_minutes,
        now(),
    )
    .await
}

#[tokio::test]
async fn accepted_and_done_order_awaits_pickup() {
    let Some(mut conn) = connect().await else {
        return;
    };
    let conn = &mut conn;
    let kitchen = seed_kitchen(conn, &[189]).await;
    let product_id = kitchen.products[0].id;

    let placed = lifecycle::place_order(conn, vec![line(product_id, 2)], now())
        .await
        .unwrap();
    assert_eq!(placed.items.len(), 1);
    assert_eq!(placed.items[0].quantity, 2);
    assert_eq!(placed.items[0].unit_price, 189);
    let order_id = placed.order.id;

    let answer = lifecycle::answer_order(
        conn,
        kitchen.restaurant.id,
        order_id,
        AnswerStatus::Accepted,
        Some(20),
        now(),
    )
    .await
    .unwrap();
    assert_eq!(answer.projected_preparation_time_minutes, Some(20));

    let recorded = step(conn, &kitchen, order_id, PreparationStatus::Done, 0)
        .await
        .unwrap();
    let delivery = recorded.delivery.expect("DONE creates the delivery");
    assert_eq!(delivery.estimated_pickup_time, now() + Duration::minutes(5));
    assert_eq!(delivery.estimated_delivery_time, now() + Duration::minutes(15));

    let board = board::load_board(conn, kitchen.restaurant.id).await.unwrap();
    assert!(board.awaiting_pickup.iter().any(|o| o.id == order_id));
    assert!(board.in_progress.iter().all(|o| o.id != order_id));
    assert!(board.new.iter().all(|o| o.id != order_id));

    let view = board::load_order(conn, kitchen.restaurant.id, order_id)
        .await
        .unwrap();
    assert_eq!(view.state, OrderState::ReadyForPickup);
    assert_eq!(view.total_price, 378);
}

#[tokio::test]
async fn missing_product_leaves_nothing_behind() {
    let Some(mut conn) = connect().await else {
        return;
    };
    let conn = &mut conn;
    let kitchen = seed_kitchen(conn, &[100]).await;

    let notifications_before: i64 = notifications::table
        .filter(notifications::restaurant_id.eq(kitchen.restaurant.id))
        .count()
        .get_result(conn)
        .await
        .unwrap();

    let err = lifecycle::place_order(
        conn,
        vec![line(kitchen.products[0].id, 1), line(i32::MAX, 1)],
        now(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFoundResource(_)));

    let lines: i64 = order_products::table
        .filter(order_products::product_id.eq(kitchen.products[0].id))
        .count()
        .get_result(conn)
        .await
        .unwrap();
    assert_eq!(lines, 0);

    let notifications_after: i64 = notifications::table
        .filter(notifications::restaurant_id.eq(kitchen.restaurant.id))
        .count()
        .get_result(conn)
        .await
        .unwrap();
    assert_eq!(notifications_before, notifications_after);
}

#[tokio::test]
async fn placing_an_order_notifies_the_restaurant() {
    let Some(mut conn) = connect().await else {
        return;
    };
    let conn = &mut conn;
    let kitchen = seed_kitchen(conn, &[50, 60]).await;

    let placed = lifecycle::place_order(
        conn,
        vec![line(kitchen.products[0].id, 1), line(kitchen.products[1].id, 3)],
        now(),
    )
    .await
    .unwrap();
    assert_eq!(placed.items.len(), 2);

    let notifications: Vec<NotificationEntity> = notifications::table
        .filter(notifications::restaurant_id.eq(kitchen.restaurant.id))
        .select(NotificationEntity::as_select())
        .load(conn)
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(
        notifications[0].message,
        format!("New order #{}", placed.order.id)
    );
    assert!(!notifications[0].read);
}

#[tokio::test]
async fn cancelling_twice_is_a_no_op() {
    let Some(mut conn) = connect().await else {
        return;
    };
    let conn = &mut conn;
    let kitchen = seed_kitchen(conn, &[100]).await;
    let order_id = place(conn, &kitchen).await;

    let first = lifecycle::cancel_order(conn, kitchen.restaurant.id, order_id, now())
        .await
        .unwrap();
    let later = now() + Duration::minutes(3);
    let second = lifecycle::cancel_order(conn, kitchen.restaurant.id, order_id, later)
        .await
        .unwrap();

    assert!(first.is_cancelled && second.is_cancelled);
    assert_eq!(second.cancelled_at, Some(now()));

    let err = lifecycle::answer_order(
        conn,
        kitchen.restaurant.id,
        order_id,
        AnswerStatus::Accepted,
        None,
        now(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let board = board::load_board(conn, kitchen.restaurant.id).await.unwrap();
    assert!(board.all.iter().all(|o| o.id != order_id));
}

#[tokio::test]
async fn done_twice_keeps_one_delivery() {
    let Some(mut conn) = connect().await else {
        return;
    };
    let conn = &mut conn;
    let kitchen = seed_kitchen(conn, &[100]).await;
    let order_id = place(conn, &kitchen).await;
    accept(conn, &kitchen, order_id).await;

    let first = step(conn, &kitchen, order_id, PreparationStatus::Done, 0)
        .await
        .unwrap();
    let second = lifecycle::record_preparation_step(
        conn,
        kitchen.restaurant.id,
        order_id,
        PreparationStatus::Done,
        0,
        now() + Duration::minutes(10),
    )
    .await
    .unwrap();

    assert_eq!(first.preparation_id, second.preparation_id);
    assert_eq!(
        first.delivery.as_ref().map(|d| d.id),
        second.delivery.as_ref().map(|d| d.id)
    );
    assert_eq!(
        second.delivery.map(|d| d.estimated_pickup_time),
        Some(now() + Duration::minutes(5))
    );

    let delivery_count: i64 = deliveries::table
        .filter(deliveries::order_id.eq(order_id))
        .count()
        .get_result(conn)
        .await
        .unwrap();
    assert_eq!(delivery_count, 1);

    let step_count: i64 = preparation_steps::table
        .filter(preparation_steps::preparation_id.eq(first.preparation_id))
        .count()
        .get_result(conn)
        .await
        .unwrap();
    assert_eq!(step_count, 2);
}

#[tokio::test]
async fn delays_add_up_across_steps() {
    let Some(mut conn) = connect().await else {
        return;
    };
    let conn = &mut conn;
    let kitchen = seed_kitchen(conn, &[100]).await;
    let order_id = place(conn, &kitchen).await;
    accept(conn, &kitchen, order_id).await;

    let mut total = 0;
    for delay in [5, 10, 0] {
        total = step(conn, &kitchen, order_id, PreparationStatus::Delayed, delay)
            .await
            .unwrap()
            .total_delay_minutes;
    }
    assert_eq!(total, 15);

    let board = board::load_board(conn, kitchen.restaurant.id).await.unwrap();
    let in_progress = board
        .in_progress
        .iter()
        .find(|o| o.id == order_id)
        .expect("delayed order stays in progress");
    let progress = in_progress.progress.as_ref().unwrap();
    assert_eq!(progress.total_delay_minutes, 15);
    assert_eq!(progress.projected_preparation_time_minutes, Some(20));
}

#[tokio::test]
async fn step_without_acceptance_is_a_conflict() {
    let Some(mut conn) = connect().await else {
        return;
    };
    let conn = &mut conn;
    let kitchen = seed_kitchen(conn, &[100]).await;
    let order_id = place(conn, &kitchen).await;

    lifecycle::answer_order(
        conn,
        kitchen.restaurant.id,
        order_id,
        AnswerStatus::Rejected,
        Some(30),
        now(),
    )
    .await
    .unwrap();

    let err = step(conn, &kitchen, order_id, PreparationStatus::Done, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let preparation_count: i64 = preparations::table
        .inner_join(restaurant_orderservice::schema::order_answers::table)
        .filter(restaurant_orderservice::schema::order_answers::order_id.eq(order_id))
        .count()
        .get_result(conn)
        .await
        .unwrap();
    assert_eq!(preparation_count, 0);
}

#[tokio::test]
async fn foreign_restaurant_is_forbidden() {
    let Some(mut conn) = connect().await else {
        return;
    };
    let conn = &mut conn;
    let owner = seed_kitchen(conn, &[100]).await;
    let other = seed_kitchen(conn, &[100]).await;
    let order_id = place(conn, &owner).await;

    let err = lifecycle::cancel_order(conn, other.restaurant.id, order_id, now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ForbiddenResource(_)));

    let err = lifecycle::answer_order(
        conn,
        other.restaurant.id,
        order_id,
        AnswerStatus::Accepted,
        None,
        now(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::ForbiddenResource(_)));

    let err = lifecycle::cancel_order(conn, owner.restaurant.id, i32::MAX, now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFoundResource(_)));

    let is_cancelled: bool = orders::table
        .find(order_id)
        .select(orders::is_cancelled)
        .get_result(conn)
        .await
        .unwrap();
    assert!(!is_cancelled);
}

#[tokio::test]
async fn cancelled_step_cancels_the_order() {
    let Some(mut conn) = connect().await else {
        return;
    };
    let conn = &mut conn;
    let kitchen = seed_kitchen(conn, &[100]).await;
    let order_id = place(conn, &kitchen).await;
    accept(conn, &kitchen, order_id).await;

    let recorded = step(conn, &kitchen, order_id, PreparationStatus::Cancelled, 0)
        .await
        .unwrap();
    assert!(recorded.order_cancelled);
    assert!(recorded.delivery.is_none());

    let err = step(conn, &kitchen, order_id, PreparationStatus::Done, 0)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
}

#[tokio::test]
async fn pickup_moves_order_out_of_the_board_queue() {
    let Some(mut conn) = connect().await else {
        return;
    };
    let conn = &mut conn;
    let kitchen = seed_kitchen(conn, &[100]).await;
    let order_id = place(conn, &kitchen).await;

    let err = lifecycle::confirm_pickup(conn, kitchen.restaurant.id, order_id, now())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    accept(conn, &kitchen, order_id).await;
    step(conn, &kitchen, order_id, PreparationStatus::Done, 0)
        .await
        .unwrap();

    let picked_up_at = now() + Duration::minutes(6);
    let delivery = lifecycle::confirm_pickup(conn, kitchen.restaurant.id, order_id, picked_up_at)
        .await
        .unwrap();
    assert!(delivery.has_been_picked_up);
    assert_eq!(delivery.picked_up_at, Some(picked_up_at));

    let again = lifecycle::confirm_pickup(
        conn,
        kitchen.restaurant.id,
        order_id,
        picked_up_at + Duration::minutes(1),
    )
    .await
    .unwrap();
    assert_eq!(again.picked_up_at, Some(picked_up_at));

    let board = board::load_board(conn, kitchen.restaurant.id).await.unwrap();
    let order = board.all.iter().find(|o| o.id == order_id).unwrap();
    assert_eq!(order.state, OrderState::Delivered);
    assert!(board.awaiting_pickup.iter().all(|o| o.id != order_id));
}

#[tokio::test]
async fn board_buckets_follow_order_state() {
    let Some(mut conn) = connect().await else {
        return;
    };
    let conn = &mut conn;
    let kitchen = seed_kitchen(conn, &[100]).await;

    let fresh = place(conn, &kitchen).await;
    let cooking = place(conn, &kitchen).await;
    accept(conn, &kitchen, cooking).await;
    let rejected = place(conn, &kitchen).await;
    lifecycle::answer_order(
        conn,
        kitchen.restaurant.id,
        rejected,
        AnswerStatus::Rejected,
        None,
        now(),
    )
    .await
    .unwrap();

    let board = board::load_board(conn, kitchen.restaurant.id).await.unwrap();
    let ids = |orders: &[restaurant_orderservice::board::view::OrderView]| {
        orders.iter().map(|o| o.id).collect::<Vec<_>>()
    };

    assert_eq!(ids(&board.all), vec![rejected, cooking, fresh]);
    assert_eq!(ids(&board.new), vec![fresh]);
    assert_eq!(ids(&board.in_progress), vec![cooking]);
    assert!(board.awaiting_pickup.is_empty());
    assert!(board.new[0].progress.is_none());
}

#[tokio::test]
async fn latest_acceptance_owns_new_steps() {
    let Some(mut conn) = connect().await else {
        return;
    };
    let conn = &mut conn;
    let kitchen = seed_kitchen(conn, &[100]).await;
    let order_id = place(conn, &kitchen).await;

    let mut answer_ids = Vec::new();
    for minutes in [30, 15] {
        let answer = lifecycle::answer_order(
            conn,
            kitchen.restaurant.id,
            order_id,
            AnswerStatus::Accepted,
            Some(minutes),
            now(),
        )
        .await
        .unwrap();
        answer_ids.push(answer.id);
    }

    let recorded = step(conn, &kitchen, order_id, PreparationStatus::Delayed, 5)
        .await
        .unwrap();
    assert_eq!(recorded.total_delay_minutes, 5);

    let owner: i32 = preparations::table
        .find(recorded.preparation_id)
        .select(preparations::order_answer_id)
        .get_result(conn)
        .await
        .unwrap();
    assert_eq!(owner, answer_ids[1]);

    let board = board::load_board(conn, kitchen.restaurant.id).await.unwrap();
    let order = board
        .in_progress
        .iter()
        .find(|o| o.id == order_id)
        .expect("accepted order is in progress");
    let progress = order.progress.as_ref().unwrap();
    assert_eq!(progress.projected_preparation_time_minutes, Some(15));
    assert_eq!(progress.total_delay_minutes, 5);
}
