use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    lifecycle::status::{AnswerStatus, OrderState, PreparationStatus},
    models::{
        DeliveryEntity, OrderAnswerEntity, OrderEntity, PreparationEntity, PreparationStepEntity,
    },
};

/// Everything stored about one order, grouped in memory.
#[derive(Debug, Clone)]
pub struct OrderSnapshot {
    pub order: OrderEntity,
    pub lines: Vec<OrderLineView>,
    pub answers: Vec<OrderAnswerEntity>,
    pub preparations: Vec<PreparationSnapshot>,
    pub delivery: Option<DeliveryEntity>,
}

#[derive(Debug, Clone)]
pub struct PreparationSnapshot {
    pub preparation: PreparationEntity,
    pub steps: Vec<PreparationStepEntity>,
}

impl OrderSnapshot {
    /// The most recently created acceptance; on equal timestamps the later row wins.
    pub fn authoritative_answer(&self) -> Option<&OrderAnswerEntity> {
        self.answers
            .iter()
            .filter(|answer| match answer.status {
                AnswerStatus::Accepted => true,
                AnswerStatus::Rejected => false,
            })
            .max_by_key(|answer| (answer.created_at, answer.id))
    }

    pub fn steps(&self) -> impl Iterator<Item = &PreparationStepEntity> {
        self.preparations.iter().flat_map(|prep| prep.steps.iter())
    }

    /// Delay minutes summed over all preparations under the given answer.
    pub fn total_delay_minutes(&self, order_answer_id: i32) -> i64 {
        self.preparations
            .iter()
            .filter(|prep| prep.preparation.order_answer_id == order_answer_id)
            .flat_map(|prep| prep.steps.iter())
            .map(|step| i64::from(step.delay_minutes))
            .sum()
    }

    pub fn state(&self) -> OrderState {
        if self.order.is_cancelled {
            return OrderState::Cancelled;
        }

        let mut has_steps = false;
        let mut done = false;
        let mut cancelled = false;
        for step in self.steps() {
            has_steps = true;
            match step.status {
                PreparationStatus::Delayed => {}
                PreparationStatus::Done => done = true,
                PreparationStatus::Cancelled => cancelled = true,
            }
        }

        if cancelled {
            OrderState::Cancelled
        } else if done {
            match &self.delivery {
                Some(delivery) if delivery.has_been_picked_up => OrderState::Delivered,
                _ => OrderState::ReadyForPickup,
            }
        } else if self.authoritative_answer().is_some() {
            if has_steps {
                OrderState::Preparing
            } else {
                OrderState::Accepted
            }
        } else if !self.answers.is_empty() {
            OrderState::Rejected
        } else {
            OrderState::Placed
        }
    }

    fn progress(&self) -> Option<ProgressView> {
        let answer = self.authoritative_answer()?;
        Some(ProgressView {
            accepted_at: answer.created_at,
            projected_preparation_time_minutes: answer.projected_preparation_time_minutes,
            total_delay_minutes: self.total_delay_minutes(answer.id),
        })
    }

    pub fn view(&self, with_progress: bool) -> OrderView {
        OrderView {
            id: self.order.id,
            created_at: self.order.created_at,
            state: self.state(),
            total_price: self
                .lines
                .iter()
                .map(|line| i64::from(line.quantity) * i64::from(line.unit_price))
                .sum(),
            items: self.lines.clone(),
            delivery: self.delivery.as_ref().map(DeliveryEstimateView::from),
            progress: if with_progress { self.progress() } else { None },
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct OrderLineView {
    pub product_id: i32,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: i32,
}

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct DeliveryEstimateView {
    pub estimated_pickup_time: DateTime<Utc>,
    pub estimated_delivery_time: DateTime<Utc>,
    pub has_been_picked_up: bool,
}

impl From<&DeliveryEntity> for DeliveryEstimateView {
    fn from(delivery: &DeliveryEntity) -> Self {
        Self {
            estimated_pickup_time: delivery.estimated_pickup_time,
            estimated_delivery_time: delivery.estimated_delivery_time,
            has_been_picked_up: delivery.has_been_picked_up,
        }
    }
}

#[derive(Serialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct ProgressView {
    pub accepted_at: DateTime<Utc>,
    pub projected_preparation_time_minutes: Option<i32>,
    pub total_delay_minutes: i64,
}

#[derive(Serialize, ToSchema, Debug, Clone)]
pub struct OrderView {
    pub id: i32,
    pub created_at: DateTime<Utc>,
    pub state: OrderState,
    pub items: Vec<OrderLineView>,
    pub total_price: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryEstimateView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressView>,
}

/// The restaurant's orders, bucketed for the kitchen dashboard. Buckets may overlap with `all`.
#[derive(Serialize, ToSchema, Debug, Clone, Default)]
pub struct OrderBoard {
    pub all: Vec<OrderView>,
    pub new: Vec<OrderView>,
    pub in_progress: Vec<OrderView>,
    pub awaiting_pickup: Vec<OrderView>,
}

impl OrderBoard {
    pub fn from_snapshots(mut snapshots: Vec<OrderSnapshot>) -> Self {
        snapshots.sort_by(|a, b| {
            (b.order.created_at, b.order.id).cmp(&(a.order.created_at, a.order.id))
        });

        let mut board = OrderBoard::default();
        for snapshot in &snapshots {
            match snapshot.state() {
                OrderState::Placed => {
                    board.all.push(snapshot.view(false));
                    board.new.push(snapshot.view(false));
                }
                OrderState::Accepted | OrderState::Preparing => {
                    board.all.push(snapshot.view(false));
                    board.in_progress.push(snapshot.view(true));
                }
                OrderState::ReadyForPickup => {
                    board.all.push(snapshot.view(false));
                    board.awaiting_pickup.push(snapshot.view(false));
                }
                OrderState::Rejected | OrderState::Delivered => {
                    board.all.push(snapshot.view(false));
                }
                OrderState::Cancelled => {}
            }
        }
        board
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn at(minute: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 12, 0, 0).unwrap() + Duration::minutes(minute)
    }

    fn snapshot(id: i32, created_minute: i64) -> OrderSnapshot {
        OrderSnapshot {
            order: OrderEntity {
                id,
                end_user_id: id,
                is_cancelled: false,
                cancelled_at: None,
                created_at: at(created_minute),
            },
            lines: vec![OrderLineView {
                product_id: 1,
                product_name: "Veggie Roll".into(),
                quantity: 2,
                unit_price: 189,
            }],
            answers: vec![],
            preparations: vec![],
            delivery: None,
        }
    }

    fn answer(
        id: i32,
        order_id: i32,
        status: AnswerStatus,
        projected: Option<i32>,
        minute: i64,
    ) -> OrderAnswerEntity {
        OrderAnswerEntity {
            id,
            order_id,
            status,
            projected_preparation_time_minutes: projected,
            created_at: at(minute),
        }
    }

    fn preparation(id: i32, order_answer_id: i32, steps: &[(PreparationStatus, i32)]) -> PreparationSnapshot {
        PreparationSnapshot {
            preparation: PreparationEntity {
                id,
                order_answer_id,
                created_at: at(1),
            },
            steps: steps
                .iter()
                .enumerate()
                .map(|(i, (status, delay))| PreparationStepEntity {
                    id: id * 100 + i as i32,
                    preparation_id: id,
                    status: *status,
                    delay_minutes: *delay,
                    created_at: at(2 + i as i64),
                })
                .collect(),
        }
    }

    fn delivery(order_id: i32, picked_up: bool) -> DeliveryEntity {
        DeliveryEntity {
            id: order_id,
            order_id,
            estimated_pickup_time: at(10),
            estimated_delivery_time: at(20),
            has_been_picked_up: picked_up,
            picked_up_at: picked_up.then(|| at(12)),
            created_at: at(5),
        }
    }

    fn ids(views: &[OrderView]) -> Vec<i32> {
        views.iter().map(|view| view.id).collect()
    }

    #[test]
    fn unanswered_orders_are_only_new() {
        let board = OrderBoard::from_snapshots(vec![snapshot(1, 0)]);
        assert_eq!(ids(&board.all), vec![1]);
        assert_eq!(ids(&board.new), vec![1]);
        assert!(board.in_progress.is_empty());
        assert!(board.awaiting_pickup.is_empty());
        assert_eq!(board.new[0].state, OrderState::Placed);
        assert_eq!(board.new[0].total_price, 378);
    }

    #[test]
    fn accepted_orders_without_terminal_step_are_in_progress() {
        let mut order = snapshot(1, 0);
        order.answers = vec![answer(10, 1, AnswerStatus::Accepted, Some(20), 1)];
        order.preparations = vec![preparation(5, 10, &[(PreparationStatus::Delayed, 5)])];

        let board = OrderBoard::from_snapshots(vec![order]);
        assert_eq!(ids(&board.in_progress), vec![1]);
        assert!(board.new.is_empty());
        assert!(board.awaiting_pickup.is_empty());

        let view = &board.in_progress[0];
        assert_eq!(view.state, OrderState::Preparing);
        assert_eq!(
            view.progress,
            Some(ProgressView {
                accepted_at: at(1),
                projected_preparation_time_minutes: Some(20),
                total_delay_minutes: 5,
            })
        );
        assert!(board.all[0].progress.is_none());
    }

    #[test]
    fn done_orders_await_pickup_and_leave_in_progress() {
        let mut order = snapshot(1, 0);
        order.answers = vec![answer(10, 1, AnswerStatus::Accepted, None, 1)];
        order.preparations = vec![preparation(5, 10, &[(PreparationStatus::Done, 0)])];
        order.delivery = Some(delivery(1, false));

        let board = OrderBoard::from_snapshots(vec![order]);
        assert_eq!(ids(&board.awaiting_pickup), vec![1]);
        assert!(board.in_progress.is_empty());
        assert!(board.new.is_empty());

        let view = &board.awaiting_pickup[0];
        assert_eq!(view.state, OrderState::ReadyForPickup);
        assert_eq!(
            view.delivery,
            Some(DeliveryEstimateView {
                estimated_pickup_time: at(10),
                estimated_delivery_time: at(20),
                has_been_picked_up: false,
            })
        );
    }

    #[test]
    fn picked_up_and_rejected_orders_only_appear_in_all() {
        let mut delivered = snapshot(1, 0);
        delivered.answers = vec![answer(10, 1, AnswerStatus::Accepted, None, 1)];
        delivered.preparations = vec![preparation(5, 10, &[(PreparationStatus::Done, 0)])];
        delivered.delivery = Some(delivery(1, true));

        let mut rejected = snapshot(2, 1);
        rejected.answers = vec![answer(11, 2, AnswerStatus::Rejected, None, 2)];

        let board = OrderBoard::from_snapshots(vec![delivered, rejected]);
        assert_eq!(ids(&board.all), vec![2, 1]);
        assert_eq!(board.all[0].state, OrderState::Rejected);
        assert_eq!(board.all[1].state, OrderState::Delivered);
        assert!(board.new.is_empty());
        assert!(board.in_progress.is_empty());
        assert!(board.awaiting_pickup.is_empty());
    }

    #[test]
    fn cancelled_orders_are_hidden() {
        let mut flagged = snapshot(1, 0);
        flagged.order.is_cancelled = true;

        let mut stopped = snapshot(2, 1);
        stopped.answers = vec![answer(10, 2, AnswerStatus::Accepted, None, 1)];
        stopped.preparations = vec![preparation(5, 10, &[(PreparationStatus::Cancelled, 0)])];

        let board = OrderBoard::from_snapshots(vec![flagged, stopped]);
        assert!(board.all.is_empty());
        assert!(board.in_progress.is_empty());
    }

    #[test]
    fn delay_minutes_accumulate_across_steps() {
        let mut order = snapshot(1, 0);
        order.answers = vec![answer(10, 1, AnswerStatus::Accepted, None, 1)];
        order.preparations = vec![preparation(
            5,
            10,
            &[
                (PreparationStatus::Delayed, 5),
                (PreparationStatus::Delayed, 10),
                (PreparationStatus::Delayed, 0),
            ],
        )];
        assert_eq!(order.total_delay_minutes(10), 15);
        assert_eq!(order.total_delay_minutes(11), 0);
    }

    #[test]
    fn latest_acceptance_is_authoritative() {
        let mut order = snapshot(1, 0);
        order.answers = vec![
            answer(10, 1, AnswerStatus::Accepted, Some(30), 1),
            answer(11, 1, AnswerStatus::Rejected, None, 2),
            answer(12, 1, AnswerStatus::Accepted, Some(15), 3),
        ];
        order.preparations = vec![
            preparation(5, 10, &[(PreparationStatus::Delayed, 7)]),
            preparation(6, 12, &[(PreparationStatus::Delayed, 4)]),
        ];

        let progress = order.view(true).progress.unwrap();
        assert_eq!(progress.accepted_at, at(3));
        assert_eq!(progress.projected_preparation_time_minutes, Some(15));
        assert_eq!(progress.total_delay_minutes, 4);
    }

    #[test]
    fn equal_timestamps_fall_back_to_the_later_row() {
        let mut order = snapshot(1, 0);
        order.answers = vec![
            answer(21, 1, AnswerStatus::Accepted, Some(10), 1),
            answer(20, 1, AnswerStatus::Accepted, Some(40), 1),
        ];
        assert_eq!(order.authoritative_answer().map(|a| a.id), Some(21));
    }

    #[test]
    fn all_orders_are_newest_first() {
        let board = OrderBoard::from_snapshots(vec![snapshot(1, 0), snapshot(3, 5), snapshot(2, 5)]);
        assert_eq!(ids(&board.all), vec![3, 2, 1]);
    }

    #[test]
    fn serialized_views_omit_absent_sections() {
        let json = serde_json::to_value(snapshot(1, 0).view(true)).unwrap();
        assert_eq!(json["state"], "PLACED");
        assert!(json.get("delivery").is_none());
        assert!(json.get("progress").is_none());

        let mut accepted = snapshot(2, 0);
        accepted.answers = vec![answer(10, 2, AnswerStatus::Accepted, None, 1)];
        let json = serde_json::to_value(accepted.view(true)).unwrap();
        assert_eq!(
            json["progress"]["projected_preparation_time_minutes"],
            serde_json::Value::Null
        );
        assert_eq!(json["progress"]["total_delay_minutes"], 0);
    }
}
