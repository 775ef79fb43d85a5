use std::{fmt, io::Write, str::FromStr};

use diesel::{
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    pg::{Pg, PgValue},
    serialize::{self, IsNull, Output, ToSql},
    sql_types::Text,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid {kind}: {value:?}")]
pub struct UnknownStatus {
    pub kind: &'static str,
    pub value: String,
}

/// A restaurant's decision on an order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow, ToSchema,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnswerStatus {
    Accepted,
    Rejected,
}

impl AnswerStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AnswerStatus::Accepted => "ACCEPTED",
            AnswerStatus::Rejected => "REJECTED",
        }
    }
}

impl FromStr for AnswerStatus {
    type Err = UnknownStatus;

    /// Accepts the canonical names, the verbs and the one-letter legacy codes.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "accepted" | "accept" | "a" => Ok(AnswerStatus::Accepted),
            "rejected" | "reject" | "r" => Ok(AnswerStatus::Rejected),
            _ => Err(UnknownStatus {
                kind: "answer decision",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for AnswerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql<Text, Pg> for AnswerStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for AnswerStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let raw = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        match raw.as_str() {
            "ACCEPTED" => Ok(AnswerStatus::Accepted),
            "REJECTED" => Ok(AnswerStatus::Rejected),
            other => Err(format!("unrecognized answer status {other:?}").into()),
        }
    }
}

/// Outcome recorded by one kitchen preparation step.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow, ToSchema,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PreparationStatus {
    Delayed,
    Done,
    Cancelled,
}

impl PreparationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PreparationStatus::Delayed => "DELAYED",
            PreparationStatus::Done => "DONE",
            PreparationStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for PreparationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "delayed" | "de" => Ok(PreparationStatus::Delayed),
            "done" | "d" => Ok(PreparationStatus::Done),
            "cancelled" | "canceled" | "c" => Ok(PreparationStatus::Cancelled),
            _ => Err(UnknownStatus {
                kind: "preparation status",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for PreparationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql<Text, Pg> for PreparationStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for PreparationStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let raw = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        match raw.as_str() {
            "DELAYED" => Ok(PreparationStatus::Delayed),
            "DONE" => Ok(PreparationStatus::Done),
            "CANCELLED" => Ok(PreparationStatus::Cancelled),
            other => Err(format!("unrecognized preparation status {other:?}").into()),
        }
    }
}

/// Where an order stands in its lifecycle. Derived from stored rows, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    Placed,
    Accepted,
    Rejected,
    Preparing,
    ReadyForPickup,
    Delivered,
    Cancelled,
}
