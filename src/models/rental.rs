//! Rental model and related types

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::user::UserShort;
use super::vehicle::VehicleShort;
use crate::booking::availability::DateRange;

/// Longest payment reference a rental row stores
pub const MAX_PAYMENT_REFERENCE_LEN: usize = 255;

/// Largest amount a `NUMERIC(12, 2)` cost column holds
pub fn max_total_cost() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

/// Rental lifecycle status
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "rental_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RentalStatus {
    Pending,
    Confirmed,
    Active,
    Completed,
    Cancelled,
}

impl RentalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RentalStatus::Pending => "pending",
            RentalStatus::Confirmed => "confirmed",
            RentalStatus::Active => "active",
            RentalStatus::Completed => "completed",
            RentalStatus::Cancelled => "cancelled",
        }
    }

    /// Completed and cancelled rentals accept no further changes
    pub fn is_terminal(&self) -> bool {
        matches!(self, RentalStatus::Completed | RentalStatus::Cancelled)
    }

    /// Whether the rental still holds its date range
    pub fn blocks_vehicle(&self) -> bool {
        *self != RentalStatus::Cancelled
    }
}

impl std::fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment state, tracked separately from the rental status
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema, sqlx::Type,
)]
#[sqlx(type_name = "payment_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// No reference submitted yet
    #[default]
    Unpaid,
    /// Reference submitted, awaiting admin review
    Pending,
    Paid,
    Failed,
}

/// Rental model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Rental {
    pub id: i32,
    pub vehicle_id: i32,
    pub user_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[schema(value_type = String, example = "3000.00")]
    pub total_cost: Decimal,
    pub status: RentalStatus,
    pub payment_reference_number: Option<String>,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Rental {
    pub fn range(&self) -> DateRange {
        DateRange {
            start: self.start_date,
            end: self.end_date,
        }
    }

    pub fn has_payment_reference(&self) -> bool {
        self.payment_reference_number
            .as_deref()
            .map(|r| !r.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Rental with renter and vehicle display data joined in
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RentalDetails {
    #[serde(flatten)]
    pub rental: Rental,
    pub vehicle: VehicleShort,
    pub user: UserShort,
}

/// Data for a rental insert, cost already computed
#[derive(Debug, Clone)]
pub struct NewRental {
    pub vehicle_id: i32,
    pub user_id: i32,
    pub range: DateRange,
    pub total_cost: Decimal,
}
