//! Read-side projection of the rental set for the admin dashboard

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::rental::{RentalDetails, RentalStatus};

/// Which rentals the dashboard covers
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardScope {
    /// Earliest start date included
    pub from: Option<NaiveDate>,
    /// Latest start date included
    pub to: Option<NaiveDate>,
    /// Restrict to one renter
    pub user_id: Option<i32>,
    pub recent_limit: usize,
    pub top_limit: usize,
}

impl DashboardScope {
    fn includes(&self, details: &RentalDetails) -> bool {
        let rental = &details.rental;
        self.from.map_or(true, |from| rental.start_date >= from)
            && self.to.map_or(true, |to| rental.start_date <= to)
            && self.user_id.map_or(true, |id| rental.user_id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PeriodCount {
    /// Month, `YYYY-MM`
    pub name: String,
    pub rentals: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PeriodRevenue {
    /// Month, `YYYY-MM`
    pub name: String,
    #[schema(value_type = String)]
    pub revenue: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopVehicle {
    pub vehicle_id: i32,
    /// "Make Model"
    pub model: String,
    pub rentals: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecentRental {
    pub id: i32,
    /// Renter name
    pub user: String,
    /// "Make Model"
    pub car: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: RentalStatus,
    #[schema(value_type = String)]
    pub total_cost: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_rentals: i64,
    /// Rentals confirmed or currently running
    pub active_rentals: i64,
    /// Sum of total cost over non-cancelled rentals
    #[schema(value_type = String)]
    pub revenue: Decimal,
    pub rental_data: Vec<PeriodCount>,
    pub revenue_data: Vec<PeriodRevenue>,
    pub top_rented_cars: Vec<TopVehicle>,
    pub recent_rentals: Vec<RecentRental>,
}

fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Aggregate the dashboard figures from the rentals in scope
pub fn summarize(rentals: &[RentalDetails], scope: &DashboardScope) -> DashboardSummary {
    let in_scope: Vec<&RentalDetails> = rentals.iter().filter(|d| scope.includes(d)).collect();

    let mut active_rentals = 0;
    let mut revenue = Decimal::ZERO;
    // Keyed by YYYY-MM so iteration is chronological
    let mut months: BTreeMap<String, (i64, Decimal)> = BTreeMap::new();
    let mut per_vehicle: HashMap<i32, (String, i64)> = HashMap::new();

    for details in &in_scope {
        let rental = &details.rental;
        let counted = rental.status.blocks_vehicle();

        if matches!(rental.status, RentalStatus::Confirmed | RentalStatus::Active) {
            active_rentals += 1;
        }

        let bucket = months
            .entry(month_key(rental.start_date))
            .or_insert((0, Decimal::ZERO));
        bucket.0 += 1;

        if counted {
            revenue += rental.total_cost;
            bucket.1 += rental.total_cost;

            let entry = per_vehicle
                .entry(rental.vehicle_id)
                .or_insert_with(|| (format!("{} {}", details.vehicle.make, details.vehicle.model), 0));
            entry.1 += 1;
        }
    }

    let mut top_rented_cars: Vec<TopVehicle> = per_vehicle
        .into_iter()
        .map(|(vehicle_id, (model, rentals))| TopVehicle {
            vehicle_id,
            model,
            rentals,
        })
        .collect();
    top_rented_cars.sort_by(|a, b| b.rentals.cmp(&a.rentals).then(a.vehicle_id.cmp(&b.vehicle_id)));
    top_rented_cars.truncate(scope.top_limit);

    let mut recent: Vec<&RentalDetails> = in_scope.clone();
    recent.sort_by(|a, b| {
        b.rental
            .created_at
            .cmp(&a.rental.created_at)
            .then(b.rental.id.cmp(&a.rental.id))
    });
    let recent_rentals = recent
        .into_iter()
        .take(scope.recent_limit)
        .map(|d| RecentRental {
            id: d.rental.id,
            user: d.user.name.clone(),
            car: format!("{} {}", d.vehicle.make, d.vehicle.model),
            start_date: d.rental.start_date,
            end_date: d.rental.end_date,
            status: d.rental.status,
            total_cost: d.rental.total_cost,
        })
        .collect();

    DashboardSummary {
        total_rentals: in_scope.len() as i64,
        active_rentals,
        revenue,
        rental_data: months
            .iter()
            .map(|(name, (count, _))| PeriodCount {
                name: name.clone(),
                rentals: *count,
            })
            .collect(),
        revenue_data: months
            .into_iter()
            .map(|(name, (_, revenue))| PeriodRevenue { name, revenue })
            .collect(),
        top_rented_cars,
        recent_rentals,
    }
}
