//! Rental lifecycle service

use std::sync::Arc;

use chrono::NaiveDate;

use super::{
    policy::{AuthorizationPolicy, Operation},
    Clock,
};
use crate::{
    booking::{
        availability::DateRange,
        dashboard::{summarize, DashboardScope, DashboardSummary},
        lifecycle::{ensure_payment_open, ensure_payment_review, ensure_transition, total_cost},
    },
    config::DashboardConfig,
    error::{AppError, AppResult},
    models::{
        rental::{
            NewRental, PaymentStatus, Rental, RentalDetails, RentalStatus,
            MAX_PAYMENT_REFERENCE_LEN,
        },
        user::Principal,
    },
    repository::Repository,
};

/// Optional dashboard filters
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardFilter {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub user_id: Option<i32>,
}

#[derive(Clone)]
pub struct RentalsService {
    repository: Repository,
    policy: Arc<dyn AuthorizationPolicy>,
    clock: Arc<dyn Clock>,
    dashboard: DashboardConfig,
}

impl RentalsService {
    pub fn new(
        repository: Repository,
        policy: Arc<dyn AuthorizationPolicy>,
        clock: Arc<dyn Clock>,
        dashboard: DashboardConfig,
    ) -> Self {
        Self {
            repository,
            policy,
            clock,
            dashboard,
        }
    }

    /// Book a vehicle for the caller over an inclusive date range
    pub async fn create_rental(
        &self,
        principal: &Principal,
        vehicle_id: i32,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> AppResult<Rental> {
        self.policy.authorize(principal, Operation::BookRental)?;

        let range = DateRange::new(start_date, end_date)?;
        let today = self.clock.today();
        if range.start < today {
            return Err(AppError::Validation(format!(
                "Start date {} is in the past",
                range.start
            )));
        }

        let vehicle = self.repository.vehicles.get_by_id(vehicle_id).await?;
        if !vehicle.available {
            return Err(AppError::Validation(
                "Vehicle is not available for booking".to_string(),
            ));
        }
        // The renter must exist locally
        self.repository.users.get_by_id(principal.user_id).await?;

        let new_rental = NewRental {
            vehicle_id,
            user_id: principal.user_id,
            range,
            total_cost: total_cost(&range, vehicle.price_per_day)?,
        };

        match self.repository.rentals.insert_if_available(&new_rental).await {
            Ok(rental) => {
                tracing::info!(
                    "Rental {} created for vehicle {} by user {} ({} to {})",
                    rental.id,
                    vehicle_id,
                    principal.user_id,
                    rental.start_date,
                    rental.end_date
                );
                Ok(rental)
            }
            Err(e) => {
                if let AppError::AvailabilityConflict { rental_id, .. } = &e {
                    tracing::warn!(
                        "Booking of vehicle {} from {} to {} conflicts with rental {}",
                        vehicle_id,
                        range.start,
                        range.end,
                        rental_id
                    );
                }
                Err(e)
            }
        }
    }

    /// Move a rental along the status table
    pub async fn update_status(
        &self,
        principal: &Principal,
        rental_id: i32,
        status: RentalStatus,
    ) -> AppResult<Rental> {
        let rental = self.repository.rentals.get_by_id(rental_id).await?;
        ensure_transition(rental.status, status)?;
        self.policy.authorize(principal, Operation::ChangeRentalStatus)?;

        match self
            .repository
            .rentals
            .transition_status(rental_id, rental.status, status)
            .await?
        {
            Some(updated) => {
                tracing::info!(
                    "Rental {} moved from {} to {} by user {}",
                    rental_id,
                    rental.status,
                    status,
                    principal.user_id
                );
                Ok(updated)
            }
            None => {
                // Lost the compare-and-set; report against the status that won
                let current = self.repository.rentals.get_by_id(rental_id).await?;
                ensure_transition(current.status, status)?;
                Err(AppError::Conflict(format!(
                    "Rental {} was modified concurrently",
                    rental_id
                )))
            }
        }
    }

    /// Record the renter's payment reference and mark the payment as pending review
    pub async fn update_payment(
        &self,
        principal: &Principal,
        rental_id: i32,
        reference: &str,
    ) -> AppResult<Rental> {
        let rental = self.repository.rentals.get_by_id(rental_id).await?;
        self.policy.authorize(
            principal,
            Operation::SubmitPayment {
                owner_id: rental.user_id,
            },
        )?;

        let reference = reference.trim();
        if reference.is_empty() {
            return Err(AppError::Validation(
                "Payment reference number is required".to_string(),
            ));
        }
        if reference.chars().count() > MAX_PAYMENT_REFERENCE_LEN {
            return Err(AppError::Validation(format!(
                "Payment reference number must be at most {} characters",
                MAX_PAYMENT_REFERENCE_LEN
            )));
        }
        ensure_payment_open(&rental)?;

        match self
            .repository
            .rentals
            .submit_payment(rental_id, reference)
            .await?
        {
            Some(updated) => {
                tracing::info!("Payment reference submitted for rental {}", rental_id);
                Ok(updated)
            }
            None => {
                let current = self.repository.rentals.get_by_id(rental_id).await?;
                ensure_payment_open(&current)?;
                Err(AppError::Conflict(format!(
                    "Rental {} was modified concurrently",
                    rental_id
                )))
            }
        }
    }

    /// Admin verdict on a submitted payment reference
    pub async fn review_payment(
        &self,
        principal: &Principal,
        rental_id: i32,
        outcome: PaymentStatus,
    ) -> AppResult<Rental> {
        self.policy.authorize(principal, Operation::ReviewPayment)?;
        let rental = self.repository.rentals.get_by_id(rental_id).await?;
        ensure_payment_review(&rental, outcome)?;

        let updated = self
            .repository
            .rentals
            .set_payment_status(rental_id, PaymentStatus::Pending, outcome)
            .await?
            .ok_or_else(|| {
                AppError::Conflict(format!("Rental {} has no payment awaiting review", rental_id))
            })?;

        tracing::info!(
            "Payment for rental {} marked {:?} by user {}",
            rental_id,
            outcome,
            principal.user_id
        );
        Ok(updated)
    }

    /// The caller's own rentals, newest start date first
    pub async fn user_rentals(&self, principal: &Principal) -> AppResult<Vec<RentalDetails>> {
        self.policy.authorize(principal, Operation::ListOwnRentals)?;
        self.repository.rentals.list_for_user(principal.user_id).await
    }

    /// Pending rentals with a submitted reference, oldest first
    pub async fn pending_with_payment(
        &self,
        principal: &Principal,
    ) -> AppResult<Vec<RentalDetails>> {
        self.policy.authorize(principal, Operation::ViewPaymentQueue)?;
        self.repository.rentals.list_payment_queue().await
    }

    pub async fn dashboard(
        &self,
        principal: &Principal,
        filter: DashboardFilter,
    ) -> AppResult<DashboardSummary> {
        self.policy.authorize(principal, Operation::ViewDashboard)?;

        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            if to < from {
                return Err(AppError::Validation(
                    "Dashboard window ends before it starts".to_string(),
                ));
            }
        }

        let rentals = self.repository.rentals.list_all().await?;
        let scope = DashboardScope {
            from: filter.from,
            to: filter.to,
            user_id: filter.user_id,
            recent_limit: self.dashboard.recent_limit,
            top_limit: self.dashboard.top_vehicles_limit,
        };
        Ok(summarize(&rentals, &scope))
    }
}
