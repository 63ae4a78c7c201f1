//! Repository layer for database operations
//!
//! Each aggregate is reached through a trait so services can run against
//! PostgreSQL in production and in-memory stores in tests.

pub mod rentals;
pub mod users;
pub mod vehicles;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::{
        rental::{NewRental, PaymentStatus, Rental, RentalDetails, RentalStatus},
        user::{UpdateProfile, User},
        vehicle::{NewVehicle, Vehicle, VehicleChanges, VehicleQuery},
    },
};

/// SQLSTATE for unique constraint violations
pub(crate) const UNIQUE_VIOLATION: &str = "23505";
/// SQLSTATE for exclusion constraint violations
pub(crate) const EXCLUSION_VIOLATION: &str = "23P01";

/// Advisory lock namespace shared by every writer of a vehicle's rental set
pub(crate) const VEHICLE_LOCK_NAMESPACE: i32 = 0x5645;

pub(crate) fn is_constraint_violation(err: &sqlx::Error, code: &str) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(code))
}

/// Booking precondition on the vehicle row, read under the vehicle lock.
/// `listed` is `None` when the vehicle is missing or archived.
pub fn ensure_bookable(vehicle_id: i32, listed: Option<bool>) -> AppResult<()> {
    match listed {
        None => Err(AppError::NotFound(format!(
            "Vehicle with id {} not found",
            vehicle_id
        ))),
        Some(false) => Err(AppError::Validation(
            "Vehicle is not available for booking".to_string(),
        )),
        Some(true) => Ok(()),
    }
}

#[async_trait]
pub trait VehicleRepository: Send + Sync {
    /// Listed (non-archived) vehicles matching the query
    async fn list(&self, query: &VehicleQuery) -> AppResult<Vec<Vehicle>>;

    async fn get_by_id(&self, id: i32) -> AppResult<Vehicle>;

    async fn create(&self, data: &NewVehicle) -> AppResult<Vehicle>;

    async fn update(&self, id: i32, data: &VehicleChanges) -> AppResult<Vehicle>;

    /// Soft delete. Fails with `Conflict` while a non-terminal rental references the vehicle.
    async fn archive(&self, id: i32) -> AppResult<()>;

    /// Round trip to the backing store
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[async_trait]
pub trait RentalRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<Rental>;

    /// Non-cancelled rentals of a vehicle, ordered by start date
    async fn blocking_rentals(&self, vehicle_id: i32) -> AppResult<Vec<Rental>>;

    /// Check availability and insert in one step, serialized per vehicle.
    /// Fails with `AvailabilityConflict` without writing anything, and with
    /// `NotFound` or `Validation` when the vehicle was archived or unlisted meanwhile.
    async fn insert_if_available(&self, rental: &NewRental) -> AppResult<Rental>;

    /// Compare-and-set on the status. `None` when the rental is no longer in `from`.
    async fn transition_status(
        &self,
        id: i32,
        from: RentalStatus,
        to: RentalStatus,
    ) -> AppResult<Option<Rental>>;

    /// Store a payment reference unless the rental was closed meanwhile
    async fn submit_payment(&self, id: i32, reference: &str) -> AppResult<Option<Rental>>;

    /// Compare-and-set on the payment status
    async fn set_payment_status(
        &self,
        id: i32,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> AppResult<Option<Rental>>;

    /// A renter's rentals, newest start date first
    async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<RentalDetails>>;

    /// Pending rentals carrying a payment reference, oldest first
    async fn list_payment_queue(&self) -> AppResult<Vec<RentalDetails>>;

    /// Every rental with display data, for reporting
    async fn list_all(&self) -> AppResult<Vec<RentalDetails>>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_by_id(&self, id: i32) -> AppResult<User>;

    async fn update_profile(&self, id: i32, data: &UpdateProfile) -> AppResult<User>;
}

/// Main repository struct holding one store per aggregate
#[derive(Clone)]
pub struct Repository {
    pub vehicles: Arc<dyn VehicleRepository>,
    pub rentals: Arc<dyn RentalRepository>,
    pub users: Arc<dyn UserRepository>,
}

impl Repository {
    pub fn new(
        vehicles: Arc<dyn VehicleRepository>,
        rentals: Arc<dyn RentalRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            vehicles,
            rentals,
            users,
        }
    }

    /// Create a PostgreSQL-backed repository with the given database pool
    pub fn postgres(pool: Pool<Postgres>) -> Self {
        Self {
            vehicles: Arc::new(vehicles::PgVehicleRepository::new(pool.clone())),
            rentals: Arc::new(rentals::PgRentalRepository::new(pool.clone())),
            users: Arc::new(users::PgUserRepository::new(pool)),
        }
    }
}
