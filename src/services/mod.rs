//! Business logic services

pub mod policy;
pub mod rentals;
pub mod storage;
pub mod users;
pub mod vehicles;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::{config::DashboardConfig, error::AppResult, repository::Repository};
use policy::AuthorizationPolicy;
use storage::ImageStore;

/// Source of the current calendar date
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall clock, UTC calendar date
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub vehicles: vehicles::VehiclesService,
    pub rentals: rentals::RentalsService,
    pub users: users::UsersService,
    pub policy: Arc<dyn AuthorizationPolicy>,
    repository: Repository,
}

impl Services {
    /// Create all services over the given repository and collaborators
    pub fn new(
        repository: Repository,
        policy: Arc<dyn AuthorizationPolicy>,
        images: Arc<dyn ImageStore>,
        clock: Arc<dyn Clock>,
        dashboard: DashboardConfig,
    ) -> Self {
        Self {
            vehicles: vehicles::VehiclesService::new(repository.clone(), images.clone()),
            rentals: rentals::RentalsService::new(
                repository.clone(),
                policy.clone(),
                clock,
                dashboard,
            ),
            users: users::UsersService::new(repository.clone(), policy.clone(), images),
            policy,
            repository,
        }
    }

    /// Whether the backing store answers
    pub async fn ready(&self) -> AppResult<()> {
        self.repository.vehicles.ping().await
    }
}
