//! Car rental marketplace server
//!
//! A REST JSON API for a vehicle catalog, conflict-free bookings with an
//! admin-driven rental lifecycle, payment reference tracking and an
//! operational dashboard.

use std::sync::Arc;

pub mod api;
pub mod booking;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
