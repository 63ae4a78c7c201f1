//! Data models for the car rental server

pub mod rental;
pub mod user;
pub mod vehicle;

// Re-export commonly used types
pub use rental::{NewRental, PaymentStatus, Rental, RentalDetails, RentalStatus};
pub use user::{Principal, Role, User, UserShort};
pub use vehicle::{FuelType, Transmission, Vehicle, VehicleShort};
