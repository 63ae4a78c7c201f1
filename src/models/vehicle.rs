//! Vehicle model and related types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

/// Maximum number of images attached to one vehicle
pub const MAX_VEHICLE_IMAGES: usize = 5;

/// Highest accepted day rate
pub const MAX_PRICE_PER_DAY: i64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "fuel_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FuelType {
    Petrol,
    Diesel,
    Electric,
    Hybrid,
}

impl std::str::FromStr for FuelType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "petrol" => Ok(FuelType::Petrol),
            "diesel" => Ok(FuelType::Diesel),
            "electric" => Ok(FuelType::Electric),
            "hybrid" => Ok(FuelType::Hybrid),
            _ => Err(format!("Invalid fuel type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "transmission", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Transmission {
    Manual,
    Automatic,
}

impl std::str::FromStr for Transmission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "manual" => Ok(Transmission::Manual),
            "automatic" => Ok(Transmission::Automatic),
            _ => Err(format!("Invalid transmission: {}", s)),
        }
    }
}

/// Vehicle record
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: i32,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub color: String,
    pub license_plate: String,
    pub seats: i32,
    pub fuel_type: FuelType,
    pub transmission: Transmission,
    #[schema(value_type = String, example = "1000.00")]
    pub price_per_day: Decimal,
    pub features: Vec<String>,
    /// Stored image references
    pub images: Vec<String>,
    /// Listed for booking. Set by administrators, independent of existing rentals.
    pub available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing)]
    pub archived_at: Option<DateTime<Utc>>,
}

impl Vehicle {
    /// Display label, e.g. "Toyota Corolla"
    pub fn label(&self) -> String {
        format!("{} {}", self.make, self.model)
    }
}

/// Short vehicle representation embedded in rental listings
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VehicleShort {
    pub id: i32,
    pub make: String,
    pub model: String,
    pub year: i32,
}

/// Catalog query parameters
#[derive(Debug, Default, Clone, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct VehicleQuery {
    /// Case-insensitive match on make or model
    pub search: Option<String>,
    pub fuel_type: Option<FuelType>,
    pub transmission: Option<Transmission>,
    /// Only vehicles listed for booking
    pub available: Option<bool>,
    #[schema(value_type = Option<String>)]
    pub max_price: Option<Decimal>,
}

fn validate_price(price: &Decimal) -> Result<(), ValidationError> {
    if !price.is_sign_positive() || price.is_zero() {
        return Err(ValidationError::new("price_per_day_must_be_positive"));
    }
    if *price > Decimal::from(MAX_PRICE_PER_DAY) {
        return Err(ValidationError::new("price_per_day_too_high"));
    }
    Ok(())
}

/// Vehicle fields for creation (built from the multipart form)
#[derive(Debug, Clone, Validate)]
pub struct NewVehicle {
    #[validate(length(min = 1, max = 100, message = "Make is required"))]
    pub make: String,
    #[validate(length(min = 1, max = 100, message = "Model is required"))]
    pub model: String,
    #[validate(range(min = 1900, max = 2100, message = "Invalid year"))]
    pub year: i32,
    #[validate(length(min = 1, max = 50, message = "Color is required"))]
    pub color: String,
    #[validate(length(min = 1, max = 20, message = "License plate is required"))]
    pub license_plate: String,
    #[validate(range(min = 1, max = 60, message = "Invalid seat count"))]
    pub seats: i32,
    pub fuel_type: FuelType,
    pub transmission: Transmission,
    #[validate(custom(function = "validate_price", message = "Price per day must be positive and at most 1000000"))]
    pub price_per_day: Decimal,
    pub features: Vec<String>,
    #[validate(length(max = 5, message = "At most 5 images are allowed"))]
    pub images: Vec<String>,
    pub available: bool,
}

/// Partial vehicle update; `images` is the full resulting image list when set
#[derive(Debug, Clone, Default, Validate)]
pub struct VehicleChanges {
    #[validate(length(min = 1, max = 100))]
    pub make: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub model: Option<String>,
    #[validate(range(min = 1900, max = 2100, message = "Invalid year"))]
    pub year: Option<i32>,
    #[validate(length(min = 1, max = 50))]
    pub color: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub license_plate: Option<String>,
    #[validate(range(min = 1, max = 60, message = "Invalid seat count"))]
    pub seats: Option<i32>,
    pub fuel_type: Option<FuelType>,
    pub transmission: Option<Transmission>,
    #[validate(custom(function = "validate_price", message = "Price per day must be positive and at most 1000000"))]
    pub price_per_day: Option<Decimal>,
    pub features: Option<Vec<String>>,
    #[validate(length(max = 5, message = "At most 5 images are allowed"))]
    pub images: Option<Vec<String>>,
    pub available: Option<bool>,
}
