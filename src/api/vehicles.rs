//! Vehicle catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::{Multipart, WithRejection};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use super::{upload::MultipartForm, AuthenticatedUser};
use crate::{
    booking::availability::{deserialize_calendar_date, DateRange},
    error::{AppError, AppResult},
    models::vehicle::{FuelType, NewVehicle, Transmission, Vehicle, VehicleChanges, VehicleQuery},
    services::{
        policy::Operation,
        vehicles::{Availability, ImageChanges},
    },
};

/// Multipart body of vehicle create and update
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct VehicleForm {
    make: String,
    model: String,
    year: i32,
    color: String,
    license_plate: String,
    seats: i32,
    fuel_type: FuelType,
    transmission: Transmission,
    #[schema(value_type = String)]
    price_per_day: Decimal,
    /// Repeated parts or a JSON array
    features: Vec<String>,
    available: bool,
    /// Up to 5 files, jpeg/jpg/png, 1MB each
    #[schema(value_type = Vec<String>)]
    images: Vec<Vec<u8>>,
    /// Update only: references to keep
    existing_images: Option<Vec<String>>,
    /// Update only: references to drop
    removed_images: Option<Vec<String>>,
}

/// Availability check range
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AvailabilityQuery {
    /// `YYYY-MM-DD` or RFC 3339
    #[serde(alias = "startDate", deserialize_with = "deserialize_calendar_date")]
    #[param(value_type = String)]
    pub start_date: NaiveDate,
    #[serde(alias = "endDate", deserialize_with = "deserialize_calendar_date")]
    #[param(value_type = String)]
    pub end_date: NaiveDate,
}

fn new_vehicle_from(form: &MultipartForm) -> AppResult<NewVehicle> {
    Ok(NewVehicle {
        make: form.required("make")?,
        model: form.required("model")?,
        year: form.required("year")?,
        color: form.required("color")?,
        license_plate: form.required("licensePlate")?,
        seats: form.required("seats")?,
        fuel_type: form.required("fuelType")?,
        transmission: form.required("transmission")?,
        price_per_day: form.required("pricePerDay")?,
        features: form.list("features")?.unwrap_or_default(),
        images: Vec::new(),
        available: form.optional("available")?.unwrap_or(true),
    })
}

fn vehicle_changes_from(form: &MultipartForm) -> AppResult<VehicleChanges> {
    Ok(VehicleChanges {
        make: form.optional("make")?,
        model: form.optional("model")?,
        year: form.optional("year")?,
        color: form.optional("color")?,
        license_plate: form.optional("licensePlate")?,
        seats: form.optional("seats")?,
        fuel_type: form.optional("fuelType")?,
        transmission: form.optional("transmission")?,
        price_per_day: form.optional("pricePerDay")?,
        features: form.list("features")?,
        images: None,
        available: form.optional("available")?,
    })
}

/// List vehicles
#[utoipa::path(
    get,
    path = "/vehicles",
    tag = "vehicles",
    params(VehicleQuery),
    responses(
        (status = 200, description = "Vehicles matching the filters", body = Vec<Vehicle>),
        (status = 400, description = "Invalid filter", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_vehicles(
    State(state): State<crate::AppState>,
    WithRejection(Query(query), _): WithRejection<Query<VehicleQuery>, AppError>,
) -> AppResult<Json<Vec<Vehicle>>> {
    let vehicles = state.services.vehicles.list(&query).await?;
    Ok(Json(vehicles))
}

/// Get vehicle by ID
#[utoipa::path(
    get,
    path = "/vehicles/{id}",
    tag = "vehicles",
    params(
        ("id" = i32, Path, description = "Vehicle ID")
    ),
    responses(
        (status = 200, description = "Vehicle details", body = Vehicle),
        (status = 404, description = "Vehicle not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_vehicle(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<Vehicle>> {
    let vehicle = state.services.vehicles.get_by_id(id).await?;
    Ok(Json(vehicle))
}

/// Check whether a vehicle can be booked for a date range
#[utoipa::path(
    get,
    path = "/vehicles/{id}/availability",
    tag = "vehicles",
    params(
        ("id" = i32, Path, description = "Vehicle ID"),
        AvailabilityQuery
    ),
    responses(
        (status = 200, description = "Availability for the range", body = Availability),
        (status = 400, description = "Invalid range", body = crate::error::ErrorResponse),
        (status = 404, description = "Vehicle not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn vehicle_availability(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
    WithRejection(Query(query), _): WithRejection<Query<AvailabilityQuery>, AppError>,
) -> AppResult<Json<Availability>> {
    let range = DateRange::new(query.start_date, query.end_date)?;
    let availability = state.services.vehicles.availability(id, range).await?;
    Ok(Json(availability))
}

/// Create a vehicle
#[utoipa::path(
    post,
    path = "/vehicles",
    tag = "vehicles",
    security(("bearer_auth" = [])),
    request_body(content = VehicleForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Vehicle created", body = Vehicle),
        (status = 400, description = "Invalid fields or images", body = crate::error::ErrorResponse),
        (status = 403, description = "Admin access denied", body = crate::error::ErrorResponse),
        (status = 409, description = "License plate already registered", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_vehicle(
    State(state): State<crate::AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<Vehicle>)> {
    state
        .services
        .policy
        .authorize(&principal, Operation::ManageVehicles)?;

    let mut form = MultipartForm::read(multipart).await?;
    let data = new_vehicle_from(&form)?;
    let uploads = form.take_files("images");

    let vehicle = state.services.vehicles.create(data, uploads).await?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}

/// Update a vehicle
#[utoipa::path(
    put,
    path = "/vehicles/{id}",
    tag = "vehicles",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Vehicle ID")
    ),
    request_body(content = VehicleForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Vehicle updated", body = Vehicle),
        (status = 400, description = "Invalid fields or images", body = crate::error::ErrorResponse),
        (status = 403, description = "Admin access denied", body = crate::error::ErrorResponse),
        (status = 404, description = "Vehicle not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_vehicle(
    State(state): State<crate::AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i32>,
    multipart: Multipart,
) -> AppResult<Json<Vehicle>> {
    state
        .services
        .policy
        .authorize(&principal, Operation::ManageVehicles)?;

    let mut form = MultipartForm::read(multipart).await?;
    let changes = vehicle_changes_from(&form)?;
    let images = ImageChanges {
        keep: form.list("existingImages")?,
        remove: form.list("removedImages")?.unwrap_or_default(),
        uploads: form.take_files("images"),
    };

    let vehicle = state.services.vehicles.update(id, changes, images).await?;
    Ok(Json(vehicle))
}

/// Delete (archive) a vehicle
#[utoipa::path(
    delete,
    path = "/vehicles/{id}",
    tag = "vehicles",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Vehicle ID")
    ),
    responses(
        (status = 204, description = "Vehicle archived"),
        (status = 403, description = "Admin access denied", body = crate::error::ErrorResponse),
        (status = 404, description = "Vehicle not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Vehicle has open rentals", body = crate::error::ErrorResponse)
    )
)]
pub async fn delete_vehicle(
    State(state): State<crate::AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state
        .services
        .policy
        .authorize(&principal, Operation::ManageVehicles)?;

    state.services.vehicles.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
