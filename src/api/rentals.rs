//! Rental endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use super::AuthenticatedUser;
use crate::{
    booking::{
        availability::{deserialize_calendar_date, deserialize_optional_calendar_date},
        dashboard::DashboardSummary,
    },
    error::{AppError, AppResult},
    models::rental::{PaymentStatus, Rental, RentalDetails, RentalStatus},
    services::rentals::DashboardFilter,
};

/// Create rental request
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRentalRequest {
    #[serde(alias = "carId")]
    pub vehicle_id: i32,
    /// `YYYY-MM-DD` or RFC 3339; the time of day is ignored
    #[serde(deserialize_with = "deserialize_calendar_date")]
    #[schema(value_type = String, example = "2024-01-10")]
    pub start_date: NaiveDate,
    #[serde(deserialize_with = "deserialize_calendar_date")]
    #[schema(value_type = String, example = "2024-01-12")]
    pub end_date: NaiveDate,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateStatusRequest {
    pub status: RentalStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentRequest {
    pub payment_reference_number: String,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPaymentRequest {
    /// `paid` or `failed`
    pub payment_status: PaymentStatus,
}

/// Dashboard filters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct DashboardQuery {
    /// Earliest rental start date included
    #[serde(default, deserialize_with = "deserialize_optional_calendar_date")]
    #[param(value_type = Option<String>)]
    pub from: Option<NaiveDate>,
    /// Latest rental start date included
    #[serde(default, deserialize_with = "deserialize_optional_calendar_date")]
    #[param(value_type = Option<String>)]
    pub to: Option<NaiveDate>,
    /// Restrict the figures to one renter
    pub user_id: Option<i32>,
}

/// Book a vehicle
#[utoipa::path(
    post,
    path = "/rentals",
    tag = "rentals",
    security(("bearer_auth" = [])),
    request_body = CreateRentalRequest,
    responses(
        (status = 201, description = "Rental created", body = Rental),
        (status = 400, description = "Invalid dates or vehicle not bookable", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 404, description = "Vehicle or user not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Vehicle already booked for these dates", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_rental(
    State(state): State<crate::AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    WithRejection(Json(request), _): WithRejection<Json<CreateRentalRequest>, AppError>,
) -> AppResult<(StatusCode, Json<Rental>)> {
    let rental = state
        .services
        .rentals
        .create_rental(
            &principal,
            request.vehicle_id,
            request.start_date,
            request.end_date,
        )
        .await?;

    Ok((StatusCode::CREATED, Json(rental)))
}

/// The caller's rentals
#[utoipa::path(
    get,
    path = "/rentals/user",
    tag = "rentals",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Rentals, newest start date first", body = Vec<RentalDetails>),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_user_rentals(
    State(state): State<crate::AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
) -> AppResult<Json<Vec<RentalDetails>>> {
    let rentals = state.services.rentals.user_rentals(&principal).await?;
    Ok(Json(rentals))
}

/// Change a rental's status
#[utoipa::path(
    put,
    path = "/rentals/{id}/status",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Rental ID")
    ),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = Rental),
        (status = 403, description = "Admin access denied", body = crate::error::ErrorResponse),
        (status = 404, description = "Rental not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Transition not allowed", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_rental_status(
    State(state): State<crate::AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i32>,
    WithRejection(Json(request), _): WithRejection<Json<UpdateStatusRequest>, AppError>,
) -> AppResult<Json<Rental>> {
    let rental = state
        .services
        .rentals
        .update_status(&principal, id, request.status)
        .await?;
    Ok(Json(rental))
}

/// Submit a payment reference for one of the caller's rentals
#[utoipa::path(
    put,
    path = "/rentals/{id}/payment",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Rental ID")
    ),
    request_body = UpdatePaymentRequest,
    responses(
        (status = 200, description = "Payment reference recorded", body = Rental),
        (status = 400, description = "Empty reference", body = crate::error::ErrorResponse),
        (status = 403, description = "Not the renter", body = crate::error::ErrorResponse),
        (status = 404, description = "Rental not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Rental is closed", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_payment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i32>,
    WithRejection(Json(request), _): WithRejection<Json<UpdatePaymentRequest>, AppError>,
) -> AppResult<Json<Rental>> {
    let rental = state
        .services
        .rentals
        .update_payment(&principal, id, &request.payment_reference_number)
        .await?;
    Ok(Json(rental))
}

/// Mark a submitted payment as paid or failed
#[utoipa::path(
    put,
    path = "/rentals/{id}/payment/review",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Rental ID")
    ),
    request_body = ReviewPaymentRequest,
    responses(
        (status = 200, description = "Payment reviewed", body = Rental),
        (status = 400, description = "Outcome must be paid or failed", body = crate::error::ErrorResponse),
        (status = 403, description = "Admin access denied", body = crate::error::ErrorResponse),
        (status = 409, description = "No payment awaiting review", body = crate::error::ErrorResponse)
    )
)]
pub async fn review_payment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    Path(id): Path<i32>,
    WithRejection(Json(request), _): WithRejection<Json<ReviewPaymentRequest>, AppError>,
) -> AppResult<Json<Rental>> {
    let rental = state
        .services
        .rentals
        .review_payment(&principal, id, request.payment_status)
        .await?;
    Ok(Json(rental))
}

/// Pending rentals with a submitted payment reference
#[utoipa::path(
    get,
    path = "/rentals/pending-with-payment",
    tag = "rentals",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Payment work queue, oldest first", body = Vec<RentalDetails>),
        (status = 403, description = "Admin access denied", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_pending_with_payment(
    State(state): State<crate::AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
) -> AppResult<Json<Vec<RentalDetails>>> {
    let rentals = state.services.rentals.pending_with_payment(&principal).await?;
    Ok(Json(rentals))
}

/// Dashboard figures
#[utoipa::path(
    get,
    path = "/rentals/dashboard",
    tag = "rentals",
    security(("bearer_auth" = [])),
    params(DashboardQuery),
    responses(
        (status = 200, description = "Dashboard summary", body = DashboardSummary),
        (status = 400, description = "Invalid window", body = crate::error::ErrorResponse),
        (status = 403, description = "Admin access denied", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_dashboard(
    State(state): State<crate::AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    WithRejection(Query(query), _): WithRejection<Query<DashboardQuery>, AppError>,
) -> AppResult<Json<DashboardSummary>> {
    let filter = DashboardFilter {
        from: query.from,
        to: query.to,
        user_id: query.user_id,
    };
    let summary = state.services.rentals.dashboard(&principal, filter).await?;
    Ok(Json(summary))
}
