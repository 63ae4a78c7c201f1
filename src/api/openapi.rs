//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, rentals, users, vehicles};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Car Rental API",
        version = "1.0.0",
        description = "Car rental marketplace REST API",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Vehicles
        vehicles::list_vehicles,
        vehicles::get_vehicle,
        vehicles::vehicle_availability,
        vehicles::create_vehicle,
        vehicles::update_vehicle,
        vehicles::delete_vehicle,
        // Rentals
        rentals::create_rental,
        rentals::get_user_rentals,
        rentals::update_rental_status,
        rentals::update_payment,
        rentals::review_payment,
        rentals::get_pending_with_payment,
        rentals::get_dashboard,
        // Users
        users::get_profile,
        users::update_profile,
    ),
    components(
        schemas(
            // Vehicles
            crate::models::vehicle::Vehicle,
            crate::models::vehicle::VehicleShort,
            crate::models::vehicle::FuelType,
            crate::models::vehicle::Transmission,
            vehicles::VehicleForm,
            crate::services::vehicles::Availability,
            crate::services::vehicles::ConflictInfo,
            // Rentals
            crate::models::rental::Rental,
            crate::models::rental::RentalDetails,
            crate::models::rental::RentalStatus,
            crate::models::rental::PaymentStatus,
            rentals::CreateRentalRequest,
            rentals::UpdateStatusRequest,
            rentals::UpdatePaymentRequest,
            rentals::ReviewPaymentRequest,
            // Dashboard
            crate::booking::dashboard::DashboardSummary,
            crate::booking::dashboard::PeriodCount,
            crate::booking::dashboard::PeriodRevenue,
            crate::booking::dashboard::TopVehicle,
            crate::booking::dashboard::RecentRental,
            // Users
            crate::models::user::User,
            crate::models::user::UserShort,
            crate::models::user::Role,
            users::ProfileForm,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "vehicles", description = "Vehicle catalog and availability"),
        (name = "rentals", description = "Bookings, payments and the admin dashboard"),
        (name = "users", description = "Renter profile")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_rental_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/rentals",
            "/rentals/user",
            "/rentals/{id}/status",
            "/rentals/{id}/payment",
            "/rentals/dashboard",
            "/rentals/pending-with-payment",
            "/vehicles/{id}/availability",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }
        assert!(doc
            .components
            .as_ref()
            .map(|c| c.security_schemes.contains_key("bearer_auth"))
            .unwrap_or(false));
    }
}
