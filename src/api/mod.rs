//! API handlers for the car rental REST endpoints

pub mod health;
pub mod openapi;
pub mod rentals;
pub mod upload;
pub mod users;
pub mod vehicles;

use axum::{
    async_trait,
    extract::{DefaultBodyLimit, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{
    error::AppError,
    models::{
        user::{Principal, UserClaims},
        vehicle::MAX_VEHICLE_IMAGES,
    },
    services::storage::MAX_IMAGE_BYTES,
    AppState,
};

/// Room for a full set of images plus the text fields
const UPLOAD_BODY_LIMIT: usize = (MAX_VEHICLE_IMAGES + 1) * MAX_IMAGE_BYTES;

/// Extractor for the caller identity carried by the bearer token
pub struct AuthenticatedUser(pub Principal);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Authentication("Invalid authorization header format".to_string()))?;

        let claims = UserClaims::from_token(token.trim(), &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims.into()))
    }
}

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Vehicles
        .route(
            "/vehicles",
            get(vehicles::list_vehicles).post(vehicles::create_vehicle),
        )
        .route(
            "/vehicles/:id",
            get(vehicles::get_vehicle)
                .put(vehicles::update_vehicle)
                .delete(vehicles::delete_vehicle),
        )
        .route("/vehicles/:id/availability", get(vehicles::vehicle_availability))
        // Rentals
        .route("/rentals", post(rentals::create_rental))
        .route("/rentals/user", get(rentals::get_user_rentals))
        .route("/rentals/dashboard", get(rentals::get_dashboard))
        .route(
            "/rentals/pending-with-payment",
            get(rentals::get_pending_with_payment),
        )
        .route("/rentals/:id/status", put(rentals::update_rental_status))
        .route("/rentals/:id/payment", put(rentals::update_payment))
        .route("/rentals/:id/payment/review", put(rentals::review_payment))
        // Users
        .route(
            "/users/profile",
            get(users::get_profile).put(users::update_profile),
        )
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .with_state(state.clone());

    let mut router = Router::new().nest("/api/v1", api_v1);

    // Images are served locally only when published under a path of this server
    let uploads_path = state.config.storage.public_url.trim_end_matches('/');
    if uploads_path.starts_with('/') && uploads_path.len() > 1 {
        router = router.nest_service(
            uploads_path,
            ServeDir::new(&state.config.storage.upload_dir),
        );
    }

    router
        .merge(openapi::create_openapi_router())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
