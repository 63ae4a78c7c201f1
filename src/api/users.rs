//! Renter profile endpoints

use axum::{extract::State, Json};
use axum_extra::extract::Multipart;
use serde::Deserialize;
use utoipa::ToSchema;

use super::{upload::MultipartForm, AuthenticatedUser};
use crate::{
    error::{AppError, AppResult},
    models::user::{UpdateProfile, User},
};

/// Multipart body of a profile update
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct ProfileForm {
    address: Option<String>,
    mobile_number: Option<String>,
    /// Driving licence photo, jpeg/jpg/png up to 1MB
    #[schema(value_type = Option<String>)]
    image: Option<Vec<u8>>,
}

/// Get the caller's profile
#[utoipa::path(
    get,
    path = "/users/profile",
    tag = "users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's profile", body = User),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse),
        (status = 404, description = "User not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_profile(
    State(state): State<crate::AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
) -> AppResult<Json<User>> {
    let user = state.services.users.profile(&principal).await?;
    Ok(Json(user))
}

/// Update the caller's profile
#[utoipa::path(
    put,
    path = "/users/profile",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body(content = ProfileForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Profile updated", body = User),
        (status = 400, description = "Invalid fields or image", body = crate::error::ErrorResponse),
        (status = 401, description = "Not authenticated", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_profile(
    State(state): State<crate::AppState>,
    AuthenticatedUser(principal): AuthenticatedUser,
    multipart: Multipart,
) -> AppResult<Json<User>> {
    let mut form = MultipartForm::read(multipart).await?;

    let mut files = form.take_files("image");
    if files.len() > 1 {
        return Err(AppError::Validation(
            "Only one licence image is allowed".to_string(),
        ));
    }

    let data = UpdateProfile {
        address: form.text("address"),
        mobile_number: form.text("mobileNumber"),
        license_image: None,
    };

    let user = state
        .services
        .users
        .update_profile(&principal, data, files.pop())
        .await?;
    Ok(Json(user))
}
