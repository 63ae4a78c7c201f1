//! User model, profile updates and the authenticated principal

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// User role as issued by the identity provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// Full user model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub address: Option<String>,
    pub mobile_number: Option<String>,
    /// Stored reference of the driving licence photo
    pub license_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Short user representation for lists
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserShort {
    pub id: i32,
    pub name: String,
}

/// Update own profile (built from the multipart form)
#[derive(Debug, Clone, Default, Validate)]
pub struct UpdateProfile {
    #[validate(length(min = 1, max = 255, message = "Address must not be empty"))]
    pub address: Option<String>,
    #[validate(length(min = 7, max = 20, message = "Mobile number must be 7-20 characters"))]
    pub mobile_number: Option<String>,
    pub license_image: Option<String>,
}

/// Caller identity decoded from the bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i32,
    pub email: String,
    pub role: Role,
}

/// JWT claims issued by the identity provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserClaims {
    pub user_id: i32,
    pub email: String,
    pub role: Role,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
}

impl UserClaims {
    /// Encode a token (used by tooling and tests; tokens are normally issued upstream)
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse and verify a token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }
}

impl From<UserClaims> for Principal {
    fn from(claims: UserClaims) -> Self {
        Principal {
            user_id: claims.user_id,
            email: claims.email,
            role: claims.role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip_yields_principal() {
        let claims = UserClaims {
            user_id: 7,
            email: "renter@example.com".into(),
            role: Role::User,
            exp: Utc::now().timestamp() + 3600,
            iat: None,
        };
        let token = claims.create_token("secret").unwrap();

        let principal: Principal = UserClaims::from_token(&token, "secret").unwrap().into();
        assert_eq!(principal.user_id, 7);
        assert_eq!(principal.role, Role::User);

        assert!(UserClaims::from_token(&token, "other-secret").is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let claims = UserClaims {
            user_id: 7,
            email: "renter@example.com".into(),
            role: Role::User,
            exp: Utc::now().timestamp() - 3600,
            iat: None,
        };
        let token = claims.create_token("secret").unwrap();
        assert!(UserClaims::from_token(&token, "secret").is_err());
    }
}
