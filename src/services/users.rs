//! Renter profile service

use std::sync::Arc;

use validator::Validate;

use super::{
    policy::{AuthorizationPolicy, Operation},
    storage::{ImageStore, ImageUpload},
};
use crate::{
    error::AppResult,
    models::user::{Principal, UpdateProfile, User},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    policy: Arc<dyn AuthorizationPolicy>,
    images: Arc<dyn ImageStore>,
}

impl UsersService {
    pub fn new(
        repository: Repository,
        policy: Arc<dyn AuthorizationPolicy>,
        images: Arc<dyn ImageStore>,
    ) -> Self {
        Self {
            repository,
            policy,
            images,
        }
    }

    pub async fn profile(&self, principal: &Principal) -> AppResult<User> {
        self.repository.users.get_by_id(principal.user_id).await
    }

    /// Update the caller's own contact details and licence photo
    pub async fn update_profile(
        &self,
        principal: &Principal,
        mut data: UpdateProfile,
        licence: Option<ImageUpload>,
    ) -> AppResult<User> {
        self.policy.authorize(principal, Operation::EditOwnProfile)?;
        data.validate()?;

        let current = self.repository.users.get_by_id(principal.user_id).await?;

        if let Some(upload) = licence {
            upload.validate()?;
            data.license_image = Some(self.images.store(upload).await?);
        }

        let updated = match self
            .repository
            .users
            .update_profile(principal.user_id, &data)
            .await
        {
            Ok(user) => user,
            Err(e) => {
                if let Some(reference) = &data.license_image {
                    let _ = self.images.remove(reference).await;
                }
                return Err(e);
            }
        };

        if let (Some(old), Some(_)) = (&current.license_image, &data.license_image) {
            if let Err(e) = self.images.remove(old).await {
                tracing::warn!("Failed to remove old licence image {}: {}", old, e);
            }
        }

        tracing::info!("Profile updated for user {}", principal.user_id);
        Ok(updated)
    }
}
