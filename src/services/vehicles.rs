//! Vehicle catalog service

use std::{collections::HashSet, sync::Arc};

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;
use validator::Validate;

use super::storage::{ImageStore, ImageUpload};
use crate::{
    booking::availability::{find_conflict, DateRange},
    error::{AppError, AppResult},
    models::vehicle::{NewVehicle, Vehicle, VehicleChanges, VehicleQuery, MAX_VEHICLE_IMAGES},
    repository::Repository,
};

/// Image changes accompanying a vehicle update
#[derive(Debug, Default)]
pub struct ImageChanges {
    /// New files to store and append
    pub uploads: Vec<ImageUpload>,
    /// References to keep, all from the vehicle's current list; `None` keeps the current list
    pub keep: Option<Vec<String>>,
    /// References to drop
    pub remove: Vec<String>,
}

impl ImageChanges {
    fn is_empty(&self) -> bool {
        self.uploads.is_empty() && self.keep.is_none() && self.remove.is_empty()
    }
}

/// Range already held by another rental
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConflictInfo {
    pub rental_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Availability check result
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub vehicle_id: i32,
    /// The vehicle's manual "listed" flag
    pub listed: bool,
    /// Listed and free for the whole range
    pub available: bool,
    pub conflict: Option<ConflictInfo>,
}

#[derive(Clone)]
pub struct VehiclesService {
    repository: Repository,
    images: Arc<dyn ImageStore>,
}

impl VehiclesService {
    pub fn new(repository: Repository, images: Arc<dyn ImageStore>) -> Self {
        Self { repository, images }
    }

    pub async fn list(&self, query: &VehicleQuery) -> AppResult<Vec<Vehicle>> {
        self.repository.vehicles.list(query).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Vehicle> {
        self.repository.vehicles.get_by_id(id).await
    }

    /// Whether the vehicle can be booked for the range, with the first conflict if any
    pub async fn availability(&self, id: i32, range: DateRange) -> AppResult<Availability> {
        let vehicle = self.repository.vehicles.get_by_id(id).await?;
        let rentals = self.repository.rentals.blocking_rentals(id).await?;

        let conflict = find_conflict(&range, &rentals).map(|r| ConflictInfo {
            rental_id: r.id,
            start_date: r.start_date,
            end_date: r.end_date,
        });

        Ok(Availability {
            vehicle_id: id,
            listed: vehicle.available,
            available: vehicle.available && conflict.is_none(),
            conflict,
        })
    }

    pub async fn create(&self, mut data: NewVehicle, uploads: Vec<ImageUpload>) -> AppResult<Vehicle> {
        data.validate()?;
        if uploads.len() > MAX_VEHICLE_IMAGES {
            return Err(AppError::Validation(format!(
                "At most {} images are allowed",
                MAX_VEHICLE_IMAGES
            )));
        }
        for upload in &uploads {
            upload.validate()?;
        }

        let stored = self.store_all(uploads).await?;
        data.images = stored.clone();

        match self.repository.vehicles.create(&data).await {
            Ok(vehicle) => {
                tracing::info!("Vehicle {} created ({})", vehicle.id, vehicle.license_plate);
                Ok(vehicle)
            }
            Err(e) => {
                self.discard(&stored).await;
                Err(e)
            }
        }
    }

    pub async fn update(
        &self,
        id: i32,
        mut changes: VehicleChanges,
        images: ImageChanges,
    ) -> AppResult<Vehicle> {
        changes.validate()?;
        let current = self.repository.vehicles.get_by_id(id).await?;

        let mut stored = Vec::new();
        if !images.is_empty() {
            if let Some(keep) = &images.keep {
                if let Some(unknown) = keep.iter().find(|img| !current.images.contains(img)) {
                    return Err(AppError::Validation(format!(
                        "Image {} does not belong to vehicle {}",
                        unknown, id
                    )));
                }
            }

            let mut seen = HashSet::new();
            let mut kept: Vec<String> = images
                .keep
                .clone()
                .unwrap_or_else(|| current.images.clone())
                .into_iter()
                .filter(|img| !images.remove.contains(img))
                .filter(|img| seen.insert(img.clone()))
                .collect();

            if kept.len() + images.uploads.len() > MAX_VEHICLE_IMAGES {
                return Err(AppError::Validation(format!(
                    "At most {} images are allowed",
                    MAX_VEHICLE_IMAGES
                )));
            }
            for upload in &images.uploads {
                upload.validate()?;
            }

            stored = self.store_all(images.uploads).await?;
            kept.extend(stored.iter().cloned());
            changes.images = Some(kept);
        }

        let updated = match self.repository.vehicles.update(id, &changes).await {
            Ok(vehicle) => vehicle,
            Err(e) => {
                self.discard(&stored).await;
                return Err(e);
            }
        };

        let dropped: Vec<String> = current
            .images
            .into_iter()
            .filter(|img| !updated.images.contains(img))
            .collect();
        self.discard(&dropped).await;

        tracing::info!("Vehicle {} updated", id);
        Ok(updated)
    }

    /// Archive the vehicle; refused while it has open rentals
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.repository.vehicles.archive(id).await?;
        tracing::info!("Vehicle {} archived", id);
        Ok(())
    }

    async fn store_all(&self, uploads: Vec<ImageUpload>) -> AppResult<Vec<String>> {
        let mut stored = Vec::with_capacity(uploads.len());
        for upload in uploads {
            match self.images.store(upload).await {
                Ok(reference) => stored.push(reference),
                Err(e) => {
                    self.discard(&stored).await;
                    return Err(e);
                }
            }
        }
        Ok(stored)
    }

    /// Best-effort cleanup of stored images
    async fn discard(&self, references: &[String]) {
        for reference in references {
            if let Err(e) = self.images.remove(reference).await {
                tracing::warn!("Failed to remove image {}: {}", reference, e);
            }
        }
    }
}
