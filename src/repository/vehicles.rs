//! Vehicles repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder};

use super::{is_constraint_violation, VehicleRepository, UNIQUE_VIOLATION, VEHICLE_LOCK_NAMESPACE};
use crate::{
    error::{AppError, AppResult},
    models::vehicle::{NewVehicle, Vehicle, VehicleChanges, VehicleQuery},
};

#[derive(Clone)]
pub struct PgVehicleRepository {
    pool: Pool<Postgres>,
}

impl PgVehicleRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

fn map_plate_conflict(err: sqlx::Error, plate: Option<&str>) -> AppError {
    if is_constraint_violation(&err, UNIQUE_VIOLATION) {
        AppError::Conflict(format!(
            "A vehicle with license plate {} already exists",
            plate.unwrap_or("?")
        ))
    } else {
        AppError::Database(err)
    }
}

#[async_trait]
impl VehicleRepository for PgVehicleRepository {
    async fn list(&self, query: &VehicleQuery) -> AppResult<Vec<Vehicle>> {
        let mut builder =
            QueryBuilder::<Postgres>::new("SELECT * FROM vehicles WHERE archived_at IS NULL");

        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search);
            builder
                .push(" AND (make ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR model ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(fuel_type) = query.fuel_type {
            builder.push(" AND fuel_type = ").push_bind(fuel_type);
        }
        if let Some(transmission) = query.transmission {
            builder.push(" AND transmission = ").push_bind(transmission);
        }
        if let Some(available) = query.available {
            builder.push(" AND available = ").push_bind(available);
        }
        if let Some(max_price) = query.max_price {
            builder.push(" AND price_per_day <= ").push_bind(max_price);
        }
        builder.push(" ORDER BY make, model, id");

        let vehicles = builder
            .build_query_as::<Vehicle>()
            .fetch_all(&self.pool)
            .await?;
        Ok(vehicles)
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Vehicle> {
        sqlx::query_as::<_, Vehicle>(
            "SELECT * FROM vehicles WHERE id = $1 AND archived_at IS NULL",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Vehicle with id {} not found", id)))
    }

    async fn create(&self, data: &NewVehicle) -> AppResult<Vehicle> {
        sqlx::query_as::<_, Vehicle>(
            r#"
            INSERT INTO vehicles (
                make, model, year, color, license_plate, seats, fuel_type,
                transmission, price_per_day, features, images, available
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(&data.make)
        .bind(&data.model)
        .bind(data.year)
        .bind(&data.color)
        .bind(&data.license_plate)
        .bind(data.seats)
        .bind(data.fuel_type)
        .bind(data.transmission)
        .bind(data.price_per_day)
        .bind(&data.features)
        .bind(&data.images)
        .bind(data.available)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_plate_conflict(e, Some(&data.license_plate)))
    }

    async fn update(&self, id: i32, data: &VehicleChanges) -> AppResult<Vehicle> {
        let mut builder = QueryBuilder::<Postgres>::new("UPDATE vehicles SET updated_at = NOW()");

        if let Some(ref make) = data.make {
            builder.push(", make = ").push_bind(make.clone());
        }
        if let Some(ref model) = data.model {
            builder.push(", model = ").push_bind(model.clone());
        }
        if let Some(year) = data.year {
            builder.push(", year = ").push_bind(year);
        }
        if let Some(ref color) = data.color {
            builder.push(", color = ").push_bind(color.clone());
        }
        if let Some(ref plate) = data.license_plate {
            builder.push(", license_plate = ").push_bind(plate.clone());
        }
        if let Some(seats) = data.seats {
            builder.push(", seats = ").push_bind(seats);
        }
        if let Some(fuel_type) = data.fuel_type {
            builder.push(", fuel_type = ").push_bind(fuel_type);
        }
        if let Some(transmission) = data.transmission {
            builder.push(", transmission = ").push_bind(transmission);
        }
        if let Some(price) = data.price_per_day {
            builder.push(", price_per_day = ").push_bind(price);
        }
        if let Some(ref features) = data.features {
            builder.push(", features = ").push_bind(features.clone());
        }
        if let Some(ref images) = data.images {
            builder.push(", images = ").push_bind(images.clone());
        }
        if let Some(available) = data.available {
            builder.push(", available = ").push_bind(available);
        }

        builder
            .push(" WHERE id = ")
            .push_bind(id)
            .push(" AND archived_at IS NULL RETURNING *");

        builder
            .build_query_as::<Vehicle>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_plate_conflict(e, data.license_plate.as_deref()))?
            .ok_or_else(|| AppError::NotFound(format!("Vehicle with id {} not found", id)))
    }

    async fn archive(&self, id: i32) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        // Same lock as bookings, which re-read the vehicle once they hold it
        sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(VEHICLE_LOCK_NAMESPACE)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let open_rentals: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM rentals
            WHERE vehicle_id = $1 AND status IN ('pending', 'confirmed', 'active')
            "#,
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        if open_rentals > 0 {
            return Err(AppError::Conflict(format!(
                "Vehicle {} has {} open rental(s) and cannot be deleted",
                id, open_rentals
            )));
        }

        let result = sqlx::query(
            "UPDATE vehicles SET archived_at = NOW(), updated_at = NOW() WHERE id = $1 AND archived_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Vehicle with id {} not found", id)));
        }

        tx.commit().await?;
        Ok(())
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
