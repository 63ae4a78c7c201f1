//! Rentals repository for database operations

use async_trait::async_trait;
use sqlx::{FromRow, Pool, Postgres};

use super::{
    ensure_bookable, is_constraint_violation, RentalRepository, EXCLUSION_VIOLATION,
    VEHICLE_LOCK_NAMESPACE,
};
use crate::{
    booking::availability::{ensure_available, find_conflict},
    error::{AppError, AppResult},
    models::{
        rental::{NewRental, PaymentStatus, Rental, RentalDetails, RentalStatus},
        user::UserShort,
        vehicle::VehicleShort,
    },
};

/// Joined projection used by every listing query
const DETAILS_SELECT: &str = r#"
    SELECT r.*,
           v.make AS vehicle_make, v.model AS vehicle_model, v.year AS vehicle_year,
           u.name AS user_name
    FROM rentals r
    JOIN vehicles v ON v.id = r.vehicle_id
    JOIN users u ON u.id = r.user_id
"#;

#[derive(Debug, FromRow)]
struct RentalDetailsRow {
    #[sqlx(flatten)]
    rental: Rental,
    vehicle_make: String,
    vehicle_model: String,
    vehicle_year: i32,
    user_name: String,
}

impl From<RentalDetailsRow> for RentalDetails {
    fn from(row: RentalDetailsRow) -> Self {
        RentalDetails {
            vehicle: VehicleShort {
                id: row.rental.vehicle_id,
                make: row.vehicle_make,
                model: row.vehicle_model,
                year: row.vehicle_year,
            },
            user: UserShort {
                id: row.rental.user_id,
                name: row.user_name,
            },
            rental: row.rental,
        }
    }
}

#[derive(Clone)]
pub struct PgRentalRepository {
    pool: Pool<Postgres>,
}

impl PgRentalRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    async fn fetch_details(&self, sql: &str, user_id: Option<i32>) -> AppResult<Vec<RentalDetails>> {
        let mut query = sqlx::query_as::<_, RentalDetailsRow>(sql);
        if let Some(user_id) = user_id {
            query = query.bind(user_id);
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(RentalDetails::from).collect())
    }
}

#[async_trait]
impl RentalRepository for PgRentalRepository {
    async fn get_by_id(&self, id: i32) -> AppResult<Rental> {
        sqlx::query_as::<_, Rental>("SELECT * FROM rentals WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Rental with id {} not found", id)))
    }

    async fn blocking_rentals(&self, vehicle_id: i32) -> AppResult<Vec<Rental>> {
        let rentals = sqlx::query_as::<_, Rental>(
            r#"
            SELECT * FROM rentals
            WHERE vehicle_id = $1 AND status <> 'cancelled'
            ORDER BY start_date, id
            "#,
        )
        .bind(vehicle_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rentals)
    }

    async fn insert_if_available(&self, rental: &NewRental) -> AppResult<Rental> {
        let mut tx = self.pool.begin().await?;

        // Serialize check-and-insert per vehicle; released at commit/rollback
        sqlx::query("SELECT pg_advisory_xact_lock($1, $2)")
            .bind(VEHICLE_LOCK_NAMESPACE)
            .bind(rental.vehicle_id)
            .execute(&mut *tx)
            .await?;

        // Archival and unlisting may have committed since the caller read the vehicle
        let listed: Option<bool> = sqlx::query_scalar(
            "SELECT available FROM vehicles WHERE id = $1 AND archived_at IS NULL FOR SHARE",
        )
        .bind(rental.vehicle_id)
        .fetch_optional(&mut *tx)
        .await?;
        ensure_bookable(rental.vehicle_id, listed)?;

        let existing = sqlx::query_as::<_, Rental>(
            r#"
            SELECT * FROM rentals
            WHERE vehicle_id = $1 AND status <> 'cancelled'
              AND start_date <= $3 AND end_date >= $2
            "#,
        )
        .bind(rental.vehicle_id)
        .bind(rental.range.start)
        .bind(rental.range.end)
        .fetch_all(&mut *tx)
        .await?;

        ensure_available(&rental.range, &existing)?;

        let inserted = sqlx::query_as::<_, Rental>(
            r#"
            INSERT INTO rentals (vehicle_id, user_id, start_date, end_date, total_cost, status, payment_status)
            VALUES ($1, $2, $3, $4, $5, 'pending', 'unpaid')
            RETURNING *
            "#,
        )
        .bind(rental.vehicle_id)
        .bind(rental.user_id)
        .bind(rental.range.start)
        .bind(rental.range.end)
        .bind(rental.total_cost)
        .fetch_one(&mut *tx)
        .await;

        let inserted = match inserted {
            Ok(row) => row,
            Err(e) if is_constraint_violation(&e, EXCLUSION_VIOLATION) => {
                drop(tx);
                // A writer outside the lock won the range; report who holds it
                let holders = self.blocking_rentals(rental.vehicle_id).await?;
                return Err(match find_conflict(&rental.range, &holders) {
                    Some(conflict) => AppError::AvailabilityConflict {
                        rental_id: conflict.id,
                        start_date: conflict.start_date,
                        end_date: conflict.end_date,
                    },
                    None => AppError::Conflict("Vehicle is already booked for these dates".to_string()),
                });
            }
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;
        Ok(inserted)
    }

    async fn transition_status(
        &self,
        id: i32,
        from: RentalStatus,
        to: RentalStatus,
    ) -> AppResult<Option<Rental>> {
        let rental = sqlx::query_as::<_, Rental>(
            r#"
            UPDATE rentals SET status = $1, updated_at = NOW()
            WHERE id = $2 AND status = $3
            RETURNING *
            "#,
        )
        .bind(to)
        .bind(id)
        .bind(from)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rental)
    }

    async fn submit_payment(&self, id: i32, reference: &str) -> AppResult<Option<Rental>> {
        let rental = sqlx::query_as::<_, Rental>(
            r#"
            UPDATE rentals
            SET payment_reference_number = $1, payment_status = 'pending', updated_at = NOW()
            WHERE id = $2 AND status NOT IN ('completed', 'cancelled')
            RETURNING *
            "#,
        )
        .bind(reference)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rental)
    }

    async fn set_payment_status(
        &self,
        id: i32,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> AppResult<Option<Rental>> {
        let rental = sqlx::query_as::<_, Rental>(
            r#"
            UPDATE rentals SET payment_status = $1, updated_at = NOW()
            WHERE id = $2 AND payment_status = $3
            RETURNING *
            "#,
        )
        .bind(to)
        .bind(id)
        .bind(from)
        .fetch_optional(&self.pool)
        .await?;
        Ok(rental)
    }

    async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<RentalDetails>> {
        let sql = format!(
            "{} WHERE r.user_id = $1 ORDER BY r.start_date DESC, r.id DESC",
            DETAILS_SELECT
        );
        self.fetch_details(&sql, Some(user_id)).await
    }

    async fn list_payment_queue(&self) -> AppResult<Vec<RentalDetails>> {
        let sql = format!(
            r#"{} WHERE r.status = 'pending'
                 AND r.payment_reference_number IS NOT NULL
                 AND btrim(r.payment_reference_number) <> ''
               ORDER BY r.created_at, r.id"#,
            DETAILS_SELECT
        );
        self.fetch_details(&sql, None).await
    }

    async fn list_all(&self) -> AppResult<Vec<RentalDetails>> {
        let sql = format!("{} ORDER BY r.created_at, r.id", DETAILS_SELECT);
        self.fetch_details(&sql, None).await
    }
}
