//! Shared fixtures: in-memory stores, a fixed clock and token minting

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use tokio::sync::Mutex;

use car_rental_server::{
    booking::availability::ensure_available,
    config::{
        AdminConfig, AppConfig, AuthConfig, DashboardConfig, DatabaseConfig, LoggingConfig,
        ServerConfig, StorageConfig,
    },
    error::{AppError, AppResult},
    models::{
        rental::{NewRental, PaymentStatus, Rental, RentalDetails, RentalStatus},
        user::{Principal, Role, UpdateProfile, User, UserClaims, UserShort},
        vehicle::{
            FuelType, NewVehicle, Transmission, Vehicle, VehicleChanges, VehicleQuery,
            VehicleShort,
        },
    },
    repository::{
        ensure_bookable, RentalRepository, Repository, UserRepository, VehicleRepository,
    },
    services::{
        policy::{AccessPolicy, EmailAllowList},
        storage::{ImageStore, ImageUpload},
        Clock, Services,
    },
    AppState,
};

pub const JWT_SECRET: &str = "test-secret";
pub const ADMIN_EMAIL: &str = "admin@example.com";

pub const ADMIN_ID: i32 = 1;
pub const ALICE_ID: i32 = 2;
pub const BOB_ID: i32 = 3;

pub fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap()
}

#[derive(Default)]
struct State {
    vehicles: Vec<Vehicle>,
    rentals: Vec<Rental>,
    users: Vec<User>,
    next_id: i32,
}

impl State {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn details(&self, rental: &Rental) -> RentalDetails {
        let vehicle = self
            .vehicles
            .iter()
            .find(|v| v.id == rental.vehicle_id)
            .expect("rental references a known vehicle");
        let user = self
            .users
            .iter()
            .find(|u| u.id == rental.user_id)
            .expect("rental references a known user");
        RentalDetails {
            rental: rental.clone(),
            vehicle: VehicleShort {
                id: vehicle.id,
                make: vehicle.make.clone(),
                model: vehicle.model.clone(),
                year: vehicle.year,
            },
            user: UserShort {
                id: user.id,
                name: user.name.clone(),
            },
        }
    }

    fn rental_mut(&mut self, id: i32) -> AppResult<&mut Rental> {
        self.rentals
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Rental with id {} not found", id)))
    }
}

/// In-memory stand-in for the PostgreSQL repositories.
/// One lock guards everything, which makes check-and-insert atomic.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub async fn add_user(&self, id: i32, name: &str, email: &str, role: Role) {
        let mut state = self.state.lock().await;
        state.next_id = state.next_id.max(id);
        state.users.push(User {
            id,
            name: name.to_string(),
            email: email.to_string(),
            role,
            address: None,
            mobile_number: None,
            license_image: None,
            created_at: epoch(),
            updated_at: epoch(),
        });
    }

    /// Snapshot of every stored rental
    pub async fn rentals(&self) -> Vec<Rental> {
        self.state.lock().await.rentals.clone()
    }
}

#[async_trait]
impl VehicleRepository for MemoryStore {
    async fn list(&self, query: &VehicleQuery) -> AppResult<Vec<Vehicle>> {
        let state = self.state.lock().await;
        let search = query.search.as_deref().map(str::to_lowercase);
        Ok(state
            .vehicles
            .iter()
            .filter(|v| v.archived_at.is_none())
            .filter(|v| {
                search.as_deref().map_or(true, |s| {
                    v.make.to_lowercase().contains(s) || v.model.to_lowercase().contains(s)
                })
            })
            .filter(|v| query.fuel_type.map_or(true, |f| v.fuel_type == f))
            .filter(|v| query.transmission.map_or(true, |t| v.transmission == t))
            .filter(|v| query.available.map_or(true, |a| v.available == a))
            .filter(|v| query.max_price.map_or(true, |p| v.price_per_day <= p))
            .cloned()
            .collect())
    }

    async fn get_by_id(&self, id: i32) -> AppResult<Vehicle> {
        let state = self.state.lock().await;
        state
            .vehicles
            .iter()
            .find(|v| v.id == id && v.archived_at.is_none())
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Vehicle with id {} not found", id)))
    }

    async fn create(&self, data: &NewVehicle) -> AppResult<Vehicle> {
        let mut state = self.state.lock().await;
        if state
            .vehicles
            .iter()
            .any(|v| v.archived_at.is_none() && v.license_plate == data.license_plate)
        {
            return Err(AppError::Conflict(format!(
                "License plate {} is already registered",
                data.license_plate
            )));
        }
        let vehicle = Vehicle {
            id: state.next_id(),
            make: data.make.clone(),
            model: data.model.clone(),
            year: data.year,
            color: data.color.clone(),
            license_plate: data.license_plate.clone(),
            seats: data.seats,
            fuel_type: data.fuel_type,
            transmission: data.transmission,
            price_per_day: data.price_per_day,
            features: data.features.clone(),
            images: data.images.clone(),
            available: data.available,
            created_at: epoch(),
            updated_at: epoch(),
            archived_at: None,
        };
        state.vehicles.push(vehicle.clone());
        Ok(vehicle)
    }

    async fn update(&self, id: i32, data: &VehicleChanges) -> AppResult<Vehicle> {
        let mut state = self.state.lock().await;
        let vehicle = state
            .vehicles
            .iter_mut()
            .find(|v| v.id == id && v.archived_at.is_none())
            .ok_or_else(|| AppError::NotFound(format!("Vehicle with id {} not found", id)))?;

        if let Some(make) = &data.make {
            vehicle.make = make.clone();
        }
        if let Some(model) = &data.model {
            vehicle.model = model.clone();
        }
        if let Some(price) = data.price_per_day {
            vehicle.price_per_day = price;
        }
        if let Some(images) = &data.images {
            vehicle.images = images.clone();
        }
        if let Some(available) = data.available {
            vehicle.available = available;
        }
        if let Some(features) = &data.features {
            vehicle.features = features.clone();
        }
        Ok(vehicle.clone())
    }

    async fn archive(&self, id: i32) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let open = state
            .rentals
            .iter()
            .filter(|r| r.vehicle_id == id && !r.status.is_terminal())
            .count();
        let vehicle = state
            .vehicles
            .iter_mut()
            .find(|v| v.id == id && v.archived_at.is_none())
            .ok_or_else(|| AppError::NotFound(format!("Vehicle with id {} not found", id)))?;
        if open > 0 {
            return Err(AppError::Conflict(format!(
                "Vehicle {} has {} open rentals",
                id, open
            )));
        }
        vehicle.archived_at = Some(Utc::now());
        Ok(())
    }
}

#[async_trait]
impl RentalRepository for MemoryStore {
    async fn get_by_id(&self, id: i32) -> AppResult<Rental> {
        let mut state = self.state.lock().await;
        state.rental_mut(id).map(|r| r.clone())
    }

    async fn blocking_rentals(&self, vehicle_id: i32) -> AppResult<Vec<Rental>> {
        let state = self.state.lock().await;
        let mut rentals: Vec<Rental> = state
            .rentals
            .iter()
            .filter(|r| r.vehicle_id == vehicle_id && r.status.blocks_vehicle())
            .cloned()
            .collect();
        rentals.sort_by_key(|r| (r.start_date, r.id));
        Ok(rentals)
    }

    async fn insert_if_available(&self, rental: &NewRental) -> AppResult<Rental> {
        let mut state = self.state.lock().await;
        // Let a competing booking queue up on the lock
        tokio::task::yield_now().await;

        let listed = state
            .vehicles
            .iter()
            .find(|v| v.id == rental.vehicle_id && v.archived_at.is_none())
            .map(|v| v.available);
        ensure_bookable(rental.vehicle_id, listed)?;

        ensure_available(
            &rental.range,
            state.rentals.iter().filter(|r| r.vehicle_id == rental.vehicle_id),
        )?;

        let id = state.next_id();
        let created_at = epoch() + Duration::minutes(id as i64);
        let row = Rental {
            id,
            vehicle_id: rental.vehicle_id,
            user_id: rental.user_id,
            start_date: rental.range.start,
            end_date: rental.range.end,
            total_cost: rental.total_cost,
            status: RentalStatus::Pending,
            payment_reference_number: None,
            payment_status: PaymentStatus::Unpaid,
            created_at,
            updated_at: created_at,
        };
        state.rentals.push(row.clone());
        Ok(row)
    }

    async fn transition_status(
        &self,
        id: i32,
        from: RentalStatus,
        to: RentalStatus,
    ) -> AppResult<Option<Rental>> {
        let mut state = self.state.lock().await;
        let rental = state.rental_mut(id)?;
        if rental.status != from {
            return Ok(None);
        }
        rental.status = to;
        Ok(Some(rental.clone()))
    }

    async fn submit_payment(&self, id: i32, reference: &str) -> AppResult<Option<Rental>> {
        let mut state = self.state.lock().await;
        let rental = state.rental_mut(id)?;
        if rental.status.is_terminal() {
            return Ok(None);
        }
        rental.payment_reference_number = Some(reference.to_string());
        rental.payment_status = PaymentStatus::Pending;
        Ok(Some(rental.clone()))
    }

    async fn set_payment_status(
        &self,
        id: i32,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> AppResult<Option<Rental>> {
        let mut state = self.state.lock().await;
        let rental = state.rental_mut(id)?;
        if rental.payment_status != from {
            return Ok(None);
        }
        rental.payment_status = to;
        Ok(Some(rental.clone()))
    }

    async fn list_for_user(&self, user_id: i32) -> AppResult<Vec<RentalDetails>> {
        let state = self.state.lock().await;
        let mut rentals: Vec<&Rental> = state.rentals.iter().filter(|r| r.user_id == user_id).collect();
        rentals.sort_by(|a, b| b.start_date.cmp(&a.start_date).then(b.id.cmp(&a.id)));
        Ok(rentals.into_iter().map(|r| state.details(r)).collect())
    }

    async fn list_payment_queue(&self) -> AppResult<Vec<RentalDetails>> {
        let state = self.state.lock().await;
        let mut rentals: Vec<&Rental> = state
            .rentals
            .iter()
            .filter(|r| r.status == RentalStatus::Pending && r.has_payment_reference())
            .collect();
        rentals.sort_by_key(|r| (r.created_at, r.id));
        Ok(rentals.into_iter().map(|r| state.details(r)).collect())
    }

    async fn list_all(&self) -> AppResult<Vec<RentalDetails>> {
        let state = self.state.lock().await;
        Ok(state.rentals.iter().map(|r| state.details(r)).collect())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get_by_id(&self, id: i32) -> AppResult<User> {
        let state = self.state.lock().await;
        state
            .users
            .iter()
            .find(|u| u.id == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))
    }

    async fn update_profile(&self, id: i32, data: &UpdateProfile) -> AppResult<User> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found", id)))?;
        if let Some(address) = &data.address {
            user.address = Some(address.clone());
        }
        if let Some(mobile) = &data.mobile_number {
            user.mobile_number = Some(mobile.clone());
        }
        if let Some(image) = &data.license_image {
            user.license_image = Some(image.clone());
        }
        Ok(user.clone())
    }
}

/// Keeps track of stored references instead of writing files
#[derive(Default)]
pub struct MemoryImageStore {
    stored: StdMutex<HashSet<String>>,
    counter: StdMutex<u32>,
}

impl MemoryImageStore {
    pub fn stored(&self) -> HashSet<String> {
        self.stored.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageStore for MemoryImageStore {
    async fn store(&self, image: ImageUpload) -> AppResult<String> {
        image.validate()?;
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        let reference = format!("/uploads/{}-{}", counter, image.file_name);
        self.stored.lock().unwrap().insert(reference.clone());
        Ok(reference)
    }

    async fn remove(&self, reference: &str) -> AppResult<()> {
        self.stored.lock().unwrap().remove(reference);
        Ok(())
    }
}

pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

pub fn png(name: &str) -> ImageUpload {
    ImageUpload {
        file_name: name.to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![0x89, b'P', b'N', b'G'],
    }
}

pub fn corolla(plate: &str, price: i64) -> NewVehicle {
    NewVehicle {
        make: "Toyota".to_string(),
        model: "Corolla".to_string(),
        year: 2022,
        color: "White".to_string(),
        license_plate: plate.to_string(),
        seats: 5,
        fuel_type: FuelType::Petrol,
        transmission: Transmission::Automatic,
        price_per_day: Decimal::new(price, 0),
        features: vec!["GPS".to_string()],
        images: Vec::new(),
        available: true,
    }
}

pub fn principal(user_id: i32, email: &str, role: Role) -> Principal {
    Principal {
        user_id,
        email: email.to_string(),
        role,
    }
}

pub fn admin() -> Principal {
    principal(ADMIN_ID, ADMIN_EMAIL, Role::Admin)
}

pub fn alice() -> Principal {
    principal(ALICE_ID, "alice@example.com", Role::User)
}

pub fn bob() -> Principal {
    principal(BOB_ID, "bob@example.com", Role::User)
}

pub fn token(principal: &Principal) -> String {
    UserClaims {
        user_id: principal.user_id,
        email: principal.email.clone(),
        role: principal.role,
        exp: Utc::now().timestamp() + 3600,
        iat: None,
    }
    .create_token(JWT_SECRET)
    .unwrap()
}

pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig::default(),
        database: DatabaseConfig::default(),
        auth: AuthConfig {
            jwt_secret: JWT_SECRET.to_string(),
        },
        admin: AdminConfig {
            emails: vec![ADMIN_EMAIL.to_string()],
        },
        logging: LoggingConfig::default(),
        storage: StorageConfig {
            upload_dir: std::env::temp_dir()
                .join("car-rental-test-uploads")
                .to_string_lossy()
                .into_owned(),
            public_url: "/uploads".to_string(),
        },
        dashboard: DashboardConfig::default(),
    }
}

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub images: Arc<MemoryImageStore>,
    pub services: Services,
    pub config: AppConfig,
}

impl TestApp {
    /// Services over empty stores with an admin and two renters; today is 2024-01-01
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::default());
        store.add_user(ADMIN_ID, "Admin", ADMIN_EMAIL, Role::Admin).await;
        store.add_user(ALICE_ID, "Alice", "alice@example.com", Role::User).await;
        store.add_user(BOB_ID, "Bob", "bob@example.com", Role::User).await;

        let repository = Repository::new(store.clone(), store.clone(), store.clone());
        let config = test_config();
        let admins = Arc::new(EmailAllowList::new(&config.admin.emails));
        let images = Arc::new(MemoryImageStore::default());

        let services = Services::new(
            repository,
            Arc::new(AccessPolicy::new(admins)),
            images.clone(),
            Arc::new(FixedClock(d("2024-01-01"))),
            config.dashboard.clone(),
        );

        Self {
            store,
            images,
            services,
            config,
        }
    }

    /// Services sharing this app's images and settings over another repository
    pub fn services_over(&self, repository: Repository) -> Services {
        let admins = Arc::new(EmailAllowList::new(&self.config.admin.emails));
        Services::new(
            repository,
            Arc::new(AccessPolicy::new(admins)),
            self.images.clone(),
            Arc::new(FixedClock(d("2024-01-01"))),
            self.config.dashboard.clone(),
        )
    }

    pub async fn vehicle(&self, plate: &str, price: i64) -> Vehicle {
        self.services
            .vehicles
            .create(corolla(plate, price), Vec::new())
            .await
            .unwrap()
    }

    pub async fn book(
        &self,
        who: &Principal,
        vehicle_id: i32,
        start: &str,
        end: &str,
    ) -> AppResult<Rental> {
        self.services
            .rentals
            .create_rental(who, vehicle_id, d(start), d(end))
            .await
    }

    pub fn state(&self) -> AppState {
        AppState {
            config: Arc::new(self.config.clone()),
            services: Arc::new(self.services.clone()),
        }
    }
}
