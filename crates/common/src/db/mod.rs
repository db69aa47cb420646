//! Database layer for Chatbridge
//!
//! Provides:
//! - SeaORM entity models (products, devices)
//! - Schema bootstrap and one-time seeding
//! - The `Catalog` lookup seam and its SQL-backed `Repository`
//! - An in-memory catalog for development and tests

mod catalog;
mod memory;
pub mod models;
mod repository;
mod seed;

pub use catalog::{Catalog, CATEGORY_LOOKUP_LIMIT};
pub use memory::MemoryCatalog;
pub use repository::Repository;
pub use seed::{DeviceSeed, ProductSeed, DEFAULT_DEVICES, DEFAULT_PRODUCTS};

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use models::*;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, PaginatorTrait,
    Schema, Set,
};
use std::time::Duration;
use tracing::info;

/// Database connection pool wrapper
///
/// Every query checks a connection out of the pool and hands it back when
/// it completes; nothing holds a connection across a whole request.
#[derive(Clone)]
pub struct DbPool {
    conn: DatabaseConnection,
}

impl DbPool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!("Connecting to database...");

        let mut opts = ConnectOptions::new(&config.url);
        opts
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
            .sqlx_logging(false);

        Self::connect(opts).await
    }

    /// A private in-memory database.
    ///
    /// Pinned to a single connection that never expires: each SQLite
    /// connection to `:memory:` sees its own database.
    pub async fn in_memory() -> Result<Self> {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts
            .max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);

        Self::connect(opts).await
    }

    async fn connect(opts: ConnectOptions) -> Result<Self> {
        let conn = Database::connect(opts)
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Failed to connect: {}", e),
            })?;

        info!("Database connection established");

        Ok(Self { conn })
    }

    /// Get the underlying connection
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Create the lookup tables if they do not exist yet
    pub async fn init_schema(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        let schema = Schema::new(backend);

        let mut products = schema.create_table_from_entity(ProductEntity);
        products.if_not_exists();
        self.conn.execute(backend.build(&products)).await?;

        let mut devices = schema.create_table_from_entity(DeviceEntity);
        devices.if_not_exists();
        self.conn.execute(backend.build(&devices)).await?;

        Ok(())
    }

    /// Schema plus the default sample data
    pub async fn bootstrap(&self) -> Result<()> {
        self.init_schema().await?;
        self.seed(DEFAULT_PRODUCTS, DEFAULT_DEVICES).await
    }

    /// Insert seed rows into each table that is still empty
    pub async fn seed(&self, products: &[ProductSeed<'_>], devices: &[DeviceSeed<'_>]) -> Result<()> {
        if ProductEntity::find().count(&self.conn).await? == 0 && !products.is_empty() {
            let rows = products.iter().map(|p| ProductActiveModel {
                name: Set(p.name.to_string()),
                price: Set(p.price),
                stock: Set(p.stock),
                description: Set(p.description.map(str::to_string)),
                ..Default::default()
            });
            ProductEntity::insert_many(rows).exec(&self.conn).await?;
            info!(count = products.len(), "Seeded products");
        } else {
            info!("Product data already exists in the database");
        }

        if DeviceEntity::find().count(&self.conn).await? == 0 && !devices.is_empty() {
            let rows = devices.iter().map(|d| DeviceActiveModel {
                device_id: Set(d.device_id.to_string()),
                status: Set(d.status.into()),
                location: Set(d.location.to_string()),
                last_online: Set(d.last_online.to_string()),
                ..Default::default()
            });
            DeviceEntity::insert_many(rows).exec(&self.conn).await?;
            info!(count = devices.len(), "Seeded devices");
        } else {
            info!("Device data already exists in the database");
        }

        Ok(())
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::DatabaseConnection {
                message: format!("Ping failed: {}", e),
            })?;

        Ok(())
    }
}
