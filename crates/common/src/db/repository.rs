//! SQL-backed catalog
//!
//! Provides a clean interface for the lookup queries with proper error
//! handling; every call borrows a pooled connection for its own duration.

use crate::db::models::*;
use crate::db::{Catalog, DbPool};
use crate::errors::Result;
use async_trait::async_trait;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }
}

#[async_trait]
impl Catalog for Repository {
    async fn find_product(&self, name_fragment: &str) -> Result<Option<Product>> {
        // SQLite LIKE is case-insensitive for ASCII
        ProductEntity::find()
            .filter(ProductColumn::Name.contains(name_fragment))
            .order_by_asc(ProductColumn::Id)
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn find_device(&self, device_id: &str) -> Result<Option<Device>> {
        DeviceEntity::find()
            .filter(DeviceColumn::DeviceId.eq(device_id))
            .one(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn find_devices_by_type(&self, type_token: &str, limit: u64) -> Result<Vec<Device>> {
        DeviceEntity::find()
            .filter(DeviceColumn::DeviceId.contains(type_token))
            .order_by_asc(DeviceColumn::DeviceId)
            .limit(limit)
            .all(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }
}
