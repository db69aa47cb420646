//! Read-only lookup seam between the context resolver and storage

use super::models::{Device, Product};
use crate::errors::Result;
use async_trait::async_trait;

/// Maximum rows returned for a device-type listing
pub const CATEGORY_LOOKUP_LIMIT: u64 = 5;

/// Point lookups over the seeded product and device tables
#[async_trait]
pub trait Catalog: Send + Sync {
    /// First product (by id) whose name contains `name_fragment`, case-insensitively
    async fn find_product(&self, name_fragment: &str) -> Result<Option<Product>>;

    /// Device whose id equals `device_id` exactly
    async fn find_device(&self, device_id: &str) -> Result<Option<Device>>;

    /// Devices whose id contains `type_token`, ordered by device id, at most `limit`
    async fn find_devices_by_type(&self, type_token: &str, limit: u64) -> Result<Vec<Device>>;

    /// Check that storage is reachable
    async fn ping(&self) -> Result<()>;
}
