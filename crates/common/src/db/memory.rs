//! In-process catalog for development and tests
//!
//! Mirrors the SQL repository's matching rules over plain vectors and counts
//! every lookup, so callers can assert that a request touched storage or not.

use super::models::{Device, DeviceStatus, Product};
use super::Catalog;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct MemoryCatalog {
    products: Vec<Product>,
    devices: Vec<Device>,
    calls: AtomicUsize,
    failing: bool,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog whose every lookup fails with a database error
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn with_product(mut self, name: &str, price: f64, stock: i32, description: Option<&str>) -> Self {
        let id = self.products.len() as i32 + 1;
        self.products.push(Product {
            id,
            name: name.to_string(),
            price,
            stock,
            description: description.map(str::to_string),
        });
        self
    }

    pub fn with_device(mut self, device_id: &str, status: DeviceStatus, location: &str, last_online: &str) -> Self {
        let id = self.devices.len() as i32 + 1;
        self.devices.push(Device {
            id,
            device_id: device_id.to_string(),
            status: status.into(),
            location: location.to_string(),
            last_online: last_online.to_string(),
        });
        self
    }

    /// Number of lookups served so far (pings excluded)
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record_call(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(AppError::DatabaseConnection {
                message: "memory catalog configured to fail".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn find_product(&self, name_fragment: &str) -> Result<Option<Product>> {
        self.record_call()?;
        let needle = name_fragment.to_lowercase();
        Ok(self
            .products
            .iter()
            .find(|p| p.name.to_lowercase().contains(&needle))
            .cloned())
    }

    async fn find_device(&self, device_id: &str) -> Result<Option<Device>> {
        self.record_call()?;
        Ok(self.devices.iter().find(|d| d.device_id == device_id).cloned())
    }

    async fn find_devices_by_type(&self, type_token: &str, limit: u64) -> Result<Vec<Device>> {
        self.record_call()?;
        let needle = type_token.to_lowercase();
        let mut matches: Vec<Device> = self
            .devices
            .iter()
            .filter(|d| d.device_id.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        matches.truncate(limit as usize);
        Ok(matches)
    }

    async fn ping(&self) -> Result<()> {
        if self.failing {
            return Err(AppError::DatabaseConnection {
                message: "memory catalog configured to fail".to_string(),
            });
        }
        Ok(())
    }
}
