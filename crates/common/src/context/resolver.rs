//! Context Resolver - turns (intent, entities) into a short fact summary
//!
//! Issues point lookups through the [`Catalog`] and formats what comes back
//! as an Indonesian sentence prefixed with `Konteks:`. An empty string means
//! "no context", never an error. Storage failures are logged and read as
//! "no rows".

use super::intent::{is_device_category, EntityKey, Entities, Intent};
use crate::db::models::{Device, Product};
use crate::db::{Catalog, CATEGORY_LOOKUP_LIMIT};
use crate::errors::Result;
use crate::metrics;
use std::sync::Arc;
use tracing::{debug, error};

/// Context for a status question that names no device
pub const GENERIC_DEVICE_CONTEXT: &str = "Konteks: Pengguna ingin mengetahui status perangkat secara umum. \
Informasikan bahwa Anda memerlukan ID perangkat yang spesifik untuk detail lebih lanjut, \
atau tanyakan jenis perangkat apa yang ingin diketahui statusnya.";

pub struct ContextResolver {
    catalog: Arc<dyn Catalog>,
}

impl ContextResolver {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    /// Build the context string for a classified query
    pub async fn resolve(&self, intent: Intent, entities: &Entities) -> String {
        match intent {
            Intent::GetProductPrice => match entities.get(EntityKey::ProductName) {
                Some(name) if !name.is_empty() => self.product_context(name).await,
                _ => String::new(),
            },
            Intent::CheckDeviceStatus => match entities.get(EntityKey::DeviceId) {
                Some(token) if is_device_category(token) => self.category_context(token).await,
                Some(device_id) if !device_id.is_empty() => self.device_context(device_id).await,
                _ => GENERIC_DEVICE_CONTEXT.to_string(),
            },
            Intent::Unknown => String::new(),
        }
    }

    async fn product_context(&self, name: &str) -> String {
        let product = or_absent(self.catalog.find_product(name).await, "find_product");
        metrics::record_lookup("product", product.is_some());

        match product {
            Some(product) => describe_product(&product),
            None => format!(
                "Konteks: Maaf, data harga untuk produk '{}' tidak ditemukan.",
                name
            ),
        }
    }

    async fn device_context(&self, device_id: &str) -> String {
        let device = or_absent(self.catalog.find_device(device_id).await, "find_device");
        metrics::record_lookup("device", device.is_some());

        match device {
            Some(device) => format!(
                "Konteks: Status perangkat {}: Saat ini {} di {}. Terakhir online pada {}.",
                device.device_id,
                device.status(),
                device.location,
                device.last_online
            ),
            None => format!(
                "Konteks: Maaf, data status untuk perangkat '{}' tidak ditemukan.",
                device_id
            ),
        }
    }

    async fn category_context(&self, category: &str) -> String {
        let devices = or_absent(
            self.catalog
                .find_devices_by_type(category, CATEGORY_LOOKUP_LIMIT)
                .await,
            "find_devices_by_type",
        );
        metrics::record_lookup("device_category", !devices.is_empty());
        debug!(category, count = devices.len(), "Category lookup");

        if devices.is_empty() {
            return format!(
                "Konteks: Tidak ditemukan informasi untuk perangkat jenis '{}'.",
                category
            );
        }

        let mut lines = vec![format!(
            "Konteks: Berikut adalah status beberapa perangkat {}:",
            category
        )];
        lines.extend(devices.iter().map(describe_device_line));
        lines.join("\n")
    }
}

fn describe_product(product: &Product) -> String {
    let mut context = format!(
        "Konteks: Informasi produk {}: Harga adalah Rp {}. Stok tersedia {} unit.",
        product.name,
        format_price(product.price),
        product.stock
    );
    if let Some(description) = product.description.as_deref().filter(|d| !d.is_empty()) {
        context.push_str(&format!(" Deskripsi: {}.", description.trim_end_matches('.')));
    }
    context
}

fn describe_device_line(device: &Device) -> String {
    format!(
        "- {}: {} di {}. Terakhir online pada {}.",
        device.device_id,
        device.status(),
        device.location,
        device.last_online
    )
}

/// Storage errors degrade to "nothing found"
fn or_absent<T: Default>(result: Result<T>, lookup: &'static str) -> T {
    result.unwrap_or_else(|e| {
        error!(error = %e, lookup, "Database error");
        T::default()
    })
}

/// Whole currency units with `,` thousands separators, e.g. `15,000,000`
pub fn format_price(price: f64) -> String {
    let rounded = price.round() as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::DeviceStatus;
    use crate::db::{DbPool, MemoryCatalog, ProductSeed, Repository};

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new()
            .with_product("Laptop A", 15_000_000.0, 50, Some("High-performance laptop for professionals."))
            .with_product("Handphone Samsung", 3_500_000.0, 80, None)
            .with_device("OLT-JKT-002", DeviceStatus::Offline, "Jakarta", "2025-05-24 18:30:00")
            .with_device("OLT-BDG-001", DeviceStatus::Online, "Bandung", "2025-05-25 09:00:00")
            .with_device("ROUTER-SBY-003", DeviceStatus::Online, "Surabaya", "2025-05-25 10:15:00")
    }

    fn resolver(catalog: MemoryCatalog) -> ContextResolver {
        ContextResolver::new(Arc::new(catalog))
    }

    fn product(name: &str) -> Entities {
        Entities::new().with(EntityKey::ProductName, name)
    }

    fn device(id: &str) -> Entities {
        Entities::new().with(EntityKey::DeviceId, id)
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(15_000_000.0), "15,000,000");
        assert_eq!(format_price(1000.0), "1,000");
        assert_eq!(format_price(999.4), "999");
        assert_eq!(format_price(0.0), "0");
        assert_eq!(format_price(123_456.5), "123,457");
    }

    #[tokio::test]
    async fn test_product_found() {
        let context = resolver(catalog())
            .resolve(Intent::GetProductPrice, &product("laptop"))
            .await;

        assert_eq!(
            context,
            "Konteks: Informasi produk Laptop A: Harga adalah Rp 15,000,000. Stok tersedia 50 unit. \
             Deskripsi: High-performance laptop for professionals."
        );
    }

    #[tokio::test]
    async fn test_product_without_description() {
        let context = resolver(catalog())
            .resolve(Intent::GetProductPrice, &product("Samsung"))
            .await;

        assert!(context.ends_with("Stok tersedia 80 unit."));
        assert!(!context.contains("Deskripsi"));
    }

    #[tokio::test]
    async fn test_product_not_found_names_term() {
        let context = resolver(catalog())
            .resolve(Intent::GetProductPrice, &product("Tablet Z"))
            .await;

        assert_eq!(
            context,
            "Konteks: Maaf, data harga untuk produk 'Tablet Z' tidak ditemukan."
        );
    }

    #[tokio::test]
    async fn test_price_without_name_is_empty() {
        let catalog = Arc::new(catalog());
        let context = ContextResolver::new(catalog.clone())
            .resolve(Intent::GetProductPrice, &Entities::new())
            .await;

        assert!(context.is_empty());
        assert_eq!(catalog.calls(), 0);
    }

    #[tokio::test]
    async fn test_device_exact() {
        let resolver = resolver(catalog());

        let context = resolver.resolve(Intent::CheckDeviceStatus, &device("OLT-BDG-001")).await;
        assert_eq!(
            context,
            "Konteks: Status perangkat OLT-BDG-001: Saat ini Online di Bandung. \
             Terakhir online pada 2025-05-25 09:00:00."
        );

        let context = resolver.resolve(Intent::CheckDeviceStatus, &device("OLT-XYZ-999")).await;
        assert_eq!(
            context,
            "Konteks: Maaf, data status untuk perangkat 'OLT-XYZ-999' tidak ditemukan."
        );
    }

    #[tokio::test]
    async fn test_device_category_lists_sorted() {
        let context = resolver(catalog())
            .resolve(Intent::CheckDeviceStatus, &device("OLT"))
            .await;

        let lines: Vec<&str> = context.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Konteks: Berikut adalah status beberapa perangkat OLT:");
        assert!(lines[1].starts_with("- OLT-BDG-001: Online di Bandung."));
        assert!(lines[2].starts_with("- OLT-JKT-002: Offline di Jakarta."));
    }

    #[tokio::test]
    async fn test_device_category_empty() {
        let context = resolver(catalog())
            .resolve(Intent::CheckDeviceStatus, &device("SERVER"))
            .await;

        assert_eq!(
            context,
            "Konteks: Tidak ditemukan informasi untuk perangkat jenis 'SERVER'."
        );
    }

    #[tokio::test]
    async fn test_status_without_device_asks_for_id() {
        let context = resolver(catalog())
            .resolve(Intent::CheckDeviceStatus, &Entities::new())
            .await;

        assert_eq!(context, GENERIC_DEVICE_CONTEXT);
    }

    #[tokio::test]
    async fn test_unknown_intent_is_empty() {
        let context = resolver(catalog())
            .resolve(Intent::Unknown, &product("Laptop"))
            .await;

        assert!(context.is_empty());
    }

    #[tokio::test]
    async fn test_storage_failure_reads_as_not_found() {
        let resolver = resolver(MemoryCatalog::failing());

        let context = resolver.resolve(Intent::GetProductPrice, &product("Laptop")).await;
        assert_eq!(context, "Konteks: Maaf, data harga untuk produk 'Laptop' tidak ditemukan.");

        let context = resolver.resolve(Intent::CheckDeviceStatus, &device("ROUTER")).await;
        assert_eq!(context, "Konteks: Tidak ditemukan informasi untuk perangkat jenis 'ROUTER'.");
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let resolver = resolver(catalog());

        for entities in [product("Laptop"), device("OLT"), device("OLT-JKT-002"), Entities::new()] {
            let first = resolver.resolve(Intent::CheckDeviceStatus, &entities).await;
            let second = resolver.resolve(Intent::CheckDeviceStatus, &entities).await;
            assert_eq!(first, second);

            let first = resolver.resolve(Intent::GetProductPrice, &entities).await;
            let second = resolver.resolve(Intent::GetProductPrice, &entities).await;
            assert_eq!(first, second);
        }
    }

    #[tokio::test]
    async fn test_lookup_round_trip_through_sqlite() {
        let pool = DbPool::in_memory().await.unwrap();
        pool.init_schema().await.unwrap();
        pool.seed(
            &[ProductSeed { name: "Widget X", price: 1000.0, stock: 5, description: Some("desc") }],
            &[],
        )
        .await
        .unwrap();

        let resolver = ContextResolver::new(Arc::new(Repository::new(pool)));
        let context = resolver.resolve(Intent::GetProductPrice, &product("Widget")).await;

        assert!(context.contains("Widget X"));
        assert!(context.contains("5 unit"));
        assert!(context.contains("Rp 1,000"));
    }
}
