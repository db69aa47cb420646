//! Sample rows written once at startup

use super::models::DeviceStatus;

pub struct ProductSeed<'a> {
    pub name: &'a str,
    pub price: f64,
    pub stock: i32,
    pub description: Option<&'a str>,
}

pub struct DeviceSeed<'a> {
    pub device_id: &'a str,
    pub status: DeviceStatus,
    pub location: &'a str,
    pub last_online: &'a str,
}

pub const DEFAULT_PRODUCTS: &[ProductSeed<'static>] = &[
    ProductSeed {
        name: "Laptop A",
        price: 15_000_000.0,
        stock: 50,
        description: Some("High-performance laptop for professionals."),
    },
    ProductSeed {
        name: "Smartphone B",
        price: 7_500_000.0,
        stock: 120,
        description: Some("Latest smartphone with advanced camera."),
    },
    ProductSeed {
        name: "Keyboard C",
        price: 1_200_000.0,
        stock: 200,
        description: Some("Mechanical keyboard for gaming and typing."),
    },
    ProductSeed {
        name: "Handphone Samsung",
        price: 3_500_000.0,
        stock: 80,
        description: Some("Popular Samsung mobile phone model."),
    },
];

pub const DEFAULT_DEVICES: &[DeviceSeed<'static>] = &[
    DeviceSeed {
        device_id: "OLT-BDG-001",
        status: DeviceStatus::Online,
        location: "Bandung",
        last_online: "2025-05-25 09:00:00",
    },
    DeviceSeed {
        device_id: "OLT-JKT-002",
        status: DeviceStatus::Offline,
        location: "Jakarta",
        last_online: "2025-05-24 18:30:00",
    },
    DeviceSeed {
        device_id: "ROUTER-SBY-003",
        status: DeviceStatus::Online,
        location: "Surabaya",
        last_online: "2025-05-25 10:15:00",
    },
];
