//! SeaORM entity models
//!
//! Lookup tables seeded at startup and read-only afterwards

mod device;
mod product;

pub use product::{
    Entity as ProductEntity,
    Model as Product,
    ActiveModel as ProductActiveModel,
    Column as ProductColumn,
};

pub use device::{
    Entity as DeviceEntity,
    Model as Device,
    ActiveModel as DeviceActiveModel,
    Column as DeviceColumn,
    DeviceStatus,
};
