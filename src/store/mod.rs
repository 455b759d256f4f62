//! Explicit data access for the core services.
//!
//! Every function takes any [`sea_orm::ConnectionTrait`], so callers decide
//! whether it runs on the pool or inside a transaction. Ownership scoping
//! always walks `sensor.parcel_id -> parcel.owner_id`; nothing here follows
//! relations implicitly.

pub mod alerts;
pub mod parcels;
pub mod readings;
pub mod sensors;
pub mod users;
