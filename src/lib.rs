//! Agrotech - farm monitoring API
//!
//! Parcels, sensors, readings and threshold alerts behind an API-key
//! authenticated HTTP surface. The library exposes the core modules for the
//! server binary, the tooling binaries and the integration tests.

pub mod auth;
pub mod common;
pub mod config;
pub mod entity;
pub mod error;
pub mod routes;
pub mod services;
pub mod store;
