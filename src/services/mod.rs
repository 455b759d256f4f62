//! Domain operations. Each takes the caller as a [`crate::auth::CurrentUser`]
//! and a connection, and scopes every query to that caller.

pub mod accounts;
pub mod alerts;
pub mod analytics;
pub mod dashboard;
pub mod export;
pub mod ingest;
pub mod parcels;
pub mod sensors;
