pub mod alerts;
pub mod parcels;
pub mod sensor_readings;
pub mod sensors;
pub mod users;
