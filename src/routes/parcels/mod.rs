mod handlers;

pub use handlers::{
    create_parcel, create_parcel_sensor, delete_parcel, list_parcel_sensors, list_parcels,
    update_parcel,
};

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{
    __path_create_parcel, __path_create_parcel_sensor, __path_delete_parcel,
    __path_list_parcel_sensors, __path_list_parcels, __path_update_parcel,
};
