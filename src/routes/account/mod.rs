mod handlers;
mod types;

pub use handlers::{login, profile, regenerate_api_key, update_password};
pub use types::ApiKeyResponse;

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{
    __path_login, __path_profile, __path_regenerate_api_key, __path_update_password,
};
