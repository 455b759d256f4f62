mod handlers;
mod types;

pub use handlers::{acknowledge, list_active, list_history, resolve};
pub use types::HistoryQuery;

// Re-export utoipa path structs for OpenAPI documentation
pub use handlers::{__path_acknowledge, __path_list_active, __path_list_history, __path_resolve};
