pub mod auth;
pub mod json;
pub mod response;

pub use auth::require_identity;
pub use json::ValidJson;
pub use response::{ApiResponse, ApiResult};
