pub mod auth;
pub mod response;
pub mod route;
pub mod validate;

pub use auth::{require_roles, RoleGate};
pub use response::{ApiResponse, ApiResult};
pub use route::word_segments;
pub use validate::validate_request;
