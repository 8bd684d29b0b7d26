pub mod auth;
pub mod response;

pub use auth::{auth_middleware, AuthType, AuthUser};
pub use response::{ApiResponse, ApiResult};
