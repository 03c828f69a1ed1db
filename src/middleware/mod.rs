pub mod auth;
pub mod require;
pub mod response;

pub use auth::{jwt_auth_middleware, AuthUser};
pub use require::{require_role, require_tenant, system_admin_middleware, tenant_middleware};
pub use response::{ApiResponse, ApiResult};
