pub mod acl;
pub mod context;
pub mod response;

pub use context::{tenant_context_middleware, CurrentTenant, CurrentUser, RequestContext};
pub use response::{ApiResponse, ApiResult};
