//! Authentication: password hashing, JWT issuance/validation,
//! route-protection middleware, and the register/login service.

pub mod jwt;
pub mod middleware;
pub mod password;
pub mod service;

pub use jwt::{generate_access_token, validate_access_token, JwtConfig};
pub use middleware::{auth_middleware, AuthenticatedUser};
pub use service::{AuthOutcome, AuthService};
