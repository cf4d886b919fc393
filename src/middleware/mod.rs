pub mod ban_guard;
pub mod jwt_auth;

pub use ban_guard::BanGuardMiddleware;
pub use jwt_auth::{JwtAuthMiddleware, UserId};
