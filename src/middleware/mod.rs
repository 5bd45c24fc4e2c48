pub mod auth;
pub mod security;

pub use auth::{create_jwt, decode_claims, require_auth, AuthUser, Claims, SESSION_COOKIE};
pub use security::add_security_headers;
