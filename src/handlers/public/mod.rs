// handlers/public/mod.rs - no authentication required
//
// Route prefix: /, /health, /auth/login, /auth/logout

pub mod auth;
pub mod system;
