// handlers/elevated/mod.rs - SYSTEM_ADMIN only
//
// Route prefix: /admin/*
// Middleware: jwt_auth_middleware → system_admin_middleware

pub mod tenants;
pub mod users;
