// handlers/mod.rs - three handler tiers
//
// Public (no auth) → Protected (JWT + tenant context) → Elevated (JWT + SYSTEM_ADMIN).
// The tiers differ only in the middleware the router wraps them in.

pub mod elevated;
pub mod protected;
pub mod public;
