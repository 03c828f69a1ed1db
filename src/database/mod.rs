pub mod manager;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod query_builder;
pub mod seed;
pub mod store;

pub use manager::{DatabaseError, DatabaseManager, INVOICE_NUMBER_KEY, USERS_EMAIL_KEY};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::Store;
