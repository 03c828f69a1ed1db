//! Request-side types shared by handlers: the JSON extractor, payload
//! structs with their validation, and list query parameters.

pub mod json;
pub mod payloads;
pub mod query;

pub use json::ApiJson;
pub use query::ListQuery;
