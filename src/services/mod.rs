//! Business operations behind the HTTP handlers. Each one validates its
//! input, applies tenant scoping, then talks to the [`Store`].
//!
//! [`Store`]: crate::database::Store

pub mod admin;
pub mod auth;
pub mod clients;
pub mod dashboard;
pub mod invoices;

pub use admin::AdminService;
pub use auth::{AuthService, Session};
pub use clients::ClientService;
pub use dashboard::{DashboardService, DashboardSummary};
pub use invoices::InvoiceService;
