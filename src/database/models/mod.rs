pub mod client;
pub mod invoice;
pub mod tenant;
pub mod user;

pub use client::{Client, ClientChanges, NewClient};
pub use invoice::{Invoice, LineItem};
pub use tenant::{Tenant, TenantCounts, TenantRef, TenantSummary};
pub use user::{NewUser, User, UserProfile};

use chrono::{DateTime, SecondsFormat, Utc};

/// Fixed-width RFC 3339 so in-memory ordering by string matches time order.
pub(crate) fn sortable_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}
