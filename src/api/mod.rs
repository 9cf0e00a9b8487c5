//! Remote football data API: wire types, client, and quota rationing.

pub mod http;
pub mod quota;
pub mod types;

pub use http::{ApiFootballClient, SportsApi, DEFAULT_API_URL};
pub use quota::{Availability, QuotaPolicy, QuotaTracker};
pub use types::ApiStatus;
