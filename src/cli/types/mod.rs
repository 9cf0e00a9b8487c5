//! Type-safe wrappers for remote API identifiers and job names.

pub mod ids;
pub mod job;
pub mod time;

pub use ids::{LeagueId, PlayerId, TeamId};
pub use job::JobKind;
pub use time::Season;
