//! Common types and utilities shared across the ensemble forecaster crates.

pub mod error;
pub mod level;
pub mod member;
pub mod site;
pub mod time;
pub mod units;
pub mod variable;

pub use error::{MetError, MetResult};
pub use level::{LevelDescriptor, LevelValue};
pub use member::MemberId;
pub use site::{haversine_km, SiteCandidate, SiteCandidates, TrialSite};
pub use time::{truncate_to_hour, truncate_to_minutes, TimeWindow, ValidTime};
pub use units::Units;
pub use variable::Variable;
