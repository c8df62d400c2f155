//! Trial-site forecaster service library.
//!
//! Reads ensemble source files from a local tree, runs the ensemble engine
//! for each configured trial site and writes one JSON report per site.
//! Exposed as a library so the pipeline can be tested end to end.

pub mod config;
pub mod observations;
pub mod pipeline;
pub mod report;
pub mod sites;
pub mod sources;

pub use config::ForecasterConfig;
pub use observations::{ObservationFeed, ObservationRow};
pub use pipeline::Forecaster;
pub use report::JsonReportSink;
pub use sites::{CatalogueSelector, CatalogueSite, SiteSelector};
pub use sources::LocalJsonSource;
