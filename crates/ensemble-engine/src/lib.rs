//! Ensemble alignment and threshold-probability engine.
//!
//! Turns raw model output into per-hour, per-level exceedance probabilities
//! across ensemble members.
//!
//! # Architecture
//!
//! ```text
//! plan_window / plan_batches
//!      │
//!      ▼
//! Collector::collect ── one tokio task per issue batch
//!      │                  ├─► FieldSource::fetch (FetchGap on absence)
//!      │                  └─► met_derive calculators on a blocking thread
//!      │                         (ComputeFailure / OutOfRangeResult)
//!      ▼
//! wait for every worker
//!      │
//!      ▼
//! reduce
//!      ├─► SeriesSet        (first file wins per valid time)
//!      ├─► align            (hour buckets, level matching)
//!      └─► aggregate        (threshold fractions, EmptyBucket on no members)
//!               │
//!               ▼
//!          ReportSink
//! ```
//!
//! Failures never abort a run. Each one becomes a [`FailureRecord`] in a
//! [`FailureLog`] scoped to the smallest unit it affects.

pub mod alignment;
pub mod batch;
pub mod collector;
pub mod error;
pub mod failure;
pub mod probability;
pub mod reduce;
pub mod report;
pub mod series;
pub mod source;
pub mod threshold;

pub use alignment::{align, AlignedHourBucket, AlignmentOutput, BucketLevel, ContributionKey};
pub use batch::{plan_batches, plan_window, BatchConfig, IssueBatch};
pub use collector::{derive_batch, Collector, CollectorOutput, FilePair, MemberBatch, SiteTarget};
pub use error::{EngineError, Result};
pub use failure::{FailureKind, FailureLog, FailureRecord};
pub use probability::{aggregate, member_fraction, probabilities, AggregateOutput, ProbabilityField};
pub use reduce::{reduce, Reduction};
pub use report::{
    ProbabilityPoint, ProbabilityReport, ReportPoint, ReportSink, RunSummary, SeriesReport, SiteLabel,
    SiteReport,
};
pub use series::{SeriesKey, SeriesPoint, SeriesSet, VariableSeries};
pub use source::{FieldSource, FileKind};
pub use threshold::{Band, BandScheme, Banding, Comparison, Threshold, ThresholdCatalogue, ThresholdSet};
