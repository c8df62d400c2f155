//! Single-threaded reducer from fragments to probability fields.

use tracing::info;

use met_derive::RawField;

use crate::alignment::{align, AlignedHourBucket};
use crate::failure::FailureLog;
use crate::probability::{aggregate, ProbabilityField};
use crate::series::SeriesSet;
use crate::threshold::ThresholdCatalogue;

/// Output of one reduction.
#[derive(Debug, Clone, Default)]
pub struct Reduction {
    pub series: SeriesSet,
    pub buckets: Vec<AlignedHourBucket>,
    pub fields: Vec<ProbabilityField>,
    pub failures: FailureLog,
}

impl Reduction {
    /// Fields for one site.
    pub fn fields_for<'a>(&'a self, site: &'a str) -> impl Iterator<Item = &'a ProbabilityField> + 'a {
        self.fields.iter().filter(move |f| f.site == site)
    }
}

/// Series, then hour buckets, then probabilities.
///
/// Only called once every worker has finished; the result depends on the
/// fragments' keys, not their order.
pub fn reduce(fragments: &[RawField], catalogue: &ThresholdCatalogue) -> Reduction {
    let series = SeriesSet::from_fragments(fragments);
    let alignment = align(&series);
    let aggregated = aggregate(&alignment.buckets, catalogue);

    let mut failures = alignment.failures;
    failures.extend(aggregated.failures);

    info!(
        fragments = fragments.len(),
        series = series.len(),
        superseded = series.superseded(),
        buckets = alignment.buckets.len(),
        fields = aggregated.fields.len(),
        "Reduced fragments"
    );

    Reduction {
        series,
        buckets: alignment.buckets,
        fields: aggregated.fields,
        failures,
    }
}
