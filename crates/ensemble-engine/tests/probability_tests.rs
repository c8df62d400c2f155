//! Aggregation behaviour from fragments through to probability fields.

use std::collections::BTreeMap;

use chrono::Duration;
use ensemble_engine::{
    aggregate, probabilities, reduce, AlignedHourBucket, BucketLevel, Comparison, ContributionKey,
    FailureKind, ProbabilityField, Threshold, ThresholdCatalogue, ThresholdSet,
};
use met_common::{LevelDescriptor, MemberId, Variable};
use test_utils::fixtures;
use test_utils::{assert_approx_eq, member_values, raw_field};

fn field_at(fields: &[ProbabilityField], variable: Variable, threshold: f64) -> &ProbabilityField {
    fields
        .iter()
        .find(|f| f.variable == variable && f.threshold == threshold)
        .unwrap()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_three_member_wind_probabilities() {
    let hour = fixtures::issue_time() + Duration::hours(1);
    let fragments = member_values(Variable::WindSpeed, hour, &[10.0, 16.0, 20.0]);

    let reduction = reduce(&fragments, &ThresholdCatalogue::default());

    let at_12 = field_at(&reduction.fields, Variable::WindSpeed, 12.0);
    assert_approx_eq!(at_12.probability, 200.0 / 3.0, 1e-9);
    assert_eq!(at_12.members, 3);
    assert_eq!(at_12.hour, hour);
    assert_eq!(field_at(&reduction.fields, Variable::WindSpeed, 25.0).probability, 0.0);
}

#[test]
fn test_frost_threshold_counts_at_or_below() {
    let hour = fixtures::issue_time();
    let fragments = member_values(Variable::Temperature, hour, &[-1.0, 0.0, 2.0]);

    let reduction = reduce(&fragments, &ThresholdCatalogue::default());

    let frost = field_at(&reduction.fields, Variable::Temperature, 0.0);
    assert_eq!(frost.comparison, Comparison::AtOrBelow);
    assert_approx_eq!(frost.probability, 200.0 / 3.0, 1e-9);
}

#[test]
fn test_sub_hourly_precipitation_maxima_feed_probabilities() {
    let start = fixtures::issue_time();
    let mut fragments = Vec::new();
    // member 1 peaks at 1.5 mm/hr for one five-minute slot, member 2 stays light
    for (minutes, rate) in [(0, 0.1), (5, 1.5), (10, 0.3)] {
        fragments.push(raw_field(
            Variable::PrecipitationRate,
            Some(1),
            start + Duration::minutes(minutes),
            LevelDescriptor::Surface,
            0.0,
            rate,
        ));
        fragments.push(raw_field(
            Variable::PrecipitationRate,
            Some(2),
            start + Duration::minutes(minutes),
            LevelDescriptor::Surface,
            0.0,
            0.1,
        ));
    }

    let reduction = reduce(&fragments, &ThresholdCatalogue::default());

    assert_eq!(reduction.buckets.len(), 1);
    assert_eq!(field_at(&reduction.fields, Variable::PrecipitationRate, 0.2).probability, 50.0);
    assert_eq!(field_at(&reduction.fields, Variable::PrecipitationRate, 1.0).probability, 50.0);
    assert_eq!(field_at(&reduction.fields, Variable::PrecipitationRate, 4.0).probability, 0.0);
}

#[test]
fn test_control_member_counts_as_a_member() {
    let hour = fixtures::issue_time();
    let mut fragments = member_values(Variable::WindSpeed, hour, &[20.0, 20.0]);
    fragments.push(raw_field(
        Variable::WindSpeed,
        None,
        hour,
        LevelDescriptor::Surface,
        0.0,
        5.0,
    ));

    let reduction = reduce(&fragments, &ThresholdCatalogue::default());

    assert_eq!(reduction.buckets[0].member_count(), 3);
    assert!(reduction.buckets[0]
        .members
        .keys()
        .any(|k| k.member == MemberId::Control));
    assert_approx_eq!(
        field_at(&reduction.fields, Variable::WindSpeed, 12.0).probability,
        200.0 / 3.0,
        1e-9
    );
}

// ============================================================================
// Properties
// ============================================================================

fn spread_members(count: usize) -> Vec<f64> {
    (0..count).map(|i| ((i * 7) % 31) as f64).collect()
}

#[test]
fn test_probabilities_within_bounds() {
    let hour = fixtures::issue_time();
    let mut fragments = member_values(Variable::WindSpeed, hour, &spread_members(18));
    fragments.extend(member_values(Variable::Visibility, hour, &[150.0, 800.0, 12000.0]));
    fragments.extend(member_values(Variable::RelativeHumidity, hour, &[30.0, 96.0]));

    let reduction = reduce(&fragments, &ThresholdCatalogue::default());

    assert!(!reduction.fields.is_empty());
    for field in &reduction.fields {
        assert!((0.0..=100.0).contains(&field.probability), "{:?}", field);
    }
}

#[test]
fn test_exceedance_is_non_increasing_with_threshold() {
    let hour = fixtures::issue_time();
    let fragments = member_values(Variable::WindSpeed, hour, &spread_members(18));
    let set = ThresholdSet::new(
        Variable::WindSpeed,
        (0..30).map(|t| Threshold::above(t as f64)).collect(),
        0.0,
        100.0,
    )
    .unwrap();
    let catalogue = ThresholdCatalogue::from_sets([set]);

    let reduction = reduce(&fragments, &catalogue);

    let series: Vec<f64> = reduction.fields.iter().map(|f| f.probability).collect();
    assert_eq!(series.len(), 30);
    assert!(series.windows(2).all(|w| w[0] >= w[1]));
}

#[test]
fn test_member_order_does_not_change_results() {
    let hour = fixtures::issue_time();
    let values = [95.5, 40.0, 39.9, 71.2, 100.0];
    let forward = member_values(Variable::RelativeHumidity, hour, &values);
    let mut shuffled = forward.clone();
    shuffled.reverse();
    shuffled.swap(0, 2);

    let a = reduce(&forward, &ThresholdCatalogue::default());
    let b = reduce(&shuffled, &ThresholdCatalogue::default());

    assert_eq!(a.fields, b.fields);
    assert_eq!(a.buckets, b.buckets);
}

// ============================================================================
// Empty buckets
// ============================================================================

fn bucket_with(members: BTreeMap<ContributionKey, Vec<Option<f64>>>) -> AlignedHourBucket {
    AlignedHourBucket {
        site: fixtures::SITE_NAME.to_string(),
        variable: Variable::WindSpeed,
        hour: fixtures::issue_time(),
        levels: vec![
            BucketLevel {
                level: LevelDescriptor::ModelLevel(1),
                height_agl_ft: 65.6,
            },
            BucketLevel {
                level: LevelDescriptor::ModelLevel(2),
                height_agl_ft: 131.2,
            },
        ],
        members,
    }
}

#[test]
fn test_bucket_without_members_yields_no_field() {
    let (fields, failures) = probabilities(&bucket_with(BTreeMap::new()), &ThresholdSet::wind());
    assert!(fields.is_empty());
    assert_eq!(failures.count(FailureKind::EmptyBucket), 2);
}

#[test]
fn test_level_without_values_is_skipped() {
    let mut members = BTreeMap::new();
    members.insert(
        ContributionKey {
            member: MemberId::Realization(1),
            issue_time: fixtures::issue_time(),
        },
        vec![Some(14.0), None],
    );

    let (fields, failures) = probabilities(&bucket_with(members), &ThresholdSet::wind());

    assert_eq!(fields.len(), 4);
    assert!(fields.iter().all(|f| f.level == LevelDescriptor::ModelLevel(1)));
    assert_eq!(field_at(&fields, Variable::WindSpeed, 12.0).probability, 100.0);
    assert_eq!(failures.count(FailureKind::EmptyBucket), 1);
}

#[test]
fn test_denominator_counts_members_present_at_level() {
    let key = |n| ContributionKey {
        member: MemberId::Realization(n),
        issue_time: fixtures::issue_time(),
    };
    let mut members = BTreeMap::new();
    members.insert(key(1), vec![Some(10.0), Some(14.0)]);
    members.insert(key(2), vec![Some(16.0), Some(30.0)]);
    members.insert(key(3), vec![Some(20.0), None]);
    let bucket = bucket_with(members);
    assert_eq!(bucket.member_count(), 3);

    let (fields, failures) = probabilities(&bucket, &ThresholdSet::wind());
    assert!(failures.is_empty());

    let at_level = |level: u32, threshold: f64| {
        fields
            .iter()
            .find(|f| f.level == LevelDescriptor::ModelLevel(level) && f.threshold == threshold)
            .unwrap()
    };
    assert_eq!(at_level(1, 12.0).members, 3);
    assert_approx_eq!(at_level(1, 12.0).probability, 200.0 / 3.0, 1e-9);
    assert_eq!(at_level(2, 12.0).members, 2);
    assert_eq!(at_level(2, 12.0).probability, 100.0);
    assert_eq!(at_level(2, 20.0).probability, 50.0);
}

#[test]
fn test_variables_without_thresholds_are_skipped() {
    let hour = fixtures::issue_time();
    let fragments = member_values(Variable::WindDirection, hour, &[270.0, 280.0]);
    let reduction = reduce(&fragments, &ThresholdCatalogue::default());
    assert_eq!(reduction.buckets.len(), 1);
    assert!(reduction.fields.is_empty());

    let direct = aggregate(&reduction.buckets, &ThresholdCatalogue::default());
    assert!(direct.fields.is_empty());
    assert!(direct.failures.is_empty());
}
