//! Fragment collector.
//!
//! One worker per issue batch. A worker fetches every member's files for its
//! batch, then derives every quantity for every site on a blocking thread.
//! Per-call failures land in the worker's own [`FailureLog`]; the fan-in
//! waits for every worker before returning, and a worker that dies loses
//! only its own batch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use met_common::{MemberId, TimeWindow, ValidTime, Variable};
use met_derive::{
    calculator, orography_at, DeriveConfig, DeriveError, RawField, SiteContext, SitePoint,
    SourceFile,
};

use crate::batch::IssueBatch;
use crate::error::{EngineError, Result};
use crate::failure::{FailureKind, FailureLog, FailureRecord};
use crate::source::{FieldSource, FileKind};

/// A candidate site projected into the model grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteTarget {
    pub name: String,
    pub point: SitePoint,
}

impl SiteTarget {
    pub fn new(name: impl Into<String>, point: SitePoint) -> Self {
        Self {
            name: name.into(),
            point,
        }
    }
}

/// Surface and model-level files for one member and one lead step.
#[derive(Debug, Clone)]
pub struct FilePair {
    pub file_number: u32,
    pub surface: SourceFile,
    pub model: SourceFile,
}

/// Everything one member contributes to a batch.
#[derive(Debug, Clone)]
pub struct MemberBatch {
    /// Member directory number
    pub member: u32,
    /// File carrying the orography field
    pub orography: SourceFile,
    pub files: Vec<FilePair>,
}

/// Fragments and failures from one worker.
#[derive(Debug, Clone, Default)]
pub struct BatchOutput {
    pub fragments: Vec<RawField>,
    pub failures: FailureLog,
}

/// Fan-in result across all workers.
#[derive(Debug, Clone, Default)]
pub struct CollectorOutput {
    pub fragments: Vec<RawField>,
    pub failures: FailureLog,
    pub batches_completed: usize,
    pub batches_lost: usize,
}

/// Runs one worker per issue batch and merges their outputs.
pub struct Collector {
    source: Arc<dyn FieldSource>,
    config: DeriveConfig,
    fetch_concurrency: usize,
}

impl Collector {
    pub fn new(source: Arc<dyn FieldSource>, config: DeriveConfig) -> Self {
        Self {
            source,
            config,
            fetch_concurrency: 4,
        }
    }

    /// Members fetched concurrently inside one worker.
    pub fn with_fetch_concurrency(mut self, n: usize) -> Self {
        self.fetch_concurrency = n.max(1);
        self
    }

    /// Process every batch and wait for all workers to finish.
    #[instrument(skip(self, batches, sites), fields(batches = batches.len(), sites = sites.len()))]
    pub async fn collect(
        &self,
        batches: &[IssueBatch],
        sites: &[SiteTarget],
        window: TimeWindow,
    ) -> CollectorOutput {
        let handles: Vec<_> = batches
            .iter()
            .cloned()
            .map(|batch| {
                let source = self.source.clone();
                let sites = sites.to_vec();
                let config = self.config.clone();
                let concurrency = self.fetch_concurrency;
                tokio::spawn(async move {
                    run_batch(source, batch, sites, window, config, concurrency).await
                })
            })
            .collect();

        let mut output = CollectorOutput::default();
        for (batch, joined) in batches.iter().zip(join_all(handles).await) {
            let result = joined.map_err(|e| EngineError::WorkerPanicked {
                issue: batch.stamp(),
                reason: e.to_string(),
            });
            match result.and_then(|r| r) {
                Ok(batch_output) => {
                    output.fragments.extend(batch_output.fragments);
                    output.failures.extend(batch_output.failures);
                    output.batches_completed += 1;
                }
                Err(e) => {
                    error!(issue = %batch.stamp(), error = %e, "Batch lost");
                    output.batches_lost += 1;
                }
            }
        }

        info!(
            fragments = output.fragments.len(),
            failures = output.failures.len(),
            completed = output.batches_completed,
            lost = output.batches_lost,
            "Collected fragments"
        );
        output
    }
}

/// One worker: fetch the batch, then derive on a blocking thread.
#[instrument(skip(source, sites, config), fields(issue = %batch.stamp(), files = batch.file_numbers.len()))]
async fn run_batch(
    source: Arc<dyn FieldSource>,
    batch: IssueBatch,
    sites: Vec<SiteTarget>,
    window: TimeWindow,
    config: DeriveConfig,
    concurrency: usize,
) -> Result<BatchOutput> {
    let (members, mut failures) = fetch_batch(source.as_ref(), &batch, concurrency).await;
    debug!(members = members.len(), "Fetched batch");

    let issue = batch.stamp();
    let derived = tokio::task::spawn_blocking(move || derive_batch(&members, &sites, window, &config))
        .await
        .map_err(|e| EngineError::WorkerPanicked {
            issue,
            reason: e.to_string(),
        })?;

    failures.extend(derived.failures);
    Ok(BatchOutput {
        fragments: derived.fragments,
        failures,
    })
}

/// Fetch every member's files for a batch, recording gaps.
pub async fn fetch_batch(
    source: &dyn FieldSource,
    batch: &IssueBatch,
    concurrency: usize,
) -> (Vec<MemberBatch>, FailureLog) {
    let mut failures = FailureLog::new();

    let members = match source.members(batch.issue_time).await {
        Ok(members) if !members.is_empty() => members,
        Ok(_) => {
            failures.record(
                FailureRecord::new(FailureKind::FetchGap, "no member directories").source(batch.stamp()),
            );
            return (Vec::new(), failures);
        }
        Err(e) => {
            failures.record(FailureRecord::new(FailureKind::FetchGap, e.to_string()).source(batch.stamp()));
            return (Vec::new(), failures);
        }
    };

    let results: Vec<(Option<MemberBatch>, FailureLog)> = stream::iter(members)
        .map(|member| fetch_member(source, batch, member))
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    let mut fetched = Vec::new();
    for (member_batch, member_failures) in results {
        failures.extend(member_failures);
        fetched.extend(member_batch);
    }
    fetched.sort_by_key(|m| m.member);
    (fetched, failures)
}

async fn fetch_one(
    source: &dyn FieldSource,
    issue_time: DateTime<Utc>,
    member: u32,
    kind: FileKind,
    file_number: u32,
    failures: &mut FailureLog,
) -> Option<SourceFile> {
    let name = kind.file_name(file_number);
    let outcome = source.fetch(issue_time, member, kind, file_number).await;
    let reason = match outcome {
        Ok(Some(file)) => return Some(file),
        Ok(None) => "file absent".to_string(),
        Err(e) => e.to_string(),
    };
    failures.record(
        FailureRecord::new(FailureKind::FetchGap, reason)
            .source(format!("{}/{:03}/{}", ValidTime::issue_stamp(&issue_time), member, name)),
    );
    None
}

async fn fetch_member(
    source: &dyn FieldSource,
    batch: &IssueBatch,
    member: u32,
) -> (Option<MemberBatch>, FailureLog) {
    let mut failures = FailureLog::new();
    let Some(orography) =
        fetch_one(source, batch.issue_time, member, FileKind::Surface, 0, &mut failures).await
    else {
        return (None, failures);
    };

    let mut files = Vec::with_capacity(batch.file_numbers.len());
    for &n in &batch.file_numbers {
        let surface = if n == 0 {
            Some(orography.clone())
        } else {
            fetch_one(source, batch.issue_time, member, FileKind::Surface, n, &mut failures).await
        };
        let model = fetch_one(source, batch.issue_time, member, FileKind::ModelLevel, n, &mut failures).await;
        if let (Some(surface), Some(model)) = (surface, model) {
            files.push(FilePair {
                file_number: n,
                surface,
                model,
            });
        }
    }

    (
        Some(MemberBatch {
            member,
            orography,
            files,
        }),
        failures,
    )
}

/// Derive every quantity for every member, file pair and site of a batch.
///
/// Pure and synchronous; one failing call never affects another.
pub fn derive_batch(
    members: &[MemberBatch],
    sites: &[SiteTarget],
    window: TimeWindow,
    config: &DeriveConfig,
) -> BatchOutput {
    let mut out = BatchOutput::default();

    for member in members {
        for site in sites {
            let surface_altitude = match orography_at(&member.orography, &site.point) {
                Ok(h) => h,
                Err(e) => {
                    out.failures.record(
                        FailureRecord::new(FailureKind::ComputeFailure, e.to_string())
                            .site(&site.name)
                            .member(member.orography.member())
                            .source(&member.orography.name),
                    );
                    continue;
                }
            };
            let ctx = SiteContext::new(&site.name, site.point, surface_altitude, window);

            for pair in &member.files {
                derive_pair(pair, &ctx, config, &mut out);
            }
        }
    }
    out
}

fn derive_pair(pair: &FilePair, ctx: &SiteContext, config: &DeriveConfig, out: &mut BatchOutput) {
    let (surface, model) = (&pair.surface, &pair.model);
    let calls: [(Variable, &SourceFile, std::result::Result<Vec<RawField>, DeriveError>); 6] = [
        (Variable::WindSpeed, model, calculator::wind_speed(model, ctx)),
        (
            Variable::Temperature,
            model,
            calculator::spliced_temperature(surface, model, ctx),
        ),
        (
            Variable::SurfaceTemperature,
            model,
            calculator::surface_temperature(model, ctx),
        ),
        (
            Variable::RelativeHumidity,
            model,
            calculator::relative_humidity(model, ctx, config),
        ),
        (
            Variable::PrecipitationRate,
            surface,
            calculator::precipitation_rate(surface, ctx),
        ),
        (Variable::Visibility, surface, calculator::visibility(surface, ctx)),
    ];

    for (variable, file, result) in calls {
        match result {
            Ok(fields) => {
                for field in &fields {
                    if field.flag.is_some() {
                        out.failures.record(
                            FailureRecord::new(
                                FailureKind::OutOfRangeResult,
                                format!("{:.2} {} outside physical range", field.value, field.units),
                            )
                            .site(&ctx.site)
                            .variable(variable)
                            .member(field.member())
                            .source(&field.source)
                            .hour(field.valid_time),
                        );
                    }
                }
                out.fragments.extend(fields);
            }
            Err(e) => out.failures.record(
                FailureRecord::new(FailureKind::ComputeFailure, e.to_string())
                    .site(&ctx.site)
                    .variable(variable)
                    .member(MemberId::from_realization(file.realization))
                    .source(&file.name),
            ),
        }
    }
}
