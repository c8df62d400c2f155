//! JSON report sink.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use ensemble_engine::{EngineError, ReportSink, Result, SiteReport};
use met_common::{truncate_to_hour, ValidTime};

/// Writes one pretty-printed JSON document per trial site and run hour.
#[derive(Debug, Clone)]
pub struct JsonReportSink {
    output_dir: PathBuf,
}

impl JsonReportSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// `<output>/<trial>/<trial>_<stamp>.json`
    pub fn report_path(&self, report: &SiteReport) -> PathBuf {
        let stem = report.site.trial.replace(' ', "_");
        let stamp = ValidTime::issue_stamp(&truncate_to_hour(report.generated_at));
        self.output_dir
            .join(&stem)
            .join(format!("{}_{}.json", stem, stamp))
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

#[async_trait]
impl ReportSink for JsonReportSink {
    async fn publish(&self, report: &SiteReport) -> Result<()> {
        let path = self.report_path(report);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| EngineError::sink(format!("{}: {}", parent.display(), e)))?;
        }

        let json = serde_json::to_vec_pretty(report).map_err(|e| EngineError::sink(e.to_string()))?;
        tokio::fs::write(&path, &json)
            .await
            .map_err(|e| EngineError::sink(format!("{}: {}", path.display(), e)))?;

        info!(
            path = %path.display(),
            probabilities = report.probabilities.len(),
            series = report.series.len(),
            "Wrote site report"
        );
        Ok(())
    }
}
