//! Raw field source contract.
//!
//! The engine never knows how files arrive. A [`FieldSource`] lists the
//! member directories of a cycle and hands back parsed source files; an
//! absent file is `Ok(None)` and becomes a fetch gap.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use met_derive::SourceFile;

use crate::error::Result;

/// Which of a member's two files per lead step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// Single-level fields (`pd`): orography, screen temperature, visibility, rain
    Surface,
    /// Model-level fields (`pe`): winds, temperature, humidity, pressure
    ModelLevel,
}

impl FileKind {
    /// File name for a numbered file, e.g. `enukaa_pd006`.
    pub fn file_name(&self, file_number: u32) -> String {
        let letter = match self {
            FileKind::Surface => 'd',
            FileKind::ModelLevel => 'e',
        };
        format!("enukaa_p{}{:03}", letter, file_number)
    }
}

/// Provider of parsed source files for one cycle.
#[async_trait]
pub trait FieldSource: Send + Sync {
    /// Member directory numbers present for the cycle issued at `issue_time`.
    async fn members(&self, issue_time: DateTime<Utc>) -> Result<Vec<u32>>;

    /// One member's file, or `None` when it was never fetched.
    async fn fetch(
        &self,
        issue_time: DateTime<Utc>,
        member: u32,
        kind: FileKind,
        file_number: u32,
    ) -> Result<Option<SourceFile>>;
}
