//! Local source tree.
//!
//! Fetched files are stored as JSON under
//! `<root>/<YYYYMMDDTHHMMZ>/enuk_um_<MMM>/<file>.json`. Retrieval into this
//! tree happens elsewhere.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use ensemble_engine::{EngineError, FieldSource, FileKind, Result};
use met_common::ValidTime;
use met_derive::SourceFile;

/// Prefix of member directory names.
pub const MEMBER_DIR_PREFIX: &str = "enuk_um_";

/// Field source reading JSON files from a local directory tree.
#[derive(Debug, Clone)]
pub struct LocalJsonSource {
    root: PathBuf,
}

impl LocalJsonSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn issue_dir(&self, issue_time: &DateTime<Utc>) -> PathBuf {
        self.root.join(ValidTime::issue_stamp(issue_time))
    }

    /// Path of one member's file.
    pub fn file_path(&self, issue_time: &DateTime<Utc>, member: u32, kind: FileKind, file_number: u32) -> PathBuf {
        self.issue_dir(issue_time)
            .join(format!("{}{:03}", MEMBER_DIR_PREFIX, member))
            .join(format!("{}.json", kind.file_name(file_number)))
    }
}

fn member_number(dir_name: &str) -> Option<u32> {
    dir_name.strip_prefix(MEMBER_DIR_PREFIX)?.parse().ok()
}

#[async_trait]
impl FieldSource for LocalJsonSource {
    async fn members(&self, issue_time: DateTime<Utc>) -> Result<Vec<u32>> {
        let dir = self.issue_dir(&issue_time);
        if !dir.is_dir() {
            return Err(EngineError::source(format!("no cycle directory {}", dir.display())));
        }

        let mut members = Vec::new();
        for entry in walkdir::WalkDir::new(&dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| EngineError::source(e.to_string()))?;
            if !entry.file_type().is_dir() {
                continue;
            }
            if let Some(n) = entry.file_name().to_str().and_then(member_number) {
                members.push(n);
            }
        }
        members.sort_unstable();
        debug!(issue = %ValidTime::issue_stamp(&issue_time), members = members.len(), "Listed members");
        Ok(members)
    }

    async fn fetch(
        &self,
        issue_time: DateTime<Utc>,
        member: u32,
        kind: FileKind,
        file_number: u32,
    ) -> Result<Option<SourceFile>> {
        let path = self.file_path(&issue_time, member, kind, file_number);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(EngineError::source(format!("{}: {}", path.display(), e))),
        };
        let file = SourceFile::from_json(&bytes)
            .map_err(|e| EngineError::source(format!("{}: {}", path.display(), e)))?;
        debug!(path = %path.display(), fields = file.fields.len(), "Read source file");
        Ok(Some(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_member_number() {
        assert_eq!(member_number("enuk_um_007"), Some(7));
        assert_eq!(member_number("enuk_um_x"), None);
        assert_eq!(member_number("other"), None);
    }

    #[test]
    fn test_members_and_missing_files() {
        let root = tempfile::tempdir().unwrap();
        let issue = Utc.with_ymd_and_hms(2024, 1, 15, 6, 0, 0).unwrap();
        let source = LocalJsonSource::new(root.path());

        assert!(tokio_test::block_on(source.members(issue)).is_err());

        let cycle = root.path().join("20240115T0600Z");
        std::fs::create_dir_all(cycle.join("enuk_um_002")).unwrap();
        std::fs::create_dir_all(cycle.join("enuk_um_000")).unwrap();
        std::fs::create_dir_all(cycle.join("scratch")).unwrap();

        let members = tokio_test::block_on(source.members(issue)).unwrap();
        assert_eq!(members, vec![0, 2]);

        let missing = tokio_test::block_on(source.fetch(issue, 2, FileKind::Surface, 0)).unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_unparseable_file_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let issue = Utc.with_ymd_and_hms(2024, 1, 15, 6, 0, 0).unwrap();
        let source = LocalJsonSource::new(root.path());
        let path = source.file_path(&issue, 1, FileKind::ModelLevel, 3);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not json").unwrap();

        let result = tokio_test::block_on(source.fetch(issue, 1, FileKind::ModelLevel, 3));
        assert!(matches!(result, Err(EngineError::Source(_))));
    }
}
