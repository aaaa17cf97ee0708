//! Rendered images and the stage markers carried in their file names.
//!
//! A fresh render is `{timestamp}-{submission}.png`. After the upload the host's
//! id is appended, after the reply the comment id, so a directory listing shows
//! how far each submission got.

use chrono::{DateTime, Local, NaiveDateTime};
use dogecloud_core::CoreError;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.6f";
/// Length of a timestamp rendered with [`TIMESTAMP_FORMAT`].
const TIMESTAMP_LEN: usize = 26;
const EXTENSION: &str = ".png";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactStage {
    Rendered,
    Uploaded,
    Replied,
}

impl fmt::Display for ArtifactStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtifactStage::Rendered => "rendered",
            ArtifactStage::Uploaded => "uploaded",
            ArtifactStage::Replied => "replied",
        };
        f.write_str(name)
    }
}

/// A parsed artifact file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    pub created: NaiveDateTime,
    pub submission_id: String,
    pub upload_id: Option<String>,
    pub reply_id: Option<String>,
}

impl ArtifactName {
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(EXTENSION)?;
        if stem.len() <= TIMESTAMP_LEN || !stem.is_char_boundary(TIMESTAMP_LEN) {
            return None;
        }
        let (timestamp, rest) = stem.split_at(TIMESTAMP_LEN);
        let created = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).ok()?;

        let mut parts = rest.strip_prefix('-')?.split('-');
        let submission_id = parts.next().filter(|s| !s.is_empty())?.to_string();
        let upload_id = parts.next().map(String::from);
        let reply_id = parts.next().map(String::from);
        if parts.next().is_some() {
            return None;
        }

        Some(Self {
            created,
            submission_id,
            upload_id,
            reply_id,
        })
    }

    pub fn stage(&self) -> ArtifactStage {
        match (&self.upload_id, &self.reply_id) {
            (Some(_), Some(_)) => ArtifactStage::Replied,
            (Some(_), None) => ArtifactStage::Uploaded,
            _ => ArtifactStage::Rendered,
        }
    }
}

pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Use `dir` for artifacts, creating it if needed.
    pub fn open(dir: &Path) -> Result<Self, CoreError> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where a fresh render for `submission_id` goes.
    pub fn render_path(&self, submission_id: &str, now: DateTime<Local>) -> PathBuf {
        let name = format!(
            "{}-{}{}",
            now.format(TIMESTAMP_FORMAT),
            submission_id,
            EXTENSION
        );
        self.dir.join(name)
    }

    /// Rename `path` to carry `tag` as its last suffix and return the new path.
    pub fn tag(&self, path: &Path, tag: &str) -> Result<PathBuf, CoreError> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| CoreError::InvalidInput {
                message: format!("artifact path has no file name: {}", path.display()),
            })?;
        let stem = file_name.strip_suffix(EXTENSION).unwrap_or(file_name);
        let tagged = path.with_file_name(format!("{}-{}{}", stem, tag, EXTENSION));

        std::fs::rename(path, &tagged)?;
        debug!("Renamed {} to {}", path.display(), tagged.display());
        Ok(tagged)
    }

    /// Artifacts whose submission never got a reply, logged as warnings.
    ///
    /// Nothing is retried; the names are only reported.
    pub fn audit(&self) -> Result<Vec<ArtifactName>, CoreError> {
        let mut incomplete = Vec::new();
        let mut complete = 0usize;

        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str().and_then(ArtifactName::parse) else {
                continue;
            };
            match name.stage() {
                ArtifactStage::Replied => complete += 1,
                stage => {
                    warn!(
                        "Submission {} stopped after being {} ({})",
                        name.submission_id,
                        stage,
                        entry.path().display()
                    );
                    incomplete.push(name);
                }
            }
        }

        incomplete.sort_by(|a, b| a.created.cmp(&b.created));
        info!(
            "Artifact audit: {} complete, {} incomplete in {}",
            complete,
            incomplete.len(),
            self.dir.display()
        );
        Ok(incomplete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Local> {
        Local.with_ymd_and_hms(2014, 1, 25, 13, 37, 42).unwrap()
    }

    #[test]
    fn test_render_path_and_tags() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(&dir.path().join("done")).unwrap();

        let path = store.render_path("abc123", fixed_time());
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "2014-01-25T13-37-42.000000-abc123.png"
        );

        std::fs::write(&path, b"png").unwrap();
        let uploaded = store.tag(&path, "Xy7Zq").unwrap();
        let replied = store.tag(&uploaded, "c0ffee").unwrap();
        assert!(!path.exists());
        assert!(!uploaded.exists());
        assert_eq!(
            replied.file_name().unwrap().to_str().unwrap(),
            "2014-01-25T13-37-42.000000-abc123-Xy7Zq-c0ffee.png"
        );
    }

    #[test]
    fn test_parse_stages() {
        let rendered = ArtifactName::parse("2014-01-25T13-37-42.123456-abc123.png").unwrap();
        assert_eq!(rendered.submission_id, "abc123");
        assert_eq!(rendered.stage(), ArtifactStage::Rendered);

        let uploaded = ArtifactName::parse("2014-01-25T13-37-42.123456-abc123-Xy7Zq.png").unwrap();
        assert_eq!(uploaded.upload_id.as_deref(), Some("Xy7Zq"));
        assert_eq!(uploaded.stage(), ArtifactStage::Uploaded);

        let replied =
            ArtifactName::parse("2014-01-25T13-37-42.123456-abc123-Xy7Zq-c0ffee.png").unwrap();
        assert_eq!(replied.reply_id.as_deref(), Some("c0ffee"));
        assert_eq!(replied.stage(), ArtifactStage::Replied);
    }

    #[test]
    fn test_parse_rejects_foreign_files() {
        assert!(ArtifactName::parse("notes.txt").is_none());
        assert!(ArtifactName::parse("template.png").is_none());
        assert!(ArtifactName::parse("2014-01-25T13-37-42.123456.png").is_none());
        assert!(ArtifactName::parse("2014-01-25T13-37-42.123456-a-b-c-d.png").is_none());
    }

    #[test]
    fn test_audit_reports_incomplete() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(dir.path()).unwrap();
        for name in [
            "2014-01-25T13-37-42.000001-aaa111.png",
            "2014-01-25T13-37-42.000002-bbb222-Up1.png",
            "2014-01-25T13-37-42.000003-ccc333-Up2-re3.png",
            "readme.md",
        ] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }

        let incomplete = store.audit().unwrap();
        let ids: Vec<_> = incomplete.iter().map(|a| a.submission_id.as_str()).collect();
        assert_eq!(ids, vec!["aaa111", "bbb222"]);
        assert_eq!(incomplete[1].stage(), ArtifactStage::Uploaded);
    }
}
