//! The durable set of submissions the bot has already taken.
//!
//! One id per line, append-only. An id is written and synced before any work
//! on that submission starts, so a crash never causes a second reply.

use dogecloud_core::CoreError;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct RespondedLog {
    path: PathBuf,
    ids: HashSet<String>,
    writer: BufWriter<File>,
}

impl RespondedLog {
    /// Read every recorded id and keep the file open for appending. Creates the file if missing.
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        let mut ids = HashSet::new();
        let mut needs_newline = false;
        if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            needs_newline = !raw.is_empty() && !raw.ends_with('\n');
            ids.extend(
                raw.lines()
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(String::from),
            );
        }

        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        // A hand-edited file may lack its final newline.
        if needs_newline {
            file.write_all(b"\n")?;
        }
        info!(
            "Loaded {} responded submissions from {}",
            ids.len(),
            path.display()
        );

        Ok(Self {
            path: path.to_path_buf(),
            ids,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Record `id` durably. Returns `false` if it was already claimed.
    pub fn claim(&mut self, id: &str) -> Result<bool, CoreError> {
        if self.ids.contains(id) {
            return Ok(false);
        }

        writeln!(self.writer, "{}", id)?;
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;

        self.ids.insert(id.to_string());
        debug!("Claimed submission {}", id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claims_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("responded-list.txt");

        let mut log = RespondedLog::open(&path).unwrap();
        assert!(log.is_empty());
        assert!(log.claim("abc123").unwrap());
        assert!(!log.claim("abc123").unwrap());
        assert!(log.claim("def456").unwrap());
        drop(log);

        let log = RespondedLog::open(&path).unwrap();
        assert_eq!(log.len(), 2);
        assert!(log.contains("abc123"));
        assert!(log.contains("def456"));
        assert!(!log.contains("zzz999"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "abc123\ndef456\n"
        );
    }

    #[test]
    fn test_existing_file_is_appended_to() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("responded-list.txt");
        std::fs::write(&path, "old1\n\n  old2  ").unwrap();

        let mut log = RespondedLog::open(&path).unwrap();
        assert_eq!(log.len(), 2);
        assert!(log.contains("old2"));
        log.claim("new1").unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "old1\n\n  old2  \nnew1\n"
        );
    }
}
