//! Artifact persistence.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{info, warn};

use crate::error::{SinkError, SinkResult};

pub const SCORED_FILE: &str = "scored.csv";
pub const ALERTS_FILE: &str = "alerts.csv";
pub const REPORT_FILE: &str = "report.md";

/// The fully rendered output of one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifacts {
    pub scored_csv: Vec<u8>,
    pub alerts_csv: Vec<u8>,
    pub report_md: String,
}

impl Artifacts {
    /// BLAKE3 hex digest of the scored table.
    pub fn scored_digest(&self) -> String {
        digest(&self.scored_csv)
    }

    fn files(&self) -> [(&'static str, &[u8]); 3] {
        [
            (SCORED_FILE, self.scored_csv.as_slice()),
            (ALERTS_FILE, self.alerts_csv.as_slice()),
            (REPORT_FILE, self.report_md.as_bytes()),
        ]
    }
}

/// BLAKE3 hex digest of a byte slice.
pub fn digest(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Destination of a run's artifacts.
///
/// Called once per run, after every artifact has been rendered.
pub trait ResultSink {
    fn write(&self, artifacts: &Artifacts) -> SinkResult<()>;
}

/// Writes `scored.csv`, `alerts.csv` and `report.md` into a directory.
///
/// All or nothing: every file is first written to a `.tmp` sibling, the
/// previous outputs are moved aside to `.bak`, then the temporary files are
/// renamed into place. Any failure removes what this write created and puts
/// the previous outputs back.
pub struct DirectorySink {
    dir: PathBuf,
}

/// One artifact on its way into the output directory.
struct Staged {
    name: &'static str,
    target: PathBuf,
    tmp: PathBuf,
    backup: Option<PathBuf>,
    committed: bool,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn side_path(&self, name: &str, suffix: &str) -> PathBuf {
        self.dir.join(format!("{name}.{suffix}"))
    }

    fn back_up(&self, staged: &mut [Staged]) -> SinkResult<()> {
        for file in staged.iter_mut() {
            if !file.target.is_file() {
                continue;
            }
            let backup = self.side_path(file.name, "bak");
            std::fs::rename(&file.target, &backup).map_err(|e| SinkError::io(&file.target, e))?;
            file.backup = Some(backup);
        }
        Ok(())
    }

    fn commit(&self, staged: &mut [Staged]) -> SinkResult<()> {
        for file in staged.iter_mut() {
            std::fs::rename(&file.tmp, &file.target).map_err(|e| SinkError::io(&file.target, e))?;
            file.committed = true;
        }
        Ok(())
    }

    /// Undo a partial write: restore backups, drop new files and temporaries.
    fn rollback(&self, staged: &[Staged]) {
        for file in staged {
            let restored = match (&file.backup, file.committed) {
                (Some(backup), _) => std::fs::rename(backup, &file.target),
                (None, true) => std::fs::remove_file(&file.target),
                (None, false) => Ok(()),
            };
            if let Err(e) = restored {
                warn!(path = %file.target.display(), error = %e, "failed to restore previous artifact");
            }
            if !file.committed {
                remove_quietly(&file.tmp);
            }
        }
        warn!(dir = %self.dir.display(), "artifact write rolled back");
    }
}

fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!(path = %path.display(), error = %e, "failed to remove file");
    }
}

impl ResultSink for DirectorySink {
    fn write(&self, artifacts: &Artifacts) -> SinkResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|e| SinkError::io(&self.dir, e))?;

        let mut staged: Vec<Staged> = Vec::with_capacity(3);
        for (name, bytes) in artifacts.files() {
            let tmp = self.side_path(name, "tmp");
            if let Err(e) = std::fs::write(&tmp, bytes) {
                self.rollback(&staged);
                return Err(SinkError::io(tmp, e));
            }
            staged.push(Staged {
                name,
                target: self.dir.join(name),
                tmp,
                backup: None,
                committed: false,
            });
        }

        let committed = self
            .back_up(&mut staged)
            .and_then(|()| self.commit(&mut staged));
        if let Err(e) = committed {
            self.rollback(&staged);
            return Err(e);
        }
        for backup in staged.iter().filter_map(|f| f.backup.as_deref()) {
            remove_quietly(backup);
        }

        info!(
            dir = %self.dir.display(),
            scored_bytes = artifacts.scored_csv.len(),
            alerts_bytes = artifacts.alerts_csv.len(),
            digest = %artifacts.scored_digest(),
            "wrote artifacts"
        );
        Ok(())
    }
}

/// Keeps the last written artifacts in memory (for testing and embedding).
#[derive(Default)]
pub struct MemorySink {
    last: Mutex<Option<Artifacts>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Artifacts of the most recent write, if any.
    pub fn artifacts(&self) -> SinkResult<Option<Artifacts>> {
        let last = self.last.lock().map_err(|_| SinkError::LockError)?;
        Ok(last.clone())
    }
}

impl ResultSink for MemorySink {
    fn write(&self, artifacts: &Artifacts) -> SinkResult<()> {
        let mut last = self.last.lock().map_err(|_| SinkError::LockError)?;
        *last = Some(artifacts.clone());
        Ok(())
    }
}
