//! Durable per-job status persistence.
//!
//! One JSON record per job id at `<root>/<job_id>/status.json`, written
//! with a temp-file-then-rename replace so a reader can never observe a
//! half-written record. The store is the sole source of truth for status
//! queries: readers always re-read the file, so answers stay correct
//! across restarts of either the API server or the worker.
//!
//! Concurrency discipline is single-writer-per-id (only the executor for
//! a job ever writes its record); readers are unrestricted.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use autofit_core::job::{JobId, JobRecord};

/// Environment variable naming the store root directory.
pub const DATA_DIR_ENV: &str = "AUTOFIT_DATA_DIR";

/// Store root used when [`DATA_DIR_ENV`] is unset.
pub const DEFAULT_DATA_DIR: &str = "./autofit-data";

/// Name of the record file inside a job directory.
const STATUS_FILE: &str = "status.json";

/// Temp name the record is staged under before the atomic rename.
const STATUS_TMP_FILE: &str = ".status.json.tmp";

/// Errors raised by the status store.
///
/// A missing record is NOT an error -- [`StatusStore::read`] returns
/// `Ok(None)` for ids that have no record yet (or never will).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Status store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Corrupt status record at {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// File-backed key-value store of [`JobRecord`]s keyed by [`JobId`].
#[derive(Debug, Clone)]
pub struct StatusStore {
    root: PathBuf,
}

impl StatusStore {
    /// Create a store rooted at `root`. The directory is created lazily
    /// on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create a store rooted at `$AUTOFIT_DATA_DIR`, falling back to
    /// [`DEFAULT_DATA_DIR`]. Both the API server and the worker binary
    /// resolve the root this way so they agree on record locations.
    pub fn from_env() -> Self {
        let root = std::env::var(DATA_DIR_ENV).unwrap_or_else(|_| DEFAULT_DATA_DIR.into());
        Self::new(root)
    }

    /// Root directory of the store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Per-job directory: holds the status record plus any scratch files
    /// the job produces (downloaded data, model artifact).
    pub fn job_dir(&self, id: JobId) -> PathBuf {
        self.root.join(id.to_string())
    }

    fn status_path(&self, id: JobId) -> PathBuf {
        self.job_dir(id).join(STATUS_FILE)
    }

    /// Persist the full record for `id`, overwriting any previous one.
    ///
    /// The record is serialized to a temp file in the job directory and
    /// renamed over `status.json`, so readers see either the old record
    /// or the new one, never a partial write.
    pub fn write(&self, id: JobId, record: &JobRecord) -> Result<(), StoreError> {
        let dir = self.job_dir(id);
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;

        let bytes = serde_json::to_vec_pretty(record).map_err(|source| StoreError::Corrupt {
            path: self.status_path(id),
            source,
        })?;

        let tmp = dir.join(STATUS_TMP_FILE);
        fs::write(&tmp, bytes).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;

        let path = self.status_path(id);
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;

        tracing::debug!(job_id = %id, status = %record.status, "Job record written");
        Ok(())
    }

    /// Read the current record for `id`, or `None` if no record exists.
    ///
    /// A record that exists but does not decode is reported as
    /// [`StoreError::Corrupt`], distinct from the not-found outcome.
    pub fn read(&self, id: JobId) -> Result<Option<JobRecord>, StoreError> {
        let path = self.status_path(id);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        let record =
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt { path, source })?;
        Ok(Some(record))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
