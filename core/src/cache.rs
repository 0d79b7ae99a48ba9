//! Persistent all-pairs distance cache.
//!
//! One bincode artifact per [`CacheKey`] under the cache root. A missing,
//! unreadable or mismatching artifact is a miss; the matrix is recomputed and
//! written back. Failing to write back never fails the caller.

use crate::distance::{cosine_distances, DistanceMatrix};
use crate::error::{RecError, Result};
use crate::key::CacheKey;
use crate::topics::TopicMatrix;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, create_dir_all, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct DistanceArtifact {
    format_version: u32,
    cache_key: String,
    rows: u64,
    created_at: String,
    distances: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
    /// Loaded from a persisted artifact.
    Hit,
    /// Recomputed from the topic matrix.
    Computed,
}

#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub matrix: Arc<DistanceMatrix>,
    pub source: CacheSource,
    /// Set when a freshly computed matrix could not be persisted.
    pub store_error: Option<String>,
}

pub struct DistanceCache {
    root: PathBuf,
    // one lock per key so concurrent misses compute once
    building: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl DistanceCache {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf(), building: Mutex::new(HashMap::new()) }
    }

    pub fn root(&self) -> &Path { &self.root }

    pub fn artifact_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{}.dist.bin", key.file_stem()))
    }

    /// Return the distance matrix for `topics`, loading it when an artifact
    /// for `key` exists and is valid, computing and persisting it otherwise.
    pub fn get_or_build(&self, topics: &TopicMatrix, key: &CacheKey) -> BuildOutcome {
        let lock = self.key_lock(key);
        let outcome = {
            let _held = lock.lock();
            self.load_or_compute(topics, key)
        };
        self.release_key_lock(key, lock);
        outcome
    }

    fn load_or_compute(&self, topics: &TopicMatrix, key: &CacheKey) -> BuildOutcome {
        match self.load(key, topics.rows()) {
            Ok(Some(matrix)) => {
                tracing::info!(cache_key = %key, rows = matrix.rows(), "distance cache hit");
                return BuildOutcome { matrix: Arc::new(matrix), source: CacheSource::Hit, store_error: None };
            }
            Ok(None) => tracing::info!(cache_key = %key, "distance cache miss"),
            Err(e) => tracing::warn!(cache_key = %key, error = %e, "discarding unusable distance cache artifact"),
        }

        let matrix = cosine_distances(topics);
        let store_error = match self.store(key, &matrix) {
            Ok(path) => {
                tracing::info!(cache_key = %key, path = %path.display(), rows = matrix.rows(), "stored distance matrix");
                None
            }
            Err(e) => {
                tracing::error!(cache_key = %key, error = %e, "failed to store distance matrix");
                Some(e.to_string())
            }
        };
        BuildOutcome { matrix: Arc::new(matrix), source: CacheSource::Computed, store_error }
    }

    /// `Ok(None)` when nothing is stored under `key`. Any artifact that cannot
    /// be read or does not describe an `expected_rows` square matrix for this
    /// exact key is [`RecError::CacheCorrupt`].
    pub fn load(&self, key: &CacheKey, expected_rows: usize) -> Result<Option<DistanceMatrix>> {
        let path = self.artifact_path(key);
        let f = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(RecError::CacheCorrupt(format!("{}: {e}", path.display()))),
        };
        let artifact: DistanceArtifact = bincode::deserialize_from(BufReader::new(f))
            .map_err(|e| RecError::CacheCorrupt(format!("{}: {e}", path.display())))?;

        if artifact.format_version != ARTIFACT_FORMAT_VERSION {
            return Err(RecError::CacheCorrupt(format!(
                "format version {} (expected {ARTIFACT_FORMAT_VERSION})",
                artifact.format_version
            )));
        }
        if artifact.cache_key != key.as_str() {
            return Err(RecError::CacheCorrupt(format!(
                "artifact is for key {} not {key}",
                artifact.cache_key
            )));
        }
        if artifact.rows != expected_rows as u64 {
            return Err(RecError::CacheCorrupt(format!(
                "artifact has {} rows, topic matrix has {expected_rows}",
                artifact.rows
            )));
        }
        DistanceMatrix::from_raw(expected_rows, artifact.distances)
            .map(Some)
            .map_err(|e| RecError::CacheCorrupt(e.to_string()))
    }

    /// Persist `matrix` under `key`. The artifact is written to a uniquely
    /// named temp file in the cache root and renamed into place, so concurrent
    /// writers never share a partial file.
    pub fn store(&self, key: &CacheKey, matrix: &DistanceMatrix) -> Result<PathBuf> {
        create_dir_all(&self.root)?;
        let path = self.artifact_path(key);

        let artifact = DistanceArtifact {
            format_version: ARTIFACT_FORMAT_VERSION,
            cache_key: key.as_str().to_string(),
            rows: matrix.rows() as u64,
            created_at: time::OffsetDateTime::now_utc()
                .format(&time::format_description::well_known::Rfc3339)
                .unwrap_or_default(),
            distances: matrix.as_slice().to_vec(),
        };

        // dropped (and deleted) on any early return
        let mut tmp = NamedTempFile::new_in(&self.root)?;
        {
            let mut out = BufWriter::new(tmp.as_file_mut());
            bincode::serialize_into(&mut out, &artifact)?;
            out.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(path)
    }

    /// Remove the artifact for `key`. Returns whether one existed.
    pub fn invalidate(&self, key: &CacheKey) -> Result<bool> {
        match fs::remove_file(self.artifact_path(key)) {
            Ok(()) => {
                tracing::info!(cache_key = %key, "invalidated distance cache");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn key_lock(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        self.building.lock().entry(key.clone()).or_default().clone()
    }

    // Drop the map entry once no other caller holds or waits on it. New
    // callers clone under the map lock, so the count cannot grow meanwhile.
    fn release_key_lock(&self, key: &CacheKey, lock: Arc<Mutex<()>>) {
        let mut building = self.building.lock();
        drop(lock);
        if building.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
            building.remove(key);
        }
    }

    #[cfg(test)]
    fn pending_keys(&self) -> usize {
        self.building.lock().len()
    }
}
