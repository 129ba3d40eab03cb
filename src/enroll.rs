//! Batch enrollment: a directory-per-employee dataset into the reference
//! store.

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::{Deserialize, Serialize};

use ridgeid_vision::preprocess;
use ridgeid_vision::FingerprintEmbedder;

use crate::embedding::{self, Embedding};
use crate::error::EnrollError;
use crate::store::ReferenceStore;

/// Counters reported after an enrollment run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrollSummary {
    pub employees_enrolled: usize,
    pub fingerprints_processed: usize,
    pub fingerprints_failed: usize,
}

/// Walk `dataset_root` (immediate subdirectory name = employee id, files
/// inside = samples) and upsert one averaged reference per employee into the
/// store at `store_path`.
///
/// Previously enrolled employees missing from the dataset are kept;
/// employees present in both are fully replaced. A sample that fails to
/// embed is logged and counted, never fatal. An employee with zero usable
/// samples gets no entry. The store file is only rewritten when it would
/// hold at least one reference, so a completely failed run leaves the disk
/// untouched.
pub fn enroll(
    dataset_root: &Path,
    embedder: &mut dyn FingerprintEmbedder,
    store_path: &Path,
) -> Result<EnrollSummary, EnrollError> {
    let mut store = ReferenceStore::load(store_path)?;
    let mut summary = EnrollSummary::default();

    for employee_dir in employee_dirs(dataset_root)? {
        let Some(id) = employee_dir.file_name().and_then(|n| n.to_str()) else {
            warn!("skipping non-unicode directory name {:?}", employee_dir);
            continue;
        };

        let samples = sample_files(&employee_dir)?;
        if samples.is_empty() {
            info!("no fingerprint samples for employee {id}");
            continue;
        }
        info!("processing employee {id} ({} samples)", samples.len());

        let mut raw_embeddings = Vec::new();
        for sample in &samples {
            match embedder.embed_file(sample) {
                Ok(raw) => {
                    raw_embeddings.push(raw);
                    summary.fingerprints_processed += 1;
                }
                Err(err) => {
                    warn!("failed to process {}: {err}", sample.display());
                    summary.fingerprints_failed += 1;
                }
            }
        }
        if raw_embeddings.is_empty() {
            info!("no usable fingerprints for employee {id}");
            continue;
        }

        let Some(mean) = embedding::mean_raw(&raw_embeddings) else {
            warn!("inconsistent embedding dimensions for employee {id}, skipping");
            continue;
        };
        let reference = match Embedding::from_raw(mean) {
            Ok(reference) => reference,
            Err(_) => {
                warn!("reference for employee {id} collapsed to zero norm, skipping");
                continue;
            }
        };

        store.upsert(id, reference);
        summary.employees_enrolled += 1;
        info!(
            "enrolled employee {id} from {} fingerprint(s)",
            raw_embeddings.len()
        );
    }

    if store.is_empty() {
        return Err(EnrollError::NothingEnrolled {
            path: dataset_root.to_path_buf(),
        });
    }
    store.persist(store_path)?;
    info!(
        "enrollment complete: {} employees, {} fingerprints ({} failed)",
        summary.employees_enrolled, summary.fingerprints_processed, summary.fingerprints_failed
    );
    Ok(summary)
}

/// Immediate subdirectories of the dataset root, sorted for reproducible
/// runs.
fn employee_dirs(root: &Path) -> Result<Vec<PathBuf>, EnrollError> {
    let dataset_err = |source| EnrollError::Dataset {
        path: root.to_path_buf(),
        source,
    };

    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(root).map_err(dataset_err)? {
        let path = entry.map_err(dataset_err)?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Sample image files directly inside an employee directory, sorted.
fn sample_files(dir: &Path) -> Result<Vec<PathBuf>, EnrollError> {
    let dataset_err = |source| EnrollError::Dataset {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(dataset_err)? {
        let path = entry.map_err(dataset_err)?.path();
        if path.is_file() && preprocess::is_sample_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
