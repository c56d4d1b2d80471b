use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One selection → metadata → publish cycle's worth of files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// 1-based.
    pub index: usize,
    pub total: usize,
    pub files: Vec<PathBuf>,
}

/// Split `files` into consecutive batches of at most `batch_size`, keeping
/// their order. A zero batch size is treated as one.
pub fn plan_batches(files: &[PathBuf], batch_size: usize) -> Vec<Batch> {
    let batch_size = batch_size.max(1);
    let total = files.len().div_ceil(batch_size);
    files
        .chunks(batch_size)
        .enumerate()
        .map(|(i, chunk)| Batch {
            index: i + 1,
            total,
            files: chunk.to_vec(),
        })
        .collect()
}

/// Outcome of one session run. Produced exactly once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub success: bool,
    /// Files in batches that were published.
    pub total_files: usize,
    pub batches_completed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub cancelled: bool,
}

impl JobResult {
    pub fn completed(total_files: usize, batches_completed: usize) -> Self {
        Self {
            success: true,
            total_files,
            batches_completed,
            ..Self::default()
        }
    }

    pub fn failed(error: impl Into<String>, total_files: usize, batches_completed: usize) -> Self {
        Self {
            success: false,
            total_files,
            batches_completed,
            error: Some(error.into()),
            cancelled: false,
        }
    }

    pub fn cancelled(total_files: usize, batches_completed: usize) -> Self {
        Self {
            success: false,
            total_files,
            batches_completed,
            error: None,
            cancelled: true,
        }
    }
}
