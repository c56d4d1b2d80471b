mod store;

pub use store::{DedupStore, JsonFileStore, MemoryStore};

use crate::config::ContentType;
use glob::Pattern;
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

/// A file that may be published. Recomputed on every discovery pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub content_type: ContentType,
    pub modified: SystemTime,
}

/// Discovers publishable files in one folder and tracks which of them have
/// already been published.
pub struct FileCatalog {
    folder: PathBuf,
    key: String,
    store: Arc<dyn DedupStore>,
    uploaded: HashSet<PathBuf>,
    exclude: Vec<Pattern>,
}

impl FileCatalog {
    /// Open the catalog for `folder`, loading its upload record. An unreadable
    /// record is treated as empty.
    pub async fn load(
        folder: &Path,
        store: Arc<dyn DedupStore>,
        exclude_patterns: &[String],
    ) -> Self {
        let folder = absolute(folder);
        let key = folder.to_string_lossy().to_string();

        let uploaded = match store.load(&key).await {
            Ok(uploaded) => uploaded,
            Err(e) => {
                tracing::warn!(folder = %key, error = %e, "Upload record unreadable, starting empty");
                HashSet::new()
            }
        };
        tracing::info!(folder = %key, uploaded = uploaded.len(), "Loaded upload record");

        Self {
            folder,
            key,
            store,
            uploaded,
            exclude: compile_patterns(exclude_patterns),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn uploaded_count(&self) -> usize {
        self.uploaded.len()
    }

    pub fn is_uploaded(&self, path: &Path) -> bool {
        self.uploaded.contains(path)
    }

    /// Up to `max_results` files of `content_type` that are not yet in the
    /// upload record, newest first.
    ///
    /// Scanning stops as soon as `max_results` new files are collected, and
    /// modification times are only read for files that survive the record
    /// check, so folders full of published files stay cheap to poll.
    pub fn discover_new(&self, content_type: ContentType, max_results: usize) -> Vec<CandidateFile> {
        let mut found = Vec::new();
        if max_results == 0 {
            return found;
        }

        for path in list_files(&self.folder) {
            if !content_type.matches(&path) || self.is_excluded(&path) {
                continue;
            }
            if self.uploaded.contains(&path) {
                continue;
            }
            found.push(candidate(path, content_type));
            if found.len() >= max_results {
                break;
            }
        }

        sort_newest_first(&mut found);
        tracing::debug!(
            folder = %self.key,
            content_type = %content_type,
            found = found.len(),
            "Discovery pass finished"
        );
        found
    }

    /// Add `paths` to the upload record and persist it. Returns how many
    /// paths were new. A failed save is logged; the in-memory record keeps
    /// the additions.
    pub async fn mark_uploaded(&mut self, paths: &[PathBuf]) -> usize {
        let added = paths
            .iter()
            .filter(|p| self.uploaded.insert((*p).clone()))
            .count();

        if let Err(e) = self.store.save(&self.key, &self.uploaded).await {
            tracing::warn!(folder = %self.key, error = %e, "Failed to save upload record");
        }
        added
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.exclude.iter().any(|pattern| pattern.matches(name))
    }
}

/// Every file of `content_type` in `folder`, newest first, ignoring the
/// upload record. Used by manual runs.
pub fn list_all(folder: &Path, content_type: ContentType) -> Vec<CandidateFile> {
    let mut files: Vec<CandidateFile> = list_files(&absolute(folder))
        .into_iter()
        .filter(|path| content_type.matches(path))
        .map(|path| candidate(path, content_type))
        .collect();
    sort_newest_first(&mut files);
    files
}

/// Regular, non-hidden files directly inside `folder`. A folder that cannot
/// be read yields nothing.
fn list_files(folder: &Path) -> Vec<PathBuf> {
    if !folder.is_dir() {
        tracing::warn!(folder = %folder.display(), "Folder is not readable, nothing to discover");
        return Vec::new();
    }

    let walker = WalkBuilder::new(folder)
        .max_depth(Some(1))
        .standard_filters(false)
        .hidden(true)
        .build();

    let mut files = Vec::new();
    for result in walker {
        match result {
            Ok(entry) => {
                if entry.depth() == 0 {
                    continue;
                }
                if entry.file_type().map_or(false, |t| t.is_file()) {
                    files.push(entry.into_path());
                }
            }
            Err(e) => {
                tracing::warn!(folder = %folder.display(), error = %e, "Error reading folder entry");
            }
        }
    }
    files
}

fn candidate(path: PathBuf, content_type: ContentType) -> CandidateFile {
    let modified = fs::metadata(&path)
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH);
    CandidateFile {
        path,
        content_type,
        modified,
    }
}

fn sort_newest_first(files: &mut [CandidateFile]) {
    files.sort_by(|a, b| b.modified.cmp(&a.modified));
}

fn absolute(folder: &Path) -> PathBuf {
    folder.canonicalize().unwrap_or_else(|_| folder.to_path_buf())
}

fn compile_patterns(patterns: &[String]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|p| match Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                tracing::warn!(pattern = %p, error = %e, "Ignoring invalid exclude pattern");
                None
            }
        })
        .collect()
}
