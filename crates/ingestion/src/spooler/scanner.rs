//! Directory enumeration and file ordering

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use contracts::StageError;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::spooler::config::{ReadOrder, SpoolDirConfig};

/// Total order over candidate files: modification time, then path bytes
///
/// Under lexicographical order the time component is always 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    modified_ns: u64,
    path: PathBuf,
}

impl SortKey {
    pub fn new(modified_ns: u64, path: PathBuf) -> Self {
        Self { modified_ns, path }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.modified_ns.cmp(&other.modified_ns).then_with(|| {
            self.path
                .as_os_str()
                .as_encoded_bytes()
                .cmp(other.path.as_os_str().as_encoded_bytes())
        })
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// A matching file seen during one scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpoolFile {
    pub path: PathBuf,
    pub modified_ns: u64,
}

impl SpoolFile {
    pub fn sort_key(&self) -> SortKey {
        SortKey::new(self.modified_ns, self.path.clone())
    }
}

/// One ordered snapshot of the spool directory
#[derive(Debug, Default)]
pub struct Snapshot {
    files: Vec<SpoolFile>,
}

impl Snapshot {
    fn new(mut files: Vec<SpoolFile>) -> Self {
        files.sort_by_key(SpoolFile::sort_key);
        Self { files }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.iter().any(|f| f.path == path)
    }

    pub fn files(&self) -> &[SpoolFile] {
        &self.files
    }

    /// Smallest file whose key is `>= key`
    pub fn first_at_or_after(&self, key: &SortKey) -> Option<&SpoolFile> {
        self.files.iter().find(|f| f.sort_key() >= *key)
    }

    /// Smallest file strictly after `key`, never `key`'s own file nor an
    /// exhausted one
    pub fn first_after(
        &self,
        key: &SortKey,
        current: &Path,
        exhausted: &HashSet<PathBuf>,
    ) -> Option<&SpoolFile> {
        self.files.iter().find(|f| {
            f.path != current && !exhausted.contains(&f.path) && f.sort_key() > *key
        })
    }

    pub fn first(&self) -> Option<&SpoolFile> {
        self.files.first()
    }
}

/// Modification time in nanoseconds since the epoch
pub fn modified_ns(modified: SystemTime) -> u64 {
    modified
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Ordering key of a file that may not have been scanned yet
pub fn key_for_path(path: &Path, order: ReadOrder) -> std::io::Result<SortKey> {
    let modified = match order {
        ReadOrder::Lexicographical => 0,
        ReadOrder::Timestamp => modified_ns(std::fs::metadata(path)?.modified()?),
    };
    Ok(SortKey::new(modified, path.to_path_buf()))
}

/// Enumerate matching files (blocking)
pub fn scan(config: &SpoolDirConfig) -> Snapshot {
    let max_depth = if config.process_subdirectories {
        usize::MAX
    } else {
        1
    };

    let mut files = Vec::new();
    for entry in WalkDir::new(config.root())
        .min_depth(1)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "skipping unreadable spool entry");
                None
            }
        })
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str() else {
            continue;
        };
        if !config.matches(name) {
            continue;
        }

        let modified = match config.read_order {
            ReadOrder::Lexicographical => 0,
            ReadOrder::Timestamp => match entry.metadata().ok().and_then(|m| m.modified().ok()) {
                Some(t) => modified_ns(t),
                None => {
                    warn!(file = %entry.path().display(), "no modification time, skipping");
                    continue;
                }
            },
        };
        files.push(SpoolFile {
            path: entry.into_path(),
            modified_ns: modified,
        });
    }

    debug!(root = %config.root().display(), files = files.len(), "spool directory scanned");
    Snapshot::new(files)
}

/// Enumerate matching files on the blocking pool
pub async fn scan_async(config: SpoolDirConfig) -> Result<Snapshot, StageError> {
    tokio::task::spawn_blocking(move || scan(&config))
        .await
        .map_err(|e| StageError::Other(format!("directory scan task failed: {e}")))
}
