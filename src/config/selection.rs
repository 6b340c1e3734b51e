//! File selection for checkpoints and source videos.
//!
//! Both lookups scan a directory for matching extensions and then apply an
//! explicit [`SelectionPolicy`] when more than one file qualifies.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info};

use super::error::ConfigError;
use crate::constants::{CANONICAL_CHECKPOINT, CHECKPOINT_EXTENSION};

/// How to pick one file when several candidates match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionPolicy {
    /// Lexicographically first file name.
    #[default]
    FirstSorted,
    /// Most recently modified file (ties go to the first name).
    Newest,
}

impl std::str::FromStr for SelectionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "first-sorted" | "first" | "sorted" => Ok(Self::FirstSorted),
            "newest" | "latest" => Ok(Self::Newest),
            _ => Err(ConfigError::InvalidPolicy {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstSorted => f.write_str("first-sorted"),
            Self::Newest => f.write_str("newest"),
        }
    }
}

/// Result of a selection: the chosen file and how many files qualified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Chosen file.
    pub path: PathBuf,
    /// Number of matching files (>= 1).
    pub candidates: usize,
}

impl Selection {
    /// Returns `true` if other files were passed over.
    pub fn is_ambiguous(&self) -> bool {
        self.candidates > 1
    }
}

/// Lists regular files in `dir` whose extension matches one of `extensions`
/// (case-insensitive), sorted by file name. A missing directory yields no files.
pub fn list_candidates(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, ConfigError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|source| ConfigError::ScanFailed {
        dir: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ConfigError::ScanFailed {
            dir: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();

        if path.is_file()
            && let Some(ext) = path.extension().and_then(|e| e.to_str())
            && extensions.iter().any(|want| want.eq_ignore_ascii_case(ext))
        {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Applies `policy` to an already name-sorted candidate list.
pub fn select_file(candidates: Vec<PathBuf>, policy: SelectionPolicy) -> Option<Selection> {
    let count = candidates.len();

    let path = match policy {
        SelectionPolicy::FirstSorted => candidates.into_iter().next()?,
        SelectionPolicy::Newest => {
            let mut best: Option<(SystemTime, PathBuf)> = None;
            for path in candidates {
                let modified = fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                match &best {
                    Some((best_time, _)) if modified <= *best_time => {}
                    _ => best = Some((modified, path)),
                }
            }
            best?.1
        }
    };

    Some(Selection {
        path,
        candidates: count,
    })
}

/// Resolves the grounding checkpoint.
///
/// Order: `explicit` (must be an existing file), then [`CANONICAL_CHECKPOINT`]
/// inside `dir`, then `policy` over every `*.safetensors` file in `dir`.
pub fn resolve_checkpoint(
    explicit: Option<&Path>,
    dir: &Path,
    policy: SelectionPolicy,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ConfigError::PathNotFound {
                path: path.to_path_buf(),
            });
        }
        if !path.is_file() {
            return Err(ConfigError::NotAFile {
                path: path.to_path_buf(),
            });
        }
        debug!(path = %path.display(), "Using explicit checkpoint");
        return Ok(path.to_path_buf());
    }

    let canonical = dir.join(CANONICAL_CHECKPOINT);
    if canonical.is_file() {
        debug!(path = %canonical.display(), "Using canonical checkpoint");
        return Ok(canonical);
    }

    let candidates = list_candidates(dir, &[CHECKPOINT_EXTENSION.to_string()])?;
    let selection =
        select_file(candidates, policy).ok_or_else(|| ConfigError::NoCheckpointFound {
            dir: dir.to_path_buf(),
        })?;

    info!(
        path = %selection.path.display(),
        candidates = selection.candidates,
        policy = %policy,
        "Selected checkpoint"
    );
    Ok(selection.path)
}
