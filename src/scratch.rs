use crate::error::{SearchError, SearchResult};
use crate::search_config::Face;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Location and naming of the per-run scratch files (constraint files and solver logs).
///
/// Files are named from the face, cipher name, word size, round count and `run_id`, so that
/// concurrent runs sharing a directory do not collide. Nothing in here is durable state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScratchSpace {
    pub directory: PathBuf,
    pub run_id: String,
}

impl Default for ScratchSpace {
    fn default() -> Self {
        ScratchSpace::new(std::env::temp_dir().join("boomerang-search"))
    }
}

impl ScratchSpace {
    /// A scratch space in `directory`, identified by the current timestamp.
    pub fn new(directory: impl Into<PathBuf>) -> ScratchSpace {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        ScratchSpace {
            directory: directory.into(),
            run_id: format!("{millis}-{}", std::process::id()),
        }
    }

    pub fn ensure_exists(&self) -> SearchResult<()> {
        std::fs::create_dir_all(&self.directory).map_err(|e| SearchError::io(&self.directory, e))
    }

    /// Constraint file used by trail searches.
    pub fn constraint_file(
        &self,
        face: Face,
        cipher: &str,
        word_size: usize,
        rounds: usize,
    ) -> PathBuf {
        self.directory.join(format!(
            "{face}-{cipher}{word_size}-{rounds}-{}.stp",
            self.run_id
        ))
    }

    /// Constraint file used by clustering.
    pub fn cluster_file(&self, face: Face, cipher: &str, rounds: usize) -> PathBuf {
        self.directory
            .join(format!("{cipher}{face}-{rounds}-{}.stp", self.run_id))
    }

    pub fn solver_log(&self) -> PathBuf {
        self.directory.join(format!("satlog{}.tmp", self.run_id))
    }

    /// Remove a stale log so that solution counts never accumulate across invocations.
    pub fn clear_log(&self, log: &Path) -> SearchResult<()> {
        match std::fs::remove_file(log) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SearchError::io(log, e)),
        }
    }
}
