/// Durable storage for per-event play state.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::schema::event::{parse_rows_lenient, EventStateRow};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("RON serialization error: {0}")]
    Serialize(#[from] ron::Error),
}

/// Where eligibility state rows live between sessions.
pub trait EligibilityStore {
    /// Read every row. A store that has never been written returns an
    /// empty list, not an error.
    fn load_rows(&self) -> Result<Vec<EventStateRow>, StoreError>;

    /// Replace the stored rows.
    fn save_rows(&mut self, rows: &[EventStateRow]) -> Result<(), StoreError>;
}

/// State rows kept in a RON file.
#[derive(Debug, Clone)]
pub struct RonFileStore {
    path: PathBuf,
}

impl RonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EligibilityStore for RonFileStore {
    fn load_rows(&self) -> Result<Vec<EventStateRow>, StoreError> {
        if !self.path.exists() {
            log::info!("no state file at {}; starting fresh", self.path.display());
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(parse_rows_lenient(&contents)?)
    }

    fn save_rows(&mut self, rows: &[EventStateRow]) -> Result<(), StoreError> {
        let contents = ron::ser::to_string_pretty(rows, ron::ser::PrettyConfig::default())?;
        std::fs::write(&self.path, contents)?;
        log::info!("saved {} state rows to {}", rows.len(), self.path.display());
        Ok(())
    }
}

/// State rows kept in memory; useful for tests and hosts that persist
/// elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    rows: Vec<EventStateRow>,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(rows: Vec<EventStateRow>) -> Self {
        Self { rows, saves: 0 }
    }

    pub fn rows(&self) -> &[EventStateRow] {
        &self.rows
    }

    /// How many times `save_rows` has been called.
    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl EligibilityStore for MemoryStore {
    fn load_rows(&self) -> Result<Vec<EventStateRow>, StoreError> {
        Ok(self.rows.clone())
    }

    fn save_rows(&mut self, rows: &[EventStateRow]) -> Result<(), StoreError> {
        self.rows = rows.to_vec();
        self.saves += 1;
        Ok(())
    }
}
