use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::storage::OpenMode;

/// Failure of a single resolve-or-mutate attempt against the blob.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Error opening {} ({mode:?}): {source}", path.display())]
    Open {
        path:   PathBuf,
        mode:   OpenMode,
        source: io::Error,
    },
    /// Seek or read failure while resolving, including short reads.
    #[error("Error reading configuration table: {0}")]
    Io(#[from] io::Error),
    /// Seek, write or flush failure on the payload byte, including short writes.
    #[error("Error writing payload at 0x{offset:x}: {source}")]
    Write {
        offset: u64,
        source: io::Error,
    },
    #[error("Entry {key} not found in configuration table")]
    EntryNotFound { key: String },
}

impl TableError {
    pub(crate) fn not_found(key: &[u8]) -> Self {
        TableError::EntryNotFound { key: String::from_utf8_lossy(key).into_owned() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, TableError::EntryNotFound { .. })
    }

    /// Any storage failure, whichever stage it happened in.
    pub fn is_io_fault(&self) -> bool {
        matches!(self, TableError::Open { .. } | TableError::Io(_) | TableError::Write { .. })
    }

    pub fn io_error(&self) -> Option<&io::Error> {
        match self {
            TableError::Open { source, .. } | TableError::Write { source, .. } => Some(source),
            TableError::Io(e) => Some(e),
            TableError::EntryNotFound { .. } => None,
        }
    }
}
