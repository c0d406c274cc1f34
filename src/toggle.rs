//! One resolve-and-mutate cycle against the blob.
//!
//! Each call opens the blob through [`Storage`], resolves the entry, reads
//! the payload byte and (for mutations) writes the new byte back.  Nothing
//! is cached between calls; the table is re-read every time.

use tracing::{info, warn};

use crate::aspect::{toggle_byte, AspectRatio};
use crate::config::ToggleOptions;
use crate::error::TableError;
use crate::storage::{OpenMode, Storage};
use crate::table::TableReader;

/// Resolved entry and its current payload byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    pub offset: u64,
    pub value:  u8,
}

impl Snapshot {
    pub fn ratio(&self) -> AspectRatio { AspectRatio::from_byte(self.value) }
}

/// Result of a completed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub offset:   u64,
    pub previous: u8,
    pub written:  u8,
}

impl ToggleOutcome {
    pub fn previous_ratio(&self) -> AspectRatio { AspectRatio::from_byte(self.previous) }
    pub fn ratio(&self) -> AspectRatio { AspectRatio::from_byte(self.written) }
}

pub struct Toggler<S> {
    storage: S,
    options: ToggleOptions,
}

impl<S: Storage> Toggler<S> {
    pub fn new(storage: S, options: ToggleOptions) -> Self {
        Self { storage, options }
    }

    pub fn options(&self) -> &ToggleOptions { &self.options }

    pub fn storage(&self) -> &S { &self.storage }

    fn open(&self, mode: OpenMode) -> Result<TableReader<S::Handle>, TableError> {
        let handle = self.storage.open(&self.options.path, mode).map_err(|source| {
            TableError::Open { path: self.options.path.clone(), mode, source }
        })?;
        Ok(TableReader::with_byte_order(handle, self.options.byte_order))
    }

    /// Resolve the entry and read its payload without writing.
    pub fn current(&self) -> Result<Snapshot, TableError> {
        let mut reader = self.open(OpenMode::Read)?;
        let offset = reader.resolve_offset(self.options.key_bytes())?;
        let value = reader.read_payload_byte(offset)?;
        Ok(Snapshot { offset, value })
    }

    /// Flip the payload between 0 and 1.
    pub fn toggle(&self) -> Result<ToggleOutcome, TableError> {
        self.mutate(toggle_byte)
    }

    /// Write `ratio` regardless of the current value.
    pub fn set(&self, ratio: AspectRatio) -> Result<ToggleOutcome, TableError> {
        self.mutate(|_| ratio.as_byte())
    }

    fn mutate<F: FnOnce(u8) -> u8>(&self, next: F) -> Result<ToggleOutcome, TableError> {
        let key = self.options.key_bytes();

        let (offset, previous, written) = if self.options.reopen_for_write {
            let Snapshot { offset, value } = self.current()?;
            let written = next(value);
            self.open(OpenMode::ReadWrite)?.write_payload_byte(offset, written)?;
            (offset, value, written)
        } else {
            let mut rw = self.open(OpenMode::ReadWrite)?;
            let offset = rw.resolve_offset(key)?;
            let value = rw.read_payload_byte(offset)?;
            let written = next(value);
            rw.write_payload_byte(offset, written)?;
            (offset, value, written)
        };

        if previous > 1 {
            warn!(offset, previous, "unexpected payload value before write");
        }
        info!(
            path = %self.options.path.display(),
            key = %self.options.key,
            offset,
            previous,
            written,
            "payload written"
        );
        Ok(ToggleOutcome { offset, previous, written })
    }
}
