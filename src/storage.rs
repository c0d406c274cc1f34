//! Storage collaborator: opens the blob and hands back a seekable handle.
//!
//! Handles are released by `Drop`.  Callers keep each handle inside the scope
//! of one resolve-and-mutate cycle so that every exit path, including `?`
//! returns, closes it; the console's filesystem allows only a few open
//! descriptors at a time.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    ReadWrite,
}

pub trait Storage {
    type Handle: Read + Write + Seek;

    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<Self::Handle>;
}

/// Plain filesystem access through `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl Storage for FsStorage {
    type Handle = File;

    fn open(&self, path: &Path, mode: OpenMode) -> io::Result<File> {
        match mode {
            OpenMode::Read      => File::open(path),
            OpenMode::ReadWrite => OpenOptions::new().read(true).write(true).open(path),
        }
    }
}
