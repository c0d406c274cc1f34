//! Options for one toggle cycle, loadable from a JSON file.
//!
//! ```json
//! { "path": "/shared2/sys/SYSCONF", "key": "IPL.AR", "byte_order": "big" }
//! ```
//!
//! Missing fields take their defaults; CLI flags are applied on top.

use std::path::{Path, PathBuf};
use std::{fs, io};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::table::{ByteOrder, ASPECT_RATIO_KEY};

/// Location of the system configuration blob on the console's NAND.
pub const DEFAULT_SYSCONF_PATH: &str = "/shared2/sys/SYSCONF";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid options file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Entry key must not be empty")]
    EmptyKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToggleOptions {
    pub path:             PathBuf,
    pub key:              String,
    pub byte_order:       ByteOrder,
    /// Close the read handle and open a fresh read-write one for the write
    /// phase instead of holding one read-write handle for the whole cycle.
    pub reopen_for_write: bool,
}

impl Default for ToggleOptions {
    fn default() -> Self {
        Self {
            path:             PathBuf::from(DEFAULT_SYSCONF_PATH),
            key:              String::from_utf8_lossy(ASPECT_RATIO_KEY).into_owned(),
            byte_order:       ByteOrder::Big,
            reopen_for_write: false,
        }
    }
}

impl ToggleOptions {
    pub fn from_json(bytes: &[u8]) -> Result<Self, ConfigError> {
        let opts: Self = serde_json::from_slice(bytes)?;
        opts.validate()?;
        Ok(opts)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::from_json(&fs::read(path)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key.is_empty() {
            return Err(ConfigError::EmptyKey);
        }
        Ok(())
    }

    pub fn key_bytes(&self) -> &[u8] {
        self.key.as_bytes()
    }
}
