pub mod table;
pub mod error;
pub mod aspect;
pub mod storage;
pub mod config;
pub mod toggle;
pub mod shell;
pub mod logging;

pub use table::{TableReader, TableEntry, ByteOrder, ASPECT_RATIO_KEY};
pub use error::TableError;
pub use aspect::{AspectRatio, toggle_byte};
pub use storage::{Storage, FsStorage, OpenMode};
pub use config::{ToggleOptions, ConfigError};
pub use toggle::{Toggler, ToggleOutcome, Snapshot};
