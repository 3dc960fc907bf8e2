//! Configuration file support.
//!
//! Settings live in an INI file at [`config_file_path`]:
//!
//! ```ini
//! [scheduler]
//! attempt_timeout_ms = 5000
//! worker_count = 0
//!
//! [quality]
//! target_fps = 60
//!
//! [lod]
//! thresholds = 50,100,200,400
//!
//! [logging]
//! filter = info
//! ```

mod file;
mod keys;

pub use file::{
    config_file_path, ConfigFile, ConfigFileError, LOD_SECTION, LOGGING_SECTION, QUALITY_SECTION,
    SCHEDULER_SECTION,
};
pub use keys::ConfigKey;
