//! Addressable `section.key` settings for get/set from the command line.

use std::fmt;
use std::str::FromStr;

use super::file::{
    ConfigFile, ConfigFileError, LOD_SECTION, LOGGING_SECTION, QUALITY_SECTION, SCHEDULER_SECTION,
};

const KEYS: &[(&str, &str)] = &[
    (SCHEDULER_SECTION, "attempt_timeout_ms"),
    (SCHEDULER_SECTION, "worker_count"),
    (SCHEDULER_SECTION, "native_threads"),
    (SCHEDULER_SECTION, "metrics_capacity"),
    (SCHEDULER_SECTION, "enable_gpu"),
    (SCHEDULER_SECTION, "gpu_high_priority_threshold"),
    (SCHEDULER_SECTION, "native_high_priority_threshold"),
    (SCHEDULER_SECTION, "large_threshold"),
    (SCHEDULER_SECTION, "medium_threshold"),
    (SCHEDULER_SECTION, "small_threshold"),
    (QUALITY_SECTION, "target_fps"),
    (QUALITY_SECTION, "sample_window"),
    (QUALITY_SECTION, "tick_interval_ms"),
    (LOD_SECTION, "thresholds"),
    (LOD_SECTION, "polygon_counts"),
    (LOD_SECTION, "texture_sizes"),
    (LOD_SECTION, "compression"),
    (LOD_SECTION, "update_interval_ms"),
    (LOD_SECTION, "min_interval_ms"),
    (LOD_SECTION, "max_interval_ms"),
    (LOGGING_SECTION, "filter"),
    (LOGGING_SECTION, "directory"),
    (LOGGING_SECTION, "chrome_trace"),
];

/// One known configuration key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigKey {
    section: &'static str,
    key: &'static str,
}

impl ConfigKey {
    /// Every key, in file order.
    pub fn all() -> impl Iterator<Item = ConfigKey> {
        KEYS.iter().map(|&(section, key)| ConfigKey { section, key })
    }

    pub fn section(&self) -> &'static str {
        self.section
    }

    pub fn key_name(&self) -> &'static str {
        self.key
    }

    /// `section.key`
    pub fn name(&self) -> String {
        format!("{}.{}", self.section, self.key)
    }

    /// Current value as written to the file. Empty when unset.
    pub fn get(&self, config: &ConfigFile) -> String {
        config
            .to_ini()
            .get_from(Some(self.section), self.key)
            .unwrap_or_default()
            .to_string()
    }

    /// Replace one value, re-validating the whole file.
    ///
    /// `config` is left untouched on error.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigFileError> {
        let mut ini = config.to_ini();
        ini.with_section(Some(self.section)).set(self.key, value.trim());
        *config = ConfigFile::from_ini(&ini)?;
        Ok(())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (section, key) = s
            .split_once('.')
            .ok_or_else(|| ConfigFileError::UnknownKey(s.to_string()))?;
        ConfigKey::all()
            .find(|k| k.section == section && k.key == key)
            .ok_or_else(|| ConfigFileError::UnknownKey(s.to_string()))
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section, self.key)
    }
}
