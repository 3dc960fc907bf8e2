//! INI configuration file.
//!
//! Every key is optional; a missing or empty key takes its default. Values
//! that are present but malformed are errors.

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::compute::{SchedulerConfig, SelectionThresholds};
use crate::lod::{LodConfig, LodConfigError};
use crate::logging::LoggingConfig;
use crate::quality::{QualityConfig, QualityConfigError};

pub const SCHEDULER_SECTION: &str = "scheduler";
pub const QUALITY_SECTION: &str = "quality";
pub const LOD_SECTION: &str = "lod";
pub const LOGGING_SECTION: &str = "logging";

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write config file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid value '{value}' for {section}.{key}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("unknown configuration key '{0}'")]
    UnknownKey(String),

    #[error("invalid [lod] section: {0}")]
    Lod(#[from] LodConfigError),

    #[error("invalid [quality] section: {0}")]
    Quality(#[from] QualityConfigError),
}

/// Default config file location: `<config dir>/frameforge/config.ini`.
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("frameforge")
        .join("config.ini")
}

/// All settings that can live in `config.ini`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConfigFile {
    pub scheduler: SchedulerConfig,
    pub quality: QualityConfig,
    pub lod: LodConfig,
    pub logging: LoggingConfig,
}

impl ConfigFile {
    /// Load from the default path. A missing file yields defaults.
    pub fn load() -> Result<Self, ConfigFileError> {
        let path = config_file_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_file(path).map_err(|e| match e {
            ini::Error::Io(source) => ConfigFileError::Read {
                path: path.to_path_buf(),
                source,
            },
            ini::Error::Parse(e) => {
                ConfigFileError::Parse(format!("{}: {}", path.display(), e))
            }
        })?;
        Self::from_ini(&ini)
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigFileError> {
        let ini = Ini::load_from_str(contents).map_err(|e| ConfigFileError::Parse(e.to_string()))?;
        Self::from_ini(&ini)
    }

    /// Write to the default path, creating its directory.
    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        let write_err = |source| ConfigFileError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(write_err)?;
            }
        }
        self.to_ini().write_to_file(path).map_err(write_err)
    }

    pub fn from_ini(ini: &Ini) -> Result<Self, ConfigFileError> {
        Ok(Self {
            scheduler: read_scheduler(ini)?,
            quality: read_quality(ini)?,
            lod: read_lod(ini)?,
            logging: read_logging(ini),
        })
    }

    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();

        let s = &self.scheduler;
        ini.with_section(Some(SCHEDULER_SECTION))
            .set("attempt_timeout_ms", s.attempt_timeout.as_millis().to_string())
            .set("worker_count", s.worker_count.to_string())
            .set("native_threads", s.native_threads.to_string())
            .set("metrics_capacity", s.metrics_capacity.to_string())
            .set("enable_gpu", s.enable_gpu.to_string())
            .set(
                "gpu_high_priority_threshold",
                s.thresholds.gpu_high_priority.to_string(),
            )
            .set(
                "native_high_priority_threshold",
                s.thresholds.native_high_priority.to_string(),
            )
            .set("large_threshold", s.thresholds.large.to_string())
            .set("medium_threshold", s.thresholds.medium.to_string())
            .set("small_threshold", s.thresholds.small.to_string());

        let q = &self.quality;
        ini.with_section(Some(QUALITY_SECTION))
            .set("target_fps", q.target_fps.to_string())
            .set("sample_window", q.sample_window.to_string())
            .set("tick_interval_ms", q.tick_interval.as_millis().to_string());

        let lod = &self.lod;
        let hints = lod.hints();
        ini.with_section(Some(LOD_SECTION))
            .set("thresholds", join(lod.thresholds().iter()))
            .set("polygon_counts", join(hints.iter().map(|h| h.polygon_count)))
            .set("texture_sizes", join(hints.iter().map(|h| h.texture_size)))
            .set("compression", join(hints.iter().map(|h| h.compression)))
            .set("update_interval_ms", lod.update_interval().as_millis().to_string())
            .set("min_interval_ms", lod.min_interval().as_millis().to_string())
            .set("max_interval_ms", lod.max_interval().as_millis().to_string());

        let l = &self.logging;
        ini.with_section(Some(LOGGING_SECTION))
            .set("filter", l.filter.clone())
            .set("directory", path_value(&l.directory))
            .set("chrome_trace", path_value(&l.chrome_trace));

        ini
    }
}

// =============================================================================
// Section readers
// =============================================================================

fn read_scheduler(ini: &Ini) -> Result<SchedulerConfig, ConfigFileError> {
    let d = SchedulerConfig::default();
    let section = SCHEDULER_SECTION;

    let attempt_timeout = read_millis(ini, section, "attempt_timeout_ms", d.attempt_timeout)?;
    if attempt_timeout.is_zero() {
        return Err(invalid(section, "attempt_timeout_ms", "0", "must be greater than zero"));
    }
    let metrics_capacity = read(ini, section, "metrics_capacity", d.metrics_capacity)?;
    if metrics_capacity == 0 {
        return Err(invalid(section, "metrics_capacity", "0", "must be greater than zero"));
    }

    let t = d.thresholds;
    let thresholds = SelectionThresholds {
        gpu_high_priority: read(ini, section, "gpu_high_priority_threshold", t.gpu_high_priority)?,
        native_high_priority: read(
            ini,
            section,
            "native_high_priority_threshold",
            t.native_high_priority,
        )?,
        large: read(ini, section, "large_threshold", t.large)?,
        medium: read(ini, section, "medium_threshold", t.medium)?,
        small: read(ini, section, "small_threshold", t.small)?,
    };

    Ok(SchedulerConfig {
        attempt_timeout,
        metrics_capacity,
        thresholds,
        native_threads: read(ini, section, "native_threads", d.native_threads)?,
        worker_count: read(ini, section, "worker_count", d.worker_count)?,
        enable_gpu: read(ini, section, "enable_gpu", d.enable_gpu)?,
    })
}

fn read_quality(ini: &Ini) -> Result<QualityConfig, ConfigFileError> {
    let d = QualityConfig::default();
    let section = QUALITY_SECTION;

    let config = QualityConfig {
        target_fps: read(ini, section, "target_fps", d.target_fps)?,
        sample_window: read(ini, section, "sample_window", d.sample_window)?,
        tick_interval: read_millis(ini, section, "tick_interval_ms", d.tick_interval)?,
        ..d
    };
    config.validate()?;
    Ok(config)
}

fn read_lod(ini: &Ini) -> Result<LodConfig, ConfigFileError> {
    let d = LodConfig::default();
    let section = LOD_SECTION;

    let thresholds = read_list(ini, section, "thresholds", d.thresholds().to_vec())?;
    // Hints not given explicitly follow the threshold count
    let base = LodConfig::from_thresholds(thresholds.clone())?;
    let hints = base.hints();

    let polygons = read_list(
        ini,
        section,
        "polygon_counts",
        hints.iter().map(|h| h.polygon_count).collect(),
    )?;
    let textures = read_list(
        ini,
        section,
        "texture_sizes",
        hints.iter().map(|h| h.texture_size).collect(),
    )?;
    let compression = read_list(
        ini,
        section,
        "compression",
        hints.iter().map(|h| h.compression).collect(),
    )?;

    let config = LodConfig::new(thresholds, &polygons, &textures, &compression)?.with_intervals(
        read_millis(ini, section, "update_interval_ms", d.update_interval())?,
        read_millis(ini, section, "min_interval_ms", d.min_interval())?,
        read_millis(ini, section, "max_interval_ms", d.max_interval())?,
    )?;
    Ok(config)
}

fn read_logging(ini: &Ini) -> LoggingConfig {
    let d = LoggingConfig::default();
    LoggingConfig {
        filter: value(ini, LOGGING_SECTION, "filter")
            .map(str::to_string)
            .unwrap_or(d.filter),
        directory: value(ini, LOGGING_SECTION, "directory").map(PathBuf::from),
        chrome_trace: value(ini, LOGGING_SECTION, "chrome_trace").map(PathBuf::from),
    }
}

// =============================================================================
// Value helpers
// =============================================================================

/// A non-empty trimmed value.
fn value<'a>(ini: &'a Ini, section: &str, key: &str) -> Option<&'a str> {
    ini.get_from(Some(section), key)
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn read<T>(ini: &Ini, section: &str, key: &str, default: T) -> Result<T, ConfigFileError>
where
    T: FromStr,
    T::Err: Display,
{
    match value(ini, section, key) {
        Some(raw) => raw
            .parse()
            .map_err(|e: T::Err| invalid(section, key, raw, e.to_string())),
        None => Ok(default),
    }
}

fn read_millis(
    ini: &Ini,
    section: &str,
    key: &str,
    default: Duration,
) -> Result<Duration, ConfigFileError> {
    let ms = read(ini, section, key, default.as_millis() as u64)?;
    Ok(Duration::from_millis(ms))
}

fn read_list<T>(ini: &Ini, section: &str, key: &str, default: Vec<T>) -> Result<Vec<T>, ConfigFileError>
where
    T: FromStr,
    T::Err: Display,
{
    let Some(raw) = value(ini, section, key) else {
        return Ok(default);
    };
    raw.split(',')
        .map(|item| {
            item.trim()
                .parse()
                .map_err(|e: T::Err| invalid(section, key, raw, e.to_string()))
        })
        .collect()
}

fn invalid(section: &str, key: &str, value: &str, reason: impl Into<String>) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn join<T: Display>(items: impl Iterator<Item = T>) -> String {
    items.map(|i| i.to_string()).collect::<Vec<_>>().join(",")
}

fn path_value(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}
