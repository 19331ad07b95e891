//! Configuration store.
//!
//! The pipeline only reads a handful of flat keys (mirroring, gamma, video
//! enable) and writes back the mirror flags when they are toggled, so the
//! store is a simple key/value map persisted as JSON.

use crate::logging::{log, LogCategory, LogLevel};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Configuration keys used by the pipeline.
pub mod keys {
    /// Enable mode: "on", "off" or "auto"
    pub const ENABLE: &str = "RealDMD";
    pub const MIRROR_HORZ: &str = "RealDMD.MirrorHorz";
    pub const MIRROR_VERT: &str = "RealDMD.MirrorVert";
    pub const GRAYSCALE_GAMMA: &str = "RealDMD.GrayscaleGamma";
    pub const ENABLE_VIDEOS: &str = "RealDMD.EnableVideos";
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Key/value settings consumed by the pipeline.
///
/// Implementations must be usable from the UI thread and the writer's
/// producers concurrently.
pub trait ConfigStore: Send + Sync {
    fn get_bool(&self, key: &str, default: bool) -> bool;
    fn set_bool(&self, key: &str, value: bool);
    fn get_f32(&self, key: &str, default: f32) -> f32;
    fn get_str(&self, key: &str) -> Option<String>;
}

/// Whether the subsystem is switched on at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableMode {
    On,
    Off,
    Auto,
}

impl EnableMode {
    pub fn from_config(store: &dyn ConfigStore) -> Self {
        match store.get_str(keys::ENABLE) {
            Some(v) => Self::parse(&v),
            None => EnableMode::Auto,
        }
    }

    /// Accepts the spellings users put in hand-edited config files.
    pub fn parse(value: &str) -> Self {
        let v = value.trim().to_ascii_lowercase();
        match v.as_str() {
            "on" | "enabled" | "true" => EnableMode::On,
            "off" | "disabled" | "false" => EnableMode::Off,
            _ => match v.parse::<i64>() {
                Ok(0) => EnableMode::Off,
                Ok(_) => EnableMode::On,
                Err(_) => EnableMode::Auto,
            },
        }
    }
}

fn value_as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|n| n != 0),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn value_as_f32(value: &Value) -> Option<f32> {
    match value {
        Value::Number(n) => n.as_f64().map(|f| f as f32),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn lock(values: &Mutex<Map<String, Value>>) -> MutexGuard<'_, Map<String, Value>> {
    values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// In-memory store, used by tests and by hosts that manage persistence
/// themselves.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    values: Mutex<Map<String, Value>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(self, key: &str, value: Value) -> Self {
        lock(&self.values).insert(key.to_string(), value);
        self
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        lock(&self.values)
            .get(key)
            .and_then(value_as_bool)
            .unwrap_or(default)
    }

    fn set_bool(&self, key: &str, value: bool) {
        lock(&self.values).insert(key.to_string(), Value::Bool(value));
    }

    fn get_f32(&self, key: &str, default: f32) -> f32 {
        lock(&self.values)
            .get(key)
            .and_then(value_as_f32)
            .unwrap_or(default)
    }

    fn get_str(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).and_then(value_as_string)
    }
}

/// JSON file store. Every `set_*` is written through immediately.
#[derive(Debug)]
pub struct JsonConfigStore {
    path: PathBuf,
    values: Mutex<Map<String, Value>>,
}

impl JsonConfigStore {
    /// Default location: `dmd_config.json` next to the executable
    pub fn default_path() -> PathBuf {
        let mut path = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."));
        path.push("dmd_config.json");
        path
    }

    /// Load settings from `path`, falling back to an empty store when the
    /// file is missing or unreadable.
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let values = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Map<String, Value>>(&contents) {
                Ok(map) => map,
                Err(e) => {
                    log(LogCategory::Device, LogLevel::Warn, || {
                        format!(
                            "failed to parse {}: {}; using defaults",
                            path.display(),
                            e
                        )
                    });
                    Map::new()
                }
            },
            Err(_) => Map::new(),
        };
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let contents = serde_json::to_string_pretty(&*lock(&self.values))?;
        fs::write(&self.path, contents)?;
        Ok(())
    }

    fn save_or_warn(&self) {
        if let Err(e) = self.save() {
            log(LogCategory::Device, LogLevel::Warn, || {
                format!("failed to save {}: {}", self.path.display(), e)
            });
        }
    }
}

impl ConfigStore for JsonConfigStore {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        lock(&self.values)
            .get(key)
            .and_then(value_as_bool)
            .unwrap_or(default)
    }

    fn set_bool(&self, key: &str, value: bool) {
        lock(&self.values).insert(key.to_string(), Value::Bool(value));
        self.save_or_warn();
    }

    fn get_f32(&self, key: &str, default: f32) -> f32 {
        lock(&self.values)
            .get(key)
            .and_then(value_as_f32)
            .unwrap_or(default)
    }

    fn get_str(&self, key: &str) -> Option<String> {
        lock(&self.values).get(key).and_then(value_as_string)
    }
}
