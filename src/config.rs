//! Harness configuration
//!
//! Every field has a default reproducing the standard scenario: load
//! `./math.wasm`, call `add(11, 22)`. A JSON file may override any subset of
//! fields, and command-line flags override the file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::runtime::ExecutionLimits;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HarnessConfig {
    /// Module to load
    pub module: PathBuf,
    /// Name of the exported function to call
    pub export: String,
    /// Arguments as text, parsed against the export's parameter types
    pub args: Vec<String>,
    pub max_call_depth: u32,
    /// Instruction budget per call; unlimited when absent
    pub fuel: Option<u64>,
    pub max_memory_pages: u32,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        let limits = ExecutionLimits::default();
        HarnessConfig {
            module: PathBuf::from("./math.wasm"),
            export: "add".to_string(),
            args: vec!["11".to_string(), "22".to_string()],
            max_call_depth: limits.max_call_depth,
            fuel: limits.fuel,
            max_memory_pages: limits.max_memory_pages,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Settings given on the command line. `None` (or no args) keeps the value
/// already configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub module: Option<PathBuf>,
    pub export: Option<String>,
    pub args: Vec<String>,
    pub fuel: Option<u64>,
    pub max_call_depth: Option<u32>,
    pub max_memory_pages: Option<u32>,
}

impl HarnessConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(module) = overrides.module {
            self.module = module;
        }
        if let Some(export) = overrides.export {
            self.export = export;
        }
        if !overrides.args.is_empty() {
            self.args = overrides.args;
        }
        if overrides.fuel.is_some() {
            self.fuel = overrides.fuel;
        }
        if let Some(depth) = overrides.max_call_depth {
            self.max_call_depth = depth;
        }
        if let Some(pages) = overrides.max_memory_pages {
            self.max_memory_pages = pages;
        }
        self
    }

    pub fn limits(&self) -> ExecutionLimits {
        ExecutionLimits {
            max_call_depth: self.max_call_depth,
            fuel: self.fuel,
            max_memory_pages: self.max_memory_pages,
        }
    }
}
