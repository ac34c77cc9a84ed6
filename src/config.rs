//! Loader configuration (§6.4) and node-capacity arithmetic (§4.1).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default block size, in bytes, for both internal and leaf blocks.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;
/// Default per-posting trajectory-id capacity (λ).
pub const DEFAULT_LAMBDA: usize = 40;

/// `max_internal_entries = floor((block_size - 12) / sizeof(internal_entry))`,
/// `sizeof(internal_entry) = 32` (24-byte mbb + 8-byte child handle).
pub fn max_internal_entries(block_size: usize) -> usize {
    (block_size.saturating_sub(12)) / 32
}

/// `max_leaf_entries = floor((block_size - 4) / sizeof(leaf_entry))`,
/// `sizeof(leaf_entry) = 40`.
pub fn max_leaf_entries(block_size: usize) -> usize {
    (block_size.saturating_sub(4)) / 40
}

/// One of the five bulk-load strategies of §6.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Algorithm {
    /// Comparator order `(label, x, y, t)`.
    Str,
    /// Comparator order `(x, y, t, label)`.
    Str2,
    Hilbert,
    Quickload,
    /// One-by-one reference oracle (§4.10), not a bulk loader proper.
    Obo,
}

/// Configuration shared by every loader; not every field applies to every
/// `algorithm` (table in §6.4 lists the effective subset per loader).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    pub algorithm: Algorithm,
    /// Spatial-vs-textual cost weight, quickload and obo only.
    pub beta: f64,
    /// Upper bound on external-sort memory, str/str2/hilbert only.
    pub memory_mb: usize,
    /// Resident leaf cap, quickload only.
    pub max_leaves: usize,
    /// Maximum number of input entries to consume; `None` means all.
    pub limit: Option<u64>,
    pub block_size: usize,
    pub lambda: usize,
}

impl Default for LoaderConfig {
    fn default() -> LoaderConfig {
        LoaderConfig {
            algorithm: Algorithm::Str,
            beta: 0.5,
            memory_mb: 64,
            max_leaves: 64,
            limit: None,
            block_size: DEFAULT_BLOCK_SIZE,
            lambda: DEFAULT_LAMBDA,
        }
    }
}

impl LoaderConfig {
    pub fn new(algorithm: Algorithm) -> LoaderConfig {
        LoaderConfig {
            algorithm,
            ..Default::default()
        }
    }

    pub fn set_beta(mut self, beta: f64) -> LoaderConfig {
        self.beta = beta;
        self
    }

    pub fn set_memory_mb(mut self, memory_mb: usize) -> LoaderConfig {
        self.memory_mb = memory_mb;
        self
    }

    pub fn set_max_leaves(mut self, max_leaves: usize) -> LoaderConfig {
        self.max_leaves = max_leaves;
        self
    }

    pub fn set_limit(mut self, limit: Option<u64>) -> LoaderConfig {
        self.limit = limit;
        self
    }

    pub fn set_block_size(mut self, block_size: usize) -> LoaderConfig {
        self.block_size = block_size;
        self
    }

    pub fn set_lambda(mut self, lambda: usize) -> LoaderConfig {
        self.lambda = lambda;
        self
    }

    pub fn leaf_fanout(&self) -> usize {
        max_leaf_entries(self.block_size)
    }

    pub fn internal_fanout(&self) -> usize {
        max_internal_entries(self.block_size)
    }

    pub fn memory_bound_bytes(&self) -> usize {
        self.memory_mb * 1024 * 1024
    }

    /// Raises `PreconditionFailed` for the constraints §7 calls out by name.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.beta) {
            return Err(Error::PreconditionFailed(format!(
                "beta must be in [0, 1], got {}",
                self.beta
            )));
        }
        if self.block_size == 0 {
            return Err(Error::PreconditionFailed("block_size must be > 0".into()));
        }
        if self.lambda == 0 {
            return Err(Error::PreconditionFailed("lambda must be > 0".into()));
        }
        if self.leaf_fanout() < 1 || self.internal_fanout() < 1 {
            return Err(Error::PreconditionFailed(
                "block_size too small to hold a single entry".into(),
            ));
        }
        if matches!(self.algorithm, Algorithm::Quickload | Algorithm::Obo) && self.max_leaves == 0
        {
            return Err(Error::PreconditionFailed(
                "max_leaves must be > 0 for quickload/obo".into(),
            ));
        }
        Ok(())
    }

    /// Parse a recipe previously written with [`LoaderConfig::to_toml`].
    pub fn from_toml(text: &str) -> Result<LoaderConfig> {
        toml::from_str(text)
            .map_err(|err| Error::ParseError { offset: 0, message: err.to_string() })
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|err| Error::Logic(format!("config is not toml-serialisable: {}", err)))
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;
