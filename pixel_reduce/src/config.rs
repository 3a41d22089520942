//! Pipeline configuration.
//!
//! A single `PipelineConfig` covers map granularity, the reduce strategy, the
//! worker pool and the scratch memory cap. The extraction and combining
//! functions are per-run arguments and are not part of the config.

use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default number of values folded sequentially by one tree-reduce leaf.
pub const DEFAULT_LEAF_LEN: usize = 4096;

/// How the map stage partitions samples into batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchSize {
    /// Derived from the sample count and the worker count.
    #[default]
    Auto,
    /// At most this many samples per batch.
    Fixed(NonZeroUsize),
}

impl BatchSize {
    /// Fixed batch size. Returns `InvalidConfig` for 0.
    pub fn fixed(size: usize) -> Result<Self> {
        NonZeroUsize::new(size)
            .map(Self::Fixed)
            .ok_or_else(|| Error::InvalidConfig("Batch size must be at least 1".to_string()))
    }

    /// Concrete batch size for `len` samples. Always at least 1.
    pub fn resolve(self, len: usize) -> usize {
        match self {
            BatchSize::Auto => common::parallel::auto_batch_size(len),
            BatchSize::Fixed(size) => size.get(),
        }
    }
}

/// How the reduce stage folds the intermediate buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReduceStrategy {
    /// Left fold from the identity over `[0, N)`.
    Sequential,
    /// Parallel fold of leaves of up to `leaf_len` values, merged pairwise.
    Tree { leaf_len: usize },
}

impl Default for ReduceStrategy {
    fn default() -> Self {
        Self::Tree {
            leaf_len: DEFAULT_LEAF_LEN,
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Map stage batch granularity.
    pub batch_size: BatchSize,
    /// Reduce stage strategy.
    pub reduce: ReduceStrategy,
    /// Dedicated worker thread count. `None` uses the global rayon pool.
    pub threads: Option<usize>,
    /// Upper bound on intermediate buffer size in bytes.
    pub scratch_budget: Option<usize>,
}

impl PipelineConfig {
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: BatchSize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_reduce(mut self, reduce: ReduceStrategy) -> Self {
        self.reduce = reduce;
        self
    }

    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    #[must_use]
    pub fn with_scratch_budget(mut self, bytes: usize) -> Self {
        self.scratch_budget = Some(bytes);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let ReduceStrategy::Tree { leaf_len } = self.reduce
            && leaf_len == 0
        {
            return Err(Error::InvalidConfig(
                "Tree reduce leaf length must be at least 1".to_string(),
            ));
        }
        if self.threads == Some(0) {
            return Err(Error::InvalidConfig(
                "Thread count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
