//! Pixel Reduce - parallel map-reduce over pixel sample buffers.
//!
//! A run projects every sample to one scalar in parallel batches (the map
//! stage), waits for every batch, then folds the scalars into one aggregate
//! (the reduce stage) and reports how long it took.
//!
//! # Quick Start
//!
//! ```rust
//! use pixel_reduce::{Channel, Pipeline, PipelineConfig, Sample, SampleBuffer};
//!
//! let pixels = vec![Sample::new(200, 10, 20, 255); 1024];
//! let pipeline = Pipeline::new(PipelineConfig::default())?;
//! let metrics = pipeline.sum_channel(SampleBuffer::new(&pixels), Channel::Red)?;
//!
//! assert_eq!(metrics.aggregate, 200 * 1024);
//! println!("{metrics}");
//! # Ok::<(), pixel_reduce::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod map;
pub mod metrics;
pub mod pipeline;
pub mod reduce;
pub mod sample;

// ============================================================================
// Core types
// ============================================================================

pub use error::{Error, Result};
pub use sample::{Channel, Sample, SampleBuffer};

// ============================================================================
// Configuration
// ============================================================================

pub use config::{BatchSize, DEFAULT_LEAF_LEN, PipelineConfig, ReduceStrategy};

// ============================================================================
// Stages
// ============================================================================

pub use map::{Batch, BatchObserver, BatchPlan, NoopObserver};
pub use reduce::{FnReducer, Max, Reducer, Sum};

// ============================================================================
// Pipeline
// ============================================================================

pub use metrics::RunMetrics;
pub use pipeline::{Pipeline, RunPhase, run};
