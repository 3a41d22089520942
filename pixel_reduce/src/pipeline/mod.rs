//! Map-then-reduce orchestration.
//!
//! A run allocates the intermediate buffer, maps every sample into it in
//! parallel batches, waits for all batches, folds the buffer into one
//! aggregate and releases the buffer. `map::map_into` returning is the
//! completion barrier: rayon only finishes the batch reduction once every batch
//! has run, and its joins establish the happens-before edge that makes the
//! writes visible to the reducing thread.

mod scratch;
mod state;


use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crate::config::{BatchSize, PipelineConfig};
use crate::error::{Error, Result};
use crate::map::{self, BatchObserver, BatchPlan, NoopObserver};
use crate::metrics::RunMetrics;
use crate::reduce::{self, Reducer, Sum};
use crate::sample::{Channel, Sample, SampleBuffer};

use scratch::ScratchBuffer;
use state::RunState;

pub use state::RunPhase;

/// Reusable map-reduce runner.
pub struct Pipeline {
    config: PipelineConfig,
    pool: Option<rayon::ThreadPool>,
    live_scratch: AtomicUsize,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;

        let pool = config
            .threads
            .map(|threads| {
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("pixel-reduce-{i}"))
                    .build()
            })
            .transpose()?;

        tracing::debug!(
            batch_size = ?config.batch_size,
            reduce = ?config.reduce,
            threads = ?config.threads,
            scratch_budget = ?config.scratch_budget,
            "Created pipeline"
        );

        Ok(Self {
            config,
            pool,
            live_scratch: AtomicUsize::new(0),
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Number of intermediate buffers currently held by runs of this pipeline.
    pub fn live_scratch_buffers(&self) -> usize {
        self.live_scratch.load(Ordering::SeqCst)
    }

    /// Map `extract` over `buffer` and fold the results with `reducer`.
    pub fn run<S, F, R>(
        &self,
        buffer: SampleBuffer<'_>,
        extract: F,
        reducer: &R,
    ) -> Result<RunMetrics<R::Output>>
    where
        S: Copy + Default + Send + Sync,
        F: Fn(&Sample) -> S + Sync,
        R: Reducer<S>,
    {
        self.run_observed(buffer, extract, reducer, &NoopObserver)
    }

    /// [`Pipeline::run`] with an observer notified around every map batch.
    pub fn run_observed<S, F, R, O>(
        &self,
        buffer: SampleBuffer<'_>,
        extract: F,
        reducer: &R,
        observer: &O,
    ) -> Result<RunMetrics<R::Output>>
    where
        S: Copy + Default + Send + Sync,
        F: Fn(&Sample) -> S + Sync,
        R: Reducer<S>,
        O: BatchObserver + ?Sized,
    {
        let extract = &extract;
        match &self.pool {
            Some(pool) => pool.install(|| self.execute(buffer, extract, reducer, observer)),
            None => self.execute(buffer, extract, reducer, observer),
        }
    }

    /// Sum one channel over every sample, accumulating in `u64`.
    pub fn sum_channel(
        &self,
        buffer: SampleBuffer<'_>,
        channel: Channel,
    ) -> Result<RunMetrics<u64>> {
        self.run(buffer, move |s| u32::from(s.channel(channel)), &Sum)
    }

    fn execute<S, F, R, O>(
        &self,
        buffer: SampleBuffer<'_>,
        extract: &F,
        reducer: &R,
        observer: &O,
    ) -> Result<RunMetrics<R::Output>>
    where
        S: Copy + Default + Send + Sync,
        F: Fn(&Sample) -> S + Sync,
        R: Reducer<S>,
        O: BatchObserver + ?Sized,
    {
        let len = buffer.len();
        // Resolved inside the pool so `Auto` sees the pool's worker count.
        let plan = BatchPlan::new(len, self.config.batch_size.resolve(len));
        let mut state = RunState::new();

        if len == 0 {
            tracing::trace!("Empty sample buffer, skipping map stage");
            state.advance(RunPhase::Finalized)?;
            return Ok(RunMetrics {
                elapsed: Default::default(),
                map_elapsed: Default::default(),
                reduce_elapsed: Default::default(),
                sample_count: 0,
                batch_size: plan.batch_size,
                batch_count: 0,
                aggregate: reducer.identity(),
            });
        }

        let mut scratch =
            ScratchBuffer::<S>::acquire(len, self.config.scratch_budget, &self.live_scratch)?;

        let start = Instant::now();
        state.advance(RunPhase::MapScheduled)?;
        map::map_into(buffer, &mut scratch, extract, plan.batch_size, observer)?;
        state.advance(RunPhase::MapComplete)?;
        let map_elapsed = start.elapsed();

        state.advance(RunPhase::ReduceScheduled)?;
        let values: &[S] = &scratch;
        if values.len() != len {
            return Err(Error::InvariantViolation(format!(
                "Reduce stage observed {} scalars for {} samples",
                values.len(),
                len
            )));
        }
        let aggregate = reduce::reduce(values, reducer, self.config.reduce);
        state.advance(RunPhase::ReduceComplete)?;
        let elapsed = start.elapsed();

        drop(scratch);
        state.advance(RunPhase::Finalized)?;
        debug_assert_eq!(state.phase(), RunPhase::Finalized);

        let metrics = RunMetrics {
            elapsed,
            map_elapsed,
            reduce_elapsed: elapsed.saturating_sub(map_elapsed),
            sample_count: len,
            batch_size: plan.batch_size,
            batch_count: plan.batch_count,
            aggregate,
        };

        tracing::debug!(
            sample_count = metrics.sample_count,
            batch_size = metrics.batch_size,
            batch_count = metrics.batch_count,
            elapsed = ?metrics.elapsed,
            map_elapsed = ?metrics.map_elapsed,
            reduce_elapsed = ?metrics.reduce_elapsed,
            "Map-reduce run finished"
        );

        Ok(metrics)
    }
}

/// One-off run on the global rayon pool with a fixed batch size and the
/// default reduce strategy.
pub fn run<S, F, R>(
    buffer: SampleBuffer<'_>,
    extract: F,
    reducer: &R,
    batch_size: usize,
) -> Result<RunMetrics<R::Output>>
where
    S: Copy + Default + Send + Sync,
    F: Fn(&Sample) -> S + Sync,
    R: Reducer<S>,
{
    let config = PipelineConfig::default().with_batch_size(BatchSize::fixed(batch_size)?);
    Pipeline::new(config)?.run(buffer, extract, reducer)
}
