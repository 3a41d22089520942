//! Map stage: project every sample to one scalar, in parallel batches.
//!
//! The sample slice and the intermediate buffer are split at the same
//! boundaries, and each batch gets its own `&mut` sub-slice of the output.
//! Writes from different batches can therefore never alias.

use std::ops::Range;

use common::parallel::{ParZipWith, batch_count};
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::sample::{Sample, SampleBuffer};

#[cfg(test)]
mod tests;

/// One unit of map work: a contiguous range of sample indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub index: usize,
    pub range: Range<usize>,
}

/// Hook called around every batch, from whichever worker runs it.
pub trait BatchObserver: Sync {
    fn batch_started(&self, _batch: &Batch) {}

    fn batch_finished(&self, _batch: &Batch) {}
}

/// Observer that ignores every batch.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl BatchObserver for NoopObserver {}

/// How `len` samples split into batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPlan {
    pub batch_size: usize,
    pub batch_count: usize,
}

impl BatchPlan {
    /// # Panics
    ///
    /// Panics if `batch_size` is 0.
    pub fn new(len: usize, batch_size: usize) -> Self {
        Self {
            batch_size,
            batch_count: batch_count(len, batch_size),
        }
    }
}

/// Allocate a zeroed intermediate buffer of `len` scalars, reporting failure
/// instead of aborting.
pub fn allocate_intermediate<S: Copy + Default>(len: usize) -> Result<Vec<S>> {
    let mut out = Vec::new();
    out.try_reserve_exact(len)
        .map_err(|e| Error::AllocationFailure {
            requested_bytes: len.saturating_mul(size_of::<S>()),
            reason: e.to_string(),
        })?;
    out.resize(len, S::default());
    Ok(out)
}

/// Map `extract` over `buffer` into a new intermediate buffer.
///
/// `out[i] == extract(&buffer[i])` for every `i` once this returns `Ok`.
/// `batch_size` only changes how the work is split.
pub fn map<S, F>(buffer: SampleBuffer<'_>, extract: F, batch_size: usize) -> Result<Vec<S>>
where
    S: Copy + Default + Send,
    F: Fn(&Sample) -> S + Sync,
{
    map_observed(buffer, extract, batch_size, &NoopObserver)
}

/// [`map`] with an observer notified around every batch.
pub fn map_observed<S, F, O>(
    buffer: SampleBuffer<'_>,
    extract: F,
    batch_size: usize,
    observer: &O,
) -> Result<Vec<S>>
where
    S: Copy + Default + Send,
    F: Fn(&Sample) -> S + Sync,
    O: BatchObserver + ?Sized,
{
    let mut out = allocate_intermediate(buffer.len())?;
    map_into(buffer, &mut out, &extract, batch_size, observer)?;
    Ok(out)
}

/// Fill `out` with `extract` applied to every sample of `buffer`.
///
/// Returns only after every batch has finished. `out` must be exactly as long
/// as `buffer`.
pub fn map_into<S, F, O>(
    buffer: SampleBuffer<'_>,
    out: &mut [S],
    extract: &F,
    batch_size: usize,
    observer: &O,
) -> Result<()>
where
    S: Send,
    F: Fn(&Sample) -> S + Sync,
    O: BatchObserver + ?Sized,
{
    let len = buffer.len();
    if out.len() != len {
        return Err(Error::InvariantViolation(format!(
            "Intermediate buffer holds {} scalars for {} samples",
            out.len(),
            len
        )));
    }
    if batch_size == 0 {
        return Err(Error::InvalidConfig(
            "Batch size must be at least 1".to_string(),
        ));
    }
    if len == 0 {
        return Ok(());
    }

    let written = buffer
        .as_slice()
        .par_zip_with(out)
        .par_batches(batch_size)
        .map(|(offset, (src, dst))| {
            let batch = Batch {
                index: offset / batch_size,
                range: offset..offset + dst.len(),
            };
            if src.len() != dst.len() || batch.range.end > len {
                return Err(Error::InvariantViolation(format!(
                    "Batch {} covers {:?} with {} inputs for {} samples",
                    batch.index,
                    batch.range,
                    src.len(),
                    len
                )));
            }

            observer.batch_started(&batch);
            for (scalar, sample) in dst.iter_mut().zip(src) {
                *scalar = extract(sample);
            }
            observer.batch_finished(&batch);

            Ok(dst.len())
        })
        .try_reduce(|| 0, |a, b| Ok(a + b))?;

    if written != len {
        return Err(Error::InvariantViolation(format!(
            "Map stage wrote {written} scalars for {len} samples"
        )));
    }
    Ok(())
}
