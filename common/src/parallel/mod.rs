//! Parallel batch partitioning utilities.
//!
//! Splits slices into contiguous batches of a fixed size and hands each batch to
//! rayon together with the index of its first element. Batches never overlap, so
//! writes through `&mut` batches need no synchronization.

use rayon::prelude::*;

#[cfg(test)]
mod tests;

/// Multiplier for number of batches relative to worker threads.
/// Using 3x threads provides good load balancing when some batches finish faster.
const BATCHES_PER_THREAD: usize = 3;

/// Compute a batch size that splits `len` items into roughly
/// `threads * BATCHES_PER_THREAD` batches. Minimum of 1.
#[inline]
pub fn auto_batch_size(len: usize) -> usize {
    let num_batches = rayon::current_num_threads() * BATCHES_PER_THREAD;
    (len / num_batches).max(1)
}

/// Number of batches of at most `batch_size` items needed to cover `len` items.
///
/// # Panics
///
/// Panics if `batch_size` is 0.
#[inline]
pub fn batch_count(len: usize, batch_size: usize) -> usize {
    assert!(batch_size > 0, "batch_size must be > 0");
    len.div_ceil(batch_size)
}

// ============================================================================
// Generic parallel iterator wrapper with offset
// ============================================================================

/// Parallel iterator that prepends the start offset to each batch.
///
/// The offset of batch `k` is `k * stride`, which is exact for every batch
/// produced by `par_chunks`/`par_chunks_mut` with chunk size `stride`.
pub struct WithOffset<I, T, F> {
    inner: I,
    stride: usize,
    transform: F,
    _phantom: std::marker::PhantomData<T>,
}

impl<I, T, F> WithOffset<I, T, F> {
    fn new(inner: I, stride: usize, transform: F) -> Self {
        Self {
            inner,
            stride,
            transform,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<I, T, F> ParallelIterator for WithOffset<I, T, F>
where
    I: IndexedParallelIterator,
    T: Send,
    F: Fn(I::Item) -> T + Send + Sync,
{
    type Item = (usize, T);

    fn drive_unindexed<C>(self, consumer: C) -> C::Result
    where
        C: rayon::iter::plumbing::UnindexedConsumer<Self::Item>,
    {
        let stride = self.stride;
        let transform = self.transform;
        self.inner
            .enumerate()
            .map(move |(idx, item)| (idx * stride, transform(item)))
            .drive_unindexed(consumer)
    }

    fn opt_len(&self) -> Option<usize> {
        Some(self.inner.len())
    }
}

impl<I, T, F> IndexedParallelIterator for WithOffset<I, T, F>
where
    I: IndexedParallelIterator,
    T: Send,
    F: Fn(I::Item) -> T + Send + Sync,
{
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn drive<C>(self, consumer: C) -> C::Result
    where
        C: rayon::iter::plumbing::Consumer<Self::Item>,
    {
        let stride = self.stride;
        let transform = self.transform;
        self.inner
            .enumerate()
            .map(move |(idx, item)| (idx * stride, transform(item)))
            .drive(consumer)
    }

    fn with_producer<CB>(self, callback: CB) -> CB::Output
    where
        CB: rayon::iter::plumbing::ProducerCallback<Self::Item>,
    {
        let stride = self.stride;
        let transform = self.transform;
        self.inner
            .enumerate()
            .map(move |(idx, item)| (idx * stride, transform(item)))
            .with_producer(callback)
    }
}

// ============================================================================
// Type aliases for common iterator types
// ============================================================================

/// Parallel iterator over shared batches that yields `(offset, batch)` pairs.
pub type ParBatchesWithOffset<'a, T> =
    WithOffset<rayon::slice::Chunks<'a, T>, &'a [T], fn(&'a [T]) -> &'a [T]>;

/// Parallel iterator over mutable batches that yields `(offset, batch)` pairs.
pub type ParBatchesMutWithOffset<'a, T> =
    WithOffset<rayon::slice::ChunksMut<'a, T>, &'a mut [T], fn(&'a mut [T]) -> &'a mut [T]>;

/// Parallel iterator over a read batch zipped with the matching write batch.
pub type ParZipBatchesWithOffset<'a, A, B> = WithOffset<
    rayon::iter::Zip<rayon::slice::Chunks<'a, A>, rayon::slice::ChunksMut<'a, B>>,
    (&'a [A], &'a mut [B]),
    fn((&'a [A], &'a mut [B])) -> (&'a [A], &'a mut [B]),
>;

fn identity<T>(x: T) -> T {
    x
}

// ============================================================================
// Extension traits
// ============================================================================

/// Extension trait for shared parallel batches with offsets.
pub trait ParBatches<'a, T: Sync + 'a> {
    /// Split into shared batches of at most `batch_size` elements.
    /// Returns an iterator yielding `(start_offset, batch)` pairs.
    fn par_batches(&'a self, batch_size: usize) -> ParBatchesWithOffset<'a, T>;
}

impl<'a, T: Sync + 'a> ParBatches<'a, T> for [T] {
    fn par_batches(&'a self, batch_size: usize) -> ParBatchesWithOffset<'a, T> {
        assert!(batch_size > 0, "batch_size must be > 0");
        WithOffset::new(
            self.par_chunks(batch_size),
            batch_size,
            identity as fn(&'a [T]) -> &'a [T],
        )
    }
}

/// Extension trait for mutable parallel batches with offsets.
pub trait ParBatchesMut<'a, T: Send + 'a> {
    /// Split into mutable batches of at most `batch_size` elements.
    /// Returns an iterator yielding `(start_offset, batch)` pairs.
    fn par_batches_mut(&'a mut self, batch_size: usize) -> ParBatchesMutWithOffset<'a, T>;

    /// Same as [`ParBatchesMut::par_batches_mut`] with [`auto_batch_size`].
    fn par_batches_mut_auto(&'a mut self) -> ParBatchesMutWithOffset<'a, T>;
}

impl<'a, T: Send + 'a> ParBatchesMut<'a, T> for [T] {
    fn par_batches_mut(&'a mut self, batch_size: usize) -> ParBatchesMutWithOffset<'a, T> {
        assert!(batch_size > 0, "batch_size must be > 0");
        WithOffset::new(
            self.par_chunks_mut(batch_size),
            batch_size,
            identity as fn(&'a mut [T]) -> &'a mut [T],
        )
    }

    fn par_batches_mut_auto(&'a mut self) -> ParBatchesMutWithOffset<'a, T> {
        let batch_size = auto_batch_size(self.len());
        self.par_batches_mut(batch_size)
    }
}

/// Extension trait pairing a read-only slice with an equally long output slice.
pub trait ParZipWith<'a, A: Sync + 'a> {
    /// Zip this slice with `output` for parallel batch iteration.
    fn par_zip_with<B: Send + 'a>(self, output: &'a mut [B]) -> ZippedBatches<'a, A, B>;
}

impl<'a, A: Sync + 'a> ParZipWith<'a, A> for &'a [A] {
    fn par_zip_with<B: Send + 'a>(self, output: &'a mut [B]) -> ZippedBatches<'a, A, B> {
        ZippedBatches(self, output)
    }
}

/// An input slice and an output slice ready for parallel batch iteration.
pub struct ZippedBatches<'a, A: Sync, B: Send>(pub &'a [A], pub &'a mut [B]);

impl<'a, A: Sync + 'a, B: Send + 'a> ZippedBatches<'a, A, B> {
    /// Split both slices at the same boundaries into batches of at most
    /// `batch_size` elements, yielding `(start_offset, (input, output))`.
    pub fn par_batches(self, batch_size: usize) -> ParZipBatchesWithOffset<'a, A, B> {
        assert_eq!(
            self.0.len(),
            self.1.len(),
            "Zipped slices must have equal length"
        );
        assert!(batch_size > 0, "batch_size must be > 0");
        WithOffset::new(
            self.0
                .par_chunks(batch_size)
                .zip(self.1.par_chunks_mut(batch_size)),
            batch_size,
            identity as fn((&'a [A], &'a mut [B])) -> (&'a [A], &'a mut [B]),
        )
    }
}
