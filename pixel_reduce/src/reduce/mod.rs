//! Reduce stage: fold the intermediate buffer into one aggregate.

use rayon::prelude::*;

use crate::config::ReduceStrategy;


/// An associative fold over scalars of type `S`.
///
/// `combine` folds one scalar into an aggregate. `merge` joins two partial
/// aggregates and is only used by [`ReduceStrategy::Tree`]. Both must be
/// associative and agree with each other, and `identity` must be neutral for
/// both. Under those rules every strategy returns the same aggregate.
pub trait Reducer<S>: Sync {
    type Output: Copy + Send;

    fn identity(&self) -> Self::Output;

    fn combine(&self, acc: Self::Output, value: S) -> Self::Output;

    fn merge(&self, left: Self::Output, right: Self::Output) -> Self::Output;
}

/// Integer sum widened to `u64`.
///
/// 255 * N overflows `u32` once N passes ~16.8M (and `i32` past ~8.4M), so
/// channel sums always accumulate in 64 bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sum;

impl<S: Into<u64>> Reducer<S> for Sum {
    type Output = u64;

    #[inline]
    fn identity(&self) -> u64 {
        0
    }

    #[inline]
    fn combine(&self, acc: u64, value: S) -> u64 {
        acc + value.into()
    }

    #[inline]
    fn merge(&self, left: u64, right: u64) -> u64 {
        left + right
    }
}

/// Maximum value, with 0 for empty input.
#[derive(Debug, Clone, Copy, Default)]
pub struct Max;

impl<S: Into<u64>> Reducer<S> for Max {
    type Output = u64;

    #[inline]
    fn identity(&self) -> u64 {
        0
    }

    #[inline]
    fn combine(&self, acc: u64, value: S) -> u64 {
        acc.max(value.into())
    }

    #[inline]
    fn merge(&self, left: u64, right: u64) -> u64 {
        left.max(right)
    }
}

/// Reducer assembled from closures.
pub struct FnReducer<A, C, M> {
    identity: A,
    combine: C,
    merge: M,
}

impl<A, C, M> FnReducer<A, C, M> {
    pub fn new(identity: A, combine: C, merge: M) -> Self {
        Self {
            identity,
            combine,
            merge,
        }
    }
}

impl<S, A, C, M> Reducer<S> for FnReducer<A, C, M>
where
    A: Copy + Send + Sync,
    C: Fn(A, S) -> A + Sync,
    M: Fn(A, A) -> A + Sync,
{
    type Output = A;

    fn identity(&self) -> A {
        self.identity
    }

    fn combine(&self, acc: A, value: S) -> A {
        (self.combine)(acc, value)
    }

    fn merge(&self, left: A, right: A) -> A {
        (self.merge)(left, right)
    }
}

/// Fold `values` into a single aggregate.
///
/// Empty input returns `reducer.identity()`.
///
/// # Panics
///
/// Panics if `strategy` is `Tree` with `leaf_len` 0. `PipelineConfig::validate`
/// rejects that configuration.
pub fn reduce<S, R>(values: &[S], reducer: &R, strategy: ReduceStrategy) -> R::Output
where
    S: Copy + Sync,
    R: Reducer<S>,
{
    match strategy {
        ReduceStrategy::Sequential => fold_sequential(values, reducer),
        ReduceStrategy::Tree { leaf_len } => {
            assert!(leaf_len > 0, "leaf_len must be > 0");
            if values.len() <= leaf_len {
                return fold_sequential(values, reducer);
            }
            values
                .par_chunks(leaf_len)
                .map(|leaf| fold_sequential(leaf, reducer))
                .reduce(|| reducer.identity(), |l, r| reducer.merge(l, r))
        }
    }
}

#[inline]
fn fold_sequential<S, R>(values: &[S], reducer: &R) -> R::Output
where
    S: Copy,
    R: Reducer<S>,
{
    values
        .iter()
        .fold(reducer.identity(), |acc, &v| reducer.combine(acc, v))
}
