//! Run-scoped intermediate storage.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};
use crate::map::allocate_intermediate;

/// Intermediate buffer that is counted as live until dropped.
///
/// Dropping happens on every exit path of a run, including `?` returns and
/// unwinding out of a panicking extract function.
pub(crate) struct ScratchBuffer<'p, S> {
    data: Vec<S>,
    live: &'p AtomicUsize,
}

impl<'p, S: Copy + Default> ScratchBuffer<'p, S> {
    pub(crate) fn acquire(
        len: usize,
        budget: Option<usize>,
        live: &'p AtomicUsize,
    ) -> Result<Self> {
        let requested_bytes = len.saturating_mul(size_of::<S>());
        if let Some(budget) = budget
            && requested_bytes > budget
        {
            return Err(Error::AllocationFailure {
                requested_bytes,
                reason: format!("exceeds scratch budget of {budget} bytes"),
            });
        }

        let data = allocate_intermediate(len)?;
        live.fetch_add(1, Ordering::SeqCst);
        Ok(Self { data, live })
    }
}

impl<S> Deref for ScratchBuffer<'_, S> {
    type Target = [S];

    fn deref(&self) -> &[S] {
        &self.data
    }
}

impl<S> DerefMut for ScratchBuffer<'_, S> {
    fn deref_mut(&mut self) -> &mut [S] {
        &mut self.data
    }
}

impl<S> Drop for ScratchBuffer<'_, S> {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}
