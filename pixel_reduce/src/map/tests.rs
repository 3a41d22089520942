use super::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

fn gradient(len: usize) -> Vec<Sample> {
    (0..len)
        .map(|i| Sample::new((i % 256) as u8, (i / 256 % 256) as u8, 7, 255))
        .collect()
}

/// Records which indices each batch claims and which batches run at once.
struct DisjointnessProbe {
    claimed: Vec<AtomicBool>,
    active: Mutex<Vec<Range<usize>>>,
    started: AtomicUsize,
    finished: AtomicUsize,
    max_concurrent: AtomicUsize,
}

impl DisjointnessProbe {
    fn new(len: usize) -> Self {
        Self {
            claimed: (0..len).map(|_| AtomicBool::new(false)).collect(),
            active: Mutex::new(Vec::new()),
            started: AtomicUsize::new(0),
            finished: AtomicUsize::new(0),
            max_concurrent: AtomicUsize::new(0),
        }
    }

    fn all_claimed(&self) -> bool {
        self.claimed.iter().all(|c| c.load(Ordering::SeqCst))
    }
}

impl BatchObserver for DisjointnessProbe {
    fn batch_started(&self, batch: &Batch) {
        for i in batch.range.clone() {
            let already = self.claimed[i].swap(true, Ordering::SeqCst);
            assert!(!already, "index {i} claimed by more than one batch");
        }

        let mut active = self.active.lock();
        for other in active.iter() {
            assert!(
                batch.range.end <= other.start || other.end <= batch.range.start,
                "batch {:?} overlaps concurrently running {:?}",
                batch.range,
                other
            );
        }
        active.push(batch.range.clone());
        self.max_concurrent.fetch_max(active.len(), Ordering::SeqCst);
        drop(active);

        self.started.fetch_add(1, Ordering::SeqCst);
        // Widen the window in which batches overlap in time.
        std::thread::yield_now();
    }

    fn batch_finished(&self, batch: &Batch) {
        let mut active = self.active.lock();
        let pos = active
            .iter()
            .position(|r| *r == batch.range)
            .expect("finished batch was never started");
        active.swap_remove(pos);
        self.finished.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_map_writes_matching_indices() {
    let samples = gradient(1000);
    let out = map(SampleBuffer::new(&samples), |s| s.r as u32 + s.g as u32, 13).unwrap();
    assert_eq!(out.len(), samples.len());
    for (i, (&v, s)) in out.iter().zip(&samples).enumerate() {
        assert_eq!(v, s.r as u32 + s.g as u32, "index {i}");
    }
}

#[test]
fn test_map_batch_size_invariance() {
    let samples = gradient(777);
    let n = samples.len();
    let reference: Vec<u32> = samples.iter().map(|s| s.r as u32 * 3).collect();
    for batch_size in [1, 7, 256, n, n + 1] {
        let out = map(SampleBuffer::new(&samples), |s| s.r as u32 * 3, batch_size).unwrap();
        assert_eq!(out, reference, "batch_size {batch_size}");
    }
}

#[test]
fn test_map_empty_schedules_nothing() {
    let probe = DisjointnessProbe::new(0);
    let out: Vec<u32> = map_observed(SampleBuffer::new(&[]), |s| s.r as u32, 4, &probe).unwrap();
    assert!(out.is_empty());
    assert_eq!(probe.started.load(Ordering::SeqCst), 0);
}

#[test]
fn test_map_batches_are_disjoint() {
    let samples = gradient(10_000);
    let probe = DisjointnessProbe::new(samples.len());
    let out = map_observed(SampleBuffer::new(&samples), |s| s.r, 3, &probe).unwrap();

    let plan = BatchPlan::new(samples.len(), 3);
    assert_eq!(probe.started.load(Ordering::SeqCst), plan.batch_count);
    assert_eq!(probe.finished.load(Ordering::SeqCst), plan.batch_count);
    assert!(probe.all_claimed());
    assert!(probe.active.lock().is_empty());
    assert!(probe.max_concurrent.load(Ordering::SeqCst) >= 1);
    assert_eq!(out.len(), samples.len());
}

#[test]
fn test_map_into_rejects_wrong_output_length() {
    let samples = gradient(10);
    let mut out = vec![0u32; 9];
    let err = map_into(
        SampleBuffer::new(&samples),
        &mut out,
        &|s: &Sample| s.r as u32,
        4,
        &NoopObserver,
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvariantViolation(_)));
}

#[test]
fn test_map_zero_batch_size_rejected() {
    let samples = gradient(10);
    let err = map(SampleBuffer::new(&samples), |s| s.r, 0).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn test_batch_plan() {
    assert_eq!(
        BatchPlan::new(10, 3),
        BatchPlan {
            batch_size: 3,
            batch_count: 4
        }
    );
    assert_eq!(BatchPlan::new(0, 3).batch_count, 0);
    assert_eq!(BatchPlan::new(10, 11).batch_count, 1);
}

#[test]
fn test_allocate_intermediate_zeroed() {
    let out: Vec<u64> = allocate_intermediate(16).unwrap();
    assert_eq!(out, vec![0u64; 16]);
}

#[test]
fn test_allocate_intermediate_reports_capacity_overflow() {
    let err = allocate_intermediate::<u64>(usize::MAX).unwrap_err();
    match err {
        Error::AllocationFailure {
            requested_bytes, ..
        } => assert_eq!(requested_bytes, usize::MAX),
        other => panic!("unexpected error: {other}"),
    }
}
