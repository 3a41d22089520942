use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};

#[test]
fn test_auto_batch_size_minimum_one() {
    assert_eq!(auto_batch_size(0), 1);
    assert_eq!(auto_batch_size(1), 1);
    assert!(auto_batch_size(1_000_000) >= 1);
}

#[test]
fn test_batch_count() {
    assert_eq!(batch_count(0, 4), 0);
    assert_eq!(batch_count(1, 4), 1);
    assert_eq!(batch_count(8, 4), 2);
    assert_eq!(batch_count(9, 4), 3);
    assert_eq!(batch_count(9, 100), 1);
}

#[test]
#[should_panic(expected = "batch_size must be > 0")]
fn test_batch_count_zero_panics() {
    batch_count(10, 0);
}

#[test]
fn test_par_batches_mut_offsets() {
    let mut data: Vec<usize> = vec![0; 100];
    data.par_batches_mut(7).for_each(|(offset, batch)| {
        assert!(batch.len() <= 7);
        for (i, val) in batch.iter_mut().enumerate() {
            *val = offset + i;
        }
    });
    for (i, &v) in data.iter().enumerate() {
        assert_eq!(v, i);
    }
}

#[test]
fn test_par_batches_mut_auto_offsets() {
    let mut data: Vec<usize> = vec![0; 1000];
    data.par_batches_mut_auto().for_each(|(offset, batch)| {
        for (i, val) in batch.iter_mut().enumerate() {
            *val = offset + i;
        }
    });
    for (i, &v) in data.iter().enumerate() {
        assert_eq!(v, i);
    }
}

#[test]
fn test_par_batches_covers_every_element_once() {
    let data: Vec<u32> = (0..1234).collect();
    let visited = AtomicUsize::new(0);
    let sum: u64 = data
        .par_batches(50)
        .map(|(offset, batch)| {
            visited.fetch_add(batch.len(), Ordering::Relaxed);
            assert_eq!(batch[0] as usize, offset);
            batch.iter().map(|&v| v as u64).sum::<u64>()
        })
        .sum();
    assert_eq!(visited.load(Ordering::Relaxed), data.len());
    assert_eq!(sum, (0..1234u64).sum());
}

#[test]
fn test_par_batches_empty() {
    let data: Vec<u8> = vec![];
    assert_eq!(data.par_batches(3).count(), 0);
}

#[test]
fn test_par_batches_len_matches_batch_count() {
    let data = vec![0u8; 17];
    assert_eq!(data.par_batches(4).len(), batch_count(17, 4));
    assert_eq!(data.par_batches(17).len(), 1);
    assert_eq!(data.par_batches(18).len(), 1);
}

#[test]
fn test_par_zip_with_maps_at_matching_indices() {
    let input: Vec<u16> = (0..500).collect();
    let mut output: Vec<u32> = vec![0; input.len()];

    input
        .as_slice()
        .par_zip_with(&mut output)
        .par_batches(13)
        .for_each(|(offset, (src, dst))| {
            assert_eq!(src.len(), dst.len());
            assert_eq!(src[0] as usize, offset);
            for (d, &s) in dst.iter_mut().zip(src) {
                *d = s as u32 * 3;
            }
        });

    for (i, &v) in output.iter().enumerate() {
        assert_eq!(v, i as u32 * 3);
    }
}

#[test]
#[should_panic(expected = "Zipped slices must have equal length")]
fn test_par_zip_with_length_mismatch_panics() {
    let input = vec![1u8; 4];
    let mut output = vec![0u8; 5];
    input
        .as_slice()
        .par_zip_with(&mut output)
        .par_batches(2)
        .for_each(|_| {});
}

#[test]
#[should_panic(expected = "batch_size must be > 0")]
fn test_par_batches_mut_zero_panics() {
    let mut data = vec![0u8; 4];
    data.par_batches_mut(0).for_each(|_| {});
}
