//! A growable, index-addressed cache.
//!
//! [`IntCache`] maps small integers to values built on first use by a
//! factory. Storage is a fixed array of buckets whose sizes double, so a
//! bucket never moves once allocated and populated reads never lock.
//! Bucket `b` holds `2^(FIRST_BITS + b)` slots.

use std::fmt;

use once_cell::sync::OnceCell;

const FIRST_BITS: u32 = 4;
const BUCKETS: usize = 16;

type Factory<T> = Box<dyn Fn(usize) -> T + Send + Sync>;

/// Lazily built values keyed by index.
pub struct IntCache<T> {
    buckets: Box<[OnceCell<Box<[OnceCell<T>]>>]>,
    factory: Factory<T>,
}

impl<T: Clone> IntCache<T> {
    pub fn new<F>(factory: F) -> Self
    where
        F: Fn(usize) -> T + Send + Sync + 'static,
    {
        Self {
            buckets: (0..BUCKETS).map(|_| OnceCell::new()).collect(),
            factory: Box::new(factory),
        }
    }

    /// The largest index plus one.
    pub const fn capacity() -> usize {
        (1 << FIRST_BITS) * ((1 << BUCKETS) - 1)
    }

    /// The value for `index`, building it if needed.
    ///
    /// # Panics
    ///
    /// If `index` is not below [`IntCache::capacity`].
    pub fn get(&self, index: usize) -> T {
        assert!(
            index < Self::capacity(),
            "IntCache index {index} exceeds capacity {}",
            Self::capacity()
        );
        let (bucket, offset) = locate(index);
        let slots = self.buckets[bucket].get_or_init(|| {
            (0..bucket_len(bucket)).map(|_| OnceCell::new()).collect()
        });
        slots[offset].get_or_init(|| (self.factory)(index)).clone()
    }

    /// The value for `index` if it was already built.
    #[cfg(test)]
    fn peek(&self, index: usize) -> Option<T> {
        if index >= Self::capacity() {
            return None;
        }
        let (bucket, offset) = locate(index);
        self.buckets[bucket].get()?[offset].get().cloned()
    }
}

fn bucket_len(bucket: usize) -> usize {
    1 << (FIRST_BITS as usize + bucket)
}

/// Bucket and offset of `index`.
fn locate(index: usize) -> (usize, usize) {
    let shifted = index + (1 << FIRST_BITS);
    let bits = (usize::BITS - shifted.leading_zeros()) as usize;
    let bucket = bits - 1 - FIRST_BITS as usize;
    (bucket, shifted - bucket_len(bucket))
}

impl<T> fmt::Debug for IntCache<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let allocated = self.buckets.iter().filter(|b| b.get().is_some()).count();
        f.debug_struct("IntCache")
            .field("allocated_buckets", &allocated)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn locate_walks_bucket_boundaries() {
        assert_eq!(locate(0), (0, 0));
        assert_eq!(locate(15), (0, 15));
        assert_eq!(locate(16), (1, 0));
        assert_eq!(locate(47), (1, 31));
        assert_eq!(locate(48), (2, 0));
        let last = IntCache::<u8>::capacity() - 1;
        assert_eq!(locate(last), (BUCKETS - 1, bucket_len(BUCKETS - 1) - 1));
    }

    #[test]
    fn values_are_built_once() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&built);
        let cache = IntCache::new(move |i| {
            counter.fetch_add(1, Ordering::SeqCst);
            i * 2
        });
        assert_eq!(cache.peek(100), None);
        assert_eq!(cache.get(100), 200);
        assert_eq!(cache.get(100), 200);
        assert_eq!(cache.peek(100), Some(200));
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn concurrent_first_reads_agree() {
        let cache = Arc::new(IntCache::new(|i| Arc::new(i)));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || (0..200).map(|i| cache.get(i)).collect::<Vec<_>>())
            })
            .collect();
        let seen: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();
        for run in &seen[1..] {
            for (a, b) in run.iter().zip(&seen[0]) {
                assert!(Arc::ptr_eq(a, b));
            }
        }
    }

    #[test]
    #[should_panic(expected = "exceeds capacity")]
    fn out_of_range_panics() {
        let cache = IntCache::new(|i| i);
        cache.get(IntCache::<usize>::capacity());
    }
}
