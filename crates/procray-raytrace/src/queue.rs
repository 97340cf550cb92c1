//! Fixed-capacity min-priority queue for per-ray traversal state.

use arrayvec::ArrayVec;

/// Min-queue keyed by `f64`, holding at most `N` entries without allocating.
///
/// When full, a new entry replaces the entry with the largest key if it is
/// smaller than that key, and is dropped otherwise.
#[derive(Debug)]
pub struct BoundedMinQueue<T, const N: usize> {
    entries: ArrayVec<(f64, T), N>,
    dropped: usize,
}

impl<T, const N: usize> BoundedMinQueue<T, N> {
    /// Empty queue.
    pub fn new() -> Self {
        Self {
            entries: ArrayVec::new(),
            dropped: 0,
        }
    }

    /// Number of queued entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries discarded because the queue was full.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Insert `value` with priority `key`.
    pub fn push(&mut self, key: f64, value: T) {
        if let Err(err) = self.entries.try_push((key, value)) {
            self.dropped += 1;
            let worst = self
                .entries
                .iter()
                .enumerate()
                .max_by(|a, b| a.1 .0.total_cmp(&b.1 .0))
                .map(|(i, e)| (i, e.0));
            if let Some((i, worst_key)) = worst {
                if key < worst_key {
                    self.entries[i] = err.element();
                }
            }
        }
    }

    /// Remove and return the entry with the smallest key.
    pub fn pop_min(&mut self) -> Option<(f64, T)> {
        let best = self
            .entries
            .iter()
            .enumerate()
            .min_by(|a, b| a.1 .0.total_cmp(&b.1 .0))
            .map(|(i, _)| i)?;
        Some(self.entries.swap_remove(best))
    }
}

impl<T, const N: usize> Default for BoundedMinQueue<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
