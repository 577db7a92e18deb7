//! Per-category rotation over the healthy candidates

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::intent::IntentCategory;

/// Rotation cursors, one per category
///
/// The cursor is reduced modulo the current candidate count on every pick,
/// so membership changes shift the rotation rather than resetting it.
#[derive(Debug, Default)]
pub struct RoundRobin {
    last: [AtomicUsize; IntentCategory::COUNT],
}

impl RoundRobin {
    /// Advance the category's cursor and return the candidate under it
    ///
    /// `candidates` must not be empty.
    pub fn pick<'a, T>(&self, category: IntentCategory, candidates: &'a [T]) -> &'a T {
        let len = candidates.len();
        let cursor = &self.last[category.index()];

        let next = match cursor.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |last| Some((last + 1) % len)) {
            Ok(previous) | Err(previous) => (previous + 1) % len,
        };

        &candidates[next]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_around() {
        let rr = RoundRobin::default();
        let items = [10, 20];

        let picks: Vec<_> = (0..4).map(|_| *rr.pick(IntentCategory::Coding, &items)).collect();
        assert_eq!(picks, [20, 10, 20, 10]);
    }

    #[test]
    fn shrinking_list_stays_in_bounds() {
        let rr = RoundRobin::default();

        rr.pick(IntentCategory::General, &[1, 2, 3]);
        rr.pick(IntentCategory::General, &[1, 2, 3]);
        // cursor is at 2, beyond a single-element list
        assert_eq!(*rr.pick(IntentCategory::General, &[7]), 7);
    }
}
