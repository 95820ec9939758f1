//! Indexed max-priority-queue (C8): a fixed-capacity binary heap paired with a position-index
//! array keyed by external id, supporting `promote`/`demote` in O(log n). Drives AuPair's
//! (C7) candidate-removal selection.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum IndexedPqError {
    #[error("id {0} is out of range for this queue's capacity")]
    OutOfRange(usize),
    #[error("id {0} is already present")]
    AlreadyPresent(usize),
    #[error("id {0} is not present")]
    NotPresent(usize),
}

/// A binary max-heap over `(priority, id)` pairs where `id` is a dense external index into
/// `[0, capacity)`. Every id appears at most once.
pub struct IndexedMaxPQ {
    /// `heap[0]` is unused; `heap[1]` is the max. 1-based so parent/child math is `i/2`, `2i`, `2i+1`.
    heap: Vec<usize>,
    /// `position[id]` is this id's 1-based index into `heap`, or `0` if absent.
    position: Vec<usize>,
    priority: Vec<i64>,
    len: usize,
}

impl IndexedMaxPQ {
    /// Builds an empty queue over external ids `[0, capacity)`.
    #[must_use]
    pub fn init(capacity: usize) -> Self {
        Self { heap: vec![0; capacity + 1], position: vec![0; capacity], priority: vec![0; capacity], len: 0 }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn contains(&self, id: usize) -> bool {
        id < self.position.len() && self.position[id] != 0
    }

    /// Inserts `id` with `priority`.
    ///
    /// # Errors
    /// [`IndexedPqError::OutOfRange`] if `id >= capacity`; [`IndexedPqError::AlreadyPresent`]
    /// if `id` is already queued.
    pub fn push(&mut self, id: usize, priority: i64) -> Result<(), IndexedPqError> {
        if id >= self.position.len() {
            return Err(IndexedPqError::OutOfRange(id));
        }
        if self.contains(id) {
            return Err(IndexedPqError::AlreadyPresent(id));
        }
        self.len += 1;
        self.heap[self.len] = id;
        self.position[id] = self.len;
        self.priority[id] = priority;
        self.swim(self.len);
        Ok(())
    }

    /// Returns `(priority, id)` of the maximum-priority entry without removing it.
    #[must_use]
    pub fn get_max(&self) -> Option<(i64, usize)> {
        (self.len > 0).then(|| (self.priority[self.heap[1]], self.heap[1]))
    }

    /// Removes and returns the maximum-priority entry.
    pub fn pop_max(&mut self) -> Option<(i64, usize)> {
        if self.len == 0 {
            return None;
        }
        let max_id = self.heap[1];
        let max_priority = self.priority[max_id];
        self.swap_heap(1, self.len);
        self.len -= 1;
        self.position[max_id] = 0;
        self.sink(1);
        Some((max_priority, max_id))
    }

    /// Raises `id`'s priority. No-op on ordering if `new_priority` is not actually higher.
    ///
    /// # Errors
    /// [`IndexedPqError::NotPresent`] if `id` is not queued.
    pub fn promote(&mut self, id: usize, new_priority: i64) -> Result<(), IndexedPqError> {
        if !self.contains(id) {
            return Err(IndexedPqError::NotPresent(id));
        }
        self.priority[id] = new_priority;
        self.swim(self.position[id]);
        self.sink(self.position[id]);
        Ok(())
    }

    /// Lowers `id`'s priority. Semantically identical to [`Self::promote`]; kept as a
    /// separate name because SPEC_FULL.md's C7/C8 contracts name both directions explicitly.
    ///
    /// # Errors
    /// [`IndexedPqError::NotPresent`] if `id` is not queued.
    pub fn demote(&mut self, id: usize, new_priority: i64) -> Result<(), IndexedPqError> {
        self.promote(id, new_priority)
    }

    /// Removes `id` regardless of its position in the heap.
    ///
    /// # Errors
    /// [`IndexedPqError::NotPresent`] if `id` is not queued.
    pub fn remove(&mut self, id: usize) -> Result<(), IndexedPqError> {
        if !self.contains(id) {
            return Err(IndexedPqError::NotPresent(id));
        }
        let pos = self.position[id];
        self.swap_heap(pos, self.len);
        self.len -= 1;
        self.position[id] = 0;
        if pos <= self.len {
            self.swim(pos);
            self.sink(pos);
        }
        Ok(())
    }

    fn less(&self, heap_i: usize, heap_j: usize) -> bool {
        self.priority[self.heap[heap_i]] < self.priority[self.heap[heap_j]]
    }

    fn swap_heap(&mut self, i: usize, j: usize) {
        self.heap.swap(i, j);
        self.position[self.heap[i]] = i;
        self.position[self.heap[j]] = j;
    }

    fn swim(&mut self, mut k: usize) {
        while k > 1 && self.less(k / 2, k) {
            self.swap_heap(k / 2, k);
            k /= 2;
        }
    }

    fn sink(&mut self, mut k: usize) {
        while 2 * k <= self.len {
            let mut j = 2 * k;
            if j < self.len && self.less(j, j + 1) {
                j += 1;
            }
            if !self.less(k, j) {
                break;
            }
            self.swap_heap(k, j);
            k = j;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_from_spec() {
        // push {A:10, B:20, C:30} at ids 0,1,2
        let mut pq = IndexedMaxPQ::init(3);
        pq.push(0, 10).unwrap();
        pq.push(1, 20).unwrap();
        pq.push(2, 30).unwrap();
        assert_eq!(pq.get_max(), Some((30, 2)));

        pq.demote(2, 15).unwrap();
        assert_eq!(pq.get_max(), Some((20, 1)));

        pq.promote(0, 40).unwrap();
        assert_eq!(pq.get_max(), Some((40, 0)));
    }

    #[test]
    fn pop_max_drains_in_priority_order() {
        let mut pq = IndexedMaxPQ::init(5);
        for (id, p) in [(0, 5), (1, 1), (2, 9), (3, 3), (4, 7)] {
            pq.push(id, p).unwrap();
        }
        let mut drained = Vec::new();
        while let Some((p, id)) = pq.pop_max() {
            drained.push((p, id));
        }
        assert_eq!(drained, vec![(9, 2), (7, 4), (5, 0), (3, 3), (1, 1)]);
        assert!(pq.is_empty());
    }

    #[test]
    fn remove_arbitrary_element_preserves_heap() {
        let mut pq = IndexedMaxPQ::init(4);
        for (id, p) in [(0, 5), (1, 1), (2, 9), (3, 3)] {
            pq.push(id, p).unwrap();
        }
        pq.remove(2).unwrap();
        assert_eq!(pq.get_max(), Some((5, 0)));
        assert_eq!(pq.len(), 3);
    }

    #[test]
    fn duplicate_push_rejected() {
        let mut pq = IndexedMaxPQ::init(2);
        pq.push(0, 1).unwrap();
        assert_eq!(pq.push(0, 2).unwrap_err(), IndexedPqError::AlreadyPresent(0));
    }
}
