//! # Priority Queue
//!
//! Array-backed binary max-heap keyed by an `i64` priority. Knows nothing
//! about packets or time; the scheduler layers urgency on top of it.
//!
//! ## Ordering rules
//!
//! - **Sift-up** only moves an entry past a parent with a strictly lower
//!   priority. Equal priorities stay where they are, so a newer entry sits
//!   below an older one of the same priority.
//! - **Sift-down** picks the larger child, with the right child winning a
//!   tie, and only swaps when the parent is strictly smaller.
//!
//! Extraction order among equal priorities follows heap positions, not
//! insertion time. Callers may rely on total ordering by priority only.

// ─── Index Arithmetic ───────────────────────────────────────────────────────

#[inline]
pub(crate) fn parent(i: usize) -> usize {
    (i - 1) / 2
}

#[inline]
pub(crate) fn left(i: usize) -> usize {
    2 * i + 1
}

#[inline]
pub(crate) fn right(i: usize) -> usize {
    2 * i + 2
}

// ─── Heap Entry ─────────────────────────────────────────────────────────────

/// A value together with the priority it was inserted at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapEntry<T> {
    pub value: T,
    pub priority: i64,
}

// ─── Priority Queue ─────────────────────────────────────────────────────────

/// Binary max-heap over [`HeapEntry`] values.
#[derive(Debug, Clone)]
pub struct PriorityQueue<T> {
    heap: Vec<HeapEntry<T>>,
}

impl<T> PriorityQueue<T> {
    pub fn new() -> Self {
        PriorityQueue { heap: Vec::new() }
    }

    /// Pre-allocate room for `capacity` entries. The queue still grows past it.
    pub fn with_capacity(capacity: usize) -> Self {
        PriorityQueue {
            heap: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Priority of the entry `extract_max` would return next.
    pub fn peek_priority(&self) -> Option<i64> {
        self.heap.first().map(|e| e.priority)
    }

    /// Backing storage in heap order.
    pub fn entries(&self) -> &[HeapEntry<T>] {
        &self.heap
    }

    /// Insert `value` at `priority`.
    pub fn insert(&mut self, value: T, priority: i64) {
        self.heap.push(HeapEntry { value, priority });
        self.sift_up(self.heap.len() - 1);
    }

    /// Remove and return the value with the highest priority.
    ///
    /// Returns `None` on an empty queue, however many times it is called.
    pub fn extract_max(&mut self) -> Option<T> {
        self.extract_max_entry().map(|e| e.value)
    }

    /// Like [`extract_max`](Self::extract_max), keeping the priority.
    pub fn extract_max_entry(&mut self) -> Option<HeapEntry<T>> {
        if self.heap.is_empty() {
            return None;
        }

        let last = self.heap.len() - 1;
        self.heap.swap(0, last);
        let max = self.heap.pop()?;

        if !self.heap.is_empty() {
            self.sift_down(0);
        }

        Some(max)
    }

    /// Whether every parent's priority is >= both children's.
    pub fn is_heap(&self) -> bool {
        (1..self.heap.len()).all(|i| self.heap[parent(i)].priority >= self.heap[i].priority)
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let p = parent(idx);
            if self.heap[idx].priority > self.heap[p].priority {
                self.heap.swap(idx, p);
                idx = p;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.heap.len();
        loop {
            let l = left(idx);
            let r = right(idx);

            let child = if r < len {
                if self.heap[r].priority >= self.heap[l].priority {
                    r
                } else {
                    l
                }
            } else if l < len {
                l
            } else {
                // Leaf
                break;
            };

            if self.heap[idx].priority < self.heap[child].priority {
                self.heap.swap(idx, child);
                idx = child;
            } else {
                break;
            }
        }
    }
}

impl<T> Default for PriorityQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
