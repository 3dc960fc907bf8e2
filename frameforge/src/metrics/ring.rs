//! Fixed-capacity circular buffer.
//!
//! The ring stores the most recent `capacity` values. Once full, each push
//! overwrites the oldest slot in place (wrap-around write, no shifting), so
//! memory stays bounded for the lifetime of the process.

use thiserror::Error;

/// Default ring capacity when none is configured.
pub const DEFAULT_RING_CAPACITY: usize = 100;

/// Errors raised when constructing a ring.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetricsError {
    /// A ring must hold at least one value.
    #[error("metrics ring capacity must be greater than zero")]
    ZeroCapacity,
}

/// Fixed-capacity circular buffer.
///
/// `push` is O(1) and never allocates after construction: the backing vector
/// is allocated with the full capacity up front and grows into it exactly
/// once.
///
/// # Example
///
/// ```
/// use frameforge::metrics::MetricsRing;
///
/// let mut ring = MetricsRing::new(3).unwrap();
/// for value in 1..=4 {
///     ring.push(value);
/// }
///
/// // 1 was evicted by the fourth push
/// assert_eq!(ring.to_vec(), vec![2, 3, 4]);
/// assert_eq!(ring.latest(), Some(&4));
/// ```
#[derive(Debug, Clone)]
pub struct MetricsRing<T> {
    slots: Vec<T>,
    capacity: usize,
    /// Index of the slot the next push writes to once the ring is full.
    head: usize,
}

impl<T> MetricsRing<T> {
    /// Create an empty ring.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::ZeroCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, MetricsError> {
        if capacity == 0 {
            return Err(MetricsError::ZeroCapacity);
        }
        Ok(Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            head: 0,
        })
    }

    /// Append a value, evicting the oldest one if the ring is full.
    pub fn push(&mut self, value: T) {
        if self.slots.len() < self.capacity {
            self.slots.push(value);
        } else {
            self.slots[self.head] = value;
        }
        self.head = (self.head + 1) % self.capacity;
    }

    /// The most recently pushed value.
    pub fn latest(&self) -> Option<&T> {
        if self.slots.is_empty() {
            return None;
        }
        let idx = (self.head + self.capacity - 1) % self.capacity;
        self.slots.get(idx)
    }

    /// Iterate values oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        let start = if self.slots.len() < self.capacity {
            0
        } else {
            self.head
        };
        let len = self.slots.len();
        (0..len).map(move |i| &self.slots[(start + i) % len])
    }

    /// Number of values currently held.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if nothing has been pushed yet (or after `clear`).
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Maximum number of values held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns true once the ring has wrapped at least once.
    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    /// Drop all values, keeping the allocation.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.head = 0;
    }
}

impl<T: Clone> MetricsRing<T> {
    /// Copy all values out, oldest first.
    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    /// Copy the newest `n` values out, oldest first.
    pub fn last_n(&self, n: usize) -> Vec<T> {
        let skip = self.len().saturating_sub(n);
        self.iter().skip(skip).cloned().collect()
    }
}

impl<T> Default for MetricsRing<T> {
    fn default() -> Self {
        Self {
            slots: Vec::with_capacity(DEFAULT_RING_CAPACITY),
            capacity: DEFAULT_RING_CAPACITY,
            head: 0,
        }
    }
}
