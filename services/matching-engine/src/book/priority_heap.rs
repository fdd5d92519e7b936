//! Array-backed binary heap ordered by price
//!
//! Backs the limit-order books. The ordering depends on the side the heap
//! serves: a buy heap keeps the highest bid at the root, a sell heap the
//! lowest ask. Entries live in a flat vector; the children of slot `i` are
//! `2i + 1` and `2i + 2`.
//!
//! Besides root extraction the heap supports removing an arbitrary slot
//! (cancellation). The last entry is moved into the hole and percolated in
//! whichever direction restores the heap order.

use types::numeric::Price;
use types::order::{Order, Side};

/// Anything that can be ranked by a limit price
pub trait Priced {
    fn price(&self) -> Price;
}

impl Priced for Order {
    fn price(&self) -> Price {
        self.price
    }
}

/// Binary heap with side-dependent price priority and a hard capacity
#[derive(Debug)]
pub struct PriorityHeap<T> {
    items: Vec<T>,
    capacity: usize,
    side: Side,
}

impl<T: Priced> PriorityHeap<T> {
    /// Create an empty heap for one side of the market
    ///
    /// # Panics
    /// Panics if `capacity` is zero
    pub fn new(side: Side, capacity: usize) -> Self {
        assert!(capacity > 0, "heap capacity must be positive");
        Self {
            items: Vec::with_capacity(capacity),
            capacity,
            side,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    /// Insert an entry, handing it back if the heap is at capacity
    ///
    /// O(log n): the entry enters at the bottom and climbs while it
    /// strictly outranks its parent.
    pub fn insert(&mut self, item: T) -> Result<(), T> {
        if self.is_full() {
            return Err(item);
        }
        self.items.push(item);
        let slot = self.sift_up(self.items.len() - 1);
        debug_assert!(self.is_ordered_around(slot));
        Ok(())
    }

    /// Remove the best-priced entry
    pub fn extract_root(&mut self) -> Option<T> {
        self.extract_at(0)
    }

    /// Remove the entry at `slot`, keeping the rest in heap order
    pub fn extract_at(&mut self, slot: usize) -> Option<T> {
        if slot >= self.items.len() {
            return None;
        }
        let removed = self.items.swap_remove(slot);
        if slot < self.items.len() {
            // The former last entry now sits in the hole
            let settled = self.sift_down(slot);
            let settled = if settled == slot { self.sift_up(slot) } else { settled };
            debug_assert!(self.is_ordered_around(settled));
        }
        Some(removed)
    }

    /// Best-priced entry
    pub fn root(&self) -> Option<&T> {
        self.items.first()
    }

    /// Best-priced entry, mutably
    ///
    /// Callers may change anything except the price; the heap is not
    /// re-ordered afterwards.
    pub fn root_mut(&mut self) -> Option<&mut T> {
        self.items.first_mut()
    }

    /// Entry at `slot` in array order
    pub fn get(&self, slot: usize) -> Option<&T> {
        self.items.get(slot)
    }

    /// Entries in array order (not priority order)
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter()
    }

    /// Slot of the first entry matching `pred`, linear scan in array order
    pub fn position<P>(&self, pred: P) -> Option<usize>
    where
        P: FnMut(&T) -> bool,
    {
        self.items.iter().position(pred)
    }

    /// Check the heap-order property over every slot
    pub fn is_heap(&self) -> bool {
        (1..self.items.len()).all(|slot| !self.outranks(slot, (slot - 1) / 2))
    }

    fn outranks(&self, a: usize, b: usize) -> bool {
        self.side.prefers(self.items[a].price(), self.items[b].price())
    }

    fn sift_up(&mut self, mut slot: usize) -> usize {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if !self.outranks(slot, parent) {
                break;
            }
            self.items.swap(slot, parent);
            slot = parent;
        }
        slot
    }

    fn sift_down(&mut self, mut slot: usize) -> usize {
        let len = self.items.len();
        loop {
            let left = 2 * slot + 1;
            if left >= len {
                break;
            }
            let right = left + 1;
            let child = if right < len && self.outranks(right, left) {
                right
            } else {
                left
            };
            if !self.outranks(child, slot) {
                break;
            }
            self.items.swap(slot, child);
            slot = child;
        }
        slot
    }

    /// Local heap-order check around one slot, cheap enough for debug asserts
    fn is_ordered_around(&self, slot: usize) -> bool {
        let len = self.items.len();
        let parent_ok = slot == 0 || !self.outranks(slot, (slot - 1) / 2);
        let children_ok = [2 * slot + 1, 2 * slot + 2]
            .into_iter()
            .filter(|&child| child < len)
            .all(|child| !self.outranks(child, slot));
        parent_ok && children_ok
    }
}
