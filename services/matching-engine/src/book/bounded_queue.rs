//! Fixed-capacity FIFO ring buffer
//!
//! Backs the market-order books, the cancel book and the incoming order
//! queue. Entries leave from the head in arrival order; the only
//! order-breaking operation is `remove_at`, used by cancellation, which
//! closes the gap by shifting whichever side of the removal point is
//! shorter so the remaining entries keep their relative order.
//!
//! The queue itself never blocks and never grows. Blocking on full/empty
//! is layered on top by [`Book`](super::Book).

/// Ring buffer holding at most `capacity` entries
#[derive(Debug)]
pub struct BoundedQueue<T> {
    slots: Box<[Option<T>]>,
    /// Slot of the oldest entry
    head: usize,
    /// Slot the next push writes to
    tail: usize,
    /// Distinguishes full from empty when `head == tail`
    full: bool,
}

impl<T> BoundedQueue<T> {
    /// Create an empty queue
    ///
    /// # Panics
    /// Panics if `capacity` is zero
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be positive");
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            tail: 0,
            full: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        if self.full {
            self.capacity()
        } else {
            (self.tail + self.capacity() - self.head) % self.capacity()
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.full && self.head == self.tail
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Append at the tail, handing the item back if the queue is full
    pub fn push(&mut self, item: T) -> Result<(), T> {
        if self.full {
            return Err(item);
        }
        self.slots[self.tail] = Some(item);
        self.tail = self.wrap_next(self.tail);
        self.full = self.tail == self.head;
        Ok(())
    }

    /// Take the oldest entry
    pub fn pop(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let item = self.slots[self.head].take();
        debug_assert!(item.is_some(), "live slot {} is vacant", self.head);
        self.head = self.wrap_next(self.head);
        self.full = false;
        item
    }

    /// Oldest entry
    pub fn front(&self) -> Option<&T> {
        if self.is_empty() {
            None
        } else {
            self.slots[self.head].as_ref()
        }
    }

    /// Oldest entry, mutably
    pub fn front_mut(&mut self) -> Option<&mut T> {
        if self.is_empty() {
            None
        } else {
            self.slots[self.head].as_mut()
        }
    }

    /// Entry `offset` places behind the head
    pub fn get(&self, offset: usize) -> Option<&T> {
        if offset >= self.len() {
            return None;
        }
        self.slots[self.slot_of(offset)].as_ref()
    }

    /// Entries from head to tail
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        (0..self.len()).filter_map(move |offset| self.slots[self.slot_of(offset)].as_ref())
    }

    /// Offset of the first entry matching `pred`, scanning from the head
    pub fn position<P>(&self, mut pred: P) -> Option<usize>
    where
        P: FnMut(&T) -> bool,
    {
        self.iter().position(|item| pred(item))
    }

    /// Remove the entry `offset` places behind the head
    ///
    /// Shifts the shorter run of neighbours (towards the head or towards
    /// the tail) into the gap, so the cost is O(min(offset, len - offset)).
    pub fn remove_at(&mut self, offset: usize) -> Option<T> {
        let len = self.len();
        if offset >= len {
            return None;
        }

        let at = self.slot_of(offset);
        let removed = self.slots[at].take();
        let behind = len - 1 - offset;

        if offset < behind {
            // Slide the entries in front of the gap one slot towards the tail
            let mut hole = at;
            for _ in 0..offset {
                let prev = self.wrap_prev(hole);
                self.slots[hole] = self.slots[prev].take();
                hole = prev;
            }
            self.head = self.wrap_next(self.head);
        } else {
            // Slide the entries behind the gap one slot towards the head
            let mut hole = at;
            for _ in 0..behind {
                let next = self.wrap_next(hole);
                self.slots[hole] = self.slots[next].take();
                hole = next;
            }
            self.tail = self.wrap_prev(self.tail);
        }
        self.full = false;
        removed
    }

    fn slot_of(&self, offset: usize) -> usize {
        (self.head + offset) % self.capacity()
    }

    fn wrap_next(&self, slot: usize) -> usize {
        if slot + 1 == self.capacity() {
            0
        } else {
            slot + 1
        }
    }

    fn wrap_prev(&self, slot: usize) -> usize {
        if slot == 0 {
            self.capacity() - 1
        } else {
            slot - 1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::VecDeque;

    fn contents(queue: &BoundedQueue<u32>) -> Vec<u32> {
        queue.iter().copied().collect()
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = BoundedQueue::new(8);
        for id in [10, 11, 12] {
            queue.push(id).unwrap();
        }
        assert_eq!(queue.pop(), Some(10));
        assert_eq!(queue.pop(), Some(11));
        assert_eq!(queue.pop(), Some(12));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn test_full_and_empty_flags() {
        let mut queue = BoundedQueue::new(2);
        assert!(queue.is_empty());
        assert!(!queue.is_full());

        queue.push(1).unwrap();
        queue.push(2).unwrap();
        assert!(queue.is_full());
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.push(3), Err(3));

        queue.pop();
        assert!(!queue.is_full());
        queue.pop();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_wraparound_keeps_order() {
        let mut queue = BoundedQueue::new(3);
        for round in 0..10u32 {
            queue.push(round).unwrap();
            queue.push(round + 100).unwrap();
            assert_eq!(queue.pop(), Some(round));
            assert_eq!(queue.pop(), Some(round + 100));
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn test_front_mut_updates_in_place() {
        let mut queue = BoundedQueue::new(4);
        queue.push(300).unwrap();
        *queue.front_mut().unwrap() -= 200;
        assert_eq!(queue.front(), Some(&100));
    }

    #[test]
    fn test_remove_near_head_shifts_head_side() {
        let mut queue = BoundedQueue::new(8);
        for id in 0..6 {
            queue.push(id).unwrap();
        }
        assert_eq!(queue.remove_at(1), Some(1));
        assert_eq!(contents(&queue), vec![0, 2, 3, 4, 5]);
        assert_eq!(queue.pop(), Some(0));
    }

    #[test]
    fn test_remove_near_tail_shifts_tail_side() {
        let mut queue = BoundedQueue::new(8);
        for id in 0..6 {
            queue.push(id).unwrap();
        }
        assert_eq!(queue.remove_at(4), Some(4));
        assert_eq!(contents(&queue), vec![0, 1, 2, 3, 5]);
        queue.push(6).unwrap();
        assert_eq!(contents(&queue), vec![0, 1, 2, 3, 5, 6]);
    }

    #[test]
    fn test_remove_across_wrap_point() {
        let mut queue = BoundedQueue::new(5);
        for id in 0..5 {
            queue.push(id).unwrap();
        }
        queue.pop();
        queue.pop();
        queue.push(5).unwrap();
        queue.push(6).unwrap();
        // Live entries now straddle the end of the slot array
        assert_eq!(contents(&queue), vec![2, 3, 4, 5, 6]);
        assert!(queue.is_full());

        assert_eq!(queue.remove_at(3), Some(5));
        assert_eq!(contents(&queue), vec![2, 3, 4, 6]);
        assert!(!queue.is_full());
        assert_eq!(queue.remove_at(0), Some(2));
        assert_eq!(contents(&queue), vec![3, 4, 6]);
    }

    #[test]
    fn test_remove_last_entry_empties_queue() {
        let mut queue = BoundedQueue::new(3);
        queue.push(9).unwrap();
        assert_eq!(queue.remove_at(0), Some(9));
        assert!(queue.is_empty());
        assert_eq!(queue.remove_at(0), None);
    }

    #[test]
    fn test_position_scans_from_head() {
        let mut queue = BoundedQueue::new(4);
        for id in [7, 8, 7] {
            queue.push(id).unwrap();
        }
        assert_eq!(queue.position(|&id| id == 7), Some(0));
        assert_eq!(queue.position(|&id| id == 8), Some(1));
        assert_eq!(queue.position(|&id| id == 99), None);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Push(u32),
        Pop,
        RemoveAt(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            any::<u32>().prop_map(Op::Push),
            Just(Op::Pop),
            (0usize..12).prop_map(Op::RemoveAt),
        ]
    }

    proptest! {
        #[test]
        fn behaves_like_a_bounded_deque(ops in proptest::collection::vec(op(), 0..200)) {
            let capacity = 7;
            let mut queue = BoundedQueue::new(capacity);
            let mut model = VecDeque::new();

            for op in ops {
                match op {
                    Op::Push(v) => {
                        let accepted = queue.push(v).is_ok();
                        prop_assert_eq!(accepted, model.len() < capacity);
                        if accepted {
                            model.push_back(v);
                        }
                    }
                    Op::Pop => prop_assert_eq!(queue.pop(), model.pop_front()),
                    Op::RemoveAt(i) => prop_assert_eq!(queue.remove_at(i), model.remove(i)),
                }
                prop_assert_eq!(queue.len(), model.len());
                prop_assert_eq!(queue.is_full(), model.len() == capacity);
                prop_assert_eq!(queue.is_empty(), model.is_empty());
                prop_assert_eq!(contents(&queue), model.iter().copied().collect::<Vec<_>>());
            }
        }
    }
}
