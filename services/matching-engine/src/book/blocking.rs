//! Lockable, blocking order book
//!
//! A [`Book`] pairs one container (queue or heap) with the mutex that owns
//! it and two condition variables, "not empty" and "not full". Producers
//! block while the container is full, consumers while it is empty; every
//! wait re-checks its condition in a loop, so spurious wakeups are
//! harmless.
//!
//! All access goes through a [`BookGuard`], which is how the caller proves
//! it holds the book's lock. `Book::try_lock` is the non-waiting attempt
//! the triers use on a counterpart book.

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Condvar, Mutex, MutexGuard};
use thiserror::Error;

use super::{BookKind, BoundedQueue, Priced, PriorityHeap};

/// Errors surfaced by blocking book operations
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookError {
    #[error("{0} book is closed")]
    Closed(BookKind),
}

/// Storage behind a book: insertion, removal of the head/root, and
/// positional removal for cancellation.
pub trait Container {
    type Item;

    fn len(&self) -> usize;
    fn is_empty(&self) -> bool;
    fn is_full(&self) -> bool;

    /// Store an item, handing it back when full
    fn put(&mut self, item: Self::Item) -> Result<(), Self::Item>;

    /// Remove the head (queue) or root (heap)
    fn take(&mut self) -> Option<Self::Item>;

    fn peek(&self) -> Option<&Self::Item>;

    /// Head/root, mutably. Must not change the item's priority.
    fn peek_mut(&mut self) -> Option<&mut Self::Item>;

    /// Linear scan for the first matching item
    fn find<P>(&self, pred: P) -> Option<usize>
    where
        P: FnMut(&Self::Item) -> bool;

    /// Remove the item at an index returned by `find`
    fn remove_at(&mut self, index: usize) -> Option<Self::Item>;

    /// Copy of every item in storage order
    fn items(&self) -> Vec<Self::Item>
    where
        Self::Item: Clone;
}

impl<T> Container for BoundedQueue<T> {
    type Item = T;

    fn len(&self) -> usize {
        BoundedQueue::len(self)
    }

    fn is_empty(&self) -> bool {
        BoundedQueue::is_empty(self)
    }

    fn is_full(&self) -> bool {
        BoundedQueue::is_full(self)
    }

    fn put(&mut self, item: T) -> Result<(), T> {
        self.push(item)
    }

    fn take(&mut self) -> Option<T> {
        self.pop()
    }

    fn peek(&self) -> Option<&T> {
        self.front()
    }

    fn peek_mut(&mut self) -> Option<&mut T> {
        self.front_mut()
    }

    fn find<P>(&self, pred: P) -> Option<usize>
    where
        P: FnMut(&T) -> bool,
    {
        self.position(pred)
    }

    fn remove_at(&mut self, index: usize) -> Option<T> {
        BoundedQueue::remove_at(self, index)
    }

    fn items(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }
}

impl<T: Priced> Container for PriorityHeap<T> {
    type Item = T;

    fn len(&self) -> usize {
        PriorityHeap::len(self)
    }

    fn is_empty(&self) -> bool {
        PriorityHeap::is_empty(self)
    }

    fn is_full(&self) -> bool {
        PriorityHeap::is_full(self)
    }

    fn put(&mut self, item: T) -> Result<(), T> {
        self.insert(item)
    }

    fn take(&mut self) -> Option<T> {
        self.extract_root()
    }

    fn peek(&self) -> Option<&T> {
        self.root()
    }

    fn peek_mut(&mut self) -> Option<&mut T> {
        self.root_mut()
    }

    fn find<P>(&self, pred: P) -> Option<usize>
    where
        P: FnMut(&T) -> bool,
    {
        self.position(pred)
    }

    fn remove_at(&mut self, index: usize) -> Option<T> {
        self.extract_at(index)
    }

    fn items(&self) -> Vec<T>
    where
        T: Clone,
    {
        self.iter().cloned().collect()
    }
}

/// A container guarded by its own mutex and condition variables
#[derive(Debug)]
pub struct Book<C> {
    kind: BookKind,
    store: Mutex<C>,
    not_empty: Condvar,
    not_full: Condvar,
    closed: AtomicBool,
}

impl<C: Container> Book<C> {
    pub fn new(kind: BookKind, store: C) -> Self {
        Self {
            kind,
            store: Mutex::new(store),
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn kind(&self) -> BookKind {
        self.kind
    }

    /// Acquire the book's lock, waiting if another thread holds it
    pub fn lock(&self) -> BookGuard<'_, C> {
        BookGuard {
            book: self,
            store: self.store.lock(),
        }
    }

    /// Acquire the book's lock only if it is free right now
    pub fn try_lock(&self) -> Option<BookGuard<'_, C>> {
        self.store
            .try_lock()
            .map(|store| BookGuard { book: self, store })
    }

    /// Store an item, blocking while the book is full
    pub fn put(&self, item: C::Item) -> Result<(), BookError> {
        self.lock().put(item)
    }

    /// Remove the head/root, blocking while the book is empty
    pub fn take(&self) -> Result<C::Item, BookError> {
        self.lock().take()
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    /// Copy of the book's contents in storage order
    pub fn snapshot(&self) -> Vec<C::Item>
    where
        C::Item: Clone,
    {
        self.store.lock().items()
    }

    /// Close the book and wake every waiter
    ///
    /// A closed book accepts no new items, and blocked and future waits
    /// return [`BookError::Closed`]. Removal without waiting keeps working
    /// so workers can finish the step they are in.
    pub fn close(&self) {
        // Taken so no waiter can miss the flag between its check and its wait
        let _store = self.store.lock();
        self.closed.store(true, Ordering::Release);
        self.not_empty.notify_all();
        self.not_full.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Proof of holding a book's lock
///
/// Read access goes through `Deref`; every mutation is a method here so
/// the matching condition variable is signalled.
pub struct BookGuard<'a, C> {
    book: &'a Book<C>,
    store: MutexGuard<'a, C>,
}

impl<'a, C: Container> BookGuard<'a, C> {
    pub fn kind(&self) -> BookKind {
        self.book.kind
    }

    /// Block until the book holds at least one item
    pub fn wait_until_not_empty(&mut self) -> Result<(), BookError> {
        while self.store.is_empty() {
            if self.book.is_closed() {
                return Err(BookError::Closed(self.book.kind));
            }
            self.book.not_empty.wait(&mut self.store);
        }
        Ok(())
    }

    /// Block until the book has room for one more item
    pub fn wait_until_not_full(&mut self) -> Result<(), BookError> {
        while self.store.is_full() {
            if self.book.is_closed() {
                return Err(BookError::Closed(self.book.kind));
            }
            self.book.not_full.wait(&mut self.store);
        }
        Ok(())
    }

    /// Store an item, blocking while the book is full
    pub fn put(&mut self, item: C::Item) -> Result<(), BookError> {
        if self.book.is_closed() {
            return Err(BookError::Closed(self.book.kind));
        }
        self.wait_until_not_full()?;
        if self.store.put(item).is_err() {
            // Unreachable: we hold the lock and just saw free capacity
            debug_assert!(false, "{} book full after wait", self.book.kind);
            return Err(BookError::Closed(self.book.kind));
        }
        self.book.not_empty.notify_one();
        Ok(())
    }

    /// Remove the head/root, blocking while the book is empty
    pub fn take(&mut self) -> Result<C::Item, BookError> {
        self.wait_until_not_empty()?;
        match self.remove_head() {
            Some(item) => Ok(item),
            None => Err(BookError::Closed(self.book.kind)),
        }
    }

    /// Remove the head/root without waiting
    pub fn remove_head(&mut self) -> Option<C::Item> {
        let item = self.store.take();
        if item.is_some() {
            self.book.not_full.notify_one();
        }
        item
    }

    /// Remove the item at `index` (from [`Container::find`]) without waiting
    pub fn remove_at(&mut self, index: usize) -> Option<C::Item> {
        let item = self.store.remove_at(index);
        if item.is_some() {
            self.book.not_full.notify_one();
        }
        item
    }

    /// Head/root, mutably. Must not change the item's priority.
    pub fn head_mut(&mut self) -> Option<&mut C::Item> {
        self.store.peek_mut()
    }
}

impl<C> Deref for BookGuard<'_, C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.store
    }
}
