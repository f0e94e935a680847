use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A single stack slot, owning the slot beneath it.
struct Entry<T> {
    value: T,
    below: Option<Box<Entry<T>>>,
}

/// Last-in-first-out store used as a work-list for iterative tree walks.
///
/// `push` and `pop` are serialized by one lock. `len` and `is_empty` read an
/// atomic counter without taking the lock, so under concurrent mutation they
/// may observe a value that is already stale. Callers in this crate only
/// drive a stack from one task at a time.
pub struct Stack<T> {
    top: Mutex<Option<Box<Entry<T>>>>,
    length: AtomicUsize,
}

impl<T> Stack<T> {
    pub fn new() -> Self {
        Self {
            top: Mutex::new(None),
            length: AtomicUsize::new(0),
        }
    }

    pub fn push(&self, value: T) {
        let mut top = self.lock();
        let below = top.take();
        *top = Some(Box::new(Entry { value, below }));
        self.length.fetch_add(1, Ordering::Relaxed);
    }

    /// Removes the top value. An empty stack yields `None` rather than failing.
    pub fn pop(&self) -> Option<T> {
        let mut top = self.lock();
        let entry = top.take()?;
        let Entry { value, below } = *entry;
        *top = below;
        self.length.fetch_sub(1, Ordering::Relaxed);
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.length.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Option<Box<Entry<T>>>> {
        self.top.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: Clone> Stack<T> {
    /// Returns a copy of the top value without removing it.
    pub fn peek(&self) -> Option<T> {
        self.lock().as_ref().map(|entry| entry.value.clone())
    }
}

impl<T> Default for Stack<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Stack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stack").field("length", &self.len()).finish()
    }
}

impl<T> Drop for Stack<T> {
    // Unlink iteratively; the default drop of a long entry chain recurses once per entry.
    fn drop(&mut self) {
        let top = self.top.get_mut().unwrap_or_else(PoisonError::into_inner);
        let mut next = top.take();
        while let Some(mut entry) = next {
            next = entry.below.take();
        }
    }
}
