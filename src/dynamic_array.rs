//! DynamicArray: contiguous, index-addressed sequence that grows by doubling.
//!
//! Storage is a boxed slice of `Option<E>` whose length is the capacity.
//! Slots `[0, len)` are always `Some`, slots `[len, capacity)` are always
//! `None`. Growth allocates a fresh slice of `max(2 * capacity, required)`
//! slots and moves the live prefix over; the buffer never shrinks.

use crate::error::ContainerError;
use crate::revision::{CursorState, FailFast, Revision};
use crate::sized::{ElementCount, SizedContainer};
use core::fmt;
use core::marker::PhantomData;

fn vacant_slots<E>(n: usize) -> Box<[Option<E>]> {
    core::iter::repeat_with(|| None).take(n).collect()
}

pub struct DynamicArray<E> {
    slots: Box<[Option<E>]>,
    count: ElementCount,
    revision: Revision,
}

impl<E> DynamicArray<E> {
    pub const DEFAULT_CAPACITY: usize = 10;

    pub fn new() -> Self {
        Self {
            slots: vacant_slots(Self::DEFAULT_CAPACITY),
            count: ElementCount::new(),
            revision: Revision::new(),
        }
    }

    /// Create an array with room for `capacity` elements. Zero is rejected.
    pub fn with_capacity(capacity: usize) -> Result<Self, ContainerError> {
        if capacity == 0 {
            return Err(ContainerError::InvalidArgument(
                "initial capacity must be > 0",
            ));
        }
        Ok(Self {
            slots: vacant_slots(capacity),
            count: ElementCount::new(),
            revision: Revision::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.count.get()
    }
    pub fn is_empty(&self) -> bool {
        self.count.get() == 0
    }
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn ensure_capacity(&mut self, required: usize) {
        let capacity = self.slots.len();
        if required <= capacity {
            return;
        }
        let new_capacity = capacity.saturating_mul(2).max(required);
        let len = self.len();
        let mut grown = vacant_slots(new_capacity);
        for (dst, src) in grown.iter_mut().zip(self.slots[..len].iter_mut()) {
            *dst = src.take();
        }
        self.slots = grown;
        tracing::debug!(
            old_capacity = capacity,
            new_capacity,
            len,
            "grew dynamic array backing buffer"
        );
    }

    /// Append at the end. Amortized O(1).
    pub fn push(&mut self, element: E) {
        let len = self.len();
        self.ensure_capacity(len + 1);
        self.slots[len] = Some(element);
        self.count.increase();
        self.revision.bump();
    }

    /// Insert at `index` in `[0, len]`, shifting the tail one slot right.
    pub fn insert(&mut self, index: usize, element: E) -> Result<(), ContainerError> {
        let len = self.len();
        if index > len {
            return Err(ContainerError::OutOfRange { index, len });
        }
        self.ensure_capacity(len + 1);
        self.slots[len] = Some(element);
        self.slots[index..=len].rotate_right(1);
        self.count.increase();
        self.revision.bump();
        Ok(())
    }

    pub fn get(&self, index: usize) -> Result<&E, ContainerError> {
        let len = self.len();
        self.slots[..len]
            .get(index)
            .and_then(Option::as_ref)
            .ok_or(ContainerError::OutOfRange { index, len })
    }

    /// Mutable access to a live element. Not a structural change.
    pub fn get_mut(&mut self, index: usize) -> Result<&mut E, ContainerError> {
        let len = self.len();
        self.slots[..len]
            .get_mut(index)
            .and_then(Option::as_mut)
            .ok_or(ContainerError::OutOfRange { index, len })
    }

    /// Replace the element at `index`, returning the old one. Live cursors
    /// stay valid.
    pub fn set(&mut self, index: usize, element: E) -> Result<E, ContainerError> {
        let slot = self.get_mut(index)?;
        Ok(core::mem::replace(slot, element))
    }

    /// Remove the element at `index`, shifting the tail one slot left.
    pub fn remove(&mut self, index: usize) -> Result<E, ContainerError> {
        let len = self.len();
        let removed = self.slots[..len]
            .get_mut(index)
            .and_then(Option::take)
            .ok_or(ContainerError::OutOfRange { index, len })?;
        // The vacated slot rotates to the end of the live prefix.
        self.slots[index..len].rotate_left(1);
        self.count.decrease();
        self.revision.bump();
        Ok(removed)
    }

    pub fn index_of(&self, element: &E) -> Option<usize>
    where
        E: PartialEq,
    {
        self.iter().position(|e| e == element)
    }

    pub fn contains(&self, element: &E) -> bool
    where
        E: PartialEq,
    {
        self.index_of(element).is_some()
    }

    /// Drop all elements and reset the length. Capacity is unchanged.
    pub fn clear(&mut self) {
        let len = self.len();
        for slot in self.slots[..len].iter_mut() {
            *slot = None;
        }
        self.count.reset();
        self.revision.bump();
        tracing::trace!(dropped = len, capacity = self.slots.len(), "cleared dynamic array");
    }

    pub fn iter(&self) -> Iter<'_, E> {
        Iter {
            it: self.slots[..self.len()].iter(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, E> {
        let len = self.len();
        IterMut {
            it: self.slots[..len].iter_mut(),
        }
    }

    /// Fail-fast cursor positioned before the first element.
    pub fn cursor(&self) -> ArrayCursor<E> {
        ArrayCursor {
            next: 0,
            last: None,
            fail_fast: FailFast::new(&self.revision),
            _pd: PhantomData,
        }
    }
}

impl<E> Default for DynamicArray<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> SizedContainer for DynamicArray<E> {
    fn len(&self) -> usize {
        DynamicArray::len(self)
    }
    fn clear(&mut self) {
        DynamicArray::clear(self)
    }
}

impl<E: Clone> Clone for DynamicArray<E> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            count: self.count,
            revision: Revision::new(),
        }
    }
}

impl<E: PartialEq> PartialEq for DynamicArray<E> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<E: Eq> Eq for DynamicArray<E> {}

impl<E: fmt::Debug> fmt::Debug for DynamicArray<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<E: fmt::Display> fmt::Display for DynamicArray<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, e) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", e)?;
        }
        f.write_str("]")
    }
}

impl<E> Extend<E> for DynamicArray<E> {
    fn extend<I: IntoIterator<Item = E>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        self.ensure_capacity(self.len().saturating_add(lower));
        for e in iter {
            self.push(e);
        }
    }
}

impl<E> FromIterator<E> for DynamicArray<E> {
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        let mut array = Self::new();
        array.extend(iter);
        array
    }
}

impl<'a, E> IntoIterator for &'a DynamicArray<E> {
    type Item = &'a E;
    type IntoIter = Iter<'a, E>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<E> IntoIterator for DynamicArray<E> {
    type Item = E;
    type IntoIter = IntoIter<E>;
    fn into_iter(self) -> Self::IntoIter {
        let len = self.len();
        let mut slots = Vec::from(self.slots);
        slots.truncate(len);
        IntoIter {
            it: slots.into_iter(),
        }
    }
}

/// Borrowing iterator in index order.
pub struct Iter<'a, E> {
    it: core::slice::Iter<'a, Option<E>>,
}

impl<'a, E> Iterator for Iter<'a, E> {
    type Item = &'a E;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().and_then(Option::as_ref)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<E> ExactSizeIterator for Iter<'_, E> {}

/// Mutable borrowing iterator in index order.
pub struct IterMut<'a, E> {
    it: core::slice::IterMut<'a, Option<E>>,
}

impl<'a, E> Iterator for IterMut<'a, E> {
    type Item = &'a mut E;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().and_then(Option::as_mut)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<E> ExactSizeIterator for IterMut<'_, E> {}

/// Owning iterator in index order.
pub struct IntoIter<E> {
    it: std::vec::IntoIter<Option<E>>,
}

impl<E> Iterator for IntoIter<E> {
    type Item = E;
    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().flatten()
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<E> ExactSizeIterator for IntoIter<E> {}

/// Detached, fail-fast cursor over a `DynamicArray`.
///
/// The cursor holds no borrow; each call takes the array it was created
/// from. Any structural change made to the array other than through
/// `remove` on this cursor makes the next call fail with
/// `ContainerError::ConcurrentModification`, and the cursor stays unusable.
pub struct ArrayCursor<E> {
    next: usize,
    last: Option<usize>,
    fail_fast: FailFast,
    _pd: PhantomData<fn() -> E>,
}

impl<E> ArrayCursor<E> {
    pub fn state(&self) -> CursorState {
        self.fail_fast.state()
    }

    /// Yield the next element, or `Ok(None)` once the array is exhausted.
    pub fn next<'a>(
        &mut self,
        array: &'a DynamicArray<E>,
    ) -> Result<Option<&'a E>, ContainerError> {
        self.fail_fast.check(&array.revision)?;
        match array.get(self.next) {
            Ok(e) => {
                self.last = Some(self.next);
                self.next += 1;
                self.fail_fast.yielded();
                Ok(Some(e))
            }
            Err(_) => {
                self.last = None;
                self.fail_fast.exhausted();
                Ok(None)
            }
        }
    }

    /// Remove the element most recently yielded by `next`. Iteration
    /// continues with the element that followed it.
    pub fn remove(&mut self, array: &mut DynamicArray<E>) -> Result<E, ContainerError> {
        self.fail_fast.check(&array.revision)?;
        let index = self.last.take().ok_or(ContainerError::IllegalState)?;
        let removed = array.remove(index)?;
        self.next = index;
        self.fail_fast.refresh(&array.revision);
        Ok(removed)
    }
}

impl<E> fmt::Debug for ArrayCursor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayCursor")
            .field("next", &self.next)
            .field("last", &self.last)
            .field("state", &self.fail_fast.state())
            .finish()
    }
}
