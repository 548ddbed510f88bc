//! Fixed-capacity circular buffer used as the storage backend for clock
//! traces and variable histories.
//!
//! Pushing onto a full buffer silently overwrites the oldest element. All
//! of push, pop and index are O(1). Slots are allocated as the buffer fills,
//! so a large capacity costs nothing until it is used. Iteration runs in logical order, oldest
//! first, and equality, ordering and hashing are defined over that logical
//! sequence rather than over the physical slot layout, so two buffers that
//! went through different overwrite histories still compare equal when
//! they hold the same values.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Clone)]
pub struct RingBuffer<T> {
    slots: Vec<Option<T>>,
    capacity: usize,
    start: usize,
    len: usize,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "a ring buffer needs room for at least one element");
        Self {
            slots: Vec::new(),
            capacity,
            start: 0,
            len: 0,
        }
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }
    fn slot(&self, index: usize) -> usize {
        // start and index are both below capacity
        let room = self.capacity - self.start;
        if index < room { self.start + index } else { index - room }
    }
    fn put(&mut self, slot: usize, value: T) {
        if slot >= self.slots.len() {
            self.slots.resize_with(slot + 1, || None);
        }
        self.slots[slot] = Some(value);
    }
    fn advance_start(&mut self) {
        self.start = if self.start + 1 == self.capacity { 0 } else { self.start + 1 };
    }
    /// Appends a value, overwriting the oldest one when the buffer is full.
    pub fn push(&mut self, value: T) {
        if self.is_full() {
            let oldest = self.start;
            self.put(oldest, value);
            self.advance_start();
        } else {
            let free = self.slot(self.len);
            self.put(free, value);
            self.len += 1;
        }
    }
    pub fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let value = self.slots.get_mut(self.start).and_then(Option::take);
        self.advance_start();
        self.len -= 1;
        value
    }
    pub fn pop_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let last = self.slot(self.len - 1);
        self.len -= 1;
        self.slots.get_mut(last).and_then(Option::take)
    }
    /// Logical index, 0 is the oldest retained element.
    pub fn get(&self, index: usize) -> Option<&T> {
        if index < self.len {
            self.slots.get(self.slot(index)).and_then(Option::as_ref)
        } else {
            None
        }
    }
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if index < self.len {
            let slot = self.slot(index);
            self.slots.get_mut(slot).and_then(Option::as_mut)
        } else {
            None
        }
    }
    /// Index counted backwards from the newest element, 0 is the newest.
    pub fn recent(&self, depth: usize) -> Option<&T> {
        if depth < self.len {
            self.get(self.len - 1 - depth)
        } else {
            None
        }
    }
    pub fn front(&self) -> Option<&T> {
        self.get(0)
    }
    pub fn back(&self) -> Option<&T> {
        self.recent(0)
    }
    pub fn back_mut(&mut self) -> Option<&mut T> {
        match self.len {
            0 => None,
            len => self.get_mut(len - 1),
        }
    }
    pub fn clear(&mut self) {
        while self.pop_front().is_some() {}
        self.start = 0;
    }
    pub fn iter(&self) -> Iter<'_, T> {
        Iter { buffer: self, next: 0 }
    }
}

pub struct Iter<'a, T> {
    buffer: &'a RingBuffer<T>,
    next: usize,
}
impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;
    fn next(&mut self) -> Option<Self::Item> {
        let item = self.buffer.get(self.next)?;
        self.next += 1;
        Some(item)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.buffer.len() - self.next;
        (remaining, Some(remaining))
    }
}
impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a RingBuffer<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: PartialEq> PartialEq for RingBuffer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}
impl<T: Eq> Eq for RingBuffer<T> {}
impl<T: Ord> Ord for RingBuffer<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iter().cmp(other.iter())
    }
}
impl<T: Ord> PartialOrd for RingBuffer<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl<T: Hash> Hash for RingBuffer<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len.hash(state);
        for value in self.iter() {
            value.hash(state);
        }
    }
}
impl<T: fmt::Debug> fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_around_physical_slots() {
        let mut ring = RingBuffer::new(3);
        for i in 0..7 {
            ring.push(i);
        }
        // start has moved past the physical end at least twice
        assert_eq!(ring.start, 1);
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![4, 5, 6]);
    }

    #[test]
    fn equality_ignores_layout() {
        let mut a = RingBuffer::new(2);
        a.push(1);
        a.push(2);
        a.push(3);
        let mut b = RingBuffer::new(2);
        b.push(2);
        b.push(3);
        assert_ne!(a.start, b.start);
        assert_eq!(a, b);
    }

    #[test]
    fn slots_grow_with_use() {
        let mut ring = RingBuffer::new(usize::MAX);
        ring.push(1);
        ring.push(2);
        assert_eq!(ring.slots.len(), 2);
        assert_eq!(ring.recent(usize::MAX - 1), None);
        assert_eq!(ring.recent(1), Some(&1));
    }
}
