//! The conditional reader-writer lock guarding a single field of a node.
//!
//! Each mutable field of a tree node (the two child edges and the logical state) has its own
//! [`ConditionalLock`]. Besides plain shared and exclusive locking, the lock can be acquired
//! *only if* the guarded field currently holds an expected value. This lets the tree validate
//! what it observed during a lock-free descent and lock it in one step.
//!
//! # Encoding
//!
//! The lock is a stamped value: the field itself plus a stamp word living right next to it. The
//! stamp is `0` when free, has the [`Stamp::WRITER`] bit set when held exclusively and otherwise
//! counts the readers in units of [`READER`] (so a reader stamp is always a positive even
//! number). The field is only ever written while the stamp says exclusive, which is what makes
//! the check-lock-recheck sequence of the conditional acquisition sound: once the lock is held,
//! the field can't change under our hands, so re-reading it tells the truth.
//!
//! All the `try_*` methods fail fast. The blocking ones spin (with backoff) until they succeed.

use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};

use bitflags::bitflags;
use crossbeam_epoch::{self, Atomic};
use crossbeam_utils::Backoff;

bitflags! {
    /// Flag bits of the lock stamp.
    ///
    /// Everything above these bits is the reader count.
    struct Stamp: usize {
        /// The lock is held exclusively.
        const WRITER = 0b1;
    }
}

/// The amount a single reader adds to the stamp.
const READER: usize = 0b10;

fn write_locked(stamp: usize) -> bool {
    Stamp::from_bits_truncate(stamp).contains(Stamp::WRITER)
}

/// A field that can be guarded by a [`ConditionalLock`].
///
/// The lock needs to compare the current content of the field with what the caller expects.
/// The snapshot needs to be cheap to take and compare, it is usually a plain word.
pub trait Field {
    /// The comparable snapshot of the field content.
    type Value: Copy + Eq;

    /// Reads the current content of the field.
    fn current(&self) -> Self::Value;
}

impl<T> Field for Atomic<T> {
    type Value = *const T;

    fn current(&self) -> *const T {
        // We only compare the address, it is never dereferenced. Therefore we don't need to be
        // pinned to look at it.
        unsafe {
            self.load(Ordering::Acquire, crossbeam_epoch::unprotected())
                .as_raw()
        }
    }
}

/// A reader-writer lock over one field, with acquisition conditioned on the field value.
///
/// The field is reachable for reading through [`Deref`] at any time, without locking (the tree
/// does its descents that way). Modifications are allowed only while holding a [`WriteGuard`].
#[derive(Debug, Default)]
pub struct ConditionalLock<F> {
    field: F,
    stamp: AtomicUsize,
}

impl<F> ConditionalLock<F> {
    /// Wraps a field into a free lock.
    pub fn new(field: F) -> Self {
        Self {
            field,
            stamp: AtomicUsize::new(0),
        }
    }

    /// Tries to get a shared lock.
    ///
    /// Fails only if there's a writer. Other readers coming and going don't make it fail.
    pub fn try_read_lock(&self) -> Option<ReadGuard<'_, F>> {
        let mut stamp = self.stamp.load(Ordering::Relaxed);
        loop {
            if write_locked(stamp) {
                return None;
            }
            match self.stamp.compare_exchange_weak(
                stamp,
                stamp + READER,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Some(ReadGuard { lock: self }),
                Err(now) => stamp = now,
            }
        }
    }

    /// Tries to get the exclusive lock. Fails if anyone holds the lock in any mode.
    pub fn try_write_lock(&self) -> Option<WriteGuard<'_, F>> {
        self.stamp
            .compare_exchange(0, Stamp::WRITER.bits(), Ordering::Acquire, Ordering::Relaxed)
            .ok()
            .map(|_| WriteGuard { lock: self })
    }

    /// Gets a shared lock, spinning until no writer holds it.
    pub fn read_lock(&self) -> ReadGuard<'_, F> {
        let backoff = Backoff::new();
        loop {
            if let Some(guard) = self.try_read_lock() {
                return guard;
            }
            backoff.snooze();
        }
    }

    /// Gets the exclusive lock, spinning until it is free.
    pub fn write_lock(&self) -> WriteGuard<'_, F> {
        let backoff = Backoff::new();
        loop {
            if let Some(guard) = self.try_write_lock() {
                return guard;
            }
            backoff.snooze();
        }
    }

    fn unlock_read(&self) {
        let prev = self.stamp.fetch_sub(READER, Ordering::Release);
        debug_assert!(
            prev >= READER && !write_locked(prev),
            "BUG: Released a read lock nobody held"
        );
    }

    fn unlock_write(&self) {
        let prev = self.stamp.swap(0, Ordering::Release);
        debug_assert_eq!(
            prev,
            Stamp::WRITER.bits(),
            "BUG: Released a write lock nobody held"
        );
    }

    /// Is the lock held in any mode right now?
    pub fn is_locked(&self) -> bool {
        self.stamp.load(Ordering::Relaxed) != 0
    }

    /// The number of readers currently holding the lock.
    pub fn readers(&self) -> usize {
        let stamp = self.stamp.load(Ordering::Relaxed);
        if write_locked(stamp) {
            0
        } else {
            stamp / READER
        }
    }
}

impl<F: Field> ConditionalLock<F> {
    /// Gets a shared lock if the field satisfies the predicate.
    ///
    /// The predicate is checked both before locking (to fail early) and after, while the lock
    /// is already held. If the second check fails, the lock is released before returning, so a
    /// returned guard always covers a value that satisfies the predicate.
    pub fn try_read_lock_if<P>(&self, pred: P) -> Option<ReadGuard<'_, F>>
    where
        P: Fn(F::Value) -> bool,
    {
        if !pred(self.field.current()) {
            return None;
        }
        let guard = self.try_read_lock()?;
        if pred(self.field.current()) {
            Some(guard)
        } else {
            None
        }
    }

    /// Gets the exclusive lock if the field satisfies the predicate.
    ///
    /// Same validation rules as with [`try_read_lock_if`][ConditionalLock::try_read_lock_if].
    pub fn try_write_lock_if<P>(&self, pred: P) -> Option<WriteGuard<'_, F>>
    where
        P: Fn(F::Value) -> bool,
    {
        if !pred(self.field.current()) {
            return None;
        }
        let guard = self.try_write_lock()?;
        if pred(self.field.current()) {
            Some(guard)
        } else {
            None
        }
    }

    /// Gets a shared lock if the field holds exactly the expected value.
    pub fn try_conditional_read_lock(&self, expected: F::Value) -> Option<ReadGuard<'_, F>> {
        self.try_read_lock_if(|current| current == expected)
    }

    /// Gets the exclusive lock if the field holds exactly the expected value.
    pub fn try_conditional_write_lock(&self, expected: F::Value) -> Option<WriteGuard<'_, F>> {
        self.try_write_lock_if(|current| current == expected)
    }

    /// Picks the lock mode by the current value of the field.
    ///
    /// A shared lock is taken if the field holds `read_on`, the exclusive one if it holds
    /// `write_on`. Anything else, a held lock or the value changing in between, fails.
    pub fn multi_conditional_lock(
        &self,
        read_on: F::Value,
        write_on: F::Value,
    ) -> Option<MultiGuard<'_, F>> {
        let current = self.field.current();
        if current == read_on {
            self.try_conditional_read_lock(read_on)
                .map(MultiGuard::Read)
        } else if current == write_on {
            self.try_conditional_write_lock(write_on)
                .map(MultiGuard::Write)
        } else {
            None
        }
    }
}

impl<F> Deref for ConditionalLock<F> {
    type Target = F;
    fn deref(&self) -> &F {
        &self.field
    }
}

/// Shared access to a [`ConditionalLock`], released on drop.
#[must_use = "The lock is released right away if the guard is not kept"]
pub struct ReadGuard<'a, F> {
    lock: &'a ConditionalLock<F>,
}

impl<F> ReadGuard<'_, F> {
    /// Releases the lock.
    pub fn unlock(self) {
        drop(self);
    }
}

impl<F> Deref for ReadGuard<'_, F> {
    type Target = F;
    fn deref(&self) -> &F {
        &self.lock.field
    }
}

impl<F> Drop for ReadGuard<'_, F> {
    fn drop(&mut self) {
        self.lock.unlock_read();
    }
}

/// Exclusive access to a [`ConditionalLock`], released on drop.
#[must_use = "The lock is released right away if the guard is not kept"]
pub struct WriteGuard<'a, F> {
    lock: &'a ConditionalLock<F>,
}

impl<F> WriteGuard<'_, F> {
    /// Releases the lock.
    pub fn unlock(self) {
        drop(self);
    }
}

impl<F> Deref for WriteGuard<'_, F> {
    type Target = F;
    fn deref(&self) -> &F {
        &self.lock.field
    }
}

impl<F> Drop for WriteGuard<'_, F> {
    fn drop(&mut self) {
        self.lock.unlock_write();
    }
}

/// The outcome of [`multi_conditional_lock`][ConditionalLock::multi_conditional_lock].
pub enum MultiGuard<'a, F> {
    /// The field held the value asking for a shared lock.
    Read(ReadGuard<'a, F>),
    /// The field held the value asking for the exclusive lock.
    Write(WriteGuard<'a, F>),
}
