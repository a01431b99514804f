//! Tree vertices and the small types describing them.

use std::borrow::Borrow;
use std::cmp::Ordering as CmpOrdering;
use std::sync::atomic::{AtomicU8, Ordering};

use crossbeam_epoch::{self, Atomic, Guard, Owned, Shared};

use super::config::Config;
use super::lock::{ConditionalLock, Field};

/// The logical state of a tree node.
///
/// The only transitions are `Data -> Routing`, `Routing -> Data` and from either of them to
/// `Deleted`. Once deleted, a node stays deleted.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum State {
    /// The key is present and the node holds its value.
    Data = 0,
    /// The key is absent, but the node still routes between its two children.
    Routing = 1,
    /// The node has been unlinked from the tree.
    Deleted = 2,
}

impl State {
    /// Is the node still part of the tree?
    pub fn is_live(self) -> bool {
        self != State::Deleted
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => State::Data,
            1 => State::Routing,
            2 => State::Deleted,
            _ => unreachable!("BUG: Invalid node state {}", raw),
        }
    }
}

/// The atomic cell with a node [`State`].
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: State) -> Self {
        StateCell(AtomicU8::new(state as u8))
    }

    /// Reads the state.
    pub fn load(&self) -> State {
        State::from_raw(self.0.load(Ordering::Acquire))
    }

    /// Only ever called with the write lock of the cell held.
    pub(crate) fn store(&self, state: State) {
        self.0.store(state as u8, Ordering::Release);
    }
}

impl Field for StateCell {
    type Value = State;
    fn current(&self) -> State {
        self.load()
    }
}

/// A side of a node.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Dir {
    /// Towards smaller keys.
    Left,
    /// Towards larger keys.
    Right,
}

impl Dir {
    pub(crate) fn flip(self) -> Self {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

/// The key of a node.
///
/// The root sentinel has a key larger than anything, so all the real nodes live in its left
/// subtree.
pub(crate) enum Key<K> {
    Fin(K),
    Inf,
}

impl<K> Key<K> {
    /// Where to look for `key` when standing on a node with this key.
    ///
    /// Returns `None` if this is the node.
    pub(crate) fn direction<Q>(&self, key: &Q) -> Option<Dir>
    where
        K: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        match self {
            Key::Inf => Some(Dir::Left),
            Key::Fin(own) => match Ord::cmp(key, own.borrow()) {
                CmpOrdering::Less => Some(Dir::Left),
                CmpOrdering::Greater => Some(Dir::Right),
                CmpOrdering::Equal => None,
            },
        }
    }

    pub(crate) fn finite(&self) -> Option<&K> {
        match self {
            Key::Fin(key) => Some(key),
            Key::Inf => None,
        }
    }
}

/// A child pointer together with its lock.
pub(crate) type Edge<C> = ConditionalLock<Atomic<Node<C>>>;

/// A vertex of the tree.
///
/// The key never changes. The value and the state are guarded by the `state` lock, each of the
/// child pointers by its own lock. Nothing is ever written into a node without holding the
/// corresponding write lock, but all of it can be read lock-free.
pub(crate) struct Node<C: Config> {
    pub(crate) key: Key<C::Key>,
    pub(crate) value: Atomic<C::Value>,
    pub(crate) state: ConditionalLock<StateCell>,
    pub(crate) left: Edge<C>,
    pub(crate) right: Edge<C>,
}

impl<C: Config> Node<C> {
    /// The non-removable anchor of the tree.
    pub(crate) fn sentinel() -> Self {
        Node {
            key: Key::Inf,
            value: Atomic::null(),
            state: ConditionalLock::new(StateCell::new(State::Data)),
            left: ConditionalLock::new(Atomic::null()),
            right: ConditionalLock::new(Atomic::null()),
        }
    }

    /// A fresh leaf with data.
    pub(crate) fn new(key: C::Key, value: Owned<C::Value>) -> Self {
        Node {
            key: Key::Fin(key),
            value: Atomic::from(value),
            state: ConditionalLock::new(StateCell::new(State::Data)),
            left: ConditionalLock::new(Atomic::null()),
            right: ConditionalLock::new(Atomic::null()),
        }
    }

    pub(crate) fn child(&self, dir: Dir) -> &Edge<C> {
        match dir {
            Dir::Left => &self.left,
            Dir::Right => &self.right,
        }
    }

    /// Under which edge of this node the given node belongs.
    pub(crate) fn side_of(&self, child: &Node<C>) -> Dir {
        let key = child
            .key
            .finite()
            .expect("BUG: The sentinel is nobody's child");
        self.key
            .direction(key)
            .expect("BUG: Two nodes with the same key")
    }

    /// Takes the value out of the node, scheduling it for destruction.
    ///
    /// # Safety
    ///
    /// The caller must hold the write lock of the state and the node must hold a value.
    pub(crate) unsafe fn retire_value<'g>(&self, pin: &'g Guard) -> Shared<'g, C::Value> {
        debug_assert!(self.state.is_locked(), "BUG: Value taken without a lock");
        let value = self.value.swap(Shared::null(), Ordering::AcqRel, pin);
        assert!(!value.is_null(), "BUG: Data node without a value");
        pin.defer_destroy(value);
        value
    }
}

impl<C: Config> Drop for Node<C> {
    fn drop(&mut self) {
        // We have &mut, so nobody else is looking. Either the epoch passed or the tree is being
        // torn down.
        unsafe {
            let value = self
                .value
                .load(Ordering::Relaxed, crossbeam_epoch::unprotected());
            if !value.is_null() {
                drop(value.into_owned());
            }
        }
    }
}
