//! The core implementation of the concurrent search tree.
//!
//! This module contains the [`Raw`][crate::raw::Raw] type, which is the engine of all the data
//! structures in this crate. This is exposed to allow wrapping it into further APIs, but is
//! probably not the best thing for general use.
//!
//! # How it works
//!
//! It is an unbalanced binary search tree, where every mutable field of every node (the two
//! child edges and the logical [`State`]) has its own [`ConditionalLock`][lock::ConditionalLock].
//!
//! * Searching is lock-free. A descent never takes a lock and never retries.
//! * Inserting hangs a new leaf under an empty edge, or revives a routing node with the same key.
//! * Removing a node with two children only turns it into a *routing* node. It keeps directing
//!   the searches, but its key is absent. A node with at most one child is unlinked.
//! * When the last data child of a routing node goes away, the routing node is unlinked together
//!   with it, splicing the remaining sibling under the grandparent.
//!
//! Keys never change and a node only ever moves up, when its parent is unlinked. So the range of
//! keys a live node covers only grows and any live node seen during a descent is a valid place to
//! continue from. The mutators validate what they saw during the descent by
//! locking the fields *conditionally* on the values they expect. If anything changed in between,
//! everything acquired so far is released and the operation retries from the deepest ancestor
//! that is still part of the tree. Every lock in the protocol is taken with a non-blocking try, so
//! there's no lock order to get wrong and no deadlock.

use std::borrow::Borrow;
use std::ptr;
use std::sync::atomic::Ordering;

use crossbeam_epoch::{self, Atomic, Guard, Owned, Shared};
use crossbeam_utils::Backoff;
use smallvec::SmallVec;

pub mod config;
pub mod debug;
pub mod lock;
mod node;

use self::config::Config;
use self::lock::{MultiGuard, WriteGuard};
pub use self::node::{Dir, State, StateCell};
use self::node::Node;

/// How many ancestors a cursor keeps before spilling to the heap.
const PATH_INLINE: usize = 32;

fn is_deleted<C: Config>(node: Shared<Node<C>>) -> bool {
    unsafe { node.deref() }.state.load() == State::Deleted
}

/// Where a descent ended.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Position {
    /// On the node with the searched key.
    Found,
    /// On the node under which the key would hang, at the given (empty) edge.
    Vacant(Dir),
}

/// A position in the tree with the path that led there.
///
/// The ancestors are only a hint. They were valid during the descent, but may have been unlinked
/// since. Whatever the cursor claims is always validated by a conditional lock before acting on
/// it.
struct Cursor<'g, C: Config> {
    ancestors: SmallVec<[Shared<'g, Node<C>>; PATH_INLINE]>,
    current: Shared<'g, Node<C>>,
}

impl<'g, C: Config> Cursor<'g, C> {
    fn new(root: Shared<'g, Node<C>>) -> Self {
        Cursor {
            ancestors: SmallVec::new(),
            current: root,
        }
    }

    fn node(&self) -> &'g Node<C> {
        unsafe { self.current.deref() }
    }

    fn parent_ptr(&self) -> Shared<'g, Node<C>> {
        *self
            .ancestors
            .last()
            .expect("BUG: Looking for the parent of the root sentinel")
    }

    fn parent(&self) -> &'g Node<C> {
        unsafe { self.parent_ptr().deref() }
    }

    /// Descends towards the key, without any locking.
    fn find<Q>(&mut self, key: &Q, pin: &'g Guard) -> Position
    where
        C::Key: Borrow<Q>,
        Q: ?Sized + Ord,
    {
        loop {
            let node = self.node();
            let dir = match node.key.direction(key) {
                Some(dir) => dir,
                None => return Position::Found,
            };
            let child = node.child(dir).load(Ordering::Acquire, pin);
            if child.is_null() {
                return Position::Vacant(dir);
            }
            self.ancestors.push(self.current);
            self.current = child;
        }
    }

    /// Climbs up to the deepest place on the path that is still part of the tree.
    ///
    /// A node can get out of the tree only by being deleted, and a live node only moves up. So
    /// continuing from a live ancestor is as good as starting from the root.
    fn rewind(&mut self) {
        if let Some(idx) = self.ancestors.iter().position(|a| is_deleted(*a)) {
            assert!(idx > 0, "BUG: Deleted the root sentinel");
            self.current = self.ancestors[idx - 1];
            self.ancestors.truncate(idx - 1);
        } else if is_deleted(self.current) {
            self.current = self.parent_ptr();
            self.ancestors.pop();
        }
    }
}

/// The raw concurrent binary search tree.
///
/// This provides the low level data structure. It provides the concurrent operations on
/// individual keys, but not a user friendly interface. It is designed to separate the single
/// implementation of the core algorithm and provide a way to wrap it into different interfaces
/// for different use cases.
///
/// The types stored inside are described by the [`Config`] type parameter.
///
/// As a general rule, this data structure takes the [`crossbeam_epoch`] [`Guard`] and returns
/// borrowed data whenever appropriate. Note that even methods that would return owned values in
/// single-threaded case (eg. [`remove`][Raw::remove]) return borrowed values. This is because in
/// concurrent situation some other thread might still be accessing them. They are scheduled for
/// destruction once the epoch ends.
///
/// The statistics methods ([`len`][Raw::len], [`census`][Raw::census], ...) walk the whole tree
/// and are exact only when no modification is running at the same time.
pub struct Raw<C: Config> {
    root: Atomic<Node<C>>,
}

impl<C: Config> Raw<C> {
    /// Constructs an empty tree.
    pub fn new() -> Self {
        Self {
            root: Atomic::new(Node::sentinel()),
        }
    }

    fn cursor<'g>(&self, pin: &'g Guard) -> Cursor<'g, C> {
        Cursor::new(self.root.load(Ordering::Acquire, pin))
    }

    /// Looks up the value for a key.
    pub fn get<'r, 's, 'p, Q>(&'s self, key: &Q, pin: &'p Guard) -> Option<&'r C::Value>
    where
        's: 'r,
        'p: 'r,
        Q: ?Sized + Ord,
        C::Key: Borrow<Q>,
    {
        let mut cursor = self.cursor(pin);
        match cursor.find(key, pin) {
            // A routing or deleted node has no value, which is the same as not finding anything.
            // The removals take the value out before giving up the node, so the value is what
            // decides.
            Position::Found => unsafe { cursor.node().value.load(Ordering::Acquire, pin).as_ref() },
            Position::Vacant(_) => None,
        }
    }

    /// Checks if the key is present.
    pub fn contains<Q>(&self, key: &Q, pin: &Guard) -> bool
    where
        Q: ?Sized + Ord,
        C::Key: Borrow<Q>,
    {
        self.get(key, pin).is_some()
    }

    /// Inserts the value unless the key is already present.
    ///
    /// Returns `None` if the value got inserted, or the value already present (in which case
    /// the passed one is dropped).
    pub fn put_if_absent<'s, 'p, 'r>(
        &'s self,
        key: C::Key,
        value: C::Value,
        pin: &'p Guard,
    ) -> Option<&'r C::Value>
    where
        's: 'r,
        'p: 'r,
    {
        let value = Owned::new(value);
        let mut cursor = self.cursor(pin);
        let backoff = Backoff::new();
        loop {
            match cursor.find(&key, pin) {
                Position::Found => {
                    let node = cursor.node();
                    match node.state.load() {
                        State::Data => {
                            let existing = node.value.load(Ordering::Acquire, pin);
                            if let Some(existing) = unsafe { existing.as_ref() } {
                                return Some(existing);
                            }
                            // Someone is removing it right now, wait for them to finish.
                            log_trace!("put_if_absent: node in the middle of removal");
                        }
                        State::Routing => {
                            let state = node.state.try_conditional_write_lock(State::Routing);
                            if let Some(state) = state {
                                node.value.store(value, Ordering::Release);
                                state.store(State::Data);
                                return None;
                            }
                            log_trace!("put_if_absent: lost the routing node");
                        }
                        State::Deleted => log_trace!("put_if_absent: found a deleted node"),
                    }
                }
                Position::Vacant(dir) => {
                    let parent = cursor.node();
                    // The read lock keeps the parent from being unlinked while we hang the leaf.
                    if let Some(_parent_state) = parent.state.try_read_lock_if(State::is_live) {
                        let edge = parent.child(dir).try_conditional_write_lock(ptr::null());
                        if let Some(edge) = edge {
                            edge.store(Owned::new(Node::new(key, value)), Ordering::Release);
                            return None;
                        }
                    }
                    log_trace!("put_if_absent: insertion point changed");
                }
            }
            backoff.snooze();
            cursor.rewind();
        }
    }

    /// Removes the key, returning its value if it was present.
    pub fn remove<'r, 's, 'p, Q>(&'s self, key: &Q, pin: &'p Guard) -> Option<&'r C::Value>
    where
        's: 'r,
        'p: 'r,
        Q: ?Sized + Ord,
        C::Key: Borrow<Q>,
    {
        let mut cursor = self.cursor(pin);
        let backoff = Backoff::new();
        loop {
            if let Position::Vacant(_) = cursor.find(key, pin) {
                return None;
            }
            let node = cursor.node();
            if node.state.load() != State::Data {
                return None;
            }
            match node.state.try_conditional_write_lock(State::Data) {
                Some(state) => {
                    if let Some(value) = Self::unlink(&cursor, state, pin) {
                        return unsafe { value.as_ref() };
                    }
                    log_trace!("remove: validation of the surroundings failed");
                }
                None => log_trace!("remove: node state changed"),
            }
            backoff.snooze();
            cursor.rewind();
        }
    }

    /// Removes the data from the node under the cursor, whose state is write-locked.
    ///
    /// Returns the taken value, or `None` if some validation failed. In that case nothing has
    /// been modified and all the locks are released.
    fn unlink<'g>(
        cursor: &Cursor<'g, C>,
        state: WriteGuard<'g, StateCell>,
        pin: &'g Guard,
    ) -> Option<Shared<'g, C::Value>> {
        let node = cursor.node();
        // Holding the state lock freezes the edges: changing an edge needs a lock on the state of
        // its owner.
        let left = node.left.load(Ordering::Acquire, pin);
        let right = node.right.load(Ordering::Acquire, pin);
        match (left.is_null(), right.is_null()) {
            (false, false) => {
                let value = unsafe { node.retire_value(pin) };
                state.store(State::Routing);
                Some(value)
            }
            (false, true) => Self::splice(cursor, state, Dir::Left, left, pin),
            (true, false) => Self::splice(cursor, state, Dir::Right, right, pin),
            (true, true) => Self::unlink_leaf(cursor, state, pin),
        }
    }

    /// Unlinks a node with a single child, hanging the child under the parent directly.
    fn splice<'g>(
        cursor: &Cursor<'g, C>,
        state: WriteGuard<'g, StateCell>,
        dir: Dir,
        child: Shared<'g, Node<C>>,
        pin: &'g Guard,
    ) -> Option<Shared<'g, C::Value>> {
        let node = cursor.node();
        let _child_edge = node.child(dir).try_conditional_write_lock(child.as_raw())?;
        let parent = cursor.parent();
        let _parent_state = parent.state.try_read_lock_if(State::is_live)?;
        let edge = parent
            .child(parent.side_of(node))
            .try_conditional_write_lock(cursor.current.as_raw())?;

        edge.store(child, Ordering::Release);
        let value = unsafe { node.retire_value(pin) };
        state.store(State::Deleted);
        unsafe { pin.defer_destroy(cursor.current) };
        Some(value)
    }

    /// Unlinks a node without children.
    ///
    /// If the parent is a routing node, this was one of its two reasons to exist. Then it goes
    /// away too and the sibling takes its place under the grandparent.
    fn unlink_leaf<'g>(
        cursor: &Cursor<'g, C>,
        state: WriteGuard<'g, StateCell>,
        pin: &'g Guard,
    ) -> Option<Shared<'g, C::Value>> {
        let node = cursor.node();
        let parent = cursor.parent();
        let side = parent.side_of(node);
        match parent
            .state
            .multi_conditional_lock(State::Data, State::Routing)?
        {
            MultiGuard::Read(_parent_state) => {
                let edge = parent
                    .child(side)
                    .try_conditional_write_lock(cursor.current.as_raw())?;

                edge.store(Shared::null(), Ordering::Release);
                let value = unsafe { node.retire_value(pin) };
                state.store(State::Deleted);
                unsafe { pin.defer_destroy(cursor.current) };
                Some(value)
            }
            MultiGuard::Write(parent_state) => {
                let _edge = parent
                    .child(side)
                    .try_conditional_write_lock(cursor.current.as_raw())?;
                let sibling_edge = parent.child(side.flip());
                let sibling = sibling_edge.load(Ordering::Acquire, pin);
                debug_assert!(!sibling.is_null(), "BUG: Routing node with a single child");
                let _sibling_edge = sibling_edge.try_conditional_write_lock(sibling.as_raw())?;
                // The routing parent is never the sentinel, so there's a grandparent. Whatever
                // happened to it since the descent is validated only now, after all the locks
                // around the parent are held.
                let parent_ptr = cursor.parent_ptr();
                let grandparent = unsafe {
                    cursor.ancestors[cursor.ancestors.len() - 2].deref()
                };
                let _grandparent_state = grandparent.state.try_read_lock_if(State::is_live)?;
                let grandparent_edge = grandparent
                    .child(grandparent.side_of(parent))
                    .try_conditional_write_lock(parent_ptr.as_raw())?;

                grandparent_edge.store(sibling, Ordering::Release);
                let value = unsafe { node.retire_value(pin) };
                state.store(State::Deleted);
                parent_state.store(State::Deleted);
                unsafe {
                    pin.defer_destroy(cursor.current);
                    pin.defer_destroy(parent_ptr);
                }
                Some(value)
            }
        }
    }

    /// Checks for emptiness.
    pub fn is_empty(&self) -> bool {
        // A tree with no data has no nodes at all: leaves are never routing nodes.
        // We only look if there's a pointer, not where it points to, so unprotected and Relaxed
        // is fine.
        unsafe {
            let pin = crossbeam_epoch::unprotected();
            self.root
                .load(Ordering::Relaxed, pin)
                .deref()
                .left
                .load(Ordering::Relaxed, pin)
                .is_null()
        }
    }

    /// Removes everything.
    ///
    /// The `&mut` guarantees nobody else is operating on the tree in the meantime.
    pub fn clear(&mut self) {
        let released = unsafe {
            let pin = crossbeam_epoch::unprotected();
            let root = self.root.load(Ordering::Relaxed, pin).deref();
            destroy_subtree(root.left.swap(Shared::null(), Ordering::Relaxed, pin))
        };
        log_debug!("Cleared the tree, released {} nodes", released);
    }
}

/// Frees all the nodes reachable from `top` (including it), returning how many there were.
///
/// Iterative, the tree can be arbitrarily deep.
///
/// # Safety
///
/// Nobody else may be accessing the nodes.
unsafe fn destroy_subtree<C: Config>(top: Shared<Node<C>>) -> usize {
    let pin = crossbeam_epoch::unprotected();
    let mut pending = vec![top];
    let mut released = 0;
    while let Some(ptr) = pending.pop() {
        if ptr.is_null() {
            continue;
        }
        let node = ptr.into_owned();
        pending.push(node.left.load(Ordering::Relaxed, pin));
        pending.push(node.right.load(Ordering::Relaxed, pin));
        drop(node);
        released += 1;
    }
    released
}

impl<C: Config> Default for Raw<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Config> Drop for Raw<C> {
    fn drop(&mut self) {
        /*
         * Notes about unsafety here:
         * * We are in a destructor and that one is &mut self. There are no concurrent accesses to
         *   this data structure any more, therefore we can safely assume we are the only ones
         *   looking at the pointers inside.
         * * Therefore, using unprotected is also fine.
         * * Similarly, the Relaxed ordering here is fine too, as the whole data structure must
         *   have been synchronized into our thread already by this time.
         */
        unsafe {
            let pin = crossbeam_epoch::unprotected();
            destroy_subtree(self.root.load(Ordering::Relaxed, pin));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crossbeam_utils::thread;

    use super::config::Trivial as TrivialConfig;
    use super::*;
    use crate::map::MapConfig;

    type TestRaw = Raw<MapConfig<u32, u32>>;

    fn filled(keys: &[u32]) -> TestRaw {
        let raw = TestRaw::new();
        let pin = crossbeam_epoch::pin();
        for &k in keys {
            assert!(raw.put_if_absent(k, k, &pin).is_none());
        }
        raw
    }

    fn state_of(raw: &TestRaw, key: u32) -> Option<State> {
        let pin = crossbeam_epoch::pin();
        let mut cursor = raw.cursor(&pin);
        match cursor.find(&key, &pin) {
            Position::Found => Some(cursor.node().state.load()),
            Position::Vacant(_) => None,
        }
    }

    #[test]
    fn create_destroy() {
        let raw = TestRaw::new();
        assert!(raw.is_empty());
        drop(raw);
    }

    #[test]
    fn sequential_scenario() {
        let mut raw = filled(&[5, 3, 8, 1, 4]);
        let pin = crossbeam_epoch::pin();
        assert_eq!(5, raw.len());
        assert_eq!(Some(&4), raw.get(&4, &pin));
        assert!(!raw.contains(&9, &pin));
        assert_eq!(3, raw.depth());
        drop(pin);
        raw.assert_valid();
    }

    #[test]
    fn put_if_absent_keeps_existing() {
        let raw = filled(&[1]);
        let pin = crossbeam_epoch::pin();
        assert_eq!(Some(&1), raw.put_if_absent(1, 42, &pin));
        assert_eq!(Some(&1), raw.get(&1, &pin));
    }

    /// Removing a node with two children leaves a routing node behind. Inserting the key again
    /// reuses it.
    #[test]
    fn routing_roundtrip() {
        let mut raw = filled(&[5, 3, 8]);
        let pin = crossbeam_epoch::pin();
        assert_eq!(Some(&5), raw.remove(&5, &pin));
        assert_eq!(Some(State::Routing), state_of(&raw, 5));
        assert!(raw.get(&5, &pin).is_none());
        assert!(raw.remove(&5, &pin).is_none());
        assert_eq!(2, raw.len());
        assert_eq!(3, raw.num_nodes());

        assert!(raw.put_if_absent(5, 50, &pin).is_none());
        assert_eq!(Some(State::Data), state_of(&raw, 5));
        assert_eq!(Some(&50), raw.get(&5, &pin));
        assert_eq!(3, raw.num_nodes());
        drop(pin);
        raw.assert_valid();
    }

    #[test]
    fn remove_with_one_child() {
        let mut raw = filled(&[5, 3, 1]);
        let pin = crossbeam_epoch::pin();
        assert_eq!(Some(&3), raw.remove(&3, &pin));
        assert_eq!(None, state_of(&raw, 3));
        assert_eq!(Some(&1), raw.get(&1, &pin));
        assert_eq!(2, raw.num_nodes());
        assert_eq!(2, raw.depth());
        drop(pin);
        raw.assert_valid();
    }

    /// The last data child of a routing node takes the routing node with it.
    #[test]
    fn routing_collapse() {
        let mut raw = filled(&[10, 5, 15, 3, 7]);
        let pin = crossbeam_epoch::pin();
        assert_eq!(Some(&5), raw.remove(&5, &pin));
        assert_eq!(Some(State::Routing), state_of(&raw, 5));
        assert_eq!(Some(&3), raw.remove(&3, &pin));
        // 5 routed between 3 and 7, now 7 hangs directly under 10.
        assert_eq!(None, state_of(&raw, 5));
        assert_eq!(Some(&7), raw.get(&7, &pin));
        assert_eq!(3, raw.num_nodes());
        assert_eq!(3, raw.len());
        drop(pin);
        raw.assert_valid();
    }

    #[test]
    fn remove_everything_leaves_nothing() {
        let keys = [50, 25, 75, 12, 37, 62, 87, 6, 18, 31, 43];
        let mut raw = filled(&keys);
        let pin = crossbeam_epoch::pin();
        // Interior nodes first, so routing nodes appear and collapse again.
        for k in &keys {
            assert_eq!(Some(k), raw.remove(k, &pin));
        }
        drop(pin);
        assert!(raw.is_empty());
        assert_eq!(0, raw.len());
        assert_eq!(0, raw.num_nodes());
        raw.assert_valid();
    }

    #[test]
    fn idempotent_removal() {
        let raw = filled(&[5, 3, 8, 1, 4]);
        let before = raw.structural_hash();
        let pin = crossbeam_epoch::pin();
        assert!(raw.remove(&6, &pin).is_none());
        assert_eq!(before, raw.structural_hash());
        assert_eq!(Some(&4), raw.remove(&4, &pin));
        assert_ne!(before, raw.structural_hash());
    }

    #[test]
    fn clear_and_reuse() {
        let mut raw = filled(&[5, 3, 8, 1, 4]);
        raw.clear();
        assert!(raw.is_empty());
        assert_eq!(0, raw.num_nodes());
        let pin = crossbeam_epoch::pin();
        assert!(raw.put_if_absent(3, 3, &pin).is_none());
        assert_eq!(1, raw.len());
    }

    /// The values removed or left in the tree are all released.
    #[test]
    fn no_value_leaks() {
        let value = Arc::new(());
        {
            let raw = Raw::<MapConfig<u32, Arc<()>>>::new();
            let pin = crossbeam_epoch::pin();
            for k in &[5, 3, 8, 1, 4] {
                assert!(raw.put_if_absent(*k, Arc::clone(&value), &pin).is_none());
            }
            // Rejected insert drops the passed value.
            assert!(raw.put_if_absent(5, Arc::clone(&value), &pin).is_some());
            assert!(raw.remove(&3, &pin).is_some());
            assert!(raw.remove(&1, &pin).is_some());
        }
        // Make sure the deferred destructions actually happen.
        for _ in 0..1000 {
            crossbeam_epoch::pin().flush();
            if Arc::strong_count(&value) == 1 {
                break;
            }
        }
        assert_eq!(1, Arc::strong_count(&value));
    }

    /// Two threads racing to remove a node with two children: exactly one wins.
    #[test]
    fn par_remove_same_routing() {
        for _ in 0..100 {
            let mut raw = filled(&[5, 3, 8]);
            let won: Vec<bool> = thread::scope(|s| {
                let handles: Vec<_> = (0..2)
                    .map(|_| {
                        let raw = &raw;
                        s.spawn(move |_| {
                            let pin = crossbeam_epoch::pin();
                            raw.remove(&5, &pin).is_some()
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).collect()
            })
            .unwrap();
            assert_eq!(1, won.iter().filter(|w| **w).count());
            assert_eq!(Some(State::Routing), state_of(&raw, 5));
            raw.assert_valid();
        }
    }

    /// Racing inserts of the same key: exactly one of them inserts.
    #[test]
    fn par_put_same_key() {
        for _ in 0..100 {
            let mut raw = Raw::<TrivialConfig<u32>>::new();
            let inserted: usize = thread::scope(|s| {
                let handles: Vec<_> = (0..4)
                    .map(|_| {
                        let raw = &raw;
                        s.spawn(move |_| {
                            let pin = crossbeam_epoch::pin();
                            raw.put_if_absent(42, (), &pin).is_none() as usize
                        })
                    })
                    .collect();
                handles.into_iter().map(|h| h.join().unwrap()).sum()
            })
            .unwrap();
            assert_eq!(1, inserted);
            assert_eq!(1, raw.len());
            raw.assert_valid();
        }
    }

    /// Hammers a small subtree with removals of nodes whose parents are routing nodes, so the
    /// collapse path races with its neighbours.
    #[test]
    fn par_collapse_chains() {
        const KEYS: u32 = 64;
        for _ in 0..50 {
            let mut raw = TestRaw::new();
            let pin = crossbeam_epoch::pin();
            // A perfectly balanced shape, so there are plenty of two-children nodes.
            let mut order = Vec::new();
            let mut ranges = vec![(0, KEYS)];
            while let Some((lo, hi)) = ranges.pop() {
                if lo < hi {
                    let mid = (lo + hi) / 2;
                    order.push(mid);
                    ranges.push((lo, mid));
                    ranges.push((mid + 1, hi));
                }
            }
            for k in &order {
                raw.put_if_absent(*k, *k, &pin);
            }
            drop(pin);

            thread::scope(|s| {
                for t in 0..4 {
                    let raw = &raw;
                    s.spawn(move |_| {
                        let pin = crossbeam_epoch::pin();
                        // Each thread removes every fourth key, interior ones included.
                        for k in (t..KEYS).step_by(4) {
                            assert_eq!(Some(&k), raw.remove(&k, &pin));
                        }
                    });
                }
            })
            .unwrap();

            raw.assert_valid();
            assert_eq!(0, raw.len());
            assert_eq!(0, raw.num_nodes());
            assert!(raw.is_empty());
        }
    }
}
