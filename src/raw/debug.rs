//! Diagnostics of the whole tree.
//!
//! Everything here walks the complete tree without taking any locks. The walks are safe to run
//! concurrently with modifications, but the numbers are exact only in a quiescent state, when no
//! modification is in progress. They are meant for tests and for statistics between phases of a
//! benchmark, not as a point-in-time snapshot.

use std::collections::hash_map::DefaultHasher;
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::hash::{Hash, Hasher};
use std::sync::atomic::Ordering;

use crossbeam_epoch::{self, Guard, Shared};
use thiserror::Error;

use super::config::Config;
use super::node::{Dir, Node};
use super::{Raw, State};

/// Calls `visit` on each node reachable from `top` with its depth.
///
/// The depth of `top` is `depth`. Iterative, so degenerate trees don't overflow the stack.
fn walk<'g, C, F>(top: Shared<'g, Node<C>>, depth: usize, pin: &'g Guard, mut visit: F)
where
    C: Config,
    F: FnMut(&'g Node<C>, usize),
{
    let mut pending = vec![(top, depth)];
    while let Some((ptr, depth)) = pending.pop() {
        if let Some(node) = unsafe { ptr.as_ref() } {
            visit(node, depth);
            pending.push((node.right.load(Ordering::Acquire, pin), depth + 1));
            pending.push((node.left.load(Ordering::Acquire, pin), depth + 1));
        }
    }
}

/// Counts of the nodes found in the tree by a single walk.
///
/// Depths count the nodes on the path, the topmost element has depth 1. The internal anchor of
/// the tree is not included in anything.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Census {
    /// Nodes holding a present key.
    pub data: usize,
    /// Nodes keeping only the shape of the tree.
    pub routing: usize,
    /// Unlinked nodes still seen by the walk. Anything non-zero is a bug in a quiescent tree.
    ///
    /// These are not part of the tree, so they count neither into [`nodes`][Census::nodes] nor
    /// into the depths.
    pub deleted: usize,
    /// The depth of the deepest node.
    pub max_depth: usize,
    /// The sum of depths of all the nodes.
    pub total_depth: usize,
}

impl Census {
    /// The nodes of the tree, data and routing ones.
    pub fn nodes(&self) -> usize {
        self.data + self.routing
    }

    /// The average depth of a node, `0.0` for an empty tree.
    pub fn average_depth(&self) -> f64 {
        match self.nodes() {
            0 => 0.0,
            nodes => self.total_depth as f64 / nodes as f64,
        }
    }
}

/// A broken structural rule found by [`Raw::verify`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Error)]
pub enum Violation {
    /// A node marked as deleted is still linked into the tree.
    #[error("deleted node reachable at depth {depth}")]
    DeletedReachable {
        /// Where it was found.
        depth: usize,
    },
    /// A routing node doesn't have exactly two children.
    #[error("routing node at depth {depth} has {children} children")]
    RoutingArity {
        /// Where it was found.
        depth: usize,
        /// How many children it has.
        children: usize,
    },
    /// A key is out of the range given by its ancestors.
    #[error("key out of order at depth {depth}")]
    Disordered {
        /// Where it was found.
        depth: usize,
    },
    /// A lock stayed held with no operation in progress.
    #[error("lock left held at depth {depth}")]
    LockHeld {
        /// Where it was found.
        depth: usize,
    },
    /// A value where none should be, or a missing one.
    #[error("node at depth {depth} in state {state:?} has a value mismatching the state")]
    StrayValue {
        /// Where it was found.
        depth: usize,
        /// The state of the node.
        state: State,
    },
}

impl<C: Config> Raw<C> {
    fn top<'g>(&self, pin: &'g Guard) -> Shared<'g, Node<C>> {
        let root = unsafe { self.root.load(Ordering::Acquire, pin).deref() };
        root.left.load(Ordering::Acquire, pin)
    }

    /// Counts the nodes of the tree.
    pub fn census(&self) -> Census {
        let pin = crossbeam_epoch::pin();
        let mut census = Census::default();
        walk(self.top(&pin), 1, &pin, |node, depth| {
            match node.state.load() {
                State::Data => census.data += 1,
                State::Routing => census.routing += 1,
                State::Deleted => {
                    census.deleted += 1;
                    return;
                }
            }
            census.max_depth = census.max_depth.max(depth);
            census.total_depth += depth;
        });
        census
    }

    /// The number of present keys.
    pub fn len(&self) -> usize {
        self.census().data
    }

    /// The number of nodes, including the routing ones.
    pub fn num_nodes(&self) -> usize {
        self.census().nodes()
    }

    /// The length of the longest path from the top of the tree.
    pub fn depth(&self) -> usize {
        self.census().max_depth
    }

    /// See [`Census::average_depth`].
    pub fn average_depth(&self) -> f64 {
        self.census().average_depth()
    }

    /// A hash of the shape of the tree.
    ///
    /// Trees with the same keys placed in the same positions, in the same states, have the same
    /// hash. The values are not included.
    pub fn structural_hash(&self) -> u64
    where
        C::Key: Hash,
    {
        let pin = crossbeam_epoch::pin();
        let mut hasher = DefaultHasher::new();
        let mut pending = vec![self.top(&pin)];
        while let Some(ptr) = pending.pop() {
            match unsafe { ptr.as_ref() } {
                None => hasher.write_u8(0),
                Some(node) => {
                    hasher.write_u8(1);
                    node.key.finite().hash(&mut hasher);
                    node.state.load().hash(&mut hasher);
                    pending.push(node.right.load(Ordering::Acquire, &pin));
                    pending.push(node.left.load(Ordering::Acquire, &pin));
                }
            }
        }
        hasher.finish()
    }

    // &mut to make sure it is not shared between threads and nobody is modifying the thing right
    // now.
    /// Checks the structural rules of the tree.
    ///
    /// In a tree nobody is modifying, no deleted node is reachable, every routing node has two
    /// children, the keys are ordered, all locks are free and exactly the data nodes hold values.
    /// Returns the first broken rule found.
    pub fn verify(&mut self) -> Result<(), Violation> {
        // Unprotected is fine, we are &mut so nobody else is allowed to do stuff to us at the
        // moment.
        let pin = unsafe { crossbeam_epoch::unprotected() };
        let root = unsafe { self.root.load(Ordering::Relaxed, pin).deref() };
        if root.state.is_locked() || root.left.is_locked() || root.right.is_locked() {
            return Err(Violation::LockHeld { depth: 0 });
        }

        let mut pending = vec![(root.left.load(Ordering::Relaxed, pin), 1, None, None)];
        while let Some((ptr, depth, low, high)) = pending.pop() {
            let node: &Node<C> = match unsafe { ptr.as_ref() } {
                Some(node) => node,
                None => continue,
            };
            let state = node.state.load();
            if state == State::Deleted {
                return Err(Violation::DeletedReachable { depth });
            }
            if node.state.is_locked() || node.left.is_locked() || node.right.is_locked() {
                return Err(Violation::LockHeld { depth });
            }
            let has_value = !node.value.load(Ordering::Relaxed, pin).is_null();
            if has_value != (state == State::Data) {
                return Err(Violation::StrayValue { depth, state });
            }
            let left = node.left.load(Ordering::Relaxed, pin);
            let right = node.right.load(Ordering::Relaxed, pin);
            let children = (!left.is_null()) as usize + (!right.is_null()) as usize;
            if state == State::Routing && children != 2 {
                return Err(Violation::RoutingArity { depth, children });
            }
            let key = node
                .key
                .finite()
                .expect("BUG: The sentinel below the top of the tree");
            let above_low = low.map_or(true, |low| low < key);
            let below_high = high.map_or(true, |high| key < high);
            if !above_low || !below_high {
                return Err(Violation::Disordered { depth });
            }
            pending.push((left, depth + 1, low, Some(key)));
            pending.push((right, depth + 1, Some(key), high));
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn assert_valid(&mut self) {
        if let Err(violation) = self.verify() {
            panic!("Broken tree: {}", violation);
        }
    }

    fn print_shape_ptr(ptr: Shared<Node<C>>, fmt: &mut Formatter, pin: &Guard) -> FmtResult
    where
        C::Key: Debug,
    {
        let node = match unsafe { ptr.as_ref() } {
            Some(node) => node,
            None => return write!(fmt, "."),
        };
        write!(fmt, "(")?;
        Self::print_shape_ptr(node.child(Dir::Left).load(Ordering::Acquire, pin), fmt, pin)?;
        match node.key.finite() {
            Some(key) => write!(fmt, " {:?}/{:?} ", key, node.state.load())?,
            None => write!(fmt, " ∞ ")?,
        }
        Self::print_shape_ptr(node.child(Dir::Right).load(Ordering::Acquire, pin), fmt, pin)?;
        write!(fmt, ")")
    }

    fn print_shape(&self, fmt: &mut Formatter) -> FmtResult
    where
        C::Key: Debug,
    {
        let pin = crossbeam_epoch::pin();
        Self::print_shape_ptr(self.root.load(Ordering::Acquire, &pin), fmt, &pin)
    }
}

/// A pretty-printing wrapper around the raw tree.
///
/// Prints the nested structure with the keys and node states, `.` for an empty edge. It recurses,
/// so it is not suitable for very deep trees.
pub struct PrintShape<'a, C>(pub &'a Raw<C>)
where
    C: Config;

impl<C> Display for PrintShape<'_, C>
where
    C: Config,
    C::Key: Debug,
{
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        self.0.print_shape(fmt)
    }
}

#[cfg(test)]
mod tests {
    use crate::map::MapConfig;

    use super::*;

    fn filled(keys: &[u32]) -> Raw<MapConfig<u32, ()>> {
        let raw = Raw::new();
        let pin = crossbeam_epoch::pin();
        for k in keys {
            raw.put_if_absent(*k, (), &pin);
        }
        raw
    }

    #[test]
    fn empty_census() {
        let raw = filled(&[]);
        assert_eq!(Census::default(), raw.census());
        assert_eq!(0.0, raw.average_depth());
        assert_eq!(0, raw.depth());
    }

    #[test]
    fn census_counts() {
        let raw = filled(&[5, 3, 8, 1, 4]);
        let pin = crossbeam_epoch::pin();
        raw.remove(&3, &pin);
        let census = raw.census();
        assert_eq!(4, census.data);
        assert_eq!(1, census.routing);
        assert_eq!(0, census.deleted);
        assert_eq!(3, census.max_depth);
        // 1 + 2 + 2 + 3 + 3
        assert_eq!(11, census.total_depth);
        assert!((raw.average_depth() - 2.2).abs() < 1e-9);
    }

    /// A deleted node found by the walk is reported, but it is not a node of the tree.
    #[test]
    fn census_skips_deleted() {
        let raw = filled(&[5, 3, 8]);
        unsafe {
            let pin = crossbeam_epoch::unprotected();
            let five = raw.top(pin).deref();
            let eight = five.right.load(Ordering::Relaxed, pin).deref();
            eight.state.store(State::Deleted);
        }
        let census = raw.census();
        assert_eq!(2, census.data);
        assert_eq!(0, census.routing);
        assert_eq!(1, census.deleted);
        assert_eq!(2, census.nodes());
        assert_eq!(2, raw.num_nodes());
        // 1 + 2, the deleted one is left out.
        assert_eq!(3, census.total_depth);
        assert_eq!(2, census.max_depth);
        assert!((raw.average_depth() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn hash_follows_shape() {
        // Same keys, different shapes.
        let a = filled(&[2, 1, 3]);
        let b = filled(&[1, 2, 3]);
        let c = filled(&[2, 3, 1]);
        assert_ne!(a.structural_hash(), b.structural_hash());
        assert_eq!(a.structural_hash(), c.structural_hash());
    }

    #[test]
    fn hash_sees_routing() {
        let a = filled(&[2, 1, 3]);
        let b = filled(&[2, 1, 3]);
        let pin = crossbeam_epoch::pin();
        b.remove(&2, &pin);
        assert_ne!(a.structural_hash(), b.structural_hash());
    }

    #[test]
    fn verify_catches_disorder() {
        let mut raw = filled(&[5, 3]);
        unsafe {
            let pin = crossbeam_epoch::unprotected();
            let top = raw.top(pin).deref();
            let three = top.left.load(Ordering::Relaxed, pin);
            // Move 3 to the wrong side.
            top.left.store(Shared::null(), Ordering::Relaxed);
            top.right.store(three, Ordering::Relaxed);
        }
        assert_eq!(Err(Violation::Disordered { depth: 2 }), raw.verify());
    }

    #[test]
    fn verify_catches_held_lock() {
        let mut raw = filled(&[5, 3]);
        let guard = unsafe {
            let pin = crossbeam_epoch::unprotected();
            raw.top(pin).deref().state.try_read_lock()
        };
        assert!(guard.is_some());
        std::mem::forget(guard);
        assert_eq!(Err(Violation::LockHeld { depth: 1 }), raw.verify());
    }

    #[test]
    fn print() {
        let raw = filled(&[2, 1]);
        let pin = crossbeam_epoch::pin();
        raw.remove(&2, &pin);
        assert_eq!("((. 1/Data .) ∞ .)", format!("{}", PrintShape(&raw)));
    }
}
