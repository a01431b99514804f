//! The [`ConTreeSet`] and other related structures.

use std::borrow::Borrow;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::hash::Hash;
use std::iter::FromIterator;

#[cfg(feature = "rayon")]
use rayon::iter::{FromParallelIterator, IntoParallelIterator, ParallelExtend, ParallelIterator};

use crate::raw::config::Trivial as TrivialConfig;
use crate::raw::debug::{Census, Violation};
use crate::raw::Raw;

/// A concurrent ordered set.
///
/// Unlike the map, nothing is ever copied out of the set. The elements are only compared.
///
/// ```rust
/// use contree::ConTreeSet;
/// use crossbeam_utils::thread;
///
/// let set = ConTreeSet::new();
///
/// thread::scope(|s| {
///     s.spawn(|_| {
///         set.insert("hello");
///     });
///     s.spawn(|_| {
///         set.insert("world");
///     });
/// }).unwrap();
///
/// assert!(set.contains("hello"));
/// assert!(set.contains("world"));
/// assert!(!set.contains("universe"));
/// assert!(set.remove("world"));
/// assert!(!set.contains("world"));
/// ```
///
/// ```rust
/// use contree::set::ConTreeSet;
/// let set: ConTreeSet<usize> = ConTreeSet::new();
///
/// assert!(set.insert(0));
/// assert!(set.insert(1));
/// assert!(!set.insert(1));
///
/// assert!(set.contains(&1));
///
/// set.remove(&1);
/// assert!(!set.contains(&1));
///
/// set.remove(&0);
/// assert!(set.is_empty());
/// ```
pub struct ConTreeSet<T>
where
    T: Ord,
{
    raw: Raw<TrivialConfig<T>>,
}

impl<T> ConTreeSet<T>
where
    T: Ord,
{
    /// Creates a new empty set.
    pub fn new() -> Self {
        Self { raw: Raw::new() }
    }

    /// Inserts a new element into the set.
    ///
    /// Returns `true` if it wasn't present before. If it was, the passed one is dropped and the
    /// original stays.
    pub fn insert(&self, value: T) -> bool {
        let pin = crossbeam_epoch::pin();
        self.raw.put_if_absent(value, (), &pin).is_none()
    }

    /// Checks if an element is present in the set.
    ///
    /// Note that by the time you can act on it, the presence of the value can change (eg. other
    /// thread can add or remove it in the meantime).
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized + Ord,
        T: Borrow<Q>,
    {
        let pin = crossbeam_epoch::pin();
        self.raw.contains(key, &pin)
    }

    /// Removes an element, returning whether it was present.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized + Ord,
        T: Borrow<Q>,
    {
        let pin = crossbeam_epoch::pin();
        self.raw.remove(key, &pin).is_some()
    }

    /// Checks if the set is currently empty.
    ///
    /// Note that due to being concurrent, the use-case of this method is mostly for debugging
    /// purposes, because the state can change between reading the value and acting on it.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// The number of elements.
    ///
    /// Walks the whole set and is exact only when nobody modifies it at the same time.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// The number of tree nodes, including the routing ones.
    pub fn num_nodes(&self) -> usize {
        self.raw.num_nodes()
    }

    /// The number of nodes on the longest path from the top of the tree.
    pub fn depth(&self) -> usize {
        self.raw.depth()
    }

    /// The average number of nodes on the path to a node.
    pub fn average_depth(&self) -> f64 {
        self.raw.average_depth()
    }

    /// All the node counts in one walk.
    pub fn census(&self) -> Census {
        self.raw.census()
    }

    /// A hash of the elements and the shape of the tree.
    pub fn structural_hash(&self) -> u64
    where
        T: Hash,
    {
        self.raw.structural_hash()
    }

    /// Removes all the elements.
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Checks the internal consistency of the tree.
    ///
    /// Any error is a bug in this crate.
    pub fn verify(&mut self) -> Result<(), Violation> {
        self.raw.verify()
    }
}

impl<T> Default for ConTreeSet<T>
where
    T: Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Debug for ConTreeSet<T>
where
    T: Ord,
{
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        fmt.debug_struct("ConTreeSet")
            .field("census", &self.census())
            .finish()
    }
}

impl<'a, T> Extend<T> for &'a ConTreeSet<T>
where
    T: Ord,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        for n in iter {
            self.insert(n);
        }
    }
}

impl<T> Extend<T> for ConTreeSet<T>
where
    T: Ord,
{
    fn extend<I>(&mut self, iter: I)
    where
        I: IntoIterator<Item = T>,
    {
        let mut me: &ConTreeSet<_> = self;
        me.extend(iter);
    }
}

impl<T> FromIterator<T> for ConTreeSet<T>
where
    T: Ord,
{
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut me = ConTreeSet::new();
        me.extend(iter);
        me
    }
}

#[cfg(feature = "rayon")]
impl<'a, T> ParallelExtend<T> for &'a ConTreeSet<T>
where
    T: Ord + Send + Sync,
{
    fn par_extend<I>(&mut self, par_iter: I)
    where
        I: IntoParallelIterator<Item = T>,
    {
        let me: &ConTreeSet<_> = self;
        par_iter.into_par_iter().for_each(|n| {
            me.insert(n);
        });
    }
}

#[cfg(feature = "rayon")]
impl<T> ParallelExtend<T> for ConTreeSet<T>
where
    T: Ord + Send + Sync,
{
    fn par_extend<I>(&mut self, par_iter: I)
    where
        I: IntoParallelIterator<Item = T>,
    {
        let mut me: &ConTreeSet<_> = self;
        me.par_extend(par_iter);
    }
}

#[cfg(feature = "rayon")]
impl<T> FromParallelIterator<T> for ConTreeSet<T>
where
    T: Ord + Send + Sync,
{
    fn from_par_iter<I>(par_iter: I) -> Self
    where
        I: IntoParallelIterator<Item = T>,
    {
        let mut me = ConTreeSet::new();
        me.par_extend(par_iter);
        me
    }
}
