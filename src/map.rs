//! The [`ConTreeMap`] type and its helpers.

use std::borrow::Borrow;
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::hash::Hash;
use std::iter::FromIterator;
use std::marker::PhantomData;

#[cfg(feature = "rayon")]
use rayon::iter::{FromParallelIterator, IntoParallelIterator, ParallelExtend, ParallelIterator};

use crate::raw::config::Config;
use crate::raw::debug::{Census, Violation};
use crate::raw::Raw;

/// The [`Config`] of the [`ConTreeMap`], storing a `V` next to each `K`.
///
/// Public for the benefit of other wrappers around [`Raw`].
pub struct MapConfig<K, V>(PhantomData<(K, V)>);

impl<K, V> Config for MapConfig<K, V>
where
    K: Ord,
{
    type Key = K;
    type Value = V;
}

/// A concurrent ordered map.
///
/// The values are copied out of the map using the `Clone` trait when looking them up or removing
/// them, because other threads might still be looking at the originals. Therefore, the map is
/// most suitable for values that are cheap to copy. Wrap the more expensive ones in an `Arc`.
///
/// Unlike the usual maps, there's no way to overwrite a present value. This keeps every
/// modification down to a single state transition of a single key.
///
/// ```rust
/// use contree::ConTreeMap;
/// use crossbeam_utils::thread;
///
/// let map = ConTreeMap::new();
///
/// thread::scope(|s| {
///     s.spawn(|_| {
///         map.put_if_absent("hello", 1);
///     });
///     s.spawn(|_| {
///         map.put_if_absent("world", 2);
///     });
/// }).unwrap();
///
/// assert_eq!(Some(1), map.get("hello"));
/// assert_eq!(Some(2), map.get("world"));
/// assert_eq!(None, map.get("universe"));
/// // Already there, the original stays.
/// assert_eq!(Some(2), map.put_if_absent("world", 3));
/// assert_eq!(Some(2), map.remove("world"));
/// assert_eq!(None, map.get("world"));
/// ```
pub struct ConTreeMap<K, V>
where
    K: Ord,
{
    raw: Raw<MapConfig<K, V>>,
}

impl<K, V> ConTreeMap<K, V>
where
    K: Ord,
{
    /// Creates a new empty map.
    pub fn new() -> Self {
        Self { raw: Raw::new() }
    }

    /// Checks if the map is currently empty.
    ///
    /// Note that due to being concurrent, the use-case of this method is mostly for debugging
    /// purposes, because the state can change between reading the value and acting on it.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Checks if a value for the given key is present.
    ///
    /// Note that by the time you can act on it, the presence of the value can change (eg. other
    /// thread can add or remove it in the meantime).
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        let pin = crossbeam_epoch::pin();
        self.raw.contains(key, &pin)
    }

    /// The number of keys in the map.
    ///
    /// This walks the whole map. It is exact only if nobody is modifying the map at the same
    /// time, which is true for the other statistics methods too.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// The number of tree nodes, including the ones that only keep the shape of the tree.
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

    /// A hash of the keys and the shape of the tree.
    pub fn structural_hash(&self) -> u64
    where
        K: Hash,
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

impl<K, V> ConTreeMap<K, V>
where
    K: Ord,
    V: Clone,
{
    /// Inserts the value, unless there's already one for the key.
    ///
    /// Returns `None` if the value was inserted. Otherwise, the map is left unchanged and the
    /// value already present is returned.
    pub fn put_if_absent(&self, key: K, value: V) -> Option<V> {
        let pin = crossbeam_epoch::pin();
        self.raw.put_if_absent(key, value, &pin).cloned()
    }

    /// Looks up a value.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        let pin = crossbeam_epoch::pin();
        self.raw.get(key, &pin).cloned()
    }

    /// Removes a key, returning its value if it was present.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        let pin = crossbeam_epoch::pin();
        self.raw.remove(key, &pin).cloned()
    }
}

impl<K, V> Default for ConTreeMap<K, V>
where
    K: Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Debug for ConTreeMap<K, V>
where
    K: Ord,
{
    fn fmt(&self, fmt: &mut Formatter) -> FmtResult {
        fmt.debug_struct("ConTreeMap")
            .field("census", &self.census())
            .finish()
    }
}

impl<'a, K, V> Extend<(K, V)> for &'a ConTreeMap<K, V>
where
    K: Ord,
    V: Clone,
{
    fn extend<T>(&mut self, iter: T)
    where
        T: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in iter {
            self.put_if_absent(k, v);
        }
    }
}

impl<K, V> Extend<(K, V)> for ConTreeMap<K, V>
where
    K: Ord,
    V: Clone,
{
    fn extend<T>(&mut self, iter: T)
    where
        T: IntoIterator<Item = (K, V)>,
    {
        let mut me: &ConTreeMap<_, _> = self;
        me.extend(iter);
    }
}

impl<K, V> FromIterator<(K, V)> for ConTreeMap<K, V>
where
    K: Ord,
    V: Clone,
{
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = (K, V)>,
    {
        let mut me = ConTreeMap::new();
        me.extend(iter);
        me
    }
}

#[cfg(feature = "rayon")]
impl<'a, K, V> ParallelExtend<(K, V)> for &'a ConTreeMap<K, V>
where
    K: Ord + Send + Sync,
    V: Clone + Send + Sync,
{
    fn par_extend<T>(&mut self, par_iter: T)
    where
        T: IntoParallelIterator<Item = (K, V)>,
    {
        let me: &ConTreeMap<_, _> = self;
        par_iter.into_par_iter().for_each(|(k, v)| {
            me.put_if_absent(k, v);
        });
    }
}

#[cfg(feature = "rayon")]
impl<K, V> ParallelExtend<(K, V)> for ConTreeMap<K, V>
where
    K: Ord + Send + Sync,
    V: Clone + Send + Sync,
{
    fn par_extend<T>(&mut self, par_iter: T)
    where
        T: IntoParallelIterator<Item = (K, V)>,
    {
        let mut me: &ConTreeMap<_, _> = self;
        me.par_extend(par_iter);
    }
}

#[cfg(feature = "rayon")]
impl<K, V> FromParallelIterator<(K, V)> for ConTreeMap<K, V>
where
    K: Ord + Send + Sync,
    V: Clone + Send + Sync,
{
    fn from_par_iter<T>(par_iter: T) -> Self
    where
        T: IntoParallelIterator<Item = (K, V)>,
    {
        let mut me = ConTreeMap::new();
        me.par_extend(par_iter);
        me
    }
}
