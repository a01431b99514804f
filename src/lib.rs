#![doc(test(attr(deny(warnings))))]
#![warn(missing_docs)]

//! A concurrent ordered map and set.
//!
//! The data structures here are unbalanced binary search trees where each mutable field of each
//! node is guarded by its own small *conditional lock*. Lookups never lock anything and never
//! retry, modifications lock only the two or three fields they change and run in parallel on
//! disjoint parts of the tree. See the [`raw`] module for the details of the algorithm.
//!
//! # Features
//!
//! * Single-key operations: [`put_if_absent`][ConTreeMap::put_if_absent],
//!   [`get`][ConTreeMap::get] and [`remove`][ConTreeMap::remove].
//! * Quiescent diagnostics, useful in tests: [`len`][ConTreeMap::len],
//!   [`depth`][ConTreeMap::depth], [`structural_hash`][ConTreeMap::structural_hash] and
//!   [`verify`][ConTreeMap::verify].
//! * With the `rayon` feature, the collections can be filled from parallel iterators.
//! * With the `logging` feature, the retries of the modifications are reported through the
//!   [`log`](https://docs.rs/log) crate on the `trace` level.
//!
//! # Limitations
//!
//! * There's no iteration nor range queries. The collections are meant for concurrent single-key
//!   access.
//! * The trees are not balanced. Inserting sorted keys makes a long chain of nodes, which is slow
//!   (though it works, nothing recurses over the depth of the tree).
//! * The values are cloned out of the collections. Wrap expensive values in an `Arc`.
//!
//! # Examples
//!
//! ```rust
//! use contree::ConTreeMap;
//! use crossbeam_utils::thread;
//!
//! let map = ConTreeMap::new();
//!
//! thread::scope(|s| {
//!     s.spawn(|_| {
//!         map.put_if_absent("hello", 1);
//!     });
//!     s.spawn(|_| {
//!         map.put_if_absent("world", 2);
//!     });
//! }).unwrap();
//!
//! assert_eq!(Some(1), map.get("hello"));
//! assert_eq!(Some(2), map.remove("world"));
//! assert_eq!(1, map.len());
//! ```

// The logging is optional. Without the feature the macros only borrow the arguments so the
// variables don't end up unused.
#[cfg(feature = "logging")]
macro_rules! log_trace {
    ($($arg:tt)*) => {
        log::trace!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_trace {
    ($fmt:expr $(, $arg:expr)* $(,)?) => {{
        $( let _ = &$arg; )*
    }};
}

#[cfg(feature = "logging")]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
macro_rules! log_debug {
    ($fmt:expr $(, $arg:expr)* $(,)?) => {{
        $( let _ = &$arg; )*
    }};
}

pub mod map;
pub mod raw;
pub mod set;

pub use self::map::ConTreeMap;
pub use self::raw::debug::Violation;
pub use self::set::ConTreeSet;
