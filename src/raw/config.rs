use std::marker::PhantomData;

/// Customization of the [`Raw`][crate::raw::Raw].
///
/// This specifies what the tree orders by and what it keeps next to each key. Each node stores
/// its key separately from the value, because a routing node keeps the key (to direct the
/// searches) long after its value is gone.
pub trait Config {
    /// The ordering key, stored inside each node and never changed.
    type Key: Ord;

    /// The payload attached to each present key.
    type Value;
}

/// A trivial config, where only the key is stored and there's nothing attached to it.
///
/// This is what sets use.
pub struct Trivial<T>(PhantomData<T>);

impl<T> Config for Trivial<T>
where
    T: Ord,
{
    type Key = T;
    type Value = ();
}
