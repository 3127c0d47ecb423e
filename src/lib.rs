#![warn(missing_docs)]
#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[cfg(feature = "log")]
macro_rules! trace {
    ($($arg:tt)+) => {
        log::trace!(target: "fib_hash", $($arg)+)
    };
}

#[cfg(not(feature = "log"))]
macro_rules! trace {
    ($($arg:tt)+) => {
        if false {
            let _ = format_args!($($arg)+);
        }
    };
}

pub(crate) use trace;

/// Error type shared by the map and the raw table.
pub mod error;

/// A HashMap implementation using Fibonacci hashing and linear probing.
///
/// This module provides a `HashMap` that wraps the `HashTable` and provides
/// a key-value map interface with configurable hashers and key equality.
pub mod hash_map;

pub mod hash_table;

/// Pluggable key equality for [`HashMap`].
pub mod key_eq;

#[cfg(feature = "stats")]
pub mod stats;

#[cfg(test)]
mod hash_map_proptest;

pub use error::Error;
pub use hash_map::Entry;
pub use hash_map::HashMap;
pub use hash_table::Handle;
pub use hash_table::HashTable;
pub use key_eq::DefaultKeyEq;
pub use key_eq::KeyEq;

cfg_if::cfg_if! {
    if #[cfg(feature = "foldhash")] {
        /// The hasher builder used by default: foldhash's randomly seeded
        /// `RandomState`.
        pub type DefaultHashBuilder = foldhash::fast::RandomState;
    } else if #[cfg(feature = "std")] {
        /// The hasher builder used by default: the standard library's
        /// randomly seeded `RandomState`.
        pub type DefaultHashBuilder = std::hash::RandomState;
    }
}
