use alloc::alloc::handle_alloc_error;
use core::alloc::Layout;
use core::fmt;

/// The error type for fallible table operations.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// The requested key is not present in the table.
    NotFound,

    /// The computed slot array size exceeds the maximum allocation size
    /// (`isize::MAX` bytes).
    CapacityOverflow,

    /// The allocator refused the slot array. The table is left exactly as it
    /// was before the call.
    AllocationFailure {
        /// The layout of the allocation request that failed.
        layout: Layout,
    },

    /// A [`Handle`](crate::hash_table::Handle) was used after the slot array
    /// it pointed into was reallocated.
    StaleHandle,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound => f.write_str("key not found"),
            Error::CapacityOverflow => f.write_str("hash table capacity overflow"),
            Error::AllocationFailure { layout } => write!(
                f,
                "failed to allocate {} bytes for the slot array",
                layout.size()
            ),
            Error::StaleHandle => f.write_str("handle refers to a reallocated slot array"),
        }
    }
}

impl core::error::Error for Error {}

/// Whether allocation errors should be returned or abort the caller.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Fallibility {
    Fallible,
    Infallible,
}

impl Fallibility {
    #[cold]
    pub(crate) fn capacity_overflow(self) -> Error {
        match self {
            Fallibility::Fallible => Error::CapacityOverflow,
            Fallibility::Infallible => panic!("hash table capacity overflow"),
        }
    }

    #[cold]
    pub(crate) fn alloc_err(self, layout: Layout) -> Error {
        match self {
            Fallibility::Fallible => Error::AllocationFailure { layout },
            Fallibility::Infallible => handle_alloc_error(layout),
        }
    }
}
