//! A closure-driven open-addressing hash table.
//!
//! [`HashTable<V>`] stores values directly in a power-of-two array of slots.
//! Callers supply the hash of the value they are looking for, an equality
//! predicate, and (for anything that may move entries) a function that
//! re-derives the hash of a stored value. The typed
//! [`HashMap`](crate::HashMap) is built on top of this.
//!
//! Slots are mapped with Fibonacci hashing: the hash is multiplied by
//! `2^64 / φ` and the top `log2(capacity)` bits select the ideal slot.
//! Collisions walk forward one slot at a time, wrapping at the end of the
//! array. Removal repairs probe chains by shifting later entries back into
//! the hole, so the table never holds tombstones and a lookup may stop at the
//! first empty slot it sees.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::alloc::Layout;
use core::fmt::Debug;
use core::iter::FusedIterator;
use core::mem;

use crate::error::Error;
use crate::error::Fallibility;

/// `2^64 / φ` rounded to an odd integer.
pub const FIBONACCI_MULTIPLIER: u64 = 11_400_714_819_323_198_485;

/// Number of slots allocated by the first insertion into an unallocated table.
pub const INITIAL_CAPACITY: usize = 32;

/// The fixed upper bound on `len / capacity` maintained by insertions.
pub const MAX_LOAD_FACTOR: f32 = 0.75;

#[inline(always)]
fn exceeds_max_load(populated: usize, capacity: usize) -> bool {
    populated as u128 * 4 > capacity as u128 * 3
}

/// Maps `hash` to its ideal slot in a table of `capacity` slots.
///
/// `capacity` must be a power of two. The result is the top
/// `log2(capacity)` bits of `hash * FIBONACCI_MULTIPLIER`, which spreads even
/// sequential or low-entropy hashes evenly over the table.
///
/// # Examples
///
/// ```rust
/// use fib_hash::hash_table::fibonacci_index;
///
/// assert_eq!(fibonacci_index(0, 32), 0);
/// assert!(fibonacci_index(1, 32) < 32);
/// // A single-slot table has no bits to select.
/// assert_eq!(fibonacci_index(u64::MAX, 1), 0);
/// ```
#[inline(always)]
pub fn fibonacci_index(hash: u64, capacity: usize) -> usize {
    debug_assert!(capacity.is_power_of_two());
    let mixed = hash.wrapping_mul(FIBONACCI_MULTIPLIER);
    mixed
        .checked_shr(u64::BITS - capacity.trailing_zeros())
        .unwrap_or(0) as usize
}

fn allocate_slots<V>(
    capacity: usize,
    fallibility: Fallibility,
) -> Result<Box<[Option<V>]>, Error> {
    let layout =
        Layout::array::<Option<V>>(capacity).map_err(|_| fallibility.capacity_overflow())?;

    let mut slots = Vec::new();
    slots
        .try_reserve_exact(capacity)
        .map_err(|_| fallibility.alloc_err(layout))?;
    slots.resize_with(capacity, || None);

    Ok(slots.into_boxed_slice())
}

#[inline(always)]
fn infallible<T>(result: Result<T, Error>) -> T {
    match result {
        Ok(value) => value,
        Err(_) => unreachable!("infallible allocation returned an error"),
    }
}

#[inline(always)]
fn occupied<V>(slot: &Option<V>) -> &V {
    match slot {
        Some(value) => value,
        None => unreachable!("entry points at an empty slot"),
    }
}

#[inline(always)]
fn occupied_mut<V>(slot: &mut Option<V>) -> &mut V {
    match slot {
        Some(value) => value,
        None => unreachable!("entry points at an empty slot"),
    }
}

/// Outcome of walking a probe sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Probe {
    /// A slot holding a matching value.
    Found(usize),
    /// The first empty slot along the sequence.
    Vacant(usize),
    /// Every slot was visited without a match or a vacancy.
    Exhausted,
}

/// A positional reference to a slot of a [`HashTable`].
///
/// Handles are cheap to copy and do not borrow the table. A handle is tied to
/// the slot array that was live when it was created: anything that
/// reallocates the array (growth on insertion, `reserve`, `shrink_to_fit`,
/// `rehash`, `clear`) makes every outstanding handle stale, and positional
/// operations reject stale handles with [`Error::StaleHandle`].
///
/// Removals do not reallocate, but they shift later entries of the same probe
/// chain back by one or more slots, so a handle may afterwards refer to a
/// different entry or to an empty slot. Re-acquire handles after removing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Handle {
    index: usize,
    epoch: u64,
}

impl Handle {
    /// The slot index this handle refers to.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// An open-addressing hash table with linear probing and Fibonacci hashing.
///
/// `HashTable<V>` stores values of type `V`. Like the raw tables of other
/// hash map crates it does not know how to hash or compare its values: every
/// operation takes the hash of the target and an equality predicate, and
/// operations that may relocate entries also take a `hasher` that recomputes
/// the hash of a stored value.
///
/// ## Layout
///
/// - Capacity is always zero or a power of two. A new table allocates nothing
///   until the first insertion, which allocates [`INITIAL_CAPACITY`] slots.
/// - Insertions keep `len / capacity <= 0.75`, doubling the slot array before
///   a net-new insertion would exceed that.
/// - Removal uses backward-shift deletion instead of tombstones.
///
/// ## Example
///
/// ```rust
/// # use core::hash::Hash;
/// # use core::hash::Hasher;
/// #
/// # use fib_hash::hash_table::HashTable;
/// # use siphasher::sip::SipHasher;
/// #
/// # #[derive(Debug, PartialEq)]
/// # struct Person {
/// #     id: u64,
/// #     name: String,
/// # }
/// #
/// # fn hash_id(id: u64) -> u64 {
/// #     let mut hasher = SipHasher::new();
/// #     id.hash(&mut hasher);
/// #     hasher.finish()
/// # }
///
/// let mut table = HashTable::new();
/// let rehash = |p: &Person| hash_id(p.id);
///
/// match table.entry(hash_id(123), |p: &Person| p.id == 123, rehash) {
///     fib_hash::hash_table::Entry::Vacant(entry) => {
///         entry.insert(Person {
///             id: 123,
///             name: "Alice".to_string(),
///         });
///     }
///     fib_hash::hash_table::Entry::Occupied(_) => {
///         println!("Person already exists");
///     }
/// }
///
/// assert_eq!(table.capacity(), 32);
/// assert!(table.find(hash_id(123), |p| p.id == 123).is_some());
/// ```
#[derive(Clone)]
pub struct HashTable<V> {
    slots: Box<[Option<V>]>,
    populated: usize,
    epoch: u64,
}

impl<V> Debug for HashTable<V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        use alloc::string::String;

        f.debug_struct("HashTable")
            .field(
                "occupancy",
                &self
                    .slots
                    .chunks(32)
                    .map(|row| {
                        row.iter()
                            .map(|slot| if slot.is_some() { '#' } else { '.' })
                            .collect::<String>()
                    })
                    .collect::<Vec<_>>(),
            )
            .field("populated", &self.populated)
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl<V> Default for HashTable<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> HashTable<V> {
    /// Creates an empty table without allocating.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fib_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<u64> = HashTable::new();
    /// assert_eq!(table.capacity(), 0);
    /// ```
    pub fn new() -> Self {
        Self {
            slots: Box::default(),
            populated: 0,
            epoch: 0,
        }
    }

    /// Creates a table with at least `capacity` slots.
    ///
    /// The slot count is rounded up to a power of two. A capacity of zero
    /// allocates nothing.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fib_hash::hash_table::HashTable;
    /// #
    /// let table: HashTable<String> = HashTable::with_capacity(100);
    /// assert_eq!(table.capacity(), 128);
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        infallible(Self::with_capacity_inner(capacity, Fallibility::Infallible))
    }

    /// Fallible version of [`with_capacity`](Self::with_capacity).
    pub fn try_with_capacity(capacity: usize) -> Result<Self, Error> {
        Self::with_capacity_inner(capacity, Fallibility::Fallible)
    }

    fn with_capacity_inner(capacity: usize, fallibility: Fallibility) -> Result<Self, Error> {
        if capacity == 0 {
            return Ok(Self::new());
        }

        let capacity = capacity
            .checked_next_power_of_two()
            .ok_or_else(|| fallibility.capacity_overflow())?;
        Ok(Self {
            slots: allocate_slots(capacity, fallibility)?,
            populated: 0,
            epoch: 0,
        })
    }

    /// Returns the number of values in the table.
    pub fn len(&self) -> usize {
        self.populated
    }

    /// Returns `true` if the table holds no values.
    pub fn is_empty(&self) -> bool {
        self.populated == 0
    }

    /// Returns the number of allocated slots. Always zero or a power of two.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns `len / capacity`, or `0.0` for an unallocated table.
    pub fn load_factor(&self) -> f32 {
        if self.slots.is_empty() {
            0.0
        } else {
            self.populated as f32 / self.slots.len() as f32
        }
    }

    /// The largest slot count this table could ever allocate.
    pub fn max_capacity() -> usize {
        let max = isize::MAX as usize / mem::size_of::<Option<V>>().max(1);
        1usize << (usize::BITS - 1 - max.leading_zeros())
    }

    #[inline(always)]
    fn mask(&self) -> usize {
        self.slots.len().wrapping_sub(1)
    }

    #[inline(always)]
    fn home(&self, hash: u64) -> usize {
        fibonacci_index(hash, self.slots.len())
    }

    #[inline(always)]
    fn handle(&self, index: usize) -> Handle {
        Handle {
            index,
            epoch: self.epoch,
        }
    }

    #[inline(always)]
    fn needs_growth(&self, additional: usize) -> bool {
        exceeds_max_load(self.populated.saturating_add(additional), self.slots.len())
    }

    /// Walks the probe sequence of `hash` until a match, an empty slot, or a
    /// full lap of the table.
    #[inline]
    fn probe(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Probe {
        if self.slots.is_empty() {
            return Probe::Exhausted;
        }

        let mask = self.mask();
        let mut index = self.home(hash);
        for _ in 0..self.slots.len() {
            match &self.slots[index] {
                None => return Probe::Vacant(index),
                Some(value) if eq(value) => return Probe::Found(index),
                Some(_) => index = (index + 1) & mask,
            }
        }

        Probe::Exhausted
    }

    #[inline]
    fn find_index(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<usize> {
        if self.populated == 0 {
            return None;
        }

        match self.probe(hash, eq) {
            Probe::Found(index) => Some(index),
            Probe::Vacant(_) | Probe::Exhausted => None,
        }
    }

    /// Returns the first empty slot along the probe sequence of `hash`,
    /// without comparing against the values passed on the way.
    ///
    /// The table must have at least one empty slot.
    #[inline]
    fn find_vacant(&self, hash: u64) -> usize {
        debug_assert!(self.populated < self.slots.len());
        let mask = self.mask();
        let mut index = self.home(hash);
        while self.slots[index].is_some() {
            index = (index + 1) & mask;
        }
        index
    }

    fn check_handle(&self, handle: Handle) -> Result<usize, Error> {
        if handle.epoch != self.epoch {
            return Err(Error::StaleHandle);
        }
        if handle.index >= self.slots.len() {
            return Err(Error::NotFound);
        }
        Ok(handle.index)
    }

    fn next_occupied(&self, from: usize) -> Option<usize> {
        self.slots
            .get(from..)?
            .iter()
            .position(Option::is_some)
            .map(|offset| from + offset)
    }

    /// Finds a value by hash and equality predicate.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fib_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.insert_unique(42, 42u64, |&v| v);
    ///
    /// assert_eq!(table.find(42, |&v| v == 42), Some(&42));
    /// assert_eq!(table.find(99, |&v| v == 99), None);
    /// ```
    #[inline]
    pub fn find(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&V> {
        self.find_index(hash, eq)
            .map(|index| occupied(&self.slots[index]))
    }

    /// Finds a value by hash and equality predicate, returning a mutable
    /// reference.
    ///
    /// The caller must not change the parts of the value that feed its hash.
    #[inline]
    pub fn find_mut(&mut self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<&mut V> {
        self.find_index(hash, eq)
            .map(|index| occupied_mut(&mut self.slots[index]))
    }

    /// Finds a value by hash and equality predicate, returning a handle to its
    /// slot.
    pub fn find_handle(&self, hash: u64, eq: impl Fn(&V) -> bool) -> Option<Handle> {
        self.find_index(hash, eq).map(|index| self.handle(index))
    }

    /// Returns the value at `handle`.
    ///
    /// Fails with [`Error::StaleHandle`] if the slot array was reallocated
    /// after the handle was created, and with [`Error::NotFound`] if the slot
    /// is empty.
    pub fn get(&self, handle: Handle) -> Result<&V, Error> {
        let index = self.check_handle(handle)?;
        self.slots[index].as_ref().ok_or(Error::NotFound)
    }

    /// Returns the value at `handle` mutably. See [`get`](Self::get).
    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut V, Error> {
        let index = self.check_handle(handle)?;
        self.slots[index].as_mut().ok_or(Error::NotFound)
    }

    /// Returns a handle to the first live slot, or `None` if the table is
    /// empty.
    pub fn first_handle(&self) -> Option<Handle> {
        self.next_occupied(0).map(|index| self.handle(index))
    }

    /// Returns a handle to the next live slot after `handle`, or `None` once
    /// the end of the slot array is reached.
    pub fn next_handle(&self, handle: Handle) -> Result<Option<Handle>, Error> {
        let index = self.check_handle(handle)?;
        Ok(self.next_occupied(index + 1).map(|index| self.handle(index)))
    }

    /// Gets the entry for the given hash and equality predicate.
    ///
    /// If no value matches and inserting one would push the load factor past
    /// 0.75, the table grows before the vacant entry is returned, re-homing
    /// every value with `hasher`. An occupied lookup never grows the table.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fib_hash::hash_table::Entry;
    /// # use fib_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<(u64, &str)> = HashTable::new();
    /// let rehash = |&(k, _): &(u64, &str)| k;
    ///
    /// match table.entry(7, |&(k, _)| k == 7, rehash) {
    ///     Entry::Vacant(entry) => {
    ///         entry.insert((7, "seven"));
    ///     }
    ///     Entry::Occupied(mut entry) => {
    ///         entry.get_mut().1 = "updated";
    ///     }
    /// }
    ///
    /// table
    ///     .entry(7, |&(k, _)| k == 7, rehash)
    ///     .or_insert((7, "ignored"));
    /// assert_eq!(table.find(7, |&(k, _)| k == 7), Some(&(7, "seven")));
    /// ```
    #[inline]
    pub fn entry(
        &mut self,
        hash: u64,
        eq: impl Fn(&V) -> bool,
        hasher: impl Fn(&V) -> u64,
    ) -> Entry<'_, V> {
        let index = match self.probe(hash, eq) {
            Probe::Found(index) => {
                return Entry::Occupied(OccupiedEntry { table: self, index });
            }
            Probe::Vacant(index) if !self.needs_growth(1) => index,
            Probe::Vacant(_) | Probe::Exhausted => {
                self.grow(&hasher);
                self.find_vacant(hash)
            }
        };

        Entry::Vacant(VacantEntry { table: self, index })
    }

    /// Gets the entry for a value, trying `hint` first.
    ///
    /// If the slot at `hint` holds a matching value it is returned without
    /// probing. An empty hinted slot is only usable if it is the slot the
    /// probe sequence of `hash` ends at, so that case and any stale or wrong
    /// hint fall back to [`entry`](Self::entry).
    pub fn entry_with_hint(
        &mut self,
        hint: Handle,
        hash: u64,
        eq: impl Fn(&V) -> bool,
        hasher: impl Fn(&V) -> u64,
    ) -> Entry<'_, V> {
        if let Ok(index) = self.check_handle(hint) {
            let matches = matches!(&self.slots[index], Some(value) if eq(value));
            if matches {
                return Entry::Occupied(OccupiedEntry { table: self, index });
            }
        }

        self.entry(hash, eq, hasher)
    }

    /// Inserts `value` without checking whether an equal value is present.
    ///
    /// The caller guarantees no equal value is stored. If one is, the table
    /// will hold both and which one lookups find is unspecified.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fib_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// for v in 0..100u64 {
    ///     table.insert_unique(v, v, |&v| v);
    /// }
    /// assert_eq!(table.len(), 100);
    /// assert_eq!(table.capacity(), 256);
    /// ```
    pub fn insert_unique(&mut self, hash: u64, value: V, hasher: impl Fn(&V) -> u64) -> Handle {
        if self.needs_growth(1) {
            self.grow(&hasher);
        }

        let index = self.find_vacant(hash);
        self.slots[index] = Some(value);
        self.populated += 1;
        self.handle(index)
    }

    /// Removes and returns the value matching `hash` and `eq`.
    ///
    /// Later members of the probe chain are shifted back with `hasher`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fib_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.insert_unique(42, 42u64, |&v| v);
    ///
    /// assert_eq!(table.remove(42, |&v| v == 42, |&v| v), Some(42));
    /// assert_eq!(table.remove(42, |&v| v == 42, |&v| v), None);
    /// assert!(table.is_empty());
    /// ```
    pub fn remove(
        &mut self,
        hash: u64,
        eq: impl Fn(&V) -> bool,
        hasher: impl Fn(&V) -> u64,
    ) -> Option<V> {
        let index = self.find_index(hash, eq)?;
        self.erase_index(index, &hasher)
    }

    /// Removes the value at `handle`.
    ///
    /// Returns the value together with a handle to the next live slot at or
    /// after the vacated position, which backward shifting may have refilled.
    /// Entries whose probe chain wrapped past the end of the slot array may be
    /// shifted from the front of the array to its back, so a forward walk that
    /// continues from the returned handle can visit such an entry twice.
    pub fn remove_at(
        &mut self,
        handle: Handle,
        hasher: impl Fn(&V) -> u64,
    ) -> Result<(V, Option<Handle>), Error> {
        let index = self.check_handle(handle)?;
        let value = self.erase_index(index, &hasher).ok_or(Error::NotFound)?;
        let next = self.next_occupied(index).map(|index| self.handle(index));
        Ok((value, next))
    }

    /// Removes every value in the half-open slot range `[first, last)`.
    ///
    /// `last == None` stands for the end of the slot array. Returns the next
    /// live slot at or after `first`. The run of entries following the range
    /// is re-inserted so that no probe chain crosses a vacated slot.
    pub fn remove_range(
        &mut self,
        first: Handle,
        last: Option<Handle>,
        hasher: impl Fn(&V) -> u64,
    ) -> Result<Option<Handle>, Error> {
        let start = self.check_handle(first)?;
        let end = match last {
            Some(last) if last.epoch != self.epoch => return Err(Error::StaleHandle),
            Some(last) => last.index.min(self.slots.len()),
            None => self.slots.len(),
        };

        let mut removed = 0;
        if start < end {
            for slot in &mut self.slots[start..end] {
                if slot.take().is_some() {
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            self.populated -= removed;
            self.reinsert_run(end & self.mask(), &hasher);
        }

        Ok(self.next_occupied(start).map(|index| self.handle(index)))
    }

    /// Retains only the values for which `f` returns `true`.
    ///
    /// Every value is passed to `f` exactly once. The slot array is never
    /// reallocated, so handles stay current, although removals may shift
    /// entries into vacated slots.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fib_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// for v in 0..10u64 {
    ///     table.insert_unique(v, v, |&v| v);
    /// }
    ///
    /// table.retain(|v| *v % 2 == 0, |&v| v);
    /// assert_eq!(table.len(), 5);
    /// assert!(table.find(3, |&v| v == 3).is_none());
    /// assert!(table.find(4, |&v| v == 4).is_some());
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&mut V) -> bool, hasher: impl Fn(&V) -> u64) {
        if self.populated == 0 {
            return;
        }

        // The walk starts just past an empty slot so that no shift ever moves
        // an unvisited entry behind the cursor. A full array has none, so one
        // value is set aside until the walk is done.
        let held = if self.populated == self.slots.len() {
            self.erase_index(0, &hasher)
        } else {
            None
        };

        self.retain_from_empty(&mut f, &hasher);

        if let Some(mut value) = held
            && f(&mut value)
        {
            let index = self.find_vacant(hasher(&value));
            self.slots[index] = Some(value);
            self.populated += 1;
        }
    }

    fn retain_from_empty(
        &mut self,
        f: &mut impl FnMut(&mut V) -> bool,
        hasher: &impl Fn(&V) -> u64,
    ) {
        let mask = self.mask();
        let Some(empty) = self.slots.iter().position(Option::is_none) else {
            return;
        };

        let mut index = (empty + 1) & mask;
        for _ in 0..mask {
            loop {
                let keep = match &mut self.slots[index] {
                    Some(value) => f(value),
                    None => break,
                };
                if keep {
                    break;
                }
                drop(self.erase_index(index, hasher));
            }
            index = (index + 1) & mask;
        }
    }

    /// Vacates `index` and shifts later members of its probe chain back.
    fn erase_index(&mut self, index: usize, hasher: &impl Fn(&V) -> u64) -> Option<V> {
        let value = self.slots[index].take()?;
        self.populated -= 1;
        self.backward_shift(index, hasher);
        Some(value)
    }

    /// Closes the hole at `hole` left by a removal.
    ///
    /// Walks forward until an empty slot. An entry at `next` may fill the hole
    /// iff its ideal slot is not in the cyclic interval `(hole, next]`, i.e.
    /// it is at least as far from its ideal slot as the hole is from it. The
    /// walk continues past entries that must stay, since later entries may
    /// still belong before the hole.
    fn backward_shift(&mut self, mut hole: usize, hasher: &impl Fn(&V) -> u64) {
        let capacity = self.slots.len();
        let mask = self.mask();
        let mut next = (hole + 1) & mask;

        loop {
            let home = match &self.slots[next] {
                Some(value) => fibonacci_index(hasher(value), capacity),
                None => break,
            };

            let displacement = next.wrapping_sub(home) & mask;
            let gap = next.wrapping_sub(hole) & mask;
            if displacement >= gap {
                let moved = self.slots[next].take();
                self.slots[hole] = moved;
                hole = next;
            }

            next = (next + 1) & mask;
        }
    }

    /// Re-inserts the run of occupied slots starting at `start`.
    fn reinsert_run(&mut self, start: usize, hasher: &impl Fn(&V) -> u64) {
        let mask = self.mask();
        let mut index = start;
        while let Some(value) = self.slots[index].take() {
            let destination = self.find_vacant(hasher(&value));
            self.slots[destination] = Some(value);
            index = (index + 1) & mask;
        }
    }

    /// Removes all values and releases the slot array.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fib_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.insert_unique(1, 1u64, |&v| v);
    ///
    /// table.clear();
    /// assert!(table.is_empty());
    /// assert_eq!(table.capacity(), 0);
    /// ```
    pub fn clear(&mut self) {
        crate::trace!(
            "clear: releasing {} slots holding {} values",
            self.slots.len(),
            self.populated
        );
        self.slots = Box::default();
        self.populated = 0;
        self.epoch = self.epoch.wrapping_add(1);
    }

    /// Grows the slot array to at least `min_capacity` slots.
    ///
    /// The new capacity is `min_capacity.next_power_of_two()`; nothing happens
    /// if that does not exceed the current capacity.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fib_hash::hash_table::HashTable;
    /// #
    /// let mut table: HashTable<u64> = HashTable::new();
    /// table.reserve(3, |&v| v);
    /// assert_eq!(table.capacity(), 4);
    ///
    /// table.reserve(2, |&v| v);
    /// assert_eq!(table.capacity(), 4);
    /// ```
    pub fn reserve(&mut self, min_capacity: usize, hasher: impl Fn(&V) -> u64) {
        infallible(self.reserve_inner(min_capacity, &hasher, Fallibility::Infallible))
    }

    /// Fallible version of [`reserve`](Self::reserve). On error the table is
    /// unchanged.
    pub fn try_reserve(
        &mut self,
        min_capacity: usize,
        hasher: impl Fn(&V) -> u64,
    ) -> Result<(), Error> {
        self.reserve_inner(min_capacity, &hasher, Fallibility::Fallible)
    }

    fn reserve_inner(
        &mut self,
        min_capacity: usize,
        hasher: &impl Fn(&V) -> u64,
        fallibility: Fallibility,
    ) -> Result<(), Error> {
        if min_capacity <= self.slots.len() {
            return Ok(());
        }

        let capacity = min_capacity
            .checked_next_power_of_two()
            .ok_or_else(|| fallibility.capacity_overflow())?;
        self.resize(capacity, hasher, fallibility)
    }

    /// Shrinks the slot array to the smallest power of two holding every
    /// value, releasing it entirely when the table is empty.
    ///
    /// The result may be fuller than 0.75; the next net-new insertion grows
    /// the table first.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fib_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::with_capacity(1000);
    /// for v in 0..5u64 {
    ///     table.insert_unique(v, v, |&v| v);
    /// }
    ///
    /// table.shrink_to_fit(|&v| v);
    /// assert_eq!(table.capacity(), 8);
    /// ```
    pub fn shrink_to_fit(&mut self, hasher: impl Fn(&V) -> u64) {
        infallible(self.shrink_to_fit_inner(&hasher, Fallibility::Infallible))
    }

    /// Fallible version of [`shrink_to_fit`](Self::shrink_to_fit). On error
    /// the table is unchanged.
    pub fn try_shrink_to_fit(&mut self, hasher: impl Fn(&V) -> u64) -> Result<(), Error> {
        self.shrink_to_fit_inner(&hasher, Fallibility::Fallible)
    }

    fn shrink_to_fit_inner(
        &mut self,
        hasher: &impl Fn(&V) -> u64,
        fallibility: Fallibility,
    ) -> Result<(), Error> {
        if self.populated == 0 {
            if !self.slots.is_empty() {
                self.clear();
            }
            return Ok(());
        }

        let capacity = self.populated.next_power_of_two();
        if capacity < self.slots.len() {
            self.resize(capacity, hasher, fallibility)?;
        }
        Ok(())
    }

    /// Rebuilds the slot array with at least `min_capacity` slots.
    ///
    /// A `min_capacity` above the current capacity behaves like
    /// [`reserve`](Self::reserve). Otherwise every value is re-homed into a
    /// fresh array of the current capacity, which only changes the layout if
    /// `hasher` now produces different hashes.
    pub fn rehash(&mut self, min_capacity: usize, hasher: impl Fn(&V) -> u64) {
        infallible(self.rehash_inner(min_capacity, &hasher, Fallibility::Infallible))
    }

    /// Fallible version of [`rehash`](Self::rehash). On error the table is
    /// unchanged.
    pub fn try_rehash(
        &mut self,
        min_capacity: usize,
        hasher: impl Fn(&V) -> u64,
    ) -> Result<(), Error> {
        self.rehash_inner(min_capacity, &hasher, Fallibility::Fallible)
    }

    fn rehash_inner(
        &mut self,
        min_capacity: usize,
        hasher: &impl Fn(&V) -> u64,
        fallibility: Fallibility,
    ) -> Result<(), Error> {
        if min_capacity > self.slots.len() {
            return self.reserve_inner(min_capacity, hasher, fallibility);
        }
        if self.slots.is_empty() {
            return Ok(());
        }

        self.resize(self.slots.len(), hasher, fallibility)
    }

    #[cold]
    #[inline(never)]
    fn grow(&mut self, hasher: &impl Fn(&V) -> u64) {
        let mut capacity = if self.slots.is_empty() {
            INITIAL_CAPACITY
        } else {
            self.slots
                .len()
                .checked_mul(2)
                .unwrap_or_else(|| panic!("hash table capacity overflow"))
        };
        // A table shrunk past the load limit may need more than one doubling.
        while exceeds_max_load(self.populated + 1, capacity) {
            capacity = capacity
                .checked_mul(2)
                .unwrap_or_else(|| panic!("hash table capacity overflow"));
        }

        infallible(self.resize(capacity, hasher, Fallibility::Infallible));
    }

    /// Moves every value into a freshly allocated array of `capacity` slots.
    ///
    /// The only fallible step is the allocation, which happens before any
    /// value moves. If `hasher` panics the table keeps the values moved so
    /// far and drops the rest.
    fn resize(
        &mut self,
        capacity: usize,
        hasher: &impl Fn(&V) -> u64,
        fallibility: Fallibility,
    ) -> Result<(), Error> {
        debug_assert!(capacity == 0 || capacity.is_power_of_two());
        debug_assert!(self.populated <= capacity);

        let slots = allocate_slots::<V>(capacity, fallibility)?;
        crate::trace!(
            "resize: {} -> {} slots for {} values",
            self.slots.len(),
            capacity,
            self.populated
        );

        let mut guard = RehomeGuard {
            table: self,
            slots,
            moved: 0,
        };
        if capacity > 0 {
            let mask = capacity - 1;
            for old in 0..guard.table.slots.len() {
                let Some(value) = guard.table.slots[old].as_ref() else {
                    continue;
                };

                let mut index = fibonacci_index(hasher(value), capacity);
                while guard.slots[index].is_some() {
                    index = (index + 1) & mask;
                }
                guard.slots[index] = guard.table.slots[old].take();
                guard.moved += 1;
            }
        }

        Ok(())
    }

    /// Returns an iterator over all values in the table, in slot order.
    ///
    /// The order is unspecified and changes whenever the table reallocates.
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            slots: self.slots.iter(),
            remaining: self.populated,
        }
    }

    /// Returns an iterator yielding mutable references to all values.
    ///
    /// The caller must not change the parts of the values that feed their
    /// hashes.
    pub fn iter_mut(&mut self) -> IterMut<'_, V> {
        IterMut {
            slots: self.slots.iter_mut(),
            remaining: self.populated,
        }
    }

    /// Removes and yields every value, keeping the allocated slots.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fib_hash::hash_table::HashTable;
    /// #
    /// let mut table = HashTable::new();
    /// table.insert_unique(1, 1u64, |&v| v);
    /// table.insert_unique(2, 2u64, |&v| v);
    ///
    /// let mut values: Vec<u64> = table.drain().collect();
    /// values.sort();
    /// assert_eq!(values, [1, 2]);
    /// assert!(table.is_empty());
    /// assert_eq!(table.capacity(), 32);
    /// ```
    pub fn drain(&mut self) -> Drain<'_, V> {
        Drain {
            table: self,
            index: 0,
        }
    }

    /// Returns a histogram of probe displacements, indexed by how many slots
    /// each value sits past its ideal slot.
    #[cfg(feature = "stats")]
    pub fn probe_histogram(&self, hasher: impl Fn(&V) -> u64) -> crate::stats::ProbeHistogram {
        let capacity = self.slots.len();
        let mut histogram = crate::stats::ProbeHistogram::default();
        for (index, slot) in self.slots.iter().enumerate() {
            if let Some(value) = slot {
                let home = fibonacci_index(hasher(value), capacity);
                histogram.record(index.wrapping_sub(home) & self.mask());
            }
        }
        histogram
    }

    /// Returns occupancy and memory statistics.
    #[cfg(feature = "stats")]
    pub fn debug_stats(&self) -> crate::stats::DebugStats {
        let slot_size = mem::size_of::<Option<V>>();
        let total_slots = self.slots.len();
        crate::stats::DebugStats {
            populated: self.populated,
            capacity: total_slots,
            max_populated: total_slots / 4 * 3,
            load_factor: self.load_factor(),
            total_bytes: total_slots * slot_size,
            wasted_bytes: (total_slots - self.populated) * slot_size,
        }
    }
}

impl<V> IntoIterator for HashTable<V> {
    type IntoIter = IntoIter<V>;
    type Item = V;

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            remaining: self.populated,
            slots: self.slots.into_vec().into_iter(),
        }
    }
}

impl<'a, V> IntoIterator for &'a HashTable<V> {
    type IntoIter = Iter<'a, V>;
    type Item = &'a V;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, V> IntoIterator for &'a mut HashTable<V> {
    type IntoIter = IterMut<'a, V>;
    type Item = &'a mut V;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// Installs the new slot array when re-homing ends.
///
/// If `hasher` unwinds partway, the table keeps only the values already
/// moved. Their chains were built in the new array and stay intact, and the
/// values left behind are dropped with the old array.
struct RehomeGuard<'a, V> {
    table: &'a mut HashTable<V>,
    slots: Box<[Option<V>]>,
    moved: usize,
}

impl<V> Drop for RehomeGuard<'_, V> {
    fn drop(&mut self) {
        self.table.slots = mem::take(&mut self.slots);
        self.table.populated = self.moved;
        self.table.epoch = self.table.epoch.wrapping_add(1);
    }
}

/// A view into a single entry in the table, which may be vacant or occupied.
///
/// This enum is constructed by [`HashTable::entry`].
pub enum Entry<'a, V> {
    /// No value matched; the entry owns the slot an insertion will fill.
    Vacant(VacantEntry<'a, V>),
    /// A matching value is present.
    Occupied(OccupiedEntry<'a, V>),
}

impl<'a, V> Entry<'a, V> {
    /// Inserts `default` if the entry is vacant and returns a mutable
    /// reference to the value.
    pub fn or_insert(self, default: V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default),
        }
    }

    /// Inserts the result of `default` if the entry is vacant and returns a
    /// mutable reference to the value.
    pub fn or_insert_with(self, default: impl FnOnce() -> V) -> &'a mut V {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Applies `f` to an occupied entry's value. Vacant entries yield `None`
    /// and insert nothing.
    pub fn and_modify(self, f: impl FnOnce(&mut V)) -> Option<&'a mut V> {
        match self {
            Entry::Occupied(entry) => {
                let value = entry.into_mut();
                f(value);
                Some(value)
            }
            Entry::Vacant(_) => None,
        }
    }

    /// Inserts `V::default()` if the entry is vacant and returns a mutable
    /// reference to the value.
    pub fn or_default(self) -> &'a mut V
    where
        V: Default,
    {
        self.or_insert_with(Default::default)
    }
}

/// A view into a vacant slot of the table.
pub struct VacantEntry<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
}

impl<'a, V> VacantEntry<'a, V> {
    /// Inserts `value` and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        let table = self.table;
        debug_assert!(table.slots[self.index].is_none());
        table.populated += 1;
        table.slots[self.index].insert(value)
    }

    /// Inserts `value` and returns the now occupied entry.
    pub fn insert_entry(self, value: V) -> OccupiedEntry<'a, V> {
        let table = self.table;
        debug_assert!(table.slots[self.index].is_none());
        table.populated += 1;
        table.slots[self.index] = Some(value);
        OccupiedEntry {
            table,
            index: self.index,
        }
    }
}

/// A view into an occupied slot of the table.
pub struct OccupiedEntry<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
}

impl<'a, V> OccupiedEntry<'a, V> {
    /// Gets a reference to the value.
    pub fn get(&self) -> &V {
        occupied(&self.table.slots[self.index])
    }

    /// Gets a mutable reference to the value.
    pub fn get_mut(&mut self) -> &mut V {
        occupied_mut(&mut self.table.slots[self.index])
    }

    /// Converts the entry into a mutable reference with the entry's lifetime.
    pub fn into_mut(self) -> &'a mut V {
        let table = self.table;
        occupied_mut(&mut table.slots[self.index])
    }

    /// Returns a handle to the entry's slot.
    pub fn handle(&self) -> Handle {
        self.table.handle(self.index)
    }

    /// Removes the value, shifting later members of its probe chain back with
    /// `hasher`.
    pub fn remove(self, hasher: impl Fn(&V) -> u64) -> V {
        match self.table.erase_index(self.index, &hasher) {
            Some(value) => value,
            None => unreachable!("entry points at an empty slot"),
        }
    }
}

/// An iterator over the values of a [`HashTable`].
///
/// Created by [`HashTable::iter`].
pub struct Iter<'a, V> {
    slots: core::slice::Iter<'a, Option<V>>,
    remaining: usize,
}

impl<V> Clone for Iter<'_, V> {
    fn clone(&self) -> Self {
        Self {
            slots: self.slots.clone(),
            remaining: self.remaining,
        }
    }
}

impl<'a, V> Iterator for Iter<'a, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let value = self.slots.find_map(Option::as_ref)?;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}
impl<V> FusedIterator for Iter<'_, V> {}

/// A mutable iterator over the values of a [`HashTable`].
///
/// Created by [`HashTable::iter_mut`].
pub struct IterMut<'a, V> {
    slots: core::slice::IterMut<'a, Option<V>>,
    remaining: usize,
}

impl<'a, V> Iterator for IterMut<'a, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let value = self.slots.find_map(Option::as_mut)?;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for IterMut<'_, V> {}
impl<V> FusedIterator for IterMut<'_, V> {}

/// An owning iterator over the values of a [`HashTable`].
pub struct IntoIter<V> {
    slots: alloc::vec::IntoIter<Option<V>>,
    remaining: usize,
}

impl<V> Iterator for IntoIter<V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let value = self.slots.find_map(|slot| slot)?;
        self.remaining -= 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for IntoIter<V> {}
impl<V> FusedIterator for IntoIter<V> {}

/// A draining iterator over the values of a [`HashTable`].
///
/// Created by [`HashTable::drain`]. Values not consumed are dropped when the
/// iterator is.
pub struct Drain<'a, V> {
    table: &'a mut HashTable<V>,
    index: usize,
}

impl<V> Drop for Drain<'_, V> {
    fn drop(&mut self) {
        for _ in &mut *self {}
    }
}

impl<V> Iterator for Drain<'_, V> {
    type Item = V;

    fn next(&mut self) -> Option<Self::Item> {
        while self.table.populated > 0 && self.index < self.table.slots.len() {
            let slot = self.table.slots[self.index].take();
            self.index += 1;
            if slot.is_some() {
                self.table.populated -= 1;
                return slot;
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.table.populated, Some(self.table.populated))
    }
}

impl<V> ExactSizeIterator for Drain<'_, V> {}
impl<V> FusedIterator for Drain<'_, V> {}
