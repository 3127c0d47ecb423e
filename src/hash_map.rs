use core::borrow::Borrow;
use core::fmt::Debug;
use core::hash::BuildHasher;
use core::hash::Hash;
use core::iter::FusedIterator;
use core::mem;
use core::ops::Index;

use crate::error::Error;
use crate::hash_table;
use crate::hash_table::Entry as TableEntry;
use crate::hash_table::Handle;
use crate::hash_table::HashTable;
use crate::hash_table::MAX_LOAD_FACTOR;
use crate::key_eq::DefaultKeyEq;
use crate::key_eq::KeyEq;

#[inline(always)]
fn make_hasher<K, V, S>(hash_builder: &S) -> impl Fn(&(K, V)) -> u64 + '_
where
    K: Hash,
    S: BuildHasher,
{
    move |(k, _): &(K, V)| hash_builder.hash_one(k)
}

#[inline(always)]
fn equivalent<'a, K, V, Q, E>(key_eq: &'a E, key: &'a Q) -> impl Fn(&(K, V)) -> bool + 'a
where
    K: Borrow<Q>,
    Q: ?Sized,
    E: KeyEq<Q>,
{
    move |(k, _): &(K, V)| key_eq.eq(<K as Borrow<Q>>::borrow(k), key)
}

/// A hash map using Fibonacci hashing and linear probing, built on
/// [`HashTable`].
///
/// `HashMap<K, V, S, E>` hashes keys with the builder `S` and compares them
/// with the equality functor `E` (by default [`Eq`]). Both are held by value
/// and can be inspected with [`hasher`](Self::hasher) and
/// [`key_eq`](Self::key_eq).
///
/// # Insertion policies
///
/// Each insertion method has one fixed behavior when the key is already
/// present:
///
/// | Method | Key absent | Key present |
/// |---|---|---|
/// | [`insert`](Self::insert) | inserts | leaves the map unchanged |
/// | [`insert_or_assign`](Self::insert_or_assign) | inserts | replaces the value |
/// | [`insert_unique`](Self::insert_unique) | inserts without probing | must not happen |
/// | [`find_or_insert`](Self::find_or_insert) | inserts `V::default()` | returns the value |
///
/// All but `find_or_insert` return a [`Handle`] to the key's slot and whether
/// a new slot was filled.
///
/// # Handles and reallocation
///
/// Any insertion may reallocate the slot array, as do
/// [`reserve`](Self::reserve), [`shrink_to_fit`](Self::shrink_to_fit),
/// [`rehash`](Self::rehash) and [`clear`](Self::clear). Handles created before
/// a reallocation are rejected with [`Error::StaleHandle`].
///
/// # Examples
///
/// ```rust
/// use fib_hash::DefaultHashBuilder;
/// use fib_hash::HashMap;
///
/// let mut map: HashMap<&str, i32, DefaultHashBuilder> = HashMap::new();
/// map.insert("foo", 3);
/// map.insert("bar", 42);
///
/// assert_eq!(map.len(), 2);
/// assert_eq!(map["foo"], 3);
/// assert_eq!(map.get("bar"), Some(&42));
/// assert!(!map.contains_key("baz"));
/// ```
#[derive(Clone)]
pub struct HashMap<K, V, S, E = DefaultKeyEq> {
    table: HashTable<(K, V)>,
    hash_builder: S,
    key_eq: E,
}

impl<K, V, S, E> Debug for HashMap<K, V, S, E>
where
    K: Debug,
    V: Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut map = f.debug_map();
        for (k, v) in self.iter() {
            map.entry(k, v);
        }
        map.finish()
    }
}

impl<K, V, S> HashMap<K, V, S, DefaultKeyEq> {
    /// Creates an empty map with the given hasher builder. Nothing is
    /// allocated until the first insertion.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use fib_hash::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: HashMap<i32, String, _> = HashMap::with_hasher(SimpleHasher);
    /// assert!(map.is_empty());
    /// assert_eq!(map.capacity(), 0);
    /// ```
    pub fn with_hasher(hash_builder: S) -> Self {
        Self::with_hasher_and_key_eq(hash_builder, DefaultKeyEq)
    }

    /// Creates a map with at least `capacity` slots and the given hasher
    /// builder. The slot count is rounded up to a power of two.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use fib_hash::HashMap;
    /// #
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: HashMap<i32, String, _> = HashMap::with_capacity_and_hasher(100, SimpleHasher);
    /// assert_eq!(map.capacity(), 128);
    /// ```
    pub fn with_capacity_and_hasher(capacity: usize, hash_builder: S) -> Self {
        Self::with_capacity_hasher_and_key_eq(capacity, hash_builder, DefaultKeyEq)
    }
}

impl<K, V, S, E> HashMap<K, V, S, E> {
    /// Creates an empty map with the given hasher builder and key equality.
    pub fn with_hasher_and_key_eq(hash_builder: S, key_eq: E) -> Self {
        Self {
            table: HashTable::new(),
            hash_builder,
            key_eq,
        }
    }

    /// Creates a map with at least `capacity` slots, the given hasher builder
    /// and key equality.
    pub fn with_capacity_hasher_and_key_eq(capacity: usize, hash_builder: S, key_eq: E) -> Self {
        Self {
            table: HashTable::with_capacity(capacity),
            hash_builder,
            key_eq,
        }
    }

    /// Returns the number of elements in the map.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Returns `true` if the map contains no elements.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Returns the number of allocated slots, always zero or a power of two.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Alias of [`capacity`](Self::capacity).
    pub fn bucket_count(&self) -> usize {
        self.table.capacity()
    }

    /// The largest slot count the map could ever allocate.
    pub fn max_bucket_count(&self) -> usize {
        HashTable::<(K, V)>::max_capacity()
    }

    /// Returns `len / capacity`, or `0.0` while nothing is allocated.
    pub fn load_factor(&self) -> f32 {
        self.table.load_factor()
    }

    /// Returns the maximum load factor, fixed at 0.75.
    pub fn max_load_factor(&self) -> f32 {
        MAX_LOAD_FACTOR
    }

    /// Accepts and ignores a new maximum load factor. The load factor is not
    /// configurable.
    pub fn set_max_load_factor(&mut self, _max_load_factor: f32) {}

    /// Returns a reference to the map's hasher builder.
    pub fn hasher(&self) -> &S {
        &self.hash_builder
    }

    /// Returns a reference to the map's key equality.
    pub fn key_eq(&self) -> &E {
        &self.key_eq
    }

    /// Removes all elements and releases the slot array.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fib_hash::DefaultHashBuilder;
    /// # use fib_hash::HashMap;
    /// #
    /// let mut map: HashMap<i32, &str, DefaultHashBuilder> = HashMap::new();
    /// map.insert(1, "a");
    /// map.clear();
    /// assert!(map.is_empty());
    /// assert_eq!(map.capacity(), 0);
    /// ```
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Exchanges the contents, hasher builders and key equalities of two maps.
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    /// Returns an iterator over the key-value pairs in unspecified order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over the pairs with mutable references to the
    /// values.
    pub fn iter_mut(&mut self) -> IterMut<'_, K, V> {
        IterMut {
            inner: self.table.iter_mut(),
        }
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over the values.
    pub fn values(&self) -> Values<'_, K, V> {
        Values {
            inner: self.table.iter(),
        }
    }

    /// Returns an iterator over mutable references to the values.
    pub fn values_mut(&mut self) -> ValuesMut<'_, K, V> {
        ValuesMut {
            inner: self.table.iter_mut(),
        }
    }

    /// Removes and yields every pair, keeping the allocated slots.
    pub fn drain(&mut self) -> Drain<'_, K, V> {
        Drain {
            inner: self.table.drain(),
        }
    }

    /// Returns the pair at `handle`.
    pub fn get_at(&self, handle: Handle) -> Result<(&K, &V), Error> {
        self.table.get(handle).map(|(k, v)| (k, v))
    }

    /// Returns the pair at `handle` with a mutable reference to the value.
    pub fn get_at_mut(&mut self, handle: Handle) -> Result<(&K, &mut V), Error> {
        self.table.get_mut(handle).map(|(k, v)| (&*k, v))
    }

    /// Returns a handle to the first occupied slot.
    pub fn first_handle(&self) -> Option<Handle> {
        self.table.first_handle()
    }

    /// Returns a handle to the next occupied slot after `handle`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fib_hash::DefaultHashBuilder;
    /// # use fib_hash::HashMap;
    /// #
    /// let map: HashMap<u32, u32, DefaultHashBuilder> = (0..10).map(|i| (i, i * i)).collect();
    ///
    /// let mut total = 0;
    /// let mut cursor = map.first_handle();
    /// while let Some(handle) = cursor {
    ///     total += map.get_at(handle).unwrap().1;
    ///     cursor = map.next_handle(handle).unwrap();
    /// }
    /// assert_eq!(total, 285);
    /// ```
    pub fn next_handle(&self, handle: Handle) -> Result<Option<Handle>, Error> {
        self.table.next_handle(handle)
    }

    /// Returns slot occupancy and memory statistics.
    #[cfg(feature = "stats")]
    pub fn debug_stats(&self) -> crate::stats::DebugStats {
        self.table.debug_stats()
    }
}

impl<K, V, S, E> HashMap<K, V, S, E>
where
    S: Default,
    E: Default,
{
    /// Creates an empty map using the default hasher builder.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use core::hash::BuildHasher;
    /// # use siphasher::sip::SipHasher;
    /// #
    /// # use fib_hash::HashMap;
    /// #
    /// # #[derive(Default)]
    /// # struct SimpleHasher;
    /// # impl BuildHasher for SimpleHasher {
    /// #     type Hasher = SipHasher;
    /// #
    /// #     fn build_hasher(&self) -> Self::Hasher {
    /// #         SipHasher::new()
    /// #     }
    /// # }
    /// #
    /// let map: HashMap<i32, String, SimpleHasher> = HashMap::new();
    /// assert!(map.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_hasher_and_key_eq(S::default(), E::default())
    }

    /// Creates a map with at least `capacity` slots using the default hasher
    /// builder.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_hasher_and_key_eq(capacity, S::default(), E::default())
    }
}

impl<K, V, S, E> Default for HashMap<K, V, S, E>
where
    S: Default,
    E: Default,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S, E> HashMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher,
    E: KeyEq<K>,
{
    /// Grows the slot array to at least `min_capacity` slots, rounded up to a
    /// power of two. Does nothing if the map already has that many.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fib_hash::DefaultHashBuilder;
    /// # use fib_hash::HashMap;
    /// #
    /// let mut map: HashMap<i32, i32, DefaultHashBuilder> = HashMap::new();
    /// map.reserve(3);
    /// assert_eq!(map.capacity(), 4);
    /// map.reserve(4096);
    /// assert_eq!(map.capacity(), 4096);
    /// ```
    pub fn reserve(&mut self, min_capacity: usize) {
        self.table
            .reserve(min_capacity, make_hasher::<K, V, S>(&self.hash_builder));
    }

    /// Fallible version of [`reserve`](Self::reserve). On error the map is
    /// unchanged.
    pub fn try_reserve(&mut self, min_capacity: usize) -> Result<(), Error> {
        self.table
            .try_reserve(min_capacity, make_hasher::<K, V, S>(&self.hash_builder))
    }

    /// Shrinks the slot array to the smallest power of two holding every
    /// element, or releases it if the map is empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fib_hash::DefaultHashBuilder;
    /// # use fib_hash::HashMap;
    /// #
    /// let mut map: HashMap<i32, &str, DefaultHashBuilder> = HashMap::with_capacity(100);
    /// map.insert(1, "one");
    /// map.insert(2, "two");
    /// assert_eq!(map.capacity(), 128);
    ///
    /// map.shrink_to_fit();
    /// assert_eq!(map.capacity(), 2);
    /// assert_eq!(map.get(&2), Some(&"two"));
    /// ```
    pub fn shrink_to_fit(&mut self) {
        self.table.shrink_to_fit(make_hasher::<K, V, S>(&self.hash_builder));
    }

    /// Fallible version of [`shrink_to_fit`](Self::shrink_to_fit).
    pub fn try_shrink_to_fit(&mut self) -> Result<(), Error> {
        self.table.try_shrink_to_fit(make_hasher::<K, V, S>(&self.hash_builder))
    }

    /// Rebuilds the slot array with at least `min_capacity` slots. At or below
    /// the current capacity every element is re-homed in a fresh array of the
    /// same size.
    pub fn rehash(&mut self, min_capacity: usize) {
        self.table
            .rehash(min_capacity, make_hasher::<K, V, S>(&self.hash_builder));
    }

    /// Fallible version of [`rehash`](Self::rehash).
    pub fn try_rehash(&mut self, min_capacity: usize) -> Result<(), Error> {
        self.table
            .try_rehash(min_capacity, make_hasher::<K, V, S>(&self.hash_builder))
    }

    /// Inserts `(key, value)` if `key` is absent.
    ///
    /// Returns a handle to the key's slot and `true` if the pair was inserted.
    /// If the key is present the map is unchanged, `value` is dropped, and the
    /// existing slot is returned with `false`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fib_hash::DefaultHashBuilder;
    /// # use fib_hash::HashMap;
    /// #
    /// let mut map: HashMap<i32, &str, DefaultHashBuilder> = HashMap::new();
    /// let (first, inserted) = map.insert(37, "a");
    /// assert!(inserted);
    ///
    /// let (again, inserted) = map.insert(37, "b");
    /// assert!(!inserted);
    /// assert_eq!(again, first);
    /// assert_eq!(map[&37], "a");
    /// ```
    pub fn insert(&mut self, key: K, value: V) -> (Handle, bool) {
        match self.entry(key) {
            Entry::Occupied(entry) => (entry.handle(), false),
            Entry::Vacant(entry) => (entry.insert_entry(value).handle(), true),
        }
    }

    /// Inserts `(key, value)`, replacing the value if `key` is present.
    ///
    /// Returns a handle to the key's slot and `true` if a new slot was filled.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fib_hash::DefaultHashBuilder;
    /// # use fib_hash::HashMap;
    /// #
    /// let mut map: HashMap<&str, i32, DefaultHashBuilder> = HashMap::new();
    /// map.insert("foo", 3);
    ///
    /// let (_, inserted) = map.insert_or_assign("foo", 255);
    /// assert!(!inserted);
    /// assert_eq!(map["foo"], 255);
    /// assert_eq!(map.len(), 1);
    /// ```
    pub fn insert_or_assign(&mut self, key: K, value: V) -> (Handle, bool) {
        match self.entry(key) {
            Entry::Occupied(mut entry) => {
                entry.insert(value);
                (entry.handle(), false)
            }
            Entry::Vacant(entry) => (entry.insert_entry(value).handle(), true),
        }
    }

    /// Inserts `(key, value)` without checking whether `key` is present.
    ///
    /// The caller guarantees the key is absent. Inserting a duplicate is not
    /// memory-unsafe, but the map will then hold both pairs and lookups may
    /// return either.
    pub fn insert_unique(&mut self, key: K, value: V) -> Handle {
        let hash = self.hash_builder.hash_one(&key);
        self.table
            .insert_unique(hash, (key, value), make_hasher::<K, V, S>(&self.hash_builder))
    }

    /// Returns the value for `key`, inserting `V::default()` first if absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fib_hash::DefaultHashBuilder;
    /// # use fib_hash::HashMap;
    /// #
    /// let mut counts: HashMap<char, u32, DefaultHashBuilder> = HashMap::new();
    /// for c in "hello".chars() {
    ///     *counts.find_or_insert(c) += 1;
    /// }
    /// assert_eq!(counts[&'l'], 2);
    /// ```
    pub fn find_or_insert(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.entry(key).or_default()
    }

    /// Returns the value for `key`, inserting the result of `make` first if
    /// absent.
    pub fn find_or_insert_with(&mut self, key: K, make: impl FnOnce() -> V) -> &mut V {
        self.entry(key).or_insert_with(make)
    }

    /// Inserts a value built by `make` if `key` is absent. `make` is not
    /// called when the key is present.
    pub fn emplace(&mut self, key: K, make: impl FnOnce() -> V) -> (Handle, bool) {
        match self.entry(key) {
            Entry::Occupied(entry) => (entry.handle(), false),
            Entry::Vacant(entry) => (entry.insert_entry(make()).handle(), true),
        }
    }

    /// Inserts or replaces the value for `key` with the result of `make`.
    pub fn emplace_or_assign(&mut self, key: K, make: impl FnOnce() -> V) -> (Handle, bool) {
        self.insert_or_assign(key, make())
    }

    /// Like [`emplace`](Self::emplace), trying the slot at `hint` first.
    ///
    /// If `hint` refers to the slot already holding `key`, no probing is done.
    /// A stale or unrelated hint is ignored. The map only grows when a new
    /// pair is actually inserted.
    pub fn emplace_hint(
        &mut self,
        hint: Handle,
        key: K,
        make: impl FnOnce() -> V,
    ) -> (Handle, bool) {
        let hash = self.hash_builder.hash_one(&key);
        match self.table.entry_with_hint(
            hint,
            hash,
            equivalent::<K, V, K, E>(&self.key_eq, &key),
            make_hasher::<K, V, S>(&self.hash_builder),
        ) {
            TableEntry::Occupied(entry) => (entry.handle(), false),
            TableEntry::Vacant(entry) => (entry.insert_entry((key, make())).handle(), true),
        }
    }

    /// Gets the entry for `key` for in-place manipulation.
    ///
    /// If `key` is absent and inserting it would exceed the maximum load
    /// factor, the map grows before the vacant entry is returned.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fib_hash::DefaultHashBuilder;
    /// # use fib_hash::HashMap;
    /// #
    /// let mut map: HashMap<&str, u32, DefaultHashBuilder> = HashMap::new();
    /// map.entry("poneyland").or_insert(3);
    /// *map.entry("poneyland").or_insert(10) *= 2;
    /// assert_eq!(map["poneyland"], 6);
    /// ```
    pub fn entry(&mut self, key: K) -> Entry<'_, K, V, S> {
        let hash = self.hash_builder.hash_one(&key);
        let hash_builder = &self.hash_builder;
        match self.table.entry(
            hash,
            equivalent::<K, V, K, E>(&self.key_eq, &key),
            make_hasher::<K, V, S>(hash_builder),
        ) {
            TableEntry::Occupied(entry) => Entry::Occupied(OccupiedEntry {
                entry,
                hash_builder,
            }),
            TableEntry::Vacant(entry) => Entry::Vacant(VacantEntry {
                entry,
                key,
                hash_builder,
            }),
        }
    }

    /// Retains only the pairs for which `f` returns `true`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fib_hash::DefaultHashBuilder;
    /// # use fib_hash::HashMap;
    /// #
    /// let mut map: HashMap<i32, i32, DefaultHashBuilder> = (0..8).map(|x| (x, x * 10)).collect();
    /// map.retain(|&k, _| k % 2 == 0);
    /// assert_eq!(map.len(), 4);
    /// ```
    pub fn retain(&mut self, mut f: impl FnMut(&K, &mut V) -> bool) {
        self.table.retain(
            |pair| f(&pair.0, &mut pair.1),
            make_hasher::<K, V, S>(&self.hash_builder),
        );
    }

    /// Removes the pair at `handle`.
    ///
    /// Returns the pair and a handle to the next occupied slot at or after
    /// the vacated one. Removal may shift later entries of the same probe
    /// chain back into the vacated slot, and entries whose chain wrapped past
    /// the end of the slot array may move from the front of the array to its
    /// back, where a continued walk visits them again.
    pub fn erase_at(&mut self, handle: Handle) -> Result<((K, V), Option<Handle>), Error> {
        self.table
            .remove_at(handle, make_hasher::<K, V, S>(&self.hash_builder))
    }

    /// Removes every pair in the slot range `[first, last)`, with `None`
    /// standing for the end of the slot array.
    ///
    /// Returns a handle to the next occupied slot at or after `first`.
    pub fn erase_range(
        &mut self,
        first: Handle,
        last: Option<Handle>,
    ) -> Result<Option<Handle>, Error> {
        self.table
            .remove_range(first, last, make_hasher::<K, V, S>(&self.hash_builder))
    }

    /// Returns a histogram of how far each pair sits from its ideal slot.
    #[cfg(feature = "stats")]
    pub fn probe_histogram(&self) -> crate::stats::ProbeHistogram {
        self.table.probe_histogram(make_hasher::<K, V, S>(&self.hash_builder))
    }
}

impl<K, V, S, E> HashMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher,
{
    /// Returns a reference to the value for `key`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fib_hash::DefaultHashBuilder;
    /// # use fib_hash::HashMap;
    /// #
    /// let mut map: HashMap<String, i32, DefaultHashBuilder> = HashMap::new();
    /// map.insert("key".to_string(), 1);
    /// assert_eq!(map.get("key"), Some(&1));
    /// assert_eq!(map.get("nope"), None);
    /// ```
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + ?Sized,
        E: KeyEq<Q>,
    {
        self.get_key_value(key).map(|(_, v)| v)
    }

    /// Returns the stored key and value for `key`.
    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        K: Borrow<Q>,
        Q: Hash + ?Sized,
        E: KeyEq<Q>,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table
            .find(hash, equivalent::<K, V, Q, E>(&self.key_eq, key))
            .map(|(k, v)| (k, v))
    }

    /// Returns a mutable reference to the value for `key`.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + ?Sized,
        E: KeyEq<Q>,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table
            .find_mut(hash, equivalent::<K, V, Q, E>(&self.key_eq, key))
            .map(|(_, v)| v)
    }

    /// Returns the value for `key`, or [`Error::NotFound`] if it is absent.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fib_hash::DefaultHashBuilder;
    /// # use fib_hash::Error;
    /// # use fib_hash::HashMap;
    /// #
    /// let mut map: HashMap<&str, i32, DefaultHashBuilder> = HashMap::new();
    /// map.insert("a", 3);
    /// assert_eq!(map.at("a"), Ok(&3));
    /// assert_eq!(map.at("d"), Err(Error::NotFound));
    /// ```
    pub fn at<Q>(&self, key: &Q) -> Result<&V, Error>
    where
        K: Borrow<Q>,
        Q: Hash + ?Sized,
        E: KeyEq<Q>,
    {
        self.get(key).ok_or(Error::NotFound)
    }

    /// Mutable version of [`at`](Self::at).
    pub fn at_mut<Q>(&mut self, key: &Q) -> Result<&mut V, Error>
    where
        K: Borrow<Q>,
        Q: Hash + ?Sized,
        E: KeyEq<Q>,
    {
        self.get_mut(key).ok_or(Error::NotFound)
    }

    /// Returns a handle to the slot holding `key`, or `None` if it is absent.
    pub fn find<Q>(&self, key: &Q) -> Option<Handle>
    where
        K: Borrow<Q>,
        Q: Hash + ?Sized,
        E: KeyEq<Q>,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table
            .find_handle(hash, equivalent::<K, V, Q, E>(&self.key_eq, key))
    }

    /// Returns `true` if the map contains `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + ?Sized,
        E: KeyEq<Q>,
    {
        self.get(key).is_some()
    }

    /// Returns the number of pairs stored under `key`: 0 or 1.
    pub fn count<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + ?Sized,
        E: KeyEq<Q>,
    {
        usize::from(self.contains_key(key))
    }

    /// Removes `key`, returning its value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use fib_hash::DefaultHashBuilder;
    /// # use fib_hash::HashMap;
    /// #
    /// let mut map: HashMap<&str, i32, DefaultHashBuilder> = HashMap::new();
    /// map.insert("foo", 42);
    /// assert_eq!(map.remove("foo"), Some(42));
    /// assert!(!map.contains_key("foo"));
    ///
    /// map.insert("foo", 255);
    /// assert_eq!(map["foo"], 255);
    /// ```
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + ?Sized,
        E: KeyEq<Q>,
    {
        self.remove_entry(key).map(|(_, v)| v)
    }

    /// Removes `key`, returning the stored key and value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: Hash + ?Sized,
        E: KeyEq<Q>,
    {
        let hash = self.hash_builder.hash_one(key);
        self.table.remove(
            hash,
            equivalent::<K, V, Q, E>(&self.key_eq, key),
            make_hasher::<K, V, S>(&self.hash_builder),
        )
    }

    /// Removes `key`, returning the number of pairs removed: 0 or 1.
    pub fn erase<Q>(&mut self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + ?Sized,
        E: KeyEq<Q>,
    {
        usize::from(self.remove_entry(key).is_some())
    }
}

impl<K, V, S, E> PartialEq for HashMap<K, V, S, E>
where
    K: Hash,
    V: PartialEq,
    S: BuildHasher,
    E: KeyEq<K>,
{
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .iter()
                .all(|(k, v)| other.get(k).is_some_and(|theirs| v == theirs))
    }
}

impl<K, V, S, E> Eq for HashMap<K, V, S, E>
where
    K: Hash,
    V: Eq,
    S: BuildHasher,
    E: KeyEq<K>,
{
}

impl<K, Q, V, S, E> Index<&Q> for HashMap<K, V, S, E>
where
    K: Hash + Borrow<Q>,
    Q: Hash + ?Sized,
    S: BuildHasher,
    E: KeyEq<Q>,
{
    type Output = V;

    /// Returns the value for `key`.
    ///
    /// # Panics
    ///
    /// Panics if `key` is not present. Use [`HashMap::at`] for a fallible
    /// lookup.
    fn index(&self, key: &Q) -> &V {
        match self.get(key) {
            Some(value) => value,
            None => panic!("key not found"),
        }
    }
}

impl<K, V, S, E> Extend<(K, V)> for HashMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher,
    E: KeyEq<K>,
{
    /// Inserts every pair, replacing values of keys already present. Later
    /// pairs win over earlier ones with the same key.
    fn extend<T: IntoIterator<Item = (K, V)>>(&mut self, iter: T) {
        let iter = iter.into_iter();
        let (lower, _) = iter.size_hint();
        let additional = if self.is_empty() {
            lower
        } else {
            lower.div_ceil(2)
        };
        let target = self.len().saturating_add(additional);
        if target > 0 {
            // Room for the batch without crossing the load limit.
            self.reserve(target.saturating_mul(4).div_ceil(3));
        }

        for (key, value) in iter {
            self.insert_or_assign(key, value);
        }
    }
}

impl<'a, K, V, S, E> Extend<(&'a K, &'a V)> for HashMap<K, V, S, E>
where
    K: Hash + Copy,
    V: Copy,
    S: BuildHasher,
    E: KeyEq<K>,
{
    fn extend<T: IntoIterator<Item = (&'a K, &'a V)>>(&mut self, iter: T) {
        self.extend(iter.into_iter().map(|(&k, &v)| (k, v)));
    }
}

impl<K, V, S, E> FromIterator<(K, V)> for HashMap<K, V, S, E>
where
    K: Hash,
    S: BuildHasher + Default,
    E: KeyEq<K> + Default,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K, V, S, E> IntoIterator for HashMap<K, V, S, E> {
    type IntoIter = IntoIter<K, V>;
    type Item = (K, V);

    fn into_iter(self) -> Self::IntoIter {
        IntoIter {
            inner: self.table.into_iter(),
        }
    }
}

impl<'a, K, V, S, E> IntoIterator for &'a HashMap<K, V, S, E> {
    type IntoIter = Iter<'a, K, V>;
    type Item = (&'a K, &'a V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, S, E> IntoIterator for &'a mut HashMap<K, V, S, E> {
    type IntoIter = IterMut<'a, K, V>;
    type Item = (&'a K, &'a mut V);

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

/// A view into a single entry in the map, which may either be vacant or
/// occupied.
///
/// This enum is constructed from the [`entry`] method on [`HashMap`].
///
/// [`entry`]: HashMap::entry
pub enum Entry<'a, K, V, S> {
    /// A vacant entry.
    Vacant(VacantEntry<'a, K, V, S>),
    /// An occupied entry.
    Occupied(OccupiedEntry<'a, K, V, S>),
}

impl<'a, K, V, S> Entry<'a, K, V, S> {
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
    pub fn or_insert_with<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce() -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(default()),
        }
    }

    /// Like [`or_insert_with`](Self::or_insert_with), passing the key to
    /// `default`.
    pub fn or_insert_with_key<F>(self, default: F) -> &'a mut V
    where
        F: FnOnce(&K) -> V,
    {
        match self {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let value = default(entry.key());
                entry.insert(value)
            }
        }
    }

    /// Modifies the value of an occupied entry in place.
    pub fn and_modify<F>(self, f: F) -> Self
    where
        F: FnOnce(&mut V),
    {
        match self {
            Entry::Occupied(mut entry) => {
                f(entry.get_mut());
                Entry::Occupied(entry)
            }
            Entry::Vacant(entry) => Entry::Vacant(entry),
        }
    }

    /// Returns the entry's key.
    pub fn key(&self) -> &K {
        match self {
            Entry::Occupied(entry) => entry.key(),
            Entry::Vacant(entry) => entry.key(),
        }
    }
}

impl<'a, K, V, S> Entry<'a, K, V, S>
where
    V: Default,
{
    /// Inserts `V::default()` if the entry is vacant and returns a mutable
    /// reference to the value.
    pub fn or_default(self) -> &'a mut V {
        self.or_insert_with(V::default)
    }
}

/// A vacant entry in the map.
pub struct VacantEntry<'a, K, V, S> {
    entry: hash_table::VacantEntry<'a, (K, V)>,
    key: K,
    hash_builder: &'a S,
}

impl<'a, K, V, S> VacantEntry<'a, K, V, S> {
    /// Returns the key that would be inserted.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Takes ownership of the key.
    pub fn into_key(self) -> K {
        self.key
    }

    /// Inserts `value` and returns a mutable reference to it.
    pub fn insert(self, value: V) -> &'a mut V {
        let (_, value) = self.entry.insert((self.key, value));
        value
    }

    /// Inserts `value` and returns the occupied entry.
    pub fn insert_entry(self, value: V) -> OccupiedEntry<'a, K, V, S> {
        OccupiedEntry {
            entry: self.entry.insert_entry((self.key, value)),
            hash_builder: self.hash_builder,
        }
    }
}

/// An occupied entry in the map.
pub struct OccupiedEntry<'a, K, V, S> {
    entry: hash_table::OccupiedEntry<'a, (K, V)>,
    hash_builder: &'a S,
}

impl<'a, K, V, S> OccupiedEntry<'a, K, V, S> {
    /// Returns the stored key.
    pub fn key(&self) -> &K {
        &self.entry.get().0
    }

    /// Returns the value.
    pub fn get(&self) -> &V {
        &self.entry.get().1
    }

    /// Returns the value mutably.
    pub fn get_mut(&mut self) -> &mut V {
        &mut self.entry.get_mut().1
    }

    /// Converts the entry into a mutable reference to the value.
    pub fn into_mut(self) -> &'a mut V {
        &mut self.entry.into_mut().1
    }

    /// Replaces the value, returning the old one.
    pub fn insert(&mut self, value: V) -> V {
        mem::replace(self.get_mut(), value)
    }

    /// Returns a handle to the entry's slot.
    pub fn handle(&self) -> Handle {
        self.entry.handle()
    }
}

impl<K, V, S> OccupiedEntry<'_, K, V, S>
where
    K: Hash,
    S: BuildHasher,
{
    /// Removes the entry, returning its value.
    pub fn remove(self) -> V {
        self.remove_entry().1
    }

    /// Removes the entry, returning the stored key and value.
    pub fn remove_entry(self) -> (K, V) {
        self.entry.remove(make_hasher::<K, V, S>(self.hash_builder))
    }
}

/// An iterator over the pairs of a [`HashMap`].
pub struct Iter<'a, K, V> {
    inner: hash_table::Iter<'a, (K, V)>,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// A mutable iterator over the pairs of a [`HashMap`].
pub struct IterMut<'a, K, V> {
    inner: hash_table::IterMut<'a, (K, V)>,
}

impl<'a, K, V> Iterator for IterMut<'a, K, V> {
    type Item = (&'a K, &'a mut V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| (&*k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IterMut<'_, K, V> {}
impl<K, V> FusedIterator for IterMut<'_, K, V> {}

/// An iterator over the keys of a [`HashMap`].
pub struct Keys<'a, K, V> {
    inner: hash_table::Iter<'a, (K, V)>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// An iterator over the values of a [`HashMap`].
pub struct Values<'a, K, V> {
    inner: hash_table::Iter<'a, (K, V)>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K, V> FusedIterator for Values<'_, K, V> {}

/// A mutable iterator over the values of a [`HashMap`].
pub struct ValuesMut<'a, K, V> {
    inner: hash_table::IterMut<'a, (K, V)>,
}

impl<'a, K, V> Iterator for ValuesMut<'a, K, V> {
    type Item = &'a mut V;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for ValuesMut<'_, K, V> {}
impl<K, V> FusedIterator for ValuesMut<'_, K, V> {}

/// An owning iterator over the pairs of a [`HashMap`].
pub struct IntoIter<K, V> {
    inner: hash_table::IntoIter<(K, V)>,
}

impl<K, V> Iterator for IntoIter<K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for IntoIter<K, V> {}
impl<K, V> FusedIterator for IntoIter<K, V> {}

/// A draining iterator over the pairs of a [`HashMap`].
pub struct Drain<'a, K, V> {
    inner: hash_table::Drain<'a, (K, V)>,
}

impl<K, V> Iterator for Drain<'_, K, V> {
    type Item = (K, V);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Drain<'_, K, V> {}
impl<K, V> FusedIterator for Drain<'_, K, V> {}
