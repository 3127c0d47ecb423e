/// An equality relation over keys, held by value inside a
/// [`HashMap`](crate::HashMap).
///
/// Implementations must agree with the map's hasher: whenever `eq(a, b)`
/// returns `true`, `a` and `b` must hash to the same value. Breaking this does
/// not cause memory unsafety, but lookups and insertions may then see either
/// entry.
///
/// The relation is generic over the probe type `Q` so that a map keyed by
/// `String` can be queried with `&str`, the same way `Borrow` lookups work on
/// `std` maps.
pub trait KeyEq<Q: ?Sized> {
    /// Returns `true` if `stored` and `probe` denote the same key.
    fn eq(&self, stored: &Q, probe: &Q) -> bool;
}

/// The default key equality, delegating to [`Eq`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DefaultKeyEq;

impl<Q> KeyEq<Q> for DefaultKeyEq
where
    Q: Eq + ?Sized,
{
    #[inline(always)]
    fn eq(&self, stored: &Q, probe: &Q) -> bool {
        stored == probe
    }
}
