//! The memoized view of a user function, and the probe handles used to read
//! or mutate its cached entries from outside a call.
use crate::{
    entry::{CallerHandle, Entry},
    error::CacheError,
    key::{FunctionId, Key},
    scope, tracker,
};
use std::{fmt, hash::Hash, marker::PhantomData, rc::Rc};

/// `Wrapper` is cheap to clone — cloning shares the same function identity
/// and underlying closure through an `Rc`, it does not mint a new wrapped
/// function. This is what lets a wrapped function be captured by another
/// wrapped function's closure while the original binding is kept around for
/// probing from outside.

/// The memoized view of a user function.
///
/// Built by [`wrap`]. Recursive wrapped functions (a function that calls
/// itself through its own wrapper, like `fib`) take `&Wrapper<Args, T, E>`
/// as an explicit first argument rather than capturing it, and the
/// user closure is stored behind `Rc<dyn Fn(..)>`: without that erasure,
/// the closure's own type would need to appear inside its own argument
/// type (`Wrapper<Args, T, E, F>` mentioning `F`), a circular type Rust's
/// inference cannot solve. This mirrors the teacher's own reliance on type
/// erasure for `CacheVar`. `Rc` rather than `Box` is what makes
/// `Wrapper::clone` below share the same closure instead of deep-copying it.
pub struct Wrapper<Args, T, E> {
    id: FunctionId,
    func: Rc<dyn Fn(&Wrapper<Args, T, E>, Args) -> Result<T, E>>,
}

impl<Args, T, E> Clone for Wrapper<Args, T, E> {
    fn clone(&self) -> Self {
        Wrapper {
            id: self.id,
            func: self.func.clone(),
        }
    }
}

/// Wraps `f` in a consistent mutable cache.
///
/// `Args` must be structurally hashable and comparable (enforced here at
/// compile time, a strictly stronger guarantee than the source design's
/// runtime `InvalidKey` rejection — see DESIGN.md). `E` must be a real
/// `std::error::Error` so failures can be propagated through
/// [`CacheError::UserFunctionFailure`]; infallible functions can use
/// `std::convert::Infallible` and always return `Ok(..)`.
///
/// A function that itself calls other wrapped functions and wants to use
/// `?` on their result needs `E = CacheError` (or any `E: From<CacheError>`):
/// [`Wrapper::call`] always fails with [`CacheError`], not with the callee's
/// own `E`, since that type is erased once it crosses into
/// [`CacheError::UserFunctionFailure`].
///
/// ```
/// use mutable_cache::{wrap, CacheError};
///
/// let fib = wrap::<i64, i64, CacheError>(|fib, n| {
///     Ok(if n < 2 { n } else { fib.call(n - 1)? + fib.call(n - 2)? })
/// });
/// assert_eq!(fib.call(7).unwrap(), 13);
/// ```
pub fn wrap<Args, T, E>(
    f: impl Fn(&Wrapper<Args, T, E>, Args) -> Result<T, E> + 'static,
) -> Wrapper<Args, T, E>
where
    Args: Eq + Hash + Clone + fmt::Debug + 'static,
    T: Clone + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    Wrapper {
        id: FunctionId::fresh(),
        func: Rc::new(f),
    }
}

impl<Args, T, E> Wrapper<Args, T, E>
where
    Args: Eq + Hash + Clone + fmt::Debug + 'static,
    T: Clone + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    /// Memoized invocation (§4.4).
    ///
    /// Looks up (or creates) this call's entry, records a caller edge to
    /// whichever wrapped call is currently executing, and returns the
    /// cached value if present. Otherwise runs the user function, with the
    /// call tracker guaranteed to be restored (via an RAII guard) even if
    /// the user function returns an error.
    pub fn call(&self, args: Args) -> Result<T, CacheError> {
        let key = Key::new(self.id, args.clone());
        let entry = scope::find_or_insert(self.id, key);

        // Caller edges are recorded before a cached hit is returned, so a
        // new caller learns of an existing callee even without recomputing.
        if let Some(caller) = tracker::current() {
            entry.add_caller(&caller);
        }

        if let Some(value) = entry.get_value::<T>() {
            tracing::trace!(function = %self.id, "cache hit");
            return Ok(value);
        }
        tracing::trace!(function = %self.id, "cache miss, recomputing");

        let _guard = tracker::Guard::push(entry.clone());
        let value = (self.func)(self, args).map_err(CacheError::user_failure)?;
        entry.set_value(value.clone());
        Ok(value)
    }

    /// Constructs — but does not insert — an [`EntryRef`] for `args`.
    ///
    /// Named `probe` rather than the source design's `ref` because `ref` is
    /// a reserved keyword in Rust. A probe never mutates the cache on its
    /// own; it is a handle used to observe or override an entry.
    pub fn probe(&self, args: Args) -> EntryRef<T> {
        EntryRef {
            key: Key::new(self.id, args),
            _marker: PhantomData,
        }
    }
}

/// A probe constructed via [`Wrapper::probe`]: identifies an entry by
/// `(function, key)` without being inserted into any scope layer.
///
/// A probe never has its own value slot — only [`Entry::set_value`] on a
/// cache-resident entry does — so [`EntryRef::raw_value`] always reports
/// [`CacheError::StaleEntry`], by construction rather than as a special
/// case.
pub struct EntryRef<T> {
    key: Key,
    _marker: PhantomData<fn() -> T>,
}

// Manual impls: `T` only ever appears inside `PhantomData<fn() -> T>`, so
// neither Clone nor Copy needs to require anything of `T` itself.
impl<T> Clone for EntryRef<T> {
    fn clone(&self) -> Self {
        EntryRef {
            key: self.key.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for EntryRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryRef({:?})", self.key)
    }
}

impl<T: Clone + 'static> EntryRef<T> {
    /// The direct-read form (§4.2): always stale for a probe.
    ///
    /// A probe is never the entry that `assign` writes into — `assign`
    /// creates a brand-new shadow entry via the shadowing algorithm and
    /// writes there — so a probe's own slot is never populated by any code
    /// path. Reading it therefore always yields `StaleEntry`.
    pub fn raw_value(&self) -> Result<T, CacheError> {
        Err(CacheError::StaleEntry)
    }

    /// The scope-resolving form (§4.2): looks this key up through the
    /// current scope stack and returns a handle to the resolved entry, or
    /// `None` if no layer has a computed value for it.
    pub fn current_value(&self) -> Option<ResolvedEntry<T>> {
        scope::lookup(&self.key, 0)
            .filter(|entry| entry.has_value())
            .map(ResolvedEntry::new)
    }

    /// Explicit write (§4.5): shadows this entry, invalidating every
    /// transitive caller of its prior value within the current scope, then
    /// sets the new shadow entry's value to `value`.
    pub fn assign(&self, value: T) {
        let shadow_entry = scope::shadow(self.key.function(), &self.key);
        shadow_entry.set_value(value);
    }

    /// Resolves the current value, applies `f`, and assigns the result.
    /// Backs every in-place operator in [`crate::ops`].
    ///
    /// # Panics
    ///
    /// Panics if no value is currently visible for this key — there is
    /// nothing for `f` to combine with.
    pub fn apply_assign(&self, f: impl FnOnce(T) -> T) {
        let current = self
            .current_value()
            .unwrap_or_else(|| panic!("apply_assign: no current value for {:?}", self.key))
            .value();
        self.assign(f(current));
    }
}

/// A resolved, cache-resident entry, returned by [`EntryRef::current_value`].
///
/// Distinct from `EntryRef`: this always refers to an entry actually found
/// in the scope stack (never an uninserted probe), and its `value()` is
/// guaranteed to succeed.
pub struct ResolvedEntry<T> {
    entry: Rc<Entry>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ResolvedEntry<T> {
    fn clone(&self) -> Self {
        ResolvedEntry {
            entry: self.entry.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ResolvedEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.entry, f)
    }
}

impl<T> PartialEq for ResolvedEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.entry, &other.entry)
    }
}

impl<T> Eq for ResolvedEntry<T> {}

impl<T: Clone + 'static> ResolvedEntry<T> {
    fn new(entry: Rc<Entry>) -> ResolvedEntry<T> {
        ResolvedEntry {
            entry,
            _marker: PhantomData,
        }
    }

    /// The cached value. Always succeeds: a `ResolvedEntry` is only ever
    /// constructed from an entry already confirmed to hold a value.
    pub fn value(&self) -> T {
        self.entry
            .get_value::<T>()
            .expect("ResolvedEntry invariant: constructed only from entries with a value")
    }

    /// The set of entries that consumed this entry's value while computing
    /// their own — the reverse dependency edges invalidation walks.
    pub fn callers(&self) -> Vec<CallerHandle> {
        self.entry
            .callers_snapshot()
            .into_iter()
            .map(|e| CallerHandle(Rc::downgrade(&e)))
            .collect()
    }

    /// This entry's own identity, for membership tests against another
    /// entry's [`callers`](Self::callers).
    pub fn handle(&self) -> CallerHandle {
        CallerHandle(Rc::downgrade(&self.entry))
    }
}
