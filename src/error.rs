//! Error taxonomy for the mutable cache.

/// Errors surfaced by the public API.
///
/// `NotFound` from the source design has no variant here: a layered lookup
/// that finds nothing is represented as `Option::None`, not an error.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An argument tuple was not hashable/comparable.
    ///
    /// Unreachable from safe code: `wrap` requires `Args: Eq + Hash + Clone`
    /// at compile time, so this can never actually be constructed. Kept for
    /// documentation parity with the source error taxonomy.
    #[error("argument key is not hashable/comparable")]
    InvalidKey,

    /// The entry's own value slot was read directly and found empty.
    ///
    /// Surfaces only from [`crate::EntryRef::raw_value`] on a probe: a probe
    /// never has its own slot populated, by construction (see §4.4).
    #[error("entry has no directly-held value (stale probe)")]
    StaleEntry,

    /// The wrapped user function returned an error.
    #[error("user function failed")]
    UserFunctionFailure(#[source] BoxedError),

    /// Internal state corruption, e.g. an attempt to pop the root scope
    /// layer. Not reachable through the public `ScopeGuard` API; this is a
    /// fatal programming error if it is ever observed.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// A type-erased `std::error::Error`, boxed so `CacheError` does not need to
/// be generic over the user function's error type.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

impl CacheError {
    pub(crate) fn user_failure<E>(err: E) -> CacheError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CacheError::UserFunctionFailure(Box::new(err))
    }
}
