//! A consistent mutable memoization cache with scoped overrides.
//!
//! Wrap a pure-ish function with [`wrap`] and its calls are memoized by
//! argument tuple. [`EntryRef::assign`] (and the in-place operators in
//! [`ops`]) let you override a specific call's result directly; doing so
//! transitively invalidates every memoized call that had, directly or
//! indirectly, consumed the old value, so the cache can never observe a
//! value computed from now-stale inputs. [`with_scope`] pushes a layer that
//! absorbs overrides and their cascaded invalidation, and discards all of it
//! when the scope ends — a speculative "what if I changed this" sandbox that
//! never leaks into the enclosing scope.
//!
//! ```
//! use mutable_cache::{wrap, with_scope, CacheError};
//! use std::convert::Infallible;
//!
//! let double = wrap::<i32, i32, Infallible>(|_, n| Ok(n * 2));
//! let double_for_sum = double.clone();
//! let sum = wrap::<(), i32, CacheError>(move |_, ()| {
//!     Ok(double_for_sum.call(1)? + double_for_sum.call(2)?)
//! });
//!
//! assert_eq!(sum.call(()).unwrap(), 6);
//!
//! with_scope(|| {
//!     double.probe(1).assign(100);
//!     // sum's prior call consumed double(1); the override shadows it too,
//!     // so sum recomputes (100 + 4) instead of returning its stale cached 6.
//!     assert_eq!(sum.call(()).unwrap(), 104);
//! });
//!
//! // the scope's overrides are gone; the outer cache is untouched.
//! assert_eq!(sum.call(()).unwrap(), 6);
//! ```

mod entry;
mod error;
mod key;
mod ops;
mod scope;
mod tracker;
mod wrapper;

pub use error::{BoxedError, CacheError};
pub use entry::CallerHandle;
pub use scope::{scope_enter, with_scope, ScopeGuard};
pub use wrapper::{wrap, EntryRef, ResolvedEntry, Wrapper};
