//! Type-erased, hashable argument keys.
//!
//! A single scope layer's table holds entries for many different wrapped
//! functions side by side, each with its own unrelated argument type, so the
//! table's key type has to erase `Args` behind a trait object. This is the
//! same kind of downcast-based erasure the teacher uses for `CacheVar`'s
//! value slot (`kyute-compose`'s `cache.rs`), applied here to the key
//! instead.
use std::{
    any::{Any, TypeId},
    fmt,
    hash::{Hash, Hasher},
    rc::Rc,
};

/// A unique, process-wide handle identifying a wrapped function.
///
/// Stands in for the source design's pointer-identity requirement: each call
/// to [`crate::wrap`] mints a fresh id, so two different wrappers never
/// collide and a given wrapper always compares equal to itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionId(u64);

impl FunctionId {
    pub(crate) fn fresh() -> FunctionId {
        use std::sync::atomic::{AtomicU64, Ordering};
        static NEXT: AtomicU64 = AtomicU64::new(1);
        FunctionId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for FunctionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn#{}", self.0)
    }
}

/// Object-safe `Eq + Hash` for an erased argument tuple.
trait ErasedArgs: Any {
    fn as_any(&self) -> &dyn Any;
    fn dyn_eq(&self, other: &dyn ErasedArgs) -> bool;
    fn dyn_hash(&self, state: &mut dyn Hasher);
    fn dyn_debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<T> ErasedArgs for T
where
    T: Any + Eq + Hash + fmt::Debug,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn ErasedArgs) -> bool {
        other.as_any().downcast_ref::<T>() == Some(self)
    }

    fn dyn_hash(&self, mut state: &mut dyn Hasher) {
        TypeId::of::<T>().hash(&mut state);
        Hash::hash(self, &mut state);
    }

    fn dyn_debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A `(function-identity, argument-tuple)` pair, hashable and comparable by
/// structural equality of the argument tuple.
///
/// Cheap to clone: the argument tuple is shared through an `Rc`, not
/// duplicated, since the same key is often needed by both a scope layer's
/// table and the `Entry` stored under it.
#[derive(Clone)]
pub(crate) struct Key {
    function: FunctionId,
    args: Rc<dyn ErasedArgs>,
}

impl Key {
    pub(crate) fn new<Args>(function: FunctionId, args: Args) -> Key
    where
        Args: Eq + Hash + fmt::Debug + 'static,
    {
        Key {
            function,
            args: Rc::new(args),
        }
    }

    pub(crate) fn function(&self) -> FunctionId {
        self.function
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({}, ", self.function)?;
        self.args.dyn_debug(f)?;
        write!(f, ")")
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.function == other.function && self.args.dyn_eq(other.args.as_ref())
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.function.hash(state);
        self.args.dyn_hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_equal_across_clones_of_the_same_args() {
        let f = FunctionId::fresh();
        let a = Key::new(f, (1i32, "x".to_string()));
        let b = Key::new(f, (1i32, "x".to_string()));
        assert_eq!(a, b);
    }

    #[test]
    fn keys_differ_by_function_even_with_identical_args() {
        let f1 = FunctionId::fresh();
        let f2 = FunctionId::fresh();
        let a = Key::new(f1, 42i32);
        let b = Key::new(f2, 42i32);
        assert_ne!(a, b);
    }

    #[test]
    fn keys_differ_by_argument_value() {
        let f = FunctionId::fresh();
        let a = Key::new(f, 1i32);
        let b = Key::new(f, 2i32);
        assert_ne!(a, b);
    }
}
