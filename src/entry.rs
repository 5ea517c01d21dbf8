//! Cache entries and the reverse caller edges used for invalidation.
use crate::key::{FunctionId, Key};
use smallvec::SmallVec;
use std::{
    any::Any,
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

/// A single memoization record for one `(function, arguments)` pair in one
/// scope layer.
///
/// The value is stored type-erased and downcast back to the wrapper's `T` at
/// the call site — the same downcast idiom the teacher uses for `CacheVar`,
/// applied to just the value slot so `Entry` itself need not be generic.
pub(crate) struct Entry {
    function: FunctionId,
    key: Key,
    value: RefCell<Option<Box<dyn Any>>>,
    /// Back-references to entries that consumed this one's value while
    /// computing their own. Weak so a callee never keeps its callers (or,
    /// transitively, anything upstream of them) alive — see DESIGN.md
    /// "No leaks".
    callers: RefCell<SmallVec<[Weak<Entry>; 4]>>,
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("key", &self.key)
            .field("has_value", &self.has_value())
            .field("callers", &self.callers.borrow().len())
            .finish()
    }
}

impl Entry {
    pub(crate) fn new(function: FunctionId, key: Key) -> Rc<Entry> {
        Rc::new(Entry {
            function,
            key,
            value: RefCell::new(None),
            callers: RefCell::new(SmallVec::new()),
        })
    }

    pub(crate) fn function(&self) -> FunctionId {
        self.function
    }

    pub(crate) fn key(&self) -> &Key {
        &self.key
    }

    pub(crate) fn has_value(&self) -> bool {
        self.value.borrow().is_some()
    }

    /// The direct-read form (§4.2): reads this entry's own slot, bypassing
    /// the scope stack. Used only by `Wrapper::call`.
    pub(crate) fn get_value<T: Clone + 'static>(&self) -> Option<T> {
        self.value
            .borrow()
            .as_ref()
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    pub(crate) fn set_value<T: 'static>(&self, value: T) {
        *self.value.borrow_mut() = Some(Box::new(value));
    }

    /// Records `caller` as having consumed this entry's value, idempotently.
    ///
    /// Dangling weak handles are pruned opportunistically here rather than
    /// on a schedule, mirroring the source design note that caller sets
    /// should be "cleaned opportunistically (on next access)".
    pub(crate) fn add_caller(&self, caller: &Rc<Entry>) {
        let mut callers = self.callers.borrow_mut();
        callers.retain(|weak| weak.upgrade().is_some());
        let already_present = callers
            .iter()
            .any(|weak| weak.upgrade().is_some_and(|e| Rc::ptr_eq(&e, caller)));
        if !already_present {
            tracing::trace!(callee = ?self.key, caller = ?caller.key, "recording caller edge");
            callers.push(Rc::downgrade(caller));
        }
    }

    /// A live snapshot of the caller set, upgraded to strong references and
    /// pruned of anything that has since been dropped.
    pub(crate) fn callers_snapshot(&self) -> Vec<Rc<Entry>> {
        let mut callers = self.callers.borrow_mut();
        callers.retain(|weak| weak.upgrade().is_some());
        callers.iter().filter_map(Weak::upgrade).collect()
    }
}

/// An identity handle to a cache-resident [`Entry`], usable for membership
/// tests against a caller set regardless of the entries' respective value
/// types (callers of different wrapped functions share one caller set).
#[derive(Clone)]
pub struct CallerHandle(pub(crate) Weak<Entry>);

impl PartialEq for CallerHandle {
    fn eq(&self, other: &Self) -> bool {
        Weak::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for CallerHandle {}

impl fmt::Debug for CallerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.upgrade() {
            Some(e) => write!(f, "CallerHandle({:?})", e.key),
            None => write!(f, "CallerHandle(<dropped>)"),
        }
    }
}
