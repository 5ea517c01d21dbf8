//! In-place operator sugar for [`crate::EntryRef`].
//!
//! The source design's family of mutation operators (`+=`, `-=`, `*=`, ...)
//! all reduce to "resolve current value, apply the primitive operation,
//! `assign` the result" (§4.2, §9). Rather than hand-writing ten near
//! identical trait impls — or reaching for an operator-overload hierarchy,
//! which the design notes explicitly steer away from — a single
//! `macro_rules!` generates one `std::ops::*Assign` impl per operator. This
//! is the Rust realization of "a single higher-order method parameterized
//! by the primitive operation" (§9).
use crate::EntryRef;
use std::ops;

macro_rules! impl_entry_assign_op {
    ($AssignTrait:ident, $method:ident, $Base:ident, $op:tt) => {
        impl<T> ops::$AssignTrait<T> for EntryRef<T>
        where
            T: ops::$Base<Output = T> + Clone + std::fmt::Debug + 'static,
        {
            /// Resolves the current value in this scope, applies the
            /// operator with `rhs`, and assigns the result (triggering the
            /// shadowing algorithm). Panics if no value is currently
            /// visible for this key — there is nothing to combine `rhs`
            /// with.
            fn $method(&mut self, rhs: T) {
                self.apply_assign(move |value| value $op rhs);
            }
        }
    };
}

impl_entry_assign_op!(AddAssign, add_assign, Add, +);
impl_entry_assign_op!(SubAssign, sub_assign, Sub, -);
impl_entry_assign_op!(MulAssign, mul_assign, Mul, *);
impl_entry_assign_op!(DivAssign, div_assign, Div, /);
impl_entry_assign_op!(RemAssign, rem_assign, Rem, %);
impl_entry_assign_op!(BitAndAssign, bitand_assign, BitAnd, &);
impl_entry_assign_op!(BitOrAssign, bitor_assign, BitOr, |);
impl_entry_assign_op!(BitXorAssign, bitxor_assign, BitXor, ^);
impl_entry_assign_op!(ShlAssign, shl_assign, Shl, <<);
impl_entry_assign_op!(ShrAssign, shr_assign, Shr, >>);

impl<T> EntryRef<T>
where
    T: Clone + std::fmt::Debug + 'static,
{
    /// Exponentiation sugar (`**=` in the source design; Rust has no such
    /// operator, and no built-in `PowAssign` trait). `num-traits` is already
    /// present in this example pack (`0xMiden-miden-vm`, `ennis-artifice`),
    /// so its `Pow` trait is reused here rather than inventing one. The
    /// exponent's type is independent of `T` (matching `num-traits`, whose
    /// `Pow` impls for primitive integers take a `u32` exponent).
    pub fn pow_assign<Rhs>(&self, exponent: Rhs)
    where
        T: num_traits::Pow<Rhs, Output = T>,
    {
        self.apply_assign(move |value| value.pow(exponent));
    }
}
