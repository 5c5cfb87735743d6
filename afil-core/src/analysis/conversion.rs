//! The reference/mutability conversion lattice (spec.md ยง4.3), and the handful of operations that
//! sit directly on top of it: `common_type` (used by if-expressions and return-type unification)
//! and the conversion-node insertion helpers used once overload resolution has picked a callee.
//!
//! Grounded on `is_convertible`/`make_reference`/`make_mutable`/`decay`/`common_type` in the
//! original implementation's `scope.cc`.

use crate::id::TypeId;
use crate::program::{ConversionKind, Expression};

/// Cheapest-to-costliest ranking of the four conversions spec.md ยง4.3 names. Lower is cheaper;
/// `None` means infeasible (not a conversion at all).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConversionCost {
    Identity = 0,
    MutRefToConstRef = 1,
    RefToValue = 2,
    ValueToConstRef = 3,
}

/// True iff `from` can be used where `to` is expected, considering only the reference/mutability
/// bits (same underlying type is a precondition checked by the caller via
/// [`TypeId::same_base_type`]).
pub fn is_convertible(from: TypeId, to: TypeId) -> bool {
    if !from.same_base_type(to) {
        return false;
    }
    conversion_cost(from, to).is_some()
}

/// The cost of converting `from` to `to`, or `None` if no conversion exists. Both must already be
/// the same underlying type; this function only reasons about the reference/mutability bits.
pub fn conversion_cost(from: TypeId, to: TypeId) -> Option<ConversionCost> {
    if !from.same_base_type(to) {
        return None;
    }
    if from.is_mutable() == to.is_mutable() && from.is_reference() == to.is_reference() {
        return Some(ConversionCost::Identity);
    }
    if !to.is_reference() {
        // Both a value and any reference convert to a plain value (read-through or direct).
        return Some(if from.is_reference() { ConversionCost::RefToValue } else { ConversionCost::Identity });
    }
    if !to.is_mutable() {
        // `to` is `const &`: a value materialises into a temporary, any reference binds directly.
        return Some(if from.is_reference() {
            if from.is_mutable() { ConversionCost::MutRefToConstRef } else { ConversionCost::Identity }
        } else {
            ConversionCost::ValueToConstRef
        });
    }
    // `to` is `mut &`: only an existing mutable reference converts; mutable<-immutable in the
    // wrong direction is never legal.
    if from.is_mutable() && from.is_reference() {
        return Some(ConversionCost::Identity);
    }
    None
}

/// `a` and `b`'s common type per spec.md ยง4.5's if-expression rule: identity first, then whichever
/// side the other converts into.
pub fn common_type(a: TypeId, b: TypeId) -> TypeId {
    if a == b {
        return a;
    }
    if is_convertible(a, b) {
        return b;
    }
    if is_convertible(b, a) {
        return a;
    }
    TypeId::none()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionNotFound {
    pub from: TypeId,
    pub to: TypeId,
}

/// Wraps `expr` (whose type must be `from`) in the [`ConversionKind`] node needed to produce a
/// value of type `to`, or reports that no such conversion exists.
pub fn insert_conversion_node(expr: Expression, from: TypeId, to: TypeId) -> Result<Expression, ConversionNotFound> {
    if from == to {
        return Ok(expr);
    }
    match conversion_cost(from, to) {
        Some(ConversionCost::Identity) => Ok(expr),
        Some(cost) => {
            let kind = match cost {
                ConversionCost::MutRefToConstRef => ConversionKind::MutRefToConstRef,
                ConversionCost::RefToValue => ConversionKind::RefToValue,
                ConversionCost::ValueToConstRef => ConversionKind::ValueToConstRef,
                ConversionCost::Identity => unreachable!(),
            };
            Ok(Expression::Conversion { operand: Box::new(expr), kind, target_type: to })
        }
        None => Err(ConversionNotFound { from, to }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(i: u32) -> TypeId {
        TypeId::new(i)
    }

    #[test]
    fn identity_is_always_convertible() {
        assert!(is_convertible(value(0), value(0)));
        assert!(is_convertible(value(0).make_mutable(), value(0).make_mutable()));
    }

    #[test]
    fn mut_ref_converts_to_const_ref() {
        let mutref = value(0).make_mutable();
        let constref = value(0).make_reference();
        assert!(is_convertible(mutref, constref));
    }

    #[test]
    fn const_ref_does_not_convert_to_mut_ref() {
        let constref = value(0).make_reference();
        let mutref = value(0).make_mutable();
        assert!(!is_convertible(constref, mutref));
    }

    #[test]
    fn value_converts_to_const_ref_by_materialisation() {
        let plain = value(0);
        let constref = value(0).make_reference();
        assert_eq!(conversion_cost(plain, constref), Some(ConversionCost::ValueToConstRef));
    }

    #[test]
    fn different_underlying_types_never_convert() {
        assert!(!is_convertible(value(0), value(1)));
    }

    #[test]
    fn common_type_prefers_identity_then_either_side() {
        assert_eq!(common_type(value(0), value(0)), value(0));
        let mutref = value(0).make_mutable();
        let constref = value(0).make_reference();
        assert_eq!(common_type(mutref, constref), constref);
    }
}
