//! Value conversions and sort coercion

use z3::ast::{Ast, Bool, Dynamic, BV};

use super::{Operand, TranslationContext};
use crate::error::TranslateError;
use crate::ir::Type;
use crate::memory::registry::sort_for;

/// Widen (sign or zero extension) or truncate a bitvector to `width` bits
pub fn resize(value: &BV, width: u32, signed: bool) -> BV {
    let size = value.get_size();
    if size == width {
        value.clone()
    } else if size < width {
        if signed {
            value.sign_ext(width - size)
        } else {
            value.zero_ext(width - size)
        }
    } else {
        value.extract(width - 1, 0)
    }
}

/// Make `value` usable where a value of type `target` is expected
///
/// Equal sorts pass through, bitvectors are resized, anything else is a mismatch.
pub fn coerce(
    value: Dynamic,
    target: &Type,
    signed: bool,
    context: &str,
) -> Result<Dynamic, TranslateError> {
    let sort = value.get_sort();
    let expected = sort_for(target);
    if sort == expected {
        return Ok(value);
    }
    match (value.as_bv(), target) {
        (Some(bv), Type::Int { bits, .. }) => Ok(Dynamic::from_ast(&resize(&bv, *bits, signed))),
        _ => Err(TranslateError::sort_mismatch(context, sort, expected)),
    }
}

/// `left == right`, after checking both sides share a sort
pub fn equate(left: &Dynamic, right: &Dynamic, context: &str) -> Result<Bool, TranslateError> {
    let (ls, rs) = (left.get_sort(), right.get_sort());
    if ls != rs {
        return Err(TranslateError::sort_mismatch(context, ls, rs));
    }
    Ok(left.eq(right))
}

fn is_float_like(ty: &Type) -> bool {
    matches!(ty, Type::Float32 | Type::Float64 | Type::Complex128)
}

/// Translate `dest T = convert x`
///
/// Integer conversions extend by the signedness of the source and truncate from the low bits.
/// Anything touching floats or complex numbers, or crossing into opaque handles, goes through
/// one uninterpreted conversion function per `(from, to)` pair.
pub(super) fn convert(
    ctx: &mut TranslationContext<'_>,
    x: &Operand,
    to: &Type,
) -> Result<Dynamic, TranslateError> {
    let from = ctx.registry.ty(x.ty).clone();
    let to_id = ctx.registry.get_or_create_type(to);

    if let (Some(bv), Type::Int { bits, .. }) = (x.value.as_bv(), to) {
        if !is_float_like(&from) {
            return Ok(Dynamic::from_ast(&resize(&bv, *bits, from.is_signed())));
        }
    }

    if x.value.get_sort() == *ctx.registry.sort(to_id)
        && !is_float_like(&from)
        && !is_float_like(to)
    {
        return Ok(x.value.clone());
    }

    if matches!(from, Type::Bool) || matches!(to, Type::Bool) {
        return Err(TranslateError::UnsupportedConversion {
            from: from.to_string(),
            to: to.to_string(),
        });
    }

    let name = format!("convert:{}->{}", from, to);
    let decl = ctx.registry.get_or_create_function(&name, &[x.ty], to_id);
    Ok(decl.apply(&[&x.value as &dyn Ast]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use z3::{SatResult, Solver};

    fn holds(claim: &Bool) -> bool {
        let solver = Solver::new();
        solver.assert(&claim.not());
        solver.check() == SatResult::Unsat
    }

    #[test]
    fn test_resize_extension() {
        let minus_one = BV::from_i64(-1, 8);
        let signed = resize(&minus_one, 64, true);
        let unsigned = resize(&minus_one, 64, false);
        assert_eq!(signed.get_size(), 64);
        assert!(holds(&signed.eq(&BV::from_i64(-1, 64))));
        assert!(holds(&unsigned.eq(&BV::from_u64(255, 64))));
    }

    #[test]
    fn test_resize_truncation() {
        let wide = BV::from_u64(0x1ff, 64);
        let narrow = resize(&wide, 8, true);
        assert_eq!(narrow.get_size(), 8);
        assert!(holds(&narrow.eq(&BV::from_u64(0xff, 8))));
    }

    #[test]
    fn test_coerce_rejects_foreign_sorts() {
        let flag = Dynamic::from_ast(&Bool::from_bool(true));
        assert!(coerce(flag, &Type::int(), true, "t").is_err());

        let bv = Dynamic::from_ast(&BV::from_i64(3, 32));
        let wide = coerce(bv, &Type::int(), true, "t").unwrap();
        assert_eq!(wide.as_bv().unwrap().get_size(), 64);
    }

    #[test]
    fn test_equate_checks_sorts() {
        let a = Dynamic::from_ast(&BV::from_i64(1, 64));
        let b = Dynamic::from_ast(&BV::from_i64(1, 32));
        assert!(matches!(
            equate(&a, &b, "x == y"),
            Err(TranslateError::SortMismatch { .. })
        ));
        assert!(holds(&equate(&a, &a, "x == x").unwrap()));
    }
}
