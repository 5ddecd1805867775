//! Binary and unary operators over bitvector, float, boolean and complex operands

use z3::ast::{Ast, Bool, Dynamic, Float, BV};

use super::convert::equate;
use super::{Operand, TranslationContext};
use crate::error::TranslateError;
use crate::ir::{BinOpKind, Type, UnOpKind};

fn unknown(op: impl ToString, sort: impl ToString) -> TranslateError {
    TranslateError::UnknownOperator {
        op: op.to_string(),
        sort: sort.to_string(),
    }
}

/// `a << b` or `a >> b` with an unsigned count of any width
///
/// Counts of at least the operand width saturate: 0 for `<<` and logical `>>`, the sign fill
/// for arithmetic `>>`.
fn shift(op: BinOpKind, a: &BV, b: &BV, signed: bool) -> BV {
    let width = a.get_size();
    let apply = |count: &BV| match op {
        BinOpKind::Shl => a.bvshl(count),
        _ if signed => a.bvashr(count),
        _ => a.bvlshr(count),
    };

    if b.get_size() <= width {
        return apply(&super::convert::resize(b, width, false));
    }
    let saturated = match op {
        BinOpKind::Shl => BV::from_u64(0, width),
        _ if signed => a.bvashr(&BV::from_u64(u64::from(width - 1), width)),
        _ => BV::from_u64(0, width),
    };
    let overflow = b.bvuge(&BV::from_u64(u64::from(width), b.get_size()));
    overflow.ite(&saturated, &apply(&b.extract(width - 1, 0)))
}

fn bitvector(
    op: BinOpKind,
    a: &BV,
    b: &BV,
    signed: bool,
    context: &str,
) -> Result<Dynamic, TranslateError> {
    if op.is_shift() {
        return Ok(Dynamic::from_ast(&shift(op, a, b, signed)));
    }
    if a.get_size() != b.get_size() {
        return Err(TranslateError::sort_mismatch(
            context,
            a.get_sort(),
            b.get_sort(),
        ));
    }

    let value = match op {
        BinOpKind::Add => a.bvadd(b),
        BinOpKind::Sub => a.bvsub(b),
        BinOpKind::Mul => a.bvmul(b),
        BinOpKind::Quo if signed => a.bvsdiv(b),
        BinOpKind::Quo => a.bvudiv(b),
        BinOpKind::Rem if signed => a.bvsrem(b),
        BinOpKind::Rem => a.bvurem(b),
        BinOpKind::And => a.bvand(b),
        BinOpKind::Or => a.bvor(b),
        BinOpKind::Xor => a.bvxor(b),
        BinOpKind::AndNot => a.bvand(&b.bvnot()),
        _ => {
            let less = if signed { a.bvslt(b) } else { a.bvult(b) };
            let greater = if signed { b.bvslt(a) } else { b.bvult(a) };
            let equal = a.eq(b);
            let cmp = match op {
                BinOpKind::Eql => equal,
                BinOpKind::Neq => equal.not(),
                BinOpKind::Lss => less,
                BinOpKind::Gtr => greater,
                BinOpKind::Leq => Bool::or(&[&less, &equal]),
                BinOpKind::Geq => Bool::or(&[&greater, &equal]),
                _ => return Err(unknown(op, a.get_sort())),
            };
            return Ok(Dynamic::from_ast(&cmp));
        }
    };
    Ok(Dynamic::from_ast(&value))
}

/// Float arithmetic rounds toward zero, not to nearest-even as Go does, so the last bit of
/// an inexact result may differ from the concrete run. `%` is an opaque `fp.rem` function.
fn float(
    ctx: &mut TranslationContext<'_>,
    op: BinOpKind,
    x: &Operand,
    a: &Float,
    b: &Float,
) -> Result<Dynamic, TranslateError> {
    let value = match op {
        BinOpKind::Add => a.add_towards_zero(b),
        BinOpKind::Sub => a.sub_towards_zero(b),
        BinOpKind::Mul => a.mul_towards_zero(b),
        BinOpKind::Quo => a.div_towards_zero(b),
        BinOpKind::Rem => {
            let rem = ctx.registry.get_or_create_function("fp.rem", &[x.ty, x.ty], x.ty);
            return Ok(rem.apply(&[a as &dyn Ast, b as &dyn Ast]));
        }
        _ => {
            let equal = a.eq(b);
            let cmp = match op {
                BinOpKind::Eql => equal,
                BinOpKind::Neq => equal.not(),
                BinOpKind::Lss => a.lt(b),
                BinOpKind::Gtr => a.gt(b),
                BinOpKind::Leq => Bool::or(&[&a.lt(b), &equal]),
                BinOpKind::Geq => Bool::or(&[&a.gt(b), &equal]),
                _ => return Err(unknown(op, a.get_sort())),
            };
            return Ok(Dynamic::from_ast(&cmp));
        }
    };
    Ok(Dynamic::from_ast(&value))
}

fn boolean(op: BinOpKind, a: &Bool, b: &Bool) -> Result<Dynamic, TranslateError> {
    let value = match op {
        BinOpKind::And => Bool::and(&[a, b]),
        BinOpKind::Or => Bool::or(&[a, b]),
        BinOpKind::Xor => a.xor(b),
        BinOpKind::Eql => a.eq(b),
        BinOpKind::Neq => a.eq(b).not(),
        _ => return Err(unknown(op, "Bool")),
    };
    Ok(Dynamic::from_ast(&value))
}

/// Complex numbers are opaque; only their `real`/`imag` projections are constrained
fn complex(
    ctx: &mut TranslationContext<'_>,
    op: BinOpKind,
    x: &Operand,
    y: &Operand,
    dest: &Operand,
    context: &str,
) -> Result<Bool, TranslateError> {
    let part = ctx.registry.get_or_create_type(&Type::Float64);
    let real = ctx.registry.get_or_create_function("real", &[x.ty], part);
    let imag = ctx.registry.get_or_create_function("imag", &[x.ty], part);
    let project = |value: &Dynamic| -> Option<(Float, Float)> {
        let re = real.apply(&[value as &dyn Ast]).as_float()?;
        let im = imag.apply(&[value as &dyn Ast]).as_float()?;
        Some((re, im))
    };
    let mismatch = || TranslateError::sort_mismatch(context, x.value.get_sort(), "complex128");
    let (xr, xi) = project(&x.value).ok_or_else(mismatch)?;
    let (yr, yi) = project(&y.value).ok_or_else(mismatch)?;

    let componentwise = |a: &Float, b: &Float| -> Option<Float> {
        match op {
            BinOpKind::Add => Some(a.add_towards_zero(b)),
            BinOpKind::Sub => Some(a.sub_towards_zero(b)),
            BinOpKind::Mul => Some(a.mul_towards_zero(b)),
            BinOpKind::Quo => Some(a.div_towards_zero(b)),
            _ => None,
        }
    };

    match op {
        BinOpKind::Eql | BinOpKind::Neq => {
            let equal = Bool::and(&[&xr.eq(&yr), &xi.eq(&yi)]);
            let value = if op == BinOpKind::Eql {
                equal
            } else {
                equal.not()
            };
            equate(&dest.value, &Dynamic::from_ast(&value), context)
        }
        _ => {
            let (re, im) = match (componentwise(&xr, &yr), componentwise(&xi, &yi)) {
                (Some(re), Some(im)) => (re, im),
                _ => return Err(unknown(op, "complex128")),
            };
            let (dr, di) = project(&dest.value).ok_or_else(|| {
                TranslateError::sort_mismatch(context, dest.value.get_sort(), "complex128")
            })?;
            Ok(Bool::and(&[&dr.eq(&re), &di.eq(&im)]))
        }
    }
}

/// Constraint binding `dest` to `x op y`
pub(super) fn binop(
    ctx: &mut TranslationContext<'_>,
    op: BinOpKind,
    x: &Operand,
    y: &Operand,
    dest: &Operand,
    context: &str,
) -> Result<Bool, TranslateError> {
    let (xs, ys) = (x.value.get_sort(), y.value.get_sort());

    if let (Some(a), Some(b)) = (x.value.as_bv(), y.value.as_bv()) {
        let signed = ctx.registry.ty(x.ty).is_signed();
        let value = bitvector(op, &a, &b, signed, context)?;
        return equate(&dest.value, &value, context);
    }
    if xs != ys {
        return Err(TranslateError::sort_mismatch(context, xs, ys));
    }

    if let (Some(a), Some(b)) = (x.value.as_float(), y.value.as_float()) {
        let value = float(ctx, op, x, &a, &b)?;
        return equate(&dest.value, &value, context);
    }
    if let (Some(a), Some(b)) = (x.value.as_bool(), y.value.as_bool()) {
        let value = boolean(op, &a, &b)?;
        return equate(&dest.value, &value, context);
    }
    if *ctx.registry.ty(x.ty) == Type::Complex128 {
        return complex(ctx, op, x, y, dest, context);
    }

    Err(unknown(op, xs))
}

/// Value of `op x` for the arithmetic unary operators
///
/// Dereference and receive are memory operations and never reach this function.
pub(super) fn unop(op: UnOpKind, x: &Operand) -> Result<Dynamic, TranslateError> {
    let value = match op {
        UnOpKind::Neg => {
            if let Some(bv) = x.value.as_bv() {
                Dynamic::from_ast(&bv.bvneg())
            } else if let Some(f) = x.value.as_float() {
                Dynamic::from_ast(&f.unary_neg())
            } else {
                return Err(unknown(op, x.value.get_sort()));
            }
        }
        UnOpKind::Not => match x.value.as_bool() {
            Some(b) => Dynamic::from_ast(&b.not()),
            None => return Err(unknown(op, x.value.get_sort())),
        },
        UnOpKind::Complement => match x.value.as_bv() {
            Some(bv) => Dynamic::from_ast(&bv.bvnot()),
            None => return Err(unknown(op, x.value.get_sort())),
        },
        UnOpKind::Deref | UnOpKind::Recv => return Err(unknown(op, x.value.get_sort())),
    };
    Ok(value)
}
