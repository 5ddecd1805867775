//! Pointer dereference, field address and index address

use z3::ast::{Ast, Bool, Dynamic};

use super::convert::{coerce, equate, resize};
use super::{Operand, TranslationContext};
use crate::error::TranslateError;
use crate::ir::Type;
use crate::memory::INDEX_BITS;

fn pointee_of(ctx: &TranslationContext<'_>, op: &Operand, name: &str) -> Result<Type, TranslateError> {
    ctx.registry
        .ty(op.ty)
        .pointee()
        .cloned()
        .ok_or_else(|| TranslateError::NotAPointer(name.to_string()))
}

/// Content of the heap cell `address` points to, in the arena of `ty`
fn load(ctx: &mut TranslationContext<'_>, ty: &Type, address: &Dynamic) -> Dynamic {
    let id = ctx.registry.get_or_create_type(ty);
    ctx.registry.values(id).select(address)
}

/// `dest = *x`: `dest == Values[T][x]`, coerced to the destination type
pub(super) fn deref(
    ctx: &mut TranslationContext<'_>,
    x: &Operand,
    x_name: &str,
    dest: &Operand,
    context: &str,
) -> Result<Bool, TranslateError> {
    let pointee = pointee_of(ctx, x, x_name)?;
    let content = load(ctx, &pointee, &x.value);
    let dest_ty = ctx.registry.ty(dest.ty).clone();
    let content = coerce(content, &dest_ty, pointee.is_signed(), context)?;
    equate(&dest.value, &content, context)
}

/// `dest = &x.field`: the cell `dest` points to holds the field of the struct at `x`
pub(super) fn field_addr(
    ctx: &mut TranslationContext<'_>,
    x: &Operand,
    x_name: &str,
    field: usize,
    dest: &Operand,
    context: &str,
) -> Result<Bool, TranslateError> {
    let owner = pointee_of(ctx, x, x_name)?;
    let field_ty = ctx
        .registry
        .ty(dest.ty)
        .pointee()
        .cloned()
        .ok_or_else(|| TranslateError::NotAPointer(context.to_string()))?;

    let owner_id = ctx.registry.get_or_create_type(&owner);
    let slot = ctx.registry.add_field(owner_id, field, &field_ty);
    let stored = ctx.registry.field(slot).array.select(&x.value);
    let cell = load(ctx, &field_ty, &dest.value);
    equate(&cell, &stored, context)
}

/// `dest = &x[index]`: the cell `dest` points to holds `Elements[C][x][index]`
///
/// No bounds are assumed on `index`.
pub(super) fn index_addr(
    ctx: &mut TranslationContext<'_>,
    x: &Operand,
    index: &Operand,
    dest: &Operand,
    context: &str,
) -> Result<Bool, TranslateError> {
    let container = ctx.registry.ty(x.ty).clone();
    let elem = container
        .element()
        .cloned()
        .ok_or_else(|| TranslateError::sort_mismatch(context, &container, "indexable"))?;
    let elements = ctx
        .registry
        .elements(x.ty)
        .ok_or_else(|| TranslateError::sort_mismatch(context, &container, "indexable"))?;

    let position = index.value.as_bv().ok_or_else(|| {
        TranslateError::sort_mismatch(context, index.value.get_sort(), "integer index")
    })?;
    let position = resize(
        &position,
        INDEX_BITS,
        ctx.registry.ty(index.ty).is_signed(),
    );

    let row = elements
        .select(&x.value)
        .as_array()
        .ok_or_else(|| TranslateError::sort_mismatch(context, &container, "element array"))?;
    let element = coerce(row.select(&position), &elem, elem.is_signed(), context)?;
    let cell = load(ctx, &elem, &dest.value);
    equate(&cell, &element, context)
}
