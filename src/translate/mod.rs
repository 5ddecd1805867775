//! Instruction-to-constraint translation
//!
//! [`translate`] turns one SSA instruction into a boolean constraint over the state's
//! symbolic variables, plus a [`Control`] signal telling the engine how the state moves on.
//! Operands are always resolved before the destination is defined, so an instruction that
//! re-defines a name (bounded loop unrolling) reads the previous binding.

pub mod access;
pub mod arith;
pub mod constant;
pub mod convert;

use log::trace;
use z3::ast::{Ast, Bool};

use crate::error::TranslateError;
use crate::ir::{BlockId, Function, InstrKind, Instruction, Type, UnOpKind, Value};
use crate::memory::{SymbolicMemory, TypeId, TypeRegistry};

use convert::equate;

/// How the state proceeds after an instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    /// Fall through to the next instruction
    Continue,
    /// The instruction kind is recognised but not modeled
    Stub(InstrKind),
    Jump(BlockId),
    /// Two-way branch on the translation's constraint
    Branch {
        then_block: BlockId,
        else_block: BlockId,
    },
}

#[derive(Debug, Clone)]
pub struct Translation {
    pub constraint: Bool,
    pub control: Control,
}

impl Translation {
    fn proceed(constraint: Bool) -> Self {
        Self {
            constraint,
            control: Control::Continue,
        }
    }

    fn trivial(control: Control) -> Self {
        Self {
            constraint: Bool::from_bool(true),
            control,
        }
    }
}

/// A resolved operand: its solver value and interned type
#[derive(Debug, Clone)]
pub struct Operand {
    pub value: z3::ast::Dynamic,
    pub ty: TypeId,
}

/// Everything one translation may read or extend
pub struct TranslationContext<'a> {
    pub memory: &'a mut SymbolicMemory,
    pub registry: &'a mut TypeRegistry,
    pub function: &'a Function,
    /// Predecessor the current frame was entered from, if any
    pub incoming: Option<BlockId>,
}

impl<'a> TranslationContext<'a> {
    pub fn new(
        memory: &'a mut SymbolicMemory,
        registry: &'a mut TypeRegistry,
        function: &'a Function,
        incoming: Option<BlockId>,
    ) -> Self {
        Self {
            memory,
            registry,
            function,
            incoming,
        }
    }

    pub fn resolve(&mut self, value: &Value) -> Result<Operand, TranslateError> {
        match value {
            Value::Var(name) => self
                .memory
                .get(name)
                .map(|var| Operand {
                    value: var.value.clone(),
                    ty: var.ty,
                })
                .ok_or_else(|| TranslateError::UndeclaredVariable(name.clone())),
            Value::Const { literal, ty } => Ok(Operand {
                value: constant::constant(literal, ty)?,
                ty: self.registry.get_or_create_type(ty),
            }),
        }
    }

    fn resolve_all(&mut self, values: &[Value]) -> Result<Vec<Operand>, TranslateError> {
        values.iter().map(|v| self.resolve(v)).collect()
    }

    /// Bind `dest` to a fresh constant of type `ty`
    pub fn define(&mut self, dest: &str, ty: &Type) -> Operand {
        let var = self.memory.add_variable(dest, ty, self.registry);
        Operand {
            value: var.value.clone(),
            ty: var.ty,
        }
    }
}

fn value_name(value: &Value) -> String {
    value
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| value.to_string())
}

fn phi(
    ctx: &mut TranslationContext<'_>,
    dest: &str,
    ty: &Type,
    edges: &[(BlockId, Value)],
    context: &str,
) -> Result<Bool, TranslateError> {
    let mut resolved = Vec::new();
    for (pred, value) in edges {
        match ctx.resolve(value) {
            Ok(operand) => resolved.push((*pred, operand)),
            Err(TranslateError::UndeclaredVariable(_)) => continue,
            Err(err) => return Err(err),
        }
    }

    let known = ctx
        .incoming
        .and_then(|from| resolved.iter().find(|(pred, _)| *pred == from))
        .map(|(_, operand)| operand.clone());

    let target = ctx.define(dest, ty);
    if let Some(operand) = known {
        return equate(&target.value, &operand.value, context);
    }

    let mut choices = resolved.iter();
    let Some((_, first)) = choices.next() else {
        return Err(TranslateError::UnresolvedPhi(dest.to_string()));
    };
    let mut disjunction = equate(&target.value, &first.value, context)?;
    for (_, operand) in choices {
        let choice = equate(&target.value, &operand.value, context)?;
        disjunction = Bool::or(&[&disjunction, &choice]);
    }
    Ok(disjunction)
}

/// Translate one instruction against a state's memory
pub fn translate(
    instruction: &Instruction,
    ctx: &mut TranslationContext<'_>,
) -> Result<Translation, TranslateError> {
    let context = instruction.to_string();
    trace!("translate: {}", context);

    match instruction {
        Instruction::Alloc { dest, ty, .. } => {
            ctx.define(dest, ty);
            Ok(Translation::trivial(Control::Continue))
        }

        Instruction::Call {
            dest,
            ty,
            callee,
            args,
        } => {
            let args = ctx.resolve_all(args)?;
            let Some(dest) = dest else {
                return Ok(Translation::trivial(Control::Continue));
            };
            let arg_types: Vec<TypeId> = args.iter().map(|a| a.ty).collect();
            let result = ctx.registry.get_or_create_type(ty);
            let decl = ctx
                .registry
                .get_or_create_function(callee, &arg_types, result);
            let values: Vec<&dyn Ast> = args.iter().map(|a| &a.value as &dyn Ast).collect();
            let application = decl.apply(&values);
            let target = ctx.define(dest, ty);
            Ok(Translation::proceed(equate(
                &target.value,
                &application,
                &context,
            )?))
        }

        Instruction::BinOp {
            dest,
            ty,
            op,
            x,
            y,
        } => {
            let x = ctx.resolve(x)?;
            let y = ctx.resolve(y)?;
            let target = ctx.define(dest, ty);
            let constraint = arith::binop(ctx, *op, &x, &y, &target, &context)?;
            Ok(Translation::proceed(constraint))
        }

        Instruction::UnOp {
            dest,
            op: UnOpKind::Recv,
            ty,
            ..
        } => {
            ctx.define(dest, ty);
            Ok(Translation::trivial(Control::Stub(InstrKind::Recv)))
        }

        Instruction::UnOp {
            dest,
            ty,
            op: UnOpKind::Deref,
            x,
        } => {
            let operand = ctx.resolve(x)?;
            let name = value_name(x);
            if !ctx.registry.ty(operand.ty).is_pointer() {
                return Err(TranslateError::NotAPointer(name));
            }
            let target = ctx.define(dest, ty);
            let constraint = access::deref(ctx, &operand, &name, &target, &context)?;
            Ok(Translation::proceed(constraint))
        }

        Instruction::UnOp { dest, ty, op, x } => {
            let operand = ctx.resolve(x)?;
            let value = arith::unop(*op, &operand)?;
            let target = ctx.define(dest, ty);
            Ok(Translation::proceed(equate(&target.value, &value, &context)?))
        }

        Instruction::Convert { dest, ty, x } => {
            let operand = ctx.resolve(x)?;
            let value = convert::convert(ctx, &operand, ty)?;
            let target = ctx.define(dest, ty);
            Ok(Translation::proceed(equate(&target.value, &value, &context)?))
        }

        Instruction::FieldAddr {
            dest,
            ty,
            x,
            field,
            ..
        } => {
            let operand = ctx.resolve(x)?;
            let target = ctx.define(dest, ty);
            let constraint =
                access::field_addr(ctx, &operand, &value_name(x), *field, &target, &context)?;
            Ok(Translation::proceed(constraint))
        }

        Instruction::IndexAddr {
            dest,
            ty,
            x,
            index,
        } => {
            let container = ctx.resolve(x)?;
            let position = ctx.resolve(index)?;
            let target = ctx.define(dest, ty);
            let constraint = access::index_addr(ctx, &container, &position, &target, &context)?;
            Ok(Translation::proceed(constraint))
        }

        Instruction::Jump { target } => Ok(Translation::trivial(Control::Jump(*target))),

        Instruction::If {
            cond,
            then_block,
            else_block,
        } => {
            let operand = ctx.resolve(cond)?;
            let constraint = operand.value.as_bool().ok_or_else(|| {
                TranslateError::sort_mismatch(&context, operand.value.get_sort(), "Bool")
            })?;
            Ok(Translation {
                constraint,
                control: Control::Branch {
                    then_block: *then_block,
                    else_block: *else_block,
                },
            })
        }

        Instruction::Phi { dest, ty, edges } => {
            Ok(Translation::proceed(phi(ctx, dest, ty, edges, &context)?))
        }

        Instruction::Return { values } => {
            let operands = ctx.resolve_all(values)?;
            let mut equalities = Vec::with_capacity(operands.len());
            for (i, operand) in operands.iter().enumerate() {
                let ty = ctx
                    .function
                    .results
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| ctx.registry.ty(operand.ty).clone());
                let slot = ctx.define(&format!("$ret{}", i), &ty);
                equalities.push(equate(&slot.value, &operand.value, &context)?);
            }
            let refs: Vec<&Bool> = equalities.iter().collect();
            let constraint = match refs.len() {
                0 => Bool::from_bool(true),
                1 => equalities[0].clone(),
                _ => Bool::and(&refs),
            };
            Ok(Translation::proceed(constraint))
        }

        Instruction::Store { .. } | Instruction::Panic { .. } => {
            Ok(Translation::trivial(Control::Stub(instruction.kind())))
        }

        Instruction::Unmodeled { kind, dest, .. } => {
            if let Some((name, ty)) = dest {
                ctx.define(name, ty);
            }
            Ok(Translation::trivial(Control::Stub(*kind)))
        }
    }
}
