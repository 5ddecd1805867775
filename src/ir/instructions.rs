//! SSA instruction definitions

use crate::ir::function::BlockId;
use crate::ir::types::Type;
use std::fmt;

/// An operand: a named SSA value or a typed constant literal
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Var(String),
    Const { literal: String, ty: Type },
}

impl Value {
    pub fn var(name: impl Into<String>) -> Self {
        Value::Var(name.into())
    }

    pub fn constant(literal: impl Into<String>, ty: Type) -> Self {
        Value::Const {
            literal: literal.into(),
            ty,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Value::Var(name) => Some(name),
            Value::Const { .. } => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Var(name) => write!(f, "{}", name),
            Value::Const { literal, ty } => write!(f, "{}:{}", literal, ty),
        }
    }
}

/// Binary operators, spelled as in Go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOpKind {
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    AndNot,
    Eql,
    Neq,
    Lss,
    Leq,
    Gtr,
    Geq,
}

impl BinOpKind {
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOpKind::Eql
                | BinOpKind::Neq
                | BinOpKind::Lss
                | BinOpKind::Leq
                | BinOpKind::Gtr
                | BinOpKind::Geq
        )
    }

    pub fn is_shift(&self) -> bool {
        matches!(self, BinOpKind::Shl | BinOpKind::Shr)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinOpKind::Add => "+",
            BinOpKind::Sub => "-",
            BinOpKind::Mul => "*",
            BinOpKind::Quo => "/",
            BinOpKind::Rem => "%",
            BinOpKind::And => "&",
            BinOpKind::Or => "|",
            BinOpKind::Xor => "^",
            BinOpKind::Shl => "<<",
            BinOpKind::Shr => ">>",
            BinOpKind::AndNot => "&^",
            BinOpKind::Eql => "==",
            BinOpKind::Neq => "!=",
            BinOpKind::Lss => "<",
            BinOpKind::Leq => "<=",
            BinOpKind::Gtr => ">",
            BinOpKind::Geq => ">=",
        }
    }
}

impl fmt::Display for BinOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

impl std::str::FromStr for BinOpKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "+" => Ok(BinOpKind::Add),
            "-" => Ok(BinOpKind::Sub),
            "*" => Ok(BinOpKind::Mul),
            "/" => Ok(BinOpKind::Quo),
            "%" => Ok(BinOpKind::Rem),
            "&" => Ok(BinOpKind::And),
            "|" => Ok(BinOpKind::Or),
            "^" => Ok(BinOpKind::Xor),
            "<<" => Ok(BinOpKind::Shl),
            ">>" => Ok(BinOpKind::Shr),
            "&^" => Ok(BinOpKind::AndNot),
            "==" => Ok(BinOpKind::Eql),
            "!=" => Ok(BinOpKind::Neq),
            "<" => Ok(BinOpKind::Lss),
            "<=" => Ok(BinOpKind::Leq),
            ">" => Ok(BinOpKind::Gtr),
            ">=" => Ok(BinOpKind::Geq),
            _ => Err(format!("unknown binary operator: {}", s)),
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOpKind {
    /// `*x`
    Deref,
    /// `-x`
    Neg,
    /// `!x`
    Not,
    /// `^x`
    Complement,
    /// `<-x`
    Recv,
}

impl fmt::Display for UnOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            UnOpKind::Deref => "*",
            UnOpKind::Neg => "-",
            UnOpKind::Not => "!",
            UnOpKind::Complement => "^",
            UnOpKind::Recv => "<-",
        };
        write!(f, "{}", symbol)
    }
}

/// Kind tag of every SSA instruction the front-end can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InstrKind {
    Alloc,
    Call,
    BinOp,
    UnOp,
    Convert,
    FieldAddr,
    IndexAddr,
    Jump,
    If,
    Phi,
    Return,
    Store,
    Panic,
    ChangeType,
    MultiConvert,
    ChangeInterface,
    SliceToArrayPointer,
    MakeInterface,
    MakeClosure,
    MakeMap,
    MakeChan,
    MakeSlice,
    Slice,
    Field,
    Index,
    Lookup,
    Select,
    Range,
    Next,
    TypeAssert,
    Extract,
    RunDefers,
    Go,
    Defer,
    Send,
    MapUpdate,
    DebugRef,
    /// Channel receive (`<-x`), an unary operator the memory model does not cover
    Recv,
}

impl InstrKind {
    /// Kinds that can only appear as `Instruction::Unmodeled`, with their listing keyword
    pub const UNMODELED: [(InstrKind, &'static str); 24] = [
        (InstrKind::ChangeType, "changetype"),
        (InstrKind::MultiConvert, "multiconvert"),
        (InstrKind::ChangeInterface, "changeinterface"),
        (InstrKind::SliceToArrayPointer, "slicetoarraypointer"),
        (InstrKind::MakeInterface, "makeinterface"),
        (InstrKind::MakeClosure, "makeclosure"),
        (InstrKind::MakeMap, "makemap"),
        (InstrKind::MakeChan, "makechan"),
        (InstrKind::MakeSlice, "makeslice"),
        (InstrKind::Slice, "slice"),
        (InstrKind::Field, "field"),
        (InstrKind::Index, "index"),
        (InstrKind::Lookup, "lookup"),
        (InstrKind::Select, "select"),
        (InstrKind::Range, "range"),
        (InstrKind::Next, "next"),
        (InstrKind::TypeAssert, "typeassert"),
        (InstrKind::Extract, "extract"),
        (InstrKind::RunDefers, "rundefers"),
        (InstrKind::Go, "go"),
        (InstrKind::Defer, "defer"),
        (InstrKind::Send, "send"),
        (InstrKind::MapUpdate, "mapupdate"),
        (InstrKind::DebugRef, "debugref"),
    ];

    pub fn from_keyword(keyword: &str) -> Option<Self> {
        Self::UNMODELED
            .iter()
            .find(|(_, kw)| *kw == keyword)
            .map(|(kind, _)| *kind)
    }

    pub fn keyword(&self) -> Option<&'static str> {
        Self::UNMODELED
            .iter()
            .find(|(kind, _)| kind == self)
            .map(|(_, kw)| *kw)
    }
}

impl fmt::Display for InstrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// SSA instructions
///
/// Every value-producing instruction names its destination and carries the declared result
/// type. Successor references are block indices within the enclosing function.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// `t0 *T = new T` (heap) or `local T` (stack)
    Alloc { dest: String, ty: Type, heap: bool },
    /// `t0 T = f(args)`; `dest` is `None` for calls without a result
    Call {
        dest: Option<String>,
        ty: Type,
        callee: String,
        args: Vec<Value>,
    },
    BinOp {
        dest: String,
        ty: Type,
        op: BinOpKind,
        x: Value,
        y: Value,
    },
    UnOp {
        dest: String,
        ty: Type,
        op: UnOpKind,
        x: Value,
    },
    Convert { dest: String, ty: Type, x: Value },
    /// `&x.name [#field]`
    FieldAddr {
        dest: String,
        ty: Type,
        x: Value,
        field: usize,
        name: Option<String>,
    },
    /// `&x[index]`
    IndexAddr {
        dest: String,
        ty: Type,
        x: Value,
        index: Value,
    },
    Jump { target: BlockId },
    If {
        cond: Value,
        then_block: BlockId,
        else_block: BlockId,
    },
    /// Edges are keyed by the predecessor block they flow in from
    Phi {
        dest: String,
        ty: Type,
        edges: Vec<(BlockId, Value)>,
    },
    Return { values: Vec<Value> },
    Store { addr: Value, value: Value },
    Panic { value: Value },
    /// Instructions the translator recognises but does not model
    Unmodeled {
        kind: InstrKind,
        dest: Option<(String, Type)>,
        operands: Vec<Value>,
    },
}

impl Instruction {
    pub fn kind(&self) -> InstrKind {
        match self {
            Instruction::Alloc { .. } => InstrKind::Alloc,
            Instruction::Call { .. } => InstrKind::Call,
            Instruction::BinOp { .. } => InstrKind::BinOp,
            Instruction::UnOp {
                op: UnOpKind::Recv, ..
            } => InstrKind::Recv,
            Instruction::UnOp { .. } => InstrKind::UnOp,
            Instruction::Convert { .. } => InstrKind::Convert,
            Instruction::FieldAddr { .. } => InstrKind::FieldAddr,
            Instruction::IndexAddr { .. } => InstrKind::IndexAddr,
            Instruction::Jump { .. } => InstrKind::Jump,
            Instruction::If { .. } => InstrKind::If,
            Instruction::Phi { .. } => InstrKind::Phi,
            Instruction::Return { .. } => InstrKind::Return,
            Instruction::Store { .. } => InstrKind::Store,
            Instruction::Panic { .. } => InstrKind::Panic,
            Instruction::Unmodeled { kind, .. } => *kind,
        }
    }

    /// Get the value defined by this instruction, if any
    pub fn destination(&self) -> Option<&str> {
        match self {
            Instruction::Alloc { dest, .. }
            | Instruction::BinOp { dest, .. }
            | Instruction::UnOp { dest, .. }
            | Instruction::Convert { dest, .. }
            | Instruction::FieldAddr { dest, .. }
            | Instruction::IndexAddr { dest, .. }
            | Instruction::Phi { dest, .. } => Some(dest),
            Instruction::Call { dest, .. } => dest.as_deref(),
            Instruction::Unmodeled { dest, .. } => dest.as_ref().map(|(name, _)| name.as_str()),
            Instruction::Jump { .. }
            | Instruction::If { .. }
            | Instruction::Return { .. }
            | Instruction::Store { .. }
            | Instruction::Panic { .. } => None,
        }
    }

    /// Get the operands read by this instruction
    pub fn operands(&self) -> Vec<&Value> {
        match self {
            Instruction::Alloc { .. } | Instruction::Jump { .. } => vec![],
            Instruction::Call { args, .. } => args.iter().collect(),
            Instruction::BinOp { x, y, .. } => vec![x, y],
            Instruction::UnOp { x, .. } | Instruction::Convert { x, .. } => vec![x],
            Instruction::FieldAddr { x, .. } => vec![x],
            Instruction::IndexAddr { x, index, .. } => vec![x, index],
            Instruction::If { cond, .. } => vec![cond],
            Instruction::Phi { edges, .. } => edges.iter().map(|(_, v)| v).collect(),
            Instruction::Return { values } => values.iter().collect(),
            Instruction::Store { addr, value } => vec![addr, value],
            Instruction::Panic { value } => vec![value],
            Instruction::Unmodeled { operands, .. } => operands.iter().collect(),
        }
    }

    /// Successor blocks named by a terminator
    pub fn successors(&self) -> Vec<BlockId> {
        match self {
            Instruction::Jump { target } => vec![*target],
            Instruction::If {
                then_block,
                else_block,
                ..
            } => vec![*then_block, *else_block],
            _ => vec![],
        }
    }

    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Jump { .. }
                | Instruction::If { .. }
                | Instruction::Return { .. }
                | Instruction::Panic { .. }
        )
    }
}

fn join(values: &[Value]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Alloc { dest, ty, heap } => {
                let pointee = ty.pointee().unwrap_or(ty);
                let keyword = if *heap { "new" } else { "local" };
                write!(f, "{} {} = {} {}", dest, ty, keyword, pointee)
            }
            Instruction::Call {
                dest,
                ty,
                callee,
                args,
            } => match dest {
                Some(dest) => write!(f, "{} {} = {}({})", dest, ty, callee, join(args)),
                None => write!(f, "{}({})", callee, join(args)),
            },
            Instruction::BinOp {
                dest,
                ty,
                op,
                x,
                y,
            } => write!(f, "{} {} = {} {} {}", dest, ty, x, op, y),
            Instruction::UnOp { dest, ty, op, x } => write!(f, "{} {} = {}{}", dest, ty, op, x),
            Instruction::Convert { dest, ty, x } => write!(f, "{} {} = convert {}", dest, ty, x),
            Instruction::FieldAddr {
                dest,
                ty,
                x,
                field,
                name,
            } => match name {
                Some(name) => write!(f, "{} {} = &{}.{} [#{}]", dest, ty, x, name, field),
                None => write!(f, "{} {} = &{}.{}", dest, ty, x, field),
            },
            Instruction::IndexAddr {
                dest,
                ty,
                x,
                index,
            } => write!(f, "{} {} = &{}[{}]", dest, ty, x, index),
            Instruction::Jump { target } => write!(f, "jump {}", target),
            Instruction::If {
                cond,
                then_block,
                else_block,
            } => write!(f, "if {} goto {} else {}", cond, then_block, else_block),
            Instruction::Phi { dest, ty, edges } => {
                let edges = edges
                    .iter()
                    .map(|(block, value)| format!("{}: {}", block, value))
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "{} {} = phi [{}]", dest, ty, edges)
            }
            Instruction::Return { values } if values.is_empty() => write!(f, "return"),
            Instruction::Return { values } => write!(f, "return {}", join(values)),
            Instruction::Store { addr, value } => write!(f, "*{} = {}", addr, value),
            Instruction::Panic { value } => write!(f, "panic {}", value),
            Instruction::Unmodeled {
                kind,
                dest,
                operands,
            } => {
                let keyword = kind.keyword().unwrap_or("unknown");
                if let Some((name, ty)) = dest {
                    write!(f, "{} {} = ", name, ty)?;
                }
                if operands.is_empty() {
                    write!(f, "{}", keyword)
                } else {
                    write!(f, "{} {}", keyword, join(operands))
                }
            }
        }
    }
}
