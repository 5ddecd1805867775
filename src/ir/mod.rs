//! Intermediate Representation (IR) for SSA-form programs

pub mod function;
pub mod instructions;
pub mod types;

// Re-export commonly used types
pub use function::{BasicBlock, BlockId, Function, Param, Program};
pub use instructions::{BinOpKind, InstrKind, Instruction, UnOpKind, Value};
pub use types::Type;
