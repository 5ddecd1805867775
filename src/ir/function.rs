//! Functions, basic blocks and control-flow queries

use crate::ir::instructions::Instruction;
use crate::ir::types::Type;
use std::collections::{HashSet, VecDeque};
use std::fmt;

/// Index of a basic block within its function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasicBlock {
    pub id: BlockId,
    pub instructions: Vec<Instruction>,
    pub succs: Vec<BlockId>,
    pub preds: Vec<BlockId>,
}

impl BasicBlock {
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }
}

/// A function in SSA form
///
/// `blocks` is `None` for external functions (declared without a body).
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<Param>,
    pub results: Vec<Type>,
    pub blocks: Option<Vec<BasicBlock>>,
}

impl Function {
    /// Build a function from per-block instruction lists, deriving successor and
    /// predecessor links from the terminators
    pub fn new(
        name: impl Into<String>,
        params: Vec<Param>,
        results: Vec<Type>,
        bodies: Vec<Vec<Instruction>>,
    ) -> Self {
        let mut blocks: Vec<BasicBlock> = bodies
            .into_iter()
            .enumerate()
            .map(|(index, instructions)| {
                let mut succs = Vec::new();
                for instr in &instructions {
                    for succ in instr.successors() {
                        if !succs.contains(&succ) {
                            succs.push(succ);
                        }
                    }
                }
                BasicBlock {
                    id: BlockId(index),
                    instructions,
                    succs,
                    preds: Vec::new(),
                }
            })
            .collect();

        let edges: Vec<(BlockId, BlockId)> = blocks
            .iter()
            .flat_map(|b| b.succs.iter().map(move |s| (b.id, *s)))
            .collect();
        for (from, to) in edges {
            if let Some(target) = blocks.get_mut(to.0) {
                if !target.preds.contains(&from) {
                    target.preds.push(from);
                }
            }
        }

        Self {
            name: name.into(),
            params,
            results,
            blocks: Some(blocks),
        }
    }

    /// Declare a function without a body
    pub fn external(name: impl Into<String>, params: Vec<Param>, results: Vec<Type>) -> Self {
        Self {
            name: name.into(),
            params,
            results,
            blocks: None,
        }
    }

    pub fn is_external(&self) -> bool {
        self.blocks.is_none()
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.as_ref().and_then(|blocks| blocks.get(id.0))
    }

    pub fn block_count(&self) -> usize {
        self.blocks.as_ref().map_or(0, |blocks| blocks.len())
    }

    pub fn instruction_count(&self) -> usize {
        self.blocks
            .as_ref()
            .map_or(0, |blocks| blocks.iter().map(|b| b.len()).sum())
    }

    /// True if `target` is an ancestor of `from` in the predecessor relation,
    /// i.e. a jump `from -> target` closes a loop
    pub fn is_back_edge(&self, from: BlockId, target: BlockId) -> bool {
        let Some(start) = self.block(from) else {
            return false;
        };

        let mut queue: VecDeque<BlockId> = start.preds.iter().copied().collect();
        let mut visited = HashSet::new();
        while let Some(id) = queue.pop_front() {
            if id == target {
                return true;
            }
            if !visited.insert(id) {
                continue;
            }
            if let Some(block) = self.block(id) {
                queue.extend(block.preds.iter().filter(|p| !visited.contains(*p)));
            }
        }
        false
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params = self
            .params
            .iter()
            .map(|p| format!("{} {}", p.name, p.ty))
            .collect::<Vec<_>>()
            .join(", ");
        let results = match self.results.len() {
            0 => String::new(),
            1 => format!(" {}", self.results[0]),
            _ => format!(
                " ({})",
                self.results
                    .iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        };

        match &self.blocks {
            None => writeln!(f, "extern func {}({}){}", self.name, params, results),
            Some(blocks) => {
                writeln!(f, "func {}({}){}", self.name, params, results)?;
                for block in blocks {
                    writeln!(f, "{}:", block.id)?;
                    for instr in &block.instructions {
                        writeln!(f, "    {}", instr)?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// A set of functions loaded from one listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub functions: Vec<Function>,
}

impl Program {
    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|f| f.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::instructions::Value;

    fn jump(target: usize) -> Instruction {
        Instruction::Jump {
            target: BlockId(target),
        }
    }

    fn branch(then_block: usize, else_block: usize) -> Instruction {
        Instruction::If {
            cond: Value::var("c"),
            then_block: BlockId(then_block),
            else_block: BlockId(else_block),
        }
    }

    /// 0 -> 1; 1 -> 2 | 3; 2 -> 1; 3 returns
    fn looping() -> Function {
        Function::new(
            "loop",
            vec![Param::new("c", Type::Bool)],
            vec![],
            vec![
                vec![jump(1)],
                vec![branch(2, 3)],
                vec![jump(1)],
                vec![Instruction::Return { values: vec![] }],
            ],
        )
    }

    #[test]
    fn test_links() {
        let f = looping();
        let header = f.block(BlockId(1)).unwrap();
        assert_eq!(header.succs, vec![BlockId(2), BlockId(3)]);
        assert_eq!(header.preds, vec![BlockId(0), BlockId(2)]);
        assert_eq!(f.block(BlockId(3)).unwrap().preds, vec![BlockId(1)]);
        assert!(f.block(BlockId(4)).is_none());
        assert_eq!(f.block_count(), 4);
        assert_eq!(f.instruction_count(), 4);
    }

    #[test]
    fn test_back_edge_detection() {
        let f = looping();
        assert!(f.is_back_edge(BlockId(2), BlockId(1)));
        assert!(!f.is_back_edge(BlockId(0), BlockId(1)));
        assert!(!f.is_back_edge(BlockId(1), BlockId(3)));
    }

    #[test]
    fn test_external() {
        let f = Function::external("sqrt", vec![Param::new("x", Type::Float64)], vec![Type::Float64]);
        assert!(f.is_external());
        assert_eq!(f.block_count(), 0);
        assert_eq!(f.to_string(), "extern func sqrt(x float64) float64\n");
    }

    #[test]
    fn test_program_lookup() {
        let program = Program {
            functions: vec![looping()],
        };
        assert!(program.function("loop").is_some());
        assert!(program.function("missing").is_none());
        assert_eq!(program.function_names().collect::<Vec<_>>(), vec!["loop"]);
    }
}
