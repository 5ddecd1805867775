//! Exploration states and their block frames

use std::collections::HashMap;
use std::fmt;

use z3::ast::Bool;

use crate::ir::BlockId;
use crate::memory::SymbolicMemory;

/// Index of a frame inside the [`FrameArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId(usize);

/// Position inside one basic block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockFrame {
    pub block: BlockId,
    /// Index of the next instruction to execute
    pub cursor: usize,
    pub len: usize,
    /// Predecessor this frame was entered from; `None` for the entry block
    pub incoming: Option<BlockId>,
}

impl BlockFrame {
    pub fn new(block: BlockId, len: usize, incoming: Option<BlockId>) -> Self {
        Self {
            block,
            cursor: 0,
            len,
            incoming,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.len
    }

    pub fn advance(&mut self) {
        if self.cursor < self.len {
            self.cursor += 1;
        }
    }
}

#[derive(Debug)]
struct Slot {
    frame: BlockFrame,
    refs: usize,
}

/// Shared storage for block frames
///
/// Forked states share frames by index. A frame is copied only when a state that does not
/// own it exclusively needs to move its cursor.
#[derive(Debug, Default)]
pub struct FrameArena {
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
}

impl FrameArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, frame: BlockFrame) -> FrameId {
        let slot = Some(Slot { frame, refs: 1 });
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = slot;
                FrameId(index)
            }
            None => {
                self.slots.push(slot);
                FrameId(self.slots.len() - 1)
            }
        }
    }

    pub fn get(&self, id: FrameId) -> Option<&BlockFrame> {
        self.slots.get(id.0)?.as_ref().map(|slot| &slot.frame)
    }

    /// Register one more state holding `id`
    pub fn retain(&mut self, id: FrameId) {
        if let Some(Some(slot)) = self.slots.get_mut(id.0) {
            slot.refs += 1;
        }
    }

    /// Drop one holder of `id`, freeing the frame with its last holder
    pub fn release(&mut self, id: FrameId) {
        let Some(entry) = self.slots.get_mut(id.0) else {
            return;
        };
        if let Some(slot) = entry {
            slot.refs -= 1;
            if slot.refs == 0 {
                *entry = None;
                self.free.push(id.0);
            }
        }
    }

    /// Mutable access for one holder, copying the frame first if it is shared
    ///
    /// Returns the id the holder must use from now on.
    pub fn make_mut(&mut self, id: FrameId) -> Option<(FrameId, &mut BlockFrame)> {
        let shared = self.slots.get(id.0)?.as_ref()?.refs > 1;
        let id = if shared {
            let frame = self.slots[id.0].as_ref()?.frame;
            self.release(id);
            self.alloc(frame)
        } else {
            id
        };
        let slot = self.slots.get_mut(id.0)?.as_mut()?;
        Some((id, &mut slot.frame))
    }

    /// Number of live frames
    pub fn live(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
}

/// Identifier of an exploration state, unique within one engine run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub usize);

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One path through the function under exploration
#[derive(Debug, Clone)]
pub struct State {
    pub id: StateId,
    /// Innermost frame last
    pub frames: Vec<FrameId>,
    /// Path condition, append-only
    pub constraints: Vec<Bool>,
    pub memory: SymbolicMemory,
    /// Back-edges taken on this path
    pub loop_iterations: u32,
    /// Back-edges taken per loop header
    pub loop_counts: HashMap<BlockId, u32>,
}

impl State {
    pub fn new(id: StateId, memory: SymbolicMemory) -> Self {
        Self {
            id,
            frames: Vec::new(),
            constraints: Vec::new(),
            memory,
            loop_iterations: 0,
            loop_counts: HashMap::new(),
        }
    }

    pub fn top(&self) -> Option<FrameId> {
        self.frames.last().copied()
    }

    pub fn is_finished(&self) -> bool {
        self.frames.is_empty()
    }

    /// Copy this state under a new id; the caller must retain the shared frames
    pub fn fork(&self, id: StateId) -> Self {
        Self {
            id,
            ..self.clone()
        }
    }
}
