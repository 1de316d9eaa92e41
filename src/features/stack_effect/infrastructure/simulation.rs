//! Backward operand-stack simulation: a shadow stack of frames, each a
//! stack of block-stacks, tracking which `UniqueInstruction` produced the
//! value currently occupying each operand-stack slot.

use std::collections::HashSet;

use crate::errors::{Result, SlicerError};
use crate::shared::models::{CodeObjectId, UniqueInstruction};

const DEFAULT_STACK_HEIGHT: usize = 40;
const DEFAULT_FRAME_HEIGHT: usize = 40;

/// Sentinel code-object id used for frames pushed to resume simulation
/// after an exception or other flow the tracer could not observe directly.
pub const ARTIFICIAL_CODE_OBJECT: CodeObjectId = CodeObjectId::MAX;

#[derive(Debug, Clone, Default)]
struct BlockStack {
    producers: Vec<UniqueInstruction>,
}

impl BlockStack {
    fn push(&mut self, instr: UniqueInstruction) {
        self.producers.push(instr);
    }

    fn pop(&mut self) -> Option<UniqueInstruction> {
        self.producers.pop()
    }
}

#[derive(Debug, Clone)]
struct FrameStack {
    code_object_id: CodeObjectId,
    block_stacks: Vec<BlockStack>,
    attribute_uses: HashSet<String>,
    import_name_instr: Option<UniqueInstruction>,
}

impl FrameStack {
    fn new(code_object_id: CodeObjectId) -> Self {
        let mut block_stacks = Vec::with_capacity(DEFAULT_FRAME_HEIGHT);
        block_stacks.push(BlockStack::default());
        Self {
            code_object_id,
            block_stacks,
            attribute_uses: HashSet::new(),
            import_name_instr: None,
        }
    }

    /// A dummy frame used purely as pre-allocated depth below the real
    /// stack, never itself subject to the `pop_stack` block-stack-count
    /// invariant (its `code_object_id` is [`ARTIFICIAL_CODE_OBJECT`]).
    fn padding() -> Self {
        let block_stacks = (0..DEFAULT_FRAME_HEIGHT).map(|_| BlockStack::default()).collect();
        Self {
            code_object_id: ARTIFICIAL_CODE_OBJECT,
            block_stacks,
            attribute_uses: HashSet::new(),
            import_name_instr: None,
        }
    }

    fn top_mut(&mut self) -> &mut BlockStack {
        self.block_stacks.last_mut().expect("frame always has at least one block-stack")
    }

    fn top(&self) -> &BlockStack {
        self.block_stacks.last().expect("frame always has at least one block-stack")
    }
}

/// The live shadow stack driving backward simulation. Pre-allocates frame
/// capacity so that starting mid-trace never underflows a growable vec in
/// a way that would be observable as a spurious pop.
#[derive(Debug, Clone)]
pub struct TraceStack {
    frames: Vec<FrameStack>,
}

impl TraceStack {
    /// Pre-fills `DEFAULT_STACK_HEIGHT` frames below the entry frame so a
    /// backward walk starting mid-call (e.g. the criterion sits inside a
    /// custom-assertion helper, §6) can cross a `call` boundary's
    /// `pop_stack` before any matching `push_stack` without underflowing.
    pub fn new(entry_code_object_id: CodeObjectId) -> Self {
        let mut frames = Vec::with_capacity(DEFAULT_STACK_HEIGHT);
        for _ in 0..DEFAULT_STACK_HEIGHT - 1 {
            frames.push(FrameStack::padding());
        }
        frames.push(FrameStack::new(entry_code_object_id));
        Self { frames }
    }

    fn current(&self) -> &FrameStack {
        self.frames.last().expect("trace stack is never empty")
    }

    fn current_mut(&mut self) -> &mut FrameStack {
        self.frames.last_mut().expect("trace stack is never empty")
    }

    pub fn push_stack(&mut self, code_object_id: CodeObjectId) {
        self.frames.push(FrameStack::new(code_object_id));
    }

    /// Pops the current frame on a call/return boundary. The popped frame
    /// must be a real (non-artificial) frame holding exactly one
    /// block-stack — more than one means a block (`with`/`try`) was left
    /// open, which is a bookkeeping invariant violation, not a recoverable
    /// condition.
    pub fn pop_stack(&mut self) -> Result<()> {
        let frame = self.frames.pop().ok_or_else(|| SlicerError::invariant("popped an empty trace stack"))?;
        if frame.code_object_id != ARTIFICIAL_CODE_OBJECT && frame.block_stacks.len() != 1 {
            return Err(SlicerError::invariant(format!(
                "frame for code object {} closed with {} open block-stacks, expected 1",
                frame.code_object_id,
                frame.block_stacks.len()
            )));
        }
        Ok(())
    }

    pub fn push_artificial_stack(&mut self) {
        self.frames.push(FrameStack::new(ARTIFICIAL_CODE_OBJECT));
    }

    /// Undoes `n_pushes` forward pushes, i.e. pops that many producers off
    /// the current block-stack. Returns `(implicit_dep, include_use)`:
    /// `implicit_dep` is set if any popped producer is already in the
    /// slice; `include_use` is false when the topmost popped producer was
    /// an attribute/subscript access, so the slicer does not chase uses of
    /// the whole container object.
    pub fn update_push_operations(&mut self, n_pushes: u32, returned: bool) -> (bool, bool) {
        let mut implicit_dep = false;
        let mut include_use = true;

        for i in 0..n_pushes {
            let popped = self.current_mut().top_mut().pop();
            if let Some(producer) = popped {
                if producer.in_slice() {
                    implicit_dep = true;
                }
                if i == 0 && producer.opcode().is_attribute_access() {
                    include_use = false;
                }
            }
        }

        if returned && self.frames.len() >= 2 {
            let previous = &self.frames[self.frames.len() - 2];
            if previous.top().producers.last().is_some_and(|p| p.in_slice()) {
                implicit_dep = true;
            }
        }

        (implicit_dep, include_use)
    }

    /// Undoes `n_pops` forward pops, i.e. pushes `unique_instr` onto the
    /// current block-stack `n_pops` times as the producer of those slots.
    pub fn update_pop_operations(&mut self, n_pops: u32, unique_instr: &UniqueInstruction) {
        let block = self.current_mut().top_mut();
        for _ in 0..n_pops {
            block.push(unique_instr.clone());
        }
    }

    pub fn set_attribute_uses(&mut self, uses: HashSet<String>) {
        self.current_mut().attribute_uses = uses;
    }

    pub fn get_attribute_uses(&self) -> HashSet<String> {
        self.current().attribute_uses.clone()
    }

    pub fn set_import_frame(&mut self, instr: Option<UniqueInstruction>) {
        self.current_mut().import_name_instr = instr;
    }

    pub fn get_import_frame(&self) -> Option<&UniqueInstruction> {
        self.current().import_name_instr.as_ref()
    }

    pub fn current_code_object(&self) -> CodeObjectId {
        self.current().code_object_id
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{Instruction, Opcode};

    fn instr(opcode: Opcode) -> UniqueInstruction {
        UniqueInstruction::new("mod.py", Instruction::new(opcode, None, 1), 0, 0, 0, None, false)
    }

    #[test]
    fn pop_stack_rejects_multiple_open_block_stacks() {
        let mut stack = TraceStack::new(0);
        stack.current_mut().block_stacks.push(BlockStack::default());
        assert!(stack.pop_stack().is_err());
    }

    #[test]
    fn popping_empty_block_stack_is_not_an_error() {
        let mut stack = TraceStack::new(0);
        let (implicit_dep, include_use) = stack.update_push_operations(2, false);
        assert!(!implicit_dep);
        assert!(include_use);
    }

    #[test]
    fn in_slice_producer_yields_implicit_dependency() {
        let mut stack = TraceStack::new(0);
        let mut producer = instr(Opcode::LoadFast);
        producer.set_in_slice();
        stack.update_pop_operations(1, &producer);
        let (implicit_dep, _) = stack.update_push_operations(1, false);
        assert!(implicit_dep);
    }

    #[test]
    fn attribute_access_producer_suppresses_use_propagation() {
        let mut stack = TraceStack::new(0);
        stack.update_pop_operations(1, &instr(Opcode::LoadAttr));
        let (_, include_use) = stack.update_push_operations(1, false);
        assert!(!include_use);
    }
}
