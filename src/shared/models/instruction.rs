//! Static instruction representation and its location-qualified variant.

use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::opcode::Opcode;

/// A dense integer id assigned to a procedure (code object) in registration
/// order. Never reused, never dereferenced directly — always looked up
/// through the code-object registry.
pub type CodeObjectId = u32;

/// Dense index of a basic block within a single procedure's CFG.
pub type BasicBlockId = u32;

/// An immutable record identifying the operation at a static position,
/// independent of any particular execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub opcode: Opcode,
    pub argument: Option<i64>,
    pub lineno: u32,
}

impl Instruction {
    pub fn new(opcode: Opcode, argument: Option<i64>, lineno: u32) -> Self {
        Self {
            opcode,
            argument,
            lineno,
        }
    }

    pub fn is_def(&self) -> bool {
        self.opcode.is_def()
    }

    pub fn is_use(&self) -> bool {
        self.opcode.is_use()
    }

    pub fn is_conditional_branch(&self) -> bool {
        self.opcode.is_cond_branch()
    }

    pub fn is_unconditional_jump(&self) -> bool {
        self.opcode.is_uncond_jump()
    }

    pub fn is_call(&self) -> bool {
        self.opcode.is_call()
    }

    pub fn is_return(&self) -> bool {
        self.opcode.is_return()
    }
}

/// An instruction plus the location coordinates that make a single dynamic
/// occurrence of it unique. `dis_arg`/`is_jump_target` are recovered from
/// the procedure's pre-instrumentation disassembly at construction time,
/// since the instrumented offset/argument can diverge from the original.
#[derive(Debug, Clone)]
pub struct UniqueInstruction {
    pub file: String,
    pub instr: Instruction,
    pub code_object_id: CodeObjectId,
    pub node_id: BasicBlockId,
    pub offset: u32,
    pub dis_arg: Option<i64>,
    pub is_jump_target: bool,
    in_slice: bool,
}

impl UniqueInstruction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        file: impl Into<String>,
        instr: Instruction,
        code_object_id: CodeObjectId,
        node_id: BasicBlockId,
        offset: u32,
        dis_arg: Option<i64>,
        is_jump_target: bool,
    ) -> Self {
        Self {
            file: file.into(),
            instr,
            code_object_id,
            node_id,
            offset,
            dis_arg,
            is_jump_target,
            in_slice: false,
        }
    }

    pub fn opcode(&self) -> Opcode {
        self.instr.opcode
    }

    pub fn lineno(&self) -> u32 {
        self.instr.lineno
    }

    pub fn set_in_slice(&mut self) {
        self.in_slice = true;
    }

    pub fn in_slice(&self) -> bool {
        self.in_slice
    }

    pub fn is_def(&self) -> bool {
        self.instr.is_def()
    }

    pub fn is_use(&self) -> bool {
        self.instr.is_use()
    }

    pub fn is_cond_branch(&self) -> bool {
        self.instr.is_conditional_branch()
    }

    pub fn is_uncond_jump(&self) -> bool {
        self.instr.is_unconditional_jump()
    }
}

/// Equality and hashing are defined over the location key only — two
/// `UniqueInstruction`s occupying the same `(opcode, code_object_id,
/// node_id, offset)` are the same slice member, regardless of `in_slice`.
impl PartialEq for UniqueInstruction {
    fn eq(&self, other: &Self) -> bool {
        self.instr.opcode == other.instr.opcode
            && self.code_object_id == other.code_object_id
            && self.node_id == other.node_id
            && self.offset == other.offset
    }
}

impl Eq for UniqueInstruction {}

impl Hash for UniqueInstruction {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.instr.opcode.hash(state);
        self.code_object_id.hash(state);
        self.node_id.hash(state);
        self.offset.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instr(opcode: Opcode) -> UniqueInstruction {
        UniqueInstruction::new("mod.py", Instruction::new(opcode, None, 1), 0, 0, 0, None, false)
    }

    #[test]
    fn equality_ignores_in_slice_flag() {
        let mut a = instr(Opcode::LoadFast);
        let b = instr(Opcode::LoadFast);
        a.set_in_slice();
        assert_eq!(a, b);
    }

    #[test]
    fn equality_requires_matching_location() {
        let a = instr(Opcode::LoadFast);
        let mut b = instr(Opcode::LoadFast);
        b.offset = 2;
        assert_ne!(a, b);
    }
}
