//! The recorded execution trace: one entry per dynamically executed
//! instruction, plus the assertion windows recorded against it.

use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use crate::shared::models::{BasicBlockId, CodeObjectId, Opcode};

/// Common coordinates shared by every kind of traced event.
#[derive(Debug, Clone, PartialEq)]
pub struct TracedLocation {
    pub file: String,
    pub code_object_id: CodeObjectId,
    pub node_id: BasicBlockId,
    pub opcode: Opcode,
    pub argument: Option<i64>,
    /// The identifier (variable/attribute/module name) this instruction's
    /// operand refers to, shared by name rather than by per-code-object
    /// table index so it matches across scopes (closures) and tables
    /// (`co_varnames` vs `co_names`).
    pub name: Option<String>,
    pub lineno: u32,
    pub offset: u32,
}

/// One dynamically executed instruction, tagged by the extra payload its
/// opcode category carries. Mirrors the def/use/attribute/control/call/
/// return split the reconstructor and the explicit-data-dependence
/// analysis both dispatch on.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutedInstruction {
    Plain(TracedLocation),
    Memory {
        location: TracedLocation,
        arg_address: Option<u64>,
        is_mutable_type: bool,
        object_creation: bool,
    },
    Attribute {
        location: TracedLocation,
        src_address: Option<u64>,
        arg_address: Option<u64>,
        is_mutable_type: bool,
    },
    Control {
        location: TracedLocation,
        target: BasicBlockId,
    },
    Call(TracedLocation),
    Return(TracedLocation),
}

impl ExecutedInstruction {
    pub fn location(&self) -> &TracedLocation {
        match self {
            ExecutedInstruction::Plain(l)
            | ExecutedInstruction::Memory { location: l, .. }
            | ExecutedInstruction::Attribute { location: l, .. }
            | ExecutedInstruction::Control { location: l, .. }
            | ExecutedInstruction::Call(l)
            | ExecutedInstruction::Return(l) => l,
        }
    }

    pub fn is_jump(&self) -> bool {
        matches!(self, ExecutedInstruction::Control { .. })
    }

    /// For [`ExecutedInstruction::Attribute`], the `hex(address)_name`
    /// key the explicit-data-dependence analysis indexes by.
    pub fn combined_attribute_key(&self) -> Option<String> {
        match self {
            ExecutedInstruction::Attribute { location, src_address: Some(addr), .. } => {
                Some(format!("{:#x}_{}", addr, attribute_name(location)))
            }
            _ => None,
        }
    }
}

fn attribute_name(location: &TracedLocation) -> String {
    location.name.clone().unwrap_or_default()
}

/// The trace-position window during which a traced assertion's own check
/// (and any instructions it pulled in) executed.
#[derive(Debug, Clone, PartialEq)]
pub struct TracedAssertion {
    pub code_object_id: CodeObjectId,
    pub node_id: BasicBlockId,
    pub lineno: u32,
    pub trace_position_start: usize,
    pub trace_position_end: usize,
}

/// Deduplication key for assertions: two assertion *sites* (not
/// occurrences) collapse if they share code object, block, line and
/// offset.
#[derive(Debug, Clone)]
pub struct UniqueAssertion {
    pub code_object_id: CodeObjectId,
    pub node_id: BasicBlockId,
    pub lineno: u32,
    pub offset: u32,
}

impl PartialEq for UniqueAssertion {
    fn eq(&self, other: &Self) -> bool {
        self.code_object_id == other.code_object_id
            && self.node_id == other.node_id
            && self.lineno == other.lineno
            && self.offset == other.offset
    }
}

impl Eq for UniqueAssertion {}

impl Hash for UniqueAssertion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.code_object_id.hash(state);
        self.node_id.hash(state);
        self.lineno.hash(state);
        self.offset.hash(state);
    }
}

/// The full execution trace of one test: every instruction executed, in
/// order, plus the assertion windows recorded within it.
#[derive(Debug, Clone, Default)]
pub struct ExecutionTrace {
    pub executed_instructions: Vec<ExecutedInstruction>,
    pub traced_assertions: Vec<TracedAssertion>,
    pub unique_assertions: HashSet<UniqueAssertion>,
    test_id: Option<String>,
    module_name: Option<String>,
    open_assertion_start: Option<usize>,
}

impl ExecutionTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_instruction(&mut self, instruction: ExecutedInstruction) {
        self.executed_instructions.push(instruction);
    }

    pub fn start_assertion(&mut self) {
        self.open_assertion_start = Some(self.executed_instructions.len());
    }

    /// Closes the currently open assertion window, recording it against
    /// `code_object_id`/`node_id`/`lineno`. No-op if no window was open.
    pub fn end_assertion(&mut self, code_object_id: CodeObjectId, node_id: BasicBlockId, lineno: u32) {
        let Some(start) = self.open_assertion_start.take() else {
            return;
        };
        self.traced_assertions.push(TracedAssertion {
            code_object_id,
            node_id,
            lineno,
            trace_position_start: start,
            trace_position_end: self.executed_instructions.len(),
        });
    }

    pub fn set_test_id(&mut self, test_id: impl Into<String>) {
        self.test_id = Some(test_id.into());
    }

    pub fn set_module_name(&mut self, module_name: impl Into<String>) {
        self.module_name = Some(module_name.into());
    }

    pub fn test_id(&self) -> Option<&str> {
        self.test_id.as_deref()
    }

    pub fn module_name(&self) -> Option<&str> {
        self.module_name.as_deref()
    }

    pub fn len(&self) -> usize {
        self.executed_instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executed_instructions.is_empty()
    }
}
