//! Execution-flow reconstructor: given where the backward walk currently
//! stands, finds the instruction that executed immediately before it on
//! the dynamic path, reconciling the static disassembly against the trace.

use crate::features::execution_trace::{CodeObjectRegistry, ExecutedInstruction, ExecutionTrace};
use crate::shared::models::{BasicBlockId, CodeObjectId, Opcode, UniqueInstruction};

/// Where the backward walk currently stands.
#[derive(Debug, Clone)]
pub struct FlowCursor {
    pub instr: UniqueInstruction,
    pub code_object_id: CodeObjectId,
    pub basic_block_id: BasicBlockId,
    /// Index into `ExecutionTrace::executed_instructions`; negative once
    /// the trace is exhausted.
    pub trace_pos: i64,
    pub import_back_call: Option<UniqueInstruction>,
}

/// The predecessor instruction plus the flags describing what happened
/// between it and the cursor's instruction.
#[derive(Debug, Clone)]
pub struct FlowStep {
    pub last_instr: Option<UniqueInstruction>,
    pub code_object_id: CodeObjectId,
    pub basic_block_id: BasicBlockId,
    pub jump: bool,
    pub call: bool,
    pub returned: bool,
    pub exception: bool,
    pub import_start: bool,
    pub import_back_call: Option<UniqueInstruction>,
}

impl FlowStep {
    fn none_found(code_object_id: CodeObjectId, basic_block_id: BasicBlockId) -> Self {
        Self {
            last_instr: None,
            code_object_id,
            basic_block_id,
            jump: false,
            call: false,
            returned: false,
            exception: false,
            import_start: false,
            import_back_call: None,
        }
    }
}

fn block_instructions<'a>(disassembly: &'a [UniqueInstruction], block: BasicBlockId) -> Vec<&'a UniqueInstruction> {
    disassembly.iter().filter(|i| i.node_id == block).collect()
}

fn previous_in_block(disassembly: &[UniqueInstruction], block: BasicBlockId, instr: &UniqueInstruction) -> Option<UniqueInstruction> {
    let block_instrs = block_instructions(disassembly, block);
    let idx = block_instrs.iter().position(|i| i.offset == instr.offset && i.opcode() == instr.opcode())?;
    if idx == 0 {
        None
    } else {
        Some(block_instrs[idx - 1].clone())
    }
}

fn last_of_block(disassembly: &[UniqueInstruction], block: BasicBlockId) -> Option<UniqueInstruction> {
    block_instructions(disassembly, block).last().map(|&i| i.clone())
}

fn instr_index_in_block(disassembly: &[UniqueInstruction], block: BasicBlockId, instr: &UniqueInstruction) -> usize {
    block_instructions(disassembly, block)
        .iter()
        .position(|i| i.offset == instr.offset && i.opcode() == instr.opcode())
        .unwrap_or(0)
}

/// Locates the `UniqueInstruction` a traced event corresponds to in its
/// owning procedure's disassembly, by matching `(opcode, node_id, offset)`.
fn traced_to_unique(registry: &CodeObjectRegistry, traced: &ExecutedInstruction) -> Option<UniqueInstruction> {
    let location = traced.location();
    let meta = registry.get(location.code_object_id)?;
    meta.disassembly
        .iter()
        .find(|i| i.opcode() == location.opcode && i.node_id == location.node_id && i.offset == location.offset)
        .cloned()
}

/// Runs the case analysis of the reconstructor for one backward step.
pub fn get_last_instruction(cursor: &FlowCursor, registry: &CodeObjectRegistry, trace: &ExecutionTrace) -> FlowStep {
    let Some(meta) = registry.get(cursor.code_object_id) else {
        return FlowStep::none_found(cursor.code_object_id, cursor.basic_block_id);
    };
    let disassembly = &meta.disassembly;

    let last_traced_event = if cursor.trace_pos >= 0 {
        trace.executed_instructions.get(cursor.trace_pos as usize)
    } else {
        None
    };

    let instr_index = instr_index_in_block(disassembly, cursor.basic_block_id, &cursor.instr);
    let in_block_predecessor = previous_in_block(disassembly, cursor.basic_block_id, &cursor.instr);

    let mut step = FlowStep::none_found(cursor.code_object_id, cursor.basic_block_id);
    step.import_back_call = cursor.import_back_call.clone();

    if cursor.trace_pos < 0 {
        // Case 1: trace exhausted.
        if let Some(prev) = in_block_predecessor {
            step.last_instr = Some(prev);
        } else if cursor.basic_block_id > 0 {
            if let Some(last) = last_of_block(disassembly, cursor.basic_block_id - 1) {
                step.basic_block_id = cursor.basic_block_id - 1;
                step.last_instr = Some(last);
            }
        }
        if step.last_instr.is_none() {
            if let Some(back_call) = cursor.import_back_call.clone() {
                if let Some(importing_meta) = registry.get(back_call.code_object_id) {
                    if let Some(prev) = previous_in_block(&importing_meta.disassembly, back_call.node_id, &back_call) {
                        step.code_object_id = back_call.code_object_id;
                        step.basic_block_id = back_call.node_id;
                        step.last_instr = Some(prev);
                        step.import_start = true;
                    }
                }
            }
        }
        return step;
    }

    // Case 2/3: still within the traced window.
    if instr_index > 0 {
        step.last_instr = in_block_predecessor;
    } else if cursor.instr.is_jump_target {
        if let Some(event) = last_traced_event {
            if let ExecutedInstruction::Control { target, .. } = event {
                if *target == cursor.basic_block_id {
                    if let Some(source) = traced_to_unique(registry, event) {
                        step.last_instr = Some(source);
                        step.jump = true;
                    }
                }
            }
        }
        if step.last_instr.is_none() && cursor.basic_block_id > 0 {
            if let Some(last) = last_of_block(disassembly, cursor.basic_block_id - 1) {
                step.basic_block_id = cursor.basic_block_id - 1;
                step.last_instr = Some(last);
            }
        }
    } else if cursor.basic_block_id > 0 {
        if let Some(last) = last_of_block(disassembly, cursor.basic_block_id - 1) {
            step.basic_block_id = cursor.basic_block_id - 1;
            step.last_instr = Some(last);
        }
    }

    // Case 4: return handling.
    if let Some(ExecutedInstruction::Return(location)) = last_traced_event {
        if cursor.instr.opcode() == Opcode::ImportName {
            if let Some(source) = traced_to_unique(registry, last_traced_event.unwrap()) {
                step.last_instr = Some(source);
                step.returned = true;
                step.import_back_call = Some(cursor.instr.clone());
            }
        } else {
            let disagrees = match &step.last_instr {
                None => true,
                Some(candidate) => {
                    candidate.is_call() || (candidate.opcode().is_traced() && candidate.opcode() != location.opcode)
                }
            };
            if disagrees {
                if let Some(source) = traced_to_unique(registry, last_traced_event.unwrap()) {
                    step.last_instr = Some(source);
                    step.returned = true;
                }
            }
        }
    }

    // Case 5: call boundary.
    if step.last_instr.is_none() {
        if cursor.import_back_call.is_none() {
            if let Some(event) = last_traced_event {
                if let Some(source) = traced_to_unique(registry, event) {
                    step.last_instr = Some(source);
                    step.call = true;
                }
            }
        } else if let Some(back_call) = cursor.import_back_call.clone() {
            if let Some(importing_meta) = registry.get(back_call.code_object_id) {
                if let Some(prev) = previous_in_block(&importing_meta.disassembly, back_call.node_id, &back_call) {
                    step.code_object_id = back_call.code_object_id;
                    step.basic_block_id = back_call.node_id;
                    step.last_instr = Some(prev);
                    step.import_start = true;
                    step.call = true;
                }
            }
        }
    }

    // Case 6: generator resumption / exception-induced divergence.
    if !step.call && !step.returned {
        if let Some(candidate) = step.last_instr.clone() {
            if candidate.opcode() == Opcode::YieldValue || candidate.opcode() == Opcode::YieldFrom {
                if let Some(event) = last_traced_event {
                    if let Some(source) = traced_to_unique(registry, event) {
                        step.last_instr = Some(source);
                    }
                }
            } else if let Some(event) = last_traced_event {
                if candidate.opcode().is_traced() && candidate.opcode() != event.location().opcode {
                    if let Some(source) = traced_to_unique(registry, event) {
                        step.last_instr = Some(source);
                        step.exception = true;
                    }
                }
            }
        }
    }

    step
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::execution_trace::{CodeObjectMetadata, TracedLocation};
    use crate::features::flow_graph::{BasicBlock, Cfg};
    use crate::shared::models::Instruction;

    fn unique(opcode: Opcode, node_id: BasicBlockId, offset: u32) -> UniqueInstruction {
        UniqueInstruction::new("mod.py", Instruction::new(opcode, None, 1), 0, node_id, offset, None, false)
    }

    fn registry_with_one_block(instrs: Vec<UniqueInstruction>) -> CodeObjectRegistry {
        let mut registry = CodeObjectRegistry::new();
        let cfg = Cfg::new(vec![BasicBlock::new(0, 0, Vec::new())], vec![], 0, vec![0]);
        let meta = CodeObjectMetadata::new("mod.py", 0, None, instrs, cfg).unwrap();
        registry.register(meta);
        registry
    }

    #[test]
    fn in_block_predecessor_is_found() {
        let a = unique(Opcode::LoadConst, 0, 0);
        let b = unique(Opcode::ReturnValue, 0, 2);
        let registry = registry_with_one_block(vec![a.clone(), b.clone()]);
        let trace = ExecutionTrace::new();

        let cursor = FlowCursor {
            instr: b,
            code_object_id: 0,
            basic_block_id: 0,
            trace_pos: -1,
            import_back_call: None,
        };
        let step = get_last_instruction(&cursor, &registry, &trace);
        assert_eq!(step.last_instr.unwrap().offset, 0);
    }

    #[test]
    fn call_boundary_falls_back_to_last_traced_event() {
        let a = unique(Opcode::LoadFast, 0, 0);
        let call_site = unique(Opcode::CallFunction, 0, 10);
        let registry = registry_with_one_block(vec![a.clone(), call_site]);
        let mut trace = ExecutionTrace::new();
        trace.add_instruction(ExecutedInstruction::Call(TracedLocation {
            file: "mod.py".into(),
            code_object_id: 0,
            node_id: 0,
            opcode: Opcode::CallFunction,
            argument: None,
            name: None,
            lineno: 1,
            offset: 10,
        }));

        let cursor = FlowCursor {
            instr: a,
            code_object_id: 0,
            basic_block_id: 0,
            trace_pos: 0,
            import_back_call: None,
        };
        let step = get_last_instruction(&cursor, &registry, &trace);
        assert!(step.call);
    }
}
