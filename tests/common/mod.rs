//! Shared fixture builders for the end-to-end scenario tests. Kept under
//! `tests/common` (not `tests/common.rs`) so cargo doesn't also compile it
//! as its own standalone test binary.

#![allow(dead_code)]

use std::collections::HashSet;

use checked_slicer::{
    BasicBlock, Cfg, CodeObjectMetadata, CodeObjectRegistry, ExecutedInstruction, ExecutionTrace, Instruction, Opcode,
    SlicingConfig, SlicingCriterion, SlicingEngine, TracedLocation, UniqueInstruction,
};

pub fn unique(opcode: Opcode, node_id: u32, offset: u32, argument: Option<i64>) -> UniqueInstruction {
    unique_jump_target(opcode, node_id, offset, argument, false)
}

pub fn unique_jump_target(opcode: Opcode, node_id: u32, offset: u32, argument: Option<i64>, is_jump_target: bool) -> UniqueInstruction {
    UniqueInstruction::new("mod.py", Instruction::new(opcode, argument, 1), 0, node_id, offset, argument, is_jump_target)
}

pub fn location(opcode: Opcode, node_id: u32, offset: u32, argument: Option<i64>) -> TracedLocation {
    TracedLocation {
        file: "mod.py".into(),
        code_object_id: 0,
        node_id,
        opcode,
        argument,
        name: argument.map(|a| a.to_string()),
        lineno: 1,
        offset,
    }
}

pub fn plain(opcode: Opcode, node_id: u32, offset: u32, argument: Option<i64>) -> ExecutedInstruction {
    ExecutedInstruction::Plain(location(opcode, node_id, offset, argument))
}

pub fn memory(opcode: Opcode, node_id: u32, offset: u32, argument: Option<i64>) -> ExecutedInstruction {
    ExecutedInstruction::Memory {
        location: location(opcode, node_id, offset, argument),
        arg_address: None,
        is_mutable_type: false,
        object_creation: false,
    }
}

pub fn returned(opcode: Opcode, node_id: u32, offset: u32) -> ExecutedInstruction {
    ExecutedInstruction::Return(location(opcode, node_id, offset, None))
}

/// Builds a single-code-object registry (id 0) from a flat disassembly plus
/// the basic-block/edge shape of its CFG.
pub fn single_code_object_registry(
    disassembly: Vec<UniqueInstruction>,
    blocks: Vec<(i64, u32)>,
    edges: Vec<(i64, i64)>,
    entry: i64,
    exits: Vec<i64>,
) -> CodeObjectRegistry {
    let basic_blocks = blocks.into_iter().map(|(index, offset)| BasicBlock::new(index, offset, Vec::new())).collect();
    let cfg = Cfg::new(basic_blocks, edges, entry, exits);
    let mut registry = CodeObjectRegistry::new();
    registry.register(CodeObjectMetadata::new("mod.py", 0, None, disassembly, cfg).unwrap());
    registry
}

pub fn trace_of(events: Vec<ExecutedInstruction>) -> ExecutionTrace {
    let mut trace = ExecutionTrace::new();
    trace.set_test_id("test_scenario");
    for event in events {
        trace.add_instruction(event);
    }
    trace
}

pub fn slice_offsets(registry: CodeObjectRegistry, trace: &ExecutionTrace, criterion_instr: UniqueInstruction, trace_position: usize) -> HashSet<u32> {
    let engine = SlicingEngine::new(registry, SlicingConfig::default());
    let criterion = SlicingCriterion::new(criterion_instr);
    let slice = engine.slice(trace, criterion, trace_position).unwrap();
    slice.instructions.iter().map(|i| i.offset).collect()
}
