//! JSON bundle format consumed by the `checked-slicer` binary: a
//! pre-computed per-procedure disassembly and control-flow graph plus an
//! execution trace, in the shape an external instrumenting test runner
//! would hand off at the crate's actual input boundary.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::errors::{Result, SlicerError};
use crate::features::execution_trace::{CodeObjectMetadata, CodeObjectRegistry, ExecutedInstruction, ExecutionTrace, TracedLocation};
use crate::features::flow_graph::{BasicBlock, Cfg, NodeKey};
use crate::shared::models::{CodeObjectId, Instruction, Opcode, UniqueInstruction};

#[derive(Debug, Deserialize)]
pub struct BundleFile {
    pub code_objects: Vec<CodeObjectDto>,
    pub trace: TraceDto,
}

#[derive(Debug, Deserialize)]
pub struct CodeObjectDto {
    pub id: CodeObjectId,
    pub filename: String,
    pub parent_id: Option<CodeObjectId>,
    pub disassembly: Vec<UniqueInstructionDto>,
    pub blocks: Vec<BlockDto>,
    pub edges: Vec<(NodeKey, NodeKey)>,
    pub entry: NodeKey,
    pub exits: Vec<NodeKey>,
}

#[derive(Debug, Deserialize)]
pub struct UniqueInstructionDto {
    pub opcode: Opcode,
    pub argument: Option<i64>,
    pub lineno: u32,
    pub node_id: NodeKey,
    pub offset: u32,
    #[serde(default)]
    pub is_jump_target: bool,
}

/// One basic block's worth of static instructions, identified by `index`;
/// membership is derived from `disassembly`'s own `node_id`, so this DTO
/// carries no instruction list of its own.
#[derive(Debug, Deserialize)]
pub struct BlockDto {
    pub index: NodeKey,
    pub offset: u32,
}

#[derive(Debug, Deserialize)]
pub struct TraceDto {
    pub test_id: Option<String>,
    pub module_name: Option<String>,
    pub events: Vec<EventDto>,
}

#[derive(Debug, Deserialize)]
pub struct LocationDto {
    pub code_object_id: CodeObjectId,
    pub node_id: NodeKey,
    pub opcode: Opcode,
    pub argument: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    pub lineno: u32,
    pub offset: u32,
}

impl From<LocationDto> for TracedLocation {
    fn from(dto: LocationDto) -> Self {
        TracedLocation {
            file: String::new(),
            code_object_id: dto.code_object_id,
            node_id: dto.node_id as u32,
            opcode: dto.opcode,
            argument: dto.argument,
            name: dto.name,
            lineno: dto.lineno,
            offset: dto.offset,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventDto {
    Plain {
        #[serde(flatten)]
        location: LocationDto,
    },
    Memory {
        #[serde(flatten)]
        location: LocationDto,
        arg_address: Option<u64>,
        #[serde(default)]
        is_mutable_type: bool,
        #[serde(default)]
        object_creation: bool,
    },
    Attribute {
        #[serde(flatten)]
        location: LocationDto,
        src_address: Option<u64>,
        arg_address: Option<u64>,
        #[serde(default)]
        is_mutable_type: bool,
    },
    Control {
        #[serde(flatten)]
        location: LocationDto,
        target: NodeKey,
    },
    Call {
        #[serde(flatten)]
        location: LocationDto,
    },
    Return {
        #[serde(flatten)]
        location: LocationDto,
    },
}

impl From<EventDto> for ExecutedInstruction {
    fn from(dto: EventDto) -> Self {
        match dto {
            EventDto::Plain { location } => ExecutedInstruction::Plain(location.into()),
            EventDto::Memory {
                location,
                arg_address,
                is_mutable_type,
                object_creation,
            } => ExecutedInstruction::Memory {
                location: location.into(),
                arg_address,
                is_mutable_type,
                object_creation,
            },
            EventDto::Attribute {
                location,
                src_address,
                arg_address,
                is_mutable_type,
            } => ExecutedInstruction::Attribute {
                location: location.into(),
                src_address,
                arg_address,
                is_mutable_type,
            },
            EventDto::Control { location, target } => ExecutedInstruction::Control {
                location: location.into(),
                target: target as u32,
            },
            EventDto::Call { location } => ExecutedInstruction::Call(location.into()),
            EventDto::Return { location } => ExecutedInstruction::Return(location.into()),
        }
    }
}

fn build_code_object(dto: CodeObjectDto) -> Result<CodeObjectMetadata> {
    let disassembly: Vec<UniqueInstruction> = dto
        .disassembly
        .iter()
        .map(|instr| {
            UniqueInstruction::new(
                dto.filename.clone(),
                Instruction::new(instr.opcode, instr.argument, instr.lineno),
                dto.id,
                instr.node_id as u32,
                instr.offset,
                instr.argument,
                instr.is_jump_target,
            )
        })
        .collect();

    let blocks = dto
        .blocks
        .iter()
        .map(|block| {
            let instructions = dto
                .disassembly
                .iter()
                .filter(|instr| instr.node_id == block.index)
                .map(|instr| Instruction::new(instr.opcode, instr.argument, instr.lineno))
                .collect();
            BasicBlock::new(block.index, block.offset, instructions)
        })
        .collect();

    let cfg = Cfg::new(blocks, dto.edges, dto.entry, dto.exits);
    CodeObjectMetadata::new(dto.filename, dto.id, dto.parent_id, disassembly, cfg)
}

fn build_trace(dto: TraceDto) -> ExecutionTrace {
    let mut trace = ExecutionTrace::new();
    if let Some(test_id) = dto.test_id {
        trace.set_test_id(test_id);
    }
    if let Some(module_name) = dto.module_name {
        trace.set_module_name(module_name);
    }
    for event in dto.events {
        trace.add_instruction(event.into());
    }
    trace
}

/// Reads a bundle file from disk and builds the registry/trace pair a
/// [`crate::features::slicing::SlicingEngine`] runs against.
pub fn load_bundle(path: &Path) -> Result<(CodeObjectRegistry, ExecutionTrace)> {
    let raw = fs::read_to_string(path)?;
    let bundle: BundleFile =
        serde_json::from_str(&raw).map_err(|e| SlicerError::configuration(format!("malformed bundle {}: {e}", path.display())))?;

    let mut registry = CodeObjectRegistry::new();
    for code_object in bundle.code_objects {
        registry.register(build_code_object(code_object)?);
    }
    let trace = build_trace(bundle.trace);
    Ok((registry, trace))
}
