pub mod instruction;
pub mod opcode;

pub use instruction::{BasicBlockId, CodeObjectId, Instruction, UniqueInstruction};
pub use opcode::Opcode;
