//! Opcode enumeration and the categorical predicates derived from it.
//!
//! The slicer never interprets argument payloads beyond what categorisation
//! requires; the surrounding system owns the actual bytecode ISA.

use serde::{Deserialize, Serialize};

/// Every opcode the slicer can reason about. Variants are grouped by the
/// categories `is_def`/`is_use`/`is_cond_branch`/... partition over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    Nop,
    ExtendedArg,

    PopTop,
    RotTwo,
    RotThree,
    RotFour,
    DupTop,
    DupTopTwo,

    UnaryPositive,
    UnaryNegative,
    UnaryNot,
    UnaryInvert,

    BinaryPower,
    BinaryMultiply,
    BinaryMatrixMultiply,
    BinaryModulo,
    BinaryAdd,
    BinarySubtract,
    BinarySubscr,
    BinaryFloorDivide,
    BinaryTrueDivide,
    BinaryLshift,
    BinaryRshift,
    BinaryAnd,
    BinaryXor,
    BinaryOr,

    InplaceFloorDivide,
    InplaceTrueDivide,
    InplaceAdd,
    InplaceSubtract,
    InplaceMultiply,
    InplaceMatrixMultiply,
    InplaceModulo,
    InplacePower,
    InplaceLshift,
    InplaceRshift,
    InplaceAnd,
    InplaceXor,
    InplaceOr,

    StoreSubscr,
    DeleteSubscr,

    SetAdd,
    ListAppend,
    MapAdd,

    GetIter,
    GetYieldFromIter,
    GetAwaitable,
    GetAiter,
    GetAnext,
    BeforeAsyncWith,

    PrintExpr,
    LoadBuildClass,

    ReturnValue,
    ImportStar,
    SetupAnnotations,
    YieldValue,
    YieldFrom,
    PopBlock,
    PopExcept,
    PopFinally,
    EndFinally,
    BeginFinally,

    StoreName,
    DeleteName,
    StoreAttr,
    DeleteAttr,
    StoreGlobal,
    DeleteGlobal,
    LoadConst,
    LoadName,
    LoadAttr,
    LoadMethod,
    CallMethod,
    CompareOp,
    ImportName,
    ImportFrom,

    JumpForward,
    JumpAbsolute,
    JumpIfFalseOrPop,
    JumpIfTrueOrPop,
    PopJumpIfFalse,
    PopJumpIfTrue,
    ForIter,

    LoadGlobal,

    LoadFast,
    StoreFast,
    DeleteFast,

    LoadClosure,
    LoadDeref,
    LoadClassDeref,
    StoreDeref,
    DeleteDeref,

    UnpackSequence,
    UnpackEx,
    BuildTuple,
    BuildList,
    BuildSet,
    BuildString,
    BuildMap,
    BuildConstKeyMap,
    BuildSlice,
    BuildListUnpack,
    BuildTupleUnpack,
    BuildTupleUnpackWithCall,
    BuildSetUnpack,
    BuildMapUnpack,
    BuildMapUnpackWithCall,

    RaiseVarargs,
    CallFunction,
    CallFunctionKw,
    CallFunctionEx,
    MakeFunction,

    SetupWith,
    SetupFinally,
    CallFinally,

    WithCleanupStart,
    WithCleanupFinish,
    SetupAsyncWith,
    EndAsyncFor,
    FormatValue,
}

const MEMORY_USE: &[Opcode] = &[
    Opcode::LoadFast,
    Opcode::LoadName,
    Opcode::LoadGlobal,
    Opcode::LoadAttr,
    Opcode::LoadDeref,
    Opcode::BinarySubscr,
    Opcode::LoadMethod,
    Opcode::ImportFrom,
    Opcode::LoadClosure,
    Opcode::LoadClassDeref,
];

const MEMORY_DEF: &[Opcode] = &[
    Opcode::StoreFast,
    Opcode::StoreName,
    Opcode::StoreGlobal,
    Opcode::StoreDeref,
    Opcode::StoreAttr,
    Opcode::StoreSubscr,
    Opcode::BinarySubscr,
    Opcode::DeleteFast,
    Opcode::DeleteName,
    Opcode::DeleteGlobal,
    Opcode::DeleteAttr,
    Opcode::DeleteSubscr,
    Opcode::DeleteDeref,
    // IMPORT_NAME has a deliberately incorrect static stack effect (see the
    // stack-effect oracle); treating it as a def compensates for that.
    Opcode::ImportName,
];

const COND_BRANCH: &[Opcode] = &[
    Opcode::PopJumpIfTrue,
    Opcode::PopJumpIfFalse,
    Opcode::JumpIfTrueOrPop,
    Opcode::JumpIfFalseOrPop,
    Opcode::ForIter,
];

const UNCOND_JUMP: &[Opcode] = &[Opcode::JumpForward, Opcode::JumpAbsolute];

const CALL: &[Opcode] = &[
    Opcode::CallFunction,
    Opcode::CallFunctionKw,
    Opcode::CallFunctionEx,
    Opcode::CallMethod,
    Opcode::YieldFrom,
];

const RETURN: &[Opcode] = &[Opcode::ReturnValue, Opcode::YieldValue];

const UNCERTAIN: &[Opcode] = &[
    Opcode::WithCleanupStart,
    Opcode::WithCleanupFinish,
    Opcode::SetupAsyncWith,
    Opcode::EndAsyncFor,
    Opcode::FormatValue,
];

/// Opcodes the tracer actually instruments: unary/binary/inplace/compare
/// arithmetic, local/name/global/deref/attribute/subscript access, imports,
/// jumps, calls and returns. Everything else (`LOAD_CONST`, stack shuffles,
/// `BUILD_*`, ...) executes without a corresponding trace event, so the
/// reconstructor must not expect one to exist for it.
const TRACED: &[Opcode] = &[
    Opcode::UnaryPositive,
    Opcode::UnaryNegative,
    Opcode::UnaryNot,
    Opcode::UnaryInvert,
    Opcode::GetIter,
    Opcode::GetYieldFromIter,
    Opcode::BinaryPower,
    Opcode::BinaryMultiply,
    Opcode::BinaryMatrixMultiply,
    Opcode::BinaryFloorDivide,
    Opcode::BinaryTrueDivide,
    Opcode::BinaryModulo,
    Opcode::BinaryAdd,
    Opcode::BinarySubtract,
    Opcode::BinaryLshift,
    Opcode::BinaryRshift,
    Opcode::BinaryAnd,
    Opcode::BinaryXor,
    Opcode::BinaryOr,
    Opcode::InplacePower,
    Opcode::InplaceMultiply,
    Opcode::InplaceMatrixMultiply,
    Opcode::InplaceFloorDivide,
    Opcode::InplaceTrueDivide,
    Opcode::InplaceModulo,
    Opcode::InplaceAdd,
    Opcode::InplaceSubtract,
    Opcode::InplaceLshift,
    Opcode::InplaceRshift,
    Opcode::InplaceAnd,
    Opcode::InplaceXor,
    Opcode::InplaceOr,
    Opcode::CompareOp,
    Opcode::StoreFast,
    Opcode::LoadFast,
    Opcode::DeleteFast,
    Opcode::StoreName,
    Opcode::LoadName,
    Opcode::DeleteName,
    Opcode::StoreGlobal,
    Opcode::LoadGlobal,
    Opcode::DeleteGlobal,
    Opcode::StoreDeref,
    Opcode::LoadDeref,
    Opcode::DeleteDeref,
    Opcode::LoadClassDeref,
    Opcode::StoreAttr,
    Opcode::LoadAttr,
    Opcode::DeleteAttr,
    Opcode::ImportFrom,
    Opcode::LoadMethod,
    Opcode::StoreSubscr,
    Opcode::DeleteSubscr,
    Opcode::BinarySubscr,
    Opcode::ImportName,
    Opcode::JumpIfFalseOrPop,
    Opcode::JumpIfTrueOrPop,
    Opcode::JumpAbsolute,
    Opcode::PopJumpIfFalse,
    Opcode::PopJumpIfTrue,
    Opcode::ForIter,
    Opcode::JumpForward,
    Opcode::SetupFinally,
    Opcode::SetupWith,
    Opcode::SetupAsyncWith,
    Opcode::CallFinally,
    Opcode::CallFunction,
    Opcode::CallFunctionKw,
    Opcode::CallFunctionEx,
    Opcode::CallMethod,
    Opcode::YieldFrom,
    Opcode::ReturnValue,
    Opcode::YieldValue,
];

impl Opcode {
    pub fn is_def(self) -> bool {
        MEMORY_DEF.contains(&self)
    }

    pub fn is_use(self) -> bool {
        MEMORY_USE.contains(&self)
    }

    pub fn is_cond_branch(self) -> bool {
        COND_BRANCH.contains(&self)
    }

    pub fn is_uncond_jump(self) -> bool {
        UNCOND_JUMP.contains(&self)
    }

    pub fn is_call(self) -> bool {
        CALL.contains(&self)
    }

    pub fn is_return(self) -> bool {
        RETURN.contains(&self)
    }

    pub fn has_uncertain_stack_effect(self) -> bool {
        UNCERTAIN.contains(&self)
    }

    /// Whether the tracer emits an event for this opcode. The flow
    /// reconstructor may only trust an opcode mismatch against the last
    /// traced event when the candidate predecessor is itself one of these —
    /// an untraced predecessor disagreeing with the last traced event is
    /// expected, not a sign that control flow actually diverged.
    pub fn is_traced(self) -> bool {
        TRACED.contains(&self)
    }

    /// Instructions whose operand reads from, or writes to, an attribute.
    pub fn is_attribute_access(self) -> bool {
        matches!(
            self,
            Opcode::StoreAttr
                | Opcode::DeleteAttr
                | Opcode::LoadAttr
                | Opcode::ImportFrom
                | Opcode::StoreSubscr
        )
    }
}
