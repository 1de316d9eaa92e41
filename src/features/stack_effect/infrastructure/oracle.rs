//! Static stack-effect oracle: for every opcode except a fixed uncertain
//! set, reports how many operand-stack slots it pops and pushes.

use crate::errors::{Result, SlicerError};
use crate::shared::models::Opcode;

/// `(pops, pushes)` for one occurrence of an opcode.
pub type StackEffect = (u32, u32);

/// Returns the static stack effect of `opcode`, given its raw `argument`
/// (only consulted for argument-dependent opcodes) and whether a
/// conditional branch was taken.
///
/// Fails with [`SlicerError::UncertainStackEffect`] for opcodes whose effect
/// cannot be modelled without interpreter-internal state (exception tables,
/// `with`-block cleanup, `async for` protocol steps).
pub fn stack_effect(opcode: Opcode, argument: Option<i64>, jumped: bool) -> Result<StackEffect> {
    use Opcode::*;

    if opcode.has_uncertain_stack_effect() {
        return Err(SlicerError::UncertainStackEffect(opcode));
    }

    let arg = argument.unwrap_or(0);

    let effect = match opcode {
        Nop | ExtendedArg => (0, 0),
        PopTop => (1, 0),
        RotTwo => (2, 2),
        RotThree => (3, 3),
        RotFour => (4, 4),
        DupTop => (1, 2),
        DupTopTwo => (2, 4),

        UnaryPositive | UnaryNegative | UnaryNot | UnaryInvert => (1, 1),

        SetAdd => (2, 1),
        ListAppend => (1, 0),
        MapAdd => (2, 0),

        BinaryPower | BinaryMultiply | BinaryMatrixMultiply | BinaryModulo | BinaryAdd | BinarySubtract
        | BinarySubscr | BinaryFloorDivide | BinaryTrueDivide | BinaryLshift | BinaryRshift | BinaryAnd
        | BinaryXor | BinaryOr => (2, 1),

        InplaceFloorDivide | InplaceTrueDivide | InplaceAdd | InplaceSubtract | InplaceMultiply
        | InplaceMatrixMultiply | InplaceModulo | InplacePower | InplaceLshift | InplaceRshift | InplaceAnd
        | InplaceXor | InplaceOr => (2, 1),

        StoreSubscr => (3, 0),
        DeleteSubscr => (2, 0),

        GetIter => (1, 1),
        PrintExpr => (1, 0),
        LoadBuildClass => (0, 1),
        ReturnValue => (1, 0),
        ImportStar => (1, 0),
        SetupAnnotations => (0, 0),
        YieldValue => (1, 1),
        YieldFrom => (2, 1),
        PopBlock => (0, 0),
        PopExcept => (3, 0),
        PopFinally | EndFinally => (6, 0),

        StoreName => (1, 0),
        DeleteName => (0, 0),
        StoreAttr => (2, 0),
        DeleteAttr => (1, 0),
        StoreGlobal => (1, 0),
        DeleteGlobal => (0, 0),
        LoadConst => (0, 1),
        LoadName => (0, 1),
        LoadAttr => (1, 1),
        CompareOp => (2, 1),
        ImportName => (2, 1),
        ImportFrom => (0, 1),

        JumpForward | JumpAbsolute => (0, 0),
        PopJumpIfFalse | PopJumpIfTrue => (1, 0),

        LoadGlobal => (0, 1),
        BeginFinally => (0, 6),

        LoadFast => (0, 1),
        StoreFast => (1, 0),
        DeleteFast => (0, 0),

        LoadClosure => (0, 1),
        LoadDeref | LoadClassDeref => (0, 1),
        StoreDeref => (1, 0),
        DeleteDeref => (0, 0),

        GetAwaitable => (1, 1),
        BeforeAsyncWith => (1, 2),
        GetAiter => (1, 1),
        GetAnext => (1, 2),
        GetYieldFromIter => (1, 1),
        LoadMethod => (1, 2),

        SetupWith => {
            if jumped {
                (0, 6)
            } else {
                (0, 1)
            }
        }
        ForIter => {
            if jumped {
                (1, 0)
            } else {
                (1, 2)
            }
        }
        JumpIfTrueOrPop | JumpIfFalseOrPop => {
            if jumped {
                (0, 0)
            } else {
                (1, 0)
            }
        }
        SetupFinally => {
            if jumped {
                (0, 6)
            } else {
                (0, 0)
            }
        }
        CallFinally => {
            if jumped {
                (0, 0)
            } else {
                (0, 1)
            }
        }

        UnpackSequence => (1, arg.max(0) as u32),
        UnpackEx => (1, ((arg & 0xFF) + (arg >> 8) + 1).max(0) as u32),

        BuildTuple | BuildList | BuildSet | BuildString => (arg.max(0) as u32, 1),

        BuildListUnpack | BuildTupleUnpack | BuildTupleUnpackWithCall | BuildSetUnpack | BuildMapUnpack
        | BuildMapUnpackWithCall => (arg.max(0) as u32, 1),

        BuildMap => ((2 * arg).max(0) as u32, 1),
        BuildConstKeyMap => ((1 + arg).max(0) as u32, 1),

        RaiseVarargs => (arg.max(0) as u32, 0),

        CallFunction => ((1 + arg).max(0) as u32, 1),
        CallMethod => ((2 + arg).max(0) as u32, 1),
        CallFunctionKw => ((2 + arg).max(0) as u32, 1),
        CallFunctionEx => {
            let extra = if arg & 0x01 != 0 { 1 } else { 0 };
            (2 + extra, 1)
        }
        MakeFunction => {
            let extra = (arg & 0x01 != 0) as u32 + (arg & 0x02 != 0) as u32 + (arg & 0x04 != 0) as u32 + (arg & 0x08 != 0) as u32;
            (2 + extra, 1)
        }
        BuildSlice => {
            if arg == 3 {
                (3, 1)
            } else {
                (2, 1)
            }
        }

        WithCleanupStart | WithCleanupFinish | SetupAsyncWith | EndAsyncFor | FormatValue => {
            unreachable!("uncertain opcodes are rejected above")
        }
    };

    Ok(effect)
}
