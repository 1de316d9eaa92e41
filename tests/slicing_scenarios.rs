//! End-to-end backward-slicing scenarios, each built from a hand-assembled
//! disassembly, CFG and trace rather than going through the bundle loader.

mod common;

use checked_slicer::Opcode;
use pretty_assertions::assert_eq;

use common::{memory, plain, returned, single_code_object_registry, slice_offsets, trace_of, unique, unique_jump_target};

/// `a = 1; b = 2; d = 99; c = a + b; return c` — `d` is never read, so its
/// assignment must fall out of the slice even though `c`'s does not, and
/// `c`'s value must be traced back through `BINARY_ADD` to both operands.
#[test]
fn binary_operation_pulls_in_both_operands_past_an_unused_store() {
    let load_one = unique(Opcode::LoadConst, 0, 0, Some(1));
    let store_a = unique(Opcode::StoreFast, 0, 2, Some(0));
    let load_two = unique(Opcode::LoadConst, 0, 4, Some(2));
    let store_b = unique(Opcode::StoreFast, 0, 6, Some(1));
    let load_ninety_nine = unique(Opcode::LoadConst, 0, 8, Some(99));
    let store_d = unique(Opcode::StoreFast, 0, 10, Some(2));
    let load_a = unique(Opcode::LoadFast, 0, 12, Some(0));
    let load_b = unique(Opcode::LoadFast, 0, 14, Some(1));
    let binary_add = unique(Opcode::BinaryAdd, 0, 16, None);
    let store_c = unique(Opcode::StoreFast, 0, 18, Some(3));
    let load_c = unique(Opcode::LoadFast, 0, 20, Some(3));
    let return_value = unique(Opcode::ReturnValue, 0, 22, None);

    let disassembly = vec![
        load_one,
        store_a,
        load_two,
        store_b,
        load_ninety_nine,
        store_d,
        load_a,
        load_b,
        binary_add,
        store_c,
        load_c,
        return_value.clone(),
    ];
    let registry = single_code_object_registry(disassembly, vec![(0, 0)], vec![], 0, vec![0]);

    let trace = trace_of(vec![
        plain(Opcode::LoadConst, 0, 0, Some(1)),
        memory(Opcode::StoreFast, 0, 2, Some(0)),
        plain(Opcode::LoadConst, 0, 4, Some(2)),
        memory(Opcode::StoreFast, 0, 6, Some(1)),
        plain(Opcode::LoadConst, 0, 8, Some(99)),
        memory(Opcode::StoreFast, 0, 10, Some(2)),
        memory(Opcode::LoadFast, 0, 12, Some(0)),
        memory(Opcode::LoadFast, 0, 14, Some(1)),
        plain(Opcode::BinaryAdd, 0, 16, None),
        memory(Opcode::StoreFast, 0, 18, Some(3)),
        memory(Opcode::LoadFast, 0, 20, Some(3)),
        returned(Opcode::ReturnValue, 0, 22),
    ]);

    let offsets = slice_offsets(registry, &trace, return_value, 11);

    for included in [0u32, 2, 4, 6, 12, 14, 16, 18, 20, 22] {
        assert!(offsets.contains(&included), "offset {included} should be in the slice");
    }
    for excluded in [8u32, 10] {
        assert!(!offsets.contains(&excluded), "offset {excluded} (the unused `d` assignment) should not be in the slice");
    }
    assert_eq!(offsets.len(), 10);
}

/// `if x: y = 1` `return y` — a two-way branch where only one arm sets the
/// value being returned. The branch must surface in the slice through the
/// control-dependence graph, not just the straight-line data chain.
#[test]
fn conditional_store_pulls_in_its_controlling_branch() {
    let load_x = unique(Opcode::LoadFast, 0, 0, Some(0));
    let branch = unique(Opcode::PopJumpIfFalse, 0, 2, None);
    let load_one = unique(Opcode::LoadConst, 1, 4, Some(1));
    let store_y = unique(Opcode::StoreFast, 1, 6, Some(1));
    let load_y = unique_jump_target(Opcode::LoadFast, 2, 8, Some(1), true);
    let return_value = unique(Opcode::ReturnValue, 2, 10, None);

    let disassembly = vec![load_x, branch, load_one, store_y, load_y, return_value.clone()];
    let registry = single_code_object_registry(
        disassembly,
        vec![(0, 0), (1, 4), (2, 8)],
        vec![(0, 1), (0, 2), (1, 2)],
        0,
        vec![2],
    );

    let trace = trace_of(vec![
        memory(Opcode::LoadFast, 0, 0, Some(0)),
        plain(Opcode::PopJumpIfFalse, 0, 2, None),
        plain(Opcode::LoadConst, 1, 4, Some(1)),
        memory(Opcode::StoreFast, 1, 6, Some(1)),
        memory(Opcode::LoadFast, 2, 8, Some(1)),
        returned(Opcode::ReturnValue, 2, 10),
    ]);

    let offsets = slice_offsets(registry, &trace, return_value, 5);

    for included in [0u32, 2, 4, 6, 8, 10] {
        assert!(offsets.contains(&included), "offset {included} should be in the slice");
    }
    assert_eq!(offsets.len(), 6, "the branch that decides whether `y` is set must be in the slice");
}
