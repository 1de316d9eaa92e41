//! Property-based checks of the control-flow/post-dominance/control-dependence
//! machinery, parameterized over fan-out width rather than pinned to one
//! hand-picked topology.

use checked_slicer::{BasicBlock, Cfg, ControlDependenceGraph};
use quickcheck_macros::quickcheck;

/// `entry(0) -> branch(1..=k) -> exit(k+1)`. With `k == 1` this degenerates
/// to a straight line; with `k >= 2` node 0 is a genuine multi-way branch.
fn fan_out_cfg(k: u8) -> (Cfg, i64, i64) {
    let k = k as i64;
    let entry = 0i64;
    let exit = k + 1;

    let mut blocks = vec![BasicBlock::new(entry, 0, Vec::new())];
    let mut edges = Vec::new();
    for branch in 1..=k {
        blocks.push(BasicBlock::new(branch, branch as u32, Vec::new()));
        edges.push((entry, branch));
        edges.push((branch, exit));
    }
    blocks.push(BasicBlock::new(exit, (exit) as u32, Vec::new()));

    (Cfg::new(blocks, edges, entry, vec![exit]), entry, exit)
}

#[quickcheck]
fn fan_out_branches_are_control_dependent_on_entry_iff_there_is_more_than_one(raw_k: u8) -> bool {
    let k = (raw_k % 5) + 1;
    let (cfg, entry, exit) = fan_out_cfg(k);
    let cdg = ControlDependenceGraph::compute(&cfg).unwrap();

    let branches_depend_on_entry_correctly = (1..=k as i64).all(|branch| {
        let deps = cdg.dependees_of(branch);
        if k == 1 {
            deps.is_empty()
        } else {
            deps.contains(&entry)
        }
    });

    branches_depend_on_entry_correctly && cdg.dependees_of(exit).is_empty()
}

#[quickcheck]
fn every_node_is_control_dependent_on_at_most_its_own_predecessors(raw_k: u8) -> bool {
    let k = (raw_k % 5) + 1;
    let (cfg, entry, exit) = fan_out_cfg(k);
    let cdg = ControlDependenceGraph::compute(&cfg).unwrap();

    // A node's dependees must themselves be nodes that actually have more
    // than one successor in the CFG (only real branches can control anything).
    [entry, exit]
        .into_iter()
        .chain(1..=k as i64)
        .all(|node| cdg.dependees_of(node).iter().all(|&dep| cfg.successors(dep).len() > 1))
}
