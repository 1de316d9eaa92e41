//! Control-dependence graph construction via Ferrante/Ottenstein/Warren:
//! an edge source -> target exists in the augmented CFG whenever the
//! source is not post-dominated by that successor, walked up the PDT to
//! the least common ancestor.

use std::collections::HashSet;

use rustc_hash::FxHashMap;

use crate::errors::Result;
use crate::features::flow_graph::{Cfg, NodeKey, PostDominatorTree};

#[derive(Debug, Clone)]
pub struct ControlDependenceGraph {
    edges: FxHashMap<NodeKey, Vec<NodeKey>>,
    nodes: HashSet<NodeKey>,
}

impl ControlDependenceGraph {
    pub fn compute(cfg: &Cfg) -> Result<ControlDependenceGraph> {
        let augmented = cfg.augmented();
        let pdt = PostDominatorTree::compute(&augmented)?;

        let nodes: HashSet<NodeKey> = augmented.node_keys().into_iter().collect();
        let mut edge_candidates: HashSet<(NodeKey, NodeKey)> = HashSet::new();

        for &source in &nodes {
            for target in augmented.successors(source) {
                if !pdt.transitive_successors(target).contains(&source) {
                    edge_candidates.insert((source, target));
                }
            }
        }

        let mut cdg = ControlDependenceGraph {
            edges: FxHashMap::default(),
            nodes: nodes.clone(),
        };

        for (source, target) in edge_candidates {
            let lca = pdt.least_common_ancestor(source, target);
            let Some(lca) = lca else { continue };

            let mut current = target;
            while current != lca {
                cdg.add_edge(source, current);
                let preds = pdt.predecessors(current);
                debug_assert_eq!(preds.len(), 1, "PDT node {current} has {} predecessors, expected exactly 1", preds.len());
                let Some(&parent) = preds.first() else { break };
                current = parent;
            }

            if lca == source {
                cdg.add_edge(source, lca);
            }
        }

        Ok(cdg)
    }

    fn add_edge(&mut self, source: NodeKey, target: NodeKey) {
        self.edges.entry(source).or_default().push(target);
    }

    /// All nodes that `node` is control-dependent on, i.e. whose outcome
    /// determines whether `node` executes.
    pub fn dependees_of(&self, node: NodeKey) -> Vec<NodeKey> {
        self.edges
            .iter()
            .filter(|(_, targets)| targets.contains(&node))
            .map(|(&source, _)| source)
            .collect()
    }

    pub fn dependents_of(&self, node: NodeKey) -> &[NodeKey] {
        self.edges.get(&node).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn contains_node(&self, node: NodeKey) -> bool {
        self.nodes.contains(&node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::flow_graph::BasicBlock;

    fn block(index: NodeKey) -> BasicBlock {
        BasicBlock::new(index, index as u32, Vec::new())
    }

    #[test]
    fn branch_target_is_control_dependent_on_branch_block() {
        // entry(0) branches to A(1) or B(2), both join at exit(3).
        let cfg = Cfg::new(
            vec![block(0), block(1), block(2), block(3)],
            vec![(0, 1), (0, 2), (1, 3), (2, 3)],
            0,
            vec![3],
        );
        let cdg = ControlDependenceGraph::compute(&cfg).unwrap();
        let deps = cdg.dependees_of(1);
        assert!(deps.contains(&0));
        let deps = cdg.dependees_of(2);
        assert!(deps.contains(&0));
    }

    #[test]
    fn straight_line_has_no_control_dependence_between_interior_blocks() {
        let cfg = Cfg::new(vec![block(0), block(1), block(2)], vec![(0, 1), (1, 2)], 0, vec![2]);
        let cdg = ControlDependenceGraph::compute(&cfg).unwrap();
        assert!(cdg.dependees_of(1).is_empty());
        assert!(cdg.dependees_of(2).is_empty());
    }
}
