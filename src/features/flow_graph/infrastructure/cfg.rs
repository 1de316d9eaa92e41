//! Per-procedure control-flow graph: basic blocks plus the augmentation
//! that gives every node a single synthetic predecessor reaching both the
//! entry and every exit.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::shared::models::instruction::Instruction;

/// Node keys are a flat `i64` space so the synthetic augmentation node can
/// sit at `i64::MIN` alongside ordinary dense block indices without a
/// separate sum type threading through every graph algorithm.
pub type NodeKey = i64;

/// Index of the synthetic node added by [`Cfg::augmented`].
pub const AUGMENTED_START: NodeKey = i64::MIN;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasicBlock {
    pub index: NodeKey,
    pub offset: u32,
    pub instructions: Vec<Instruction>,
    pub is_artificial: bool,
}

impl BasicBlock {
    pub fn new(index: NodeKey, offset: u32, instructions: Vec<Instruction>) -> Self {
        Self {
            index,
            offset,
            instructions,
            is_artificial: false,
        }
    }

    pub fn artificial(index: NodeKey) -> Self {
        Self {
            index,
            offset: 0,
            instructions: Vec::new(),
            is_artificial: true,
        }
    }
}

/// A procedure's control-flow graph. Assumed well-formed on construction:
/// a single entry, zero or more exits reachable from entry, every
/// non-artificial block carrying a non-empty instruction list.
#[derive(Debug, Clone)]
pub struct Cfg {
    graph: DiGraph<BasicBlock, ()>,
    node_of: FxHashMap<NodeKey, NodeIndex>,
    entry: NodeKey,
    exits: Vec<NodeKey>,
}

impl Cfg {
    pub fn new(blocks: Vec<BasicBlock>, edges: Vec<(NodeKey, NodeKey)>, entry: NodeKey, exits: Vec<NodeKey>) -> Self {
        let mut graph = DiGraph::new();
        let mut node_of = FxHashMap::default();

        for block in blocks {
            let key = block.index;
            let idx = graph.add_node(block);
            node_of.insert(key, idx);
        }
        for (s, t) in edges {
            let (Some(&si), Some(&ti)) = (node_of.get(&s), node_of.get(&t)) else {
                continue;
            };
            graph.add_edge(si, ti, ());
        }

        Self {
            graph,
            node_of,
            entry,
            exits,
        }
    }

    pub fn entry_node(&self) -> NodeKey {
        self.entry
    }

    pub fn exit_nodes(&self) -> &[NodeKey] {
        &self.exits
    }

    pub fn node_keys(&self) -> Vec<NodeKey> {
        self.node_of.keys().copied().collect()
    }

    pub fn block(&self, key: NodeKey) -> Option<&BasicBlock> {
        self.node_of.get(&key).map(|&idx| &self.graph[idx])
    }

    pub fn contains(&self, key: NodeKey) -> bool {
        self.node_of.contains_key(&key)
    }

    pub fn successors(&self, key: NodeKey) -> Vec<NodeKey> {
        let Some(&idx) = self.node_of.get(&key) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.graph[n].index)
            .collect()
    }

    pub fn predecessors(&self, key: NodeKey) -> Vec<NodeKey> {
        let Some(&idx) = self.node_of.get(&key) else {
            return Vec::new();
        };
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .map(|n| self.graph[n].index)
            .collect()
    }

    /// Adds the synthetic start node (index [`AUGMENTED_START`]) with edges
    /// to the entry and to every exit. Used exclusively as the input to
    /// post-dominator construction and CDG edge detection.
    pub fn augmented(&self) -> Cfg {
        let mut augmented = self.clone();
        let start_idx = augmented.graph.add_node(BasicBlock::artificial(AUGMENTED_START));
        augmented.node_of.insert(AUGMENTED_START, start_idx);

        let entry_idx = augmented.node_of[&self.entry];
        augmented.graph.add_edge(start_idx, entry_idx, ());
        for &exit in &self.exits {
            let exit_idx = augmented.node_of[&exit];
            augmented.graph.add_edge(start_idx, exit_idx, ());
        }
        augmented
    }
}
