//! Registry entry for one procedure: its static disassembly plus the CFG
//! and CDG computed over it, registered once before trace replay begins.

use std::sync::Arc;

use crate::features::control_dependence::ControlDependenceGraph;
use crate::features::flow_graph::Cfg;
use crate::shared::models::{CodeObjectId, UniqueInstruction};

#[derive(Debug, Clone)]
pub struct CodeObjectMetadata {
    pub filename: String,
    pub code_object_id: CodeObjectId,
    pub parent_code_object_id: Option<CodeObjectId>,
    pub disassembly: Vec<UniqueInstruction>,
    pub cfg: Arc<Cfg>,
    pub cdg: Arc<ControlDependenceGraph>,
}

impl CodeObjectMetadata {
    pub fn new(
        filename: impl Into<String>,
        code_object_id: CodeObjectId,
        parent_code_object_id: Option<CodeObjectId>,
        disassembly: Vec<UniqueInstruction>,
        cfg: Cfg,
    ) -> crate::errors::Result<Self> {
        let cdg = ControlDependenceGraph::compute(&cfg)?;
        Ok(Self {
            filename: filename.into(),
            code_object_id,
            parent_code_object_id,
            disassembly,
            cfg: Arc::new(cfg),
            cdg: Arc::new(cdg),
        })
    }
}

/// Registry of every procedure seen while building the static model, keyed
/// by the dense id assigned in registration order. Immutable after the
/// final procedure is registered; freely shared across slicing calls.
#[derive(Debug, Clone, Default)]
pub struct CodeObjectRegistry {
    code_objects: Vec<CodeObjectMetadata>,
}

impl CodeObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, metadata: CodeObjectMetadata) -> CodeObjectId {
        let id = self.code_objects.len() as CodeObjectId;
        debug_assert_eq!(id, metadata.code_object_id, "code objects must register in id order");
        self.code_objects.push(metadata);
        id
    }

    pub fn get(&self, id: CodeObjectId) -> Option<&CodeObjectMetadata> {
        self.code_objects.get(id as usize)
    }

    pub fn parent_chain(&self, id: CodeObjectId) -> Vec<CodeObjectId> {
        let mut chain = Vec::new();
        let mut current = self.get(id).and_then(|m| m.parent_code_object_id);
        while let Some(id) = current {
            chain.push(id);
            current = self.get(id).and_then(|m| m.parent_code_object_id);
        }
        chain
    }
}
