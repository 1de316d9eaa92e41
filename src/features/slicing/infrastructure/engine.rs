//! The dynamic slicer's main loop: walks backward from a slicing criterion,
//! merging control dependence, explicit data dependence and implicit
//! (operand-stack) dependence into a single accumulated slice.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::SlicingConfig;
use crate::errors::{Result, SlicerError};
use crate::features::execution_trace::{CodeObjectRegistry, ExecutionTrace};
use crate::features::flow_graph::AUGMENTED_START;
use crate::features::slicing::domain::context::{GlobalKey, LocalKey};
use crate::features::slicing::domain::{DynamicSlice, SlicingContext, SlicingCriterion};
use crate::features::stack_effect::{stack_effect, TraceStack};

use super::data_dependence::{add_uses, check_explicit_data_dependency};
use super::flow_builder::{get_last_instruction, FlowCursor};

/// Owns the registered code-object metadata a run of tests is sliced
/// against, plus the knobs that bear on the backward walk itself. One
/// engine instance is built per analysed project and reused across every
/// assertion's `slice` call; `known_code_objects` never mutates once the
/// static model is complete, so sharing it across calls needs no locking.
pub struct SlicingEngine {
    registry: CodeObjectRegistry,
    config: SlicingConfig,
}

impl SlicingEngine {
    pub fn new(registry: CodeObjectRegistry, config: SlicingConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &CodeObjectRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SlicingConfig {
        &self.config
    }

    /// Computes the dynamic backward slice of `criterion`, whose own
    /// occurrence sits at `trace_position` in `trace`.
    #[tracing::instrument(skip(self, trace, criterion), fields(
        test_id = trace.test_id().unwrap_or("<unknown>"),
        occurrence = criterion.occurrence,
        trace_position,
    ))]
    pub fn slice(&self, trace: &ExecutionTrace, criterion: SlicingCriterion, trace_position: usize) -> Result<DynamicSlice> {
        let started_at = Instant::now();
        let budget = Duration::from_millis(self.config.max_slicing_time_ms);

        let mut criterion_instr = criterion.unique_instruction.clone();
        criterion_instr.set_in_slice();

        let meta = self.registry.get(criterion_instr.code_object_id).ok_or_else(|| SlicerError::InstructionNotFound {
            code_object_id: criterion_instr.code_object_id,
            basic_block_id: criterion_instr.node_id,
            offset: criterion_instr.offset,
        })?;

        let mut ctx = SlicingContext::new();
        for name in &criterion.global_variables {
            ctx.d_global.insert(GlobalKey {
                name: name.clone(),
                file: criterion_instr.file.clone(),
            });
        }
        for name in &criterion.local_variables {
            ctx.d_local.insert(LocalKey {
                name: name.clone(),
                code_object_id: criterion_instr.code_object_id,
            });
        }
        for dependee in meta.cdg.dependees_of(criterion_instr.node_id) {
            if dependee != AUGMENTED_START {
                ctx.s_c.insert(dependee);
            }
        }

        let mut stack = TraceStack::new(criterion_instr.code_object_id);
        if let Ok((pops, pushes)) = stack_effect(criterion_instr.opcode(), criterion_instr.dis_arg, false) {
            stack.update_push_operations(pushes, false);
            stack.update_pop_operations(pops, &criterion_instr);
        }

        let mut ds = DynamicSlice::new(trace.test_id().unwrap_or("slice").to_string());
        ds.instructions.push(criterion_instr.clone());

        let mut cursor = FlowCursor {
            instr: criterion_instr,
            code_object_id: meta.code_object_id,
            basic_block_id: ds.instructions[0].node_id,
            // `trace_position` is the criterion's own slot; the reconstructor's
            // `trace_pos` always names the last traced event *before* the
            // cursor's instruction, so the walk starts one slot earlier.
            trace_pos: trace_position as i64 - 1,
            import_back_call: None,
        };

        let mut new_attribute_object_uses: HashSet<String> = HashSet::new();
        let mut code_object_dependent = false;
        let mut stack_disabled = false;

        loop {
            if started_at.elapsed() > budget {
                return Err(SlicerError::SlicingTimeout {
                    elapsed_ms: started_at.elapsed().as_millis() as u64,
                    budget_ms: budget.as_millis() as u64,
                });
            }

            let step = get_last_instruction(&cursor, &self.registry, trace);
            let Some(last_instr) = step.last_instr else {
                ds.dedup_preserve_order();
                if self.config.debug_output >= 1 {
                    debug!(slice_len = ds.len(), "slice complete, flow exhausted");
                }
                return Ok(ds);
            };

            let event = if cursor.trace_pos >= 0 {
                trace.executed_instructions.get(cursor.trace_pos as usize).cloned()
            } else {
                None
            };
            let next_trace_pos = if cursor.trace_pos >= 0 { cursor.trace_pos - 1 } else { cursor.trace_pos };

            // --- stack housekeeping, in the order the design fixes ---
            let prior_import_back_call = cursor.import_back_call.clone();
            stack.set_attribute_uses(ctx.attribute_variables.clone());

            if step.returned {
                stack.push_stack(step.code_object_id);
                stack.set_attribute_uses(new_attribute_object_uses.clone());
                new_attribute_object_uses.clear();
                stack.set_import_frame(step.import_back_call.clone());
            }
            if step.call || step.import_start {
                stack.pop_stack()?;
                if stack_disabled {
                    stack.push_artificial_stack();
                    stack_disabled = false;
                }
            }
            ctx.attribute_variables = stack.get_attribute_uses();
            let import_back_call = stack.get_import_frame().cloned().or(prior_import_back_call);

            // --- stack-effect oracle ---
            let (pops, pushes) = match stack_effect(last_instr.opcode(), last_instr.dis_arg, step.jump) {
                Ok(effect) => effect,
                Err(SlicerError::UncertainStackEffect(opcode)) => {
                    warn!(?opcode, "uncertain stack effect, disabling simulation for this frame");
                    stack_disabled = true;
                    (0, 0)
                }
                Err(other) => return Err(other),
            };

            // --- control dependence ---
            let control_dep = last_instr.is_cond_branch() && ctx.s_c.remove(&last_instr.node_id);

            // --- explicit data dependence ---
            let (mut exp_dep, mut attribute_creation_uses) = (false, HashSet::new());
            if let Some(event) = &event {
                let (hit, creations) = check_explicit_data_dependency(&mut ctx, &last_instr, event, &self.registry)?;
                exp_dep = hit;
                attribute_creation_uses = creations;
            }
            new_attribute_object_uses.extend(attribute_creation_uses);

            // --- implicit (call-boundary and stack) dependence ---
            let mut imp_dep = false;
            if step.call && code_object_dependent {
                imp_dep = true;
                code_object_dependent = false;
                if step.import_start {
                    if let Some(import_instr) = &step.import_back_call {
                        let mut marked = import_instr.clone();
                        marked.set_in_slice();
                        ds.instructions.push(marked.clone());
                        if let Ok((import_pops, _)) = stack_effect(marked.opcode(), marked.dis_arg, false) {
                            stack.update_pop_operations(import_pops, &marked);
                        }
                    }
                }
            }
            let mut include_use = true;
            if !stack_disabled {
                let (stack_dep, stack_include_use) = stack.update_push_operations(pushes, step.returned);
                imp_dep = imp_dep || stack_dep;
                include_use = stack_include_use;
            }
            if step.returned {
                code_object_dependent = false;
            }

            // --- unconditional jumps realise the control transfer outright ---
            let forced = step.jump && last_instr.is_uncond_jump();

            let in_slice = control_dep || exp_dep || imp_dep || forced;
            let mut emitted = last_instr;
            if in_slice {
                emitted.set_in_slice();
                if !step.call {
                    code_object_dependent = true;
                }
            }

            if self.config.debug_output >= 2 {
                debug!(
                    opcode = ?emitted.opcode(),
                    offset = emitted.offset,
                    control_dep,
                    exp_dep,
                    imp_dep,
                    forced,
                    d_local = ctx.d_local.len(),
                    d_global = ctx.d_global.len(),
                    d_nonlocal = ctx.d_nonlocal.len(),
                    d_addresses = ctx.d_addresses.len(),
                    d_attributes = ctx.d_attributes.len(),
                    attribute_variables = ctx.attribute_variables.len(),
                    s_c = ctx.s_c.len(),
                    "backward step"
                );
            }

            // DS accumulates only instructions the walk actually needed to
            // explain the criterion; a visited-but-irrelevant instruction
            // (an unused sibling assignment, the untaken arm of a branch)
            // is discarded here rather than carried and filtered later.
            if in_slice {
                ds.instructions.push(emitted.clone());
                if emitted.is_use() && include_use {
                    if let Some(event) = &event {
                        add_uses(&mut ctx, &emitted, event, &self.registry);
                    }
                }
                if let Some(owner) = self.registry.get(step.code_object_id) {
                    for dependee in owner.cdg.dependees_of(step.basic_block_id) {
                        if dependee != AUGMENTED_START {
                            ctx.s_c.insert(dependee);
                        }
                    }
                }
            }

            stack.update_pop_operations(pops, &emitted);

            cursor = FlowCursor {
                instr: emitted,
                code_object_id: step.code_object_id,
                basic_block_id: step.basic_block_id,
                trace_pos: next_trace_pos,
                import_back_call,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::execution_trace::{CodeObjectMetadata, ExecutedInstruction, TracedLocation};
    use crate::features::flow_graph::{BasicBlock, Cfg};
    use crate::shared::models::{Instruction, Opcode, UniqueInstruction};

    fn unique(opcode: Opcode, node_id: u32, offset: u32, argument: Option<i64>) -> UniqueInstruction {
        UniqueInstruction::new("mod.py", Instruction::new(opcode, argument, 1), 0, node_id, offset, argument, false)
    }

    fn location(opcode: Opcode, node_id: u32, offset: u32, name: Option<&str>) -> TracedLocation {
        TracedLocation {
            file: "mod.py".into(),
            code_object_id: 0,
            node_id,
            opcode,
            argument: None,
            name: name.map(str::to_string),
            lineno: 1,
            offset,
        }
    }

    /// `result = 1; return result` — a single basic block, no branches.
    /// Both instructions of the assignment plus the load/return pair must
    /// all land in the slice (scenario S1 from the design's test matrix).
    #[test]
    fn straight_line_assignment_and_return_slice_includes_everything() {
        let load_const = unique(Opcode::LoadConst, 0, 0, Some(1));
        let store_result = unique(Opcode::StoreFast, 0, 2, Some(0));
        let load_result = unique(Opcode::LoadFast, 0, 4, Some(0));
        let return_value = unique(Opcode::ReturnValue, 0, 6, None);

        let disassembly = vec![load_const.clone(), store_result.clone(), load_result.clone(), return_value.clone()];
        let cfg = Cfg::new(vec![BasicBlock::new(0, 0, Vec::new())], vec![], 0, vec![0]);
        let mut registry = CodeObjectRegistry::new();
        registry.register(CodeObjectMetadata::new("mod.py", 0, None, disassembly, cfg).unwrap());

        let mut trace = ExecutionTrace::new();
        trace.add_instruction(ExecutedInstruction::Plain(location(Opcode::LoadConst, 0, 0, None)));
        trace.add_instruction(ExecutedInstruction::Memory {
            location: location(Opcode::StoreFast, 0, 2, Some("result")),
            arg_address: None,
            is_mutable_type: false,
            object_creation: false,
        });
        trace.add_instruction(ExecutedInstruction::Memory {
            location: location(Opcode::LoadFast, 0, 4, Some("result")),
            arg_address: None,
            is_mutable_type: false,
            object_creation: false,
        });
        trace.add_instruction(ExecutedInstruction::Return(location(Opcode::ReturnValue, 0, 6, None)));

        let engine = SlicingEngine::new(registry, SlicingConfig::default());
        let criterion = SlicingCriterion::new(return_value);
        let slice = engine.slice(&trace, criterion, 3).unwrap();

        let offsets: HashSet<u32> = slice.instructions.iter().map(|i| i.offset).collect();
        assert!(offsets.contains(&0), "LOAD_CONST must be in slice");
        assert!(offsets.contains(&2), "STORE_FAST result must be in slice");
        assert!(offsets.contains(&4), "LOAD_FAST result must be in slice");
        assert!(offsets.contains(&6), "RETURN_VALUE must be in slice");
    }

    /// `result = 1; foo = 2; return result` — the unused `foo = 2` store
    /// must be skipped entirely (scenario S2).
    #[test]
    fn unused_auxiliary_assignment_is_excluded() {
        let load_one = unique(Opcode::LoadConst, 0, 0, Some(1));
        let store_result = unique(Opcode::StoreFast, 0, 2, Some(0));
        let load_two = unique(Opcode::LoadConst, 0, 4, Some(2));
        let store_foo = unique(Opcode::StoreFast, 0, 6, Some(1));
        let load_result = unique(Opcode::LoadFast, 0, 8, Some(0));
        let return_value = unique(Opcode::ReturnValue, 0, 10, None);

        let disassembly = vec![
            load_one.clone(),
            store_result.clone(),
            load_two.clone(),
            store_foo.clone(),
            load_result.clone(),
            return_value.clone(),
        ];
        let cfg = Cfg::new(vec![BasicBlock::new(0, 0, Vec::new())], vec![], 0, vec![0]);
        let mut registry = CodeObjectRegistry::new();
        registry.register(CodeObjectMetadata::new("mod.py", 0, None, disassembly, cfg).unwrap());

        let mut trace = ExecutionTrace::new();
        trace.add_instruction(ExecutedInstruction::Plain(location(Opcode::LoadConst, 0, 0, None)));
        trace.add_instruction(ExecutedInstruction::Memory {
            location: location(Opcode::StoreFast, 0, 2, Some("result")),
            arg_address: None,
            is_mutable_type: false,
            object_creation: false,
        });
        trace.add_instruction(ExecutedInstruction::Plain(location(Opcode::LoadConst, 0, 4, None)));
        trace.add_instruction(ExecutedInstruction::Memory {
            location: location(Opcode::StoreFast, 0, 6, Some("foo")),
            arg_address: None,
            is_mutable_type: false,
            object_creation: false,
        });
        trace.add_instruction(ExecutedInstruction::Memory {
            location: location(Opcode::LoadFast, 0, 8, Some("result")),
            arg_address: None,
            is_mutable_type: false,
            object_creation: false,
        });
        trace.add_instruction(ExecutedInstruction::Return(location(Opcode::ReturnValue, 0, 10, None)));

        let engine = SlicingEngine::new(registry, SlicingConfig::default());
        let criterion = SlicingCriterion::new(return_value);
        let slice = engine.slice(&trace, criterion, 5).unwrap();

        let offsets: HashSet<u32> = slice.instructions.iter().map(|i| i.offset).collect();
        assert!(!offsets.contains(&4), "foo's LOAD_CONST must not be in slice");
        assert!(!offsets.contains(&6), "STORE_FAST foo must not be in slice");
    }
}
