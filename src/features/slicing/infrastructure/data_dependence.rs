//! Explicit data dependence: matching a def against the pending uses in
//! `SlicingContext`, and registering the uses an in-slice instruction
//! introduces.

use std::collections::HashSet;

use crate::errors::{Result, SlicerError};
use crate::features::execution_trace::{CodeObjectRegistry, ExecutedInstruction, TracedLocation};
use crate::features::slicing::domain::context::{GlobalKey, LocalKey, NonlocalKey, SlicingContext};
use crate::shared::models::{CodeObjectId, Opcode, UniqueInstruction};

/// The module body is always registered first; every other procedure's
/// parent chain bottoms out at it.
pub fn is_module_body(code_object_id: CodeObjectId) -> bool {
    code_object_id == 0
}

/// The identifier a traced event's operand refers to, shared by name
/// rather than per-code-object table index so it matches across scopes
/// and tables (see [`TracedLocation::name`]).
fn variable_name(location: &TracedLocation) -> String {
    location.name.clone().unwrap_or_default()
}

/// Walks up `code_object_id`'s parent chain collecting ids until the
/// variable named `name` would be found as a cell variable of some
/// enclosing procedure. Without access to per-procedure cell-variable
/// tables, the accumulated chain itself — every enclosing scope the
/// variable could be captured from — is returned as the scope tuple.
fn nonlocal_scope(registry: &CodeObjectRegistry, code_object_id: CodeObjectId) -> Vec<CodeObjectId> {
    let mut scope = vec![code_object_id];
    scope.extend(registry.parent_chain(code_object_id));
    scope
}

/// Returns `(covered, attribute_creation_uses)`: whether `unique_instr`'s
/// def is matched by something pending in `ctx`, plus any attribute names
/// promoted to variable-uses because the owning object was just created.
pub fn check_explicit_data_dependency(
    ctx: &mut SlicingContext,
    unique_instr: &UniqueInstruction,
    event: &ExecutedInstruction,
    registry: &CodeObjectRegistry,
) -> Result<(bool, HashSet<String>)> {
    let mut attribute_creation_uses = HashSet::new();

    if !unique_instr.is_def() {
        return Ok((false, attribute_creation_uses));
    }

    let covered = match event {
        ExecutedInstruction::Memory { location, arg_address, is_mutable_type, object_creation } => {
            let hit = match unique_instr.opcode() {
                Opcode::StoreFast | Opcode::DeleteFast => {
                    let key = LocalKey { name: variable_name(location), code_object_id: unique_instr.code_object_id };
                    ctx.d_local.remove(&key)
                }
                Opcode::StoreName | Opcode::DeleteName => {
                    if is_module_body(unique_instr.code_object_id) {
                        let key = GlobalKey { name: variable_name(location), file: unique_instr.file.clone() };
                        ctx.d_global.remove(&key)
                    } else {
                        let key = LocalKey { name: variable_name(location), code_object_id: unique_instr.code_object_id };
                        ctx.d_local.remove(&key)
                    }
                }
                Opcode::StoreGlobal | Opcode::DeleteGlobal => {
                    let key = GlobalKey { name: variable_name(location), file: unique_instr.file.clone() };
                    ctx.d_global.remove(&key)
                }
                Opcode::StoreDeref | Opcode::DeleteDeref => {
                    let scope = nonlocal_scope(registry, unique_instr.code_object_id);
                    let name = variable_name(location);
                    let matching = ctx
                        .d_nonlocal
                        .iter()
                        .find(|k| k.name == name && k.scope.iter().any(|s| scope.contains(s)))
                        .cloned();
                    if let Some(key) = matching {
                        ctx.d_nonlocal.remove(&key);
                        true
                    } else {
                        false
                    }
                }
                Opcode::ImportName => {
                    if *object_creation {
                        if let Some(addr) = arg_address {
                            let key = format!("{addr:#x}");
                            ctx.d_addresses.remove(&key)
                        } else {
                            false
                        }
                    } else {
                        false
                    }
                }
                other => {
                    return Err(SlicerError::invariant(format!("unexpected opcode {other:?} in def analysis")));
                }
            };

            if *object_creation {
                if let Some(addr) = arg_address {
                    let prefix = format!("{addr:#x}_");
                    let matches: Vec<String> = ctx.d_attributes.iter().filter(|k| k.starts_with(&prefix)).cloned().collect();
                    for key in matches {
                        ctx.d_attributes.remove(&key);
                        if let Some(suffix) = key.strip_prefix(&prefix) {
                            attribute_creation_uses.insert(suffix.to_string());
                        }
                    }
                    if *is_mutable_type {
                        let addr_key = format!("{addr:#x}");
                        if ctx.d_addresses.remove(&addr_key) {
                            return Ok((true, attribute_creation_uses));
                        }
                    }
                }
            }

            let name = variable_name(location);
            if ctx.attribute_variables.remove(&name) {
                return Ok((true, attribute_creation_uses));
            }

            hit
        }
        ExecutedInstruction::Attribute { src_address, .. } => {
            let combined = event.combined_attribute_key();
            let complete = combined.as_ref().is_some_and(|c| ctx.d_attributes.remove(c));
            if complete {
                true
            } else if let Some(addr) = src_address {
                let key = format!("{addr:#x}");
                ctx.d_addresses.contains(&key)
            } else {
                false
            }
        }
        _ => false,
    };

    Ok((covered, attribute_creation_uses))
}

/// Registers the variable/attribute uses introduced by an in-slice
/// instruction, so later (earlier in execution) defs can be matched
/// against them.
pub fn add_uses(ctx: &mut SlicingContext, unique_instr: &UniqueInstruction, event: &ExecutedInstruction, registry: &CodeObjectRegistry) {
    match event {
        ExecutedInstruction::Memory { location, arg_address, is_mutable_type, .. } => {
            if *is_mutable_type {
                if let Some(addr) = arg_address {
                    ctx.d_addresses.insert(format!("{addr:#x}"));
                }
            }
            let name = variable_name(location);
            match unique_instr.opcode() {
                Opcode::LoadFast => {
                    ctx.d_local.insert(LocalKey { name, code_object_id: unique_instr.code_object_id });
                }
                Opcode::LoadName => {
                    if is_module_body(unique_instr.code_object_id) {
                        ctx.d_global.insert(GlobalKey { name, file: unique_instr.file.clone() });
                    } else {
                        ctx.d_local.insert(LocalKey { name, code_object_id: unique_instr.code_object_id });
                    }
                }
                Opcode::LoadGlobal => {
                    ctx.d_global.insert(GlobalKey { name, file: unique_instr.file.clone() });
                }
                Opcode::LoadClosure | Opcode::LoadDeref | Opcode::LoadClassDeref => {
                    let scope = nonlocal_scope(registry, unique_instr.code_object_id);
                    ctx.d_nonlocal.insert(NonlocalKey { name, scope });
                }
                _ => {}
            }
        }
        ExecutedInstruction::Attribute { src_address, arg_address, is_mutable_type, .. } => {
            if *is_mutable_type {
                if let Some(addr) = arg_address {
                    ctx.d_addresses.insert(format!("{addr:#x}"));
                }
            }
            if let Some(combined) = event.combined_attribute_key() {
                ctx.d_attributes.insert(combined);
            }
            if unique_instr.opcode().is_attribute_access() || unique_instr.opcode() == Opcode::ImportFrom {
                if let Some(addr) = src_address {
                    ctx.d_addresses.insert(format!("{addr:#x}"));
                }
            }
        }
        _ => {}
    }
}
