//! Requirement resolver
//!
//! Computes which paths must be set, in a fixed order where the first rule
//! to flag a path wins:
//!
//! 1. unconditional `required`, filed under the `default` creation context
//! 2. `requiredIfCreatedVia` for the document's creation context
//! 3. `requiredIf` conditions
//! 4. `policyRequired` for every active policy
//!
//! Malformed rules are skipped with a configuration warning.

use std::collections::BTreeSet;

use super::flatten::FlatDocument;
use super::format::{categorical_match, display_value};
use super::pipeline::ValidationContext;
use super::report::{ErrorEntry, StageOutput};
use crate::model::{is_valid_path, ConditionalRequirement, ModelDescriptor, DEFAULT_CONTEXT};

/// Resolves every requirement rule of `model` against `flat`.
pub fn resolve_required(
    model: &ModelDescriptor,
    flat: &FlatDocument,
    ctx: &ValidationContext,
) -> StageOutput {
    let mut output = StageOutput::new();

    let created_via = ctx.effective_created_via(flat);
    resolve_context(model, flat, created_via.as_deref(), &mut output);
    for rule in &model.required_if {
        resolve_conditional(model, flat, rule, &mut output);
    }
    resolve_policies(model, flat, &ctx.active_policies, &mut output);

    output
}

fn resolve_context(
    model: &ModelDescriptor,
    flat: &FlatDocument,
    created_via: Option<&str>,
    output: &mut StageOutput,
) {
    let table = model.context_requirements();

    let mut contexts = vec![DEFAULT_CONTEXT];
    if let Some(via) = created_via.filter(|via| *via != DEFAULT_CONTEXT) {
        contexts.push(via);
    }

    for via in contexts {
        let Some(paths) = table.get(via) else {
            continue;
        };
        for path in paths {
            if !is_valid_path(path) {
                output.warn(&model.name, Some(path), "malformed required path, rule skipped");
                continue;
            }
            if !flat.is_present(path) {
                output.errors.insert(ErrorEntry::required_via(path, via));
            }
        }
    }
}

fn resolve_conditional(
    model: &ModelDescriptor,
    flat: &FlatDocument,
    rule: &ConditionalRequirement,
    output: &mut StageOutput,
) {
    if !is_valid_path(&rule.target) {
        output.warn(&model.name, Some(&rule.target), "malformed requiredIf target, rule skipped");
        return;
    }
    if output.errors.contains(&rule.target) || flat.is_present(&rule.target) {
        return;
    }

    for condition in &rule.conditions {
        if let Some(defect) = condition.defect() {
            output.warn(&model.name, Some(&rule.target), format!("{}, condition skipped", defect));
            continue;
        }
        let (Some(operand), Some(set)) = (&condition.operand, &condition.one_of) else {
            continue;
        };

        if !flat.is_present(operand) {
            continue;
        }
        let Some(value) = flat.value_at(operand) else {
            continue;
        };
        if categorical_match(&value, set) {
            output.errors.insert(ErrorEntry::required_if(
                &rule.target,
                operand,
                &display_value(&value),
            ));
            return;
        }
    }
}

fn resolve_policies(
    model: &ModelDescriptor,
    flat: &FlatDocument,
    active_policies: &BTreeSet<String>,
    output: &mut StageOutput,
) {
    let active = model
        .policy_required
        .iter()
        .filter(|(policy, _)| active_policies.contains(*policy));

    for (policy, paths) in active {
        for path in paths {
            if !is_valid_path(path) {
                output.warn(&model.name, Some(path), "malformed policy path, rule skipped");
                continue;
            }
            if output.errors.contains(path) || flat.is_present(path) {
                continue;
            }
            output.errors.insert(ErrorEntry::required_by_policy(path, policy));
        }
    }
}
