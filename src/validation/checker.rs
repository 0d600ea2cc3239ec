//! Type & format checker
//!
//! Two modes over a flattened document:
//! - [`check_formats`] validates: failures become error entries and the raw
//!   value is left in place; successes write the normalized value back.
//! - [`apply_policy_formats`] coerces: unconditional and active-policy rules
//!   are applied best-effort and never produce errors.

use std::collections::BTreeSet;

use super::flatten::FlatDocument;
use super::format::FormatOptions;
use super::phone::PhoneRegion;
use super::report::{ConfigWarning, ErrorEntry, ErrorReport, StageOutput};
use crate::model::{FormatKind, FormatRule, ModelDescriptor};

/// Validates every unconditional format rule of `model`.
///
/// Paths already in `errors_so_far`, or absent, are skipped.
pub fn check_formats(
    model: &ModelDescriptor,
    flat: &mut FlatDocument,
    errors_so_far: &ErrorReport,
    options: &FormatOptions,
) -> StageOutput {
    let mut output = StageOutput::new();

    for rule in &model.formats {
        if let Some(warning) = rule_warning(model, rule) {
            output.warnings.push(warning);
        }
        let Some(kind) = rule.kind.error_kind() else {
            continue;
        };
        if errors_so_far.contains(&rule.path)
            || output.errors.contains(&rule.path)
            || !flat.is_present(&rule.path)
        {
            continue;
        }
        let Some(raw) = flat.value_at(&rule.path) else {
            continue;
        };

        match rule.kind.normalize(&raw, options) {
            Ok(normalized) => {
                if normalized != raw {
                    if let Err(e) = flat.insert(&rule.path, normalized) {
                        output.warn(&model.name, Some(&rule.path), e.to_string());
                    }
                }
            }
            Err(_) => {
                output.errors.insert(ErrorEntry::new(
                    &rule.path,
                    kind,
                    rule.kind.failure_message(&rule.path),
                ));
            }
        }
    }

    output
}

/// Applies unconditional rules plus the rules of every active policy,
/// writing back whatever each validator yields. Invalid values stay as
/// they are; no errors are produced.
pub fn apply_policy_formats(
    model: &ModelDescriptor,
    flat: &mut FlatDocument,
    active_policies: &BTreeSet<String>,
    options: &FormatOptions,
) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    for (rule, _policy) in model.formats_for(active_policies.iter().map(String::as_str)) {
        if let Some(warning) = rule_warning(model, rule) {
            warnings.push(warning);
        }
        if rule.kind.error_kind().is_none() || !flat.is_present(&rule.path) {
            continue;
        }
        let Some(raw) = flat.value_at(&rule.path) else {
            continue;
        };
        if let Ok(normalized) = rule.kind.normalize(&raw, options) {
            if normalized != raw {
                if let Err(e) = flat.insert(&rule.path, normalized) {
                    warnings.push(ConfigWarning::new(&model.name, Some(&rule.path), e.to_string()));
                }
            }
        }
    }

    warnings
}

/// Configuration problem carried by a rule, if any
fn rule_warning(model: &ModelDescriptor, rule: &FormatRule) -> Option<ConfigWarning> {
    let message = match &rule.kind {
        FormatKind::Unknown { tag } => format!("unknown format type '{}', rule skipped", tag),
        FormatKind::Phone { region: Some(code) } if PhoneRegion::from_code(code).is_none() => {
            format!("unsupported phone region '{}', default region used", code)
        }
        _ => return None,
    };
    Some(ConfigWarning::new(&model.name, Some(&rule.path), message))
}
