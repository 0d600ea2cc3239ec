//! Model descriptor types
//!
//! A model descriptor is the read-only rule set attached to one repository.
//! It is loaded once and never mutated by validation.
//!
//! Rule families:
//! - `required`: paths that must always be set
//! - `requiredIfCreatedVia`: paths required for a given creation pathway
//! - `requiredIf`: paths required when a condition on another field holds
//! - `policyRequired`: paths required when a policy is active
//! - `formats` / `policyFormats`: typed format rules
//! - `unique`: paths whose value must not collide with another record

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::{ConfigWarning, PhoneRegion};

/// Largest integer exactly representable as an IEEE-754 double.
pub const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;
/// Smallest integer exactly representable as an IEEE-754 double.
pub const MIN_SAFE_INTEGER: i64 = -MAX_SAFE_INTEGER;

/// Context tag under which unconditional requirements are filed.
pub const DEFAULT_CONTEXT: &str = "default";

/// Complete rule set for one repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelDescriptor {
    /// Repository name (e.g. "users")
    pub name: String,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub required_if_created_via: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub required_if: Vec<ConditionalRequirement>,
    #[serde(default)]
    pub policy_required: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub formats: Vec<FormatRule>,
    #[serde(default)]
    pub policy_formats: BTreeMap<String, Vec<FormatRule>>,
    #[serde(default)]
    pub unique: Vec<String>,
}

impl ModelDescriptor {
    /// Creates a descriptor with no rules
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: Vec::new(),
            required_if_created_via: BTreeMap::new(),
            required_if: Vec::new(),
            policy_required: BTreeMap::new(),
            formats: Vec::new(),
            policy_formats: BTreeMap::new(),
            unique: Vec::new(),
        }
    }

    pub fn with_required(mut self, path: impl Into<String>) -> Self {
        self.required.push(path.into());
        self
    }

    pub fn with_required_via(mut self, created_via: impl Into<String>, path: impl Into<String>) -> Self {
        self.required_if_created_via
            .entry(created_via.into())
            .or_default()
            .push(path.into());
        self
    }

    pub fn with_required_if(mut self, rule: ConditionalRequirement) -> Self {
        self.required_if.push(rule);
        self
    }

    pub fn with_policy_required(mut self, policy: impl Into<String>, path: impl Into<String>) -> Self {
        self.policy_required
            .entry(policy.into())
            .or_default()
            .push(path.into());
        self
    }

    pub fn with_format(mut self, rule: FormatRule) -> Self {
        self.formats.push(rule);
        self
    }

    pub fn with_policy_format(mut self, policy: impl Into<String>, rule: FormatRule) -> Self {
        self.policy_formats.entry(policy.into()).or_default().push(rule);
        self
    }

    pub fn with_unique(mut self, path: impl Into<String>) -> Self {
        self.unique.push(path.into());
        self
    }

    /// Context requirement table with the unconditional list filed under
    /// [`DEFAULT_CONTEXT`]. Unconditional paths come first.
    pub fn context_requirements(&self) -> BTreeMap<&str, Vec<&str>> {
        let mut table: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        table
            .entry(DEFAULT_CONTEXT)
            .or_default()
            .extend(self.required.iter().map(String::as_str));
        for (via, paths) in &self.required_if_created_via {
            table
                .entry(via.as_str())
                .or_default()
                .extend(paths.iter().map(String::as_str));
        }
        table
    }

    /// Unconditional format rules followed by the rules of each active policy
    pub fn formats_for<'a, I>(&'a self, policies: I) -> Vec<(&'a FormatRule, Option<&'a str>)>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut rules: Vec<(&FormatRule, Option<&str>)> =
            self.formats.iter().map(|rule| (rule, None)).collect();
        for policy in policies {
            if let Some(extra) = self.policy_formats.get(policy) {
                rules.extend(extra.iter().map(|rule| (rule, Some(policy))));
            }
        }
        rules
    }

    /// Checks the descriptor for authoring defects.
    ///
    /// Defects never fail loading: each one is skipped at validation time.
    pub fn lint(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let mut warn = |path: &str, message: String| {
            warnings.push(ConfigWarning::new(&self.name, Some(path), message));
        };

        let rule_paths = self
            .required
            .iter()
            .chain(self.required_if_created_via.values().flatten())
            .chain(self.policy_required.values().flatten())
            .chain(self.unique.iter())
            .chain(self.required_if.iter().map(|rule| &rule.target));
        for path in rule_paths {
            if !is_valid_path(path) {
                warn(path, "malformed path".to_string());
            }
        }

        for rule in &self.required_if {
            for condition in &rule.conditions {
                if let Some(problem) = condition.defect() {
                    warn(&rule.target, problem);
                }
            }
        }

        let all_formats = self
            .formats
            .iter()
            .chain(self.policy_formats.values().flatten());
        for rule in all_formats {
            if !is_valid_path(&rule.path) {
                warn(&rule.path, "malformed path".to_string());
            }
            match &rule.kind {
                FormatKind::Unknown { tag } => {
                    warn(&rule.path, format!("unknown format type '{}'", tag));
                }
                FormatKind::OneOf { values, default } if values.is_empty() && default.is_none() => {
                    warn(&rule.path, "oneOf rule has no values and no default".to_string());
                }
                FormatKind::Int { min, max } if min > max => {
                    warn(&rule.path, format!("int bounds are inverted: {} > {}", min, max));
                }
                FormatKind::Phone { region: Some(code) } if PhoneRegion::from_code(code).is_none() => {
                    warn(&rule.path, format!("unsupported phone region '{}'", code));
                }
                _ => {}
            }
        }

        warnings
    }
}

/// Non-empty dotted path without empty segments
pub(crate) fn is_valid_path(path: &str) -> bool {
    !path.is_empty() && path.split('.').all(|segment| !segment.is_empty())
}

/// `requiredIf` rule: `target` is required when any condition holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawConditionalRequirement")]
pub struct ConditionalRequirement {
    pub target: String,
    pub conditions: Vec<Condition>,
}

impl ConditionalRequirement {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            conditions: Vec::new(),
        }
    }

    pub fn when(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }
}

/// Accepts both a `conditions` list and a single `condition` object.
#[derive(Deserialize)]
struct RawConditionalRequirement {
    target: String,
    #[serde(default)]
    condition: Option<Condition>,
    #[serde(default)]
    conditions: Vec<Condition>,
}

impl From<RawConditionalRequirement> for ConditionalRequirement {
    fn from(raw: RawConditionalRequirement) -> Self {
        let mut conditions: Vec<Condition> = raw.condition.into_iter().collect();
        conditions.extend(raw.conditions);
        Self {
            target: raw.target,
            conditions,
        }
    }
}

/// One clause of a `requiredIf` rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operand: Option<String>,
    #[serde(default)]
    pub operation: ConditionOperation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Value>>,
}

impl Condition {
    /// `operand` holds one of `values`
    pub fn one_of(operand: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            operand: Some(operand.into()),
            operation: ConditionOperation::OneOf,
            one_of: Some(values),
        }
    }

    /// Describes why this clause cannot be evaluated, if it cannot.
    pub fn defect(&self) -> Option<String> {
        match (&self.operation, &self.operand, &self.one_of) {
            (ConditionOperation::Unsupported(op), _, _) if op.is_empty() => {
                Some("condition has no operation".to_string())
            }
            (ConditionOperation::Unsupported(op), _, _) => {
                Some(format!("unsupported condition operation '{}'", op))
            }
            (ConditionOperation::OneOf, None, _) => Some("condition has no operand".to_string()),
            (ConditionOperation::OneOf, Some(operand), _) if !is_valid_path(operand) => {
                Some(format!("condition operand '{}' is a malformed path", operand))
            }
            (ConditionOperation::OneOf, Some(_), None) => {
                Some("oneOf condition has no value set".to_string())
            }
            _ => None,
        }
    }
}

/// Condition operations. Only `oneOf` is evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionOperation {
    OneOf,
    /// Operation tag from model data that the engine does not implement
    Unsupported(String),
}

impl Default for ConditionOperation {
    fn default() -> Self {
        ConditionOperation::Unsupported(String::new())
    }
}

impl From<String> for ConditionOperation {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "oneOf" => ConditionOperation::OneOf,
            _ => ConditionOperation::Unsupported(tag),
        }
    }
}

impl From<ConditionOperation> for String {
    fn from(op: ConditionOperation) -> Self {
        match op {
            ConditionOperation::OneOf => "oneOf".to_string(),
            ConditionOperation::Unsupported(tag) => tag,
        }
    }
}

/// Format rule attached to one path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawFormatRule", into = "RawFormatRule")]
pub struct FormatRule {
    pub path: String,
    pub kind: FormatKind,
}

impl FormatRule {
    pub fn new(path: impl Into<String>, kind: FormatKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Format kinds with their typed parameters
#[derive(Debug, Clone, PartialEq)]
pub enum FormatKind {
    Email,
    /// Phone number; `region` overrides the configured default region
    Phone { region: Option<String> },
    /// Three letters, upper-cased
    Trigram,
    /// Enumerated set with an optional fallback value
    OneOf { values: Vec<Value>, default: Option<Value> },
    Date,
    Time,
    /// Integer within inclusive bounds
    Int { min: i64, max: i64 },
    /// Tag from model data that the engine does not know
    Unknown { tag: String },
}

impl FormatKind {
    /// Integer rule with the safe-integer range as bounds
    pub fn int() -> Self {
        FormatKind::Int {
            min: MIN_SAFE_INTEGER,
            max: MAX_SAFE_INTEGER,
        }
    }

    pub fn one_of(values: Vec<Value>) -> Self {
        FormatKind::OneOf {
            values,
            default: None,
        }
    }

    /// Returns the descriptor tag
    pub fn tag(&self) -> &str {
        match self {
            FormatKind::Email => "email",
            FormatKind::Phone { .. } => "phone",
            FormatKind::Trigram => "trigram",
            FormatKind::OneOf { .. } => "oneOf",
            FormatKind::Date => "date",
            FormatKind::Time => "time",
            FormatKind::Int { .. } => "int",
            FormatKind::Unknown { tag } => tag,
        }
    }
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Wire form of a format rule
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFormatRule {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    one_of: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_value: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    region: Option<String>,
}

impl From<RawFormatRule> for FormatRule {
    fn from(raw: RawFormatRule) -> Self {
        let kind = match raw.kind.as_str() {
            "email" => FormatKind::Email,
            "phone" => FormatKind::Phone { region: raw.region },
            "trigram" => FormatKind::Trigram,
            "oneOf" => FormatKind::OneOf {
                values: raw.one_of.unwrap_or_default(),
                default: raw.default,
            },
            "date" => FormatKind::Date,
            "time" => FormatKind::Time,
            "int" => FormatKind::Int {
                min: raw.min_value.unwrap_or(MIN_SAFE_INTEGER),
                max: raw.max_value.unwrap_or(MAX_SAFE_INTEGER),
            },
            _ => FormatKind::Unknown { tag: raw.kind },
        };
        Self {
            path: raw.path,
            kind,
        }
    }
}

impl From<FormatRule> for RawFormatRule {
    fn from(rule: FormatRule) -> Self {
        let mut raw = RawFormatRule {
            path: rule.path,
            kind: rule.kind.tag().to_string(),
            one_of: None,
            default: None,
            min_value: None,
            max_value: None,
            region: None,
        };
        match rule.kind {
            FormatKind::Phone { region } => raw.region = region,
            FormatKind::OneOf { values, default } => {
                raw.one_of = Some(values);
                raw.default = default;
            }
            FormatKind::Int { min, max } => {
                raw.min_value = Some(min);
                raw.max_value = Some(max);
            }
            _ => {}
        }
        raw
    }
}
