//! Validation Pipeline
//!
//! Deterministic stage pipeline for every document:
//! Requirements → Formats → Uniqueness
//!
//! The document is flattened once; every stage reads the same flat view
//! and the format stage writes normalized values back into it. Stage
//! reports are merged first-wins, so a path keeps the error of the earliest
//! stage that flagged it.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::checker::{apply_policy_formats, check_formats};
use super::errors::{ValidationError, ValidationResult};
use super::flatten::FlatDocument;
use super::format::{display_value, FormatOptions};
use super::report::{ConfigWarning, ErrorReport, StageOutput};
use super::resolver::resolve_required;
use super::unique::{check_unique, DuplicateLookup};
use crate::model::ModelDescriptor;
use crate::observability::{log_event_with_fields, Event, ValidationMetrics};

/// Caller-supplied facts about the document being validated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationContext {
    /// Creation pathway tag (e.g. "import", "admin")
    pub created_via: Option<String>,
    /// Policies held by the caller
    #[serde(alias = "policies")]
    pub active_policies: BTreeSet<String>,
    pub is_new_record: bool,
    /// Identifier of the record being updated
    pub self_id: Option<String>,
}

impl ValidationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_created_via(mut self, tag: impl Into<String>) -> Self {
        self.created_via = Some(tag.into());
        self
    }

    pub fn with_policy(mut self, policy: impl Into<String>) -> Self {
        self.active_policies.insert(policy.into());
        self
    }

    pub fn new_record(mut self) -> Self {
        self.is_new_record = true;
        self
    }

    pub fn with_self_id(mut self, id: impl Into<String>) -> Self {
        self.self_id = Some(id.into());
        self
    }

    /// Context tag, falling back to the document's own `createdVia` field
    pub fn effective_created_via(&self, flat: &FlatDocument) -> Option<String> {
        self.created_via
            .clone()
            .or_else(|| flat.get_str("createdVia").map(str::to_string))
    }

    /// Record to leave out of duplicate lookups.
    ///
    /// New records have no identity yet; existing ones use `self_id`, then
    /// the document's `_id`.
    pub fn exclude_id(&self, flat: &FlatDocument) -> Option<String> {
        if self.is_new_record {
            return None;
        }
        self.self_id.clone().or_else(|| {
            flat.get("_id")
                .filter(|id| id.is_string() || id.is_number())
                .map(display_value)
        })
    }
}

/// One step of the pipeline
pub trait ValidationStage: Send + Sync {
    /// Stage name, used in logs
    fn name(&self) -> &'static str;

    /// Runs the stage. `errors_so_far` holds what earlier stages found.
    fn run<'a>(
        &'a self,
        model: &'a ModelDescriptor,
        flat: &'a mut FlatDocument,
        ctx: &'a ValidationContext,
        errors_so_far: &'a ErrorReport,
    ) -> Pin<Box<dyn Future<Output = ValidationResult<StageOutput>> + Send + 'a>>;
}

/// Required, context, conditional and policy rules
pub struct RequirementStage;

impl ValidationStage for RequirementStage {
    fn name(&self) -> &'static str {
        "requirements"
    }

    fn run<'a>(
        &'a self,
        model: &'a ModelDescriptor,
        flat: &'a mut FlatDocument,
        ctx: &'a ValidationContext,
        _errors_so_far: &'a ErrorReport,
    ) -> Pin<Box<dyn Future<Output = ValidationResult<StageOutput>> + Send + 'a>> {
        Box::pin(async move { Ok(resolve_required(model, flat, ctx)) })
    }
}

/// Unconditional format rules; normalizes valid values in place
pub struct FormatStage {
    options: FormatOptions,
}

impl FormatStage {
    pub fn new(options: FormatOptions) -> Self {
        Self { options }
    }
}

impl ValidationStage for FormatStage {
    fn name(&self) -> &'static str {
        "formats"
    }

    fn run<'a>(
        &'a self,
        model: &'a ModelDescriptor,
        flat: &'a mut FlatDocument,
        _ctx: &'a ValidationContext,
        errors_so_far: &'a ErrorReport,
    ) -> Pin<Box<dyn Future<Output = ValidationResult<StageOutput>> + Send + 'a>> {
        Box::pin(async move { Ok(check_formats(model, flat, errors_so_far, &self.options)) })
    }
}

/// Duplicate lookups for unique paths
pub struct UniquenessStage {
    lookup: Arc<dyn DuplicateLookup>,
    metrics: Arc<ValidationMetrics>,
}

impl UniquenessStage {
    pub fn new(lookup: Arc<dyn DuplicateLookup>, metrics: Arc<ValidationMetrics>) -> Self {
        Self { lookup, metrics }
    }
}

impl ValidationStage for UniquenessStage {
    fn name(&self) -> &'static str {
        "uniqueness"
    }

    fn run<'a>(
        &'a self,
        model: &'a ModelDescriptor,
        flat: &'a mut FlatDocument,
        ctx: &'a ValidationContext,
        errors_so_far: &'a ErrorReport,
    ) -> Pin<Box<dyn Future<Output = ValidationResult<StageOutput>> + Send + 'a>> {
        Box::pin(async move {
            let flat: &FlatDocument = flat;
            let exclude_id = ctx.exclude_id(flat);

            let result = check_unique(
                model,
                flat,
                errors_so_far,
                exclude_id.as_deref(),
                self.lookup.as_ref(),
            )
            .await;

            match result {
                Ok(checked) => {
                    self.metrics.add_lookups(checked.lookups_issued as u64);
                    Ok(checked.output)
                }
                Err(ValidationError::Lookup { path, source }) => {
                    self.metrics.increment_lookup_failures();
                    log_event_with_fields(
                        Event::LookupFailed,
                        &[
                            ("model", model.name.as_str()),
                            ("path", path.as_str()),
                            ("error", source.to_string().as_str()),
                        ],
                    );
                    Err(ValidationError::Lookup { path, source })
                }
                Err(other) => Err(other),
            }
        })
    }
}

/// Result of a validation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationOutcome {
    pub errors: ErrorReport,
    /// Document with every successfully validated value normalized
    pub normalized: Value,
    /// Model defects met during the run
    pub warnings: Vec<ConfigWarning>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The validation orchestrator
///
/// Holds no per-document state; one instance serves any number of
/// concurrent `validate` calls.
pub struct Validator {
    stages: Vec<Arc<dyn ValidationStage>>,
    options: FormatOptions,
    metrics: Arc<ValidationMetrics>,
}

impl Validator {
    /// Validator with the default stages and options
    pub fn new(lookup: Arc<dyn DuplicateLookup>) -> Self {
        ValidatorBuilder::new().with_default_stages(lookup).build()
    }

    pub fn builder() -> ValidatorBuilder {
        ValidatorBuilder::new()
    }

    pub fn metrics(&self) -> &Arc<ValidationMetrics> {
        &self.metrics
    }

    /// Names of the configured stages, in run order
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Validates `document` against `model`.
    ///
    /// Document violations are returned in the outcome; `Err` means no
    /// report could be produced.
    pub async fn validate(
        &self,
        model: &ModelDescriptor,
        document: &Value,
        ctx: &ValidationContext,
    ) -> ValidationResult<ValidationOutcome> {
        self.metrics.increment_validations();
        log_event_with_fields(Event::ValidationBegin, &[("model", model.name.as_str())]);

        let mut flat = FlatDocument::flatten(document)?;
        let mut errors = ErrorReport::new();
        let mut warnings = Vec::new();

        for stage in &self.stages {
            match stage.run(model, &mut flat, ctx, &errors).await {
                Ok(output) => {
                    errors.merge(output.errors);
                    warnings.extend(output.warnings);
                }
                Err(e) => {
                    // Warnings from earlier stages are still reported
                    self.report_warnings(&warnings);
                    return Err(e);
                }
            }
        }

        self.report_warnings(&warnings);
        let normalized = flat.unflatten()?;

        if errors.is_empty() {
            log_event_with_fields(Event::ValidationComplete, &[("model", model.name.as_str())]);
        } else {
            self.metrics.record_rejection(errors.len() as u64);
            let count = errors.len().to_string();
            log_event_with_fields(
                Event::ValidationRejected,
                &[("model", model.name.as_str()), ("errors", count.as_str())],
            );
        }

        Ok(ValidationOutcome {
            errors,
            normalized,
            warnings,
        })
    }

    /// Applies unconditional and active-policy format rules without
    /// validating. Invalid values are left as they are.
    pub fn normalize(
        &self,
        model: &ModelDescriptor,
        document: &Value,
        ctx: &ValidationContext,
    ) -> ValidationResult<Value> {
        let mut flat = FlatDocument::flatten(document)?;
        let warnings = apply_policy_formats(model, &mut flat, &ctx.active_policies, &self.options);
        self.report_warnings(&warnings);
        Ok(flat.unflatten()?)
    }

    fn report_warnings(&self, warnings: &[ConfigWarning]) {
        if warnings.is_empty() {
            return;
        }
        self.metrics.add_config_warnings(warnings.len() as u64);
        for warning in warnings {
            log_event_with_fields(
                Event::ModelWarning,
                &[
                    ("model", warning.model.as_str()),
                    ("path", warning.path.as_deref().unwrap_or("")),
                    ("message", warning.message.as_str()),
                ],
            );
        }
    }
}

/// Builder for a [`Validator`] with custom stages or options
pub struct ValidatorBuilder {
    stages: Vec<Arc<dyn ValidationStage>>,
    options: FormatOptions,
    metrics: Arc<ValidationMetrics>,
}

impl Default for ValidatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidatorBuilder {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            options: FormatOptions::default(),
            metrics: Arc::new(ValidationMetrics::new()),
        }
    }

    /// Format options used by stages added afterwards and by `normalize`
    pub fn with_options(mut self, options: FormatOptions) -> Self {
        self.options = options;
        self
    }

    /// Shares an existing metrics registry
    pub fn with_metrics(mut self, metrics: Arc<ValidationMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Appends a stage
    pub fn with_stage(mut self, stage: impl ValidationStage + 'static) -> Self {
        self.stages.push(Arc::new(stage));
        self
    }

    /// Appends requirements, formats and uniqueness, in that order
    pub fn with_default_stages(self, lookup: Arc<dyn DuplicateLookup>) -> Self {
        let format = FormatStage::new(self.options);
        let uniqueness = UniquenessStage::new(lookup, Arc::clone(&self.metrics));
        self.with_stage(RequirementStage)
            .with_stage(format)
            .with_stage(uniqueness)
    }

    pub fn build(self) -> Validator {
        Validator {
            stages: self.stages,
            options: self.options,
            metrics: self.metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FormatKind, FormatRule};
    use crate::validation::{DuplicateList, ErrorKind, LookupError, MemoryLookup, PhoneRegion};
    use serde_json::json;

    fn users_model() -> ModelDescriptor {
        ModelDescriptor::new("users")
            .with_required("email")
            .with_format(FormatRule::new("email", FormatKind::Email))
            .with_format(FormatRule::new("age", FormatKind::Int { min: 0, max: 150 }))
            .with_format(FormatRule::new("phone", FormatKind::Phone { region: None }))
            .with_unique("email")
            .with_unique("login")
    }

    fn lookup() -> Arc<MemoryLookup> {
        Arc::new(MemoryLookup::new().with_records(vec![
            json!({ "_id": "u1", "email": "ada@x.io", "login": "ada" }),
        ]))
    }

    struct DownLookup;

    impl DuplicateLookup for DownLookup {
        fn find_duplicates<'a>(
            &'a self,
            _value: &'a Value,
            _path: &'a str,
            _exclude_id: Option<&'a str>,
        ) -> Pin<Box<dyn Future<Output = Result<DuplicateList, LookupError>> + Send + 'a>> {
            Box::pin(async { Err(LookupError::Unavailable("timeout".to_string())) })
        }
    }

    #[tokio::test]
    async fn test_valid_document_normalized() {
        let validator = Validator::new(lookup());
        let doc = json!({ "email": " Bob@X.io ", "age": "42", "login": "bob" });

        let outcome = validator
            .validate(&users_model(), &doc, &ValidationContext::new().new_record())
            .await
            .unwrap();

        assert!(outcome.is_valid());
        assert_eq!(
            outcome.normalized,
            json!({ "email": "bob@x.io", "age": 42, "login": "bob" })
        );
    }

    #[tokio::test]
    async fn test_errors_from_every_stage() {
        let validator = Validator::new(lookup());
        let doc = json!({ "age": "old", "login": "ada" });

        let outcome = validator
            .validate(&users_model(), &doc, &ValidationContext::new().new_record())
            .await
            .unwrap();

        assert_eq!(outcome.errors.len(), 3);
        assert_eq!(outcome.errors.get("email").unwrap().kind, ErrorKind::Required);
        assert_eq!(outcome.errors.get("age").unwrap().kind, ErrorKind::Int);
        assert_eq!(outcome.errors.get("login").unwrap().kind, ErrorKind::Unique);
        // Invalid values are kept raw
        assert_eq!(outcome.normalized["age"], json!("old"));
    }

    #[tokio::test]
    async fn test_format_error_blocks_uniqueness() {
        let model = ModelDescriptor::new("users")
            .with_format(FormatRule::new("login", FormatKind::int()))
            .with_unique("login");
        let validator = Validator::new(lookup());

        // "ada" is taken, but the format failure is reported instead
        let outcome = validator
            .validate(&model, &json!({ "login": "ada" }), &ValidationContext::new())
            .await
            .unwrap();
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors.get("login").unwrap().kind, ErrorKind::Int);
    }

    #[tokio::test]
    async fn test_update_excludes_own_record() {
        let validator = Validator::new(lookup());
        let doc = json!({ "_id": "u1", "email": "ada@x.io", "login": "ada" });

        let by_document_id = validator
            .validate(&users_model(), &doc, &ValidationContext::new())
            .await
            .unwrap();
        assert!(by_document_id.is_valid());

        let by_context_id = validator
            .validate(
                &users_model(),
                &json!({ "email": "ada@x.io" }),
                &ValidationContext::new().with_self_id("u1"),
            )
            .await
            .unwrap();
        assert!(by_context_id.is_valid());

        let as_new = validator
            .validate(&users_model(), &doc, &ValidationContext::new().new_record())
            .await
            .unwrap();
        assert_eq!(as_new.errors.len(), 2);
    }

    #[tokio::test]
    async fn test_lookup_failure_fails_run() {
        let validator = Validator::new(Arc::new(DownLookup));
        let err = validator
            .validate(&users_model(), &json!({ "email": "a@b.co" }), &ValidationContext::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ValidationError::Lookup { ref path, .. } if path == "email"));
        assert_eq!(validator.metrics().snapshot().lookup_failures, 1);
    }

    #[tokio::test]
    async fn test_warnings_reported_when_later_stage_fails() {
        let model = ModelDescriptor::new("users")
            .with_format(FormatRule::new("color", FormatKind::Unknown { tag: "rgb".into() }))
            .with_unique("email");
        let validator = Validator::new(Arc::new(DownLookup));

        let err = validator
            .validate(&model, &json!({ "email": "a@b.co" }), &ValidationContext::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ValidationError::Lookup { .. }));
        let snapshot = validator.metrics().snapshot();
        assert_eq!(snapshot.config_warnings, 1);
        assert_eq!(snapshot.lookups_issued, 0);
    }

    #[tokio::test]
    async fn test_malformed_document() {
        let validator = Validator::new(lookup());
        let err = validator
            .validate(&users_model(), &json!(["not", "an", "object"]), &ValidationContext::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::MalformedDocument(_)));
    }

    #[tokio::test]
    async fn test_custom_stage_list() {
        let validator = Validator::builder().with_stage(RequirementStage).build();
        assert_eq!(validator.stage_names(), vec!["requirements"]);

        let outcome = validator
            .validate(&users_model(), &json!({ "email": "nope" }), &ValidationContext::new())
            .await
            .unwrap();
        assert!(outcome.is_valid());
    }

    #[tokio::test]
    async fn test_metrics_recorded() {
        let validator = Validator::new(lookup());
        let ctx = ValidationContext::new().new_record();

        validator
            .validate(&users_model(), &json!({ "email": "z@x.io" }), &ctx)
            .await
            .unwrap();
        validator
            .validate(&users_model(), &json!({}), &ctx)
            .await
            .unwrap();

        let snapshot = validator.metrics().snapshot();
        assert_eq!(snapshot.validations_run, 2);
        assert_eq!(snapshot.documents_rejected, 1);
        assert_eq!(snapshot.errors_reported, 1);
        assert_eq!(snapshot.lookups_issued, 1);
    }

    #[tokio::test]
    async fn test_default_region_option() {
        let validator = Validator::builder()
            .with_options(FormatOptions::with_region(PhoneRegion::Fr))
            .with_default_stages(lookup())
            .build();

        let outcome = validator
            .validate(
                &users_model(),
                &json!({ "email": "c@x.io", "phone": "06 12 34 56 78" }),
                &ValidationContext::new().new_record(),
            )
            .await
            .unwrap();
        assert_eq!(outcome.normalized["phone"], json!("+33612345678"));
    }

    #[test]
    fn test_normalize_applies_active_policy_formats() {
        let model = ModelDescriptor::new("users")
            .with_required("email")
            .with_policy_format("billing", FormatRule::new("vat", FormatKind::int()));
        let validator = Validator::new(lookup());
        let ctx = ValidationContext::new().with_policy("billing");

        let normalized = validator
            .normalize(&model, &json!({ "vat": "21", "other": "x" }), &ctx)
            .unwrap();
        // Required rules are not checked
        assert_eq!(normalized, json!({ "vat": 21, "other": "x" }));
    }

    #[test]
    fn test_context_deserialization() {
        let ctx: ValidationContext = serde_json::from_value(json!({
            "createdVia": "import",
            "policies": ["billing", "admin"],
            "selfId": "u9"
        }))
        .unwrap();

        assert_eq!(ctx.created_via.as_deref(), Some("import"));
        assert!(ctx.active_policies.contains("billing"));
        assert!(!ctx.is_new_record);
        assert_eq!(ctx.self_id.as_deref(), Some("u9"));
    }
}
