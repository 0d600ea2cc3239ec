//! CLI command implementations
//!
//! Every command follows the same boot sequence:
//! 1. Configuration load (sets the log level)
//! 2. Model load
//! 3. Command execution, one JSON response line on stdout

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::model::{ModelDescriptor, ModelLoader};
use crate::observability::{log_event_with_fields, Event, Logger, Severity};
use crate::validation::{
    FormatOptions, MemoryLookup, PhoneRegion, ValidationContext, ValidationError, Validator,
};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{error_response, ok_response, read_request, write_json, write_response};

/// Configuration file structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory of model descriptor files (required)
    pub models_dir: String,

    /// Directory of `<model>.json` record arrays used for uniqueness
    /// lookups (optional)
    #[serde(default)]
    pub records_dir: Option<String>,

    /// Region for national phone numbers (optional, default "US")
    #[serde(default = "default_phone_region")]
    pub default_phone_region: String,

    /// Minimum log severity (optional, default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_phone_region() -> String {
    "US".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.models_dir.trim().is_empty() {
            return Err(CliError::config_error("models_dir must not be empty"));
        }
        self.phone_region()?;
        self.log_severity()?;
        Ok(())
    }

    /// Get models directory as Path
    pub fn models_path(&self) -> &Path {
        Path::new(&self.models_dir)
    }

    /// Get records directory as Path, if configured
    pub fn records_path(&self) -> Option<&Path> {
        self.records_dir.as_deref().map(Path::new)
    }

    pub fn phone_region(&self) -> CliResult<PhoneRegion> {
        PhoneRegion::from_code(&self.default_phone_region).ok_or_else(|| {
            CliError::config_error(format!(
                "Invalid default_phone_region: '{}'",
                self.default_phone_region
            ))
        })
    }

    pub fn log_severity(&self) -> CliResult<Severity> {
        self.log_level
            .parse()
            .map_err(|e: String| CliError::config_error(format!("Invalid log_level: {}", e)))
    }

    /// Format options derived from this configuration
    pub fn format_options(&self) -> CliResult<FormatOptions> {
        Ok(FormatOptions::with_region(self.phone_region()?))
    }
}

/// One validation request read from stdin
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationRequest {
    pub document: Value,
    #[serde(default)]
    pub context: ValidationContext,
}

impl ValidationRequest {
    pub fn from_value(value: Value) -> CliResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| CliError::invalid_request(format!("Invalid request: {}", e)))
    }
}

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Check { config } => check(&config),
        Command::Validate { config, model } => validate(&config, &model),
        Command::Normalize { config, model } => normalize(&config, &model),
    }
}

/// Load every model and report names and configuration warnings
pub fn check(config_path: &Path) -> CliResult<()> {
    let (_config, loader) = boot(config_path)?;
    write_response(check_report(&loader)?)
}

/// Validate one document from stdin against `model_name`
pub fn validate(config_path: &Path, model_name: &str) -> CliResult<()> {
    let (config, loader) = boot(config_path)?;
    let model = loader.require(model_name)?;
    let request = ValidationRequest::from_value(read_request()?)?;

    let response = validate_request(&config, model, &request)?;
    write_json(&response)
}

/// Normalize one document from stdin with `model_name`'s format rules
pub fn normalize(config_path: &Path, model_name: &str) -> CliResult<()> {
    let (config, loader) = boot(config_path)?;
    let model = loader.require(model_name)?;
    let request = ValidationRequest::from_value(read_request()?)?;

    let response = normalize_request(&config, model, &request)?;
    write_json(&response)
}

/// Configuration load then model load
fn boot(config_path: &Path) -> CliResult<(Config, ModelLoader)> {
    let config = Config::load(config_path)?;
    Logger::set_min_severity(config.log_severity()?);
    log_event_with_fields(
        Event::ConfigLoaded,
        &[
            ("config", config_path.display().to_string().as_str()),
            ("models_dir", config.models_dir.as_str()),
        ],
    );

    let mut loader = ModelLoader::new(config.models_path());
    loader.load_all()?;
    Ok((config, loader))
}

/// Model names and every descriptor warning
pub fn check_report(loader: &ModelLoader) -> CliResult<Value> {
    let models: Vec<&str> = loader.all_models().map(|m| m.name.as_str()).collect();
    Ok(json!({
        "models": models,
        "warnings": serde_json::to_value(loader.warnings())?,
    }))
}

/// Runs a full validation and builds the response line.
///
/// Validation failures that leave no report (malformed document, lookup
/// backend down) become error responses rather than CLI errors.
pub fn validate_request(
    config: &Config,
    model: &ModelDescriptor,
    request: &ValidationRequest,
) -> CliResult<Value> {
    let lookup = load_lookup(config, &model.name)?;
    let validator = Validator::builder()
        .with_options(config.format_options()?)
        .with_default_stages(Arc::new(lookup))
        .build();

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::runtime_error(format!("Failed to create tokio runtime: {}", e)))?;
    let result = runtime.block_on(validator.validate(model, &request.document, &request.context));

    match result {
        Ok(outcome) => {
            let mut data = serde_json::to_value(&outcome)?;
            data["valid"] = json!(outcome.is_valid());
            Ok(ok_response(data))
        }
        Err(e) => Ok(error_response(validation_error_code(&e), &e.to_string())),
    }
}

/// Applies format rules only and builds the response line
pub fn normalize_request(
    config: &Config,
    model: &ModelDescriptor,
    request: &ValidationRequest,
) -> CliResult<Value> {
    let validator = Validator::builder()
        .with_options(config.format_options()?)
        .build();

    match validator.normalize(model, &request.document, &request.context) {
        Ok(normalized) => Ok(ok_response(normalized)),
        Err(e) => Ok(error_response(validation_error_code(&e), &e.to_string())),
    }
}

fn validation_error_code(error: &ValidationError) -> &'static str {
    match error {
        ValidationError::MalformedDocument(_) => "DOCGATE_MALFORMED_DOCUMENT",
        ValidationError::Lookup { .. } => "DOCGATE_LOOKUP_FAILED",
    }
}

/// Existing records for `model_name`, from `<records_dir>/<model_name>.json`.
///
/// No records directory, or no file for the model, yields an empty lookup.
pub fn load_lookup(config: &Config, model_name: &str) -> CliResult<MemoryLookup> {
    let Some(dir) = config.records_path() else {
        return Ok(MemoryLookup::new());
    };
    let path = dir.join(format!("{}.json", model_name));
    if !path.exists() {
        return Ok(MemoryLookup::new());
    }

    let content = fs::read_to_string(&path).map_err(|e| {
        CliError::config_error(format!("Failed to read records {:?}: {}", path, e))
    })?;
    let records: Vec<Value> = serde_json::from_str(&content).map_err(|e| {
        CliError::config_error(format!("Records file {:?} must be a JSON array: {}", path, e))
    })?;

    Ok(MemoryLookup::new().with_records(records))
}

#[cfg(test)]
mod tests {
    use super::super::errors::CliErrorCode;
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_config(temp_dir: &TempDir, extra: Value) -> PathBuf {
        let config_path = temp_dir.path().join("docgate.json");
        let mut config = json!({
            "models_dir": temp_dir.path().join("models").to_string_lossy(),
            "records_dir": temp_dir.path().join("records").to_string_lossy(),
        });
        if let (Some(base), Some(extra)) = (config.as_object_mut(), extra.as_object()) {
            for (k, v) in extra {
                base.insert(k.clone(), v.clone());
            }
        }
        fs::write(&config_path, config.to_string()).unwrap();
        config_path
    }

    fn write_fixtures(temp_dir: &TempDir) {
        let models = temp_dir.path().join("models");
        let records = temp_dir.path().join("records");
        fs::create_dir_all(&models).unwrap();
        fs::create_dir_all(&records).unwrap();

        let users = json!({
            "name": "users",
            "required": ["email"],
            "formats": [
                { "path": "email", "type": "email" },
                { "path": "phone", "type": "phone" },
                { "path": "color", "type": "rgb" }
            ],
            "policyFormats": {
                "billing": [{ "path": "vat", "type": "int" }]
            },
            "unique": ["email"]
        });
        fs::write(models.join("users.json"), users.to_string()).unwrap();
        fs::write(
            records.join("users.json"),
            json!([{ "_id": "u1", "email": "ada@x.io" }]).to_string(),
        )
        .unwrap();
    }

    fn request(value: Value) -> ValidationRequest {
        ValidationRequest::from_value(value).unwrap()
    }

    #[test]
    fn test_config_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = write_config(&temp_dir, json!({}));

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.default_phone_region, "US");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.phone_region().unwrap(), PhoneRegion::Us);
    }

    #[test]
    fn test_config_rejects_unknown_region() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = write_config(&temp_dir, json!({ "default_phone_region": "ZZ" }));

        let err = Config::load(&config_path).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::ConfigError);
    }

    #[test]
    fn test_config_rejects_unknown_log_level() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = write_config(&temp_dir, json!({ "log_level": "verbose" }));

        assert!(Config::load(&config_path).is_err());
    }

    #[test]
    fn test_config_requires_models_dir() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("docgate.json");
        fs::write(&config_path, "{}").unwrap();

        assert!(Config::load(&config_path).is_err());
    }

    #[test]
    fn test_check_reports_warnings() {
        let temp_dir = TempDir::new().unwrap();
        write_fixtures(&temp_dir);
        let (_config, loader) = boot(&write_config(&temp_dir, json!({}))).unwrap();

        let report = check_report(&loader).unwrap();
        assert_eq!(report["models"], json!(["users"]));
        assert_eq!(report["warnings"].as_array().unwrap().len(), 1);
        assert_eq!(report["warnings"][0]["path"], "color");
    }

    #[test]
    fn test_validate_request_reports_duplicates() {
        let temp_dir = TempDir::new().unwrap();
        write_fixtures(&temp_dir);
        let (config, loader) = boot(&write_config(&temp_dir, json!({}))).unwrap();
        let model = loader.require("users").unwrap();

        let response = validate_request(
            &config,
            model,
            &request(json!({
                "document": { "email": "ADA@x.io" },
                "context": { "isNewRecord": true }
            })),
        )
        .unwrap();

        assert_eq!(response["status"], "ok");
        assert_eq!(response["data"]["valid"], false);
        assert_eq!(response["data"]["errors"]["email"]["type"], "unique");
        assert_eq!(response["data"]["normalized"]["email"], "ada@x.io");
    }

    #[test]
    fn test_validate_request_uses_configured_region() {
        let temp_dir = TempDir::new().unwrap();
        write_fixtures(&temp_dir);
        let config_path = write_config(&temp_dir, json!({ "default_phone_region": "FR" }));
        let (config, loader) = boot(&config_path).unwrap();
        let model = loader.require("users").unwrap();

        let response = validate_request(
            &config,
            model,
            &request(json!({ "document": { "email": "new@x.io", "phone": "0612345678" } })),
        )
        .unwrap();

        assert_eq!(response["data"]["valid"], true);
        assert_eq!(response["data"]["normalized"]["phone"], "+33612345678");
    }

    #[test]
    fn test_malformed_document_is_error_response() {
        let temp_dir = TempDir::new().unwrap();
        write_fixtures(&temp_dir);
        let (config, loader) = boot(&write_config(&temp_dir, json!({}))).unwrap();
        let model = loader.require("users").unwrap();

        let response =
            validate_request(&config, model, &request(json!({ "document": [1, 2] }))).unwrap();
        assert_eq!(response["status"], "error");
        assert_eq!(response["code"], "DOCGATE_MALFORMED_DOCUMENT");
    }

    #[test]
    fn test_normalize_request() {
        let temp_dir = TempDir::new().unwrap();
        write_fixtures(&temp_dir);
        let (config, loader) = boot(&write_config(&temp_dir, json!({}))).unwrap();
        let model = loader.require("users").unwrap();

        let response = normalize_request(
            &config,
            model,
            &request(json!({
                "document": { "vat": "19", "email": "bad" },
                "context": { "policies": ["billing"] }
            })),
        )
        .unwrap();

        assert_eq!(response["data"], json!({ "vat": 19, "email": "bad" }));
    }

    #[test]
    fn test_unknown_model() {
        let temp_dir = TempDir::new().unwrap();
        write_fixtures(&temp_dir);
        let (_config, loader) = boot(&write_config(&temp_dir, json!({}))).unwrap();

        let err: CliError = loader.require("ghosts").unwrap_err().into();
        assert_eq!(err.code(), &CliErrorCode::ModelError);
    }

    #[test]
    fn test_load_lookup_without_records() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load(&write_config(&temp_dir, json!({}))).unwrap();

        let lookup = load_lookup(&config, "users").unwrap();
        assert!(lookup.is_empty());
    }

    #[test]
    fn test_request_context_defaults() {
        let parsed = request(json!({ "document": {} }));
        assert_eq!(parsed.context, ValidationContext::default());

        let err = ValidationRequest::from_value(json!({ "context": {} })).unwrap_err();
        assert_eq!(err.code(), &CliErrorCode::InvalidRequest);
    }
}
