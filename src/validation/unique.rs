//! Uniqueness checker
//!
//! Asks a [`DuplicateLookup`] backend whether another record already holds
//! the value at each unique path. Lookups for all paths run concurrently;
//! the first backend failure aborts the stage.

use std::collections::BTreeSet;
use std::future::Future;
use std::pin::Pin;

use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{LookupError, ValidationError, ValidationResult};
use super::flatten::FlatDocument;
use super::format::{categorical_match, display_value};
use super::report::{ErrorEntry, ErrorReport, StageOutput};
use crate::model::{is_valid_path, ModelDescriptor};

/// Records already holding a looked-up value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DuplicateList {
    pub list: Vec<Value>,
}

impl DuplicateList {
    pub fn new(list: Vec<Value>) -> Self {
        Self { list }
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }
}

/// Duplicate lookup backend
///
/// Abstracts the repository queried for existing values.
pub trait DuplicateLookup: Send + Sync {
    /// Finds records whose `path` holds `value`, excluding the record
    /// identified by `exclude_id`.
    fn find_duplicates<'a>(
        &'a self,
        value: &'a Value,
        path: &'a str,
        exclude_id: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<DuplicateList, LookupError>> + Send + 'a>>;
}

/// Uniqueness findings and the number of lookups issued for them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniqueCheck {
    pub output: StageOutput,
    pub lookups_issued: usize,
}

/// Checks every unique path of `model` against `lookup`.
///
/// Paths already in `errors_so_far`, or absent, are not looked up.
pub async fn check_unique(
    model: &ModelDescriptor,
    flat: &FlatDocument,
    errors_so_far: &ErrorReport,
    exclude_id: Option<&str>,
    lookup: &dyn DuplicateLookup,
) -> ValidationResult<UniqueCheck> {
    let mut output = StageOutput::new();
    let mut seen = BTreeSet::new();
    let mut candidates: Vec<(&str, Value)> = Vec::new();

    for path in &model.unique {
        if !is_valid_path(path) {
            output.warn(&model.name, Some(path), "malformed unique path, rule skipped");
            continue;
        }
        if !seen.insert(path.as_str()) || errors_so_far.contains(path) || !flat.is_present(path) {
            continue;
        }
        if let Some(value) = flat.value_at(path) {
            candidates.push((path.as_str(), value));
        }
    }

    let lookups = candidates.iter().map(|(path, value)| async move {
        lookup
            .find_duplicates(value, path, exclude_id)
            .await
            .map_err(|source| ValidationError::Lookup {
                path: path.to_string(),
                source,
            })
    });
    let found = try_join_all(lookups).await?;

    for ((path, value), duplicates) in candidates.iter().zip(found) {
        if !duplicates.is_empty() {
            output
                .errors
                .insert(ErrorEntry::duplicate(path, &display_value(value)));
        }
    }

    Ok(UniqueCheck {
        output,
        lookups_issued: candidates.len(),
    })
}

/// In-memory lookup over a fixed set of records
#[derive(Debug)]
pub struct MemoryLookup {
    id_field: String,
    records: Vec<Value>,
}

impl Default for MemoryLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLookup {
    /// Empty lookup identifying records by `_id`
    pub fn new() -> Self {
        Self {
            id_field: "_id".to_string(),
            records: Vec::new(),
        }
    }

    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }

    pub fn with_records(mut self, records: Vec<Value>) -> Self {
        self.records = records;
        self
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn matching(&self, value: &Value, path: &str, exclude_id: Option<&str>) -> DuplicateList {
        let list = self
            .records
            .iter()
            .filter(|record| {
                let id = record.get(&self.id_field).map(display_value);
                !matches!((exclude_id, id), (Some(excluded), Some(id)) if excluded == id)
            })
            .filter(|record| {
                FlatDocument::flatten(record)
                    .ok()
                    .and_then(|flat| flat.value_at(path))
                    .is_some_and(|found| categorical_match(&found, std::slice::from_ref(value)))
            })
            .cloned()
            .collect();

        DuplicateList::new(list)
    }
}

impl DuplicateLookup for MemoryLookup {
    fn find_duplicates<'a>(
        &'a self,
        value: &'a Value,
        path: &'a str,
        exclude_id: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = Result<DuplicateList, LookupError>> + Send + 'a>> {
        let found = self.matching(value, path, exclude_id);
        Box::pin(std::future::ready(Ok(found)))
    }
}
