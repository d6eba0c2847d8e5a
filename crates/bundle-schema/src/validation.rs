//! Bundle validation utilities.

use crate::artifact::{INFO_ENTRY, TOMBSTONE_PREFIX};
use crate::schema;
use jsonschema::JSONSchema;
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;

/// Validation error type.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Schema validation failed: {0}")]
    SchemaError(String),

    #[error("Missing required entry: {0}")]
    MissingEntry(String),

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Unexpected entry: {0}")]
    UnexpectedEntry(String),

    #[error("Too many tombstones: {count} (max {max})")]
    TooManyTombstones { count: usize, max: usize },

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result of bundle validation.
#[derive(Debug)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.valid = false;
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    /// Fold another result into this one.
    pub fn merge(&mut self, other: ValidationResult) {
        for error in other.errors {
            self.add_error(error);
        }
        self.warnings.extend(other.warnings);
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate an info.json document against the JSON schema.
pub fn validate_info(info: &Value) -> Result<ValidationResult, ValidationError> {
    let mut result = ValidationResult::new();

    let schema_value = schema::info_schema();
    let compiled = JSONSchema::compile(&schema_value)
        .map_err(|e| ValidationError::SchemaError(e.to_string()))?;

    let validation = compiled.validate(info);
    if let Err(errors) = validation {
        for error in errors {
            result.add_error(ValidationError::SchemaError(format!(
                "{} at {}",
                error, error.instance_path
            )));
        }
    }

    Ok(result)
}

/// Validate the entry layout of an archive.
///
/// A bundle holds exactly one `info.json`, at most `max_tombstones` entries
/// directly under `tombstones/`, and otherwise only top-level log files.
pub fn validate_layout(entry_names: &[String], max_tombstones: usize) -> ValidationResult {
    let mut result = ValidationResult::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut tombstones = 0;
    let mut logs = 0;

    for name in entry_names {
        if !seen.insert(name.as_str()) {
            result.add_error(ValidationError::DuplicateEntry(name.clone()));
            continue;
        }

        if name == INFO_ENTRY {
            continue;
        }

        if let Some(file) = name.strip_prefix(TOMBSTONE_PREFIX) {
            if file.is_empty() || file.contains('/') {
                result.add_error(ValidationError::UnexpectedEntry(name.clone()));
            } else {
                tombstones += 1;
            }
        } else if name.contains('/') {
            result.add_error(ValidationError::UnexpectedEntry(name.clone()));
        } else {
            logs += 1;
        }
    }

    if !seen.contains(INFO_ENTRY) {
        result.add_error(ValidationError::MissingEntry(INFO_ENTRY.to_string()));
    }

    if tombstones > max_tombstones {
        result.add_error(ValidationError::TooManyTombstones {
            count: tombstones,
            max: max_tombstones,
        });
    }

    if logs > 2 {
        result.add_warning(format!(
            "{} top-level log entries (expected at most a current and a previous log)",
            logs
        ));
    }

    result
}

/// Validate a complete bundle: entry layout plus info.json contents.
pub fn validate_bundle(
    entry_names: &[String],
    info_json: Option<&[u8]>,
    max_tombstones: usize,
) -> Result<ValidationResult, ValidationError> {
    let mut result = validate_layout(entry_names, max_tombstones);

    if let Some(bytes) = info_json {
        let info: Value = serde_json::from_slice(bytes)?;
        result.merge(validate_info(&info)?);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn valid_info() -> Value {
        serde_json::json!({
            "os_ver": "13",
            "api_level": 33,
            "device": "Xiaomi 2201123C",
            "abi_list": "arm64-v8a,armeabi-v7a,armeabi",
            "os_arch64": true,
            "prebuilt": true,
            "app_id": "tv.danmaku.bili",
            "app_ver_name": "7.60.0",
            "app_ver_code": 7600300,
            "app_arch64": true,
            "module_ver_name": "0.1.0",
            "module_ver_code": 100,
            "module_settings": { "a": "1", "hidden": true }
        })
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_validate_info_minimal() {
        let result = validate_info(&valid_info()).unwrap();
        assert!(result.valid, "Errors: {:?}", result.errors);
    }

    #[test]
    fn test_validate_info_missing_field() {
        let mut info = valid_info();
        info.as_object_mut().unwrap().remove("app_arch64");

        let result = validate_info(&info).unwrap();
        assert!(!result.valid);
    }

    #[test]
    fn test_validate_info_wrong_types() {
        let mut info = valid_info();
        info["os_arch64"] = serde_json::json!("true");
        info["app_ver_code"] = serde_json::json!(1.5);

        let result = validate_info(&info).unwrap();
        assert_eq!(result.errors.len(), 2, "Errors: {:?}", result.errors);
    }

    #[test]
    fn test_validate_layout_ok() {
        let result = validate_layout(
            &names(&[
                "tombstones/tombstone_01",
                "tombstones/tombstone_00",
                "log.txt",
                "old_log.txt",
                "info.json",
            ]),
            5,
        );
        assert!(result.valid, "Errors: {:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_validate_layout_problems() {
        let result = validate_layout(
            &names(&[
                "tombstones/a",
                "tombstones/b",
                "tombstones/c/nested",
                "tombstones/a",
                "other/file",
            ]),
            1,
        );

        let messages: Vec<String> = result.errors.iter().map(|e| e.to_string()).collect();
        assert_eq!(
            messages,
            vec![
                "Unexpected entry: tombstones/c/nested".to_string(),
                "Duplicate entry: tombstones/a".to_string(),
                "Unexpected entry: other/file".to_string(),
                "Missing required entry: info.json".to_string(),
                "Too many tombstones: 2 (max 1)".to_string(),
            ]
        );
    }

    #[test]
    fn test_validate_bundle_checks_info() {
        let info = serde_json::to_vec(&serde_json::json!({ "os_ver": "13" })).unwrap();
        let result = validate_bundle(&names(&["info.json"]), Some(&info), 5).unwrap();
        assert!(!result.valid);
    }
}
