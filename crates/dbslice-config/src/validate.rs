use std::collections::{HashMap, HashSet};

use dbslice_core::Table;
use jsonschema::JSONSchema;
use serde_json::Value;
use tracing::debug;

use crate::errors::{ConfigError, IssueSeverity, ValidationIssue, ValidationReport};
use crate::model::{CONFIG_VERSION, SubsetConfig, TableConditions, VirtualReferences};

/// Validated config with accumulated warnings.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    pub config: SubsetConfig,
    pub warnings: Vec<ValidationIssue>,
}

/// Validate a config document against the config JSON Schema.
pub fn validate_config_json(
    config_json: &Value,
    config_schema: &Value,
) -> Result<ValidationReport, ConfigError> {
    let compiled =
        JSONSchema::compile(config_schema).map_err(|err| ConfigError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();

    if let Err(errors) = compiled.validate(config_json) {
        for error in errors {
            let path = normalized_json_pointer(&error.instance_path.to_string());
            report.push_error(ValidationIssue::error(
                "schema_validation",
                path,
                error.to_string(),
            ));
        }
    }

    Ok(report)
}

/// Validate a parsed config against the tables it will be applied to.
pub fn validate_config_against_tables(config: &SubsetConfig, tables: &[Table]) -> ValidationReport {
    let mut report = ValidationReport::default();

    if config.config_version != CONFIG_VERSION {
        report.push_error(
            ValidationIssue::error(
                "unsupported_config_version",
                "/config_version",
                format!(
                    "config_version '{}' is not supported",
                    config.config_version
                ),
            )
            .with_hint(format!("set config_version to '{CONFIG_VERSION}'")),
        );
    }

    let index: HashMap<(&str, &str), &Table> = tables
        .iter()
        .map(|t| ((t.schema.as_str(), t.name.as_str()), t))
        .collect();

    validate_tables(&config.tables, &index, &mut report);
    validate_virtual_references(&config.virtual_references, &index, &mut report);

    debug!(
        event = "config_validated",
        errors = report.errors.len(),
        warnings = report.warnings.len()
    );
    report
}

/// Validate the config end-to-end, returning structured issues on failure.
pub fn validate_config(
    config_json: &Value,
    config_schema: &Value,
    tables: &[Table],
) -> Result<ValidatedConfig, ValidationReport> {
    let structural = match validate_config_json(config_json, config_schema) {
        Ok(report) => report,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push_error(ValidationIssue::error(
                "schema_validation",
                "/",
                err.to_string(),
            ));
            return Err(report);
        }
    };

    if !structural.is_ok() {
        return Err(structural);
    }

    let config: SubsetConfig = match serde_json::from_value(config_json.clone()) {
        Ok(config) => config,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push_error(ValidationIssue::error(
                "invalid_config_json",
                "/",
                err.to_string(),
            ));
            return Err(report);
        }
    };

    let report = validate_config_against_tables(&config, tables);
    if !report.is_ok() {
        return Err(report);
    }

    Ok(ValidatedConfig {
        config,
        warnings: report.warnings,
    })
}

fn validate_tables(
    entries: &[TableConditions],
    index: &HashMap<(&str, &str), &Table>,
    report: &mut ValidationReport,
) {
    let mut seen = HashSet::new();

    for (idx, entry) in entries.iter().enumerate() {
        let base_path = format!("/tables/{idx}");

        if !index.contains_key(&(entry.schema.as_str(), entry.table.as_str())) {
            report.push_error(ValidationIssue::error(
                "unknown_table",
                format!("{base_path}/table"),
                format!("table '{}.{}' not found in catalog", entry.schema, entry.table),
            ));
        }

        if !seen.insert((entry.schema.as_str(), entry.table.as_str())) {
            report.push_error(
                ValidationIssue::error(
                    "duplicate_table",
                    base_path.clone(),
                    format!("conditions for '{}.{}' are declared twice", entry.schema, entry.table),
                )
                .with_hint("merge the conditions into a single entry"),
            );
        }

        if entry.conditions.is_empty() {
            report.push_warning(ValidationIssue::new(
                IssueSeverity::Warning,
                "empty_conditions",
                format!("{base_path}/conditions"),
                format!("'{}.{}' has no conditions", entry.schema, entry.table),
                Some("remove the entry or add a condition".to_string()),
            ));
        }

        for (cond_idx, condition) in entry.conditions.iter().enumerate() {
            if condition.trim().is_empty() {
                report.push_error(ValidationIssue::error(
                    "blank_condition",
                    format!("{base_path}/conditions/{cond_idx}"),
                    "condition must be a non-empty SQL predicate",
                ));
            }
        }
    }
}

fn validate_virtual_references(
    entries: &[VirtualReferences],
    index: &HashMap<(&str, &str), &Table>,
    report: &mut ValidationReport,
) {
    for (idx, entry) in entries.iter().enumerate() {
        let base_path = format!("/virtual_references/{idx}");

        if !index.contains_key(&(entry.schema.as_str(), entry.table.as_str())) {
            report.push_error(ValidationIssue::error(
                "unknown_virtual_source",
                format!("{base_path}/table"),
                format!("table '{}.{}' not found in catalog", entry.schema, entry.table),
            ));
        }

        for (ref_idx, reference) in entry.references.iter().enumerate() {
            let ref_path = format!("{base_path}/references/{ref_idx}");
            let Some(target) = index.get(&(reference.schema.as_str(), reference.name.as_str()))
            else {
                report.push_error(ValidationIssue::error(
                    "unknown_virtual_target",
                    format!("{ref_path}/name"),
                    format!(
                        "referenced table '{}.{}' not found in catalog",
                        reference.schema, reference.name
                    ),
                ));
                continue;
            };

            if target.primary_key.is_empty() {
                report.push_error(
                    ValidationIssue::error(
                        "virtual_target_without_pk",
                        format!("{ref_path}/name"),
                        format!("referenced table '{target}' has no primary key"),
                    )
                    .with_hint("virtual references must target a primary key"),
                );
                continue;
            }

            if reference.columns.len() != target.primary_key.len() {
                report.push_error(ValidationIssue::error(
                    "virtual_key_count_mismatch",
                    format!("{ref_path}/columns"),
                    format!(
                        "{} column(s) given but '{target}' has a {}-column primary key",
                        reference.columns.len(),
                        target.primary_key.len()
                    ),
                ));
            }
        }
    }
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}
