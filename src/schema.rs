//! JSON-schema validation of a data file, reporting every problem rather than
//! just the first one we trip over.

use std::{io::ErrorKind, path::Path};

use serde_json::Value;

use crate::errors::{ErrorLayer, Result, ToolError};

/// Load and parse a JSON file, naming the file in any error.
pub fn load_json_file(path: &Path) -> Result<Value> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ToolError::sticky(
                ErrorLayer::BadInput,
                format!("The file '{}' was not found.", path.display()),
            ));
        }
        Err(e) => {
            return Err(ToolError::sticky(
                ErrorLayer::DataLayer,
                format!("The file '{}' could not be read: {}", path.display(), e),
            ));
        }
    };

    serde_json::from_str(&contents).map_err(|e| {
        ToolError::sticky(
            ErrorLayer::BadInput,
            format!("The file '{}' is not a valid JSON: {}", path.display(), e),
        )
    })
}

pub fn parse_inline_schema(schema: &str) -> Result<Value> {
    serde_json::from_str(schema).map_err(|e| {
        ToolError::sticky(
            ErrorLayer::BadInput,
            format!("The schema string is not a valid JSON: {}", e),
        )
    })
}

/// Pick the schema from the inline string if given, otherwise from the file.
pub fn resolve_schema(inline: Option<&str>, file: Option<&Path>) -> Result<Value> {
    match (inline, file) {
        (Some(inline), _) => parse_inline_schema(inline),
        (None, Some(file)) => load_json_file(file),
        (None, None) => Err(ToolError::sticky(
            ErrorLayer::BadInput,
            "No schema provided.",
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationReport {
    Valid,
    /// Every way the data fails the schema, in the order the validator found
    /// them.
    Invalid(Vec<String>),
    /// The schema itself isn't a valid JSON schema, so the data was never
    /// checked.
    SchemaError(String),
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationReport::Valid)
    }

    /// 0 when valid, 1 when the data fails the schema, 2 when the schema
    /// itself is broken (matching the exit code for unusable input).
    pub fn exit_code(&self) -> u8 {
        match self {
            ValidationReport::Valid => 0,
            ValidationReport::Invalid(_) => 1,
            ValidationReport::SchemaError(_) => 2,
        }
    }

    /// The human-readable text the CLI prints.
    pub fn render(&self) -> String {
        match self {
            ValidationReport::Valid => "JSON is valid!\nNo validation errors found.\n".to_string(),
            ValidationReport::Invalid(errors) => {
                let mut out = String::from("Validation errors:\n");
                for error in errors {
                    out.push_str(error);
                    out.push('\n');
                }
                out
            }
            ValidationReport::SchemaError(message) => format!("Schema error: {}\n", message),
        }
    }
}

pub fn validate_document(data: &Value, schema: &Value) -> ValidationReport {
    let validator = match jsonschema::validator_for(schema) {
        Ok(validator) => validator,
        Err(err) => {
            warn!(error = %err, "schema failed to compile");
            return ValidationReport::SchemaError(err.to_string());
        }
    };

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|err| {
            let location = err.instance_path.to_string();
            if location.is_empty() {
                format!("Validation error: {}", err)
            } else {
                format!("Validation error at {}: {}", location, err)
            }
        })
        .collect();

    if errors.is_empty() {
        ValidationReport::Valid
    } else {
        ValidationReport::Invalid(errors)
    }
}

/// Load the data file and the schema and validate one against the other.
/// Any problem loading either input is an error; nothing is validated
/// against partially loaded data.
pub fn validate_files(
    data_path: &Path,
    inline_schema: Option<&str>,
    schema_path: Option<&Path>,
) -> Result<ValidationReport> {
    let data = load_json_file(data_path)?;
    let schema = resolve_schema(inline_schema, schema_path)?;
    Ok(validate_document(&data, &schema))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::utils::temp_dir::TempDir;

    fn person_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "age": { "type": "integer", "minimum": 0 }
            },
            "required": ["name", "age"]
        })
    }

    #[test]
    fn valid_document_is_valid() {
        let report = validate_document(&json!({"name": "Ana", "age": 31}), &person_schema());
        assert_eq!(report, ValidationReport::Valid);
        assert!(report.render().starts_with("JSON is valid!"));
    }

    #[test]
    fn every_error_is_reported() {
        let report = validate_document(&json!({"name": 7, "age": -1}), &person_schema());
        match report {
            ValidationReport::Invalid(errors) => {
                assert_eq!(errors.len(), 2, "{:?}", errors);
                assert!(errors.iter().any(|e| e.contains("/name")));
                assert!(errors.iter().any(|e| e.contains("/age")));
            }
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn root_level_errors_have_no_location() {
        let report = validate_document(&json!({}), &person_schema());
        match report {
            ValidationReport::Invalid(errors) => {
                assert_eq!(errors.len(), 2, "{:?}", errors);
                assert!(errors.iter().all(|e| e.starts_with("Validation error: ")));
            }
            other => panic!("expected Invalid, got {:?}", other),
        }
    }

    #[test]
    fn empty_object_is_still_validated() {
        let schema = json!({"type": "array"});
        assert!(!validate_document(&json!({}), &schema).is_valid());
    }

    #[test]
    fn malformed_schema_is_reported_separately() {
        let report = validate_document(&json!(1), &json!({"type": "not-a-type"}));
        assert!(matches!(report, ValidationReport::SchemaError(_)));
        assert!(report.render().starts_with("Schema error: "));
    }

    #[test]
    fn inline_schema_wins_over_file() {
        let schema = resolve_schema(
            Some(r#"{"type": "string"}"#),
            Some(Path::new("/nonexistent/schema.json")),
        )
        .unwrap();
        assert_eq!(schema, json!({"type": "string"}));
    }

    #[test]
    fn missing_schema_is_bad_input() {
        let err = resolve_schema(None, None).unwrap_err();
        assert_eq!(err.message(), "No schema provided.");
    }

    #[test]
    fn bad_inline_schema_is_bad_input() {
        let err = parse_inline_schema("{nope").unwrap_err();
        assert!(err.message().starts_with("The schema string is not a valid JSON"));
    }

    #[test]
    fn file_errors_name_the_file() {
        let dir = TempDir::new("opstools-schema");
        let missing = dir.join("missing.json");
        let broken = dir.join("broken.json");
        std::fs::write(&broken, "{\"a\": ").unwrap();

        let err = load_json_file(&missing).unwrap_err();
        assert_eq!(
            err.message(),
            format!("The file '{}' was not found.", missing.display())
        );

        let err = load_json_file(&broken).unwrap_err();
        assert!(err
            .message()
            .starts_with(&format!("The file '{}' is not a valid JSON", broken.display())));
    }
}
