//! Validation Utilities

use validator::{Validate, ValidationErrors};

use super::error::{AppError, FieldError};

/// Key validator files struct-level (schema) errors under.
const SCHEMA_KEY: &str = "__all__";

/// Flatten validator errors into field errors, sorted by field name. Schema
/// errors are reported under their error code.
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut fields: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            let field = field.to_string();
            errs.iter().map(move |e| FieldError {
                field: if field == SCHEMA_KEY {
                    e.code.to_string()
                } else {
                    field.clone()
                },
                message: e
                    .message
                    .clone()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            })
        })
        .collect();
    fields.sort_by(|a, b| a.field.cmp(&b.field));
    fields
}

/// Convert validation errors to AppError
pub fn validation_error(errors: ValidationErrors) -> AppError {
    AppError::Validation(field_errors(&errors))
}

/// Run `validator` rules on a request body.
pub fn validate<T: Validate>(value: &T) -> Result<(), AppError> {
    value.validate().map_err(validation_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Validate)]
    #[validate(schema(function = "ordered"))]
    struct Page {
        #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
        limit: u32,
        first: u32,
        last: u32,
    }

    fn ordered(page: &Page) -> Result<(), validator::ValidationError> {
        if page.first > page.last {
            let mut err = validator::ValidationError::new("range");
            err.message = Some("first must not be after last".into());
            return Err(err);
        }
        Ok(())
    }

    fn page(limit: u32) -> Page {
        Page {
            limit,
            first: 0,
            last: 0,
        }
    }

    #[test]
    fn test_valid_value_passes() {
        assert!(validate(&page(20)).is_ok());
    }

    #[test]
    fn test_message_carries_field_name() {
        let err = validate(&page(0)).unwrap_err();
        assert_eq!(err.to_string(), "Validation error: limit: limit must be between 1 and 100");
    }

    #[test]
    fn test_schema_error_named_by_code() {
        let err = validate(&Page {
            limit: 10,
            first: 5,
            last: 1,
        })
        .unwrap_err();
        match err {
            AppError::Validation(fields) => {
                assert_eq!(fields, vec![FieldError::new("range", "first must not be after last")]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
