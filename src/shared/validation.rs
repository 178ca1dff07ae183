//! Validation Utilities

use validator::{Validate, ValidationErrors};

use super::error::{FieldError, GatewayError};

/// Convert validation errors to a gateway rejection
pub fn validation_error(errors: ValidationErrors) -> GatewayError {
    let mut field_errors: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| FieldError {
                field: field.to_string(),
                message: e
                    .message
                    .clone()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            })
        })
        .collect();
    field_errors.sort_by(|a, b| a.field.cmp(&b.field));

    let message = field_errors
        .first()
        .map(|e| format!("{}: {}", e.field, e.message))
        .unwrap_or_else(|| "Validation failed".into());

    GatewayError::Validation(message)
}

/// Run `validator` rules on an inbound payload
pub fn validate_payload<T: Validate>(payload: &T) -> Result<(), GatewayError> {
    payload.validate().map_err(validation_error)
}
