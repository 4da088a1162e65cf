//! Validated JSON extractor with automatic validation.
//!
//! This module provides [`ValidateJson`], an enhanced JSON extractor that
//! combines deserialization with automatic validation using the `validator` crate.

use std::borrow::Cow;
use std::collections::HashMap;

use axum::extract::{FromRequest, Request};
use derive_more::{Deref, DerefMut, From};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationErrors};

use super::Json;
use crate::handler::{Error, ErrorKind};
use crate::utility::tracing_targets::TRACING_TARGET_VALIDATION;

/// Enhanced JSON extractor with automatic validation using the `validator` crate.
///
/// Deserialization failures are reported by [`Json`], validation failures
/// answer `400 Bad Request` with one message per failing field.
#[must_use]
#[derive(Debug, Clone, Copy, Default, Deref, DerefMut, From)]
pub struct ValidateJson<T>(pub T);

impl<T> ValidateJson<T> {
    /// Creates a new instance of [`ValidateJson`].
    #[inline]
    pub fn new(inner: T) -> Self {
        Self(inner)
    }

    /// Returns the inner validated value.
    #[inline]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T, S> FromRequest<S> for ValidateJson<T>
where
    T: DeserializeOwned + Validate + 'static,
    S: Send + Sync,
{
    type Rejection = Error<'static>;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(data) = <Json<T> as FromRequest<S>>::from_request(req, state).await?;

        data.validate()?;
        Ok(Self::new(data))
    }
}

/// Formats length validation errors.
fn format_length_error(
    field: &str,
    params: &HashMap<Cow<'static, str>, serde_json::Value>,
) -> String {
    let number = |key: &str| params.get(key).and_then(serde_json::Value::as_u64);

    match (number("min"), number("max")) {
        (Some(min), Some(max)) => format!(
            "Field '{}' must be between {} and {} characters long",
            field, min, max
        ),
        (Some(min), None) => format!("Field '{}' must be at least {} characters long", field, min),
        (None, Some(max)) => format!("Field '{}' must be at most {} characters long", field, max),
        (None, None) => format!("Field '{}' has invalid length", field),
    }
}

/// Formats validation errors with context-aware, user-friendly messages.
fn format_validation_error(field: &str, error: &validator::ValidationError) -> String {
    if let Some(custom_message) = &error.message {
        return format!("Field '{}': {}", field, custom_message);
    }

    match error.code.as_ref() {
        "required" => format!("Field '{}' is required and cannot be empty", field),
        "length" => format_length_error(field, &error.params),
        "url" => format!("Field '{}' must be a valid URL", field),
        code => format!("Field '{}' failed validation: {}", field, code),
    }
}

impl From<ValidationErrors> for Error<'static> {
    fn from(errors: ValidationErrors) -> Self {
        let mut error_messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, field_errors)| {
                field_errors
                    .iter()
                    .map(move |error| format_validation_error(field, error))
            })
            .collect();
        error_messages.sort();

        let user_message = match error_messages.as_slice() {
            [] => "Validation failed".to_string(),
            [single_error] => single_error.clone(),
            multiple => multiple.join(". "),
        };

        tracing::warn!(
            target: TRACING_TARGET_VALIDATION,
            errors = ?errors.field_errors(),
            "Request validation failed"
        );

        ErrorKind::BadRequest.with_message(user_message)
    }
}

impl<T> aide::OperationInput for ValidateJson<T>
where
    T: schemars::JsonSchema,
{
    fn operation_input(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) {
        Json::<T>::operation_input(ctx, operation);
    }

    fn inferred_early_responses(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Vec<(Option<u16>, aide::openapi::Response)> {
        Json::<T>::inferred_early_responses(ctx, operation)
    }
}

#[cfg(test)]
mod tests {
    use validator::ValidationError;

    use super::*;

    #[test]
    fn custom_message_wins() {
        let error = ValidationError::new("length").with_message("must be a non-empty string".into());
        assert_eq!(
            format_validation_error("url", &error),
            "Field 'url': must be a non-empty string"
        );
    }

    #[test]
    fn length_without_message_uses_params() {
        let mut error = ValidationError::new("length");
        error.add_param("min".into(), &1);
        assert_eq!(
            format_validation_error("url", &error),
            "Field 'url' must be at least 1 characters long"
        );
    }

    #[test]
    fn validation_errors_become_bad_request() {
        let mut errors = ValidationErrors::new();
        errors.add(
            "url",
            ValidationError::new("length").with_message("must be a non-empty string".into()),
        );

        let error = Error::from(errors);
        assert_eq!(error.kind(), ErrorKind::BadRequest);
        assert_eq!(
            error.message(),
            Some("Field 'url': must be a non-empty string")
        );
    }
}
