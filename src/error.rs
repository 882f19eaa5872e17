use crate::providers::ProviderError;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "providers[2].min_confidence")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected range, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "classifier_builder", "image_validator")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the classification engine.
///
/// Only `InvalidInput` and `Cancelled` can come out of a classification request;
/// `Configuration` is raised while building a classifier and provider failures
/// are absorbed by the failover loop.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Invalid input: {message}{}", format_context(.context))]
    InvalidInput {
        message: String,
        context: ErrorContext,
    },

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Classification request cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Create a new invalid-input error with structured context
    pub fn invalid_input_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::InvalidInput {
            message: msg.into(),
            context,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } | Error::InvalidInput { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidInput { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_context() {
        let err = Error::configuration_with_context(
            "min_confidence out of range",
            ErrorContext::new()
                .with_field_path("providers[1].min_confidence")
                .with_source("classifier_builder"),
        );
        assert_eq!(
            err.to_string(),
            "Configuration error: min_confidence out of range (field: providers[1].min_confidence, source: classifier_builder)"
        );
        assert!(err.is_configuration());
    }

    #[test]
    fn test_display_without_context() {
        let err = Error::invalid_input_with_context("empty payload", ErrorContext::new());
        assert_eq!(err.to_string(), "Invalid input: empty payload");
        assert!(err.context().is_some());
    }
}
