//! Error types for the content-url plugin

use miette::Diagnostic;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ContentUrlError>;

/// Errors that can occur while configuring or running the content-url transform
#[derive(Error, Debug, Diagnostic)]
pub enum ContentUrlError {
    /// Option object has the wrong shape
    #[error("content-url options are configured incorrectly: `{field}` must be {expected}")]
    #[diagnostic(
        code(fob::content_url::invalid_options),
        help("Check the plugin options; see the fob-plugin-content-url docs for accepted types")
    )]
    InvalidOptions { field: String, expected: String },

    /// Wrapper template is missing its placeholder
    #[error("wrapper template `{template}` does not contain a `{{{{{variable}}}}}` placeholder")]
    #[diagnostic(
        code(fob::content_url::missing_placeholder),
        help("Add the placeholder where the value should go, e.g. `<img src=\"{{{{url}}}}\">`")
    )]
    MissingPlaceholder { template: String, variable: String },

    /// Name template uses an unsupported hash function or digest
    #[error("unsupported hash parameter `{parameter}` in `{placeholder}`")]
    #[diagnostic(
        code(fob::content_url::unsupported_hash),
        help("Supported hash types: sha256, blake3, seahash. Supported digests: hex, base64url")
    )]
    UnsupportedHash {
        placeholder: String,
        parameter: String,
    },

    /// Regex option failed to compile
    #[error("invalid regular expression for `{field}`: {source}")]
    #[diagnostic(code(fob::content_url::invalid_regex))]
    InvalidRegex {
        field: String,
        #[source]
        source: regex::Error,
    },

    /// Options file could not be loaded
    #[error("failed to load content-url options: {message}")]
    #[diagnostic(code(fob::content_url::config_load))]
    ConfigLoad { message: String },
}

impl ContentUrlError {
    pub fn invalid_options(field: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::InvalidOptions {
            field: field.into(),
            expected: expected.into(),
        }
    }

    pub fn missing_placeholder(template: impl Into<String>, variable: impl Into<String>) -> Self {
        Self::MissingPlaceholder {
            template: template.into(),
            variable: variable.into(),
        }
    }

    pub fn unsupported_hash(placeholder: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::UnsupportedHash {
            placeholder: placeholder.into(),
            parameter: parameter.into(),
        }
    }

    pub fn invalid_regex(field: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidRegex {
            field: field.into(),
            source,
        }
    }

    pub fn config_load(message: impl Into<String>) -> Self {
        Self::ConfigLoad {
            message: message.into(),
        }
    }
}
