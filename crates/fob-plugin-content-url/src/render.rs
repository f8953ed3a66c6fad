//! JavaScript code rendering for content-url modules
//!
//! Everything here produces JavaScript source text. Values that end up in the
//! generated module are always JSON string literals, so wrappers only ever see
//! (and return) valid JS expressions.

use base64::Engine;
use regex::Regex;
use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::error::{ContentUrlError, Result};

/// Placeholder variable used by URL wrappers
pub const URL_VARIABLE: &str = "url";

/// Placeholder variable used by content wrappers
pub const CONTENT_VARIABLE: &str = "content";

/// Encode a string as a JSON string literal (the same text `JSON.stringify` yields).
pub fn json_string(value: &str) -> String {
    // Serializing a &str cannot fail
    serde_json::to_string(value).unwrap_or_else(|_| String::from("\"\""))
}

/// Module syntax used to export the rendered expression
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportSyntax {
    /// `module.exports = <expr>`
    #[default]
    CommonJs,
    /// `export default <expr>`
    EsModule,
}

impl ExportSyntax {
    pub fn from_es_module(es_module: bool) -> Self {
        if es_module {
            ExportSyntax::EsModule
        } else {
            ExportSyntax::CommonJs
        }
    }

    pub fn prefix(&self) -> &'static str {
        match self {
            ExportSyntax::CommonJs => "module.exports = ",
            ExportSyntax::EsModule => "export default ",
        }
    }

    /// Render a complete module exporting `expression`
    pub fn export(&self, expression: &str) -> String {
        format!("{}{}", self.prefix(), expression)
    }
}

/// Function wrapper: receives a JS expression, returns a JS expression
pub type WrapperFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Wraps a rendered value before it is exported
#[derive(Clone, Default)]
pub enum Wrapper {
    /// Export the value as-is
    #[default]
    Identity,
    /// String template with a `{{variable}}` placeholder, e.g. `<img src="{{url}}">`
    Template(String),
    /// Custom JS code generator
    Function(WrapperFn),
}

impl Wrapper {
    pub fn template(template: impl Into<String>) -> Self {
        Wrapper::Template(template.into())
    }

    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        Wrapper::Function(Arc::new(f))
    }

    /// Check that a template wrapper contains its placeholder
    pub fn validate(&self, variable: &str) -> Result<()> {
        if let Wrapper::Template(template) = self {
            if !placeholder_regex(variable)?.is_match(template) {
                return Err(ContentUrlError::missing_placeholder(template, variable));
            }
        }
        Ok(())
    }

    /// Wrap `expression`, substituting it for every `{{variable}}` in a template.
    ///
    /// Templates render as a string concatenation:
    /// `"<img src=\"" + expr + "\">"`.
    pub fn render(&self, variable: &str, expression: &str) -> Result<String> {
        match self {
            Wrapper::Identity => Ok(expression.to_string()),
            Wrapper::Function(f) => Ok(f(expression)),
            Wrapper::Template(template) => {
                let re = placeholder_regex(variable)?;
                let parts: Vec<String> = re.split(template).map(json_string).collect();
                if parts.len() < 2 {
                    return Err(ContentUrlError::missing_placeholder(template, variable));
                }
                Ok(parts.join(&format!(" + {} + ", expression)))
            }
        }
    }
}

impl fmt::Debug for Wrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Wrapper::Identity => f.write_str("Identity"),
            Wrapper::Template(t) => f.debug_tuple("Template").field(t).finish(),
            Wrapper::Function(_) => f.write_str("Function(..)"),
        }
    }
}

static URL_PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
static CONTENT_PLACEHOLDER: OnceLock<Regex> = OnceLock::new();

/// Placeholder pattern for `variable`; the two built-in variables compile once
fn placeholder_regex(variable: &str) -> Result<Cow<'static, Regex>> {
    let cell = match variable {
        URL_VARIABLE => &URL_PLACEHOLDER,
        CONTENT_VARIABLE => &CONTENT_PLACEHOLDER,
        _ => return compile_placeholder(variable).map(Cow::Owned),
    };
    if let Some(re) = cell.get() {
        return Ok(Cow::Borrowed(re));
    }
    let re = compile_placeholder(variable)?;
    Ok(Cow::Borrowed(cell.get_or_init(|| re)))
}

fn compile_placeholder(variable: &str) -> Result<Regex> {
    Regex::new(&format!(r"(?i)\{{\{{\s*{}\s*\}}\}}", regex::escape(variable)))
        .map_err(|e| ContentUrlError::invalid_regex("wrapper", e))
}

/// Custom serializer: receives raw bytes, returns the string to embed
pub type SerializerFn = Arc<dyn Fn(&[u8]) -> String + Send + Sync>;

/// How inlined bytes are turned into a string
#[derive(Clone, Default)]
pub enum Serializer {
    /// UTF-8 text (invalid sequences become U+FFFD)
    #[default]
    String,
    /// Standard base64 with padding
    Base64,
    Function(SerializerFn),
}

impl Serializer {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&[u8]) -> String + Send + Sync + 'static,
    {
        Serializer::Function(Arc::new(f))
    }

    /// Parse the name form used in option objects (`"string"` or `"base64"`)
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Serializer::String),
            "base64" => Some(Serializer::Base64),
            _ => None,
        }
    }

    pub fn serialize(&self, content: &[u8]) -> String {
        match self {
            Serializer::String => String::from_utf8_lossy(content).into_owned(),
            Serializer::Base64 => base64::engine::general_purpose::STANDARD.encode(content),
            Serializer::Function(f) => f(content),
        }
    }
}

impl fmt::Debug for Serializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Serializer::String => f.write_str("String"),
            Serializer::Base64 => f.write_str("Base64"),
            Serializer::Function(_) => f.write_str("Function(..)"),
        }
    }
}
