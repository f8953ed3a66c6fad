//! Content-url plugin configuration
//!
//! Options can be built in code with the `with_*` builders, parsed from a
//! JSON option object (`from_value`), or loaded from a TOML/JSON file with
//! environment overrides (`from_file`). Function-valued options (predicates,
//! custom wrappers, path callbacks) are only available through the builders.

use figment::providers::{Env, Format, Json, Toml};
use figment::Figment;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::{ContentUrlError, Result};
use crate::interpolate::HashOptions;
use crate::render::{Serializer, Wrapper, CONTENT_VARIABLE, URL_VARIABLE};

/// Largest resource (in bytes) inlined by default
pub const DEFAULT_MAX_SIZE: f64 = 5120.0;

/// Default output name template
pub const DEFAULT_NAME: &str = "[contenthash].[ext]";

/// Runtime expression prefixed to emitted paths when no public path is configured
///
/// A JS string literal for the output root, so the generated module runs
/// without any bundler-provided global.
pub const DEFAULT_RUNTIME_PUBLIC_PATH: &str = r#""/""#;

/// Module ids handled by default
pub const DEFAULT_TEST: &str =
    r"(?i)\.(svg|png|jpe?g|gif|webp|avif|ico|bmp|woff2?|ttf|otf|eot|mp3|mp4|webm|ogg|wav|wasm)$";

/// Environment prefix for `from_file` overrides
pub const ENV_PREFIX: &str = "FOB_CONTENT_URL_";

/// `(target_url, resource_path, root_context, query)` → `Some(true)` for URL
/// mode, `Some(false)` for content mode, `None` to decide by size
pub type LoadAsUrl = Arc<dyn Fn(&str, &str, &str, &str) -> Option<bool> + Send + Sync>;

/// `(target_url, resource_path, root_context)` → path
pub type PathFn = Arc<dyn Fn(&str, &str, &str) -> String + Send + Sync>;

/// Output or public path: a fixed prefix or a callback
#[derive(Clone)]
pub enum PathOption {
    Static(String),
    Function(PathFn),
}

impl fmt::Debug for PathOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathOption::Static(s) => f.debug_tuple("Static").field(s).finish(),
            PathOption::Function(_) => f.write_str("Function(..)"),
        }
    }
}

/// Configuration for the content-url transform
#[derive(Clone)]
pub struct ContentUrlOptions {
    /// Export with `export default` instead of `module.exports =`
    pub es_module: bool,

    /// Resources up to this many bytes are inlined
    ///
    /// Any number is accepted; a negative limit emits every resource.
    pub max_size: f64,

    /// Output name template (see [`crate::interpolate`])
    pub name: String,

    /// Regex matched against the resource path; captures fill `[N]`
    pub name_regexp: Option<Regex>,

    /// Forces URL or content mode per resource
    pub load_as_url: Option<LoadAsUrl>,

    /// Wraps the URL expression (`{{url}}` placeholder for templates)
    pub url_wrapper: Wrapper,

    /// Wraps the content expression (`{{content}}` placeholder for templates)
    pub content_wrapper: Wrapper,

    /// Prefix joined with the interpolated name, or callback returning the full path
    pub output_path: Option<PathOption>,

    /// Public URL prefix, or callback returning it
    pub public_path: Option<PathOption>,

    /// How inlined bytes become a string
    pub serialize: Serializer,

    /// Expression used as URL prefix when `public_path` is unset
    pub runtime_public_path: String,

    /// Defaults for `[hash]` / `[contenthash]`
    pub hash: HashOptions,

    /// Module ids the plugin handles
    pub test: Regex,

    /// Module ids containing any of these substrings are skipped
    pub exclude: Vec<String>,
}

impl Default for ContentUrlOptions {
    fn default() -> Self {
        Self {
            es_module: false,
            max_size: DEFAULT_MAX_SIZE,
            name: DEFAULT_NAME.to_string(),
            name_regexp: None,
            load_as_url: None,
            url_wrapper: Wrapper::Identity,
            content_wrapper: Wrapper::Identity,
            output_path: None,
            public_path: None,
            serialize: Serializer::String,
            runtime_public_path: DEFAULT_RUNTIME_PUBLIC_PATH.to_string(),
            hash: HashOptions::default(),
            test: default_test(),
            exclude: Vec::new(),
        }
    }
}

fn default_test() -> Regex {
    Regex::new(DEFAULT_TEST).expect("default test regex is valid")
}

impl fmt::Debug for ContentUrlOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentUrlOptions")
            .field("es_module", &self.es_module)
            .field("max_size", &self.max_size)
            .field("name", &self.name)
            .field("name_regexp", &self.name_regexp)
            .field("load_as_url", &self.load_as_url.as_ref().map(|_| ".."))
            .field("url_wrapper", &self.url_wrapper)
            .field("content_wrapper", &self.content_wrapper)
            .field("output_path", &self.output_path)
            .field("public_path", &self.public_path)
            .field("serialize", &self.serialize)
            .field("runtime_public_path", &self.runtime_public_path)
            .field("hash", &self.hash)
            .field("test", &self.test)
            .field("exclude", &self.exclude)
            .finish()
    }
}

impl ContentUrlOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_es_module(mut self, enabled: bool) -> Self {
        self.es_module = enabled;
        self
    }

    pub fn with_max_size(mut self, max_size: impl Into<f64>) -> Self {
        self.max_size = max_size.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_name_regexp(mut self, regexp: Regex) -> Self {
        self.name_regexp = Some(regexp);
        self
    }

    /// Set the URL/content decision predicate
    ///
    /// # Example
    ///
    /// ```rust
    /// use fob_plugin_content_url::ContentUrlOptions;
    ///
    /// // Always emit files imported with `?url`
    /// let options = ContentUrlOptions::new()
    ///     .with_load_as_url(|_target, _resource, _context, query| {
    ///         (query == "?url").then_some(true)
    ///     });
    /// ```
    pub fn with_load_as_url<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str, &str, &str, &str) -> Option<bool> + Send + Sync + 'static,
    {
        self.load_as_url = Some(Arc::new(predicate));
        self
    }

    pub fn with_url_wrapper(mut self, wrapper: Wrapper) -> Self {
        self.url_wrapper = wrapper;
        self
    }

    pub fn with_content_wrapper(mut self, wrapper: Wrapper) -> Self {
        self.content_wrapper = wrapper;
        self
    }

    pub fn with_output_path(mut self, path: impl Into<String>) -> Self {
        self.output_path = Some(PathOption::Static(path.into()));
        self
    }

    pub fn with_output_path_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str, &str) -> String + Send + Sync + 'static,
    {
        self.output_path = Some(PathOption::Function(Arc::new(f)));
        self
    }

    pub fn with_public_path(mut self, path: impl Into<String>) -> Self {
        self.public_path = Some(PathOption::Static(path.into()));
        self
    }

    pub fn with_public_path_fn<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &str, &str) -> String + Send + Sync + 'static,
    {
        self.public_path = Some(PathOption::Function(Arc::new(f)));
        self
    }

    pub fn with_serializer(mut self, serializer: Serializer) -> Self {
        self.serialize = serializer;
        self
    }

    pub fn with_runtime_public_path(mut self, expression: impl Into<String>) -> Self {
        self.runtime_public_path = expression.into();
        self
    }

    pub fn with_hash(mut self, hash: HashOptions) -> Self {
        self.hash = hash;
        self
    }

    pub fn with_test(mut self, test: Regex) -> Self {
        self.test = test;
        self
    }

    /// Add an exclusion pattern
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude.push(pattern.into());
        self
    }

    /// Check wrapper templates
    pub fn validate(&self) -> Result<()> {
        self.url_wrapper.validate(URL_VARIABLE)?;
        self.content_wrapper.validate(CONTENT_VARIABLE)?;
        Ok(())
    }

    /// Parse an option object, merging it over the defaults.
    ///
    /// `null` yields the defaults. Any other non-object value, or a known
    /// field with the wrong type, is rejected.
    ///
    /// # Example
    ///
    /// ```rust
    /// use fob_plugin_content_url::ContentUrlOptions;
    /// use serde_json::json;
    ///
    /// let options = ContentUrlOptions::from_value(json!({
    ///     "maxSize": 300,
    ///     "name": "[path][contenthash].[ext]",
    ///     "urlWrapper": "<img src=\"{{url}}\">"
    /// }))
    /// .unwrap();
    /// assert_eq!(options.max_size, 300.0);
    /// ```
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::Object(map) => RawContentUrlOptions::from_map(&map)?.into_options(),
            _ => Err(ContentUrlError::invalid_options("options", "an object")),
        }
    }

    /// Load options from a `.toml` or `.json` file, overlaid with
    /// `FOB_CONTENT_URL_*` environment variables.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let figment = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Figment::new().merge(Toml::file(path)),
            Some("json") => Figment::new().merge(Json::file(path)),
            other => {
                return Err(ContentUrlError::config_load(format!(
                    "unsupported configuration format: {}",
                    other.unwrap_or("<none>")
                )))
            }
        };

        let raw: RawContentUrlOptions = figment
            .merge(Env::prefixed(ENV_PREFIX))
            .extract()
            .map_err(|e| ContentUrlError::config_load(e.to_string()))?;

        raw.into_options()
    }
}

/// Serializable form of [`ContentUrlOptions`]
///
/// Field names accept both the camelCase spelling used in JS option objects
/// and snake_case (used by TOML files and environment variables).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawContentUrlOptions {
    #[serde(default, alias = "esModule", skip_serializing_if = "Option::is_none")]
    pub es_module: Option<bool>,

    #[serde(default, alias = "maxSize", skip_serializing_if = "Option::is_none")]
    pub max_size: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, alias = "nameRegExp", skip_serializing_if = "Option::is_none")]
    pub name_regexp: Option<String>,

    #[serde(default, alias = "outputPath", skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,

    #[serde(default, alias = "publicPath", skip_serializing_if = "Option::is_none")]
    pub public_path: Option<String>,

    #[serde(default, alias = "urlWrapper", skip_serializing_if = "Option::is_none")]
    pub url_wrapper: Option<String>,

    #[serde(default, alias = "contentWrapper", skip_serializing_if = "Option::is_none")]
    pub content_wrapper: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialize: Option<String>,

    #[serde(
        default,
        alias = "runtimePublicPath",
        skip_serializing_if = "Option::is_none"
    )]
    pub runtime_public_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<HashOptions>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Vec<String>>,
}

impl RawContentUrlOptions {
    /// Type-check each known field of an option object. Unknown keys are ignored.
    fn from_map(map: &Map<String, Value>) -> Result<Self> {
        let mut raw = Self::default();

        for (key, value) in map {
            match key.as_str() {
                "esModule" | "es_module" => raw.es_module = Some(field(key, value, "a boolean")?),
                "maxSize" | "max_size" => {
                    raw.max_size = Some(field(key, value, "a number")?)
                }
                "name" => raw.name = Some(field(key, value, "a string")?),
                "nameRegExp" | "name_regexp" => {
                    raw.name_regexp = Some(field(key, value, "a regular expression string")?)
                }
                "outputPath" | "output_path" => {
                    raw.output_path = Some(field(key, value, "a string")?)
                }
                "publicPath" | "public_path" => {
                    raw.public_path = Some(field(key, value, "a string")?)
                }
                "urlWrapper" | "url_wrapper" => {
                    raw.url_wrapper = Some(field(key, value, "a string")?)
                }
                "contentWrapper" | "content_wrapper" => {
                    raw.content_wrapper = Some(field(key, value, "a string")?)
                }
                "serialize" => {
                    raw.serialize = Some(field(key, value, "\"string\" or \"base64\"")?)
                }
                "runtimePublicPath" | "runtime_public_path" => {
                    raw.runtime_public_path = Some(field(key, value, "a string")?)
                }
                "hash" => {
                    raw.hash = Some(field(key, value, "an object with function, digest, length")?)
                }
                "test" => raw.test = Some(field(key, value, "a regular expression string")?),
                "exclude" => raw.exclude = Some(field(key, value, "an array of strings")?),
                _ => {}
            }
        }

        Ok(raw)
    }

    /// Merge over the defaults and validate
    pub fn into_options(self) -> Result<ContentUrlOptions> {
        let mut options = ContentUrlOptions::default();

        if let Some(es_module) = self.es_module {
            options.es_module = es_module;
        }
        if let Some(max_size) = self.max_size {
            options.max_size = max_size;
        }
        if let Some(name) = self.name {
            options.name = name;
        }
        if let Some(pattern) = self.name_regexp {
            options.name_regexp = Some(
                Regex::new(&pattern).map_err(|e| ContentUrlError::invalid_regex("nameRegExp", e))?,
            );
        }
        if let Some(path) = self.output_path {
            options.output_path = Some(PathOption::Static(path));
        }
        if let Some(path) = self.public_path {
            options.public_path = Some(PathOption::Static(path));
        }
        if let Some(template) = self.url_wrapper {
            options.url_wrapper = Wrapper::Template(template);
        }
        if let Some(template) = self.content_wrapper {
            options.content_wrapper = Wrapper::Template(template);
        }
        if let Some(name) = self.serialize {
            options.serialize = Serializer::from_name(&name).ok_or_else(|| {
                ContentUrlError::invalid_options("serialize", "\"string\" or \"base64\"")
            })?;
        }
        if let Some(expression) = self.runtime_public_path {
            options.runtime_public_path = expression;
        }
        if let Some(hash) = self.hash {
            options.hash = hash;
        }
        if let Some(pattern) = self.test {
            options.test =
                Regex::new(&pattern).map_err(|e| ContentUrlError::invalid_regex("test", e))?;
        }
        if let Some(exclude) = self.exclude {
            options.exclude = exclude;
        }

        options.validate()?;
        Ok(options)
    }
}

fn field<T: serde::de::DeserializeOwned>(key: &str, value: &Value, expected: &str) -> Result<T> {
    serde_json::from_value(value.clone())
        .map_err(|_| ContentUrlError::invalid_options(key, expected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolate::{HashDigest, HashFunction};
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let options = ContentUrlOptions::default();
        assert!(!options.es_module);
        assert_eq!(options.max_size, 5120.0);
        assert_eq!(options.name, "[contenthash].[ext]");
        assert!(options.name_regexp.is_none());
        assert!(options.output_path.is_none());
        assert!(options.public_path.is_none());
        assert!(options.test.is_match("/src/logo.SVG"));
        assert!(!options.test.is_match("/src/index.js"));
    }

    #[test]
    fn test_from_null_uses_defaults() {
        let options = ContentUrlOptions::from_value(Value::Null).unwrap();
        assert_eq!(options.max_size, DEFAULT_MAX_SIZE);
    }

    #[test]
    fn test_from_value_merges_over_defaults() {
        let options = ContentUrlOptions::from_value(json!({
            "esModule": true,
            "maxSize": 300,
            "nameRegExp": "icons/(\\w+)/",
            "publicPath": "/static",
            "serialize": "base64",
            "contentWrapper": "<span>{{content}}</span>",
            "somethingElse": 42
        }))
        .unwrap();

        assert!(options.es_module);
        assert_eq!(options.max_size, 300.0);
        assert_eq!(options.name, DEFAULT_NAME);
        assert!(options.name_regexp.is_some());
        assert!(matches!(options.public_path, Some(PathOption::Static(ref p)) if p == "/static"));
        assert!(matches!(options.serialize, Serializer::Base64));
        assert!(matches!(options.content_wrapper, Wrapper::Template(_)));
    }

    #[test]
    fn test_from_value_rejects_wrong_types() {
        let cases = [
            json!({ "esModule": "yes" }),
            json!({ "maxSize": "big" }),
            json!({ "maxSize": [1] }),
            json!({ "name": 3 }),
            json!({ "outputPath": false }),
            json!({ "publicPath": [] }),
            json!({ "serialize": "hex" }),
        ];
        for case in cases {
            let err = ContentUrlOptions::from_value(case.clone()).unwrap_err();
            assert!(
                matches!(err, ContentUrlError::InvalidOptions { .. }),
                "expected InvalidOptions for {}",
                case
            );
        }
    }

    #[test]
    fn test_from_value_rejects_non_object() {
        let err = ContentUrlOptions::from_value(json!("fast")).unwrap_err();
        assert!(matches!(err, ContentUrlError::InvalidOptions { ref field, .. } if field == "options"));
    }

    #[test]
    fn test_from_value_rejects_bad_regex_and_template() {
        assert!(matches!(
            ContentUrlOptions::from_value(json!({ "nameRegExp": "(" })),
            Err(ContentUrlError::InvalidRegex { .. })
        ));
        assert!(matches!(
            ContentUrlOptions::from_value(json!({ "urlWrapper": "<img>" })),
            Err(ContentUrlError::MissingPlaceholder { .. })
        ));
    }

    #[test]
    fn test_from_file_toml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "content-url.toml",
                r#"
max_size = 1024
name = "[name].[contenthash:8].[ext]"
exclude = ["vendor/"]

[hash]
function = "sha256"
digest = "base64url"
"#,
            )?;

            let options = ContentUrlOptions::from_file("content-url.toml").unwrap();
            assert_eq!(options.max_size, 1024.0);
            assert_eq!(options.name, "[name].[contenthash:8].[ext]");
            assert_eq!(options.exclude, vec!["vendor/".to_string()]);
            assert_eq!(options.hash.function, HashFunction::Sha256);
            assert_eq!(options.hash.digest, HashDigest::Base64url);
            Ok(())
        });
    }

    #[test]
    fn test_from_file_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file("content-url.toml", "max_size = 1024\nname = \"[name].[ext]\"")?;
            jail.set_env("FOB_CONTENT_URL_MAX_SIZE", 10);
            jail.set_env("FOB_CONTENT_URL_ES_MODULE", true);

            let options = ContentUrlOptions::from_file("content-url.toml").unwrap();
            assert_eq!(options.max_size, 10.0);
            assert!(options.es_module);
            assert_eq!(options.name, "[name].[ext]");
            Ok(())
        });
    }

    #[test]
    fn test_from_file_json_camel_case() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "content-url.json",
                r#"{ "esModule": true, "publicPath": "/assets", "maxSize": -1 }"#,
            )?;

            let options = ContentUrlOptions::from_file("content-url.json").unwrap();
            assert!(options.es_module);
            assert!(options.public_path.is_some());
            assert_eq!(options.max_size, -1.0);
            Ok(())
        });
    }

    #[test]
    fn test_from_file_unsupported_format() {
        let err = ContentUrlOptions::from_file("content-url.yaml").unwrap_err();
        assert!(matches!(err, ContentUrlError::ConfigLoad { .. }));
    }

    #[test]
    fn test_from_value_accepts_any_number() {
        let options = ContentUrlOptions::from_value(json!({ "maxSize": -1 })).unwrap();
        assert_eq!(options.max_size, -1.0);

        let options = ContentUrlOptions::from_value(json!({ "maxSize": 1.5 })).unwrap();
        assert_eq!(options.max_size, 1.5);
    }

    #[test]
    fn test_builder() {
        assert_eq!(ContentUrlOptions::new().runtime_public_path, r#""/""#);

        let options = ContentUrlOptions::new()
            .with_es_module(true)
            .with_max_size(10)
            .with_output_path("static")
            .with_runtime_public_path("import.meta.env.BASE_URL")
            .exclude("node_modules/");

        assert!(options.es_module);
        assert_eq!(options.max_size, 10.0);
        assert_eq!(options.runtime_public_path, "import.meta.env.BASE_URL");
        assert_eq!(options.exclude.len(), 1);
        assert!(options.validate().is_ok());
    }
}
