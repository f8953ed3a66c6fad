//! Output name interpolation
//!
//! Expands bracket placeholders in a name template such as
//! `[path][name].[contenthash:8].[ext]` for a single resource.
//!
//! | Placeholder        | Value                                                   |
//! |--------------------|---------------------------------------------------------|
//! | `[name]`           | file stem (`file` when missing)                         |
//! | `[ext]`            | extension without the dot (`bin` when missing)          |
//! | `[path]`           | directory relative to the root context, ending in `/`   |
//! | `[folder]`         | name of the directory containing the resource           |
//! | `[query]`          | resource query, including the leading `?`               |
//! | `[hash]`           | content hash, same as `[contenthash]`                   |
//! | `[contenthash:..]` | content hash with `:<type>`, `:<digest>`, `:<length>`   |
//! | `[N]`              | N-th capture of the name regexp against the path        |
//!
//! Unknown placeholders are left untouched.

use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Component, Path};
use std::sync::OnceLock;
use tracing::trace;

use crate::error::{ContentUrlError, Result};
use crate::options::ContentUrlOptions;
use crate::transform::ResourceContext;

/// Computes output names for resources
///
/// Hosts that already have a naming scheme can plug their own implementation
/// into the plugin with `FobContentUrlPlugin::with_interpolator`.
pub trait NameInterpolator: Send + Sync {
    fn interpolate(
        &self,
        template: &str,
        resource: &ResourceContext,
        content: &[u8],
    ) -> Result<String>;
}

/// Hash function used for `[hash]` / `[contenthash]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashFunction {
    Sha256,
    #[default]
    Blake3,
    Seahash,
}

impl HashFunction {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sha256" => Some(HashFunction::Sha256),
            "blake3" => Some(HashFunction::Blake3),
            "seahash" => Some(HashFunction::Seahash),
            _ => None,
        }
    }

    fn hash(&self, content: &[u8]) -> Vec<u8> {
        match self {
            HashFunction::Sha256 => {
                use sha2::Digest;
                sha2::Sha256::digest(content).to_vec()
            }
            HashFunction::Blake3 => blake3::hash(content).as_bytes().to_vec(),
            HashFunction::Seahash => seahash::hash(content).to_be_bytes().to_vec(),
        }
    }
}

/// Text encoding of a hash
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashDigest {
    #[default]
    Hex,
    /// URL-safe base64 without padding (safe in file names)
    Base64url,
}

impl HashDigest {
    fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "hex" => Some(HashDigest::Hex),
            "base64" | "base64url" => Some(HashDigest::Base64url),
            _ => None,
        }
    }

    fn encode(&self, bytes: &[u8]) -> String {
        match self {
            HashDigest::Hex => bytes.iter().map(|b| format!("{:02x}", b)).collect(),
            HashDigest::Base64url => base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes),
        }
    }
}

/// Defaults for hash placeholders without explicit parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashOptions {
    #[serde(default)]
    pub function: HashFunction,
    #[serde(default)]
    pub digest: HashDigest,
    /// Truncate the digest to this many characters
    #[serde(default)]
    pub length: Option<usize>,
}

impl HashOptions {
    /// Hash `content` and encode it
    pub fn compute(&self, content: &[u8]) -> String {
        let mut encoded = self.digest.encode(&self.function.hash(content));
        if let Some(length) = self.length {
            encoded.truncate(length.min(encoded.len()));
        }
        encoded
    }

    /// Apply `:param` overrides from a placeholder like `[contenthash:sha256:8]`
    fn with_params(mut self, placeholder: &str, params: &[&str]) -> Result<Self> {
        for param in params {
            if let Ok(length) = param.parse::<usize>() {
                self.length = Some(length);
            } else if let Some(function) = HashFunction::parse(param) {
                self.function = function;
            } else if let Some(digest) = HashDigest::parse(param) {
                self.digest = digest;
            } else {
                return Err(ContentUrlError::unsupported_hash(placeholder, *param));
            }
        }
        Ok(self)
    }
}

/// Built-in bracket placeholder interpolator
#[derive(Debug, Clone, Default)]
pub struct TemplateInterpolator {
    name_regexp: Option<Regex>,
    hash: HashOptions,
}

impl TemplateInterpolator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interpolator configured with the options' `name_regexp` and hash defaults
    pub fn from_options(options: &ContentUrlOptions) -> Self {
        Self::new()
            .with_name_regexp(options.name_regexp.clone())
            .with_hash(options.hash)
    }

    pub fn with_name_regexp(mut self, regexp: Option<Regex>) -> Self {
        self.name_regexp = regexp;
        self
    }

    pub fn with_hash(mut self, hash: HashOptions) -> Self {
        self.hash = hash;
        self
    }

    fn expand(
        &self,
        token: &str,
        resource: &ResourceContext,
        content: &[u8],
    ) -> Result<Option<String>> {
        let path = &resource.resource_path;
        let value = match token {
            "name" => path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "file".to_string()),
            "ext" => path
                .extension()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "bin".to_string()),
            "path" => match path.parent() {
                Some(parent) => relative_dir(&resource.root_context, parent),
                None => String::new(),
            },
            "folder" => path
                .parent()
                .and_then(|p| p.file_name())
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            "query" => resource.resource_query.clone(),
            _ => {
                if let Ok(index) = token.parse::<usize>() {
                    return Ok(Some(self.capture(index, resource)));
                }

                let mut parts = token.split(':');
                match parts.next() {
                    Some("hash") | Some("contenthash") => {
                        let params: Vec<&str> = parts.collect();
                        let hash = self.hash.with_params(token, &params)?;
                        hash.compute(content)
                    }
                    _ => return Ok(None),
                }
            }
        };
        Ok(Some(value))
    }

    fn capture(&self, index: usize, resource: &ResourceContext) -> String {
        let Some(re) = &self.name_regexp else {
            return String::new();
        };
        let haystack = resource.resource_path.to_string_lossy();
        re.captures(&haystack)
            .and_then(|caps| caps.get(index))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    }
}

impl NameInterpolator for TemplateInterpolator {
    fn interpolate(
        &self,
        template: &str,
        resource: &ResourceContext,
        content: &[u8],
    ) -> Result<String> {
        let mut output = String::with_capacity(template.len());
        let mut last = 0;

        for caps in placeholder_regex().captures_iter(template) {
            let (Some(whole), Some(token)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            output.push_str(&template[last..whole.start()]);
            match self.expand(token.as_str(), resource, content)? {
                Some(value) => output.push_str(&value),
                None => output.push_str(whole.as_str()),
            }
            last = whole.end();
        }
        output.push_str(&template[last..]);

        trace!(
            "[fob-content-url] Interpolated '{}' for {} -> '{}'",
            template,
            resource.resource_path.display(),
            output
        );

        Ok(output)
    }
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\[\]]+)\]").expect("placeholder regex is valid"))
}

/// Directory of a resource relative to the root context, `/`-separated with a
/// trailing slash. Parent steps (`..`) become `_` so the result stays inside
/// the output directory.
fn relative_dir(root: &Path, dir: &Path) -> String {
    let root: Vec<Component<'_>> = root.components().collect();
    let dir: Vec<Component<'_>> = dir.components().collect();

    let common = root
        .iter()
        .zip(dir.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = Vec::new();
    for component in &root[common..] {
        if matches!(component, Component::Normal(_) | Component::ParentDir) {
            segments.push("_".to_string());
        }
    }
    for component in &dir[common..] {
        match component {
            Component::Normal(part) => segments.push(part.to_string_lossy().into_owned()),
            Component::ParentDir => segments.push("_".to_string()),
            _ => {}
        }
    }

    if segments.is_empty() {
        String::new()
    } else {
        format!("{}/", segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn resource(path: &str) -> ResourceContext {
        ResourceContext::new(path, "/project").with_query("?inline")
    }

    #[test]
    fn test_basic_placeholders() {
        let interpolator = TemplateInterpolator::new();
        let out = interpolator
            .interpolate(
                "[path][folder]/[name].[ext][query]",
                &resource("/project/src/assets/logo.svg"),
                b"",
            )
            .unwrap();
        assert_eq!(out, "src/assets/assets/logo.svg?inline");
    }

    #[test]
    fn test_defaults_for_missing_parts() {
        let interpolator = TemplateInterpolator::new();
        let out = interpolator
            .interpolate("[path][name].[ext]", &resource("/project/LICENSE"), b"")
            .unwrap();
        assert_eq!(out, "LICENSE.bin");
    }

    #[test]
    fn test_path_outside_root() {
        assert_eq!(
            relative_dir(&PathBuf::from("/project/app"), &PathBuf::from("/project/shared/img")),
            "_/shared/img/"
        );
        assert_eq!(relative_dir(&PathBuf::from("/project"), &PathBuf::from("/project")), "");
    }

    #[test]
    fn test_contenthash_defaults_to_blake3_hex() {
        let interpolator = TemplateInterpolator::new();
        let out = interpolator
            .interpolate("[contenthash].[ext]", &resource("/project/a.svg"), b"<svg/>")
            .unwrap();
        let expected = blake3::hash(b"<svg/>").to_hex().to_string();
        assert_eq!(out, format!("{}.svg", expected));
    }

    #[test]
    fn test_hash_parameters() {
        let interpolator = TemplateInterpolator::new();
        let res = resource("/project/a.svg");

        let short = interpolator.interpolate("[hash:8]", &res, b"abc").unwrap();
        assert_eq!(short.len(), 8);
        assert!(short.chars().all(|c| c.is_ascii_hexdigit()));

        let sha = interpolator
            .interpolate("[contenthash:sha256:hex:12]", &res, b"abc")
            .unwrap();
        assert_eq!(sha, "ba7816bf8f01");

        let seahash = interpolator.interpolate("[contenthash:seahash]", &res, b"abc").unwrap();
        assert_eq!(seahash.len(), 16);
    }

    #[test]
    fn test_unsupported_hash_parameter() {
        let interpolator = TemplateInterpolator::new();
        let err = interpolator
            .interpolate("[contenthash:md5]", &resource("/project/a.svg"), b"abc")
            .unwrap_err();
        assert!(matches!(err, ContentUrlError::UnsupportedHash { .. }));
    }

    #[test]
    fn test_regexp_captures() {
        let interpolator = TemplateInterpolator::new()
            .with_name_regexp(Some(Regex::new(r"icons/([a-z]+)/").unwrap()));
        let out = interpolator
            .interpolate("[1]-[name].[ext]-[2]", &resource("/project/icons/solid/dot.svg"), b"")
            .unwrap();
        assert_eq!(out, "solid-dot.svg-");
    }

    #[test]
    fn test_from_options_carries_regexp_and_hash() {
        let options = ContentUrlOptions::new()
            .with_name_regexp(Regex::new(r"icons/([a-z]+)/").unwrap())
            .with_hash(HashOptions {
                function: HashFunction::Sha256,
                digest: HashDigest::Hex,
                length: Some(6),
            });
        let interpolator = TemplateInterpolator::from_options(&options);
        let out = interpolator
            .interpolate("[1].[hash]", &resource("/project/icons/solid/dot.svg"), b"abc")
            .unwrap();
        assert_eq!(out, "solid.ba7816");
    }

    #[test]
    fn test_unknown_placeholder_kept() {
        let interpolator = TemplateInterpolator::new();
        let out = interpolator
            .interpolate("[emoji]-[name]", &resource("/project/a.svg"), b"")
            .unwrap();
        assert_eq!(out, "[emoji]-a");
    }
}
