//! The content-url transform
//!
//! One call turns the raw bytes of a resource into JavaScript module source:
//!
//! ```text
//! bytes → interpolate name → decide mode ─┬─ Url     → emit file → wrap(json(public + path)) → export
//!                                         └─ Content → serialize → wrap(json(text))          → export
//! ```
//!
//! The transform never touches the filesystem. File emission goes through an
//! [`AssetEmitter`] supplied by the host.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::interpolate::NameInterpolator;
use crate::options::{ContentUrlOptions, PathOption};
use crate::render::{json_string, ExportSyntax, CONTENT_VARIABLE, URL_VARIABLE};

/// Host-provided information about the resource being transformed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceContext {
    /// Absolute path of the resource file
    pub resource_path: PathBuf,
    /// Project root used for relative names
    pub root_context: PathBuf,
    /// Query string of the import, including `?` (empty when absent)
    pub resource_query: String,
}

impl ResourceContext {
    pub fn new(resource_path: impl AsRef<Path>, root_context: impl AsRef<Path>) -> Self {
        Self {
            resource_path: resource_path.as_ref().to_path_buf(),
            root_context: root_context.as_ref().to_path_buf(),
            resource_query: String::new(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.resource_query = query.into();
        self
    }

    /// Build from a bundler module id such as `/src/logo.svg?inline`
    pub fn from_module_id(id: &str, root_context: impl AsRef<Path>) -> Self {
        let (path, query) = match id.find('?') {
            Some(idx) => (&id[..idx], &id[idx..]),
            None => (id, ""),
        };
        Self::new(path, root_context).with_query(query)
    }

    pub(crate) fn resource_str(&self) -> String {
        self.resource_path.to_string_lossy().into_owned()
    }

    pub(crate) fn context_str(&self) -> String {
        self.root_context.to_string_lossy().into_owned()
    }
}

/// Writes emitted files on behalf of the transform
pub trait AssetEmitter {
    /// Emit `source` as an output file named `file_name` (relative to the output dir)
    fn emit_file(&self, file_name: &str, source: &[u8]) -> anyhow::Result<()>;
}

/// How a resource ends up in the bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadMode {
    /// Emitted as a file; the module exports its URL
    Url,
    /// Inlined into the module as a string
    Content,
}

/// Result of a single transform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    /// Generated JavaScript module source
    pub code: String,
    pub mode: LoadMode,
    /// Output path of the emitted file (URL mode only)
    pub emitted: Option<String>,
}

/// Decide between URL and content mode.
///
/// The `load_as_url` predicate wins when it returns a decision; otherwise
/// resources strictly larger than `max_size` are emitted (every resource
/// when the limit is negative).
pub fn decide_mode(
    options: &ContentUrlOptions,
    resource: &ResourceContext,
    target_url: &str,
    len: usize,
) -> LoadMode {
    let forced = options.load_as_url.as_ref().and_then(|predicate| {
        predicate(
            target_url,
            &resource.resource_str(),
            &resource.context_str(),
            &resource.resource_query,
        )
    });

    match forced {
        Some(true) => LoadMode::Url,
        Some(false) => LoadMode::Content,
        None if (len as f64) > options.max_size => LoadMode::Url,
        None => LoadMode::Content,
    }
}

/// Run the transform for one resource.
pub fn transform(
    source: &[u8],
    resource: &ResourceContext,
    options: &ContentUrlOptions,
    interpolator: &dyn NameInterpolator,
    emitter: &dyn AssetEmitter,
) -> anyhow::Result<TransformOutput> {
    let syntax = ExportSyntax::from_es_module(options.es_module);
    let target_url = interpolator.interpolate(&options.name, resource, source)?;
    let mode = decide_mode(options, resource, &target_url, source.len());

    debug!(
        "[fob-content-url] {} ({} bytes, max {}) -> {:?}",
        resource.resource_path.display(),
        source.len(),
        options.max_size,
        mode
    );

    match mode {
        LoadMode::Url => {
            let target_path = output_path(options, resource, &target_url);

            emitter.emit_file(&target_path, source).map_err(|e| {
                e.context(format!(
                    "Failed to emit {} as {}",
                    resource.resource_path.display(),
                    target_path
                ))
            })?;

            let url_expression = public_url_expression(options, resource, &target_url, &target_path);
            let wrapped = options.url_wrapper.render(URL_VARIABLE, &url_expression)?;

            Ok(TransformOutput {
                code: syntax.export(&wrapped),
                mode,
                emitted: Some(target_path),
            })
        }
        LoadMode::Content => {
            let serialized = json_string(&options.serialize.serialize(source));
            let wrapped = options.content_wrapper.render(CONTENT_VARIABLE, &serialized)?;

            Ok(TransformOutput {
                code: syntax.export(&wrapped),
                mode,
                emitted: None,
            })
        }
    }
}

fn output_path(options: &ContentUrlOptions, resource: &ResourceContext, target_url: &str) -> String {
    match &options.output_path {
        Some(PathOption::Function(f)) => {
            f(target_url, &resource.resource_str(), &resource.context_str())
        }
        Some(PathOption::Static(prefix)) => posix_join(prefix, target_url),
        None => target_url.to_string(),
    }
}

fn public_url_expression(
    options: &ContentUrlOptions,
    resource: &ResourceContext,
    target_url: &str,
    target_path: &str,
) -> String {
    match &options.public_path {
        Some(PathOption::Function(f)) => {
            let prefix = f(target_url, &resource.resource_str(), &resource.context_str());
            json_string(&format!("{}{}", prefix, target_path))
        }
        Some(PathOption::Static(prefix)) => {
            json_string(&format!("{}{}", with_trailing_slash(prefix), target_path))
        }
        None => format!(
            "{} + {}",
            options.runtime_public_path,
            json_string(target_path)
        ),
    }
}

fn with_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}

/// Join two `/`-separated paths and normalize `.` / `..` segments.
fn posix_join(base: &str, path: &str) -> String {
    let joined = match (base.is_empty(), path.is_empty()) {
        (true, _) => path.to_string(),
        (false, true) => base.to_string(),
        (false, false) => format!("{}/{}", base, path),
    };
    if joined.is_empty() {
        return ".".to_string();
    }

    let trailing = joined.ends_with('/');
    let mut cleaned = path_clean::clean(&joined)
        .to_string_lossy()
        .replace('\\', "/");
    if trailing && !cleaned.ends_with('/') {
        cleaned.push('/');
    }
    cleaned
}
