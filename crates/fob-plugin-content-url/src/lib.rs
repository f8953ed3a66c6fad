//! Rolldown plugin that turns asset files into JavaScript modules
//!
//! Each matching asset (images, fonts, media, wasm...) is either:
//!
//! - **inlined**: its bytes are serialized (UTF-8 text or base64) into a string
//!   literal exported by the module, or
//! - **emitted**: written to the output directory as a separate file, with the
//!   module exporting its URL.
//!
//! Small files are inlined and larger ones emitted, unless a `load_as_url`
//! predicate decides otherwise. Both exports can be wrapped in templates such as
//! `<img src="{{url}}">` and use either `module.exports =` or `export default`.
//!
//! ## Architecture
//!
//! ```text
//! asset id → load() hook → read bytes → transform() ─┬─ Url     → ctx.emit_file → module exporting URL
//!                                                    └─ Content → module exporting string
//! ```
//!
//! The transform itself ([`transform::transform`]) is host-agnostic: it only
//! needs a [`NameInterpolator`] and an [`AssetEmitter`].
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use fob_plugin_content_url::{ContentUrlOptions, FobContentUrlPlugin, Wrapper};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let options = ContentUrlOptions::new()
//!     .with_max_size(300)
//!     .with_name("[path][contenthash].[ext]")
//!     .with_url_wrapper(Wrapper::template("<img src=\"{{url}}\">"));
//!
//! // Use with your Rolldown bundler configuration
//! let plugin = Arc::new(FobContentUrlPlugin::with_options(options)?);
//! # Ok(())
//! # }
//! ```

use anyhow::Context;
use rolldown_common::{EmittedAsset, ModuleType};
use rolldown_plugin::{HookLoadArgs, HookLoadOutput, HookLoadReturn, Plugin, PluginContext};
use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub mod error;
pub mod interpolate;
pub mod options;
pub mod render;
pub mod transform;

#[cfg(feature = "logging")]
pub mod logging;

pub use error::ContentUrlError;
pub use interpolate::{HashDigest, HashFunction, HashOptions, NameInterpolator, TemplateInterpolator};
pub use options::{ContentUrlOptions, PathOption, RawContentUrlOptions};
pub use render::{ExportSyntax, Serializer, Wrapper};
pub use transform::{AssetEmitter, LoadMode, ResourceContext, TransformOutput};

/// Rolldown plugin that inlines or emits asset files
///
/// # Architecture
///
/// The plugin uses the `load` hook: asset files are not JavaScript, so they
/// must be replaced by generated module code before Rolldown parses them.
#[derive(Clone)]
pub struct FobContentUrlPlugin {
    options: ContentUrlOptions,

    /// Root directory for `[path]` and the callbacks' `root_context`
    root: PathBuf,

    /// Replaces the built-in bracket interpolator when set
    interpolator: Option<Arc<dyn NameInterpolator>>,
}

impl FobContentUrlPlugin {
    /// Create a plugin with default options, rooted at the current directory
    ///
    /// # Example
    ///
    /// ```rust
    /// use fob_plugin_content_url::FobContentUrlPlugin;
    ///
    /// let plugin = FobContentUrlPlugin::new();
    /// ```
    pub fn new() -> Self {
        Self {
            options: ContentUrlOptions::default(),
            root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            interpolator: None,
        }
    }

    /// Create a plugin with custom options
    ///
    /// Fails when a wrapper template is missing its placeholder.
    pub fn with_options(options: ContentUrlOptions) -> Result<Self, ContentUrlError> {
        options.validate()?;
        Ok(Self {
            options,
            ..Self::new()
        })
    }

    /// Create a plugin from a JSON option object
    pub fn from_value(value: serde_json::Value) -> Result<Self, ContentUrlError> {
        Self::with_options(ContentUrlOptions::from_value(value)?)
    }

    /// Set the project root
    pub fn with_root(mut self, root: impl AsRef<Path>) -> Self {
        self.root = root.as_ref().to_path_buf();
        self
    }

    /// Use a custom name interpolator instead of the built-in one
    pub fn with_interpolator(mut self, interpolator: Arc<dyn NameInterpolator>) -> Self {
        self.interpolator = Some(interpolator);
        self
    }

    pub fn options(&self) -> &ContentUrlOptions {
        &self.options
    }

    /// Check whether a module id should be handled by this plugin
    fn should_process(&self, id: &str) -> bool {
        if self
            .options
            .exclude
            .iter()
            .any(|pattern| id.contains(pattern.as_str()))
        {
            return false;
        }

        let path = id.split('?').next().unwrap_or(id);
        self.options.test.is_match(path)
    }

    /// Transform already-loaded bytes for `id`
    pub fn transform_source(
        &self,
        id: &str,
        source: &[u8],
        emitter: &dyn AssetEmitter,
    ) -> anyhow::Result<TransformOutput> {
        let resource = ResourceContext::from_module_id(id, &self.root);

        match &self.interpolator {
            Some(interpolator) => transform::transform(
                source,
                &resource,
                &self.options,
                interpolator.as_ref(),
                emitter,
            ),
            None => {
                let interpolator = TemplateInterpolator::from_options(&self.options);
                transform::transform(source, &resource, &self.options, &interpolator, emitter)
            }
        }
    }

    fn load_module(&self, ctx: &PluginContext, id: &str) -> HookLoadReturn {
        if !self.should_process(id) {
            return Ok(None);
        }

        let resource = ResourceContext::from_module_id(id, &self.root);
        let source = std::fs::read(&resource.resource_path)
            .with_context(|| format!("Failed to read asset: {}", resource.resource_path.display()))?;

        let emitter = RolldownEmitter {
            ctx,
            original_file_name: resource.resource_str(),
        };
        let output = self
            .transform_source(id, &source, &emitter)
            .with_context(|| format!("Failed to transform asset: {}", id))?;

        debug!(
            "[fob-content-url] Loaded {} as {:?} ({} bytes{})",
            id,
            output.mode,
            source.len(),
            output
                .emitted
                .as_deref()
                .map(|p| format!(", emitted {}", p))
                .unwrap_or_default()
        );

        Ok(Some(HookLoadOutput {
            code: output.code.into(),
            module_type: Some(ModuleType::Js),
            ..Default::default()
        }))
    }
}

impl Default for FobContentUrlPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FobContentUrlPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FobContentUrlPlugin")
            .field("options", &self.options)
            .field("root", &self.root)
            .field("interpolator", &self.interpolator.as_ref().map(|_| ".."))
            .finish()
    }
}

impl Plugin for FobContentUrlPlugin {
    /// Returns the plugin name for debugging and logging
    fn name(&self) -> Cow<'static, str> {
        "fob-content-url".into()
    }

    fn register_hook_usage(&self) -> rolldown_plugin::HookUsage {
        use rolldown_plugin::HookUsage;
        HookUsage::Load
    }

    /// Load hook - replaces matching assets with generated modules
    ///
    /// # Returns
    ///
    /// - `Ok(Some(output))` - JavaScript module exporting the URL or content
    /// - `Ok(None)` - Not an asset handled by this plugin
    /// - `Err(e)` - Read, interpolation, or emission error
    fn load(
        &self,
        ctx: &PluginContext,
        args: &HookLoadArgs<'_>,
    ) -> impl std::future::Future<Output = HookLoadReturn> + Send {
        // The transform is synchronous; run it before handing back the future
        // so the context borrow does not cross an await point.
        let result = self.load_module(ctx, args.id);
        async move { result }
    }
}

/// Emits files through Rolldown's asset system with a fixed file name
struct RolldownEmitter<'a> {
    ctx: &'a PluginContext,
    original_file_name: String,
}

impl AssetEmitter for RolldownEmitter<'_> {
    fn emit_file(&self, file_name: &str, source: &[u8]) -> anyhow::Result<()> {
        self.ctx
            .emit_file(
                EmittedAsset {
                    name: None,
                    original_file_name: Some(self.original_file_name.clone()),
                    file_name: Some(file_name.into()),
                    source: source.to_vec().into(),
                },
                None,
                None,
            )
            .context("Rolldown rejected the emitted asset")?;
        Ok(())
    }
}
