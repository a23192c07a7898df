//! Loader manifest generation
//!
//! After resolution the module map can be handed to a [`ManifestGenerator`].
//! The built-in [`DepsJsGenerator`] writes a Closure-style `deps.js`:
//!
//! ```text
//! goog.addDependency('app/main.js', ['app.main'], ['app.util']);
//! ```
//!
//! One line per module in discovery order, listing its provides and its
//! direct requires.

use crate::module::ModuleMap;
use crate::path;
use std::fmt::Write as _;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use thiserror::Error;

/// Errors raised while writing a manifest
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to write manifest {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Future returned by [`ManifestGenerator::generate_async`]
pub type GenerateFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ManifestError>> + Send + 'a>>;

/// Consumer of a fully resolved module map
pub trait ManifestGenerator: Send + Sync {
    /// Generate the manifest, blocking until done
    fn generate(&self, modules: &ModuleMap) -> Result<(), ManifestError>;

    /// Generate the manifest without blocking the runtime
    ///
    /// Defaults to running [`ManifestGenerator::generate`] inline.
    fn generate_async<'a>(&'a self, modules: &'a ModuleMap) -> GenerateFuture<'a> {
        Box::pin(async move { self.generate(modules) })
    }
}

/// Writes `goog.addDependency(...)` lines
#[derive(Debug, Clone)]
pub struct DepsJsGenerator {
    output: PathBuf,
    /// Directory module paths are written relative to
    base: PathBuf,
}

impl DepsJsGenerator {
    /// Create a generator writing to `output`, paths relative to its directory
    pub fn new(output: impl Into<PathBuf>) -> Self {
        let output = output.into();
        let base = output
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self { output, base }
    }

    /// Write module paths relative to `base` instead
    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = base.into();
        self
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Render the manifest text
    pub fn render(&self, modules: &ModuleMap) -> String {
        let mut out = String::new();
        for (filename, module) in modules {
            let relative = path::to_slash(&path::relative_to(filename, &self.base));
            let _ = writeln!(
                out,
                "goog.addDependency('{}', [{}], [{}]);",
                escape(&relative),
                quote_list(module.provided_symbols()),
                quote_list(module.required_symbols()),
            );
        }
        out
    }

    fn io_error(&self, source: std::io::Error) -> ManifestError {
        ManifestError::Io {
            path: self.output.clone(),
            source,
        }
    }
}

impl ManifestGenerator for DepsJsGenerator {
    fn generate(&self, modules: &ModuleMap) -> Result<(), ManifestError> {
        if let Some(parent) = self.output.parent() {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        std::fs::write(&self.output, self.render(modules)).map_err(|e| self.io_error(e))?;
        tracing::info!(path = %self.output.display(), modules = modules.len(), "wrote deps.js");
        Ok(())
    }

    fn generate_async<'a>(&'a self, modules: &'a ModuleMap) -> GenerateFuture<'a> {
        Box::pin(async move {
            let contents = self.render(modules);
            if let Some(parent) = self.output.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| self.io_error(e))?;
            }
            tokio::fs::write(&self.output, contents)
                .await
                .map_err(|e| self.io_error(e))?;
            tracing::info!(path = %self.output.display(), modules = modules.len(), "wrote deps.js");
            Ok(())
        })
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn quote_list(symbols: &[String]) -> String {
    symbols
        .iter()
        .map(|symbol| format!("'{}'", escape(symbol)))
        .collect::<Vec<_>>()
        .join(", ")
}
