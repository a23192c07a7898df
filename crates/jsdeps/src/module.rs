//! Module records
//!
//! A [`Module`] is the parsed declaration record of one source file.

use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// Modules keyed by absolute filename, in discovery order
pub type ModuleMap = IndexMap<PathBuf, Module>;

/// Declarations of one source file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Absolute path to the source file
    filename: PathBuf,
    /// Symbols this file provides, in declaration order
    provides: Vec<String>,
    /// Symbols this file requires, as literally declared
    requires: Vec<String>,
    /// Transitive closure of required files; `None` until resolution runs
    dependencies: Option<Vec<PathBuf>>,
}

impl Module {
    /// Create a new unresolved module
    pub fn new(filename: PathBuf, provides: Vec<String>, requires: Vec<String>) -> Self {
        Self {
            filename,
            provides,
            requires,
            dependencies: None,
        }
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    pub fn provided_symbols(&self) -> &[String] {
        &self.provides
    }

    pub fn required_symbols(&self) -> &[String] {
        &self.requires
    }

    /// Resolved dependency closure, dependencies listed before the files that need them
    pub fn dependencies(&self) -> Option<&[PathBuf]> {
        self.dependencies.as_deref()
    }

    pub fn is_resolved(&self) -> bool {
        self.dependencies.is_some()
    }

    pub(crate) fn set_dependencies(&mut self, dependencies: Vec<PathBuf>) {
        self.dependencies = Some(dependencies);
    }

    /// Look up the resolved closure as module references
    ///
    /// Files missing from `modules` are skipped.
    pub fn resolved_modules<'m>(&self, modules: &'m ModuleMap) -> Vec<&'m Module> {
        self.dependencies()
            .unwrap_or_default()
            .iter()
            .filter_map(|path| modules.get(path))
            .collect()
    }
}
