//! Module dependency graph
//!
//! Computes, for every module, the transitive closure of the files it
//! depends on by following required symbol → declaring file edges.
//!
//! Closures are memoized per filename. A file that is re-entered while its
//! own closure is still being computed contributes an empty closure, so
//! cycles terminate without being reported.

use crate::module::ModuleMap;
use crate::registry::SymbolRegistry;
use indexmap::IndexSet;
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors related to dependency resolution
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A required symbol has no declaring file
    #[error("Unresolved symbol '{symbol}' required by {}", .required_by.display())]
    UnresolvedSymbol { symbol: String, required_by: PathBuf },

    /// Module not found in the module map
    #[error("Module not found in graph: {}", .0.display())]
    ModuleNotFound(PathBuf),
}

/// Memoizing transitive-closure resolver
#[derive(Debug, Default)]
pub struct DependencyResolver {
    /// Finished closures by filename
    resolved: FxHashMap<PathBuf, Vec<PathBuf>>,
    /// Files on the active recursion path
    in_progress: FxHashSet<PathBuf>,
    /// Skip unresolved symbols instead of failing
    skip_unresolved: bool,
}

impl DependencyResolver {
    /// Create a new resolver with an empty memo
    pub fn new() -> Self {
        Self::default()
    }

    /// Log and skip unresolved symbols instead of failing
    pub fn with_skip_unresolved(mut self, skip: bool) -> Self {
        self.skip_unresolved = skip;
        self
    }

    /// Resolve the dependency closure of one module
    ///
    /// # Arguments
    /// * `filename` - Module to resolve, must be a key of `modules`
    /// * `modules` - Every module of the session
    /// * `registry` - Symbol bindings of the session
    ///
    /// # Returns
    /// Files in first-encountered order, each dependency's own closure ahead
    /// of the dependency itself. The module never appears in its own closure.
    pub fn resolve_module_dependencies(
        &mut self,
        filename: &Path,
        modules: &ModuleMap,
        registry: &SymbolRegistry,
    ) -> Result<Vec<PathBuf>, GraphError> {
        if let Some(closure) = self.resolved.get(filename) {
            return Ok(closure.clone());
        }
        if self.in_progress.contains(filename) {
            return Ok(Vec::new());
        }

        let module = modules
            .get(filename)
            .ok_or_else(|| GraphError::ModuleNotFound(filename.to_path_buf()))?;

        self.in_progress.insert(filename.to_path_buf());
        let result = self.collect(filename, module.required_symbols(), modules, registry);
        self.in_progress.remove(filename);

        let closure = result?;
        self.resolved.insert(filename.to_path_buf(), closure.clone());
        Ok(closure)
    }

    fn collect(
        &mut self,
        filename: &Path,
        requires: &[String],
        modules: &ModuleMap,
        registry: &SymbolRegistry,
    ) -> Result<Vec<PathBuf>, GraphError> {
        let mut closure = IndexSet::new();

        for symbol in requires {
            let Some(target) = registry.lookup_filename(symbol) else {
                if self.skip_unresolved {
                    tracing::warn!(
                        symbol = %symbol,
                        file = %filename.display(),
                        "skipping unresolved symbol"
                    );
                    continue;
                }
                return Err(GraphError::UnresolvedSymbol {
                    symbol: symbol.clone(),
                    required_by: filename.to_path_buf(),
                });
            };
            let target = target.to_path_buf();

            closure.extend(self.resolve_module_dependencies(&target, modules, registry)?);
            closure.insert(target);
        }

        closure.shift_remove(filename);
        Ok(closure.into_iter().collect())
    }

    /// Resolve every module of the map and attach the closures
    ///
    /// Modules are visited in map order.
    pub fn resolve_all(
        &mut self,
        modules: &mut ModuleMap,
        registry: &SymbolRegistry,
    ) -> Result<(), GraphError> {
        let filenames: Vec<PathBuf> = modules.keys().cloned().collect();
        for filename in filenames {
            let closure = self.resolve_module_dependencies(&filename, modules, registry)?;
            if let Some(module) = modules.get_mut(&filename) {
                module.set_dependencies(closure);
            }
        }
        Ok(())
    }

    /// Drop every memoized closure
    pub fn clear(&mut self) {
        self.resolved.clear();
        self.in_progress.clear();
    }

    /// Get the number of memoized closures
    pub fn len(&self) -> usize {
        self.resolved.len()
    }

    /// Check if nothing has been resolved yet
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }
}
