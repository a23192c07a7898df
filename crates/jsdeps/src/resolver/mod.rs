//! Dependency resolution driver
//!
//! [`Resolver`] walks the configured roots, parses every discovered file,
//! links the modules into dependency closures and optionally writes the
//! loader manifest. Each resolution builds a fresh [`Session`] (registry,
//! module map, closure memo) and only replaces the resolver's state once
//! the whole pass has succeeded, so a failed or abandoned resolution leaves
//! the previous results untouched.
//!
//! Two modes share one algorithm:
//! - [`Resolver::resolve_sync`] walks and parses on the calling thread
//! - [`Resolver::resolve`] walks and parses concurrently on tokio, then
//!   registers and links serially in discovery order
//!
//! Both produce identical module maps for the same file set.

mod tasks;

use crate::cache::{CacheController, CacheError, CacheStats, DeclarationCache};
use crate::config::{ConfigError, ResolverConfig};
use crate::graph::{DependencyResolver, GraphError};
use crate::manifest::{DepsJsGenerator, ManifestError, ManifestGenerator};
use crate::module::{Module, ModuleMap};
use crate::parser::{ModuleParser, ParseError};
use crate::path;
use crate::pattern::{Pattern, PatternKind};
use crate::registry::{RegistryError, SymbolRegistry};
use crate::syntax::SyntaxError;
use crate::walk::{self, WalkError, WalkFilter};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Bootstrap file never treated as an entry file
const BOOTSTRAP_FILE: &str = "goog/base.js";

/// Errors that can occur during resolution
#[derive(Debug, Error)]
pub enum ResolverError {
    /// A configured root does not exist
    #[error("Root directory does not exist: {}", .0.display())]
    RootNotFound(PathBuf),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Two files provide the same symbol
    #[error(transparent)]
    Conflict(#[from] RegistryError),

    /// A required symbol has no provider
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// IO error reading a source file
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A source file could not be parsed
    #[error("Parse error in {}: {source}", .path.display())]
    Syntax {
        path: PathBuf,
        #[source]
        source: SyntaxError,
    },

    #[error(transparent)]
    Walk(#[from] WalkError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// A background walk or parse task failed
    #[error("Resolution task failed: {0}")]
    Task(String),
}

impl From<ParseError> for ResolverError {
    fn from(error: ParseError) -> Self {
        match error {
            ParseError::Io { path, source } => ResolverError::Io { path, source },
            ParseError::Syntax { path, source } => ResolverError::Syntax { path, source },
            ParseError::Conflict(conflict) => ResolverError::Conflict(conflict),
        }
    }
}

/// Result type for resolution
pub type ResolverResult<T> = Result<T, ResolverError>;

/// Classifies files as entry files for `only_entry` resolutions
pub type EntryPredicate = Arc<dyn Fn(&Path, &Module) -> bool + Send + Sync>;

/// A file that provides nothing and is not the Closure bootstrap file
pub fn default_entry_predicate(filename: &Path, module: &Module) -> bool {
    module.provided_symbols().is_empty() && !path::to_slash(filename).ends_with(BOOTSTRAP_FILE)
}

/// State of one resolution pass
#[derive(Debug, Default)]
pub(crate) struct Session {
    registry: SymbolRegistry,
    modules: ModuleMap,
    graph: DependencyResolver,
}

impl Session {
    fn new(skip_unresolved: bool) -> Self {
        Self {
            registry: SymbolRegistry::new(),
            modules: ModuleMap::new(),
            graph: DependencyResolver::new().with_skip_unresolved(skip_unresolved),
        }
    }

    /// Add a parsed module in discovery order
    fn insert(&mut self, module: Module) {
        self.modules.insert(module.filename().to_path_buf(), module);
    }

    fn link(&mut self) -> Result<(), GraphError> {
        self.graph.clear();
        self.graph.resolve_all(&mut self.modules, &self.registry)
    }
}

/// Resolves dependencies among the source files under a set of roots
pub struct Resolver {
    config: ResolverConfig,
    /// Absolute, normalized roots
    roots: Vec<PathBuf>,
    filter: WalkFilter,
    parser: ModuleParser,
    cache: Arc<Mutex<DeclarationCache>>,
    cache_base: PathBuf,
    deps_js_path: PathBuf,
    generator: Arc<dyn ManifestGenerator>,
    entry_predicate: EntryPredicate,
    /// Results of the last successful resolution
    session: Session,
}

impl Resolver {
    /// Create a resolver
    ///
    /// # Arguments
    /// * `config` - Resolver configuration
    ///
    /// # Returns
    /// * `Ok(Resolver)` - Ready to resolve
    /// * `Err(ResolverError::RootNotFound)` - A configured root does not exist
    /// * `Err(ResolverError::Cache)` - The cache file exists but cannot be read
    pub fn new(mut config: ResolverConfig) -> ResolverResult<Self> {
        config.validate()?;

        let roots = config
            .roots
            .iter()
            .map(|root| absolutize(root))
            .collect::<ResolverResult<Vec<_>>>()?;
        if let Some(missing) = roots.iter().find(|root| !root.exists()) {
            return Err(ResolverError::RootNotFound(missing.clone()));
        }

        if let Some(base) = config.amd_base.take() {
            config.amd_base = Some(absolutize(&base)?);
        }
        let cache_base = match &config.cache_base {
            Some(base) => absolutize(base)?,
            None => absolutize(Path::new("."))?,
        };

        let filter = config.walk_filter()?;
        let cache = Arc::new(Mutex::new(DeclarationCache::open(config.cache_store())?));
        let mut pattern = config.build_pattern(&roots[0]);
        pattern.compile();
        let parser = ModuleParser::new(Arc::new(pattern), Arc::clone(&cache), cache_base.clone());

        let deps_js_path = absolutize(&config.deps_js_path())?;
        let mut generator = DepsJsGenerator::new(&deps_js_path);
        if let Some(base) = &config.manifest_base {
            generator = generator.with_base(absolutize(base)?);
        }

        tracing::debug!(roots = ?roots, pattern = %config.pattern, "created resolver");

        Ok(Self {
            session: Session::new(config.skip_unresolved),
            config,
            roots,
            filter,
            parser,
            cache,
            cache_base,
            deps_js_path,
            generator: Arc::new(generator),
            entry_predicate: Arc::new(default_entry_predicate),
        })
    }

    /// Use a pattern other than the configured built-in one
    pub fn with_pattern(mut self, mut pattern: PatternKind) -> Self {
        pattern.compile();
        self.parser = ModuleParser::new(
            Arc::new(pattern),
            Arc::clone(&self.cache),
            self.cache_base.clone(),
        );
        self
    }

    /// Replace the entry-file classification
    pub fn with_entry_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Path, &Module) -> bool + Send + Sync + 'static,
    {
        self.entry_predicate = Arc::new(predicate);
        self
    }

    /// Replace the deps.js writer
    pub fn with_generator(mut self, generator: impl ManifestGenerator + 'static) -> Self {
        self.generator = Arc::new(generator);
        self
    }

    /// Resolve every file under the roots, blocking the calling thread
    ///
    /// # Arguments
    /// * `only_entry` - Return only modules the entry predicate accepts
    ///
    /// # Returns
    /// Resolved modules keyed by absolute filename, in discovery order
    pub fn resolve_sync(&mut self, only_entry: bool) -> ResolverResult<ModuleMap> {
        self.cache.lock().begin_session();
        let mut session = self.new_session();
        for root in &self.roots {
            walk::walk_tree(root, &self.filter, |filename| -> ResolverResult<()> {
                let module = self.parser.parse_sync(&filename, &mut session.registry)?;
                session.insert(module);
                Ok(())
            })?;
        }

        session.link()?;
        self.cache.lock().write_cache()?;
        if self.config.write_deps_js {
            self.generator.generate(&session.modules)?;
        }

        Ok(self.commit(session, only_entry))
    }

    /// Resolve every file under the roots, reading and parsing files concurrently
    ///
    /// Dropping the returned future before completion leaves the resolver's
    /// previous results in place.
    pub async fn resolve(&mut self, only_entry: bool) -> ResolverResult<ModuleMap> {
        self.cache.lock().begin_session();
        let parsed = tasks::parse_roots(&self.roots, &self.filter, &self.parser).await?;

        let mut session = self.new_session();
        for (filename, declarations) in parsed {
            let module = ModuleParser::register(&filename, declarations?, &mut session.registry)?;
            session.insert(module);
        }

        session.link()?;
        let cache = Arc::clone(&self.cache);
        tokio::task::spawn_blocking(move || cache.lock().write_cache())
            .await
            .map_err(tasks::task_error)??;
        if self.config.write_deps_js {
            self.generator.generate_async(&session.modules).await?;
        }

        Ok(self.commit(session, only_entry))
    }

    /// Run a full resolution and return the module providing `symbol`
    pub async fn resolve_by_name(&mut self, symbol: &str) -> ResolverResult<Option<Module>> {
        self.resolve(false).await?;
        Ok(self.module_for_symbol(symbol))
    }

    /// Blocking variant of [`Resolver::resolve_by_name`]
    pub fn resolve_by_name_sync(&mut self, symbol: &str) -> ResolverResult<Option<Module>> {
        self.resolve_sync(false)?;
        Ok(self.module_for_symbol(symbol))
    }

    /// Run a full resolution and return the module for one file
    pub async fn resolve_file(&mut self, filename: &Path) -> ResolverResult<Option<Module>> {
        let key = absolutize(filename)?;
        self.resolve(false).await?;
        Ok(self.session.modules.get(&key).cloned())
    }

    /// Blocking variant of [`Resolver::resolve_file`]
    pub fn resolve_file_sync(&mut self, filename: &Path) -> ResolverResult<Option<Module>> {
        let key = absolutize(filename)?;
        self.resolve_sync(false)?;
        Ok(self.session.modules.get(&key).cloned())
    }

    /// Drop a module and unbind the symbols it provided
    ///
    /// Dependents keep their closures until [`Resolver::relink`] or the next
    /// resolution.
    pub fn remove(&mut self, filename: &Path) -> Option<Module> {
        let key = absolutize(filename).unwrap_or_else(|_| filename.to_path_buf());
        let module = self.session.modules.shift_remove(&key)?;
        for symbol in module.provided_symbols() {
            if self.session.registry.lookup_filename(symbol) == Some(key.as_path()) {
                self.session.registry.remove(symbol);
            }
        }
        self.session.graph.clear();
        tracing::debug!(file = %key.display(), "removed module");
        Some(module)
    }

    /// Recompute every closure over the current modules without re-reading files
    ///
    /// On failure the previous closures are kept.
    pub fn relink(&mut self) -> ResolverResult<&ModuleMap> {
        let mut modules = self.session.modules.clone();
        let mut graph = DependencyResolver::new().with_skip_unresolved(self.config.skip_unresolved);
        graph.resolve_all(&mut modules, &self.session.registry)?;

        self.session.modules = modules;
        self.session.graph = graph;
        Ok(&self.session.modules)
    }

    /// Modules of the last successful resolution
    pub fn modules(&self) -> &ModuleMap {
        &self.session.modules
    }

    /// Symbol bindings of the last successful resolution
    pub fn registry(&self) -> &SymbolRegistry {
        &self.session.registry
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Where the built-in generator writes deps.js
    pub fn deps_js_path(&self) -> &Path {
        &self.deps_js_path
    }

    /// Handle for inspecting and invalidating the declaration cache
    pub fn cache_controller(&self) -> CacheController {
        CacheController::new(Arc::clone(&self.cache), self.cache_base.clone())
    }

    /// Get cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.lock().stats()
    }

    fn new_session(&self) -> Session {
        Session::new(self.config.skip_unresolved)
    }

    fn module_for_symbol(&self, symbol: &str) -> Option<Module> {
        let filename = self.session.registry.lookup_filename(symbol)?;
        self.session.modules.get(filename).cloned()
    }

    /// Install a finished session and build the caller's view of it
    fn commit(&mut self, session: Session, only_entry: bool) -> ModuleMap {
        tracing::info!(
            modules = session.modules.len(),
            symbols = session.registry.len(),
            "resolved dependencies"
        );
        self.session = session;

        if only_entry {
            self.session
                .modules
                .iter()
                .filter(|(filename, module)| (self.entry_predicate)(filename, module))
                .map(|(filename, module)| (filename.clone(), module.clone()))
                .collect()
        } else {
            self.session.modules.clone()
        }
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("roots", &self.roots)
            .field("pattern", self.parser.pattern())
            .field("deps_js_path", &self.deps_js_path)
            .field("modules", &self.session.modules.len())
            .finish_non_exhaustive()
    }
}

fn absolutize(path: &Path) -> ResolverResult<PathBuf> {
    path::absolutize(path).map_err(|source| ResolverError::Io {
        path: path.to_path_buf(),
        source,
    })
}
