//! Per-file declaration parsing
//!
//! Consults the declaration cache first and falls back to parsing the file
//! and running the active pattern over its tree. Registration of the
//! provided symbols is a separate step so that the non-blocking resolver can
//! read and extract files concurrently while registering them one at a time.

use crate::cache::{cache_key, DeclarationCache};
use crate::module::Module;
use crate::pattern::PatternKind;
use crate::registry::{RegistryError, SymbolRegistry};
use crate::syntax::{self, SyntaxError};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;

/// Errors raised while parsing one file
#[derive(Debug, Error)]
pub enum ParseError {
    /// The file could not be read or stat'ed
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid source text
    #[error("Syntax error in {}: {source}", .path.display())]
    Syntax {
        path: PathBuf,
        #[source]
        source: SyntaxError,
    },

    /// A provided symbol is already claimed by another file
    #[error(transparent)]
    Conflict(#[from] RegistryError),
}

/// Symbols declared by one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Declarations {
    pub provides: Vec<String>,
    pub requires: Vec<String>,
    /// Taken from the cache rather than extracted
    pub cached: bool,
}

/// Turns files into [`Module`]s
///
/// Cloning is cheap; clones share the pattern and the cache.
#[derive(Debug, Clone)]
pub struct ModuleParser {
    pattern: Arc<PatternKind>,
    cache: Arc<Mutex<DeclarationCache>>,
    /// Directory cache keys are relative to
    cache_base: PathBuf,
}

impl ModuleParser {
    /// Create a new parser
    ///
    /// The pattern is expected to be compiled already.
    pub fn new(
        pattern: Arc<PatternKind>,
        cache: Arc<Mutex<DeclarationCache>>,
        cache_base: PathBuf,
    ) -> Self {
        Self {
            pattern,
            cache,
            cache_base,
        }
    }

    pub fn pattern(&self) -> &PatternKind {
        &self.pattern
    }

    pub fn cache(&self) -> &Arc<Mutex<DeclarationCache>> {
        &self.cache
    }

    /// Parse a file and register its provided symbols
    ///
    /// # Arguments
    /// * `filename` - Absolute path of the file
    /// * `registry` - Session registry receiving the provided symbols
    ///
    /// # Returns
    /// * `Ok(Module)` - Unresolved module for the file
    /// * `Err(ParseError::Conflict)` - A provided symbol belongs to another file
    pub fn parse_sync(
        &self,
        filename: &Path,
        registry: &mut SymbolRegistry,
    ) -> Result<Module, ParseError> {
        let declarations = self.declarations_sync(filename)?;
        Self::register(filename, declarations, registry)
    }

    /// Read the declarations of a file without registering them
    pub fn declarations_sync(&self, filename: &Path) -> Result<Declarations, ParseError> {
        let mtime = std::fs::metadata(filename)
            .and_then(|metadata| metadata.modified())
            .map_err(|source| io_error(filename, source))?;
        if let Some(declarations) = self.check_cache(filename, mtime) {
            return Ok(declarations);
        }

        let source =
            std::fs::read_to_string(filename).map_err(|source| io_error(filename, source))?;
        self.process(filename, &source)
    }

    /// Read the declarations of a file without registering them, using
    /// non-blocking file I/O
    pub async fn parse(&self, filename: &Path) -> Result<Declarations, ParseError> {
        let mtime = tokio::fs::metadata(filename)
            .await
            .and_then(|metadata| metadata.modified())
            .map_err(|source| io_error(filename, source))?;
        if let Some(declarations) = self.check_cache(filename, mtime) {
            return Ok(declarations);
        }

        let source = tokio::fs::read_to_string(filename)
            .await
            .map_err(|source| io_error(filename, source))?;
        self.process(filename, &source)
    }

    /// Register a file's provided symbols and build its module
    ///
    /// Either every provided symbol is registered or none is.
    pub fn register(
        filename: &Path,
        declarations: Declarations,
        registry: &mut SymbolRegistry,
    ) -> Result<Module, ParseError> {
        registry.add_all(&declarations.provides, filename)?;
        Ok(Module::new(
            filename.to_path_buf(),
            declarations.provides,
            declarations.requires,
        ))
    }

    /// Run the active pattern over source text
    pub fn extract(&self, filename: &Path, source: &str) -> Result<Declarations, ParseError> {
        let tree = syntax::parse(source).map_err(|source| ParseError::Syntax {
            path: filename.to_path_buf(),
            source,
        })?;
        let (requires, provides) = self.pattern.collect(filename, &tree);
        Ok(Declarations {
            provides,
            requires,
            cached: false,
        })
    }

    fn check_cache(&self, filename: &Path, mtime: SystemTime) -> Option<Declarations> {
        let key = cache_key(filename, &self.cache_base);
        let entry = self.cache.lock().lookup(&key, mtime)?;
        tracing::debug!(file = %filename.display(), "declaration cache hit");
        Some(Declarations {
            provides: entry.provides,
            requires: entry.requires,
            cached: true,
        })
    }

    fn process(&self, filename: &Path, source: &str) -> Result<Declarations, ParseError> {
        let declarations = self.extract(filename, source)?;
        tracing::debug!(
            file = %filename.display(),
            provides = declarations.provides.len(),
            requires = declarations.requires.len(),
            "extracted declarations"
        );

        self.cache.lock().add_cache(
            cache_key(filename, &self.cache_base),
            declarations.requires.clone(),
            declarations.provides.clone(),
        );
        Ok(declarations)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> ParseError {
    ParseError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Pattern;
    use std::fs;
    use tempfile::TempDir;

    fn parser(base: &Path) -> ModuleParser {
        let mut pattern = PatternKind::default();
        pattern.compile();
        ModuleParser::new(
            Arc::new(pattern),
            Arc::new(Mutex::new(DeclarationCache::in_memory())),
            base.to_path_buf(),
        )
    }

    #[test]
    fn test_parse_sync_registers_symbols() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.js");
        fs::write(&file, "goog.provide('app.a');\ngoog.require('app.b');\n").unwrap();

        let parser = parser(temp.path());
        let mut registry = SymbolRegistry::new();
        let module = parser.parse_sync(&file, &mut registry).unwrap();

        assert_eq!(module.filename(), file.as_path());
        assert_eq!(module.provided_symbols(), ["app.a".to_string()]);
        assert_eq!(module.required_symbols(), ["app.b".to_string()]);
        assert_eq!(registry.lookup_filename("app.a"), Some(file.as_path()));
        assert!(!module.is_resolved());
    }

    #[test]
    fn test_second_parse_hits_cache() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.js");
        fs::write(&file, "goog.provide('app.a');").unwrap();

        let parser = parser(temp.path());
        let first = parser.declarations_sync(&file).unwrap();
        parser.cache().lock().begin_session();
        let second = parser.declarations_sync(&file).unwrap();

        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.provides, second.provides);
        assert_eq!(parser.cache().lock().stats().extractions, 1);
        assert!(parser.cache().lock().get("a.js").is_some());
    }

    #[test]
    fn test_conflict_is_reported() {
        let temp = TempDir::new().unwrap();
        let a = temp.path().join("a.js");
        let b = temp.path().join("b.js");
        fs::write(&a, "goog.provide('x.y');").unwrap();
        fs::write(&b, "goog.provide('x.y');").unwrap();

        let parser = parser(temp.path());
        let mut registry = SymbolRegistry::new();
        parser.parse_sync(&a, &mut registry).unwrap();
        let err = parser.parse_sync(&b, &mut registry).unwrap_err();

        match err {
            ParseError::Conflict(RegistryError::Conflict {
                filename,
                first_defined,
                ..
            }) => {
                assert_eq!(filename, b);
                assert_eq!(first_defined, a);
            }
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp = TempDir::new().unwrap();
        let parser = parser(temp.path());
        let result = parser.declarations_sync(&temp.path().join("nope.js"));
        assert!(matches!(result, Err(ParseError::Io { .. })));
    }

    #[test]
    fn test_syntax_error_names_file() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("broken.js");
        fs::write(&file, "goog.provide('unterminated);").unwrap();

        let err = parser(temp.path()).declarations_sync(&file).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
        assert!(err.to_string().contains("broken.js"));
    }

    #[tokio::test]
    async fn test_async_parse_matches_sync() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("a.js");
        fs::write(&file, "goog.provide('app.a'); goog.require('app.b');").unwrap();

        let sync = parser(temp.path()).declarations_sync(&file).unwrap();
        let parsed = parser(temp.path()).parse(&file).await.unwrap();
        assert_eq!(sync, parsed);
    }
}
