//! JavaScript Dependency Resolver
//!
//! This crate discovers source files under a set of roots, extracts the
//! symbols each file provides and requires, and computes for every file the
//! transitive closure of files it depends on. It includes:
//! - Symbol registry with duplicate-definition detection
//! - Pluggable extraction patterns (namespace-style and AMD-style)
//! - Declaration cache keyed by file modification time
//! - Memoized, cycle-tolerant dependency resolution
//! - Blocking and tokio-based resolution modes
//! - Loader manifest (deps.js) generation

pub mod cache;
pub mod config;
pub mod graph;
pub mod manifest;
pub mod module;
pub mod parser;
pub mod path;
pub mod pattern;
pub mod registry;
pub mod resolver;
pub mod syntax;
pub mod walk;

pub use cache::{CacheController, CacheEntry, CacheError, CacheStats, CacheStore, DeclarationCache};
pub use config::{ConfigError, PatternName, ResolverConfig};
pub use graph::{DependencyResolver, GraphError};
pub use manifest::{DepsJsGenerator, ManifestError, ManifestGenerator};
pub use module::{Module, ModuleMap};
pub use parser::{Declarations, ModuleParser, ParseError};
pub use pattern::{AmdPattern, NamespacePattern, Pattern, PatternKind};
pub use registry::{RegistryError, SymbolRegistry};
pub use resolver::{default_entry_predicate, EntryPredicate, Resolver, ResolverError};
pub use syntax::{Node, SyntaxError};
pub use walk::{WalkError, WalkFilter};
