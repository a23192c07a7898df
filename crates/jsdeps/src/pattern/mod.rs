//! Symbol extraction patterns
//!
//! A pattern is invoked once per syntax-tree node and appends the symbols
//! the node declares to the `requires`/`provides` accumulators. Exactly one
//! pattern is active per resolver.

mod amd;
mod namespace;

pub use amd::AmdPattern;
pub use namespace::{NamespacePattern, DEFAULT_NAMESPACE};

use crate::syntax::{self, Node};
use std::fmt;
use std::path::Path;

/// Declaration-recognition strategy
pub trait Pattern: Send + Sync {
    /// Precompute internal matchers; called once before the first file
    fn compile(&mut self) {}

    /// Inspect one node and record any declarations it makes
    ///
    /// # Arguments
    /// * `filename` - File the tree was parsed from
    /// * `node` - Node being visited
    /// * `parent` - Parent of `node`, `None` for the root
    /// * `requires` - Required symbols, appended in encounter order
    /// * `provides` - Provided symbols, appended in encounter order
    fn matches(
        &self,
        filename: &Path,
        node: &Node,
        parent: Option<&Node>,
        requires: &mut Vec<String>,
        provides: &mut Vec<String>,
    );
}

/// The built-in patterns plus a slot for caller-supplied ones
pub enum PatternKind {
    /// `goog.provide('a.b')` / `goog.require('a.b')`
    Namespace(NamespacePattern),
    /// `define([...], factory)` / `require([...], callback)`
    Amd(AmdPattern),
    Custom(Box<dyn Pattern>),
}

impl PatternKind {
    /// Wrap a caller-supplied pattern
    pub fn custom(pattern: impl Pattern + 'static) -> Self {
        PatternKind::Custom(Box::new(pattern))
    }

    /// Run the pattern over a whole tree
    ///
    /// # Returns
    /// `(requires, provides)` in encounter order
    pub fn collect(&self, filename: &Path, tree: &Node) -> (Vec<String>, Vec<String>) {
        let mut requires = Vec::new();
        let mut provides = Vec::new();
        syntax::traverse(tree, &mut |node, parent| {
            self.matches(filename, node, parent, &mut requires, &mut provides)
        });
        (requires, provides)
    }
}

impl Default for PatternKind {
    fn default() -> Self {
        PatternKind::Namespace(NamespacePattern::default())
    }
}

impl fmt::Debug for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatternKind::Namespace(pattern) => f.debug_tuple("Namespace").field(pattern).finish(),
            PatternKind::Amd(pattern) => f.debug_tuple("Amd").field(pattern).finish(),
            PatternKind::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl Pattern for PatternKind {
    fn compile(&mut self) {
        match self {
            PatternKind::Namespace(pattern) => pattern.compile(),
            PatternKind::Amd(pattern) => pattern.compile(),
            PatternKind::Custom(pattern) => pattern.compile(),
        }
    }

    fn matches(
        &self,
        filename: &Path,
        node: &Node,
        parent: Option<&Node>,
        requires: &mut Vec<String>,
        provides: &mut Vec<String>,
    ) {
        match self {
            PatternKind::Namespace(pattern) => {
                pattern.matches(filename, node, parent, requires, provides)
            }
            PatternKind::Amd(pattern) => pattern.matches(filename, node, parent, requires, provides),
            PatternKind::Custom(pattern) => {
                pattern.matches(filename, node, parent, requires, provides)
            }
        }
    }
}
