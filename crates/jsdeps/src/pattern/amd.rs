//! AMD-style declarations
//!
//! - `define("id", ["dep"], factory)` provides `id`
//! - `define(["dep"], factory)` / `define(factory)` provide the file's module id
//! - top-level `require(["dep"], callback)` only requires
//!
//! The module id of a file is its path relative to the AMD base directory,
//! slash separated, without extension. Relative dependencies (`./x`,
//! `../x`) are resolved against the directory of the declaring module id.

use super::Pattern;
use crate::path;
use crate::syntax::Node;
use std::path::{Path, PathBuf};

/// Dependency names the loader injects rather than loads
const RESERVED_DEPENDENCIES: &[&str] = &["require", "exports", "module"];

#[derive(Debug, Clone)]
pub struct AmdPattern {
    base: PathBuf,
    define: Vec<String>,
    require: Vec<String>,
}

impl AmdPattern {
    /// Create a pattern whose module ids are relative to `base`
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            define: vec!["define".to_string()],
            require: vec!["require".to_string()],
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Module id for a file, e.g. `<base>/app/main.js` → `app/main`
    pub fn module_id(&self, filename: &Path) -> String {
        let relative = path::relative_to(&filename.with_extension(""), &self.base);
        path::to_slash(&relative)
    }

    fn push_dependencies(&self, id: Option<&str>, elements: &[Node], requires: &mut Vec<String>) {
        for dependency in elements.iter().filter_map(Node::as_str) {
            if RESERVED_DEPENDENCIES.contains(&dependency) {
                continue;
            }
            requires.push(resolve_relative(id, dependency));
        }
    }
}

impl Default for AmdPattern {
    fn default() -> Self {
        Self::new(".")
    }
}

impl Pattern for AmdPattern {
    fn compile(&mut self) {
        self.base = path::normalize(&self.base);
    }

    fn matches(
        &self,
        filename: &Path,
        node: &Node,
        parent: Option<&Node>,
        requires: &mut Vec<String>,
        provides: &mut Vec<String>,
    ) {
        let Some(call) = node.as_call() else {
            return;
        };

        if call.callee_is(&self.define) {
            let (id, rest) = match call.args.split_first() {
                None => return,
                Some((Node::Str(id), rest)) => (id.clone(), rest),
                Some(_) => (self.module_id(filename), &call.args[..]),
            };
            if let Some(elements) = rest.first().and_then(Node::as_array) {
                self.push_dependencies(Some(&id), elements, requires);
            }
            provides.push(id);
        } else if call.callee_is(&self.require) && matches!(parent, Some(Node::Program(_))) {
            if let Some(elements) = call.arg(0).and_then(Node::as_array) {
                let id = self.module_id(filename);
                self.push_dependencies(Some(&id), elements, requires);
            }
        }
    }
}

/// Resolve `./x` and `../x` against the directory of module `id`
fn resolve_relative(id: Option<&str>, dependency: &str) -> String {
    let Some(id) = id else {
        return dependency.to_string();
    };
    if !(dependency.starts_with("./") || dependency.starts_with("../")) {
        return dependency.to_string();
    }

    let mut segments: Vec<&str> = id.split('/').collect();
    segments.pop();
    for segment in dependency.split('/') {
        match segment {
            "." | "" => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
