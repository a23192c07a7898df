//! Namespace-style declarations: `goog.provide('a.b.c')`, `goog.require('a.b.c')`

use super::Pattern;
use crate::syntax::Node;
use once_cell::sync::OnceCell;
use std::path::Path;

/// Default namespace object
pub const DEFAULT_NAMESPACE: &str = "goog";

#[derive(Debug, Clone)]
struct Callees {
    provide: Vec<String>,
    require: Vec<String>,
}

/// Recognizes `<ns>.provide` / `<ns>.require` calls with a dotted string literal
#[derive(Debug, Clone)]
pub struct NamespacePattern {
    namespace: String,
    callees: OnceCell<Callees>,
}

impl NamespacePattern {
    /// Create a pattern for a namespace object other than `goog`
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            callees: OnceCell::new(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn callees(&self) -> &Callees {
        self.callees.get_or_init(|| {
            let mut base: Vec<String> = self.namespace.split('.').map(String::from).collect();
            let mut require = base.clone();
            base.push("provide".to_string());
            require.push("require".to_string());
            Callees {
                provide: base,
                require,
            }
        })
    }
}

impl Default for NamespacePattern {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl Pattern for NamespacePattern {
    fn compile(&mut self) {
        self.callees();
    }

    fn matches(
        &self,
        _filename: &Path,
        node: &Node,
        _parent: Option<&Node>,
        requires: &mut Vec<String>,
        provides: &mut Vec<String>,
    ) {
        let Some(call) = node.as_call() else {
            return;
        };
        let callees = self.callees();
        let target = if call.callee_is(&callees.provide) {
            provides
        } else if call.callee_is(&callees.require) {
            requires
        } else {
            return;
        };

        // Non-literal arguments (`goog.require(name)`) are ignored
        if let Some(symbol) = call.arg(0).and_then(Node::as_str) {
            if is_dotted_symbol(symbol) {
                target.push(symbol.to_string());
            }
        }
    }
}

/// `a.b.c` where every segment is an identifier
fn is_dotted_symbol(symbol: &str) -> bool {
    symbol.split('.').all(|segment| {
        let mut chars = segment.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
            }
            _ => false,
        }
    })
}
