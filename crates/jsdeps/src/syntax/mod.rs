//! Syntax tree for JavaScript sources
//!
//! A deliberately shallow tree: call expressions with dotted callees, array
//! literals, string literals, function bodies and bracketed groups. That is
//! all the extraction patterns look at; everything else collapses into
//! [`Node::Other`]. [`traverse`] visits every node with its parent.

mod lexer;
mod tree;

pub use lexer::{Lexer, Span, Token};
pub use tree::{Call, Node};

use thiserror::Error;

/// Errors raised while turning source text into a tree
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyntaxError {
    /// String or template literal without a closing quote
    #[error("Unterminated string at {line}:{column}")]
    UnterminatedString { line: u32, column: u32 },

    /// Regular expression literal without a closing slash
    #[error("Unterminated regular expression at {line}:{column}")]
    UnterminatedRegex { line: u32, column: u32 },

    /// Character no token starts with
    #[error("Unexpected character '{ch}' at {line}:{column}")]
    UnexpectedCharacter { ch: char, line: u32, column: u32 },

    /// Closing bracket without a matching opener
    #[error("Unexpected '{ch}' at {line}:{column}")]
    UnexpectedClose { ch: char, line: u32, column: u32 },

    /// Opening bracket never closed
    #[error("Unclosed '{open}' opened at {line}:{column}")]
    Unclosed { open: char, line: u32, column: u32 },
}

/// Parse source text into a [`Node::Program`]
pub fn parse(source: &str) -> Result<Node, SyntaxError> {
    let tokens = Lexer::new(source).tokenize()?;
    tree::TreeBuilder::new(&tokens).build()
}

/// Visit every node depth-first, parents before children
///
/// `enter` receives each node together with its parent (`None` for the root).
pub fn traverse<'n, F>(root: &'n Node, enter: &mut F)
where
    F: FnMut(&'n Node, Option<&'n Node>),
{
    fn walk<'n, F>(node: &'n Node, parent: Option<&'n Node>, enter: &mut F)
    where
        F: FnMut(&'n Node, Option<&'n Node>),
    {
        enter(node, parent);
        for child in node.children() {
            walk(child, Some(node), enter);
        }
    }

    walk(root, None, enter)
}
