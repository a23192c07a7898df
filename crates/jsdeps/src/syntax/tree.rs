//! Tree construction over the token stream.

use super::lexer::{Span, Token};
use super::SyntaxError;

/// A node of the syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Whole file
    Program(Vec<Node>),
    /// `a.b.c(args...)`
    Call(Call),
    /// `function name(...) { body }`; parameters are dropped
    Function { name: Option<String>, body: Vec<Node> },
    /// `[elements...]`
    Array(Vec<Node>),
    /// `{ ... }`, either a statement block or an object literal
    Block(Vec<Node>),
    /// `( ... )` not preceded by a callee
    Group(Vec<Node>),
    /// Several items forming one argument or element, e.g. `a + b`
    Sequence(Vec<Node>),
    Str(String),
    Ident(String),
    /// Dotted path not followed by a call, e.g. `goog.global`
    Member(Vec<String>),
    Other,
}

/// A call expression whose callee is a plain dotted path.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub callee: Vec<String>,
    pub args: Vec<Node>,
    pub span: Span,
}

impl Call {
    /// Check whether the callee is exactly the given dotted path
    pub fn callee_is(&self, path: &[String]) -> bool {
        self.callee == path
    }

    /// Get the argument at `index`
    pub fn arg(&self, index: usize) -> Option<&Node> {
        self.args.get(index)
    }
}

impl Node {
    /// Direct children in source order
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Program(children)
            | Node::Array(children)
            | Node::Block(children)
            | Node::Group(children)
            | Node::Sequence(children) => children,
            Node::Call(call) => &call.args,
            Node::Function { body, .. } => body,
            Node::Str(_) | Node::Ident(_) | Node::Member(_) | Node::Other => &[],
        }
    }

    /// String literal value, if this is one
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Node::Str(value) => Some(value),
            _ => None,
        }
    }

    /// Call expression, if this is one
    pub fn as_call(&self) -> Option<&Call> {
        match self {
            Node::Call(call) => Some(call),
            _ => None,
        }
    }

    /// Array elements, if this is an array literal
    pub fn as_array(&self) -> Option<&[Node]> {
        match self {
            Node::Array(elements) => Some(elements),
            _ => None,
        }
    }
}

pub(super) struct TreeBuilder<'t> {
    tokens: &'t [(Token, Span)],
    pos: usize,
}

impl<'t> TreeBuilder<'t> {
    pub(super) fn new(tokens: &'t [(Token, Span)]) -> Self {
        Self { tokens, pos: 0 }
    }

    pub(super) fn build(mut self) -> Result<Node, SyntaxError> {
        let mut body = Vec::new();
        while self.peek().is_some() {
            body.push(self.parse_item()?);
        }
        Ok(Node::Program(body))
    }

    fn peek(&self) -> Option<&'t (Token, Span)> {
        self.tokens.get(self.pos)
    }

    fn peek_token(&self, ahead: usize) -> Option<&'t Token> {
        self.tokens.get(self.pos + ahead).map(|(token, _)| token)
    }

    fn next(&mut self) -> Option<&'t (Token, Span)> {
        let item = self.tokens.get(self.pos);
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn parse_item(&mut self) -> Result<Node, SyntaxError> {
        let Some((token, span)) = self.next() else {
            return Ok(Node::Other);
        };

        match token {
            Token::Identifier(word) if word == "function" => self.parse_function(),
            Token::Identifier(name) => self.parse_path(name, *span),
            Token::Str(value) => Ok(Node::Str(value.clone())),
            Token::Punct('(') => Ok(Node::Group(self.parse_list(')', *span)?)),
            Token::Punct('[') => Ok(Node::Array(self.parse_list(']', *span)?)),
            Token::Punct('{') => Ok(Node::Block(self.parse_block(*span)?)),
            Token::Punct(ch @ (')' | ']' | '}')) => Err(SyntaxError::UnexpectedClose {
                ch: *ch,
                line: span.line,
                column: span.column,
            }),
            _ => Ok(Node::Other),
        }
    }

    fn parse_path(&mut self, first: &str, span: Span) -> Result<Node, SyntaxError> {
        let mut path = vec![first.to_string()];
        while let (Some(Token::Punct('.')), Some(Token::Identifier(next))) =
            (self.peek_token(0), self.peek_token(1))
        {
            path.push(next.clone());
            self.pos += 2;
        }

        if let Some((Token::Punct('('), open)) = self.peek() {
            self.pos += 1;
            let args = self.parse_list(')', *open)?;
            return Ok(Node::Call(Call {
                callee: path,
                args,
                span,
            }));
        }

        if path.len() == 1 {
            Ok(Node::Ident(first.to_string()))
        } else {
            Ok(Node::Member(path))
        }
    }

    fn parse_function(&mut self) -> Result<Node, SyntaxError> {
        // Generator marker
        if let Some(Token::Punct('*')) = self.peek_token(0) {
            self.pos += 1;
        }

        let mut name = None;
        if let Some(Token::Identifier(ident)) = self.peek_token(0) {
            name = Some(ident.clone());
            self.pos += 1;
        }

        let Some((Token::Punct('('), open)) = self.peek() else {
            return Ok(Node::Other);
        };
        self.pos += 1;
        self.parse_list(')', *open)?;

        let Some((Token::Punct('{'), open)) = self.peek() else {
            return Ok(Node::Other);
        };
        self.pos += 1;
        let body = self.parse_block(*open)?;

        Ok(Node::Function { name, body })
    }

    fn parse_block(&mut self, open: Span) -> Result<Vec<Node>, SyntaxError> {
        let mut items = Vec::new();
        loop {
            match self.peek() {
                None => {
                    return Err(SyntaxError::Unclosed {
                        open: '{',
                        line: open.line,
                        column: open.column,
                    })
                }
                Some((Token::Punct('}'), _)) => {
                    self.pos += 1;
                    return Ok(items);
                }
                Some(_) => items.push(self.parse_item()?),
            }
        }
    }

    /// Parse a comma separated list up to `close`
    ///
    /// Each entry collapses to a single node when it is made of one item,
    /// otherwise it becomes a [`Node::Sequence`].
    fn parse_list(&mut self, close: char, open: Span) -> Result<Vec<Node>, SyntaxError> {
        let open_char = if close == ')' { '(' } else { '[' };
        let mut entries = Vec::new();
        let mut current = Vec::new();

        loop {
            match self.peek() {
                None => {
                    return Err(SyntaxError::Unclosed {
                        open: open_char,
                        line: open.line,
                        column: open.column,
                    })
                }
                Some((Token::Punct(ch), _)) if *ch == close => {
                    self.pos += 1;
                    break;
                }
                Some((Token::Punct(','), _)) => {
                    self.pos += 1;
                    entries.push(collapse(std::mem::take(&mut current)));
                }
                Some(_) => current.push(self.parse_item()?),
            }
        }

        if !current.is_empty() {
            entries.push(collapse(current));
        }
        Ok(entries)
    }
}

fn collapse(mut items: Vec<Node>) -> Node {
    if items.len() == 1 {
        items.pop().unwrap_or(Node::Other)
    } else {
        Node::Sequence(items)
    }
}
