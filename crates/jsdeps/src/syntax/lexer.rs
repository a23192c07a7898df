//! Lexer for JavaScript sources.
//!
//! Built on logos. It only distinguishes what the tree builder needs:
//! identifiers, string literals, bracket punctuation and opaque literals.
//! Regular expression literals are recognized from the preceding token so
//! that brackets and quotes inside them do not leak into the tree.

use logos::Logos;

use super::SyntaxError;

/// Source location of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Span {
    pub fn new(start: usize, end: usize, line: u32, column: u32) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

/// A lexed token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Identifier(String),
    Str(String),
    Template,
    Number,
    Regex,
    Punct(char),
}

#[derive(Logos, Debug, Clone, PartialEq)]
enum LogosToken {
    // Whitespace (skip)
    #[regex(r"\s+", logos::skip)]
    Whitespace,

    // Comments (skip)
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[regex(r"/\*", lex_block_comment)]
    BlockComment,

    #[regex(r"[A-Za-z_$][A-Za-z0-9_$]*", |lex| lex.slice().to_string())]
    Identifier(String),

    #[regex(r#""([^"\\\n]|\\(.|\n))*""#, parse_string)]
    #[regex(r#"'([^'\\\n]|\\(.|\n))*'"#, parse_string)]
    StringLiteral(String),

    #[regex(r"`([^`\\]|\\(.|\n))*`")]
    Template,

    #[regex(r"[0-9][0-9A-Za-z_.]*")]
    Number,

    #[token("/")]
    Slash,

    #[regex(r#"[^\sA-Za-z0-9_$"'`/]"#, |lex| lex.slice().chars().next())]
    Punct(char),
}

/// Keywords after which a `/` starts a regular expression.
const EXPRESSION_KEYWORDS: &[&str] = &[
    "return", "typeof", "case", "do", "else", "in", "instanceof", "new", "delete", "void",
    "throw", "yield", "await",
];

fn lex_block_comment(lex: &mut logos::Lexer<LogosToken>) -> logos::Skip {
    // We've already consumed "/*", now find "*/"
    let remainder = lex.remainder();

    if let Some(end) = remainder.find("*/") {
        lex.bump(end + 2);
    } else {
        // Unterminated comment - consume to end
        lex.bump(remainder.len());
    }

    logos::Skip
}

fn parse_string(lex: &mut logos::Lexer<LogosToken>) -> Option<String> {
    let s = lex.slice();
    let inner = &s[1..s.len() - 1]; // Remove quotes
    Some(unescape_string(inner))
}

fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('0') => result.push('\0'),
                // Line continuation
                Some('\n') => {}
                Some(c) => result.push(c),
                None => break,
            }
        } else {
            result.push(c);
        }
    }

    result
}

/// Length of a regular expression literal body, starting right after the
/// opening `/`, including the closing `/` and any flags.
fn scan_regex(remainder: &str) -> Option<usize> {
    let mut in_class = false;
    let mut escaped = false;

    for (offset, c) in remainder.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\n' => return None,
            '\\' => escaped = true,
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => {
                let after = offset + 1;
                let flags = remainder[after..]
                    .chars()
                    .take_while(|c| c.is_ascii_alphabetic())
                    .count();
                return Some(after + flags);
            }
            _ => {}
        }
    }

    None
}

fn regex_allowed(tokens: &[(Token, Span)]) -> bool {
    if ends_with_postfix_update(tokens) {
        return false;
    }
    match tokens.last().map(|(token, _)| token) {
        None => true,
        Some(Token::Punct(c)) => !matches!(c, ')' | ']' | '}'),
        Some(Token::Identifier(word)) => EXPRESSION_KEYWORDS.contains(&word.as_str()),
        Some(_) => false,
    }
}

fn is_operand(token: &Token) -> bool {
    match token {
        Token::Identifier(word) => !EXPRESSION_KEYWORDS.contains(&word.as_str()),
        Token::Str(_) | Token::Template | Token::Number | Token::Regex => true,
        Token::Punct(c) => matches!(c, ')' | ']'),
    }
}

/// Check for `++` or `--` directly following an operand, as in `i++ / 2`
fn ends_with_postfix_update(tokens: &[(Token, Span)]) -> bool {
    let [.., (operand, _), (Token::Punct(first), first_span), (Token::Punct(second), second_span)] = tokens else {
        return false;
    };
    matches!(*first, '+' | '-')
        && first == second
        && first_span.end == second_span.start
        && is_operand(operand)
}

/// Main lexer structure.
pub struct Lexer<'a> {
    source: &'a str,
    tokens: Vec<(Token, Span)>,
    line: u32,
    column: u32,
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            tokens: Vec::new(),
            line: 1,
            column: 1,
            position: 0,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<(Token, Span)>, SyntaxError> {
        let mut logos_lexer = LogosToken::lexer(self.source);

        while let Some(token_result) = logos_lexer.next() {
            let range = logos_lexer.span();
            self.advance_to(range.start);
            let (line, column) = (self.line, self.column);

            let (token, end) = match token_result {
                Ok(LogosToken::Slash) if regex_allowed(&self.tokens) => {
                    let body = scan_regex(logos_lexer.remainder())
                        .ok_or(SyntaxError::UnterminatedRegex { line, column })?;
                    logos_lexer.bump(body);
                    (Token::Regex, range.end + body)
                }
                Ok(logos_token) => (Self::convert_token(logos_token), range.end),
                Err(_) => {
                    let ch = self.source[range.start..].chars().next().unwrap_or('\0');
                    return Err(match ch {
                        '"' | '\'' | '`' => SyntaxError::UnterminatedString { line, column },
                        _ => SyntaxError::UnexpectedCharacter { ch, line, column },
                    });
                }
            };

            self.tokens
                .push((token, Span::new(range.start, end, line, column)));
            self.advance_to(end);
        }

        Ok(self.tokens)
    }

    fn advance_to(&mut self, offset: usize) {
        for c in self.source[self.position..offset].chars() {
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        self.position = offset;
    }

    fn convert_token(logos_token: LogosToken) -> Token {
        match logos_token {
            LogosToken::Identifier(s) => Token::Identifier(s),
            LogosToken::StringLiteral(s) => Token::Str(s),
            LogosToken::Template => Token::Template,
            LogosToken::Number => Token::Number,
            LogosToken::Slash => Token::Punct('/'),
            LogosToken::Punct(c) => Token::Punct(c),
            LogosToken::Whitespace | LogosToken::LineComment | LogosToken::BlockComment => {
                unreachable!("Whitespace and comments should be skipped")
            }
        }
    }
}
