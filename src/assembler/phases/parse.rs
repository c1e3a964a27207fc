use super::tokenize::{Token, TokenKind};
use super::types::{Located, Position};
use crate::arch;
use crate::assembler::model::{Ast, Composite, Kind, Node};
use crate::common;
use std::fmt::Display;

const CONST_NAME: &str = "const";

// Address-mode fragment standing for a plain register reference.
const REGISTER_MARKER: &str = "r";

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    InvalidCharLiteral(String),
    InvalidStringLiteral(String),
    UnexpectedEnd(TokenKind),
    MismatchedEnd(TokenKind, Kind),
    Unclosed(Kind),
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidCharLiteral(raw) => write!(f, "invalid character literal {}", raw),
            Error::InvalidStringLiteral(raw) => write!(f, "invalid string literal {}", raw),
            Error::UnexpectedEnd(tk) => write!(f, "{} without a matching begin", tk),
            Error::MismatchedEnd(tk, kind) => write!(f, "{} cannot close an open {}", tk, kind),
            Error::Unclosed(kind) => write!(f, "{} is never closed", kind),
        }
    }
}

/// The children of one open composite, or of the tree root.
#[derive(Default)]
struct Level {
    nodes: Vec<Node>,
    // Index of the address-mode descriptor still accepting fragments; any
    // node other than a resolved register index closes it.
    address_mode: Option<usize>,
}

impl Level {
    fn push(&mut self, node: Node) {
        self.address_mode = None;
        self.nodes.push(node);
    }

    /// Adds a descriptor fragment. While a run is open the fragment joins the
    /// run's descriptor, even when register indices already follow it, so
    /// `[r1 + r2]` closes as `AddressMode("r]")`, `Number("2")`: a closing
    /// bracket can sit in a descriptor ahead of the index it encloses.
    fn push_address_mode(&mut self, pos: Position, fragment: &str) {
        if let Some(Node::Terminal(t)) = self.address_mode.and_then(|idx| self.nodes.get_mut(idx)) {
            t.extend_value(fragment);
            return;
        }

        self.address_mode = Some(self.nodes.len());
        self.nodes
            .push(Node::terminal(pos, Kind::AddressMode, fragment));
    }

    fn push_register_index(&mut self, pos: Position, index: usize) {
        self.nodes
            .push(Node::terminal(pos, Kind::Number, index.to_string()));
    }
}

struct Frame {
    kind: Kind,
    pos: Position,
    level: Level,
}

/// Builds the tree for one source unit from its token events, keeping the
/// open composites on an explicit stack.
#[derive(Default)]
pub struct Builder {
    root: Level,
    open: Vec<Frame>,
}

impl Builder {
    pub fn new() -> Self {
        Builder::default()
    }

    fn top(&mut self) -> &mut Level {
        match self.open.last_mut() {
            Some(frame) => &mut frame.level,
            None => &mut self.root,
        }
    }

    fn open(&mut self, kind: Kind, pos: Position, name: Option<Node>) {
        // The parent gains a child here, so its descriptor run is over.
        self.top().address_mode = None;

        let mut level = Level::default();
        level.nodes.extend(name);
        self.open.push(Frame { kind, pos, level });
    }

    fn close(&mut self, end: TokenKind, pos: Position) -> Result<(), Located<Error>> {
        let frame = match self.open.pop() {
            Some(frame) => frame,
            None => return Err(Located::with_pos(pos, Error::UnexpectedEnd(end))),
        };

        let matches = match end {
            TokenKind::InstructionEnd => {
                frame.kind == Kind::Instruction || frame.kind == Kind::Constant
            }
            TokenKind::MacroEnd => frame.kind == Kind::Macro,
            TokenKind::ExpressionEnd => frame.kind == Kind::Expression,
            TokenKind::IfEnd => frame.kind == Kind::Conditional,
            _ => false,
        };
        if !matches {
            return Err(Located::with_pos(pos, Error::MismatchedEnd(end, frame.kind)));
        }

        let node = Composite::with_nodes(frame.pos, frame.kind, frame.level.nodes);
        self.top().push(node.into());
        Ok(())
    }

    pub fn feed(&mut self, token: Token) -> Result<(), Located<Error>> {
        let Token { kind, pos, value } = token;

        match kind {
            TokenKind::InstructionBegin => {
                let kind = if common::eq_ignore_case(&value, CONST_NAME) {
                    Kind::Constant
                } else {
                    Kind::Instruction
                };
                let name = Node::terminal(pos.clone(), Kind::Ident, value);
                self.open(kind, pos, Some(name));
            }
            TokenKind::MacroBegin => {
                let name = Node::terminal(pos.clone(), Kind::Ident, value);
                self.open(Kind::Macro, pos, Some(name));
            }
            TokenKind::ExpressionBegin => self.open(Kind::Expression, pos, None),
            TokenKind::IfBegin => self.open(Kind::Conditional, pos, None),

            TokenKind::InstructionEnd
            | TokenKind::MacroEnd
            | TokenKind::ExpressionEnd
            | TokenKind::IfEnd => self.close(kind, pos)?,

            TokenKind::TypeDescriptor => self
                .top()
                .push(Node::terminal(pos, Kind::TypeDescriptor, value)),
            TokenKind::BreakPoint => self.top().push(Node::terminal(pos, Kind::BreakPoint, value)),
            TokenKind::Label => self.top().push(Node::terminal(pos, Kind::Label, value)),
            TokenKind::Number => self.top().push(Node::terminal(pos, Kind::Number, value)),
            TokenKind::Operator => self.top().push(Node::terminal(pos, Kind::Operator, value)),
            TokenKind::ScopeBegin => self.top().push(Node::terminal(pos, Kind::ScopeBegin, "")),
            TokenKind::ScopeEnd => self.top().push(Node::terminal(pos, Kind::ScopeEnd, "")),

            TokenKind::Ident => match arch::register_index(&value) {
                Some(index) => {
                    let top = self.top();
                    top.push_address_mode(pos.clone(), REGISTER_MARKER);
                    top.push_register_index(pos, index);
                }
                None => self.top().push(Node::terminal(pos, Kind::Ident, value)),
            },

            TokenKind::AddressMode => self.top().push_address_mode(pos, &value),

            TokenKind::Char => {
                let c = match unquote_char(&value) {
                    Some(c) => c,
                    None => return Err(Located::with_pos(pos, Error::InvalidCharLiteral(value))),
                };
                // Characters are numbers from here on.
                self.top()
                    .push(Node::terminal(pos, Kind::Number, (c as u32).to_string()));
            }

            TokenKind::String => {
                let s = match unquote(&value) {
                    Some(s) => s,
                    None => {
                        return Err(Located::with_pos(pos, Error::InvalidStringLiteral(value)))
                    }
                };
                self.top().push(Node::terminal(pos, Kind::String, s));
            }
        }

        Ok(())
    }

    pub fn finish(self) -> Result<Ast, Located<Error>> {
        if let Some(frame) = self.open.last() {
            return Err(Located::with_pos(
                frame.pos.clone(),
                Error::Unclosed(frame.kind),
            ));
        }

        Ok(Ast::from_nodes(self.root.nodes))
    }
}

pub fn parse(tokens: impl IntoIterator<Item = Token>) -> Result<Ast, Located<Error>> {
    let mut builder = Builder::new();
    for token in tokens {
        builder.feed(token)?;
    }
    builder.finish()
}

/// Strips the quotes from a string or character literal and resolves its
/// escapes. Backquoted literals are taken verbatim.
pub fn unquote(raw: &str) -> Option<String> {
    let mut chars = raw.chars();
    let quote = chars.next()?;
    if chars.next_back()? != quote {
        return None;
    }
    let body = chars.as_str();

    match quote {
        '`' => {
            if body.contains('`') {
                None
            } else {
                Some(body.replace('\r', ""))
            }
        }
        '"' | '\'' => unescape(body, quote),
        _ => None,
    }
}

/// Unquotes a character literal, which must hold exactly one code point.
pub fn unquote_char(raw: &str) -> Option<char> {
    if !raw.starts_with('\'') {
        return None;
    }

    let s = unquote(raw)?;
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Some(c),
        _ => None,
    }
}

fn unescape(body: &str, quote: char) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        if c == quote || c == '\n' {
            return None;
        }
        if c != '\\' {
            out.push(c);
            continue;
        }

        let esc = chars.next()?;
        let resolved = match esc {
            'a' => '\u{07}',
            'b' => '\u{08}',
            'f' => '\u{0c}',
            'n' => '\n',
            'r' => '\r',
            't' => '\t',
            'v' => '\u{0b}',
            '\\' => '\\',
            '\'' | '"' if esc == quote => esc,
            'x' => std::char::from_u32(take_digits(&mut chars, 2, 16)?)?,
            'u' => std::char::from_u32(take_digits(&mut chars, 4, 16)?)?,
            'U' => std::char::from_u32(take_digits(&mut chars, 8, 16)?)?,
            '0'..='7' => {
                let val = esc.to_digit(8)? * 64 + take_digits(&mut chars, 2, 8)?;
                if val > 0xff {
                    return None;
                }
                std::char::from_u32(val)?
            }
            _ => return None,
        };
        out.push(resolved);
    }

    Some(out)
}

/// Reads exactly `n` digits of `radix`; signs and short runs are rejected.
fn take_digits(chars: &mut std::str::Chars<'_>, n: usize, radix: u32) -> Option<u32> {
    (0..n).try_fold(0, |acc: u32, _| Some(acc * radix + chars.next()?.to_digit(radix)?))
}
