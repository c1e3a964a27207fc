use super::types::{Located, Position};
use crate::common;
use derive_more::Constructor;
use std::{fmt::Display, sync::Arc};
use strum_macros::Display as StrumDisplay;

#[derive(Debug, PartialEq, Eq)]
pub enum Error {
    MalformedToken(String, &'static str),
    UnexpectedCharacter(char),
    UnterminatedLiteral(char),
    EmptyArgument,
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::MalformedToken(raw, msg) => write!(f, "Malformed token '{}': {}", raw, msg),
            Error::UnexpectedCharacter(c) => write!(f, "Unexpected character {:?}", c),
            Error::UnterminatedLiteral(quote) => {
                write!(f, "Encountered unterminated {} literal", literal_name(*quote))
            }
            Error::EmptyArgument => write!(f, "Empty instruction argument"),
        }
    }
}

fn literal_name(quote: char) -> &'static str {
    if quote == Cursor::CHAR_QUOTE {
        "character"
    } else {
        "string"
    }
}

/// The kinds of token event the tree builder consumes. Begin/end pairs
/// delimit composites; everything else is a single leaf.
#[derive(Debug, StrumDisplay, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    InstructionBegin,
    InstructionEnd,
    MacroBegin,
    MacroEnd,
    ExpressionBegin,
    ExpressionEnd,
    IfBegin,
    IfEnd,

    TypeDescriptor,
    BreakPoint,
    Label,
    Number,
    Operator,
    Ident,
    AddressMode,
    ScopeBegin,
    ScopeEnd,
    Char,
    String,
}

#[derive(Debug, Clone, PartialEq, Eq, Constructor)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Position,
    pub value: String,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.kind, self.value)
    }
}

const TYPE_DESCRIPTORS: [&str; 7] = ["u8", "u16", "u32", "i8", "i16", "i32", "f32"];

// Longest match first.
const OPERATORS: [&str; 23] = [
    "<<", ">>", "==", "!=", "<=", ">=", "&&", "||", "+", "-", "*", "/", "%", "&", "|", "^", "~",
    "!", "<", ">", "=", "(", ")",
];

struct Cursor<'a> {
    file: &'a Arc<str>,
    line: usize,
    chars: Vec<char>,
    at: usize,
}

impl<'a> Cursor<'a> {
    const COMMENT_CHAR: char = ';';
    const LABEL_CHAR: char = ':';
    const ARG_SEPARATOR: char = ',';
    const STRING_QUOTE: char = '"';
    const CHAR_QUOTE: char = '\'';
    const ESCAPE_CHAR: char = '\\';

    fn new(file: &'a Arc<str>, line: usize, text: &str) -> Self {
        Cursor {
            file,
            line,
            chars: text.chars().collect(),
            at: 0,
        }
    }

    fn pos(&self) -> Position {
        Position::new(self.file.clone(), self.line, self.at + 1)
    }

    fn raw_peek(&self) -> Option<char> {
        self.chars.get(self.at).copied()
    }

    /// Like `raw_peek`, but a comment reads as the end of the line.
    fn peek(&self) -> Option<char> {
        self.raw_peek().filter(|&c| c != Cursor::COMMENT_CHAR)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.raw_peek();
        if c.is_some() {
            self.at += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while self.peek().map_or(false, char::is_whitespace) {
            self.at += 1;
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.at;
        while self.peek().map_or(false, &pred) {
            self.at += 1;
        }
        self.chars[start..self.at].iter().collect()
    }

    fn error<T>(&self, pos: Position, err: Error) -> Result<T, Located<Error>> {
        Err(Located::with_pos(pos, err))
    }

    fn is_ident_start(c: char) -> bool {
        c.is_alphabetic() || c == '_'
    }

    fn is_ident_char(c: char) -> bool {
        c.is_alphanumeric() || c == '_' || c == '.'
    }

    fn ident(&mut self) -> Option<String> {
        if self.peek().map_or(false, Cursor::is_ident_start) {
            Some(self.take_while(Cursor::is_ident_char))
        } else {
            None
        }
    }

    fn expect_ident(&mut self, what: &'static str) -> Result<(Position, String), Located<Error>> {
        self.skip_whitespace();
        let pos = self.pos();
        match self.ident() {
            Some(name) => Ok((pos, name)),
            None => match self.peek() {
                Some(c) => self.error(pos, Error::UnexpectedCharacter(c)),
                None => self.error(pos, Error::MalformedToken(String::new(), what)),
            },
        }
    }

    fn statements(&mut self, out: &mut Vec<Token>) -> Result<(), Located<Error>> {
        loop {
            self.skip_whitespace();
            let pos = self.pos();
            let first = match self.peek() {
                None => return Ok(()),
                Some(c) => c,
            };

            match first {
                Cursor::LABEL_CHAR => {
                    self.bump();
                    let (_, name) = self.expect_ident("label name")?;
                    out.push(Token::new(TokenKind::Label, pos, name));
                    continue;
                }
                '{' => {
                    self.bump();
                    out.push(Token::new(TokenKind::ScopeBegin, pos, String::new()));
                    continue;
                }
                '}' => {
                    self.bump();
                    out.push(Token::new(TokenKind::ScopeEnd, pos, String::new()));
                    continue;
                }
                _ => (),
            }

            let word = match self.ident() {
                Some(word) => word,
                None => return self.error(pos, Error::UnexpectedCharacter(first)),
            };

            match word.to_lowercase().as_str() {
                "break" => {
                    out.push(Token::new(TokenKind::BreakPoint, pos, word));
                    continue;
                }
                "endmacro" => {
                    out.push(Token::new(TokenKind::MacroEnd, pos, String::new()));
                    continue;
                }
                "end" => {
                    out.push(Token::new(TokenKind::IfEnd, pos, String::new()));
                    continue;
                }
                "macro" => {
                    let (name_pos, name) = self.expect_ident("macro name")?;
                    out.push(Token::new(TokenKind::MacroBegin, name_pos, name));
                    // The body follows on later lines, up to `endmacro`.
                    return self.arguments(out);
                }
                "if" => {
                    out.push(Token::new(TokenKind::IfBegin, pos, word));
                    return self.arguments(out);
                }
                _ => {
                    out.push(Token::new(TokenKind::InstructionBegin, pos, word));
                    self.arguments(out)?;
                    out.push(Token::new(TokenKind::InstructionEnd, self.pos(), String::new()));
                    return Ok(());
                }
            }
        }
    }

    /// Comma separated expressions running to the end of the line.
    fn arguments(&mut self, out: &mut Vec<Token>) -> Result<(), Located<Error>> {
        self.skip_whitespace();
        if self.peek().is_none() {
            return Ok(());
        }

        loop {
            self.skip_whitespace();
            let start = self.pos();
            out.push(Token::new(TokenKind::ExpressionBegin, start.clone(), String::new()));
            if self.expression(out)? == 0 {
                return self.error(start, Error::EmptyArgument);
            }
            out.push(Token::new(TokenKind::ExpressionEnd, self.pos(), String::new()));

            match self.peek() {
                Some(Cursor::ARG_SEPARATOR) => {
                    self.bump();
                }
                _ => return Ok(()),
            }
        }
    }

    /// Scans one argument, returning how many tokens it produced.
    fn expression(&mut self, out: &mut Vec<Token>) -> Result<usize, Located<Error>> {
        let mut count = 0;
        loop {
            self.skip_whitespace();
            let pos = self.pos();
            let c = match self.peek() {
                None | Some(Cursor::ARG_SEPARATOR) => return Ok(count),
                Some(c) => c,
            };

            let token = if c == Cursor::STRING_QUOTE || c == Cursor::CHAR_QUOTE {
                let raw = self.literal(c)?;
                let kind = if c == Cursor::STRING_QUOTE {
                    TokenKind::String
                } else {
                    TokenKind::Char
                };
                Token::new(kind, pos, raw)
            } else if c.is_ascii_digit() {
                let raw = self.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
                if let Err(err) = parse_numeric(&raw) {
                    return self.error(pos, err);
                }
                Token::new(TokenKind::Number, pos, raw)
            } else if Cursor::is_ident_start(c) {
                let name = self.take_while(Cursor::is_ident_char);
                if TYPE_DESCRIPTORS
                    .iter()
                    .any(|ty| common::eq_ignore_case(ty, &name))
                {
                    Token::new(TokenKind::TypeDescriptor, pos, name)
                } else {
                    Token::new(TokenKind::Ident, pos, name)
                }
            } else if c == '[' || c == ']' {
                self.bump();
                Token::new(TokenKind::AddressMode, pos, c.to_string())
            } else if let Some(op) = self.operator() {
                Token::new(TokenKind::Operator, pos, op.to_owned())
            } else {
                return self.error(pos, Error::UnexpectedCharacter(c));
            };

            out.push(token);
            count += 1;
        }
    }

    fn operator(&mut self) -> Option<&'static str> {
        let op = OPERATORS.iter().copied().find(|op| {
            op.chars()
                .enumerate()
                .all(|(i, c)| self.chars.get(self.at + i) == Some(&c))
        })?;
        self.at += op.chars().count();
        Some(op)
    }

    /// Returns the literal's raw text, quotes and escapes included.
    fn literal(&mut self, quote: char) -> Result<String, Located<Error>> {
        let pos = self.pos();
        let start = self.at;
        self.bump();
        loop {
            match self.bump() {
                None => return self.error(pos, Error::UnterminatedLiteral(quote)),
                Some(Cursor::ESCAPE_CHAR) => {
                    if self.bump().is_none() {
                        return self.error(pos, Error::UnterminatedLiteral(quote));
                    }
                }
                Some(c) if c == quote => break,
                Some(_) => (),
            }
        }
        Ok(self.chars[start..self.at].iter().collect())
    }
}

fn parse_numeric(raw: &str) -> Result<i64, Error> {
    let val = if raw.starts_with("0x") {
        i64::from_str_radix(&raw[2..], 16)
    } else if raw.starts_with("0o") {
        i64::from_str_radix(&raw[2..], 8)
    } else if raw.starts_with("0b") {
        i64::from_str_radix(&raw[2..], 2)
    } else {
        i64::from_str_radix(raw, 10)
    }
    .map_err(|_| Error::MalformedToken(raw.to_owned(), "could not parse numeric"))?;

    Ok(val)
}

/// Scans `source` into the token event stream for one source unit. `file` is
/// recorded in every token's position.
pub fn tokenize(source: &str, file: &str) -> Result<Vec<Token>, Located<Error>> {
    let file: Arc<str> = Arc::from(file);
    let mut tokens = Vec::new();
    for (line_no, line) in source.lines().enumerate() {
        Cursor::new(&file, line_no + 1, line).statements(&mut tokens)?;
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::super::types::{Located, Position};
    use super::{tokenize, Error, TokenKind};

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source, "test.svm")
            .unwrap()
            .into_iter()
            .map(|tk| tk.kind)
            .collect()
    }

    fn values(source: &str) -> Vec<String> {
        tokenize(source, "test.svm")
            .unwrap()
            .into_iter()
            .map(|tk| tk.value)
            .collect()
    }

    #[test]
    fn instruction_with_arguments() {
        assert_eq!(
            kinds("mov r0, 10"),
            vec![
                TokenKind::InstructionBegin,
                TokenKind::ExpressionBegin,
                TokenKind::Ident,
                TokenKind::ExpressionEnd,
                TokenKind::ExpressionBegin,
                TokenKind::Number,
                TokenKind::ExpressionEnd,
                TokenKind::InstructionEnd,
            ]
        );
    }

    #[test]
    fn instruction_without_arguments() {
        assert_eq!(
            kinds("  halt   ; stop here"),
            vec![TokenKind::InstructionBegin, TokenKind::InstructionEnd]
        );
    }

    #[test]
    fn blank_and_comment_lines() {
        assert!(kinds("\n   \n; only a comment\n").is_empty());
    }

    #[test]
    fn label_then_instruction() {
        assert_eq!(
            values(":loop jmp loop"),
            vec!["loop", "jmp", "", "loop", "", ""]
        );
        assert_eq!(kinds(":a :b")[..], [TokenKind::Label, TokenKind::Label]);
    }

    #[test]
    fn address_mode_symbols() {
        assert_eq!(
            kinds("mov [r0], u8 [r1]"),
            vec![
                TokenKind::InstructionBegin,
                TokenKind::ExpressionBegin,
                TokenKind::AddressMode,
                TokenKind::Ident,
                TokenKind::AddressMode,
                TokenKind::ExpressionEnd,
                TokenKind::ExpressionBegin,
                TokenKind::TypeDescriptor,
                TokenKind::AddressMode,
                TokenKind::Ident,
                TokenKind::AddressMode,
                TokenKind::ExpressionEnd,
                TokenKind::InstructionEnd,
            ]
        );
    }

    #[test]
    fn operators_longest_match() {
        assert_eq!(
            values("const a = 1 << 2 <= x")[2..9],
            ["a", "=", "1", "<<", "2", "<=", "x"]
        );
    }

    #[test]
    fn literals_keep_raw_text() {
        assert_eq!(
            values(r#"data "a;b\"c", 'x'"#)[2..7],
            [r#""a;b\"c""#, "", "", "'x'", ""]
        );
    }

    #[test]
    fn macro_and_conditional_blocks() {
        assert_eq!(
            kinds("macro push2 a, b\nendmacro\nif x\nend"),
            vec![
                TokenKind::MacroBegin,
                TokenKind::ExpressionBegin,
                TokenKind::Ident,
                TokenKind::ExpressionEnd,
                TokenKind::ExpressionBegin,
                TokenKind::Ident,
                TokenKind::ExpressionEnd,
                TokenKind::MacroEnd,
                TokenKind::IfBegin,
                TokenKind::ExpressionBegin,
                TokenKind::Ident,
                TokenKind::ExpressionEnd,
                TokenKind::IfEnd,
            ]
        );
    }

    #[test]
    fn scopes_and_breakpoints() {
        assert_eq!(
            kinds("{\nbreak\n}"),
            vec![
                TokenKind::ScopeBegin,
                TokenKind::BreakPoint,
                TokenKind::ScopeEnd
            ]
        );
    }

    #[test]
    fn positions_are_one_based() {
        let tokens = tokenize("nop\n  mov r1, 2", "f.svm").unwrap();
        assert_eq!(tokens[0].pos, Position::new("f.svm", 1, 1));
        assert_eq!(tokens[2].pos, Position::new("f.svm", 2, 3));
        assert_eq!(tokens[4].pos, Position::new("f.svm", 2, 7));
    }

    #[test]
    fn unterminated_string() {
        assert_eq!(
            tokenize("data \"abc", "f.svm"),
            Err(Located::with_pos(
                Position::new("f.svm", 1, 6),
                Error::UnterminatedLiteral('"')
            ))
        );
    }

    #[test]
    fn trailing_escape_is_unterminated() {
        assert!(tokenize(r"data 'a\", "f.svm").is_err());
    }

    #[test]
    fn empty_argument() {
        assert_eq!(
            tokenize("mov r0,", "f.svm"),
            Err(Located::with_pos(
                Position::new("f.svm", 1, 8),
                Error::EmptyArgument
            ))
        );
    }

    #[test]
    fn malformed_number() {
        assert_eq!(
            tokenize("mov 0xZZ", "f.svm"),
            Err(Located::with_pos(
                Position::new("f.svm", 1, 5),
                Error::MalformedToken(String::from("0xZZ"), "could not parse numeric")
            ))
        );
    }

    #[test]
    fn unexpected_character() {
        assert_eq!(
            tokenize("mov r0 @", "f.svm"),
            Err(Located::with_pos(
                Position::new("f.svm", 1, 8),
                Error::UnexpectedCharacter('@')
            ))
        );
    }
}
