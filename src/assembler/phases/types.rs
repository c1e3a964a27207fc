use super::{parse, tokenize};
use itertools::Itertools;
use std::fmt::Display;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// A source location. Lines and columns count from 1; the default position
/// (empty file, line 0, column 0) marks synthesized nodes with no source.
#[derive(Debug, Default, PartialEq, Clone, Eq, Hash)]
pub struct Position {
    file: Arc<str>,
    line: usize,
    col: usize,
}

impl Position {
    pub fn new(file: impl Into<Arc<str>>, line: usize, col: usize) -> Self {
        Position {
            file: file.into(),
            line,
            col,
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn col(&self) -> usize {
        self.col
    }

    pub fn is_zero(&self) -> bool {
        self.file.is_empty() && self.line == 0 && self.col == 0
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.col)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct Located<T: Sized> {
    pos: Option<Position>,
    val: T,
}

impl<T: Display> Display for Located<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.pos {
            None => write!(f, "@<unknown location>: {}", self.val),
            Some(pos) => write!(f, "@{}: {}", pos, self.val),
        }
    }
}

impl<T> Located<T> {
    fn new(pos: Option<Position>, val: T) -> Self {
        Located { pos, val }
    }

    pub fn with_pos(pos: Position, val: T) -> Self {
        Located::new(Some(pos), val)
    }

    pub fn pos(&self) -> Option<&Position> {
        self.pos.as_ref()
    }

    pub fn value(&self) -> &T {
        &self.val
    }

    pub fn into_value(self) -> T {
        self.val
    }
}

impl<T> From<T> for Located<T> {
    fn from(val: T) -> Self {
        Located { pos: None, val }
    }
}

/// The filesystem step that failed while collecting a module's sources.
#[derive(Debug)]
pub enum SourceContext {
    Locate,
    List,
    Read(PathBuf),
}

#[derive(Debug)]
pub enum Error {
    Tokenize(Located<tokenize::Error>),
    Parse(Located<parse::Error>),
    CircularImport { module: String, chain: Vec<String> },
    InvalidImport(Position),
    /// A module name which cleans up to nothing, such as `main/..`.
    InvalidModuleName(String),
    Source {
        module: String,
        context: SourceContext,
        err: io::Error,
    },
    /// A failure below an `import` instruction, reported at that instruction.
    Import { pos: Position, err: Box<Error> },
}

impl Error {
    /// Errors which already point at source text, and so are never rewrapped
    /// at an importing instruction.
    pub fn is_positioned(&self) -> bool {
        match self {
            Error::Tokenize(_) | Error::Parse(_) | Error::InvalidImport(_) | Error::Import { .. } => {
                true
            }
            Error::CircularImport { .. }
            | Error::InvalidModuleName(_)
            | Error::Source { .. } => false,
        }
    }

    /// Reports a failure from an imported module at the importing
    /// instruction, unless it already carries a better location.
    pub fn at_import(self, pos: Position) -> Error {
        match self {
            err @ Error::CircularImport { .. } => err,
            err if err.is_positioned() => err,
            err => Error::Import {
                pos,
                err: Box::new(err),
            },
        }
    }

    pub fn position(&self) -> Option<&Position> {
        match self {
            Error::Tokenize(err) => err.pos(),
            Error::Parse(err) => err.pos(),
            Error::InvalidImport(pos) | Error::Import { pos, .. } => Some(pos),
            Error::CircularImport { .. }
            | Error::InvalidModuleName(_)
            | Error::Source { .. } => None,
        }
    }
}

impl From<Located<tokenize::Error>> for Error {
    fn from(err: Located<tokenize::Error>) -> Self {
        Error::Tokenize(err)
    }
}

impl From<Located<parse::Error>> for Error {
    fn from(err: Located<parse::Error>) -> Self {
        Error::Parse(err)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Tokenize(err) => write!(f, "{}", err),
            Error::Parse(err) => write!(f, "{}", err),
            Error::CircularImport { module, chain } => write!(
                f,
                "circular reference to module \"{}\" detected ({} -> {})",
                module,
                chain.iter().join(" -> "),
                module
            ),
            Error::InvalidImport(pos) => write!(f, "@{}: invalid import path", pos),
            Error::InvalidModuleName(name) => {
                write!(f, "module name \"{}\" does not name a module directory", name)
            }
            Error::Source {
                module,
                context,
                err,
            } => match context {
                SourceContext::Locate => write!(
                    f,
                    "unable to locate source directory for module \"{}\": {}",
                    module, err
                ),
                SourceContext::List => write!(
                    f,
                    "failed to read file names for module \"{}\": {}",
                    module, err
                ),
                SourceContext::Read(path) => write!(
                    f,
                    "failed to read source file '{}' of module \"{}\": {}",
                    path.display(),
                    module,
                    err
                ),
            },
            Error::Import { pos, err } => write!(f, "@{}: {}", pos, err),
        }
    }
}

// Wrapped errors are already part of the message.
impl std::error::Error for Error {}
