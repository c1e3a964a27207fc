use super::phases::types::Position;
use std::fmt;
use std::path::Path;
use strum_macros::{Display, EnumIter};

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum Kind {
    AddressMode,
    Ident,
    String,
    Number,
    Operator,
    Label,
    ScopeBegin,
    ScopeEnd,
    Conditional,
    Instruction,
    Macro,
    Expression,
    BreakPoint,
    Constant,
    TypeDescriptor,
}

impl Kind {
    pub fn is_composite(self) -> bool {
        match self {
            Kind::Conditional | Kind::Instruction | Kind::Macro | Kind::Expression | Kind::Constant => {
                true
            }
            _ => false,
        }
    }

    /// Instruction-like composites keep their name as child 0.
    pub fn is_named(self) -> bool {
        match self {
            Kind::Instruction | Kind::Constant | Kind::Macro => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Terminal {
    pos: Position,
    kind: Kind,
    value: String,
}

impl Terminal {
    pub fn new(pos: Position, kind: Kind, value: impl Into<String>) -> Self {
        debug_assert!(!kind.is_composite(), "{} is not a terminal kind", kind);
        Terminal {
            pos,
            kind,
            value: value.into(),
        }
    }

    pub fn pos(&self) -> &Position {
        &self.pos
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    // Only address-mode descriptors grow, and only while still being built.
    pub(crate) fn extend_value(&mut self, fragment: &str) {
        debug_assert_eq!(self.kind, Kind::AddressMode);
        self.value.push_str(fragment);
    }
}

/// An internal node. Children are only ever appended while the builder has
/// it open; nothing is removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composite {
    pos: Position,
    kind: Kind,
    nodes: Vec<Node>,
}

impl Composite {
    pub fn new(pos: Position, kind: Kind) -> Self {
        Composite::with_nodes(pos, kind, Vec::new())
    }

    pub(crate) fn with_nodes(pos: Position, kind: Kind, nodes: Vec<Node>) -> Self {
        debug_assert!(kind.is_composite(), "{} is not a composite kind", kind);
        Composite { pos, kind, nodes }
    }

    pub fn pos(&self) -> &Position {
        &self.pos
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Node> {
        self.nodes.get(idx)
    }

    pub fn append(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// The instruction, constant or macro name stored in child 0.
    pub fn name(&self) -> Option<&str> {
        if !self.kind.is_named() {
            return None;
        }

        match self.nodes.first() {
            Some(Node::Terminal(t)) if t.kind() == Kind::Ident => Some(t.value()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Terminal(Terminal),
    Composite(Composite),
}

impl Node {
    pub fn terminal(pos: Position, kind: Kind, value: impl Into<String>) -> Self {
        Node::Terminal(Terminal::new(pos, kind, value))
    }

    pub fn pos(&self) -> &Position {
        match self {
            Node::Terminal(t) => t.pos(),
            Node::Composite(c) => c.pos(),
        }
    }

    pub fn kind(&self) -> Kind {
        match self {
            Node::Terminal(t) => t.kind(),
            Node::Composite(c) => c.kind(),
        }
    }

    pub fn as_terminal(&self) -> Option<&Terminal> {
        match self {
            Node::Terminal(t) => Some(t),
            Node::Composite(_) => None,
        }
    }

    pub fn as_composite(&self) -> Option<&Composite> {
        match self {
            Node::Composite(c) => Some(c),
            Node::Terminal(_) => None,
        }
    }

    /// The payload of a terminal node.
    pub fn value(&self) -> Option<&str> {
        self.as_terminal().map(Terminal::value)
    }
}

impl From<Terminal> for Node {
    fn from(t: Terminal) -> Self {
        Node::Terminal(t)
    }
}

impl From<Composite> for Node {
    fn from(c: Composite) -> Self {
        Node::Composite(c)
    }
}

/// The syntax tree of one source unit, a module, or a whole build. The root
/// carries no kind of its own, only the top-level sequence.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Ast {
    nodes: Vec<Node>,
}

impl Ast {
    pub fn new() -> Self {
        Ast::default()
    }

    pub(crate) fn from_nodes(nodes: Vec<Node>) -> Self {
        Ast { nodes }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn append(&mut self, node: Node) {
        self.nodes.push(node);
    }

    /// Moves every top-level node of `other` onto the end of this tree.
    pub fn merge(&mut self, mut other: Ast) {
        self.nodes.append(&mut other.nodes);
    }

    pub fn into_nodes(self) -> Vec<Node> {
        self.nodes
    }
}

impl fmt::Display for Ast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.nodes
            .iter()
            .try_for_each(|node| dump_node(f, node, ""))
    }
}

fn dump_node(f: &mut fmt::Formatter<'_>, node: &Node, indent: &str) -> fmt::Result {
    let pos = node.pos();
    let file = Path::new(pos.file())
        .file_name()
        .map(|name| name.to_string_lossy())
        .unwrap_or_default();
    write!(f, "{}{}:{}:{} ", indent, file, pos.line(), pos.col())?;

    match node {
        Node::Terminal(t) => writeln!(f, "{}({:?})", t.kind(), t.value()),
        Node::Composite(c) => {
            writeln!(f, "{} {{", c.kind())?;
            let inner = format!("{}   ", indent);
            for child in c.nodes() {
                dump_node(f, child, &inner)?;
            }
            writeln!(f, "{}}}", indent)
        }
    }
}
