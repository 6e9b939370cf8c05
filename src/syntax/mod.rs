//! Syntax trees for OTL schema sources.
//!
//! The interpreter only ever walks trees produced by a [`Grammar`]; it never
//! builds or mutates them. Node kinds are the closed [`Rule`] set.
//!
//! ```text
//! File
//! ├── LineComment
//! ├── Import ── Identifier* String
//! └── Type ── Keyword("abstract")? Identifier Extends? Body
//!               Body ── Field | Attribute | Member | LineComment | Error
//! ```

mod grammar;

pub use grammar::{OtlGrammar, unquote};

/// Kind of a syntax node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    File,
    LineComment,
    Import,
    Type,
    Extends,
    Body,
    Field,
    FieldType,
    Arguments,
    KeywordArg,
    Attribute,
    Member,
    Keyword,
    Identifier,
    String,
    Number,
    Boolean,
    Array,
    /// Text the grammar could not make sense of.
    Error,
}

impl Rule {
    /// Whether the node is a literal value.
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            Self::String | Self::Number | Self::Boolean | Self::Array
        )
    }
}

/// Byte range into the parsed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub from: usize,
    pub to: usize,
}

impl Span {
    pub const fn new(from: usize, to: usize) -> Self {
        Self { from, to }
    }

    /// Whether `offset` lies within the span (both ends inclusive).
    #[inline]
    pub fn contains(&self, offset: usize) -> bool {
        self.from <= offset && offset <= self.to
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.from, self.to)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    pub rule: Rule,
    pub span: Span,
    pub text: String,
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    /// First direct child of kind `rule`.
    pub fn child(&self, rule: Rule) -> Option<&SyntaxNode> {
        self.children.iter().find(|child| child.rule == rule)
    }

    /// Every direct child of kind `rule`.
    pub fn children_of(&self, rule: Rule) -> impl Iterator<Item = &SyntaxNode> {
        self.children.iter().filter(move |child| child.rule == rule)
    }

    /// First direct child that is a literal.
    pub fn literal(&self) -> Option<&SyntaxNode> {
        self.children.iter().find(|child| child.rule.is_literal())
    }

    /// Text of the first `Identifier` child.
    pub fn name(&self) -> Option<&str> {
        self.child(Rule::Identifier).map(|node| node.text.as_str())
    }

    /// Whether this node or any descendant is an `Error` node.
    pub fn has_error(&self) -> bool {
        self.rule == Rule::Error || self.children.iter().any(SyntaxNode::has_error)
    }
}

/// A parsed source file.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    pub source: String,
    pub root: SyntaxNode,
}

impl SyntaxTree {
    #[inline]
    pub fn top_node(&self) -> &SyntaxNode {
        &self.root
    }
}

/// Turns source text into a syntax tree.
///
/// Parsing never fails: unrecognized input becomes [`Rule::Error`] nodes.
pub trait Grammar: Send + Sync {
    fn parse(&self, source: &str) -> SyntaxTree;
}
