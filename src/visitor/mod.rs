//! Visitor pipeline over schema syntax trees.
//!
//! A visitor handles one node shape and names the visitors of the child
//! shapes it expects. The capabilities are:
//!
//! | Operation  | Purpose                                      |
//! |------------|----------------------------------------------|
//! | `lint`     | report diagnostics, never evaluates          |
//! | `run`      | build values (types, fields, literals)       |
//! | `complete` | suggestions for a node under the cursor      |
//! | `snippets` | templates offered where this shape may occur |
//! | `symbols`  | names the node declares into its scope       |
//!
//! [`Scope`] wraps a visitor to check its children as a unit: unclaimed
//! statements, duplicate symbols and completion ranking.

mod context;
mod schema;
mod scope;


use serde::Serialize;

use crate::syntax::{Rule, Span, SyntaxNode};

pub use context::{
    Diagnostic, ImportResolver, LintContext, LintResult, RunContext, Severity,
    format_diagnostics,
};
pub use schema::{
    ATTRIBUTES, AttributeVisitor, BodyVisitor, FieldTypeVisitor, FieldVisitor, FileBody,
    FileVisitor, ImportVisitor, LiteralVisitor, Member, MemberKind, MemberVisitor, TypeVisitor,
};
pub use scope::Scope;

/// A name declared by a node, with the span to blame on conflicts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub span: Span,
}

impl Symbol {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }

    /// Symbol named by the first `Identifier` child of `node`.
    pub fn named(node: &SyntaxNode) -> Option<Self> {
        let ident = node.child(Rule::Identifier)?;
        Some(Self::new(ident.text.clone(), ident.span))
    }
}

/// An autocomplete suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub label: String,
    /// Text inserted when accepted.
    pub apply: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Symbol this suggestion would declare, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub boost: i32,
}

impl Completion {
    pub fn new(label: impl Into<String>, apply: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            apply: apply.into(),
            detail: None,
            symbol: None,
            boost: 0,
        }
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Operations every visitor supports, object-safe so child slots can be
/// listed as `&dyn VisitorBase`.
pub trait VisitorBase {
    /// Node kinds this visitor handles.
    fn rules(&self) -> &'static [Rule];

    fn accepts(&self, node: &SyntaxNode) -> bool {
        self.rules().contains(&node.rule)
    }

    /// Child slots, tried in order for each child node.
    fn children(&self) -> Vec<&dyn VisitorBase> {
        Vec::new()
    }

    fn symbols(&self, _node: &SyntaxNode) -> Vec<Symbol> {
        Vec::new()
    }

    fn lint(&self, node: &SyntaxNode, ctx: &mut LintContext);

    fn complete(&self, _node: &SyntaxNode) -> Vec<Completion> {
        Vec::new()
    }

    fn snippets(&self) -> Vec<Completion> {
        Vec::new()
    }
}

pub trait Visitor: VisitorBase {
    type Output;

    /// Evaluate `node`. `None` means failure, reported through `ctx`.
    fn run(&self, node: &SyntaxNode, ctx: &mut RunContext<'_>) -> Option<Self::Output>;
}

// ============================================================================
// Walking
// ============================================================================

/// Hand every child of `node` to the first child slot of `visitor` that
/// accepts it, or to `rejected` when none does.
pub fn traverse<'v>(
    visitor: &'v dyn VisitorBase,
    node: &SyntaxNode,
    mut accepted: impl FnMut(&SyntaxNode, &'v dyn VisitorBase),
    mut rejected: impl FnMut(&SyntaxNode),
) {
    let slots = visitor.children();
    for child in &node.children {
        match slots.iter().find(|slot| slot.accepts(child)) {
            Some(slot) => accepted(child, *slot),
            None => rejected(child),
        }
    }
}

/// Lint every claimed child of `node` with its slot.
pub fn lint_children(visitor: &dyn VisitorBase, node: &SyntaxNode, ctx: &mut LintContext) {
    traverse(visitor, node, |child, slot| slot.lint(child, ctx), |_| {});
}

/// Lint a whole tree.
pub fn lint(visitor: &dyn VisitorBase, root: &SyntaxNode, mut ctx: LintContext) -> LintResult {
    if visitor.accepts(root) {
        visitor.lint(root, &mut ctx);
    } else {
        ctx.error(root.span, "Unexpected statement.");
    }
    ctx.finish()
}

/// Suggestions at byte `offset`, from the innermost node that has any.
pub fn complete_at(visitor: &dyn VisitorBase, node: &SyntaxNode, offset: usize) -> Vec<Completion> {
    if !node.span.contains(offset) {
        return Vec::new();
    }

    let mut inner = Vec::new();
    traverse(
        visitor,
        node,
        |child, slot| {
            if inner.is_empty() && child.span.contains(offset) {
                inner = complete_at(slot, child, offset);
            }
        },
        |_| {},
    );

    if inner.is_empty() {
        visitor.complete(node)
    } else {
        inner
    }
}
