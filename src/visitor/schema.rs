//! Visitors for OTL schema files.
//!
//! ```text
//! FileVisitor = Scope<FileBody>
//! ├── ImportVisitor
//! └── TypeVisitor
//!     └── Scope<BodyVisitor>
//!         ├── FieldVisitor ── FieldTypeVisitor, LiteralVisitor
//!         ├── AttributeVisitor
//!         └── MemberVisitor
//! ```

use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use super::{
    Completion, LintContext, RunContext, Scope, Symbol, Visitor, VisitorBase, lint_children,
};
use crate::syntax::{Rule, SyntaxNode, unquote};
use crate::typing::field_type::{Argument, KIND_NAMES, ParamKind, parameters};
use crate::typing::{Field, FieldType, SchemaEnv, Type, TypeDecl, Value};

/// Attributes a type body may set.
pub const ATTRIBUTES: [&str; 5] = ["folder", "glob", "icon", "prefix", "style"];

// ============================================================================
// File
// ============================================================================

/// A whole schema file; its output is every type visible in the file.
pub type FileVisitor = Scope<FileBody>;

#[derive(Debug, Default, Clone)]
pub struct FileBody {
    import: ImportVisitor,
    ty: TypeVisitor,
}

impl VisitorBase for FileBody {
    fn rules(&self) -> &'static [Rule] {
        &[Rule::File]
    }

    fn children(&self) -> Vec<&dyn VisitorBase> {
        vec![&self.import, &self.ty]
    }

    fn lint(&self, node: &SyntaxNode, ctx: &mut LintContext) {
        lint_children(self, node, ctx);
    }
}

impl Visitor for FileBody {
    type Output = SchemaEnv;

    fn run(&self, node: &SyntaxNode, ctx: &mut RunContext<'_>) -> Option<SchemaEnv> {
        // Keep going after a failure so every statement reports.
        let mut ok = true;
        for child in &node.children {
            ok &= match child.rule {
                Rule::Import => self.import.run(child, ctx).is_some(),
                Rule::Type => self.ty.run(child, ctx).is_some(),
                _ => true,
            };
        }
        ok.then(|| ctx.env().clone())
    }
}

// ============================================================================
// Import
// ============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct ImportVisitor;

impl VisitorBase for ImportVisitor {
    fn rules(&self) -> &'static [Rule] {
        &[Rule::Import]
    }

    fn symbols(&self, node: &SyntaxNode) -> Vec<Symbol> {
        node.children_of(Rule::Identifier)
            .map(|ident| Symbol::new(ident.text.clone(), ident.span))
            .collect()
    }

    fn lint(&self, node: &SyntaxNode, ctx: &mut LintContext) {
        if let Some(path) = node.child(Rule::String)
            && unquote(&path.text).is_empty()
        {
            ctx.error(path.span, "Import path is empty.");
        }
        for ident in node.children_of(Rule::Identifier) {
            ctx.declare(&ident.text);
        }
    }

    fn snippets(&self) -> Vec<Completion> {
        vec![Completion::new("import", "import { Name } from \"./path\"").detail("Import types")]
    }
}

impl Visitor for ImportVisitor {
    type Output = ();

    fn run(&self, node: &SyntaxNode, ctx: &mut RunContext<'_>) -> Option<()> {
        let path = unquote(&node.child(Rule::String)?.text);
        let env = match ctx.import(&path) {
            Ok(env) => env,
            Err(message) => {
                ctx.error(node.span, message);
                return None;
            }
        };

        let mut ok = true;
        for ident in node.children_of(Rule::Identifier) {
            match env.get(&ident.text) {
                Some(ty) => ctx.define(&ident.text, Arc::clone(ty)),
                None => {
                    ctx.error(ident.span, format!("Module {path} has no type {}", ident.text));
                    ok = false;
                }
            }
        }
        ok.then_some(())
    }
}

// ============================================================================
// Type
// ============================================================================

#[derive(Debug, Default, Clone)]
pub struct TypeVisitor {
    body: Scope<BodyVisitor>,
}

impl VisitorBase for TypeVisitor {
    fn rules(&self) -> &'static [Rule] {
        &[Rule::Type]
    }

    fn children(&self) -> Vec<&dyn VisitorBase> {
        vec![&self.body]
    }

    fn symbols(&self, node: &SyntaxNode) -> Vec<Symbol> {
        Symbol::named(node).into_iter().collect()
    }

    fn lint(&self, node: &SyntaxNode, ctx: &mut LintContext) {
        let name = node.name().unwrap_or_default();
        for parent in parent_idents(node) {
            if parent.text == name {
                ctx.error(parent.span, format!("Type {name} cannot extend itself"));
            } else if !ctx.is_declared(&parent.text) {
                ctx.error(parent.span, format!("Unknown type: {}", parent.text));
            }
        }
        lint_children(self, node, ctx);
        ctx.declare(name);
    }

    fn snippets(&self) -> Vec<Completion> {
        vec![
            Completion::new("type", "type Name {\n}").detail("Declare a type"),
            Completion::new("abstract type", "abstract type Name {\n}")
                .detail("Declare an abstract type"),
        ]
    }
}

impl Visitor for TypeVisitor {
    type Output = Arc<Type>;

    fn run(&self, node: &SyntaxNode, ctx: &mut RunContext<'_>) -> Option<Arc<Type>> {
        let name = node.name()?;

        let mut parents = Vec::new();
        for parent in parent_idents(node) {
            let Some(ty) = ctx.lookup(&parent.text) else {
                ctx.error(parent.span, format!("Unknown type: {}", parent.text));
                return None;
            };
            parents.push(ty);
        }

        let decl = TypeDecl {
            name: name.to_string(),
            is_abstract: node.child(Rule::Keyword).is_some(),
            parent_names: parent_idents(node).map(|p| p.text.clone()).collect(),
            ..self.body.run(node.child(Rule::Body)?, ctx)?
        };

        match Type::build(decl, parents) {
            Ok(ty) => {
                ctx.define(name, Arc::clone(&ty));
                Some(ty)
            }
            Err(err) => {
                ctx.error(node.span, err.to_string());
                None
            }
        }
    }
}

fn parent_idents(node: &SyntaxNode) -> impl Iterator<Item = &SyntaxNode> {
    node.child(Rule::Extends)
        .into_iter()
        .flat_map(|extends| extends.children_of(Rule::Identifier))
}

// ============================================================================
// Body
// ============================================================================

/// Statements of a type body. Output is a nameless [`TypeDecl`].
#[derive(Debug, Default, Clone)]
pub struct BodyVisitor {
    field: FieldVisitor,
    attribute: AttributeVisitor,
    member: MemberVisitor,
}

impl VisitorBase for BodyVisitor {
    fn rules(&self) -> &'static [Rule] {
        &[Rule::Body]
    }

    fn children(&self) -> Vec<&dyn VisitorBase> {
        vec![&self.field, &self.attribute, &self.member]
    }

    fn lint(&self, node: &SyntaxNode, ctx: &mut LintContext) {
        lint_children(self, node, ctx);
    }
}

impl Visitor for BodyVisitor {
    type Output = TypeDecl;

    fn run(&self, node: &SyntaxNode, ctx: &mut RunContext<'_>) -> Option<TypeDecl> {
        let mut decl = TypeDecl::default();
        let mut ok = true;

        // A repeated name keeps its first declaration.
        for child in &node.children {
            match child.rule {
                Rule::Field => match self.field.run(child, ctx) {
                    Some(field) => {
                        decl.fields.entry(field.name().to_string()).or_insert(field);
                    }
                    None => ok = false,
                },
                Rule::Attribute => match self.attribute.run(child, ctx) {
                    Some((name, value)) => {
                        if let Some(slot) = attribute_slot(&mut decl, &name) {
                            slot.get_or_insert(value);
                        }
                    }
                    None => ok = false,
                },
                Rule::Member => match self.member.run(child, ctx) {
                    Some(member) => {
                        let map = match member.kind {
                            MemberKind::Action => &mut decl.actions,
                            MemberKind::Method => &mut decl.methods,
                            MemberKind::Hook => &mut decl.hooks,
                        };
                        map.entry(member.name).or_insert(member.code);
                    }
                    None => ok = false,
                },
                _ => {}
            }
        }
        ok.then_some(decl)
    }
}

fn attribute_slot<'d>(decl: &'d mut TypeDecl, name: &str) -> Option<&'d mut Option<String>> {
    match name {
        "folder" => Some(&mut decl.folder),
        "glob" => Some(&mut decl.glob),
        "icon" => Some(&mut decl.icon),
        "prefix" => Some(&mut decl.prefix),
        "style" => Some(&mut decl.style),
        _ => None,
    }
}

// ============================================================================
// Field
// ============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct FieldVisitor {
    field_type: FieldTypeVisitor,
    literal: LiteralVisitor,
}

impl VisitorBase for FieldVisitor {
    fn rules(&self) -> &'static [Rule] {
        &[Rule::Field]
    }

    fn children(&self) -> Vec<&dyn VisitorBase> {
        vec![&self.field_type, &self.literal]
    }

    fn symbols(&self, node: &SyntaxNode) -> Vec<Symbol> {
        Symbol::named(node).into_iter().collect()
    }

    fn lint(&self, node: &SyntaxNode, ctx: &mut LintContext) {
        let before = ctx.error_count();
        lint_children(self, node, ctx);
        if ctx.error_count() > before {
            return;
        }

        if let (Some(ty_node), Some(literal)) = (node.child(Rule::FieldType), node.literal())
            && let Ok(ty) = self.field_type.build(ty_node)
            && let Some(value) = Value::from_node(literal)
            && !ty.accepts(&value)
        {
            ctx.error(
                literal.span,
                format!("Invalid default for {}: {value}", ty.name()),
            );
        }
    }

    fn snippets(&self) -> Vec<Completion> {
        vec![Completion::new("field", "field name: Text").detail("Declare a field")]
    }
}

impl Visitor for FieldVisitor {
    type Output = Field;

    fn run(&self, node: &SyntaxNode, ctx: &mut RunContext<'_>) -> Option<Field> {
        let name = node.name()?;
        let ty = self.field_type.run(node.child(Rule::FieldType)?, ctx)?;
        let default = match node.literal() {
            Some(literal) => Some(self.literal.run(literal, ctx)?),
            None => None,
        };
        Some(Field::declare(name, ty, default))
    }
}

// ============================================================================
// FieldType
// ============================================================================

/// `Name` or `Name[arg, key = value, ...]`.
#[derive(Debug, Default, Clone, Copy)]
pub struct FieldTypeVisitor;

impl FieldTypeVisitor {
    /// Build the field type without reporting.
    pub fn build(&self, node: &SyntaxNode) -> Result<FieldType, String> {
        let name = node
            .name()
            .ok_or_else(|| "Missing field type.".to_string())?;

        let mut args = Vec::new();
        let mut keywords = IndexMap::new();
        for arg in node.child(Rule::Arguments).map_or(&[][..], |a| a.children.as_slice()) {
            match arg.rule {
                Rule::KeywordArg => {
                    if let Some(key) = arg.name()
                        && let Some(value) = arg.literal().and_then(Value::from_node)
                    {
                        keywords.insert(key.to_string(), value);
                    }
                }
                Rule::FieldType => args.push(Argument::Type(self.build(arg)?)),
                _ => args.extend(Value::from_node(arg).map(Argument::Value)),
            }
        }
        FieldType::construct(name, args, &keywords)
    }
}

fn matches_param(kind: ParamKind, node: &SyntaxNode) -> bool {
    match kind {
        ParamKind::String => node.rule == Rule::String,
        ParamKind::Boolean => node.rule == Rule::Boolean,
        ParamKind::FieldType => node.rule == Rule::FieldType,
    }
}

impl VisitorBase for FieldTypeVisitor {
    fn rules(&self) -> &'static [Rule] {
        &[Rule::FieldType]
    }

    fn lint(&self, node: &SyntaxNode, ctx: &mut LintContext) {
        let Some(ident) = node.child(Rule::Identifier) else {
            ctx.error(node.span, "Missing field type.");
            return;
        };
        let name = ident.text.as_str();
        let Some(params) = parameters(name) else {
            ctx.error(ident.span, format!("Unknown field type: {name}"));
            return;
        };

        let mut positional = 0;
        let mut seen = FxHashSet::default();
        for arg in node.child(Rule::Arguments).map_or(&[][..], |a| a.children.as_slice()) {
            if arg.rule == Rule::KeywordArg {
                let Some(key) = arg.child(Rule::Identifier) else {
                    continue;
                };
                let Some(expected) = params.keyword(&key.text) else {
                    ctx.error(key.span, format!("Unknown argument `{}` for {name}", key.text));
                    continue;
                };
                if !seen.insert(key.text.as_str()) {
                    ctx.error(key.span, format!("Duplicate argument `{}`", key.text));
                }
                if let Some(value) = arg.literal()
                    && !matches_param(expected, value)
                {
                    ctx.error(
                        value.span,
                        format!("`{}` must be {}", key.text, expected.label()),
                    );
                }
                continue;
            }

            positional += 1;
            match params.positional {
                None => ctx.error(arg.span, format!("{name} takes no arguments")),
                Some(expected) if !matches_param(expected, arg) => ctx.error(
                    arg.span,
                    format!("{name} arguments must be {}", expected.label()),
                ),
                Some(ParamKind::FieldType) => self.lint(arg, ctx),
                Some(_) => {}
            }
        }

        if positional < params.min {
            ctx.error(
                node.span,
                format!("{name} expects at least {} argument(s)", params.min),
            );
        }
        if params.positional.is_some()
            && let Some(max) = params.max
            && positional > max
        {
            ctx.error(node.span, format!("{name} expects at most {max} argument(s)"));
        }
    }

    fn complete(&self, _node: &SyntaxNode) -> Vec<Completion> {
        KIND_NAMES
            .iter()
            .map(|name| Completion::new(*name, *name).detail("field type"))
            .collect()
    }
}

impl Visitor for FieldTypeVisitor {
    type Output = FieldType;

    fn run(&self, node: &SyntaxNode, ctx: &mut RunContext<'_>) -> Option<FieldType> {
        match self.build(node) {
            Ok(ty) => Some(ty),
            Err(message) => {
                ctx.error(node.span, message);
                None
            }
        }
    }
}

// ============================================================================
// Literal
// ============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct LiteralVisitor;

impl VisitorBase for LiteralVisitor {
    fn rules(&self) -> &'static [Rule] {
        &[Rule::String, Rule::Number, Rule::Boolean, Rule::Array]
    }

    fn lint(&self, node: &SyntaxNode, ctx: &mut LintContext) {
        if Value::from_node(node).is_none() {
            ctx.error(node.span, "Invalid literal.");
        }
    }
}

impl Visitor for LiteralVisitor {
    type Output = Value;

    fn run(&self, node: &SyntaxNode, ctx: &mut RunContext<'_>) -> Option<Value> {
        let value = Value::from_node(node);
        if value.is_none() {
            ctx.error(node.span, "Invalid literal.");
        }
        value
    }
}

// ============================================================================
// Attribute
// ============================================================================

/// `name = "value"` for one of [`ATTRIBUTES`].
#[derive(Debug, Default, Clone, Copy)]
pub struct AttributeVisitor;

impl VisitorBase for AttributeVisitor {
    fn rules(&self) -> &'static [Rule] {
        &[Rule::Attribute]
    }

    fn symbols(&self, node: &SyntaxNode) -> Vec<Symbol> {
        Symbol::named(node).into_iter().collect()
    }

    fn lint(&self, node: &SyntaxNode, ctx: &mut LintContext) {
        let Some(ident) = node.child(Rule::Identifier) else {
            return;
        };
        if !ATTRIBUTES.contains(&ident.text.as_str()) {
            ctx.error(ident.span, format!("Unknown attribute: {}", ident.text));
        } else if let Some(value) = node.literal()
            && value.rule != Rule::String
        {
            ctx.error(value.span, format!("`{}` must be a string", ident.text));
        }
    }

    fn snippets(&self) -> Vec<Completion> {
        ATTRIBUTES
            .iter()
            .map(|name| {
                Completion::new(*name, format!("{name} = \"\""))
                    .detail("type attribute")
                    .symbol(*name)
            })
            .collect()
    }
}

impl Visitor for AttributeVisitor {
    type Output = (String, String);

    fn run(&self, node: &SyntaxNode, ctx: &mut RunContext<'_>) -> Option<(String, String)> {
        let name = node.name()?;
        match node.literal() {
            Some(value) if value.rule == Rule::String => {
                Some((name.to_string(), unquote(&value.text)))
            }
            _ => {
                ctx.error(node.span, format!("`{name}` must be a string"));
                None
            }
        }
    }
}

// ============================================================================
// Member
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Action,
    Method,
    Hook,
}

/// An action, method or hook with its script source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub kind: MemberKind,
    pub name: String,
    pub code: String,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct MemberVisitor;

impl VisitorBase for MemberVisitor {
    fn rules(&self) -> &'static [Rule] {
        &[Rule::Member]
    }

    fn symbols(&self, node: &SyntaxNode) -> Vec<Symbol> {
        Symbol::named(node).into_iter().collect()
    }

    fn lint(&self, _node: &SyntaxNode, _ctx: &mut LintContext) {}

    fn snippets(&self) -> Vec<Completion> {
        vec![
            Completion::new("action", "action name = \"\"").detail("Declare an action"),
            Completion::new("method", "method name = \"\"").detail("Declare a method"),
            Completion::new("hook", "hook name = \"\"").detail("Declare a hook"),
        ]
    }
}

impl Visitor for MemberVisitor {
    type Output = Member;

    fn run(&self, node: &SyntaxNode, _ctx: &mut RunContext<'_>) -> Option<Member> {
        let kind = match node.child(Rule::Keyword)?.text.as_str() {
            "action" => MemberKind::Action,
            "method" => MemberKind::Method,
            "hook" => MemberKind::Hook,
            _ => return None,
        };
        Some(Member {
            kind,
            name: node.name()?.to_string(),
            code: unquote(&node.child(Rule::String)?.text),
        })
    }
}
