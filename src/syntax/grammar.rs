//! The OTL grammar.
//!
//! ```text
//! file       := statement*
//! statement  := comment | import | type | field | member | attribute | error
//! import     := "import" "{" ident ("," ident)* "}" "from" string
//! type       := ["abstract"] "type" ident ["extends" ident ("," ident)*] "{" statement* "}"
//! field      := "field" ident ":" field_type ["=" literal]
//! field_type := ident ["[" arg ("," arg)* "]"]
//! arg        := ident "=" literal | literal | field_type
//! member     := ("action" | "method" | "hook") ident "=" string
//! attribute  := ident "=" literal
//! literal    := string | number | "true" | "false" | "[" literal ("," literal)* "]"
//! ```
//!
//! Statements are parsed with `nom`; anything that fails to parse becomes an
//! `Error` node running to the end of its line (or to the closing brace of
//! the enclosing body), and parsing resumes after it.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{is_not, tag, take_while},
    character::complete::{anychar, char, digit1, multispace0, satisfy},
    combinator::{not, opt, recognize},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
};

use super::{Grammar, Rule, Span, SyntaxNode, SyntaxTree};

type PResult<'a, T> = IResult<&'a str, T>;

/// Grammar for `.otl` schema files.
#[derive(Debug, Default, Clone, Copy)]
pub struct OtlGrammar;

impl Grammar for OtlGrammar {
    fn parse(&self, source: &str) -> SyntaxTree {
        let root = Parser { source }.file();
        SyntaxTree {
            source: source.to_string(),
            root,
        }
    }
}

/// Resolve the escapes of a quoted string literal (`"a\"b"` → `a"b`).
pub fn unquote(text: &str) -> String {
    let inner = text
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(text);

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

// ============================================================================
// Token parsers
// ============================================================================

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn ident(input: &str) -> PResult<'_, &str> {
    recognize(pair(
        satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(is_ident_char),
    ))(input)
}

/// `word` not followed by another identifier character.
fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    terminated(tag(word), not(satisfy(is_ident_char)))
}

fn string_literal(input: &str) -> PResult<'_, &str> {
    recognize(delimited(
        char('"'),
        many0(alt((recognize(pair(char('\\'), anychar)), is_not("\\\"")))),
        char('"'),
    ))(input)
}

fn number_literal(input: &str) -> PResult<'_, &str> {
    recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
    )))(input)
}

fn boolean_literal(input: &str) -> PResult<'_, &str> {
    alt((keyword("true"), keyword("false")))(input)
}

fn comma(input: &str) -> PResult<'_, char> {
    delimited(multispace0, char(','), multispace0)(input)
}

fn equals(input: &str) -> PResult<'_, char> {
    delimited(multispace0, char('='), multispace0)(input)
}

// ============================================================================
// Node parsers
// ============================================================================

struct Parser<'a> {
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn offset(&self, rest: &str) -> usize {
        self.source.len() - rest.len()
    }

    /// Node spanning from `start` up to (not including) `end`.
    fn node(
        &self,
        rule: Rule,
        start: &'a str,
        end: &'a str,
        children: Vec<SyntaxNode>,
    ) -> SyntaxNode {
        let span = Span::new(self.offset(start), self.offset(end));
        SyntaxNode {
            rule,
            span,
            text: self.source[span.from..span.to].to_string(),
            children,
        }
    }

    fn leaf(&self, rule: Rule, start: &'a str, end: &'a str) -> SyntaxNode {
        self.node(rule, start, end, Vec::new())
    }

    fn token(
        &self,
        rule: Rule,
        mut parser: impl FnMut(&'a str) -> PResult<'a, &'a str>,
        input: &'a str,
    ) -> PResult<'a, SyntaxNode> {
        let (rest, _) = parser(input)?;
        Ok((rest, self.leaf(rule, input, rest)))
    }

    fn identifier(&self, input: &'a str) -> PResult<'a, SyntaxNode> {
        self.token(Rule::Identifier, ident, input)
    }

    fn keyword(&self, word: &'static str, input: &'a str) -> PResult<'a, SyntaxNode> {
        self.token(Rule::Keyword, keyword(word), input)
    }

    fn file(&self) -> SyntaxNode {
        let mut rest = self.source;
        let mut statements = Vec::new();
        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }
            let (next, node) = self.statement(rest, false);
            statements.push(node);
            rest = next;
        }
        SyntaxNode {
            rule: Rule::File,
            span: Span::new(0, self.source.len()),
            text: self.source.to_string(),
            children: statements,
        }
    }

    fn statement(&self, input: &'a str, in_body: bool) -> (&'a str, SyntaxNode) {
        let parsed = alt((
            |i| self.comment(i),
            |i| self.import(i),
            |i| self.type_decl(i),
            |i| self.field(i),
            |i| self.member(i),
            |i| self.attribute(i),
        ))(input);

        match parsed {
            Ok(result) => result,
            Err(_) => self.error_line(input, in_body),
        }
    }

    /// Swallow the rest of the line as an `Error` node.
    fn error_line(&self, input: &'a str, in_body: bool) -> (&'a str, SyntaxNode) {
        let stop = input
            .find(|c: char| c == '\n' || (in_body && c == '}'))
            .unwrap_or(input.len());
        // Always make progress.
        let stop = if stop == 0 {
            input.chars().next().map_or(0, char::len_utf8)
        } else {
            stop
        };
        let end = &input[input[..stop].trim_end().len()..];
        (&input[stop..], self.leaf(Rule::Error, input, end))
    }

    fn comment(&self, input: &'a str) -> PResult<'a, SyntaxNode> {
        self.token(
            Rule::LineComment,
            recognize(pair(tag("//"), take_while(|c: char| c != '\n'))),
            input,
        )
    }

    fn import(&self, input: &'a str) -> PResult<'a, SyntaxNode> {
        let (rest, _) = keyword("import")(input)?;
        let (rest, mut children) = delimited(
            tuple((multispace0, char('{'), multispace0)),
            terminated(
                separated_list1(comma, |i| self.identifier(i)),
                opt(comma),
            ),
            pair(multispace0, char('}')),
        )(rest)?;
        let (rest, _) = preceded(multispace0, keyword("from"))(rest)?;
        let (rest, path) = preceded(multispace0, |i| {
            self.token(Rule::String, string_literal, i)
        })(rest)?;
        children.push(path);
        Ok((rest, self.node(Rule::Import, input, rest, children)))
    }

    fn type_decl(&self, input: &'a str) -> PResult<'a, SyntaxNode> {
        let mut children = Vec::new();

        let (rest, modifier) =
            opt(terminated(|i| self.keyword("abstract", i), multispace0))(input)?;
        children.extend(modifier);

        let (rest, _) = keyword("type")(rest)?;
        let (rest, name) = preceded(multispace0, |i| self.identifier(i))(rest)?;
        children.push(name);

        let (rest, extends) = opt(preceded(multispace0, |i| self.extends(i)))(rest)?;
        children.extend(extends);

        let (rest, _) = multispace0(rest)?;
        let (rest, body) = self.body(rest)?;
        children.push(body);

        Ok((rest, self.node(Rule::Type, input, rest, children)))
    }

    fn extends(&self, input: &'a str) -> PResult<'a, SyntaxNode> {
        let (rest, _) = keyword("extends")(input)?;
        let (rest, parents) =
            preceded(multispace0, separated_list1(comma, |i| self.identifier(i)))(rest)?;
        Ok((rest, self.node(Rule::Extends, input, rest, parents)))
    }

    fn body(&self, input: &'a str) -> PResult<'a, SyntaxNode> {
        let (mut rest, _) = char('{')(input)?;
        let mut statements = Vec::new();
        loop {
            rest = rest.trim_start();
            if let Some(after) = rest.strip_prefix('}') {
                rest = after;
                break;
            }
            if rest.is_empty() {
                // Unclosed body: mark the end of input.
                statements.push(self.leaf(Rule::Error, rest, rest));
                break;
            }
            let (next, node) = self.statement(rest, true);
            statements.push(node);
            rest = next;
        }
        Ok((rest, self.node(Rule::Body, input, rest, statements)))
    }

    fn field(&self, input: &'a str) -> PResult<'a, SyntaxNode> {
        let (rest, _) = keyword("field")(input)?;
        let (rest, name) = preceded(multispace0, |i| self.identifier(i))(rest)?;
        let (rest, _) = tuple((multispace0, char(':'), multispace0))(rest)?;
        let (rest, ty) = self.field_type(rest)?;
        let (rest, default) = opt(preceded(equals, |i| self.literal(i)))(rest)?;

        let mut children = vec![name, ty];
        children.extend(default);
        Ok((rest, self.node(Rule::Field, input, rest, children)))
    }

    fn field_type(&self, input: &'a str) -> PResult<'a, SyntaxNode> {
        let (rest, name) = self.identifier(input)?;
        let (rest, args) = opt(preceded(multispace0, |i| self.arguments(i)))(rest)?;

        let mut children = vec![name];
        children.extend(args);
        Ok((rest, self.node(Rule::FieldType, input, rest, children)))
    }

    fn arguments(&self, input: &'a str) -> PResult<'a, SyntaxNode> {
        let (rest, args) = delimited(
            pair(char('['), multispace0),
            terminated(separated_list0(comma, |i| self.argument(i)), opt(comma)),
            pair(multispace0, char(']')),
        )(input)?;
        Ok((rest, self.node(Rule::Arguments, input, rest, args)))
    }

    fn argument(&self, input: &'a str) -> PResult<'a, SyntaxNode> {
        alt((
            |i| self.keyword_arg(i),
            |i| self.literal(i),
            |i| self.field_type(i),
        ))(input)
    }

    fn keyword_arg(&self, input: &'a str) -> PResult<'a, SyntaxNode> {
        let (rest, name) = self.identifier(input)?;
        let (rest, _) = equals(rest)?;
        let (rest, value) = self.literal(rest)?;
        Ok((rest, self.node(Rule::KeywordArg, input, rest, vec![name, value])))
    }

    fn member(&self, input: &'a str) -> PResult<'a, SyntaxNode> {
        let (rest, kind) = alt((
            |i| self.keyword("action", i),
            |i| self.keyword("method", i),
            |i| self.keyword("hook", i),
        ))(input)?;
        let (rest, name) = preceded(multispace0, |i| self.identifier(i))(rest)?;
        let (rest, _) = equals(rest)?;
        let (rest, code) = self.token(Rule::String, string_literal, rest)?;
        Ok((rest, self.node(Rule::Member, input, rest, vec![kind, name, code])))
    }

    fn attribute(&self, input: &'a str) -> PResult<'a, SyntaxNode> {
        let (rest, name) = self.identifier(input)?;
        let (rest, _) = equals(rest)?;
        let (rest, value) = self.literal(rest)?;
        Ok((rest, self.node(Rule::Attribute, input, rest, vec![name, value])))
    }

    fn literal(&self, input: &'a str) -> PResult<'a, SyntaxNode> {
        alt((
            |i| self.token(Rule::String, string_literal, i),
            |i| self.token(Rule::Number, number_literal, i),
            |i| self.token(Rule::Boolean, boolean_literal, i),
            |i| self.array(i),
        ))(input)
    }

    fn array(&self, input: &'a str) -> PResult<'a, SyntaxNode> {
        let (rest, items) = delimited(
            pair(char('['), multispace0),
            terminated(separated_list0(comma, |i| self.literal(i)), opt(comma)),
            pair(multispace0, char(']')),
        )(input)?;
        Ok((rest, self.node(Rule::Array, input, rest, items)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> SyntaxNode {
        OtlGrammar.parse(source).root
    }

    fn rules(node: &SyntaxNode) -> Vec<Rule> {
        node.children.iter().map(|child| child.rule).collect()
    }

    #[test]
    fn test_empty_source() {
        let root = parse("");
        assert_eq!(root.rule, Rule::File);
        assert!(root.children.is_empty());
    }

    #[test]
    fn test_type_with_fields() {
        let root = parse(
            "type Task {\n    field status: Text = \"open\"\n    field done: Boolean\n}\n",
        );
        assert_eq!(rules(&root), vec![Rule::Type]);

        let ty = &root.children[0];
        assert_eq!(ty.name(), Some("Task"));
        let body = ty.child(Rule::Body).unwrap();
        assert_eq!(rules(body), vec![Rule::Field, Rule::Field]);

        let status = &body.children[0];
        assert_eq!(status.name(), Some("status"));
        assert_eq!(status.child(Rule::FieldType).unwrap().name(), Some("Text"));
        assert_eq!(status.literal().unwrap().text, "\"open\"");
        assert!(body.children[1].literal().is_none());
    }

    #[test]
    fn test_abstract_and_extends() {
        let root = parse("abstract type Bug extends Task, Issue {}");
        let ty = &root.children[0];
        assert_eq!(ty.child(Rule::Keyword).unwrap().text, "abstract");
        let parents: Vec<&str> = ty
            .child(Rule::Extends)
            .unwrap()
            .children
            .iter()
            .map(|node| node.text.as_str())
            .collect();
        assert_eq!(parents, vec!["Task", "Issue"]);
    }

    #[test]
    fn test_field_type_arguments() {
        let root = parse(
            "type T {\n  field tags: List[Choice[\"a\", \"b\"], unique = true]\n  field owner: Note[\"Person\", short=false]\n}",
        );
        let body = root.children[0].child(Rule::Body).unwrap();

        let tags = body.children[0].child(Rule::FieldType).unwrap();
        let args = tags.child(Rule::Arguments).unwrap();
        assert_eq!(rules(args), vec![Rule::FieldType, Rule::KeywordArg]);
        let inner = args.children[0].child(Rule::Arguments).unwrap();
        assert_eq!(rules(inner), vec![Rule::String, Rule::String]);

        let owner = body.children[1].child(Rule::FieldType).unwrap();
        let args = owner.child(Rule::Arguments).unwrap();
        assert_eq!(rules(args), vec![Rule::String, Rule::KeywordArg]);
    }

    #[test]
    fn test_import_statement() {
        let root = parse("import { Task, Bug } from \"./base\"");
        let import = &root.children[0];
        assert_eq!(import.rule, Rule::Import);
        assert_eq!(import.children_of(Rule::Identifier).count(), 2);
        assert_eq!(import.child(Rule::String).unwrap().text, "\"./base\"");
    }

    #[test]
    fn test_attributes_and_members() {
        let root = parse(
            "type Note {\n  folder = \"notes\"\n  action archive = \"archive()\"\n  hook create = \"init()\"\n}",
        );
        let body = root.children[0].child(Rule::Body).unwrap();
        assert_eq!(
            rules(body),
            vec![Rule::Attribute, Rule::Member, Rule::Member]
        );
        let member = &body.children[1];
        assert_eq!(member.child(Rule::Keyword).unwrap().text, "action");
        assert_eq!(member.name(), Some("archive"));
    }

    #[test]
    fn test_literals() {
        let root = parse("type T {\n  a = -1.5\n  b = false\n  c = [\"x\", 2,]\n}");
        let body = root.children[0].child(Rule::Body).unwrap();
        let kinds: Vec<Rule> = body
            .children
            .iter()
            .map(|attr| attr.literal().unwrap().rule)
            .collect();
        assert_eq!(kinds, vec![Rule::Number, Rule::Boolean, Rule::Array]);
        assert_eq!(body.children[2].literal().unwrap().children.len(), 2);
    }

    #[test]
    fn test_comments() {
        let root = parse("// header\ntype T {\n  // inside\n}");
        assert_eq!(rules(&root), vec![Rule::LineComment, Rule::Type]);
        let body = root.children[1].child(Rule::Body).unwrap();
        assert_eq!(rules(body), vec![Rule::LineComment]);
        assert_eq!(root.children[0].text, "// header");
    }

    #[test]
    fn test_error_recovery_top_level() {
        let root = parse("garbage here\ntype T {}");
        assert_eq!(rules(&root), vec![Rule::Error, Rule::Type]);
        assert_eq!(root.children[0].text, "garbage here");
        assert_eq!(root.children[0].span, Span::new(0, 12));
    }

    #[test]
    fn test_error_recovery_in_body_stops_at_brace() {
        let root = parse("type T { field x }\ntype U {}");
        assert_eq!(rules(&root), vec![Rule::Type, Rule::Type]);
        let body = root.children[0].child(Rule::Body).unwrap();
        assert_eq!(rules(body), vec![Rule::Error]);
        assert_eq!(body.children[0].text, "field x");
    }

    #[test]
    fn test_unclosed_body() {
        let root = parse("type T {\n  field x: Text\n");
        let body = root.children[0].child(Rule::Body).unwrap();
        assert_eq!(rules(body), vec![Rule::Field, Rule::Error]);
        assert!(body.children[1].span.is_empty());
        assert!(root.has_error());
    }

    #[test]
    fn test_keyword_prefix_is_not_keyword() {
        // `types` is an attribute name, not the `type` keyword.
        let root = parse("type T {\n  types = \"x\"\n}");
        let body = root.children[0].child(Rule::Body).unwrap();
        assert_eq!(rules(body), vec![Rule::Attribute]);
    }

    #[test]
    fn test_spans_index_source() {
        let source = "type Task {\n  field status: Text\n}";
        let root = parse(source);
        let field = &root.children[0].child(Rule::Body).unwrap().children[0];
        let name = field.child(Rule::Identifier).unwrap();
        assert_eq!(&source[name.span.from..name.span.to], "status");
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote("\"a\\\"b\""), "a\"b");
        assert_eq!(unquote("\"line\\nnext\""), "line\nnext");
        assert_eq!(unquote("\"plain\""), "plain");
    }
}
