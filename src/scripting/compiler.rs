//! Script compilation seam.
//!
//! A [`ScriptCompiler`] turns script source into its exports, given the
//! bindings visible to the script. Import statements never reach the
//! compiler: the evaluator resolves them first and hands the imported
//! values over as bindings.

use nom::{
    IResult,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::{map, opt, rest},
    multi::separated_list1,
    sequence::{delimited, pair, preceded, terminated, tuple},
};
use serde_json::Value;
use thiserror::Error;

/// Values a script exports, by name. `export default` lands under `default`.
pub type Exports = serde_json::Map<String, Value>;

/// Names visible to a script before its first statement.
pub type Bindings = serde_json::Map<String, Value>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("{filename}:{line}: {message}")]
    Syntax {
        filename: String,
        line: usize,
        message: String,
    },

    #[error("{filename}:{line}: `{name}` is not defined")]
    Reference {
        filename: String,
        line: usize,
        name: String,
    },
}

/// Compiles script source into exports.
pub trait ScriptCompiler: Send + Sync {
    fn compile(
        &self,
        source: &str,
        bindings: &Bindings,
        filename: &str,
    ) -> Result<Exports, ScriptError>;
}

// ============================================================================
// Imports
// ============================================================================

/// What an import statement pulls out of the imported module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportClause {
    /// `import { a, b as c } from "..."`: `(exported, local)` pairs.
    Named(Vec<(String, String)>),
    /// `import * as ns from "..."`
    Namespace(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptImport {
    pub clause: ImportClause,
    pub path: String,
    /// 1-based source line.
    pub line: usize,
}

/// Pull import statements out of `source`.
///
/// Returns the imports and the source with each import line blanked, so
/// line numbers reported by the compiler still match the file.
pub fn extract_imports(source: &str) -> (Vec<ScriptImport>, String) {
    let mut imports = Vec::new();
    let mut rest_lines = Vec::new();

    for (index, line) in source.lines().enumerate() {
        match import_statement(line.trim()) {
            Ok((tail, (clause, path))) if tail.trim().is_empty() => {
                imports.push(ScriptImport {
                    clause,
                    path: path.to_string(),
                    line: index + 1,
                });
                rest_lines.push("");
            }
            _ => rest_lines.push(line),
        }
    }
    (imports, rest_lines.join("\n"))
}

type PResult<'a, T> = IResult<&'a str, T>;

fn ident(input: &str) -> PResult<'_, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '$')(input)
}

fn quoted(input: &str) -> PResult<'_, &str> {
    alt((
        delimited(char('"'), take_while1(|c: char| c != '"'), char('"')),
        delimited(char('\''), take_while1(|c: char| c != '\''), char('\'')),
    ))(input)
}

fn import_specifier(input: &str) -> PResult<'_, (String, String)> {
    map(
        pair(
            ident,
            opt(preceded(
                tuple((multispace1, tag("as"), multispace1)),
                ident,
            )),
        ),
        |(name, alias)| (name.to_string(), alias.unwrap_or(name).to_string()),
    )(input)
}

fn import_clause(input: &str) -> PResult<'_, ImportClause> {
    alt((
        map(
            delimited(
                pair(char('{'), multispace0),
                separated_list1(
                    tuple((multispace0, char(','), multispace0)),
                    import_specifier,
                ),
                tuple((multispace0, opt(char(',')), multispace0, char('}'))),
            ),
            ImportClause::Named,
        ),
        map(
            preceded(tuple((char('*'), multispace1, tag("as"), multispace1)), ident),
            |name| ImportClause::Namespace(name.to_string()),
        ),
    ))(input)
}

fn import_statement(input: &str) -> PResult<'_, (ImportClause, &str)> {
    let (input, _) = pair(tag("import"), multispace1)(input)?;
    let (input, clause) = import_clause(input)?;
    let (input, _) = tuple((multispace1, tag("from"), multispace1))(input)?;
    let (input, path) = terminated(quoted, opt(preceded(multispace0, char(';'))))(input)?;
    Ok((input, (clause, path)))
}

// ============================================================================
// Built-in compiler
// ============================================================================

/// Compiler for declaration-only scripts.
///
/// One statement per line:
///
/// ```text
/// // comment
/// const local = { "a": 1 };
/// export const name = [1, 2, 3];
/// export const alias = local;
/// export default "value";
/// ```
///
/// Right-hand sides are JSON values, or a name (optionally dotted, e.g.
/// `api.types`) looked up in earlier declarations and then the bindings.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConstExportCompiler;

enum Statement<'a> {
    Const {
        exported: bool,
        name: &'a str,
        expr: &'a str,
    },
    Default(&'a str),
}

fn statement(input: &str) -> PResult<'_, Statement<'_>> {
    alt((
        map(
            preceded(tuple((tag("export"), multispace1, tag("default"), multispace1)), rest),
            Statement::Default,
        ),
        map(
            tuple((
                opt(terminated(tag("export"), multispace1)),
                preceded(pair(tag("const"), multispace1), ident),
                preceded(tuple((multispace0, char('='), multispace0)), rest),
            )),
            |(export, name, expr)| Statement::Const {
                exported: export.is_some(),
                name,
                expr,
            },
        ),
    ))(input)
}

impl ConstExportCompiler {
    fn evaluate(
        expr: &str,
        locals: &Bindings,
        bindings: &Bindings,
        filename: &str,
        line: usize,
    ) -> Result<Value, ScriptError> {
        let expr = expr.trim().trim_end_matches(';').trim_end();
        if let Ok(value) = serde_json::from_str(expr) {
            return Ok(value);
        }

        let reference = || ScriptError::Reference {
            filename: filename.to_string(),
            line,
            name: expr.to_string(),
        };

        let mut segments = expr.split('.');
        let head = segments.next().unwrap_or_default();
        if head.is_empty() || !head.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        {
            return Err(ScriptError::Syntax {
                filename: filename.to_string(),
                line,
                message: format!("Unsupported expression: {expr}"),
            });
        }

        let mut value = locals
            .get(head)
            .or_else(|| bindings.get(head))
            .ok_or_else(reference)?;
        for segment in segments {
            value = value.get(segment).ok_or_else(reference)?;
        }
        Ok(value.clone())
    }
}

impl ScriptCompiler for ConstExportCompiler {
    fn compile(
        &self,
        source: &str,
        bindings: &Bindings,
        filename: &str,
    ) -> Result<Exports, ScriptError> {
        let mut locals = Bindings::new();
        let mut exports = Exports::new();

        for (index, raw) in source.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            let number = index + 1;

            let Ok((_, parsed)) = statement(line) else {
                return Err(ScriptError::Syntax {
                    filename: filename.to_string(),
                    line: number,
                    message: format!("Unexpected statement: {line}"),
                });
            };

            match parsed {
                Statement::Default(expr) => {
                    let value = Self::evaluate(expr, &locals, bindings, filename, number)?;
                    exports.insert("default".to_string(), value);
                }
                Statement::Const {
                    exported,
                    name,
                    expr,
                } => {
                    let value = Self::evaluate(expr, &locals, bindings, filename, number)?;
                    if exported {
                        exports.insert(name.to_string(), value.clone());
                    }
                    locals.insert(name.to_string(), value);
                }
            }
        }
        Ok(exports)
    }
}
