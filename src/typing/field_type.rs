//! Field types.
//!
//! A [`FieldType`] is inert until bound: [`FieldType::bind`] returns a copy
//! carrying a [`FieldTypeContext`] (owning field, type and note). `List`
//! rebinds its item type with `in_list` set, so item behavior can depend on
//! being nested.

use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;

use super::{Note, Type, TypeGraph, Value};

/// Names of the built-in field types.
pub const KIND_NAMES: [&str; 7] = ["Text", "Number", "Boolean", "Date", "Choice", "List", "Note"];

/// Options of a `Note[...]` reference.
#[derive(Debug, Clone, PartialEq)]
pub struct NoteOptions {
    pub type_names: Vec<String>,
    pub short: bool,
    pub subpath: bool,
    pub display: bool,
    pub subtypes: bool,
    pub relation: bool,
    pub dv: Option<String>,
}

impl Default for NoteOptions {
    fn default() -> Self {
        Self {
            type_names: Vec::new(),
            short: true,
            subpath: false,
            display: false,
            subtypes: false,
            relation: false,
            dv: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    Text,
    Number,
    Boolean,
    Date,
    Choice { options: Vec<String> },
    List { item: Box<FieldType>, unique: bool },
    Note(NoteOptions),
}

/// Where a bound field type lives.
#[derive(Debug, Clone, Default)]
pub struct FieldTypeContext {
    /// Name of the owning field.
    pub field: String,
    pub owner: Weak<Type>,
    pub note: Option<Note>,
    pub in_list: bool,
}

#[derive(Debug, Clone)]
pub struct FieldType {
    kind: FieldKind,
    context: Option<FieldTypeContext>,
}

// ============================================================================
// Parameters
// ============================================================================

/// Expected shape of one field-type argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Boolean,
    FieldType,
}

impl ParamKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::Boolean => "a boolean",
            Self::FieldType => "a field type",
        }
    }
}

/// Arguments accepted by a field type in `Name[...]` form.
#[derive(Debug, Clone, Copy)]
pub struct Parameters {
    pub positional: Option<ParamKind>,
    pub min: usize,
    pub max: Option<usize>,
    pub keywords: &'static [(&'static str, ParamKind)],
}

impl Parameters {
    const NONE: Self = Self {
        positional: None,
        min: 0,
        max: Some(0),
        keywords: &[],
    };

    pub fn keyword(&self, name: &str) -> Option<ParamKind> {
        self.keywords
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, kind)| *kind)
    }
}

/// Parameters of the built-in field type `name`.
pub fn parameters(name: &str) -> Option<Parameters> {
    let params = match name {
        "Text" | "Number" | "Boolean" | "Date" => Parameters::NONE,
        "Choice" => Parameters {
            positional: Some(ParamKind::String),
            min: 1,
            max: None,
            keywords: &[],
        },
        "List" => Parameters {
            positional: Some(ParamKind::FieldType),
            min: 1,
            max: Some(1),
            keywords: &[("unique", ParamKind::Boolean)],
        },
        "Note" => Parameters {
            positional: Some(ParamKind::String),
            min: 0,
            max: None,
            keywords: &[
                ("dv", ParamKind::String),
                ("short", ParamKind::Boolean),
                ("subpath", ParamKind::Boolean),
                ("display", ParamKind::Boolean),
                ("subtypes", ParamKind::Boolean),
                ("relation", ParamKind::Boolean),
            ],
        },
        _ => return None,
    };
    Some(params)
}

/// A positional field-type argument.
#[derive(Debug, Clone)]
pub enum Argument {
    Value(Value),
    Type(FieldType),
}

impl FieldType {
    pub fn new(kind: FieldKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    pub fn list(item: FieldType, unique: bool) -> Self {
        Self::new(FieldKind::List {
            item: Box::new(item),
            unique,
        })
    }

    /// Build the field type `name` from already-checked arguments.
    pub fn construct(
        name: &str,
        args: Vec<Argument>,
        keywords: &IndexMap<String, Value>,
    ) -> Result<Self, String> {
        let flag = |key: &str, default: bool| -> Result<bool, String> {
            match keywords.get(key) {
                None => Ok(default),
                Some(value) => value
                    .as_bool()
                    .ok_or_else(|| format!("`{key}` must be a boolean")),
            }
        };
        let strings = |args: Vec<Argument>| -> Result<Vec<String>, String> {
            args.into_iter()
                .map(|arg| match arg {
                    Argument::Value(Value::String(s)) => Ok(s),
                    _ => Err(format!("{name} arguments must be strings")),
                })
                .collect()
        };

        let kind = match name {
            "Text" => FieldKind::Text,
            "Number" => FieldKind::Number,
            "Boolean" => FieldKind::Boolean,
            "Date" => FieldKind::Date,
            "Choice" => FieldKind::Choice {
                options: strings(args)?,
            },
            "List" => {
                let mut args = args.into_iter();
                let (Some(Argument::Type(item)), None) = (args.next(), args.next()) else {
                    return Err("List takes exactly one field type".to_string());
                };
                FieldKind::List {
                    item: Box::new(item),
                    unique: flag("unique", false)?,
                }
            }
            "Note" => FieldKind::Note(NoteOptions {
                type_names: strings(args)?,
                short: flag("short", true)?,
                subpath: flag("subpath", false)?,
                display: flag("display", false)?,
                subtypes: flag("subtypes", false)?,
                relation: flag("relation", false)?,
                dv: keywords
                    .get("dv")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }),
            other => return Err(format!("Unknown field type: {other}")),
        };
        Ok(Self::new(kind))
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn name(&self) -> &'static str {
        match self.kind {
            FieldKind::Text => "Text",
            FieldKind::Number => "Number",
            FieldKind::Boolean => "Boolean",
            FieldKind::Date => "Date",
            FieldKind::Choice { .. } => "Choice",
            FieldKind::List { .. } => "List",
            FieldKind::Note(_) => "Note",
        }
    }

    pub fn context(&self) -> Option<&FieldTypeContext> {
        self.context.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.context.is_some()
    }

    /// Type owning the field this type is bound to.
    pub fn owner(&self) -> Option<Arc<Type>> {
        self.context.as_ref()?.owner.upgrade()
    }

    pub fn in_list(&self) -> bool {
        self.context.as_ref().is_some_and(|ctx| ctx.in_list)
    }

    /// Copy of this type bound to `context`.
    pub fn bind(&self, context: FieldTypeContext) -> Self {
        let kind = match &self.kind {
            FieldKind::List { item, unique } => FieldKind::List {
                item: Box::new(item.bind(FieldTypeContext {
                    in_list: true,
                    ..context.clone()
                })),
                unique: *unique,
            },
            other => other.clone(),
        };
        Self {
            kind,
            context: Some(context),
        }
    }

    /// Render a declared default as field text.
    ///
    /// List defaults are joined with `", "`; a single element keeps a
    /// trailing comma so it still reads as a list.
    pub fn parse_default(&self, value: &Value) -> String {
        match (&self.kind, value) {
            (FieldKind::List { item, .. }, Value::List(items)) => {
                let mut out = items
                    .iter()
                    .map(|value| item.parse_default(value))
                    .collect::<Vec<_>>()
                    .join(", ");
                if items.len() == 1 {
                    out.push(',');
                }
                out
            }
            _ => value.to_string(),
        }
    }

    /// Whether `value` is a valid default for this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match (&self.kind, value) {
            (FieldKind::Text | FieldKind::Date | FieldKind::Note(_), Value::String(_)) => true,
            (FieldKind::Number, Value::Number(_)) => true,
            (FieldKind::Boolean, Value::Boolean(_)) => true,
            (FieldKind::Choice { options }, Value::String(s)) => options.contains(s),
            (FieldKind::List { item, .. }, Value::List(items)) => {
                items.iter().all(|value| item.accepts(value))
            }
            _ => false,
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(self.kind, FieldKind::List { .. })
    }

    pub fn is_relation(&self) -> bool {
        match &self.kind {
            FieldKind::List { item, .. } => item.is_relation(),
            FieldKind::Note(options) => options.relation,
            _ => false,
        }
    }

    /// Innermost non-list type.
    pub fn underlying(&self) -> &FieldType {
        match &self.kind {
            FieldKind::List { item, .. } => item.underlying(),
            _ => self,
        }
    }

    /// Types a `Note` reference points at, looked up in `graph`.
    ///
    /// Unknown names are skipped. With `subtypes`, descendants of the named
    /// types are included as well.
    pub fn resolve_types(&self, graph: &TypeGraph) -> Vec<Arc<Type>> {
        let options = match &self.underlying().kind {
            FieldKind::Note(options) => options,
            _ => return Vec::new(),
        };

        let mut types: Vec<Arc<Type>> = options
            .type_names
            .iter()
            .filter_map(|name| graph.get(name))
            .collect();

        if options.subtypes {
            for ty in graph.snapshot().values() {
                let is_new = !types.iter().any(|known| known.name() == ty.name());
                let descends = options
                    .type_names
                    .iter()
                    .any(|name| ty.is_descendant_of(name));
                if is_new && descends {
                    types.push(Arc::clone(ty));
                }
            }
        }
        types
    }
}

/// Renders the declaration form, e.g. `List[Note["Person"], unique = true]`.
impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut args: Vec<String> = Vec::new();
        match &self.kind {
            FieldKind::Choice { options } => {
                args.extend(options.iter().map(|option| format!("{option:?}")));
            }
            FieldKind::List { item, unique } => {
                args.push(item.to_string());
                if *unique {
                    args.push("unique = true".to_string());
                }
            }
            FieldKind::Note(options) => {
                let defaults = NoteOptions::default();
                args.extend(options.type_names.iter().map(|name| format!("{name:?}")));
                let flags = [
                    ("short", options.short, defaults.short),
                    ("subpath", options.subpath, defaults.subpath),
                    ("display", options.display, defaults.display),
                    ("subtypes", options.subtypes, defaults.subtypes),
                    ("relation", options.relation, defaults.relation),
                ];
                for (name, value, default) in flags {
                    if value != default {
                        args.push(format!("{name} = {value}"));
                    }
                }
                if let Some(dv) = &options.dv {
                    args.push(format!("dv = {dv:?}"));
                }
            }
            FieldKind::Text | FieldKind::Number | FieldKind::Boolean | FieldKind::Date => {}
        }

        if args.is_empty() {
            f.write_str(self.name())
        } else {
            write!(f, "{}[{}]", self.name(), args.join(", "))
        }
    }
}
