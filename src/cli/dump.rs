//! `typing dump`: print the type graph.

use anyhow::{Result, bail};
use indexmap::IndexMap;
use serde::Serialize;

use super::args::DumpArgs;
use crate::context::AppContext;
use crate::log;
use crate::typing::{SchemaEnv, Type};

#[derive(Debug, Serialize)]
struct TypeDump {
    name: String,
    #[serde(rename = "abstract")]
    is_abstract: bool,
    parents: Vec<String>,
    ancestors: Vec<String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    attributes: IndexMap<&'static str, String>,
    fields: Vec<FieldDump>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    actions: IndexMap<String, String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    methods: IndexMap<String, String>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    hooks: IndexMap<String, String>,
}

#[derive(Debug, Serialize)]
struct FieldDump {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    default: Option<String>,
}

impl TypeDump {
    fn new(ty: &Type) -> Self {
        let attributes = [
            ("folder", ty.folder()),
            ("glob", ty.glob()),
            ("icon", ty.icon()),
            ("prefix", ty.prefix()),
            ("style", ty.style()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| (name, value.to_string())))
        .collect();

        Self {
            name: ty.name().to_string(),
            is_abstract: ty.is_abstract(),
            parents: ty.parent_names().to_vec(),
            ancestors: ty.ancestors().keys().cloned().collect(),
            attributes,
            fields: ty
                .fields()
                .values()
                .map(|field| FieldDump {
                    name: field.name().to_string(),
                    ty: field.field_type().to_string(),
                    default: field.default().map(str::to_string),
                })
                .collect(),
            actions: ty.actions().clone(),
            methods: ty.methods().clone(),
            hooks: ty.hooks().clone(),
        }
    }

    fn write_text(&self, out: &mut String) {
        let keyword = if self.is_abstract { "abstract type" } else { "type" };
        out.push_str(&format!("{keyword} {}", self.name));
        if !self.parents.is_empty() {
            out.push_str(&format!(" extends {}", self.parents.join(", ")));
        }
        out.push('\n');

        if !self.ancestors.is_empty() {
            out.push_str(&format!("  ancestors: {}\n", self.ancestors.join(", ")));
        }
        for (name, value) in &self.attributes {
            out.push_str(&format!("  {name} = {value:?}\n"));
        }
        for field in &self.fields {
            out.push_str(&format!("  field {}: {}", field.name, field.ty));
            if let Some(default) = &field.default {
                out.push_str(&format!(" = {default:?}"));
            }
            out.push('\n');
        }
        let members = [
            ("action", &self.actions),
            ("method", &self.methods),
            ("hook", &self.hooks),
        ];
        for (keyword, members) in members {
            for name in members.keys() {
                out.push_str(&format!("  {keyword} {name}\n"));
            }
        }
    }
}

/// Types of `env` in declaration order, optionally restricted to `only`.
fn collect(env: &SchemaEnv, only: Option<&[String]>) -> Result<Vec<TypeDump>> {
    match only {
        None => Ok(env.values().map(|ty| TypeDump::new(ty)).collect()),
        Some(names) => names
            .iter()
            .map(|name| match env.get(name) {
                Some(ty) => Ok(TypeDump::new(ty)),
                None => bail!("unknown type: {}", name),
            })
            .collect(),
    }
}

fn render(dumps: &[TypeDump], args: &DumpArgs) -> Result<String> {
    if args.json {
        let json = if args.pretty {
            serde_json::to_string_pretty(dumps)?
        } else {
            serde_json::to_string(dumps)?
        };
        return Ok(json);
    }

    let mut out = String::new();
    for (i, dump) in dumps.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        dump.write_text(&mut out);
    }
    Ok(out.trim_end().to_string())
}

pub fn run_dump(ctx: &AppContext, args: &DumpArgs) -> Result<()> {
    ctx.preload();

    let schema = ctx.config().schema_path();
    if let Some(error) = ctx
        .interpreter()
        .module(&schema)
        .and_then(|module| module.error().map(str::to_string))
    {
        for line in error.lines() {
            log!("error"; "{}", line);
        }
        bail!("{} has errors", schema);
    }

    let env = ctx.graph().snapshot();
    let dumps = collect(&env, args.types.as_deref())?;
    println!("{}", render(&dumps, args)?);
    Ok(())
}
