//! Schema types and their lifecycle.
//!
//! ```text
//! TypeDecl ──resolve(parents)──► InheritedType ──bind──► Arc<Type>
//! (declared, fields unbound)     (merged, ancestors)    (fields owned)
//! ```
//!
//! Every stage is a new value. A schema reload builds fresh types, so holders
//! of an old `Arc<Type>` keep a frozen snapshot.

use std::fmt;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;

use super::inherit::{Property, compose, inherit_option, merge_maps};
use super::{Field, FieldBinding, Note};
use crate::error::EngineError;

/// A type as written in the schema.
#[derive(Debug, Clone, Default)]
pub struct TypeDecl {
    pub name: String,
    pub is_abstract: bool,
    pub parent_names: Vec<String>,
    pub folder: Option<String>,
    pub glob: Option<String>,
    pub icon: Option<String>,
    pub prefix: Option<String>,
    pub style: Option<String>,
    pub fields: IndexMap<String, Field>,
    pub actions: IndexMap<String, String>,
    pub methods: IndexMap<String, String>,
    pub hooks: IndexMap<String, String>,
}

impl TypeDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_parent(mut self, name: impl Into<String>) -> Self {
        self.parent_names.push(name.into());
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.insert(field.name().to_string(), field);
        self
    }

    /// Inheritance descriptors of every type property.
    pub fn properties() -> Vec<Property<TypeDecl>> {
        fn own(name: &'static str, required: bool, is_set: fn(&TypeDecl) -> bool) -> Property<TypeDecl> {
            Property {
                name,
                required,
                inherit: None,
                is_set,
                default: None,
            }
        }

        vec![
            own("name", true, |t| !t.name.is_empty()),
            own("is_abstract", false, |_| true),
            own("parent_names", false, |_| true),
            own("folder", false, |t| t.folder.is_some()),
            own("glob", false, |t| t.glob.is_some()),
            Property {
                name: "icon",
                required: false,
                inherit: Some(|t, ps| {
                    let values: Vec<_> = ps.iter().map(|p| &p.icon).collect();
                    inherit_option(&mut t.icon, &values);
                }),
                is_set: |t| t.icon.is_some(),
                default: None,
            },
            Property {
                name: "prefix",
                required: false,
                inherit: Some(|t, ps| {
                    let values: Vec<_> = ps.iter().map(|p| &p.prefix).collect();
                    inherit_option(&mut t.prefix, &values);
                }),
                is_set: |t| t.prefix.is_some(),
                default: None,
            },
            Property {
                name: "style",
                required: false,
                inherit: Some(|t, ps| {
                    let values: Vec<_> = ps.iter().map(|p| &p.style).collect();
                    inherit_option(&mut t.style, &values);
                }),
                is_set: |t| t.style.is_some(),
                default: None,
            },
            Property {
                name: "fields",
                required: false,
                inherit: Some(|t, ps| {
                    let maps: Vec<_> = ps.iter().map(|p| &p.fields).collect();
                    t.fields = merge_maps(&t.fields, &maps);
                }),
                is_set: |_| true,
                default: None,
            },
            Property {
                name: "actions",
                required: false,
                inherit: Some(|t, ps| {
                    let maps: Vec<_> = ps.iter().map(|p| &p.actions).collect();
                    t.actions = merge_maps(&t.actions, &maps);
                }),
                is_set: |_| true,
                default: None,
            },
            Property {
                name: "methods",
                required: false,
                inherit: Some(|t, ps| {
                    let maps: Vec<_> = ps.iter().map(|p| &p.methods).collect();
                    t.methods = merge_maps(&t.methods, &maps);
                }),
                is_set: |_| true,
                default: None,
            },
            Property {
                name: "hooks",
                required: false,
                inherit: Some(|t, ps| {
                    let maps: Vec<_> = ps.iter().map(|p| &p.hooks).collect();
                    t.hooks = merge_maps(&t.hooks, &maps);
                }),
                is_set: |_| true,
                default: None,
            },
        ]
    }
}

/// A type with parents resolved and properties merged, fields not yet owned.
pub struct InheritedType {
    decl: TypeDecl,
    parents: Vec<Arc<Type>>,
    ancestors: IndexMap<String, Arc<Type>>,
}

impl InheritedType {
    /// Merge `decl` with its resolved `parents` (in declaration order).
    pub fn resolve(mut decl: TypeDecl, parents: Vec<Arc<Type>>) -> Result<Self, EngineError> {
        let parent_decls: Vec<&TypeDecl> = parents.iter().map(|parent| &parent.decl).collect();
        compose(&mut decl, &parent_decls, &TypeDecl::properties())
            .map_err(|err| EngineError::Validation(format!("type `{}`: {err}", decl.name)))?;

        // First writer wins.
        let mut ancestors = IndexMap::new();
        for parent in &parents {
            ancestors
                .entry(parent.name().to_string())
                .or_insert_with(|| Arc::clone(parent));
            for (name, ancestor) in &parent.ancestors {
                ancestors
                    .entry(name.clone())
                    .or_insert_with(|| Arc::clone(ancestor));
            }
        }

        Ok(Self {
            decl,
            parents,
            ancestors,
        })
    }

    /// Freeze into a [`Type`] whose fields are bound to it.
    pub fn bind(self) -> Arc<Type> {
        let Self {
            decl,
            parents,
            ancestors,
        } = self;

        Arc::new_cyclic(|me: &Weak<Type>| {
            let fields = decl
                .fields
                .iter()
                .map(|(name, field)| (name.clone(), field.bind(FieldBinding::new(me.clone()))))
                .collect();
            Type {
                me: me.clone(),
                decl: TypeDecl { fields, ..decl },
                parents,
                ancestors,
            }
        })
    }
}

/// A fully built schema type.
pub struct Type {
    me: Weak<Type>,
    decl: TypeDecl,
    parents: Vec<Arc<Type>>,
    ancestors: IndexMap<String, Arc<Type>>,
}

impl Type {
    /// Resolve and bind in one step.
    pub fn build(decl: TypeDecl, parents: Vec<Arc<Type>>) -> Result<Arc<Type>, EngineError> {
        Ok(InheritedType::resolve(decl, parents)?.bind())
    }

    pub fn name(&self) -> &str {
        &self.decl.name
    }

    pub fn is_abstract(&self) -> bool {
        self.decl.is_abstract
    }

    pub fn parent_names(&self) -> &[String] {
        &self.decl.parent_names
    }

    pub fn parents(&self) -> &[Arc<Type>] {
        &self.parents
    }

    pub fn folder(&self) -> Option<&str> {
        self.decl.folder.as_deref()
    }

    pub fn glob(&self) -> Option<&str> {
        self.decl.glob.as_deref()
    }

    pub fn icon(&self) -> Option<&str> {
        self.decl.icon.as_deref()
    }

    pub fn prefix(&self) -> Option<&str> {
        self.decl.prefix.as_deref()
    }

    pub fn style(&self) -> Option<&str> {
        self.decl.style.as_deref()
    }

    /// Merged fields, inherited ones first.
    pub fn fields(&self) -> &IndexMap<String, Field> {
        &self.decl.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.decl.fields.get(name)
    }

    pub fn actions(&self) -> &IndexMap<String, String> {
        &self.decl.actions
    }

    pub fn methods(&self) -> &IndexMap<String, String> {
        &self.decl.methods
    }

    pub fn hooks(&self) -> &IndexMap<String, String> {
        &self.decl.hooks
    }

    pub fn ancestor(&self, name: &str) -> Option<&Arc<Type>> {
        self.ancestors.get(name)
    }

    pub fn ancestors(&self) -> &IndexMap<String, Arc<Type>> {
        &self.ancestors
    }

    /// Whether this type is `name` or inherits from it.
    pub fn is_descendant_of(&self, name: &str) -> bool {
        self.name() == name || self.ancestors.contains_key(name)
    }

    /// Notes of this type can be created (it has a folder).
    pub fn is_createable(&self) -> bool {
        self.decl.folder.is_some()
    }

    /// Fields bound to `note`.
    pub fn bind_note(&self, note: &Note) -> IndexMap<String, Field> {
        self.decl
            .fields
            .iter()
            .map(|(name, field)| {
                let binding = FieldBinding::new(self.me.clone()).with_note(note.clone());
                (name.clone(), field.bind(binding))
            })
            .collect()
    }

    /// Initial field values for a new note.
    pub fn default_values(&self) -> IndexMap<String, String> {
        self.decl
            .fields
            .iter()
            .map(|(name, field)| (name.clone(), field.default().unwrap_or_default().to_string()))
            .collect()
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Type")
            .field("name", &self.decl.name)
            .field("parents", &self.decl.parent_names)
            .field("fields", &self.decl.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}
