use std::sync::{Arc, Weak};

use super::{FieldType, FieldTypeContext, Note, Type, Value};

/// Context a field is bound into.
#[derive(Debug, Clone, Default)]
pub struct FieldBinding {
    pub owner: Weak<Type>,
    pub note: Option<Note>,
}

impl FieldBinding {
    pub fn new(owner: Weak<Type>) -> Self {
        Self { owner, note: None }
    }

    pub fn with_note(mut self, note: Note) -> Self {
        self.note = Some(note);
        self
    }
}

/// A named, typed field.
///
/// Declarations are unbound. [`Field::bind`] never mutates: it returns a new
/// field whose type is rebound and whose default is parsed through it.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    ty: FieldType,
    raw_default: Option<Value>,
    default: Option<String>,
    binding: Option<FieldBinding>,
}

impl Field {
    pub fn declare(name: impl Into<String>, ty: FieldType, default: Option<Value>) -> Self {
        Self {
            name: name.into(),
            ty,
            raw_default: default,
            default: None,
            binding: None,
        }
    }

    pub fn bind(&self, binding: FieldBinding) -> Self {
        let ty = self.ty.bind(FieldTypeContext {
            field: self.name.clone(),
            owner: binding.owner.clone(),
            note: binding.note.clone(),
            in_list: false,
        });
        let default = self
            .raw_default
            .as_ref()
            .map(|value| ty.parse_default(value));

        Self {
            name: self.name.clone(),
            ty,
            raw_default: self.raw_default.clone(),
            default,
            binding: Some(binding),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.ty
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    pub fn owner(&self) -> Option<Arc<Type>> {
        self.binding.as_ref()?.owner.upgrade()
    }

    pub fn note(&self) -> Option<&Note> {
        self.binding.as_ref()?.note.as_ref()
    }

    /// Default as field text; only available once bound.
    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Default as declared in the schema.
    pub fn raw_default(&self) -> Option<&Value> {
        self.raw_default.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typing::FieldKind;

    #[test]
    fn test_declared_field_is_inert() {
        let tags = FieldType::list(FieldType::new(FieldKind::Text), false);
        let field = Field::declare("tags", tags, Some(Value::List(vec![Value::from("a")])));

        assert!(!field.is_bound());
        assert!(field.default().is_none());
        assert!(field.owner().is_none());
        assert!(!field.field_type().is_bound());
    }

    #[test]
    fn test_bind_parses_default_and_leaves_original() {
        let tags = FieldType::list(FieldType::new(FieldKind::Text), false);
        let field = Field::declare("tags", tags, Some(Value::List(vec![Value::from("a")])));

        let bound = field.bind(FieldBinding::default().with_note(Note::new("n.md")));
        assert_eq!(bound.default(), Some("a,"));
        assert_eq!(bound.note().map(Note::path), Some("n.md"));
        assert_eq!(bound.field_type().context().unwrap().field, "tags");

        assert!(!field.is_bound());
        assert!(field.default().is_none());
    }
}
