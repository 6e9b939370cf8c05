//! Typed schema model.
//!
//! | Module       | Contents                                        |
//! |--------------|-------------------------------------------------|
//! | `value`      | literal values                                  |
//! | `field_type` | `FieldType` kinds, binding, default parsing     |
//! | `field`      | `Field` declarations and bound copies           |
//! | `inherit`    | property descriptors and `compose`              |
//! | `ty`         | `TypeDecl` → `InheritedType` → `Type`           |
//! | `graph`      | `TypeGraph` registry, readiness, subscriptions  |

mod field;
pub mod field_type;
mod graph;
pub mod inherit;
mod note;
mod ty;
mod value;

#[cfg(test)]
mod tests;

pub use field::{Field, FieldBinding};
pub use field_type::{FieldKind, FieldType, FieldTypeContext, NoteOptions};
pub use graph::{SchemaEnv, SchemaEvent, TypeGraph};
pub use note::Note;
pub use ty::{InheritedType, Type, TypeDecl};
pub use value::Value;
