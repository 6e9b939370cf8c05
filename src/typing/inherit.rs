//! Property-driven inheritance.
//!
//! Each inheritable record lists its properties as [`Property`] descriptors.
//! [`compose`] walks them once per record: inheritable properties pull from
//! the parents, unset ones get their default, and missing required ones are
//! collected into a single validation error.

use indexmap::IndexMap;

use crate::error::EngineError;

/// Descriptor of one property of `S`.
pub struct Property<S> {
    pub name: &'static str,
    pub required: bool,
    /// Combines the parents' values into the record; `None` = not inherited.
    pub inherit: Option<fn(&mut S, &[&S])>,
    /// Whether the record carries a value for this property.
    pub is_set: fn(&S) -> bool,
    /// Fills the property when it is still unset after inheritance.
    pub default: Option<fn(&mut S)>,
}

/// Apply `properties` to `target` given its resolved `parents`.
pub fn compose<S>(
    target: &mut S,
    parents: &[&S],
    properties: &[Property<S>],
) -> Result<(), EngineError> {
    let mut missing = Vec::new();

    for property in properties {
        if let Some(inherit) = property.inherit
            && !parents.is_empty()
        {
            inherit(target, parents);
        }
        if (property.is_set)(target) {
            continue;
        }
        match property.default {
            Some(default) => default(target),
            None if property.required => missing.push(property.name),
            None => {}
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(EngineError::Validation(format!(
            "missing required properties: {}",
            missing.join(", ")
        )))
    }
}

/// Union of `child` and `parents` by key.
///
/// Inherited keys come first, in parent order; an earlier parent wins over a
/// later one. Child entries override in place and new child keys go last.
pub fn merge_maps<V: Clone>(
    child: &IndexMap<String, V>,
    parents: &[&IndexMap<String, V>],
) -> IndexMap<String, V> {
    let mut merged = IndexMap::new();
    for parent in parents {
        for (key, value) in parent.iter() {
            merged
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
    for (key, value) in child {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Keep the child's value, else take the first parent's.
pub fn inherit_option<T: Clone>(child: &mut Option<T>, parents: &[&Option<T>]) {
    if child.is_none() {
        *child = parents.iter().find_map(|value| (*value).clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Clone)]
    struct Record {
        name: Option<String>,
        color: Option<String>,
        tags: IndexMap<String, u32>,
    }

    fn properties() -> Vec<Property<Record>> {
        vec![
            Property {
                name: "name",
                required: true,
                inherit: None,
                is_set: |r| r.name.is_some(),
                default: None,
            },
            Property {
                name: "color",
                required: false,
                inherit: Some(|r, ps| {
                    let parents: Vec<&Option<String>> = ps.iter().map(|p| &p.color).collect();
                    inherit_option(&mut r.color, &parents)
                }),
                is_set: |r| r.color.is_some(),
                default: Some(|r| r.color = Some("gray".into())),
            },
            Property {
                name: "tags",
                required: false,
                inherit: Some(|r, ps| {
                    let parents: Vec<_> = ps.iter().map(|p| &p.tags).collect();
                    r.tags = merge_maps(&r.tags, &parents);
                }),
                is_set: |_| true,
                default: None,
            },
        ]
    }

    fn tags(pairs: &[(&str, u32)]) -> IndexMap<String, u32> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_missing_required() {
        let mut record = Record::default();
        let err = compose(&mut record, &[], &properties()).unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_override_and_default() {
        let parent = Record {
            name: Some("p".into()),
            color: Some("red".into()),
            ..Default::default()
        };
        let mut child = Record {
            name: Some("c".into()),
            ..Default::default()
        };
        compose(&mut child, &[&parent], &properties()).unwrap();
        assert_eq!(child.color.as_deref(), Some("red"));

        let mut orphan = Record {
            name: Some("o".into()),
            ..Default::default()
        };
        compose(&mut orphan, &[], &properties()).unwrap();
        assert_eq!(orphan.color.as_deref(), Some("gray"));
    }

    #[test]
    fn test_merge_order() {
        let first = tags(&[("a", 1), ("b", 1)]);
        let second = tags(&[("b", 2), ("c", 2)]);
        let child = tags(&[("d", 3), ("a", 3)]);

        let merged = merge_maps(&child, &[&first, &second]);
        let keys: Vec<&str> = merged.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "b", "c", "d"]);
        assert_eq!(merged["a"], 3);
        assert_eq!(merged["b"], 1);
    }
}
