use std::sync::Arc;
use std::thread;
use std::time::Duration;

use super::*;

fn text(name: &str) -> Field {
    Field::declare(name, FieldType::new(FieldKind::Text), None)
}

fn number(name: &str) -> Field {
    Field::declare(name, FieldType::new(FieldKind::Number), None)
}

fn field_names(ty: &Type) -> Vec<&str> {
    ty.fields().keys().map(String::as_str).collect()
}

fn task() -> Arc<Type> {
    Type::build(TypeDecl::new("Task").with_field(text("status")), vec![]).unwrap()
}

// =============================================================================
// Inheritance
// =============================================================================

#[test]
fn test_child_adds_field_after_parent() {
    let task = task();
    let bug = Type::build(
        TypeDecl::new("Bug")
            .with_parent("Task")
            .with_field(number("priority")),
        vec![Arc::clone(&task)],
    )
    .unwrap();

    assert_eq!(field_names(&bug), vec!["status", "priority"]);
    assert_eq!(field_names(&task), vec!["status"]);
}

#[test]
fn test_child_redeclaration_replaces_parent_field() {
    let task = task();
    let redeclared = Field::declare(
        "status",
        FieldType::new(FieldKind::Choice {
            options: vec!["open".into()],
        }),
        Some(Value::from("open")),
    );
    let bug = Type::build(
        TypeDecl::new("Bug")
            .with_field(number("priority"))
            .with_field(redeclared),
        vec![task],
    )
    .unwrap();

    // Parent position, child definition.
    assert_eq!(field_names(&bug), vec!["status", "priority"]);
    let status = bug.field("status").unwrap();
    assert_eq!(status.field_type().name(), "Choice");
    assert_eq!(status.default(), Some("open"));
}

#[test]
fn test_multiple_parents_merge_in_order() {
    let a = Type::build(
        TypeDecl::new("A").with_field(text("shared")).with_field(text("a")),
        vec![],
    )
    .unwrap();
    let b = Type::build(
        TypeDecl::new("B").with_field(number("shared")).with_field(text("b")),
        vec![],
    )
    .unwrap();
    let c = Type::build(TypeDecl::new("C").with_field(text("c")), vec![a, b]).unwrap();

    assert_eq!(field_names(&c), vec!["shared", "a", "b", "c"]);
    assert_eq!(c.field("shared").unwrap().field_type().name(), "Text");
}

#[test]
fn test_fields_rebound_to_child() {
    let task = task();
    let bug = Type::build(TypeDecl::new("Bug"), vec![Arc::clone(&task)]).unwrap();

    let inherited = bug.field("status").unwrap();
    assert!(Arc::ptr_eq(&inherited.owner().unwrap(), &bug));
    // The parent's own field still points at the parent.
    let original = task.field("status").unwrap();
    assert!(Arc::ptr_eq(&original.owner().unwrap(), &task));
}

#[test]
fn test_bound_field_type_sees_owner() {
    let task = task();
    let ty = task.field("status").unwrap().field_type();
    assert!(Arc::ptr_eq(&ty.owner().unwrap(), &task));
}

#[test]
fn test_ancestors_are_transitive() {
    let base = Type::build(TypeDecl::new("Base"), vec![]).unwrap();
    let task = Type::build(TypeDecl::new("Task"), vec![Arc::clone(&base)]).unwrap();
    let bug = Type::build(TypeDecl::new("Bug"), vec![Arc::clone(&task)]).unwrap();

    let names: Vec<&str> = bug.ancestors().keys().map(String::as_str).collect();
    assert_eq!(names, vec!["Task", "Base"]);
    assert!(Arc::ptr_eq(bug.ancestor("Base").unwrap(), &base));
    assert!(bug.is_descendant_of("Base"));
    assert!(bug.is_descendant_of("Bug"));
    assert!(!task.is_descendant_of("Bug"));
}

#[test]
fn test_diamond_ancestor_first_writer_wins() {
    let base = Type::build(TypeDecl::new("Base"), vec![]).unwrap();
    let left = Type::build(TypeDecl::new("Left"), vec![Arc::clone(&base)]).unwrap();
    let right = Type::build(TypeDecl::new("Right"), vec![Arc::clone(&base)]).unwrap();
    let bottom = Type::build(TypeDecl::new("Bottom"), vec![left, right]).unwrap();

    let names: Vec<&str> = bottom.ancestors().keys().map(String::as_str).collect();
    assert_eq!(names, vec!["Left", "Base", "Right"]);
}

#[test]
fn test_attribute_inheritance_policy() {
    let mut decl = TypeDecl::new("Task");
    decl.icon = Some("check".into());
    decl.folder = Some("tasks".into());
    decl.actions.insert("close".into(), "close()".into());
    let task = Type::build(decl, vec![]).unwrap();

    let mut decl = TypeDecl::new("Bug");
    decl.actions.insert("triage".into(), "triage()".into());
    let bug = Type::build(decl, vec![task]).unwrap();

    // icon is inherited, folder is not.
    assert_eq!(bug.icon(), Some("check"));
    assert_eq!(bug.folder(), None);
    assert!(!bug.is_createable());
    let actions: Vec<&str> = bug.actions().keys().map(String::as_str).collect();
    assert_eq!(actions, vec!["close", "triage"]);
}

#[test]
fn test_missing_name_is_validation_error() {
    let err = Type::build(TypeDecl::default(), vec![]).unwrap_err();
    assert!(matches!(err, crate::error::EngineError::Validation(_)));
}

// =============================================================================
// Binding
// =============================================================================

#[test]
fn test_bind_round_trip_keeps_declaration() {
    let declared = text("title");
    let ty = Type::build(TypeDecl::new("Doc").with_field(declared.clone()), vec![]).unwrap();

    let bound = ty.field("title").unwrap();
    assert!(Arc::ptr_eq(&bound.owner().unwrap(), &ty));
    assert!(!declared.is_bound());
    assert!(declared.owner().is_none());
}

#[test]
fn test_bind_note() {
    let ty = task();
    let note = Note::new("tasks/a.md");
    let fields = ty.bind_note(&note);

    let status = &fields["status"];
    assert_eq!(status.note(), Some(&note));
    assert!(Arc::ptr_eq(&status.owner().unwrap(), &ty));
    assert!(ty.field("status").unwrap().note().is_none());
}

#[test]
fn test_default_values() {
    let tags = Field::declare(
        "tags",
        FieldType::list(FieldType::new(FieldKind::Text), false),
        Some(Value::List(vec![Value::from("inbox")])),
    );
    let ty = Type::build(
        TypeDecl::new("Task").with_field(text("status")).with_field(tags),
        vec![],
    )
    .unwrap();

    let defaults = ty.default_values();
    assert_eq!(defaults["status"], "");
    assert_eq!(defaults["tags"], "inbox,");
}

// =============================================================================
// TypeGraph
// =============================================================================

fn env(types: &[Arc<Type>]) -> SchemaEnv {
    types
        .iter()
        .map(|ty| (ty.name().to_string(), Arc::clone(ty)))
        .collect()
}

#[test]
fn test_graph_replace_is_wholesale() {
    let graph = TypeGraph::new();
    graph.replace(env(&[task()]));
    let before = graph.get("Task").unwrap();
    assert_eq!(graph.revision(), 1);

    let other = Type::build(TypeDecl::new("Other"), vec![]).unwrap();
    graph.replace(env(&[other]));
    assert!(graph.get("Task").is_none());
    assert_eq!(graph.names(), vec!["Other"]);
    assert_eq!(graph.revision(), 2);

    // Old references stay usable.
    assert_eq!(field_names(&before), vec!["status"]);
}

#[test]
fn test_graph_subscribers() {
    let graph = TypeGraph::new();
    let rx = graph.subscribe();
    let dropped = graph.subscribe();
    drop(dropped);

    graph.notify(SchemaEvent::Changed);
    graph.notify(SchemaEvent::Ready);
    assert_eq!(rx.try_recv(), Ok(SchemaEvent::Changed));
    assert_eq!(rx.try_recv(), Ok(SchemaEvent::Ready));
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_wait_ready_times_out() {
    let graph = TypeGraph::new();
    assert!(!graph.wait_ready(Duration::from_millis(10)));
}

#[test]
fn test_wait_ready_across_threads() {
    let graph = Arc::new(TypeGraph::new());
    let waiter = {
        let graph = Arc::clone(&graph);
        thread::spawn(move || graph.wait_ready(Duration::from_secs(5)))
    };
    graph.mark_ready();
    assert!(waiter.join().unwrap());
    assert!(graph.is_ready());
}

#[test]
fn test_note_resolve_types_with_subtypes() {
    let task = task();
    let bug = Type::build(TypeDecl::new("Bug"), vec![Arc::clone(&task)]).unwrap();
    let person = Type::build(TypeDecl::new("Person"), vec![]).unwrap();
    let graph = TypeGraph::new();
    graph.replace(env(&[task, bug, person]));

    let exact = FieldType::new(FieldKind::Note(NoteOptions {
        type_names: vec!["Task".into(), "Missing".into()],
        ..Default::default()
    }));
    let names: Vec<String> = exact
        .resolve_types(&graph)
        .iter()
        .map(|ty| ty.name().to_string())
        .collect();
    assert_eq!(names, vec!["Task"]);

    let with_subtypes = FieldType::list(
        FieldType::new(FieldKind::Note(NoteOptions {
            type_names: vec!["Task".into()],
            subtypes: true,
            ..Default::default()
        })),
        false,
    );
    let names: Vec<String> = with_subtypes
        .resolve_types(&graph)
        .iter()
        .map(|ty| ty.name().to_string())
        .collect();
    assert_eq!(names, vec!["Task", "Bug"]);
}
