use std::sync::Arc;

use super::*;
use crate::vault::MemoryVault;

/// Line-oriented test language.
///
/// - `import <path>`: import via `import_smart`, append its env
/// - `fail`: logical failure with a diagnosis
/// - `absent`: logical failure without a diagnosis
/// - `fault`: unexpected evaluation error
/// - anything else: appended to the env
#[derive(Default)]
struct Lines {
    after_import: Vec<String>,
    preloaded: usize,
}

impl Evaluator for Lines {
    type Env = Vec<String>;

    fn evaluate(
        manager: &mut ModuleManager<Self>,
        file: &FileSpec,
        slot: &mut ModuleSlot<Self::Env>,
    ) -> Result<bool, EngineError> {
        let mut env = Vec::new();
        for line in file.source.lines().map(str::trim) {
            if let Some(target) = line.strip_prefix("import ") {
                let Some(module) = manager.import_smart(target, None) else {
                    slot.error = Some(format!("Cannot find module {target}"));
                    return Ok(false);
                };
                if let Some(error) = module.error() {
                    slot.error = Some(error.to_string());
                    return Ok(false);
                }
                env.extend(module.env().cloned().unwrap_or_default());
            } else if line == "fail" {
                slot.error = Some("failed on purpose".to_string());
                return Ok(false);
            } else if line == "absent" {
                return Ok(false);
            } else if line == "fault" {
                return Err(EngineError::evaluation(&file.path, "boom"));
            } else if !line.is_empty() {
                env.push(line.to_string());
            }
        }
        slot.env = Some(env);
        Ok(true)
    }

    fn on_after_import(manager: &mut ModuleManager<Self>, path: &str) {
        manager.ext_mut().after_import.push(path.to_string());
    }

    fn on_after_preload(manager: &mut ModuleManager<Self>) {
        manager.ext_mut().preloaded += 1;
    }
}

fn exts(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn make_manager(
    files: &[(&str, &str)],
) -> (Arc<MemoryVault>, ModuleManager<Lines>, RecordingReporter) {
    let vault = Arc::new(MemoryVault::with_files(files.iter().copied()));
    let mut manager = ModuleManager::new(vault.clone(), exts(&["ts", "js"]), Lines::default());
    let reporter = RecordingReporter::new();
    manager.set_reporter(Box::new(reporter.clone()));
    manager.preload_files();
    (vault, manager, reporter)
}

fn env_of(module: &Module<Vec<String>>) -> Vec<String> {
    module.env().cloned().unwrap_or_default()
}

// =============================================================================
// import_module
// =============================================================================

#[test]
fn test_missing_file_is_none() {
    let (_vault, mut manager, reporter) = make_manager(&[]);
    assert!(manager.import_module("missing.ts", None, false).is_none());
    assert!(reporter.events().is_empty());
}

#[test]
fn test_import_loads_env() {
    let (_vault, mut manager, _) = make_manager(&[("a.ts", "one\ntwo")]);
    let module = manager.import_module("a.ts", None, false).unwrap();
    assert!(module.is_loaded());
    assert_eq!(env_of(&module), vec!["one", "two"]);
    assert_eq!(module.file().unwrap().path, "a.ts");
}

#[test]
fn test_cache_hit_is_idempotent() {
    let (_vault, mut manager, reporter) = make_manager(&[("a.ts", "one")]);
    let first = manager.import_module("a.ts", None, false).unwrap();
    reporter.clear();

    let second = manager.import_module("a.ts", None, false).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(reporter.events().is_empty());
    assert_eq!(manager.ext().after_import, vec!["a.ts"]);
}

#[test]
fn test_force_reload_reevaluates() {
    let (_vault, mut manager, reporter) = make_manager(&[("a.ts", "one")]);
    let first = manager.import_module("a.ts", None, false).unwrap();
    let second = manager.import_module("a.ts", None, true).unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(reporter.started(), vec!["a.ts", "a.ts"]);
}

#[test]
fn test_inline_source_is_persisted() {
    let (_vault, mut manager, _) = make_manager(&[]);
    let module = manager.import_module("inline.ts", Some("x"), false).unwrap();
    assert_eq!(env_of(&module), vec!["x"]);
    assert_eq!(manager.file("inline.ts").unwrap().source, "x");

    // Without the inline override the cached module is reused.
    let again = manager.import_module("inline.ts", None, false).unwrap();
    assert!(Arc::ptr_eq(&module, &again));
}

#[test]
fn test_inline_source_not_persisted_on_failure() {
    let (_vault, mut manager, _) = make_manager(&[]);
    let module = manager.import_module("inline.ts", Some("fail"), false).unwrap();
    assert!(module.error().is_some());
    assert!(manager.file("inline.ts").is_none());
}

#[test]
fn test_logical_failure_with_diagnosis() {
    let (_vault, mut manager, reporter) = make_manager(&[("a.ts", "fail")]);
    let module = manager.import_module("a.ts", None, false).unwrap();
    assert_eq!(module.error(), Some("failed on purpose"));
    assert_eq!(
        reporter.events(),
        vec![
            StatusEvent::Started("a.ts".into()),
            StatusEvent::Failed("a.ts".into())
        ]
    );
    assert!(manager.ext().after_import.is_empty());
}

#[test]
fn test_logical_failure_without_diagnosis_stays_cached() {
    let (vault, mut manager, _) = make_manager(&[("a.ts", "absent")]);
    let module = manager.import_module("a.ts", None, false).unwrap();
    assert_eq!(module.error(), Some("Module a.ts produced no result"));
    assert!(manager.module("a.ts").is_some());

    // Editing the file re-evaluates it without anyone importing it again.
    let event = vault.write("a.ts", "fine");
    manager.handle_event(&event);
    let module = manager.module("a.ts").unwrap();
    assert!(module.is_loaded());
    assert_eq!(env_of(&module), vec!["fine"]);
}

#[test]
fn test_fault_is_wrapped_and_frame_released() {
    let (_vault, mut manager, _) = make_manager(&[("a.ts", "fault"), ("b.ts", "fine")]);
    let module = manager.import_module("a.ts", None, false).unwrap();
    assert_eq!(module.error(), Some("Unexpected error: boom"));
    assert!(manager.current_file().is_none());

    // A later import is not treated as nested inside the faulted one.
    manager.import_module("b.ts", None, false).unwrap();
    assert!(manager.dependency_graph().dependents("b.ts").is_none());
}

// =============================================================================
// Cycles
// =============================================================================

#[test]
fn test_two_module_cycle_is_diagnosed() {
    let (_vault, mut manager, _) = make_manager(&[("a.ts", "import ./b"), ("b.ts", "import ./a")]);
    let module = manager.import_module("a.ts", None, false).unwrap();
    let error = module.error().unwrap();
    assert!(error.contains("Recursive import: a.ts"), "{error}");
    assert!(manager.current_file().is_none());
}

#[test]
fn test_long_cycle_is_diagnosed() {
    let files = [
        ("m0.ts", "import ./m1"),
        ("m1.ts", "import ./m2"),
        ("m2.ts", "import ./m3"),
        ("m3.ts", "import ./m4"),
        ("m4.ts", "import ./m0"),
    ];
    let (_vault, mut manager, _) = make_manager(&files);
    let module = manager.import_module("m0.ts", None, false).unwrap();
    assert!(module.error().unwrap().contains("Recursive import: m0.ts"));
}

#[test]
fn test_self_import_is_diagnosed() {
    let (_vault, mut manager, _) = make_manager(&[("a.ts", "import ./a")]);
    let module = manager.import_module("a.ts", None, false).unwrap();
    assert!(module.error().unwrap().contains("Recursive import"));
}

// =============================================================================
// import_smart
// =============================================================================

#[test]
fn test_smart_prefers_first_extension() {
    let (_vault, mut manager, _) = make_manager(&[
        ("dir/caller.ts", "import ./x"),
        ("dir/x.ts", "from-ts"),
        ("dir/x.js", "from-js"),
    ]);
    let module = manager.import_module("dir/caller.ts", None, false).unwrap();
    assert_eq!(env_of(&module), vec!["from-ts"]);
}

#[test]
fn test_smart_falls_back_to_index() {
    let (_vault, mut manager, _) = make_manager(&[
        ("dir/caller.ts", "import ./lib"),
        ("dir/lib/index.js", "index"),
    ]);
    let module = manager.import_module("dir/caller.ts", None, false).unwrap();
    assert_eq!(env_of(&module), vec!["index"]);
}

#[test]
fn test_smart_parent_directory() {
    let (_vault, mut manager, _) = make_manager(&[("shared.ts", "shared")]);
    let module = manager.import_smart("../shared", Some("dir/caller.ts")).unwrap();
    assert_eq!(env_of(&module), vec!["shared"]);
}

#[test]
fn test_smart_with_explicit_extension() {
    let (_vault, mut manager, _) = make_manager(&[("x.js", "js"), ("x.js.ts", "wrong")]);
    let module = manager.import_smart("./x.js", None).unwrap();
    assert_eq!(env_of(&module), vec!["js"]);
}

#[test]
fn test_smart_non_relative_uses_imports_root() {
    let vault = Arc::new(MemoryVault::with_files([("lib/util.ts", "util")]));
    let mut manager =
        ModuleManager::new(vault, exts(&["ts"]), Lines::default()).with_imports_root("/lib/");
    manager.preload_files();
    let module = manager.import_smart("util", Some("notes/caller.ts")).unwrap();
    assert_eq!(env_of(&module), vec!["util"]);
}

#[test]
fn test_smart_records_edges() {
    let (_vault, mut manager, _) = make_manager(&[("a.ts", "import ./b"), ("b.ts", "b")]);
    manager.import_module("a.ts", None, false).unwrap();
    assert!(manager.dependency_graph().dependents("b.ts").unwrap().contains("a.ts"));
}

// =============================================================================
// Reloading
// =============================================================================

#[test]
fn test_modify_reloads_chain() {
    let (vault, mut manager, reporter) = make_manager(&[
        ("a.ts", "import ./b"),
        ("b.ts", "import ./c"),
        ("c.ts", "c1"),
        ("d.ts", "d"),
    ]);
    manager.import_module("a.ts", None, false).unwrap();
    manager.import_module("d.ts", None, false).unwrap();
    reporter.clear();

    let event = vault.write("c.ts", "c2");
    manager.handle_event(&event);

    assert_eq!(reporter.started(), vec!["c.ts", "b.ts", "a.ts"]);
    assert_eq!(env_of(&manager.module("a.ts").unwrap()), vec!["c2"]);
}

#[test]
fn test_unrelated_change_does_not_reload_chain() {
    let (vault, mut manager, reporter) = make_manager(&[
        ("a.ts", "import ./b"),
        ("b.ts", "import ./c"),
        ("c.ts", "c"),
        ("d.ts", "d1"),
    ]);
    manager.import_module("a.ts", None, false).unwrap();
    manager.import_module("d.ts", None, false).unwrap();
    reporter.clear();

    let event = vault.write("d.ts", "d2");
    manager.handle_event(&event);

    assert_eq!(reporter.started(), vec!["d.ts"]);
}

#[test]
fn test_reload_of_unloaded_module_only_stores_file() {
    let (vault, mut manager, reporter) = make_manager(&[]);
    let event = vault.write("new.ts", "fresh");
    manager.handle_event(&event);

    assert!(reporter.started().is_empty());
    assert_eq!(manager.file("new.ts").unwrap().source, "fresh");
    assert!(manager.module("new.ts").is_none());
}

#[test]
fn test_diamond_dependent_sees_all_updates() {
    // top imports left and right, both import base.
    let (vault, mut manager, _) = make_manager(&[
        ("top.ts", "import ./left\nimport ./right"),
        ("left.ts", "import ./base"),
        ("right.ts", "import ./base"),
        ("base.ts", "v1"),
    ]);
    manager.import_module("top.ts", None, false).unwrap();

    let event = vault.write("base.ts", "v2");
    manager.handle_event(&event);

    assert_eq!(env_of(&manager.module("top.ts").unwrap()), vec!["v2", "v2"]);
}

#[test]
fn test_dependency_cycle_reload_terminates() {
    let (vault, mut manager, _) = make_manager(&[("a.ts", "import ./b"), ("b.ts", "b")]);
    manager.import_module("a.ts", None, false).unwrap();

    // b now imports a: a is cached, so the edge b -> a is recorded.
    let event = vault.write("b.ts", "import ./a");
    manager.handle_event(&event);
    assert!(manager.dependency_graph().dependents("a.ts").unwrap().contains("b.ts"));

    let event = vault.write("b.ts", "import ./a\nmore");
    manager.handle_event(&event);
    assert!(manager.module("b.ts").is_some());
}

#[test]
fn test_delete_unloads_and_fails_dependents() {
    let (vault, mut manager, _) = make_manager(&[("a.ts", "import ./b"), ("b.ts", "b")]);
    manager.import_module("a.ts", None, false).unwrap();

    let event = vault.remove("b.ts");
    manager.handle_event(&event);

    assert!(manager.module("b.ts").is_none());
    assert!(manager.file("b.ts").is_none());
    let a = manager.module("a.ts").unwrap();
    assert_eq!(a.error(), Some("Cannot find module ./b"));
}

#[test]
fn test_delete_lets_dependents_resolve_other_provider() {
    let (vault, mut manager, _) = make_manager(&[
        ("a.ts", "import ./b"),
        ("b.ts", "from-ts"),
        ("b.js", "from-js"),
    ]);
    manager.import_module("a.ts", None, false).unwrap();

    let event = vault.remove("b.ts");
    manager.handle_event(&event);

    assert_eq!(env_of(&manager.module("a.ts").unwrap()), vec!["from-js"]);
}

#[test]
fn test_rename_unloads_old_and_loads_new() {
    let (vault, mut manager, _) = make_manager(&[("a.ts", "import ./b"), ("b.ts", "b")]);
    manager.import_module("a.ts", None, false).unwrap();

    let event = vault.rename("b.ts", "c.ts");
    manager.handle_event(&event);

    assert!(manager.file("b.ts").is_none());
    assert_eq!(manager.file("c.ts").unwrap().source, "b");
    assert!(manager.module("a.ts").unwrap().error().is_some());
}

#[test]
fn test_events_for_foreign_extensions_are_ignored() {
    let (vault, mut manager, _) = make_manager(&[]);
    let event = vault.write("note.md", "# hello");
    manager.handle_event(&event);
    assert!(manager.file("note.md").is_none());
}

#[test]
fn test_preload_reads_matching_files_and_fires_hook() {
    let (_vault, manager, reporter) =
        make_manager(&[("a.ts", "a"), ("b.js", "b"), ("readme.md", "")]);
    assert!(manager.file("a.ts").is_some());
    assert!(manager.file("b.js").is_some());
    assert!(manager.file("readme.md").is_none());
    assert_eq!(manager.ext().preloaded, 1);
    // Preload only stores files; evaluation stays lazy.
    assert!(reporter.events().is_empty());
}

#[test]
fn test_reset_clears_everything() {
    let (_vault, mut manager, _) = make_manager(&[("a.ts", "import ./b"), ("b.ts", "b")]);
    manager.import_module("a.ts", None, false).unwrap();
    manager.reset();
    assert!(manager.cached_paths().is_empty());
    assert!(manager.file("a.ts").is_none());
    assert!(manager.dependency_graph().dependents("b.ts").is_none());
}
