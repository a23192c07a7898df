//! Integration tests for blocking resolution
//!
//! Builds small source trees in temporary directories and checks the
//! resulting module graphs.

use jsdeps::{
    AmdPattern, GraphError, Module, PatternKind, PatternName, RegistryError, Resolver,
    ResolverConfig, ResolverError,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write(root: &Path, name: &str, contents: &str) -> PathBuf {
    let path = root.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

fn config(root: &Path) -> ResolverConfig {
    ResolverConfig::new([root]).with_memory_cache(true)
}

fn resolver(root: &Path) -> Resolver {
    Resolver::new(config(root)).unwrap()
}

fn deps(module: &Module) -> Vec<PathBuf> {
    module.dependencies().unwrap().to_vec()
}

#[test]
fn test_file_without_requires_has_empty_closure() {
    let temp = TempDir::new().unwrap();
    let a = write(temp.path(), "a.js", "goog.provide('app.a');");

    let modules = resolver(temp.path()).resolve_sync(false).unwrap();
    assert_eq!(modules.len(), 1);
    assert!(deps(&modules[&a]).is_empty());
}

#[test]
fn test_transitive_closure() {
    let temp = TempDir::new().unwrap();
    let c = write(temp.path(), "lib/c.js", "goog.provide('lib.c');");
    let b = write(
        temp.path(),
        "lib/b.js",
        "goog.provide('lib.b');\ngoog.require('lib.c');",
    );
    let a = write(
        temp.path(),
        "app.js",
        "goog.provide('app');\ngoog.require('lib.b');",
    );

    let modules = resolver(temp.path()).resolve_sync(false).unwrap();
    assert_eq!(deps(&modules[&a]), vec![c.clone(), b.clone()]);
    assert_eq!(deps(&modules[&b]), vec![c.clone()]);
    assert!(deps(&modules[&c]).is_empty());
}

#[test]
fn test_cycle_resolves_both_ways() {
    let temp = TempDir::new().unwrap();
    let one = write(temp.path(), "one.js", "goog.provide('A'); goog.require('B');");
    let two = write(temp.path(), "two.js", "goog.provide('B'); goog.require('A');");

    let modules = resolver(temp.path()).resolve_sync(false).unwrap();
    assert_eq!(deps(&modules[&one]), vec![two.clone()]);
    assert_eq!(deps(&modules[&two]), vec![one.clone()]);
}

#[test]
fn test_duplicate_provide_is_a_conflict() {
    let temp = TempDir::new().unwrap();
    let first = write(temp.path(), "a.js", "goog.provide('x.y');");
    let second = write(temp.path(), "b.js", "goog.provide('x.y');");

    let err = resolver(temp.path()).resolve_sync(false).unwrap_err();
    match &err {
        ResolverError::Conflict(RegistryError::Conflict {
            symbol,
            filename,
            first_defined,
        }) => {
            assert_eq!(symbol, "x.y");
            assert_eq!(filename, &second);
            assert_eq!(first_defined, &first);
        }
        other => panic!("expected conflict, got {other:?}"),
    }
    let message = err.to_string();
    assert!(message.contains("a.js") && message.contains("b.js"));
}

#[test]
fn test_only_entry_files() {
    let temp = TempDir::new().unwrap();
    let lib_a = write(temp.path(), "lib/a.js", "goog.provide('lib.a');");
    let lib_b = write(
        temp.path(),
        "lib/b.js",
        "goog.provide('lib.b'); goog.require('lib.a');",
    );
    let main = write(temp.path(), "main.js", "goog.require('lib.b');");

    let modules = resolver(temp.path()).resolve_sync(true).unwrap();
    assert_eq!(modules.keys().collect::<Vec<_>>(), vec![&main]);
    assert_eq!(deps(&modules[&main]), vec![lib_a, lib_b]);
}

#[test]
fn test_bootstrap_file_is_not_an_entry() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "closure/goog/base.js", "var goog = goog || {};");
    let main = write(temp.path(), "main.js", "");

    let modules = resolver(temp.path()).resolve_sync(true).unwrap();
    assert_eq!(modules.keys().collect::<Vec<_>>(), vec![&main]);
}

#[test]
fn test_custom_entry_predicate() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "main.js", "goog.require('app.page');");
    let page = write(temp.path(), "page.js", "goog.provide('app.page');");

    let mut resolver = resolver(temp.path()).with_entry_predicate(|filename: &Path, _: &Module| {
        filename.file_name().is_some_and(|name| name == "page.js")
    });
    let modules = resolver.resolve_sync(true).unwrap();
    assert_eq!(modules.keys().collect::<Vec<_>>(), vec![&page]);
}

#[test]
fn test_remove_then_dependents_fail_to_relink() {
    let temp = TempDir::new().unwrap();
    let lib = write(temp.path(), "lib.js", "goog.provide('lib');");
    let app = write(temp.path(), "app.js", "goog.require('lib');");

    let mut resolver = resolver(temp.path());
    resolver.resolve_sync(false).unwrap();

    let removed = resolver.remove(&lib).unwrap();
    assert_eq!(removed.provided_symbols(), ["lib".to_string()]);
    assert!(!resolver.registry().has_symbol("lib"));

    match resolver.relink() {
        Err(ResolverError::Graph(GraphError::UnresolvedSymbol {
            symbol,
            required_by,
        })) => {
            assert_eq!(symbol, "lib");
            assert_eq!(required_by, app);
        }
        other => panic!("expected unresolved symbol, got {other:?}"),
    }

    // A replacement provider makes the graph whole again
    fs::remove_file(&lib).unwrap();
    let replacement = write(temp.path(), "lib2.js", "goog.provide('lib');");
    let modules = resolver.resolve_sync(false).unwrap();
    assert_eq!(deps(&modules[&app]), vec![replacement]);
}

#[test]
fn test_unresolved_symbol_fails_by_default() {
    let temp = TempDir::new().unwrap();
    let app = write(temp.path(), "app.js", "goog.require('nowhere');");

    let err = resolver(temp.path()).resolve_sync(false).unwrap_err();
    assert!(matches!(
        err,
        ResolverError::Graph(GraphError::UnresolvedSymbol { ref required_by, .. }) if *required_by == app
    ));
    assert!(err.to_string().contains("nowhere"));
}

#[test]
fn test_skip_unresolved() {
    let temp = TempDir::new().unwrap();
    let lib = write(temp.path(), "lib.js", "goog.provide('lib');");
    let app = write(
        temp.path(),
        "app.js",
        "goog.require('nowhere'); goog.require('lib');",
    );

    let mut resolver = Resolver::new(config(temp.path()).with_skip_unresolved(true)).unwrap();
    let modules = resolver.resolve_sync(false).unwrap();
    assert_eq!(deps(&modules[&app]), vec![lib]);
}

#[test]
fn test_resolve_by_name_and_file() {
    let temp = TempDir::new().unwrap();
    let lib = write(temp.path(), "lib.js", "goog.provide('lib.util');");
    let app = write(temp.path(), "app.js", "goog.require('lib.util');");

    let mut resolver = resolver(temp.path());
    let found = resolver.resolve_by_name_sync("lib.util").unwrap().unwrap();
    assert_eq!(found.filename(), lib.as_path());
    assert!(resolver.resolve_by_name_sync("lib.other").unwrap().is_none());

    let module = resolver.resolve_file_sync(&app).unwrap().unwrap();
    assert_eq!(deps(&module), vec![lib]);
}

#[test]
fn test_missing_root_is_rejected_at_construction() {
    let temp = TempDir::new().unwrap();
    let err = Resolver::new(config(&temp.path().join("missing"))).unwrap_err();
    assert!(matches!(err, ResolverError::RootNotFound(_)));
}

#[test]
fn test_excludes_and_extension() {
    let temp = TempDir::new().unwrap();
    let kept = write(temp.path(), "src/a.js", "goog.provide('a');");
    write(temp.path(), "src/a_test.js", "goog.provide('a.test');");
    write(temp.path(), "node_modules/dep/index.js", "goog.provide('dep');");
    write(temp.path(), "src/notes.txt", "goog.provide('txt');");

    let config = config(temp.path()).with_excludes(r"(_test\.js$|/node_modules/)");
    let modules = Resolver::new(config).unwrap().resolve_sync(false).unwrap();
    assert_eq!(modules.keys().collect::<Vec<_>>(), vec![&kept]);
}

#[test]
fn test_roots_are_walked_in_order() {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    let z = write(second.path(), "z.js", "goog.provide('z');");
    let y = write(first.path(), "y.js", "goog.provide('y'); goog.require('z');");

    let config = ResolverConfig::new([second.path(), first.path()]).with_memory_cache(true);
    let modules = Resolver::new(config).unwrap().resolve_sync(false).unwrap();
    assert_eq!(modules.keys().collect::<Vec<_>>(), vec![&z, &y]);
    assert_eq!(deps(&modules[&y]), vec![z]);
}

#[test]
fn test_amd_project() {
    let temp = TempDir::new().unwrap();
    let util = write(temp.path(), "app/util.js", "define([], function () { return {}; });");
    let view = write(
        temp.path(),
        "app/view.js",
        "define(['./util', 'require'], function (util) {});",
    );
    let boot = write(
        temp.path(),
        "boot.js",
        "require(['app/view'], function (view) { view.render(); });",
    );

    let config = config(temp.path()).with_pattern(PatternName::Amd);
    let mut resolver = Resolver::new(config).unwrap();
    let modules = resolver.resolve_sync(false).unwrap();

    assert_eq!(modules[&view].provided_symbols(), ["app/view".to_string()]);
    assert_eq!(modules[&view].required_symbols(), ["app/util".to_string()]);
    assert_eq!(deps(&modules[&boot]), vec![util.clone(), view.clone()]);

    let entries = resolver.resolve_sync(true).unwrap();
    assert_eq!(entries.keys().collect::<Vec<_>>(), vec![&boot]);
}

#[test]
fn test_with_pattern_override() {
    let temp = TempDir::new().unwrap();
    let lib = write(temp.path(), "scripts/lib.js", "define(function () {});");
    let main = write(temp.path(), "main.js", "require(['lib'], function () {});");

    let mut resolver =
        resolver(temp.path()).with_pattern(PatternKind::Amd(AmdPattern::new(temp.path().join("scripts"))));
    let modules = resolver.resolve_sync(false).unwrap();
    assert_eq!(modules[&lib].provided_symbols(), ["lib".to_string()]);
    assert_eq!(deps(&modules[&main]), vec![lib]);
}

#[test]
fn test_syntax_error_names_file() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "broken.js", "goog.provide('a'");

    let err = resolver(temp.path()).resolve_sync(false).unwrap_err();
    assert!(matches!(err, ResolverError::Syntax { .. }));
    assert!(err.to_string().contains("broken.js"));
}
