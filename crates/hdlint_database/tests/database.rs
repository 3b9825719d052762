mod common;

use std::collections::BTreeSet;

use hdlint_database::{build_sequence, Database};
use hdlint_types::{BuildFlagScope, Identifier, SourcePath, UNRESOLVED_LIBRARY};

use common::{add_source, plan_names};

#[test]
fn put_file_parses_immediately() {
  let dir = tempfile::tempdir().unwrap();
  let mut database = Database::new();

  let path = add_source(
    &mut database,
    dir.path(),
    "foo.vhd",
    Some("lib"),
    "entity foo is end;\narchitecture foo of foo is begin end;\n",
  );

  let names: Vec<&str> = database.design_units_of(&path).iter().map(|u| u.name.name()).collect();
  assert_eq!(names, vec!["foo", "foo"]);
}

#[test]
fn forget_file_drops_derived_state() {
  let dir = tempfile::tempdir().unwrap();
  let mut database = Database::new();

  let path = add_source(&mut database, dir.path(), "foo.vhd", Some("lib"), "entity foo is end;\n");
  database.forget_file(&path);

  assert!(!database.contains(&path));
  assert!(database.design_units_of(&path).is_empty());
  assert!(database.diagnostics_of(&path).is_empty());
}

#[test]
fn missing_file_still_gets_an_entry_and_a_diagnostic() {
  let dir = tempfile::tempdir().unwrap();
  let mut database = Database::new();

  let ghost = SourcePath::absolute(dir.path().join("ghost.vhd"));
  database.put_file(ghost.clone(), Some(Identifier::vhdl("lib")), Vec::new(), Vec::new(), Vec::new());

  assert!(database.contains(&ghost));
  let diags = database.diagnostics_of(&ghost);
  assert_eq!(diags.len(), 1);
  assert_eq!(diags[0].code.as_deref(), Some("file-not-found"));
  assert_eq!(diags[0].location.unwrap().line, 0);
}

#[test]
fn explicit_library_wins() {
  let dir = tempfile::tempdir().unwrap();
  let mut database = Database::new();

  let path = add_source(&mut database, dir.path(), "foo.vhd", Some("my_lib"), "entity foo is end;\n");
  assert_eq!(database.library_of(&path), Identifier::vhdl("my_lib"));
}

#[test]
fn library_inferred_from_explicit_use() {
  // S3: user.vhd has no library; pkg.vhd in lib_a declares what it uses.
  let dir = tempfile::tempdir().unwrap();
  let mut database = Database::new();

  add_source(&mut database, dir.path(), "pkg.vhd", Some("lib_a"), "package p is end package;\n");
  let user = add_source(
    &mut database,
    dir.path(),
    "user.vhd",
    None,
    "library lib_a;\nuse lib_a.p.all;\nentity user is end;\n",
  );

  assert_eq!(database.library_of(&user), Identifier::vhdl("lib_a"));
  assert!(database.diagnostics_of(&user).is_empty());
}

#[test]
fn library_inferred_from_referrers() {
  // pkg.vhd has no explicit library; user.vhd in lib_b references its unit
  // through lib_b, so pkg.vhd must live there.
  let dir = tempfile::tempdir().unwrap();
  let mut database = Database::new();

  let pkg = add_source(&mut database, dir.path(), "pkg.vhd", None, "package helpers is end package;\n");
  add_source(
    &mut database,
    dir.path(),
    "user.vhd",
    Some("lib_b"),
    "library lib_b;\nuse lib_b.helpers.all;\nentity user is end;\n",
  );

  assert_eq!(database.library_of(&pkg), Identifier::vhdl("lib_b"));
}

#[test]
fn unresolvable_library_gets_the_sentinel_and_a_diagnostic() {
  let dir = tempfile::tempdir().unwrap();
  let mut database = Database::new();

  let lonely = add_source(&mut database, dir.path(), "lonely.vhd", None, "entity lonely is end;\n");

  assert_eq!(database.library_of(&lonely), Identifier::vhdl(UNRESOLVED_LIBRARY));
  let diags = database.diagnostics_of(&lonely);
  assert!(diags.iter().any(|d| d.code.as_deref() == Some("unresolved-library")));
  assert_eq!(diags[0].location.unwrap().line, 0);
}

#[test]
fn competing_referrers_pick_the_most_common_library() {
  let dir = tempfile::tempdir().unwrap();
  let mut database = Database::new();

  let pkg = add_source(&mut database, dir.path(), "pkg.vhd", None, "package wid is end package;\n");
  for (name, library) in [("a.vhd", "lib_x"), ("b.vhd", "lib_x"), ("c.vhd", "lib_y")] {
    add_source(
      &mut database,
      dir.path(),
      name,
      Some(library),
      &format!("library {0};\nuse {0}.wid.all;\nentity e_{0} is end;\n", library),
    );
  }

  assert_eq!(database.library_of(&pkg), Identifier::vhdl("lib_x"));
  assert!(database
    .diagnostics_of(&pkg)
    .iter()
    .any(|d| d.code.as_deref() == Some("library-not-unique")));
}

#[test]
fn flags_merge_scope_and_source_specific() {
  let dir = tempfile::tempdir().unwrap();
  let mut database = Database::new();

  let path = dir.path().join("foo.vhd");
  std::fs::write(&path, "entity foo is end;\n").unwrap();
  let source = SourcePath::absolute(&path);
  database.put_file(
    source.clone(),
    None,
    vec!["-per-source".to_string()],
    vec!["-single".to_string()],
    vec!["-deps".to_string()],
  );

  assert_eq!(database.flags(&source, BuildFlagScope::Single), vec!["-single", "-per-source"]);
  assert_eq!(database.flags(&source, BuildFlagScope::Dependencies), vec!["-deps", "-per-source"]);
}

#[test]
fn refresh_reports_removed_files_as_changed() {
  let dir = tempfile::tempdir().unwrap();
  let mut database = Database::new();

  let path = add_source(&mut database, dir.path(), "gone.vhd", Some("lib"), "entity gone is end;\n");
  assert!(database.refresh().is_empty());

  std::fs::remove_file(path.as_path()).unwrap();
  let changed = database.refresh();
  assert!(changed.contains(&path));
  assert!(database
    .diagnostics_of(&path)
    .iter()
    .any(|d| d.code.as_deref() == Some("file-not-found")));
}

#[test]
fn single_file_plan_is_just_the_target() {
  // S1: one entity, no dependencies.
  let dir = tempfile::tempdir().unwrap();
  let mut database = Database::new();

  let foo = add_source(
    &mut database,
    dir.path(),
    "foo.vhd",
    Some("lib"),
    "entity foo is end;\narchitecture foo of foo is begin end;\n",
  );

  let plan = build_sequence(&mut database, &foo, &BTreeSet::new());
  assert_eq!(plan_names(&plan), vec!["foo.vhd"]);
  assert!(plan.broken_edges.is_empty());
}

#[test]
fn dependencies_come_before_the_target() {
  let dir = tempfile::tempdir().unwrap();
  let mut database = Database::new();

  add_source(&mut database, dir.path(), "pkg.vhd", Some("lib"), "package p is end package;\n");
  let top = add_source(
    &mut database,
    dir.path(),
    "top.vhd",
    Some("lib"),
    "library lib;\nuse lib.p.all;\nentity top is end;\n",
  );

  let plan = build_sequence(&mut database, &top, &BTreeSet::new());
  assert_eq!(plan_names(&plan), vec!["pkg.vhd", "top.vhd"]);
}

#[test]
fn mixed_language_plan() {
  // S2: a Verilog module instantiated from a SystemVerilog top.
  let dir = tempfile::tempdir().unwrap();
  let mut database = Database::new();

  add_source(&mut database, dir.path(), "mod_a.v", Some("lib"), "module mod_a(input clk);\nendmodule\n");
  let top = add_source(
    &mut database,
    dir.path(),
    "top.sv",
    Some("lib"),
    "module top;\n  mod_a u_mod_a (.clk(clk));\nendmodule\n",
  );

  let plan = build_sequence(&mut database, &top, &BTreeSet::new());
  assert_eq!(plan_names(&plan), vec!["mod_a.v", "top.sv"]);
}

#[test]
fn package_body_cycle_is_broken() {
  // S5: the body depends back on another package living next to the one it
  // implements.
  let dir = tempfile::tempdir().unwrap();
  let mut database = Database::new();

  add_source(
    &mut database,
    dir.path(),
    "pkg.vhd",
    Some("lib"),
    "package p is end package;\npackage q is end package;\n",
  );
  let body = add_source(
    &mut database,
    dir.path(),
    "pkg_body.vhd",
    Some("lib"),
    "package body p is end package body;\nlibrary lib;\nuse lib.q.all;\n",
  );

  let plan = build_sequence(&mut database, &body, &BTreeSet::new());
  assert_eq!(plan_names(&plan), vec!["pkg.vhd", "pkg_body.vhd"]);
}

#[test]
fn builtin_libraries_are_not_scheduled() {
  let dir = tempfile::tempdir().unwrap();
  let mut database = Database::new();

  let top = add_source(
    &mut database,
    dir.path(),
    "top.vhd",
    Some("lib"),
    "library ieee;\nuse ieee.std_logic_1164.all;\nentity top is end;\n",
  );

  let builtins: BTreeSet<Identifier> = [Identifier::vhdl("ieee")].into_iter().collect();
  let plan = build_sequence(&mut database, &top, &builtins);
  assert_eq!(plan_names(&plan), vec!["top.vhd"]);
}

#[test]
fn ambiguous_units_resolve_deterministically() {
  let dir = tempfile::tempdir().unwrap();
  let mut database = Database::new();

  add_source(&mut database, dir.path(), "one.vhd", Some("lib"), "package dup is end package;\n");
  add_source(&mut database, dir.path(), "two.vhd", Some("lib"), "package dup is end package;\n");
  let top = add_source(
    &mut database,
    dir.path(),
    "top.vhd",
    Some("lib"),
    "library lib;\nuse lib.dup.all;\nentity top is end;\n",
  );

  let first = build_sequence(&mut database, &top, &BTreeSet::new());
  let second = build_sequence(&mut database, &top, &BTreeSet::new());
  assert_eq!(first, second);
  // Only one of the two candidates is scheduled, and it is the smaller path.
  assert_eq!(plan_names(&first), vec!["one.vhd", "top.vhd"]);

  let diags = database.diagnostics_of(&top);
  assert!(diags.iter().any(|d| d.code.as_deref() == Some("dependency-not-unique")));
}

#[test]
fn unresolved_dependencies_are_reported_at_the_reference() {
  let dir = tempfile::tempdir().unwrap();
  let mut database = Database::new();

  let top = add_source(
    &mut database,
    dir.path(),
    "top.vhd",
    Some("lib"),
    "library missing_lib;\nuse missing_lib.nothing.all;\nentity top is end;\n",
  );

  let diags = database.unresolved_dependencies(&top, &BTreeSet::new());
  assert_eq!(diags.len(), 1);
  assert_eq!(diags[0].code.as_deref(), Some("unresolved-dependency"));
  assert_eq!(diags[0].location.unwrap().line, 1);
}

#[test]
fn include_resolution_matches_suffixes() {
  let dir = tempfile::tempdir().unwrap();
  let mut database = Database::new();

  let header = add_source(&mut database, dir.path(), "inc/defs.svh", Some("lib"), "package defs;\nendpackage\n");
  add_source(
    &mut database,
    dir.path(),
    "top.sv",
    Some("lib"),
    "`include \"inc/defs.svh\"\nmodule top;\nendmodule\n",
  );

  assert_eq!(database.resolve_included_path("inc/defs.svh"), Some(header.clone()));
  assert_eq!(database.resolve_included_path("defs.svh"), Some(header));
  assert_eq!(database.resolve_included_path("nope.svh"), None);
}
