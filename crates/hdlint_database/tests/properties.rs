mod common;

use std::collections::BTreeSet;

use proptest::prelude::*;

use hdlint_database::{build_sequence, Database};
use hdlint_types::{Identifier, SourcePath};

use common::add_source;

/// Small pool of interdependent VHDL sources to draw scenarios from.
fn source_pool() -> Vec<(&'static str, Option<&'static str>, String)> {
  vec![
    ("pkg_a.vhd", Some("lib_a"), "package pkg_a is end package;\n".to_string()),
    (
      "pkg_a_body.vhd",
      Some("lib_a"),
      "package body pkg_a is end package body;\n".to_string(),
    ),
    (
      "uses_a.vhd",
      None,
      "library lib_a;\nuse lib_a.pkg_a.all;\nentity uses_a is end;\n".to_string(),
    ),
    ("pkg_b.vhd", Some("lib_b"), "package pkg_b is end package;\n".to_string()),
    (
      "top.vhd",
      Some("lib_b"),
      "library lib_a;\nuse lib_a.pkg_a.all;\nuse work.pkg_b.all;\nentity top is end;\n".to_string(),
    ),
  ]
}

fn snapshot(database: &Database) -> String {
  serde_json::to_string(database).expect("database serializes")
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(32))]

  /// Any sequence of put/forget operations settles: refreshing twice yields
  /// the same database state.
  #[test]
  fn refresh_is_idempotent(operations in prop::collection::vec((0usize..5, prop::bool::ANY), 1..12)) {
    let dir = tempfile::tempdir().unwrap();
    let mut database = Database::new();
    let pool = source_pool();

    let mut known: Vec<SourcePath> = Vec::new();
    for (index, is_put) in operations {
      let (name, library, content) = &pool[index];
      if is_put {
        known.push(add_source(&mut database, dir.path(), name, *library, content));
      } else if let Some(path) = known.get(index % known.len().max(1)) {
        database.forget_file(&path.clone());
      }
    }

    database.refresh();
    let first = snapshot(&database);
    database.refresh();
    let second = snapshot(&database);
    prop_assert_eq!(first, second);
  }

  /// Library inference reaches a fixed point: resolving every library twice
  /// changes nothing.
  #[test]
  fn library_inference_is_a_fixed_point(subset in prop::collection::btree_set(0usize..5, 1..5)) {
    let dir = tempfile::tempdir().unwrap();
    let mut database = Database::new();
    let pool = source_pool();

    let mut paths = Vec::new();
    for index in subset {
      let (name, library, content) = &pool[index];
      paths.push(add_source(&mut database, dir.path(), name, *library, content));
    }

    let first: Vec<Identifier> = paths.iter().map(|p| database.library_of(p)).collect();
    let second: Vec<Identifier> = paths.iter().map(|p| database.library_of(p)).collect();
    prop_assert_eq!(first, second);
  }

  /// In every planned sequence, each file's resolvable dependencies appear
  /// at an earlier index (broken-cycle edges excluded).
  #[test]
  fn planned_dependencies_come_earlier(target_index in 0usize..5) {
    let dir = tempfile::tempdir().unwrap();
    let mut database = Database::new();

    let mut paths = Vec::new();
    for (name, library, content) in source_pool() {
      paths.push(add_source(&mut database, dir.path(), name, library, &content));
    }

    let target = paths[target_index].clone();
    let plan = build_sequence(&mut database, &target, &BTreeSet::new());

    let position = |path: &SourcePath| plan.sequence.iter().position(|(_, p)| p == path);

    prop_assert_eq!(plan.sequence.last().map(|(_, p)| p.clone()), Some(target.clone()));

    for (index, (_, path)) in plan.sequence.iter().enumerate() {
      let own: BTreeSet<Identifier> = database.design_units_of(path).iter().map(|u| u.name.clone()).collect();
      let dependencies: Vec<_> = database
        .dependencies_of(path)
        .iter()
        .filter_map(|d| d.as_unit())
        .cloned()
        .collect();

      for dependency in dependencies {
        if dependency.name.name() == "all" || own.contains(&dependency.name) {
          continue;
        }
        if plan.broken_edges.iter().any(|(user, _)| user == path) {
          continue;
        }
        let providers = database.paths_by_design_unit(dependency.library.as_ref(), &dependency.name);
        let Some(provider) = providers.first() else {
          continue;
        };
        if let Some(provider_index) = position(provider) {
          prop_assert!(
            provider_index <= index,
            "{} needed by {} is planned later",
            provider,
            path
          );
        }
      }
    }
  }

  /// Planning is deterministic: the same inputs give byte-identical plans.
  #[test]
  fn planning_is_deterministic(target_index in 0usize..5) {
    let dir = tempfile::tempdir().unwrap();
    let mut database = Database::new();

    let mut paths = Vec::new();
    for (name, library, content) in source_pool() {
      paths.push(add_source(&mut database, dir.path(), name, library, &content));
    }

    let target = paths[target_index].clone();
    let first = build_sequence(&mut database, &target, &BTreeSet::new());
    let second = build_sequence(&mut database, &target, &BTreeSet::new());
    prop_assert_eq!(first, second);
  }
}

#[test]
fn database_serialization_round_trips() {
  let dir = tempfile::tempdir().unwrap();
  let mut database = Database::new();

  for (name, library, content) in source_pool() {
    add_source(&mut database, dir.path(), name, library, &content);
  }
  database.refresh();

  let first = snapshot(&database);
  let recovered: Database = serde_json::from_str(&first).expect("database deserializes");
  let second = snapshot(&recovered);
  assert_eq!(first, second);
}
