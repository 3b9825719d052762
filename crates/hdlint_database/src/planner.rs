//! Build-sequence planner.
//!
//! Given a target path, produces an ordered list of `(library, path)` pairs
//! ending in the target, such that every file's dependencies appear earlier.
//! Cycles (package bodies are the usual culprit) are broken instead of
//! reported as failures.

use std::collections::{BTreeMap, BTreeSet};

use hdlint_log::{log_dbg, log_warn};
use hdlint_types::{Identifier, SourcePath};

use crate::Database;

type LibraryUnit = (Identifier, Identifier);

/// Result of planning one target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildPlan {
  /// Compilation order; the last element is always the target itself.
  pub sequence: Vec<(Identifier, SourcePath)>,
  /// Dependency edges removed to break cycles, as (user, provider) pairs.
  pub broken_edges: Vec<(SourcePath, SourcePath)>,
}

/// Plans the compilation of `target`. Dependencies on `builtins` libraries
/// are satisfied by the tool and never scheduled.
pub fn build_sequence(
  database: &mut Database,
  target: &SourcePath,
  builtins: &BTreeSet<Identifier>,
) -> BuildPlan {
  let mut plan = BuildPlan::default();

  let units_to_build = transitive_units(database, target, builtins);

  // Rule: a unit defined by several paths picks one deterministically; the
  // database already reported the ambiguity.
  let mut paths_to_build: BTreeSet<SourcePath> = BTreeSet::new();
  for (library, name) in &units_to_build {
    if let Some(path) = database.paths_by_design_unit(Some(library), name).into_iter().next() {
      if path != *target {
        paths_to_build.insert(path);
      }
    }
  }

  let mut units_compiled: BTreeSet<LibraryUnit> = BTreeSet::new();
  let mut broken: BTreeSet<(SourcePath, SourcePath)> = BTreeSet::new();

  // Worst case: every round schedules a single path, with one extra round
  // spent per broken cycle edge.
  let round_limit = 2 * paths_to_build.len() + 2;

  for _ in 0..round_limit {
    if paths_to_build.is_empty() {
      break;
    }

    let mut emitted = Vec::new();

    // Sorting by (library, path) keeps the output stable between runs.
    let mut round: Vec<(Identifier, SourcePath)> = paths_to_build
      .iter()
      .map(|path| (database.library_of(path), path.clone()))
      .collect();
    round.sort();

    for (library, path) in round {
      let own = own_units(database, &path);
      let needs = pending_needs(database, &path, builtins, &units_compiled, &own, &broken, &paths_to_build);
      let new_units: Vec<&LibraryUnit> = own.iter().filter(|unit| !units_compiled.contains(unit)).collect();

      if new_units.is_empty() {
        // Everything this path provides is already covered.
        log_dbg!("Path {} has nothing to add, skipping", path);
        emitted.push(path.clone());
      } else if needs.is_empty() {
        plan.sequence.push((library, path.clone()));
        emitted.push(path.clone());
        units_compiled.extend(own);
      }
    }

    for path in &emitted {
      paths_to_build.remove(path);
    }

    if emitted.is_empty() {
      // A cycle: every remaining path still waits on another one. Remove
      // the lexicographically greatest (user, provider) edge and go again.
      match greatest_pending_edge(database, &paths_to_build, builtins, &units_compiled, &broken) {
        Some(edge) => {
          log_warn!("Breaking dependency cycle at {} -> {}", edge.0, edge.1);
          broken.insert(edge.clone());
          plan.broken_edges.push(edge);
        },
        None => break,
      }
    }
  }

  if !paths_to_build.is_empty() {
    log_warn!("{} path(s) were not scheduled", paths_to_build.len());
  }

  let target_library = database.library_of(target);
  plan.sequence.push((target_library, target.clone()));
  plan
}

/// Transitive closure of `(library, unit)` pairs the target needs, walking
/// both unit dependencies and resolved `` `include `` references. The
/// target's own units are excluded.
fn transitive_units(
  database: &mut Database,
  target: &SourcePath,
  builtins: &BTreeSet<Identifier>,
) -> BTreeSet<LibraryUnit> {
  let mut units: BTreeSet<LibraryUnit> = BTreeSet::new();
  let mut visited: BTreeSet<SourcePath> = BTreeSet::new();
  let mut search: BTreeSet<SourcePath> = BTreeSet::new();
  search.insert(target.clone());

  while !search.is_empty() {
    let mut next: BTreeSet<SourcePath> = BTreeSet::new();
    let mut new_units: BTreeSet<LibraryUnit> = BTreeSet::new();

    for path in &search {
      visited.insert(path.clone());

      let dependencies: Vec<_> = database.dependencies_of(path).to_vec();
      for dependency in &dependencies {
        if let Some(unit) = dependency.as_unit() {
          let library = unit.library.clone().unwrap_or_else(|| database.library_of(path));
          if builtins.contains(&library) {
            continue;
          }
          let pair = (library, unit.name.clone());
          if !units.contains(&pair) {
            new_units.insert(pair);
          }
        }
      }

      for dependency in &dependencies {
        if let Some(include) = dependency.as_include() {
          if let Some(resolved) = database.resolve_included_path(&include.name) {
            if !visited.contains(&resolved) {
              next.insert(resolved);
            }
          }
        }
      }
    }

    units.extend(new_units.iter().cloned());

    for (library, name) in &new_units {
      for path in database.paths_by_design_unit(Some(library), name) {
        if !visited.contains(&path) {
          next.insert(path);
        }
      }
    }

    search = next;
  }

  let own = own_units(database, target);
  units.retain(|unit| !own.contains(unit));
  units
}

fn own_units(
  database: &mut Database,
  path: &SourcePath,
) -> BTreeSet<LibraryUnit> {
  let library = database.library_of(path);
  database
    .design_units_of(path)
    .iter()
    .map(|unit| (library.clone(), unit.name.clone()))
    .collect()
}

/// Units `path` still waits for: its dependencies minus everything compiled,
/// its own units, builtin libraries, bare `all` references and edges broken
/// to get out of a cycle.
fn pending_needs(
  database: &mut Database,
  path: &SourcePath,
  builtins: &BTreeSet<Identifier>,
  units_compiled: &BTreeSet<LibraryUnit>,
  own: &BTreeSet<LibraryUnit>,
  broken: &BTreeSet<(SourcePath, SourcePath)>,
  remaining: &BTreeSet<SourcePath>,
) -> Vec<LibraryUnit> {
  let dependencies: Vec<_> = database
    .dependencies_of(path)
    .iter()
    .filter_map(|dep| dep.as_unit())
    .cloned()
    .collect();

  let mut needs = Vec::new();
  for dependency in dependencies {
    // `use lib.all` only requires the library to exist, which the builder
    // guarantees.
    if dependency.name.name() == "all" {
      continue;
    }
    if let Some(library) = &dependency.library {
      if builtins.contains(library) {
        continue;
      }
    }

    let library = dependency.library.clone().unwrap_or_else(|| database.library_of(path));
    let pair = (library.clone(), dependency.name.clone());
    if units_compiled.contains(&pair) || own.contains(&pair) {
      continue;
    }

    let provider = database.paths_by_design_unit(Some(&library), &dependency.name).into_iter().next();
    match provider {
      Some(provider) => {
        if broken.contains(&(path.clone(), provider.clone())) {
          continue;
        }
        // Providers outside the remaining set are either compiled already
        // or unreachable; only block on the ones still pending.
        if remaining.contains(&provider) && provider != *path {
          needs.push(pair);
        }
      },
      // Unresolvable references are dropped here and reported separately.
      None => continue,
    }
  }
  needs
}

/// Finds the lexicographically greatest (user, provider) edge among the
/// remaining paths. `None` when the stall is not actually a cycle.
fn greatest_pending_edge(
  database: &mut Database,
  remaining: &BTreeSet<SourcePath>,
  builtins: &BTreeSet<Identifier>,
  units_compiled: &BTreeSet<LibraryUnit>,
  broken: &BTreeSet<(SourcePath, SourcePath)>,
) -> Option<(SourcePath, SourcePath)> {
  let mut edges: BTreeSet<(SourcePath, SourcePath)> = BTreeSet::new();

  for path in remaining {
    let own = own_units(database, path);
    for (library, name) in pending_needs(database, path, builtins, units_compiled, &own, broken, remaining) {
      if let Some(provider) = database.paths_by_design_unit(Some(&library), &name).into_iter().next() {
        if provider != *path && remaining.contains(&provider) {
          edges.insert((path.clone(), provider));
        }
      }
    }
  }

  edges.into_iter().next_back()
}
