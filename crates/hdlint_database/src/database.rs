//! In-memory index of sources, design units, dependencies and libraries.

use std::collections::{BTreeMap, BTreeSet};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use hdlint_diagnostics::Diagnostic;
use hdlint_log::{log_dbg, log_info, log_warn};
use hdlint_parser::ParsedSource;
use hdlint_types::{
  BuildFlagScope, BuildFlags, Dependency, DesignUnit, FileType, Identifier, SourcePath, UNRESOLVED_LIBRARY,
};

/// Flags attached to one source, already merged with the global scope by the
/// configuration layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ScopedFlags {
  pub source_specific: BuildFlags,
  pub single: BuildFlags,
  pub dependencies: BuildFlags,
}

/// Everything known about one source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SourceEntry {
  pub kind: FileType,
  pub library: Option<Identifier>,
  pub flags: ScopedFlags,
  pub design_units: Vec<DesignUnit>,
  pub dependencies: Vec<Dependency>,
  pub mtime_at_parse: Option<SystemTime>,
}

/// Stores info on and provides operations for a project file set.
///
/// All lookups are deterministic: entries are kept in path order and every
/// method that returns several results sorts them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Database {
  entries: BTreeMap<SourcePath, SourceEntry>,
  /// Libraries worked out by inference, cleared on every refresh.
  inferred: BTreeMap<SourcePath, Identifier>,
  #[serde(skip)]
  diagnostics: BTreeMap<SourcePath, BTreeSet<Diagnostic>>,
}

impl Database {
  pub fn new() -> Self {
    Self::default()
  }

  /// Inserts or updates a source. Parsing happens immediately; a file
  /// missing from disk still gets an entry, plus a diagnostic at line 0.
  pub fn put_file(
    &mut self,
    path: SourcePath,
    library: Option<Identifier>,
    source_specific: BuildFlags,
    single: BuildFlags,
    dependencies: BuildFlags,
  ) {
    let Some(kind) = FileType::from_path(path.as_path()) else {
      log_warn!("Won't include non RTL file '{}'", path);
      return;
    };

    log_info!("Adding {} (library={:?})", path, library.as_ref().map(|l| l.to_string()));

    let library = library.map(|l| Identifier::new(l.display_name(), kind.case_sensitive()));
    self.entries.insert(
      path.clone(),
      SourceEntry {
        kind,
        library,
        flags: ScopedFlags {
          source_specific,
          single,
          dependencies,
        },
        design_units: Vec::new(),
        dependencies: Vec::new(),
        mtime_at_parse: None,
      },
    );
    self.inferred.clear();
    self.parse_file(&path);
  }

  /// Removes a path and all its derived state. Unknown paths are a no-op.
  pub fn forget_file(
    &mut self,
    path: &SourcePath,
  ) {
    log_dbg!("Removing {} from database", path);
    self.entries.remove(path);
    self.inferred.clear();
    self.diagnostics.remove(path);
  }

  pub fn contains(
    &self,
    path: &SourcePath,
  ) -> bool {
    self.entries.contains_key(path)
  }

  pub fn paths(&self) -> impl Iterator<Item = &SourcePath> {
    self.entries.keys()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn file_type(
    &self,
    path: &SourcePath,
  ) -> Option<FileType> {
    self.entries.get(path).map(|entry| entry.kind)
  }

  /// Flags for building `path` in the given scope, with the per-source flags
  /// appended last so they win.
  pub fn flags(
    &self,
    path: &SourcePath,
    scope: BuildFlagScope,
  ) -> BuildFlags {
    let Some(entry) = self.entries.get(path) else {
      return BuildFlags::new();
    };
    let mut flags = match scope {
      BuildFlagScope::Single => entry.flags.single.clone(),
      BuildFlagScope::Dependencies => entry.flags.dependencies.clone(),
      BuildFlagScope::SourceSpecific | BuildFlagScope::Global => BuildFlags::new(),
    };
    flags.extend(entry.flags.source_specific.iter().cloned());
    flags
  }

  pub fn design_units_of(
    &self,
    path: &SourcePath,
  ) -> &[DesignUnit] {
    self.entries.get(path).map(|entry| entry.design_units.as_slice()).unwrap_or(&[])
  }

  pub fn dependencies_of(
    &self,
    path: &SourcePath,
  ) -> &[Dependency] {
    self.entries.get(path).map(|entry| entry.dependencies.as_slice()).unwrap_or(&[])
  }

  /// Diagnostics generated for a path by parsing, inference and dependency
  /// resolution. Does not trigger any processing.
  pub fn diagnostics_of(
    &self,
    path: &SourcePath,
  ) -> Vec<Diagnostic> {
    self
      .diagnostics
      .get(path)
      .map(|set| set.iter().cloned().collect())
      .unwrap_or_default()
  }

  /// Re-parses every stale file and clears inferred libraries so the next
  /// queries see a consistent view. Returns the set of changed paths.
  pub fn refresh(&mut self) -> BTreeSet<SourcePath> {
    self.inferred.clear();

    let stale: Vec<SourcePath> = self
      .entries
      .iter()
      .filter(|(path, entry)| path.mtime() != entry.mtime_at_parse)
      .map(|(path, _)| path.clone())
      .collect();

    for path in &stale {
      self.parse_file(path);
    }

    stale.into_iter().collect()
  }

  /// Library the path is compiled into, inferring one when the configuration
  /// did not assign it. Returns the unresolved sentinel as a last resort.
  pub fn library_of(
    &mut self,
    path: &SourcePath,
  ) -> Identifier {
    if !self.contains(path) {
      // Track the file anyway so its units are visible, but flag it.
      self.put_file(path.clone(), None, BuildFlags::new(), BuildFlags::new(), BuildFlags::new());
      self.add_diagnostic(Diagnostic::path_not_in_project(path));
    }

    if let Some(library) = self.entries.get(path).and_then(|entry| entry.library.clone()) {
      return library;
    }
    if let Some(library) = self.inferred.get(path) {
      return library.clone();
    }

    let library = self.infer_library(path);
    self.inferred.insert(path.clone(), library.clone());
    library
  }

  /// Paths that declare `name`, restricted to `library` when one is given.
  /// The result is sorted by path so callers can pick deterministically.
  /// More than one result also files a dependency-not-unique diagnostic at
  /// every reference site.
  pub fn paths_by_design_unit(
    &mut self,
    library: Option<&Identifier>,
    name: &Identifier,
  ) -> Vec<SourcePath> {
    let mut owners: Vec<SourcePath> = self.paths_declaring(name);

    if owners.is_empty() {
      log_dbg!("Could not find any source defining '{}'", name);
      return owners;
    }

    if let Some(library) = library {
      let matching: Vec<SourcePath> = owners
        .iter()
        .filter(|owner| self.library_of(owner) == *library)
        .cloned()
        .collect();
      // No owner matching the library means inference has not settled yet;
      // fall back to every candidate rather than dropping the reference.
      if !matching.is_empty() {
        owners = matching;
      }
    }

    owners.sort();
    owners.dedup();

    if owners.len() > 1 {
      self.report_dependency_not_unique(library, name, &owners);
    }

    owners
  }

  /// Resolves a `` `include `` name by suffix-matching project paths.
  pub fn resolve_included_path(
    &mut self,
    name: &str,
  ) -> Option<SourcePath> {
    let matches: Vec<SourcePath> = self
      .entries
      .keys()
      .filter(|path| path.ends_with_suffix(name))
      .cloned()
      .collect();

    if matches.is_empty() {
      log_warn!("No path matched include '{}'", name);
      return None;
    }

    if matches.len() > 1 {
      let locations: Vec<(SourcePath, hdlint_types::Location)> = self
        .entries
        .values()
        .flat_map(|entry| entry.dependencies.iter())
        .filter_map(|dep| dep.as_include())
        .filter(|include| include.name == name)
        .flat_map(|include| include.locations.iter().map(|l| (include.owner.clone(), *l)))
        .collect();
      for (owner, location) in locations {
        self.add_diagnostic(Diagnostic::dependency_not_unique(&owner, location, name, &matches));
      }
    }

    matches.into_iter().next()
  }

  /// Dependencies of `path` that resolve to no project path at all, as
  /// diagnostics at each reference site. Builtin libraries are not project
  /// paths and are skipped.
  pub fn unresolved_dependencies(
    &mut self,
    path: &SourcePath,
    builtins: &BTreeSet<Identifier>,
  ) -> Vec<Diagnostic> {
    let own_units: BTreeSet<Identifier> =
      self.design_units_of(path).iter().map(|unit| unit.name.clone()).collect();
    let dependencies: Vec<_> = self
      .dependencies_of(path)
      .iter()
      .filter_map(|dep| dep.as_unit())
      .cloned()
      .collect();

    let mut result = Vec::new();
    for dependency in dependencies {
      if dependency.name.name() == "all" || own_units.contains(&dependency.name) {
        continue;
      }
      if let Some(library) = &dependency.library {
        if builtins.contains(library) {
          continue;
        }
      }
      if !self.paths_declaring(&dependency.name).is_empty() {
        continue;
      }
      for location in &dependency.locations {
        result.push(Diagnostic::unresolved_dependency(&dependency, *location));
      }
    }
    result
  }

  pub(crate) fn add_diagnostic(
    &mut self,
    diagnostic: Diagnostic,
  ) {
    let Some(path) = diagnostic.path.clone() else {
      return;
    };
    self.diagnostics.entry(path).or_default().insert(diagnostic);
  }

  /// All paths declaring a unit named `name`, unsorted.
  fn paths_declaring(
    &self,
    name: &Identifier,
  ) -> Vec<SourcePath> {
    self
      .entries
      .iter()
      .filter(|(_, entry)| entry.design_units.iter().any(|unit| unit.name == *name))
      .map(|(path, _)| path.clone())
      .collect()
  }

  fn parse_file(
    &mut self,
    path: &SourcePath,
  ) {
    let Some(kind) = self.entries.get(path).map(|entry| entry.kind) else {
      return;
    };

    log_dbg!("Parsing {}", path);
    self.diagnostics.remove(path);

    let (parsed, mtime) = match path.read_text() {
      Ok(text) => (hdlint_parser::parse(&text, kind, path), path.mtime()),
      Err(_) => {
        self.add_diagnostic(Diagnostic::file_not_found(path));
        (ParsedSource::default(), None)
      },
    };

    if let Some(entry) = self.entries.get_mut(path) {
      entry.design_units = parsed.design_units;
      entry.dependencies = parsed.dependencies;
      entry.mtime_at_parse = mtime;
    }
  }

  /// Works out a library for a path the configuration left unassigned.
  ///
  /// Rule 1: a file explicitly in library L declares a unit this file
  /// depends on. Rule 2: a file explicitly in L depends on a unit this file
  /// declares. Several candidates pick the most common one and file a
  /// warning; none at all assigns the unresolved sentinel.
  fn infer_library(
    &mut self,
    path: &SourcePath,
  ) -> Identifier {
    let mut candidates = self.libraries_declaring_dependencies_of(path);
    if candidates.is_empty() {
      candidates = self.libraries_referring_to_units_of(path);
    }

    let distinct: BTreeSet<Identifier> = candidates.iter().cloned().collect();

    match distinct.len() {
      0 => {
        log_info!("Couldn't work out a library for path {}", path);
        self.add_diagnostic(Diagnostic::library_unresolved(path));
        Identifier::vhdl(UNRESOLVED_LIBRARY)
      },
      1 => candidates.remove(0),
      _ => {
        let chosen = most_common(&candidates);
        self.add_diagnostic(Diagnostic::library_not_unique(path, &chosen, &candidates));
        chosen
      },
    }
  }

  /// Rule 1 candidates: explicit libraries of files declaring units this
  /// path depends on, restricted to dependencies naming that library.
  fn libraries_declaring_dependencies_of(
    &self,
    path: &SourcePath,
  ) -> Vec<Identifier> {
    let Some(entry) = self.entries.get(path) else {
      return Vec::new();
    };

    let mut result = Vec::new();
    for dependency in entry.dependencies.iter().filter_map(|dep| dep.as_unit()) {
      let Some(library) = &dependency.library else {
        continue;
      };
      let declared_there = self.entries.values().any(|other| {
        other.library.as_ref() == Some(library)
          && other.design_units.iter().any(|unit| unit.name == dependency.name)
      });
      if declared_there {
        result.push(library.clone());
      }
    }
    result
  }

  /// Rule 2 candidates: libraries used by dependencies (anywhere in the
  /// project) on units this path declares. A dependency without an explicit
  /// library contributes its owner's explicit library instead.
  fn libraries_referring_to_units_of(
    &self,
    path: &SourcePath,
  ) -> Vec<Identifier> {
    let Some(entry) = self.entries.get(path) else {
      return Vec::new();
    };
    let own_units: BTreeSet<&Identifier> = entry.design_units.iter().map(|unit| &unit.name).collect();

    let mut result = Vec::new();
    for (owner, other) in &self.entries {
      if owner == path {
        continue;
      }
      for dependency in other.dependencies.iter().filter_map(|dep| dep.as_unit()) {
        if !own_units.contains(&dependency.name) {
          continue;
        }
        let library = dependency.library.clone().or_else(|| other.library.clone());
        if let Some(library) = library {
          if library.name() != hdlint_types::WORK_LIBRARY {
            result.push(library);
          }
        }
      }
    }
    result
  }

  fn report_dependency_not_unique(
    &mut self,
    library: Option<&Identifier>,
    name: &Identifier,
    choices: &[SourcePath],
  ) {
    let references: Vec<(SourcePath, hdlint_types::Location)> = self
      .entries
      .values()
      .flat_map(|entry| entry.dependencies.iter())
      .filter_map(|dep| dep.as_unit())
      .filter(|dep| dep.name == *name && (library.is_none() || dep.library.as_ref() == library))
      .flat_map(|dep| dep.locations.iter().map(|l| (dep.owner.clone(), *l)))
      .collect();

    let reference = match library {
      Some(library) => format!("{}.{}", library, name),
      None => format!("{}.{}", hdlint_types::WORK_LIBRARY, name),
    };

    for (owner, location) in references {
      self.add_diagnostic(Diagnostic::dependency_not_unique(&owner, location, &reference, choices));
    }
  }
}

/// Most common identifier, ties broken by name so the result is stable.
fn most_common(candidates: &[Identifier]) -> Identifier {
  let mut counts: BTreeMap<&Identifier, usize> = BTreeMap::new();
  for candidate in candidates {
    *counts.entry(candidate).or_insert(0) += 1;
  }
  counts
    .into_iter()
    .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
    .map(|(identifier, _)| identifier.clone())
    .expect("candidates is not empty")
}
