//! Top-level project engine.
//!
//! Owns the database, the chosen compiler adapter and the on-disk cache,
//! serializes build requests and aggregates diagnostics from every layer:
//! the external tool, the static checker, library inference and dependency
//! resolution.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, RwLock, RwLockWriteGuard};

use hdlint_builders::{Builder, BuilderKind, Probe};
use hdlint_check::static_messages;
use hdlint_config::{ConfigError, ProjectConfig};
use hdlint_database::{build_sequence, Database};
use hdlint_diagnostics::{sort_and_dedup, Diagnostic};
use hdlint_log::{log_dbg, log_err, log_info, log_warn};
use hdlint_types::{BuildFlagScope, FileType, Identifier, Location, RebuildHint, RequiredUnit, Severity, SourcePath};

use crate::cache::{self, CacheState};

/// Scratch directory kept next to the project, safe to delete at any time.
pub const WORK_PATH: &str = ".hdlint";

/// Bound on plan-and-build cycles triggered by rebuild hints.
const MAX_REBUILD_ATTEMPTS: usize = 20;

/// One engine per project root.
pub struct Project {
  work_dir: PathBuf,
  database: RwLock<Database>,
  builder: Mutex<Builder>,
  config_file: Option<PathBuf>,
  config_diagnostics: Vec<Diagnostic>,
  /// Probe-failure notes, surfaced once on the next diagnostics call.
  startup_notes: Mutex<Vec<Diagnostic>>,
  /// Serializes build requests; queries run concurrently with builds.
  build_lock: Mutex<()>,
}

impl Project {
  /// Creates the engine for `root`, recovering cached state when the cache
  /// file is present and its schema matches.
  pub fn new(root: &Path) -> std::io::Result<Self> {
    let work_dir = root.join(WORK_PATH);
    std::fs::create_dir_all(&work_dir)?;

    let mut database = Database::new();
    let mut builder = Builder::new(BuilderKind::Fallback, &work_dir);
    let mut config_file = None;

    if let Some(state) = cache::load(&work_dir) {
      database = state.database;
      builder = Builder::new(state.builder, &work_dir);
      builder.restore_state(state.builder_state);
      config_file = state.config_file;
    }

    Ok(Self {
      work_dir,
      database: RwLock::new(database),
      builder: Mutex::new(builder),
      config_file,
      config_diagnostics: Vec::new(),
      startup_notes: Mutex::new(Vec::new()),
      build_lock: Mutex::new(()),
    })
  }

  pub fn work_dir(&self) -> &Path {
    &self.work_dir
  }

  pub fn config_file(&self) -> Option<&Path> {
    self.config_file.as_deref()
  }

  /// Warnings collected while loading the configuration.
  pub fn config_diagnostics(&self) -> &[Diagnostic] {
    &self.config_diagnostics
  }

  /// Loads the configuration at `config_path`: picks a builder, replaces
  /// the source set and resolves per-source flags against the chosen
  /// builder's defaults.
  pub fn configure(
    &mut self,
    config_path: &Path,
  ) -> Result<(), ConfigError> {
    let config = hdlint_config::load(config_path)?;
    self.config_file = Some(config_path.to_path_buf());
    self.config_diagnostics = config.diagnostics.clone();

    let builder = self.choose_builder(&config);
    log_info!("Using builder '{}'", builder.name());
    {
      let mut guard = self.lock_builder();
      *guard = builder;
      if let Err(error) = guard.setup() {
        log_warn!("Builder setup failed: {}", error);
      }
    }

    self.apply_sources(&config);
    self.save_cache();
    Ok(())
  }

  /// Full diagnostics for one path: plan, compile dependencies, compile the
  /// target, run static checks and merge in database diagnostics. Repeats
  /// the plan-and-build cycle while the tool asks for rebuilds, up to a
  /// bounded number of attempts.
  pub fn diagnostics(
    &self,
    path: &SourcePath,
  ) -> Vec<Diagnostic> {
    let _build_guard = self.lock_builds();

    self.write_database().refresh();
    let builtins = self.lock_builder().builtin_libraries();

    let mut tool_diagnostics = Vec::new();
    let mut attempts = 0;

    loop {
      attempts += 1;
      tool_diagnostics.clear();

      let plan = build_sequence(&mut self.write_database(), path, &builtins);
      let mut rebuilds: Vec<RebuildHint> = Vec::new();

      let (dependencies, target) = plan.sequence.split_at(plan.sequence.len() - 1);

      for (library, dependency) in dependencies {
        let report = self.build_one(dependency, library, BuildFlagScope::Dependencies, false);
        rebuilds.extend(report.rebuilds);
        // Dependency compiles only contribute hard failures; style noise
        // from other files is not this file's concern.
        tool_diagnostics.extend(report.diagnostics.into_iter().filter(|d| d.severity >= Severity::Error));
      }

      for (library, target_path) in target {
        let report = self.build_one(target_path, library, BuildFlagScope::Single, true);
        rebuilds.extend(report.rebuilds);
        tool_diagnostics.extend(report.diagnostics);
      }

      if tool_diagnostics.iter().any(|d| d.severity == Severity::Fatal) {
        log_err!("Fatal diagnostic while building {}, halting the run", path);
        break;
      }

      if rebuilds.is_empty() {
        break;
      }
      if attempts >= MAX_REBUILD_ATTEMPTS {
        log_err!("Unable to settle '{}' after {} attempts", path, MAX_REBUILD_ATTEMPTS);
        break;
      }

      log_dbg!("Rebuild hints for {}: {}", path, rebuilds.len());
      self.apply_rebuild_hints(&rebuilds);
    }

    let mut result = tool_diagnostics;

    // Static checks need no tool and run off the raw text.
    if let Ok(text) = path.read_text() {
      result.extend(static_messages(&text).into_iter().map(|d| d.with_path(path.clone())));
    }

    {
      let mut database = self.write_database();
      result.extend(database.unresolved_dependencies(path, &builtins));
      result.extend(database.diagnostics_of(path));
    }

    for diagnostic in &self.config_diagnostics {
      result.push(diagnostic.clone().with_path(path.clone()).with_location(Location::new(0, 0)));
    }

    // Probe failures are informational and reported a single time.
    {
      let mut notes = self.startup_notes.lock().unwrap_or_else(|e| e.into_inner());
      result.extend(notes.drain(..).map(|d| d.with_path(path.clone()).with_location(Location::new(0, 0))));
    }

    self.save_cache();
    sort_and_dedup(&mut result);
    result
  }

  /// Locations declaring whatever reference sits at `position`.
  pub fn definition(
    &self,
    path: &SourcePath,
    position: Location,
  ) -> Vec<(SourcePath, Location)> {
    self.write_database().refresh();

    if let Some(dependency) = self.dependency_at(path, position) {
      let mut database = self.write_database();
      let library = dependency
        .library
        .clone()
        .unwrap_or_else(|| database.library_of(path));

      let mut locations = Vec::new();
      for owner in database.paths_by_design_unit(Some(&library), &dependency.name) {
        for unit in database.design_units_of(&owner) {
          if unit.name == dependency.name {
            locations.extend(unit.locations.iter().map(|l| (owner.clone(), *l)));
          }
        }
      }
      return locations;
    }

    // On a declaration itself, report every declaration site of that unit
    // in this file (a package and its body, for instance).
    let units = self.read_units(path);
    for unit in &units {
      if covers(&unit.locations, unit.name.display_name().len(), position) {
        return unit.locations.iter().map(|l| (path.clone(), *l)).collect();
      }
    }

    Vec::new()
  }

  /// Human-readable summary for the reference at `position`: the resolved
  /// library and path for a dependency, the planned compilation sequence
  /// for a design unit.
  pub fn hover(
    &self,
    path: &SourcePath,
    position: Location,
  ) -> Option<String> {
    self.write_database().refresh();

    if let Some(dependency) = self.dependency_at(path, position) {
      let mut database = self.write_database();
      let library = dependency
        .library
        .clone()
        .unwrap_or_else(|| database.library_of(path));
      let owner = database.paths_by_design_unit(Some(&library), &dependency.name).into_iter().next()?;
      return Some(format!("Library: {}\nPath: {}", library, owner));
    }

    let units = self.read_units(path);
    let unit = units
      .iter()
      .find(|unit| covers(&unit.locations, unit.name.display_name().len(), position))?;

    let builtins = self.lock_builder().builtin_libraries();
    let plan = build_sequence(&mut self.write_database(), path, &builtins);
    let mut text = format!("Build sequence for {} '{}':\n", unit.kind.as_str(), unit.name);
    for (library, step) in &plan.sequence {
      text.push_str(&format!("  {}  {}\n", library, step));
    }
    Some(text)
  }

  /// Flushes the cache; called before the process exits.
  pub fn shutdown(&self) {
    self.save_cache();
  }

  fn choose_builder(
    &self,
    config: &ProjectConfig,
  ) -> Builder {
    let mut notes = self.startup_notes.lock().unwrap_or_else(|e| e.into_inner());

    if let Some(name) = &config.builder {
      match BuilderKind::from_name(name) {
        Some(kind) => {
          let mut builder = Builder::new(kind, &self.work_dir);
          match builder.probe() {
            Probe::Available { version } => {
              log_info!("Builder '{}' {} probed fine", name, version);
              return builder;
            },
            Probe::Unavailable { reason } => notes.push(Diagnostic::builder_unavailable(name, &reason)),
          }
        },
        None => notes.push(Diagnostic::builder_unavailable(name, "unknown builder name")),
      }
    }

    // Walking the preference order is ordinary discovery; only an explicit
    // choice failing above is worth a user-visible note.
    for kind in BuilderKind::PREFERENCE {
      let mut builder = Builder::new(kind, &self.work_dir);
      match builder.probe() {
        Probe::Available { .. } => return builder,
        Probe::Unavailable { reason } => log_dbg!("Builder '{}' unavailable: {}", kind, reason),
      }
    }

    Builder::new(BuilderKind::Fallback, &self.work_dir)
  }

  fn apply_sources(
    &self,
    config: &ProjectConfig,
  ) {
    let mut database = self.write_database();
    let builder = self.lock_builder();

    let configured: BTreeSet<SourcePath> = config.sources.iter().map(|entry| entry.path.clone()).collect();
    let dropped: Vec<SourcePath> = database.paths().filter(|p| !configured.contains(p)).cloned().collect();
    for path in dropped {
      database.forget_file(&path);
    }

    for entry in &config.sources {
      let Some(language) = FileType::from_path(entry.path.as_path()) else {
        continue;
      };
      // Language blocks in the config override the builder defaults for
      // that scope; absent blocks fall back to them.
      let single = entry
        .single
        .clone()
        .unwrap_or_else(|| builder.default_flags(BuildFlagScope::Single, language));
      let dependencies = entry
        .dependencies
        .clone()
        .unwrap_or_else(|| builder.default_flags(BuildFlagScope::Dependencies, language));

      database.put_file(
        entry.path.clone(),
        entry.library.as_deref().map(Identifier::vhdl),
        entry.source_specific.clone(),
        single,
        dependencies,
      );
    }
  }

  fn build_one(
    &self,
    path: &SourcePath,
    library: &Identifier,
    scope: BuildFlagScope,
    scratch: bool,
  ) -> hdlint_builders::BuildReport {
    // Collect everything the builder needs from the database, then drop
    // the lock before blocking on the external process.
    let (flags, include_dirs, dependency_libraries) = {
      let mut database = self.write_database();
      let flags = database.flags(path, scope);
      let include_dirs = include_dirs_for(&mut database, path);
      let libraries: BTreeSet<Identifier> = database
        .dependencies_of(path)
        .iter()
        .filter_map(|dep| dep.as_unit())
        .filter_map(|dep| dep.library.clone())
        .collect();
      (flags, include_dirs, libraries)
    };

    let mut builder = self.lock_builder();
    for library in &dependency_libraries {
      builder.create_library(library);
    }
    builder.build(path, library, &flags, scratch, &include_dirs)
  }

  /// Forces a rebuild of whatever the hints name so the next planning pass
  /// starts from fresh results.
  fn apply_rebuild_hints(
    &self,
    hints: &[RebuildHint],
  ) {
    for hint in hints {
      let paths: Vec<(Identifier, SourcePath)> = {
        let mut database = self.write_database();
        let named = match hint {
          RebuildHint::Path { path } => vec![path.clone()],
          RebuildHint::Unit { name } => database.paths_by_design_unit(None, name),
          RebuildHint::LibraryUnit { library, name } => database.paths_by_design_unit(Some(library), name),
        };
        named
          .into_iter()
          .map(|path| (database.library_of(&path), path))
          .collect()
      };

      for (library, path) in paths {
        log_dbg!("Rebuilding {} for hint {}", path, hint);
        let _ = self.build_one(&path, &library, BuildFlagScope::Dependencies, true);
      }
    }
  }

  fn dependency_at(
    &self,
    path: &SourcePath,
    position: Location,
  ) -> Option<RequiredUnit> {
    let database = self.database.read().unwrap_or_else(|e| e.into_inner());
    database
      .dependencies_of(path)
      .iter()
      .filter_map(|dep| dep.as_unit())
      .find(|dep| {
        let span = dep.library_display().len() + 1 + dep.name.display_name().len();
        covers(&dep.locations, span, position)
      })
      .cloned()
  }

  fn read_units(
    &self,
    path: &SourcePath,
  ) -> Vec<hdlint_types::DesignUnit> {
    let database = self.database.read().unwrap_or_else(|e| e.into_inner());
    database.design_units_of(path).to_vec()
  }

  fn save_cache(&self) {
    let database = self.database.read().unwrap_or_else(|e| e.into_inner()).clone();
    let (builder, builder_state) = {
      let guard = self.lock_builder();
      (guard.kind(), guard.state())
    };
    let state = CacheState {
      database,
      builder,
      builder_state,
      config_file: self.config_file.clone(),
    };
    cache::save(&self.work_dir, &state);
  }

  fn write_database(&self) -> RwLockWriteGuard<'_, Database> {
    self.database.write().unwrap_or_else(|e| e.into_inner())
  }

  fn lock_builder(&self) -> MutexGuard<'_, Builder> {
    self.builder.lock().unwrap_or_else(|e| e.into_inner())
  }

  fn lock_builds(&self) -> MutexGuard<'_, ()> {
    self.build_lock.lock().unwrap_or_else(|e| e.into_inner())
  }
}

/// Whether `position` falls inside any of `locations`, assuming each starts
/// a span of `length` characters.
fn covers(
  locations: &[Location],
  length: usize,
  position: Location,
) -> bool {
  locations.iter().any(|location| {
    location.line == position.line
      && position.column >= location.column
      && position.column <= location.column + length as u32
  })
}

/// Directories handed to the tool as include search paths, derived from the
/// resolved `` `include `` references of `path`.
fn include_dirs_for(
  database: &mut Database,
  path: &SourcePath,
) -> Vec<String> {
  let includes: Vec<String> = database
    .dependencies_of(path)
    .iter()
    .filter_map(|dep| dep.as_include())
    .map(|include| include.name.clone())
    .collect();

  let mut dirs = Vec::new();
  for name in includes {
    if let Some(resolved) = database.resolve_included_path(&name) {
      let full = resolved.to_string();
      let dir = full.trim_end_matches(name.as_str()).trim_end_matches('/').to_string();
      if !dir.is_empty() && !dirs.contains(&dir) {
        dirs.push(dir);
      }
    }
  }
  dirs
}
