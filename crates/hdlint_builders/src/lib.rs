//! Uniform facade over the external HDL compilers.
//!
//! Each adapter knows how to probe its tool, create physical libraries,
//! compile one file and translate the tool's output into diagnostics and
//! rebuild hints. The [`Builder`] struct wraps an adapter with the shared
//! bookkeeping: working directory, created libraries, builtin-library scan
//! and a per-path result cache.

mod fallback;
mod ghdl;
mod msim;
mod process;
mod tool;
mod xvhdl;

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use hdlint_diagnostics::Diagnostic;
use hdlint_log::{log_dbg, log_info, log_warn};
use hdlint_types::{BuildFlagScope, BuildFlags, FileType, Identifier, RebuildHint, Severity, SourcePath, WORK_LIBRARY};

pub use process::{run_command, CommandOutput};
pub use tool::BuildContext;

use fallback::Fallback;
use ghdl::Ghdl;
use msim::Msim;
use tool::Tool;
use xvhdl::Xvhdl;

/// Default deadline for one external compiler invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Result of probing a tool's availability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
  Available { version: String },
  Unavailable { reason: String },
}

/// Everything one `build` call produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
  pub diagnostics: Vec<Diagnostic>,
  pub rebuilds: Vec<RebuildHint>,
}

/// The supported adapters, in engine preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BuilderKind {
  Msim,
  Ghdl,
  Xvhdl,
  Fallback,
}

impl BuilderKind {
  /// Probe order used when no builder was configured explicitly.
  pub const PREFERENCE: [BuilderKind; 4] = [BuilderKind::Msim, BuilderKind::Ghdl, BuilderKind::Xvhdl, BuilderKind::Fallback];

  pub fn from_name(name: &str) -> Option<BuilderKind> {
    match name {
      "msim" => Some(BuilderKind::Msim),
      "ghdl" => Some(BuilderKind::Ghdl),
      "xvhdl" => Some(BuilderKind::Xvhdl),
      "fallback" => Some(BuilderKind::Fallback),
      _ => None,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      BuilderKind::Msim => "msim",
      BuilderKind::Ghdl => "ghdl",
      BuilderKind::Xvhdl => "xvhdl",
      BuilderKind::Fallback => "fallback",
    }
  }
}

impl std::fmt::Display for BuilderKind {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

enum AnyTool {
  Msim(Msim),
  Ghdl(Ghdl),
  Xvhdl(Xvhdl),
  Fallback(Fallback),
}

impl AnyTool {
  fn new(kind: BuilderKind) -> Self {
    match kind {
      BuilderKind::Msim => AnyTool::Msim(Msim::default()),
      BuilderKind::Ghdl => AnyTool::Ghdl(Ghdl::default()),
      BuilderKind::Xvhdl => AnyTool::Xvhdl(Xvhdl::default()),
      BuilderKind::Fallback => AnyTool::Fallback(Fallback),
    }
  }

  fn tool(&self) -> &dyn Tool {
    match self {
      AnyTool::Msim(tool) => tool,
      AnyTool::Ghdl(tool) => tool,
      AnyTool::Xvhdl(tool) => tool,
      AnyTool::Fallback(tool) => tool,
    }
  }

  fn tool_mut(&mut self) -> &mut dyn Tool {
    match self {
      AnyTool::Msim(tool) => tool,
      AnyTool::Ghdl(tool) => tool,
      AnyTool::Xvhdl(tool) => tool,
      AnyTool::Fallback(tool) => tool,
    }
  }
}

/// Persisted adapter state, restored across restarts with the cache.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuilderState {
  pub added_libraries: BTreeSet<Identifier>,
}

#[derive(Debug, Clone)]
struct CacheEntry {
  compile_time: Option<SystemTime>,
  report: BuildReport,
}

/// One adapter bound to a working directory.
pub struct Builder {
  kind: BuilderKind,
  tool: AnyTool,
  work_root: PathBuf,
  timeout: Duration,
  added_libraries: BTreeSet<Identifier>,
  builtins: Option<BTreeSet<Identifier>>,
  cache: HashMap<SourcePath, CacheEntry>,
}

impl Builder {
  pub fn new(
    kind: BuilderKind,
    work_root: &Path,
  ) -> Self {
    Self {
      kind,
      tool: AnyTool::new(kind),
      work_root: work_root.to_path_buf(),
      timeout: DEFAULT_TIMEOUT,
      added_libraries: BTreeSet::new(),
      builtins: None,
      cache: HashMap::new(),
    }
  }

  pub fn kind(&self) -> BuilderKind {
    self.kind
  }

  pub fn name(&self) -> &'static str {
    self.kind.as_str()
  }

  pub fn work_root(&self) -> &Path {
    &self.work_root
  }

  pub fn set_timeout(
    &mut self,
    timeout: Duration,
  ) {
    self.timeout = timeout;
  }

  pub fn supports(
    &self,
    language: FileType,
  ) -> bool {
    self.tool.tool().file_types().contains(&language)
  }

  /// Invokes the tool with its version flag and classifies the result.
  pub fn probe(&mut self) -> Probe {
    self.tool.tool_mut().probe(&self.work_root)
  }

  /// Creates the working directory and lets the adapter set up its own
  /// files (modelsim.ini and friends).
  pub fn setup(&mut self) -> std::io::Result<()> {
    if self.kind != BuilderKind::Fallback {
      std::fs::create_dir_all(&self.work_root)?;
    }
    self.tool.tool_mut().setup(&self.work_root)
  }

  /// Libraries the tool ships precompiled; dependencies on them are
  /// satisfied without scheduling anything. Scanned once per session.
  pub fn builtin_libraries(&mut self) -> BTreeSet<Identifier> {
    if self.builtins.is_none() {
      let found = self.tool.tool().builtin_libraries(&self.work_root);
      if !found.is_empty() {
        log_dbg!("Builtin libraries: {} entries", found.len());
      }
      self.builtins = Some(found);
    }
    self.builtins.clone().unwrap_or_default()
  }

  /// Default flags the adapter applies for (scope, language), merged with
  /// the always-on global scope.
  pub fn default_flags(
    &self,
    scope: BuildFlagScope,
    language: FileType,
  ) -> BuildFlags {
    let tool = self.tool.tool();
    let mut flags = tool.default_flags(scope, language);
    flags.extend(tool.default_flags(BuildFlagScope::Global, language));
    flags
  }

  /// Idempotent physical library creation. Builtin libraries are never
  /// overwritten.
  pub fn create_library(
    &mut self,
    library: &Identifier,
  ) {
    if self.added_libraries.contains(library) {
      return;
    }
    if self.builtin_libraries().contains(library) {
      return;
    }
    self.added_libraries.insert(library.clone());
    if let Err(error) = self.tool.tool_mut().create_library(library, &self.work_root, &self.added_libraries) {
      log_warn!("Could not create library '{}': {}", library, error);
    }
  }

  /// Compiles `path` into `library`.
  ///
  /// `scratch` forces a fresh compile and is used for the check target;
  /// dependencies reuse the cached report while the file is unchanged.
  /// A report carrying an error invalidates its cache entry so the next
  /// call tries again.
  pub fn build(
    &mut self,
    path: &SourcePath,
    library: &Identifier,
    flags: &BuildFlags,
    scratch: bool,
    include_dirs: &[String],
  ) -> BuildReport {
    let Some(language) = FileType::from_path(path.as_path()) else {
      return BuildReport::default();
    };
    if !self.supports(language) {
      log_warn!("Path '{}' with file type '{}' is not supported by {}", path, language, self.name());
      return BuildReport::default();
    }

    let mtime = path.mtime();
    if !scratch {
      if let Some(entry) = self.cache.get(path) {
        if entry.compile_time.is_some() && entry.compile_time == mtime {
          log_dbg!("Nothing to do for {}", path);
          return entry.report.clone();
        }
      }
    }

    log_info!("Building {} into '{}'", path, library);
    self.create_library(library);

    let context = BuildContext {
      work_root: &self.work_root,
      include_dirs,
      added_libraries: &self.added_libraries,
    };
    let commands = self.tool.tool().build_commands(path, library, flags, &context);

    let mut lines = Vec::new();
    let mut report = BuildReport::default();
    for argv in commands {
      match run_command(&argv, Some(&self.work_root), self.timeout) {
        Ok(output) => {
          if output.timed_out {
            report
              .diagnostics
              .push(Diagnostic::build_timeout(path, self.name(), self.timeout.as_secs()));
            break;
          }
          lines.extend(output.lines);
        },
        Err(error) => {
          log_warn!("Failed to run {}: {}", argv.first().map(String::as_str).unwrap_or(""), error);
          report.diagnostics.push(
            Diagnostic::from_builder(self.name(), Severity::Error, format!("Failed to invoke compiler: {}", error))
              .with_path(path.clone()),
          );
          break;
        },
      }
    }

    let parsed = self.parse_lines(&lines, path);
    report.diagnostics.extend(parsed);
    report.rebuilds = self.rebuilds_from_lines(&lines, library);

    let had_errors = report.diagnostics.iter().any(|d| d.severity >= Severity::Error);
    self.cache.insert(
      path.clone(),
      CacheEntry {
        compile_time: if had_errors { None } else { mtime },
        report: report.clone(),
      },
    );

    report
  }

  /// Translates raw tool output into diagnostics. Lines the adapter cannot
  /// interpret are dropped, never surfaced as malformed diagnostics.
  pub fn parse_output(
    &self,
    raw_stdout: &str,
    raw_stderr: &str,
  ) -> Vec<Diagnostic> {
    let lines: Vec<String> = raw_stdout.lines().chain(raw_stderr.lines()).map(str::to_string).collect();
    self.parse_lines(&lines, &SourcePath::absolute("/"))
      .into_iter()
      .map(|mut diagnostic| {
        if diagnostic.path.as_ref().map(|p| p.as_path() == Path::new("/")).unwrap_or(false) {
          diagnostic.path = None;
        }
        diagnostic
      })
      .collect()
  }

  /// Surfaces "recompile X because Y changed" advice from raw output.
  pub fn rebuilds_from(
    &self,
    raw_output: &str,
  ) -> Vec<RebuildHint> {
    let lines: Vec<String> = raw_output.lines().map(str::to_string).collect();
    self.rebuilds_from_lines(&lines, &Identifier::vhdl(WORK_LIBRARY))
  }

  /// Adapter state worth persisting between sessions.
  pub fn state(&self) -> BuilderState {
    BuilderState {
      added_libraries: self.added_libraries.clone(),
    }
  }

  pub fn restore_state(
    &mut self,
    state: BuilderState,
  ) {
    self.added_libraries = state.added_libraries;
  }

  fn parse_lines(
    &self,
    lines: &[String],
    built_path: &SourcePath,
  ) -> Vec<Diagnostic> {
    let tool = self.tool.tool();
    let mut diagnostics = Vec::new();

    for line in lines {
      if tool.should_ignore_line(line) {
        continue;
      }
      for mut diagnostic in tool.parse_line(line) {
        // Records with no filename belong to the file being compiled.
        if diagnostic.path.is_none() {
          diagnostic.path = Some(built_path.clone());
        }
        diagnostics.push(diagnostic);
      }
    }

    diagnostics
  }

  fn rebuilds_from_lines(
    &self,
    lines: &[String],
    current_library: &Identifier,
  ) -> Vec<RebuildHint> {
    let tool = self.tool.tool();
    let mut hints = Vec::new();

    for line in lines {
      for hint in tool.rebuild_hints(line) {
        // Tools report `work.<unit>` relative to their own compile; that
        // means the library we are building into right now.
        let hint = match hint {
          RebuildHint::LibraryUnit { library, name } if library.name() == WORK_LIBRARY => RebuildHint::LibraryUnit {
            library: current_library.clone(),
            name,
          },
          other => other,
        };
        if !hints.contains(&hint) {
          hints.push(hint);
        }
      }
    }

    hints
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn preference_order_ends_in_fallback() {
    assert_eq!(BuilderKind::PREFERENCE.first(), Some(&BuilderKind::Msim));
    assert_eq!(BuilderKind::PREFERENCE.last(), Some(&BuilderKind::Fallback));
  }

  #[test]
  fn kind_names_round_trip() {
    for kind in BuilderKind::PREFERENCE {
      assert_eq!(BuilderKind::from_name(kind.as_str()), Some(kind));
    }
    assert_eq!(BuilderKind::from_name("iverilog"), None);
  }

  #[test]
  fn fallback_builds_nothing_and_succeeds() {
    let dir = tempfile::tempdir().unwrap();
    let mut builder = Builder::new(BuilderKind::Fallback, dir.path());
    builder.setup().unwrap();
    assert_eq!(builder.probe(), Probe::Available { version: "<fallback>".to_string() });

    let source = dir.path().join("a.vhd");
    std::fs::write(&source, "entity a is end;\n").unwrap();
    let report = builder.build(
      &SourcePath::absolute(&source),
      &Identifier::vhdl("lib"),
      &Vec::new(),
      true,
      &[],
    );
    assert!(report.diagnostics.is_empty());
    assert!(report.rebuilds.is_empty());
  }

  #[test]
  fn unsupported_file_types_produce_empty_reports() {
    let dir = tempfile::tempdir().unwrap();
    let mut builder = Builder::new(BuilderKind::Ghdl, dir.path());

    let source = dir.path().join("a.sv");
    std::fs::write(&source, "module a;\nendmodule\n").unwrap();
    let report = builder.build(
      &SourcePath::absolute(&source),
      &Identifier::vhdl("lib"),
      &Vec::new(),
      true,
      &[],
    );
    assert_eq!(report, BuildReport::default());
  }

  #[test]
  fn builder_state_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let mut builder = Builder::new(BuilderKind::Fallback, dir.path());
    builder.create_library(&Identifier::vhdl("lib_a"));

    let state = builder.state();
    let mut recovered = Builder::new(BuilderKind::Fallback, dir.path());
    recovered.restore_state(state);
    assert!(recovered.state().added_libraries.contains(&Identifier::vhdl("lib_a")));
  }
}
