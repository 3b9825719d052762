//! The capability set every adapter implements.

use std::collections::BTreeSet;
use std::path::Path;

use hdlint_diagnostics::Diagnostic;
use hdlint_types::{BuildFlagScope, BuildFlags, FileType, Identifier, RebuildHint, SourcePath};

use crate::Probe;

/// Everything an adapter may need to assemble a command line.
pub struct BuildContext<'a> {
  pub work_root: &'a Path,
  /// Directories to search for `` `include `` files.
  pub include_dirs: &'a [String],
  /// Libraries created so far, for tools that take `-L` style references.
  pub added_libraries: &'a BTreeSet<Identifier>,
}

pub(crate) trait Tool {
  fn name(&self) -> &'static str;

  fn file_types(&self) -> &'static [FileType];

  /// Invoke the tool's version flag and classify by exit and output.
  fn probe(
    &mut self,
    work_root: &Path,
  ) -> Probe;

  /// One-off working-directory preparation (ini files and the like).
  fn setup(
    &mut self,
    _work_root: &Path,
  ) -> std::io::Result<()> {
    Ok(())
  }

  /// Libraries that exist regardless of anything we compile.
  fn builtin_libraries(
    &self,
    _work_root: &Path,
  ) -> BTreeSet<Identifier> {
    BTreeSet::new()
  }

  /// Physically create one library under the working directory.
  fn create_library(
    &mut self,
    _library: &Identifier,
    _work_root: &Path,
    _added: &BTreeSet<Identifier>,
  ) -> std::io::Result<()> {
    Ok(())
  }

  /// Command lines that compile `path` into `library`, run in order.
  fn build_commands(
    &self,
    path: &SourcePath,
    library: &Identifier,
    flags: &BuildFlags,
    context: &BuildContext<'_>,
  ) -> Vec<Vec<String>>;

  /// True for output lines that carry neither diagnostics nor hints.
  fn should_ignore_line(
    &self,
    line: &str,
  ) -> bool;

  /// Diagnostics found in one output line.
  fn parse_line(
    &self,
    line: &str,
  ) -> Vec<Diagnostic>;

  /// Rebuild advice found in one output line.
  fn rebuild_hints(
    &self,
    line: &str,
  ) -> Vec<RebuildHint>;

  /// Flags this tool applies by default for (scope, language).
  fn default_flags(
    &self,
    scope: BuildFlagScope,
    language: FileType,
  ) -> BuildFlags;
}
