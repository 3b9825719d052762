//! Stand-in adapter used when no real compiler is available.
//!
//! Performs no compilation and produces no diagnostics, which still lets the
//! static checks run.

use std::path::Path;

use hdlint_diagnostics::Diagnostic;
use hdlint_types::{BuildFlagScope, BuildFlags, FileType, Identifier, RebuildHint, SourcePath};

use crate::tool::{BuildContext, Tool};
use crate::Probe;

#[derive(Debug, Default)]
pub(crate) struct Fallback;

impl Tool for Fallback {
  fn name(&self) -> &'static str {
    "fallback"
  }

  fn file_types(&self) -> &'static [FileType] {
    &[FileType::Vhdl, FileType::Verilog, FileType::SystemVerilog]
  }

  fn probe(
    &mut self,
    _work_root: &Path,
  ) -> Probe {
    Probe::Available {
      version: "<fallback>".to_string(),
    }
  }

  fn build_commands(
    &self,
    _path: &SourcePath,
    _library: &Identifier,
    _flags: &BuildFlags,
    _context: &BuildContext<'_>,
  ) -> Vec<Vec<String>> {
    Vec::new()
  }

  fn should_ignore_line(
    &self,
    _line: &str,
  ) -> bool {
    true
  }

  fn parse_line(
    &self,
    _line: &str,
  ) -> Vec<Diagnostic> {
    Vec::new()
  }

  fn rebuild_hints(
    &self,
    _line: &str,
  ) -> Vec<RebuildHint> {
    Vec::new()
  }

  fn default_flags(
    &self,
    _scope: BuildFlagScope,
    _language: FileType,
  ) -> BuildFlags {
    BuildFlags::new()
  }
}
