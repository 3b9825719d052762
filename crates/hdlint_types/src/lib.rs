//! Core value types shared by every hdlint crate.
//!
//! These are plain data: identifiers, paths, design units, dependencies and
//! the small enums that describe build flags and diagnostics severities.
//! Anything with behavior (parsing, planning, building) lives elsewhere.

pub mod dependency;
pub mod identifier;
pub mod path;
pub mod unit;

use serde::{Deserialize, Serialize};

pub use dependency::{Dependency, IncludedPath, RequiredUnit};
pub use identifier::Identifier;
pub use path::SourcePath;
pub use unit::{DesignUnit, DesignUnitKind};

/// Library assigned to files whose library could not be worked out.
pub const UNRESOLVED_LIBRARY: &str = "!!hdl_checker_unresolved_library!!";

/// Name of the library that refers to "the library this file is in".
pub const WORK_LIBRARY: &str = "work";

/// A zero-based (line, column) position inside a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Location {
  pub line: u32,
  pub column: u32,
}

impl Location {
  pub fn new(
    line: u32,
    column: u32,
  ) -> Self {
    Self { line, column }
  }
}

impl std::fmt::Display for Location {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    write!(f, "{}:{}", self.line, self.column)
  }
}

/// HDL flavor of a source file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FileType {
  Vhdl,
  Verilog,
  SystemVerilog,
}

impl FileType {
  /// Extracts the file type from the path's extension. Returns `None` for
  /// anything that is not an RTL file.
  pub fn from_path(path: &std::path::Path) -> Option<FileType> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
      "vhd" | "vhdl" => Some(FileType::Vhdl),
      "v" | "vh" => Some(FileType::Verilog),
      "sv" | "svh" => Some(FileType::SystemVerilog),
      _ => None,
    }
  }

  /// Identifiers are case-insensitive only in VHDL.
  pub fn case_sensitive(self) -> bool {
    !matches!(self, FileType::Vhdl)
  }

  pub fn as_str(self) -> &'static str {
    match self {
      FileType::Vhdl => "vhdl",
      FileType::Verilog => "verilog",
      FileType::SystemVerilog => "systemverilog",
    }
  }
}

impl std::fmt::Display for FileType {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Ordered list of extra arguments handed to the compiler.
pub type BuildFlags = Vec<String>;

/// Scope a set of build flags applies to.
///
/// `Single` is used when the file is the check target, `Dependencies` when it
/// is compiled only to satisfy another file, `Global` applies to both.
/// `SourceSpecific` flags come from a per-source config entry and are always
/// appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildFlagScope {
  SourceSpecific,
  Single,
  Dependencies,
  Global,
}

impl BuildFlagScope {
  /// Key used for this scope in configuration files.
  pub fn config_key(self) -> &'static str {
    match self {
      BuildFlagScope::SourceSpecific => "source_specific",
      BuildFlagScope::Single => "single",
      BuildFlagScope::Dependencies => "dependencies",
      BuildFlagScope::Global => "global",
    }
  }
}

/// Severity of a diagnostic, in increasing order of importance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
  Note,
  Warning,
  Error,
  Fatal,
}

impl std::fmt::Display for Severity {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    let name = match self {
      Severity::Note => "Note",
      Severity::Warning => "Warning",
      Severity::Error => "Error",
      Severity::Fatal => "Fatal",
    };
    f.write_str(name)
  }
}

/// Out-of-band advice from a compiler that some other file must be rebuilt
/// before the current one can succeed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RebuildHint {
  /// Tool named a design unit without a library (e.g. "entity X is obsolete").
  Unit { name: Identifier },
  /// Tool named a library-qualified unit ("Recompile lib.unit").
  LibraryUnit { library: Identifier, name: Identifier },
  /// Tool named the path of the file to reanalyze.
  Path { path: SourcePath },
}

impl std::fmt::Display for RebuildHint {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    match self {
      RebuildHint::Unit { name } => write!(f, "unit {}", name),
      RebuildHint::LibraryUnit { library, name } => write!(f, "{}.{}", library, name),
      RebuildHint::Path { path } => write!(f, "path {}", path),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::path::Path;

  #[test]
  fn file_type_from_extension() {
    assert_eq!(FileType::from_path(Path::new("a/top.vhd")), Some(FileType::Vhdl));
    assert_eq!(FileType::from_path(Path::new("a/top.VHDL")), Some(FileType::Vhdl));
    assert_eq!(FileType::from_path(Path::new("core.v")), Some(FileType::Verilog));
    assert_eq!(FileType::from_path(Path::new("defs.vh")), Some(FileType::Verilog));
    assert_eq!(FileType::from_path(Path::new("tb.sv")), Some(FileType::SystemVerilog));
    assert_eq!(FileType::from_path(Path::new("pkg.svh")), Some(FileType::SystemVerilog));
    assert_eq!(FileType::from_path(Path::new("readme.md")), None);
    assert_eq!(FileType::from_path(Path::new("Makefile")), None);
  }

  #[test]
  fn severity_ordering() {
    assert!(Severity::Note < Severity::Warning);
    assert!(Severity::Warning < Severity::Error);
    assert!(Severity::Error < Severity::Fatal);
  }
}
