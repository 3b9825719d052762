//! GHDL adapter.

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use hdlint_diagnostics::Diagnostic;
use hdlint_types::{BuildFlagScope, BuildFlags, FileType, Identifier, Location, RebuildHint, Severity, SourcePath};

use crate::process::run_command;
use crate::tool::{BuildContext, Tool};
use crate::Probe;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

static MESSAGE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?x)
      ^(?P<filename>[^:]+):
      (?P<line>\d+):
      (?P<column>\d+):
      (?:(?P<warning>warning:)\s*|\s*)
      (?P<message>.*)",
  )
  .expect("message scanner is a valid regex")
});

static LIBRARY_PATH: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^\s*(?:actual prefix|library directory):\s*(?P<path>.*)\s*$")
    .expect("library path scanner is a valid regex")
});

static REBUILD: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r#"(?ix)
      (?:entity|package)\s+"(?P<unit>\w+)"\s+is\s+obsoleted\s+by\s+(?:entity|package)\s+"\w+"
      | file\s+(?P<rebuild_path>.*)\s+has\s+changed\s+and\s+must\s+be\s+reanalysed"#,
  )
  .expect("rebuild scanner is a valid regex")
});

static VERSION: Lazy<Regex> = Lazy::new(|| Regex::new(r"GHDL\s+(\S+)").expect("version scanner is a valid regex"));

#[derive(Debug, Default)]
pub(crate) struct Ghdl {
  version: String,
}

impl Tool for Ghdl {
  fn name(&self) -> &'static str {
    "ghdl"
  }

  fn file_types(&self) -> &'static [FileType] {
    &[FileType::Vhdl]
  }

  fn probe(
    &mut self,
    _work_root: &Path,
  ) -> Probe {
    let argv = vec!["ghdl".to_string(), "--version".to_string()];
    match run_command(&argv, None, PROBE_TIMEOUT) {
      Ok(output) if !output.timed_out => {
        if let Some(capture) = output.lines.first().and_then(|line| VERSION.captures(line)) {
          self.version = capture[1].to_string();
        }
        Probe::Available {
          version: self.version.clone(),
        }
      },
      Ok(_) => Probe::Unavailable {
        reason: "'ghdl --version' timed out".to_string(),
      },
      Err(error) => Probe::Unavailable {
        reason: format!("'ghdl' could not be run: {}", error),
      },
    }
  }

  fn builtin_libraries(
    &self,
    _work_root: &Path,
  ) -> BTreeSet<Identifier> {
    let argv = vec!["ghdl".to_string(), "--dispconfig".to_string()];
    let Ok(output) = run_command(&argv, None, PROBE_TIMEOUT) else {
      return BTreeSet::new();
    };

    let mut libraries = BTreeSet::new();
    for line in &output.lines {
      let Some(capture) = LIBRARY_PATH.captures(line) else {
        continue;
      };
      // Up to v0.36 libraries lived at <prefix>/v93/<name>, afterwards at
      // <prefix>/<name>/<standard>.
      let root = Path::new(capture["path"].trim());
      let scan_root = if self.version.as_str() < "0.36" {
        root.join("v93")
      } else {
        root.to_path_buf()
      };

      if let Ok(entries) = std::fs::read_dir(scan_root) {
        for entry in entries.flatten() {
          if entry.path().is_dir() {
            if let Some(name) = entry.file_name().to_str() {
              libraries.insert(Identifier::vhdl(name.trim()));
            }
          }
        }
      }
    }
    libraries
  }

  fn create_library(
    &mut self,
    _library: &Identifier,
    work_root: &Path,
    _added: &BTreeSet<Identifier>,
  ) -> std::io::Result<()> {
    // GHDL keeps everything in the work directory; one folder serves all
    // libraries.
    std::fs::create_dir_all(work_root)
  }

  fn build_commands(
    &self,
    path: &SourcePath,
    library: &Identifier,
    flags: &BuildFlags,
    context: &BuildContext<'_>,
  ) -> Vec<Vec<String>> {
    let work_root = context.work_root.to_string_lossy().into_owned();
    let common = move |switch: &str| {
      let mut argv = vec![
        "ghdl".to_string(),
        switch.to_string(),
        format!("-P{}", work_root),
        format!("--work={}", library.name()),
        format!("--workdir={}", work_root),
      ];
      argv.extend(flags.iter().cloned());
      argv.push(path.to_string());
      argv
    };

    // Import so the unit is known, analyze for real diagnostics, then a
    // plain syntax pass for the messages analysis swallows.
    vec![common("-i"), common("-a"), common("-s")]
  }

  fn should_ignore_line(
    &self,
    line: &str,
  ) -> bool {
    line.trim().is_empty() || line.starts_with("ghdl: compilation error")
  }

  fn parse_line(
    &self,
    line: &str,
  ) -> Vec<Diagnostic> {
    let Some(capture) = MESSAGE.captures(line) else {
      return Vec::new();
    };

    let severity = if capture.name("warning").is_some() {
      Severity::Warning
    } else {
      Severity::Error
    };

    let line_number: u32 = capture["line"].parse().unwrap_or(1);
    let column: u32 = capture["column"].parse().unwrap_or(1);

    vec![
      Diagnostic::from_builder(self.name(), severity, capture["message"].trim().to_string())
        .with_path(SourcePath::absolute(capture["filename"].trim()))
        .with_location(Location::new(line_number.saturating_sub(1), column.saturating_sub(1))),
    ]
  }

  fn rebuild_hints(
    &self,
    line: &str,
  ) -> Vec<RebuildHint> {
    let mut hints = Vec::new();
    for capture in REBUILD.captures_iter(line) {
      if let Some(path) = capture.name("rebuild_path") {
        hints.push(RebuildHint::Path {
          path: SourcePath::absolute(path.as_str().trim()),
        });
      } else if let Some(unit) = capture.name("unit") {
        hints.push(RebuildHint::Unit {
          name: Identifier::vhdl(unit.as_str()),
        });
      }
    }
    hints
  }

  fn default_flags(
    &self,
    scope: BuildFlagScope,
    language: FileType,
  ) -> BuildFlags {
    if language != FileType::Vhdl {
      return BuildFlags::new();
    }
    let flags: &[&str] = match scope {
      BuildFlagScope::Global => &["-fexplicit", "-frelaxed-rules"],
      BuildFlagScope::Single => &["--warn-runtime-error", "--warn-reserved", "--warn-unused"],
      _ => &[],
    };
    flags.iter().map(|s| s.to_string()).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ghdl() -> Ghdl {
    Ghdl::default()
  }

  #[test]
  fn parses_errors_with_position() {
    let diags = ghdl().parse_line("/tmp/top.vhd:12:8: no declaration for \"clk\"");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].severity, Severity::Error);
    assert_eq!(diags[0].path.as_ref().unwrap().to_string(), "/tmp/top.vhd");
    assert_eq!(diags[0].location.unwrap(), Location::new(11, 7));
  }

  #[test]
  fn parses_warnings() {
    let diags = ghdl().parse_line("top.vhd:3:1:warning: universal integer bound must be numeric literal");
    assert_eq!(diags[0].severity, Severity::Warning);
    assert!(!diags[0].text.contains("warning:"));
  }

  #[test]
  fn non_messages_do_not_parse() {
    assert!(ghdl().parse_line("some random output").is_empty());
    assert!(ghdl().should_ignore_line("ghdl: compilation error"));
  }

  #[test]
  fn obsoleted_unit_becomes_a_unit_hint() {
    let hints = ghdl().rebuild_hints("top.vhd:1:1: entity \"counter\" is obsoleted by package \"defs\"");
    assert_eq!(
      hints,
      vec![RebuildHint::Unit {
        name: Identifier::vhdl("counter"),
      }]
    );
  }

  #[test]
  fn changed_file_becomes_a_path_hint() {
    let hints = ghdl().rebuild_hints("file /w/pkg.vhd has changed and must be reanalysed");
    assert_eq!(
      hints,
      vec![RebuildHint::Path {
        path: SourcePath::absolute("/w/pkg.vhd"),
      }]
    );
  }

  #[test]
  fn verilog_gets_no_flags() {
    assert!(ghdl().default_flags(BuildFlagScope::Single, FileType::Verilog).is_empty());
  }
}
