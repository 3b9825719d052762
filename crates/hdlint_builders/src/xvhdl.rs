//! Xilinx Vivado `xvhdl` adapter.

use std::collections::BTreeSet;
use std::io::Write;
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

const INIT_FILE: &str = ".xvhdl.init";

static MESSAGE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?x)
      ^(?P<severity>[EW])\w+:\s*
      \[(?P<code>[^\]]+)\]\s*
      (?P<message>[^\[]+)
      (?:
        \[(?P<filename>[^:]+):(?P<line>\d+)\]
      )?",
  )
  .expect("message scanner is a valid regex")
});

static REBUILD: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)ERROR:\s*\[[^\]]*\]\s*'?.*/(?P<library>\w+)/(?P<unit>\w+)\.vdb'?\s+needs to be re-saved")
    .expect("rebuild scanner is a valid regex")
});

static VERSION: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"Vivado Simulator\s+([\d.]+)").expect("version scanner is a valid regex"));

// Xilinx ships these precompiled regardless of the project.
const BUILTIN_LIBRARIES: &[&str] = &[
  "ieee",
  "std",
  "unisim",
  "xilinxcorelib",
  "synplify",
  "synopsis",
  "maxii",
  "family_support",
];

#[derive(Debug, Default)]
pub(crate) struct Xvhdl {
  version: String,
}

impl Tool for Xvhdl {
  fn name(&self) -> &'static str {
    "xvhdl"
  }

  fn file_types(&self) -> &'static [FileType] {
    &[FileType::Vhdl]
  }

  fn probe(
    &mut self,
    work_root: &Path,
  ) -> Probe {
    let argv = vec!["xvhdl".to_string(), "--nolog".to_string(), "--version".to_string()];
    let cwd = Some(work_root).filter(|p| p.exists());
    match run_command(&argv, cwd, PROBE_TIMEOUT) {
      Ok(output) if !output.timed_out => {
        if let Some(capture) = output.lines.first().and_then(|line| VERSION.captures(line)) {
          self.version = capture[1].to_string();
        }
        Probe::Available {
          version: self.version.clone(),
        }
      },
      Ok(_) => Probe::Unavailable {
        reason: "'xvhdl --version' timed out".to_string(),
      },
      Err(error) => Probe::Unavailable {
        reason: format!("'xvhdl' could not be run: {}", error),
      },
    }
  }

  fn setup(
    &mut self,
    work_root: &Path,
  ) -> std::io::Result<()> {
    std::fs::File::create(work_root.join(INIT_FILE)).map(|_| ())
  }

  fn builtin_libraries(
    &self,
    _work_root: &Path,
  ) -> BTreeSet<Identifier> {
    BUILTIN_LIBRARIES.iter().map(|name| Identifier::vhdl(name)).collect()
  }

  /// The init file maps every library to its directory; rewrite it whole
  /// each time a library is added.
  fn create_library(
    &mut self,
    _library: &Identifier,
    work_root: &Path,
    added: &BTreeSet<Identifier>,
  ) -> std::io::Result<()> {
    let mut file = std::fs::File::create(work_root.join(INIT_FILE))?;
    for library in added {
      writeln!(file, "{}={}", library.name(), work_root.join(library.name()).display())?;
    }
    Ok(())
  }

  fn build_commands(
    &self,
    path: &SourcePath,
    library: &Identifier,
    flags: &BuildFlags,
    context: &BuildContext<'_>,
  ) -> Vec<Vec<String>> {
    let mut argv = vec![
      "xvhdl".to_string(),
      "--nolog".to_string(),
      "--verbose".to_string(),
      "0".to_string(),
      "--initfile".to_string(),
      context.work_root.join(INIT_FILE).to_string_lossy().into_owned(),
      "--work".to_string(),
      library.name().to_string(),
    ];
    argv.extend(flags.iter().cloned());
    argv.push(path.to_string());
    vec![argv]
  }

  fn should_ignore_line(
    &self,
    line: &str,
  ) -> bool {
    if line.contains("ignored due to previous errors") {
      return true;
    }
    // This one never comes alone, the companion messages say more.
    if line.contains("[VRFC 10-3032]") {
      return true;
    }
    !(line.starts_with("ERROR") || line.starts_with("WARNING"))
  }

  fn parse_line(
    &self,
    line: &str,
  ) -> Vec<Diagnostic> {
    let Some(capture) = MESSAGE.captures(line) else {
      return Vec::new();
    };

    let severity = match &capture["severity"] {
      "W" => Severity::Warning,
      _ => Severity::Error,
    };

    let mut diagnostic = Diagnostic::from_builder(self.name(), severity, capture["message"].trim().to_string())
      .with_code(&capture["code"]);

    if let Some(filename) = capture.name("filename") {
      diagnostic = diagnostic.with_path(SourcePath::absolute(filename.as_str().trim()));
    }
    if let Some(line_number) = capture.name("line") {
      if let Ok(number) = line_number.as_str().parse::<u32>() {
        diagnostic = diagnostic.with_location(Location::new(number.saturating_sub(1), 0));
      }
    }

    vec![diagnostic]
  }

  fn rebuild_hints(
    &self,
    line: &str,
  ) -> Vec<RebuildHint> {
    REBUILD
      .captures_iter(line)
      .map(|capture| RebuildHint::LibraryUnit {
        library: Identifier::vhdl(&capture["library"]),
        name: Identifier::vhdl(&capture["unit"]),
      })
      .collect()
  }

  fn default_flags(
    &self,
    _scope: BuildFlagScope,
    _language: FileType,
  ) -> BuildFlags {
    BuildFlags::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn xvhdl() -> Xvhdl {
    Xvhdl::default()
  }

  #[test]
  fn parses_errors_with_code_and_location() {
    let diags = xvhdl().parse_line("ERROR: [VRFC 10-91] aaa is not declared [/tmp/top.vhd:12]");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].severity, Severity::Error);
    assert_eq!(diags[0].code.as_deref(), Some("VRFC 10-91"));
    assert_eq!(diags[0].path.as_ref().unwrap().to_string(), "/tmp/top.vhd");
    assert_eq!(diags[0].location.unwrap().line, 11);
  }

  #[test]
  fn parses_warnings_without_location() {
    let diags = xvhdl().parse_line("WARNING: [VRFC 10-163] something looks off");
    assert_eq!(diags[0].severity, Severity::Warning);
    assert!(diags[0].path.is_none());
  }

  #[test]
  fn restore_errors_are_ignored() {
    let tool = xvhdl();
    assert!(tool.should_ignore_line("ERROR: [VRFC 10-3032] 'library.package' failed to restore"));
    assert!(tool.should_ignore_line("INFO: [VRFC 10-311] analyzing entity foo"));
    assert!(!tool.should_ignore_line("ERROR: [VRFC 10-91] bad"));
  }

  #[test]
  fn resave_advice_becomes_a_hint() {
    let hints = xvhdl().rebuild_hints("ERROR: [VRFC 10-113] '/x/work/lib_a/pkg.vdb' needs to be re-saved");
    assert_eq!(
      hints,
      vec![RebuildHint::LibraryUnit {
        library: Identifier::vhdl("lib_a"),
        name: Identifier::vhdl("pkg"),
      }]
    );
  }

  #[test]
  fn builtins_cover_the_vivado_set() {
    let builtins = xvhdl().builtin_libraries(Path::new("/tmp"));
    assert!(builtins.contains(&Identifier::vhdl("ieee")));
    assert!(builtins.contains(&Identifier::vhdl("unisim")));
  }
}
