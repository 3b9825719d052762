//! ModelSim adapter (`vcom` / `vlog`).

use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

use hdlint_diagnostics::Diagnostic;
use hdlint_log::log_dbg;
use hdlint_types::{BuildFlagScope, BuildFlags, FileType, Identifier, RebuildHint, Severity, SourcePath};

use crate::process::run_command;
use crate::tool::{BuildContext, Tool};
use crate::Probe;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

static MESSAGE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?x)
      ^\*\*\s*(?P<severity>[WE])\w+\s*
      (?:\(suppressible\))?:\s*
      (?:
        (?:\s*\[\d+\])?\s*(?P<filename>.*)\((?P<line>\d+)\):
        | \(v(?:com|log)-\d+\)
      )?
      \s*(?P<message>.*?)\s*$",
  )
  .expect("message scanner is a valid regex")
});

static ERROR_CODE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?:vcom-|vlog-)\d+").expect("error code scanner is a valid regex"));

static CODE_IN_MESSAGE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"\s*\(v(?:com|log)-\d+\)\s*").expect("code stripper is a valid regex"));

static REBUILD: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?x)
      Recompile\s+(?P<lib_0>\w+)\.(?P<unit_0>\w+)\s+because\s+.*?\s+ha(?:ve|s)\s+changed
      | ^\*\*\s*Warning:.*\(vcom-1127\)\s*Entity\s+(?P<lib_1>\w+)\.(?P<unit_1>\w+)",
  )
  .expect("rebuild scanner is a valid regex")
});

static LIBRARY_MAP: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r#"(?i)^"(?P<name>\w+)"\s+maps to directory\s+.*\.$"#).expect("library map scanner is a valid regex")
});

static VERSION: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"vcom\s+([\w.]+)\s+Compiler").expect("version scanner is a valid regex"));

#[derive(Debug, Default)]
pub(crate) struct Msim {
  version: String,
}

impl Msim {
  fn ini_path(
    &self,
    work_root: &Path,
  ) -> String {
    work_root.join("modelsim.ini").to_string_lossy().into_owned()
  }
}

impl Tool for Msim {
  fn name(&self) -> &'static str {
    "msim"
  }

  fn file_types(&self) -> &'static [FileType] {
    &[FileType::Vhdl, FileType::Verilog, FileType::SystemVerilog]
  }

  fn probe(
    &mut self,
    work_root: &Path,
  ) -> Probe {
    for tool in ["vcom", "vlog"] {
      let argv = vec![tool.to_string(), "-version".to_string()];
      match run_command(&argv, Some(work_root).filter(|p| p.exists()), PROBE_TIMEOUT) {
        Ok(output) if !output.timed_out => {
          if tool == "vcom" {
            if let Some(capture) = output.lines.first().and_then(|line| VERSION.captures(line)) {
              self.version = capture[1].to_string();
            }
          }
        },
        Ok(_) => {
          return Probe::Unavailable {
            reason: format!("'{} -version' timed out", tool),
          }
        },
        Err(error) => {
          return Probe::Unavailable {
            reason: format!("'{}' could not be run: {}", tool, error),
          }
        },
      }
    }

    Probe::Available {
      version: self.version.clone(),
    }
  }

  fn setup(
    &mut self,
    work_root: &Path,
  ) -> std::io::Result<()> {
    let ini = work_root.join("modelsim.ini");
    if ini.exists() {
      return Ok(());
    }

    // MODELSIM points at a site-wide ini worth inheriting; otherwise have
    // vmap create a pristine one.
    if let Ok(site_ini) = std::env::var("MODELSIM") {
      log_dbg!("Seeding modelsim.ini from MODELSIM={}", site_ini);
      std::fs::copy(site_ini, &ini)?;
    } else {
      let argv = vec!["vmap".to_string(), "-c".to_string()];
      let _ = run_command(&argv, Some(work_root), PROBE_TIMEOUT)?;
    }
    Ok(())
  }

  fn builtin_libraries(
    &self,
    work_root: &Path,
  ) -> BTreeSet<Identifier> {
    let argv = vec!["vmap".to_string()];
    let Ok(output) = run_command(&argv, Some(work_root), PROBE_TIMEOUT) else {
      return BTreeSet::new();
    };

    output
      .lines
      .iter()
      .filter_map(|line| LIBRARY_MAP.captures(line))
      .map(|capture| Identifier::vhdl(&capture["name"]))
      .collect()
  }

  fn create_library(
    &mut self,
    library: &Identifier,
    work_root: &Path,
    _added: &BTreeSet<Identifier>,
  ) -> std::io::Result<()> {
    let library_dir = work_root.join(library.name());
    if library_dir.exists() {
      return Ok(());
    }

    let dir = library_dir.to_string_lossy().into_owned();
    run_command(&["vlib".to_string(), dir.clone()], Some(work_root), PROBE_TIMEOUT)?;
    run_command(
      &[
        "vmap".to_string(),
        "-modelsimini".to_string(),
        self.ini_path(work_root),
        library.name().to_string(),
        dir,
      ],
      Some(work_root),
      PROBE_TIMEOUT,
    )?;
    Ok(())
  }

  fn build_commands(
    &self,
    path: &SourcePath,
    library: &Identifier,
    flags: &BuildFlags,
    context: &BuildContext<'_>,
  ) -> Vec<Vec<String>> {
    let language = FileType::from_path(path.as_path()).unwrap_or(FileType::Vhdl);
    let work = context.work_root.join(library.name()).to_string_lossy().into_owned();

    let mut argv = match language {
      FileType::Vhdl => vec!["vcom".to_string()],
      FileType::Verilog | FileType::SystemVerilog => vec!["vlog".to_string()],
    };
    argv.extend([
      "-modelsimini".to_string(),
      self.ini_path(context.work_root),
      "-quiet".to_string(),
      "-work".to_string(),
      work,
    ]);

    if language == FileType::SystemVerilog {
      argv.push("-sv".to_string());
    }
    argv.extend(flags.iter().cloned());

    if language != FileType::Vhdl {
      for library in context.added_libraries {
        argv.push("-L".to_string());
        argv.push(library.name().to_string());
      }
      for include_dir in context.include_dirs {
        argv.push(format!("+incdir+{}", include_dir));
      }
    }

    argv.push(path.to_string());
    vec![argv]
  }

  fn should_ignore_line(
    &self,
    line: &str,
  ) -> bool {
    if line.trim().is_empty() || line.trim_end().ends_with("VHDL Compiler exiting") {
      return true;
    }
    !(line.starts_with("** Error") || line.starts_with("** Warning"))
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

    let message = CODE_IN_MESSAGE.replace_all(&capture["message"], " ").trim().to_string();
    let mut diagnostic = Diagnostic::from_builder(self.name(), severity, message);

    if let Some(code) = ERROR_CODE.find(line) {
      diagnostic = diagnostic.with_code(code.as_str());
    }
    if let Some(filename) = capture.name("filename") {
      let trimmed = filename.as_str().trim();
      if !trimmed.is_empty() {
        diagnostic = diagnostic.with_path(SourcePath::absolute(trimmed));
      }
    }
    if let Some(line_number) = capture.name("line") {
      if let Ok(number) = line_number.as_str().parse::<u32>() {
        diagnostic = diagnostic.with_location(hdlint_types::Location::new(number.saturating_sub(1), 0));
      }
    }

    vec![diagnostic]
  }

  fn rebuild_hints(
    &self,
    line: &str,
  ) -> Vec<RebuildHint> {
    let mut hints = Vec::new();
    for capture in REBUILD.captures_iter(line) {
      let library = capture.name("lib_0").or_else(|| capture.name("lib_1"));
      let unit = capture.name("unit_0").or_else(|| capture.name("unit_1"));
      if let (Some(library), Some(unit)) = (library, unit) {
        hints.push(RebuildHint::LibraryUnit {
          library: Identifier::vhdl(library.as_str()),
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
    let flags: &[&str] = match (scope, language) {
      (BuildFlagScope::Single, FileType::Vhdl) => &["-check_synthesis", "-lint", "-rangecheck", "-pedanticerrors"],
      (BuildFlagScope::Single, _) => &["-lint", "-hazards", "-pedanticerrors"],
      (BuildFlagScope::Dependencies, FileType::Vhdl) => &["-defercheck", "-nocheck", "-permissive"],
      (BuildFlagScope::Dependencies, _) => &["-permissive"],
      (BuildFlagScope::Global, FileType::Vhdl) => &["-explicit"],
      _ => &[],
    };
    flags.iter().map(|s| s.to_string()).collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn msim() -> Msim {
    Msim::default()
  }

  #[test]
  fn parses_errors_with_location() {
    let diags = msim().parse_line("** Error: /some/file.vhd(21): near \"then\": syntax error");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].severity, Severity::Error);
    assert_eq!(diags[0].path.as_ref().unwrap().to_string(), "/some/file.vhd");
    assert_eq!(diags[0].location.unwrap().line, 20);
    assert!(diags[0].text.contains("syntax error"));
  }

  #[test]
  fn parses_warnings_with_code() {
    let diags = msim().parse_line("** Warning: /a/b.vhd(3): (vcom-1236) Shared variables must be of a protected type.");
    assert_eq!(diags[0].severity, Severity::Warning);
    assert_eq!(diags[0].code.as_deref(), Some("vcom-1236"));
    assert!(!diags[0].text.contains("vcom-1236"));
  }

  #[test]
  fn messages_without_location_have_no_path() {
    let diags = msim().parse_line("** Error: (vcom-11) Could not find work.foo");
    assert_eq!(diags.len(), 1);
    assert!(diags[0].path.is_none());
    assert_eq!(diags[0].code.as_deref(), Some("vcom-11"));
  }

  #[test]
  fn chatter_is_ignored() {
    let tool = msim();
    assert!(tool.should_ignore_line(""));
    assert!(tool.should_ignore_line("-- Loading package standard"));
    assert!(tool.should_ignore_line("Model Technology ModelSim vcom 10.6c VHDL Compiler exiting"));
    assert!(!tool.should_ignore_line("** Error: bad"));
  }

  #[test]
  fn recompile_advice_becomes_a_hint() {
    let hints = msim().rebuild_hints("** Error: (vcom-13) Recompile lib_a.pkg because lib_a.base has changed.");
    assert_eq!(
      hints,
      vec![RebuildHint::LibraryUnit {
        library: Identifier::vhdl("lib_a"),
        name: Identifier::vhdl("pkg"),
      }]
    );
  }

  #[test]
  fn obsoleted_entity_warning_becomes_a_hint() {
    let hints = msim().rebuild_hints("** Warning: mod.vhd(5): (vcom-1127) Entity work.top is obsolete");
    assert_eq!(hints.len(), 1);
    match &hints[0] {
      RebuildHint::LibraryUnit { library, name } => {
        assert_eq!(library.name(), "work");
        assert_eq!(name.name(), "top");
      },
      other => panic!("unexpected hint {:?}", other),
    }
  }

  #[test]
  fn default_flags_match_the_documented_set() {
    let tool = msim();
    let mut single_vhdl = tool.default_flags(BuildFlagScope::Single, FileType::Vhdl);
    single_vhdl.extend(tool.default_flags(BuildFlagScope::Global, FileType::Vhdl));
    for flag in ["-lint", "-pedanticerrors", "-check_synthesis", "-rangecheck", "-explicit"] {
      assert!(single_vhdl.iter().any(|f| f == flag), "missing {}", flag);
    }
  }
}
