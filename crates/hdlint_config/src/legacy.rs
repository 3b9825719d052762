//! Legacy line-oriented project file parser.
//!
//! ```text
//! # comment
//! builder = msim
//! global_build_flags[vhdl] = -a -b
//! vhdl my_library path/to/source.vhd -file -flags
//! ```

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use hdlint_diagnostics::{Diagnostic, CHECKER_NAME};
use hdlint_log::{log_dbg, log_warn};
use hdlint_types::{BuildFlagScope, FileType, Severity};

use crate::{expand_path_expression, LanguageFlags, ProjectConfig, SourceEntry};

static PARAMETER: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)^\s*(?P<parameter>\w+)\s*(?:\[(?P<lang>vhdl|verilog|systemverilog)\])?\s*=\s*(?P<value>.+?)\s*$")
    .expect("parameter scanner is a valid regex")
});

static SOURCE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?i)^\s*(?P<lang>vhdl|verilog|systemverilog)\s+(?P<library>\w+)\s+(?P<path>\S+)\s*(?P<flags>.*?)\s*$")
    .expect("source scanner is a valid regex")
});

const DEPRECATED_PARAMETERS: &[&str] = &["target_dir"];

/// Splits a value at whitespace, dropping empties from repeated separators.
fn split_flags(value: &str) -> Vec<String> {
  value.split_whitespace().map(str::to_string).collect()
}

pub(crate) fn parse(
  text: &str,
  path: &Path,
  root: &Path,
) -> ProjectConfig {
  let mut config = ProjectConfig::default();
  let mut languages = LanguageFlags::default();
  let mut pending: Vec<(String, Option<String>, Vec<String>)> = Vec::new();

  for raw_line in text.lines() {
    let line = raw_line.split('#').next().unwrap_or_default();
    if line.trim().is_empty() {
      continue;
    }

    if let Some(capture) = SOURCE.captures(line) {
      pending.push((
        capture["path"].to_string(),
        Some(capture["library"].to_string()),
        split_flags(&capture["flags"]),
      ));
      continue;
    }

    if let Some(capture) = PARAMETER.captures(line) {
      let parameter = capture["parameter"].to_lowercase();
      let value = capture["value"].to_string();
      let language = capture
        .name("lang")
        .and_then(|m| language_from_key(m.as_str()));

      handle_parameter(&parameter, language, &value, &mut config, &mut languages);
      continue;
    }

    log_warn!("Ignoring unparseable config line: '{}'", line.trim());
  }

  for (expression, library, flags) in pending {
    let (paths, dead_glob) = expand_path_expression(&expression, root);
    if dead_glob {
      config.diagnostics.push(
        Diagnostic::new(
          CHECKER_NAME,
          Severity::Warning,
          format!("Source pattern '{}' matched no files", expression),
        )
        .with_code("dead-glob"),
      );
      continue;
    }

    for source_path in paths {
      let Some(language) = FileType::from_path(source_path.as_path()) else {
        log_warn!("Won't include non RTL file '{}' from '{}'", source_path, path.display());
        continue;
      };

      config.sources.push(SourceEntry {
        path: source_path,
        library: library.clone(),
        source_specific: flags.clone(),
        single: languages.resolve(language, BuildFlagScope::Single),
        dependencies: languages.resolve(language, BuildFlagScope::Dependencies),
      });
    }
  }

  config
}

fn handle_parameter(
  parameter: &str,
  language: Option<FileType>,
  value: &str,
  config: &mut ProjectConfig,
  languages: &mut LanguageFlags,
) {
  if DEPRECATED_PARAMETERS.contains(&parameter) {
    log_dbg!("Ignoring deprecated parameter '{}'", parameter);
    return;
  }

  let scope = match parameter {
    "builder" => {
      config.builder = Some(value.to_string());
      return;
    },
    "single_build_flags" => BuildFlagScope::Single,
    "global_build_flags" => BuildFlagScope::Global,
    "dependencies_build_flags" => BuildFlagScope::Dependencies,
    _ => {
      config.diagnostics.push(
        Diagnostic::new(
          CHECKER_NAME,
          Severity::Warning,
          format!("Unknown configuration parameter '{}'", parameter),
        )
        .with_code("unknown-config-key"),
      );
      return;
    },
  };

  match language {
    Some(language) => languages.set(language, scope, split_flags(value)),
    None => config.diagnostics.push(
      Diagnostic::new(
        CHECKER_NAME,
        Severity::Warning,
        format!("Parameter '{}' needs a language, e.g. {}[vhdl]", parameter, parameter),
      )
      .with_code("unknown-config-key"),
    ),
  }
}

fn language_from_key(key: &str) -> Option<FileType> {
  match key.to_ascii_lowercase().as_str() {
    "vhdl" => Some(FileType::Vhdl),
    "verilog" => Some(FileType::Verilog),
    "systemverilog" => Some(FileType::SystemVerilog),
    _ => None,
  }
}
