//! JSON project file expansion.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use hdlint_diagnostics::{Diagnostic, CHECKER_NAME};
use hdlint_log::log_warn;
use hdlint_types::{BuildFlagScope, FileType, Severity};

use crate::{expand_path_expression, LanguageFlags, ProjectConfig, SourceEntry};

#[derive(Debug, Deserialize)]
struct RawConfig {
  #[serde(default)]
  builder: Option<String>,

  #[serde(default)]
  sources: Vec<RawSource>,

  #[serde(default)]
  include: Vec<String>,

  #[serde(default)]
  vhdl: Option<LanguageBlock>,

  #[serde(default)]
  verilog: Option<LanguageBlock>,

  #[serde(default)]
  systemverilog: Option<LanguageBlock>,

  /// Anything else is an unknown key worth warning about.
  #[serde(flatten)]
  unknown: HashMap<String, Value>,
}

/// A source is either a bare path or `[path, {library, flags}]`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSource {
  Plain(String),
  Detailed(String, SourceInfo),
}

#[derive(Debug, Default, Deserialize)]
struct SourceInfo {
  #[serde(default)]
  library: Option<String>,

  #[serde(default)]
  flags: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LanguageBlock {
  #[serde(default)]
  flags: ScopeFlags,
}

#[derive(Debug, Default, Deserialize)]
struct ScopeFlags {
  single: Option<Vec<String>>,
  dependencies: Option<Vec<String>>,
  global: Option<Vec<String>>,
}

/// Expands a parsed JSON config: includes depth-first (cycles ignored), the
/// root file's own sources last so they prevail on conflicts.
pub(crate) fn expand(
  value: Value,
  path: &Path,
  root: &Path,
) -> ProjectConfig {
  let mut config = ProjectConfig::default();
  let mut visited = BTreeSet::new();
  expand_file(value, path, root, &mut config, &mut visited, true);
  config
}

fn expand_file(
  value: Value,
  path: &Path,
  root: &Path,
  config: &mut ProjectConfig,
  visited: &mut BTreeSet<PathBuf>,
  is_root: bool,
) {
  visited.insert(normalized(path));

  let raw: RawConfig = match serde_json::from_value(value) {
    Ok(raw) => raw,
    Err(error) => {
      log_warn!("Skipping config '{}': {}", path.display(), error);
      return;
    },
  };

  for key in raw.unknown.keys() {
    config.diagnostics.push(
      Diagnostic::new(CHECKER_NAME, Severity::Warning, format!("Unknown configuration key '{}'", key))
        .with_code("unknown-config-key"),
    );
  }

  if is_root {
    config.builder = raw.builder.clone();
  }

  // Depth-first: bring in every include before this file's own sources.
  for include in &raw.include {
    let include_path = if Path::new(include).is_absolute() {
      PathBuf::from(include)
    } else {
      root.join(include)
    };

    if visited.contains(&normalized(&include_path)) {
      continue;
    }
    if !include_path.exists() {
      log_warn!("Skipping included path '{}' (no such file)", include_path.display());
      continue;
    }

    let text = match std::fs::read_to_string(&include_path) {
      Ok(text) => text,
      Err(error) => {
        log_warn!("Skipping included path '{}': {}", include_path.display(), error);
        continue;
      },
    };
    let value = match serde_json::from_str(&text) {
      Ok(value) => value,
      Err(error) => {
        log_warn!("Failed to decode '{}': {}", include_path.display(), error);
        continue;
      },
    };

    let include_root = include_path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
    expand_file(value, &include_path, &include_root, config, visited, false);
  }

  let mut languages = LanguageFlags::default();
  for (language, block) in [
    (FileType::Vhdl, &raw.vhdl),
    (FileType::Verilog, &raw.verilog),
    (FileType::SystemVerilog, &raw.systemverilog),
  ] {
    let Some(block) = block else {
      continue;
    };
    for (scope, flags) in [
      (BuildFlagScope::Single, &block.flags.single),
      (BuildFlagScope::Dependencies, &block.flags.dependencies),
      (BuildFlagScope::Global, &block.flags.global),
    ] {
      if let Some(flags) = flags {
        languages.set(language, scope, flags.clone());
      }
    }
  }

  for source in raw.sources {
    let (expression, info) = match source {
      RawSource::Plain(expression) => (expression, SourceInfo::default()),
      RawSource::Detailed(expression, info) => (expression, info),
    };

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
        log_warn!("Won't include non RTL file '{}'", source_path);
        continue;
      };

      config.sources.push(SourceEntry {
        path: source_path,
        library: info.library.clone(),
        source_specific: info.flags.clone(),
        single: languages.resolve(language, BuildFlagScope::Single),
        dependencies: languages.resolve(language, BuildFlagScope::Dependencies),
      });
    }
  }
}

fn normalized(path: &Path) -> PathBuf {
  path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
