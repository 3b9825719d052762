//! Project configuration loaders.
//!
//! Two formats are accepted: the JSON project file and the legacy
//! line-oriented format. The loader tries JSON first and falls back to the
//! legacy grammar when the file is not valid JSON, mirroring how older
//! project files keep working unchanged.

mod json;
mod legacy;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use hdlint_diagnostics::Diagnostic;
use hdlint_types::{BuildFlagScope, BuildFlags, FileType, SourcePath};

/// One source taken from the configuration.
///
/// Per-scope flags are `None` when the configuration had no language block
/// for this file's language; the engine then applies the chosen compiler's
/// defaults instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
  pub path: SourcePath,
  pub library: Option<String>,
  /// Flags attached to this specific source entry.
  pub source_specific: BuildFlags,
  /// Global + single-scope flags from the language block.
  pub single: Option<BuildFlags>,
  /// Global + dependencies-scope flags from the language block.
  pub dependencies: Option<BuildFlags>,
}

/// Fully expanded configuration: includes flattened, globs resolved.
#[derive(Debug, Clone, Default)]
pub struct ProjectConfig {
  /// Explicit builder choice (legacy `builder =` key).
  pub builder: Option<String>,
  pub sources: Vec<SourceEntry>,
  /// Warnings collected while loading (unknown keys, dead globs).
  pub diagnostics: Vec<Diagnostic>,
}

/// Errors that prevent loading a configuration at all.
#[derive(Debug)]
pub enum ConfigError {
  /// I/O error while reading a config file.
  Io { path: PathBuf, source: std::io::Error },
}

impl fmt::Display for ConfigError {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    match self {
      ConfigError::Io { path, source } => {
        write!(f, "failed to read '{}': {}", path.display(), source)
      },
    }
  }
}

impl std::error::Error for ConfigError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      ConfigError::Io { source, .. } => Some(source),
    }
  }
}

/// Per-language flag blocks, keyed by scope. Only scopes the configuration
/// actually set are present.
#[derive(Debug, Clone, Default)]
pub(crate) struct LanguageFlags {
  flags: HashMap<(FileType, BuildFlagScope), BuildFlags>,
}

impl LanguageFlags {
  pub(crate) fn set(
    &mut self,
    language: FileType,
    scope: BuildFlagScope,
    flags: BuildFlags,
  ) {
    self.flags.insert((language, scope), flags);
  }

  fn get(
    &self,
    language: FileType,
    scope: BuildFlagScope,
  ) -> Option<&BuildFlags> {
    self.flags.get(&(language, scope))
  }

  /// Global + scope flags for a language, `None` when neither was set.
  pub(crate) fn resolve(
    &self,
    language: FileType,
    scope: BuildFlagScope,
  ) -> Option<BuildFlags> {
    let global = self.get(language, BuildFlagScope::Global);
    let scoped = self.get(language, scope);
    if global.is_none() && scoped.is_none() {
      return None;
    }

    let mut flags = global.cloned().unwrap_or_default();
    flags.extend(scoped.cloned().unwrap_or_default());
    Some(flags)
  }
}

/// Loads and fully expands the configuration at `path`.
pub fn load(path: &Path) -> Result<ProjectConfig, ConfigError> {
  let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
    path: path.to_path_buf(),
    source,
  })?;

  let root = path.parent().unwrap_or_else(|| Path::new("."));

  match serde_json::from_str::<serde_json::Value>(&text) {
    Ok(value) => Ok(json::expand(value, path, root)),
    Err(_) => Ok(legacy::parse(&text, path, root)),
  }
}

/// Expands a path expression against `root`, resolving glob patterns.
///
/// A pattern with no wildcard is returned as-is even when the file does not
/// exist, so missing files surface as diagnostics in the database instead of
/// silently disappearing. A wildcard pattern that matches nothing produces a
/// warning via the returned flag.
pub(crate) fn expand_path_expression(
  expression: &str,
  root: &Path,
) -> (Vec<SourcePath>, bool) {
  let anchored = if Path::new(expression).is_absolute() {
    expression.to_string()
  } else {
    root.join(expression).to_string_lossy().into_owned()
  };

  let has_magic = anchored.contains(['*', '?', '[']);
  if !has_magic {
    return (vec![SourcePath::absolute(&anchored)], false);
  }

  let mut paths = Vec::new();
  if let Ok(matches) = glob::glob(&anchored) {
    for found in matches.flatten() {
      paths.push(SourcePath::absolute(found));
    }
  }
  paths.sort();
  let dead_glob = paths.is_empty();
  (paths, dead_glob)
}
