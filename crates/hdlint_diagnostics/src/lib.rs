//! Diagnostic values surfaced to the editor.
//!
//! A [`Diagnostic`] is plain data; the constructors below cover every message
//! the core emits on its own. Tool output is translated into the same shape
//! by the builder adapters.

use serde::{Deserialize, Serialize};

use hdlint_types::{Identifier, Location, RequiredUnit, Severity, SourcePath};

/// Checker name used for diagnostics produced by the project engine itself.
pub const CHECKER_NAME: &str = "hdlint";

/// Checker name used by the static (tool-less) checks.
pub const STATIC_CHECKER_NAME: &str = "hdlint/static";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Diagnostic {
  pub path: Option<SourcePath>,
  pub location: Option<Location>,
  pub severity: Severity,
  pub code: Option<String>,
  pub text: String,
  pub checker: String,
}

impl Diagnostic {
  pub fn new(
    checker: &str,
    severity: Severity,
    text: String,
  ) -> Self {
    Self {
      checker: checker.to_string(),
      path: None,
      location: None,
      severity,
      code: None,
      text,
    }
  }

  pub fn with_path(
    mut self,
    path: SourcePath,
  ) -> Self {
    self.path = Some(path);
    self
  }

  pub fn with_location(
    mut self,
    location: Location,
  ) -> Self {
    self.location = Some(location);
    self
  }

  pub fn with_code(
    mut self,
    code: &str,
  ) -> Self {
    self.code = Some(code.to_string());
    self
  }

  /// A path was requested that the project file does not mention.
  pub fn path_not_in_project(path: &SourcePath) -> Self {
    Diagnostic::new(
      CHECKER_NAME,
      Severity::Warning,
      format!("Path \"{}\" not found in project file", path),
    )
    .with_path(path.clone())
    .with_location(Location::new(0, 0))
  }

  /// A configured file does not exist on disk.
  pub fn file_not_found(path: &SourcePath) -> Self {
    Diagnostic::new(CHECKER_NAME, Severity::Warning, format!("File \"{}\" does not exist", path))
      .with_path(path.clone())
      .with_location(Location::new(0, 0))
      .with_code("file-not-found")
  }

  /// No library could be worked out for the file.
  pub fn library_unresolved(path: &SourcePath) -> Self {
    Diagnostic::new(
      CHECKER_NAME,
      Severity::Warning,
      "Could not work out a library for this file, diagnostics may be incorrect".to_string(),
    )
    .with_path(path.clone())
    .with_location(Location::new(0, 0))
    .with_code("unresolved-library")
  }

  /// A file's units are referenced from several libraries; the most common
  /// one was picked.
  pub fn library_not_unique(
    path: &SourcePath,
    chosen: &Identifier,
    candidates: &[Identifier],
  ) -> Self {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for library in candidates {
      match counts.iter_mut().find(|(name, _)| *name == library.to_string()) {
        Some((_, count)) => *count += 1,
        None => counts.push((library.to_string(), 1)),
      }
    }
    let listed = counts
      .iter()
      .map(|(name, count)| format!("'{}' (x{})", name, count))
      .collect::<Vec<_>>()
      .join(", ");

    Diagnostic::new(
      CHECKER_NAME,
      Severity::Warning,
      format!(
        "Using library '{}' for this file but its units are referenced in multiple libraries: {}",
        chosen, listed
      ),
    )
    .with_path(path.clone())
    .with_location(Location::new(0, 0))
    .with_code("library-not-unique")
  }

  /// A `(library, name)` reference could not be resolved to any project path.
  pub fn unresolved_dependency(
    dependency: &RequiredUnit,
    location: Location,
  ) -> Self {
    Diagnostic::new(
      CHECKER_NAME,
      Severity::Error,
      format!("Unable to resolve '{}' to a path", dependency),
    )
    .with_path(dependency.owner.clone())
    .with_location(location)
    .with_code("unresolved-dependency")
  }

  /// A reference resolved to more than one path; candidates are listed.
  pub fn dependency_not_unique(
    owner: &SourcePath,
    location: Location,
    reference: &str,
    choices: &[SourcePath],
  ) -> Self {
    let mut names: Vec<String> = choices.iter().map(|p| format!("\"{}\"", p)).collect();
    names.sort();

    Diagnostic::new(
      CHECKER_NAME,
      Severity::Note,
      format!(
        "Dependency '{}' has {} definitions (files are {}). The selected option may not be the correct one",
        reference,
        names.len(),
        names.join(", ")
      ),
    )
    .with_path(owner.clone())
    .with_location(location)
    .with_code("dependency-not-unique")
  }

  /// A builder's probe failed and the engine fell back to another one.
  pub fn builder_unavailable(
    name: &str,
    reason: &str,
  ) -> Self {
    Diagnostic::new(
      CHECKER_NAME,
      Severity::Note,
      format!("Builder '{}' is not available: {}", name, reason),
    )
    .with_code("builder-unavailable")
  }

  /// An external compiler did not finish within its deadline.
  pub fn build_timeout(
    path: &SourcePath,
    builder: &str,
    seconds: u64,
  ) -> Self {
    Diagnostic::new(
      &format!("{}/{}", CHECKER_NAME, builder),
      Severity::Error,
      format!("Compilation did not finish within {}s and was aborted", seconds),
    )
    .with_path(path.clone())
    .with_location(Location::new(0, 0))
    .with_code("timeout")
  }

  /// A diagnostic parsed out of a compiler's output.
  pub fn from_builder(
    builder: &str,
    severity: Severity,
    text: String,
  ) -> Self {
    Diagnostic::new(&format!("{}/{}", CHECKER_NAME, builder), severity, text)
  }

  /// A diagnostic produced by the static checker.
  pub fn static_check(
    severity: Severity,
    text: String,
  ) -> Self {
    Diagnostic::new(STATIC_CHECKER_NAME, severity, text)
  }

  /// Key used for ordering and deduplication of engine output.
  fn sort_key(&self) -> (Option<&SourcePath>, Option<Location>, Severity, Option<&String>, &String) {
    (self.path.as_ref(), self.location, self.severity, self.code.as_ref(), &self.text)
  }
}

impl std::fmt::Display for Diagnostic {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    if let Some(path) = &self.path {
      write!(f, "{}:", path)?;
    }
    if let Some(location) = &self.location {
      write!(f, "{}:", location)?;
    }
    write!(f, " {}: {}", self.severity, self.text)?;
    if let Some(code) = &self.code {
      write!(f, " [{}]", code)?;
    }
    Ok(())
  }
}

/// Sorts diagnostics into the engine's stable output order and removes exact
/// duplicates, so two identical runs always return identical lists.
pub fn sort_and_dedup(diagnostics: &mut Vec<Diagnostic>) {
  diagnostics.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
  diagnostics.dedup();
}

#[cfg(test)]
mod tests {
  use super::*;

  fn diag(
    path: &str,
    line: u32,
    severity: Severity,
    text: &str,
  ) -> Diagnostic {
    Diagnostic::new(CHECKER_NAME, severity, text.to_string())
      .with_path(SourcePath::absolute(path))
      .with_location(Location::new(line, 0))
  }

  #[test]
  fn sorting_is_stable_by_path_then_location() {
    let mut diags = vec![
      diag("/b.vhd", 1, Severity::Error, "late"),
      diag("/a.vhd", 9, Severity::Warning, "warn"),
      diag("/a.vhd", 2, Severity::Error, "early"),
    ];
    sort_and_dedup(&mut diags);
    assert_eq!(diags[0].text, "early");
    assert_eq!(diags[1].text, "warn");
    assert_eq!(diags[2].text, "late");
  }

  #[test]
  fn duplicates_collapse() {
    let mut diags = vec![
      diag("/a.vhd", 1, Severity::Error, "dup"),
      diag("/a.vhd", 1, Severity::Error, "dup"),
    ];
    sort_and_dedup(&mut diags);
    assert_eq!(diags.len(), 1);
  }

  #[test]
  fn library_not_unique_counts_candidates() {
    let diag = Diagnostic::library_not_unique(
      &SourcePath::absolute("/a.vhd"),
      &Identifier::vhdl("lib_a"),
      &[Identifier::vhdl("lib_a"), Identifier::vhdl("lib_a"), Identifier::vhdl("lib_b")],
    );
    assert!(diag.text.contains("'lib_a' (x2)"));
    assert!(diag.text.contains("'lib_b' (x1)"));
  }
}
