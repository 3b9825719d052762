//! Canonical path type used throughout the project database.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// An absolute, normalized filesystem path.
///
/// Equality and hashing use only the path string: two `SourcePath`s with the
/// same string are the same file even when its content changed in between.
/// Staleness is tracked separately through [`SourcePath::mtime`], which reads
/// the filesystem on demand.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourcePath {
  name: PathBuf,
}

impl SourcePath {
  /// Builds a path, resolving `name` against `base` when it is relative.
  /// The result is normalized lexically (no filesystem access).
  pub fn new<P: AsRef<Path>>(
    name: P,
    base: Option<&Path>,
  ) -> Self {
    let name = name.as_ref();
    let joined = if name.is_absolute() {
      name.to_path_buf()
    } else {
      match base {
        Some(base) => base.join(name),
        None => name.to_path_buf(),
      }
    };
    Self {
      name: normalize(&joined),
    }
  }

  /// Builds a path from a string that is already absolute.
  pub fn absolute<P: AsRef<Path>>(name: P) -> Self {
    Self::new(name, None)
  }

  pub fn as_path(&self) -> &Path {
    &self.name
  }

  pub fn file_name(&self) -> &str {
    self.name.file_name().and_then(|s| s.to_str()).unwrap_or_default()
  }

  /// Modification time as reported by the filesystem, `None` when the file
  /// cannot be stat'ed.
  pub fn mtime(&self) -> Option<SystemTime> {
    std::fs::metadata(&self.name).and_then(|meta| meta.modified()).ok()
  }

  pub fn exists(&self) -> bool {
    self.name.exists()
  }

  pub fn read_text(&self) -> std::io::Result<String> {
    std::fs::read_to_string(&self.name)
  }

  /// Checks whether this path ends with the same components as `suffix`.
  /// Used to resolve `` `include "dir/file.svh" `` references.
  pub fn ends_with_suffix(
    &self,
    suffix: &str,
  ) -> bool {
    let reference: Vec<_> = Path::new(suffix).components().collect();
    let own: Vec<_> = self.name.components().collect();
    if reference.is_empty() || reference.len() > own.len() {
      return false;
    }
    own[own.len() - reference.len()..] == reference[..]
  }
}

impl std::fmt::Display for SourcePath {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    write!(f, "{}", self.name.display())
  }
}

impl AsRef<Path> for SourcePath {
  fn as_ref(&self) -> &Path {
    &self.name
  }
}

/// Collapses `.` and `..` components without touching the filesystem.
/// Leading `..` components are preserved when there is nothing left to pop.
fn normalize(path: &Path) -> PathBuf {
  use std::path::Component;

  let mut parts: Vec<Component<'_>> = Vec::new();
  for component in path.components() {
    match component {
      Component::CurDir => {},
      Component::ParentDir => {
        let can_pop = matches!(
          parts.last(),
          Some(c) if !matches!(c, Component::ParentDir | Component::RootDir)
        );
        if can_pop {
          parts.pop();
        } else if !matches!(parts.last(), Some(Component::RootDir)) {
          parts.push(component);
        }
      },
      other => parts.push(other),
    }
  }
  parts.iter().collect()
}
