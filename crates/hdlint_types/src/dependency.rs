//! Dependencies: unresolved references the planner turns into paths.

use serde::{Deserialize, Serialize};

use crate::{Identifier, Location, SourcePath};

/// A `(library, name)` reference to a design unit declared elsewhere.
///
/// `library == None` is the `work` sentinel: the reference points into the
/// same library the owning file is compiled into, whichever that turns out
/// to be.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequiredUnit {
  pub owner: SourcePath,
  pub library: Option<Identifier>,
  pub name: Identifier,
  pub locations: Vec<Location>,
}

impl RequiredUnit {
  /// Library name to display, with the `work` sentinel spelled out.
  pub fn library_display(&self) -> String {
    match &self.library {
      Some(library) => library.to_string(),
      None => crate::WORK_LIBRARY.to_string(),
    }
  }
}

impl std::fmt::Display for RequiredUnit {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    write!(f, "{}.{}", self.library_display(), self.name)
  }
}

/// A Verilog `` `include "<name>" `` reference. The name is resolved against
/// project paths by suffix matching.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncludedPath {
  pub owner: SourcePath,
  pub name: String,
  pub locations: Vec<Location>,
}

/// Any parsed dependency of a source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dependency {
  Unit(RequiredUnit),
  Include(IncludedPath),
}

impl Dependency {
  pub fn owner(&self) -> &SourcePath {
    match self {
      Dependency::Unit(unit) => &unit.owner,
      Dependency::Include(include) => &include.owner,
    }
  }

  pub fn locations(&self) -> &[Location] {
    match self {
      Dependency::Unit(unit) => &unit.locations,
      Dependency::Include(include) => &include.locations,
    }
  }

  pub fn as_unit(&self) -> Option<&RequiredUnit> {
    match self {
      Dependency::Unit(unit) => Some(unit),
      Dependency::Include(_) => None,
    }
  }

  pub fn as_include(&self) -> Option<&IncludedPath> {
    match self {
      Dependency::Include(include) => Some(include),
      Dependency::Unit(_) => None,
    }
  }
}
