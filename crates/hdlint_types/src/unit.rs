//! Design units: the top-level declarations a compiler treats as roots.

use serde::{Deserialize, Serialize};

use crate::{Identifier, Location, SourcePath};

/// Kind of a design unit declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum DesignUnitKind {
  Entity,
  Architecture,
  Package,
  PackageBody,
  Context,
  Configuration,
  Module,
  VerilogPackage,
  Interface,
  Program,
}

impl DesignUnitKind {
  pub fn as_str(self) -> &'static str {
    match self {
      DesignUnitKind::Entity => "entity",
      DesignUnitKind::Architecture => "architecture",
      DesignUnitKind::Package => "package",
      DesignUnitKind::PackageBody => "package body",
      DesignUnitKind::Context => "context",
      DesignUnitKind::Configuration => "configuration",
      DesignUnitKind::Module => "module",
      DesignUnitKind::VerilogPackage => "package",
      DesignUnitKind::Interface => "interface",
      DesignUnitKind::Program => "program",
    }
  }
}

/// A single design unit declared by a source file. One file may declare
/// several (a package and its body is the common case).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DesignUnit {
  pub name: Identifier,
  pub kind: DesignUnitKind,
  pub owner: SourcePath,
  pub locations: Vec<Location>,
}

impl DesignUnit {
  pub fn new(
    name: Identifier,
    kind: DesignUnitKind,
    owner: SourcePath,
    locations: Vec<Location>,
  ) -> Self {
    Self {
      name,
      kind,
      owner,
      locations,
    }
  }
}

impl std::fmt::Display for DesignUnit {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    write!(f, "{} '{}'", self.kind.as_str(), self.name)
  }
}
