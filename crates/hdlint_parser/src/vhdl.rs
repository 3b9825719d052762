//! VHDL design-unit and dependency scanner.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;

use hdlint_types::{Dependency, DesignUnit, DesignUnitKind, Identifier, Location, RequiredUnit, SourcePath};

use crate::text::{strip_vhdl_comments, LineIndex};
use crate::ParsedSource;

// `package body` must come before `package` so the body alternative wins.
static DESIGN_UNITS: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?ix)
      \b(?:
        entity\s+(?P<entity>\w+)\s+is
        | architecture\s+(?P<architecture>\w+)\s+of\s+(?P<arch_entity>\w+)
        | package\s+body\s+(?P<package_body>\w+)\s+is
        | package\s+(?P<package>\w+)\s+is
        | context\s+(?P<context>\w+)\s+is
        | configuration\s+(?P<configuration>\w+)\s+of\s+(?P<cfg_entity>\w+)
      )",
  )
  .expect("design unit scanner is a valid regex")
});

static LIBRARIES: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)\blibrary\s+([a-z_]\w*(?:\s*,\s*[a-z_]\w*)*)\s*;").expect("library scanner is a valid regex"));

static REFERENCE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"\b(\w+)\s*\.\s*(\w+)").expect("reference scanner is a valid regex"));

pub(crate) fn parse(
  text: &str,
  owner: &SourcePath,
) -> ParsedSource {
  let content = strip_vhdl_comments(text);
  let index = LineIndex::new(&content);

  let libraries = scan_libraries(&content);
  let design_units = scan_design_units(&content, &index, owner);
  let dependencies = scan_dependencies(&content, &index, owner, &libraries, &design_units);

  ParsedSource {
    design_units,
    dependencies,
    libraries: libraries.into_iter().collect(),
  }
}

fn scan_libraries(content: &str) -> BTreeSet<Identifier> {
  let mut libraries = BTreeSet::new();
  for capture in LIBRARIES.captures_iter(content) {
    for name in capture[1].split(',') {
      let name = name.trim();
      // `work` always refers to the file's own library; it is not a prefix
      // worth tracking.
      if !name.is_empty() && !name.eq_ignore_ascii_case("work") {
        libraries.insert(Identifier::vhdl(name));
      }
    }
  }
  libraries
}

fn scan_design_units(
  content: &str,
  index: &LineIndex,
  owner: &SourcePath,
) -> Vec<DesignUnit> {
  let mut units = Vec::new();

  for capture in DESIGN_UNITS.captures_iter(content) {
    let named = [
      ("entity", DesignUnitKind::Entity),
      ("architecture", DesignUnitKind::Architecture),
      ("package_body", DesignUnitKind::PackageBody),
      ("package", DesignUnitKind::Package),
      ("context", DesignUnitKind::Context),
      ("configuration", DesignUnitKind::Configuration),
    ];

    for (group, kind) in named {
      if let Some(found) = capture.name(group) {
        units.push(DesignUnit::new(
          Identifier::vhdl(found.as_str()),
          kind,
          owner.clone(),
          vec![index.location(found.start())],
        ));
        break;
      }
    }
  }

  units
}

fn scan_dependencies(
  content: &str,
  index: &LineIndex,
  owner: &SourcePath,
  libraries: &BTreeSet<Identifier>,
  design_units: &[DesignUnit],
) -> Vec<Dependency> {
  // Key on the folded (library, name) pair so repeated references merge
  // their locations into one dependency.
  let mut merged: BTreeMap<(Option<Identifier>, Identifier), Vec<Location>> = BTreeMap::new();

  for capture in REFERENCE.captures_iter(content) {
    let prefix = capture.get(1).map(|m| m.as_str()).unwrap_or_default();
    let name = capture.get(2).map(|m| m.as_str()).unwrap_or_default();

    let library = if prefix.eq_ignore_ascii_case("work") {
      None
    } else {
      let candidate = Identifier::vhdl(prefix);
      if !libraries.contains(&candidate) {
        continue;
      }
      Some(candidate)
    };

    let location = index.location(capture.get(0).map(|m| m.start()).unwrap_or(0));
    merged.entry((library, Identifier::vhdl(name))).or_default().push(location);
  }

  // An architecture requires its entity, a package body its package, a
  // configuration the entity it configures. All live in the same library.
  for unit in design_units {
    let required = match unit.kind {
      DesignUnitKind::Architecture | DesignUnitKind::Configuration => None,
      DesignUnitKind::PackageBody => Some(unit.name.clone()),
      _ => continue,
    };
    let name = match required {
      Some(name) => name,
      None => match implicit_target(content, unit) {
        Some(name) => name,
        None => continue,
      },
    };
    merged
      .entry((None, name))
      .or_default()
      .extend(unit.locations.iter().copied());
  }

  merged
    .into_iter()
    .map(|((library, name), mut locations)| {
      locations.sort();
      locations.dedup();
      Dependency::Unit(RequiredUnit {
        owner: owner.clone(),
        library,
        name,
        locations,
      })
    })
    .collect()
}

/// Finds the entity an architecture or configuration is attached to.
fn implicit_target(
  content: &str,
  unit: &DesignUnit,
) -> Option<Identifier> {
  for capture in DESIGN_UNITS.captures_iter(content) {
    let (own, target) = match unit.kind {
      DesignUnitKind::Architecture => (capture.name("architecture"), capture.name("arch_entity")),
      DesignUnitKind::Configuration => (capture.name("configuration"), capture.name("cfg_entity")),
      _ => return None,
    };
    if let (Some(own), Some(target)) = (own, target) {
      if Identifier::vhdl(own.as_str()) == unit.name {
        return Some(Identifier::vhdl(target.as_str()));
      }
    }
  }
  None
}
