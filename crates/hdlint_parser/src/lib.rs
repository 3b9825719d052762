//! Lightweight design-unit and dependency extraction.
//!
//! These are scanners, not compilers: they pull names and positions out of
//! HDL text and silently skip anything malformed so the editor stays
//! responsive. Parsing is a pure function of `(text, kind)`; no caching
//! happens at this level; callers re-invoke only when a file went stale.

mod text;
mod verilog;
mod vhdl;

use hdlint_types::{Dependency, DesignUnit, FileType, Identifier, SourcePath};

pub use text::LineIndex;

/// Everything a scanner extracts from one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedSource {
  pub design_units: Vec<DesignUnit>,
  pub dependencies: Vec<Dependency>,
  /// Libraries named in `library` clauses (VHDL only).
  pub libraries: Vec<Identifier>,
}

/// Parses `text` according to the HDL flavor `kind`. Never fails.
pub fn parse(
  text: &str,
  kind: FileType,
  owner: &SourcePath,
) -> ParsedSource {
  match kind {
    FileType::Vhdl => vhdl::parse(text, owner),
    FileType::Verilog | FileType::SystemVerilog => verilog::parse(text, kind, owner),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use hdlint_types::DesignUnitKind;

  fn parse_vhdl(text: &str) -> ParsedSource {
    parse(text, FileType::Vhdl, &SourcePath::absolute("/work/source.vhd"))
  }

  #[test]
  fn round_trips_design_unit_names() {
    // Rendering the found units and re-parsing them as declarations finds
    // the same set of (name, kind) pairs.
    let parsed = parse_vhdl(
      "entity clock_divider is end;\n\
       package utils is end package;\n",
    );

    let rendered: String = parsed
      .design_units
      .iter()
      .map(|unit| match unit.kind {
        DesignUnitKind::Entity => format!("entity {} is end;\n", unit.name),
        _ => format!("package {} is end package;\n", unit.name),
      })
      .collect();

    let reparsed = parse_vhdl(&rendered);
    let names = |p: &ParsedSource| {
      let mut pairs: Vec<(String, DesignUnitKind)> =
        p.design_units.iter().map(|u| (u.name.name().to_string(), u.kind)).collect();
      pairs.sort();
      pairs
    };
    assert_eq!(names(&parsed), names(&reparsed));
  }
}
