//! Verilog / SystemVerilog design-unit and dependency scanner.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use hdlint_types::{
  Dependency, DesignUnit, DesignUnitKind, FileType, Identifier, IncludedPath, Location, RequiredUnit, SourcePath,
};

use crate::text::{strip_c_comments, LineIndex};
use crate::ParsedSource;

static DESIGN_UNITS: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?x)
      \b(?:
        module\s+(?P<module>[a-zA-Z_][\w$]*)
        | package\s+(?P<package>[a-zA-Z_][\w$]*)
        | interface\s+(?P<interface>[a-zA-Z_][\w$]*)
        | program\s+(?P<program>[a-zA-Z_][\w$]*)
      )",
  )
  .expect("design unit scanner is a valid regex")
});

static PACKAGE_REFERENCE: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"\b([a-zA-Z_][\w$]*)\s*::\s*(?:[a-zA-Z_][\w$]*|\*)").expect("package reference scanner is a valid regex")
});

static INCLUDE: Lazy<Regex> =
  Lazy::new(|| Regex::new(r#"`include\s*"(?P<path>[^"]+)""#).expect("include scanner is a valid regex"));

// One instantiation per statement: TYPE [#(params)] instance_name (
static INSTANTIATION: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?m)^\s*([a-zA-Z_][\w$]*)\s*(?:\#\s*\([^;]*?\)\s*)?([a-zA-Z_][\w$]*)\s*\(")
    .expect("instantiation scanner is a valid regex")
});

// Words that can open a statement but never name an instantiated module.
const KEYWORDS: &[&str] = &[
  "always", "always_comb", "always_ff", "always_latch", "and", "assign", "automatic", "begin", "bit", "buf", "bufif0",
  "bufif1", "byte", "case", "casex", "casez", "class", "const", "default", "defparam", "else", "end", "endcase",
  "endclass", "endfunction", "endgenerate", "endinterface", "endmodule", "endpackage", "endprogram", "endtask", "enum",
  "export", "for", "forever", "function", "generate", "genvar", "if", "import", "initial", "inout", "input", "int",
  "integer", "interface", "localparam", "logic", "longint", "modport", "module", "nand", "negedge", "nor", "not",
  "or", "output", "package", "parameter", "posedge", "program", "real", "reg", "repeat", "return", "shortint",
  "signed", "struct", "task", "time", "timeunit", "timeprecision", "typedef", "union", "unsigned", "virtual", "void",
  "while", "wire", "xnor", "xor",
];

pub(crate) fn parse(
  text: &str,
  kind: FileType,
  owner: &SourcePath,
) -> ParsedSource {
  let content = strip_c_comments(text);
  let index = LineIndex::new(&content);

  ParsedSource {
    design_units: scan_design_units(&content, &index, owner),
    dependencies: scan_dependencies(&content, &index, kind, owner),
    libraries: Vec::new(),
  }
}

fn scan_design_units(
  content: &str,
  index: &LineIndex,
  owner: &SourcePath,
) -> Vec<DesignUnit> {
  let mut units = Vec::new();

  for capture in DESIGN_UNITS.captures_iter(content) {
    let named = [
      ("module", DesignUnitKind::Module),
      ("package", DesignUnitKind::VerilogPackage),
      ("interface", DesignUnitKind::Interface),
      ("program", DesignUnitKind::Program),
    ];

    for (group, kind) in named {
      if let Some(found) = capture.name(group) {
        units.push(DesignUnit::new(
          Identifier::verilog(found.as_str()),
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
  kind: FileType,
  owner: &SourcePath,
) -> Vec<Dependency> {
  let mut units: BTreeMap<Identifier, Vec<Location>> = BTreeMap::new();
  let mut includes: BTreeMap<String, Vec<Location>> = BTreeMap::new();

  // Package scope references only exist in SystemVerilog.
  if kind == FileType::SystemVerilog {
    for capture in PACKAGE_REFERENCE.captures_iter(content) {
      let name = &capture[1];
      // `std` is built into the language.
      if name == "std" {
        continue;
      }
      let location = index.location(capture.get(0).map(|m| m.start()).unwrap_or(0));
      units.entry(Identifier::verilog(name)).or_default().push(location);
    }
  }

  for capture in INCLUDE.captures_iter(content) {
    if let Some(path) = capture.name("path") {
      let location = index.location(capture.get(0).map(|m| m.start()).unwrap_or(0));
      includes.entry(path.as_str().to_string()).or_default().push(location);
    }
  }

  let declared: Vec<&str> = DESIGN_UNITS
    .captures_iter(content)
    .filter_map(|c| c.iter().skip(1).flatten().next().map(|m| m.as_str()))
    .collect();

  for capture in INSTANTIATION.captures_iter(content) {
    let type_name = &capture[1];
    let instance_name = &capture[2];
    if KEYWORDS.contains(&type_name) || KEYWORDS.contains(&instance_name) {
      continue;
    }
    // A module never instantiates itself; what looks like one is a
    // declaration matched again.
    if declared.contains(&type_name) {
      continue;
    }
    let location = index.location(capture.get(1).map(|m| m.start()).unwrap_or(0));
    units.entry(Identifier::verilog(type_name)).or_default().push(location);
  }

  let mut dependencies: Vec<Dependency> = units
    .into_iter()
    .map(|(name, mut locations)| {
      locations.sort();
      locations.dedup();
      Dependency::Unit(RequiredUnit {
        owner: owner.clone(),
        library: None,
        name,
        locations,
      })
    })
    .collect();

  dependencies.extend(includes.into_iter().map(|(name, mut locations)| {
    locations.sort();
    locations.dedup();
    Dependency::Include(IncludedPath {
      owner: owner.clone(),
      name,
      locations,
    })
  }));

  dependencies
}
