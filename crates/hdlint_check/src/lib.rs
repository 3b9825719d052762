//! Static style checks that need no external tool.
//!
//! Two families of checks run over the raw source text:
//! unused declarations (signals, constants, ports, generics, types, shared
//! variables, attributes, libraries declared but referenced nowhere else in
//! the file) and comment tags (`TODO`, `FIXME`, `XXX`).
//!
//! Known caveat: names shared with component/procedure/function formal
//! parameters are not flagged.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use hdlint_diagnostics::Diagnostic;
use hdlint_types::{Location, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Area {
  Entity,
  Architecture,
  Package,
  PackageBody,
}

static SCOPES: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?ix)
      ^\s*(?:
        entity\s+(?P<entity>\w+)\s+is\b
        | architecture\s+(?P<architecture>\w+)\s+of\s+\w+
        | package\s+body\s+(?P<package_body>\w+)\s+is\b
        | package\s+(?P<package>\w+)\s+is\b
      )",
  )
  .expect("scope scanner is a valid regex")
});

static NO_SCOPE_OBJECTS: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?ix)
      ^\s*(?:
        library\s+(?P<library>[\w\s,]+)
        | attribute\s+(?P<attribute>[\w\s,]+)\s*:
      )",
  )
  .expect("no-scope object scanner is a valid regex")
});

static ENTITY_OBJECTS: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?ix)
      ^\s*(?:
        (?P<port>[\w\s,]+)\s*:\s*(?:in|out|inout|buffer|linkage)\s+\w+
        | (?P<generic>[\w\s,]+)\s*:\s*\w+
      )",
  )
  .expect("entity object scanner is a valid regex")
});

static ARCH_OBJECTS: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?ix)
      ^\s*(?:
        constant\s+(?P<constant>[\w\s,]+)\s*:
        | signal\s+(?P<signal>[\w\s,]+)\s*:
        | type\s+(?P<type>\w+)\s*
        | shared\s+variable\s+(?P<shared_variable>[\w\s,]+)\s*:
      )",
  )
  .expect("architecture object scanner is a valid regex")
});

// Past any of these the declarative region is over, nothing more to collect.
static END_OF_DECLARATIONS: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?x)\b(?:generic\s+map|port\s+map|generate|process)\b|\w+\s*:\s*entity")
    .expect("end-of-declarations scanner is a valid regex")
});

static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*--.*").expect("comment scanner is a valid regex"));

static COMMENT_TAG: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"(?:--|//)\s*(?P<tag>TODO|FIXME|XXX)\s*:\s*(?P<text>.*)").expect("tag scanner is a valid regex")
});

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("word scanner is a valid regex"));

#[derive(Debug, Clone)]
struct DeclaredObject {
  kind: &'static str,
  location: Location,
}

/// Runs every static check over `text` and returns the diagnostics found.
/// Locations are zero-based; the caller attaches the path.
pub fn static_messages(text: &str) -> Vec<Diagnostic> {
  let objects = declared_objects(text);
  let mut result = Vec::new();

  for (name, object) in unused_objects(text, &objects) {
    result.push(
      Diagnostic::static_check(
        Severity::Warning,
        format!("{} '{}' is never used", capitalize(object.kind), name),
      )
      .with_location(object.location)
      .with_code("unused"),
    );
  }

  result.extend(comment_tags(text));
  result.extend(misc_checks(&objects));

  result
}

/// Collects declared object names up to the end of the declarative region.
/// First declaration of a name wins.
fn declared_objects(text: &str) -> BTreeMap<String, DeclaredObject> {
  let mut objects = BTreeMap::new();
  let mut area: Option<Area> = None;

  for (line_number, raw_line) in text.lines().enumerate() {
    let line = COMMENT.replace(raw_line, "");

    if let Some(capture) = SCOPES.captures(&line) {
      area = if capture.name("entity").is_some() {
        Some(Area::Entity)
      } else if capture.name("architecture").is_some() {
        Some(Area::Architecture)
      } else if capture.name("package_body").is_some() {
        Some(Area::PackageBody)
      } else {
        Some(Area::Package)
      };
    }

    let captures = match area {
      None => NO_SCOPE_OBJECTS.captures(&line),
      Some(Area::Entity) => ENTITY_OBJECTS.captures(&line),
      Some(Area::Architecture) => ARCH_OBJECTS.captures(&line),
      Some(Area::Package) | Some(Area::PackageBody) => None,
    };

    if let Some(capture) = captures {
      for kind in ["library", "attribute", "port", "generic", "constant", "signal", "type", "shared_variable"] {
        let Some(group) = capture.name(kind) else {
          continue;
        };
        // More than one name can be declared per line; split at commas.
        for word in WORD.find_iter(group.as_str()) {
          let name = word.as_str().to_lowercase();
          objects.entry(name).or_insert_with(|| DeclaredObject {
            kind,
            location: Location::new(line_number as u32, (group.start() + word.start()) as u32),
          });
        }
      }
    }

    if END_OF_DECLARATIONS.is_match(&line) {
      break;
    }
  }

  objects
}

/// Objects whose name appears exactly once in the whole file: only the
/// declaration itself, so nothing uses them.
fn unused_objects<'a>(
  text: &str,
  objects: &'a BTreeMap<String, DeclaredObject>,
) -> Vec<(&'a str, &'a DeclaredObject)> {
  let mut stripped = String::with_capacity(text.len());
  for line in text.lines() {
    stripped.push_str(&COMMENT.replace(line, ""));
    stripped.push(' ');
  }

  let mut counts: BTreeMap<String, usize> = BTreeMap::new();
  for word in WORD.find_iter(&stripped) {
    let key = word.as_str().to_lowercase();
    if objects.contains_key(&key) {
      *counts.entry(key).or_insert(0) += 1;
    }
  }

  objects
    .iter()
    .filter(|(name, _)| counts.get(*name).copied().unwrap_or(0) <= 1)
    .map(|(name, object)| (name.as_str(), object))
    .collect()
}

/// `TODO` / `FIXME` / `XXX` comments become informational diagnostics with
/// the tag as the code and the trailer as the message.
fn comment_tags(text: &str) -> Vec<Diagnostic> {
  let mut result = Vec::new();

  for (line_number, line) in text.lines().enumerate() {
    let lowered = line.to_lowercase();
    if !["todo", "fixme", "xxx"].iter().any(|tag| lowered.contains(tag)) {
      continue;
    }

    for capture in COMMENT_TAG.captures_iter(line) {
      let tag = capture.name("tag").map(|m| m.as_str()).unwrap_or_default();
      let trailer = capture.name("text").map(|m| m.as_str().trim()).unwrap_or_default();
      let column = capture.name("tag").map(|m| m.start()).unwrap_or(0);

      result.push(
        Diagnostic::static_check(Severity::Note, format!("{}: {}", tag, trailer))
          .with_location(Location::new(line_number as u32, column as u32))
          .with_code(tag),
      );
    }
  }

  result
}

/// Generic code hints over the declared objects.
fn misc_checks(objects: &BTreeMap<String, DeclaredObject>) -> Vec<Diagnostic> {
  let mut result = Vec::new();

  for (name, object) in objects {
    if object.kind == "library" && name == "work" {
      result.push(
        Diagnostic::static_check(Severity::Note, "Declaration of library 'work' can be omitted".to_string())
          .with_location(object.location)
          .with_code("library-work"),
      );
    }
  }

  result
}

fn capitalize(word: &str) -> String {
  let mut chars = word.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
    None => String::new(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unused_signal_is_flagged() {
    let diags = static_messages(
      "entity foo is\n\
       end;\n\
       architecture rtl of foo is\n\
         signal neat_signal : std_logic_vector(7 downto 0);\n\
       begin\n\
       end;\n",
    );
    let unused: Vec<_> = diags.iter().filter(|d| d.code.as_deref() == Some("unused")).collect();
    assert_eq!(unused.len(), 1);
    assert_eq!(unused[0].severity, Severity::Warning);
    assert!(unused[0].text.contains("neat_signal"));
    assert_eq!(unused[0].location.unwrap().line, 3);
  }

  #[test]
  fn used_signal_is_not_flagged() {
    let diags = static_messages(
      "architecture rtl of foo is\n\
         signal counter : natural;\n\
       begin\n\
         counter <= counter + 1;\n\
       end;\n",
    );
    assert!(diags.iter().all(|d| d.code.as_deref() != Some("unused")));
  }

  #[test]
  fn several_signals_in_one_line() {
    let diags = static_messages(
      "architecture rtl of foo is\n\
         signal used_one, dead_one : bit;\n\
       begin\n\
         x <= used_one;\n\
       end;\n",
    );
    let unused: Vec<_> = diags.iter().filter(|d| d.code.as_deref() == Some("unused")).collect();
    assert_eq!(unused.len(), 1);
    assert!(unused[0].text.contains("dead_one"));
  }

  #[test]
  fn todo_tags_are_reported() {
    let diags = static_messages("entity t is end;\n-- TODO: hook up reset\n");
    let tags: Vec<_> = diags.iter().filter(|d| d.code.as_deref() == Some("TODO")).collect();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].severity, Severity::Note);
    assert_eq!(tags[0].text, "TODO: hook up reset");
    assert_eq!(tags[0].location.unwrap().line, 1);
  }

  #[test]
  fn fixme_in_verilog_comment() {
    let diags = static_messages("module m;\n// FIXME: off by one\nendmodule\n");
    let tags: Vec<_> = diags.iter().filter(|d| d.code.as_deref() == Some("FIXME")).collect();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].text, "FIXME: off by one");
  }

  #[test]
  fn work_library_declaration_is_hinted() {
    let diags = static_messages("library work;\nentity t is end;\n");
    assert!(diags.iter().any(|d| d.code.as_deref() == Some("library-work")));
  }

  #[test]
  fn scan_stops_at_the_declarative_region_end() {
    // The signal below `begin ... process` is outside the scanned region.
    let diags = static_messages(
      "architecture rtl of foo is\n\
         signal seen : bit;\n\
       begin\n\
         main : process\n\
         begin\n\
         end process;\n\
       end;\n",
    );
    let unused: Vec<_> = diags.iter().filter(|d| d.code.as_deref() == Some("unused")).collect();
    assert_eq!(unused.len(), 1);
    assert!(unused[0].text.contains("seen"));
  }
}
