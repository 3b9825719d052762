//! HDL identifiers and the comparisons between them.

use serde::{Deserialize, Serialize};

/// A VHDL, Verilog or SystemVerilog identifier.
///
/// VHDL identifiers compare case-insensitively while Verilog identifiers
/// preserve case. Rendering always preserves the spelling the identifier was
/// created with. Hashing uses the folded name in both cases so that a VHDL
/// and a Verilog spelling of the same word land in the same bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identifier {
  display_name: String,
  name: String,
  case_sensitive: bool,
}

impl Identifier {
  pub fn new(
    name: &str,
    case_sensitive: bool,
  ) -> Self {
    Self {
      display_name: name.to_string(),
      name: name.to_lowercase(),
      case_sensitive,
    }
  }

  /// VHDL identifier: case-insensitive.
  pub fn vhdl(name: &str) -> Self {
    Self::new(name, false)
  }

  /// Verilog/SystemVerilog identifier: case-sensitive.
  pub fn verilog(name: &str) -> Self {
    Self::new(name, true)
  }

  /// Folded name used for comparisons.
  pub fn name(&self) -> &str {
    &self.name
  }

  /// Spelling as written in the source.
  pub fn display_name(&self) -> &str {
    &self.display_name
  }

  pub fn is_case_sensitive(&self) -> bool {
    self.case_sensitive
  }
}

impl PartialEq for Identifier {
  fn eq(
    &self,
    other: &Self,
  ) -> bool {
    if self.case_sensitive && other.case_sensitive {
      self.display_name == other.display_name
    } else {
      self.name == other.name
    }
  }
}

impl Eq for Identifier {}

impl std::hash::Hash for Identifier {
  fn hash<H: std::hash::Hasher>(
    &self,
    state: &mut H,
  ) {
    self.name.hash(state);
  }
}

impl PartialOrd for Identifier {
  fn partial_cmp(
    &self,
    other: &Self,
  ) -> Option<std::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Identifier {
  fn cmp(
    &self,
    other: &Self,
  ) -> std::cmp::Ordering {
    self.name.cmp(&other.name).then_with(|| {
      if self.case_sensitive && other.case_sensitive {
        self.display_name.cmp(&other.display_name)
      } else {
        std::cmp::Ordering::Equal
      }
    })
  }
}

impl std::fmt::Display for Identifier {
  fn fmt(
    &self,
    f: &mut std::fmt::Formatter<'_>,
  ) -> std::fmt::Result {
    f.write_str(&self.display_name)
  }
}
