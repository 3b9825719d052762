//! Conversions between engine types and LSP types.

use tower_lsp::lsp_types;

use hdlint_diagnostics::Diagnostic;
use hdlint_types::{Location, Severity};

pub fn to_lsp_severity(severity: Severity) -> lsp_types::DiagnosticSeverity {
  match severity {
    Severity::Note => lsp_types::DiagnosticSeverity::INFORMATION,
    Severity::Warning => lsp_types::DiagnosticSeverity::WARNING,
    Severity::Error | Severity::Fatal => lsp_types::DiagnosticSeverity::ERROR,
  }
}

pub fn to_lsp_range(location: Option<Location>) -> lsp_types::Range {
  let location = location.unwrap_or_default();
  let position = lsp_types::Position::new(location.line, location.column);
  lsp_types::Range::new(position, position)
}

pub fn to_lsp_diagnostic(diagnostic: &Diagnostic) -> lsp_types::Diagnostic {
  lsp_types::Diagnostic {
    range: to_lsp_range(diagnostic.location),
    severity: Some(to_lsp_severity(diagnostic.severity)),
    code: diagnostic.code.clone().map(lsp_types::NumberOrString::String),
    source: Some(diagnostic.checker.clone()),
    message: diagnostic.text.clone(),
    ..Default::default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn severities_map_onto_the_lsp_scale() {
    assert_eq!(to_lsp_severity(Severity::Note), lsp_types::DiagnosticSeverity::INFORMATION);
    assert_eq!(to_lsp_severity(Severity::Warning), lsp_types::DiagnosticSeverity::WARNING);
    assert_eq!(to_lsp_severity(Severity::Error), lsp_types::DiagnosticSeverity::ERROR);
    assert_eq!(to_lsp_severity(Severity::Fatal), lsp_types::DiagnosticSeverity::ERROR);
  }

  #[test]
  fn missing_locations_default_to_the_file_start() {
    let range = to_lsp_range(None);
    assert_eq!(range.start.line, 0);
    assert_eq!(range.start.character, 0);
  }
}
