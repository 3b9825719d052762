//! Shared fixtures for database tests.

use std::path::Path;

use hdlint_database::Database;
use hdlint_types::{Identifier, SourcePath};

/// Writes `content` under the fixture root and registers it in `database`
/// with an optional explicit library.
pub fn add_source(
  database: &mut Database,
  root: &Path,
  name: &str,
  library: Option<&str>,
  content: &str,
) -> SourcePath {
  let path = root.join(name);
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent).unwrap();
  }
  std::fs::write(&path, content).unwrap();

  let source = SourcePath::absolute(&path);
  database.put_file(
    source.clone(),
    library.map(Identifier::vhdl),
    Vec::new(),
    Vec::new(),
    Vec::new(),
  );
  source
}

/// Sequence paths as short file names, for terse assertions.
pub fn plan_names(plan: &hdlint_database::BuildPlan) -> Vec<String> {
  plan
    .sequence
    .iter()
    .map(|(_, path)| path.file_name().to_string())
    .collect()
}
