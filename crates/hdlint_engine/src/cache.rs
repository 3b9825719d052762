//! On-disk snapshot of the database and adapter state.
//!
//! The first line of the cache file is a schema tag; anything but an exact
//! match discards the whole file. Any error while loading wipes the cache:
//! a cold start is always safe, a half-recovered one is not.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use hdlint_builders::{BuilderKind, BuilderState};
use hdlint_database::Database;
use hdlint_log::{log_dbg, log_warn};

/// Bump whenever the serialized shape changes.
pub const CACHE_SCHEMA: &str = "hdlint-cache-v1";

/// File name of the cache inside the working directory.
pub const CACHE_NAME: &str = "cache.json";

#[derive(Serialize, Deserialize)]
pub struct CacheState {
  pub database: Database,
  pub builder: BuilderKind,
  pub builder_state: BuilderState,
  pub config_file: Option<PathBuf>,
}

/// Loads the cache, returning `None` (and removing the file) when the schema
/// tag mismatches or the content cannot be decoded.
pub fn load(work_dir: &Path) -> Option<CacheState> {
  let path = work_dir.join(CACHE_NAME);
  let text = std::fs::read_to_string(&path).ok()?;

  let Some((tag, body)) = text.split_once('\n') else {
    wipe(&path);
    return None;
  };
  if tag.trim() != CACHE_SCHEMA {
    log_warn!("Cache schema mismatch ('{}'), discarding '{}'", tag.trim(), path.display());
    wipe(&path);
    return None;
  }

  match serde_json::from_str(body) {
    Ok(state) => {
      log_dbg!("Recovered cache from '{}'", path.display());
      Some(state)
    },
    Err(error) => {
      log_warn!("Unable to recover cache from '{}': {}", path.display(), error);
      wipe(&path);
      None
    },
  }
}

/// Writes the cache. Failures are logged and swallowed; losing the cache
/// only costs a rebuild.
pub fn save(
  work_dir: &Path,
  state: &CacheState,
) {
  let path = work_dir.join(CACHE_NAME);
  let body = match serde_json::to_string(state) {
    Ok(body) => body,
    Err(error) => {
      log_warn!("Could not serialize cache: {}", error);
      return;
    },
  };

  if let Err(error) = std::fs::write(&path, format!("{}\n{}", CACHE_SCHEMA, body)) {
    log_warn!("Could not write cache to '{}': {}", path.display(), error);
  }
}

fn wipe(path: &Path) {
  let _ = std::fs::remove_file(path);
}

#[cfg(test)]
mod tests {
  use super::*;

  fn empty_state() -> CacheState {
    CacheState {
      database: Database::new(),
      builder: BuilderKind::Fallback,
      builder_state: BuilderState::default(),
      config_file: None,
    }
  }

  #[test]
  fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    save(dir.path(), &empty_state());

    let state = load(dir.path()).expect("cache loads");
    assert_eq!(state.builder, BuilderKind::Fallback);
  }

  #[test]
  fn schema_mismatch_discards_and_wipes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CACHE_NAME);
    std::fs::write(&path, "hdlint-cache-v0\n{}").unwrap();

    assert!(load(dir.path()).is_none());
    assert!(!path.exists());
  }

  #[test]
  fn corrupt_body_discards_and_wipes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CACHE_NAME);
    std::fs::write(&path, format!("{}\nnot json at all", CACHE_SCHEMA)).unwrap();

    assert!(load(dir.path()).is_none());
    assert!(!path.exists());
  }

  #[test]
  fn missing_cache_is_no_cache() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load(dir.path()).is_none());
  }

  #[test]
  fn serialized_blob_is_stable() {
    // Serialize -> load -> serialize must be byte-equal after the tag.
    let dir = tempfile::tempdir().unwrap();
    save(dir.path(), &empty_state());
    let first = std::fs::read_to_string(dir.path().join(CACHE_NAME)).unwrap();

    let state = load(dir.path()).expect("cache loads");
    save(dir.path(), &state);
    let second = std::fs::read_to_string(dir.path().join(CACHE_NAME)).unwrap();

    assert_eq!(first, second);
  }
}
