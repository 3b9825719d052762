//! Shared server state: the engine and where it came from.

use std::path::{Path, PathBuf};

use tokio::sync::RwLock;

use hdlint_engine::Project;
use hdlint_log::{log_info, log_warn};

/// Configuration file names probed in the workspace root, best first.
const CONFIG_CANDIDATES: &[&str] = &["hdlint.json", ".hdlint.json", "hdlint.prj", ".hdl_checker.config"];

#[derive(Default)]
pub struct LspState {
  pub project: RwLock<Option<Project>>,
}

impl LspState {
  pub fn new() -> Self {
    Self::default()
  }

  /// Creates the engine for `root` and configures it from the first config
  /// file found there. Without a config the engine still runs and checks
  /// files on demand.
  pub async fn open_workspace(
    &self,
    root: &Path,
  ) {
    let mut project = match Project::new(root) {
      Ok(project) => project,
      Err(error) => {
        log_warn!("Could not create engine for '{}': {}", root.display(), error);
        return;
      },
    };

    if let Some(config) = find_config(root) {
      log_info!("Configuring from '{}'", config.display());
      if let Err(error) = project.configure(&config) {
        log_warn!("Could not load '{}': {}", config.display(), error);
      }
    }

    *self.project.write().await = Some(project);
  }
}

fn find_config(root: &Path) -> Option<PathBuf> {
  CONFIG_CANDIDATES
    .iter()
    .map(|name| root.join(name))
    .find(|path| path.exists())
}
