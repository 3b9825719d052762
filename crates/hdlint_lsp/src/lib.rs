//! LSP transport: maps editor requests onto the project engine.
//!
//! The engine does the actual work; this crate only converts between LSP
//! types and the engine's value types and decides when to publish
//! diagnostics (open, save and change events).

mod convert;
mod server;
mod state;

use tower_lsp::{LspService, Server as TowerServer};

use server::Backend;
use state::LspState;

/// Runs the LSP server on stdin/stdout until the client disconnects.
/// Must be called from within a Tokio runtime.
pub async fn run() {
  let stdin = tokio::io::stdin();
  let stdout = tokio::io::stdout();

  let state = std::sync::Arc::new(LspState::new());
  let (service, socket) = LspService::new(|client| Backend::new(client, state));

  TowerServer::new(stdin, stdout, socket).serve(service).await;
}
