//! LSP server implementation.

use std::sync::Arc;

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use hdlint_types::SourcePath;

use crate::convert::to_lsp_diagnostic;
use crate::state::LspState;

pub struct Backend {
  client: Client,
  state: Arc<LspState>,
}

impl Backend {
  pub fn new(
    client: Client,
    state: Arc<LspState>,
  ) -> Self {
    Self { client, state }
  }

  fn source_path(uri: &Url) -> Option<SourcePath> {
    uri.to_file_path().ok().map(SourcePath::absolute)
  }

  /// Runs the engine on one file and publishes the result.
  async fn check_and_publish(
    &self,
    uri: Url,
  ) {
    let Some(path) = Self::source_path(&uri) else {
      return;
    };

    let diagnostics = {
      let guard = self.state.project.read().await;
      let Some(project) = guard.as_ref() else {
        return;
      };
      project.diagnostics(&path)
    };

    let published = diagnostics
      .iter()
      .filter(|d| d.path.as_ref() == Some(&path))
      .map(to_lsp_diagnostic)
      .collect();

    self.client.publish_diagnostics(uri, published, None).await;
  }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
  async fn initialize(
    &self,
    params: InitializeParams,
  ) -> Result<InitializeResult> {
    if let Some(root_uri) = params.root_uri {
      if let Ok(root) = root_uri.to_file_path() {
        self.state.open_workspace(&root).await;
      }
    }

    Ok(InitializeResult {
      capabilities: ServerCapabilities {
        text_document_sync: Some(TextDocumentSyncCapability::Kind(TextDocumentSyncKind::NONE)),
        definition_provider: Some(OneOf::Left(true)),
        hover_provider: Some(HoverProviderCapability::Simple(true)),
        ..Default::default()
      },
      server_info: Some(ServerInfo {
        name: "hdlint".to_string(),
        version: Some(env!("CARGO_PKG_VERSION").to_string()),
      }),
    })
  }

  async fn initialized(
    &self,
    _: InitializedParams,
  ) {
    self.client.log_message(MessageType::INFO, "hdlint ready").await;
  }

  async fn shutdown(&self) -> Result<()> {
    if let Some(project) = self.state.project.read().await.as_ref() {
      project.shutdown();
    }
    Ok(())
  }

  async fn did_open(
    &self,
    params: DidOpenTextDocumentParams,
  ) {
    self.check_and_publish(params.text_document.uri).await;
  }

  async fn did_save(
    &self,
    params: DidSaveTextDocumentParams,
  ) {
    self.check_and_publish(params.text_document.uri).await;
  }

  async fn did_close(
    &self,
    params: DidCloseTextDocumentParams,
  ) {
    // Clear stale squiggles; the next open re-checks.
    self.client.publish_diagnostics(params.text_document.uri, Vec::new(), None).await;
  }

  async fn goto_definition(
    &self,
    params: GotoDefinitionParams,
  ) -> Result<Option<GotoDefinitionResponse>> {
    let uri = params.text_document_position_params.text_document.uri;
    let position = params.text_document_position_params.position;

    let Some(path) = Self::source_path(&uri) else {
      return Ok(None);
    };

    let found = {
      let guard = self.state.project.read().await;
      let Some(project) = guard.as_ref() else {
        return Ok(None);
      };
      project.definition(&path, hdlint_types::Location::new(position.line, position.character))
    };

    let locations: Vec<Location> = found
      .into_iter()
      .filter_map(|(owner, location)| {
        let uri = Url::from_file_path(owner.as_path()).ok()?;
        let position = Position::new(location.line, location.column);
        Some(Location::new(uri, Range::new(position, position)))
      })
      .collect();

    if locations.is_empty() {
      Ok(None)
    } else {
      Ok(Some(GotoDefinitionResponse::Array(locations)))
    }
  }

  async fn hover(
    &self,
    params: HoverParams,
  ) -> Result<Option<Hover>> {
    let uri = params.text_document_position_params.text_document.uri;
    let position = params.text_document_position_params.position;

    let Some(path) = Self::source_path(&uri) else {
      return Ok(None);
    };

    let text = {
      let guard = self.state.project.read().await;
      let Some(project) = guard.as_ref() else {
        return Ok(None);
      };
      project.hover(&path, hdlint_types::Location::new(position.line, position.character))
    };

    Ok(text.map(|value| Hover {
      contents: HoverContents::Scalar(MarkedString::String(value)),
      range: None,
    }))
  }
}
