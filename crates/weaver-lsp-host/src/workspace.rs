//! Binds a workspace root and language to a running server and its documents.

use std::fmt;
use std::path::{Path, PathBuf};

use lsp_types::{DidOpenTextDocumentParams, TextDocumentItem, Uri};

use crate::capability::{CapabilityKind, CapabilitySummary, resolve_capabilities};
use crate::document::DocumentRegistry;
use crate::errors::{HostOperation, LspHostError};
use crate::language::Language;
use crate::server::{LanguageServer, LanguageServerError};

/// Identifies a workspace by its canonical root directory and language.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkspaceKey {
    root: PathBuf,
    language: Language,
}

impl WorkspaceKey {
    /// Builds a key from a workspace root and language.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, language: Language) -> Self {
        Self {
            root: root.into(),
            language,
        }
    }

    /// The workspace root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The language bound to this workspace.
    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }
}

impl fmt::Display for WorkspaceKey {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.language, self.root.display())
    }
}

enum ServerState {
    Pending,
    Ready { summary: CapabilitySummary },
}

/// A workspace root bound to a single running language server instance.
///
/// Owns the server's document registry alongside the server handle so that
/// closing a workspace tears down both together.
pub struct Workspace {
    key: WorkspaceKey,
    server: Box<dyn LanguageServer>,
    state: ServerState,
    documents: DocumentRegistry,
}

impl Workspace {
    /// Builds a workspace that has not yet been initialised.
    #[must_use]
    pub fn new(key: WorkspaceKey, server: Box<dyn LanguageServer>) -> Self {
        Self {
            key,
            server,
            state: ServerState::Pending,
            documents: DocumentRegistry::new(),
        }
    }

    /// The key identifying this workspace.
    #[must_use]
    pub fn key(&self) -> &WorkspaceKey {
        &self.key
    }

    /// The documents currently tracked for this workspace's server.
    #[must_use]
    pub fn documents(&self) -> &DocumentRegistry {
        &self.documents
    }

    /// Mutable access to the tracked documents.
    pub fn documents_mut(&mut self) -> &mut DocumentRegistry {
        &mut self.documents
    }

    /// Ensures a document is open against this workspace's server, sending
    /// `textDocument/didOpen` only the first time it is requested.
    ///
    /// # Errors
    ///
    /// Returns an error if the `didOpen` notification fails. Succeeds as a
    /// no-op if the document is already tracked open.
    pub fn ensure_document_open(
        &mut self,
        uri: &Uri,
        text: impl Into<String>,
        language_id: impl Into<String>,
    ) -> Result<(), LspHostError> {
        if self.documents.get(uri).is_some() {
            return Ok(());
        }

        let text = text.into();
        let language_id = language_id.into();

        self.server
            .did_open(DidOpenTextDocumentParams {
                text_document: TextDocumentItem {
                    uri: uri.clone(),
                    language_id: language_id.clone(),
                    version: 1,
                    text: text.clone(),
                },
            })
            .map_err(|source| LspHostError::server(self.key.language, HostOperation::DidOpen, source))?;

        // Already confirmed not open above.
        let _ = self.documents.open(uri, text, language_id);
        Ok(())
    }

    /// Ensures the server has completed its initialization handshake.
    pub fn ensure_initialized(
        &mut self,
        overrides: &weaver_config::CapabilityMatrix,
    ) -> Result<CapabilitySummary, LspHostError> {
        match &self.state {
            ServerState::Ready { summary } => Ok(summary.clone()),
            ServerState::Pending => {
                let advertised = self.server.initialize().map_err(|source| {
                    LspHostError::server(self.key.language, HostOperation::Initialise, source)
                })?;
                let summary = resolve_capabilities(self.key.language, advertised, overrides);
                self.state = ServerState::Ready {
                    summary: summary.clone(),
                };
                Ok(summary)
            }
        }
    }

    /// Returns the resolved capabilities, if initialization already ran.
    #[must_use]
    pub fn capabilities(&self) -> Option<CapabilitySummary> {
        match &self.state {
            ServerState::Ready { summary } => Some(summary.clone()),
            ServerState::Pending => None,
        }
    }

    /// Checks that a capability is enabled before dispatching a call.
    pub fn require_capability(
        &self,
        summary: &CapabilitySummary,
        capability: CapabilityKind,
    ) -> Result<(), LspHostError> {
        let state = summary.state(capability);
        if state.enabled {
            Ok(())
        } else {
            Err(LspHostError::capability_unavailable(
                self.key.language,
                capability,
                state.source,
            ))
        }
    }

    /// Provides mutable access to the underlying server for dispatching calls.
    pub fn server_mut(&mut self) -> &mut dyn LanguageServer {
        self.server.as_mut()
    }

    /// Shuts down the server, consuming the workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to shut down gracefully.
    pub fn stop(mut self) -> Result<(), LanguageServerError> {
        self.server.shutdown()
    }
}

#[cfg(test)]
mod tests {
    use lsp_types::{
        CallHierarchyIncomingCall, CallHierarchyIncomingCallsParams, CallHierarchyItem,
        CallHierarchyOutgoingCall, CallHierarchyOutgoingCallsParams, CallHierarchyPrepareParams,
        Diagnostic, DidChangeTextDocumentParams, DidCloseTextDocumentParams,
        DidOpenTextDocumentParams, GotoDefinitionParams, GotoDefinitionResponse, ReferenceParams,
        Uri,
    };
    use rstest::rstest;

    use super::*;
    use crate::server::ServerCapabilitySet;

    struct StubServer {
        capabilities: ServerCapabilitySet,
    }

    impl LanguageServer for StubServer {
        fn initialize(&mut self) -> Result<ServerCapabilitySet, LanguageServerError> {
            Ok(self.capabilities)
        }
        fn goto_definition(
            &mut self,
            _params: GotoDefinitionParams,
        ) -> Result<GotoDefinitionResponse, LanguageServerError> {
            Ok(GotoDefinitionResponse::Array(Vec::new()))
        }
        fn references(
            &mut self,
            _params: ReferenceParams,
        ) -> Result<Vec<lsp_types::Location>, LanguageServerError> {
            Ok(Vec::new())
        }
        fn diagnostics(&mut self, _uri: Uri) -> Result<Vec<Diagnostic>, LanguageServerError> {
            Ok(Vec::new())
        }
        fn document_symbols(
            &mut self,
            _uri: Uri,
        ) -> Result<Option<lsp_types::DocumentSymbolResponse>, LanguageServerError> {
            Ok(None)
        }
        fn prepare_call_hierarchy(
            &mut self,
            _params: CallHierarchyPrepareParams,
        ) -> Result<Option<Vec<CallHierarchyItem>>, LanguageServerError> {
            Ok(None)
        }
        fn incoming_calls(
            &mut self,
            _params: CallHierarchyIncomingCallsParams,
        ) -> Result<Option<Vec<CallHierarchyIncomingCall>>, LanguageServerError> {
            Ok(None)
        }
        fn outgoing_calls(
            &mut self,
            _params: CallHierarchyOutgoingCallsParams,
        ) -> Result<Option<Vec<CallHierarchyOutgoingCall>>, LanguageServerError> {
            Ok(None)
        }
        fn did_open(
            &mut self,
            _params: DidOpenTextDocumentParams,
        ) -> Result<(), LanguageServerError> {
            Ok(())
        }
        fn did_change(
            &mut self,
            _params: DidChangeTextDocumentParams,
        ) -> Result<(), LanguageServerError> {
            Ok(())
        }
        fn did_close(
            &mut self,
            _params: DidCloseTextDocumentParams,
        ) -> Result<(), LanguageServerError> {
            Ok(())
        }
    }

    #[rstest]
    fn initializes_once_and_caches_summary() {
        let key = WorkspaceKey::new("/repo", Language::Rust);
        let server = StubServer {
            capabilities: ServerCapabilitySet::new(true, true, false),
        };
        let mut workspace = Workspace::new(key, Box::new(server));
        let overrides = weaver_config::CapabilityMatrix::default();

        let first = workspace.ensure_initialized(&overrides).expect("init failed");
        let second = workspace.ensure_initialized(&overrides).expect("init failed");
        assert_eq!(first, second);
        assert!(first.state(CapabilityKind::Definition).enabled);
        assert!(!first.state(CapabilityKind::Diagnostics).enabled);
    }

    #[rstest]
    fn rejects_calls_when_capability_disabled() {
        let key = WorkspaceKey::new("/repo", Language::Rust);
        let server = StubServer {
            capabilities: ServerCapabilitySet::new(false, true, false),
        };
        let mut workspace = Workspace::new(key, Box::new(server));
        let overrides = weaver_config::CapabilityMatrix::default();
        let summary = workspace.ensure_initialized(&overrides).expect("init failed");

        let result = workspace.require_capability(&summary, CapabilityKind::Definition);
        assert!(matches!(
            result,
            Err(LspHostError::CapabilityUnavailable { .. })
        ));
    }
}
