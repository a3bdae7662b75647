//! In-memory tracking of documents opened against a language server.

use std::collections::HashMap;

use lsp_types::Uri;
use thiserror::Error;

/// A single open document's version and in-memory content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenDocument {
    /// Monotonically increasing version supplied by the client.
    pub version: i32,
    /// Full in-memory text of the document.
    pub text: String,
    /// LSP language identifier (e.g. `"rust"`).
    pub language_id: String,
}

impl OpenDocument {
    /// Builds a document snapshot at version 1.
    #[must_use]
    pub fn new(text: impl Into<String>, language_id: impl Into<String>) -> Self {
        Self {
            version: 1,
            text: text.into(),
            language_id: language_id.into(),
        }
    }
}

/// Errors returned by [`DocumentRegistry`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentRegistryError {
    /// The document was not open.
    #[error("document {uri} is not open")]
    NotOpen {
        /// The URI that was not found.
        uri: String,
    },

    /// The document was already open.
    #[error("document {uri} is already open")]
    AlreadyOpen {
        /// The URI that was already tracked.
        uri: String,
    },

    /// An update referenced a version that does not advance the document.
    #[error("document {uri} received non-increasing version {version}")]
    StaleVersion {
        /// The URI whose version did not advance.
        uri: String,
        /// The version that was rejected.
        version: i32,
    },
}

/// Tracks the in-memory state of documents opened within a workspace.
///
/// Mirrors the subset of document synchronisation state a language server
/// needs: URI, version, full text, and language identifier. Full-text sync is
/// assumed; incremental ranges are applied to produce the new full text
/// before being recorded here.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    documents: HashMap<String, OpenDocument>,
}

impl DocumentRegistry {
    /// Builds an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            documents: HashMap::new(),
        }
    }

    /// Records that a document has been opened.
    pub fn open(
        &mut self,
        uri: &Uri,
        text: impl Into<String>,
        language_id: impl Into<String>,
    ) -> Result<(), DocumentRegistryError> {
        let key = uri.as_str().to_string();
        if self.documents.contains_key(&key) {
            return Err(DocumentRegistryError::AlreadyOpen { uri: key });
        }
        self.documents
            .insert(key, OpenDocument::new(text, language_id));
        Ok(())
    }

    /// Updates a document's content and version.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentRegistryError::NotOpen`] if the document was never
    /// opened, or [`DocumentRegistryError::StaleVersion`] if `version` does
    /// not strictly increase over the tracked version.
    pub fn update(
        &mut self,
        uri: &Uri,
        version: i32,
        text: impl Into<String>,
    ) -> Result<(), DocumentRegistryError> {
        let key = uri.as_str().to_string();
        let document = self
            .documents
            .get_mut(&key)
            .ok_or_else(|| DocumentRegistryError::NotOpen { uri: key.clone() })?;
        if version <= document.version {
            return Err(DocumentRegistryError::StaleVersion { uri: key, version });
        }
        document.version = version;
        document.text = text.into();
        Ok(())
    }

    /// Removes a document from tracking.
    pub fn close(&mut self, uri: &Uri) -> Result<OpenDocument, DocumentRegistryError> {
        let key = uri.as_str().to_string();
        self.documents
            .remove(&key)
            .ok_or(DocumentRegistryError::NotOpen { uri: key })
    }

    /// Returns the tracked state for a document, if open.
    #[must_use]
    pub fn get(&self, uri: &Uri) -> Option<&OpenDocument> {
        self.documents.get(uri.as_str())
    }

    /// Whether any documents are currently tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Number of documents currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rstest::rstest;

    use super::*;

    fn uri(path: &str) -> Uri {
        Uri::from_str(path).expect("valid uri")
    }

    #[rstest]
    fn opens_and_reads_document() {
        let mut registry = DocumentRegistry::new();
        registry
            .open(&uri("file:///a.rs"), "fn main() {}", "rust")
            .expect("open failed");

        let document = registry.get(&uri("file:///a.rs")).expect("missing document");
        assert_eq!(document.version, 1);
        assert_eq!(document.text, "fn main() {}");
    }

    #[rstest]
    fn rejects_duplicate_open() {
        let mut registry = DocumentRegistry::new();
        registry
            .open(&uri("file:///a.rs"), "fn main() {}", "rust")
            .expect("open failed");

        let result = registry.open(&uri("file:///a.rs"), "fn main() {}", "rust");
        assert!(matches!(
            result,
            Err(DocumentRegistryError::AlreadyOpen { .. })
        ));
    }

    #[rstest]
    fn updates_advance_version() {
        let mut registry = DocumentRegistry::new();
        registry
            .open(&uri("file:///a.rs"), "fn main() {}", "rust")
            .expect("open failed");
        registry
            .update(&uri("file:///a.rs"), 2, "fn main() { println!(); }")
            .expect("update failed");

        let document = registry.get(&uri("file:///a.rs")).expect("missing document");
        assert_eq!(document.version, 2);
    }

    #[rstest]
    fn rejects_stale_version() {
        let mut registry = DocumentRegistry::new();
        registry
            .open(&uri("file:///a.rs"), "fn main() {}", "rust")
            .expect("open failed");

        let result = registry.update(&uri("file:///a.rs"), 1, "fn main() {}");
        assert!(matches!(
            result,
            Err(DocumentRegistryError::StaleVersion { .. })
        ));
    }

    #[rstest]
    fn closing_unknown_document_errors() {
        let mut registry = DocumentRegistry::new();
        let result = registry.close(&uri("file:///missing.rs"));
        assert!(matches!(result, Err(DocumentRegistryError::NotOpen { .. })));
    }
}
