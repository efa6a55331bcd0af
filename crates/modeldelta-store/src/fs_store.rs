//! File-backed persistence for graphs and delta documents
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/graphs/<locator>.json      named graph files, overwritten on save
//! <root>/deltas/<ab>/<digest>.json  delta documents, content-addressed
//! ```

use crate::cas::atomic::atomic_write;
use crate::cas::ContentStore;
use crate::errors::{from_serde, graph_missing, invalid_locator, io_error, Result};
use modeldelta_core::delta::Document;
use modeldelta_core::errors::MdError;
use modeldelta_core::rules::validate_graph;
use modeldelta_core::Graph;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Filesystem store rooted at one directory
#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
    deltas: ContentStore,
}

impl FsStore {
    /// Create a store at the given root directory
    ///
    /// Directories are created lazily on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let deltas = ContentStore::new(root.join("deltas"), "json");
        Self { root, deltas }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Save `graph` under `locator`, replacing any previous version
    ///
    /// # Errors
    /// Fails on an invalid locator or when the file cannot be written.
    pub fn save_graph(&self, graph: &Graph, locator: &str) -> Result<PathBuf> {
        let path = self.graph_path(locator)?;
        let bytes = serde_json::to_vec_pretty(graph).map_err(|e| from_serde("save_graph", e))?;
        atomic_write(&path, &bytes)?;
        tracing::debug!(locator, path = %path.display(), "saved graph");
        Ok(path)
    }

    /// Load the graph saved under `locator`
    ///
    /// The graph is structurally validated before it is returned.
    ///
    /// # Errors
    /// `NotFound` when nothing is stored under `locator`; `Serialization`
    /// for unreadable files; a structural error kind when validation fails.
    pub fn load_graph(&self, locator: &str) -> Result<Graph> {
        let path = self.graph_path(locator)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(graph_missing(locator)),
            Err(e) => return Err(io_error("load_graph", e)),
        };
        let graph: Graph =
            serde_json::from_slice(&bytes).map_err(|e| from_serde("load_graph", e))?;
        validate_graph(&graph).map_err(|e| MdError::from(e).with_op("load_graph"))?;
        Ok(graph)
    }

    /// Store a delta document and return its digest
    ///
    /// The digest equals [`Document::digest`]; saving the same document
    /// twice is a no-op.
    ///
    /// # Errors
    /// Fails when the document cannot be encoded or written.
    pub fn save_document(&self, document: &Document) -> Result<String> {
        let bytes = document
            .to_bytes()
            .map_err(|e| MdError::from(e).with_op("save_document"))?;
        let digest = self.deltas.write(&bytes)?;
        tracing::debug!(digest = %digest, session_id = %document.session_id, "saved delta document");
        Ok(digest)
    }

    /// Load the delta document stored under `digest`
    ///
    /// # Errors
    /// `NotFound` for unknown digests; decode errors for documents this
    /// reader does not understand.
    pub fn load_document(&self, digest: &str) -> Result<Document> {
        let bytes = self.deltas.read(digest)?;
        Document::from_bytes(&bytes).map_err(|e| MdError::from(e).with_op("load_document"))
    }

    pub fn has_document(&self, digest: &str) -> bool {
        self.deltas.contains(digest)
    }

    fn graph_path(&self, locator: &str) -> Result<PathBuf> {
        let valid = !locator.is_empty()
            && !locator.starts_with('.')
            && locator
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(invalid_locator(locator));
        }
        Ok(self.root.join("graphs").join(format!("{}.json", locator)))
    }
}
