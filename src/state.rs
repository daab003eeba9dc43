use dashmap::DashMap;
use ropey::Rope;
use tower_lsp::lsp_types::Url;
use tracing::debug;

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use crate::documents::ParsedYaml;
use crate::error::{ServiceError, ServiceResult};
use crate::settings::Settings;

/// Per-document state: rope content + cached parse.
pub struct DocumentState {
    pub rope: Rope,
    pub version: i32,
    cached_yaml: Mutex<Option<Arc<ParsedYaml>>>,
}

impl DocumentState {
    pub fn new(rope: Rope, version: i32) -> Self {
        Self {
            rope,
            version,
            cached_yaml: Mutex::new(None),
        }
    }

    /// Get the parsed document, parsing lazily if needed.
    pub fn yaml(&self) -> Arc<ParsedYaml> {
        let mut cache = self
            .cached_yaml
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = cache.as_ref() {
            return cached.clone();
        }
        let parsed = Arc::new(ParsedYaml::parse(&self.rope.to_string()));
        debug!(
            version = self.version,
            documents = parsed.documents.len(),
            "state: parsed document"
        );
        *cache = Some(parsed.clone());
        parsed
    }

    /// Invalidate the cached parse (call after rope mutations).
    pub fn invalidate(&self) {
        *self
            .cached_yaml
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// A consistent view of one open document for the duration of a request.
pub struct Snapshot {
    pub uri: Url,
    pub rope: Rope,
    pub yaml: Arc<ParsedYaml>,
}

impl Snapshot {
    pub fn text(&self) -> String {
        self.rope.to_string()
    }
}

/// Shared backend state for the LSP server.
pub struct BackendState {
    /// In-memory content of open documents, keyed by URI.
    pub documents: DashMap<Url, DocumentState>,

    pub settings: RwLock<Settings>,
}

impl BackendState {
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
            settings: RwLock::new(Settings::default()),
        }
    }

    pub fn open(&self, uri: Url, text: &str, version: i32) {
        self.documents
            .insert(uri, DocumentState::new(Rope::from_str(text), version));
    }

    /// Look up the parsed form of an open document.
    pub fn snapshot(&self, uri: &Url) -> ServiceResult<Snapshot> {
        let doc = self
            .documents
            .get(uri)
            .ok_or_else(|| ServiceError::DocumentUnavailable(uri.clone()))?;
        Ok(Snapshot {
            uri: uri.clone(),
            rope: doc.rope.clone(),
            yaml: doc.yaml(),
        })
    }

    pub fn settings(&self) -> Settings {
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn update_settings(&self, settings: Settings) {
        *self
            .settings
            .write()
            .unwrap_or_else(PoisonError::into_inner) = settings;
    }
}
