use std::sync::Arc;

use esfinteres_core::{AccessGate, FamilyResolver, RecordStore};
use esfinteres_sheets::SheetStore;

use crate::config::AppConfig;
use crate::session::SessionKeys;

/// Shared application state, passed to all handlers via Axum's `State` extractor.
/// Wrapped in `Arc` so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<InnerState>,
}

struct InnerState {
    store: RecordStore,
    gate: AccessGate,
    family: FamilyResolver,
    sessions: SessionKeys,
    config: AppConfig,
}

impl AppState {
    pub fn new(sheets: Arc<dyn SheetStore>, config: AppConfig) -> Self {
        let store = RecordStore::new(sheets);
        Self {
            inner: Arc::new(InnerState {
                gate: AccessGate::new(store.clone()),
                family: FamilyResolver::new(store.clone()),
                sessions: SessionKeys::new(&config.jwt_secret, config.session_ttl_hours),
                store,
                config,
            }),
        }
    }

    pub fn store(&self) -> &RecordStore {
        &self.inner.store
    }

    pub fn gate(&self) -> &AccessGate {
        &self.inner.gate
    }

    pub fn family(&self) -> &FamilyResolver {
        &self.inner.family
    }

    pub fn sessions(&self) -> &SessionKeys {
        &self.inner.sessions
    }

    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }
}
