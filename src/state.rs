use crate::actions::{reduce, Action};
use crate::models::Document;
use crate::storage::Storage;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error};

/// Owns the current document. Every change goes through [`AppState::dispatch`],
/// which swaps in the next snapshot and persists it.
#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<Storage>,
    pub document: Arc<Mutex<Document>>,
}

impl AppState {
    pub fn new(storage: Storage, document: Document) -> Self {
        Self {
            storage: Arc::new(storage),
            document: Arc::new(Mutex::new(document)),
        }
    }

    /// Loads the stored document on the blocking pool and wraps it.
    pub async fn load(storage: Storage) -> Self {
        let storage = Arc::new(storage);
        let reader = Arc::clone(&storage);
        let document = match tokio::task::spawn_blocking(move || reader.load()).await {
            Ok(document) => document,
            Err(err) => {
                error!("loading task failed: {err}");
                Document::empty(Utc::now())
            }
        };
        Self {
            storage,
            document: Arc::new(Mutex::new(document)),
        }
    }

    pub async fn snapshot(&self) -> Document {
        self.document.lock().await.clone()
    }

    /// Applies `action` and persists the result. The lock is held until the
    /// write finishes so stored documents land in dispatch order.
    pub async fn dispatch(&self, action: Action) -> Document {
        let now = Utc::now();
        let mut document = self.document.lock().await;
        let name = action.name();
        let clearing = matches!(action, Action::ClearData);

        let current = std::mem::replace(&mut *document, Document::empty(now));
        *document = reduce(current, action, now);
        debug!(action = name, habits = document.habits.len(), "applied action");

        let storage = Arc::clone(&self.storage);
        let next = document.clone();
        let persisted = tokio::task::spawn_blocking(move || {
            if clearing {
                storage.clear();
            } else {
                storage.save(&next);
            }
        })
        .await;
        if let Err(err) = persisted {
            error!(action = name, "persist task failed: {err}");
        }

        document.clone()
    }
}
