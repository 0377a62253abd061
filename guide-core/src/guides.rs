use async_trait::async_trait;
use std::fmt::Debug;

use crate::model::GuideRecord;

pub mod fallback;
pub mod firestore;

pub use fallback::fallback_guides;
pub use firestore::FirestoreStore;

/// Collection the guide documents live in.
pub const GUIDES_COLLECTION: &str = "guides";

/// Remote document store holding guide documents.
#[async_trait]
pub trait GuideStore: Send + Sync + Debug {
    /// Query all guides, or only those whose `location` equals `location` exactly.
    async fn query_guides(&self, location: Option<&str>) -> anyhow::Result<Vec<GuideRecord>>;
}

#[async_trait]
impl<T: GuideStore + ?Sized> GuideStore for Box<T> {
    async fn query_guides(&self, location: Option<&str>) -> anyhow::Result<Vec<GuideRecord>> {
        (**self).query_guides(location).await
    }
}

/// Store used when no backend is configured; every query fails, so the
/// repository serves the built-in guides.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineStore;

#[async_trait]
impl GuideStore for OfflineStore {
    async fn query_guides(&self, _location: Option<&str>) -> anyhow::Result<Vec<GuideRecord>> {
        Err(anyhow::anyhow!("no backend configured"))
    }
}

/// Resolves guide records from the remote store, substituting the built-in
/// dataset when the store is empty or unreachable.
#[derive(Debug)]
pub struct GuideRepository<S> {
    store: S,
}

impl<S: GuideStore> GuideRepository<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Never fails: store errors and empty results both yield the fallback dataset.
    pub async fn fetch_guides(&self, location: Option<&str>) -> Vec<GuideRecord> {
        let location = location.filter(|l| !l.is_empty());

        match self.store.query_guides(location).await {
            Ok(guides) if !guides.is_empty() => {
                tracing::debug!(count = guides.len(), ?location, "guides loaded from store");
                guides
            }
            Ok(_) => {
                tracing::info!(?location, "no guides found in store, using built-in guides");
                filter_fallback(location)
            }
            Err(err) => {
                tracing::warn!(?location, "guide store error, using built-in guides: {err:#}");
                filter_fallback(location)
            }
        }
    }

    pub async fn find_guide(&self, id: &str) -> Option<GuideRecord> {
        self.fetch_guides(None).await.into_iter().find(|g| g.id == id)
    }
}

fn filter_fallback(location: Option<&str>) -> Vec<GuideRecord> {
    let guides = fallback_guides();

    match location {
        None => guides,
        Some(needle) => {
            let needle = needle.to_lowercase();
            guides
                .into_iter()
                .filter(|g| g.location.to_lowercase().contains(&needle))
                .collect()
        }
    }
}
