//! Namespace purge combinator
//!
//! A backend purges one selection at a time and reports an optional error.
//! `purge_all` runs selections in order and collects every error; an empty
//! list means all selections were purged. There is no retry or rollback.

use async_trait::async_trait;
use thiserror::Error;

/// One selection could not be purged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("purge of '{selection}' failed: {reason}")]
pub struct PurgeError {
    pub selection: String,
    pub reason: String,
}

impl PurgeError {
    pub fn new(selection: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            selection: selection.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
pub trait NamespaceOps<S: Send + Sync>: Send + Sync {
    /// Purge everything matched by one selection.
    async fn purge(&self, selection: &S) -> Option<PurgeError>;

    /// Purge all selections in sequence, collecting errors in order.
    async fn purge_all(&self, selections: &[S]) -> Vec<PurgeError> {
        let mut errors = Vec::new();
        for selection in selections {
            if let Some(error) = self.purge(selection).await {
                tracing::warn!(error = %error, "namespace purge failed");
                errors.push(error);
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashmap::DashMap;

    /// In-memory backend: collection name → ids of `namespace:name` documents.
    #[derive(Default)]
    struct InMemoryCollections {
        collections: DashMap<String, Vec<String>>,
        read_only: Vec<String>,
    }

    /// A (collection, namespace) pair.
    struct Selection {
        collection: String,
        namespace: String,
    }

    fn select(collection: &str, namespace: &str) -> Selection {
        Selection {
            collection: collection.to_string(),
            namespace: namespace.to_string(),
        }
    }

    #[async_trait]
    impl NamespaceOps<Selection> for InMemoryCollections {
        async fn purge(&self, selection: &Selection) -> Option<PurgeError> {
            let label = format!("{}/{}", selection.collection, selection.namespace);
            if self.read_only.contains(&selection.collection) {
                return Some(PurgeError::new(label, "collection is read-only"));
            }
            match self.collections.get_mut(&selection.collection) {
                Some(mut docs) => {
                    let prefix = format!("{}:", selection.namespace);
                    docs.retain(|id| !id.starts_with(&prefix));
                    None
                }
                None => Some(PurgeError::new(label, "no such collection")),
            }
        }
    }

    fn backend() -> InMemoryCollections {
        let backend = InMemoryCollections {
            read_only: vec!["journal".to_string()],
            ..Default::default()
        };
        backend.collections.insert(
            "things".to_string(),
            vec!["org.a:t1".into(), "org.b:t2".into(), "org.a:t3".into()],
        );
        backend
            .collections
            .insert("journal".to_string(), vec!["org.a:e1".into()]);
        backend
    }

    #[tokio::test]
    async fn purge_all_succeeds_with_no_errors() {
        let backend = backend();
        let errors = backend.purge_all(&[select("things", "org.a")]).await;
        assert!(errors.is_empty());
        assert_eq!(*backend.collections.get("things").unwrap(), vec!["org.b:t2".to_string()]);
    }

    #[tokio::test]
    async fn purge_all_collects_errors_in_order() {
        let backend = backend();
        let errors = backend
            .purge_all(&[
                select("missing", "org.a"),
                select("things", "org.a"),
                select("journal", "org.a"),
            ])
            .await;

        let selections: Vec<_> = errors.iter().map(|e| e.selection.as_str()).collect();
        assert_eq!(selections, vec!["missing/org.a", "journal/org.a"]);
        // the failure before it did not stop the successful purge
        assert_eq!(backend.collections.get("things").unwrap().len(), 1);
    }

    #[test]
    fn purge_all_of_nothing_is_success() {
        let backend = backend();
        let errors = tokio_test::block_on(backend.purge_all(&[]));
        assert!(errors.is_empty());
    }
}
