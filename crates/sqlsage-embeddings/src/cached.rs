use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use sqlsage_core::{Embeddings, SqlSageError};
use tokio::sync::RwLock;

const DEFAULT_MAX_ENTRIES: usize = 4096;

/// Memoizes document embeddings by input text.
///
/// Re-training the same DDL or documentation within one process only sends
/// unseen texts to the inner provider. Query embeddings are served from the
/// cache when present but never stored. The oldest entries are evicted once
/// `max_entries` is reached.
pub struct CacheBackedEmbeddings {
    inner: Arc<dyn Embeddings>,
    max_entries: usize,
    cache: RwLock<Cache>,
}

#[derive(Default)]
struct Cache {
    vectors: HashMap<String, Vec<f32>>,
    order: VecDeque<String>,
}

impl Cache {
    fn insert(&mut self, text: String, vector: Vec<f32>, max_entries: usize) {
        if max_entries == 0 {
            return;
        }
        if self.vectors.insert(text.clone(), vector).is_none() {
            self.order.push_back(text);
        }
        while self.order.len() > max_entries {
            if let Some(oldest) = self.order.pop_front() {
                self.vectors.remove(&oldest);
            }
        }
    }
}

impl CacheBackedEmbeddings {
    pub fn new(inner: Arc<dyn Embeddings>) -> Self {
        Self::with_max_entries(inner, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(inner: Arc<dyn Embeddings>, max_entries: usize) -> Self {
        Self {
            inner,
            max_entries,
            cache: RwLock::new(Cache::default()),
        }
    }

    /// Number of cached vectors.
    pub async fn len(&self) -> usize {
        self.cache.read().await.vectors.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.cache.read().await.vectors.is_empty()
    }
}

#[async_trait]
impl Embeddings for CacheBackedEmbeddings {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, SqlSageError> {
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut misses: Vec<(usize, &str)> = Vec::new();
        {
            let cache = self.cache.read().await;
            for (i, text) in texts.iter().enumerate() {
                let hit = cache.vectors.get(*text).cloned();
                if hit.is_none() {
                    misses.push((i, text));
                }
                results.push(hit);
            }
        }

        if !misses.is_empty() {
            let miss_texts: Vec<&str> = misses.iter().map(|(_, t)| *t).collect();
            let fresh = self.inner.embed_documents(&miss_texts).await?;
            if fresh.len() != misses.len() {
                return Err(SqlSageError::Embedding(format!(
                    "expected {} embeddings, provider returned {}",
                    misses.len(),
                    fresh.len()
                )));
            }
            tracing::debug!(
                misses = misses.len(),
                hits = texts.len() - misses.len(),
                "embedding cache"
            );

            let mut cache = self.cache.write().await;
            for ((idx, text), embedding) in misses.into_iter().zip(fresh) {
                cache.insert(text.to_string(), embedding.clone(), self.max_entries);
                results[idx] = Some(embedding);
            }
        }

        results
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| SqlSageError::Embedding("embedding cache lost an entry".to_string()))
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, SqlSageError> {
        if let Some(cached) = self.cache.read().await.vectors.get(text) {
            return Ok(cached.clone());
        }
        self.inner.embed_query(text).await
    }
}
