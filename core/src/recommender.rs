use crate::cache::{CacheSource, DistanceCache};
use crate::distance::DistanceMatrix;
use crate::error::{RecError, Result};
use crate::ids::IdIndex;
use crate::key::CacheKey;
use crate::neighbors;
use crate::persist::{load_resources, ModelManifest, ResourcePaths, Resources};
use crate::topics::TopicMatrix;
use crate::{DocTopics, DocumentId};
use serde::Serialize;
use std::sync::Arc;

const CATALOG_URL: &str = "https://www.gutenberg.org/ebooks";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub document_id: DocumentId,
    pub distance: f32,
}

impl Recommendation {
    /// Catalog page of the recommended item.
    pub fn link(&self) -> String {
        format!("{CATALOG_URL}/{}", self.document_id)
    }
}

/// Loaded resources kept in memory between recommendations.
pub struct Recommender {
    manifest: ModelManifest,
    index: IdIndex,
    topics: TopicMatrix,
    distances: Arc<DistanceMatrix>,
    key: CacheKey,
    source: CacheSource,
}

impl Recommender {
    pub fn load(paths: &ResourcePaths, cache: &DistanceCache) -> Result<Self> {
        let Resources { manifest, topic_weights, ids } = load_resources(paths)?;
        Self::from_parts(manifest, topic_weights, ids, cache)
    }

    pub fn from_parts(
        manifest: ModelManifest,
        topic_weights: Vec<DocTopics>,
        ids: Vec<DocumentId>,
        cache: &DistanceCache,
    ) -> Result<Self> {
        if topic_weights.len() != ids.len() {
            return Err(RecError::ShapeMismatch(format!(
                "{} ids for {} topic weight rows",
                ids.len(),
                topic_weights.len()
            )));
        }
        let key = CacheKey::derive(&manifest, &ids, &topic_weights);
        let topics = TopicMatrix::from_weights(
            topic_weights.iter().map(|doc| doc.iter().copied()),
            manifest.num_topics,
        )?;
        let index = IdIndex::build(ids)?;

        let outcome = cache.get_or_build(&topics, &key);
        if let Some(err) = &outcome.store_error {
            tracing::warn!(cache_key = %key, error = %err, "serving uncached distance matrix");
        }
        Ok(Self {
            manifest,
            index,
            topics,
            distances: outcome.matrix,
            key,
            source: outcome.source,
        })
    }

    /// The `k` documents nearest to `document_id`, nearest first.
    pub fn recommend(&self, document_id: DocumentId, k: usize) -> Result<Vec<Recommendation>> {
        let row = self.index.row_of(document_id)?;
        neighbors::nearest(row, k, &self.distances)?
            .into_iter()
            .map(|(r, distance)| Ok(Recommendation { document_id: self.index.id_of(r)?, distance }))
            .collect()
    }

    pub fn topic_vector(&self, document_id: DocumentId) -> Result<&[f32]> {
        let row = self.index.row_of(document_id)?;
        self.topics
            .row(row)
            .ok_or(RecError::IndexOutOfRange { index: row, len: self.topics.rows() })
    }

    pub fn row_of(&self, document_id: DocumentId) -> Result<usize> { self.index.row_of(document_id) }

    pub fn cache_key(&self) -> &CacheKey { &self.key }

    pub fn cache_source(&self) -> CacheSource { self.source }

    pub fn manifest(&self) -> &ModelManifest { &self.manifest }

    pub fn distances(&self) -> Arc<DistanceMatrix> { Arc::clone(&self.distances) }

    pub fn len(&self) -> usize { self.index.len() }

    pub fn is_empty(&self) -> bool { self.index.is_empty() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn link_points_at_catalog() {
        let r = Recommendation { document_id: 174, distance: 0.1 };
        assert_eq!(r.link(), "https://www.gutenberg.org/ebooks/174");
    }

    #[test]
    fn mismatched_ids_are_rejected_before_building() {
        let dir = tempdir().unwrap();
        let cache = DistanceCache::new(dir.path());
        let manifest = ModelManifest { name: "m".into(), num_topics: 1, version: None };
        let err = Recommender::from_parts(manifest, vec![vec![(0, 1.0)]], vec![1, 2], &cache).err().unwrap();
        assert!(matches!(err, RecError::ShapeMismatch(_)));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
