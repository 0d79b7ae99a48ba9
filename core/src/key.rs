use crate::persist::ModelManifest;
use crate::{DocTopics, DocumentId};
use sha1::{Digest, Sha1};
use std::fmt;

/// Identifies the (model, corpus) pairing a distance matrix was computed for.
///
/// Derived keys are `<model name>-<sha1>`; the digest covers the manifest,
/// the id order and every weight bit, so any change to what would end up in
/// the topic matrix produces a different key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

/// Longest readable prefix kept in a file stem.
const STEM_PREFIX_LEN: usize = 48;

impl CacheKey {
    /// Wrap a caller-chosen token as is. Two tokens are the same key only if
    /// they are the same string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn derive(manifest: &ModelManifest, ids: &[DocumentId], weights: &[DocTopics]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(manifest.name.as_bytes());
        hasher.update([0u8]);
        hasher.update(manifest.version.as_deref().unwrap_or("").as_bytes());
        hasher.update([0u8]);
        hasher.update((manifest.num_topics as u64).to_le_bytes());
        hasher.update((ids.len() as u64).to_le_bytes());
        for id in ids {
            hasher.update(id.to_le_bytes());
        }
        for doc in weights {
            hasher.update((doc.len() as u64).to_le_bytes());
            for (topic, weight) in doc {
                hasher.update(topic.to_le_bytes());
                hasher.update(weight.to_bits().to_le_bytes());
            }
        }
        Self(format!("{}-{:x}", manifest.name, hasher.finalize()))
    }

    pub fn as_str(&self) -> &str { &self.0 }

    /// File-system safe stem: a sanitized prefix of the key for readability
    /// followed by the sha1 of the full key, so distinct keys never share a
    /// stem.
    pub fn file_stem(&self) -> String {
        let prefix: String = sanitize(&self.0).chars().take(STEM_PREFIX_LEN).collect();
        let mut hasher = Sha1::new();
        hasher.update(self.0.as_bytes());
        format!("{prefix}-{:x}", hasher.finalize())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn sanitize(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') { c } else { '_' })
        .collect();
    if cleaned.is_empty() { "_".to_string() } else { cleaned }
}
