//! Topic-space nearest-neighbour recommendations.
//!
//! Documents are compared by the cosine distance between their rows in a dense
//! document/topic matrix. The all-pairs distance matrix is expensive, so it is
//! persisted per [`CacheKey`] and reused across process runs.

pub mod cache;
pub mod distance;
pub mod error;
pub mod ids;
pub mod key;
pub mod neighbors;
pub mod persist;
pub mod recommender;
pub mod topics;

pub use cache::{BuildOutcome, CacheSource, DistanceCache};
pub use distance::DistanceMatrix;
pub use error::{RecError, Result};
pub use ids::IdIndex;
pub use key::CacheKey;
pub use recommender::{Recommendation, Recommender};
pub use topics::TopicMatrix;

/// External catalog identifier of a recommendable item.
pub type DocumentId = u64;
/// Zero-based position of a document in the topic matrix and identifier list.
pub type RowIndex = usize;
/// Model-assigned topic identifier.
pub type TopicId = u32;

/// Sparse topic weights for one document, as reported by the topic model.
pub type DocTopics = Vec<(TopicId, f32)>;
