use crate::error::{RecError, Result};
use crate::{RowIndex, TopicId};

/// Weight sums above this are reported but not rejected; models round.
const WEIGHT_SUM_SLACK: f32 = 1e-3;

/// Dense document/topic matrix. Row `i` is the topic vector of the document
/// at [`RowIndex`] `i`; column `t` is [`TopicId`] `t`.
///
/// Immutable once built. A changed weight source means building a new matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>, // row-major
}

impl TopicMatrix {
    /// Densify sparse per-document `(topic, weight)` lists.
    ///
    /// Row order follows `docs`. Pairs missing for a document become `0.0`;
    /// a topic repeated within one document keeps its last weight. Every
    /// topic in `0..num_topics` must be reported by at least one document and
    /// no topic outside that range may appear, otherwise the weights do not
    /// belong to a model with `num_topics` topics and [`RecError::ShapeMismatch`]
    /// is returned.
    pub fn from_weights<D, P>(docs: D, num_topics: usize) -> Result<Self>
    where
        D: IntoIterator<Item = P>,
        P: IntoIterator<Item = (TopicId, f32)>,
    {
        let mut data: Vec<f32> = Vec::new();
        let mut observed = vec![false; num_topics];
        let mut rows = 0usize;

        for (row, doc) in docs.into_iter().enumerate() {
            let mut vector = vec![0.0f32; num_topics];
            for (topic, weight) in doc {
                let col = topic as usize;
                if col >= num_topics {
                    return Err(RecError::ShapeMismatch(format!(
                        "row {row} reports topic {topic} but the model declares {num_topics} topics"
                    )));
                }
                if !weight.is_finite() || weight < 0.0 {
                    return Err(RecError::InvalidWeight { row, topic, weight });
                }
                vector[col] = weight;
                observed[col] = true;
            }
            let sum: f32 = vector.iter().sum();
            if sum > 1.0 + WEIGHT_SUM_SLACK {
                tracing::warn!(row, sum, "topic weights sum above 1");
            }
            data.extend_from_slice(&vector);
            rows += 1;
        }

        let seen = observed.iter().filter(|&&o| o).count();
        if seen != num_topics {
            return Err(RecError::ShapeMismatch(format!(
                "weights report {seen} distinct topics but the model declares {num_topics}"
            )));
        }

        tracing::debug!(rows, cols = num_topics, "built topic matrix");
        Ok(Self { rows, cols: num_topics, data })
    }

    pub fn rows(&self) -> usize { self.rows }

    pub fn cols(&self) -> usize { self.cols }

    pub fn is_empty(&self) -> bool { self.rows == 0 }

    /// Topic vector of one document, `None` past the last row.
    pub fn row(&self, row: RowIndex) -> Option<&[f32]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.cols;
        Some(&self.data[start..start + self.cols])
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f32]> + '_ {
        (0..self.rows).filter_map(move |r| self.row(r))
    }

    pub fn as_slice(&self) -> &[f32] { &self.data }
}
