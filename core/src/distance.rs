use crate::error::{RecError, Result};
use crate::topics::TopicMatrix;
use crate::RowIndex;
use rayon::prelude::*;

/// Square all-pairs cosine distance matrix over topic-matrix rows.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceMatrix {
    rows: usize,
    data: Vec<f32>, // row-major, rows * rows
}

impl DistanceMatrix {
    pub fn from_raw(rows: usize, data: Vec<f32>) -> Result<Self> {
        if rows.checked_mul(rows) != Some(data.len()) {
            return Err(RecError::ShapeMismatch(format!(
                "{} distances cannot form a {rows}x{rows} matrix",
                data.len()
            )));
        }
        Ok(Self { rows, data })
    }

    pub fn rows(&self) -> usize { self.rows }

    pub fn get(&self, i: RowIndex, j: RowIndex) -> Option<f32> {
        if i >= self.rows || j >= self.rows {
            return None;
        }
        Some(self.data[i * self.rows + j])
    }

    pub fn row(&self, i: RowIndex) -> Option<&[f32]> {
        if i >= self.rows {
            return None;
        }
        Some(&self.data[i * self.rows..(i + 1) * self.rows])
    }

    pub fn as_slice(&self) -> &[f32] { &self.data }

    pub fn into_raw(self) -> (usize, Vec<f32>) { (self.rows, self.data) }
}

/// Cosine distance `1 - cos(a, b)` clamped to `[0, 2]`. A zero vector has
/// similarity 0 with everything, so its distance is 1. `None` when the
/// vectors differ in length.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a = norm(a);
    let norm_b = norm(b);
    if norm_a == 0.0 || norm_b == 0.0 {
        return Some(1.0);
    }
    Some(to_distance(dot / (norm_a * norm_b)))
}

/// All-pairs cosine distances. Rows are computed in parallel; each entry only
/// depends on its own pair, so the result does not depend on scheduling.
pub fn cosine_distances(topics: &TopicMatrix) -> DistanceMatrix {
    let n = topics.rows();
    if n == 0 {
        return DistanceMatrix { rows: 0, data: Vec::new() };
    }

    // Unit rows; zero rows stay zero.
    let unit: Vec<Vec<f64>> = topics
        .iter_rows()
        .map(|row| {
            let len = norm(row);
            row.iter()
                .map(|&w| if len > 0.0 { w as f64 / len } else { 0.0 })
                .collect()
        })
        .collect();

    let mut data = vec![0.0f32; n * n];
    data.par_chunks_mut(n).enumerate().for_each(|(i, out)| {
        let a = &unit[i];
        for (j, slot) in out.iter_mut().enumerate() {
            *slot = if i == j {
                0.0
            } else {
                let dot: f64 = a.iter().zip(&unit[j]).map(|(x, y)| x * y).sum();
                to_distance(dot)
            };
        }
    });

    tracing::debug!(rows = n, cols = topics.cols(), "computed cosine distances");
    DistanceMatrix { rows: n, data }
}

fn norm(v: &[f32]) -> f64 {
    v.iter().map(|&x| x as f64 * x as f64).sum::<f64>().sqrt()
}

fn to_distance(similarity: f64) -> f32 {
    (1.0 - similarity).clamp(0.0, 2.0) as f32
}
