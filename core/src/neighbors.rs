use crate::distance::DistanceMatrix;
use crate::error::{RecError, Result};
use crate::RowIndex;
use std::cmp::Ordering;

/// The `k` rows closest to `row`, nearest first.
///
/// `row` itself is never returned, whatever its stored distances say. Ties are
/// broken by the lower row index. Fewer than `k` rows come back only when the
/// matrix has fewer than `k + 1` rows.
pub fn recommend(row: RowIndex, k: usize, distances: &DistanceMatrix) -> Result<Vec<RowIndex>> {
    Ok(nearest(row, k, distances)?.into_iter().map(|(r, _)| r).collect())
}

/// Like [`recommend`], keeping the distance of each neighbour.
pub fn nearest(row: RowIndex, k: usize, distances: &DistanceMatrix) -> Result<Vec<(RowIndex, f32)>> {
    if k < 1 {
        return Err(RecError::InvalidK(k));
    }
    let dists = distances
        .row(row)
        .ok_or(RecError::IndexOutOfRange { index: row, len: distances.rows() })?;

    let mut candidates: Vec<(RowIndex, f32)> = dists
        .iter()
        .copied()
        .enumerate()
        .filter(|(j, _)| *j != row)
        .collect();

    if candidates.len() > k {
        candidates.select_nth_unstable_by(k - 1, by_distance);
        candidates.truncate(k);
    }
    candidates.sort_unstable_by(by_distance);
    Ok(candidates)
}

fn by_distance(a: &(RowIndex, f32), b: &(RowIndex, f32)) -> Ordering {
    a.1.total_cmp(&b.1).then(a.0.cmp(&b.0))
}
