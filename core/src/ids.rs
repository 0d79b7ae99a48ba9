use crate::error::{RecError, Result};
use crate::{DocumentId, RowIndex};
use std::collections::HashMap;

/// Bijection between catalog ids and topic-matrix rows for one corpus snapshot.
#[derive(Debug, Clone, Default)]
pub struct IdIndex {
    ids: Vec<DocumentId>,
    rows: HashMap<DocumentId, RowIndex>,
}

impl IdIndex {
    /// Rows are assigned by enumerating `ids` in order. A repeated id is an
    /// error rather than being collapsed.
    pub fn build<I: IntoIterator<Item = DocumentId>>(ids: I) -> Result<Self> {
        let ids: Vec<DocumentId> = ids.into_iter().collect();
        let mut rows = HashMap::with_capacity(ids.len());
        for (row, &id) in ids.iter().enumerate() {
            if rows.insert(id, row).is_some() {
                return Err(RecError::DuplicateIdentifier(id));
            }
        }
        Ok(Self { ids, rows })
    }

    pub fn row_of(&self, id: DocumentId) -> Result<RowIndex> {
        self.rows.get(&id).copied().ok_or(RecError::UnknownIdentifier(id))
    }

    pub fn id_of(&self, row: RowIndex) -> Result<DocumentId> {
        self.ids
            .get(row)
            .copied()
            .ok_or(RecError::IndexOutOfRange { index: row, len: self.ids.len() })
    }

    pub fn ids_of(&self, rows: &[RowIndex]) -> Result<Vec<DocumentId>> {
        rows.iter().map(|&r| self.id_of(r)).collect()
    }

    pub fn contains(&self, id: DocumentId) -> bool { self.rows.contains_key(&id) }

    pub fn ids(&self) -> &[DocumentId] { &self.ids }

    pub fn len(&self) -> usize { self.ids.len() }

    pub fn is_empty(&self) -> bool { self.ids.is_empty() }
}
