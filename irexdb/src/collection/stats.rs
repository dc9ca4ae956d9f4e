use std::collections::BTreeMap;

use crate::collection::Document;

/// Aggregate statistics over a collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionStats {
    /// Number of stored documents.
    pub document_count: usize,
    /// Sum of the documents' encoded JSON lengths in bytes.
    pub approximate_size: usize,
    /// How many documents carry each leaf field path, `_id` excluded.
    pub field_counts: BTreeMap<String, usize>,
}

impl CollectionStats {
    pub(crate) fn compute<'a>(documents: impl Iterator<Item = &'a Document>) -> CollectionStats {
        let mut stats = CollectionStats::default();
        for doc in documents {
            stats.document_count += 1;
            // an encoding failure only skews the estimate
            stats.approximate_size += doc.to_json().map(|json| json.len()).unwrap_or(0);
            for field in doc.fields() {
                *stats.field_counts.entry(field).or_insert(0) += 1;
            }
        }
        stats
    }
}
