use crate::collection::Document;
use crate::errors::IrexResult;
use crate::store::{StoreProvider, StoreRecord};
use std::sync::Arc;

/// Provider for databases opened without a path. Nothing touches disk.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore;

impl InMemoryStore {
    pub fn new() -> InMemoryStore {
        InMemoryStore
    }
}

impl StoreProvider for InMemoryStore {
    fn load(&self, _collection: &str) -> IrexResult<Vec<Document>> {
        Ok(Vec::new())
    }

    fn flush(
        &self,
        _collection: &str,
        _records: &[StoreRecord],
        _documents: &[Arc<Document>],
    ) -> IrexResult<()> {
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        false
    }

    fn store_name(&self) -> &'static str {
        "in-memory"
    }
}
