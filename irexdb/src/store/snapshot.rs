use crate::collection::Document;
use crate::errors::IrexResult;
use crate::store::{datafile_path, decode_datafile, read_datafile, write_snapshot, StoreProvider, StoreRecord};
use std::path::PathBuf;
use std::sync::Arc;

/// Provider that rewrites the whole datafile on every flush.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
    corrupt_threshold: f64,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>, corrupt_threshold: f64) -> SnapshotStore {
        SnapshotStore {
            dir: dir.into(),
            corrupt_threshold,
        }
    }
}

impl StoreProvider for SnapshotStore {
    fn load(&self, collection: &str) -> IrexResult<Vec<Document>> {
        let path = datafile_path(&self.dir, collection);
        let content = match read_datafile(&path)? {
            Some(content) => content,
            None => return Ok(Vec::new()),
        };

        let decoded = decode_datafile(&path.display().to_string(), &content, self.corrupt_threshold)?;
        log::debug!(
            "Loaded {} documents for collection {} from {}",
            decoded.documents.len(),
            collection,
            path.display()
        );
        Ok(decoded.into_documents())
    }

    fn flush(
        &self,
        collection: &str,
        records: &[StoreRecord],
        documents: &[Arc<Document>],
    ) -> IrexResult<()> {
        let path = datafile_path(&self.dir, collection);
        write_snapshot(&self.dir, &path, documents)?;
        log::debug!(
            "Wrote snapshot of {} documents ({} changes) to {}",
            documents.len(),
            records.len(),
            path.display()
        );
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        true
    }

    fn store_name(&self) -> &'static str {
        "snapshot"
    }
}
