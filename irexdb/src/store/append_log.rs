use crate::collection::Document;
use crate::errors::IrexResult;
use crate::store::{
    append_records, datafile_path, decode_datafile, read_datafile, write_snapshot, StoreProvider,
    DatafileFormat, StoreRecord,
};
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Provider that appends changed documents and deletion markers.
///
/// Once more than `compaction_threshold` records have been appended to a
/// collection's datafile since it was last compacted, the next flush rewrites
/// it as a snapshot instead. Loading a datafile with superseded, deleted or
/// corrupt lines compacts it right away, and so does loading a JSON array
/// datafile, since records can only be appended to line-delimited content.
#[derive(Debug, Clone)]
pub struct AppendLogStore {
    inner: Arc<AppendLogStoreInner>,
}

#[derive(Debug)]
struct AppendLogStoreInner {
    dir: PathBuf,
    corrupt_threshold: f64,
    compaction_threshold: usize,
    appended: DashMap<String, usize>,
}

impl AppendLogStore {
    pub fn new(dir: impl Into<PathBuf>, corrupt_threshold: f64, compaction_threshold: usize) -> AppendLogStore {
        AppendLogStore {
            inner: Arc::new(AppendLogStoreInner {
                dir: dir.into(),
                corrupt_threshold,
                compaction_threshold,
                appended: DashMap::new(),
            }),
        }
    }

    /// Records appended to a collection's datafile since its last compaction.
    pub fn appended_since_compaction(&self, collection: &str) -> usize {
        self.inner
            .appended
            .get(collection)
            .map(|count| *count)
            .unwrap_or(0)
    }
}

impl StoreProvider for AppendLogStore {
    fn load(&self, collection: &str) -> IrexResult<Vec<Document>> {
        self.inner.load(collection)
    }

    fn flush(
        &self,
        collection: &str,
        records: &[StoreRecord],
        documents: &[Arc<Document>],
    ) -> IrexResult<()> {
        self.inner.flush(collection, records, documents)
    }

    fn is_persistent(&self) -> bool {
        true
    }

    fn store_name(&self) -> &'static str {
        "append-log"
    }
}

impl AppendLogStoreInner {
    fn load(&self, collection: &str) -> IrexResult<Vec<Document>> {
        let path = datafile_path(&self.dir, collection);
        let content = match read_datafile(&path)? {
            Some(content) => content,
            None => {
                self.appended.insert(collection.to_string(), 0);
                return Ok(Vec::new());
            }
        };

        let decoded = decode_datafile(&path.display().to_string(), &content, self.corrupt_threshold)?;
        let rewrite = decoded.is_redundant() || decoded.format == DatafileFormat::Array;
        let records = decoded.records;
        let documents = decoded.into_documents();

        if rewrite {
            let shared: Vec<Arc<Document>> = documents.iter().cloned().map(Arc::new).collect();
            write_snapshot(&self.dir, &path, &shared)?;
            log::debug!(
                "Compacted datafile {} on load: {} records down to {}",
                path.display(),
                records,
                documents.len()
            );
        }

        self.appended.insert(collection.to_string(), 0);
        log::debug!(
            "Loaded {} documents for collection {} from {}",
            documents.len(),
            collection,
            path.display()
        );
        Ok(documents)
    }

    fn flush(
        &self,
        collection: &str,
        records: &[StoreRecord],
        documents: &[Arc<Document>],
    ) -> IrexResult<()> {
        let path = datafile_path(&self.dir, collection);
        let appended = self
            .appended
            .get(collection)
            .map(|count| *count)
            .unwrap_or(0);

        if appended + records.len() > self.compaction_threshold {
            write_snapshot(&self.dir, &path, documents)?;
            self.appended.insert(collection.to_string(), 0);
            log::debug!(
                "Compacted datafile {} to {} documents",
                path.display(),
                documents.len()
            );
        } else if !records.is_empty() {
            append_records(&path, records)?;
            self.appended
                .insert(collection.to_string(), appended + records.len());
            log::debug!("Appended {} records to {}", records.len(), path.display());
        }
        Ok(())
    }
}
