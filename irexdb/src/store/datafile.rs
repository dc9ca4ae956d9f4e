use crate::collection::Document;
use crate::common::DATAFILE_EXTENSION;
use crate::errors::{ErrorKind, IrexError, IrexResult};
use crate::store::{encode_record, encode_snapshot, StoreRecord};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;

pub(crate) fn datafile_path(dir: &Path, collection: &str) -> PathBuf {
    dir.join(format!("{}.{}", collection, DATAFILE_EXTENSION))
}

fn persistence_error(message: String, cause: IrexError) -> IrexError {
    log::error!("{}: {}", message, cause);
    IrexError::new_with_cause(&message, ErrorKind::Persistence, cause)
}

/// Reads a datafile, `None` when it does not exist yet.
pub(crate) fn read_datafile(path: &Path) -> IrexResult<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(persistence_error(
            format!("Failed to read datafile {}", path.display()),
            e.into(),
        )),
    }
}

/// Replaces the datafile with the given documents.
///
/// The content goes to a temp file in the same directory which is then
/// renamed over the datafile, so a reader sees either the old or the new
/// file, never a partial one.
pub(crate) fn write_snapshot(dir: &Path, path: &Path, documents: &[Arc<Document>]) -> IrexResult<()> {
    let content = encode_snapshot(documents)?;
    let result: IrexResult<()> = (|| {
        let mut temp = NamedTempFile::new_in(dir)?;
        temp.write_all(content.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(path)?;
        Ok(())
    })();

    result.map_err(|e| persistence_error(format!("Failed to write datafile {}", path.display()), e))
}

/// Appends records to the datafile, creating it if needed.
pub(crate) fn append_records(path: &Path, records: &[StoreRecord]) -> IrexResult<()> {
    let mut content = String::with_capacity(records.len() * 64);
    for record in records {
        content.push_str(&encode_record(record)?);
        content.push('\n');
    }

    let result: IrexResult<()> = (|| {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        file.write_all(content.as_bytes())?;
        file.sync_data()?;
        Ok(())
    })();

    result.map_err(|e| persistence_error(format!("Failed to append to datafile {}", path.display()), e))
}
