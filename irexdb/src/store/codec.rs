use crate::collection::Document;
use crate::common::{Value, DELETED_MARKER, DOC_ID};
use crate::errors::{ErrorKind, IrexError, IrexResult};
use crate::store::StoreRecord;
use indexmap::IndexMap;
use std::sync::Arc;

/// Layout of a datafile's content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DatafileFormat {
    /// One JSON document per line.
    #[default]
    Lines,
    /// A single JSON array of documents.
    Array,
}

/// Outcome of replaying a datafile.
#[derive(Debug, Default)]
pub struct DecodedDatafile {
    /// Surviving documents keyed by id, in first-insertion order.
    pub documents: IndexMap<String, Document>,
    /// Non-blank lines (or array elements) read.
    pub records: usize,
    /// Lines skipped because they were not a valid record.
    pub corrupt: usize,
    /// The layout the content was read in.
    pub format: DatafileFormat,
}

impl DecodedDatafile {
    /// True when a rewrite would shrink the file: superseded, deleted or corrupt records.
    pub fn is_redundant(&self) -> bool {
        self.corrupt > 0 || self.records > self.documents.len()
    }

    pub fn into_documents(self) -> Vec<Document> {
        self.documents.into_values().collect()
    }
}

/// Encodes one record as a single JSON line, without the trailing newline.
pub fn encode_record(record: &StoreRecord) -> IrexResult<String> {
    match record {
        StoreRecord::Put(doc) => doc.to_json(),
        StoreRecord::Delete(id) => deletion_marker(id).to_json(),
    }
}

/// Encodes a whole collection as newline-delimited JSON.
pub fn encode_snapshot(documents: &[Arc<Document>]) -> IrexResult<String> {
    let mut content = String::with_capacity(documents.len() * 64);
    for doc in documents {
        content.push_str(&doc.to_json()?);
        content.push('\n');
    }
    Ok(content)
}

fn deletion_marker(id: &str) -> Document {
    let mut marker = Document::new();
    marker.put_field(DELETED_MARKER.to_string(), Value::Bool(true));
    marker.put_field(DOC_ID.to_string(), Value::from(id));
    marker
}

fn is_deletion_marker(doc: &Document) -> bool {
    matches!(doc.get(DELETED_MARKER), Ok(Value::Bool(true)))
}

/// Replays a datafile's content.
///
/// The content is either newline-delimited JSON or a single JSON array of
/// documents. Lines are applied in order: a later line for the same id
/// replaces the earlier one in place, and a deletion marker removes it.
/// Unparseable lines and documents without a valid id are skipped as
/// corrupt; if their share of all records exceeds `corrupt_threshold` the
/// whole load fails with `Persistence`.
pub fn decode_datafile(source: &str, content: &str, corrupt_threshold: f64) -> IrexResult<DecodedDatafile> {
    let decoded = if content.trim_start().starts_with('[') {
        decode_array(source, content)?
    } else {
        decode_lines(source, content)
    };

    if decoded.records > 0 {
        let ratio = decoded.corrupt as f64 / decoded.records as f64;
        if ratio > corrupt_threshold {
            log::error!(
                "Datafile {} is corrupt: {} of {} records unreadable",
                source,
                decoded.corrupt,
                decoded.records
            );
            return Err(IrexError::new(
                &format!(
                    "Datafile {} is corrupt: {} of {} records unreadable",
                    source, decoded.corrupt, decoded.records
                ),
                ErrorKind::Persistence,
            ));
        }
    }

    Ok(decoded)
}

fn decode_lines(source: &str, content: &str) -> DecodedDatafile {
    let mut decoded = DecodedDatafile::default();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        decoded.records += 1;

        match serde_json::from_str::<Document>(line) {
            Ok(doc) => apply_record(source, line_no + 1, doc, &mut decoded),
            Err(e) => {
                log::warn!("Skipping corrupt line {} of {}: {}", line_no + 1, source, e);
                decoded.corrupt += 1;
            }
        }
    }
    decoded
}

fn decode_array(source: &str, content: &str) -> IrexResult<DecodedDatafile> {
    let items: Vec<Value> = serde_json::from_str(content).map_err(|e| {
        log::error!("Datafile {} holds an unreadable JSON array: {}", source, e);
        IrexError::new_with_cause(
            &format!("Datafile {} holds an unreadable JSON array", source),
            ErrorKind::Persistence,
            IrexError::from(e),
        )
    })?;

    let mut decoded = DecodedDatafile {
        format: DatafileFormat::Array,
        ..DecodedDatafile::default()
    };
    for (index, item) in items.into_iter().enumerate() {
        decoded.records += 1;
        match item {
            Value::Document(doc) => apply_record(source, index + 1, doc, &mut decoded),
            other => {
                log::warn!(
                    "Skipping element {} of {}: expected a document, found {}",
                    index + 1,
                    source,
                    other.type_name()
                );
                decoded.corrupt += 1;
            }
        }
    }
    Ok(decoded)
}

fn apply_record(source: &str, position: usize, doc: Document, decoded: &mut DecodedDatafile) {
    let id = match doc.id() {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            log::warn!("Skipping record {} of {}: missing or invalid _id", position, source);
            decoded.corrupt += 1;
            return;
        }
    };

    if is_deletion_marker(&doc) {
        decoded.documents.shift_remove(&id);
    } else {
        decoded.documents.insert(id, doc);
    }
}
