use im::OrdMap;
use smallvec::SmallVec;

use crate::common::{Value, DOC_ID, FIELD_SEPARATOR};
use crate::errors::{ErrorKind, IrexError, IrexResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Debug, Display};

type FieldVec = SmallVec<[String; 8]>;

/// A JSON-like record stored in a collection.
///
/// A document is an ordered mapping from [String] keys to [Value]s. Nested
/// documents are addressed with dotted paths, so the value inside
/// `{"a": {"b": 1}}` is read with `document.get("a.b")`. A numeric segment
/// indexes into an array and a non-numeric segment over an array collects
/// the matching values of every element.
///
/// The `_id` field is the document's identity inside a collection. It must
/// be a non-empty string and is generated on insertion when absent. A record
/// identifier such as a catalog entry's `id` is stored as `_id`; a field named
/// `id` is ordinary data.
///
/// The backing map is a persistent `im::OrdMap`, so a clone is cheap and every
/// mutation of a clone leaves the original untouched. A copy handed out by a
/// collection never shares mutable state with the stored document.
#[derive(Clone, Eq, PartialEq, Default, Ord, PartialOrd)]
pub struct Document {
    data: OrdMap<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Document {
            data: OrdMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Puts a value at `key`, creating intermediate documents for dotted keys.
    ///
    /// Fails with `InvalidOperation` for an empty key or an empty path segment.
    pub fn put<T: Into<Value>>(&mut self, key: &str, value: T) -> IrexResult<()> {
        let splits = split_key(key)?;
        self.deep_put(&splits, value.into());
        Ok(())
    }

    /// Returns the value at `key`, or [Value::Null] when the path does not exist.
    pub fn get(&self, key: &str) -> IrexResult<Value> {
        if let Some(value) = self.data.get(key) {
            return Ok(value.clone());
        }
        let splits = split_key(key)?;
        Ok(self.resolve(&splits).unwrap_or(Value::Null))
    }

    /// Removes the value at `key`. Empty parent documents left behind are removed too.
    pub fn remove(&mut self, key: &str) -> IrexResult<()> {
        let splits = split_key(key)?;
        self.deep_remove(&splits);
        Ok(())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Checks whether a possibly dotted field path exists, even if it holds `null`.
    pub fn contains_field(&self, field: &str) -> bool {
        match split_key(field) {
            Ok(splits) => self.resolve(&splits).is_some(),
            Err(_) => false,
        }
    }

    /// The document's `_id` if it holds a string.
    pub fn id(&self) -> Option<&str> {
        match self.data.get(DOC_ID) {
            Some(Value::String(id)) => Some(id.as_str()),
            _ => None,
        }
    }

    pub fn has_id(&self) -> bool {
        self.data.contains_key(DOC_ID)
    }

    /// Dotted paths of every leaf field, `_id` excluded.
    pub fn fields(&self) -> FieldVec {
        self.get_fields_internal("")
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> + '_ {
        self.data.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> + '_ {
        self.data.iter()
    }

    /// Merges `other` into this document, recursing into nested documents.
    pub fn merge(&mut self, other: &Document) {
        for (key, value) in other.data.iter() {
            match (value, self.data.get(key)) {
                (Value::Document(obj), Some(Value::Document(existing))) => {
                    let mut nested = existing.clone();
                    nested.merge(obj);
                    self.data = self.data.update(key.clone(), Value::Document(nested));
                }
                _ => {
                    self.data = self.data.update(key.clone(), value.clone());
                }
            }
        }
    }

    /// Encodes the document as a single line of JSON.
    pub fn to_json(&self) -> IrexResult<String> {
        serde_json::to_string(self).map_err(|e| {
            log::error!("Failed to encode document as JSON: {}", e);
            IrexError::from(e)
        })
    }

    /// Decodes a document from JSON. The top level must be an object.
    pub fn from_json(json: &str) -> IrexResult<Document> {
        serde_json::from_str(json).map_err(|e| {
            log::error!("Failed to decode document from JSON: {}", e);
            IrexError::from(e)
        })
    }

    /// Inserts a top-level field verbatim, without path splitting.
    pub(crate) fn put_field(&mut self, key: String, value: Value) {
        self.data = self.data.update(key, value);
    }

    /// Validates the `_id` field, generating one when absent, and returns it.
    pub(crate) fn ensure_id(&mut self) -> IrexResult<String> {
        match self.data.get(DOC_ID) {
            None => {
                let id = uuid::Uuid::new_v4().simple().to_string();
                self.data = self.data.update(DOC_ID.to_string(), Value::String(id.clone()));
                Ok(id)
            }
            Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
            Some(other) => {
                log::error!("Document id must be a non-empty string, found {}", other);
                Err(IrexError::new(
                    &format!("Document id must be a non-empty string, found {}", other),
                    ErrorKind::InvalidId,
                ))
            }
        }
    }

    /// Resolves an already split path. `None` means the path does not exist.
    pub(crate) fn resolve(&self, splits: &[&str]) -> Option<Value> {
        let (first, rest) = splits.split_first()?;
        recursive_get(self.data.get(*first)?, rest)
    }

    fn get_fields_internal(&self, prefix: &str) -> FieldVec {
        let mut fields = FieldVec::new();
        for (key, value) in self.data.iter() {
            if prefix.is_empty() && key == DOC_ID {
                continue;
            }

            let field = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}{}{}", prefix, FIELD_SEPARATOR, key)
            };

            match value {
                Value::Document(doc) if !doc.is_empty() => {
                    fields.append(&mut doc.get_fields_internal(&field))
                }
                _ => fields.push(field),
            }
        }
        fields
    }

    fn deep_put(&mut self, splits: &[&str], value: Value) {
        let (key, rest) = match splits.split_first() {
            Some(split) => split,
            None => return,
        };

        if rest.is_empty() {
            self.data = self.data.update(key.to_string(), value);
            return;
        }

        // a non-document value on the way is replaced by a fresh document
        let mut nested = match self.data.get(*key) {
            Some(Value::Document(obj)) => obj.clone(),
            _ => Document::new(),
        };
        nested.deep_put(rest, value);
        self.data = self.data.update(key.to_string(), Value::Document(nested));
    }

    fn deep_remove(&mut self, splits: &[&str]) {
        let (key, rest) = match splits.split_first() {
            Some(split) => split,
            None => return,
        };

        if rest.is_empty() {
            self.data = self.data.without(*key);
            return;
        }

        match self.data.get(*key) {
            Some(Value::Document(obj)) => {
                let mut nested = obj.clone();
                nested.deep_remove(rest);
                if nested.is_empty() {
                    self.data = self.data.without(*key);
                } else {
                    self.data = self.data.update(key.to_string(), Value::Document(nested));
                }
            }
            Some(Value::Array(arr)) => {
                let index = match rest[0].parse::<usize>() {
                    Ok(index) if index < arr.len() => index,
                    _ => return,
                };

                let mut new_arr = arr.clone();
                match (&arr[index], rest.len() > 1) {
                    (Value::Document(obj), true) => {
                        let mut nested = obj.clone();
                        nested.deep_remove(&rest[1..]);
                        if nested.is_empty() {
                            new_arr.remove(index);
                        } else {
                            new_arr[index] = Value::Document(nested);
                        }
                    }
                    (_, true) => return,
                    (_, false) => {
                        new_arr.remove(index);
                    }
                }
                self.data = self.data.update(key.to_string(), Value::Array(new_arr));
            }
            _ => {}
        }
    }
}

fn recursive_get(value: &Value, splits: &[&str]) -> Option<Value> {
    let (key, rest) = match splits.split_first() {
        Some(split) => split,
        None => return Some(value.clone()),
    };

    match value {
        Value::Document(obj) => recursive_get(obj.data.get(*key)?, rest),
        Value::Array(arr) => match key.parse::<usize>() {
            Ok(index) => recursive_get(arr.get(index)?, rest),
            Err(_) => decompose(arr, splits),
        },
        _ => None,
    }
}

/// Applies the remaining path to every array element and flattens what it finds.
fn decompose(arr: &[Value], splits: &[&str]) -> Option<Value> {
    let mut items: Vec<Value> = Vec::with_capacity(arr.len());
    let mut found = false;
    for item in arr {
        if let Some(result) = recursive_get(item, splits) {
            found = true;
            match result {
                Value::Array(values) => items.extend(values),
                value => items.push(value),
            }
        }
    }

    if found {
        Some(Value::Array(items))
    } else {
        None
    }
}

/// Splits a dotted key, rejecting empty keys and empty segments.
pub(crate) fn split_key(key: &str) -> IrexResult<Vec<&str>> {
    if key.is_empty() {
        log::error!("Document does not support empty key");
        return Err(IrexError::new(
            "Document does not support empty key",
            ErrorKind::InvalidOperation,
        ));
    }

    let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
    if splits.iter().any(|s| s.is_empty()) {
        log::error!("Field path {} contains an empty segment", key);
        return Err(IrexError::new(
            &format!("Field path {} contains an empty segment", key),
            ErrorKind::InvalidOperation,
        ));
    }
    Ok(splits)
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.data.iter())
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Document, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Document(doc) => Ok(doc),
            other => Err(serde::de::Error::custom(format!(
                "expected a JSON object, found {}",
                other.type_name()
            ))),
        }
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.data.iter()).finish()
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string(self).map_err(|_| std::fmt::Error)?;
        write!(f, "{}", json)
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Document {
            data: iter.into_iter().collect(),
        }
    }
}

/// Strips the quotes `stringify!` leaves around string-literal keys.
pub fn normalize(value: &str) -> String {
    value.trim_matches('"').to_string()
}

/// Builds a [Document] from JSON-like syntax.
///
/// Keys may be bare identifiers or string literals, and dotted keys create
/// nested documents.
///
/// ```rust
/// use irexdb::doc;
///
/// let doc = doc! {
///     name: "irexdb",
///     "meta.version": 2,
///     tags: ["db", "json"],
///     owner: { login: "ops" },
/// };
/// assert_eq!(doc.get("meta.version").unwrap(), irexdb::val!(2));
/// ```
#[macro_export]
macro_rules! doc {
    () => {
        $crate::collection::Document::new()
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::doc_value;

            let mut doc = $crate::collection::Document::new();
            $(
                doc.put(&$crate::collection::normalize(stringify!($key)), $crate::doc_value!($value))
                    .expect(&format!("Failed to put value {} in document", stringify!($value)));
            )*
            doc
        }
    };
}

/// Converts one `doc!` value: nested documents, arrays, or any expression.
#[macro_export]
macro_rules! doc_value {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
