use std::any::Any;
use std::fmt::Display;

use regex::Regex;

use crate::collection::Document;
use crate::common::Value;
use crate::errors::IrexResult;

use super::{is_element_match_filter, malformed, resolve_field, validate_field_name, Filter, FilterProvider};

/// Field name scalar array elements are exposed under inside `$elemMatch`.
pub(crate) const ELEMENT_FIELD: &str = "$";

/// Matches string values against a regular expression.
///
/// The pattern is compiled once at construction; an invalid pattern is
/// reported by [FilterProvider::validate].
pub(crate) struct RegexFilter {
    field_name: String,
    pattern: String,
    regex: Result<Regex, String>,
}

impl RegexFilter {
    #[inline]
    pub(crate) fn new(field_name: String, pattern: String) -> Self {
        let regex = Regex::new(&pattern).map_err(|e| e.to_string());
        RegexFilter {
            field_name,
            pattern,
            regex,
        }
    }
}

impl Display for RegexFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:?} =~ {:?})", self.field_name, self.pattern)
    }
}

impl FilterProvider for RegexFilter {
    #[inline]
    fn apply(&self, entry: &Document) -> IrexResult<bool> {
        let regex = match &self.regex {
            Ok(regex) => regex,
            Err(e) => return Err(malformed(&format!("Invalid regex {:?}: {}", self.pattern, e))),
        };

        let matches = |value: &Value| value.as_string().map(|s| regex.is_match(s)).unwrap_or(false);
        match resolve_field(entry, &self.field_name) {
            Some(Value::Array(items)) => Ok(items.iter().any(matches)),
            Some(value) => Ok(matches(&value)),
            None => Ok(false),
        }
    }

    fn validate(&self) -> IrexResult<()> {
        validate_field_name(&self.field_name)?;
        if let Err(e) = &self.regex {
            return Err(malformed(&format!("Invalid regex {:?}: {}", self.pattern, e)));
        }
        Ok(())
    }

    fn is_cacheable(&self) -> bool {
        true
    }

    fn has_field(&self) -> bool {
        true
    }

    fn get_field_name(&self) -> IrexResult<String> {
        Ok(self.field_name.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Matches arrays holding at least one element that satisfies `filter`.
///
/// Document elements are tested directly. A scalar element is wrapped in a
/// document under the `$` field, so operator filters built on `$` apply to it.
pub(crate) struct ElementMatchFilter {
    field_name: String,
    filter: Filter,
}

impl ElementMatchFilter {
    #[inline]
    pub(crate) fn new(field_name: String, filter: Filter) -> Self {
        ElementMatchFilter { field_name, filter }
    }

    fn match_element(&self, value: &Value) -> IrexResult<bool> {
        match value {
            Value::Document(doc) => self.filter.apply(doc),
            _ => {
                let mut doc = Document::new();
                doc.put_field(ELEMENT_FIELD.to_string(), value.clone());
                self.filter.apply(&doc)
            }
        }
    }
}

impl Display for ElementMatchFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:?} elemMatch {})", self.field_name, self.filter)
    }
}

impl FilterProvider for ElementMatchFilter {
    #[inline]
    fn apply(&self, entry: &Document) -> IrexResult<bool> {
        if let Some(Value::Array(items)) = resolve_field(entry, &self.field_name) {
            for item in items.iter() {
                if self.match_element(item)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    fn validate(&self) -> IrexResult<()> {
        validate_field_name(&self.field_name)?;
        if is_element_match_filter(&self.filter) {
            return Err(malformed(&format!(
                "{} cannot directly nest another elemMatch",
                self
            )));
        }
        self.filter.validate()
    }

    fn is_cacheable(&self) -> bool {
        self.filter.is_cacheable()
    }

    fn has_field(&self) -> bool {
        true
    }

    fn get_field_name(&self) -> IrexResult<String> {
        Ok(self.field_name.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
