use std::any::Any;
use std::fmt::Display;

use crate::collection::Document;
use crate::common::Value;
use crate::errors::{ErrorKind, IrexError, IrexResult};

use super::{resolve_field, validate_field_name, validate_field_value, FilterProvider};

/// Equality against a possibly missing document value.
///
/// A missing field equals `null`. When the document holds an array and the
/// target is not one, any element equal to the target is a match.
#[inline]
pub(crate) fn value_equals(value: Option<&Value>, target: &Value) -> bool {
    match value {
        None => target.is_null(),
        Some(Value::Array(items)) if !target.is_array() => items.iter().any(|item| item == target),
        Some(value) => value == target,
    }
}

pub(crate) struct AllFilter;

impl FilterProvider for AllFilter {
    fn apply(&self, _entry: &Document) -> IrexResult<bool> {
        Ok(true)
    }

    fn is_cacheable(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Display for AllFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AllFilter")
    }
}

pub(crate) struct EqualsFilter {
    field_name: String,
    field_value: Value,
}

impl EqualsFilter {
    #[inline]
    pub(crate) fn new(field_name: String, field_value: Value) -> Self {
        EqualsFilter {
            field_name,
            field_value,
        }
    }

    pub(crate) fn field_name(&self) -> &str {
        &self.field_name
    }

    pub(crate) fn field_value(&self) -> &Value {
        &self.field_value
    }
}

impl Display for EqualsFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:?} == {})", self.field_name, self.field_value)
    }
}

impl FilterProvider for EqualsFilter {
    #[inline]
    fn apply(&self, entry: &Document) -> IrexResult<bool> {
        let value = resolve_field(entry, &self.field_name);
        Ok(value_equals(value.as_ref(), &self.field_value))
    }

    fn validate(&self) -> IrexResult<()> {
        validate_field_name(&self.field_name)?;
        validate_field_value(&self.field_name, &self.field_value)
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

    fn get_field_value(&self) -> IrexResult<Option<Value>> {
        Ok(Some(self.field_value.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) struct NotEqualsFilter {
    field_name: String,
    field_value: Value,
}

impl NotEqualsFilter {
    #[inline]
    pub(crate) fn new(field_name: String, field_value: Value) -> Self {
        NotEqualsFilter {
            field_name,
            field_value,
        }
    }
}

impl Display for NotEqualsFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:?} != {})", self.field_name, self.field_value)
    }
}

impl FilterProvider for NotEqualsFilter {
    #[inline]
    fn apply(&self, entry: &Document) -> IrexResult<bool> {
        let value = resolve_field(entry, &self.field_name);
        Ok(!value_equals(value.as_ref(), &self.field_value))
    }

    fn validate(&self) -> IrexResult<()> {
        validate_field_name(&self.field_name)?;
        validate_field_value(&self.field_name, &self.field_value)
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

    fn get_field_value(&self) -> IrexResult<Option<Value>> {
        Ok(Some(self.field_value.clone()))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) struct InFilter {
    field_name: String,
    values: Vec<Value>,
}

impl InFilter {
    #[inline]
    pub(crate) fn new(field_name: String, values: Vec<Value>) -> Self {
        InFilter { field_name, values }
    }

    fn matches(&self, entry: &Document) -> bool {
        let value = resolve_field(entry, &self.field_name);
        self.values
            .iter()
            .any(|target| value_equals(value.as_ref(), target))
    }
}

impl Display for InFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:?} in {})", self.field_name, Value::Array(self.values.clone()))
    }
}

impl FilterProvider for InFilter {
    #[inline]
    fn apply(&self, entry: &Document) -> IrexResult<bool> {
        Ok(self.matches(entry))
    }

    fn validate(&self) -> IrexResult<()> {
        validate_field_name(&self.field_name)?;
        for value in &self.values {
            validate_field_value(&self.field_name, value)?;
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

pub(crate) struct NotInFilter {
    inner: InFilter,
}

impl NotInFilter {
    #[inline]
    pub(crate) fn new(field_name: String, values: Vec<Value>) -> Self {
        NotInFilter {
            inner: InFilter::new(field_name, values),
        }
    }
}

impl Display for NotInFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:?} not in {})",
            self.inner.field_name,
            Value::Array(self.inner.values.clone())
        )
    }
}

impl FilterProvider for NotInFilter {
    #[inline]
    fn apply(&self, entry: &Document) -> IrexResult<bool> {
        Ok(!self.inner.matches(entry))
    }

    fn validate(&self) -> IrexResult<()> {
        self.inner.validate()
    }

    fn is_cacheable(&self) -> bool {
        true
    }

    fn has_field(&self) -> bool {
        true
    }

    fn get_field_name(&self) -> IrexResult<String> {
        Ok(self.inner.field_name.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Matches on the presence of a field, regardless of its value.
pub(crate) struct ExistsFilter {
    field_name: String,
    exists: bool,
}

impl ExistsFilter {
    #[inline]
    pub(crate) fn new(field_name: String, exists: bool) -> Self {
        ExistsFilter { field_name, exists }
    }
}

impl Display for ExistsFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:?} exists {})", self.field_name, self.exists)
    }
}

impl FilterProvider for ExistsFilter {
    #[inline]
    fn apply(&self, entry: &Document) -> IrexResult<bool> {
        let present = resolve_field(entry, &self.field_name).is_some();
        Ok(present == self.exists)
    }

    fn validate(&self) -> IrexResult<()> {
        validate_field_name(&self.field_name)
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

/// Matches arrays with exactly `size` elements.
pub(crate) struct SizeFilter {
    field_name: String,
    size: usize,
}

impl SizeFilter {
    #[inline]
    pub(crate) fn new(field_name: String, size: usize) -> Self {
        SizeFilter { field_name, size }
    }
}

impl Display for SizeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:?} size {})", self.field_name, self.size)
    }
}

impl FilterProvider for SizeFilter {
    #[inline]
    fn apply(&self, entry: &Document) -> IrexResult<bool> {
        match resolve_field(entry, &self.field_name) {
            Some(Value::Array(items)) => Ok(items.len() == self.size),
            _ => Ok(false),
        }
    }

    fn validate(&self) -> IrexResult<()> {
        validate_field_name(&self.field_name)
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

pub(crate) fn malformed(message: &str) -> IrexError {
    log::error!("{}", message);
    IrexError::new(message, ErrorKind::MalformedQuery)
}
