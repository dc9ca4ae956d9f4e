use crate::collection::Document;
use crate::common::{Value, DOC_ID, FIELD_SEPARATOR};
use crate::errors::{ErrorKind, IrexError, IrexResult};
use std::any::Any;
use std::fmt::Display;
use std::ops::Deref;
use std::sync::Arc;

use super::{
    parse_query, AllFilter, AndFilter, ElementMatchFilter, EqualsFilter, NorFilter, NotFilter,
    OrFilter,
};

/// A predicate evaluated against every document of a collection.
///
/// The collection keys its query cache by the [Display] form, but only for
/// providers that report [FilterProvider::is_cacheable].
pub trait FilterProvider: Any + Send + Sync + Display {
    /// Checks whether `entry` satisfies the predicate.
    fn apply(&self, entry: &Document) -> IrexResult<bool>;

    /// Rejects a filter that cannot be evaluated, before any document is scanned.
    fn validate(&self) -> IrexResult<()> {
        Ok(())
    }

    /// Whether the [Display] form names this predicate uniquely, so results
    /// may be cached under it.
    fn is_cacheable(&self) -> bool {
        false
    }

    #[inline]
    fn has_field(&self) -> bool {
        false
    }

    fn get_field_name(&self) -> IrexResult<String> {
        log::error!("Filter {} does not have field name", self);
        Err(IrexError::new(
            "Filter does not have field name",
            ErrorKind::InvalidOperation,
        ))
    }

    fn get_field_value(&self) -> IrexResult<Option<Value>> {
        log::debug!("Filter {} does not have field value", self);
        Err(IrexError::new(
            "Filter does not have field value",
            ErrorKind::InvalidOperation,
        ))
    }

    fn logical_filters(&self) -> IrexResult<Vec<Filter>> {
        Err(IrexError::new(
            "Filter is not a logical filter",
            ErrorKind::InvalidOperation,
        ))
    }

    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a [FilterProvider].
#[derive(Clone)]
pub struct Filter {
    inner: Arc<dyn FilterProvider>,
}

impl Filter {
    pub fn new<T: FilterProvider + 'static>(inner: T) -> Self {
        Filter {
            inner: Arc::new(inner),
        }
    }

    pub fn and(&self, filter: Filter) -> Self {
        Filter::new(AndFilter::new(vec![self.clone(), filter]))
    }

    pub fn or(&self, filter: Filter) -> Self {
        Filter::new(OrFilter::new(vec![self.clone(), filter]))
    }

    pub fn not(&self) -> Self {
        Filter::new(NotFilter::new(self.clone()))
    }
}

impl Display for Filter {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl Deref for Filter {
    type Target = Arc<dyn FilterProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Conversion of anything usable as a query into a [Filter].
pub trait IntoFilter {
    fn into_filter(self) -> IrexResult<Filter>;
}

impl IntoFilter for Filter {
    fn into_filter(self) -> IrexResult<Filter> {
        Ok(self)
    }
}

impl IntoFilter for &Filter {
    fn into_filter(self) -> IrexResult<Filter> {
        Ok(self.clone())
    }
}

impl IntoFilter for Document {
    fn into_filter(self) -> IrexResult<Filter> {
        parse_query(&self)
    }
}

impl IntoFilter for &Document {
    fn into_filter(self) -> IrexResult<Filter> {
        parse_query(self)
    }
}

/// Matches every document.
pub fn all() -> Filter {
    Filter::new(AllFilter)
}

pub fn by_id(id: &str) -> Filter {
    Filter::new(EqualsFilter::new(DOC_ID.to_string(), Value::from(id)))
}

pub fn and(filters: Vec<Filter>) -> Filter {
    Filter::new(AndFilter::new(filters))
}

pub fn or(filters: Vec<Filter>) -> Filter {
    Filter::new(OrFilter::new(filters))
}

pub fn not(filter: Filter) -> Filter {
    Filter::new(NotFilter::new(filter))
}

pub fn nor(filters: Vec<Filter>) -> Filter {
    Filter::new(NorFilter::new(filters))
}

pub(crate) fn is_all_filter(filter: &Filter) -> bool {
    filter.as_any().is::<AllFilter>()
}

pub(crate) fn is_element_match_filter(filter: &Filter) -> bool {
    filter.as_any().is::<ElementMatchFilter>()
}

/// Returns the id when the filter is a plain `_id` equality on a string.
pub(crate) fn id_equality(filter: &Filter) -> Option<String> {
    let equals = filter.as_any().downcast_ref::<EqualsFilter>()?;
    if equals.field_name() != DOC_ID {
        return None;
    }
    equals.field_value().as_string().cloned()
}

/// Collects the plain equality constraints reachable through conjunctions.
///
/// Disjunctions, negations and operator filters contribute nothing.
pub(crate) fn equality_constraints(filter: &Filter) -> Vec<(String, Value)> {
    let mut constraints = Vec::new();
    collect_equalities(filter, &mut constraints);
    constraints
}

fn collect_equalities(filter: &Filter, constraints: &mut Vec<(String, Value)>) {
    if let Some(equals) = filter.as_any().downcast_ref::<EqualsFilter>() {
        constraints.push((equals.field_name().to_string(), equals.field_value().clone()));
    } else if filter.as_any().is::<AndFilter>() {
        if let Ok(filters) = filter.logical_filters() {
            for child in filters.iter() {
                collect_equalities(child, constraints);
            }
        }
    }
}

/// Resolves a dotted field name against a document.
///
/// A key stored verbatim with a dot in it wins over the nested path.
#[inline]
pub(crate) fn resolve_field(entry: &Document, field_name: &str) -> Option<Value> {
    if entry.contains_key(field_name) {
        return entry.get(field_name).ok();
    }
    let splits: Vec<&str> = field_name.split(FIELD_SEPARATOR).collect();
    entry.resolve(&splits)
}

/// Rejects empty field names and empty path segments.
pub(crate) fn validate_field_name(field_name: &str) -> IrexResult<()> {
    if field_name.is_empty() || field_name.split(FIELD_SEPARATOR).any(|s| s.is_empty()) {
        log::error!("Invalid field path {:?} in query", field_name);
        return Err(IrexError::new(
            &format!("Invalid field path {:?} in query", field_name),
            ErrorKind::MalformedQuery,
        ));
    }
    Ok(())
}

/// Rejects NaN and infinite numbers anywhere in a query value.
pub(crate) fn validate_field_value(field_name: &str, value: &Value) -> IrexResult<()> {
    if !value.is_finite() {
        log::error!("Non-finite number in query value for {}", field_name);
        return Err(IrexError::new(
            &format!("Non-finite number in query value for {}", field_name),
            ErrorKind::MalformedQuery,
        ));
    }
    Ok(())
}
