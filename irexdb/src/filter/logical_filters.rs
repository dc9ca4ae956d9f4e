use std::any::Any;
use std::fmt::Display;

use crate::collection::Document;
use crate::errors::IrexResult;
use itertools::Itertools;

use super::{Filter, FilterProvider};

fn join(filters: &[Filter], separator: &str) -> String {
    filters.iter().map(|filter| filter.to_string()).join(separator)
}

fn validate_all(filters: &[Filter]) -> IrexResult<()> {
    for filter in filters {
        filter.validate()?;
    }
    Ok(())
}

fn all_cacheable(filters: &[Filter]) -> bool {
    filters.iter().all(|filter| filter.is_cacheable())
}

pub(crate) struct AndFilter {
    filters: Vec<Filter>,
}

impl AndFilter {
    pub(crate) fn new(filters: Vec<Filter>) -> Self {
        AndFilter { filters }
    }
}

impl Display for AndFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", join(&self.filters, " && "))
    }
}

impl FilterProvider for AndFilter {
    #[inline]
    fn apply(&self, entry: &Document) -> IrexResult<bool> {
        for filter in &self.filters {
            if !filter.apply(entry)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn validate(&self) -> IrexResult<()> {
        validate_all(&self.filters)
    }

    fn is_cacheable(&self) -> bool {
        all_cacheable(&self.filters)
    }

    fn logical_filters(&self) -> IrexResult<Vec<Filter>> {
        Ok(self.filters.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) struct OrFilter {
    filters: Vec<Filter>,
}

impl OrFilter {
    pub(crate) fn new(filters: Vec<Filter>) -> Self {
        OrFilter { filters }
    }
}

impl Display for OrFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", join(&self.filters, " || "))
    }
}

impl FilterProvider for OrFilter {
    #[inline]
    fn apply(&self, entry: &Document) -> IrexResult<bool> {
        for filter in &self.filters {
            if filter.apply(entry)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn validate(&self) -> IrexResult<()> {
        validate_all(&self.filters)
    }

    fn is_cacheable(&self) -> bool {
        all_cacheable(&self.filters)
    }

    fn logical_filters(&self) -> IrexResult<Vec<Filter>> {
        Ok(self.filters.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

pub(crate) struct NotFilter {
    filter: Filter,
}

impl NotFilter {
    pub(crate) fn new(filter: Filter) -> Self {
        NotFilter { filter }
    }
}

impl Display for NotFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "!({})", self.filter)
    }
}

impl FilterProvider for NotFilter {
    #[inline]
    fn apply(&self, entry: &Document) -> IrexResult<bool> {
        Ok(!self.filter.apply(entry)?)
    }

    fn validate(&self) -> IrexResult<()> {
        self.filter.validate()
    }

    fn is_cacheable(&self) -> bool {
        self.filter.is_cacheable()
    }

    fn logical_filters(&self) -> IrexResult<Vec<Filter>> {
        Ok(vec![self.filter.clone()])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Matches when none of the filters match.
pub(crate) struct NorFilter {
    filters: Vec<Filter>,
}

impl NorFilter {
    pub(crate) fn new(filters: Vec<Filter>) -> Self {
        NorFilter { filters }
    }
}

impl Display for NorFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "!({})", join(&self.filters, " || "))
    }
}

impl FilterProvider for NorFilter {
    #[inline]
    fn apply(&self, entry: &Document) -> IrexResult<bool> {
        for filter in &self.filters {
            if filter.apply(entry)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn validate(&self) -> IrexResult<()> {
        validate_all(&self.filters)
    }

    fn is_cacheable(&self) -> bool {
        all_cacheable(&self.filters)
    }

    fn logical_filters(&self) -> IrexResult<Vec<Filter>> {
        Ok(self.filters.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
