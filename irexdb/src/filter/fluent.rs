use crate::common::Value;

use super::{
    BetweenFilter, Bound, ComparisonFilter, ComparisonMode, ElementMatchFilter, EqualsFilter,
    ExistsFilter, Filter, InFilter, NotEqualsFilter, NotInFilter, RegexFilter, SizeFilter,
};

/// Starts a fluent filter on a (possibly dotted) field.
///
/// ```rust,ignore
/// let filter = field("version").gte(2).and(field("name").regex("^irex"));
/// ```
pub fn field(field_name: &str) -> FluentFilter {
    FluentFilter {
        field_name: field_name.to_string(),
    }
}

pub struct FluentFilter {
    field_name: String,
}

impl FluentFilter {
    #[inline]
    pub fn eq<T: Into<Value>>(self, value: T) -> Filter {
        Filter::new(EqualsFilter::new(self.field_name, value.into()))
    }

    #[inline]
    pub fn ne<T: Into<Value>>(self, value: T) -> Filter {
        Filter::new(NotEqualsFilter::new(self.field_name, value.into()))
    }

    #[inline]
    pub fn gt<T: Into<Value>>(self, value: T) -> Filter {
        self.compare(value.into(), ComparisonMode::Greater)
    }

    #[inline]
    pub fn gte<T: Into<Value>>(self, value: T) -> Filter {
        self.compare(value.into(), ComparisonMode::GreaterEqual)
    }

    #[inline]
    pub fn lt<T: Into<Value>>(self, value: T) -> Filter {
        self.compare(value.into(), ComparisonMode::Lesser)
    }

    #[inline]
    pub fn lte<T: Into<Value>>(self, value: T) -> Filter {
        self.compare(value.into(), ComparisonMode::LesserEqual)
    }

    /// Inclusive on both ends.
    #[inline]
    pub fn between<T: Into<Value>>(self, lower_bound: T, upper_bound: T) -> Filter {
        Filter::new(BetweenFilter::new(
            self.field_name,
            Bound::inclusive(lower_bound.into(), upper_bound.into()),
        ))
    }

    #[inline]
    pub fn between_exclusive<T: Into<Value>>(self, lower_bound: T, upper_bound: T) -> Filter {
        Filter::new(BetweenFilter::new(
            self.field_name,
            Bound::new(lower_bound.into(), upper_bound.into(), false, false),
        ))
    }

    #[inline]
    pub fn in_array<T: Into<Value>>(self, values: Vec<T>) -> Filter {
        Filter::new(InFilter::new(
            self.field_name,
            values.into_iter().map(|v| v.into()).collect(),
        ))
    }

    #[inline]
    pub fn not_in_array<T: Into<Value>>(self, values: Vec<T>) -> Filter {
        Filter::new(NotInFilter::new(
            self.field_name,
            values.into_iter().map(|v| v.into()).collect(),
        ))
    }

    #[inline]
    pub fn exists(self, exists: bool) -> Filter {
        Filter::new(ExistsFilter::new(self.field_name, exists))
    }

    /// An invalid pattern surfaces as `MalformedQuery` when the filter is used.
    #[inline]
    pub fn regex(self, pattern: &str) -> Filter {
        Filter::new(RegexFilter::new(self.field_name, pattern.to_string()))
    }

    #[inline]
    pub fn size(self, size: usize) -> Filter {
        Filter::new(SizeFilter::new(self.field_name, size))
    }

    #[inline]
    pub fn elem_match(self, filter: Filter) -> Filter {
        Filter::new(ElementMatchFilter::new(self.field_name, filter))
    }

    fn compare(self, value: Value, mode: ComparisonMode) -> Filter {
        Filter::new(ComparisonFilter::new(self.field_name, value, mode))
    }
}
