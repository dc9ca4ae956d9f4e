use std::any::Any;
use std::cmp::Ordering;
use std::fmt::Display;

use crate::collection::Document;
use crate::common::Value;
use crate::errors::IrexResult;

use super::{malformed, resolve_field, validate_field_name, validate_field_value, FilterProvider};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ComparisonMode {
    Greater,
    GreaterEqual,
    Lesser,
    LesserEqual,
}

impl ComparisonMode {
    #[inline]
    fn test(&self, ordering: Ordering) -> bool {
        match self {
            ComparisonMode::Greater => ordering == Ordering::Greater,
            ComparisonMode::GreaterEqual => ordering != Ordering::Less,
            ComparisonMode::Lesser => ordering == Ordering::Less,
            ComparisonMode::LesserEqual => ordering != Ordering::Greater,
        }
    }

    fn operator(&self) -> &'static str {
        match self {
            ComparisonMode::Greater => ">",
            ComparisonMode::GreaterEqual => ">=",
            ComparisonMode::Lesser => "<",
            ComparisonMode::LesserEqual => "<=",
        }
    }
}

/// Applies `predicate` to the value, or to each element when the value is an array.
#[inline]
fn any_comparable(value: Option<&Value>, predicate: impl Fn(&Value) -> bool) -> bool {
    match value {
        Some(Value::Array(items)) => items.iter().any(predicate),
        Some(value) => predicate(value),
        None => false,
    }
}

fn validate_operand(field_name: &str, operand: &Value) -> IrexResult<()> {
    validate_field_name(field_name)?;
    validate_field_value(field_name, operand)?;
    if !operand.is_comparable() {
        return Err(malformed(&format!(
            "Range operand for {} must be a number or a string, found {}",
            field_name,
            operand.type_name()
        )));
    }
    Ok(())
}

/// Compares a field against a number or string.
///
/// A document value of another type never matches; numbers only compare
/// with numbers and strings with strings.
pub(crate) struct ComparisonFilter {
    field_name: String,
    field_value: Value,
    comparison_mode: ComparisonMode,
}

impl ComparisonFilter {
    #[inline]
    pub(crate) fn new(field_name: String, field_value: Value, comparison_mode: ComparisonMode) -> Self {
        ComparisonFilter {
            field_name,
            field_value,
            comparison_mode,
        }
    }
}

impl Display for ComparisonFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({:?} {} {})",
            self.field_name,
            self.comparison_mode.operator(),
            self.field_value
        )
    }
}

impl FilterProvider for ComparisonFilter {
    #[inline]
    fn apply(&self, entry: &Document) -> IrexResult<bool> {
        let value = resolve_field(entry, &self.field_name);
        Ok(any_comparable(value.as_ref(), |v| {
            v.compare(&self.field_value)
                .map(|ordering| self.comparison_mode.test(ordering))
                .unwrap_or(false)
        }))
    }

    fn validate(&self) -> IrexResult<()> {
        validate_operand(&self.field_name, &self.field_value)
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

pub(crate) struct Bound {
    lower_bound: Value,
    upper_bound: Value,
    lower_inclusive: bool,
    upper_inclusive: bool,
}

impl Bound {
    pub(crate) fn inclusive(lower_bound: Value, upper_bound: Value) -> Self {
        Bound::new(lower_bound, upper_bound, true, true)
    }

    pub(crate) fn new(
        lower_bound: Value,
        upper_bound: Value,
        lower_inclusive: bool,
        upper_inclusive: bool,
    ) -> Self {
        Bound {
            lower_bound,
            upper_bound,
            lower_inclusive,
            upper_inclusive,
        }
    }

    fn contains(&self, value: &Value) -> bool {
        let lower = match value.compare(&self.lower_bound) {
            Some(Ordering::Greater) => true,
            Some(Ordering::Equal) => self.lower_inclusive,
            _ => false,
        };
        let upper = match value.compare(&self.upper_bound) {
            Some(Ordering::Less) => true,
            Some(Ordering::Equal) => self.upper_inclusive,
            _ => false,
        };
        lower && upper
    }
}

/// Matches a field lying between two bounds of the same comparable kind.
pub(crate) struct BetweenFilter {
    field_name: String,
    bound: Bound,
}

impl BetweenFilter {
    #[inline]
    pub(crate) fn new(field_name: String, bound: Bound) -> Self {
        BetweenFilter { field_name, bound }
    }
}

impl Display for BetweenFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let open = if self.bound.lower_inclusive { "[" } else { "(" };
        let close = if self.bound.upper_inclusive { "]" } else { ")" };
        write!(
            f,
            "({:?} between {}{}, {}{})",
            self.field_name, open, self.bound.lower_bound, self.bound.upper_bound, close
        )
    }
}

impl FilterProvider for BetweenFilter {
    #[inline]
    fn apply(&self, entry: &Document) -> IrexResult<bool> {
        let value = resolve_field(entry, &self.field_name);
        Ok(any_comparable(value.as_ref(), |v| self.bound.contains(v)))
    }

    fn validate(&self) -> IrexResult<()> {
        validate_operand(&self.field_name, &self.bound.lower_bound)?;
        validate_operand(&self.field_name, &self.bound.upper_bound)
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
