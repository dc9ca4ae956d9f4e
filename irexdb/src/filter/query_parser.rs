use crate::collection::Document;
use crate::common::Value;
use crate::errors::IrexResult;

use super::{
    all, malformed, validate_field_name, validate_field_value, AndFilter, ComparisonFilter, ComparisonMode,
    ElementMatchFilter, EqualsFilter, ExistsFilter, Filter, InFilter, NorFilter, NotEqualsFilter,
    NotFilter, NotInFilter, OrFilter, RegexFilter, SizeFilter, ELEMENT_FIELD,
};

/// Parses a query document into a [Filter].
///
/// Every key of the query must hold (conjunction). A key is either a dotted
/// field path or one of the logical keys `$and`, `$or`, `$nor` (each taking an
/// array of query documents) and `$not` (taking one query document).
///
/// A field's value is either a plain value, matched by equality, or an
/// operator document whose keys all start with `$`:
/// `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`, `$nin`, `$exists`,
/// `$regex`, `$size`, `$elemMatch`.
///
/// Any operator or operand the matcher cannot evaluate fails with
/// `MalformedQuery` before a single document is scanned. An empty query
/// matches every document.
pub fn parse_query(query: &Document) -> IrexResult<Filter> {
    let mut filters = Vec::with_capacity(query.size());
    for (key, value) in query.iter() {
        if key.starts_with('$') {
            filters.push(parse_logical(key, value)?);
        } else {
            validate_field_name(key)?;
            filters.extend(parse_field(key, value)?);
        }
    }
    Ok(combine(filters))
}

fn combine(mut filters: Vec<Filter>) -> Filter {
    match filters.len() {
        0 => all(),
        1 => filters.remove(0),
        _ => Filter::new(AndFilter::new(filters)),
    }
}

fn parse_logical(key: &str, value: &Value) -> IrexResult<Filter> {
    match key {
        "$and" => Ok(Filter::new(AndFilter::new(parse_query_array(key, value)?))),
        "$or" => Ok(Filter::new(OrFilter::new(parse_query_array(key, value)?))),
        "$nor" => Ok(Filter::new(NorFilter::new(parse_query_array(key, value)?))),
        "$not" => match value {
            Value::Document(doc) => Ok(Filter::new(NotFilter::new(parse_query(doc)?))),
            other => Err(malformed(&format!(
                "$not expects a query document, found {}",
                other.type_name()
            ))),
        },
        _ => Err(malformed(&format!("Unknown top-level operator {}", key))),
    }
}

fn parse_query_array(key: &str, value: &Value) -> IrexResult<Vec<Filter>> {
    let items = match value {
        Value::Array(items) => items,
        other => {
            return Err(malformed(&format!(
                "{} expects an array of query documents, found {}",
                key,
                other.type_name()
            )))
        }
    };

    items
        .iter()
        .map(|item| match item {
            Value::Document(doc) => parse_query(doc),
            other => Err(malformed(&format!(
                "{} expects an array of query documents, found an element of type {}",
                key,
                other.type_name()
            ))),
        })
        .collect()
}

/// An operator document has only `$` keys; mixing them with plain keys is rejected.
fn is_operator_document(field_name: &str, doc: &Document) -> IrexResult<bool> {
    let operators = doc.keys().filter(|k| k.starts_with('$')).count();
    if operators == 0 {
        Ok(false)
    } else if operators == doc.size() {
        Ok(true)
    } else {
        Err(malformed(&format!(
            "Condition on {} mixes operators with plain fields",
            field_name
        )))
    }
}

fn parse_field(field_name: &str, value: &Value) -> IrexResult<Vec<Filter>> {
    validate_field_value(field_name, value)?;
    match value {
        Value::Document(doc) if is_operator_document(field_name, doc)? => doc
            .iter()
            .map(|(operator, operand)| parse_operator(field_name, operator, operand))
            .collect(),
        _ => Ok(vec![Filter::new(EqualsFilter::new(
            field_name.to_string(),
            value.clone(),
        ))]),
    }
}

fn parse_operator(field_name: &str, operator: &str, operand: &Value) -> IrexResult<Filter> {
    let name = field_name.to_string();
    let filter = match operator {
        "$eq" => Filter::new(EqualsFilter::new(name, operand.clone())),
        "$ne" => Filter::new(NotEqualsFilter::new(name, operand.clone())),
        "$gt" => comparison(name, operand, ComparisonMode::Greater)?,
        "$gte" => comparison(name, operand, ComparisonMode::GreaterEqual)?,
        "$lt" => comparison(name, operand, ComparisonMode::Lesser)?,
        "$lte" => comparison(name, operand, ComparisonMode::LesserEqual)?,
        "$in" => Filter::new(InFilter::new(name, array_operand(operator, operand)?)),
        "$nin" => Filter::new(NotInFilter::new(name, array_operand(operator, operand)?)),
        "$exists" => match operand {
            Value::Bool(exists) => Filter::new(ExistsFilter::new(name, *exists)),
            other => {
                return Err(malformed(&format!(
                    "$exists expects a bool, found {}",
                    other.type_name()
                )))
            }
        },
        "$regex" => match operand {
            Value::String(pattern) => {
                let filter = Filter::new(RegexFilter::new(name, pattern.clone()));
                filter.validate()?;
                filter
            }
            other => {
                return Err(malformed(&format!(
                    "$regex expects a string pattern, found {}",
                    other.type_name()
                )))
            }
        },
        "$size" => Filter::new(SizeFilter::new(name, size_operand(operand)?)),
        "$elemMatch" => match operand {
            Value::Document(doc) => Filter::new(ElementMatchFilter::new(name, element_query(doc)?)),
            other => {
                return Err(malformed(&format!(
                    "$elemMatch expects a query document, found {}",
                    other.type_name()
                )))
            }
        },
        _ => {
            return Err(malformed(&format!(
                "Unknown operator {} on field {}",
                operator, field_name
            )))
        }
    };
    Ok(filter)
}

fn comparison(field_name: String, operand: &Value, mode: ComparisonMode) -> IrexResult<Filter> {
    let filter = Filter::new(ComparisonFilter::new(field_name, operand.clone(), mode));
    filter.validate()?;
    Ok(filter)
}

fn array_operand(operator: &str, operand: &Value) -> IrexResult<Vec<Value>> {
    match operand {
        Value::Array(items) => Ok(items.clone()),
        other => Err(malformed(&format!(
            "{} expects an array, found {}",
            operator,
            other.type_name()
        ))),
    }
}

fn size_operand(operand: &Value) -> IrexResult<usize> {
    match operand {
        Value::I64(n) if *n >= 0 => Ok(*n as usize),
        Value::F64(n) if n.is_finite() && *n >= 0.0 && n.fract() == 0.0 => Ok(*n as usize),
        other => Err(malformed(&format!(
            "$size expects a non-negative integer, found {}",
            other
        ))),
    }
}

/// The query inside `$elemMatch`: operators on the element itself, or a
/// query over document elements.
fn element_query(doc: &Document) -> IrexResult<Filter> {
    if is_operator_document("$elemMatch", doc)? && !doc.keys().any(|k| is_logical_key(k)) {
        let filters = doc
            .iter()
            .map(|(operator, operand)| parse_operator(ELEMENT_FIELD, operator, operand))
            .collect::<IrexResult<Vec<_>>>()?;
        Ok(combine(filters))
    } else {
        parse_query(doc)
    }
}

fn is_logical_key(key: &str) -> bool {
    matches!(key, "$and" | "$or" | "$nor" | "$not")
}
