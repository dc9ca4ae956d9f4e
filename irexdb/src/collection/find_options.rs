use crate::common::SortOrder;

/// Sorting and pagination applied to the documents a query matched.
///
/// Sorting happens first, then `skip`, then `limit`. Documents missing a
/// sort field order before documents that have it.
///
/// ```rust,ignore
/// let options = order_by("version", SortOrder::Descending).limit(10);
/// let newest = collection.find_with_options(doc! { name: "irex" }, options)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub(crate) sort_by: Vec<(String, SortOrder)>,
    pub(crate) skip: Option<usize>,
    pub(crate) limit: Option<usize>,
}

pub fn order_by(field_name: &str, sort_order: SortOrder) -> FindOptions {
    FindOptions::new().sort_by(field_name, sort_order)
}

pub fn skip_by(skip: usize) -> FindOptions {
    FindOptions::new().skip(skip)
}

pub fn limit_to(limit: usize) -> FindOptions {
    FindOptions::new().limit(limit)
}

impl FindOptions {
    pub fn new() -> FindOptions {
        FindOptions {
            sort_by: Vec::new(),
            skip: None,
            limit: None,
        }
    }

    pub fn skip(mut self, skip: usize) -> FindOptions {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: usize) -> FindOptions {
        self.limit = Some(limit);
        self
    }

    /// Adds a sort key. Earlier keys take precedence over later ones.
    pub fn sort_by(mut self, field_name: &str, sort_order: SortOrder) -> FindOptions {
        self.sort_by.push((field_name.to_string(), sort_order));
        self
    }

    pub fn sorting_order(&self) -> &[(String, SortOrder)] {
        &self.sort_by
    }
}
