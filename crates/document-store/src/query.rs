/// Query over one collection of the document store.
///
/// Results are ordered by creation time, oldest first.
#[derive(Debug, Clone)]
pub struct DocumentQuery {
    /// Collection to read from.
    pub collection: String,

    /// Only match documents whose top-level `field` equals this JSON value.
    pub field_eq: Option<(String, serde_json::Value)>,

    /// Maximum number of documents to return.
    pub limit: Option<usize>,
}

impl DocumentQuery {
    /// Creates a query returning every document of a collection.
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            field_eq: None,
            limit: None,
        }
    }

    /// Restricts the query to documents whose `field` equals `value`.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.field_eq = Some((field.into(), value.into()));
        self
    }

    /// Sets the maximum number of documents to return.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Returns true if the document body satisfies the field filter.
    pub fn matches(&self, body: &serde_json::Value) -> bool {
        match &self.field_eq {
            Some((field, value)) => body.get(field) == Some(value),
            None => true,
        }
    }
}
