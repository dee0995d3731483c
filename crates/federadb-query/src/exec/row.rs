//! Rows and schemas.
//!
//! A [`Row`] is an immutable tuple of values sharing an [`Arc<Schema>`]
//! with every other row of the same stream.

use std::collections::HashMap;
use std::sync::Arc;

use federadb_core::Value;

/// Column names of a row stream, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    columns: Vec<Arc<str>>,
    name_to_index: HashMap<Arc<str>, usize>,
}

impl Schema {
    /// Creates a schema from column names.
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        Self::from_arcs(columns.into_iter().map(|s| Arc::from(s.as_str())).collect())
    }

    /// Creates a schema from shared column names.
    #[must_use]
    pub fn from_arcs(columns: Vec<Arc<str>>) -> Self {
        // Earlier columns win when a name repeats.
        let mut name_to_index = HashMap::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            name_to_index.entry(Arc::clone(name)).or_insert(i);
        }
        Self { columns, name_to_index }
    }

    /// Creates an empty schema.
    #[must_use]
    pub fn empty() -> Self {
        Self { columns: Vec::new(), name_to_index: HashMap::new() }
    }

    /// Returns the column names.
    #[must_use]
    pub fn columns(&self) -> Vec<&str> {
        self.columns.iter().map(AsRef::as_ref).collect()
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if the schema has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Gets the index of a column.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// Gets the column name at an index.
    #[must_use]
    pub fn column_at(&self, index: usize) -> Option<&str> {
        self.columns.get(index).map(AsRef::as_ref)
    }

    /// Returns a schema with `names` appended.
    #[must_use]
    pub fn extend<I, S>(&self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut columns = self.columns.clone();
        columns.extend(names.into_iter().map(|n| Arc::from(n.as_ref())));
        Self::from_arcs(columns)
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Vec<&str>> for Schema {
    fn from(columns: Vec<&str>) -> Self {
        Self::new(columns.into_iter().map(String::from).collect())
    }
}

/// A row of values.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a row.
    ///
    /// The number of values must match the schema.
    #[must_use]
    pub fn new(schema: Arc<Schema>, values: Vec<Value>) -> Self {
        debug_assert_eq!(schema.len(), values.len(), "Row values count must match schema column count");
        Self { schema, values }
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the values.
    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Gets a value by column index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Gets a value by column name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.schema.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Returns a copy of this row with `extra` appended, under `schema`.
    #[must_use]
    pub fn extended(&self, schema: Arc<Schema>, extra: impl IntoIterator<Item = Value>) -> Self {
        let mut values = self.values.clone();
        values.extend(extra);
        Self::new(schema, values)
    }

    /// Consumes the row and returns the values.
    #[must_use]
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Converts the row to a map of column names to values.
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, Value> {
        self.schema
            .columns
            .iter()
            .zip(&self.values)
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect()
    }
}
