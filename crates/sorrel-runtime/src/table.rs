//! Runtime tables: a batch of rows with an optional schema.

use std::rc::Rc;

use crate::dict::Dict;
use crate::schema::Schema;

/// An ordered list of row dictionaries with a column list, an optional
/// schema and a trusted-origin flag.
#[derive(Debug, Clone, PartialEq)]
pub struct TableValue {
    /// Rows in result order.
    pub rows: Vec<Dict>,
    /// Column names in projection order.
    pub columns: Vec<String>,
    /// The schema the rows are bound to, when known.
    pub schema: Option<Rc<Schema>>,
    /// Whether the rows came from the database (trusted origin).
    pub from_db: bool,
}

impl TableValue {
    /// Creates a table.
    #[must_use]
    pub fn new(
        rows: Vec<Dict>,
        columns: Vec<String>,
        schema: Option<Rc<Schema>>,
        from_db: bool,
    ) -> Self {
        Self {
            rows,
            columns,
            schema,
            from_db,
        }
    }

    /// Creates a trusted table from database rows, deriving the column
    /// list from the first row when not supplied by the caller.
    #[must_use]
    pub fn from_db_rows(rows: Vec<Dict>, schema: Option<Rc<Schema>>) -> Self {
        let columns = rows
            .first()
            .map(|row| row.iter_all().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default();
        Self::new(rows, columns, schema, true)
    }

    /// Returns the backing table name, or `rows` for ad-hoc tables.
    #[must_use]
    pub fn name(&self) -> &str {
        self.schema
            .as_ref()
            .map_or("rows", |schema| schema.table.as_str())
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
