//! Table bindings: a schema-bound facade over a database table.

use std::fmt;
use std::rc::Rc;

use crate::database::Database;
use crate::schema::Schema;

/// A database handle plus table name, optional schema and optional
/// soft-delete column. The read and write operations over a binding live
/// in the query layer; this type only carries the wiring.
#[derive(Clone)]
pub struct TableBinding {
    /// The backing connection.
    pub db: Rc<dyn Database>,
    /// Table name.
    pub table: String,
    /// Bound schema, when declared.
    pub schema: Option<Rc<Schema>>,
    /// Soft-delete timestamp column; rows with a value are invisible to
    /// reads and `delete` stamps instead of removing.
    pub soft_delete: Option<String>,
}

impl TableBinding {
    /// Creates a binding over a table.
    #[must_use]
    pub fn new(db: Rc<dyn Database>, table: impl Into<String>) -> Self {
        Self {
            db,
            table: table.into(),
            schema: None,
            soft_delete: None,
        }
    }

    /// Attaches a schema.
    #[must_use]
    pub fn with_schema(mut self, schema: Rc<Schema>) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Configures the soft-delete column.
    #[must_use]
    pub fn with_soft_delete(mut self, column: impl Into<String>) -> Self {
        self.soft_delete = Some(column.into());
        self
    }

    /// Returns the primary-key column: the schema's, or `id`.
    #[must_use]
    pub fn primary_key(&self) -> &str {
        self.schema
            .as_ref()
            .map_or("id", |schema| schema.primary_key.as_str())
    }

    /// Derives a binding over another table on the same connection,
    /// carrying the soft-delete convention along.
    #[must_use]
    pub fn sibling(&self, table: &str) -> Self {
        Self {
            db: self.db.clone(),
            table: table.to_string(),
            schema: None,
            soft_delete: self.soft_delete.clone(),
        }
    }
}

impl fmt::Debug for TableBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableBinding")
            .field("table", &self.table)
            .field("schema", &self.schema.as_ref().map(|s| s.name.clone()))
            .field("soft_delete", &self.soft_delete)
            .finish_non_exhaustive()
    }
}
