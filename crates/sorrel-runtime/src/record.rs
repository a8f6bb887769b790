//! Records: a dictionary paired with a schema.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::dict::Dict;
use crate::schema::Schema;

/// A dictionary paired with a schema, possibly validated.
///
/// Records drawn from the database are trusted and carry `validated =
/// true` with empty errors; records built from user input must be
/// validated explicitly before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// The schema the data is bound to.
    pub schema: Rc<Schema>,
    /// The row data.
    pub data: Dict,
    /// Whether validation has run (or the record is of trusted origin).
    pub validated: bool,
    /// Per-field validation errors; non-empty iff validation failed.
    pub errors: IndexMap<String, Vec<String>>,
}

impl Record {
    /// Creates an unvalidated record from user input.
    #[must_use]
    pub fn from_input(schema: Rc<Schema>, data: Dict) -> Self {
        Self {
            schema,
            data,
            validated: false,
            errors: IndexMap::new(),
        }
    }

    /// Creates a trusted record from a database row; constraints are not
    /// rerun.
    #[must_use]
    pub fn trusted(schema: Rc<Schema>, data: Dict) -> Self {
        Self {
            schema,
            data,
            validated: true,
            errors: IndexMap::new(),
        }
    }

    /// Runs schema validation, storing the error map. Returns whether the
    /// data is valid.
    pub fn validate(&mut self) -> bool {
        self.errors = self.schema.validate(&self.data);
        self.validated = true;
        self.errors.is_empty()
    }

    /// Returns whether the record has been validated without errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validated && self.errors.is_empty()
    }

    /// Returns the primary-key value, when present.
    #[must_use]
    pub fn primary_key_value(&self) -> Option<&crate::value::Value> {
        self.data.get(&self.schema.primary_key)
    }
}
