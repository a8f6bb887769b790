//! DSL schema objects.
//!
//! A schema names a table, an ordered field map with per-field constraint
//! metadata, and a relation map. Validation walks the fields and collects
//! per-field error messages; it never throws.

use indexmap::IndexMap;
use regex::Regex;

use crate::dict::Dict;
use crate::id::IdStrategy;
use crate::value::Value;

/// Declared type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Int,
    Float,
    Bool,
    Text,
    Datetime,
    Money,
    /// Accepts any value kind.
    Any,
}

impl FieldType {
    /// Returns the user-facing type name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Int => "integer",
            Self::Float => "float",
            Self::Bool => "boolean",
            Self::Text => "text",
            Self::Datetime => "datetime",
            Self::Money => "money",
            Self::Any => "any",
        }
    }

    /// Returns whether a value satisfies the declared type.
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Int => matches!(value, Value::Int(_)),
            Self::Float => matches!(value, Value::Int(_) | Value::Float(_)),
            Self::Bool => matches!(value, Value::Bool(_)),
            Self::Text => matches!(value, Value::Str(_)),
            Self::Datetime => match value {
                Value::Datetime(_) => true,
                // Datetime columns round-trip as RFC 3339 text.
                Value::Str(s) => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
                _ => false,
            },
            Self::Money => matches!(value, Value::Money(_)),
            Self::Any => true,
        }
    }
}

/// A schema field with its constraint metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    /// Declared type.
    pub field_type: FieldType,
    /// Whether the field must be present and non-null.
    pub required: bool,
    /// Id strategy for fields filled in on insert.
    pub auto: Option<IdStrategy>,
    /// Minimum character count for text fields.
    pub min_length: Option<usize>,
    /// Maximum character count for text fields.
    pub max_length: Option<usize>,
    /// Minimum numeric value.
    pub min_value: Option<f64>,
    /// Maximum numeric value.
    pub max_value: Option<f64>,
    /// Regex pattern source for text fields.
    pub pattern: Option<String>,
    /// Enumerated permitted values; empty means unconstrained.
    pub choices: Vec<Value>,
    /// Free-form metadata.
    pub metadata: IndexMap<String, String>,
}

impl FieldDef {
    /// Creates a field of the given type with no constraints.
    #[must_use]
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            auto: None,
            min_length: None,
            max_length: None,
            min_value: None,
            max_value: None,
            pattern: None,
            choices: Vec::new(),
            metadata: IndexMap::new(),
        }
    }

    /// Marks the field required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the field auto-filled with the given id strategy.
    #[must_use]
    pub fn auto(mut self, strategy: IdStrategy) -> Self {
        self.auto = Some(strategy);
        self
    }

    /// Sets the minimum character count.
    #[must_use]
    pub fn min_length(mut self, n: usize) -> Self {
        self.min_length = Some(n);
        self
    }

    /// Sets the maximum character count.
    #[must_use]
    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = Some(n);
        self
    }

    /// Sets the minimum numeric value.
    #[must_use]
    pub fn min_value(mut self, n: f64) -> Self {
        self.min_value = Some(n);
        self
    }

    /// Sets the maximum numeric value.
    #[must_use]
    pub fn max_value(mut self, n: f64) -> Self {
        self.max_value = Some(n);
        self
    }

    /// Sets a regex pattern the text value must match.
    #[must_use]
    pub fn pattern(mut self, source: impl Into<String>) -> Self {
        self.pattern = Some(source.into());
        self
    }

    /// Restricts the field to the given values.
    #[must_use]
    pub fn choices(mut self, values: Vec<Value>) -> Self {
        self.choices = values;
        self
    }
}

/// Relation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// The foreign key lives on this schema's table and points at one
    /// parent row.
    BelongsTo,
    /// The foreign key lives on the target table and points back at this
    /// schema's rows.
    HasMany,
}

/// A named relation to another table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    /// Target table name.
    pub target_table: String,
    /// Relation kind.
    pub kind: RelationKind,
    /// Foreign-key column: on this table for belongs-to, on the target
    /// table for has-many.
    pub foreign_key: String,
}

/// A DSL schema: name, table, ordered fields and relations.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    /// Schema name as declared in source.
    pub name: String,
    /// Backing table name.
    pub table: String,
    /// Primary-key column.
    pub primary_key: String,
    /// Fields in declaration order.
    pub fields: IndexMap<String, FieldDef>,
    /// Relations in declaration order.
    pub relations: IndexMap<String, Relation>,
}

impl Schema {
    /// Creates an empty schema over a table, with `id` as primary key.
    #[must_use]
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            primary_key: "id".to_string(),
            fields: IndexMap::new(),
            relations: IndexMap::new(),
        }
    }

    /// Overrides the primary-key column.
    #[must_use]
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// Adds a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, def: FieldDef) -> Self {
        self.fields.insert(name.into(), def);
        self
    }

    /// Adds a belongs-to relation; `foreign_key` is a column of this
    /// schema's table.
    #[must_use]
    pub fn belongs_to(
        mut self,
        name: impl Into<String>,
        target_table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.relations.insert(
            name.into(),
            Relation {
                target_table: target_table.into(),
                kind: RelationKind::BelongsTo,
                foreign_key: foreign_key.into(),
            },
        );
        self
    }

    /// Adds a has-many relation; `foreign_key` is a column of the target
    /// table.
    #[must_use]
    pub fn has_many(
        mut self,
        name: impl Into<String>,
        target_table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        self.relations.insert(
            name.into(),
            Relation {
                target_table: target_table.into(),
                kind: RelationKind::HasMany,
                foreign_key: foreign_key.into(),
            },
        );
        self
    }

    /// Looks up a relation by name.
    #[must_use]
    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    /// Validates a dictionary against the schema, collecting per-field
    /// error messages. An empty map means the data is valid. Keys not
    /// declared in the schema are ignored.
    #[must_use]
    pub fn validate(&self, data: &Dict) -> IndexMap<String, Vec<String>> {
        self.run_validation(data, false)
    }

    /// Validates only the fields present in `data`; absent fields are
    /// never an error. Used for partial updates.
    #[must_use]
    pub fn validate_partial(&self, data: &Dict) -> IndexMap<String, Vec<String>> {
        self.run_validation(data, true)
    }

    fn run_validation(&self, data: &Dict, partial: bool) -> IndexMap<String, Vec<String>> {
        let mut errors: IndexMap<String, Vec<String>> = IndexMap::new();

        for (name, def) in &self.fields {
            if partial && !data.contains_key(name) {
                continue;
            }
            let value = match data.get(name) {
                None | Some(Value::Null) => {
                    if def.required && def.auto.is_none() {
                        errors.insert(name.clone(), vec!["is required".to_string()]);
                    }
                    continue;
                }
                Some(value) => value,
            };
            let mut field_errors = Vec::new();

            if !def.field_type.matches(value) {
                field_errors.push(format!("must be a {}", def.field_type.name()));
            }

            if let Value::Str(s) = value {
                let chars = s.chars().count();
                if let Some(min) = def.min_length {
                    if chars < min {
                        field_errors.push(format!("must have at least {min} characters"));
                    }
                }
                if let Some(max) = def.max_length {
                    if chars > max {
                        field_errors.push(format!("must have at most {max} characters"));
                    }
                }
                if let Some(pattern) = &def.pattern {
                    match Regex::new(pattern) {
                        Ok(re) => {
                            if !re.is_match(s) {
                                field_errors.push("has an invalid format".to_string());
                            }
                        }
                        Err(_) => field_errors.push("has an unusable pattern".to_string()),
                    }
                }
            }

            if let Some(n) = value.as_number() {
                if let Some(min) = def.min_value {
                    if n < min {
                        field_errors.push(format!("must be at least {min}"));
                    }
                }
                if let Some(max) = def.max_value {
                    if n > max {
                        field_errors.push(format!("must be at most {max}"));
                    }
                }
            }

            if !def.choices.is_empty() && !def.choices.contains(value) {
                let choices: Vec<String> = def.choices.iter().map(Value::to_string).collect();
                field_errors.push(format!("must be one of: {}", choices.join(", ")));
            }

            if !field_errors.is_empty() {
                errors.insert(name.clone(), field_errors);
            }
        }

        errors
    }
}
