//! Query-family AST types.
//!
//! These nodes describe inline query expressions that the evaluator
//! compiles to parameterised SQL. Condition values, limits and offsets are
//! ordinary expressions evaluated against the current environment at
//! compile time; table and column names are plain identifiers that the
//! compiler gates before splicing into SQL text.

use core::fmt;

use crate::expression::Expr;
use crate::position::Position;
use crate::statement::Stmt;

/// The trailing operator of a query expression selecting its result shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTerminal {
    /// All matching rows as an array of dictionaries.
    Many,
    /// First matching row as a dictionary, or null.
    One,
    /// `SELECT COUNT(*)` as an integer.
    Count,
    /// One-row probe as a boolean.
    Exists,
    /// Run for side effects; result is null.
    Execute,
    /// Return `{sql, params}` without executing.
    ToSql,
}

/// Projection of a query or of a `RETURNING` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// `*`
    All,
    /// An explicit column list.
    Columns(Vec<String>),
}

/// Logical connective joining a condition to the condition before it.
///
/// The first condition's connective is ignored; adjacent conditions
/// default to `And` when the source carries no explicit connective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl Logic {
    /// Returns the SQL keyword for the connective.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// Comparison operators usable in query conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl CompareOp {
    /// Returns the SQL spelling for operators with a single right-hand
    /// placeholder. `In`/`NotIn`/`IsNull`/`IsNotNull` are rendered by the
    /// compiler instead.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Like => "LIKE",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
        }
    }

    /// Returns whether the operator takes a right-hand value.
    #[must_use]
    pub const fn takes_value(&self) -> bool {
        !matches!(self, Self::IsNull | Self::IsNotNull)
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// A query condition: either a single comparison or a parenthesised group.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column op value`
    Compare {
        /// Target column, or the alias of a computed field.
        column: String,
        /// Comparison operator.
        op: CompareOp,
        /// Right-hand expression; `None` for `IS [NOT] NULL`.
        value: Option<Box<Expr>>,
        /// Connective to the previous condition.
        logic: Logic,
    },
    /// A parenthesised sub-group of conditions.
    Group {
        /// Grouped conditions.
        conditions: Vec<Condition>,
        /// Connective to the previous condition.
        logic: Logic,
    },
}

impl Condition {
    /// Returns the connective joining this condition to the previous one.
    #[must_use]
    pub const fn logic(&self) -> Logic {
        match self {
            Self::Compare { logic, .. } | Self::Group { logic, .. } => *logic,
        }
    }
}

/// Sort direction; ascending when the source gives none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderDirection {
    #[default]
    Asc,
    Desc,
}

impl OrderDirection {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One `order by` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderField {
    /// Column to order by.
    pub column: String,
    /// Sort direction.
    pub direction: OrderDirection,
}

impl OrderField {
    /// Creates an ascending order field.
    #[must_use]
    pub fn asc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            direction: OrderDirection::Asc,
        }
    }

    /// Creates a descending order field.
    #[must_use]
    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            direction: OrderDirection::Desc,
        }
    }
}

/// Correlation between a sub-query column and an outer-query column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation {
    /// Column of the sub-query table.
    pub inner_column: String,
    /// Column of the outer query the sub-query references.
    pub outer_column: String,
}

/// A mini-SELECT used for CTEs and sub-queries.
#[derive(Debug, Clone, PartialEq)]
pub struct SubQuerySpec {
    /// Source table name.
    pub table: String,
    /// Projected columns; empty means `*`.
    pub columns: Vec<String>,
    /// Filter conditions.
    pub conditions: Vec<Condition>,
    /// Ordering.
    pub order_by: Vec<OrderField>,
    /// Row limit.
    pub limit: Option<i64>,
    /// Correlation with the outer query, when any.
    pub correlate: Option<Correlation>,
}

impl SubQuerySpec {
    /// Creates a spec selecting `*` from a table with no filters.
    #[must_use]
    pub fn table(name: &str) -> Self {
        Self {
            table: name.to_string(),
            columns: Vec::new(),
            conditions: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            correlate: None,
        }
    }
}

/// Aggregate functions available in computed fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFunc {
    /// Returns the SQL function name.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }
}

/// One `ON` equality of a join sub-query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOn {
    /// Column of the outer table.
    pub outer_column: String,
    /// Column of the joined table.
    pub inner_column: String,
}

/// A computed field of a query expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ComputedField {
    /// `FUNC(col) AS alias`
    Aggregate {
        alias: String,
        func: AggregateFunc,
        column: String,
    },
    /// `(SELECT ... WHERE inner = outer.col) AS alias`
    SubQuery {
        alias: String,
        /// Optional aggregate applied inside the sub-query.
        func: Option<AggregateFunc>,
        sub: SubQuerySpec,
    },
    /// `JOIN table alias ON ...`, contributing `alias.*` (or the listed
    /// columns) to the outer projection and multiplying rows.
    Join {
        alias: String,
        table: String,
        on: Vec<JoinOn>,
        /// Joined columns added to the projection; empty means `alias.*`.
        columns: Vec<String>,
    },
}

impl ComputedField {
    /// Returns the field's alias.
    #[must_use]
    pub fn alias(&self) -> &str {
        match self {
            Self::Aggregate { alias, .. }
            | Self::SubQuery { alias, .. }
            | Self::Join { alias, .. } => alias,
        }
    }
}

/// A named sub-SELECT placed in the `WITH` clause.
#[derive(Debug, Clone, PartialEq)]
pub struct CommonTableExpr {
    /// CTE name, visible to later CTEs and the main query.
    pub name: String,
    /// The CTE body.
    pub query: SubQuerySpec,
}

/// An eager-load relation path (`with a.b.c`).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RelationPath {
    /// Relation names, outermost first.
    pub path: Vec<String>,
    /// Optional filter applied to the loaded relation rows.
    pub conditions: Vec<Condition>,
    /// Optional ordering of the loaded relation rows.
    pub order_by: Vec<OrderField>,
    /// Optional per-record row limit.
    pub limit: Option<i64>,
}

impl RelationPath {
    /// Creates a bare path from dotted relation names.
    #[must_use]
    pub fn new(path: &str) -> Self {
        Self {
            path: path.split('.').map(str::to_string).collect(),
            ..Self::default()
        }
    }
}

/// A `@query(...)` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryExpr {
    /// Expression evaluating to the table binding to query.
    pub source: Box<Expr>,
    /// `WITH` clause members, in order.
    pub ctes: Vec<CommonTableExpr>,
    /// Filter conditions.
    pub conditions: Vec<Condition>,
    /// Computed fields.
    pub computed: Vec<ComputedField>,
    /// `GROUP BY` columns.
    pub group_by: Vec<String>,
    /// `ORDER BY` fields.
    pub order_by: Vec<OrderField>,
    /// `LIMIT` expression.
    pub limit: Option<Box<Expr>>,
    /// `OFFSET` expression.
    pub offset: Option<Box<Expr>>,
    /// Eager-load relation paths.
    pub relations: Vec<RelationPath>,
    /// Projection.
    pub projection: Projection,
    /// Result shape.
    pub terminal: QueryTerminal,
    /// Source position.
    pub pos: Position,
}

impl QueryExpr {
    /// Creates a bare `select * ... many` query over a source expression.
    #[must_use]
    pub fn new(source: Expr) -> Self {
        Self {
            source: Box::new(source),
            ctes: Vec::new(),
            conditions: Vec::new(),
            computed: Vec::new(),
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
            relations: Vec::new(),
            projection: Projection::All,
            terminal: QueryTerminal::Many,
            pos: Position::default(),
        }
    }
}

/// Batch insert source: `each {items} -> item |< ...`.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSpec {
    /// Expression evaluating to the iterated collection.
    pub source: Box<Expr>,
    /// Name the current element is bound to inside row values.
    pub binding: String,
    /// Optional name the zero-based index is bound to.
    pub index_binding: Option<String>,
}

/// An `@insert(...)` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertExpr {
    /// Expression evaluating to the target table binding.
    pub target: Box<Expr>,
    /// Column/value pairs for the inserted row.
    pub values: Vec<(String, Expr)>,
    /// Batch source; when present, `values` is evaluated once per element.
    pub batch: Option<BatchSpec>,
    /// Upsert conflict-target columns; empty means plain insert.
    pub conflict_keys: Vec<String>,
    /// `RETURNING` projection.
    pub returning: Option<Projection>,
    /// Result shape.
    pub terminal: QueryTerminal,
    /// Source position.
    pub pos: Position,
}

/// An `@update(...)` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateExpr {
    /// Expression evaluating to the target table binding.
    pub target: Box<Expr>,
    /// SET column/value pairs; must be non-empty.
    pub sets: Vec<(String, Expr)>,
    /// Filter conditions.
    pub conditions: Vec<Condition>,
    /// `RETURNING` projection.
    pub returning: Option<Projection>,
    /// Result shape.
    pub terminal: QueryTerminal,
    /// Source position.
    pub pos: Position,
}

/// A `@delete(...)` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteExpr {
    /// Expression evaluating to the target table binding.
    pub target: Box<Expr>,
    /// Filter conditions.
    pub conditions: Vec<Condition>,
    /// `RETURNING` projection.
    pub returning: Option<Projection>,
    /// Result shape.
    pub terminal: QueryTerminal,
    /// Source position.
    pub pos: Position,
}

/// A `@transaction { ... }` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionExpr {
    /// Statements executed inside the transaction, in order.
    pub statements: Vec<Stmt>,
    /// Source position.
    pub pos: Position,
}
