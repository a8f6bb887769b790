//! # sorrel-query
//!
//! The query layer of the sorrel scripting language: compilation of query
//! expressions to parameterised SQL (CTEs, correlated and join
//! sub-queries, aggregation, HAVING, upserts, soft deletes), identifier
//! safety for every name spliced into SQL text, the table binding
//! operations (`all`/`find`/`where`/.../`toSQL`) and eager relation
//! loading.
//!
//! Values never appear in SQL text; they bind through positional
//! `$1..$n` placeholders. The evaluator supplies a [`ValueResolver`] to
//! evaluate embedded expressions and drives execution through the
//! [`BindingOps`] trait.

pub mod binding_ops;
pub mod compiled;
mod cond;
pub mod delete;
pub mod eager;
pub mod ident;
pub mod insert;
pub mod options;
pub mod resolver;
pub mod select;
#[cfg(test)]
mod testutil;
pub mod update;

pub use binding_ops::{prepare_insert, validation_failure, BindingOps};
pub use compiled::CompiledQuery;
pub use delete::compile_delete;
pub use eager::{load_relations, NoSchemas, SchemaLookup};
pub use ident::{check_column_ref, check_identifier};
pub use insert::compile_insert;
pub use options::{parse_query_options, QueryOptions};
pub use resolver::ValueResolver;
pub use select::compile_select;
pub use update::compile_update;
