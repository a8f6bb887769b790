//! # sorrel-runtime
//!
//! The runtime layer of the sorrel scripting language: the tagged value
//! universe, lexically scoped environments, runtime errors with stable
//! codes, the total value ordering and collection algorithms, the
//! schema/record/table data model, SQL parameter values and the
//! driver-agnostic [`Database`] trait.
//!
//! The evaluator and the query compiler build on these types; a driver
//! crate implements [`Database`].

pub mod binding;
pub mod collections;
pub mod database;
pub mod devlog;
pub mod dict;
pub mod env;
pub mod error;
pub mod flow;
pub mod id;
pub mod ordering;
pub mod pln;
pub mod record;
pub mod schema;
pub mod sql;
pub mod table;
pub mod value;

pub use binding::TableBinding;
pub use database::{Database, SqlRow};
pub use devlog::{DevLog, NoopDevLog};
pub use dict::Dict;
pub use env::Env;
pub use error::{ErrorClass, Result, RuntimeError};
pub use flow::Flow;
pub use id::IdStrategy;
pub use record::Record;
pub use schema::{FieldDef, FieldType, Relation, RelationKind, Schema};
pub use sql::SqlValue;
pub use table::TableValue;
pub use value::{Duration, FunctionValue, Money, Value};
