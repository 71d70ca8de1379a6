//! # Sluice
//!
//! Dynamic query construction and pagination over textual query templates.
//!
//! A [`QueryController`] takes a base template, structured [`FilterClause`]s,
//! ordering, grouping and paging, and produces parameterized [`Query`] values
//! plus a matching COUNT variant. Late-bound `#{...}` filter values are
//! resolved through an [`ExpressionResolver`] at build time, and a cached row
//! count is dropped as soon as one of them resolves differently.
//!
//! ```
//! use sluice::{FilterClause, NoopResolver, QueryController};
//!
//! let mut controller: QueryController<()> = QueryController::new();
//! controller.set_query("from Employee e")?;
//! controller.add_filter_clause(FilterClause::new().eq("status", "ACTIVE"));
//! controller.set_max_results(Some(20));
//!
//! let query = controller.build(&NoopResolver)?;
//! assert_eq!(query.text(), "from Employee e WHERE e.status = ? limit 20");
//! # Ok::<(), sluice::QueryError>(())
//! ```

pub mod alias;
pub mod assembler;
pub mod compile;
pub mod config;
pub mod controller;
pub mod dirty;
pub mod error;
pub mod executor;
pub mod filter;
pub mod function;
pub mod metrics;
pub mod pagination;
pub mod query;
pub mod resolve;
pub mod sort;
pub mod value_conversion;

pub use alias::RootAlias;
pub use assembler::QueryAssembler;
pub use compile::{CompiledFilter, PredicateCompiler};
pub use config::ControllerConfig;
pub use controller::{QueryController, Restrictions};
pub use dirty::{DirtySnapshot, DirtyTracker};
pub use error::QueryError;
pub use executor::{ExecutorError, MayPostgresExecutor, QueryExecutor};
pub use filter::{ColumnPredicate, FilterClause, FilterValue, GroupOperand, LogicalOperand, Operator, OperatorSpec};
pub use function::{ColumnFunction, Lower, Trim, Upper};
pub use pagination::{PaginationCache, PaginationState};
pub use query::Query;
pub use resolve::{ExpressionResolver, MapResolver, NoopResolver, PlaceholderSyntax, ResolveResult};
pub use sort::{Direction, GroupBy, Order, Sort};
pub use value_conversion::with_converted_params;

// Re-export the bound value type so callers need no direct sea-query dependency
pub use sea_query::Value;
