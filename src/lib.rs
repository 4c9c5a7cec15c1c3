//! Filter combining for a query planner.
//!
//! The planner streams the bound conjuncts of a WHERE clause into a
//! [`combiner::FilterCombiner`], which canonicalizes expressions, proves
//! equivalences, compacts constant constraints, detects unsatisfiable
//! combinations and infers transitive facts. Afterwards it reads back
//! scan pushdown filters ([`combiner::FilterCombiner::generate_pushdown`])
//! and an equivalent reduced residual predicate stream
//! ([`combiner::FilterCombiner::generate_residual`]).
//!
//! ```
//! use filterfuse::combiner::{FilterCombiner, FilterResult, ScanColumn};
//! use filterfuse::expr::{ColumnRef, ComparisonExpr, ComparisonOp, Expr};
//! use filterfuse::value::{LogicalType, Value};
//!
//! let mut combiner = FilterCombiner::new();
//! let id = Expr::Column(ColumnRef {
//!     table_idx: 0,
//!     column_idx: 0,
//!     ty: LogicalType::Integer,
//! });
//! let result = combiner.add_filter(Expr::Comparison(ComparisonExpr {
//!     op: ComparisonOp::LessThan,
//!     lexpr: Box::new(id),
//!     rexpr: Box::new(Expr::Constant(Value::integer(10))),
//! }));
//! assert_eq!(result, FilterResult::Success);
//!
//! let pushdown = combiner.generate_pushdown(&[ScanColumn::Table(0)]);
//! assert_eq!(pushdown.len(), 1);
//! ```

pub mod combiner;
pub mod evaluate;
pub mod expr;
pub mod settings;
pub mod value;
