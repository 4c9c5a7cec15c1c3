//! Folding of column-free expressions to constants. Ingestion uses this
//! to resolve the scalar side of comparisons and to decide foldable
//! filters outright; anything it cannot fold stays a residual filter.

use error_set::error_set;

use crate::expr::{BetweenExpr, ComparisonExpr, ComparisonOp, ConjunctionExpr, ConjunctionOp, Expr};
use crate::value::{LogicalType, Value};

error_set! {
    EvaluateError = {
        #[display("expression depends on row data")]
        NotFoldable,
        #[display("cannot compare {left} with {right}")]
        IncomparableTypes { left: String, right: String },
        #[display("cannot fold {kind} expressions")]
        Unsupported { kind: &'static str },
    };
}

/// Evaluate a foldable expression to a single value.
pub fn scalar_evaluate(expr: &Expr) -> Result<Value, EvaluateError> {
    match expr {
        Expr::Constant(value) => Ok(value.clone()),
        Expr::Column(_) | Expr::Parameter(_) => Err(EvaluateError::NotFoldable),
        Expr::Comparison(cmp) => comparison_evaluate(cmp),
        Expr::Between(between) => between_evaluate(between),
        Expr::Conjunction(conj) => conjunction_evaluate(conj),
        Expr::In(_) => Err(EvaluateError::Unsupported { kind: "IN" }),
        Expr::Function(_) => Err(EvaluateError::Unsupported { kind: "function" }),
    }
}

/// Compare two constants under SQL semantics: NULL on either side yields
/// a NULL boolean, incomparable types are an error.
pub fn values_compare(
    op: ComparisonOp,
    left: &Value,
    right: &Value,
) -> Result<Value, EvaluateError> {
    use std::cmp::Ordering;

    if left.is_null() || right.is_null() {
        return Ok(Value::null(LogicalType::Boolean));
    }
    let Some(ord) = left.compare(right) else {
        return Err(EvaluateError::IncomparableTypes {
            left: left.logical_type().as_ref().to_owned(),
            right: right.logical_type().as_ref().to_owned(),
        });
    };
    let result = match op {
        ComparisonOp::Equal => ord == Ordering::Equal,
        ComparisonOp::NotEqual => ord != Ordering::Equal,
        ComparisonOp::LessThan => ord == Ordering::Less,
        ComparisonOp::LessThanOrEqual => ord != Ordering::Greater,
        ComparisonOp::GreaterThan => ord == Ordering::Greater,
        ComparisonOp::GreaterThanOrEqual => ord != Ordering::Less,
    };
    Ok(Value::boolean(result))
}

fn comparison_evaluate(cmp: &ComparisonExpr) -> Result<Value, EvaluateError> {
    let left = scalar_evaluate(&cmp.lexpr)?;
    let right = scalar_evaluate(&cmp.rexpr)?;
    values_compare(cmp.op, &left, &right)
}

fn between_evaluate(between: &BetweenExpr) -> Result<Value, EvaluateError> {
    let input = scalar_evaluate(&between.input)?;
    let lower = scalar_evaluate(&between.lower)?;
    let upper = scalar_evaluate(&between.upper)?;

    let lower_op = if between.lower_inclusive {
        ComparisonOp::LessThanOrEqual
    } else {
        ComparisonOp::LessThan
    };
    let upper_op = if between.upper_inclusive {
        ComparisonOp::LessThanOrEqual
    } else {
        ComparisonOp::LessThan
    };
    let low = values_compare(lower_op, &lower, &input)?;
    let high = values_compare(upper_op, &input, &upper)?;
    Ok(booleans_fold(
        ConjunctionOp::And,
        [low, high].iter().map(Value::cast_boolean),
    ))
}

fn conjunction_evaluate(conj: &ConjunctionExpr) -> Result<Value, EvaluateError> {
    let folded: Vec<Option<bool>> = conj
        .children
        .iter()
        .map(|child| scalar_evaluate(child).map(|v| v.cast_boolean()))
        .collect::<Result<_, _>>()?;
    Ok(booleans_fold(conj.op, folded.into_iter()))
}

/// Three-valued AND/OR over already-cast operands (None = NULL).
fn booleans_fold(op: ConjunctionOp, operands: impl Iterator<Item = Option<bool>>) -> Value {
    let mut saw_null = false;
    for operand in operands {
        match (op, operand) {
            (ConjunctionOp::And, Some(false)) => return Value::boolean(false),
            (ConjunctionOp::Or, Some(true)) => return Value::boolean(true),
            (ConjunctionOp::And | ConjunctionOp::Or, None) => saw_null = true,
            (ConjunctionOp::And, Some(true)) | (ConjunctionOp::Or, Some(false)) => {}
        }
    }
    if saw_null {
        Value::null(LogicalType::Boolean)
    } else {
        Value::boolean(op == ConjunctionOp::And)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn int(v: i32) -> Expr {
        Expr::Constant(Value::integer(v))
    }

    #[test]
    fn constant_folds_to_itself() {
        assert_eq!(scalar_evaluate(&int(5)).unwrap(), Value::integer(5));
    }

    #[test]
    fn comparison_folds() {
        let cmp = Expr::Comparison(ComparisonExpr {
            op: ComparisonOp::LessThan,
            lexpr: Box::new(int(3)),
            rexpr: Box::new(int(5)),
        });
        assert_eq!(scalar_evaluate(&cmp).unwrap(), Value::boolean(true));
    }

    #[test]
    fn null_comparison_folds_to_null() {
        let cmp = Expr::Comparison(ComparisonExpr {
            op: ComparisonOp::Equal,
            lexpr: Box::new(Expr::Constant(Value::null(LogicalType::Integer))),
            rexpr: Box::new(int(5)),
        });
        let folded = scalar_evaluate(&cmp).unwrap();
        assert!(folded.is_null());
    }

    #[test]
    fn incomparable_types_error() {
        let cmp = Expr::Comparison(ComparisonExpr {
            op: ComparisonOp::Equal,
            lexpr: Box::new(Expr::Constant(Value::varchar("5"))),
            rexpr: Box::new(int(5)),
        });
        assert!(matches!(
            scalar_evaluate(&cmp),
            Err(EvaluateError::IncomparableTypes { .. })
        ));
    }

    #[test]
    fn between_folds_with_exclusive_bounds() {
        let between = Expr::Between(BetweenExpr {
            input: Box::new(int(5)),
            lower: Box::new(int(5)),
            upper: Box::new(int(10)),
            lower_inclusive: false,
            upper_inclusive: true,
        });
        assert_eq!(scalar_evaluate(&between).unwrap(), Value::boolean(false));
    }

    #[test]
    fn conjunction_three_valued() {
        let null = Expr::Constant(Value::null(LogicalType::Boolean));
        let t = Expr::Constant(Value::boolean(true));
        let f = Expr::Constant(Value::boolean(false));

        let and_null = Expr::Conjunction(ConjunctionExpr {
            op: ConjunctionOp::And,
            children: vec![t.clone(), null.clone()],
        });
        assert!(scalar_evaluate(&and_null).unwrap().is_null());

        let and_false = Expr::Conjunction(ConjunctionExpr {
            op: ConjunctionOp::And,
            children: vec![null.clone(), f.clone()],
        });
        assert_eq!(scalar_evaluate(&and_false).unwrap(), Value::boolean(false));

        let or_true = Expr::Conjunction(ConjunctionExpr {
            op: ConjunctionOp::Or,
            children: vec![null, t],
        });
        assert_eq!(scalar_evaluate(&or_true).unwrap(), Value::boolean(true));
    }

    #[test]
    fn row_dependent_input_is_not_foldable() {
        let col = Expr::Column(crate::expr::ColumnRef {
            table_idx: 0,
            column_idx: 0,
            ty: LogicalType::Integer,
        });
        assert!(matches!(
            scalar_evaluate(&col),
            Err(EvaluateError::NotFoldable)
        ));
    }
}
