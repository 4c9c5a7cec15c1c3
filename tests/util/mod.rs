#![allow(dead_code)]

//! Shared helpers for the integration tests: terse expression builders
//! and a reference row-level evaluator used to check that the combiner's
//! output is equivalent to its input.

use filterfuse::combiner::PushdownFilter;
use filterfuse::expr::{
    ColumnRef, ComparisonExpr, ComparisonOp, ConjunctionExpr, ConjunctionOp, Expr, FunctionExpr,
    InListExpr,
};
use filterfuse::value::{LogicalType, Value};

/// Route combiner tracing into the test harness output. Safe to call
/// from every test; only the first call installs the subscriber.
pub fn tracing_init() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

pub fn col(column_idx: usize, ty: LogicalType) -> Expr {
    Expr::Column(ColumnRef {
        table_idx: 0,
        column_idx,
        ty,
    })
}

pub fn int_col(column_idx: usize) -> Expr {
    col(column_idx, LogicalType::Integer)
}

pub fn int(v: i32) -> Expr {
    Expr::Constant(Value::integer(v))
}

pub fn varchar(s: &str) -> Expr {
    Expr::Constant(Value::varchar(s))
}

pub fn cmp(op: ComparisonOp, lexpr: Expr, rexpr: Expr) -> Expr {
    Expr::Comparison(ComparisonExpr {
        op,
        lexpr: Box::new(lexpr),
        rexpr: Box::new(rexpr),
    })
}

/// `col + k`, the classic non-column non-foldable probe expression.
pub fn plus(expr: Expr, k: i32) -> Expr {
    Expr::Function(FunctionExpr {
        name: "+".into(),
        args: vec![expr, int(k)],
    })
}

pub fn like(column_idx: usize, pattern: &str) -> Expr {
    Expr::Function(FunctionExpr {
        name: "~~".into(),
        args: vec![col(column_idx, LogicalType::Varchar), varchar(pattern)],
    })
}

pub fn in_list(column_idx: usize, values: Vec<Expr>) -> Expr {
    Expr::In(InListExpr {
        probe: Box::new(int_col(column_idx)),
        values,
    })
}

/// Reference evaluation of an expression against a row (indexed by
/// `column_idx`). Returns None for SQL NULL.
pub fn expr_evaluate(expr: &Expr, row: &[Value]) -> Option<Value> {
    match expr {
        Expr::Column(column) => row.get(column.column_idx).cloned(),
        Expr::Constant(value) => Some(value.clone()),
        Expr::Parameter(_) => None,
        Expr::Comparison(cmp) => {
            let left = expr_evaluate(&cmp.lexpr, row)?;
            let right = expr_evaluate(&cmp.rexpr, row)?;
            Some(values_compare(cmp.op, &left, &right))
        }
        Expr::Between(between) => {
            let input = expr_evaluate(&between.input, row)?;
            let lower = expr_evaluate(&between.lower, row)?;
            let upper = expr_evaluate(&between.upper, row)?;
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
            let low = values_compare(lower_op, &lower, &input);
            let high = values_compare(upper_op, &input, &upper);
            Some(booleans_and(&low, &high))
        }
        Expr::Conjunction(conj) => Some(conjunction_evaluate(conj, row)),
        Expr::In(in_list) => Some(in_evaluate(in_list, row)),
        Expr::Function(func) => function_evaluate(func, row),
    }
}

/// SQL-style truthiness: NULL and false both reject the row.
pub fn filter_matches(expr: &Expr, row: &[Value]) -> bool {
    expr_evaluate(expr, row)
        .and_then(|v| v.cast_boolean())
        .unwrap_or(false)
}

pub fn filters_match(filters: &[Expr], row: &[Value]) -> bool {
    filters.iter().all(|filter| filter_matches(filter, row))
}

/// Scan-time semantics of a pushdown triple: NULL never passes.
pub fn pushdown_matches(filter: &PushdownFilter, row: &[Value]) -> bool {
    let Some(value) = row.get(filter.column_index) else {
        return false;
    };
    values_compare(filter.op, value, &filter.value)
        .cast_boolean()
        .unwrap_or(false)
}

pub fn pushdowns_match(filters: &[PushdownFilter], row: &[Value]) -> bool {
    filters.iter().all(|filter| pushdown_matches(filter, row))
}

fn values_compare(op: ComparisonOp, left: &Value, right: &Value) -> Value {
    use std::cmp::Ordering;

    if left.is_null() || right.is_null() {
        return Value::null(LogicalType::Boolean);
    }
    let Some(ord) = left.compare(right) else {
        return Value::null(LogicalType::Boolean);
    };
    let result = match op {
        ComparisonOp::Equal => ord == Ordering::Equal,
        ComparisonOp::NotEqual => ord != Ordering::Equal,
        ComparisonOp::LessThan => ord == Ordering::Less,
        ComparisonOp::LessThanOrEqual => ord != Ordering::Greater,
        ComparisonOp::GreaterThan => ord == Ordering::Greater,
        ComparisonOp::GreaterThanOrEqual => ord != Ordering::Less,
    };
    Value::boolean(result)
}

fn booleans_and(left: &Value, right: &Value) -> Value {
    match (left.cast_boolean(), right.cast_boolean()) {
        (Some(false), _) | (_, Some(false)) => Value::boolean(false),
        (Some(true), Some(true)) => Value::boolean(true),
        (None, _) | (_, None) => Value::null(LogicalType::Boolean),
    }
}

fn conjunction_evaluate(conj: &ConjunctionExpr, row: &[Value]) -> Value {
    let mut saw_null = false;
    for child in &conj.children {
        let truth = expr_evaluate(child, row).and_then(|v| v.cast_boolean());
        match (conj.op, truth) {
            (ConjunctionOp::And, Some(false)) => return Value::boolean(false),
            (ConjunctionOp::Or, Some(true)) => return Value::boolean(true),
            (ConjunctionOp::And | ConjunctionOp::Or, None) => saw_null = true,
            (ConjunctionOp::And, Some(true)) | (ConjunctionOp::Or, Some(false)) => {}
        }
    }
    if saw_null {
        Value::null(LogicalType::Boolean)
    } else {
        Value::boolean(conj.op == ConjunctionOp::And)
    }
}

fn in_evaluate(in_list: &InListExpr, row: &[Value]) -> Value {
    let Some(probe) = expr_evaluate(&in_list.probe, row) else {
        return Value::null(LogicalType::Boolean);
    };
    if probe.is_null() {
        return Value::null(LogicalType::Boolean);
    }
    let mut saw_null = false;
    for value_expr in &in_list.values {
        let Some(value) = expr_evaluate(value_expr, row) else {
            saw_null = true;
            continue;
        };
        if value.is_null() {
            saw_null = true;
            continue;
        }
        if values_compare(ComparisonOp::Equal, &probe, &value)
            .cast_boolean()
            .unwrap_or(false)
        {
            return Value::boolean(true);
        }
    }
    if saw_null {
        Value::null(LogicalType::Boolean)
    } else {
        Value::boolean(false)
    }
}

fn function_evaluate(func: &FunctionExpr, row: &[Value]) -> Option<Value> {
    match func.name.as_str() {
        "+" => {
            let [left, right] = func.args.as_slice() else {
                return None;
            };
            let left = expr_evaluate(left, row)?;
            let right = expr_evaluate(right, row)?;
            let sum = left.as_integral()? + right.as_integral()?;
            Some(Value::bigint(i64::try_from(sum).ok()?))
        }
        "~~" => {
            let [input, pattern] = func.args.as_slice() else {
                return None;
            };
            let input = expr_evaluate(input, row)?;
            let pattern = expr_evaluate(pattern, row)?;
            if input.is_null() || pattern.is_null() {
                return Some(Value::null(LogicalType::Boolean));
            }
            Some(Value::boolean(like_matches(
                input.as_str()?,
                pattern.as_str()?,
            )))
        }
        "prefix" => {
            let [input, prefix] = func.args.as_slice() else {
                return None;
            };
            let input = expr_evaluate(input, row)?;
            let prefix = expr_evaluate(prefix, row)?;
            if input.is_null() || prefix.is_null() {
                return Some(Value::null(LogicalType::Boolean));
            }
            Some(Value::boolean(input.as_str()?.starts_with(prefix.as_str()?)))
        }
        _ => None,
    }
}

/// Reference LIKE matcher: `%` matches any run, `_` a single character.
pub fn like_matches(input: &str, pattern: &str) -> bool {
    fn matches(input: &[char], pattern: &[char]) -> bool {
        match pattern.split_first() {
            None => input.is_empty(),
            Some((&c, rest)) if c == '%' => (0..=input.len())
                .any(|skip| input.get(skip..).is_some_and(|tail| matches(tail, rest))),
            Some((&c, rest)) if c == '_' => input
                .split_first()
                .is_some_and(|(_, input_rest)| matches(input_rest, rest)),
            Some((&c, rest)) => input
                .split_first()
                .is_some_and(|(&first, input_rest)| first == c && matches(input_rest, rest)),
        }
    }
    let input: Vec<char> = input.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    matches(&input, &pattern)
}
