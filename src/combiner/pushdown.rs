//! Pushdown filter generation: turns constant buckets, LIKE/prefix
//! patterns and consecutive IN lists into `(comparison, constant,
//! column)` triples the storage scan can use for zone-map pruning.

use tracing::trace;

use crate::expr::{ComparisonOp, Expr, FunctionExpr, InListExpr, deparsed};
use crate::value::{LogicalType, Value};

use super::facts::ConstraintFact;
use super::{FilterCombiner, SetId};

/// Column slot in the scan's projection list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanColumn {
    /// Regular table column, by storage column id.
    Table(usize),
    /// The reserved row-id pseudo column; never eligible for pushdown.
    RowId,
}

/// One scan-time filter: `column <op> value`. `column_index` indexes the
/// projection list handed to [`FilterCombiner::generate_pushdown`];
/// `value` is never NULL and `op` is never `!=`.
#[derive(Debug, Clone, PartialEq)]
pub struct PushdownFilter {
    pub op: ComparisonOp,
    pub value: Value,
    pub column_index: usize,
}

/// Result of rewriting one residual filter into pushdown form.
struct Rewrite {
    filters: Vec<PushdownFilter>,
    /// Remove the residual filter: only when the triples are provably
    /// equivalent to it.
    remove: bool,
}

impl FilterCombiner {
    /// Produce pushdown filters for the scan described by `column_ids`
    /// (the projection list; entries give the storage column or mark the
    /// row-id pseudo column). Facts that were pushed down are dropped
    /// from the store so the residual stream does not repeat them;
    /// rewrites of residual filters remove the original only when the
    /// triples are an exact replacement.
    pub fn generate_pushdown(&mut self, column_ids: &[ScanColumn]) -> Vec<PushdownFilter> {
        let mut filters = Vec::new();
        self.bucket_filters_collect(column_ids, &mut filters);
        self.remaining_filters_rewrite(column_ids, &mut filters);
        filters
    }

    /// Push eligible constant facts down for every equivalence set whose
    /// members are plain column refs.
    fn bucket_filters_collect(&mut self, column_ids: &[ScanColumn], out: &mut Vec<PushdownFilter>) {
        let sets: Vec<SetId> = self.consts.keys().copied().collect();
        for set in sets {
            let first_eligible = self
                .consts
                .get(&set)
                .and_then(|bucket| bucket.first())
                .map(fact_pushable);
            if first_eligible != Some(true) {
                continue;
            }

            // projection indices of the set's column members; a row-id
            // or unmapped column disqualifies the whole set
            let Some(entries) = self.members.get(&set) else {
                continue;
            };
            let mut column_indices = Vec::new();
            let mut blocked = false;
            for entry in entries {
                let Some(Expr::Column(column)) = self.node_expr(*entry) else {
                    continue;
                };
                match column_ids.get(column.column_idx) {
                    Some(ScanColumn::Table(_)) => column_indices.push(column.column_idx),
                    Some(ScanColumn::RowId) | None => blocked = true,
                }
            }
            if blocked || column_indices.is_empty() {
                continue;
            }

            let Some(bucket) = self.consts.get_mut(&set) else {
                continue;
            };
            let (pushed, retained): (Vec<ConstraintFact>, Vec<ConstraintFact>) =
                std::mem::take(bucket).into_iter().partition(fact_pushable);
            *bucket = retained;

            for column_index in &column_indices {
                for fact in &pushed {
                    out.push(PushdownFilter {
                        op: fact.op,
                        value: fact.value.clone(),
                        column_index: *column_index,
                    });
                }
            }

            // a fully drained singleton column set has nothing left to
            // say; multi-member sets stay for equality emission
            let single_member = self.members.get(&set).is_some_and(|m| m.len() == 1);
            let drained = self.consts.get(&set).is_some_and(|bucket| bucket.is_empty());
            if single_member && drained {
                if let Some(entries) = self.members.remove(&set) {
                    for entry in entries {
                        self.set_of.remove(&entry);
                    }
                }
                self.consts.remove(&set);
            }
        }
    }

    /// Rewrite LIKE/prefix and consecutive-IN residual filters into
    /// range triples.
    fn remaining_filters_rewrite(&mut self, column_ids: &[ScanColumn], out: &mut Vec<PushdownFilter>) {
        let mut idx = 0;
        while idx < self.remaining.len() {
            let Some(filter) = self.remaining.get(idx) else {
                break;
            };
            let rewrite = match filter {
                Expr::Function(func) if self.settings.rewrite_like_patterns => {
                    string_filter_rewrite(func, column_ids)
                }
                Expr::In(in_list) if self.settings.rewrite_in_lists => {
                    in_filter_rewrite(in_list, column_ids, self.settings.max_in_list_values)
                }
                Expr::Column(_)
                | Expr::Constant(_)
                | Expr::Parameter(_)
                | Expr::Comparison(_)
                | Expr::Between(_)
                | Expr::Conjunction(_)
                | Expr::In(_)
                | Expr::Function(_) => None,
            };
            match rewrite {
                Some(rewrite) => {
                    trace!(
                        "pushdown rewrite of {} ({} filters)",
                        deparsed(filter),
                        rewrite.filters.len()
                    );
                    out.extend(rewrite.filters);
                    if rewrite.remove {
                        self.remaining.remove(idx);
                    } else {
                        idx += 1;
                    }
                }
                None => idx += 1,
            }
        }
    }
}

fn fact_pushable(fact: &ConstraintFact) -> bool {
    fact.op != ComparisonOp::NotEqual
        && !fact.value.is_null()
        && type_pushable(fact.value.logical_type())
}

fn type_pushable(ty: LogicalType) -> bool {
    ty.is_numeric() || matches!(ty, LogicalType::Varchar | LogicalType::Date)
}

/// `col ~~ 'pattern'` and `prefix(col, s)` against a string constant.
fn string_filter_rewrite(func: &FunctionExpr, column_ids: &[ScanColumn]) -> Option<Rewrite> {
    let (column_index, pattern) = string_function_parts(func, column_ids)?;
    match func.name.as_str() {
        "~~" => {
            let prefix: String = pattern
                .chars()
                .take_while(|c| *c != '%' && *c != '_')
                .collect();
            if prefix.is_empty() {
                // leading wildcard, nothing to push
                return None;
            }
            if prefix.len() == pattern.len() {
                // no wildcard at all: the pattern is an exact match and
                // fully replaces the LIKE
                return Some(Rewrite {
                    filters: vec![PushdownFilter {
                        op: ComparisonOp::Equal,
                        value: Value::varchar(prefix),
                        column_index,
                    }],
                    remove: true,
                });
            }
            let upper = prefix_successor(&prefix)?;
            Some(Rewrite {
                filters: vec![
                    PushdownFilter {
                        op: ComparisonOp::GreaterThanOrEqual,
                        value: Value::varchar(prefix),
                        column_index,
                    },
                    PushdownFilter {
                        op: ComparisonOp::LessThan,
                        value: Value::varchar(upper),
                        column_index,
                    },
                ],
                remove: false,
            })
        }
        "prefix" => {
            if pattern.is_empty() {
                return None;
            }
            let mut filters = vec![PushdownFilter {
                op: ComparisonOp::GreaterThanOrEqual,
                value: Value::varchar(pattern),
                column_index,
            }];
            if let Some(upper) = prefix_successor(pattern) {
                filters.push(PushdownFilter {
                    op: ComparisonOp::LessThan,
                    value: Value::varchar(upper),
                    column_index,
                });
            }
            // the function still runs at execution time for exactness
            Some(Rewrite {
                filters,
                remove: false,
            })
        }
        _ => None,
    }
}

/// Match `name(col, 'literal')` with a pushable (non row-id) column and
/// a non-NULL string constant.
fn string_function_parts<'e>(
    func: &'e FunctionExpr,
    column_ids: &[ScanColumn],
) -> Option<(usize, &'e str)> {
    let [Expr::Column(column), Expr::Constant(value)] = func.args.as_slice() else {
        return None;
    };
    let pattern = value.as_str()?;
    match column_ids.get(column.column_idx)? {
        ScanColumn::Table(_) => Some((column.column_idx, pattern)),
        ScanColumn::RowId => None,
    }
}

/// Smallest string strictly above every string with this prefix, by
/// incrementing the final character. Restricted to ASCII finals below
/// 0x7F so the increment cannot wrap and the result stays valid UTF-8.
fn prefix_successor(prefix: &str) -> Option<String> {
    let mut next = prefix.to_owned();
    let last = next.pop()?;
    let code = u32::from(last);
    if !last.is_ascii() || code + 1 >= 0x80 {
        return None;
    }
    next.push(char::from_u32(code + 1)?);
    Some(next)
}

/// `col IN (v1, .., vn)` over constant integers: a dense consecutive run
/// collapses to `col >= min AND col <= max` and fully replaces the IN.
fn in_filter_rewrite(
    in_list: &InListExpr,
    column_ids: &[ScanColumn],
    max_values: usize,
) -> Option<Rewrite> {
    let Expr::Column(column) = in_list.probe.as_ref() else {
        return None;
    };
    match column_ids.get(column.column_idx)? {
        ScanColumn::RowId => return None,
        ScanColumn::Table(_) => {}
    }
    if in_list.values.is_empty() || in_list.values.len() > max_values {
        return None;
    }

    let mut values: Vec<(i128, &Value)> = Vec::with_capacity(in_list.values.len());
    for value_expr in &in_list.values {
        let Expr::Constant(value) = value_expr else {
            return None;
        };
        if !value.logical_type().is_integral() {
            return None;
        }
        // NULL defeats the rewrite: as_integral has nothing to return
        let integral = value.as_integral()?;
        values.push((integral, value));
    }
    values.sort_by_key(|(integral, _)| *integral);

    let consecutive = values.windows(2).all(|pair| match pair {
        [(low, _), (high, _)] => high.checked_sub(*low).is_some_and(|diff| diff <= 1),
        _ => true,
    });
    if !consecutive {
        return None;
    }

    let (_, first) = values.first()?;
    let (_, last) = values.last()?;
    Some(Rewrite {
        filters: vec![
            PushdownFilter {
                op: ComparisonOp::GreaterThanOrEqual,
                value: (*first).clone(),
                column_index: column.column_idx,
            },
            PushdownFilter {
                op: ComparisonOp::LessThanOrEqual,
                value: (*last).clone(),
                column_index: column.column_idx,
            },
        ],
        remove: true,
    })
}
