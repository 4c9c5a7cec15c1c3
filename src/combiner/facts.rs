//! Constant fact buckets. Each equivalence set carries a list of
//! `(comparison, constant)` facts kept pairwise-compact: no fact in a
//! bucket subsumes another, and contradictory insertions are detected at
//! insert time.

use std::cmp::Ordering;

use crate::expr::ComparisonOp;
use crate::value::Value;

/// A single `(comparison, constant)` constraint on an equivalence set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintFact {
    pub op: ComparisonOp,
    pub value: Value,
}

/// Outcome of comparing two facts on the same set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FactOrdering {
    /// The left fact is implied by the right one.
    PruneLeft,
    /// The right fact is implied by the left one.
    PruneRight,
    KeepBoth,
    /// No value can satisfy both facts.
    Unsatisfiable,
}

/// Outcome of inserting a fact into a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub(crate) enum BucketOutcome {
    Consistent,
    Unsatisfiable,
}

fn fact_ordering_invert(ordering: FactOrdering) -> FactOrdering {
    match ordering {
        FactOrdering::PruneLeft => FactOrdering::PruneRight,
        FactOrdering::PruneRight => FactOrdering::PruneLeft,
        FactOrdering::KeepBoth => FactOrdering::KeepBoth,
        FactOrdering::Unsatisfiable => FactOrdering::Unsatisfiable,
    }
}

/// Decide whether one fact subsumes the other or the pair is
/// contradictory. Facts whose values cannot be ordered (NULL constants,
/// mixed families) never interact.
pub(crate) fn fact_compare(left: &ConstraintFact, right: &ConstraintFact) -> FactOrdering {
    if left.value.is_null() || right.value.is_null() {
        return FactOrdering::KeepBoth;
    }
    let Some(ord) = left.value.compare(&right.value) else {
        return FactOrdering::KeepBoth;
    };

    if left.op == ComparisonOp::Equal {
        // The equality either satisfies the right fact (making it
        // redundant) or contradicts it.
        let satisfies = match right.op {
            ComparisonOp::Equal => ord == Ordering::Equal,
            ComparisonOp::NotEqual => ord != Ordering::Equal,
            ComparisonOp::LessThan => ord == Ordering::Less,
            ComparisonOp::LessThanOrEqual => ord != Ordering::Greater,
            ComparisonOp::GreaterThan => ord == Ordering::Greater,
            ComparisonOp::GreaterThanOrEqual => ord != Ordering::Less,
        };
        if satisfies {
            FactOrdering::PruneRight
        } else {
            FactOrdering::Unsatisfiable
        }
    } else if right.op == ComparisonOp::Equal {
        fact_ordering_invert(fact_compare(right, left))
    } else if left.op == ComparisonOp::NotEqual {
        // The exclusion is redundant when the right fact's half-line
        // already rules the excluded value out.
        let excluded = match right.op {
            ComparisonOp::LessThan => ord != Ordering::Less,
            ComparisonOp::LessThanOrEqual => ord == Ordering::Greater,
            ComparisonOp::GreaterThan => ord != Ordering::Greater,
            ComparisonOp::GreaterThanOrEqual => ord == Ordering::Less,
            ComparisonOp::NotEqual => ord == Ordering::Equal,
            // Handled by the equality branches above.
            ComparisonOp::Equal => false,
        };
        if excluded {
            FactOrdering::PruneLeft
        } else {
            FactOrdering::KeepBoth
        }
    } else if right.op == ComparisonOp::NotEqual {
        fact_ordering_invert(fact_compare(right, left))
    } else if left.op.is_greater() && right.op.is_greater() {
        match ord {
            Ordering::Greater => FactOrdering::PruneRight,
            Ordering::Less => FactOrdering::PruneLeft,
            // Equal bounds: the strict operator is tighter.
            Ordering::Equal => {
                if left.op == ComparisonOp::GreaterThanOrEqual {
                    FactOrdering::PruneLeft
                } else {
                    FactOrdering::PruneRight
                }
            }
        }
    } else if left.op.is_less() && right.op.is_less() {
        match ord {
            Ordering::Less => FactOrdering::PruneRight,
            Ordering::Greater => FactOrdering::PruneLeft,
            Ordering::Equal => {
                if left.op == ComparisonOp::LessThanOrEqual {
                    FactOrdering::PruneLeft
                } else {
                    FactOrdering::PruneRight
                }
            }
        }
    } else if left.op.is_less() {
        // Upper bound (left) against lower bound (right): the window is
        // empty when the upper endpoint sits below the lower one, or
        // when they touch without both sides being inclusive.
        match ord {
            Ordering::Greater => FactOrdering::KeepBoth,
            Ordering::Less => FactOrdering::Unsatisfiable,
            Ordering::Equal => {
                if left.op == ComparisonOp::LessThanOrEqual
                    && right.op == ComparisonOp::GreaterThanOrEqual
                {
                    FactOrdering::KeepBoth
                } else {
                    FactOrdering::Unsatisfiable
                }
            }
        }
    } else {
        fact_ordering_invert(fact_compare(right, left))
    }
}

/// Insert a fact into a bucket, pruning subsumed entries in a single
/// scan. The bucket stays pairwise-compact.
pub(crate) fn bucket_fact_add(bucket: &mut Vec<ConstraintFact>, fact: ConstraintFact) -> BucketOutcome {
    let mut idx = 0;
    while idx < bucket.len() {
        let Some(existing) = bucket.get(idx) else {
            break;
        };
        match fact_compare(existing, &fact) {
            FactOrdering::PruneLeft => {
                bucket.remove(idx);
            }
            FactOrdering::PruneRight => return BucketOutcome::Consistent,
            FactOrdering::Unsatisfiable => return BucketOutcome::Unsatisfiable,
            FactOrdering::KeepBoth => idx += 1,
        }
    }
    bucket.push(fact);
    BucketOutcome::Consistent
}
