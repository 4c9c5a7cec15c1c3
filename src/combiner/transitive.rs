//! Transitive fact inference. A deferred comparison such as `a >= b`
//! becomes useful once `b` picks up constant facts: `b = 10` lets the
//! combiner derive `a >= 10`, and chains of comparisons propagate
//! recursively through the deferred list.

use tracing::trace;

use crate::expr::{ComparisonExpr, ComparisonOp, Expr, deparsed};

use super::facts::{BucketOutcome, ConstraintFact};
use super::{Absorption, FilterCombiner};

impl FilterCombiner {
    /// Try to derive constant facts for the left side of `a CMP b` from
    /// the facts already known on `b`'s set. Returns `Unsupported` when
    /// nothing could be derived, leaving the comparison for the caller
    /// to keep.
    pub(super) fn transitive_filters_add(&mut self, cmp: &ComparisonExpr) -> Absorption {
        let left_node = self.canonical_id(&cmp.lexpr);
        let right_node = self.canonical_id(&cmp.rexpr);
        if left_node == right_node {
            return Absorption::Unsupported;
        }
        let left_set = self.set_for(left_node);
        let right_set = self.set_for(right_node);
        if left_set == right_set {
            // The sides are proven equal: a strict comparison can never
            // hold, an inclusive one always does.
            return match cmp.op {
                ComparisonOp::GreaterThan | ComparisonOp::LessThan => Absorption::Unsatisfiable,
                ComparisonOp::GreaterThanOrEqual
                | ComparisonOp::LessThanOrEqual
                | ComparisonOp::Equal
                | ComparisonOp::NotEqual => Absorption::Absorbed,
            };
        }

        let right_facts = self.consts.get(&right_set).cloned().unwrap_or_default();
        let mut derived_any = false;
        let mut requeued = false;
        for fact in right_facts {
            // For `b = v` the comparison itself is fully captured by the
            // derived fact; for inequality facts the derived fact is an
            // over-approximation and `a CMP b` must stay behind.
            let (derived_op, keep_comparison) = if fact.op == ComparisonOp::Equal {
                (cmp.op, false)
            } else if (cmp.op == ComparisonOp::GreaterThanOrEqual && fact.op.is_greater())
                || (cmp.op == ComparisonOp::LessThanOrEqual && fact.op.is_less())
            {
                (fact.op, true)
            } else if (cmp.op == ComparisonOp::GreaterThan && fact.op.is_greater())
                || (cmp.op == ComparisonOp::LessThan && fact.op.is_less())
            {
                (cmp.op, true)
            } else {
                continue;
            };

            if keep_comparison && !requeued {
                self.remaining.push(Expr::Comparison(cmp.clone()));
                requeued = true;
            }
            let derived = ConstraintFact {
                op: derived_op,
                value: fact.value,
            };
            if self.set_fact_add(left_set, derived) == BucketOutcome::Unsatisfiable {
                return Absorption::Unsatisfiable;
            }
            derived_any = true;
        }

        if !derived_any {
            return Absorption::Unsupported;
        }
        trace!("derived transitive facts from {}", deparsed(cmp));
        // the left side just picked up facts; it may unlock another
        // deferred comparison
        match self.transitive_probe(&cmp.lexpr) {
            BucketOutcome::Unsatisfiable => Absorption::Unsatisfiable,
            BucketOutcome::Consistent => Absorption::Absorbed,
        }
    }

    /// Re-check the deferred list after `probe`'s set gained facts: a
    /// comparison whose right side is `probe` is pulled out and
    /// re-absorbed, returning to the list only if still unsupported.
    pub(super) fn transitive_probe(&mut self, probe: &Expr) -> BucketOutcome {
        let Some(deferred) = self.transitive_filter_take(probe) else {
            return BucketOutcome::Consistent;
        };
        match self.transitive_filters_add(&deferred) {
            Absorption::Absorbed => BucketOutcome::Consistent,
            Absorption::Unsatisfiable => BucketOutcome::Unsatisfiable,
            Absorption::Unsupported => {
                self.remaining.push(Expr::Comparison(deferred));
                BucketOutcome::Consistent
            }
        }
    }

    /// Remove and return the first deferred comparison whose right side
    /// structurally equals `probe`. Only column refs are probed, and
    /// `!=` comparisons carry no transitive information.
    fn transitive_filter_take(&mut self, probe: &Expr) -> Option<ComparisonExpr> {
        if !matches!(probe, Expr::Column(_)) {
            return None;
        }
        let position = self.remaining.iter().position(|filter| {
            matches!(
                filter,
                Expr::Comparison(cmp)
                    if cmp.op != ComparisonOp::NotEqual && *cmp.rexpr == *probe
            )
        })?;
        match self.remaining.remove(position) {
            Expr::Comparison(cmp) => Some(cmp),
            other @ (Expr::Column(_)
            | Expr::Constant(_)
            | Expr::Parameter(_)
            | Expr::Between(_)
            | Expr::Conjunction(_)
            | Expr::In(_)
            | Expr::Function(_)) => {
                self.remaining.insert(position, other);
                None
            }
        }
    }
}
