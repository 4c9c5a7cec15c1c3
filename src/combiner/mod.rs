//! The filter combiner: ingests bound WHERE-clause conjuncts, proves
//! expressions equal, keeps compact per-set constant constraints, and
//! emits a reduced residual filter stream plus scan pushdown filters.
//!
//! A combiner instance serves exactly one planning pass: stream filters
//! in with [`FilterCombiner::add_filter`], then read results back with
//! [`FilterCombiner::generate_pushdown`] followed by
//! [`FilterCombiner::generate_residual`], which clears the store.

mod facts;
mod pushdown;
mod transitive;

pub use pushdown::{PushdownFilter, ScanColumn};

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, trace};

use crate::evaluate::scalar_evaluate;
use crate::expr::{BetweenExpr, ComparisonExpr, ComparisonOp, Expr, deparsed};
use crate::settings::CombinerSettings;

use self::facts::{BucketOutcome, ConstraintFact, bucket_fact_add};

/// Outcome of pushing a filter into the combiner. After
/// `Unsatisfiable` the instance is only fit for discarding: the planner
/// replaces the scan with an empty result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum FilterResult {
    Success,
    Unsatisfiable,
}

/// Internal ingestion outcome; `Unsupported` never crosses the public
/// surface (the filter lands in `remaining` instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Absorption {
    Absorbed,
    Unsatisfiable,
    Unsupported,
}

/// Handle to an owned canonical expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct ExprId(usize);

/// Dense equivalence-set id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct SetId(usize);

#[derive(Debug)]
pub struct FilterCombiner {
    settings: CombinerSettings,
    /// Structural identity -> canonical handle. Two structurally equal
    /// expressions always resolve to the same handle.
    canonical: HashMap<Expr, ExprId>,
    /// Owned canonical expressions, addressed by [`ExprId`].
    nodes: Vec<Expr>,
    set_of: HashMap<ExprId, SetId>,
    /// Members per set, in insertion order. Ordered keys keep emission
    /// deterministic.
    members: BTreeMap<SetId, Vec<ExprId>>,
    consts: BTreeMap<SetId, Vec<ConstraintFact>>,
    next_set_id: usize,
    /// Filters the combiner could not absorb, in ingestion order. Owned
    /// here until emission or transitive inference consumes them.
    remaining: Vec<Expr>,
}

impl FilterCombiner {
    pub fn new() -> FilterCombiner {
        FilterCombiner::with_settings(CombinerSettings::default())
    }

    pub fn with_settings(settings: CombinerSettings) -> FilterCombiner {
        FilterCombiner {
            settings,
            canonical: HashMap::new(),
            nodes: Vec::new(),
            set_of: HashMap::new(),
            members: BTreeMap::new(),
            consts: BTreeMap::new(),
            next_set_id: 0,
            remaining: Vec::new(),
        }
    }

    /// Ingest one WHERE-clause conjunct. Filters the combiner cannot
    /// reason about are preserved verbatim and re-emitted by
    /// [`FilterCombiner::generate_residual`].
    pub fn add_filter(&mut self, expr: Expr) -> FilterResult {
        match self.filter_absorb(&expr) {
            Absorption::Absorbed => {
                trace!("absorbed filter {}", deparsed(&expr));
                FilterResult::Success
            }
            Absorption::Unsatisfiable => {
                debug!("filter set unsatisfiable at {}", deparsed(&expr));
                FilterResult::Unsatisfiable
            }
            Absorption::Unsupported => {
                trace!("keeping filter {}", deparsed(&expr));
                self.remaining.push(expr);
                FilterResult::Success
            }
        }
    }

    /// Whether emission would produce any residual or derived filter.
    pub fn has_filters(&self) -> bool {
        !self.remaining.is_empty()
            || self.members.values().any(|entries| entries.len() >= 2)
            || self.consts.values().any(|bucket| !bucket.is_empty())
    }

    /// Drain every residual and derived filter into `callback`, then
    /// clear the store. Equalities within a set are emitted as a
    /// spanning star on the first member; a set member with both a lower
    /// and an upper bound gets a single BETWEEN.
    pub fn generate_residual(&mut self, mut callback: impl FnMut(Expr)) {
        for filter in self.remaining.drain(..) {
            callback(filter);
        }

        let members = std::mem::take(&mut self.members);
        let mut consts = std::mem::take(&mut self.consts);
        for (set, entries) in members {
            let bucket = consts.remove(&set).unwrap_or_default();

            if let [first, rest @ ..] = entries.as_slice() {
                for other in rest {
                    let (Some(lexpr), Some(rexpr)) =
                        (self.node_expr(*first), self.node_expr(*other))
                    else {
                        continue;
                    };
                    callback(Expr::Comparison(ComparisonExpr {
                        op: ComparisonOp::Equal,
                        lexpr: Box::new(lexpr.clone()),
                        rexpr: Box::new(rexpr.clone()),
                    }));
                }
            }

            for entry in &entries {
                let Some(member) = self.node_expr(*entry) else {
                    continue;
                };
                let mut lower: Option<&ConstraintFact> = None;
                let mut upper: Option<&ConstraintFact> = None;
                for fact in &bucket {
                    if fact.op.is_greater() {
                        lower = Some(fact);
                    } else if fact.op.is_less() {
                        upper = Some(fact);
                    } else {
                        callback(Expr::Comparison(ComparisonExpr {
                            op: fact.op,
                            lexpr: Box::new(member.clone()),
                            rexpr: Box::new(Expr::Constant(fact.value.clone())),
                        }));
                    }
                }
                match (lower, upper) {
                    (Some(lower), Some(upper)) => callback(Expr::Between(BetweenExpr {
                        input: Box::new(member.clone()),
                        lower: Box::new(Expr::Constant(lower.value.clone())),
                        upper: Box::new(Expr::Constant(upper.value.clone())),
                        lower_inclusive: lower.op == ComparisonOp::GreaterThanOrEqual,
                        upper_inclusive: upper.op == ComparisonOp::LessThanOrEqual,
                    })),
                    (Some(bound), None) | (None, Some(bound)) => {
                        callback(Expr::Comparison(ComparisonExpr {
                            op: bound.op,
                            lexpr: Box::new(member.clone()),
                            rexpr: Box::new(Expr::Constant(bound.value.clone())),
                        }));
                    }
                    (None, None) => {}
                }
            }
        }

        self.canonical.clear();
        self.nodes.clear();
        self.set_of.clear();
        self.next_set_id = 0;
    }

    fn filter_absorb(&mut self, expr: &Expr) -> Absorption {
        if expr.has_parameter() {
            return Absorption::Unsupported;
        }
        if expr.is_foldable() {
            let Ok(value) = scalar_evaluate(expr) else {
                return Absorption::Unsupported;
            };
            return match value.cast_boolean() {
                Some(true) => Absorption::Absorbed,
                // NULL and false both reject every row
                Some(false) | None => Absorption::Unsatisfiable,
            };
        }
        match expr {
            Expr::Between(between) => self.between_absorb(between),
            Expr::Comparison(cmp) => self.comparison_absorb(cmp),
            Expr::Column(_)
            | Expr::Constant(_)
            | Expr::Parameter(_)
            | Expr::Conjunction(_)
            | Expr::In(_)
            | Expr::Function(_) => Absorption::Unsupported,
        }
    }

    /// Decompose a BETWEEN into constant facts on the input's set. An
    /// unfoldable bound is re-queued as a plain comparison so no
    /// constraint is lost.
    fn between_absorb(&mut self, between: &BetweenExpr) -> Absorption {
        let lower_value = if between.lower.is_foldable() {
            match scalar_evaluate(&between.lower) {
                Ok(value) => Some(value),
                Err(_) => return Absorption::Unsupported,
            }
        } else {
            None
        };
        let upper_value = if between.upper.is_foldable() {
            match scalar_evaluate(&between.upper) {
                Ok(value) => Some(value),
                Err(_) => return Absorption::Unsupported,
            }
        } else {
            None
        };
        if lower_value.is_none() && upper_value.is_none() {
            return Absorption::Unsupported;
        }

        let node = self.canonical_id(&between.input);
        let set = self.set_for(node);

        match lower_value {
            Some(value) => {
                let op = if between.lower_inclusive {
                    ComparisonOp::GreaterThanOrEqual
                } else {
                    ComparisonOp::GreaterThan
                };
                if self.set_fact_add(set, ConstraintFact { op, value }) == BucketOutcome::Unsatisfiable
                {
                    return Absorption::Unsatisfiable;
                }
            }
            None => self.remaining.push(Expr::Comparison(ComparisonExpr {
                op: if between.lower_inclusive {
                    ComparisonOp::GreaterThanOrEqual
                } else {
                    ComparisonOp::GreaterThan
                },
                lexpr: between.input.clone(),
                rexpr: between.lower.clone(),
            })),
        }
        match upper_value {
            Some(value) => {
                let op = if between.upper_inclusive {
                    ComparisonOp::LessThanOrEqual
                } else {
                    ComparisonOp::LessThan
                };
                if self.set_fact_add(set, ConstraintFact { op, value }) == BucketOutcome::Unsatisfiable
                {
                    return Absorption::Unsatisfiable;
                }
            }
            None => self.remaining.push(Expr::Comparison(ComparisonExpr {
                op: if between.upper_inclusive {
                    ComparisonOp::LessThanOrEqual
                } else {
                    ComparisonOp::LessThan
                },
                lexpr: between.input.clone(),
                rexpr: between.upper.clone(),
            })),
        }
        Absorption::Absorbed
    }

    fn comparison_absorb(&mut self, cmp: &ComparisonExpr) -> Absorption {
        let left_scalar = cmp.lexpr.is_foldable();
        let right_scalar = cmp.rexpr.is_foldable();

        if left_scalar || right_scalar {
            let (scalar, non_scalar) = if left_scalar {
                (&cmp.lexpr, &cmp.rexpr)
            } else {
                (&cmp.rexpr, &cmp.lexpr)
            };
            let Ok(value) = scalar_evaluate(scalar) else {
                return Absorption::Unsupported;
            };
            // normalize to `expr op constant`
            let op = if left_scalar { cmp.op.flip() } else { cmp.op };

            let node = self.canonical_id(non_scalar);
            let set = self.set_for(node);
            if self.set_fact_add(set, ConstraintFact { op, value }) == BucketOutcome::Unsatisfiable {
                return Absorption::Unsatisfiable;
            }

            // the freshly constrained side may unlock a deferred
            // comparison
            match self.transitive_probe(non_scalar) {
                BucketOutcome::Unsatisfiable => Absorption::Unsatisfiable,
                BucketOutcome::Consistent => Absorption::Absorbed,
            }
        } else {
            if cmp.op != ComparisonOp::Equal {
                if cmp.op.is_greater() || cmp.op.is_less() {
                    return self.transitive_filters_add(cmp);
                }
                return Absorption::Unsupported;
            }
            let left_node = self.canonical_id(&cmp.lexpr);
            let right_node = self.canonical_id(&cmp.rexpr);
            if left_node == right_node {
                return Absorption::Unsupported;
            }
            let left_set = self.set_for(left_node);
            let right_set = self.set_for(right_node);
            if left_set == right_set {
                // equality already proven
                return Absorption::Absorbed;
            }
            trace!(
                "merging equivalence sets of {} and {}",
                deparsed(cmp.lexpr.as_ref()),
                deparsed(cmp.rexpr.as_ref())
            );
            match self.sets_merge(left_set, right_set) {
                BucketOutcome::Consistent => Absorption::Absorbed,
                BucketOutcome::Unsatisfiable => Absorption::Unsatisfiable,
            }
        }
    }

    /// Canonical handle for the structural identity of `expr`, creating
    /// an owned copy on first sight.
    fn canonical_id(&mut self, expr: &Expr) -> ExprId {
        if let Some(id) = self.canonical.get(expr) {
            return *id;
        }
        let id = ExprId(self.nodes.len());
        self.nodes.push(expr.clone());
        self.canonical.insert(expr.clone(), id);
        id
    }

    fn node_expr(&self, id: ExprId) -> Option<&Expr> {
        self.nodes.get(id.0)
    }

    /// Equivalence set of a canonical node, creating a fresh singleton
    /// set (with an empty fact bucket) on first sight.
    fn set_for(&mut self, node: ExprId) -> SetId {
        if let Some(set) = self.set_of.get(&node) {
            return *set;
        }
        let set = SetId(self.next_set_id);
        self.next_set_id += 1;
        self.set_of.insert(node, set);
        self.members.insert(set, vec![node]);
        self.consts.insert(set, Vec::new());
        set
    }

    fn set_fact_add(&mut self, set: SetId, fact: ConstraintFact) -> BucketOutcome {
        let Some(bucket) = self.consts.get_mut(&set) else {
            // set_for seeds every bucket
            return BucketOutcome::Consistent;
        };
        bucket_fact_add(bucket, fact)
    }

    /// Fold `right` into `left`: move members, re-point their set ids,
    /// and re-insert the right bucket's facts one by one.
    fn sets_merge(&mut self, left: SetId, right: SetId) -> BucketOutcome {
        let right_members = self.members.remove(&right).unwrap_or_default();
        for node in &right_members {
            self.set_of.insert(*node, left);
        }
        if let Some(entries) = self.members.get_mut(&left) {
            entries.extend(right_members);
        }
        let right_facts = self.consts.remove(&right).unwrap_or_default();
        for fact in right_facts {
            if self.set_fact_add(left, fact) == BucketOutcome::Unsatisfiable {
                return BucketOutcome::Unsatisfiable;
            }
        }
        BucketOutcome::Consistent
    }
}

impl Default for FilterCombiner {
    fn default() -> Self {
        FilterCombiner::new()
    }
}
