use std::any::Any;

use ecow::EcoString;
use strum_macros::AsRefStr;

use crate::value::{LogicalType, Value};

use super::Deparse;

/// Comparison operators accepted by the combiner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
pub enum ComparisonOp {
    #[strum(to_string = "=")]
    Equal,
    #[strum(to_string = "!=")]
    NotEqual,
    #[strum(to_string = "<")]
    LessThan,
    #[strum(to_string = "<=")]
    LessThanOrEqual,
    #[strum(to_string = ">")]
    GreaterThan,
    #[strum(to_string = ">=")]
    GreaterThanOrEqual,
}

impl ComparisonOp {
    /// Flip for `value op expr` -> `expr op' value` normalization.
    pub fn flip(self) -> ComparisonOp {
        match self {
            ComparisonOp::Equal => ComparisonOp::Equal,
            ComparisonOp::NotEqual => ComparisonOp::NotEqual,
            ComparisonOp::LessThan => ComparisonOp::GreaterThan,
            ComparisonOp::LessThanOrEqual => ComparisonOp::GreaterThanOrEqual,
            ComparisonOp::GreaterThan => ComparisonOp::LessThan,
            ComparisonOp::GreaterThanOrEqual => ComparisonOp::LessThanOrEqual,
        }
    }

    /// `>` or `>=`.
    pub fn is_greater(self) -> bool {
        matches!(
            self,
            ComparisonOp::GreaterThan | ComparisonOp::GreaterThanOrEqual
        )
    }

    /// `<` or `<=`.
    pub fn is_less(self) -> bool {
        matches!(self, ComparisonOp::LessThan | ComparisonOp::LessThanOrEqual)
    }
}

impl Deparse for ComparisonOp {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        buf.push_str(self.as_ref());
        buf
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum ConjunctionOp {
    And,
    Or,
}

/// A bound reference to a scanned column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub table_idx: usize,
    pub column_idx: usize,
    pub ty: LogicalType,
}

/// An unbound placeholder (`$1`, ...). Filters containing one are never
/// absorbed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParameterRef {
    pub index: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComparisonExpr {
    pub op: ComparisonOp,
    pub lexpr: Box<Expr>,
    pub rexpr: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BetweenExpr {
    pub input: Box<Expr>,
    pub lower: Box<Expr>,
    pub upper: Box<Expr>,
    pub lower_inclusive: bool,
    pub upper_inclusive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConjunctionExpr {
    pub op: ConjunctionOp,
    pub children: Vec<Expr>,
}

/// `probe IN (values...)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InListExpr {
    pub probe: Box<Expr>,
    pub values: Vec<Expr>,
}

/// A bound scalar function call. The combiner inspects only `~~` (LIKE)
/// and `prefix`; everything else passes through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionExpr {
    pub name: EcoString,
    pub args: Vec<Expr>,
}

/// A bound, typed filter expression. Structural equality and hashing are
/// the identity the combiner canonicalizes on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Column(ColumnRef),
    Constant(Value),
    Parameter(ParameterRef),
    Comparison(ComparisonExpr),
    Between(BetweenExpr),
    Conjunction(ConjunctionExpr),
    In(InListExpr),
    Function(FunctionExpr),
}

pub type ExprNodeIter<'a, N> =
    std::iter::Chain<std::option::IntoIter<&'a N>, Box<dyn Iterator<Item = &'a N> + 'a>>;

impl Expr {
    /// Get all nodes of the given type within this expression tree.
    pub fn nodes<N: Any>(&self) -> ExprNodeIter<'_, N> {
        let current = ((self as &dyn Any)
            .downcast_ref::<N>()
            .or_else(|| match self {
                Expr::Column(col) => (col as &dyn Any).downcast_ref::<N>(),
                Expr::Constant(val) => (val as &dyn Any).downcast_ref::<N>(),
                Expr::Parameter(param) => (param as &dyn Any).downcast_ref::<N>(),
                Expr::Comparison(cmp) => (cmp as &dyn Any).downcast_ref::<N>(),
                Expr::Between(between) => (between as &dyn Any).downcast_ref::<N>(),
                Expr::Conjunction(conj) => (conj as &dyn Any).downcast_ref::<N>(),
                Expr::In(in_list) => (in_list as &dyn Any).downcast_ref::<N>(),
                Expr::Function(func) => (func as &dyn Any).downcast_ref::<N>(),
            }))
        .into_iter();

        let children: Box<dyn Iterator<Item = &N> + '_> = match self {
            Expr::Column(_) | Expr::Constant(_) | Expr::Parameter(_) => {
                Box::new(std::iter::empty())
            }
            Expr::Comparison(cmp) => Box::new(cmp.lexpr.nodes().chain(cmp.rexpr.nodes())),
            Expr::Between(between) => Box::new(
                between
                    .input
                    .nodes()
                    .chain(between.lower.nodes())
                    .chain(between.upper.nodes()),
            ),
            Expr::Conjunction(conj) => {
                Box::new(conj.children.iter().flat_map(|child| child.nodes()))
            }
            Expr::In(in_list) => Box::new(
                in_list
                    .probe
                    .nodes()
                    .chain(in_list.values.iter().flat_map(|value| value.nodes())),
            ),
            Expr::Function(func) => Box::new(func.args.iter().flat_map(|arg| arg.nodes())),
        };

        current.chain(children)
    }

    /// Whether the expression contains an unbound placeholder.
    pub fn has_parameter(&self) -> bool {
        self.nodes::<ParameterRef>().next().is_some()
    }

    /// Constant per row: no column references anywhere in the tree.
    pub fn is_scalar(&self) -> bool {
        self.nodes::<ColumnRef>().next().is_none()
    }

    /// Evaluable without row data: no column references and no
    /// placeholders.
    pub fn is_foldable(&self) -> bool {
        self.is_scalar() && !self.has_parameter()
    }
}

impl Deparse for ColumnRef {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        buf.push('#');
        buf.push_str(self.table_idx.to_string().as_str());
        buf.push('.');
        buf.push_str(self.column_idx.to_string().as_str());
        buf
    }
}

impl Deparse for ParameterRef {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        buf.push('$');
        buf.push_str(self.index.to_string().as_str());
        buf
    }
}

impl Deparse for ComparisonExpr {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        self.lexpr.deparse(buf);
        buf.push(' ');
        self.op.deparse(buf);
        buf.push(' ');
        self.rexpr.deparse(buf);
        buf
    }
}

impl Deparse for BetweenExpr {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        self.lower.deparse(buf);
        buf.push_str(if self.lower_inclusive { " <= " } else { " < " });
        self.input.deparse(buf);
        buf.push_str(if self.upper_inclusive { " <= " } else { " < " });
        self.upper.deparse(buf);
        buf
    }
}

impl Deparse for Expr {
    fn deparse<'b>(&self, buf: &'b mut String) -> &'b mut String {
        match self {
            Expr::Column(col) => col.deparse(buf),
            Expr::Constant(val) => val.deparse(buf),
            Expr::Parameter(param) => param.deparse(buf),
            Expr::Comparison(cmp) => cmp.deparse(buf),
            Expr::Between(between) => between.deparse(buf),
            Expr::Conjunction(conj) => {
                buf.push('(');
                let mut sep = "";
                for child in &conj.children {
                    buf.push_str(sep);
                    child.deparse(buf);
                    sep = match conj.op {
                        ConjunctionOp::And => " AND ",
                        ConjunctionOp::Or => " OR ",
                    };
                }
                buf.push(')');
                buf
            }
            Expr::In(in_list) => {
                in_list.probe.deparse(buf);
                buf.push_str(" IN (");
                let mut sep = "";
                for value in &in_list.values {
                    buf.push_str(sep);
                    value.deparse(buf);
                    sep = ", ";
                }
                buf.push(')');
                buf
            }
            Expr::Function(func) => {
                buf.push_str(func.name.as_str());
                buf.push('(');
                let mut sep = "";
                for arg in &func.args {
                    buf.push_str(sep);
                    arg.deparse(buf);
                    sep = ", ";
                }
                buf.push(')');
                buf
            }
        }
    }
}
