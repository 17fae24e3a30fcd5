//! # Slots and Scalar Expressions
//!
//! Plan nodes exchange rows through **slots**: named output columns identified by a
//! [`SlotId`] that is unique within a statement. Two slots are the same column exactly
//! when their ids match, regardless of name, qualifier or nullability. This is what lets
//! functional dependencies be expressed as sets of ids and survive renames.
//!
//! Scalar expressions ([`Expr`]) appear inside filters, projections, join conditions and
//! aggregates. They are owned by the node that evaluates them and are reported through
//! `PlanNode::expressions`.
//!
//! `ScalarValue` wraps `f64` in `OrderedFloat` so literals can take part in the
//! structural `Eq`/`Hash` the memo relies on.

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};

/// Statement-unique identifier of an output column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(pub u32);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// An output column of a plan node.
///
/// Equality and hashing only look at `id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slot {
    pub id: SlotId,
    pub name: String,
    /// Relation alias the column was bound under, if any.
    pub qualifier: Option<String>,
    pub nullable: bool,
}

impl Slot {
    pub fn new(id: SlotId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            qualifier: None,
            nullable: true,
        }
    }

    pub fn with_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.qualifier = Some(qualifier.into());
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

impl PartialEq for Slot {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Slot {}

impl Hash for Slot {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.id)
    }
}

/// Collect the ids of a slot list into a set.
pub fn slot_ids<'a>(slots: impl IntoIterator<Item = &'a Slot>) -> BTreeSet<SlotId> {
    slots.into_iter().map(|s| s.id).collect()
}

/// Hands out statement-unique slot ids.
///
/// Shared by the binder and by rewrites that introduce new columns, so it only needs
/// `&self` to allocate.
#[derive(Debug, Default)]
pub struct SlotIdGenerator {
    next: AtomicU32,
}

impl SlotIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start allocating after ids already in use (e.g. ones restored from a dump).
    pub fn starting_at(first: u32) -> Self {
        Self {
            next: AtomicU32::new(first),
        }
    }

    pub fn next_id(&self) -> SlotId {
        SlotId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    pub fn new_slot(&self, name: impl Into<String>) -> Slot {
        Slot::new(self.next_id(), name)
    }
}

/// Scalar value for expressions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScalarValue {
    /// SQL NULL value.
    Null,
    Bool(bool),
    Int64(i64),
    /// 64-bit floating point, wrapped in OrderedFloat for Eq/Hash support.
    Float64(OrderedFloat<f64>),
    Utf8(String),
    /// Days since 1970-01-01.
    Date(i32),
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int64(a), Self::Int64(b)) => a == b,
            (Self::Float64(a), Self::Float64(b)) => a == b,
            (Self::Utf8(a), Self::Utf8(b)) => a == b,
            (Self::Date(a), Self::Date(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ScalarValue {}

impl Hash for ScalarValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(v) => v.hash(state),
            Self::Int64(v) => v.hash(state),
            Self::Float64(v) => v.hash(state),
            Self::Utf8(v) => v.hash(state),
            Self::Date(v) => v.hash(state),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int64(v) => write!(f, "{}", v),
            Self::Float64(v) => write!(f, "{}", v),
            Self::Utf8(v) => write!(f, "'{}'", v),
            Self::Date(v) => write!(f, "DATE({})", v),
        }
    }
}

/// Scalar expressions used in predicates, projections, join conditions and aggregates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Expr {
    /// Reference to a child's output slot.
    Column(Slot),
    Literal(ScalarValue),
    BinaryOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Function {
        name: String,
        args: Vec<Expr>,
    },
    /// Aggregate call; only valid inside `LogicalAggregate` outputs.
    Aggregate(Box<AggExpr>),
    /// Conjunction stored flat to keep predicate decomposition simple.
    And(Vec<Expr>),
    Or(Vec<Expr>),
}

impl Expr {
    pub fn column(slot: &Slot) -> Self {
        Expr::Column(slot.clone())
    }

    pub fn literal(value: ScalarValue) -> Self {
        Expr::Literal(value)
    }

    pub fn equal(left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op: BinaryOp::Eq,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Return all slot references in this expression.
    pub fn slots(&self) -> Vec<&Slot> {
        let mut slots = Vec::new();
        self.collect_slots(&mut slots);
        slots
    }

    pub fn slot_ids(&self) -> BTreeSet<SlotId> {
        self.slots().into_iter().map(|s| s.id).collect()
    }

    fn collect_slots<'a>(&'a self, out: &mut Vec<&'a Slot>) {
        match self {
            Expr::Column(s) => out.push(s),
            Expr::Literal(_) => {}
            Expr::BinaryOp { left, right, .. } => {
                left.collect_slots(out);
                right.collect_slots(out);
            }
            Expr::UnaryOp { operand, .. } => operand.collect_slots(out),
            Expr::Function { args, .. } => {
                for a in args {
                    a.collect_slots(out);
                }
            }
            Expr::Aggregate(agg) => agg.arg.collect_slots(out),
            Expr::And(exprs) | Expr::Or(exprs) => {
                for e in exprs {
                    e.collect_slots(out);
                }
            }
        }
    }

    /// The referenced slot if this expression is a bare column.
    pub fn as_slot(&self) -> Option<&Slot> {
        match self {
            Expr::Column(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Literal(_))
    }

    pub fn is_true_literal(&self) -> bool {
        matches!(self, Expr::Literal(ScalarValue::Bool(true)))
    }

    /// Operands of an `=` comparison.
    pub fn equality_operands(&self) -> Option<(&Expr, &Expr)> {
        match self {
            Expr::BinaryOp {
                op: BinaryOp::Eq,
                left,
                right,
            } => Some((left, right)),
            _ => None,
        }
    }

    /// Flatten AND-chains: (A AND (B AND C)) → [A, B, C].
    pub fn conjuncts(&self) -> Vec<&Expr> {
        match self {
            Expr::And(exprs) => exprs.iter().flat_map(|e| e.conjuncts()).collect(),
            other => vec![other],
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(s) => write!(f, "{}", s),
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::BinaryOp { op, left, right } => write!(f, "({} {} {})", left, op, right),
            Expr::UnaryOp { op, operand } => match op {
                UnaryOp::Not => write!(f, "NOT {}", operand),
                UnaryOp::Neg => write!(f, "-{}", operand),
                UnaryOp::IsNull => write!(f, "{} IS NULL", operand),
                UnaryOp::IsNotNull => write!(f, "{} IS NOT NULL", operand),
            },
            Expr::Function { name, args } => {
                write!(f, "{}(", name)?;
                write_list(f, args, ", ")?;
                write!(f, ")")
            }
            Expr::Aggregate(agg) => write!(f, "{}", agg),
            Expr::And(exprs) => write_list(f, exprs, " AND "),
            Expr::Or(exprs) => write_list(f, exprs, " OR "),
        }
    }
}

pub(crate) fn write_list<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    sep: &str,
) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Add,
    Sub,
    Mul,
    Div,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Eq => "=",
            BinaryOp::NotEq => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    IsNull,
    IsNotNull,
}

/// SQL join types.
///
/// The join type decides which side's rows survive unchanged, and therefore which
/// side's functional dependencies still hold on the join output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
    /// Left rows with at least one match; right columns are not produced.
    Semi,
    /// Left rows with no match; right columns are not produced.
    Anti,
    Cross,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Full => "FULL",
            JoinType::Semi => "SEMI",
            JoinType::Anti => "ANTI",
            JoinType::Cross => "CROSS",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AggExpr {
    pub func: AggFunc,
    pub arg: Expr,
    pub distinct: bool,
}

impl fmt::Display for AggExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let distinct = if self.distinct { "DISTINCT " } else { "" };
        write!(f, "{:?}({}{})", self.func, distinct, self.arg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggFunc {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

/// An expression bound to the output slot it produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NamedExpr {
    pub expr: Expr,
    pub output: Slot,
}

impl NamedExpr {
    pub fn new(expr: Expr, output: Slot) -> Self {
        Self { expr, output }
    }

    /// Forward a child slot unchanged.
    pub fn pass_through(slot: &Slot) -> Self {
        Self {
            expr: Expr::column(slot),
            output: slot.clone(),
        }
    }

    /// The source slot when this expression only renames a column.
    pub fn renamed_slot(&self) -> Option<&Slot> {
        self.expr.as_slot()
    }
}

impl fmt::Display for NamedExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.expr.as_slot() {
            Some(s) if s.id == self.output.id => write!(f, "{}", self.output),
            _ => write!(f, "{} AS {}", self.expr, self.output),
        }
    }
}
