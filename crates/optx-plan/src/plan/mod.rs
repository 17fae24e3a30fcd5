//! # Logical Plan Nodes
//!
//! [`PlanNode`] is the unit the memo stores and the rewrite rules transform. It is an
//! immutable value over the closed [`LogicalOp`] family: each variant carries its own
//! payload (catalog handles, expressions, limits) and a fixed number of children.
//!
//! ## Identity
//!
//! `PartialEq`/`Hash` on a node look at the variant and its payload only. Children, the
//! memo link and the properties cache are ignored. The memo keys group expressions on
//! `(node, child group ids)`, and two nodes that reference the same catalog object
//! collapse to one shape.
//!
//! ## Derived properties
//!
//! Every variant answers three derivation queries:
//!
//! - `compute_output`: the output slots, built from the children's outputs.
//! - `compute_func_deps(supplier)`: functional dependencies over the output.
//! - `compute_fd_items(supplier)`: dependency items over the output.
//!
//! The supplier is a deferred callback producing the output slots the result should be
//! restricted to. `logical_properties()` runs all three once and caches the result in a
//! `OnceLock`; concurrent first calls may both compute, the first store wins, and the
//! computation is deterministic so either value is correct.
//!
//! ## Memo link
//!
//! `group_link` is written at most once (`link_group`, first writer wins) or set on a
//! fresh copy (`with_group_link`). Readers never block and must accept both states.

mod aggregate;
mod builder;
mod filter;
mod join;
mod limit;
mod project;
mod scan;
mod view;

pub use aggregate::LogicalAggregate;
pub use builder::PlanBuilder;
pub use filter::LogicalFilter;
pub use join::LogicalJoin;
pub use limit::LogicalLimit;
pub use project::LogicalProject;
pub use scan::LogicalScan;
pub use view::LogicalView;

use crate::catalog::ViewRef;
use crate::error::{PlanError, PlanResult};
use crate::expr::{slot_ids, Expr, JoinType, NamedExpr, Slot, SlotId};
use crate::memo::GroupExprLink;
use crate::properties::{FdItems, FunctionalDependencies, LogicalProperties};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};
use tracing::trace;

/// Shared handle to an immutable plan node.
pub type PlanRef = Arc<PlanNode>;

/// Deferred producer of the output slots a derivation is restricted to.
pub type OutputSupplier<'a> = &'a dyn Fn() -> Vec<Slot>;

/// Dispatch tag of a plan node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PlanType {
    Scan,
    Filter,
    Project,
    Join,
    Aggregate,
    Limit,
    View,
}

impl PlanType {
    /// Number of children every node of this type has.
    pub fn arity(self) -> usize {
        match self {
            PlanType::Scan => 0,
            PlanType::Join => 2,
            PlanType::Filter
            | PlanType::Project
            | PlanType::Aggregate
            | PlanType::Limit
            | PlanType::View => 1,
        }
    }
}

impl fmt::Display for PlanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlanType::Scan => "LogicalScan",
            PlanType::Filter => "LogicalFilter",
            PlanType::Project => "LogicalProject",
            PlanType::Join => "LogicalJoin",
            PlanType::Aggregate => "LogicalAggregate",
            PlanType::Limit => "LogicalLimit",
            PlanType::View => "LogicalView",
        };
        write!(f, "{}", name)
    }
}

/// Payload of a logical plan node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    Scan(LogicalScan),
    Filter(LogicalFilter),
    Project(LogicalProject),
    Join(LogicalJoin),
    Aggregate(LogicalAggregate),
    Limit(LogicalLimit),
    View(LogicalView),
}

impl LogicalOp {
    pub fn plan_type(&self) -> PlanType {
        match self {
            LogicalOp::Scan(_) => PlanType::Scan,
            LogicalOp::Filter(_) => PlanType::Filter,
            LogicalOp::Project(_) => PlanType::Project,
            LogicalOp::Join(_) => PlanType::Join,
            LogicalOp::Aggregate(_) => PlanType::Aggregate,
            LogicalOp::Limit(_) => PlanType::Limit,
            LogicalOp::View(_) => PlanType::View,
        }
    }

    fn validate(&self) -> PlanResult<()> {
        match self {
            LogicalOp::Scan(scan) => scan.validate(),
            LogicalOp::Filter(filter) => filter.validate(),
            LogicalOp::Project(project) => project.validate(),
            LogicalOp::Join(join) => join.validate(),
            LogicalOp::Aggregate(agg) => agg.validate(),
            LogicalOp::Limit(_) => Ok(()),
            LogicalOp::View(view) => view.validate(),
        }
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOp::Scan(op) => fmt::Display::fmt(op, f),
            LogicalOp::Filter(op) => fmt::Display::fmt(op, f),
            LogicalOp::Project(op) => fmt::Display::fmt(op, f),
            LogicalOp::Join(op) => fmt::Display::fmt(op, f),
            LogicalOp::Aggregate(op) => fmt::Display::fmt(op, f),
            LogicalOp::Limit(op) => fmt::Display::fmt(op, f),
            LogicalOp::View(op) => fmt::Display::fmt(op, f),
        }
    }
}

/// An immutable logical plan node.
pub struct PlanNode {
    op: LogicalOp,
    children: Vec<PlanRef>,
    group_link: OnceLock<GroupExprLink>,
    properties: OnceLock<Arc<LogicalProperties>>,
}

impl PlanNode {
    /// Build a node, validating the payload and the child count.
    pub fn new(op: LogicalOp, children: Vec<PlanRef>) -> PlanResult<PlanRef> {
        check_arity(op.plan_type(), children.len())?;
        op.validate()?;
        Ok(Arc::new(Self {
            op,
            children,
            group_link: OnceLock::new(),
            properties: OnceLock::new(),
        }))
    }

    pub fn scan(scan: LogicalScan) -> PlanResult<PlanRef> {
        Self::new(LogicalOp::Scan(scan), vec![])
    }

    pub fn filter(conjuncts: Vec<Expr>, child: PlanRef) -> PlanResult<PlanRef> {
        Self::new(LogicalOp::Filter(LogicalFilter::new(conjuncts)), vec![child])
    }

    pub fn project(exprs: Vec<NamedExpr>, child: PlanRef) -> PlanResult<PlanRef> {
        Self::new(LogicalOp::Project(LogicalProject::new(exprs)), vec![child])
    }

    pub fn join(
        join_type: JoinType,
        conditions: Vec<Expr>,
        left: PlanRef,
        right: PlanRef,
    ) -> PlanResult<PlanRef> {
        Self::new(
            LogicalOp::Join(LogicalJoin::new(join_type, conditions)),
            vec![left, right],
        )
    }

    pub fn aggregate(
        group_by: Vec<Expr>,
        outputs: Vec<NamedExpr>,
        child: PlanRef,
    ) -> PlanResult<PlanRef> {
        Self::new(
            LogicalOp::Aggregate(LogicalAggregate::new(group_by, outputs)),
            vec![child],
        )
    }

    pub fn limit(limit: u64, offset: u64, child: PlanRef) -> PlanResult<PlanRef> {
        Self::new(LogicalOp::Limit(LogicalLimit::new(limit, offset)), vec![child])
    }

    pub fn view(view: ViewRef, body: PlanRef) -> PlanResult<PlanRef> {
        Self::new(LogicalOp::View(LogicalView::new(view)), vec![body])
    }

    /// Build a view node from the outcome of a catalog lookup.
    pub fn try_view(view: Option<ViewRef>, body: PlanRef) -> PlanResult<PlanRef> {
        let view = view.ok_or_else(|| {
            PlanError::invalid_payload(PlanType::View, "view reference can not be absent")
        })?;
        Self::view(view, body)
    }

    pub fn op(&self) -> &LogicalOp {
        &self.op
    }

    pub fn plan_type(&self) -> PlanType {
        self.op.plan_type()
    }

    pub fn children(&self) -> &[PlanRef] {
        &self.children
    }

    /// The `idx`-th child. Arity is fixed at construction, so indices below
    /// `plan_type().arity()` are always valid.
    pub fn child(&self, idx: usize) -> &PlanRef {
        &self.children[idx]
    }

    /// Scalar expressions owned directly by this node.
    pub fn expressions(&self) -> Vec<&Expr> {
        match &self.op {
            LogicalOp::Scan(_) | LogicalOp::Limit(_) | LogicalOp::View(_) => vec![],
            LogicalOp::Filter(filter) => filter.conjuncts().iter().collect(),
            LogicalOp::Project(project) => project.exprs().iter().map(|e| &e.expr).collect(),
            LogicalOp::Join(join) => join.conditions().iter().collect(),
            LogicalOp::Aggregate(agg) => agg
                .group_by()
                .iter()
                .chain(agg.outputs().iter().map(|e| &e.expr))
                .collect(),
        }
    }

    pub fn group_link(&self) -> Option<GroupExprLink> {
        self.group_link.get().copied()
    }

    /// Link this instance to a memo slot. The first writer wins; a losing writer
    /// gets the link that is already in place.
    pub fn link_group(&self, link: GroupExprLink) -> Result<(), GroupExprLink> {
        match self.group_link.set(link) {
            Ok(()) => Ok(()),
            Err(_) => Err(self.group_link().unwrap_or(link)),
        }
    }

    /// A copy of this node carrying `link`. Payload and children are shared, and the
    /// properties cache is carried over since the children are unchanged.
    pub fn with_group_link(&self, link: GroupExprLink) -> PlanRef {
        let node = Self {
            op: self.op.clone(),
            children: self.children.clone(),
            group_link: OnceLock::new(),
            properties: OnceLock::new(),
        };
        let _ = node.group_link.set(link);
        if let Some(props) = self.properties.get() {
            let _ = node.properties.set(props.clone());
        }
        Arc::new(node)
    }

    /// A new node with the same payload over `children`. The result carries neither
    /// the memo link nor the properties cache of `self`.
    pub fn with_children(&self, children: Vec<PlanRef>) -> PlanResult<PlanRef> {
        check_arity(self.plan_type(), children.len())?;
        Ok(Arc::new(Self {
            op: self.op.clone(),
            children,
            group_link: OnceLock::new(),
            properties: OnceLock::new(),
        }))
    }

    /// Output slots derived from the children and the payload.
    pub fn compute_output(&self) -> PlanResult<Vec<Slot>> {
        match &self.op {
            LogicalOp::Scan(scan) => Ok(scan.compute_output()),
            LogicalOp::Filter(filter) => filter.compute_output(self.child(0)),
            LogicalOp::Project(project) => project.compute_output(self.child(0)),
            LogicalOp::Join(join) => join.compute_output(self.child(0), self.child(1)),
            LogicalOp::Aggregate(agg) => agg.compute_output(self.child(0)),
            LogicalOp::Limit(limit) => limit.compute_output(self.child(0)),
            LogicalOp::View(view) => view.compute_output(self.child(0)),
        }
    }

    pub fn compute_func_deps(
        &self,
        output: OutputSupplier<'_>,
    ) -> PlanResult<FunctionalDependencies> {
        match &self.op {
            LogicalOp::Scan(scan) => scan.compute_func_deps(output),
            LogicalOp::Filter(filter) => filter.compute_func_deps(self.child(0), output),
            LogicalOp::Project(project) => project.compute_func_deps(self.child(0), output),
            LogicalOp::Join(join) => join.compute_func_deps(self.child(0), self.child(1), output),
            LogicalOp::Aggregate(agg) => agg.compute_func_deps(self.child(0), output),
            LogicalOp::Limit(limit) => limit.compute_func_deps(self.child(0), output),
            LogicalOp::View(view) => view.compute_func_deps(self.child(0), output),
        }
    }

    pub fn compute_fd_items(&self, output: OutputSupplier<'_>) -> PlanResult<FdItems> {
        match &self.op {
            LogicalOp::Scan(scan) => scan.compute_fd_items(output),
            LogicalOp::Filter(filter) => filter.compute_fd_items(self.child(0), output),
            LogicalOp::Project(project) => project.compute_fd_items(self.child(0), output),
            LogicalOp::Join(join) => join.compute_fd_items(self.child(0), self.child(1), output),
            LogicalOp::Aggregate(agg) => agg.compute_fd_items(self.child(0), output),
            LogicalOp::Limit(limit) => limit.compute_fd_items(self.child(0), output),
            LogicalOp::View(view) => view.compute_fd_items(self.child(0), output),
        }
    }

    /// Cached logical properties, derived on first use.
    pub fn logical_properties(&self) -> PlanResult<Arc<LogicalProperties>> {
        if let Some(props) = self.properties.get() {
            return Ok(props.clone());
        }
        let props = match &self.op {
            // A view contributes nothing of its own; share the body's properties.
            LogicalOp::View(_) => self.child(0).logical_properties()?,
            _ => {
                let output = self.compute_output()?;
                let supplier = || output.clone();
                let func_deps = self.compute_func_deps(&supplier)?;
                let fd_items = self.compute_fd_items(&supplier)?;
                Arc::new(LogicalProperties {
                    output,
                    func_deps,
                    fd_items,
                })
            }
        };
        trace!("Derived logical properties for {}", self.op);
        Ok(self.properties.get_or_init(|| props).clone())
    }

    pub fn output(&self) -> PlanResult<Vec<Slot>> {
        Ok(self.logical_properties()?.output.clone())
    }

    pub fn has_cached_properties(&self) -> bool {
        self.properties.get().is_some()
    }

    /// Render the subtree rooted here, one debug label per line.
    pub fn tree_string(&self) -> String {
        let mut out = String::new();
        self.write_tree(&mut out, 0);
        out
    }

    fn write_tree(&self, out: &mut String, depth: usize) {
        if depth > 0 {
            out.push_str(&"   ".repeat(depth - 1));
            out.push_str("+--");
        }
        out.push_str(&self.op.to_string());
        out.push('\n');
        for child in &self.children {
            child.write_tree(out, depth + 1);
        }
    }
}

impl PartialEq for PlanNode {
    fn eq(&self, other: &Self) -> bool {
        self.op == other.op
    }
}

impl Eq for PlanNode {}

impl Hash for PlanNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.op.hash(state);
    }
}

impl fmt::Display for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.op, f)
    }
}

impl fmt::Debug for PlanNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlanNode")
            .field("op", &self.op)
            .field("group_link", &self.group_link())
            .field("children", &self.children)
            .finish()
    }
}

/// Whether two child lists hold the very same node instances.
pub fn same_children(a: &[PlanRef], b: &[PlanRef]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Arc::ptr_eq(x, y))
}

fn check_arity(plan_type: PlanType, actual: usize) -> PlanResult<()> {
    let expected = plan_type.arity();
    if expected != actual {
        return Err(PlanError::ArityMismatch {
            plan_type,
            expected,
            actual,
        });
    }
    Ok(())
}

/// Fail with `UnresolvedSlot` if any expression reads a slot outside `available`.
fn check_resolved<'a>(
    plan_type: PlanType,
    exprs: impl IntoIterator<Item = &'a Expr>,
    available: &[Slot],
) -> PlanResult<()> {
    let ids = slot_ids(available);
    for expr in exprs {
        if let Some(slot) = expr.slots().into_iter().find(|s| !ids.contains(&s.id)) {
            return Err(PlanError::UnresolvedSlot {
                plan_type,
                slot: slot.clone(),
            });
        }
    }
    Ok(())
}

fn supplied_ids(output: OutputSupplier<'_>) -> BTreeSet<SlotId> {
    slot_ids(&output())
}

/// `Name ( k1=v1, k2=v2 )`, the debug label layout shared by all variants.
fn write_label(
    f: &mut fmt::Formatter<'_>,
    name: PlanType,
    fields: &[(&str, &dyn fmt::Display)],
) -> fmt::Result {
    write!(f, "{} ( ", name)?;
    for (i, (key, value)) in fields.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}={}", key, value)?;
    }
    write!(f, " )")
}

/// Displays a slice as `[a, b, c]`.
struct ListDisplay<'a, T>(&'a [T]);

impl<T: fmt::Display> fmt::Display for ListDisplay<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        crate::expr::write_list(f, self.0, ", ")?;
        write!(f, "]")
    }
}
