//! # Visitor Dispatch
//!
//! [`PlanVisitor`] gives rule code one handler per plan variant without the node family
//! knowing about any rule. [`PlanNode::accept`] performs the exhaustive match over
//! [`LogicalOp`] and calls the matching handler with the node and its typed payload.
//!
//! Every handler defaults to [`PlanVisitor::visit`], so a visitor only overrides the
//! variants it cares about.

use crate::plan::{
    LogicalAggregate, LogicalFilter, LogicalJoin, LogicalLimit, LogicalOp, LogicalProject,
    LogicalScan, LogicalView, PlanNode, PlanRef,
};
use std::sync::Arc;

/// Double-dispatch target over the plan variants, threading a context of type `C`.
pub trait PlanVisitor<C> {
    type Output;

    /// Fallback for every variant without a dedicated override.
    fn visit(&mut self, plan: &PlanRef, ctx: &mut C) -> Self::Output;

    fn visit_scan(&mut self, plan: &PlanRef, _scan: &LogicalScan, ctx: &mut C) -> Self::Output {
        self.visit(plan, ctx)
    }

    fn visit_filter(
        &mut self,
        plan: &PlanRef,
        _filter: &LogicalFilter,
        ctx: &mut C,
    ) -> Self::Output {
        self.visit(plan, ctx)
    }

    fn visit_project(
        &mut self,
        plan: &PlanRef,
        _project: &LogicalProject,
        ctx: &mut C,
    ) -> Self::Output {
        self.visit(plan, ctx)
    }

    fn visit_join(&mut self, plan: &PlanRef, _join: &LogicalJoin, ctx: &mut C) -> Self::Output {
        self.visit(plan, ctx)
    }

    fn visit_aggregate(
        &mut self,
        plan: &PlanRef,
        _agg: &LogicalAggregate,
        ctx: &mut C,
    ) -> Self::Output {
        self.visit(plan, ctx)
    }

    fn visit_limit(&mut self, plan: &PlanRef, _limit: &LogicalLimit, ctx: &mut C) -> Self::Output {
        self.visit(plan, ctx)
    }

    fn visit_view(&mut self, plan: &PlanRef, _view: &LogicalView, ctx: &mut C) -> Self::Output {
        self.visit(plan, ctx)
    }
}

impl PlanNode {
    /// Dispatch to the handler of this node's variant.
    pub fn accept<C, V>(self: &Arc<Self>, visitor: &mut V, ctx: &mut C) -> V::Output
    where
        V: PlanVisitor<C> + ?Sized,
    {
        match self.op() {
            LogicalOp::Scan(scan) => visitor.visit_scan(self, scan, ctx),
            LogicalOp::Filter(filter) => visitor.visit_filter(self, filter, ctx),
            LogicalOp::Project(project) => visitor.visit_project(self, project, ctx),
            LogicalOp::Join(join) => visitor.visit_join(self, join, ctx),
            LogicalOp::Aggregate(agg) => visitor.visit_aggregate(self, agg, ctx),
            LogicalOp::Limit(limit) => visitor.visit_limit(self, limit, ctx),
            LogicalOp::View(view) => visitor.visit_view(self, view, ctx),
        }
    }
}
