//! # Merge Limits Rule
//!
//! ```text
//! Before: Limit(l1, o1, Limit(l2, o2, X))
//! After:  Limit(min(l1, l2 - o1), o2 + o1, X)
//! ```
//!
//! The inner limit passes rows `o2 .. o2 + l2` of `X`; the outer one skips `o1` of
//! those and keeps at most `l1`. When `o1 >= l2` the merged limit is zero.

use optx_plan::pattern::Pattern;
use optx_plan::plan::LogicalLimit;
use optx_plan::rule::{RewriteContext, Rule};
use optx_plan::visitor::PlanVisitor;
use optx_plan::{LogicalOp, PlanNode, PlanRef, PlanResult};

/// Collapse a limit directly on top of another limit.
pub struct MergeLimitsRule;

impl PlanVisitor<()> for MergeLimitsRule {
    type Output = PlanResult<Option<PlanRef>>;

    fn visit(&mut self, _plan: &PlanRef, _ctx: &mut ()) -> Self::Output {
        Ok(None)
    }

    fn visit_limit(&mut self, plan: &PlanRef, outer: &LogicalLimit, _ctx: &mut ()) -> Self::Output {
        let child = plan.child(0);
        let LogicalOp::Limit(inner) = child.op() else {
            return Ok(None);
        };
        let limit = outer.limit().min(inner.limit().saturating_sub(outer.offset()));
        let offset = inner.offset().saturating_add(outer.offset());
        PlanNode::limit(limit, offset, child.child(0).clone()).map(Some)
    }
}

impl Rule for MergeLimitsRule {
    fn name(&self) -> &str {
        "MergeLimits"
    }

    fn pattern(&self) -> Pattern {
        Pattern::limit_limit()
    }

    fn apply(&self, plan: &PlanRef, _ctx: &RewriteContext<'_>) -> PlanResult<Option<PlanRef>> {
        plan.accept(&mut MergeLimitsRule, &mut ())
    }
}
