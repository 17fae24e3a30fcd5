//! # Merge Filters Rule
//!
//! Two stacked filters are one filter over the conjunction of their predicates.
//!
//! ```text
//! Before: Filter(p1, Filter(p2, X))
//! After:  Filter(p2 AND p1, X)
//! ```
//!
//! Conjuncts present in both filters are kept once.

use optx_plan::pattern::Pattern;
use optx_plan::plan::LogicalFilter;
use optx_plan::rule::{RewriteContext, Rule};
use optx_plan::visitor::PlanVisitor;
use optx_plan::{LogicalOp, PlanNode, PlanRef, PlanResult};

/// Collapse a filter directly on top of another filter.
pub struct MergeFiltersRule;

impl PlanVisitor<()> for MergeFiltersRule {
    type Output = PlanResult<Option<PlanRef>>;

    fn visit(&mut self, _plan: &PlanRef, _ctx: &mut ()) -> Self::Output {
        Ok(None)
    }

    fn visit_filter(
        &mut self,
        plan: &PlanRef,
        outer: &LogicalFilter,
        _ctx: &mut (),
    ) -> Self::Output {
        let child = plan.child(0);
        let LogicalOp::Filter(inner) = child.op() else {
            return Ok(None);
        };
        let mut conjuncts = inner.conjuncts().to_vec();
        for conjunct in outer.conjuncts() {
            if !conjuncts.contains(conjunct) {
                conjuncts.push(conjunct.clone());
            }
        }
        PlanNode::filter(conjuncts, child.child(0).clone()).map(Some)
    }
}

impl Rule for MergeFiltersRule {
    fn name(&self) -> &str {
        "MergeFilters"
    }

    fn pattern(&self) -> Pattern {
        Pattern::filter_filter()
    }

    fn apply(&self, plan: &PlanRef, _ctx: &RewriteContext<'_>) -> PlanResult<Option<PlanRef>> {
        plan.accept(&mut MergeFiltersRule, &mut ())
    }
}
