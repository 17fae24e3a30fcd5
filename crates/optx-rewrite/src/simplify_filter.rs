//! # Simplify Filter Rule
//!
//! Drops `TRUE` conjuncts from a filter. A filter left without conjuncts is replaced
//! by its child.

use optx_plan::pattern::Pattern;
use optx_plan::plan::LogicalFilter;
use optx_plan::rule::{RewriteContext, Rule};
use optx_plan::visitor::PlanVisitor;
use optx_plan::{PlanNode, PlanRef, PlanResult};

pub struct SimplifyFilterRule;

impl PlanVisitor<()> for SimplifyFilterRule {
    type Output = PlanResult<Option<PlanRef>>;

    fn visit(&mut self, _plan: &PlanRef, _ctx: &mut ()) -> Self::Output {
        Ok(None)
    }

    fn visit_filter(
        &mut self,
        plan: &PlanRef,
        filter: &LogicalFilter,
        _ctx: &mut (),
    ) -> Self::Output {
        let kept: Vec<_> = filter
            .conjuncts()
            .iter()
            .filter(|c| !c.is_true_literal())
            .cloned()
            .collect();
        if kept.len() == filter.conjuncts().len() {
            return Ok(None);
        }
        if kept.is_empty() {
            return Ok(Some(plan.child(0).clone()));
        }
        PlanNode::filter(kept, plan.child(0).clone()).map(Some)
    }
}

impl Rule for SimplifyFilterRule {
    fn name(&self) -> &str {
        "SimplifyFilter"
    }

    fn pattern(&self) -> Pattern {
        Pattern::filter()
    }

    fn apply(&self, plan: &PlanRef, _ctx: &RewriteContext<'_>) -> PlanResult<Option<PlanRef>> {
        plan.accept(&mut SimplifyFilterRule, &mut ())
    }
}
