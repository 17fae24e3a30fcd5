//! # Push Filter Through View Rule
//!
//! A view reference exposes its body's slots unchanged, so a filter above the view
//! can be evaluated inside it instead. The view reference stays in place.
//!
//! ```text
//! Before: Filter(pred, View(v, Body))
//! After:  View(v, Filter(pred, Body))
//! ```

use optx_plan::pattern::Pattern;
use optx_plan::plan::LogicalFilter;
use optx_plan::rule::{RewriteContext, Rule};
use optx_plan::visitor::PlanVisitor;
use optx_plan::{PlanNode, PlanRef, PlanResult, PlanType};

/// Move a filter from above a view reference to above the view body.
pub struct PushFilterThroughViewRule;

impl PlanVisitor<()> for PushFilterThroughViewRule {
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
        let view = plan.child(0);
        if view.plan_type() != PlanType::View {
            return Ok(None);
        }
        let pushed = PlanNode::filter(filter.conjuncts().to_vec(), view.child(0).clone())?;
        view.with_children(vec![pushed]).map(Some)
    }
}

impl Rule for PushFilterThroughViewRule {
    fn name(&self) -> &str {
        "PushFilterThroughView"
    }

    fn pattern(&self) -> Pattern {
        Pattern::filter_view()
    }

    fn apply(&self, plan: &PlanRef, _ctx: &RewriteContext<'_>) -> PlanResult<Option<PlanRef>> {
        plan.accept(&mut PushFilterThroughViewRule, &mut ())
    }
}
