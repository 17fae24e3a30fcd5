//! # Inline View Rule
//!
//! A view reference contributes no columns and no semantics of its own: its output,
//! functional dependencies and FD items are exactly those of its body. Once binding is
//! done the reference can therefore be dropped.
//!
//! ```text
//! Before: View(db1.v1, Body)
//! After:  Body
//! ```

use optx_plan::pattern::Pattern;
use optx_plan::plan::LogicalView;
use optx_plan::rule::{RewriteContext, Rule};
use optx_plan::visitor::PlanVisitor;
use optx_plan::{PlanRef, PlanResult};
use tracing::trace;

/// Replace a view reference by the plan of its body.
pub struct InlineViewRule;

impl PlanVisitor<()> for InlineViewRule {
    type Output = PlanResult<Option<PlanRef>>;

    fn visit(&mut self, _plan: &PlanRef, _ctx: &mut ()) -> Self::Output {
        Ok(None)
    }

    fn visit_view(&mut self, plan: &PlanRef, view: &LogicalView, _ctx: &mut ()) -> Self::Output {
        trace!("Inlining view {}.{}", view.database_name(), view.view_name());
        Ok(Some(plan.child(0).clone()))
    }
}

impl Rule for InlineViewRule {
    fn name(&self) -> &str {
        "InlineView"
    }

    fn pattern(&self) -> Pattern {
        Pattern::view()
    }

    fn apply(&self, plan: &PlanRef, _ctx: &RewriteContext<'_>) -> PlanResult<Option<PlanRef>> {
        plan.accept(&mut InlineViewRule, &mut ())
    }
}
