//! # Declarative Pattern Matching for Rewrite Rules
//!
//! Each rule declares a [`Pattern`] describing the plan shape it transforms. The driver
//! checks the pattern before calling `apply`, so rules only see plans they can handle.
//!
//! ## Pattern Language
//!
//! - `Pattern::Node(plan_type, children)`: matches a node of that variant whose
//!   children match the child patterns, position by position.
//! - `Pattern::Any`: matches any subtree.
//! - `Pattern::Leaf`: matches only nodes without children.
//!
//! ## Group-Level Matching
//!
//! [`matches_in_memo`] matches a memo expression instead of a concrete tree. A child
//! pattern other than `Any` is satisfied if *any* expression in the child group
//! matches it, since all expressions of a group are logically equivalent.

use crate::error::PlanResult;
use crate::memo::{ExprId, Memo};
use crate::plan::{PlanRef, PlanType};

/// Pattern for matching plan shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    /// Match a node of the given variant with child patterns.
    Node(PlanType, Vec<Pattern>),
    Any,
    Leaf,
}

impl Pattern {
    /// A node of `plan_type` with `Any` for each child.
    pub fn node(plan_type: PlanType) -> Self {
        Pattern::Node(plan_type, vec![Pattern::Any; plan_type.arity()])
    }

    /// A single-child node of `plan_type` over a child matching `child`.
    pub fn over(plan_type: PlanType, child: Pattern) -> Self {
        Pattern::Node(plan_type, vec![child])
    }

    pub fn view() -> Self {
        Self::node(PlanType::View)
    }

    pub fn filter() -> Self {
        Self::node(PlanType::Filter)
    }

    pub fn limit() -> Self {
        Self::node(PlanType::Limit)
    }

    /// A filter directly on top of another filter.
    pub fn filter_filter() -> Self {
        Self::over(PlanType::Filter, Self::filter())
    }

    /// A filter directly on top of a view reference.
    pub fn filter_view() -> Self {
        Self::over(PlanType::Filter, Self::view())
    }

    pub fn limit_limit() -> Self {
        Self::over(PlanType::Limit, Self::limit())
    }
}

/// Check if a plan tree matches a pattern.
pub fn matches(plan: &PlanRef, pattern: &Pattern) -> bool {
    match pattern {
        Pattern::Any => true,
        Pattern::Leaf => plan.children().is_empty(),
        Pattern::Node(plan_type, child_patterns) => {
            plan.plan_type() == *plan_type
                && plan.children().len() == child_patterns.len()
                && plan
                    .children()
                    .iter()
                    .zip(child_patterns)
                    .all(|(child, p)| matches(child, p))
        }
    }
}

/// Check if a memo expression matches a pattern, looking through child groups.
pub fn matches_in_memo(memo: &Memo, expr_id: ExprId, pattern: &Pattern) -> PlanResult<bool> {
    let expr = memo.expr(expr_id)?;
    match pattern {
        Pattern::Any => Ok(true),
        Pattern::Leaf => Ok(expr.children.is_empty()),
        Pattern::Node(plan_type, child_patterns) => {
            if expr.plan.plan_type() != *plan_type || expr.children.len() != child_patterns.len() {
                return Ok(false);
            }
            for (child_gid, child_pattern) in expr.children.iter().zip(child_patterns) {
                if *child_pattern == Pattern::Any {
                    continue;
                }
                let mut any_match = false;
                for &eid in &memo.group(*child_gid)?.exprs {
                    if matches_in_memo(memo, eid, child_pattern)? {
                        any_match = true;
                        break;
                    }
                }
                if !any_match {
                    return Ok(false);
                }
            }
            Ok(true)
        }
    }
}
