//! # Plan Rewrite Rules
//!
//! This crate provides rewrite rules over optx logical plans and the driver that runs
//! them. Every rule is written as a [`PlanVisitor`](optx_plan::visitor::PlanVisitor):
//! it overrides the handler of the variant it rewrites and declines everything else.
//!
//! - **`InlineViewRule`**: Replaces a view reference with its body.
//! - **`PushFilterThroughViewRule`**: Moves a filter from above a view reference into
//!   the view body.
//! - **`MergeFiltersRule`**: Collapses stacked filters into one.
//! - **`SimplifyFilterRule`**: Removes `TRUE` conjuncts and filters left empty.
//! - **`MergeLimitsRule`**: Collapses stacked limits into one.

pub mod driver;
pub mod inline_view;
pub mod merge_filters;
pub mod merge_limits;
pub mod push_filter_through_view;
pub mod simplify_filter;

pub use driver::{RewriteConfig, RewriteDriver};

use optx_plan::rule::RuleRegistry;

/// Create a rule registry with all built-in rules.
///
/// Filters are offered to `PushFilterThroughView` before views are inlined.
pub fn default_rule_registry() -> RuleRegistry {
    let mut registry = RuleRegistry::new();
    registry.add_rule(Box::new(simplify_filter::SimplifyFilterRule));
    registry.add_rule(Box::new(merge_filters::MergeFiltersRule));
    registry.add_rule(Box::new(push_filter_through_view::PushFilterThroughViewRule));
    registry.add_rule(Box::new(inline_view::InlineViewRule));
    registry.add_rule(Box::new(merge_limits::MergeLimitsRule));
    registry
}
