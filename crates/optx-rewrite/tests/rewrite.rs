//! End-to-end rewrite tests over plans that reference a stored view.
//!
//! The base plan is
//!
//! ```text
//! Filter(TRUE AND a = 1)
//!   Filter(b = 2)
//!     View(hive.db1.v1)
//!       Limit(5, 0)
//!         Limit(10, 0)
//!           Scan(hive.db1.t)
//! ```

use optx_plan::catalog::{ColumnDef, InMemoryCatalog, QualifiedName, Table, View};
use optx_plan::expr::{Expr, ScalarValue, SlotIdGenerator};
use optx_plan::memo::Memo;
use optx_plan::plan::PlanBuilder;
use optx_plan::rule::{RewriteContext, Rule};
use optx_plan::{LogicalOp, PlanNode, PlanRef, PlanType};
use optx_rewrite::merge_limits::MergeLimitsRule;
use optx_rewrite::{default_rule_registry, RewriteConfig, RewriteDriver};
use proptest::prelude::*;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn catalog() -> InMemoryCatalog {
    let mut catalog = InMemoryCatalog::new();
    catalog.add_table(Table::new(
        QualifiedName::new("hive", "db1", "t"),
        vec![ColumnDef::new("a", true), ColumnDef::new("b", true)],
    ));
    catalog.add_view(View::new(
        QualifiedName::new("hive", "db1", "v1"),
        "SELECT a, b FROM t LIMIT 10",
    ));
    catalog
}

fn int(v: i64) -> Expr {
    Expr::literal(ScalarValue::Int64(v))
}

fn base_plan(catalog: &InMemoryCatalog, ids: &SlotIdGenerator) -> PlanRef {
    let builder = PlanBuilder::new(catalog, ids);
    let scan = builder.scan(&QualifiedName::new("hive", "db1", "t")).unwrap();
    let out = scan.output().unwrap();
    let body = PlanNode::limit(5, 0, PlanNode::limit(10, 0, scan).unwrap()).unwrap();
    let view = builder.view(&QualifiedName::new("hive", "db1", "v1"), body).unwrap();
    let inner = PlanNode::filter(vec![Expr::equal(Expr::column(&out[1]), int(2))], view).unwrap();
    PlanNode::filter(
        vec![Expr::And(vec![
            Expr::literal(ScalarValue::Bool(true)),
            Expr::equal(Expr::column(&out[0]), int(1)),
        ])],
        inner,
    )
    .unwrap()
}

fn driver(config: RewriteConfig) -> RewriteDriver {
    RewriteDriver::new(Arc::new(default_rule_registry()), config)
}

fn without_inlining() -> RewriteConfig {
    RewriteConfig {
        disabled_rules: vec!["InlineView".into()],
        ..RewriteConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Tree rewriting
// ---------------------------------------------------------------------------

#[test]
fn test_default_rules_reach_fixpoint() {
    let catalog = catalog();
    let ids = SlotIdGenerator::new();
    let ctx = RewriteContext::new(&catalog, &ids);
    let plan = base_plan(&catalog, &ids);

    let rewritten = driver(RewriteConfig::default()).rewrite(&plan, &ctx).unwrap();
    assert_eq!(
        rewritten.tree_string(),
        "LogicalFilter ( predicates=[(b#1 = 2), (a#0 = 1)] )\n\
         +--LogicalLimit ( limit=5, offset=0 )\n   \
         +--LogicalScan ( table=hive.db1.t, output=[a#0, b#1] )\n"
    );
    assert_eq!(rewritten.output().unwrap(), plan.output().unwrap());

    // The input tree is untouched.
    assert_eq!(plan.plan_type(), PlanType::Filter);
    assert_eq!(plan.child(0).child(0).plan_type(), PlanType::View);
}

#[test]
fn test_kept_view_receives_filters() {
    let catalog = catalog();
    let ids = SlotIdGenerator::new();
    let ctx = RewriteContext::new(&catalog, &ids);
    let plan = base_plan(&catalog, &ids);

    let rewritten = driver(without_inlining()).rewrite(&plan, &ctx).unwrap();
    assert_eq!(
        rewritten.tree_string(),
        "LogicalView ( catalog=hive, db=db1, name=v1 )\n\
         +--LogicalFilter ( predicates=[(b#1 = 2), (a#0 = 1)] )\n   \
         +--LogicalLimit ( limit=5, offset=0 )\n      \
         +--LogicalScan ( table=hive.db1.t, output=[a#0, b#1] )\n"
    );
    assert_eq!(rewritten, plan.child(0).child(0).clone());
    assert_eq!(rewritten.output().unwrap(), plan.output().unwrap());
}

#[test]
fn test_pass_limit_stops_early() {
    let catalog = catalog();
    let ids = SlotIdGenerator::new();
    let ctx = RewriteContext::new(&catalog, &ids);
    let plan = base_plan(&catalog, &ids);

    let config = RewriteConfig {
        max_passes: 1,
        ..without_inlining()
    };
    let rewritten = driver(config).rewrite(&plan, &ctx).unwrap();
    // The two filters end up stacked inside the view; merging them needs a second pass.
    let filter = rewritten.child(0);
    assert_eq!(filter.plan_type(), PlanType::Filter);
    assert_eq!(filter.child(0).plan_type(), PlanType::Filter);
}

// ---------------------------------------------------------------------------
// Memo exploration
// ---------------------------------------------------------------------------

#[test]
fn test_explore_adds_alternatives_once() {
    let catalog = catalog();
    let ids = SlotIdGenerator::new();
    let ctx = RewriteContext::new(&catalog, &ids);
    let view = base_plan(&catalog, &ids).child(0).child(0).clone();

    let mut memo = Memo::new();
    let root = memo.insert(&view).unwrap();
    assert_eq!(memo.num_groups(), 4);
    let limits = root.child(0).group_link().unwrap().group;

    let driver = driver(RewriteConfig::default());
    // Merging the limits adds one alternative; inlining the view finds its body
    // already stored in another group.
    assert_eq!(driver.explore(&mut memo, &ctx).unwrap(), 1);
    assert_eq!(memo.group(limits).unwrap().exprs.len(), 2);
    assert_eq!(memo.num_groups(), 4);
    assert_eq!(driver.explore(&mut memo, &ctx).unwrap(), 0);

    let extracted = memo.extract(root.group_link().unwrap().group).unwrap();
    assert_eq!(extracted.tree_string(), view.tree_string());
}

// ---------------------------------------------------------------------------
// Limit merging semantics
// ---------------------------------------------------------------------------

fn take(rows: &[u64], limit: u64, offset: u64) -> Vec<u64> {
    rows.iter().skip(offset as usize).take(limit as usize).copied().collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// The merged limit returns exactly the rows of the stacked limits.
    #[test]
    fn prop_merged_limit_selects_same_rows(
        outer in (0u64..20, 0u64..20),
        inner in (0u64..20, 0u64..20),
    ) {
        let catalog = catalog();
        let ids = SlotIdGenerator::new();
        let ctx = RewriteContext::new(&catalog, &ids);
        let scan = PlanBuilder::new(&catalog, &ids)
            .scan(&QualifiedName::new("hive", "db1", "t"))
            .unwrap();
        let inner_limit = PlanNode::limit(inner.0, inner.1, scan).unwrap();
        let plan = PlanNode::limit(outer.0, outer.1, inner_limit).unwrap();

        let merged = MergeLimitsRule.apply(&plan, &ctx).unwrap().unwrap();
        let LogicalOp::Limit(limit) = merged.op() else {
            panic!("expected a limit");
        };

        let rows: Vec<u64> = (0..50).collect();
        let stacked = take(&take(&rows, inner.0, inner.1), outer.0, outer.1);
        prop_assert_eq!(take(&rows, limit.limit(), limit.offset()), stacked);
    }
}
