//! Logical property derivation across the plan variants.
//!
//! Plans are built over a small orders/customers schema:
//!
//! - `orders(o_id, o_cust, o_total)` keyed on `o_id`
//! - `customers(c_id, c_name)` keyed on `c_id`

use optx_plan::catalog::{ColumnDef, InMemoryCatalog, QualifiedName, Table};
use optx_plan::expr::{
    AggExpr, AggFunc, Expr, JoinType, NamedExpr, ScalarValue, Slot, SlotId, SlotIdGenerator,
    UnaryOp,
};
use optx_plan::plan::PlanBuilder;
use optx_plan::properties::FdItem;
use optx_plan::{PlanError, PlanNode, PlanRef, PlanType};
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Fixture {
    catalog: InMemoryCatalog,
    ids: SlotIdGenerator,
}

impl Fixture {
    fn new() -> Self {
        let mut catalog = InMemoryCatalog::new();
        catalog.add_table(
            Table::new(
                QualifiedName::new("hive", "sales", "orders"),
                vec![
                    ColumnDef::new("o_id", false),
                    ColumnDef::new("o_cust", false),
                    ColumnDef::new("o_total", true),
                ],
            )
            .with_unique_key(["o_id"]),
        );
        catalog.add_table(
            Table::new(
                QualifiedName::new("hive", "sales", "customers"),
                vec![ColumnDef::new("c_id", false), ColumnDef::new("c_name", true)],
            )
            .with_unique_key(["c_id"]),
        );
        Self {
            catalog,
            ids: SlotIdGenerator::new(),
        }
    }

    fn scan(&self, table: &str) -> PlanRef {
        PlanBuilder::new(&self.catalog, &self.ids)
            .scan(&QualifiedName::new("hive", "sales", table))
            .unwrap()
    }
}

fn set(slots: &[&Slot]) -> BTreeSet<SlotId> {
    slots.iter().map(|s| s.id).collect()
}

fn col(slot: &Slot) -> Expr {
    Expr::column(slot)
}

fn table_item<'a>(items: &'a BTreeSet<FdItem>, table: &str) -> &'a FdItem {
    items
        .iter()
        .find(|item| matches!(item, FdItem::Table { table: t, .. } if t.name == table))
        .unwrap()
}

fn int(v: i64) -> Expr {
    Expr::literal(ScalarValue::Int64(v))
}

// ---------------------------------------------------------------------------
// Scan
// ---------------------------------------------------------------------------

#[test]
fn test_scan_key_determines_row() {
    let fx = Fixture::new();
    let orders = fx.scan("orders");
    let out = orders.output().unwrap();
    let (o_id, o_cust, o_total) = (&out[0], &out[1], &out[2]);

    let props = orders.logical_properties().unwrap();
    assert!(props.func_deps.determines(&set(&[o_id]), &set(&[o_cust, o_total])));
    assert!(props.func_deps.is_unique(&set(&[o_id])));
    assert!(!props.func_deps.is_unique(&set(&[o_cust])));
    assert!(props.fd_items.contains(&FdItem::Table {
        determinants: set(&[o_id]),
        table: QualifiedName::new("hive", "sales", "orders"),
        unique: true,
    }));
    assert!(!out[0].nullable);
    assert!(out[2].nullable);
}

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

#[test]
fn test_filter_pins_and_equates_columns() {
    let fx = Fixture::new();
    let orders = fx.scan("orders");
    let out = orders.output().unwrap();
    let (o_id, o_cust, o_total) = (&out[0], &out[1], &out[2]);

    let filter = PlanNode::filter(
        vec![Expr::And(vec![
            Expr::equal(col(o_cust), int(5)),
            Expr::equal(col(o_id), col(o_total)),
        ])],
        orders,
    )
    .unwrap();
    assert_eq!(filter.expressions().len(), 2);

    let fds = filter.logical_properties().unwrap().func_deps.clone();
    assert!(fds.is_uniform(o_cust.id));
    assert!(fds.determines(&set(&[o_total]), &set(&[o_id, o_cust])));
    assert!(fds.is_unique(&set(&[o_id])));
}

#[test]
fn test_filter_is_null_and_null_literal() {
    let fx = Fixture::new();
    let orders = fx.scan("orders");
    let out = orders.output().unwrap();
    let (o_cust, o_total) = (&out[1], &out[2]);

    let filter = PlanNode::filter(
        vec![
            Expr::UnaryOp {
                op: UnaryOp::IsNull,
                operand: Box::new(col(o_total)),
            },
            Expr::equal(col(o_cust), Expr::literal(ScalarValue::Null)),
        ],
        orders,
    )
    .unwrap();
    let fds = filter.logical_properties().unwrap().func_deps.clone();
    assert!(fds.is_uniform(o_total.id));
    assert!(!fds.is_uniform(o_cust.id));
}

#[test]
fn test_filter_rejects_foreign_slot() {
    let fx = Fixture::new();
    let orders = fx.scan("orders");
    let customers = fx.scan("customers");
    let c_id = customers.output().unwrap()[0].clone();

    let filter = PlanNode::filter(vec![Expr::equal(col(&c_id), int(1))], orders).unwrap();
    assert_eq!(
        filter.output().unwrap_err(),
        PlanError::UnresolvedSlot {
            plan_type: PlanType::Filter,
            slot: c_id,
        }
    );
    assert!(matches!(
        PlanNode::filter(vec![], fx.scan("orders")),
        Err(PlanError::InvalidPayload {
            plan_type: PlanType::Filter,
            ..
        })
    ));
}

// ---------------------------------------------------------------------------
// Project
// ---------------------------------------------------------------------------

#[test]
fn test_project_maps_dependencies_through_renames() {
    let fx = Fixture::new();
    let orders = fx.scan("orders");
    let out = orders.output().unwrap();
    let (o_id, o_total) = (&out[0], &out[2]);

    let id = fx.ids.new_slot("id");
    let abs_total = fx.ids.new_slot("abs_total");
    let one = fx.ids.new_slot("one");
    let project = PlanNode::project(
        vec![
            NamedExpr::new(col(o_id), id.clone()),
            NamedExpr::pass_through(o_total),
            NamedExpr::new(
                Expr::Function {
                    name: "abs".into(),
                    args: vec![col(o_total)],
                },
                abs_total.clone(),
            ),
            NamedExpr::new(int(1), one.clone()),
        ],
        orders,
    )
    .unwrap();

    let props = project.logical_properties().unwrap();
    assert_eq!(
        props.output,
        vec![id.clone(), o_total.clone(), abs_total.clone(), one.clone()]
    );
    let fds = &props.func_deps;
    assert!(fds.is_unique(&set(&[&id])));
    assert!(fds.determines(&set(&[&id]), &set(&[&abs_total, o_total])));
    assert!(fds.determines(&set(&[o_total]), &set(&[&abs_total])));
    assert!(fds.is_uniform(one.id));
    // o_cust is projected away and must not be mentioned anywhere.
    let o_cust = out[1].id;
    assert!(fds
        .deps()
        .all(|d| !d.determinants.contains(&o_cust) && !d.dependents.contains(&o_cust)));

    assert!(props.fd_items.iter().any(|item| item.determinants() == &set(&[&id])));
}

#[test]
fn test_project_duplicate_forwards_are_equivalent() {
    let fx = Fixture::new();
    let orders = fx.scan("orders");
    let o_cust = orders.output().unwrap()[1].clone();
    let x = fx.ids.new_slot("x");
    let y = fx.ids.new_slot("y");

    let project = PlanNode::project(
        vec![
            NamedExpr::new(col(&o_cust), x.clone()),
            NamedExpr::new(col(&o_cust), y.clone()),
        ],
        orders,
    )
    .unwrap();
    let fds = project.logical_properties().unwrap().func_deps.clone();
    assert!(fds.determines(&set(&[&x]), &set(&[&y])));
    assert!(fds.determines(&set(&[&y]), &set(&[&x])));
}

// ---------------------------------------------------------------------------
// Join
// ---------------------------------------------------------------------------

#[test]
fn test_inner_join_keeps_keys_of_side_matching_once() {
    let fx = Fixture::new();
    let orders = fx.scan("orders");
    let customers = fx.scan("customers");
    let o = orders.output().unwrap();
    let c = customers.output().unwrap();
    let (o_id, o_cust) = (&o[0], &o[1]);
    let (c_id, c_name) = (&c[0], &c[1]);

    let join = PlanNode::join(
        JoinType::Inner,
        vec![Expr::equal(col(o_cust), col(c_id))],
        orders,
        customers,
    )
    .unwrap();
    let props = join.logical_properties().unwrap();
    assert_eq!(props.output.len(), 5);

    let fds = &props.func_deps;
    assert!(fds.determines(&set(&[o_id]), &set(&[c_name])));
    assert!(fds.determines(&set(&[c_id]), &set(&[o_cust])));
    // Each order matches one customer; a customer may have many orders.
    assert!(fds.is_unique(&set(&[o_id])));
    assert!(!fds.is_unique(&set(&[c_id])));

    assert_eq!(props.fd_items.len(), 2);
    let orders_item = table_item(&props.fd_items, "orders");
    let customers_item = table_item(&props.fd_items, "customers");
    assert_eq!(orders_item.determinants(), &set(&[o_id]));
    assert!(orders_item.is_unique());
    assert_eq!(customers_item.determinants(), &set(&[c_id]));
    assert!(!customers_item.is_unique());
}

#[test]
fn test_fd_items_agree_with_func_deps_on_uniqueness() {
    let fx = Fixture::new();
    let orders = fx.scan("orders");
    let customers = fx.scan("customers");
    let o = orders.output().unwrap();
    let c = customers.output().unwrap();
    let cond = vec![Expr::equal(col(&c[0]), col(&o[1]))];

    // A customer with several orders appears once per order.
    let left = PlanNode::join(
        JoinType::Left,
        cond.clone(),
        customers.clone(),
        orders.clone(),
    )
    .unwrap();
    let props = left.logical_properties().unwrap();
    assert!(!props.func_deps.is_unique(&set(&[&c[0]])));
    let item = table_item(&props.fd_items, "customers");
    assert_eq!(item.determinants(), &set(&[&c[0]]));
    assert!(!item.is_unique());

    // A semi join never repeats a left row.
    let semi = PlanNode::join(JoinType::Semi, cond, customers, orders).unwrap();
    let props = semi.logical_properties().unwrap();
    assert!(props.func_deps.is_unique(&set(&[&c[0]])));
    assert!(table_item(&props.fd_items, "customers").is_unique());

    for join in [&left, &semi] {
        let props = join.logical_properties().unwrap();
        for item in &props.fd_items {
            assert_eq!(
                item.is_unique(),
                props.func_deps.is_unique(item.determinants()),
                "{item:?}"
            );
        }
    }
}

#[test]
fn test_outer_joins_pad_and_drop_dependencies() {
    let fx = Fixture::new();
    let orders = fx.scan("orders");
    let customers = fx.scan("customers");
    let o = orders.output().unwrap();
    let c = customers.output().unwrap();
    let cond = vec![Expr::equal(col(&o[1]), col(&c[0]))];

    let left = PlanNode::join(
        JoinType::Left,
        cond.clone(),
        orders.clone(),
        customers.clone(),
    )
    .unwrap();
    let props = left.logical_properties().unwrap();
    assert!(props.output[3].nullable);
    assert!(!props.output[0].nullable);
    assert!(props.func_deps.is_unique(&set(&[&o[0]])));
    assert!(!props.func_deps.determines(&set(&[&c[0]]), &set(&[&c[1]])));

    let full = PlanNode::join(
        JoinType::Full,
        cond.clone(),
        orders.clone(),
        customers.clone(),
    )
    .unwrap();
    let props = full.logical_properties().unwrap();
    assert!(props.output.iter().all(|s| s.nullable));
    assert!(props.func_deps.is_empty());
    assert!(props.fd_items.is_empty());

    let semi =
        PlanNode::join(JoinType::Semi, cond, orders.clone(), customers.clone()).unwrap();
    assert_eq!(semi.output().unwrap(), o);

    assert!(matches!(
        PlanNode::join(
            JoinType::Cross,
            vec![Expr::equal(col(&o[1]), col(&c[0]))],
            orders,
            customers
        ),
        Err(PlanError::InvalidPayload {
            plan_type: PlanType::Join,
            ..
        })
    ));
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

fn sum(slot: &Slot) -> Expr {
    Expr::Aggregate(Box::new(AggExpr {
        func: AggFunc::Sum,
        arg: col(slot),
        distinct: false,
    }))
}

#[test]
fn test_group_key_is_unique() {
    let fx = Fixture::new();
    let orders = fx.scan("orders");
    let o = orders.output().unwrap();
    let (o_id, o_cust, o_total) = (&o[0], &o[1], &o[2]);
    let total = fx.ids.new_slot("total");

    let agg = PlanNode::aggregate(
        vec![col(o_cust)],
        vec![NamedExpr::pass_through(o_cust), NamedExpr::new(sum(o_total), total.clone())],
        orders,
    )
    .unwrap();
    let props = agg.logical_properties().unwrap();
    assert_eq!(props.output, vec![o_cust.clone(), total.clone()]);
    assert!(props.func_deps.is_unique(&set(&[o_cust])));
    assert!(props.func_deps.determines(&set(&[o_cust]), &set(&[&total])));
    assert!(props.func_deps.deps().all(|d| !d.determinants.contains(&o_id.id)));
    assert_eq!(
        props.fd_items.iter().cloned().collect::<Vec<_>>(),
        vec![FdItem::Expr {
            determinants: set(&[o_cust]),
            dependents: set(&[&total]),
            unique: true,
        }]
    );
}

#[test]
fn test_global_aggregate_is_single_row() {
    let fx = Fixture::new();
    let orders = fx.scan("orders");
    let o_total = orders.output().unwrap()[2].clone();
    let total = fx.ids.new_slot("total");

    let agg = PlanNode::aggregate(
        vec![],
        vec![NamedExpr::new(sum(&o_total), total.clone())],
        orders,
    )
    .unwrap();
    let fds = agg.logical_properties().unwrap().func_deps.clone();
    assert!(fds.is_uniform(total.id));
    assert!(fds.is_unique(&BTreeSet::new()));
}

#[test]
fn test_ungrouped_output_is_rejected() {
    let fx = Fixture::new();
    let orders = fx.scan("orders");
    let o = orders.output().unwrap();
    let result =
        PlanNode::aggregate(vec![col(&o[1])], vec![NamedExpr::pass_through(&o[2])], orders);
    assert!(matches!(
        result,
        Err(PlanError::InvalidPayload {
            plan_type: PlanType::Aggregate,
            ..
        })
    ));
}

// ---------------------------------------------------------------------------
// Limit and explain
// ---------------------------------------------------------------------------

#[test]
fn test_single_row_limit_makes_columns_uniform() {
    let fx = Fixture::new();
    let orders = fx.scan("orders");
    let o_cust = orders.output().unwrap()[1].id;

    let ten = PlanNode::limit(10, 0, orders.clone()).unwrap();
    assert_eq!(
        ten.logical_properties().unwrap().func_deps,
        orders.logical_properties().unwrap().func_deps
    );

    let one = PlanNode::limit(1, 3, orders).unwrap();
    let fds = one.logical_properties().unwrap().func_deps.clone();
    assert!(fds.is_uniform(o_cust));
    assert!(fds.is_unique(&BTreeSet::new()));
}

#[test]
fn test_tree_string() {
    let fx = Fixture::new();
    let orders = fx.scan("orders");
    let o_cust = orders.output().unwrap()[1].clone();
    let filter = PlanNode::filter(vec![Expr::equal(col(&o_cust), int(5))], orders).unwrap();
    let plan = PlanNode::limit(10, 0, filter).unwrap();

    assert_eq!(
        plan.tree_string(),
        "LogicalLimit ( limit=10, offset=0 )\n\
         +--LogicalFilter ( predicates=[(o_cust#1 = 5)] )\n   \
         +--LogicalScan ( table=hive.sales.orders, output=[o_id#0, o_cust#1, o_total#2] )\n"
    );
}
