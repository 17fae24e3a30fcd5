//! # Rule System
//!
//! A [`Rule`] rewrites a plan into an equivalent plan. Rules are written against the
//! node contract only: they match a [`Pattern`], inspect payloads through the
//! [`PlanVisitor`](crate::visitor::PlanVisitor) dispatch, and build results with the
//! node constructors or `with_children`.
//!
//! ## Rule Deduplication
//!
//! Each rule has a `rule_hash()` fingerprint. The memo tracks which rules have already
//! been applied to each group expression so a rule never fires twice on the same one.
//!
//! ## Rule Registry
//!
//! The [`RuleRegistry`] collects the rules a driver runs, in registration order.

use crate::catalog::Catalog;
use crate::error::PlanResult;
use crate::expr::SlotIdGenerator;
use crate::pattern::Pattern;
use crate::plan::PlanRef;
use std::hash::{Hash, Hasher};

/// Context passed to rules during application.
pub struct RewriteContext<'a> {
    /// Catalog the plan was bound against, for rules that resolve tables or views.
    pub catalog: &'a dyn Catalog,
    /// Allocator for rules that introduce new slots.
    pub ids: &'a SlotIdGenerator,
}

impl<'a> RewriteContext<'a> {
    pub fn new(catalog: &'a dyn Catalog, ids: &'a SlotIdGenerator) -> Self {
        Self { catalog, ids }
    }
}

/// A rule transforms plans.
pub trait Rule: Send + Sync {
    /// Unique name of this rule.
    fn name(&self) -> &str;

    /// Pattern that this rule matches against.
    fn pattern(&self) -> Pattern;

    /// Apply the rule to a matching plan.
    ///
    /// `Ok(None)` means the rule does not fire on this instance even though the
    /// pattern matched.
    fn apply(&self, plan: &PlanRef, ctx: &RewriteContext<'_>) -> PlanResult<Option<PlanRef>>;

    /// Hash for fingerprinting (to avoid re-applying rules).
    fn rule_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.name().hash(&mut hasher);
        hasher.finish()
    }
}

/// Registry of rewrite rules.
#[derive(Default)]
pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Rule> {
        self.rules().find(|r| r.name() == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ColumnDef, InMemoryCatalog, QualifiedName, Table};
    use crate::expr::{Expr, NamedExpr, ScalarValue};
    use crate::plan::{LogicalOp, PlanBuilder, PlanNode, PlanType};

    struct Noop(&'static str);

    impl Rule for Noop {
        fn name(&self) -> &str {
            self.0
        }

        fn pattern(&self) -> Pattern {
            Pattern::Any
        }

        fn apply(
            &self,
            _plan: &PlanRef,
            _ctx: &RewriteContext<'_>,
        ) -> PlanResult<Option<PlanRef>> {
            Ok(None)
        }
    }

    /// Tags every row of a scan with the name of its source table.
    struct TagScanSource;

    impl Rule for TagScanSource {
        fn name(&self) -> &str {
            "TagScanSource"
        }

        fn pattern(&self) -> Pattern {
            Pattern::node(PlanType::Scan)
        }

        fn apply(&self, plan: &PlanRef, ctx: &RewriteContext<'_>) -> PlanResult<Option<PlanRef>> {
            let LogicalOp::Scan(scan) = plan.op() else {
                return Ok(None);
            };
            let Some(table) = ctx.catalog.get_table(scan.table().name()) else {
                return Ok(None);
            };
            let mut exprs: Vec<NamedExpr> = scan
                .slots()
                .iter()
                .map(|s| NamedExpr::new(Expr::column(s), s.clone()))
                .collect();
            exprs.push(NamedExpr::new(
                Expr::literal(ScalarValue::Utf8(table.name().to_string())),
                ctx.ids.new_slot("source"),
            ));
            PlanNode::project(exprs, plan.clone()).map(Some)
        }
    }

    #[test]
    fn test_rule_resolves_and_allocates_through_context() {
        let mut catalog = InMemoryCatalog::new();
        let name = QualifiedName::new("hive", "db1", "orders");
        catalog.add_table(Table::new(
            name.clone(),
            vec![ColumnDef::new("o_id", false), ColumnDef::new("o_total", true)],
        ));
        let ids = SlotIdGenerator::new();
        let scan = PlanBuilder::new(&catalog, &ids).scan(&name).unwrap();

        let ctx = RewriteContext::new(&catalog, &ids);
        let tagged = TagScanSource.apply(&scan, &ctx).unwrap().unwrap();
        let output = tagged.output().unwrap();
        assert_eq!(output.len(), 3);
        assert_eq!(output[2].to_string(), "source#2");
        assert_eq!(&output[..2], &scan.output().unwrap()[..]);

        // A second application draws a fresh slot.
        let again = TagScanSource.apply(&scan, &ctx).unwrap().unwrap();
        assert_eq!(again.output().unwrap()[2].to_string(), "source#3");

        // Tables missing from the context's catalog are left alone.
        let empty = InMemoryCatalog::new();
        let ctx = RewriteContext::new(&empty, &ids);
        assert!(TagScanSource.apply(&scan, &ctx).unwrap().is_none());
    }

    #[test]
    fn test_registry_lookup_and_fingerprints() {
        let mut registry = RuleRegistry::new();
        assert!(registry.is_empty());
        registry.add_rule(Box::new(Noop("first")));
        registry.add_rule(Box::new(Noop("second")));

        assert_eq!(registry.len(), 2);
        let names: Vec<&str> = registry.rules().map(|r| r.name()).collect();
        assert_eq!(names, vec!["first", "second"]);

        let first = registry.get("first").unwrap();
        assert_eq!(first.rule_hash(), Noop("first").rule_hash());
        assert_ne!(first.rule_hash(), Noop("second").rule_hash());
        assert!(registry.get("missing").is_none());
    }
}
