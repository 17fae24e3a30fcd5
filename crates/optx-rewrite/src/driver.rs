//! # Rewrite Driver
//!
//! Runs a [`RuleRegistry`] over a plan in two modes:
//!
//! - **Tree rewriting** ([`RewriteDriver::rewrite`]): each pass walks the tree
//!   bottom-up, rebuilds parents whose children changed with `with_children`, and
//!   offers every node to every enabled rule whose pattern matches. Passes repeat
//!   until one applies no rule or `max_passes` is reached.
//!
//! - **Memo exploration** ([`RewriteDriver::explore`]): every group expression is
//!   offered to every rule once; results are added to the expression's group as
//!   alternatives. The memo's applied-rule bookkeeping keeps a rule from firing twice
//!   on the same expression, and `max_memo_exprs` bounds the memo's growth.

use optx_plan::memo::{ExprId, Memo};
use optx_plan::pattern::matches;
use optx_plan::plan::same_children;
use optx_plan::rule::{RewriteContext, Rule, RuleRegistry};
use optx_plan::{PlanRef, PlanResult};
use std::sync::Arc;
use tracing::{debug, trace};

/// Configuration knobs for the rewrite driver.
#[derive(Debug, Clone)]
pub struct RewriteConfig {
    /// Upper bound on the number of bottom-up passes of a tree rewrite.
    pub max_passes: usize,
    /// Exploration stops adding alternatives once the memo holds this many expressions.
    pub max_memo_exprs: usize,
    /// Names of registered rules that must not fire.
    pub disabled_rules: Vec<String>,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            max_passes: 16,
            max_memo_exprs: 10_000,
            disabled_rules: Vec::new(),
        }
    }
}

impl RewriteConfig {
    pub fn is_enabled(&self, rule: &str) -> bool {
        !self.disabled_rules.iter().any(|name| name == rule)
    }
}

pub struct RewriteDriver {
    pub rule_registry: Arc<RuleRegistry>,
    pub config: RewriteConfig,
}

impl RewriteDriver {
    pub fn new(rule_registry: Arc<RuleRegistry>, config: RewriteConfig) -> Self {
        Self { rule_registry, config }
    }

    fn enabled_rules(&self) -> Vec<&dyn Rule> {
        self.rule_registry
            .rules()
            .filter(|rule| self.config.is_enabled(rule.name()))
            .collect()
    }

    /// Rewrite `plan` to a fixpoint of the enabled rules.
    pub fn rewrite(&self, plan: &PlanRef, ctx: &RewriteContext<'_>) -> PlanResult<PlanRef> {
        let rules = self.enabled_rules();
        let mut current = plan.clone();
        for pass in 1..=self.config.max_passes {
            let mut applied = 0;
            current = rewrite_tree(&current, &rules, ctx, &mut applied)?;
            debug!("Rewrite pass {}: {} rule applications", pass, applied);
            if applied == 0 {
                return Ok(current);
            }
        }
        debug!("Hit rewrite pass limit ({})", self.config.max_passes);
        Ok(current)
    }

    /// Offer every memo expression to every enabled rule once. Returns the number of
    /// expressions added.
    pub fn explore(&self, memo: &mut Memo, ctx: &RewriteContext<'_>) -> PlanResult<usize> {
        let rules = self.enabled_rules();
        let before = memo.num_exprs();
        let mut next = 0;
        while next < memo.num_exprs() {
            if memo.num_exprs() >= self.config.max_memo_exprs {
                debug!("Hit memo expression limit ({})", self.config.max_memo_exprs);
                break;
            }
            let id = ExprId(next);
            next += 1;
            let (plan, group) = {
                let expr = memo.expr(id)?;
                (expr.plan.clone(), expr.group)
            };
            for rule in &rules {
                let hash = rule.rule_hash();
                if memo.rule_applied(id, hash) || !matches(&plan, &rule.pattern()) {
                    continue;
                }
                memo.mark_rule_applied(id, hash)?;
                if let Some(result) = rule.apply(&plan, ctx)? {
                    let link = memo.insert_into_group(group, &result)?;
                    trace!("{} on {} produced {}", rule.name(), id, link);
                }
            }
        }
        let added = memo.num_exprs() - before;
        debug!("Exploration added {} expressions", added);
        Ok(added)
    }
}

fn rewrite_tree(
    plan: &PlanRef,
    rules: &[&dyn Rule],
    ctx: &RewriteContext<'_>,
    applied: &mut usize,
) -> PlanResult<PlanRef> {
    let children = plan
        .children()
        .iter()
        .map(|child| rewrite_tree(child, rules, ctx, applied))
        .collect::<PlanResult<Vec<_>>>()?;
    let mut node = if same_children(plan.children(), &children) {
        plan.clone()
    } else {
        plan.with_children(children)?
    };
    for rule in rules {
        if !matches(&node, &rule.pattern()) {
            continue;
        }
        if let Some(rewritten) = rule.apply(&node, ctx)? {
            trace!("{} rewrote {}", rule.name(), node);
            *applied += 1;
            node = rewritten;
        }
    }
    Ok(node)
}
