//! # Memo
//!
//! The memo stores a plan as **groups** of logically equivalent **group expressions**.
//! A group expression is a plan node whose children are referenced by group id, so a
//! subtree shared between alternatives is stored once.
//!
//! ## Deduplication
//!
//! Group expressions are keyed on `(node, child group ids)`. Node equality covers the
//! variant and its payload only, which is why the child groups are part of the key:
//! two references to the same view over different bodies compare equal as nodes but
//! land in different group expressions.
//!
//! ## Group Links
//!
//! Every stored node carries a [`GroupExprLink`] back to its slot. Insertion first tries
//! to link the caller's node in place (`PlanNode::link_group`, first writer wins); a
//! node already linked elsewhere is copied with `PlanNode::with_group_link`.
//!
//! ## Rule Bookkeeping
//!
//! Each group expression records the fingerprints of the rules already applied to it so
//! that a rewrite loop never fires the same rule twice on the same expression.

use crate::error::{PlanError, PlanResult};
use crate::plan::{same_children, PlanRef};
use crate::properties::LogicalProperties;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(pub usize);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExprId(pub usize);

impl fmt::Display for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

/// Back-reference from a plan node to the memo slot holding its canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupExprLink {
    pub group: GroupId,
    pub expr: ExprId,
}

impl fmt::Display for GroupExprLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.group, self.expr)
    }
}

/// A node stored in the memo, with its children replaced by group ids.
#[derive(Debug)]
pub struct GroupExpression {
    pub id: ExprId,
    pub group: GroupId,
    /// The linked node. Its children are the nodes that were current at insertion.
    pub plan: PlanRef,
    pub children: Vec<GroupId>,
    applied_rules: HashSet<u64>,
}

impl GroupExpression {
    pub fn link(&self) -> GroupExprLink {
        GroupExprLink {
            group: self.group,
            expr: self.id,
        }
    }
}

/// A set of logically equivalent group expressions.
#[derive(Debug)]
pub struct Group {
    pub id: GroupId,
    pub exprs: Vec<ExprId>,
    /// Properties of the first expression; every alternative produces the same rows.
    pub properties: Arc<LogicalProperties>,
}

#[derive(Debug, PartialEq, Eq, Hash)]
struct MemoKey {
    plan: PlanRef,
    children: Vec<GroupId>,
}

/// The memo: groups, their expressions and the deduplication index.
#[derive(Debug, Default)]
pub struct Memo {
    groups: Vec<Group>,
    exprs: Vec<GroupExpression>,
    index: HashMap<MemoKey, ExprId>,
}

impl Memo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn num_exprs(&self) -> usize {
        self.exprs.len()
    }

    pub fn group(&self, id: GroupId) -> PlanResult<&Group> {
        self.groups.get(id.0).ok_or(PlanError::UnknownGroup(id))
    }

    pub fn expr(&self, id: ExprId) -> PlanResult<&GroupExpression> {
        self.exprs.get(id.0).ok_or(PlanError::UnknownExpr(id))
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    /// Insert a tree bottom-up and return its canonical, linked form.
    ///
    /// A subtree whose shape is already present is not stored again; the existing
    /// node is returned in its place.
    pub fn insert(&mut self, plan: &PlanRef) -> PlanResult<PlanRef> {
        if let Some(link) = self.owned_link(plan) {
            trace!("{} already linked to {}", plan, link);
            return Ok(plan.clone());
        }
        let (node, children) = self.insert_children(plan)?;
        let key = MemoKey { plan: node, children };
        if let Some(&existing) = self.index.get(&key) {
            trace!("Deduplicated {} into {}", key.plan, existing);
            return Ok(self.exprs[existing.0].plan.clone());
        }

        let properties = key.plan.logical_properties()?;
        let group = GroupId(self.groups.len());
        self.groups.push(Group {
            id: group,
            exprs: Vec::new(),
            properties,
        });
        let link = self.add_expr(group, key);
        debug!("Created group {} for {}", group, self.exprs[link.expr.0].plan);
        Ok(self.exprs[link.expr.0].plan.clone())
    }

    /// Add `plan` as an alternative of `group`, typically the result of a rewrite.
    ///
    /// Children are inserted as usual. If the shape is already stored anywhere in the
    /// memo, nothing is added and the existing link is returned.
    pub fn insert_into_group(
        &mut self,
        group: GroupId,
        plan: &PlanRef,
    ) -> PlanResult<GroupExprLink> {
        self.group(group)?;
        let (node, children) = self.insert_children(plan)?;
        let key = MemoKey { plan: node, children };
        if let Some(&existing) = self.index.get(&key) {
            let link = self.exprs[existing.0].link();
            if link.group != group {
                debug!("{} already lives in {}, not adding it to {}", key.plan, link.group, group);
            }
            return Ok(link);
        }
        let link = self.add_expr(group, key);
        debug!("Added {} to group {}", self.exprs[link.expr.0].plan, group);
        Ok(link)
    }

    /// Rebuild a tree from the first expression of `group` and of every group below it.
    pub fn extract(&self, group: GroupId) -> PlanResult<PlanRef> {
        let first = self
            .group(group)?
            .exprs
            .first()
            .copied()
            .ok_or(PlanError::UnknownGroup(group))?;
        let expr = self.expr(first)?;
        let children = expr
            .children
            .iter()
            .map(|child| self.extract(*child))
            .collect::<PlanResult<Vec<_>>>()?;
        if same_children(expr.plan.children(), &children) {
            Ok(expr.plan.clone())
        } else {
            expr.plan.with_children(children)
        }
    }

    pub fn rule_applied(&self, expr: ExprId, rule_hash: u64) -> bool {
        self.exprs
            .get(expr.0)
            .map_or(false, |e| e.applied_rules.contains(&rule_hash))
    }

    pub fn mark_rule_applied(&mut self, expr: ExprId, rule_hash: u64) -> PlanResult<()> {
        let entry = self.exprs.get_mut(expr.0).ok_or(PlanError::UnknownExpr(expr))?;
        entry.applied_rules.insert(rule_hash);
        Ok(())
    }

    /// The link of `plan` if it points at the very node this memo stores.
    fn owned_link(&self, plan: &PlanRef) -> Option<GroupExprLink> {
        let link = plan.group_link()?;
        let stored = self.exprs.get(link.expr.0)?;
        (stored.group == link.group && Arc::ptr_eq(&stored.plan, plan)).then_some(link)
    }

    /// Insert the children of `plan` and return the node to store over the canonical
    /// children, together with their groups.
    fn insert_children(&mut self, plan: &PlanRef) -> PlanResult<(PlanRef, Vec<GroupId>)> {
        let children = plan
            .children()
            .iter()
            .map(|child| self.insert(child))
            .collect::<PlanResult<Vec<_>>>()?;
        let groups = children
            .iter()
            .filter_map(|child| child.group_link().map(|link| link.group))
            .collect();
        let node = if same_children(plan.children(), &children) {
            plan.clone()
        } else {
            plan.with_children(children)?
        };
        Ok((node, groups))
    }

    fn add_expr(&mut self, group: GroupId, key: MemoKey) -> GroupExprLink {
        let link = GroupExprLink {
            group,
            expr: ExprId(self.exprs.len()),
        };
        let plan = link_node(&key.plan, link);
        self.exprs.push(GroupExpression {
            id: link.expr,
            group,
            plan,
            children: key.children.clone(),
            applied_rules: HashSet::new(),
        });
        self.groups[group.0].exprs.push(link.expr);
        self.index.insert(key, link.expr);
        link
    }
}

fn link_node(plan: &PlanRef, link: GroupExprLink) -> PlanRef {
    match plan.link_group(link) {
        Ok(()) => plan.clone(),
        Err(existing) => {
            trace!("{} is linked to {}, copying for {}", plan, existing, link);
            plan.with_group_link(link)
        }
    }
}
